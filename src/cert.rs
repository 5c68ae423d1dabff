// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Self-signed serving certificates for the operand.
//!
//! The engine generates an ECDSA P-256 certificate authority and a serving
//! certificate signed by it, both valid for the configured number of days.
//! The resulting [`CertBundle`] is the triple the operand and the API server
//! need: the serving key, the serving certificate, and the CA certificate.
//!
//! # Rotation
//!
//! A bundle becomes eligible for rotation at `notAfter - threshold`
//! (48 hours by default). The rotation instant is persisted in
//! `status.certsRotateAt`; an absent or unparseable value is the zero time
//! and always triggers generation.

use crate::constants::{
    CERT_ORGANIZATION, DEFAULT_CERT_ROTATION_THRESHOLD_HOURS, DEFAULT_CERT_VALIDITY_DAYS,
    SERVICE_CA_KEY, TLS_CERT, TLS_KEY,
};
use crate::hashing::sha256_hex;
use chrono::{DateTime, Duration, Utc};
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use rcgen::{
    string::Ia5String, BasicConstraints, CertificateParams, DistinguishedName, DnType, DnValue,
    ExtendedKeyUsagePurpose, IsCa, Issuer, KeyPair, KeyUsagePurpose, SanType,
};
use std::fmt;
use thiserror::Error;

/// Errors produced by the certificate engine.
#[derive(Debug, Error)]
pub enum CertError {
    /// Key pair generation failed.
    #[error("failed to generate {which} key: {reason}")]
    KeyGeneration { which: &'static str, reason: String },

    /// Building or signing a certificate failed.
    #[error("failed to create {which} certificate: {reason}")]
    Signing { which: &'static str, reason: String },

    /// A subject alternative name is not a valid DNS name.
    #[error("invalid DNS name '{name}': {reason}")]
    InvalidDnsName { name: String, reason: String },

    /// The validity window cannot be represented.
    #[error("invalid certificate validity window: {0}")]
    Validity(String),

    /// A bundle field is empty.
    #[error("certificate bundle has no {0}")]
    MissingField(&'static str),
}

/// Validity and rotation settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertConfig {
    pub validity: Duration,
    pub rotation_threshold: Duration,
}

impl Default for CertConfig {
    fn default() -> Self {
        Self {
            validity: Duration::days(DEFAULT_CERT_VALIDITY_DAYS),
            rotation_threshold: Duration::hours(DEFAULT_CERT_ROTATION_THRESHOLD_HOURS),
        }
    }
}

/// The triple `(serviceKey, serviceCert, servingCertCA)`, PEM-encoded.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct CertBundle {
    pub service_key: Vec<u8>,
    pub service_cert: Vec<u8>,
    pub serving_cert_ca: Vec<u8>,
}

impl fmt::Debug for CertBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertBundle")
            .field("service_key", &format_args!("<{} bytes>", self.service_key.len()))
            .field("service_cert", &format_args!("<{} bytes>", self.service_cert.len()))
            .field(
                "serving_cert_ca",
                &format_args!("<{} bytes>", self.serving_cert_ca.len()),
            )
            .finish()
    }
}

impl CertBundle {
    /// Assemble a bundle from the serving-cert `Secret` and the CA `ConfigMap`.
    ///
    /// Missing objects or keys yield empty fields; call [`CertBundle::validate`]
    /// to reject them.
    #[must_use]
    pub fn from_objects(secret: Option<&Secret>, ca: Option<&ConfigMap>) -> Self {
        let secret_value = |key: &str| {
            secret
                .and_then(|s| s.data.as_ref())
                .and_then(|data| data.get(key))
                .map(|bytes| bytes.0.clone())
                .unwrap_or_default()
        };
        let serving_cert_ca = ca
            .and_then(|cm| cm.data.as_ref())
            .and_then(|data| data.get(SERVICE_CA_KEY))
            .map(|pem| pem.as_bytes().to_vec())
            .unwrap_or_default();

        Self {
            service_key: secret_value(TLS_KEY),
            service_cert: secret_value(TLS_CERT),
            serving_cert_ca,
        }
    }

    /// All three fields are mandatory.
    ///
    /// # Errors
    ///
    /// Returns [`CertError::MissingField`] naming the first empty field.
    pub fn validate(&self) -> Result<(), CertError> {
        if self.service_key.is_empty() {
            return Err(CertError::MissingField("serving key"));
        }
        if self.service_cert.is_empty() {
            return Err(CertError::MissingField("serving certificate"));
        }
        if self.serving_cert_ca.is_empty() {
            return Err(CertError::MissingField("CA certificate"));
        }
        Ok(())
    }

    /// `sha256(hex(sha256(key)) ∥ hex(sha256(cert)) ∥ hex(sha256(ca)))`, hex-encoded.
    #[must_use]
    pub fn hash(&self) -> String {
        let combined = format!(
            "{}{}{}",
            sha256_hex(&self.service_key),
            sha256_hex(&self.service_cert),
            sha256_hex(&self.serving_cert_ca)
        );
        sha256_hex(combined.as_bytes())
    }
}

/// A freshly generated bundle and its timing.
#[derive(Clone, Debug)]
pub struct GeneratedBundle {
    pub bundle: CertBundle,
    pub not_after: DateTime<Utc>,
    pub rotate_at: DateTime<Utc>,
}

/// Parse a persisted rotation instant. Absent or malformed values are the zero time.
#[must_use]
pub fn parse_rotate_at(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format a rotation instant for `status.certsRotateAt`.
#[must_use]
pub fn format_rotate_at(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

fn to_offset(at: DateTime<Utc>) -> Result<::time::OffsetDateTime, CertError> {
    ::time::OffsetDateTime::from_unix_timestamp(at.timestamp())
        .map_err(|e| CertError::Validity(e.to_string()))
}

fn distinguished_name(common_name: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, DnValue::Utf8String(common_name.to_string()));
    dn.push(
        DnType::OrganizationName,
        DnValue::Utf8String(CERT_ORGANIZATION.to_string()),
    );
    dn
}

fn subject_alt_names(names: &[String]) -> Result<Vec<SanType>, CertError> {
    names
        .iter()
        .map(|name| {
            if let Ok(ip) = name.parse::<std::net::IpAddr>() {
                Ok(SanType::IpAddress(ip))
            } else {
                Ia5String::try_from(name.clone())
                    .map(SanType::DnsName)
                    .map_err(|e| CertError::InvalidDnsName {
                        name: name.clone(),
                        reason: e.to_string(),
                    })
            }
        })
        .collect()
}

/// Generate a self-signed CA and a serving certificate for `dns_names`.
///
/// The serving certificate's common name is the first DNS name. Both
/// certificates are valid from `now` for `config.validity`.
///
/// # Errors
///
/// Returns [`CertError`] when key generation, signing, or SAN encoding fails.
pub fn generate(
    dns_names: &[String],
    now: DateTime<Utc>,
    config: &CertConfig,
) -> Result<GeneratedBundle, CertError> {
    let now = DateTime::<Utc>::from_timestamp(now.timestamp(), 0)
        .ok_or_else(|| CertError::Validity(format!("unrepresentable time {now}")))?;
    let not_after = now
        .checked_add_signed(config.validity)
        .ok_or_else(|| CertError::Validity(format!("{now} + {}", config.validity)))?;
    let rotate_at = not_after
        .checked_sub_signed(config.rotation_threshold)
        .ok_or_else(|| CertError::Validity(format!("{not_after} - {}", config.rotation_threshold)))?;

    let common_name = dns_names
        .first()
        .cloned()
        .unwrap_or_else(|| "localhost".to_string());

    let mut ca_params = CertificateParams::default();
    ca_params.distinguished_name =
        distinguished_name(&format!("{common_name}-signer@{}", now.timestamp()));
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    ca_params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    ca_params.not_before = to_offset(now)?;
    ca_params.not_after = to_offset(not_after)?;

    let ca_key = KeyPair::generate().map_err(|e| CertError::KeyGeneration {
        which: "CA",
        reason: e.to_string(),
    })?;
    let ca_cert = ca_params
        .self_signed(&ca_key)
        .map_err(|e| CertError::Signing {
            which: "CA",
            reason: e.to_string(),
        })?;
    let ca_pem = ca_cert.pem();

    let mut params = CertificateParams::default();
    params.distinguished_name = distinguished_name(&common_name);
    params.is_ca = IsCa::NoCa;
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    params.not_before = to_offset(now)?;
    params.not_after = to_offset(not_after)?;
    params.subject_alt_names = subject_alt_names(dns_names)?;

    let serving_key = KeyPair::generate().map_err(|e| CertError::KeyGeneration {
        which: "serving",
        reason: e.to_string(),
    })?;
    let issuer = Issuer::from_ca_cert_pem(&ca_pem, &ca_key).map_err(|e| CertError::Signing {
        which: "CA issuer",
        reason: e.to_string(),
    })?;
    let serving_cert = params
        .signed_by(&serving_key, &issuer)
        .map_err(|e| CertError::Signing {
            which: "serving",
            reason: e.to_string(),
        })?;

    Ok(GeneratedBundle {
        bundle: CertBundle {
            service_key: serving_key.serialize_pem().into_bytes(),
            service_cert: serving_cert.pem().into_bytes(),
            serving_cert_ca: ca_pem.into_bytes(),
        },
        not_after,
        rotate_at,
    })
}

#[cfg(test)]
#[path = "cert_tests.rs"]
mod cert_tests;
