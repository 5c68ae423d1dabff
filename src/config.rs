// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command line and environment configuration.
//!
//! The binary has a single `start` subcommand. Every flag can also be set
//! through an environment variable; the operand image and version are
//! required and normally injected by the operator's deployment.

use crate::cert::CertConfig;
use crate::constants::{
    DEFAULT_CERT_ROTATION_THRESHOLD_HOURS, DEFAULT_CERT_VALIDITY_DAYS, DEFAULT_HEALTH_ADDR,
    DEFAULT_OPERAND_NAME, DEFAULT_OPERATOR_NAMESPACE, DEFAULT_RESYNC_SECS, DEFAULT_SINGLETON_NAME,
    DEFAULT_WORKERS, ENV_OPERAND_IMAGE, ENV_OPERAND_VERSION, ENV_OPERATOR_NAMESPACE,
};
use crate::operand::OperandContext;
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// RunOnceDurationOverride operator
#[derive(Parser, Debug)]
#[command(name = "rodoo", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the operator until SIGTERM or SIGINT
    Start(StartArgs),
}

#[derive(Args, Debug, Clone)]
pub struct StartArgs {
    /// Image of the admission webhook server
    #[arg(long, env = ENV_OPERAND_IMAGE)]
    pub operand_image: String,

    /// Version of the admission webhook server
    #[arg(long, env = ENV_OPERAND_VERSION)]
    pub operand_version: String,

    /// Namespace the operand is installed into
    #[arg(long, env = ENV_OPERATOR_NAMESPACE, default_value = DEFAULT_OPERATOR_NAMESPACE)]
    pub namespace: String,

    /// Base name of every managed object
    #[arg(long, default_value = DEFAULT_OPERAND_NAME)]
    pub name: String,

    /// Name of the only RunOnceDurationOverride that is reconciled
    #[arg(long, default_value = DEFAULT_SINGLETON_NAME)]
    pub singleton_name: String,

    /// Concurrent reconciliations
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub workers: u16,

    /// Listen address of the health and metrics server
    #[arg(long, default_value = DEFAULT_HEALTH_ADDR)]
    pub health_addr: String,

    /// Validity of generated serving certificates
    #[arg(long, default_value_t = DEFAULT_CERT_VALIDITY_DAYS)]
    pub cert_validity_days: i64,

    /// How long before expiry serving certificates are rotated
    #[arg(long, default_value_t = DEFAULT_CERT_ROTATION_THRESHOLD_HOURS)]
    pub cert_rotation_threshold_hours: i64,

    /// Periodic re-check of a healthy install
    #[arg(long, default_value_t = DEFAULT_RESYNC_SECS)]
    pub resync_seconds: u64,
}

/// Errors raised while validating [`StartArgs`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("--workers must be at least 1")]
    NoWorkers,

    #[error("invalid --health-addr {addr}: {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error("--cert-validity-days must be positive and representable, got {0}")]
    InvalidValidity(i64),

    #[error("--cert-rotation-threshold-hours ({threshold_hours}h) must be shorter than the validity ({validity_days}d)")]
    ThresholdTooLong {
        threshold_hours: i64,
        validity_days: i64,
    },

    #[error("--resync-seconds must be positive")]
    NoResync,
}

/// Validated operator configuration.
#[derive(Debug, Clone)]
pub struct OperatorConfig {
    pub operand: OperandContext,
    pub workers: u16,
    pub health_addr: SocketAddr,
    pub cert: CertConfig,
    pub resync: Duration,
}

fn non_empty(value: &str, flag: &'static str) -> Result<String, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Empty(flag));
    }
    Ok(value.to_string())
}

impl TryFrom<StartArgs> for OperatorConfig {
    type Error = ConfigError;

    fn try_from(args: StartArgs) -> Result<Self, Self::Error> {
        let image = non_empty(&args.operand_image, ENV_OPERAND_IMAGE)?;
        let version = non_empty(&args.operand_version, ENV_OPERAND_VERSION)?;
        let namespace = non_empty(&args.namespace, "--namespace")?;
        let name = non_empty(&args.name, "--name")?;
        let singleton_name = non_empty(&args.singleton_name, "--singleton-name")?;

        if args.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }

        let health_addr =
            args.health_addr
                .parse::<SocketAddr>()
                .map_err(|e| ConfigError::InvalidAddress {
                    addr: args.health_addr.clone(),
                    reason: e.to_string(),
                })?;

        if args.cert_validity_days <= 0 {
            return Err(ConfigError::InvalidValidity(args.cert_validity_days));
        }
        let validity = chrono::TimeDelta::try_days(args.cert_validity_days)
            .ok_or(ConfigError::InvalidValidity(args.cert_validity_days))?;
        let rotation_threshold =
            chrono::TimeDelta::try_hours(args.cert_rotation_threshold_hours.max(0)).ok_or(
                ConfigError::ThresholdTooLong {
                    threshold_hours: args.cert_rotation_threshold_hours,
                    validity_days: args.cert_validity_days,
                },
            )?;
        if rotation_threshold >= validity {
            return Err(ConfigError::ThresholdTooLong {
                threshold_hours: args.cert_rotation_threshold_hours,
                validity_days: args.cert_validity_days,
            });
        }

        if args.resync_seconds == 0 {
            return Err(ConfigError::NoResync);
        }

        Ok(Self {
            operand: OperandContext::new(name, namespace, singleton_name, image, version),
            workers: args.workers,
            health_addr,
            cert: CertConfig {
                validity,
                rotation_threshold,
            },
            resync: Duration::from_secs(args.resync_seconds),
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
