// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! CRD YAML Generator
//!
//! Generates the `RunOnceDurationOverride` CRD YAML from the Rust types defined
//! in src/crd.rs, so deploy/crds/ always matches the code.
//!
//! Usage:
//!   cargo run --bin crdgen
//!   cargo run --bin crdgen -- --stdout

use kube::CustomResourceExt;
use rodoo::crd::RunOnceDurationOverride;
use std::fs;
use std::path::Path;

const COPYRIGHT_HEADER: &str = "# Copyright (c) 2025 Erick Bourgeois, firestoned
# SPDX-License-Identifier: MIT
#
# This file is AUTO-GENERATED from src/crd.rs
# DO NOT EDIT MANUALLY - Run `cargo run --bin crdgen` to regenerate
#
";

const OUTPUT_FILE: &str = "runoncedurationoverrides.crd.yaml";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let yaml = format!(
        "{COPYRIGHT_HEADER}{}",
        serde_yaml::to_string(&RunOnceDurationOverride::crd())?
    );

    if std::env::args().any(|arg| arg == "--stdout") {
        print!("{yaml}");
        return Ok(());
    }

    let output_dir = Path::new("deploy/crds");
    fs::create_dir_all(output_dir)?;
    let output_path = output_dir.join(OUTPUT_FILE);
    fs::write(&output_path, yaml)?;

    println!("✓ Generated {}", output_path.display());
    println!("\nNext steps:");
    println!("  1. Review the generated file");
    println!("  2. Deploy with: kubectl apply -f deploy/crds/");

    Ok(())
}
