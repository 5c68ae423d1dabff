// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation engine for the `RunOnceDurationOverride` singleton.
//!
//! # Reconciliation Architecture
//!
//! The operator follows the standard Kubernetes controller pattern:
//!
//! 1. **Watch** - the singleton and every managed child (see [`fanin`])
//! 2. **Reconcile** - run the ordered handler [`pipeline`] over a copy of the singleton
//! 3. **Apply** - children are applied eagerly through the drift-detecting [`apply`] adapter
//! 4. **Status** - the copy's status is persisted once by the [`status`] writer
//!
//! # Modules
//!
//! - [`runoncedurationoverride`] - entry point called by the controller
//! - [`pipeline`] - handler chain and per-reconciliation context
//! - [`handlers`] - the individual steps
//! - [`apply`] - semantic-equality apply with conflict retries
//! - [`daemonset`] - availability rule and generation tracking for the operand
//! - [`fanin`] - maps secondary-object events to the singleton key
//! - [`status`] - conditions and the optimistic status writer
//! - [`retry`] - backoff helpers and the per-key requeue limiter
//!
//! # Example
//!
//! ```rust,no_run
//! use rodoo::reconcilers::runoncedurationoverride::{Reconciler, Verdict};
//! use rodoo::crd::RunOnceDurationOverride;
//!
//! async fn once(reconciler: &Reconciler, obj: &RunOnceDurationOverride) -> anyhow::Result<()> {
//!     match reconciler.reconcile(obj, chrono::Utc::now()).await? {
//!         Verdict::Synced { requeue_after } => println!("next check in {requeue_after:?}"),
//!         other => println!("{other:?}"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod apply;
pub mod daemonset;
pub mod fanin;
pub mod handlers;
pub mod pipeline;
pub mod retry;
pub mod runoncedurationoverride;
pub mod status;

pub use runoncedurationoverride::{ReconcileError, Reconciler, Verdict};
