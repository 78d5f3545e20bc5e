//! actionflow-reconciler
//!
//! Drives one action through its lifecycle against an [`ObjectStore`]:
//!
//! ```text
//! Absent ──create──▶ Creating ──▶ Present ──update──▶ Updating ──▶ Present
//!    ▲                                │
//!    └────────────── Deleting ◀──delete
//! ```
//!
//! Every phase transition is logged at `info`, every store call at `debug`.
//!
//! [`ObjectStore`]: actionflow_store::ObjectStore

pub mod error;
pub mod reconciler;
pub mod state;

pub use error::{Operation, ReconcileError, Result};
pub use reconciler::{ImportOutcome, ImportWarning, PlannedObjects, Reconciler, parse_import_id};
pub use state::{ActionState, ReconcilePhase, StateFile, StateLock, StateManager};
