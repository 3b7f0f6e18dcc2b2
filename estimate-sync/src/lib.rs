//! Synchronization layer keeping a live estimate durably persisted.

pub mod autosave;
pub mod session;

pub use autosave::{AlwaysEditable, Autosave, EditPolicy, SaveOutcome, SyncConfig, SyncError};
pub use session::{load, recover_for_project};
