//! Append-only audit trail
//!
//! Every sensitive action (word approval/rejection, import/export, API key
//! lifecycle, failed admin authentication) is recorded here. Entries are
//! written through the same storage backend as the lexicon so word mutations
//! can carry their audit entry in one atomic batch.

mod logger;
mod types;

pub use logger::{AuditLog, AuditStats};
pub use types::*;
