//! The migration jobs.
//!
//! Each service takes its stores as `Arc` trait objects and its settings as
//! plain config structs, so tests drive them with the in-memory backends.

mod auditor;
mod migrator;
mod profiles;
mod report;
mod rewriter;

pub use auditor::{
    AuditReport, Auditor, CollectionDiagnosis, CollectionTally, OwnerGroup, STALE_FLAG,
};
pub use migrator::{transform_row, CollectionOutcome, MigrationReport, Migrator};
pub use profiles::{ProfileMatch, ProfileService, UsernameCheck};
pub use report::RecordFailure;
pub use rewriter::{validate_mapping, ReferenceRewriter, RemapOutcome, RemapReport};
