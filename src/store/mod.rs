//! Persisted state: Source File, LEI Record, LEI Audit Entry, Job State.
//!
//! Each model owns its own SQL — queries live beside the struct they
//! hydrate, never scattered across callers.

pub mod audit_entry;
pub mod job_state;
pub mod lei_record;
pub mod source_file;

pub use audit_entry::{AuditAction, LeiAuditEntry};
pub use job_state::{JobKind, JobState, JobStatus};
pub use lei_record::{ChangeDescriptor, FieldChange, LeiRecord};
pub use source_file::{FailureCategory, ProcessingStatus, SourceFile, SourceFileKind};
