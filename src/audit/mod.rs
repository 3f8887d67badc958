//! Operation audit trail.
//!
//! Business operations are wrapped explicitly by [`recorder::AuditRecorder`];
//! there is no interception magic to discover at runtime. Records are
//! persisted off the request path by [`sink::AuditSink`], and read back
//! through [`query`].

pub mod query;
pub mod recorder;
pub mod sink;

pub use recorder::{AuditRecorder, AuditTag};
pub use sink::AuditSink;
