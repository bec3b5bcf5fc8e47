//! Weekly ingestion of the EPS dispenser nominations workbook: work out which
//! report is due, find it on the portal, skip it if the bucket already has it,
//! otherwise normalise it to CSV and archive it.

pub mod clock;
pub mod config;
pub mod error;
pub mod fetch;
pub mod history;
pub mod naming;
pub mod normalize;
pub mod pipeline;
pub mod store;
pub mod workbook;

pub use clock::{ReportClock, ReportIdentity};
pub use config::Config;
pub use error::{FailureKind, RunError, Stage};
pub use pipeline::{Pipeline, RunOutcome};
