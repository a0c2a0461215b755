//! Workflows built on top of the storage, archive and extract crates.
//!
//! - [`scan()`]: the sort-and-match loop, as a stream of [`ScanEvent`]s.
//! - [`expand_first_level`]: unpack archives in the scan root up front.
//! - [`stats::collect`]: count files by detected type.
//! - [`group::group_by_extension`]: one folder per extension.
//! - [`cleanup()`]: remove directories emptied by the above.
//!
//! Every workflow reports what it did to each file through an
//! [`AuditSink`](audit::AuditSink).

pub mod audit;
mod cleanup;
mod context;
pub mod error;
pub mod group;
mod layout;
pub mod scan;
pub mod stats;

pub use crate::cleanup::cleanup;
pub use crate::context::{Context, default_concurrency};
pub use crate::layout::{AUDIT_LOG_FILE, GROUPED_DIR, Layout, RESULTS_DIR, STATS_FILE};
pub use crate::scan::{FileReport, ScanEvent, ScanState, Summary, expand_first_level, scan};
