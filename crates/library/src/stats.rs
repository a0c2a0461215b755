//! File-type statistics: how many files of each detected type a tree holds.

use crate::audit::{AuditRecord, AuditSink, Operation};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use futures::StreamExt;
use rummage_storage::walk;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Key holding the overall count in the JSON output.
pub const TOTAL_KEY: &str = "total";

/// Occurrence counts per detected type string (a MIME type or `text/plain`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    counts: BTreeMap<String, usize>,
    total: usize,
}
impl Stats {
    pub fn add(&mut self, detected: &str) {
        *self.counts.entry(detected.to_string()).or_default() += 1;
        self.total += 1;
    }

    pub fn get(&self, detected: &str) -> usize {
        self.counts.get(detected).copied().unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(detected, count)| (detected.as_str(), *count))
    }

    /// `{"<type>": <count>, ..., "total": <count>}`
    pub fn to_json(&self) -> Value {
        let mut map: Map<String, Value> = self.counts.iter().map(|(k, v)| (k.clone(), Value::from(*v))).collect();
        map.insert(TOTAL_KEY.to_string(), Value::from(self.total));
        Value::Object(map)
    }

    /// Write [`to_json`](Self::to_json) to `path`, pretty-printed.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.to_json()).or_raise(|| ErrorKind::Stats)?;
        std::fs::write(path, json).or_raise(|| ErrorKind::Stats)
    }
}

/// Classify every file under `root` (skipping `exclude`) and count the types.
///
/// Files that cannot be classified are audited and left out of the counts.
#[instrument(skip(exclude, audit), fields(total))]
pub async fn collect(root: &Path, exclude: Vec<PathBuf>, audit: &dyn AuditSink) -> Result<Stats> {
    let mut paths = walk(root, exclude).await.or_raise(|| ErrorKind::Stats)?;
    let mut stats = Stats::default();
    while let Some(path) = paths.next().await {
        let path = match path {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(error = ?e, "skipping unreadable directory");
                continue;
            },
        };
        let classify_path = path.clone();
        let classification = tokio::task::spawn_blocking(move || rummage_extract::classify(&classify_path))
            .await
            .or_raise(|| ErrorKind::Stats)?;
        match classification {
            Ok(classification) => stats.add(&classification.detected),
            Err(e) => audit.record(AuditRecord::failed(Operation::Stats, &path, &*e)),
        }
    }
    tracing::Span::current().record("total", stats.total());
    Ok(stats)
}
