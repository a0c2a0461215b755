use crate::audit::{AuditRecord, AuditSink};
use crate::layout::{Layout, absolute, nested_in};
use rummage_extract::{ExtractOptions, KeywordSet, MatchSink, ResultLog};
use rummage_storage::Organizer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::available_parallelism;
use tokio_util::sync::CancellationToken;

/// Everything a scan needs, shared by every file it handles.
pub struct Context {
    scan_root: PathBuf,
    layout: Layout,
    organizer: Organizer,
    keywords: KeywordSet,
    sink: Arc<dyn MatchSink>,
    audit: Arc<dyn AuditSink>,
    options: ExtractOptions,
    concurrency: usize,
    cancel: CancellationToken,
}
impl Context {
    /// Matches go to per-keyword files under the layout's results directory
    /// unless replaced with [`with_sink`](Self::with_sink).
    pub fn new(scan_root: impl AsRef<Path>, layout: Layout, keywords: KeywordSet, audit: Arc<dyn AuditSink>) -> Self {
        let scan_root = absolute(scan_root.as_ref());
        let organizer = Organizer::new(&scan_root, layout.destinations());
        let sink: Arc<dyn MatchSink> = Arc::new(ResultLog::new(layout.results(), &keywords));
        Self {
            scan_root,
            layout,
            organizer,
            keywords,
            sink,
            audit,
            options: ExtractOptions::default(),
            concurrency: default_concurrency(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn MatchSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Files handled at once; `1` handles them strictly one after another.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn scan_root(&self) -> &Path {
        &self.scan_root
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn organizer(&self) -> &Organizer {
        &self.organizer
    }

    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }

    pub fn sink(&self) -> &dyn MatchSink {
        self.sink.as_ref()
    }

    pub fn options(&self) -> ExtractOptions {
        self.options
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn audit(&self, record: AuditRecord) {
        self.audit.record(record);
    }

    pub fn audit_sink(&self) -> Arc<dyn AuditSink> {
        Arc::clone(&self.audit)
    }

    /// Directories under the scan root that are never enumerated.
    pub fn excluded(&self) -> Vec<PathBuf> {
        nested_in(&self.scan_root, self.layout.root())
    }
}

pub fn default_concurrency() -> usize {
    available_parallelism().map(usize::from).unwrap_or(1)
}
