use crate::context::Context;
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::scan::error::{ErrorKind, Result as ScanResult};
use crate::scan::file::{FileReport, Handling, Triage, expand_archive, triage};
use crate::scan::state::{ScanState, Visited};
use async_stream::stream;
use exn::ResultExt;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use rummage_storage::{Destination, walk};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Progress events emitted by [`scan`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started): exactly once.
/// 2. [`PassStarted`](Self::PassStarted): once per enumeration of the scan root.
/// 3. [`Handled`](Self::Handled): once per file. An archive's is preceded by
///    [`Expanded`](Self::Expanded) when it unpacked.
/// 4. [`RestartRequested`](Self::RestartRequested): after the archives met in
///    a pass have been dealt with; another [`PassStarted`](Self::PassStarted) follows.
/// 5. [`Cancelled`](Self::Cancelled): only if the scan was cancelled.
/// 6. [`Complete`](Self::Complete): exactly once.
///
/// If the scan root cannot be enumerated the stream ends with an error and
/// [`Complete`](Self::Complete) is never emitted.
#[derive(Debug)]
pub enum ScanEvent {
    Started,
    PassStarted(u32),
    Handled(FileReport),
    Expanded { archive: PathBuf, members: Vec<PathBuf> },
    RestartRequested,
    Cancelled,
    Complete(Summary),
}

/// Totals for a whole scan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub passes: u32,
    pub files: usize,
    pub processed: usize,
    pub errored: usize,
    pub unsupported: usize,
    /// Files that could not be moved to their destination and were left in place.
    pub unmoved: usize,
    pub expansions: usize,
    pub matches: usize,
    pub cancelled: bool,
}
impl Summary {
    pub fn record(&mut self, report: &FileReport) {
        self.files += 1;
        match report.organized.destination {
            Destination::Processed => self.processed += 1,
            Destination::Error => self.errored += 1,
            Destination::Unsupported => self.unsupported += 1,
        }
        if !report.organized.is_success() {
            self.unmoved += 1;
        }
        if let Handling::Extracted(extraction) = &report.handling {
            self.matches += extraction.matches;
        }
    }

    /// Some file failed to extract, expand or move.
    pub fn has_failures(&self) -> bool {
        self.errored > 0 || self.unmoved > 0
    }
}

/// Streams [`ScanEvent`]s while sorting every file under the scan root.
///
/// Non-archive files are handled concurrently, up to the context's
/// concurrency. An archive stops the enumeration: everything in flight is
/// drained, the archive is expanded on its own, and a new pass begins. The
/// scan ends after a pass that met no archives.
///
/// Individual file failures are part of each [`FileReport`]; listing a
/// subdirectory or a handling task failing is yielded as an `Err` without
/// ending the stream.
pub fn scan(ctx: Arc<Context>, state: ScanState) -> impl Stream<Item = LibraryResult<ScanEvent>> {
    stream! {
        for await event in scan_inner(ctx, state) {
            yield event.or_raise(|| LibraryErrorKind::Scan);
        }
    }
}

fn scan_inner(ctx: Arc<Context>, mut state: ScanState) -> impl Stream<Item = ScanResult<ScanEvent>> {
    stream!({
        yield Ok(ScanEvent::Started);
        let cancel = ctx.cancellation().clone();
        let mut summary = Summary::default();

        loop {
            let pass = state.begin_pass();
            summary.passes = pass;
            tracing::debug!(pass, "starting pass");
            yield Ok(ScanEvent::PassStarted(pass));

            let mut paths = match walk(ctx.scan_root(), ctx.excluded()).await.or_raise(|| ErrorKind::Enumerate) {
                Ok(paths) => paths,
                Err(e) => {
                    yield Err(e);
                    return;
                },
            };
            let mut processing = FuturesUnordered::new();
            let mut archives = Vec::new();
            let mut exhausted = false;
            loop {
                // Top up, unless an archive is waiting for everything else to finish.
                while !exhausted && archives.is_empty() && processing.len() < ctx.concurrency() && !cancel.is_cancelled()
                {
                    match paths.next().await {
                        Some(Ok(path)) => {
                            if state.visit(&path) {
                                processing.push(spawn_triage(&ctx, state.visited(), path));
                            }
                        },
                        Some(Err(e)) => {
                            let err: ScanResult<ScanEvent> = Err(e).or_raise(|| ErrorKind::Walk);
                            yield err;
                        },
                        None => exhausted = true,
                    }
                }
                match processing.next().await {
                    Some(Ok(Triage::Done(report))) => {
                        summary.record(&report);
                        yield Ok(ScanEvent::Handled(report));
                    },
                    Some(Ok(Triage::Archive(prepared))) => archives.push(prepared),
                    Some(Ok(Triage::Skipped)) => {},
                    Some(Err(e)) => {
                        let err: ScanResult<ScanEvent> = Err(e).or_raise(|| ErrorKind::Task);
                        yield err;
                    },
                    None => break,
                }
            }
            drop(paths);

            if cancel.is_cancelled() {
                tracing::info!(pass, pending_archives = archives.len(), "scan cancelled");
                state.finish();
                summary.cancelled = true;
                yield Ok(ScanEvent::Cancelled);
                yield Ok(ScanEvent::Complete(summary));
                return;
            }
            if archives.is_empty() {
                state.finish();
                tracing::debug!(passes = pass, files = summary.files, "scan complete");
                yield Ok(ScanEvent::Complete(summary));
                return;
            }

            for prepared in archives {
                let task_ctx = Arc::clone(&ctx);
                match tokio::task::spawn_blocking(move || expand_archive(&task_ctx, prepared)).await {
                    Ok((report, expansion)) => {
                        if let Some(expansion) = expansion {
                            state.visited().forget(&expansion.members);
                            summary.expansions += 1;
                            yield Ok(ScanEvent::Expanded { archive: report.path.clone(), members: expansion.members });
                        }
                        summary.record(&report);
                        yield Ok(ScanEvent::Handled(report));
                    },
                    Err(e) => {
                        let err: ScanResult<ScanEvent> = Err(e).or_raise(|| ErrorKind::Task);
                        yield err;
                    },
                }
            }
            // The enumeration was abandoned part-way; only a complete one can end the scan.
            state.request_restart();
            yield Ok(ScanEvent::RestartRequested);
        }
    })
}

fn spawn_triage(ctx: &Arc<Context>, visited: &Arc<Visited>, path: PathBuf) -> JoinHandle<Triage> {
    let ctx = Arc::clone(ctx);
    let visited = Arc::clone(visited);
    tokio::task::spawn_blocking(move || triage(&ctx, &visited, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAudit;
    use crate::layout::Layout;
    use futures::TryStreamExt;
    use rummage_extract::{KeywordMode, KeywordSet, MemorySink};
    use std::fs;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    fn context(dir: &TempDir, concurrency: usize) -> (Context, Arc<MemorySink>) {
        let layout = Layout::create(dir.path().join("out")).unwrap();
        let sink = Arc::new(MemorySink::default());
        let keywords = KeywordSet::new(["budget"], KeywordMode::Literal).unwrap();
        let ctx = Context::new(dir.path().join("scan"), layout, keywords, Arc::new(MemoryAudit::default()))
            .with_sink(sink.clone())
            .with_concurrency(concurrency);
        (ctx, sink)
    }

    fn tree(dir: &TempDir, files: &[(&str, &str)]) {
        for (name, contents) in files {
            let path = dir.path().join("scan").join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
    }

    fn summary(events: &[ScanEvent]) -> &Summary {
        match events.last() {
            Some(ScanEvent::Complete(summary)) => summary,
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[rstest::rstest]
    #[case(1)]
    #[case(4)]
    #[tokio::test]
    async fn single_pass_without_archives(#[case] concurrency: usize) {
        let dir = TempDir::new().unwrap();
        tree(&dir, &[("a.txt", "budget a"), ("sub/b.txt", "nothing"), ("sub/deeper/c.txt", "the BUDGET")]);
        let (ctx, sink) = context(&dir, concurrency);
        let ctx = Arc::new(ctx);

        let events: Vec<_> = scan(ctx.clone(), ScanState::new()).try_collect().await.unwrap();
        assert!(matches!(events[0], ScanEvent::Started));
        assert!(matches!(events[1], ScanEvent::PassStarted(1)));
        let summary = summary(&events);
        assert_eq!(summary.passes, 1);
        assert_eq!((summary.files, summary.processed, summary.matches), (3, 3, 2));
        assert!(!summary.has_failures());
        assert_eq!(sink.records().len(), 2);
        assert!(ctx.layout().root().join("processed/sub/deeper/c.txt").is_file());
    }

    #[tokio::test]
    async fn output_inside_scan_root_is_left_alone() {
        let dir = TempDir::new().unwrap();
        tree(&dir, &[("a.txt", "budget")]);
        let layout = Layout::create(dir.path().join("scan/out")).unwrap();
        fs::write(layout.results().join("old.txt"), "from a previous run").unwrap();
        let keywords = KeywordSet::new(["budget"], KeywordMode::Literal).unwrap();
        let ctx = Arc::new(
            Context::new(dir.path().join("scan"), layout, keywords, Arc::new(MemoryAudit::default()))
                .with_sink(Arc::new(MemorySink::default())),
        );

        let events: Vec<_> = scan(ctx.clone(), ScanState::new()).try_collect().await.unwrap();
        assert_eq!(summary(&events).files, 1);
        assert!(ctx.layout().results().join("old.txt").is_file());
    }

    #[tokio::test]
    async fn cancelled_before_start_handles_nothing() {
        let dir = TempDir::new().unwrap();
        tree(&dir, &[("a.txt", "budget")]);
        let (ctx, _) = context(&dir, 2);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let ctx = Arc::new(ctx.with_cancellation(cancel));

        let events: Vec<_> = scan(ctx, ScanState::new()).try_collect().await.unwrap();
        assert!(matches!(events[events.len() - 2], ScanEvent::Cancelled));
        let summary = summary(&events);
        assert!(summary.cancelled);
        assert_eq!(summary.files, 0);
        assert!(dir.path().join("scan/a.txt").is_file());
    }

    #[tokio::test]
    async fn missing_scan_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let (ctx, _) = context(&dir, 1);
        let result: LibraryResult<Vec<_>> = scan(Arc::new(ctx), ScanState::new()).try_collect().await;
        assert_eq!(*result.unwrap_err(), LibraryErrorKind::Scan);
    }

    #[test]
    fn summary_counts_by_destination() {
        use crate::scan::file::OrganizeOutcome;
        let mut summary = Summary::default();
        let report = |handling: Handling, moved: bool| FileReport {
            path: PathBuf::from("/scan/x"),
            classification: None,
            organized: OrganizeOutcome {
                destination: handling.destination(),
                moved_to: moved.then(|| PathBuf::from("/out/x")),
            },
            handling,
        };
        summary.record(&report(Handling::Extracted(Default::default()), true));
        summary.record(&report(Handling::Failed("bad".into()), true));
        summary.record(&report(Handling::Unsupported(None), false));
        assert_eq!((summary.processed, summary.errored, summary.unsupported, summary.unmoved), (1, 1, 1, 1));
        assert!(summary.has_failures());
    }
}
