use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};
use crate::progress::Progress;
use exn::ResultExt;
use futures::StreamExt;
use rummage_config::Config;
use rummage_extract::{ExtractOptions, KeywordSet};
use rummage_library::audit::{AuditLog, AuditSink};
use rummage_library::{Context, FileReport, Layout, ScanEvent, ScanState, Summary, default_concurrency};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// How a command that ran to the end went.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Success,
    /// Finished, but some files errored or could not be moved.
    Failures,
    Interrupted,
}
impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Success => ExitCode::SUCCESS,
            Status::Failures => ExitCode::from(1),
            Status::Interrupted => ExitCode::from(130),
        }
    }
}

pub async fn run(cli: Cli, cancel: CancellationToken) -> Result<Status> {
    let quiet = cli.quiet > 0;
    let overrides = match &cli.command {
        Command::Scan(args) => args.overrides(),
        Command::Stats(target) | Command::Group(target) | Command::Cleanup(target) => target.overrides(),
    };
    let config = rummage_config::load(cli.config.as_deref(), &overrides).or_raise(|| ErrorKind::Config)?;
    match &cli.command {
        Command::Scan(_) => scan(&config, cancel, quiet).await,
        Command::Stats(_) => stats(&config).await,
        Command::Group(_) => group(&config).await,
        Command::Cleanup(_) => cleanup(&config),
    }
}

/// Output layout plus an audit log appending to its `log.txt`.
fn open_output(config: &Config) -> Result<(Layout, Arc<dyn AuditSink>)> {
    let output_root = config.output_root().or_raise(|| ErrorKind::Config)?;
    let layout = Layout::create(output_root).or_raise(|| ErrorKind::Layout)?;
    let audit = AuditLog::open(layout.audit_log()).or_raise(|| ErrorKind::Layout)?;
    Ok((layout, Arc::new(audit)))
}

fn work_root(config: &Config) -> Result<PathBuf> {
    let root = config.scan_root().or_raise(|| ErrorKind::Config)?;
    std::fs::canonicalize(root).or_raise(|| ErrorKind::Config)
}

#[instrument(skip_all, fields(scan_root, output_root))]
async fn scan(config: &Config, cancel: CancellationToken, quiet: bool) -> Result<Status> {
    let scan_root = work_root(config)?;
    let keywords_file = config.keywords_file().or_raise(|| ErrorKind::Config)?;
    let keywords = KeywordSet::load(keywords_file, config.keyword_mode).or_raise(|| ErrorKind::Keywords)?;
    let (layout, audit) = open_output(config)?;
    tracing::Span::current()
        .record("scan_root", tracing::field::display(scan_root.display()))
        .record("output_root", tracing::field::display(layout.root().display()));
    tracing::info!(keywords = keywords.len(), mode = %keywords.mode(), "loaded keywords");

    let ctx = Context::new(&scan_root, layout, keywords, Arc::clone(&audit))
        .with_options(ExtractOptions { row_limit: config.row_limit })
        .with_concurrency(config.concurrency.unwrap_or_else(default_concurrency))
        .with_cancellation(cancel);
    let ctx = Arc::new(ctx);
    let state = ScanState::new();

    let mut first_level_failures = 0;
    if config.expand_first {
        let reports = rummage_library::expand_first_level(Arc::clone(&ctx), &state).await.or_raise(|| ErrorKind::Scan)?;
        first_level_failures = reports.iter().filter(|report| report.is_failure()).count();
        tracing::info!(archives = reports.len(), failed = first_level_failures, "expanded first-level archives");
    }

    let mut progress = Progress::new(quiet);
    let mut events = std::pin::pin!(rummage_library::scan(Arc::clone(&ctx), state));
    let mut summary = None;
    let mut last_error = None;
    while let Some(event) = events.next().await {
        match event {
            Ok(ScanEvent::Complete(done)) => summary = Some(done),
            Ok(ScanEvent::Handled(report)) => {
                if report.is_failure() {
                    progress.println(failure_line(&report));
                }
                progress.update(&ScanEvent::Handled(report));
            },
            Ok(event) => progress.update(&event),
            Err(e) => {
                tracing::warn!(error = ?e, "scan error");
                last_error = Some(e);
            },
        }
    }
    let Some(summary) = summary else {
        progress.finish("scan aborted");
        return match last_error {
            Some(e) => Err(e).or_raise(|| ErrorKind::Scan),
            None => exn::bail!(ErrorKind::Scan),
        };
    };
    progress.finish(summary_line(&summary));
    tracing::info!(
        passes = summary.passes,
        files = summary.files,
        processed = summary.processed,
        errored = summary.errored,
        unsupported = summary.unsupported,
        matches = summary.matches,
        "scan finished"
    );
    if summary.cancelled {
        return Ok(Status::Interrupted);
    }

    let mut status = if summary.has_failures() || first_level_failures > 0 { Status::Failures } else { Status::Success };
    if config.cleanup
        && let Err(e) = rummage_library::cleanup(ctx.scan_root(), &ctx.excluded(), audit.as_ref())
    {
        tracing::error!(error = ?e, "cleanup failed");
        status = Status::Failures;
    }
    Ok(status)
}

fn failure_line(report: &FileReport) -> String {
    match &report.organized.moved_to {
        Some(moved_to) => format!("failed: {} -> {}", report.path.display(), moved_to.display()),
        None => format!("failed: {} (left in place)", report.path.display()),
    }
}

fn summary_line(summary: &Summary) -> String {
    format!(
        "{} files in {} passes: {} processed, {} errored, {} unsupported, {} matches",
        summary.files, summary.passes, summary.processed, summary.errored, summary.unsupported, summary.matches
    )
}

#[instrument(skip_all)]
async fn stats(config: &Config) -> Result<Status> {
    let root = work_root(config)?;
    let (layout, audit) = open_output(config)?;
    let stats = rummage_library::stats::collect(&root, exclusions(&root, layout.root()), audit.as_ref())
        .await
        .or_raise(|| ErrorKind::Stats)?;
    stats.write_json(&layout.stats()).or_raise(|| ErrorKind::Stats)?;
    for (detected, count) in stats.iter() {
        println!("{count:>8}  {detected}");
    }
    println!("{:>8}  total", stats.total());
    Ok(Status::Success)
}

#[instrument(skip_all)]
async fn group(config: &Config) -> Result<Status> {
    let root = work_root(config)?;
    let (layout, audit) = open_output(config)?;
    let exclude = exclusions(&root, layout.root());
    let grouped = rummage_library::group::group_by_extension(&root, &layout.grouped(), exclude, audit)
        .await
        .or_raise(|| ErrorKind::Group)?;
    println!("{} files grouped into {}, {} failed", grouped.moved, layout.grouped().display(), grouped.failed);
    Ok(if grouped.failed > 0 { Status::Failures } else { Status::Success })
}

#[instrument(skip_all)]
fn cleanup(config: &Config) -> Result<Status> {
    let root = work_root(config)?;
    let (layout, audit) = open_output(config)?;
    let exclude = exclusions(&root, layout.root());
    let removed = rummage_library::cleanup(&root, &exclude, audit.as_ref()).or_raise(|| ErrorKind::Cleanup)?;
    println!("{removed} empty directories removed");
    Ok(Status::Success)
}

/// The output directory, when it sits inside the tree being worked on.
fn exclusions(root: &Path, output: &Path) -> Vec<PathBuf> {
    if output.starts_with(root) && output != root { vec![output.to_path_buf()] } else { Vec::new() }
}
