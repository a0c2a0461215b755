use flate2::Compression;
use flate2::write::GzEncoder;
use futures::TryStreamExt;
use rummage_extract::{KeywordMode, KeywordSet};
use rummage_library::audit::{AuditLog, Operation};
use rummage_library::scan::Handling;
use rummage_library::{Context, Layout, ScanEvent, ScanState, Summary, cleanup, expand_first_level, scan};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

struct Workspace {
    _dir: TempDir,
    scan: PathBuf,
    layout: Layout,
}
impl Workspace {
    fn new(files: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().unwrap();
        let scan = dir.path().join("scan");
        fs::create_dir_all(&scan).unwrap();
        for (name, contents) in files {
            let path = scan.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
        let layout = Layout::create(dir.path().join("out")).unwrap();
        let scan = fs::canonicalize(scan).unwrap();
        Self { _dir: dir, scan, layout }
    }

    fn with_file(self, name: &str, contents: &[u8]) -> Self {
        let path = self.scan.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
        self
    }

    fn context(&self, keywords: &[&str], concurrency: usize) -> Arc<Context> {
        let keywords = KeywordSet::new(keywords, KeywordMode::Literal).unwrap();
        let audit = Arc::new(AuditLog::open(self.layout.audit_log()).unwrap());
        Arc::new(Context::new(&self.scan, self.layout.clone(), keywords, audit).with_concurrency(concurrency))
    }

    fn out(&self, relative: &str) -> PathBuf {
        self.layout.root().join(relative)
    }

    fn results(&self, keyword: &str) -> String {
        fs::read_to_string(self.layout.results().join(format!("{keyword}.txt"))).unwrap_or_default()
    }

    fn audit(&self) -> String {
        fs::read_to_string(self.layout.audit_log()).unwrap()
    }
}

fn tar_gz(members: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, contents) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, contents.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

async fn run(ctx: Arc<Context>) -> (Vec<ScanEvent>, Summary) {
    let events: Vec<_> = scan(ctx, ScanState::new()).try_collect().await.unwrap();
    let summary = match events.last() {
        Some(ScanEvent::Complete(summary)) => summary.clone(),
        other => panic!("scan did not complete: {other:?}"),
    };
    (events, summary)
}

fn files_under(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = fs::read_dir(root) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(files_under(&path));
            } else {
                files.push(path);
            }
        }
    }
    files
}

#[tokio::test]
async fn notes_scenario() {
    let ws = Workspace::new(&[("notes.txt", "budget keyword here\n")]);
    let (_, summary) = run(ws.context(&["budget"], 1)).await;

    assert_eq!((summary.files, summary.processed, summary.matches), (1, 1, 1));
    let results = ws.results("budget");
    let lines: Vec<_> = results.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with(&format!("{}---budget", ws.scan.join("notes.txt").display())));
    assert!(ws.out("processed/notes.txt").is_file());
    assert!(!ws.scan.join("notes.txt").exists());
}

#[tokio::test]
async fn archive_scenario() {
    let archive = tar_gz(&[("secret.txt", "the budget is a secret")]);
    let ws = Workspace::new(&[]).with_file("archive.tar.gz", &archive);
    let (events, summary) = run(ws.context(&["budget"], 2)).await;

    assert_eq!(summary.passes, 2);
    assert_eq!(summary.expansions, 1);
    assert_eq!(summary.files, 2);
    assert!(events.iter().any(|event| matches!(event, ScanEvent::RestartRequested)));
    assert!(ws.out("processed/archive.tar.gz").is_file());
    assert!(ws.out("processed/secret.txt").is_file());
    assert!(ws.results("budget").starts_with(&format!("{}---the budget", ws.scan.join("secret.txt").display())));
    assert!(ws.audit().contains(&format!("[expand Success]{}", ws.scan.join("archive.tar.gz").display())));
}

#[tokio::test]
async fn nested_archive_takes_three_passes() {
    let inner = tar_gz(&[("deep.txt", "budget deep down")]);
    let mut outer = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    let mut header = tar::Header::new_gnu();
    header.set_size(inner.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    outer.append_data(&mut header, "docs/inner.tgz", inner.as_slice()).unwrap();
    let outer = outer.into_inner().unwrap().finish().unwrap();
    let ws = Workspace::new(&[]).with_file("outer.tar.gz", &outer);

    let (_, summary) = run(ws.context(&["budget"], 4)).await;
    assert_eq!((summary.passes, summary.expansions, summary.matches), (3, 2, 1));
    // Every archive expands into the scan root, however deep it was found.
    assert!(ws.out("processed/docs/inner.tgz").is_file());
    assert!(ws.out("processed/deep.txt").is_file());
    assert!(!ws.out("processed/docs/deep.txt").exists());
}

#[tokio::test]
async fn every_file_ends_in_exactly_one_tree() {
    let ws = Workspace::new(&[
        ("a/plain.txt", "nothing to see"),
        ("a/match.txt", "budget"),
        ("b/blob.bin", "\x00\x01\x02\x03"),
        ("b/empty.txt", ""),
        ("c/broken.pdf", "%PDF-1.4\n/Encrypt 1 0 R"),
        ("c/odd name!.txt", "Budget with a bad name"),
    ]);
    let (_, summary) = run(ws.context(&["budget"], 3)).await;

    assert_eq!(summary.files, 6);
    assert_eq!((summary.processed, summary.errored, summary.unsupported), (3, 1, 2));
    assert_eq!(summary.unmoved, 0);
    assert!(summary.has_failures());
    assert!(files_under(&ws.scan).is_empty());
    let processed = files_under(&ws.out("processed"));
    let error = files_under(&ws.out("error"));
    let unsupported = files_under(&ws.out("unsupported"));
    assert_eq!(processed.len() + error.len() + unsupported.len(), 6);
    assert!(ws.out("processed/c/oddname.txt").is_file());
    assert!(ws.out("error/c/broken.pdf").is_file());
    assert_eq!(fs::read(ws.out("unsupported/b/blob.bin")).unwrap(), b"\x00\x01\x02\x03");
}

#[tokio::test]
async fn collisions_with_previous_runs_keep_both_files() {
    let ws = Workspace::new(&[("report.csv", "first")]);
    let (_, summary) = run(ws.context(&["budget"], 1)).await;
    assert_eq!(summary.processed, 1);

    fs::write(ws.scan.join("report.csv"), "second").unwrap();
    run(ws.context(&["budget"], 1)).await;

    let mut contents: Vec<_> =
        files_under(&ws.out("processed")).iter().map(|path| fs::read_to_string(path).unwrap()).collect();
    contents.sort();
    assert_eq!(contents, vec!["first", "second"]);
}

#[tokio::test]
async fn corrupt_archive_goes_to_error_without_restart_loop() {
    let mut archive = tar_gz(&[("x.txt", "budget")]);
    archive.truncate(archive.len() / 2);
    let ws = Workspace::new(&[("keep.txt", "budget")]).with_file("bad.tar.gz", &archive);
    let (events, summary) = run(ws.context(&["budget"], 1)).await;

    assert_eq!(summary.expansions, 0);
    assert!(summary.passes <= 2);
    assert!(ws.out("error/bad.tar.gz").is_file());
    assert!(ws.out("processed/keep.txt").is_file());
    let failed = events.iter().any(|event| {
        matches!(event, ScanEvent::Handled(report) if matches!(report.handling, Handling::Failed(_)))
    });
    assert!(failed);
    assert!(ws.audit().contains("[expand Failed]"));
}

#[tokio::test]
async fn first_level_then_scan_then_cleanup() {
    let archive = tar_gz(&[("inbox/mail.txt", "budget attached")]);
    let ws = Workspace::new(&[("deep/er/notes.txt", "no match")]).with_file("bundle.tgz", &archive);
    let ctx = ws.context(&["budget"], 2);
    let state = ScanState::new();

    let pre = expand_first_level(ctx.clone(), &state).await.unwrap();
    assert_eq!(pre.len(), 1);
    assert!(ws.scan.join("inbox/mail.txt").is_file());

    let events: Vec<_> = scan(ctx.clone(), state).try_collect().await.unwrap();
    let Some(ScanEvent::Complete(summary)) = events.last() else { panic!("scan did not complete") };
    assert_eq!((summary.passes, summary.files, summary.matches), (1, 2, 1));

    let audit = AuditLog::open(ws.layout.audit_log()).unwrap();
    let removed = cleanup(&ws.scan, &ctx.excluded(), &audit).unwrap();
    assert_eq!(removed, 4);
    assert!(!ws.scan.exists());
    let log = ws.audit();
    assert!(log.contains(&format!("[cleanup Success]{}", ws.scan.display())));
    assert!(log.lines().all(|line| line.starts_with('[')));
    assert!(log.contains(&format!("[{} Success]", Operation::Organize)));
}

#[tokio::test]
async fn output_nested_in_scan_root_survives_scan_and_cleanup() {
    let dir = TempDir::new().unwrap();
    let scan_root = dir.path().join("scan");
    fs::create_dir_all(scan_root.join("sub")).unwrap();
    fs::write(scan_root.join("sub/notes.txt"), "budget").unwrap();
    let scan_root = fs::canonicalize(scan_root).unwrap();
    let layout = Layout::create(scan_root.join("out")).unwrap();
    let keywords = KeywordSet::new(&["budget"], KeywordMode::Literal).unwrap();
    let audit = Arc::new(AuditLog::open(layout.audit_log()).unwrap());
    let ctx = Arc::new(Context::new(&scan_root, layout.clone(), keywords, audit.clone()));

    let (_, summary) = run(Arc::clone(&ctx)).await;
    assert_eq!((summary.files, summary.processed), (1, 1));

    cleanup(&scan_root, &ctx.excluded(), audit.as_ref()).unwrap();
    assert!(!scan_root.join("sub").exists());
    assert!(layout.root().join("processed/sub/notes.txt").is_file());
    assert!(layout.root().join("error").is_dir());
    assert!(layout.root().join("unsupported").is_dir());
    assert!(layout.results().join("budget.txt").is_file());
    assert!(layout.audit_log().is_file());
}
