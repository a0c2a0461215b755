use derive_more::Display;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Where the scan loop is.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum Phase {
    /// Working through an enumeration of the scan root.
    #[display("scanning")]
    Scanning,
    /// An archive was met; the current enumeration is abandoned and a fresh
    /// one starts.
    #[display("restart requested")]
    RestartRequested,
    /// A whole enumeration went by without meeting an archive.
    #[display("done")]
    Done,
}

/// Every path the scan has taken on, across all passes.
///
/// A file still sitting in the scan root on a later pass (because it could not
/// be moved) is never handled twice.
#[derive(Debug, Default)]
pub struct Visited(Mutex<HashSet<PathBuf>>);
impl Visited {
    /// `true` if `path` had not been visited yet.
    pub fn insert(&self, path: &Path) -> bool {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).insert(path.to_path_buf())
    }

    /// Freshly unpacked archive members may reuse the name of a file that
    /// has already been handled and moved away.
    pub fn forget(&self, paths: &[PathBuf]) {
        let mut visited = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        for path in paths {
            visited.remove(path);
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).contains(path)
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Scan loop state: phase, pass counter and the visited set.
///
/// The enumeration itself lives in the loop; it is recreated at the start of
/// each pass and dropped when the pass ends.
#[derive(Clone, Debug)]
pub struct ScanState {
    phase: Phase,
    pass: u32,
    visited: Arc<Visited>,
}
impl Default for ScanState {
    fn default() -> Self {
        Self::new()
    }
}
impl ScanState {
    pub fn new() -> Self {
        Self { phase: Phase::Scanning, pass: 0, visited: Arc::default() }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Passes started so far.
    pub fn pass(&self) -> u32 {
        self.pass
    }

    pub fn visited(&self) -> &Arc<Visited> {
        &self.visited
    }

    /// `true` the first time `path` is seen.
    pub fn visit(&self, path: &Path) -> bool {
        self.visited.insert(path)
    }

    pub(crate) fn begin_pass(&mut self) -> u32 {
        self.pass += 1;
        self.phase = Phase::Scanning;
        self.pass
    }

    pub(crate) fn request_restart(&mut self) {
        self.phase = Phase::RestartRequested;
    }

    pub(crate) fn finish(&mut self) {
        self.phase = Phase::Done;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions() {
        let mut state = ScanState::new();
        assert_eq!((state.phase(), state.pass()), (Phase::Scanning, 0));
        assert_eq!(state.begin_pass(), 1);
        state.request_restart();
        assert_eq!(state.phase(), Phase::RestartRequested);
        assert_eq!(state.begin_pass(), 2);
        assert_eq!(state.phase(), Phase::Scanning);
        state.finish();
        assert_eq!((state.phase(), state.pass()), (Phase::Done, 2));
    }

    #[test]
    fn visited_survives_restarts_and_clones() {
        let mut state = ScanState::new();
        state.begin_pass();
        assert!(state.visit(Path::new("/scan/a.txt")));
        state.request_restart();
        state.begin_pass();
        assert!(!state.visit(Path::new("/scan/a.txt")));

        let shared = state.clone();
        assert!(shared.visited().contains(Path::new("/scan/a.txt")));
        assert!(shared.visit(Path::new("/scan/b.txt")));
        assert_eq!(state.visited().len(), 2);

        state.visited().forget(&[PathBuf::from("/scan/a.txt")]);
        assert!(state.visit(Path::new("/scan/a.txt")));
    }
}
