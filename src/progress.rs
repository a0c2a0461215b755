use indicatif::{ProgressBar, ProgressStyle};
use rummage_library::ScanEvent;
use std::time::Duration;

/// Spinner on stderr that follows the scan events. Hidden with `--quiet`.
pub struct Progress {
    bar: ProgressBar,
    pass: u32,
    files: usize,
}
impl Progress {
    pub fn new(hidden: bool) -> Self {
        let bar = if hidden { ProgressBar::hidden() } else { ProgressBar::new_spinner() };
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar, pass: 0, files: 0 }
    }

    pub fn update(&mut self, event: &ScanEvent) {
        match event {
            ScanEvent::Started => self.bar.set_message("starting"),
            ScanEvent::PassStarted(pass) => {
                self.pass = *pass;
                self.bar.set_message(format!("pass {pass}: {} files so far", self.files));
            },
            ScanEvent::Handled(report) => {
                self.files += 1;
                let name = report.path.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
                self.bar.set_message(format!("pass {}: {} files, {name}", self.pass, self.files));
            },
            ScanEvent::Expanded { archive, members } => {
                let name = archive.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
                self.bar.set_message(format!("expanded {name} ({} members)", members.len()));
            },
            ScanEvent::RestartRequested => self.bar.set_message("restarting enumeration"),
            ScanEvent::Cancelled => self.bar.set_message("cancelled, finishing files in flight"),
            ScanEvent::Complete(_) => {},
        }
    }

    /// Print a line above the spinner without tearing it.
    pub fn println(&self, line: impl AsRef<str>) {
        self.bar.println(line);
    }

    pub fn finish(&self, message: impl Into<String>) {
        self.bar.finish_with_message(message.into());
    }
}
