use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const SPINNER_TEMPLATE: &str = "{spinner:.green} {prefix:.bold} [{elapsed_precise}] {msg}";
const TICK: Duration = Duration::from_millis(250);

/// One spinner per disk while the wipe workers run
pub struct WipeProgress {
    multi: MultiProgress,
    hidden: bool,
}

impl WipeProgress {
    pub fn new(hidden: bool) -> Self {
        let multi = if hidden {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };
        Self { multi, hidden }
    }

    /// Spinner for a disk whose worker was just launched
    pub fn start(&self, device: &str, code: &str) -> ProgressBar {
        let style = ProgressStyle::with_template(SPINNER_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(style);
        bar.set_prefix(device.to_string());
        bar.set_message(format!("wiping ({})", code));
        bar.enable_steady_tick(TICK);
        bar
    }

    /// Print a line without tearing the spinners
    pub fn println(&self, line: &str) {
        if !self.hidden {
            self.multi.suspend(|| println!("{}", line));
        }
    }
}

/// Convert a byte count to a readable string
pub(crate) fn human_bytes(bytes: u64) -> String {
    let units = ["B", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0B".to_string();
    }
    let mut val = bytes as f64;
    let mut i = 0usize;
    while val >= 1024.0 && i + 1 < units.len() {
        val /= 1024.0;
        i += 1;
    }
    format!("{:.2}{}", val, units[i])
}

/// Wall-clock duration rounded to whole seconds, e.g. `3h 12m 5s`
pub fn format_elapsed(elapsed: Duration) -> String {
    humantime::format_duration(Duration::from_secs(elapsed.as_secs())).to_string()
}
