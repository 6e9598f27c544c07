/// Per-download progress reporting.
///
/// With a known content length progress renders as a bounded bar with a
/// percentage; without one it renders as a spinner and a byte counter.
/// Lines go through tracing on the `fanfetch::progress` target.
use tokio::time::{Duration, Instant};
use tracing::info;

/// Minimum time between two progress lines for the same download.
const REPORT_INTERVAL: Duration = Duration::from_millis(500);

/// Minimum percentage change between two bounded progress lines.
const MIN_PERCENT_STEP: u8 = 5;

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

pub struct ProgressTracker {
    task_id: String,
    url: String,
    total: Option<u64>,
    transferred: u64,
    ticks: usize,
    started: Instant,
    last_report: Option<Instant>,
    last_percent: Option<u8>,
}

impl ProgressTracker {
    pub fn new(task_id: &str, url: &str, total: Option<u64>) -> Self {
        Self {
            task_id: task_id.to_string(),
            url: url.to_string(),
            // A declared length of zero gives no useful bar.
            total: total.filter(|t| *t > 0),
            transferred: 0,
            ticks: 0,
            started: Instant::now(),
            last_report: None,
            last_percent: None,
        }
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn is_bounded(&self) -> bool {
        self.total.is_some()
    }

    pub fn percent(&self) -> Option<u8> {
        self.total.map(|total| {
            let pct = self.transferred.saturating_mul(100) / total;
            pct.min(100) as u8
        })
    }

    /// Record `n` more bytes and emit a line if the throttle allows.
    pub fn advance(&mut self, n: u64) {
        self.transferred += n;
        self.ticks += 1;
        if self.should_report(Instant::now()) {
            self.report();
        }
    }

    /// Emit the final line for this download.
    pub fn finish(&mut self) {
        self.report();
    }

    fn should_report(&self, now: Instant) -> bool {
        let Some(last) = self.last_report else {
            return true;
        };
        if now.duration_since(last) < REPORT_INTERVAL {
            return false;
        }
        match (self.percent(), self.last_percent) {
            (Some(pct), Some(last_pct)) => pct.saturating_sub(last_pct) >= MIN_PERCENT_STEP,
            _ => true,
        }
    }

    fn report(&mut self) {
        info!(
            target: "fanfetch::progress",
            task = %self.task_id,
            "{} {}",
            self.url,
            self.render()
        );
        self.last_report = Some(Instant::now());
        self.last_percent = self.percent();
    }

    /// Render the current state as one line of text.
    pub fn render(&self) -> String {
        let elapsed = self.started.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            format!("{}/s", human_bytes((self.transferred as f64 / elapsed) as u64))
        } else {
            "-".to_string()
        };

        match (self.total, self.percent()) {
            (Some(total), Some(pct)) => format!(
                "{} {}% {}/{} {}",
                progress_bar(pct),
                pct,
                human_bytes(self.transferred),
                human_bytes(total),
                rate
            ),
            _ => format!(
                "{} {} {}",
                SPINNER[self.ticks % SPINNER.len()],
                human_bytes(self.transferred),
                rate
            ),
        }
    }
}

/// Generate a simple text progress bar.
pub fn progress_bar(percent: u8) -> String {
    let filled = (percent.min(100) as usize) / 5; // 20 chars total
    let empty = 20_usize.saturating_sub(filled);
    format!("[{}{}]", "=".repeat(filled), " ".repeat(empty))
}

/// Format a byte count with decimal units, e.g. 4_248_578 -> "4.25 MB".
pub fn human_bytes(num: u64) -> String {
    const UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];
    if num < 1000 {
        return format!("{} B", num);
    }
    let mut value = num as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_bounds() {
        assert_eq!(progress_bar(0), format!("[{}]", " ".repeat(20)));
        assert_eq!(progress_bar(50), format!("[{}{}]", "=".repeat(10), " ".repeat(10)));
        assert_eq!(progress_bar(100), format!("[{}]", "=".repeat(20)));
        assert_eq!(progress_bar(250), progress_bar(100));
    }

    #[test]
    fn test_human_bytes() {
        assert_eq!(human_bytes(999), "999 B");
        assert_eq!(human_bytes(4_248_578), "4.25 MB");
        assert_eq!(human_bytes(4_248_578_547), "4.25 GB");
    }

    #[tokio::test]
    async fn test_bounded_percent() {
        let mut tracker = ProgressTracker::new("t1", "https://example.com", Some(200));
        assert!(tracker.is_bounded());
        tracker.advance(50);
        assert_eq!(tracker.percent(), Some(25));
        tracker.advance(300);
        assert_eq!(tracker.percent(), Some(100));
        assert!(tracker.render().contains("100%"));
    }

    #[tokio::test]
    async fn test_unknown_length_renders_counter() {
        let mut tracker = ProgressTracker::new("t1", "https://example.com", None);
        tracker.advance(1500);
        assert!(!tracker.is_bounded());
        assert_eq!(tracker.percent(), None);
        let line = tracker.render();
        assert!(line.contains("1.50 kB"));
        assert!(!line.contains('%'));
    }

    #[tokio::test]
    async fn test_zero_length_is_unbounded() {
        let tracker = ProgressTracker::new("t1", "https://example.com", Some(0));
        assert!(!tracker.is_bounded());
    }

    #[tokio::test]
    async fn test_throttle() {
        let mut tracker = ProgressTracker::new("t1", "https://example.com", Some(1000));
        let start = Instant::now();
        assert!(tracker.should_report(start));

        tracker.advance(10);
        let reported = tracker.last_report.unwrap();
        // Too soon.
        assert!(!tracker.should_report(reported + Duration::from_millis(100)));
        // Late enough but under the percent step.
        tracker.transferred = 30;
        assert!(!tracker.should_report(reported + REPORT_INTERVAL));
        tracker.transferred = 200;
        assert!(tracker.should_report(reported + REPORT_INTERVAL));
    }
}
