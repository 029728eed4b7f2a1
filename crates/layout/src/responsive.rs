//! Responsive column resolution and resize debouncing.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

/// Narrowest a column may get before the grid drops a column.
pub const MIN_COLUMN_WIDTH: f64 = 160.0;

/// Largest column count in `1..=max_columns` whose columns are at least
/// [`MIN_COLUMN_WIDTH`] wide once gaps are subtracted. Falls back to 1.
pub fn resolve_columns(container_width: f64, max_columns: u32, cell_gap: f64) -> u32 {
    let gap = if cell_gap.is_finite() { cell_gap.max(0.0) } else { 0.0 };
    (1..=max_columns.max(1))
        .rev()
        .find(|&cols| {
            let available = (container_width - gap * f64::from(cols - 1)) / f64::from(cols);
            available >= MIN_COLUMN_WIDTH
        })
        .unwrap_or(1)
}

/// Collapses a burst of width observations into one settled width once the
/// input has been quiet for the configured interval.
#[derive(Debug, Clone)]
pub struct ResizeDebouncer {
    quiet: Duration,
    pending: Option<(f64, Instant)>,
    last_emitted: Option<f64>,
}

impl ResizeDebouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
            last_emitted: None,
        }
    }

    /// Record a width reading. Non-finite or negative readings are dropped.
    pub fn observe(&mut self, width: f64) {
        if width.is_finite() && width >= 0.0 {
            self.pending = Some((width, Instant::now()));
        }
    }

    /// When the pending reading will be considered settled.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|(_, at)| at + self.quiet)
    }

    /// Take the pending width if it has settled and differs from the last one
    /// emitted.
    pub fn poll(&mut self) -> Option<f64> {
        let (width, at) = self.pending?;
        if Instant::now().duration_since(at) < self.quiet {
            return None;
        }
        self.take_pending(width)
    }

    /// Emit whatever is pending regardless of the quiet interval.
    pub fn flush(&mut self) -> Option<f64> {
        let (width, _) = self.pending?;
        self.take_pending(width)
    }

    fn take_pending(&mut self, width: f64) -> Option<f64> {
        self.pending = None;
        if self.last_emitted == Some(width) {
            return None;
        }
        self.last_emitted = Some(width);
        Some(width)
    }
}

/// Drive a [`ResizeDebouncer`] from a stream of raw widths, forwarding settled
/// widths to `settled`. Returns when the input closes (after flushing) or
/// the output is dropped.
pub async fn debounce_resizes(
    mut widths: mpsc::Receiver<f64>,
    settled: mpsc::Sender<f64>,
    quiet: Duration,
) {
    let mut debouncer = ResizeDebouncer::new(quiet);
    loop {
        let deadline = debouncer.deadline();
        tokio::select! {
            reading = widths.recv() => match reading {
                Some(width) => debouncer.observe(width),
                None => {
                    if let Some(width) = debouncer.flush() {
                        let _ = settled.send(width).await;
                    }
                    return;
                }
            },
            _ = async {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            } => {
                if let Some(width) = debouncer.poll() {
                    debug!(width, "Container width settled");
                    if settled.send(width).await.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_reference_width() {
        // 4 columns: (650 - 24) / 4 = 156.5 < 160; 3 columns: 211.3
        assert_eq!(resolve_columns(650.0, 4, 8.0), 3);
    }

    #[test]
    fn narrow_and_degenerate_inputs_fall_back_to_one() {
        assert_eq!(resolve_columns(100.0, 4, 8.0), 1);
        assert_eq!(resolve_columns(0.0, 4, 8.0), 1);
        assert_eq!(resolve_columns(f64::NAN, 4, 8.0), 1);
        assert_eq!(resolve_columns(2000.0, 0, 8.0), 1);
    }

    #[test]
    fn wide_container_uses_max_columns() {
        assert_eq!(resolve_columns(1200.0, 4, 8.0), 4);
        assert_eq!(resolve_columns(664.0, 4, 8.0), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn debouncer_waits_for_quiet_period() {
        let mut debouncer = ResizeDebouncer::new(Duration::from_millis(100));
        debouncer.observe(500.0);
        tokio::time::advance(Duration::from_millis(50)).await;
        debouncer.observe(520.0);
        assert_eq!(debouncer.poll(), None);

        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(debouncer.poll(), Some(520.0));

        debouncer.observe(520.0);
        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(debouncer.poll(), None, "unchanged width is not re-emitted");
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_task_coalesces_bursts() {
        let (raw_tx, raw_rx) = mpsc::channel(16);
        let (out_tx, mut out_rx) = mpsc::channel(16);
        let task = tokio::spawn(debounce_resizes(raw_rx, out_tx, Duration::from_millis(80)));

        for width in [300.0, 310.0, 320.0] {
            raw_tx.send(width).await.unwrap();
        }
        assert_eq!(out_rx.recv().await, Some(320.0));

        raw_tx.send(900.0).await.unwrap();
        drop(raw_tx);
        assert_eq!(out_rx.recv().await, Some(900.0));
        task.await.unwrap();
    }
}
