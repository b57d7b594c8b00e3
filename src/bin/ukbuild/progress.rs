//! Spinner rendering of stage events.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use ukbuild::builder::events::{StageEvent, StageObserver};

/// Shows the running stage on a spinner and prints one line per finished
/// or failed stage above it.
pub struct SpinnerObserver {
    pb: ProgressBar,
}

impl SpinnerObserver {
    pub fn new() -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        SpinnerObserver { pb }
    }
}

impl StageObserver for SpinnerObserver {
    fn on_event(&self, event: &StageEvent) {
        match event {
            StageEvent::StageStarted {
                target,
                stage,
                label,
            } => {
                let message = label
                    .clone()
                    .unwrap_or_else(|| format!("{} {}", stage.verb(), target));
                self.pb.set_message(message);
                self.pb.enable_steady_tick(Duration::from_millis(100));
            }
            StageEvent::StageFinished {
                target,
                stage,
                duration_ms,
            } => {
                self.pb.println(format!(
                    "    Finished {} {} in {:.2}s",
                    stage,
                    target,
                    *duration_ms as f64 / 1000.0
                ));
            }
            StageEvent::StageFailed {
                target,
                stage,
                message,
            } => {
                self.pb
                    .println(format!("      Failed {} {}: {}", stage, target, message));
            }
            StageEvent::StageSkipped { .. } => {}
            StageEvent::BuildFinished { .. } => self.pb.finish_and_clear(),
        }
    }
}

impl Drop for SpinnerObserver {
    fn drop(&mut self) {
        if !self.pb.is_finished() {
            self.pb.finish_and_clear();
        }
    }
}
