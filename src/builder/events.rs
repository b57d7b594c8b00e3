//! Stage events.
//!
//! Every stage of every target reports when it starts, finishes, fails or
//! is skipped. Observers turn these into log lines, progress spinners or
//! machine-readable JSON.
//!
//! # JSON schema
//!
//! Each event serializes to one JSON object with a `reason` field:
//! `stage-started`, `stage-finished`, `stage-failed`, `stage-skipped` or
//! `build-finished`. New fields may be added; existing ones are stable.

use std::fmt;
use std::io::Write;
use std::sync::Mutex;

use serde::Serialize;

/// A pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Configure,
    Prepare,
    Build,
    Pack,
}

impl Stage {
    /// Present participle used in progress messages.
    pub fn verb(&self) -> &'static str {
        match self {
            Stage::Configure => "configuring",
            Stage::Prepare => "preparing",
            Stage::Build => "building",
            Stage::Pack => "packaging",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Configure => "configure",
            Stage::Prepare => "prepare",
            Stage::Build => "build",
            Stage::Pack => "pack",
        };
        f.write_str(s)
    }
}

/// An event emitted while running stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason")]
pub enum StageEvent {
    #[serde(rename = "stage-started")]
    StageStarted {
        target: String,
        stage: Stage,
        /// Human readable description, e.g. `packaging hello (local)`
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },

    #[serde(rename = "stage-finished")]
    StageFinished {
        target: String,
        stage: Stage,
        duration_ms: u64,
    },

    #[serde(rename = "stage-failed")]
    StageFailed {
        target: String,
        stage: Stage,
        message: String,
    },

    #[serde(rename = "stage-skipped")]
    StageSkipped { target: String, stage: Stage },

    /// Every selected target has been processed.
    #[serde(rename = "build-finished")]
    BuildFinished {
        success: bool,
        targets: u64,
        failed: u64,
        duration_ms: u64,
    },
}

impl StageEvent {
    pub fn started(target: impl Into<String>, stage: Stage) -> Self {
        StageEvent::StageStarted {
            target: target.into(),
            stage,
            label: None,
        }
    }

    /// A started event carrying a display label.
    pub fn started_with_label(
        target: impl Into<String>,
        stage: Stage,
        label: impl Into<String>,
    ) -> Self {
        StageEvent::StageStarted {
            target: target.into(),
            stage,
            label: Some(label.into()),
        }
    }

    pub fn finished(target: impl Into<String>, stage: Stage, duration_ms: u64) -> Self {
        StageEvent::StageFinished {
            target: target.into(),
            stage,
            duration_ms,
        }
    }

    pub fn failed(target: impl Into<String>, stage: Stage, message: impl Into<String>) -> Self {
        StageEvent::StageFailed {
            target: target.into(),
            stage,
            message: message.into(),
        }
    }

    pub fn skipped(target: impl Into<String>, stage: Stage) -> Self {
        StageEvent::StageSkipped {
            target: target.into(),
            stage,
        }
    }

    pub fn build_finished(targets: u64, failed: u64, duration_ms: u64) -> Self {
        StageEvent::BuildFinished {
            success: failed == 0,
            targets,
            failed,
            duration_ms,
        }
    }

    /// Serialize this event to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Receives stage events.
pub trait StageObserver: Send + Sync {
    fn on_event(&self, event: &StageEvent);
}

/// Ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StageObserver for NoopObserver {
    fn on_event(&self, _event: &StageEvent) {}
}

/// Logs events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl StageObserver for TracingObserver {
    fn on_event(&self, event: &StageEvent) {
        match event {
            StageEvent::StageStarted {
                target,
                stage,
                label,
            } => match label {
                Some(label) => tracing::info!("{}", label),
                None => tracing::info!("{} {}", stage.verb(), target),
            },
            StageEvent::StageFinished {
                target,
                stage,
                duration_ms,
            } => tracing::debug!("{} of {} finished in {}ms", stage, target, duration_ms),
            StageEvent::StageFailed {
                target,
                stage,
                message,
            } => tracing::error!("{} of {} failed: {}", stage, target, message),
            StageEvent::StageSkipped { target, stage } => {
                tracing::debug!("skipping {} of {}", stage, target)
            }
            StageEvent::BuildFinished {
                success,
                targets,
                failed,
                ..
            } => {
                if *success {
                    tracing::info!("finished {} target(s)", targets);
                } else {
                    tracing::warn!("{} of {} target(s) failed", failed, targets);
                }
            }
        }
    }
}

/// Writes one JSON object per event.
pub struct JsonLinesObserver<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesObserver<W> {
    pub fn new(out: W) -> Self {
        JsonLinesObserver {
            out: Mutex::new(out),
        }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> StageObserver for JsonLinesObserver<W> {
    fn on_event(&self, event: &StageEvent) {
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{}", event.to_json());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_started_serialization() {
        let json = StageEvent::started("hello-qemu-x86_64", Stage::Configure).to_json();
        assert!(json.contains("\"reason\":\"stage-started\""));
        assert!(json.contains("\"stage\":\"configure\""));
        assert!(!json.contains("label"));
    }

    #[test]
    fn test_failed_serialization() {
        let json = StageEvent::failed("hello", Stage::Build, "exit code 2").to_json();
        assert!(json.contains("\"reason\":\"stage-failed\""));
        assert!(json.contains("\"message\":\"exit code 2\""));
    }

    #[test]
    fn test_build_finished_success_flag() {
        let json = StageEvent::build_finished(2, 1, 1500).to_json();
        assert!(json.contains("\"success\":false"));
        assert!(json.contains("\"failed\":1"));
    }

    #[test]
    fn test_json_lines_observer() {
        let observer = JsonLinesObserver::new(Vec::new());
        observer.on_event(&StageEvent::skipped("hello", Stage::Prepare));
        observer.on_event(&StageEvent::finished("hello", Stage::Build, 10));

        let out = String::from_utf8(observer.into_inner()).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("stage-skipped"));
        assert!(lines[1].contains("stage-finished"));
    }
}
