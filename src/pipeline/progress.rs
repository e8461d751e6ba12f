//! Progress events sent from a running pipeline to its observer.
//!
//! Events go over an unbounded `tokio::sync::mpsc` channel. An event carries
//! the stage, an optional percentage and a status message, which covers both
//! the status-text and the progress-bar views a UI needs.

use std::sync::Mutex;
use tokio::sync::mpsc;

/// Pipeline stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Resolving,
    Downloading,
    Converting,
    Tagging,
    Done,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Resolving => "resolving",
            Stage::Downloading => "downloading",
            Stage::Converting => "converting",
            Stage::Tagging => "tagging",
            Stage::Done => "done",
        }
    }
}

/// One progress update. For [`Stage::Done`] the message is the resolved title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub stage: Stage,
    /// 0-100, when the stage knows how far along it is
    pub percent: Option<u8>,
    pub message: String,
}

impl ProgressEvent {
    /// Status text for a UI's status line
    pub fn status(&self) -> &str {
        &self.message
    }
}

pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

/// Create a progress channel.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

#[derive(Debug)]
struct Cursor {
    stage: Stage,
    percent: Option<u8>,
    message: String,
}

/// Sending half used by the stages.
///
/// Keeps the event sequence monotonic: stages never go backwards and within a
/// stage the percentage never decreases or exceeds 100. A dropped receiver is
/// not an error; updates are simply discarded.
#[derive(Debug)]
pub struct ProgressReporter {
    tx: Option<ProgressSender>,
    cursor: Mutex<Cursor>,
}

impl ProgressReporter {
    pub fn new(tx: ProgressSender) -> Self {
        Self {
            tx: Some(tx),
            cursor: Mutex::new(Cursor {
                stage: Stage::Resolving,
                percent: None,
                message: String::new(),
            }),
        }
    }

    /// A reporter that drops every update.
    pub fn disabled() -> Self {
        Self {
            tx: None,
            cursor: Mutex::new(Cursor {
                stage: Stage::Resolving,
                percent: None,
                message: String::new(),
            }),
        }
    }

    /// Enter `stage` with a status message. Resets the percentage.
    pub fn stage(&self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        let event = {
            let Ok(mut cursor) = self.cursor.lock() else {
                return;
            };
            if stage < cursor.stage {
                tracing::warn!(
                    "Ignoring stage regression {:?} -> {:?}",
                    cursor.stage,
                    stage
                );
                return;
            }
            if stage != cursor.stage {
                cursor.percent = None;
            }
            cursor.stage = stage;
            cursor.message = message.clone();
            ProgressEvent {
                stage,
                percent: None,
                message,
            }
        };
        self.send(event);
    }

    /// Replace the status message within the current stage.
    pub fn status(&self, message: impl Into<String>) {
        let event = {
            let Ok(mut cursor) = self.cursor.lock() else {
                return;
            };
            cursor.message = message.into();
            ProgressEvent {
                stage: cursor.stage,
                percent: None,
                message: cursor.message.clone(),
            }
        };
        self.send(event);
    }

    /// Report a percentage within the current stage (clamped to 0-100 and
    /// never below the previous value).
    pub fn percent(&self, percent: u8) {
        let event = {
            let Ok(mut cursor) = self.cursor.lock() else {
                return;
            };
            let percent = percent.min(100).max(cursor.percent.unwrap_or(0));
            cursor.percent = Some(percent);
            ProgressEvent {
                stage: cursor.stage,
                percent: Some(percent),
                message: cursor.message.clone(),
            }
        };
        self.send(event);
    }

    /// Terminal event carrying the resolved title.
    pub fn done(&self, title: &str) {
        self.stage(Stage::Done, title);
        self.percent(100);
    }

    fn send(&self, event: ProgressEvent) {
        tracing::trace!(
            stage = event.stage.label(),
            percent = ?event.percent,
            "{}",
            event.message
        );
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

/// Percentage of `received` out of `total`, floored; `None` when the total is unknown.
pub fn fraction_percent(received: u64, total: Option<u64>) -> Option<u8> {
    match total {
        Some(total) if total > 0 => {
            let pct = received.saturating_mul(100) / total;
            Some(pct.min(100) as u8)
        }
        _ => None,
    }
}

/// Collect everything currently queued on a receiver.
#[cfg(test)]
pub fn drain(rx: &mut ProgressReceiver) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
