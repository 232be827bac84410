//! Pipeline Step Events
//!
//! Broadcast channel carrying named step descriptions toward an attached
//! UI. Purely informational: no acknowledgement is expected, emission
//! never blocks, and absent receivers are normal operation.

use tokio::sync::broadcast;

/// Events emitted across one pipeline invocation
#[derive(Debug, Clone)]
pub enum StepEvent {
    /// A named pipeline phase started ("reading directory tree",
    /// "checking analysis cache", "polishing analysis", ...)
    Step { description: String },
    /// Scanning milestone with the running entry count
    ScanProgress { entries: usize },
    /// Pipeline finished
    Finished { from_cache: bool },
}

/// Step event reporter, cheap to clone and share across stages
#[derive(Clone)]
pub struct StepReporter {
    sender: broadcast::Sender<StepEvent>,
}

impl Default for StepReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StepReporter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StepEvent> {
        self.sender.subscribe()
    }

    /// Send an event. Silently discards if no receivers are listening.
    fn emit(&self, event: StepEvent) {
        let _ = self.sender.send(event);
    }

    pub fn step(&self, description: &str) {
        tracing::debug!("Pipeline step: {}", description);
        self.emit(StepEvent::Step {
            description: description.to_string(),
        });
    }

    pub fn scan_progress(&self, entries: usize) {
        self.emit(StepEvent::ScanProgress { entries });
    }

    pub fn finished(&self, from_cache: bool) {
        self.emit(StepEvent::Finished { from_cache });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_reach_subscriber() {
        let reporter = StepReporter::new();
        let mut rx = reporter.subscribe();

        reporter.step("reading directory tree");
        reporter.scan_progress(50);
        reporter.finished(false);

        assert!(matches!(rx.recv().await.unwrap(), StepEvent::Step { .. }));
        assert!(matches!(
            rx.recv().await.unwrap(),
            StepEvent::ScanProgress { entries: 50 }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            StepEvent::Finished { from_cache: false }
        ));
    }

    #[test]
    fn test_emit_without_receivers_is_fine() {
        let reporter = StepReporter::new();
        reporter.step("checking analysis cache");
    }
}
