use chatmark_core::{RecoveryDecision, RecoveryPolicy, RecoverySettings, StopReason};
use export_logging::export_debug;

use crate::page::ScrollRegion;
use crate::types::{ExportEvent, ExportProgress, ProgressSink, Stage};

/// What one recovery run did. The pipeline proceeds regardless of the stop
/// reason; the report exists for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReport {
    pub rounds: u32,
    pub reason: Option<StopReason>,
    pub final_extent: u64,
}

/// Drives a virtualized scroll container until its full history is
/// materialized, or until the round ceiling.
///
/// Each round scrolls to the origin, nudges the page's lazy-load listener
/// with a synthetic wheel gesture, then sleeps so the host page can render.
/// Convergence detection lives in [`RecoveryPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryLoader {
    settings: RecoverySettings,
}

impl HistoryLoader {
    pub fn new(settings: RecoverySettings) -> Self {
        Self { settings }
    }

    pub async fn recover(
        &self,
        region: Option<&dyn ScrollRegion>,
        sink: &dyn ProgressSink,
    ) -> RecoveryReport {
        let Some(region) = region else {
            export_debug!("no scroll region; skipping history recovery");
            return RecoveryReport {
                rounds: 0,
                reason: None,
                final_extent: 0,
            };
        };

        let mut policy = RecoveryPolicy::begin(self.settings, region.extent().await);
        loop {
            sink.emit(ExportEvent::Progress(ExportProgress {
                stage: Stage::Recovering,
                status: format!("loading round {}", policy.next_round()),
            }));

            region.reset_to_origin().await;
            region.nudge().await;
            tokio::time::sleep(self.settings.round_delay).await;

            let extent = region.extent().await;
            if let RecoveryDecision::Stop(reason) = policy.observe(extent) {
                export_debug!(
                    "history recovery stopped after {} rounds ({reason:?}), extent {}",
                    policy.rounds_completed(),
                    policy.baseline()
                );
                return RecoveryReport {
                    rounds: policy.rounds_completed(),
                    reason: Some(reason),
                    final_extent: policy.baseline(),
                };
            }
        }
    }
}
