use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chatmark_core::{RecoverySettings, StopReason};
use chatmark_engine::{ExportEvent, HistoryLoader, ProgressSink, ScrollRegion, Stage};
use pretty_assertions::assert_eq;

fn fast_settings() -> RecoverySettings {
    RecoverySettings {
        round_delay: Duration::ZERO,
        ..RecoverySettings::default()
    }
}

#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<ExportEvent>>,
}

impl CollectingSink {
    fn statuses(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                ExportEvent::Progress(p) if p.stage == Stage::Recovering => {
                    Some(p.status.clone())
                }
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for CollectingSink {
    fn emit(&self, event: ExportEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Region whose extent follows a script: index 0 is the measurement taken
/// before the first round, then one entry per round (last entry repeats).
struct ScriptedRegion {
    extents: Vec<u64>,
    calls: AtomicUsize,
    resets: AtomicU32,
    nudges: AtomicU32,
}

impl ScriptedRegion {
    fn new(extents: Vec<u64>) -> Self {
        Self {
            extents,
            calls: AtomicUsize::new(0),
            resets: AtomicU32::new(0),
            nudges: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl ScrollRegion for ScriptedRegion {
    async fn extent(&self) -> u64 {
        let idx = self.calls.fetch_add(1, Ordering::SeqCst);
        self.extents
            .get(idx)
            .or(self.extents.last())
            .copied()
            .unwrap_or(0)
    }

    async fn reset_to_origin(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    async fn nudge(&self) {
        self.nudges.fetch_add(1, Ordering::SeqCst);
    }
}

/// Region that grows on every measurement, forever.
struct EverGrowingRegion {
    calls: AtomicUsize,
}

#[async_trait]
impl ScrollRegion for EverGrowingRegion {
    async fn extent(&self) -> u64 {
        self.calls.fetch_add(1, Ordering::SeqCst) as u64 * 100
    }

    async fn reset_to_origin(&self) {}
    async fn nudge(&self) {}
}

#[tokio::test]
async fn two_growth_rounds_converge_after_exactly_five() {
    let region = ScriptedRegion::new(vec![100, 200, 300, 300, 300, 300]);
    let sink = CollectingSink::default();
    let loader = HistoryLoader::new(fast_settings());

    let report = loader.recover(Some(&region), &sink).await;

    assert_eq!(report.rounds, 5);
    assert_eq!(report.reason, Some(StopReason::Converged));
    assert_eq!(report.final_extent, 300);
    assert_eq!(region.resets.load(Ordering::SeqCst), 5);
    assert_eq!(region.nudges.load(Ordering::SeqCst), 5);
    assert_eq!(
        sink.statuses(),
        vec![
            "loading round 1",
            "loading round 2",
            "loading round 3",
            "loading round 4",
            "loading round 5",
        ]
    );
}

#[tokio::test]
async fn ever_growing_extent_stops_at_the_sixty_round_ceiling() {
    let region = EverGrowingRegion {
        calls: AtomicUsize::new(0),
    };
    let sink = CollectingSink::default();
    let loader = HistoryLoader::new(fast_settings());

    let report = loader.recover(Some(&region), &sink).await;

    assert_eq!(report.rounds, 60);
    assert_eq!(report.reason, Some(StopReason::CeilingReached));
    assert_eq!(sink.statuses().len(), 60);
}

#[tokio::test]
async fn absent_region_is_a_no_op() {
    let sink = CollectingSink::default();
    let loader = HistoryLoader::new(fast_settings());

    let report = loader.recover(None, &sink).await;

    assert_eq!(report.rounds, 0);
    assert_eq!(report.reason, None);
    assert!(sink.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn stable_extent_converges_after_the_stall_limit() {
    let region = ScriptedRegion::new(vec![500]);
    let sink = CollectingSink::default();
    let loader = HistoryLoader::new(fast_settings());

    let report = loader.recover(Some(&region), &sink).await;

    assert_eq!(report.rounds, 3);
    assert_eq!(report.reason, Some(StopReason::Converged));
    assert_eq!(report.final_extent, 500);
}
