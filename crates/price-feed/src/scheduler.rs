//! Poll scheduler - drives fetch, merge, diff, publish and commit on an interval

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use meme_core::PollConfig;

use crate::diff::compute_diff;
use crate::merge::merge_records;
use crate::orchestrator::FetchOrchestrator;
use crate::publish::Publisher;
use crate::state::SnapshotStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Counts for one completed cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub fetched: usize,
    pub merged: usize,
    pub new_tokens: usize,
    pub price_changes: usize,
    pub departed: usize,
    pub committed: bool,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Another cycle was still in flight
    Skipped,
}

pub struct PollScheduler {
    config: PollConfig,
    orchestrator: FetchOrchestrator,
    store: Arc<SnapshotStore>,
    publisher: Arc<dyn Publisher>,
    cycle_lock: Mutex<()>,
    cycles_run: AtomicU64,
}

impl PollScheduler {
    pub fn new(
        config: PollConfig,
        orchestrator: FetchOrchestrator,
        store: Arc<SnapshotStore>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            store,
            publisher,
            cycle_lock: Mutex::new(()),
            cycles_run: AtomicU64::new(0),
        }
    }

    /// Get shared store reference
    pub fn store(&self) -> Arc<SnapshotStore> {
        Arc::clone(&self.store)
    }

    pub fn state(&self) -> SchedulerState {
        match self.cycle_lock.try_lock() {
            Ok(_) => SchedulerState::Idle,
            Err(_) => SchedulerState::Running,
        }
    }

    /// Cycles that ran to completion, committed or not
    pub fn cycles_run(&self) -> u64 {
        self.cycles_run.load(Ordering::Relaxed)
    }

    /// Run one cycle unless one is already in flight
    pub async fn run_cycle(&self) -> CycleOutcome {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            warn!("Previous poll cycle still running, skipping tick");
            return CycleOutcome::Skipped;
        };

        let start = Instant::now();
        let round = self.orchestrator.fetch_all().await;
        let mut report = CycleReport {
            fetched: round.records.len(),
            ..Default::default()
        };

        if round.records.is_empty() {
            warn!(
                "No records from any of {} sources, keeping previous snapshot",
                self.orchestrator.source_count()
            );
        } else {
            let merged = merge_records(round.records);
            let previous = self.store.projection();
            let diff = compute_diff(&merged, &previous, self.config.price_change_threshold);

            report.merged = merged.len();
            report.new_tokens = diff.new_tokens.len();
            report.price_changes = diff.price_changes.len();

            let departed = previous.departed(&merged);
            report.departed = departed.len();
            if !departed.is_empty() {
                debug!("{} tokens left the snapshot: {:?}", departed.len(), departed);
            }

            for event in diff.into_feed_events() {
                info!("Emitting {} {}", event.len(), event.name());
                self.publisher.publish(event);
            }

            self.store.commit(merged);
            report.committed = true;
        }

        report.duration = start.elapsed();
        self.cycles_run.fetch_add(1, Ordering::Relaxed);

        info!(
            "Cycle done in {:?}: fetched={} merged={} new={} changed={} departed={}",
            report.duration,
            report.fetched,
            report.merged,
            report.new_tokens,
            report.price_changes,
            report.departed
        );

        CycleOutcome::Completed(report)
    }

    /// Start polling: one cycle now, then one per interval, for the
    /// lifetime of the process.
    ///
    /// Each cycle runs in its own task so a panic inside one cycle is logged
    /// and the loop carries on. Ticks that fall due while a cycle is running
    /// are dropped.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);

        info!(
            "Starting poll scheduler: interval={:?} threshold={}",
            scheduler.config.interval, scheduler.config.price_change_threshold
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(scheduler.config.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;

                let cycle = Arc::clone(&scheduler);
                if let Err(e) = tokio::spawn(async move { cycle.run_cycle().await }).await {
                    error!("Poll cycle aborted: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::BroadcastPublisher;
    use crate::sources::TokenSource;
    use meme_core::{FeedEvent, SourceId, TokenRecord};

    struct Fixed(Vec<TokenRecord>);

    #[async_trait::async_trait]
    impl TokenSource for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch(&self) -> Vec<TokenRecord> {
            self.0.clone()
        }
    }

    struct Gate(Arc<tokio::sync::Notify>);

    #[async_trait::async_trait]
    impl TokenSource for Gate {
        fn name(&self) -> &str {
            "gate"
        }

        async fn fetch(&self) -> Vec<TokenRecord> {
            self.0.notified().await;
            vec![TokenRecord::new("G", 1.0, SourceId::DexScreener)]
        }
    }

    fn scheduler_with(source: Arc<dyn TokenSource>, publisher: Arc<BroadcastPublisher>) -> PollScheduler {
        PollScheduler::new(
            PollConfig::default(),
            FetchOrchestrator::new(Duration::from_secs(5)).with_source(source),
            Arc::new(SnapshotStore::new()),
            publisher,
        )
    }

    #[tokio::test]
    async fn test_first_cycle_publishes_new_tokens_and_commits() {
        let publisher = Arc::new(BroadcastPublisher::new(8));
        let mut rx = publisher.subscribe();
        let records = vec![
            TokenRecord::new("A", 1.0, SourceId::DexScreener),
            TokenRecord::new("B", 2.0, SourceId::DexScreener),
        ];
        let scheduler = scheduler_with(Arc::new(Fixed(records)), Arc::clone(&publisher));

        let CycleOutcome::Completed(report) = scheduler.run_cycle().await else {
            panic!("cycle should not be skipped");
        };

        assert!(report.committed);
        assert_eq!(report.new_tokens, 2);
        assert_eq!(scheduler.store().read().len(), 2);
        assert!(matches!(rx.recv().await.unwrap(), FeedEvent::NewTokens(v) if v.len() == 2));
    }

    #[tokio::test]
    async fn test_unchanged_second_cycle_is_silent() {
        let publisher = Arc::new(BroadcastPublisher::new(8));
        let records = vec![TokenRecord::new("A", 1.0, SourceId::DexScreener)];
        let scheduler = scheduler_with(Arc::new(Fixed(records)), Arc::clone(&publisher));

        scheduler.run_cycle().await;
        let mut rx = publisher.subscribe();
        let CycleOutcome::Completed(report) = scheduler.run_cycle().await else {
            panic!("cycle should not be skipped");
        };

        assert_eq!(report.new_tokens, 0);
        assert_eq!(report.price_changes, 0);
        assert!(rx.try_recv().is_err());
        assert_eq!(scheduler.store().read().cycle, 2);
    }

    #[tokio::test]
    async fn test_empty_fetch_keeps_previous_snapshot() {
        let publisher = Arc::new(BroadcastPublisher::new(8));
        let scheduler = scheduler_with(Arc::new(Fixed(vec![])), publisher);
        scheduler.store().commit(vec![TokenRecord::new("A", 1.0, SourceId::DexScreener)]);

        let CycleOutcome::Completed(report) = scheduler.run_cycle().await else {
            panic!("cycle should not be skipped");
        };

        assert!(!report.committed);
        assert_eq!(scheduler.store().read().len(), 1);
        assert_eq!(scheduler.cycles_run(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_cycle_is_skipped() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let publisher = Arc::new(BroadcastPublisher::new(8));
        let scheduler = Arc::new(scheduler_with(Arc::new(Gate(Arc::clone(&gate))), publisher));

        let first = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.run_cycle().await })
        };
        while scheduler.state() == SchedulerState::Idle {
            tokio::task::yield_now().await;
        }

        assert!(matches!(scheduler.run_cycle().await, CycleOutcome::Skipped));

        gate.notify_one();
        assert!(matches!(first.await.unwrap(), CycleOutcome::Completed(_)));
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.store().read().cycle, 1);
    }
}
