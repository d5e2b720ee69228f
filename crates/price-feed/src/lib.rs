//! Token price aggregation and diff engine
//!
//! Features:
//! - Concurrent fetches from multiple market-data providers
//! - Per-source failure isolation with bounded retries and fallbacks
//! - Max-volume merge keyed by case-insensitive identity
//! - Threshold-based change detection against the previous cycle
//! - Lock-light snapshot store for concurrent readers

pub mod diff;
pub mod merge;
pub mod orchestrator;
pub mod publish;
pub mod scheduler;
pub mod sources;
pub mod state;

pub use diff::{change_fraction, compute_diff, Diff};
pub use merge::merge_records;
pub use orchestrator::{FetchOrchestrator, FetchRound, SourceOutcome};
pub use publish::{BroadcastPublisher, Publisher};
pub use scheduler::{CycleOutcome, CycleReport, PollScheduler, SchedulerState};
pub use sources::{Attempt, SourceAdapter, TokenSource};
pub use state::{PriceProjection, Snapshot, SnapshotStore, SnapshotStats};
