use super::Incumbent;
use crate::core::{NodeKind, Schedule};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;

/// Number of expansions between two periodic notifications.
const NOTIFY_INTERVAL: u64 = 1 << 14;

/// Snapshot of the progress of a search.
#[non_exhaustive]
#[derive(Clone, Debug, Default, Deserialize, Eq, Serialize, PartialEq)]
pub struct AlgorithmStats {
    pub allocations_expanded: u64,
    pub orderings_expanded: u64,
    pub complete_schedules: u64,
    pub current_best: Option<Schedule>,
}

/// Receives progress of a search. Called from worker threads, it must return quickly.
pub trait StatsListener: Send + Sync {
    /// Handles a new snapshot.
    fn update(&self, stats: &AlgorithmStats);
}

/// Forwards snapshots to a bounded channel. Snapshots are dropped when it is full.
impl StatsListener for SyncSender<AlgorithmStats> {
    fn update(&self, stats: &AlgorithmStats) {
        if self.try_send(stats.clone()).is_err() {
            log::trace!("Stats snapshot dropped");
        }
    }
}

/// Counters of a running search shared by its workers.
#[derive(Default)]
pub struct Stats {
    allocations: AtomicU64,
    orderings: AtomicU64,
    complete: AtomicU64,
    listener: Option<Arc<dyn StatsListener>>,
}

impl Stats {
    /// Creates counters reporting to the listener.
    #[must_use]
    pub fn new(listener: Option<Arc<dyn StatsListener>>) -> Self {
        Self {
            listener,
            ..Self::default()
        }
    }

    /// Counts an expanded node and periodically notifies the listener.
    pub fn expanded(&self, kind: NodeKind, incumbent: &Incumbent) {
        let counter = match kind {
            NodeKind::Allocation => &self.allocations,
            NodeKind::Ordering => &self.orderings,
        };

        if (counter.fetch_add(1, Ordering::Relaxed) + 1) % NOTIFY_INTERVAL == 0 {
            self.notify(incumbent);
        }
    }

    /// Counts a complete schedule.
    pub fn completed(&self) {
        self.complete.fetch_add(1, Ordering::Relaxed);
    }

    /// Sends a snapshot to the listener, if any.
    pub fn notify(&self, incumbent: &Incumbent) {
        if let Some(listener) = &self.listener {
            listener.update(&self.snapshot(incumbent));
        }
    }

    /// Returns the current counters together with the best schedule.
    #[must_use]
    pub fn snapshot(&self, incumbent: &Incumbent) -> AlgorithmStats {
        AlgorithmStats {
            allocations_expanded: self.allocations.load(Ordering::Relaxed),
            orderings_expanded: self.orderings.load(Ordering::Relaxed),
            complete_schedules: self.complete.load(Ordering::Relaxed),
            current_best: incumbent.best(),
        }
    }
}

impl std::fmt::Debug for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stats")
            .field("allocations", &self.allocations)
            .field("orderings", &self.orderings)
            .field("complete", &self.complete)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::ScheduledTask;

    #[test]
    fn counters_are_reported() {
        let (sender, receiver) = std::sync::mpsc::sync_channel::<AlgorithmStats>(1);
        let stats = Stats::new(Some(Arc::new(sender)));
        let incumbent = Incumbent::default();

        stats.expanded(NodeKind::Allocation, &incumbent);
        stats.expanded(NodeKind::Ordering, &incumbent);
        stats.expanded(NodeKind::Ordering, &incumbent);
        stats.completed();
        incumbent.offer(Schedule::new(vec![ScheduledTask::new(0, 0, 0, 3)]));
        stats.notify(&incumbent);

        let snapshot = receiver.try_recv();
        assert_eq!(snapshot.as_ref().map(|s| s.allocations_expanded), Ok(1));
        assert_eq!(snapshot.as_ref().map(|s| s.orderings_expanded), Ok(2));
        assert_eq!(snapshot.as_ref().map(|s| s.complete_schedules), Ok(1));
        let best = snapshot.ok().and_then(|s| s.current_best);
        assert_eq!(best.map(|s| s.finish_time()), Some(3));
    }

    #[test]
    fn expansions_notify_periodically() {
        let (sender, receiver) = std::sync::mpsc::sync_channel::<AlgorithmStats>(4);
        let stats = Stats::new(Some(Arc::new(sender)));
        let incumbent = Incumbent::default();

        for _ in 1..NOTIFY_INTERVAL {
            stats.expanded(NodeKind::Ordering, &incumbent);
        }
        assert!(receiver.try_recv().is_err());

        stats.expanded(NodeKind::Ordering, &incumbent);
        let received: Vec<_> = receiver.try_iter().collect();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].orderings_expanded, NOTIFY_INTERVAL);
        assert_eq!(received[0].allocations_expanded, 0);
    }

    #[test]
    fn full_channel_does_not_block() {
        let (sender, receiver) = std::sync::mpsc::sync_channel::<AlgorithmStats>(1);
        let stats = Stats::new(Some(Arc::new(sender)));
        let incumbent = Incumbent::default();

        stats.notify(&incumbent);
        stats.notify(&incumbent);
        drop(receiver);
        stats.notify(&incumbent);
    }

    #[test]
    fn missing_listener_is_ignored() {
        let stats = Stats::default();
        stats.notify(&Incumbent::default());
        assert_eq!(stats.snapshot(&Incumbent::default()).complete_schedules, 0);
    }
}
