use super::{SearchNode, Stats, StatsListener};
use crate::core::{Error, PartialSolution, Result, Schedule, Scheduler, SchedulingContext};
use rayon::prelude::*;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Subtrees handed to every worker thread by the parallel search.
const SUBTREES_PER_THREAD: usize = 16;

/// The best schedule found so far, shared by all workers.
/// Its makespan is mirrored in an atomic so the bound is read without locking.
#[derive(Debug)]
pub struct Incumbent {
    bound: AtomicU64,
    best: Mutex<Option<Schedule>>,
}

impl Default for Incumbent {
    fn default() -> Self {
        Self {
            bound: AtomicU64::new(u64::MAX),
            best: Mutex::new(None),
        }
    }
}

impl Incumbent {
    /// Returns the makespan of the best schedule, `u64::MAX` if there is none.
    pub fn bound(&self) -> u64 {
        self.bound.load(Ordering::Acquire)
    }

    /// Replaces the best schedule if the given one is strictly shorter.
    /// Returns whether it was replaced.
    pub fn offer(&self, schedule: Schedule) -> bool {
        let finish_time = schedule.finish_time();
        let mut best = self.best.lock().unwrap_or_else(PoisonError::into_inner);

        if best.as_ref().is_some_and(|best| best.finish_time() <= finish_time) {
            return false;
        }

        self.bound.store(finish_time, Ordering::Release);
        *best = Some(schedule);
        drop(best);

        log::debug!("New best schedule with makespan {finish_time}");
        true
    }

    /// Returns a copy of the best schedule.
    pub fn best(&self) -> Option<Schedule> {
        self.best
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the best schedule.
    pub fn into_inner(self) -> Option<Schedule> {
        self.best.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Explores the subtree depth first, pruning nodes that cannot beat the incumbent.
/// Children are visited in the order `expand` returns them.
fn depth_first<S: PartialSolution>(root: S, incumbent: &Incumbent, stats: &Stats) {
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if node.is_complete() {
            if let Some(schedule) = node.make_complete() {
                stats.completed();
                if incumbent.offer(schedule) {
                    stats.notify(incumbent);
                }
            }
        } else if node.estimate() < incumbent.bound() {
            stats.expanded(node.kind(), incumbent);
            let mut children = node.expand();
            children.reverse();
            stack.extend(children);
        }
    }
}

/// Expands the tree breadth first until it holds at least `target` independent subtrees.
fn partition<S: PartialSolution>(
    root: S,
    target: usize,
    incumbent: &Incumbent,
    stats: &Stats,
) -> Vec<S> {
    let mut frontier = VecDeque::from([root]);
    let mut resolved = Vec::new();

    while frontier.len() + resolved.len() < target {
        let Some(node) = frontier.pop_front() else {
            break;
        };

        if node.is_complete() {
            resolved.push(node);
        } else {
            stats.expanded(node.kind(), incumbent);
            frontier.extend(node.expand());
        }
    }

    resolved.extend(frontier);
    resolved
}

/// Searches every complete node of the tree without pruning and returns the shortest schedule.
///
/// # Errors
/// - If no complete node describes a schedule.
pub fn exhaustive<S: PartialSolution>(root: S) -> Result<Schedule> {
    let mut best: Option<Schedule> = None;
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if !node.is_complete() {
            stack.extend(node.expand());
            continue;
        }

        if let Some(schedule) = node.make_complete() {
            if best.as_ref().map_or(true, |best| schedule.finish_time() < best.finish_time()) {
                best = Some(schedule);
            }
        }
    }

    best.ok_or(Error::NoSchedule)
}

/// Reports the final counters and checks the best schedule.
fn finish(
    name: &str,
    context: &SchedulingContext,
    incumbent: Incumbent,
    stats: &Stats,
) -> Result<Schedule> {
    stats.notify(&incumbent);
    let snapshot = stats.snapshot(&incumbent);
    log::info!(
        "{name}: {} allocations, {} orderings expanded, {} complete schedules",
        snapshot.allocations_expanded,
        snapshot.orderings_expanded,
        snapshot.complete_schedules
    );

    let schedule = incumbent.into_inner().ok_or(Error::NoSchedule)?;
    schedule.verify(context)?;
    log::info!("{name}: optimal makespan {}", schedule.finish_time());
    Ok(schedule)
}

/// Depth first branch and bound over allocations and orderings on the calling thread.
#[derive(Clone, Default)]
pub struct Sequential {
    listener: Option<Arc<dyn StatsListener>>,
}

impl Sequential {
    /// Reports progress to the listener.
    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn StatsListener>) -> Self {
        self.listener = Some(listener);
        self
    }
}

impl std::fmt::Debug for Sequential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequential").finish_non_exhaustive()
    }
}

impl Scheduler for Sequential {
    fn schedule(&mut self, context: &SchedulingContext) -> Result<Schedule> {
        let incumbent = Incumbent::default();
        let stats = Stats::new(self.listener.clone());

        log::info!(
            "Sequential: {} tasks on {} processors",
            context.task_count(),
            context.processors()
        );
        depth_first(SearchNode::root(context), &incumbent, &stats);

        finish(self.name(), context, incumbent, &stats)
    }

    fn name(&self) -> &'static str {
        "Sequential"
    }
}

#[allow(unsafe_code)]
#[linkme::distributed_slice(super::SCHEDULERS)]
static SEQUENTIAL: fn() -> Box<dyn Scheduler> = || Box::new(Sequential::default());

/// Branch and bound exploring disjoint subtrees on a rayon thread pool.
/// Workers share one incumbent, so a bound found by one prunes the others.
#[derive(Clone, Default)]
pub struct Parallel {
    threads: Option<usize>,
    listener: Option<Arc<dyn StatsListener>>,
}

impl Parallel {
    /// Creates a parallel scheduler running on its own pool of `threads` workers
    /// instead of the global one.
    #[must_use]
    pub const fn with_threads(threads: usize) -> Self {
        Self {
            threads: Some(threads),
            listener: None,
        }
    }

    /// Reports progress to the listener.
    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn StatsListener>) -> Self {
        self.listener = Some(listener);
        self
    }
}

impl std::fmt::Debug for Parallel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parallel")
            .field("threads", &self.threads)
            .finish_non_exhaustive()
    }
}

impl Scheduler for Parallel {
    fn schedule(&mut self, context: &SchedulingContext) -> Result<Schedule> {
        let incumbent = Incumbent::default();
        let stats = Stats::new(self.listener.clone());

        let search = || {
            let threads = rayon::current_num_threads();
            let root = SearchNode::root(context);
            let frontier = partition(root, threads * SUBTREES_PER_THREAD, &incumbent, &stats);

            log::info!(
                "Parallel: {} tasks on {} processors, {} subtrees on {threads} threads",
                context.task_count(),
                context.processors(),
                frontier.len()
            );
            frontier
                .into_par_iter()
                .for_each(|node| depth_first(node, &incumbent, &stats));
        };

        match self.threads.map(|n| rayon::ThreadPoolBuilder::new().num_threads(n).build()) {
            Some(Ok(pool)) => pool.install(search),
            Some(Err(error)) => {
                log::warn!("Cannot create thread pool, using the global one: {error}");
                search();
            }
            None => search(),
        }

        finish(self.name(), context, incumbent, &stats)
    }

    fn name(&self) -> &'static str {
        "Parallel"
    }
}

#[allow(unsafe_code)]
#[linkme::distributed_slice(super::SCHEDULERS)]
static PARALLEL: fn() -> Box<dyn Scheduler> = || Box::new(Parallel::default());
