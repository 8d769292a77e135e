mod allocation;
mod branch_bound;
mod naive;
mod ordering;
mod space;
mod stats;

pub use allocation::{Allocation, AllocationNode};
pub use branch_bound::{exhaustive, Incumbent, Parallel, Sequential};
pub use naive::{ListNode, Naive};
pub use ordering::OrderingNode;
pub use space::SearchNode;
pub use stats::{AlgorithmStats, Stats, StatsListener};

use crate::core::Scheduler;

/// Constructors of every available scheduler.
#[allow(unsafe_code)]
#[linkme::distributed_slice]
pub static SCHEDULERS: [fn() -> Box<dyn Scheduler>];

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn schedulers_are_registered() {
        let mut names: Vec<_> = SCHEDULERS.iter().map(|init| init().name().to_owned()).collect();
        names.sort_unstable();
        assert_eq!(names, ["Naive", "Parallel", "Sequential"]);
    }
}
