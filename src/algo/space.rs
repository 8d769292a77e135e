use super::{AllocationNode, OrderingNode};
use crate::core::{NodeKind, PartialSolution, Schedule, SchedulingContext};
use std::sync::Arc;

/// A node of the combined search tree: allocations first, then orderings of each allocation.
#[derive(Clone, Debug)]
pub enum SearchNode<'a> {
    Allocation(AllocationNode<'a>),
    Ordering(OrderingNode<'a>),
}

impl<'a> SearchNode<'a> {
    /// Returns the root of the search tree of the context.
    #[must_use]
    pub fn root(context: &'a SchedulingContext) -> Self {
        Self::Allocation(AllocationNode::empty(context))
    }
}

impl PartialSolution for SearchNode<'_> {
    fn estimate(&self) -> u64 {
        match self {
            Self::Allocation(node) => node.estimate(),
            Self::Ordering(node) => node.estimate(),
        }
    }

    fn is_complete(&self) -> bool {
        match self {
            Self::Allocation(_) => false,
            Self::Ordering(node) => node.is_complete(),
        }
    }

    /// A finished allocation continues with the empty ordering of that allocation.
    fn expand(&self) -> Vec<Self> {
        match self {
            Self::Allocation(node) => node.allocation().map_or_else(
                || node.expand().into_iter().map(Self::Allocation).collect(),
                |allocation| {
                    let root = OrderingNode::empty(node.context(), Arc::new(allocation));
                    vec![Self::Ordering(root)]
                },
            ),
            Self::Ordering(node) => node.expand().into_iter().map(Self::Ordering).collect(),
        }
    }

    fn make_complete(&self) -> Option<Schedule> {
        match self {
            Self::Allocation(_) => None,
            Self::Ordering(node) => node.make_complete(),
        }
    }

    fn kind(&self) -> NodeKind {
        match self {
            Self::Allocation(_) => NodeKind::Allocation,
            Self::Ordering(_) => NodeKind::Ordering,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::GraphBuilder;

    #[test]
    fn finished_allocation_expands_to_ordering() -> anyhow::Result<()> {
        let mut builder = GraphBuilder::new();
        builder.add_node("a", 1)?;
        let context = SchedulingContext::new(builder.build()?, 2)?;

        let root = SearchNode::root(&context);
        assert_eq!(root.kind(), NodeKind::Allocation);
        assert!(!root.is_complete());

        let allocated = root.expand();
        assert_eq!(allocated.len(), 1);
        assert_eq!(allocated[0].kind(), NodeKind::Allocation);

        let ordering = allocated[0].expand();
        assert_eq!(ordering.len(), 1);
        assert_eq!(ordering[0].kind(), NodeKind::Ordering);
        assert!(!ordering[0].is_complete());

        let complete = ordering[0].expand();
        assert!(complete[0].is_complete());
        assert_eq!(complete[0].estimate(), 1);
        assert!(complete[0].expand().is_empty());
        Ok(())
    }

    #[test]
    fn empty_graph_resolves_immediately() -> anyhow::Result<()> {
        let context = SchedulingContext::new(GraphBuilder::new().build()?, 1)?;
        let ordering = SearchNode::root(&context).expand();

        assert_eq!(ordering.len(), 1);
        assert!(ordering[0].is_complete());
        assert_eq!(ordering[0].make_complete(), Some(Schedule::default()));
        Ok(())
    }
}
