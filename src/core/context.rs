use super::{Error, Graph, Result};

/// A task graph together with the number of processors it is scheduled on.
/// Shared read-only by every search node.
#[derive(Clone, Debug)]
pub struct SchedulingContext {
    graph: Graph,
    processors: usize,
}

impl SchedulingContext {
    /// Creates a new context.
    ///
    /// # Errors
    /// - If `processors` is zero.
    pub fn new(graph: Graph, processors: usize) -> Result<Self> {
        if processors == 0 {
            return Err(Error::NoProcessors);
        }

        Ok(Self { graph, processors })
    }

    /// Returns the task graph.
    #[must_use]
    pub const fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Returns the number of processors.
    #[must_use]
    pub const fn processors(&self) -> usize {
        self.processors
    }

    /// Returns the number of tasks to schedule.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.graph.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::GraphBuilder;

    #[test]
    fn zero_processors_should_fail() -> anyhow::Result<()> {
        let graph = GraphBuilder::new().build()?;
        assert!(matches!(
            SchedulingContext::new(graph, 0),
            Err(Error::NoProcessors)
        ));
        Ok(())
    }
}
