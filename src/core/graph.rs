use super::{Error, Result};
use ahash::{HashMap, HashSet, HashSetExt};
use std::cmp::Ordering;
use std::collections::VecDeque;

/// A task of the graph. Contains its weight (duration), edges and transitive dependencies.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Node {
    id: String,
    index: usize,
    weight: u64,
    incoming: Vec<(usize, u64)>,
    outgoing: Vec<(usize, u64)>,
    dependencies: HashSet<usize>,
}

impl Node {
    fn new(id: String, index: usize, weight: u64) -> Self {
        Self {
            id,
            index,
            weight,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            dependencies: HashSet::new(),
        }
    }

    /// Returns the identifier the node was added with.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the insertion index of the node, which is also its index in the graph.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Returns the execution time of the task.
    #[must_use]
    pub const fn weight(&self) -> u64 {
        self.weight
    }

    /// Returns the predecessors with communication costs.
    #[must_use]
    pub fn incoming(&self) -> &[(usize, u64)] {
        &self.incoming
    }

    /// Returns the successors with communication costs.
    #[must_use]
    pub fn outgoing(&self) -> &[(usize, u64)] {
        &self.outgoing
    }

    /// Returns all transitive predecessors of the node.
    #[must_use]
    pub const fn dependencies(&self) -> &HashSet<usize> {
        &self.dependencies
    }

    fn connect(edges: &mut Vec<(usize, u64)>, other: usize, weight: u64) {
        match edges.iter_mut().find(|(node, _)| *node == other) {
            Some(edge) => edge.1 = weight,
            None => edges.push((other, weight)),
        }
    }
}

/// An immutable task graph. Nodes are stored in insertion order.
#[derive(Clone, Debug)]
pub struct Graph {
    id: String,
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    order: Vec<usize>,
    bottom_levels: Vec<u64>,
}

impl Graph {
    /// Returns the name of the graph.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns whether the graph has no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the node with the given index.
    ///
    /// # Panics
    /// - If the index is out of bounds.
    #[must_use]
    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    /// Returns all nodes in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Finds the node with the given identifier.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&index| &self.nodes[index])
    }

    /// Returns node indices in a topological order.
    #[must_use]
    pub fn topological_order(&self) -> &[usize] {
        &self.order
    }

    /// Returns the sum of all task weights.
    #[must_use]
    pub fn total_weight(&self) -> u64 {
        self.nodes.iter().map(Node::weight).sum()
    }

    /// Returns the length of the heaviest path starting at the node, ignoring communication.
    #[must_use]
    pub fn bottom_level(&self, index: usize) -> u64 {
        self.bottom_levels[index]
    }

    /// Returns whether `task` transitively depends on `other`.
    #[must_use]
    pub fn depends_on(&self, task: usize, other: usize) -> bool {
        self.nodes[task].dependencies.contains(&other)
    }
}

/// Builds a [`Graph`]. Once built, every further call fails.
#[derive(Clone, Debug, Default)]
pub struct GraphBuilder {
    id: String,
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    built: bool,
}

impl GraphBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    const fn throw_if_built(&self) -> Result<()> {
        if self.built {
            Err(Error::AlreadyBuilt)
        } else {
            Ok(())
        }
    }

    /// Sets the name of the graph.
    ///
    /// # Errors
    /// - If the graph has been already built.
    pub fn set_id(&mut self, id: impl Into<String>) -> Result<()> {
        self.throw_if_built()?;
        self.id = id.into();
        Ok(())
    }

    /// Adds a task with the given weight.
    ///
    /// # Errors
    /// - If the graph has been already built.
    /// - If a node with the same id exists.
    pub fn add_node(&mut self, id: impl Into<String>, weight: u64) -> Result<()> {
        self.throw_if_built()?;
        let id = id.into();
        if self.index.contains_key(&id) {
            return Err(Error::DuplicateNode(id));
        }

        let index = self.nodes.len();
        self.index.insert(id.clone(), index);
        self.nodes.push(Node::new(id, index, weight));
        Ok(())
    }

    /// Adds an edge with the given communication cost. Adding the same edge again replaces its cost.
    ///
    /// # Errors
    /// - If the graph has been already built.
    /// - If one of the endpoints does not exist.
    pub fn add_edge(&mut self, from: &str, to: &str, weight: u64) -> Result<()> {
        self.throw_if_built()?;
        let (Some(&tail), Some(&head)) = (self.index.get(from), self.index.get(to)) else {
            return Err(Error::UnknownNode {
                from: from.into(),
                to: to.into(),
            });
        };

        Node::connect(&mut self.nodes[head].incoming, tail, weight);
        Node::connect(&mut self.nodes[tail].outgoing, head, weight);
        Ok(())
    }

    /// Finalizes the graph: computes dependencies, the topological order and bottom levels.
    ///
    /// # Errors
    /// - If the graph has been already built.
    /// - If the graph contains a cycle.
    pub fn build(&mut self) -> Result<Graph> {
        self.throw_if_built()?;
        self.built = true;

        let mut nodes = std::mem::take(&mut self.nodes);
        setup_dependencies(&mut nodes)?;

        let mut order: Vec<usize> = (0..nodes.len()).collect();
        order.sort_by(|&a, &b| topological_comparator(&nodes[a], &nodes[b]));

        let mut bottom_levels = vec![0; nodes.len()];
        for &task in order.iter().rev() {
            let node = &nodes[task];
            let tail = node.outgoing.iter().map(|&(succ, _)| bottom_levels[succ]);
            let level = node.weight + tail.max().unwrap_or_default();
            bottom_levels[task] = level;
        }

        log::trace!("Built graph `{}` with {} tasks", self.id, nodes.len());

        Ok(Graph {
            id: std::mem::take(&mut self.id),
            nodes,
            index: std::mem::take(&mut self.index),
            order,
            bottom_levels,
        })
    }
}

/// Collects transitive predecessors of every node with a breadth-first walk over incoming edges.
fn setup_dependencies(nodes: &mut [Node]) -> Result<()> {
    for start in 0..nodes.len() {
        let mut dependencies = HashSet::new();
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            for &(dependency, _) in &nodes[current].incoming {
                if dependency == start {
                    return Err(Error::Cycle(nodes[start].id.clone()));
                }
                if dependencies.insert(dependency) {
                    queue.push_back(dependency);
                }
            }
        }

        nodes[start].dependencies = dependencies;
    }

    Ok(())
}

/// Orders nodes so that a node comes after everything it depends on.
/// A dependent always has strictly more dependencies, so ties fall back to the dependency
/// count and then to the insertion index, which keeps the order total and reproducible.
fn topological_comparator(first: &Node, second: &Node) -> Ordering {
    if first.dependencies.contains(&second.index) {
        Ordering::Greater
    } else if second.dependencies.contains(&first.index) {
        Ordering::Less
    } else {
        let count = first.dependencies.len().cmp(&second.dependencies.len());
        count.then(first.index.cmp(&second.index))
    }
}
