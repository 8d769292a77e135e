use crate::core::{Graph, GraphBuilder, Result};
use rand::Rng;

/// Generates a random task graph. Nodes are named by their index and edges only go from
/// lower to higher indices, so the graph is acyclic.
///
/// # Arguments
/// - `density` is the probability of an edge between two tasks.
/// - `max_weight` bounds task weights, every task weighs at least 1.
/// - `max_communication` bounds edge weights, edges may cost nothing.
///
/// # Errors
/// - Never for valid arguments, the graph is built through [`GraphBuilder`].
pub fn generate<R: Rng>(
    rng: &mut R,
    tasks: usize,
    density: f64,
    max_weight: u64,
    max_communication: u64,
) -> Result<Graph> {
    let density = density.clamp(0.0, 1.0);
    let mut builder = GraphBuilder::new();
    builder.set_id(format!("random_{tasks}"))?;

    for task in 0..tasks {
        builder.add_node(task.to_string(), rng.gen_range(1..=max_weight.max(1)))?;
    }

    for to in 0..tasks {
        for from in 0..to {
            if rng.gen_bool(density) {
                let weight = rng.gen_range(0..=max_communication);
                builder.add_edge(&from.to_string(), &to.to_string(), weight)?;
            }
        }
    }

    builder.build()
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn generated_graphs_respect_bounds() -> anyhow::Result<()> {
        let mut rng = StdRng::seed_from_u64(3);
        let graph = generate(&mut rng, 12, 0.5, 5, 3)?;

        assert_eq!(graph.len(), 12);
        for node in graph.nodes() {
            assert!((1..=5).contains(&node.weight()));
            for &(pred, weight) in node.incoming() {
                assert!(pred < node.index());
                assert!(weight <= 3);
            }
        }
        Ok(())
    }

    #[test]
    fn density_bounds_edges() -> anyhow::Result<()> {
        let mut rng = StdRng::seed_from_u64(5);

        let empty = generate(&mut rng, 6, 0.0, 1, 0)?;
        assert!(empty.nodes().iter().all(|node| node.incoming().is_empty()));

        let full = generate(&mut rng, 6, 1.0, 1, 0)?;
        let edges: usize = full.nodes().iter().map(|node| node.incoming().len()).sum();
        assert_eq!(edges, 15);
        Ok(())
    }
}
