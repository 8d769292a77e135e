#![deny(clippy::all, clippy::cargo, clippy::expect_used, clippy::unwrap_used)]
#![deny(clippy::pedantic, clippy::nursery, unsafe_code)]
#![warn(clippy::unimplemented, clippy::redundant_type_annotations)]

use anyhow::Result;
use std::io::{BufRead, Write};

pub mod algo;
pub mod core;
pub mod data;
pub mod logger;

/// Finds a schedule of the graph on the given number of processors.
///
/// # Errors
/// - If there are no processors.
/// - If the scheduler fails to produce a valid schedule.
pub fn solve(
    graph: core::Graph,
    processors: usize,
    scheduler: &mut dyn core::Scheduler,
) -> core::Result<core::Schedule> {
    let context = core::SchedulingContext::new(graph, processors)?;
    let schedule = scheduler.schedule(&context)?;
    log::info!(
        "{} scheduled {} tasks with makespan {}",
        scheduler.name(),
        context.task_count(),
        schedule.finish_time()
    );
    Ok(schedule)
}

/// Runs the given scheduler on the graph read from reader and writes the schedule to writer,
/// followed by the makespan as a comment so the output can be read back as a graph.
///
/// # Errors
/// - If the graph could not be read from the reader.
/// - If no schedule could be found.
/// - If the schedule could not be written.
pub fn run_reader(
    scheduler: &mut dyn core::Scheduler,
    reader: &mut impl BufRead,
    processors: usize,
    writer: &mut impl Write,
) -> Result<u64> {
    let graph = data::read_graph(reader)?;
    let context = core::SchedulingContext::new(graph, processors)?;
    let schedule = scheduler.schedule(&context)?;

    write!(writer, "{}", data::write_schedule(context.graph(), &schedule))?;
    writeln!(writer, "// Makespan: {}", schedule.finish_time())?;

    Ok(schedule.finish_time())
}

#[cfg(not(target_pointer_width = "64"))]
compile_error!("Must be 64-bit system!");

/// Casts the given value to `u64`.
/// It should never fail on 64-bit systems.
///
/// # Panics
/// - If the value cannot be cast to `usize`.
#[must_use]
pub fn cast_u64(value: usize) -> u64 {
    u64::try_from(value).unwrap_or_else(|_| unreachable!("Must be 64-bit system!"))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::algo::Sequential;

    #[test]
    fn solve_diamond() -> anyhow::Result<()> {
        let graph = data::parse_graph(
            "digraph d { a [Weight=2]; b [Weight=3]; c [Weight=3]; d [Weight=2];
             a -> b [Weight=1]; a -> c [Weight=1]; b -> d [Weight=1]; c -> d [Weight=1]; }",
        )?;

        let schedule = solve(graph, 2, &mut Sequential::default())?;
        assert_eq!(schedule.finish_time(), 8);
        assert_eq!(schedule.len(), 4);
        Ok(())
    }

    #[test]
    fn schedule_is_written_with_makespan() -> anyhow::Result<()> {
        let mut reader = "digraph g { a [Weight=2]; b [Weight=3]; a -> b; }".as_bytes();
        let mut output = Vec::new();

        let makespan = run_reader(&mut Sequential::default(), &mut reader, 1, &mut output)?;
        let text = String::from_utf8(output)?;
        assert_eq!(makespan, 5);
        assert!(text.contains("a [Weight=2, Start=0, Processor=0];"));
        assert!(text.contains("b [Weight=3, Start=2, Processor=0];"));
        assert!(text.ends_with("// Makespan: 5\n"));

        let graph = data::parse_graph(&text)?;
        assert_eq!(graph.len(), 2);
        Ok(())
    }

    #[test]
    fn cast_keeps_value() {
        assert_eq!(cast_u64(0), 0);
        assert_eq!(cast_u64(usize::MAX), u64::MAX);
    }

    #[test]
    fn zero_processors_fail() -> anyhow::Result<()> {
        let graph = data::parse_graph("digraph g { a [Weight=2]; }")?;
        assert_eq!(
            solve(graph, 0, &mut Sequential::default()),
            Err(core::Error::NoProcessors)
        );
        Ok(())
    }
}
