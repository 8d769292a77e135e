use crate::core::{Scheduler, SchedulingContext};
use crate::data::read_graph;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt::{Display, Formatter, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Report of running a directory of samples.
#[derive(Debug, Deserialize, Serialize)]
pub struct Report {
    scheduler: String,
    entries: Vec<ReportEntry>,
}

impl Report {
    const fn new(scheduler: String) -> Self {
        let entries = Vec::new();
        Self { scheduler, entries }
    }

    #[must_use]
    pub fn scheduler_name(&self) -> &str {
        &self.scheduler
    }

    #[must_use]
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        writeln!(f, "Scheduler: {}", self.scheduler)?;
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        writeln!(f, "-------------------")
    }
}

/// Report of scheduling a single sample.
#[non_exhaustive]
#[derive(Debug, Deserialize, Serialize)]
pub struct ReportEntry {
    pub name: String,
    pub processors: usize,
    pub makespan: u64,
    pub optimal: u64,
    pub time: f64,
}

impl Display for ReportEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "{} ({} processors): {} (optimal {}) in {:.2} sec",
            self.name, self.processors, self.makespan, self.optimal, self.time
        )
    }
}

/// Run all samples in the `samples` directory.
/// Print the report to stdout.
///
/// # Errors
/// - If a sample cannot be read or scheduled.
/// - If no samples are found.
///
/// # Panics
/// - If the makespan is not optimal and `valid` is true.
pub fn samples(valid: bool, solver: &mut dyn Scheduler) -> anyhow::Result<()> {
    run("samples", valid, solver).and_then(|report| {
        if report.entries.is_empty() {
            Err(anyhow!("No samples found"))
        } else {
            println!("{report}");
            Ok(())
        }
    })
}

/// Run all `<processors>_<optimal>_<index>.dot` graphs of the directory.
/// Graphs larger than the scheduler supports are skipped, other files are ignored.
///
/// # Errors
/// - If a sample cannot be read or scheduled.
/// - If the created schedule is invalid.
///
/// # Panics
/// - If the makespan is not the one in the file name and `valid` is true.
pub fn run(dir: impl AsRef<Path>, valid: bool, solver: &mut dyn Scheduler) -> anyhow::Result<Report> {
    let mut report = Report::new(solver.name().into());

    let mut files = std::fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    files.sort_by_key(std::fs::DirEntry::file_name);

    for file in files {
        if file.path().extension() != Some(OsStr::new("dot")) {
            continue;
        }

        let (name, processors, optimal) = parse_filename(&file.file_name())?;
        let graph = read_graph(&mut BufReader::new(File::open(file.path())?))?;
        if graph.len() > solver.maximum_tasks() {
            log::debug!("Skipping {name}, {} tasks", graph.len());
            continue;
        }

        let context = SchedulingContext::new(graph, processors)?;

        let time = std::time::Instant::now();
        let schedule = solver.schedule(&context)?;
        let time = time.elapsed().as_secs_f64();

        schedule.verify(&context)?;

        let makespan = schedule.finish_time();
        if valid && solver.optimal() {
            assert_eq!(makespan, optimal, "Invalid makespan {name}");
        }

        report.entries.push(ReportEntry {
            name,
            processors,
            makespan,
            optimal,
            time,
        });
    }

    Ok(report)
}

fn parse_filename(filename: &OsStr) -> anyhow::Result<(String, usize, u64)> {
    static NAME_ERR: &str = "Cannot read filename";

    let name = filename.to_str().ok_or_else(|| anyhow!(NAME_ERR))?;
    let mut parts = name.split('.');
    let mut parts = parts.next().ok_or_else(|| anyhow!(NAME_ERR))?.split('_');
    let processors = parts.next().ok_or_else(|| anyhow!(NAME_ERR))?.parse()?;
    let optimal = parts.next().ok_or_else(|| anyhow!(NAME_ERR))?.parse()?;
    let _: usize = parts.next().ok_or_else(|| anyhow!(NAME_ERR))?.parse()?;
    Ok((name.into(), processors, optimal))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_filename() -> anyhow::Result<()> {
        let (name, processors, optimal) = parse_filename(OsStr::new("4_1234_0.dot"))?;
        assert_eq!(name, "4_1234_0.dot");
        assert_eq!(processors, 4);
        assert_eq!(optimal, 1234);

        let (_, processors, optimal) = parse_filename(OsStr::new("2_8_3.dot"))?;
        assert_eq!(processors, 2);
        assert_eq!(optimal, 8);
        Ok(())
    }

    #[test]
    fn test_parse_filename_errors() {
        assert!(parse_filename(OsStr::new("")).is_err());
        assert!(parse_filename(OsStr::new(".dot")).is_err());
        assert!(parse_filename(OsStr::new("10.dot")).is_err());
        assert!(parse_filename(OsStr::new("10_1234.dot")).is_err());
        assert!(parse_filename(OsStr::new("10_1a234_0.dot")).is_err());
        assert!(parse_filename(OsStr::new("1a0_1234_0.dot")).is_err());
        assert!(parse_filename(OsStr::new("10_1234_0a2.dot")).is_err());
    }
}
