use clap::{Parser, Subcommand, ValueEnum};
use ods::algo::{self, Parallel};
use ods::core::{Scheduler, SchedulingContext};
use ods::{data, logger, run_reader};
use rand::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::num::NonZero;
use std::path::PathBuf;

#[derive(Copy, Clone, Debug)]
struct Algorithm(usize, &'static str);

impl From<Algorithm> for Box<dyn Scheduler> {
    fn from(value: Algorithm) -> Box<dyn Scheduler> {
        algo::SCHEDULERS[value.0]()
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.1)
    }
}

impl ValueEnum for Algorithm {
    fn value_variants<'a>() -> &'a [Self] {
        static ALGORITHMS: std::sync::LazyLock<Vec<Algorithm>> = std::sync::LazyLock::new(|| {
            let iter = algo::SCHEDULERS.iter().enumerate();
            iter.map(|(i, init)| Algorithm(i, init().name())).collect()
        });

        ALGORITHMS.as_slice()
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.1))
    }
}

/// Application finding optimal schedules of task graphs.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Increase logging verbosity, `RUST_LOG` is used when absent.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Schedule a task graph with one of the implemented algorithms.
    Run {
        /// The input graph. Read from stdin when absent.
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// The number of processors.
        processors: NonZero<usize>,
        /// The scheduling algorithm.
        #[arg(short, long, default_value = "Parallel")]
        algorithm: Algorithm,
        /// The output file. Written to stdout when absent.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Threads used by the parallel algorithm. `RAYON_NUM_THREADS` or all cores when absent.
        #[arg(short, long)]
        threads: Option<NonZero<usize>>,
    },
    /// Run benchmarks on a directory of `<processors>_<optimal>_<index>.dot` graphs.
    Bench {
        /// The input directory.
        input: PathBuf,
        /// Exclude scheduling algorithms.
        #[arg(short, long, value_delimiter = ',')]
        exclude: Vec<Algorithm>,
        /// Print reports as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Generate random task graphs.
    Gen {
        /// The number of processors.
        processors: NonZero<usize>,
        /// The number of tasks.
        tasks: NonZero<usize>,
        /// The maximum weight of a task.
        #[arg(short = 'w', long, default_value = "10")]
        max_weight: NonZero<u64>,
        /// The maximum communication cost of an edge.
        #[arg(short = 'c', long, default_value = "10")]
        max_communication: u64,
        /// Probability of an edge between two tasks.
        #[arg(short, long, default_value = "0.3")]
        density: f64,
        /// Number of graphs to generate.
        #[arg(short, long, default_value = "1")]
        amount: NonZero<u64>,
        /// Solve generated graphs so their names carry the optimal makespan.
        #[arg(short, long)]
        solve: bool,
        /// Path to output the generated graphs. If the directory does not exist, it will be created.
        #[arg(short, long, default_value = "output")]
        output: PathBuf,
    },
}

fn schedulers(exclude: &[Algorithm]) -> impl Iterator<Item = Box<dyn Scheduler>> + '_ {
    let iter = algo::SCHEDULERS.iter().map(|init| init());
    iter.filter(|scheduler| !exclude.iter().any(|name| name.1 == scheduler.name()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose)?;

    match cli.command {
        Command::Run {
            input,
            processors,
            algorithm,
            output,
            threads,
        } => {
            let mut scheduler: Box<dyn Scheduler> = match (threads, algorithm.1) {
                (Some(threads), "Parallel") => Box::new(Parallel::with_threads(threads.get())),
                _ => Box::<dyn Scheduler>::from(algorithm),
            };

            let mut reader: Box<dyn BufRead> = match input {
                Some(path) => Box::new(BufReader::new(File::open(path)?)),
                None => Box::new(std::io::stdin().lock()),
            };
            let mut writer: Box<dyn Write> = match output {
                Some(path) => Box::new(BufWriter::new(File::create(path)?)),
                None => Box::new(std::io::stdout().lock()),
            };

            let makespan = run_reader(scheduler.as_mut(), &mut reader, processors.get(), &mut writer)?;
            writer.flush()?;
            log::info!("Makespan {makespan}");
            Ok(())
        }
        Command::Bench {
            input,
            exclude,
            json,
        } => {
            for mut scheduler in schedulers(&exclude) {
                let report = data::run(&input, false, scheduler.as_mut())?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    println!("{report}");
                }
            }
            Ok(())
        }
        Command::Gen {
            processors,
            tasks,
            max_weight,
            max_communication,
            density,
            amount,
            solve,
            output,
        } => {
            if !output.try_exists()? {
                std::fs::create_dir_all(&output)?;
            }

            let mut rng = thread_rng();
            for i in 0..amount.get() {
                let graph = data::generate(
                    &mut rng,
                    tasks.get(),
                    density,
                    max_weight.get(),
                    max_communication,
                )?;

                let optimal = if solve {
                    let context = SchedulingContext::new(graph.clone(), processors.get())?;
                    Parallel::default().schedule(&context)?.finish_time()
                } else {
                    0
                };

                let text = data::write_graph(&graph);
                let filename = format!("{processors}_{optimal}_{i}.dot");
                std::fs::write(output.join(filename), text)?;
            }
            Ok(())
        }
    }
}
