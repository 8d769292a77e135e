mod dot;
mod generate;
mod run;

pub use dot::{parse_graph, read_graph, write_graph, write_schedule};
pub use generate::generate;
pub use run::{run, samples, Report, ReportEntry};
