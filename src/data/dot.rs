use crate::core::{Graph, GraphBuilder, Schedule};
use anyhow::{anyhow, Context};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace1},
    combinator::{all_consuming, opt, recognize, value},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
    IResult, Parser,
};
use std::fmt::Write;
use std::io::BufRead;

/// A statement of the graph body.
#[derive(Clone, Debug, Eq, PartialEq)]
enum Statement<'a> {
    Node {
        id: &'a str,
        attributes: Vec<(&'a str, &'a str)>,
    },
    Edge {
        from: &'a str,
        to: &'a str,
        attributes: Vec<(&'a str, &'a str)>,
    },
}

/// Parses whitespace and `//` comments.
fn ws(input: &str) -> IResult<&str, ()> {
    value((), many0(alt((value((), multispace1), value((), comment))))).parse(input)
}

fn comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(tag("//"), take_while(|c| c != '\n'))).parse(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '.').parse(input)
}

fn quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_while(|c| c != '"'), char('"')).parse(input)
}

fn name(input: &str) -> IResult<&str, &str> {
    alt((quoted, identifier)).parse(input)
}

/// Parses `key = value`.
fn attribute(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, key) = name(input)?;
    let (input, _) = (ws, char('='), ws).parse(input)?;
    let (input, value) = name(input)?;
    Ok((input, (key, value)))
}

/// Parses `[key = value, ...]`.
fn attributes(input: &str) -> IResult<&str, Vec<(&str, &str)>> {
    delimited(
        (char('['), ws),
        separated_list0((ws, alt((char(','), char(';'))), ws), attribute),
        (ws, char(']')),
    )
    .parse(input)
}

/// Parses `id [..];` or `from -> to [..];`.
fn statement(input: &str) -> IResult<&str, Statement> {
    let (input, from) = name(input)?;
    let (input, to) = opt(preceded((ws, tag("->"), ws), name)).parse(input)?;
    let (input, attributes) = opt(preceded(ws, attributes)).parse(input)?;
    let (input, _) = opt(preceded(ws, char(';'))).parse(input)?;

    let attributes = attributes.unwrap_or_default();
    let statement = match to {
        Some(to) => Statement::Edge {
            from,
            to,
            attributes,
        },
        None => Statement::Node {
            id: from,
            attributes,
        },
    };
    Ok((input, statement))
}

/// Parses `digraph name { statements }`.
fn document(input: &str) -> IResult<&str, (Option<&str>, Vec<Statement>)> {
    let (input, _) = (ws, tag("digraph"), ws).parse(input)?;
    let (input, id) = opt(name).parse(input)?;
    let (input, _) = (ws, char('{'), ws).parse(input)?;
    let (input, statements) = many0(terminated(statement, ws)).parse(input)?;
    let (input, _) = (char('}'), ws).parse(input)?;
    Ok((input, (id, statements)))
}

fn weight(attributes: &[(&str, &str)]) -> anyhow::Result<Option<u64>> {
    let weight = attributes.iter().find(|(key, _)| key.eq_ignore_ascii_case("weight"));
    weight
        .map(|(_, value)| value.parse().with_context(|| format!("Invalid weight `{value}`")))
        .transpose()
}

/// Parses a task graph. Nodes need a `Weight` attribute, edges without one cost nothing.
///
/// # Errors
/// - If the text is not a graph description.
/// - If a node has no valid weight.
/// - If the graph cannot be built.
pub fn parse_graph(input: &str) -> anyhow::Result<Graph> {
    let (_, (id, statements)) = all_consuming(document)
        .parse(input)
        .map_err(|error| anyhow!("Cannot parse graph: {error}"))?;

    let mut builder = GraphBuilder::new();
    builder.set_id(id.unwrap_or_default())?;

    for statement in &statements {
        if let Statement::Node { id, attributes } = statement {
            let weight = weight(attributes)?.with_context(|| format!("Node `{id}` has no weight"))?;
            builder.add_node(*id, weight)?;
        }
    }

    for statement in &statements {
        if let Statement::Edge {
            from,
            to,
            attributes,
        } = statement
        {
            builder.add_edge(from, to, weight(attributes)?.unwrap_or_default())?;
        }
    }

    Ok(builder.build()?)
}

/// Reads a task graph from the reader.
///
/// # Errors
/// - If the reader fails or the graph is invalid.
pub fn read_graph(reader: &mut impl BufRead) -> anyhow::Result<Graph> {
    let mut input = String::new();
    reader.read_to_string(&mut input)?;
    parse_graph(&input)
}

/// Writes the graph in the format read by [`parse_graph`].
#[must_use]
pub fn write_graph(graph: &Graph) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "digraph \"{}\" {{", graph.id());

    for node in graph.nodes() {
        let _ = writeln!(output, "\t{}\t[Weight={}];", node.id(), node.weight());
    }
    for node in graph.nodes() {
        for &(succ, weight) in node.outgoing() {
            let succ = graph.node(succ).id();
            let _ = writeln!(output, "\t{} -> {succ}\t[Weight={weight}];", node.id());
        }
    }

    output.push('}');
    output.push('\n');
    output
}

/// Writes the schedule as a graph whose nodes carry their start time and processor.
#[must_use]
pub fn write_schedule(graph: &Graph, schedule: &Schedule) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "digraph \"{}\" {{", graph.id());

    for &task in graph.topological_order() {
        let node = graph.node(task);
        let Some(scheduled) = schedule.get(task) else {
            continue;
        };

        let _ = writeln!(
            output,
            "\t{} [Weight={}, Start={}, Processor={}];",
            node.id(),
            node.weight(),
            scheduled.start,
            scheduled.processor
        );
        for &(pred, weight) in node.incoming() {
            let pred = graph.node(pred).id();
            let _ = writeln!(output, "\t{pred} -> {} [Weight={weight}];", node.id());
        }
    }

    output.push('}');
    output.push('\n');
    output
}
