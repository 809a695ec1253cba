//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fmt::Write as _;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::info;

use super::OutputFormat;
use crate::document::ModelDocument;
use crate::error::Result;
use crate::graph::{Argument, Graph, Model};
use crate::schema::NoSchema;

/// Load and build a model from a JSON file.
pub fn load_model(path: &Path) -> Result<Model> {
    info!("Loading model: {}", path.display());

    let reader = BufReader::new(File::open(path)?);
    let document = ModelDocument::from_reader(reader)?;
    Model::from_document(&NoSchema, &document)
}

/// Print the model header, inputs, outputs and nodes.
pub fn inspect(path: &Path, format: OutputFormat) -> Result<()> {
    let model = load_model(path)?;
    match format {
        OutputFormat::Text => print!("{}", render_model(&model)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&model)?),
    }
    Ok(())
}

/// Print every value with its inferred type.
pub fn shapes(path: &Path) -> Result<()> {
    let model = load_model(path)?;
    for graph in &model.graphs {
        print!("{}", render_values(graph));
    }
    Ok(())
}

fn render_argument(argument: &Argument) -> String {
    let values: Vec<String> = argument
        .value
        .iter()
        .map(|v| format!("{}: {}", v.name, v.tensor_type))
        .collect();
    format!("{} ({})", argument.name, values.join(", "))
}

/// Text summary of a model
pub fn render_model(model: &Model) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Model: {}", model.name);
    let _ = writeln!(out, "Format: {}", model.format);
    let _ = writeln!(out, "Runtime: {}", model.runtime);

    for graph in &model.graphs {
        let _ = writeln!(out, "{:-<60}", "");
        for input in &graph.inputs {
            let _ = writeln!(out, "input  {}", render_argument(input));
        }
        for output in &graph.outputs {
            let _ = writeln!(out, "output {}", render_argument(output));
        }
        let _ = writeln!(out, "{:-<60}", "");
        for node in &graph.nodes {
            let outputs: Vec<String> = node
                .outputs
                .iter()
                .flat_map(|a| a.value.iter().map(|v| v.tensor_type.to_string()))
                .collect();
            let _ = writeln!(
                out,
                "{} [{}] -> {}",
                node.name,
                node.op_type.name,
                outputs.join(", ")
            );
        }
    }
    out
}

/// Text listing of every value plus the inference summary
pub fn render_values(graph: &Graph) -> String {
    let mut out = String::new();
    for value in &graph.values {
        let _ = writeln!(out, "{} {}", value.name, value.tensor_type);
    }
    let report = &graph.inference;
    let _ = writeln!(
        out,
        "resolved: {} | unresolved: {}",
        report.resolved, report.unresolved
    );
    if !report.unknown_ops.is_empty() {
        let _ = writeln!(out, "no shape rule: {}", report.unknown_ops.join(", "));
    }
    out
}
