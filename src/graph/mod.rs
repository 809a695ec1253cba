//! Generic graph handed to the viewer
//!
//! A `Model` holds one `Graph` of `Node`s whose `Argument`s carry typed
//! `Value`s. Everything here is plain data; `GraphBuilder` fills it in.

mod builder;

pub use builder::GraphBuilder;

use serde::Serialize;

use crate::document::ModelDocument;
use crate::error::Result;
use crate::inference::InferenceReport;
use crate::schema::{AttributeSchema, OperatorSchema, OperatorType};
use crate::shape::TensorType;

/// A loaded Acuity model
#[derive(Debug, Clone, Serialize)]
pub struct Model {
    pub name: String,
    /// `Acuity v<version>`
    pub format: String,
    /// Source framework recorded by the exporter
    pub runtime: String,
    pub graphs: Vec<Graph>,
}

impl Model {
    /// Build the model from a parsed document
    pub fn from_document(schema: &dyn OperatorSchema, document: &ModelDocument) -> Result<Self> {
        let graph = GraphBuilder::new(schema).build(document)?;
        Ok(Self {
            name: document.meta_data.name.clone(),
            format: format!("Acuity v{}", document.meta_data.version()),
            runtime: document.meta_data.platform.clone(),
            graphs: vec![graph],
        })
    }

    /// Parse and build in one step
    pub fn from_json(schema: &dyn OperatorSchema, text: &str) -> Result<Self> {
        let document = ModelDocument::from_json(text)?;
        Self::from_document(schema, &document)
    }
}

/// Nodes plus the declared graph boundary
#[derive(Debug, Clone, Default, Serialize)]
pub struct Graph {
    pub inputs: Vec<Argument>,
    pub outputs: Vec<Argument>,
    pub nodes: Vec<Node>,
    /// Every value of the model in creation order
    pub values: Vec<Value>,
    pub inference: InferenceReport,
}

impl Graph {
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|v| v.name == name)
    }
}

/// One non-boundary layer
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub name: String,
    #[serde(rename = "type")]
    pub op_type: OperatorType,
    pub inputs: Vec<Argument>,
    pub outputs: Vec<Argument>,
    pub attributes: Vec<Attribute>,
}

impl Node {
    pub fn input(&self, name: &str) -> Option<&Argument> {
        self.inputs.iter().find(|a| a.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&Argument> {
        self.outputs.iter().find(|a| a.name == name)
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

/// Named list of values
#[derive(Debug, Clone, Serialize)]
pub struct Argument {
    pub name: String,
    pub value: Vec<Value>,
}

impl Argument {
    pub fn new(name: impl Into<String>, value: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A typed tensor reference
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Value {
    pub name: String,
    #[serde(rename = "type")]
    pub tensor_type: TensorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initializer: Option<Tensor>,
}

impl Value {
    pub fn new(name: impl Into<String>, tensor_type: TensorType) -> Self {
        Self {
            name: name.into(),
            tensor_type,
            initializer: None,
        }
    }

    pub fn with_initializer(mut self, initializer: Tensor) -> Self {
        self.initializer = Some(initializer);
        self
    }
}

/// Placeholder for a weight the document does not carry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tensor {
    #[serde(rename = "type")]
    pub tensor_type: TensorType,
    pub category: String,
}

impl Tensor {
    pub fn constant(tensor_type: TensorType) -> Self {
        Self {
            tensor_type,
            category: "Constant".to_string(),
        }
    }
}

/// A layer parameter shown on a node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub value: serde_json::Value,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    pub visible: bool,
}

impl Attribute {
    /// Hidden when the schema default equals the value
    pub fn new(schema: Option<&AttributeSchema>, name: &str, value: serde_json::Value) -> Self {
        let type_name = schema.and_then(|s| s.type_name.clone());
        let visible = !matches!(
            schema.and_then(|s| s.default.as_ref()),
            Some(default) if same_value(default, &value)
        );
        Self {
            name: name.to_string(),
            value,
            type_name,
            visible,
        }
    }
}

/// Numbers compare by value, so `1` matches a default of `1.0`
fn same_value(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    match (a, b) {
        (serde_json::Value::Number(x), serde_json::Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}
