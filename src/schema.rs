//! Operator schema lookup
//!
//! The graph builder asks a schema for port names, constant inputs and
//! attribute defaults. Where the schema comes from is the caller's
//! business; `NoSchema` is used when there is none.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named port of an operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSchema {
    pub name: String,
}

impl PortSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Type descriptor of an operator
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OperatorType {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default)]
    pub inputs: Vec<PortSchema>,

    #[serde(default)]
    pub outputs: Vec<PortSchema>,

    /// Weight-like inputs that are not wired in the layer graph
    #[serde(default)]
    pub constants: Vec<PortSchema>,
}

impl OperatorType {
    /// Bare descriptor for an op the schema does not know
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Port name for input `index`, `input<index>` when undeclared
    pub fn input_name(&self, index: usize) -> String {
        self.inputs
            .get(index)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("input{}", index))
    }

    /// Port name for output `index`, `output<index>` when undeclared
    pub fn output_name(&self, index: usize) -> String {
        self.outputs
            .get(index)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("output{}", index))
    }
}

/// Metadata for one attribute of an operator
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AttributeSchema {
    pub name: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Source of operator type descriptors
pub trait OperatorSchema {
    /// Descriptor for an op name
    fn operator(&self, op: &str) -> Option<&OperatorType>;

    /// Metadata for attribute `name` of operator type `op_type`
    fn attribute(&self, op_type: &str, name: &str) -> Option<&AttributeSchema>;
}

/// Schema that knows nothing; every lookup falls back to defaults
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSchema;

impl OperatorSchema for NoSchema {
    fn operator(&self, _op: &str) -> Option<&OperatorType> {
        None
    }

    fn attribute(&self, _op_type: &str, _name: &str) -> Option<&AttributeSchema> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_name_fallback() {
        let ty = OperatorType {
            name: "convolution".to_string(),
            inputs: vec![PortSchema::new("input")],
            ..OperatorType::default()
        };
        assert_eq!(ty.input_name(0), "input");
        assert_eq!(ty.input_name(1), "input1");
        assert_eq!(ty.output_name(0), "output0");
    }

    #[test]
    fn test_no_schema() {
        assert!(NoSchema.operator("relu").is_none());
        assert!(NoSchema.attribute("relu", "alpha").is_none());
    }
}
