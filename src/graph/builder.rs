//! Layer document to graph conversion
//!
//! Links layers through shared slots, runs shape inference, then splits
//! the layers into graph inputs, graph outputs and ordinary nodes.

use tracing::debug;

use super::{Argument, Attribute, Graph, Node, Tensor, Value};
use crate::document::ModelDocument;
use crate::error::{AcuityError, Result};
use crate::inference::InferenceEngine;
use crate::layer::{Layer, LayerGraph, SlotId};
use crate::schema::{OperatorSchema, OperatorType};
use crate::shape::{TensorShape, TensorType};

/// Builds a `Graph` from a model document
pub struct GraphBuilder<'s> {
    schema: &'s dyn OperatorSchema,
}

impl<'s> GraphBuilder<'s> {
    pub fn new(schema: &'s dyn OperatorSchema) -> Self {
        Self { schema }
    }

    pub fn build(&self, document: &ModelDocument) -> Result<Graph> {
        let mut layers = LayerGraph::from_document(document)?;
        let inference = InferenceEngine::run(&mut layers);

        let values: Vec<Value> = layers
            .slots()
            .iter()
            .map(|slot| {
                let shape = TensorShape::new(slot.shape.as_ref());
                Value::new(slot.name.clone(), TensorType::new(shape))
            })
            .collect();
        let value_of = |slot: SlotId| -> Value { values[slot.0].clone() };

        let mut graph = Graph::default();
        for layer in layers.layers() {
            if layer.is_input() {
                let output = layer.outputs.first().ok_or_else(|| missing_port(layer, "output"))?;
                let value = value_of(*output);
                graph.inputs.push(Argument::new(layer.name.clone(), vec![value]));
            } else if layer.is_output() {
                let input = layer.inputs.first().ok_or_else(|| missing_port(layer, "input"))?;
                let value = value_of(*input);
                graph.outputs.push(Argument::new(layer.name.clone(), vec![value]));
            } else {
                let node = self.node(layer, &value_of);
                graph.nodes.push(node);
            }
        }
        debug!(
            nodes = graph.nodes.len(),
            inputs = graph.inputs.len(),
            outputs = graph.outputs.len(),
            "graph built"
        );

        graph.values = values;
        graph.inference = inference;
        Ok(graph)
    }

    fn node(&self, layer: &Layer, value_of: &dyn Fn(SlotId) -> Value) -> Node {
        let op_type = self
            .schema
            .operator(&layer.op)
            .cloned()
            .unwrap_or_else(|| OperatorType::named(layer.op.clone()));

        let attributes = layer
            .parameters
            .iter()
            .map(|(key, value)| {
                Attribute::new(self.schema.attribute(&op_type.name, key), key, value.clone())
            })
            .collect();

        let mut inputs: Vec<Argument> = layer
            .inputs
            .iter()
            .enumerate()
            .map(|(i, slot)| Argument::new(op_type.input_name(i), vec![value_of(*slot)]))
            .collect();

        for constant in &op_type.constants {
            let tensor_type = TensorType::new(TensorShape::unknown());
            let value =
                Value::new("", tensor_type.clone()).with_initializer(Tensor::constant(tensor_type));
            inputs.push(Argument::new(constant.name.clone(), vec![value]));
        }

        let outputs = layer
            .outputs
            .iter()
            .enumerate()
            .map(|(i, slot)| Argument::new(op_type.output_name(i), vec![value_of(*slot)]))
            .collect();

        Node {
            name: layer.name.clone(),
            op_type,
            inputs,
            outputs,
            attributes,
        }
    }
}

fn missing_port(layer: &Layer, kind: &str) -> AcuityError {
    AcuityError::MalformedLayer {
        layer: layer.name.clone(),
        reason: format!("{} layer has no {}", layer.op, kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeSchema, NoSchema, PortSchema};
    use serde_json::json;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapSchema {
        types: HashMap<String, OperatorType>,
        attributes: HashMap<(String, String), AttributeSchema>,
    }

    impl OperatorSchema for MapSchema {
        fn operator(&self, op: &str) -> Option<&OperatorType> {
            self.types.get(op)
        }

        fn attribute(&self, op_type: &str, name: &str) -> Option<&AttributeSchema> {
            self.attributes.get(&(op_type.to_string(), name.to_string()))
        }
    }

    const MODEL: &str = r#"{
        "MetaData": { "Name": "m", "AcuityVersion": "5", "Platform": "tensorflow" },
        "Layers": {
            "in": { "op": "input", "parameters": { "shape": [0, 8, 8, 3] }, "inputs": [], "outputs": ["out0"] },
            "conv": { "op": "convolution",
                      "parameters": { "padding": "SAME", "stride_h": 1, "stride_w": 1, "ksize_h": 3, "ksize_w": 3,
                                      "pad": [0, 0, 0, 0], "weights": 16, "bias": true },
                      "inputs": ["@in:out0"], "outputs": ["out0"] },
            "out": { "op": "output", "parameters": {}, "inputs": ["@conv:out0"], "outputs": ["out0"] }
        }
    }"#;

    #[test]
    fn test_partition_without_schema() {
        let doc = ModelDocument::from_json(MODEL).unwrap();
        let graph = GraphBuilder::new(&NoSchema).build(&doc).unwrap();

        assert_eq!(graph.inputs.len(), 1);
        assert_eq!(graph.inputs[0].name, "in");
        assert_eq!(graph.inputs[0].value[0].tensor_type.to_string(), "?[1,8,8,3]");
        assert_eq!(graph.outputs[0].name, "out");
        assert_eq!(graph.outputs[0].value[0].name, "@conv:out0");

        let conv = graph.node("conv").unwrap();
        assert_eq!(conv.op_type.name, "convolution");
        assert_eq!(conv.inputs[0].name, "input0");
        assert_eq!(conv.outputs[0].name, "output0");
        assert_eq!(conv.outputs[0].value[0].tensor_type.to_string(), "?[1,8,8,16]");
        assert_eq!(conv.attributes.len(), 8);
        assert!(conv.attributes.iter().all(|a| a.visible));
    }

    #[test]
    fn test_schema_ports_constants_and_defaults() {
        let mut schema = MapSchema::default();
        schema.types.insert(
            "convolution".to_string(),
            OperatorType {
                name: "convolution".to_string(),
                category: Some("Layer".to_string()),
                inputs: vec![PortSchema::new("input")],
                outputs: vec![PortSchema::new("output")],
                constants: vec![PortSchema::new("weight"), PortSchema::new("bias")],
            },
        );
        schema.attributes.insert(
            ("convolution".to_string(), "bias".to_string()),
            AttributeSchema {
                name: "bias".to_string(),
                type_name: Some("boolean".to_string()),
                default: Some(json!(true)),
            },
        );

        let doc = ModelDocument::from_json(MODEL).unwrap();
        let graph = GraphBuilder::new(&schema).build(&doc).unwrap();
        let conv = graph.node("conv").unwrap();

        let names: Vec<&str> = conv.inputs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["input", "weight", "bias"]);
        let weight = &conv.input("weight").unwrap().value[0];
        assert_eq!(weight.name, "");
        assert_eq!(weight.initializer.as_ref().unwrap().category, "Constant");
        assert_eq!(conv.outputs[0].name, "output");

        assert!(!conv.attribute("bias").unwrap().visible);
        assert!(conv.attribute("weights").unwrap().visible);
    }

    #[test]
    fn test_input_layer_without_output_is_malformed() {
        let doc = ModelDocument::from_json(
            r#"{ "MetaData": {}, "Layers": { "in": { "op": "input", "outputs": [] } } }"#,
        )
        .unwrap();
        let err = GraphBuilder::new(&NoSchema).build(&doc).unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_LAYER");
    }
}
