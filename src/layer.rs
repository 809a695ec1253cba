//! Layer graph arena
//!
//! Layers and the value slots connecting them live in flat vectors and
//! refer to each other through `SlotId`/`LayerId` handles. A slot is shared
//! by its producing layer and every consumer; the arena owns it.

use std::collections::HashMap;

use serde_json::Value;

use crate::document::{ModelDocument, RawLayer};
use crate::error::{AcuityError, Result};
use crate::params::Parameters;
use crate::shape::Shape;

/// Handle to a value slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

/// Handle to a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub usize);

/// A named tensor placeholder
#[derive(Debug, Clone)]
pub struct ValueSlot {
    pub name: String,
    pub shape: Option<Shape>,
    pub producer: Option<LayerId>,
}

/// One operator instance
#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    pub op: String,
    pub parameters: Parameters,
    pub inputs: Vec<SlotId>,
    pub outputs: Vec<SlotId>,
}

impl Layer {
    fn op_is(&self, kind: &str) -> bool {
        self.op.eq_ignore_ascii_case(kind)
    }

    pub fn is_input(&self) -> bool {
        self.op_is("input")
    }

    pub fn is_output(&self) -> bool {
        self.op_is("output")
    }

    /// Layers that declare their own shape in `parameters`
    pub fn declares_shape(&self) -> bool {
        self.op_is("input") || self.op_is("variable")
    }
}

/// Arena of layers and value slots for one model
#[derive(Debug, Default)]
pub struct LayerGraph {
    slots: Vec<ValueSlot>,
    layers: Vec<Layer>,
    index: HashMap<String, SlotId>,
}

impl LayerGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link every layer of the document to shared slots and seed the
    /// declared shapes of input and variable layers.
    pub fn from_document(document: &ModelDocument) -> Result<Self> {
        let mut graph = Self::new();
        for (name, raw) in &document.layers {
            graph.add_layer(name, raw)?;
        }
        Ok(graph)
    }

    /// Add one layer, resolving its input identifiers and synthesizing
    /// `@<layer>:<port>` output slots.
    pub fn add_layer(&mut self, name: &str, raw: &RawLayer) -> Result<LayerId> {
        let id = LayerId(self.layers.len());

        let inputs = raw
            .inputs
            .iter()
            .map(|input| match input {
                Value::String(s) => Ok(self.slot_for(s)),
                other => Err(AcuityError::invalid_identifier(other)),
            })
            .collect::<Result<Vec<_>>>()?;

        let mut layer = Layer {
            name: name.to_string(),
            op: raw.op.clone(),
            parameters: Parameters::new(raw.parameters.clone()),
            inputs,
            outputs: Vec::with_capacity(raw.outputs.len()),
        };

        let declared = if layer.declares_shape() {
            declared_shape(&layer.parameters)
        } else {
            None
        };

        for port in &raw.outputs {
            let slot_name = format!("@{}:{}", name, port_text(port));
            let slot = self.slot_for(&slot_name);
            let entry = &mut self.slots[slot.0];
            entry.shape = declared.clone();
            entry.producer = Some(id);
            layer.outputs.push(slot);
        }

        self.layers.push(layer);
        Ok(id)
    }

    fn slot_for(&mut self, name: &str) -> SlotId {
        if let Some(id) = self.index.get(name) {
            return *id;
        }
        let id = SlotId(self.slots.len());
        self.slots.push(ValueSlot {
            name: name.to_string(),
            shape: None,
            producer: None,
        });
        self.index.insert(name.to_string(), id);
        id
    }

    pub fn slot(&self, id: SlotId) -> &ValueSlot {
        &self.slots[id.0]
    }

    pub fn slot_by_name(&self, name: &str) -> Option<&ValueSlot> {
        self.index.get(name).map(|id| &self.slots[id.0])
    }

    pub fn shape(&self, id: SlotId) -> Option<&Shape> {
        self.slots[id.0].shape.as_ref()
    }

    /// Assign a computed shape. A resolved slot never goes back to unknown.
    pub fn set_shape(&mut self, id: SlotId, shape: Shape) {
        self.slots[id.0].shape = Some(shape);
    }

    pub fn slots(&self) -> &[ValueSlot] {
        &self.slots
    }

    pub fn layer(&self, id: LayerId) -> &Layer {
        &self.layers[id.0]
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_ids(&self) -> impl Iterator<Item = LayerId> {
        (0..self.layers.len()).map(LayerId)
    }

    pub fn output_layers(&self) -> Vec<LayerId> {
        self.layer_ids()
            .filter(|id| self.layer(*id).is_output())
            .collect()
    }
}

/// Port identifiers are usually strings but may be bare numbers
fn port_text(port: &Value) -> String {
    match port {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Shape an input/variable layer declares for itself.
///
/// An explicit `shape` wins; otherwise `size` ("H W") plus `channels`
/// gives `[0, H, W, C]`. A leading 0 of a 4-D shape is the batch and
/// becomes 1.
pub fn declared_shape(params: &Parameters) -> Option<Shape> {
    let mut dims = match params.int_list("shape") {
        Some(shape) if !shape.is_empty() => shape,
        _ => {
            let size = params.int_list("size")?;
            let channels = params.int("channels")?;
            match size.as_slice() {
                [h, w, ..] => vec![0, *h, *w, channels],
                _ => return None,
            }
        }
    };
    if dims.len() == 4 && dims[0] == 0 {
        dims[0] = 1;
    }
    Shape::from_signed(&dims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawLayer {
        serde_json::from_value(value).unwrap()
    }

    fn params(value: Value) -> Parameters {
        match value {
            Value::Object(map) => Parameters::new(map),
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_declared_shape_batch_normalized() {
        let shape = declared_shape(&params(json!({ "shape": [0, 224, 224, 3] })));
        assert_eq!(shape, Some(Shape::new(vec![1, 224, 224, 3])));
    }

    #[test]
    fn test_declared_shape_other_ranks_untouched() {
        let shape = declared_shape(&params(json!({ "shape": [0, 10] })));
        assert_eq!(shape, Some(Shape::new(vec![0, 10])));
    }

    #[test]
    fn test_declared_shape_from_size_and_channels() {
        let shape = declared_shape(&params(json!({ "size": "32 48", "channels": 3 })));
        assert_eq!(shape, Some(Shape::new(vec![1, 32, 48, 3])));
    }

    #[test]
    fn test_declared_shape_empty_falls_back() {
        let shape = declared_shape(&params(json!({ "shape": [], "size": "8 8", "channels": 1 })));
        assert_eq!(shape, Some(Shape::new(vec![1, 8, 8, 1])));
        assert_eq!(declared_shape(&params(json!({ "shape": [] }))), None);
    }

    #[test]
    fn test_slots_are_shared_between_producer_and_consumers() {
        let mut graph = LayerGraph::new();
        // consumer first: the slot exists before its producer is seen
        let relu = graph
            .add_layer("relu", &raw(json!({ "op": "relu", "inputs": ["@in:out0"], "outputs": ["out0"] })))
            .unwrap();
        let input = graph
            .add_layer("in", &raw(json!({ "op": "input", "parameters": { "shape": [1, 4] }, "outputs": ["out0"] })))
            .unwrap();

        let consumed = graph.layer(relu).inputs[0];
        let produced = graph.layer(input).outputs[0];
        assert_eq!(consumed, produced);
        assert_eq!(graph.slot(produced).producer, Some(input));
        assert_eq!(graph.shape(produced), Some(&Shape::new(vec![1, 4])));
        assert_eq!(graph.slots().len(), 2);
    }

    #[test]
    fn test_non_string_input_is_rejected() {
        let mut graph = LayerGraph::new();
        let err = graph
            .add_layer("bad", &raw(json!({ "op": "relu", "inputs": [7], "outputs": ["out0"] })))
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_VALUE_IDENTIFIER");
    }

    #[test]
    fn test_boundary_layers_case_insensitive() {
        let mut graph = LayerGraph::new();
        graph
            .add_layer("a", &raw(json!({ "op": "Input", "outputs": ["out0"] })))
            .unwrap();
        graph
            .add_layer("b", &raw(json!({ "op": "OUTPUT", "inputs": ["@a:out0"], "outputs": ["out0"] })))
            .unwrap();
        assert!(graph.layer(LayerId(0)).is_input());
        assert_eq!(graph.output_layers(), vec![LayerId(1)]);
    }
}
