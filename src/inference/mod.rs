//! Shape inference over a layer graph
//!
//! Shapes are resolved lazily, starting from the output ports of every
//! `output` layer and recursing into producers whose inputs are still
//! unknown. A layer runs its shape rule once all of its inputs are known;
//! otherwise its outputs stay unknown. Nothing here returns an error.

mod operator;
mod transfer;

pub use operator::{OperatorKind, BROADCAST_OPS, PASSTHROUGH_OPS, REDUCE_OPS};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::layer::{LayerGraph, LayerId, SlotId};
use crate::shape::Shape;

/// Summary of one inference pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InferenceReport {
    /// Slots holding a shape after the pass
    pub resolved: usize,
    /// Slots still unknown after the pass
    pub unresolved: usize,
    /// Op names with no shape rule, in first-seen order
    pub unknown_ops: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Pending,
    InProgress,
    Done,
}

/// Lazy recursive shape resolver
pub struct InferenceEngine<'g> {
    graph: &'g mut LayerGraph,
    visits: Vec<Visit>,
    unknown_ops: Vec<String>,
}

impl<'g> InferenceEngine<'g> {
    pub fn new(graph: &'g mut LayerGraph) -> Self {
        let visits = vec![Visit::Pending; graph.layers().len()];
        Self {
            graph,
            visits,
            unknown_ops: Vec::new(),
        }
    }

    /// Resolve every slot reachable from the declared graph outputs
    pub fn run(graph: &'g mut LayerGraph) -> InferenceReport {
        let mut engine = Self::new(graph);
        for layer in engine.graph.output_layers() {
            let outputs = engine.graph.layer(layer).outputs.clone();
            for slot in outputs {
                engine.resolve(slot);
            }
        }
        engine.finish()
    }

    /// Resolve one slot by evaluating its producer
    pub fn resolve(&mut self, slot: SlotId) {
        if let Some(producer) = self.graph.slot(slot).producer {
            self.evaluate(producer);
        }
    }

    fn evaluate(&mut self, id: LayerId) {
        match self.visits[id.0] {
            Visit::Done => return,
            Visit::InProgress => {
                warn!(layer = %self.graph.layer(id).name, "cycle in layer graph, leaving shapes unresolved");
                return;
            }
            Visit::Pending => {}
        }
        self.visits[id.0] = Visit::InProgress;

        let inputs = self.graph.layer(id).inputs.clone();
        for &input in &inputs {
            if self.graph.shape(input).is_none() {
                self.resolve(input);
                if self.graph.shape(input).is_none() {
                    debug!(
                        layer = %self.graph.layer(id).name,
                        input = %self.graph.slot(input).name,
                        "input shape unresolved, skipping layer"
                    );
                    self.visits[id.0] = Visit::Done;
                    return;
                }
            }
        }

        let shapes: Vec<Shape> = inputs
            .iter()
            .filter_map(|&input| self.graph.shape(input).cloned())
            .collect();
        let layer = self.graph.layer(id);
        let kind = OperatorKind::classify(&layer.op);
        if kind == OperatorKind::Unknown
            && !layer.is_output()
            && !layer.declares_shape()
            && !self.unknown_ops.contains(&layer.op)
        {
            self.unknown_ops.push(layer.op.clone());
        }

        let computed = kind.infer(&shapes, &layer.parameters);
        let outputs = layer.outputs.clone();
        match computed {
            Some(computed) => {
                // extra shapes beyond the declared outputs are dropped
                for (slot, shape) in outputs.into_iter().zip(computed) {
                    self.graph.set_shape(slot, shape);
                }
            }
            None => {
                debug!(
                    layer = %layer.name,
                    op = %layer.op,
                    "shape rule produced no shapes"
                );
            }
        }
        self.visits[id.0] = Visit::Done;
    }

    fn finish(self) -> InferenceReport {
        let resolved = self
            .graph
            .slots()
            .iter()
            .filter(|slot| slot.shape.is_some())
            .count();
        let report = InferenceReport {
            resolved,
            unresolved: self.graph.slots().len() - resolved,
            unknown_ops: self.unknown_ops,
        };
        info!(
            resolved = report.resolved,
            unresolved = report.unresolved,
            unknown_ops = report.unknown_ops.len(),
            "shape inference finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ModelDocument;

    fn graph(layers: &str) -> LayerGraph {
        let text = format!(
            r#"{{ "MetaData": {{ "Name": "t", "AcuityVersion": "5", "Platform": "tf" }}, "Layers": {} }}"#,
            layers
        );
        LayerGraph::from_document(&ModelDocument::from_json(&text).unwrap()).unwrap()
    }

    fn shape_of(graph: &LayerGraph, name: &str) -> Option<Vec<usize>> {
        graph
            .slot_by_name(name)
            .and_then(|slot| slot.shape.as_ref())
            .map(|s| s.dims().to_vec())
    }

    #[test]
    fn test_chain_resolves_backward_from_output() {
        let mut g = graph(
            r#"{
                "in": { "op": "input", "parameters": { "shape": [0, 8, 8, 3] }, "inputs": [], "outputs": ["out0"] },
                "relu": { "op": "relu", "parameters": {}, "inputs": ["@in:out0"], "outputs": ["out0"] },
                "pool": { "op": "pooling", "parameters": { "padding": "VALID", "stride_h": 2, "stride_w": 2, "ksize_h": 2, "ksize_w": 2 },
                          "inputs": ["@relu:out0"], "outputs": ["out0"] },
                "out": { "op": "output", "parameters": {}, "inputs": ["@pool:out0"], "outputs": ["out0"] }
            }"#,
        );
        let report = InferenceEngine::run(&mut g);
        assert_eq!(shape_of(&g, "@relu:out0"), Some(vec![1, 8, 8, 3]));
        assert_eq!(shape_of(&g, "@pool:out0"), Some(vec![1, 4, 4, 3]));
        // the output layer itself has no shape rule
        assert_eq!(shape_of(&g, "@out:out0"), None);
        assert!(report.unknown_ops.is_empty());
        assert_eq!(report.resolved, 3);
        assert_eq!(report.unresolved, 1);
    }

    #[test]
    fn test_unresolved_input_leaves_outputs_unknown() {
        let mut g = graph(
            r#"{
                "in": { "op": "input", "parameters": {}, "inputs": [], "outputs": ["out0"] },
                "relu": { "op": "relu", "parameters": {}, "inputs": ["@in:out0"], "outputs": ["out0"] },
                "out": { "op": "output", "parameters": {}, "inputs": ["@relu:out0"], "outputs": ["out0"] }
            }"#,
        );
        InferenceEngine::run(&mut g);
        assert_eq!(shape_of(&g, "@in:out0"), None);
        assert_eq!(shape_of(&g, "@relu:out0"), None);
    }

    #[test]
    fn test_unknown_op_blocks_downstream() {
        let mut g = graph(
            r#"{
                "in": { "op": "input", "parameters": { "shape": [1, 4] }, "inputs": [], "outputs": ["out0"] },
                "odd": { "op": "mystery", "parameters": {}, "inputs": ["@in:out0"], "outputs": ["out0"] },
                "relu": { "op": "relu", "parameters": {}, "inputs": ["@odd:out0"], "outputs": ["out0"] },
                "out": { "op": "output", "parameters": {}, "inputs": ["@relu:out0"], "outputs": ["out0"] }
            }"#,
        );
        let report = InferenceEngine::run(&mut g);
        assert_eq!(shape_of(&g, "@odd:out0"), None);
        assert_eq!(shape_of(&g, "@relu:out0"), None);
        assert_eq!(report.unknown_ops, vec!["mystery".to_string()]);
    }

    #[test]
    fn test_unreachable_layers_are_not_evaluated() {
        let mut g = graph(
            r#"{
                "in": { "op": "input", "parameters": { "shape": [1, 4] }, "inputs": [], "outputs": ["out0"] },
                "dangling": { "op": "relu", "parameters": {}, "inputs": ["@in:out0"], "outputs": ["out0"] },
                "out": { "op": "output", "parameters": {}, "inputs": ["@in:out0"], "outputs": ["out0"] }
            }"#,
        );
        InferenceEngine::run(&mut g);
        assert_eq!(shape_of(&g, "@dangling:out0"), None);
    }

    #[test]
    fn test_extra_shapes_are_dropped() {
        let mut g = graph(
            r#"{
                "in": { "op": "input", "parameters": { "shape": [2, 5, 3] }, "inputs": [], "outputs": ["out0"] },
                "lstm": { "op": "lstm", "parameters": { "weights": 7 }, "inputs": ["@in:out0"], "outputs": ["out0"] },
                "out": { "op": "output", "parameters": {}, "inputs": ["@lstm:out0"], "outputs": ["out0"] }
            }"#,
        );
        InferenceEngine::run(&mut g);
        assert_eq!(shape_of(&g, "@lstm:out0"), Some(vec![2, 7]));
        assert_eq!(g.layer(LayerId(1)).outputs.len(), 1);
    }

    #[test]
    fn test_cycle_is_left_unresolved() {
        let mut g = graph(
            r#"{
                "a": { "op": "relu", "parameters": {}, "inputs": ["@b:out0"], "outputs": ["out0"] },
                "b": { "op": "relu", "parameters": {}, "inputs": ["@a:out0"], "outputs": ["out0"] },
                "out": { "op": "output", "parameters": {}, "inputs": ["@b:out0"], "outputs": ["out0"] }
            }"#,
        );
        InferenceEngine::run(&mut g);
        assert_eq!(shape_of(&g, "@a:out0"), None);
        assert_eq!(shape_of(&g, "@b:out0"), None);
    }

    #[test]
    fn test_shared_input_resolved_once() {
        let mut g = graph(
            r#"{
                "in": { "op": "input", "parameters": { "shape": [3] }, "inputs": [], "outputs": ["out0"] },
                "x": { "op": "input", "parameters": { "shape": [2, 1, 3] }, "inputs": [], "outputs": ["out0"] },
                "relu": { "op": "relu", "parameters": {}, "inputs": ["@in:out0"], "outputs": ["out0"] },
                "add": { "op": "add", "parameters": {}, "inputs": ["@relu:out0", "@x:out0"], "outputs": ["out0"] },
                "mul": { "op": "multiply", "parameters": {}, "inputs": ["@relu:out0", "@add:out0"], "outputs": ["out0"] },
                "out": { "op": "output", "parameters": {}, "inputs": ["@mul:out0"], "outputs": ["out0"] }
            }"#,
        );
        InferenceEngine::run(&mut g);
        assert_eq!(shape_of(&g, "@add:out0"), Some(vec![2, 1, 3]));
        assert_eq!(shape_of(&g, "@mul:out0"), Some(vec![2, 1, 3]));
    }
}
