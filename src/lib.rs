//! Acuity - model reader with shape inference
//!
//! Reads an Acuity JSON model description (`MetaData` + `Layers`) and turns
//! it into a generic graph of nodes, arguments and typed values for a
//! model viewer.
//!
//! # Architecture
//!
//! - `document`: serde model of the JSON file
//! - `layer`: arena of layers and the value slots that connect them
//! - `inference`: lazy, output-driven shape inference with one shape rule
//!   per operator kind
//! - `graph`: the viewer-facing `Model`/`Graph`/`Node` types and their builder

pub mod cli;
pub mod document;
pub mod error;
pub mod graph;
pub mod inference;
pub mod layer;
pub mod params;
pub mod schema;
pub mod shape;

pub use document::{MetaData, ModelDocument, RawLayer};
pub use error::{AcuityError, Result};
pub use graph::{Argument, Attribute, Graph, GraphBuilder, Model, Node, Tensor, Value};
pub use inference::{InferenceEngine, InferenceReport, OperatorKind};
pub use layer::{Layer, LayerGraph, LayerId, SlotId, ValueSlot};
pub use params::Parameters;
pub use schema::{AttributeSchema, NoSchema, OperatorSchema, OperatorType, PortSchema};
pub use shape::{Shape, TensorShape, TensorType};
