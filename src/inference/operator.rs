//! Operator classification
//!
//! An op name maps to exactly one `OperatorKind`. Lookup is case
//! sensitive and follows a fixed precedence: explicit rule, then the
//! passthrough, broadcast and reduce families, then unknown.

use serde::Serialize;

use super::transfer;
use crate::params::Parameters;
use crate::shape::Shape;

/// Elementwise ops whose output has the shape of input 0
pub const PASSTHROUGH_OPS: &[&str] = &[
    "LocalResponseNormalization",
    "a_times_b_plus_c",
    "abs",
    "batchnorm_single",
    "batchnormalize",
    "cast",
    "clipbyvalue",
    "dequantize",
    "dtype_converter",
    "elu",
    "exp",
    "floor",
    "groupnormalize",
    "hard_sigmoid",
    "hard_swish",
    "instancenormalize",
    "l2normalize",
    "l2normalizescale",
    "layernormalize",
    "leakyrelu",
    "log",
    "log_softmax",
    "mish",
    "neg",
    "norm_with_channel_mean",
    "norm_with_min_max",
    "norm_with_scale",
    "pow",
    "prelu",
    "quantize",
    "relu",
    "relu_keras",
    "relun",
    "reverse",
    "round",
    "rsqrt",
    "sigmoid",
    "sin",
    "softmax",
    "softrelu",
    "sqrt",
    "square",
    "tanh",
];

/// Binary elementwise ops with numpy broadcasting.
///
/// `fllor_mod` is spelled the way exporters write it. `pow` is also a
/// passthrough op and resolves as one.
pub const BROADCAST_OPS: &[&str] = &[
    "add",
    "equal",
    "fllor_mod",
    "floor_div",
    "greater",
    "greater_equal",
    "less",
    "less_equal",
    "logical_and",
    "logical_or",
    "minimum",
    "multiply",
    "not_equal",
    "pow",
    "real_div",
    "squared_difference",
    "subtract",
];

/// Reductions sharing the `axis_list`/`keep_dims` rule
pub const REDUCE_OPS: &[&str] = &[
    "reduceany",
    "reducemax",
    "reducemean",
    "reducemin",
    "reduceprod",
    "reducesum",
];

/// Shape rule selected for an op
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    Concat,
    Conv1d,
    Convolution,
    Deconvolution,
    Fullconnect,
    Gather,
    Lstm,
    Matmul,
    Pad,
    Permute,
    Pooling,
    Repeat,
    Reshape,
    SequenceMask,
    Slice,
    Squeeze,
    Space2Depth,
    Split,
    Stack,
    StridedSlice,
    Passthrough,
    Broadcast,
    Reduce,
    Unknown,
}

impl OperatorKind {
    /// Explicit rule registered under this exact name
    pub fn from_registry(op: &str) -> Option<Self> {
        let kind = match op {
            "broadcast" => OperatorKind::Broadcast,
            "concat" => OperatorKind::Concat,
            "conv1d" => OperatorKind::Conv1d,
            "convolution" => OperatorKind::Convolution,
            "deconvolution" => OperatorKind::Deconvolution,
            "fullconnect" => OperatorKind::Fullconnect,
            "gather" => OperatorKind::Gather,
            "lstm" => OperatorKind::Lstm,
            "matmul" => OperatorKind::Matmul,
            "pad" => OperatorKind::Pad,
            "permute" => OperatorKind::Permute,
            "pooling" => OperatorKind::Pooling,
            "reduce" => OperatorKind::Reduce,
            "repeat" => OperatorKind::Repeat,
            "reshape" => OperatorKind::Reshape,
            "sequence_mask" => OperatorKind::SequenceMask,
            "slice" => OperatorKind::Slice,
            "squeeze" => OperatorKind::Squeeze,
            "space2depth" => OperatorKind::Space2Depth,
            "split" => OperatorKind::Split,
            "stack" => OperatorKind::Stack,
            "stridedslice" => OperatorKind::StridedSlice,
            _ => return None,
        };
        Some(kind)
    }

    /// Classify an op name
    pub fn classify(op: &str) -> Self {
        if let Some(kind) = Self::from_registry(op) {
            kind
        } else if PASSTHROUGH_OPS.contains(&op) {
            OperatorKind::Passthrough
        } else if BROADCAST_OPS.contains(&op) {
            OperatorKind::Broadcast
        } else if REDUCE_OPS.contains(&op) {
            OperatorKind::Reduce
        } else {
            OperatorKind::Unknown
        }
    }

    /// Apply this kind's shape rule.
    ///
    /// `None` means the rule could not produce shapes for these inputs and
    /// parameters. `Unknown` always yields an empty list.
    pub fn infer(self, inputs: &[Shape], params: &Parameters) -> Option<Vec<Shape>> {
        let inputs: Vec<Vec<i64>> = inputs.iter().map(Shape::signed).collect();
        let outputs = match self {
            OperatorKind::Concat => transfer::concat(&inputs, params),
            OperatorKind::Conv1d => transfer::conv1d(&inputs, params),
            OperatorKind::Convolution => transfer::convolution(&inputs, params),
            OperatorKind::Deconvolution => transfer::deconvolution(&inputs, params),
            OperatorKind::Fullconnect => transfer::fullconnect(&inputs, params),
            OperatorKind::Gather => transfer::gather(&inputs, params),
            OperatorKind::Lstm => transfer::lstm(&inputs, params),
            OperatorKind::Matmul => transfer::matmul(&inputs, params),
            OperatorKind::Pad => transfer::pad(&inputs, params),
            OperatorKind::Permute => transfer::permute(&inputs, params),
            OperatorKind::Pooling => transfer::pooling(&inputs, params),
            OperatorKind::Repeat => transfer::repeat(&inputs, params),
            OperatorKind::Reshape => transfer::reshape(&inputs, params),
            OperatorKind::SequenceMask => transfer::sequence_mask(&inputs, params),
            OperatorKind::Slice => transfer::slice(&inputs, params),
            OperatorKind::Squeeze => transfer::squeeze(&inputs, params),
            OperatorKind::Space2Depth => transfer::space2depth(&inputs, params),
            OperatorKind::Split => transfer::split(&inputs, params),
            OperatorKind::Stack => transfer::stack(&inputs, params),
            OperatorKind::StridedSlice => transfer::strided_slice(&inputs, params),
            OperatorKind::Passthrough => transfer::passthrough(&inputs),
            OperatorKind::Broadcast => transfer::broadcast(&inputs),
            OperatorKind::Reduce => transfer::reduce(&inputs, params),
            OperatorKind::Unknown => Some(Vec::new()),
        }?;
        outputs
            .iter()
            .map(|dims| Shape::from_signed(dims))
            .collect()
    }
}
