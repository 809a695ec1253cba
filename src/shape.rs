//! Tensor shapes
//!
//! `Shape` is what the inference engine computes. `TensorShape` and
//! `TensorType` are the display forms handed to the graph consumer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered list of non-negative dimensions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shape(Vec<usize>);

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Self(dims)
    }

    /// The one-element `[0]` sentinel for a fully reduced tensor
    pub fn scalar_unresolved() -> Self {
        Self(vec![0])
    }

    pub fn is_scalar_unresolved(&self) -> bool {
        self.0.as_slice() == [0]
    }

    /// Build from signed dimensions, rejecting any negative entry
    pub fn from_signed(dims: &[i64]) -> Option<Self> {
        dims.iter()
            .map(|&d| usize::try_from(d).ok())
            .collect::<Option<Vec<_>>>()
            .map(Self)
    }

    /// Signed copy of the dimensions for arithmetic
    pub fn signed(&self) -> Vec<i64> {
        self.0.iter().map(|&d| d as i64).collect()
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self(dims)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&TensorShape::new(Some(self)), f)
    }
}

/// Display form of a shape: `[0]` collapses to no dimensions
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TensorShape {
    pub dimensions: Option<Vec<usize>>,
}

impl TensorShape {
    pub fn new(shape: Option<&Shape>) -> Self {
        let dimensions = shape.map(|s| {
            if s.is_scalar_unresolved() {
                Vec::new()
            } else {
                s.dims().to_vec()
            }
        });
        Self { dimensions }
    }

    pub fn unknown() -> Self {
        Self { dimensions: None }
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims = match &self.dimensions {
            Some(dims) if !dims.is_empty() => dims,
            _ => return Ok(()),
        };
        let parts: Vec<String> = dims
            .iter()
            .map(|&d| if d == 0 { "?".to_string() } else { d.to_string() })
            .collect();
        write!(f, "[{}]", parts.join(","))
    }
}

/// Element type plus shape. Acuity files carry no data types, so the
/// type is always `?`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TensorType {
    pub data_type: String,
    pub shape: TensorShape,
}

impl TensorType {
    pub fn new(shape: TensorShape) -> Self {
        Self {
            data_type: "?".to_string(),
            shape,
        }
    }
}

impl fmt::Display for TensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.data_type, self.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_unresolved_renders_empty() {
        let shape = Shape::scalar_unresolved();
        assert!(shape.is_scalar_unresolved());
        assert_eq!(shape.to_string(), "");
        assert_eq!(TensorShape::new(Some(&shape)).dimensions, Some(vec![]));
    }

    #[test]
    fn test_zero_dimension_renders_question_mark() {
        let shape = Shape::new(vec![0, 224, 224, 3]);
        assert_eq!(shape.to_string(), "[?,224,224,3]");
    }

    #[test]
    fn test_tensor_type_display() {
        let ty = TensorType::new(TensorShape::new(Some(&Shape::new(vec![1, 10]))));
        assert_eq!(ty.to_string(), "?[1,10]");
        assert_eq!(TensorType::new(TensorShape::unknown()).to_string(), "?");
    }

    #[test]
    fn test_from_signed_rejects_negative() {
        assert_eq!(Shape::from_signed(&[1, 2]), Some(Shape::new(vec![1, 2])));
        assert_eq!(Shape::from_signed(&[1, -1]), None);
    }
}
