//! Serde model of an Acuity JSON document
//!
//! An Acuity model file is a JSON object with a `MetaData` header and a
//! `Layers` map from layer name to layer definition. Layer order follows
//! the document, so builds are reproducible.

use std::io::Read;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AcuityError, Result};

/// Model header
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetaData {
    #[serde(rename = "Name", default)]
    pub name: String,

    /// Kept as raw JSON, some exporters write it as a number
    #[serde(rename = "AcuityVersion", default)]
    pub acuity_version: Value,

    #[serde(rename = "Platform", default)]
    pub platform: String,
}

impl MetaData {
    /// Version as display text
    pub fn version(&self) -> String {
        match &self.acuity_version {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// One layer definition exactly as written in the document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLayer {
    pub op: String,

    #[serde(default)]
    pub parameters: Map<String, Value>,

    /// Raw identifiers; non-string entries are rejected by the builder
    #[serde(default)]
    pub inputs: Vec<Value>,

    /// Port names, combined with the layer name into `@layer:port`
    #[serde(default)]
    pub outputs: Vec<Value>,
}

/// A parsed Acuity model document
#[derive(Debug, Clone)]
pub struct ModelDocument {
    pub meta_data: MetaData,
    pub layers: Vec<(String, RawLayer)>,
}

impl ModelDocument {
    /// Parse a document from a JSON string
    pub fn from_json(text: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(text)?;
        Self::from_value(root)
    }

    /// Parse a document from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let root: Value = serde_json::from_reader(reader)?;
        Self::from_value(root)
    }

    /// Build a document from an already parsed JSON tree
    pub fn from_value(mut root: Value) -> Result<Self> {
        let meta = root
            .get_mut("MetaData")
            .map(Value::take)
            .ok_or(AcuityError::MissingSection { section: "MetaData" })?;
        let layers = match root.get_mut("Layers").map(Value::take) {
            Some(Value::Object(layers)) => layers,
            _ => return Err(AcuityError::MissingSection { section: "Layers" }),
        };

        let meta_data: MetaData = serde_json::from_value(meta)?;
        let layers = layers
            .into_iter()
            .map(|(name, raw)| {
                let layer = serde_json::from_value::<RawLayer>(raw).map_err(|e| {
                    AcuityError::MalformedLayer {
                        layer: name.clone(),
                        reason: e.to_string(),
                    }
                })?;
                Ok((name, layer))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { meta_data, layers })
    }
}
