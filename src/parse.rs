//! The graph description loader (C9, §6).
//!
//! JSON loading itself is out of scope for the inference core (§1) — this
//! module is a plain structural deserializer, matching the teacher's own
//! treatment of its Onnx/JSON front-ends as separate from the inference
//! logic proper. It produces a [`GraphDescription`] tree that [`crate::build`]
//! turns into the port graph (C5).

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::port::LiteralValue;
use crate::types::{Type, ALL_SCALAR, BOOL, FLOAT, INT};

/// One endpoint spec attached to a port name inside a `connections` table
/// (§6).
#[derive(Clone, Debug, PartialEq)]
pub enum EndpointSpec {
    Alias(String),
    AnnotatedAlias { name: String, annotation: Type },
    Connect(Vec<(String, String)>),
    Literal(LiteralValue),
}

/// A raw, not-yet-built node of the graph description tree.
#[derive(Clone, Debug, Deserialize)]
pub struct GraphDescription {
    pub name: String,
    #[serde(default)]
    pub submodels: IndexMap<String, GraphDescription>,
    #[serde(default)]
    pub connections: IndexMap<String, IndexMap<String, Value>>,
    #[serde(default)]
    pub exposed_keys: Option<Vec<String>>,
}

/// Top-level static-shape directive (§6): outermost key -> concrete dims.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StaticInputShapes(pub IndexMap<String, Vec<u64>>);

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParseError {
    #[error("endpoint spec for `{port}` is not a recognized shape: {value}")]
    MalformedEndpoint { port: String, value: String },
    #[error("type annotation names an unknown scalar atom `{atom}`")]
    UnknownTypeAtom { atom: String },
}

pub fn parse_description(json: &str) -> serde_json::Result<GraphDescription> {
    serde_json::from_str(json)
}

pub fn parse_static_input_shapes(json: &str) -> serde_json::Result<StaticInputShapes> {
    serde_json::from_str(json)
}

/// Interprets one raw `connections[submodel][port]` JSON value as an
/// [`EndpointSpec`] (§6). This is the one place that has to disambiguate the
/// four textual shapes the format allows.
pub fn interpret_endpoint(port: &str, value: &Value) -> Result<EndpointSpec, ParseError> {
    match value {
        Value::String(s) => Ok(EndpointSpec::Alias(s.clone())),
        Value::Bool(b) => Ok(EndpointSpec::Literal(LiteralValue::Bool(*b))),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(EndpointSpec::Literal(LiteralValue::Int(i)))
            } else if let Some(f) = n.as_f64() {
                Ok(EndpointSpec::Literal(LiteralValue::Float(f)))
            } else {
                Err(ParseError::MalformedEndpoint {
                    port: port.to_string(),
                    value: value.to_string(),
                })
            }
        }
        Value::Object(map) => {
            if let Some(Value::Array(edges)) = map.get("connect") {
                let mut out = Vec::with_capacity(edges.len());
                for e in edges {
                    let pair = e.as_array().ok_or_else(|| ParseError::MalformedEndpoint {
                        port: port.to_string(),
                        value: value.to_string(),
                    })?;
                    if pair.len() != 2 {
                        return Err(ParseError::MalformedEndpoint {
                            port: port.to_string(),
                            value: value.to_string(),
                        });
                    }
                    let submodel = pair[0].as_str().ok_or_else(|| ParseError::MalformedEndpoint {
                        port: port.to_string(),
                        value: value.to_string(),
                    })?;
                    let producer_port = pair[1].as_str().ok_or_else(|| ParseError::MalformedEndpoint {
                        port: port.to_string(),
                        value: value.to_string(),
                    })?;
                    out.push((submodel.to_string(), producer_port.to_string()));
                }
                Ok(EndpointSpec::Connect(out))
            } else if let Some(Value::String(name)) = map.get("name") {
                let annotation = match map.get("type") {
                    Some(t) => parse_type_annotation(port, t)?,
                    None => Type::any(),
                };
                Ok(EndpointSpec::AnnotatedAlias {
                    name: name.clone(),
                    annotation,
                })
            } else {
                Err(ParseError::MalformedEndpoint {
                    port: port.to_string(),
                    value: value.to_string(),
                })
            }
        }
        Value::Null | Value::Array(_) => Err(ParseError::MalformedEndpoint {
            port: port.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Parses `{"Tensor": ["int","float","bool"]}` / a bare scalar atom name
/// into a [`Type`] (§6).
fn parse_type_annotation(port: &str, value: &Value) -> Result<Type, ParseError> {
    match value {
        Value::String(atom) => Ok(Type::scalar(scalar_mask(atom)?)),
        Value::Object(map) => {
            if let Some(Value::Array(elems)) = map.get("Tensor") {
                let mut mask = 0u8;
                for e in elems {
                    let atom = e.as_str().ok_or_else(|| ParseError::MalformedEndpoint {
                        port: port.to_string(),
                        value: value.to_string(),
                    })?;
                    mask |= scalar_mask(atom)?;
                }
                Ok(Type::tensor(mask))
            } else {
                Err(ParseError::MalformedEndpoint {
                    port: port.to_string(),
                    value: value.to_string(),
                })
            }
        }
        _ => Err(ParseError::MalformedEndpoint {
            port: port.to_string(),
            value: value.to_string(),
        }),
    }
}

fn scalar_mask(atom: &str) -> Result<u8, ParseError> {
    match atom {
        "bool" => Ok(BOOL),
        "int" => Ok(INT),
        "float" => Ok(FLOAT),
        "any" => Ok(ALL_SCALAR),
        other => Err(ParseError::UnknownTypeAtom {
            atom: other.to_string(),
        }),
    }
}
