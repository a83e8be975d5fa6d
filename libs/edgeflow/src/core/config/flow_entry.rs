// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// One row of the flow table: `[input, model, output, [x, y, w, h]?, debug?]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Value>", into = "Vec<Value>")]
pub struct FlowEntry {
    pub input: String,
    pub model: String,
    pub output: String,
    /// Requested render rectangle inside the output; absent means the
    /// subflow takes the whole output without mosaic.
    pub region: Option<[i64; 4]>,
    pub debug_tag: Option<String>,
}

impl FlowEntry {
    pub fn new(input: &str, model: &str, output: &str) -> Self {
        Self {
            input: input.to_string(),
            model: model.to_string(),
            output: output.to_string(),
            region: None,
            debug_tag: None,
        }
    }

    pub fn with_region(mut self, x: i64, y: i64, width: i64, height: i64) -> Self {
        self.region = Some([x, y, width, height]);
        self
    }
}

fn scalar_name(value: &Value, position: &str) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(format!("{} must be a name, got {:?}", position, other)),
    }
}

impl TryFrom<Vec<Value>> for FlowEntry {
    type Error = String;

    fn try_from(items: Vec<Value>) -> Result<Self, Self::Error> {
        if items.len() < 3 {
            return Err(format!(
                "flow entry needs at least [input, model, output], got {} item(s)",
                items.len()
            ));
        }
        if items.len() > 5 {
            return Err(format!(
                "flow entry has {} items, expected at most 5",
                items.len()
            ));
        }

        let input = scalar_name(&items[0], "input")?;
        let model = scalar_name(&items[1], "model")?;
        let output = scalar_name(&items[2], "output")?;

        let region = match items.get(3) {
            None | Some(Value::Null) => None,
            Some(Value::Sequence(seq)) if seq.is_empty() => None,
            Some(Value::Sequence(seq)) => {
                if seq.len() != 4 {
                    return Err(format!(
                        "mosaic region must be [x, y, width, height], got {} value(s)",
                        seq.len()
                    ));
                }
                let mut rect = [0i64; 4];
                for (slot, v) in rect.iter_mut().zip(seq) {
                    *slot = v
                        .as_i64()
                        .ok_or_else(|| format!("mosaic region value {:?} is not an integer", v))?;
                }
                Some(rect)
            }
            Some(other) => return Err(format!("mosaic region must be a list, got {:?}", other)),
        };

        let debug_tag = match items.get(4) {
            None | Some(Value::Null) => None,
            Some(v) => Some(scalar_name(v, "debug tag")?),
        };

        Ok(Self {
            input,
            model,
            output,
            region,
            debug_tag,
        })
    }
}

impl From<FlowEntry> for Vec<Value> {
    fn from(entry: FlowEntry) -> Self {
        let mut items = vec![
            Value::String(entry.input),
            Value::String(entry.model),
            Value::String(entry.output),
        ];
        if entry.region.is_some() || entry.debug_tag.is_some() {
            items.push(match entry.region {
                Some(rect) => Value::Sequence(rect.iter().map(|v| Value::from(*v)).collect()),
                None => Value::Sequence(Vec::new()),
            });
        }
        if let Some(tag) = entry.debug_tag {
            items.push(Value::String(tag));
        }
        items
    }
}
