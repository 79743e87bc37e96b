//! Decoding of upstream JSON documents into named records.
//!
//! Two layouts are understood:
//!
//! ```text
//! Beans:  {"beans": [{"name": "Hadoop:service=NameNode,name=FSNamesystem", ...}, ...]}
//! Keyed:  {"clusterMetrics": {"activeNodes": 3, ...}}
//! ```
//!
//! Only the envelope is decoded strictly. Individual fields are read lazily
//! through [`Record`], which returns `None` instead of failing when a field is
//! missing or has an unexpected JSON type.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Shape of the upstream document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentLayout {
    /// JMX servlet output; records are the entries of `beans`, keyed by `name`.
    Beans,
    /// Every top-level object member is a record keyed by its member name.
    Keyed,
}

#[derive(Debug, Deserialize)]
struct BeansEnvelope {
    beans: Vec<Value>,
}

/// A named record of metric fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Wrap a JSON object.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Look up a field by exact key, falling back to a one-level nested path.
    ///
    /// Bean keys such as `tag.HAState` contain dots themselves, so the exact
    /// key always wins over `HeapMemoryUsage.committed`-style nesting.
    pub fn field(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.fields.get(path) {
            return Some(value);
        }
        let (outer, inner) = path.split_once('.')?;
        self.fields.get(outer)?.as_object()?.get(inner)
    }

    /// Numeric field value, `None` if absent or not a JSON number.
    pub fn number(&self, path: &str) -> Option<f64> {
        self.field(path)?.as_f64()
    }

    /// String field value, `None` if absent or not a JSON string.
    pub fn text(&self, path: &str) -> Option<&str> {
        self.field(path)?.as_str()
    }
}

/// A decoded upstream document. Built fresh for every scrape.
#[derive(Debug, Clone, Default)]
pub struct UpstreamDocument {
    records: HashMap<String, Record>,
}

impl UpstreamDocument {
    /// Parse a response body according to `layout`.
    pub fn parse(layout: DocumentLayout, body: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body)?;
        Self::from_value(layout, value)
    }

    /// Build a document from an already parsed JSON value.
    pub fn from_value(layout: DocumentLayout, value: Value) -> Result<Self> {
        let mut records = HashMap::new();

        match layout {
            DocumentLayout::Beans => {
                let envelope: BeansEnvelope =
                    serde_json::from_value(value).map_err(|e| Error::malformed(e.to_string()))?;

                for bean in envelope.beans {
                    let Value::Object(fields) = bean else {
                        continue;
                    };
                    let Some(name) = fields.get("name").and_then(Value::as_str) else {
                        continue;
                    };
                    // Last bean with a given name wins.
                    records.insert(name.to_string(), Record::new(fields));
                }
            }
            DocumentLayout::Keyed => {
                let Value::Object(members) = value else {
                    return Err(Error::malformed("expected a JSON object at top level"));
                };

                for (name, member) in members {
                    if let Value::Object(fields) = member {
                        records.insert(name, Record::new(fields));
                    }
                }
            }
        }

        Ok(Self { records })
    }

    /// Number of records in the document.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the document holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Find the record for a source identifier.
    ///
    /// Exact names match first. A JMX object name also matches a record named
    /// by its [`short_name`].
    pub fn record(&self, source: &str) -> Option<&Record> {
        self.records
            .get(source)
            .or_else(|| short_name(source).and_then(|short| self.records.get(short)))
    }
}

/// Short form of a JMX object name: the `name` key property, else `type`.
///
/// `Hadoop:service=NameNode,name=FSNamesystem` → `FSNamesystem`,
/// `java.lang:type=Memory` → `Memory`. Returns `None` for plain identifiers.
pub fn short_name(object_name: &str) -> Option<&str> {
    let (_, properties) = object_name.split_once(':')?;
    let mut type_value = None;

    for property in properties.split(',') {
        let Some((key, value)) = property.split_once('=') else {
            continue;
        };
        match key.trim() {
            "name" => return Some(value.trim()),
            "type" => type_value = Some(value.trim()),
            _ => {}
        }
    }

    type_value
}
