use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::schema::FieldDefinitions;

pub const DEFAULT_DOCUMENT_TYPE: &str = "edition";

/// A document with a declared schema. Unknown fields are dropped at
/// construction rather than stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    doc_type: String,
    id: Option<String>,
    fields: BTreeMap<String, Value>,
    es_score: Option<f64>,
}

impl Document {
    /// Build from an external payload, keeping only declared fields. A
    /// `_type` key sets the type discriminator; `_id` sets the identifier.
    pub fn build<I>(definitions: &FieldDefinitions, attributes: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut doc = Self {
            doc_type: DEFAULT_DOCUMENT_TYPE.to_string(),
            id: None,
            fields: BTreeMap::new(),
            es_score: None,
        };
        for (key, value) in attributes {
            match key.as_str() {
                "_type" => {
                    if let Value::String(t) = value {
                        doc.doc_type = t;
                    }
                }
                "_id" => {
                    if let Value::String(id) = value {
                        doc.id = Some(id);
                    }
                }
                _ => {
                    doc.set(definitions, &key, value);
                }
            }
        }
        doc
    }

    /// Build from a search hit, carrying the engine's score
    pub fn from_hit(definitions: &FieldDefinitions, hit: &Value) -> Self {
        let mut attributes: Vec<(String, Value)> = Vec::new();
        if let Some(source) = hit.get("_source").and_then(Value::as_object) {
            attributes.extend(source.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if let Some(doc_type) = hit.get("_type").and_then(Value::as_str) {
            attributes.push(("_type".to_string(), Value::String(doc_type.to_string())));
        }
        if let Some(id) = hit.get("_id").and_then(Value::as_str) {
            attributes.push(("_id".to_string(), Value::String(id.to_string())));
        }

        let mut doc = Self::build(definitions, attributes);
        doc.es_score = hit.get("_score").and_then(Value::as_f64);
        doc
    }

    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    /// The document identifier: an explicit `_id` or, failing that, the link
    pub fn id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or_else(|| self.get("link").and_then(Value::as_str))
    }

    pub fn es_score(&self) -> Option<f64> {
        self.es_score
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Set a declared field; undeclared names are dropped. Returns whether
    /// the field was declared.
    pub fn set(&mut self, definitions: &FieldDefinitions, name: &str, value: Value) -> bool {
        if !definitions.contains(name) {
            return false;
        }
        self.fields.insert(name.to_string(), value);
        true
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    /// Wire representation for indexing: declared fields with null and empty
    /// values dropped
    pub fn export(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, value) in &self.fields {
            if is_blank(value) {
                continue;
            }
            out.insert(key.clone(), value.clone());
        }
        out
    }

    /// Presentation representation: exported fields plus the score
    pub fn to_value(&self) -> Value {
        let mut out = self.export();
        if let Some(score) = self.es_score {
            out.insert("es_score".to_string(), Value::from(score));
        }
        Value::Object(out)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}
