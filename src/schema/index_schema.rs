use serde_json::{json, Map, Value};

use crate::schema::{FieldDefinitions, FilterType, DEFAULT_DOCUMENT_TYPE};

/// Analysis settings every index in a group is created with. The
/// best_bet_stemmed_match analyzer must stay in step with the one queries
/// are normalised through at lookup time.
pub fn index_settings() -> Value {
    json!({
        "analysis": {
            "analyzer": {
                "searchable_text": {
                    "type": "custom",
                    "tokenizer": "standard",
                    "filter": ["lowercase", "stop", "stemmer_english"]
                },
                "exact_match": {
                    "type": "custom",
                    "tokenizer": "keyword",
                    "filter": ["lowercase", "trim"]
                },
                "best_bet_stemmed_match": {
                    "type": "custom",
                    "tokenizer": "standard",
                    "filter": ["lowercase", "stemmer_english"]
                },
                "spelling_analyzer": {
                    "type": "custom",
                    "tokenizer": "standard",
                    "filter": ["lowercase", "shingle"]
                },
                "query_with_synonyms": {
                    "type": "custom",
                    "tokenizer": "standard",
                    "filter": ["lowercase", "stop", "synonym", "stemmer_english"]
                }
            },
            "filter": {
                "stemmer_english": {
                    "type": "stemmer",
                    "name": "porter2"
                },
                "synonym": {
                    "type": "synonym",
                    "synonyms": [
                        "car tax, vehicle tax",
                        "driving licence, driving license",
                        "jobseekers allowance, jsa",
                        "national insurance, ni",
                        "self assessment, self-assessment",
                        "vat, value added tax"
                    ]
                }
            }
        }
    })
}

/// Build the engine mapping for a field set, keyed by the document type
/// writes use
pub fn index_mappings(definitions: &FieldDefinitions) -> Value {
    let mut properties = Map::new();
    for name in definitions.names() {
        if let Some(definition) = definitions.get(name) {
            properties.insert(name.to_string(), field_mapping(name, definition.filter_type));
        }
    }
    json!({ DEFAULT_DOCUMENT_TYPE: { "properties": properties } })
}

fn field_mapping(name: &str, filter_type: Option<FilterType>) -> Value {
    match filter_type {
        Some(FilterType::Text) => json!({ "type": "keyword" }),
        Some(FilterType::Date) => json!({ "type": "date" }),
        Some(FilterType::Boolean) => json!({ "type": "boolean" }),
        None => match name {
            "popularity" => json!({ "type": "float" }),
            "spelling_text" => json!({ "type": "text", "analyzer": "spelling_analyzer" }),
            "exact_query" => json!({ "type": "text", "analyzer": "exact_match" }),
            "stemmed_query" => json!({ "type": "text", "analyzer": "best_bet_stemmed_match" }),
            "stemmed_query_as_term" => json!({ "type": "keyword" }),
            "details" => json!({ "type": "keyword", "index": false }),
            _ => json!({ "type": "text", "analyzer": "searchable_text" }),
        },
    }
}
