use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::index::scroll::total_hits;
use crate::index::{Index, IndexResult};
use crate::schema::FieldDefinitions;

use super::best_bets::BestBets;
use super::params::{ExampleScope, FacetParams, SearchParams};
use super::presenter::unwrap_single;
use super::query::QueryBuilder;

/// Example lookups run one search per facet option, batched into msearch
/// requests of this size
const EXAMPLE_SEARCH_BATCH: usize = 50;

/// Fetches example documents for facet options: the most popular documents
/// carrying each option's slug, either across the whole collection or
/// within the current query.
pub struct FacetExampleFetcher<'a> {
    index: &'a Index,
    params: &'a SearchParams,
    builder: &'a QueryBuilder<'a>,
    bets: &'a BestBets,
}

impl<'a> FacetExampleFetcher<'a> {
    pub fn new(
        index: &'a Index,
        params: &'a SearchParams,
        builder: &'a QueryBuilder<'a>,
        bets: &'a BestBets,
    ) -> Self {
        Self {
            index,
            params,
            builder,
            bets,
        }
    }

    /// Examples for every facet that asked for them, keyed by field then
    /// option slug
    pub async fn fetch(
        &self,
        slugs_for_field: &BTreeMap<String, Vec<String>>,
    ) -> IndexResult<BTreeMap<String, BTreeMap<String, Value>>> {
        let mut out = BTreeMap::new();
        for (field, facet) in &self.params.facets {
            if facet.examples == 0 {
                continue;
            }
            let slugs = slugs_for_field.get(field).cloned().unwrap_or_default();
            out.insert(
                field.clone(),
                self.fetch_for_field(field, facet, &slugs).await?,
            );
        }
        Ok(out)
    }

    async fn fetch_for_field(
        &self,
        field: &str,
        facet: &FacetParams,
        slugs: &[String],
    ) -> IndexResult<BTreeMap<String, Value>> {
        let mut examples = BTreeMap::new();
        for chunk in slugs.chunks(EXAMPLE_SEARCH_BATCH) {
            let payloads: Vec<Value> = chunk
                .iter()
                .map(|slug| self.example_payload(field, facet, slug))
                .collect();
            let response = self.index.msearch(&payloads).await?;
            let empty = Vec::new();
            let responses = response["responses"].as_array().unwrap_or(&empty);
            // Responses come back in request order
            for (slug, response) in chunk.iter().zip(responses) {
                examples.insert(slug.clone(), self.present_examples(response));
            }
        }
        Ok(examples)
    }

    fn example_payload(&self, field: &str, facet: &FacetParams, slug: &str) -> Value {
        let mut filter_musts = vec![json!({ "term": { (field): slug } })];
        let query = match facet.example_scope {
            Some(ExampleScope::Query) => {
                if let Some(filter) = self.builder.filter_payload(&[]) {
                    filter_musts.push(filter);
                }
                self.builder.query(self.bets)
            }
            _ => json!({ "match_all": {} }),
        };
        json!({
            "query": { "bool": { "must": query } },
            "post_filter": { "bool": { "must": filter_musts } },
            "size": facet.examples,
            "_source": { "includes": facet.example_fields },
            "sort": [{ "popularity": { "order": "desc" } }],
        })
    }

    fn present_examples(&self, response: &Value) -> Value {
        let empty = Vec::new();
        let hits = response["hits"]["hits"].as_array().unwrap_or(&empty);
        let examples: Vec<Value> = hits
            .iter()
            .map(|hit| example_fields(self.index.field_definitions(), hit))
            .collect();
        json!({ "total": total_hits(response), "examples": examples })
    }
}

fn example_fields(definitions: &FieldDefinitions, hit: &Value) -> Value {
    let Some(source) = hit["_source"].as_object() else {
        return json!({});
    };
    let mut fields = Map::new();
    for (name, value) in source {
        fields.insert(name.clone(), unwrap_single(definitions, name, value.clone()));
    }
    Value::Object(fields)
}
