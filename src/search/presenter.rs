use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::index::scroll::total_hits;
use crate::index::IndexResult;
use crate::registry::{Registries, Registry};
use crate::schema::{FieldDefinition, FieldDefinitions};

use super::params::{FacetParams, FacetSortKey, SearchParams};

const SNIPPET_LENGTH: usize = 215;
const ORGANISATION_SNIPPET_PREFIX: &str = "The home of";

/// Shapes a raw engine response into the public response body: presented
/// results, facet breakdowns, spelling suggestions and totals.
pub struct ResultSetPresenter<'a> {
    params: &'a SearchParams,
    registries: &'a Registries,
    definitions: &'a FieldDefinitions,
}

impl<'a> ResultSetPresenter<'a> {
    pub fn new(
        params: &'a SearchParams,
        registries: &'a Registries,
        definitions: &'a FieldDefinitions,
    ) -> Self {
        Self {
            params,
            registries,
            definitions,
        }
    }

    /// Assemble the response body. Facets are passed in separately so the
    /// caller can attach example documents to them first.
    pub async fn present(
        &self,
        response: &Value,
        facets: BTreeMap<String, Value>,
        payload: &Value,
    ) -> IndexResult<Value> {
        let empty = Vec::new();
        let hits = response["hits"]["hits"].as_array().unwrap_or(&empty);
        let presenter = ResultPresenter {
            params: self.params,
            registries: self.registries,
            definitions: self.definitions,
        };
        let mut results = Vec::new();
        for hit in hits {
            results.push(presenter.present_hit(hit).await?);
        }

        let mut body = Map::new();
        body.insert("results".to_string(), Value::Array(results));
        body.insert("total".to_string(), json!(total_hits(response)));
        body.insert("start".to_string(), json!(self.params.start));
        body.insert("facets".to_string(), json!(facets));
        body.insert(
            "suggested_queries".to_string(),
            Value::Array(suggested_queries(response)),
        );
        if self.params.debug.show_query {
            body.insert("engine_query".to_string(), payload.clone());
        }
        Ok(Value::Object(body))
    }

    /// One presented facet per requested facet field, built from the
    /// response's aggregation pairs
    pub async fn presented_facets(
        &self,
        response: &Value,
    ) -> IndexResult<BTreeMap<String, Value>> {
        let mut facets = BTreeMap::new();
        let aggregations = &response["aggregations"];
        for (field, facet) in &self.params.facets {
            facets.insert(
                field.clone(),
                self.presented_facet(field, facet, aggregations).await?,
            );
        }
        Ok(facets)
    }

    async fn presented_facet(
        &self,
        field: &str,
        facet: &FacetParams,
        aggregations: &Value,
    ) -> IndexResult<Value> {
        let buckets = aggregations[field]["filtered_aggregations"]["buckets"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        let applied_values: Vec<String> = self
            .params
            .filter_for(field)
            .map(|f| f.text_values().to_vec())
            .unwrap_or_default();

        let mut options: Vec<FacetOption> = Vec::new();
        for bucket in &buckets {
            let Some(key) = bucket["key"].as_str() else {
                continue;
            };
            options.push(FacetOption {
                slug: key.to_string(),
                value: Value::Null,
                documents: bucket["doc_count"].as_u64().unwrap_or(0),
                applied: applied_values.iter().any(|v| v == key),
            });
        }
        // An applied filter value with no matching documents still shows up,
        // so the caller can render it as removable
        for value in &applied_values {
            if !options.iter().any(|o| &o.slug == value) {
                options.push(FacetOption {
                    slug: value.clone(),
                    value: Value::Null,
                    documents: 0,
                    applied: true,
                });
            }
        }
        for option in &mut options {
            option.value = self.expand_option(field, &option.slug).await?;
        }

        options.sort_by(|a, b| compare_options(a, b, &facet.order));
        let mut top: Vec<&FacetOption> = options
            .iter()
            .filter(|o| o.documents > 0)
            .take(facet.requested)
            .collect();
        for option in &options {
            if option.applied && !top.iter().any(|t| t.slug == option.slug) {
                top.push(option);
            }
        }
        top.sort_by(|a, b| compare_options(a, b, &facet.order));

        let presented: Vec<Value> = top
            .iter()
            .map(|o| json!({ "value": o.value, "documents": o.documents }))
            .collect();
        let missing_key = format!("{}_with_missing_value", field);
        let documents_with_no_value = aggregations[missing_key.as_str()]
            ["filtered_aggregations"]["doc_count"]
            .as_u64()
            .unwrap_or(0);

        Ok(json!({
            "options": presented,
            "documents_with_no_value": documents_with_no_value,
            "total_options": buckets.len(),
            "missing_options": buckets.len().saturating_sub(facet.requested),
            "scope": facet.scope.as_str(),
        }))
    }

    async fn expand_option(&self, field: &str, slug: &str) -> IndexResult<Value> {
        match self.registries.for_field(field) {
            Some(registry) => expand_entity(registry, slug).await,
            None => Ok(json!({ "slug": slug })),
        }
    }

    /// Option slugs per facet that asked for example documents
    pub fn example_slugs(
        &self,
        facets: &BTreeMap<String, Value>,
    ) -> BTreeMap<String, Vec<String>> {
        let mut slugs = BTreeMap::new();
        for (field, facet) in &self.params.facets {
            if facet.examples == 0 {
                continue;
            }
            let Some(options) = facets.get(field).and_then(|f| f["options"].as_array()) else {
                continue;
            };
            let field_slugs: Vec<String> = options
                .iter()
                .filter_map(|o| o["value"]["slug"].as_str().map(str::to_string))
                .collect();
            slugs.insert(field.clone(), field_slugs);
        }
        slugs
    }

    /// Attach fetched example documents to the matching facet options
    pub fn merge_examples(
        facets: &mut BTreeMap<String, Value>,
        examples: &BTreeMap<String, BTreeMap<String, Value>>,
    ) {
        for (field, by_slug) in examples {
            let Some(options) = facets
                .get_mut(field)
                .and_then(|f| f["options"].as_array_mut())
            else {
                continue;
            };
            for option in options {
                let Some(slug) = option["value"]["slug"].as_str() else {
                    continue;
                };
                if let Some(info) = by_slug.get(slug) {
                    option["value"]["example_info"] = info.clone();
                }
            }
        }
    }
}

/// Transforms a single hit, in fixed order: scalar unwrapping, allowed-value
/// expansion, entity expansion, link normalisation, then slicing down to the
/// requested fields with snippet and debug metadata attached.
struct ResultPresenter<'a> {
    params: &'a SearchParams,
    registries: &'a Registries,
    definitions: &'a FieldDefinitions,
}

impl ResultPresenter<'_> {
    async fn present_hit(&self, hit: &Value) -> IndexResult<Value> {
        let mut fields = Map::new();
        if let Some(source) = hit["_source"].as_object() {
            for (name, value) in source {
                if !self.definitions.contains(name) {
                    continue;
                }
                fields.insert(
                    name.clone(),
                    unwrap_single(self.definitions, name, value.clone()),
                );
            }
        }

        // Snippet works on the raw strings, before any expansion
        let snippet = snippet(&fields);
        self.add_virtual_fields(&mut fields, hit);
        self.expand_allowed_values(&mut fields);
        self.expand_entities(&mut fields).await?;
        fix_link(&mut fields);

        let mut presented: Map<String, Value> = fields
            .into_iter()
            .filter(|(name, _)| self.params.field_requested(name))
            .collect();
        presented.insert("snippet".to_string(), json!(snippet));
        add_debug_fields(&mut presented, hit);
        Ok(Value::Object(presented))
    }

    fn add_virtual_fields(&self, fields: &mut Map<String, Value>, hit: &Value) {
        if self.params.field_requested("title_with_highlighting") {
            let fallback = fields.get("title").and_then(Value::as_str).unwrap_or("");
            let value = highlighted(hit, "title").unwrap_or_else(|| html_escape(fallback));
            fields.insert("title_with_highlighting".to_string(), json!(value));
        }
        if self.params.field_requested("description_with_highlighting") {
            let fallback = fields
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("");
            let value = highlighted(hit, "description").unwrap_or_else(|| html_escape(fallback));
            fields.insert("description_with_highlighting".to_string(), json!(value));
        }
    }

    fn expand_allowed_values(&self, fields: &mut Map<String, Value>) {
        let names: Vec<String> = fields.keys().cloned().collect();
        for name in names {
            let Some(definition) = self.definitions.get(&name) else {
                continue;
            };
            if definition.allowed_values.is_empty() {
                continue;
            }
            if let Some(value) = fields.remove(&name) {
                let expanded = match value {
                    Value::Array(items) => Value::Array(
                        items
                            .into_iter()
                            .map(|item| expand_allowed(definition, item))
                            .collect(),
                    ),
                    other => expand_allowed(definition, other),
                };
                fields.insert(name, expanded);
            }
        }
    }

    async fn expand_entities(&self, fields: &mut Map<String, Value>) -> IndexResult<()> {
        let names: Vec<String> = fields.keys().cloned().collect();
        for name in names {
            let Some(registry) = self.registries.for_field(&name) else {
                continue;
            };
            let Some(value) = fields.remove(&name) else {
                continue;
            };
            let expanded = match value {
                Value::Array(slugs) => {
                    let mut items = Vec::new();
                    for slug in slugs {
                        match slug.as_str() {
                            Some(slug) => items.push(expand_entity(registry, slug).await?),
                            None => items.push(slug),
                        }
                    }
                    Value::Array(items)
                }
                Value::String(slug) => expand_entity(registry, &slug).await?,
                other => other,
            };
            fields.insert(name, expanded);
        }
        Ok(())
    }
}

async fn expand_entity(registry: &Registry, slug: &str) -> IndexResult<Value> {
    let mut item = match registry.get(slug).await? {
        Some(Value::Object(item)) => item,
        _ => Map::new(),
    };
    item.insert("slug".to_string(), json!(slug));
    Ok(Value::Object(item))
}

/// The engine stores every field as an array; single-valued fields come
/// back unwrapped
pub(super) fn unwrap_single(definitions: &FieldDefinitions, name: &str, value: Value) -> Value {
    match value {
        Value::Array(mut items) if !definitions.is_multivalued(name) => {
            if items.is_empty() {
                Value::Null
            } else {
                items.remove(0)
            }
        }
        other => other,
    }
}

fn expand_allowed(definition: &FieldDefinition, value: Value) -> Value {
    let Some(raw) = value.as_str() else {
        return value;
    };
    match definition
        .allowed_values
        .iter()
        .find(|allowed| allowed.value == raw)
    {
        Some(allowed) => json!({ "label": allowed.label, "value": allowed.value }),
        None => value,
    }
}

fn fix_link(fields: &mut Map<String, Value>) {
    let fixed = match fields.get("link").and_then(Value::as_str) {
        Some(link) if !link.starts_with("http") && !link.starts_with('/') => {
            Some(format!("/{}", link))
        }
        _ => None,
    };
    if let Some(fixed) = fixed {
        fields.insert("link".to_string(), json!(fixed));
    }
}

fn snippet(fields: &Map<String, Value>) -> String {
    let title = fields.get("title").and_then(Value::as_str).unwrap_or("");
    let description = fields
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("");
    let format = fields.get("format").and_then(Value::as_str).unwrap_or("");
    let state = fields
        .get("organisation_state")
        .and_then(Value::as_str)
        .unwrap_or("");

    if format == "organisation"
        && state != "closed"
        && !description.starts_with(ORGANISATION_SNIPPET_PREFIX)
    {
        return format!("{} {}.", ORGANISATION_SNIPPET_PREFIX, title);
    }
    truncate_snippet(description)
}

fn truncate_snippet(description: &str) -> String {
    if description.chars().count() <= SNIPPET_LENGTH {
        return description.to_string();
    }
    let cut: String = description.chars().take(SNIPPET_LENGTH).collect();
    let cut = match cut.rfind(' ') {
        Some(position) => &cut[..position],
        None => cut.as_str(),
    };
    format!("{}…", cut)
}

fn add_debug_fields(presented: &mut Map<String, Value>, hit: &Value) {
    if let Some(index) = hit["_index"].as_str() {
        presented.insert("index".to_string(), json!(strip_alias_from_index_name(index)));
    }
    if let Some(score) = hit.get("_score") {
        presented.insert("engine_score".to_string(), score.clone());
    }
    if let Some(id) = hit.get("_id") {
        presented.insert("_id".to_string(), id.clone());
    }
    if let Some(explanation) = hit.get("_explanation") {
        presented.insert("_explanation".to_string(), explanation.clone());
    }
    if let Some(doc_type) = hit.get("_type") {
        presented.insert("document_type".to_string(), doc_type.clone());
    }
}

/// Concrete index names look like "mainstream-2014-05-13t17:24:00z-<uuid>";
/// everything before the timestamp is the group name
fn strip_alias_from_index_name(index: &str) -> String {
    let prefix: String = index.chars().take_while(|c| !c.is_ascii_digit()).collect();
    prefix.strip_suffix('-').unwrap_or(&prefix).to_string()
}

fn highlighted(hit: &Value, field: &str) -> Option<String> {
    hit["highlight"][field][0].as_str().map(str::to_string)
}

fn html_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn suggested_queries(response: &Value) -> Vec<Value> {
    response["suggest"]["spelling_suggestions"][0]["options"]
        .as_array()
        .map(|options| {
            options
                .iter()
                .filter_map(|option| option.get("text").cloned())
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
struct FacetOption {
    slug: String,
    value: Value,
    documents: u64,
    applied: bool,
}

impl FacetOption {
    fn rank(&self) -> u8 {
        if self.applied {
            0
        } else {
            1
        }
    }

    fn sort_string(&self, key: FacetSortKey) -> String {
        match key {
            FacetSortKey::Slug => self.slug.clone(),
            FacetSortKey::Title => self.value["title"]
                .as_str()
                .unwrap_or("")
                .to_lowercase(),
            FacetSortKey::Link => self.value["link"].as_str().unwrap_or("").to_string(),
            FacetSortKey::Value => self.value["title"]
                .as_str()
                .unwrap_or(&self.slug)
                .to_string(),
            FacetSortKey::Filtered | FacetSortKey::Count => String::new(),
        }
    }
}

fn compare_options(a: &FacetOption, b: &FacetOption, orderings: &[(FacetSortKey, i32)]) -> Ordering {
    for (key, direction) in orderings {
        let ordering = match key {
            FacetSortKey::Filtered => a.rank().cmp(&b.rank()),
            FacetSortKey::Count => a.documents.cmp(&b.documents),
            other => a.sort_string(*other).cmp(&b.sort_string(*other)),
        };
        let ordering = if *direction < 0 {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::super::parser::ParameterParser;
    use super::*;
    use crate::client::EngineClient;
    use crate::config::{EngineConfig, RegistryConfig, ScrollConfig};
    use crate::index::Index;

    fn index_for(url: &str, name: &str) -> Index {
        let client = EngineClient::new(&EngineConfig {
            base_url: url.to_string(),
            timeout_secs: 5,
            connect_timeout_secs: 5,
            admin_timeout_secs: 30,
        })
        .unwrap();
        Index::new(
            client,
            name,
            FieldDefinitions::core(),
            ScrollConfig::default(),
        )
    }

    fn registries(url: &str) -> Registries {
        Registries::standard(index_for(url, "government"), &RegistryConfig::default())
    }

    fn params(pairs: &[(&str, &str)]) -> SearchParams {
        let raw: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let definitions = FieldDefinitions::core();
        ParameterParser::parse(&raw, &definitions).unwrap()
    }

    async fn present_one(params: &SearchParams, hit: Value) -> Value {
        let registries = registries("http://localhost:9200");
        let definitions = FieldDefinitions::core();
        let presenter = ResultSetPresenter::new(params, &registries, &definitions);
        let response = json!({ "hits": { "total": 1, "hits": [hit] } });
        let body = presenter
            .present(&response, BTreeMap::new(), &json!({}))
            .await
            .unwrap();
        body["results"][0].clone()
    }

    #[tokio::test]
    async fn test_scalars_unwrapped_and_sliced_to_requested_fields() {
        let params = params(&[("fields", "title,link")]);
        let result = present_one(
            &params,
            json!({ "_source": {
                "title": ["An example"],
                "link": ["/an-example"],
                "description": ["About an example."],
                "not_in_schema": ["dropped"],
            }}),
        )
        .await;
        assert_eq!(result["title"], json!("An example"));
        assert_eq!(result["link"], json!("/an-example"));
        assert!(result.get("description").is_none());
        assert!(result.get("not_in_schema").is_none());
    }

    #[tokio::test]
    async fn test_snippet_truncates_on_a_word_boundary() {
        let description = format!("{} {}", "a".repeat(100), "b".repeat(150));
        let params = params(&[("fields", "title")]);
        let result = present_one(
            &params,
            json!({ "_source": { "title": ["T"], "description": [description] } }),
        )
        .await;
        assert_eq!(result["snippet"], json!(format!("{}…", "a".repeat(100))));
    }

    #[tokio::test]
    async fn test_short_descriptions_pass_through_as_snippets() {
        let params = params(&[("fields", "title")]);
        let result = present_one(
            &params,
            json!({ "_source": { "title": ["T"], "description": ["Short."] } }),
        )
        .await;
        assert_eq!(result["snippet"], json!("Short."));
    }

    #[tokio::test]
    async fn test_open_organisations_get_a_home_of_snippet() {
        let params = params(&[("fields", "title")]);
        let result = present_one(
            &params,
            json!({ "_source": {
                "title": ["HM Revenue & Customs"],
                "description": ["The tax authority."],
                "format": ["organisation"],
                "organisation_state": ["open"],
            }}),
        )
        .await;
        assert_eq!(result["snippet"], json!("The home of HM Revenue & Customs."));
    }

    #[tokio::test]
    async fn test_closed_organisations_keep_their_description_snippet() {
        let params = params(&[("fields", "title")]);
        let result = present_one(
            &params,
            json!({ "_source": {
                "title": ["Defunct Office"],
                "description": ["It closed in 2010."],
                "format": ["organisation"],
                "organisation_state": ["closed"],
            }}),
        )
        .await;
        assert_eq!(result["snippet"], json!("It closed in 2010."));
    }

    #[tokio::test]
    async fn test_virtual_fields_prefer_engine_highlighting() {
        let params = params(&[("fields", "title_with_highlighting")]);
        let result = present_one(
            &params,
            json!({
                "_source": { "title": ["Tax disc"] },
                "highlight": { "title": ["<mark>Tax</mark> disc"] },
            }),
        )
        .await;
        assert_eq!(
            result["title_with_highlighting"],
            json!("<mark>Tax</mark> disc")
        );
    }

    #[tokio::test]
    async fn test_virtual_fields_fall_back_to_escaped_source() {
        let params = params(&[("fields", "title_with_highlighting")]);
        let result = present_one(
            &params,
            json!({ "_source": { "title": ["Fish & chips"] } }),
        )
        .await;
        assert_eq!(result["title_with_highlighting"], json!("Fish &amp; chips"));
    }

    #[tokio::test]
    async fn test_bare_links_gain_a_leading_slash() {
        let params = params(&[("fields", "link")]);
        let result = present_one(
            &params,
            json!({ "_source": { "link": ["an-example-page"] } }),
        )
        .await;
        assert_eq!(result["link"], json!("/an-example-page"));

        let params_external = self::params(&[("fields", "link")]);
        let result = present_one(
            &params_external,
            json!({ "_source": { "link": ["https://www.example.com/page"] } }),
        )
        .await;
        assert_eq!(result["link"], json!("https://www.example.com/page"));
    }

    #[tokio::test]
    async fn test_allowed_values_expand_to_label_objects() {
        let params = params(&[("fields", "organisation_state")]);
        let result = present_one(
            &params,
            json!({ "_source": { "organisation_state": ["closed"] } }),
        )
        .await;
        assert_eq!(
            result["organisation_state"],
            json!({ "label": "Closed", "value": "closed" })
        );
    }

    #[tokio::test]
    async fn test_debug_metadata_is_always_attached() {
        let params = params(&[("fields", "title")]);
        let result = present_one(
            &params,
            json!({
                "_index": "mainstream-2014-05-13t17:24:00z-2e9dd611",
                "_id": "/an-example",
                "_type": "edition",
                "_score": 3.25,
                "_source": { "title": ["An example"] },
            }),
        )
        .await;
        assert_eq!(result["index"], json!("mainstream"));
        assert_eq!(result["_id"], json!("/an-example"));
        assert_eq!(result["document_type"], json!("edition"));
        assert_eq!(result["engine_score"], json!(3.25));
    }

    #[tokio::test]
    async fn test_entity_fields_expand_through_the_registry() {
        let mut server = mockito::Server::new_async().await;
        let _fill = server
            .mock("GET", "/government/_search")
            .match_query(mockito::Matcher::Any)
            .with_body(
                json!({
                    "_scroll_id": "t1",
                    "hits": { "total": 1, "hits": [
                        { "_id": "/government/organisations/hm-revenue-customs",
                          "_source": { "slug": "hm-revenue-customs", "title": "HM Revenue & Customs" } }
                    ]}
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _terminal = server
            .mock("POST", "/_search/scroll")
            .with_body(json!({ "_scroll_id": "t2", "hits": { "total": 1, "hits": [] } }).to_string())
            .create_async()
            .await;

        let params = params(&[("fields", "organisations")]);
        let registries = registries(&server.url());
        let definitions = FieldDefinitions::core();
        let presenter = ResultSetPresenter::new(&params, &registries, &definitions);
        let response = json!({ "hits": { "total": 1, "hits": [
            { "_source": { "organisations": ["hm-revenue-customs", "mystery-office"] } }
        ]}});
        let body = presenter
            .present(&response, BTreeMap::new(), &json!({}))
            .await
            .unwrap();

        let organisations = &body["results"][0]["organisations"];
        assert_eq!(
            organisations[0]["title"],
            json!("HM Revenue & Customs")
        );
        assert_eq!(organisations[0]["slug"], json!("hm-revenue-customs"));
        // unknown slugs fall back to a bare slug object
        assert_eq!(organisations[1], json!({ "slug": "mystery-office" }));
    }

    #[tokio::test]
    async fn test_present_assembles_the_response_body() {
        let params = params(&[("q", "cheese"), ("start", "4"), ("debug", "show_query")]);
        let registries = registries("http://localhost:9200");
        let definitions = FieldDefinitions::core();
        let presenter = ResultSetPresenter::new(&params, &registries, &definitions);
        let response = json!({ "hits": { "total": 25, "hits": [] } });
        let payload = json!({ "from": 4 });
        let body = presenter
            .present(&response, BTreeMap::new(), &payload)
            .await
            .unwrap();
        assert_eq!(body["total"], json!(25));
        assert_eq!(body["start"], json!(4));
        assert_eq!(body["results"], json!([]));
        assert_eq!(body["facets"], json!({}));
        assert_eq!(body["suggested_queries"], json!([]));
        assert_eq!(body["engine_query"], payload);
    }

    #[tokio::test]
    async fn test_spelling_suggestions_are_lifted_from_the_response() {
        let params = params(&[("q", "chese"), ("suggest", "spelling")]);
        let registries = registries("http://localhost:9200");
        let definitions = FieldDefinitions::core();
        let presenter = ResultSetPresenter::new(&params, &registries, &definitions);
        let response = json!({
            "hits": { "total": 0, "hits": [] },
            "suggest": { "spelling_suggestions": [
                { "text": "chese", "options": [{ "text": "cheese", "score": 0.9 }] }
            ]},
        });
        let body = presenter
            .present(&response, BTreeMap::new(), &json!({}))
            .await
            .unwrap();
        assert_eq!(body["suggested_queries"], json!(["cheese"]));
    }

    #[tokio::test]
    async fn test_facet_options_sorted_and_padded_with_applied_values() {
        let params = params(&[
            ("facet_format", "2"),
            ("filter_format", "guide"),
            ("filter_format", "withdrawn"),
        ]);
        let registries = registries("http://localhost:9200");
        let definitions = FieldDefinitions::core();
        let presenter = ResultSetPresenter::new(&params, &registries, &definitions);
        let response = json!({ "aggregations": {
            "format": { "filtered_aggregations": { "buckets": [
                { "key": "statistics", "doc_count": 42 },
                { "key": "guide", "doc_count": 7 },
            ]}},
            "format_with_missing_value": { "filtered_aggregations": { "doc_count": 3 } },
        }});

        let facets = presenter.presented_facets(&response).await.unwrap();
        let facet = &facets["format"];
        let options = facet["options"].as_array().unwrap();
        // applied options first, then by descending count
        assert_eq!(options[0]["value"], json!({ "slug": "guide" }));
        assert_eq!(options[0]["documents"], json!(7));
        assert_eq!(options[1]["value"], json!({ "slug": "withdrawn" }));
        assert_eq!(options[1]["documents"], json!(0));
        assert_eq!(options[2]["value"], json!({ "slug": "statistics" }));
        assert_eq!(facet["documents_with_no_value"], json!(3));
        assert_eq!(facet["total_options"], json!(2));
        assert_eq!(facet["missing_options"], json!(0));
        assert_eq!(facet["scope"], json!("exclude_field_filter"));
    }

    #[tokio::test]
    async fn test_example_slugs_and_merging() {
        let params = params(&[("facet_format", "2,examples:1,example_scope:global")]);
        let registries = registries("http://localhost:9200");
        let definitions = FieldDefinitions::core();
        let presenter = ResultSetPresenter::new(&params, &registries, &definitions);
        let response = json!({ "aggregations": {
            "format": { "filtered_aggregations": { "buckets": [
                { "key": "statistics", "doc_count": 42 },
            ]}},
            "format_with_missing_value": { "filtered_aggregations": { "doc_count": 0 } },
        }});

        let mut facets = presenter.presented_facets(&response).await.unwrap();
        let slugs = presenter.example_slugs(&facets);
        assert_eq!(slugs["format"], vec!["statistics"]);

        let mut examples = BTreeMap::new();
        let mut by_slug = BTreeMap::new();
        by_slug.insert(
            "statistics".to_string(),
            json!({ "total": 42, "examples": [{ "link": "/stats" }] }),
        );
        examples.insert("format".to_string(), by_slug);
        ResultSetPresenter::merge_examples(&mut facets, &examples);

        assert_eq!(
            facets["format"]["options"][0]["value"]["example_info"]["total"],
            json!(42)
        );
    }
}
