use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

use super::best_bets::BestBets;
use super::params::{FacetScope, FieldFilter, FilterValues, SearchParams};

const MATCH_FIELDS: &[(&str, f64)] = &[
    ("title", 5.0),
    ("acronym", 5.0),
    ("description", 2.0),
    ("indexable_content", 1.0),
];

/// Copes with short documents: all terms must match up to 3 query words,
/// half of them beyond 7
const MINIMUM_SHOULD_MATCH: &str = "2<2 3<3 7<50%";

/// A query that is one quoted phrase and nothing else: starts and ends
/// with quotes, with no quotes in between
static QUOTED_PHRASE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^"[^"]+"$"#).unwrap());

const FORMAT_BOOSTS: &[(&str, f64)] = &[
    ("smart-answer", 1.5),
    ("transaction", 1.5),
    ("topical_event", 1.5),
    ("minister", 1.7),
    ("organisation", 2.5),
    ("topic", 1.5),
    ("document_series", 1.3),
    ("document_collection", 1.3),
    ("operational_field", 1.5),
    ("contact", 0.3),
    ("mainstream_browse_page", 0.0),
];

/// Renders validated search parameters into the engine's query DSL.
///
/// The relevance query is built in layers around a core text query:
/// format and recency boosts, then a popularity multiplier, then best-bet
/// pinning. Each layer can be switched off with a debug option.
pub struct QueryBuilder<'a> {
    params: &'a SearchParams,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(params: &'a SearchParams) -> Self {
        Self { params }
    }

    /// The full request body. Sections with nothing to say are left out
    /// rather than sent empty.
    pub fn payload(&self, bets: &BestBets) -> Value {
        let mut payload = Map::new();
        payload.insert("from".to_string(), json!(self.params.start));
        payload.insert("size".to_string(), json!(self.params.count));
        payload.insert(
            "_source".to_string(),
            json!({ "includes": self.source_fields() }),
        );
        payload.insert("query".to_string(), self.query(bets));
        if let Some(filter) = self.filter_payload(&[]) {
            payload.insert("post_filter".to_string(), filter);
        }
        if let Some(sort) = self.sort() {
            payload.insert("sort".to_string(), sort);
        }
        if let Some(aggs) = self.aggregates() {
            payload.insert("aggs".to_string(), aggs);
        }
        if let Some(highlight) = self.highlight() {
            payload.insert("highlight".to_string(), highlight);
        }
        if let Some(suggest) = self.suggest() {
            payload.insert("suggest".to_string(), suggest);
        }
        if self.params.debug.explain {
            payload.insert("explain".to_string(), json!(true));
        }
        Value::Object(payload)
    }

    /// Everything the presenter needs on top of what the caller asked for
    fn source_fields(&self) -> Vec<String> {
        let mut fields = self.params.return_fields.clone();
        for extra in [
            "format",
            "title",
            "description",
            "organisation_state",
            "popularity",
            "link",
        ] {
            if !fields.iter().any(|f| f == extra) {
                fields.push(extra.to_string());
            }
        }
        fields
    }

    pub(crate) fn query(&self, bets: &BestBets) -> Value {
        let Some(query) = self.params.query.as_deref() else {
            return json!({ "match_all": {} });
        };
        let boosted = self.boosted(self.core_query(query));
        let scored = self.popularity(boosted);
        self.with_best_bets(scored, bets)
    }

    /// One recall leg that every result must pass, plus per-field precision
    /// legs that only sharpen the ordering. A query that is entirely one
    /// quoted phrase skips the word-based legs and demands the phrase.
    fn core_query(&self, query: &str) -> Value {
        if QUOTED_PHRASE_PATTERN.is_match(query) {
            return self.phrase_matches(query);
        }
        json!({
            "bool": {
                "must": [self.recall_query(query)],
                "should": self.precision_queries(query),
            }
        })
    }

    fn recall_query(&self, query: &str) -> Value {
        let fields: Vec<&str> = MATCH_FIELDS.iter().map(|&(field, _)| field).collect();
        let mut queries = vec![json!({
            "multi_match": {
                "query": query,
                "fields": fields,
                "analyzer": "searchable_text",
                "minimum_should_match": MINIMUM_SHOULD_MATCH,
            }
        })];
        if !self.params.debug.disable_synonyms {
            queries.push(json!({
                "multi_match": {
                    "query": query,
                    "fields": fields,
                    "analyzer": "query_with_synonyms",
                    "minimum_should_match": MINIMUM_SHOULD_MATCH,
                }
            }));
        }
        dis_max(queries, Some(0.1))
    }

    fn precision_queries(&self, query: &str) -> Vec<Value> {
        let mut groups = vec![
            self.word_matches(query, "searchable_text"),
            self.phrase_matches(query),
            self.all_term_matches(query),
        ];
        if !self.params.debug.disable_synonyms {
            groups.push(self.word_matches(query, "query_with_synonyms"));
        }
        groups
    }

    fn word_matches(&self, query: &str, analyzer: &str) -> Value {
        dis_max(
            MATCH_FIELDS
                .iter()
                .map(|&(field, boost)| {
                    json!({ "match": { (field): {
                        "query": query,
                        "boost": boost,
                        "minimum_should_match": MINIMUM_SHOULD_MATCH,
                        "analyzer": analyzer,
                    }}})
                })
                .collect(),
            None,
        )
    }

    fn phrase_matches(&self, query: &str) -> Value {
        dis_max(
            MATCH_FIELDS
                .iter()
                .map(|&(field, boost)| {
                    json!({ "match_phrase": { (field): {
                        "query": query,
                        "boost": boost,
                        "analyzer": "searchable_text",
                    }}})
                })
                .collect(),
            None,
        )
    }

    fn all_term_matches(&self, query: &str) -> Value {
        dis_max(
            MATCH_FIELDS
                .iter()
                .map(|&(field, boost)| {
                    json!({ "match": { (field): {
                        "query": query,
                        "boost": boost,
                        "operator": "and",
                        "analyzer": "searchable_text",
                    }}})
                })
                .collect(),
            None,
        )
    }

    fn boosted(&self, core: Value) -> Value {
        if self.params.debug.disable_boosting {
            return core;
        }
        json!({
            "function_score": {
                "boost_mode": "multiply",
                "score_mode": "multiply",
                "query": { "bool": { "should": [core] } },
                "functions": boost_functions(),
            }
        })
    }

    fn popularity(&self, query: Value) -> Value {
        if self.params.debug.disable_popularity {
            return query;
        }
        json!({
            "function_score": {
                "boost_mode": "multiply",
                "query": query,
                "script_score": { "script": "doc['popularity'].value + 0.001" },
            }
        })
    }

    /// Pin best-bet links above everything else and drop worst bets
    /// entirely. The boost steps by a million per position so organic
    /// scores can never reorder the pinned links.
    fn with_best_bets(&self, query: Value, bets: &BestBets) -> Value {
        if self.params.debug.disable_best_bets || bets.is_empty() {
            return query;
        }
        let max_position = bets.best.keys().max().copied().unwrap_or(0);
        let mut should = vec![query];
        for (position, links) in &bets.best {
            should.push(json!({
                "function_score": {
                    "query": { "terms": { "link": links } },
                    "boost_factor": (max_position + 1 - position) * 1_000_000,
                }
            }));
        }
        let mut bool_query = Map::new();
        bool_query.insert("should".to_string(), Value::Array(should));
        if !bets.worst.is_empty() {
            bool_query.insert(
                "must_not".to_string(),
                json!([{ "terms": { "link": bets.worst } }]),
            );
        }
        json!({ "bool": bool_query })
    }

    /// Filters combined into a single clause, skipping any fields named
    /// in `excluding`. Returns None when nothing remains.
    pub(crate) fn filter_payload(&self, excluding: &[&str]) -> Option<Value> {
        let mut musts = Vec::new();
        let mut must_nots = Vec::new();
        for filter in &self.params.filters {
            if excluding.contains(&filter.field_name.as_str()) {
                continue;
            }
            let Some(clause) = filter_clause(filter) else {
                continue;
            };
            if filter.reject {
                must_nots.push(clause);
            } else {
                musts.push(clause);
            }
        }
        combine_filters(musts, must_nots)
    }

    fn sort(&self) -> Option<Value> {
        let (field, direction) = self.params.order.as_ref()?;
        Some(json!([{
            (field.as_str()): {
                "order": direction.as_str(),
                "missing": "_last",
                "unmapped_type": "date",
            }
        }]))
    }

    /// Each facet becomes a pair of aggregations: a terms breakdown and a
    /// count of documents with no value at all
    fn aggregates(&self) -> Option<Value> {
        if self.params.facets.is_empty() {
            return None;
        }
        let mut aggs = Map::new();
        for (field, facet) in &self.params.facets {
            let applied = match facet.scope {
                FacetScope::ExcludeFieldFilter => self.filter_payload(&[field.as_str()]),
                FacetScope::AllFilters => self.filter_payload(&[]),
            }
            .unwrap_or_else(|| json!({ "match_all": {} }));

            aggs.insert(
                field.clone(),
                json!({
                    "filter": applied.clone(),
                    "aggs": {
                        "filtered_aggregations": {
                            "terms": {
                                "field": field,
                                "order": { "_count": "desc" },
                                "size": 100000,
                            }
                        }
                    }
                }),
            );
            aggs.insert(
                format!("{}_with_missing_value", field),
                json!({
                    "filter": applied,
                    "aggs": {
                        "filtered_aggregations": {
                            "missing": { "field": field }
                        }
                    }
                }),
            );
        }
        Some(Value::Object(aggs))
    }

    fn highlight(&self) -> Option<Value> {
        let title = self.params.field_requested("title_with_highlighting");
        let description = self.params.field_requested("description_with_highlighting");
        if !title && !description {
            return None;
        }
        let mut fields = Map::new();
        if title {
            fields.insert("title".to_string(), json!({ "number_of_fragments": 0 }));
        }
        if description {
            fields.insert(
                "description".to_string(),
                json!({ "number_of_fragments": 1, "fragment_size": 285 }),
            );
        }
        Some(json!({
            "pre_tags": ["<mark>"],
            "post_tags": ["</mark>"],
            "encoder": "html",
            "fields": fields,
        }))
    }

    fn suggest(&self) -> Option<Value> {
        if !self.params.suggest_spelling() {
            return None;
        }
        let query = self.params.query.as_deref()?;
        Some(json!({
            "text": query,
            "spelling_suggestions": {
                "phrase": {
                    "field": "spelling_text",
                    "size": 1,
                    "max_errors": 3,
                    "direct_generator": [{
                        "field": "spelling_text",
                        "suggest_mode": "missing",
                        "sort": "frequency",
                    }],
                }
            }
        }))
    }
}

fn dis_max(mut queries: Vec<Value>, tie_breaker: Option<f64>) -> Value {
    if queries.len() == 1 {
        return queries.remove(0);
    }
    let mut body = Map::new();
    body.insert("queries".to_string(), Value::Array(queries));
    if let Some(tie) = tie_breaker {
        body.insert("tie_breaker".to_string(), json!(tie));
    }
    json!({ "dis_max": body })
}

fn boost_functions() -> Vec<Value> {
    let mut functions: Vec<Value> = FORMAT_BOOSTS
        .iter()
        .map(|&(format, boost)| {
            json!({
                "filter": { "term": { "format": format } },
                "boost_factor": boost,
            })
        })
        .collect();
    functions.push(time_boost());
    for state in ["closed", "devolved"] {
        functions.push(json!({
            "filter": { "term": { "organisation_state": state } },
            "boost_factor": 0.3,
        }));
    }
    functions.push(json!({
        "filter": { "term": { "is_historic": true } },
        "boost_factor": 0.5,
    }));
    functions
}

/// Newer announcements score higher; the curve decays towards a floor of
/// 0.12 over about a year
fn time_boost() -> Value {
    json!({
        "filter": { "term": { "search_format_types": "announcement" } },
        "script_score": {
            "script": "((0.05 / ((3.16*pow(10,-11)) * abs(now - doc['public_timestamp'].date.getMillis()) + 0.05)) + 0.12)",
            "params": { "now": now_to_minute_millis() },
        }
    })
}

/// Rounded to the minute so repeated queries can reuse the engine's cache
fn now_to_minute_millis() -> i64 {
    (Utc::now().timestamp() / 60) * 60_000
}

fn filter_clause(filter: &FieldFilter) -> Option<Value> {
    let mut clauses = Vec::new();
    if filter.include_missing {
        clauses.push(json!({ "missing": { "field": filter.field_name } }));
    }
    match &filter.values {
        FilterValues::Text(values) if !values.is_empty() => {
            clauses.push(json!({ "terms": { (filter.field_name.as_str()): values } }));
        }
        FilterValues::Text(_) => {}
        FilterValues::Date(range) => {
            let mut bounds = Map::new();
            if let Some(from) = range.from {
                bounds.insert(
                    "from".to_string(),
                    json!(from.to_rfc3339_opts(SecondsFormat::Secs, true)),
                );
            }
            if let Some(to) = range.to {
                bounds.insert(
                    "to".to_string(),
                    json!(to.to_rfc3339_opts(SecondsFormat::Secs, true)),
                );
            }
            clauses.push(json!({ "range": { (filter.field_name.as_str()): bounds } }));
        }
    }
    match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(json!({ "bool": { "should": clauses } })),
    }
}

fn combine_filters(musts: Vec<Value>, must_nots: Vec<Value>) -> Option<Value> {
    match (musts.is_empty(), must_nots.is_empty()) {
        (true, true) => None,
        (false, true) => {
            if musts.len() == 1 {
                musts.into_iter().next()
            } else {
                Some(json!({ "bool": { "must": musts } }))
            }
        }
        (true, false) => Some(json!({ "bool": { "must_not": must_nots } })),
        (false, false) => Some(json!({ "bool": { "must": musts, "must_not": must_nots } })),
    }
}
