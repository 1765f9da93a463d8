use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::index::{Index, IndexResult};

/// Curated links for a query: best bets pinned by position, worst bets
/// removed from the results outright
#[derive(Debug, Default, Clone)]
pub struct BestBets {
    pub best: BTreeMap<u64, Vec<String>>,
    pub worst: Vec<String>,
}

impl BestBets {
    pub fn is_empty(&self) -> bool {
        self.best.is_empty() && self.worst.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct BetDetails {
    #[serde(default)]
    best_bets: Vec<BestBetEntry>,
    #[serde(default)]
    worst_bets: Vec<WorstBetEntry>,
}

#[derive(Debug, Deserialize)]
struct BestBetEntry {
    link: String,
    position: u64,
}

#[derive(Debug, Deserialize)]
struct WorstBetEntry {
    link: String,
}

/// Looks up curated bets for a query in the metasearch index.
///
/// Bets are stored one document per (query, match type) pair. An
/// exact-match bet wins outright; otherwise every stemmed bet whose term
/// sequence appears in the analyzed query contributes.
pub struct BestBetsResolver<'a> {
    metasearch: &'a Index,
}

impl<'a> BestBetsResolver<'a> {
    pub fn new(metasearch: &'a Index) -> Self {
        Self { metasearch }
    }

    pub async fn resolve(&self, query: Option<&str>) -> IndexResult<BestBets> {
        let Some(query) = query else {
            return Ok(BestBets::default());
        };
        // Padded with spaces so stored terms (also padded) match only on
        // whole-word boundaries
        let analyzed = format!(
            " {} ",
            self.metasearch.analyzed_best_bet_query(query).await?
        );
        let response = self.metasearch.raw_search(&lookup_payload(query)).await?;
        Ok(select_bets(&response, &analyzed))
    }
}

fn lookup_payload(query: &str) -> Value {
    json!({
        "query": {
            "bool": {
                "should": [
                    { "match": { "exact_query": query } },
                    { "match": { "stemmed_query": query } },
                ]
            }
        },
        "post_filter": {
            "bool": { "must": { "match": { "document_type": "best_bet" } } }
        },
        "size": 1000,
        "_source": { "includes": ["details", "stemmed_query_as_term"] },
    })
}

fn select_bets(response: &Value, analyzed_query: &str) -> BestBets {
    let empty = Vec::new();
    let hits = response["hits"]["hits"].as_array().unwrap_or(&empty);

    let mut selected: Vec<(String, BetDetails)> = Vec::new();
    for hit in hits {
        if let Some(term) = hit["_source"]["stemmed_query_as_term"].as_str() {
            if !analyzed_query.contains(term) {
                continue;
            }
        }
        let Some(details) = parse_details(hit) else {
            continue;
        };
        selected.push((bet_type(hit).to_string(), details));
    }

    let chosen: Vec<BetDetails> = match selected.iter().position(|(t, _)| t == "exact") {
        Some(index) => vec![selected.swap_remove(index).1],
        None => selected.into_iter().map(|(_, details)| details).collect(),
    };
    combine(chosen)
}

fn combine(chosen: Vec<BetDetails>) -> BestBets {
    let mut pairs: Vec<(u64, String)> = Vec::new();
    let mut worst: Vec<String> = Vec::new();
    for details in chosen {
        for bet in details.best_bets {
            pairs.push((bet.position, bet.link));
        }
        for bet in details.worst_bets {
            if !worst.contains(&bet.link) {
                worst.push(bet.link);
            }
        }
    }

    // When bets disagree, a link keeps only its best (lowest) position
    pairs.sort();
    let mut best: BTreeMap<u64, Vec<String>> = BTreeMap::new();
    let mut seen: Vec<String> = Vec::new();
    for (position, link) in pairs {
        if seen.contains(&link) {
            continue;
        }
        seen.push(link.clone());
        best.entry(position).or_default().push(link);
    }

    BestBets { best, worst }
}

/// Bet details are stored as a serialized JSON string; older documents
/// carry it wrapped in a single-element array
fn parse_details(hit: &Value) -> Option<BetDetails> {
    let details = &hit["_source"]["details"];
    let raw = match details {
        Value::String(s) => s.as_str(),
        Value::Array(items) => items.first()?.as_str()?,
        _ => return None,
    };
    serde_json::from_str(raw).ok()
}

/// The document id ends in the match type: "<query>-exact" or
/// "<query>-stemmed"
fn bet_type(hit: &Value) -> &str {
    hit["_id"]
        .as_str()
        .and_then(|id| id.rsplit('-').next())
        .unwrap_or("")
}
