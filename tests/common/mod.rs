//! Shared fixtures for integration tests backed by a mock engine

#![allow(dead_code)]

use serde_json::{json, Value};

use search_broker::client::EngineClient;
use search_broker::config::{EngineConfig, PopulationConfig, ScrollConfig};
use search_broker::index::{Index, IndexGroup};
use search_broker::schema::FieldDefinitions;

pub fn engine_config(url: &str) -> EngineConfig {
    EngineConfig {
        base_url: url.to_string(),
        timeout_secs: 5,
        connect_timeout_secs: 5,
        admin_timeout_secs: 30,
    }
}

pub fn index_for(url: &str, name: &str) -> Index {
    Index::new(
        EngineClient::new(&engine_config(url)).unwrap(),
        name,
        FieldDefinitions::core(),
        ScrollConfig::default(),
    )
}

pub fn group_for(url: &str, name: &str) -> IndexGroup {
    let config = engine_config(url);
    IndexGroup::new(
        EngineClient::new(&config).unwrap(),
        EngineClient::admin(&config).unwrap(),
        name,
        FieldDefinitions::core(),
        ScrollConfig::default(),
    )
    .unwrap()
}

pub fn population_config() -> PopulationConfig {
    PopulationConfig {
        batch_size: 10,
        concurrency: 2,
        queue_capacity: 4,
    }
}

/// One page of a scrolled result set, using links as both ids and sources
pub fn scroll_page(token: &str, links: &[&str], total: u64) -> String {
    let hits: Vec<Value> = links
        .iter()
        .map(|link| {
            json!({
                "_id": link,
                "_source": { "link": link, "title": format!("Title of {}", link) },
            })
        })
        .collect();
    json!({ "_scroll_id": token, "hits": { "total": total, "hits": hits } }).to_string()
}

/// A bulk response applying every listed id
pub fn bulk_ok(ids: &[&str]) -> String {
    let items: Vec<Value> = ids
        .iter()
        .map(|id| json!({ "index": { "_id": id, "status": 200 } }))
        .collect();
    json!({ "items": items }).to_string()
}
