pub mod cache;

pub use cache::TimedCache;

use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::RegistryConfig;
use crate::index::{Index, IndexResult};

/// Slug to denormalized entity record
pub type RegistryTable = BTreeMap<String, Value>;

const BASIC_FIELDS: [&str; 3] = ["slug", "link", "title"];

/// A cached lookup table for one kind of reference entity, rebuilt wholesale
/// from a full format scan when the cache expires
pub struct Registry {
    index: Index,
    format: &'static str,
    fields: Vec<&'static str>,
    cache: TimedCache<RegistryTable>,
}

impl Registry {
    pub fn new(
        index: Index,
        format: &'static str,
        fields: &[&'static str],
        config: &RegistryConfig,
    ) -> Self {
        Self {
            index,
            format,
            fields: fields.to_vec(),
            cache: TimedCache::new(config.cache_lifetime()),
        }
    }

    pub fn format(&self) -> &str {
        self.format
    }

    /// The whole table, rebuilding it first if it has gone stale
    pub async fn all(&self) -> IndexResult<RegistryTable> {
        self.cache.get(|| self.fetch()).await
    }

    /// One entity by slug
    pub async fn get(&self, slug: &str) -> IndexResult<Option<Value>> {
        Ok(self.all().await?.get(slug).cloned())
    }

    async fn fetch(&self) -> IndexResult<RegistryTable> {
        let mut cursor = self
            .index
            .documents_by_format(self.format, &self.fields)
            .await?;

        let mut table = RegistryTable::new();
        while let Some(document) = cursor.next().await? {
            if let Some(slug) = document.get("slug").and_then(Value::as_str) {
                table.insert(slug.to_string(), document.to_value());
            }
        }
        Ok(table)
    }
}

/// Every reference registry the result presenter can expand entities from,
/// all reading from the same index
pub struct Registries {
    pub organisations: Registry,
    pub policy_areas: Registry,
    pub specialist_sectors: Registry,
    pub document_series: Registry,
    pub document_collections: Registry,
    pub world_locations: Registry,
    pub people: Registry,
}

impl Registries {
    pub fn standard(index: Index, config: &RegistryConfig) -> Self {
        Self {
            organisations: Registry::new(
                index.clone(),
                "organisation",
                &[
                    "slug",
                    "link",
                    "title",
                    "acronym",
                    "organisation_type",
                    "organisation_state",
                ],
                config,
            ),
            policy_areas: Registry::new(index.clone(), "policy_area", &BASIC_FIELDS, config),
            specialist_sectors: Registry::new(
                index.clone(),
                "specialist_sector",
                &BASIC_FIELDS,
                config,
            ),
            document_series: Registry::new(index.clone(), "document_series", &BASIC_FIELDS, config),
            document_collections: Registry::new(
                index.clone(),
                "document_collection",
                &BASIC_FIELDS,
                config,
            ),
            world_locations: Registry::new(index.clone(), "world_location", &BASIC_FIELDS, config),
            people: Registry::new(index, "person", &BASIC_FIELDS, config),
        }
    }

    /// The registry that expands values of a document field, if one does
    pub fn for_field(&self, field: &str) -> Option<&Registry> {
        match field {
            "organisations" => Some(&self.organisations),
            "policy_areas" => Some(&self.policy_areas),
            "specialist_sectors" => Some(&self.specialist_sectors),
            "document_series" => Some(&self.document_series),
            "document_collections" => Some(&self.document_collections),
            "world_locations" => Some(&self.world_locations),
            "people" => Some(&self.people),
            _ => None,
        }
    }
}
