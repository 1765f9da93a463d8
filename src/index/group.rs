use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::info;
use uuid::Uuid;

use crate::client::EngineClient;
use crate::config::ScrollConfig;
use crate::index::error::{IndexError, IndexResult};
use crate::index::index::Index;
use crate::schema::{index_mappings, index_settings, FieldDefinitions};

/// A group of related indexes sharing one logical name.
///
/// A group called "mainstream" consists of concrete indexes of the form
/// "mainstream-<timestamp>-<uuid>", one of which carries the group name as
/// an alias. Migrations create a fresh concrete index, populate it, then
/// swap the alias over in a single atomic action.
pub struct IndexGroup {
    client: EngineClient,
    // Index creation and deletion can take far longer than other requests
    admin_client: EngineClient,
    name: String,
    field_definitions: FieldDefinitions,
    scroll: ScrollConfig,
    name_pattern: Regex,
}

impl IndexGroup {
    pub fn new(
        client: EngineClient,
        admin_client: EngineClient,
        name: impl Into<String>,
        field_definitions: FieldDefinitions,
        scroll: ScrollConfig,
    ) -> IndexResult<Self> {
        let name = name.into();
        let name_pattern = Regex::new(&format!(
            r"^{}-\d{{4}}-\d{{2}}-\d{{2}}t\d{{2}}[:-]\d{{2}}[:-]\d{{2}}z-[0-9a-f][0-9a-f-]*$",
            regex::escape(&name)
        ))
        .map_err(|e| IndexError::InvalidRequest(format!("bad group name {}: {}", name, e)))?;

        Ok(Self {
            client,
            admin_client,
            name,
            field_definitions,
            scroll,
            name_pattern,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index_for_name(&self, real_name: &str) -> Index {
        Index::new(
            self.client.clone(),
            real_name,
            self.field_definitions.clone(),
            self.scroll,
        )
    }

    /// Provision a fresh concrete index in this group
    pub async fn create_index(&self) -> IndexResult<Index> {
        let index_name = self.generate_name();
        let payload = json!({
            "settings": index_settings(),
            "mappings": index_mappings(&self.field_definitions),
        });
        self.admin_client.put_json(&index_name, &payload).await?;
        info!(index = %index_name, "created index");
        Ok(self.index_for_name(&index_name))
    }

    /// Point the group alias at `index`, removing it from whatever it
    /// pointed at before, in one atomic alias action
    pub async fn switch_to(&self, index: &Index) -> IndexResult<()> {
        // Read the full alias map rather than the group's, because a
        // pre-alias index will not match the naming convention.
        let indices = self.client.get_json("/_aliases").await?;
        let indices = indices.as_object().ok_or_else(|| {
            IndexError::UnexpectedResponse("alias listing is not an object".to_string())
        })?;

        // The engine will not accept an alias with the same name as an
        // existing index.
        if indices.contains_key(&self.name) {
            return Err(IndexError::UnmigratedIndex(self.name.clone()));
        }

        // We would normally expect 0 or 1 aliased index here, but several is
        // valid too.
        let old_names: Vec<&String> = indices
            .iter()
            .filter(|(_, details)| {
                details
                    .pointer("/aliases")
                    .and_then(Value::as_object)
                    .map(|aliases| aliases.contains_key(&self.name))
                    .unwrap_or(false)
            })
            .map(|(name, _)| name)
            .collect();

        info!(
            alias = %self.name,
            from = ?old_names,
            to = %index.name(),
            "switching group alias"
        );

        let mut actions: Vec<Value> = old_names
            .iter()
            .map(|old| json!({ "remove": { "index": old, "alias": self.name } }))
            .collect();
        actions.push(json!({ "add": { "index": index.name(), "alias": self.name } }));

        self.client
            .post_json("/_aliases", &json!({ "actions": actions }))
            .await?;
        Ok(())
    }

    /// The live index, addressed through the group alias
    pub fn current(&self) -> Index {
        self.index_for_name(&self.name)
    }

    /// The live index under its concrete name, so it can still be reached
    /// after the alias moves mid-migration
    pub async fn current_real(&self) -> IndexResult<Option<Index>> {
        match self.current().real_name().await? {
            Some(real_name) => Ok(Some(self.index_for_name(&real_name))),
            None => Ok(None),
        }
    }

    pub async fn index_names(&self) -> IndexResult<Vec<String>> {
        Ok(self.alias_map(true).await?.keys().cloned().collect())
    }

    /// Delete every index in the group that no alias points at
    pub async fn clean(&self) -> IndexResult<()> {
        for (name, details) in self.alias_map(true).await? {
            if alias_count(&details) == 0 {
                self.delete_index(&name).await?;
            }
        }
        Ok(())
    }

    /// Delete unaliased indexes older than `day_limit` days, judged by their
    /// most recently updated document. The newest inactive index is always
    /// kept as a rollback target; an index whose age cannot be verified is
    /// deleted.
    pub async fn timed_clean(&self, day_limit: u32) -> IndexResult<()> {
        for name in self.cleanable_index_names().await? {
            match self.find_last_update(&name).await? {
                None => {
                    info!(index = %name, "auto-cleaning index which is unused and can not have its age verified");
                    self.delete_index(&name).await?;
                }
                Some(last_update) => {
                    let days = days_since(&last_update);
                    if days >= i64::from(day_limit) {
                        info!(index = %name, days = days, "auto-cleaning index which is unused");
                        self.delete_index(&name).await?;
                    }
                }
            }
        }
        Ok(())
    }

    pub async fn delete_index(&self, index_name: &str) -> IndexResult<()> {
        info!(index = %index_name, "deleting index");
        self.admin_client.delete(index_name).await?;
        Ok(())
    }

    fn generate_name(&self) -> String {
        // The engine requires index names to be lower case, without colons
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        format!("{}-{}-{}", self.name, timestamp, Uuid::new_v4())
            .to_lowercase()
            .replace(':', "-")
    }

    /// All concrete indexes matching this group's naming convention, mapped
    /// to their alias details
    async fn alias_map(&self, include_closed: bool) -> IndexResult<Map<String, Value>> {
        let expand = if include_closed { "open,closed" } else { "open" };
        let path = format!("{}*?expand_wildcards={}", self.name, expand);
        let indices = self.client.get_json(&path).await?;

        let indices = match indices {
            Value::Object(map) => map,
            _ => {
                return Err(IndexError::UnexpectedResponse(
                    "index listing is not an object".to_string(),
                ))
            }
        };
        Ok(indices
            .into_iter()
            .filter(|(name, _)| self.name_pattern.is_match(name))
            .collect())
    }

    /// Unaliased group indexes in age order, with the most recent one
    /// removed so it survives as a rollback target
    async fn cleanable_index_names(&self) -> IndexResult<Vec<String>> {
        // Names embed their creation timestamp, so lexicographic order is
        // chronological. The alias map is already name-sorted.
        let mut names: Vec<String> = self
            .alias_map(true)
            .await?
            .into_iter()
            .filter(|(_, details)| alias_count(details) == 0)
            .map(|(name, _)| name)
            .collect();
        names.pop();
        Ok(names)
    }

    /// When the index was last written to, judged by the newest updated_at
    /// in it. Unmapped or absent timestamps come back as None.
    async fn find_last_update(&self, index_name: &str) -> IndexResult<Option<String>> {
        let query = json!({
            "_source": "updated_at",
            "size": 1,
            "sort": [
                { "updated_at": { "order": "desc", "unmapped_type": "date" } }
            ]
        });
        let response = self
            .client
            .post_json(&format!("{}/_search", index_name), &query)
            .await?;
        Ok(response
            .pointer("/hits/hits/0/_source/updated_at")
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}

fn alias_count(details: &Value) -> usize {
    details
        .pointer("/aliases")
        .and_then(Value::as_object)
        .map(|aliases| aliases.len())
        .unwrap_or(0)
}

/// Whole days since an ISO timestamp; unparseable values count as ancient,
/// so an index with a corrupt timestamp is treated like one with none
fn days_since(timestamp: &str) -> i64 {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(parsed) => Utc::now()
            .signed_duration_since(parsed.with_timezone(&Utc))
            .num_days(),
        Err(_) => i64::MAX,
    }
}
