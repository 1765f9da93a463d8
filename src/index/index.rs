use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::client::{ClientError, EngineClient};
use crate::config::ScrollConfig;
use crate::index::bulk::{bulk_payload, is_write_lock_error, BulkEntry, BulkStats};
use crate::index::error::{IndexError, IndexResult};
use crate::index::scroll::ScrollCursor;
use crate::schema::{Document, FieldDefinitions};

/// The single document type writes and deletes are addressed to
const DOCUMENT_TYPE: &str = "generic-document";

/// The analyzer best-bet queries are normalised with before substring
/// matching
const BEST_BET_ANALYZER: &str = "best_bet_stemmed_match";

/// One concrete index (or an alias standing in for one). All reads and
/// writes against the engine go through here.
#[derive(Clone)]
pub struct Index {
    client: EngineClient,
    name: String,
    field_definitions: FieldDefinitions,
    scroll: ScrollConfig,
}

impl Index {
    pub fn new(
        client: EngineClient,
        name: impl Into<String>,
        field_definitions: FieldDefinitions,
        scroll: ScrollConfig,
    ) -> Self {
        Self {
            client,
            name: name.into(),
            field_definitions,
            scroll,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_definitions(&self) -> &FieldDefinitions {
        &self.field_definitions
    }

    /// Resolve this index's concrete name. When constructed with an alias
    /// this returns the index the alias points at; None when the index does
    /// not exist at all.
    pub async fn real_name(&self) -> IndexResult<Option<String>> {
        let path = format!("{}/_aliases", self.name);
        match self.client.get_json(&path).await {
            Ok(Value::Object(map)) => Ok(map.keys().next().cloned()),
            Ok(_) => Ok(None),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn exists(&self) -> IndexResult<bool> {
        Ok(self.real_name().await?.is_some())
    }

    pub async fn close(&self) -> IndexResult<()> {
        self.client
            .post_empty(&format!("{}/_close", self.name))
            .await?;
        Ok(())
    }

    /// Block writes to this index, making it read-only
    pub async fn lock(&self) -> IndexResult<()> {
        self.set_write_block(true).await
    }

    /// Remove any write block on this index
    pub async fn unlock(&self) -> IndexResult<()> {
        self.set_write_block(false).await
    }

    async fn set_write_block(&self, blocked: bool) -> IndexResult<()> {
        let body = json!({ "index": { "blocks": { "read_only_allow_delete": blocked } } });
        self.client
            .put_json(&format!("{}/_settings", self.name), &body)
            .await?;
        Ok(())
    }

    /// Run `op` with this index write-locked, unlocking on every exit path.
    /// If both the operation and the unlock fail, the operation's error is
    /// the one reported.
    pub async fn with_lock<T, Fut>(&self, op: Fut) -> IndexResult<T>
    where
        Fut: std::future::Future<Output = IndexResult<T>>,
    {
        info!(index = %self.name, "locking index");
        self.lock().await?;

        let outcome = op.await;

        info!(index = %self.name, "unlocking index");
        match (outcome, self.unlock().await) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(unlock_error)) => Err(unlock_error),
            (Err(op_error), Ok(())) => Err(op_error),
            (Err(op_error), Err(unlock_error)) => {
                warn!(index = %self.name, error = %unlock_error, "failed to unlock after error");
                Err(op_error)
            }
        }
    }

    /// Insert or update documents through a single versioned bulk write.
    /// Everything that writes documents ends up here.
    pub async fn bulk_index(&self, documents: &[Document]) -> IndexResult<BulkStats> {
        info!(count = documents.len(), index = %self.name, "adding documents to index");
        let entries = documents
            .iter()
            .map(BulkEntry::from_document)
            .collect::<IndexResult<Vec<_>>>()?;
        self.bulk_entries(&entries).await
    }

    pub async fn bulk_entries(&self, entries: &[BulkEntry]) -> IndexResult<BulkStats> {
        self.bulk_raw(bulk_payload(entries)).await
    }

    /// Send an already serialized bulk payload
    pub async fn bulk_raw(&self, payload: String) -> IndexResult<BulkStats> {
        let response = self
            .client
            .post_ndjson(&format!("{}/_bulk", self.name), payload)
            .await?;
        crate::index::bulk::classify_response(&self.name, &response)
    }

    /// Fetch a single document by id, across all document types
    pub async fn get(&self, id: &str) -> IndexResult<Option<Document>> {
        let path = format!("{}/_all/{}", self.name, encode_path_segment(id));
        match self.client.get_json(&path).await {
            Ok(hit) => Ok(Some(Document::from_hit(&self.field_definitions, &hit))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply partial field updates to an existing document and reindex it
    pub async fn amend(&self, id: &str, updates: &serde_json::Map<String, Value>) -> IndexResult<()> {
        let mut document = self
            .get(id)
            .await?
            .ok_or_else(|| IndexError::DocumentNotFound { id: id.to_string() })?;

        for (key, value) in updates {
            if key == "link" {
                return Err(IndexError::InvalidRequest(
                    "Cannot change document links".to_string(),
                ));
            }
            if !document.set(&self.field_definitions, key, value.clone()) {
                return Err(IndexError::InvalidRequest(format!(
                    "Unrecognised field '{}'",
                    key
                )));
            }
        }

        self.bulk_index(&[document]).await?;
        Ok(())
    }

    /// Delete a document by id. Deleting a document that is already gone is
    /// not an error.
    pub async fn delete(&self, id: &str) -> IndexResult<()> {
        let path = format!(
            "{}/{}/{}",
            self.name,
            DOCUMENT_TYPE,
            encode_path_segment(id)
        );
        match self.client.delete(&path).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) if e.is_forbidden() && is_write_lock_error(e.body()) => {
                Err(IndexError::Locked {
                    index: self.name.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Make all pending writes visible to search
    pub async fn commit(&self) -> IndexResult<()> {
        self.client
            .post_empty(&format!("{}/_refresh", self.name))
            .await?;
        Ok(())
    }

    /// Run a search with a caller-built payload, returning the raw response
    pub async fn raw_search(&self, payload: &Value) -> IndexResult<Value> {
        debug!(index = %self.name, payload = %payload, "search request");
        Ok(self
            .client
            .post_json(&format!("{}/_search", self.name), payload)
            .await?)
    }

    /// Run several searches in one round trip, returning the responses in
    /// request order
    pub async fn msearch(&self, payloads: &[Value]) -> IndexResult<Value> {
        let mut body = String::new();
        for payload in payloads {
            body.push_str("{}\n");
            body.push_str(&payload.to_string());
            body.push('\n');
        }
        Ok(self
            .client
            .post_ndjson(&format!("{}/_msearch", self.name), body)
            .await?)
    }

    /// Normalise a best-bet query through the index's analyzer, joining the
    /// produced tokens with spaces. An analysis failure means the query
    /// cannot match any stemmed bet, so it maps to the empty string.
    pub async fn analyzed_best_bet_query(&self, query: &str) -> IndexResult<String> {
        let body = json!({ "text": query, "analyzer": BEST_BET_ANALYZER });
        let path = format!("{}/_analyze", self.name);
        let response = match self.client.get_with_body(&path, &body).await {
            Ok(response) => response,
            Err(ClientError::Request { .. }) => return Ok(String::new()),
            Err(e) => return Err(e.into()),
        };

        let tokens = match response.get("tokens").and_then(Value::as_array) {
            Some(tokens) => tokens,
            None => return Ok(String::new()),
        };
        Ok(tokens
            .iter()
            .filter_map(|t| t.get("token").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" "))
    }

    /// Cursor over every document, optionally excluding formats
    pub async fn all_documents(
        &self,
        exclude_formats: &[String],
    ) -> IndexResult<ScrollCursor<Document>> {
        let body = json!({
            "query": {
                "bool": {
                    "must_not": { "terms": { "format": exclude_formats } }
                }
            }
        });
        let definitions = self.field_definitions.clone();
        ScrollCursor::start(&self.client, &self.name, body, self.scroll, move |hit| {
            Document::from_hit(&definitions, &hit)
        })
        .await
    }

    /// Cursor over every document link, optionally excluding formats
    pub async fn all_document_links(
        &self,
        exclude_formats: &[String],
    ) -> IndexResult<ScrollCursor<String>> {
        let body = json!({
            "query": {
                "bool": {
                    "must_not": { "terms": { "format": exclude_formats } }
                }
            },
            "_source": { "includes": ["link"] }
        });
        ScrollCursor::start(&self.client, &self.name, body, self.scroll, |hit| {
            hit.pointer("/_source/link")
                .or_else(|| hit.get("_id"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        })
        .await
    }

    /// Cursor over all documents of one format, fetching only the named
    /// fields. Used for registry builds, which want bigger pages than an
    /// ordinary scan.
    pub async fn documents_by_format(
        &self,
        format: &str,
        fields: &[&str],
    ) -> IndexResult<ScrollCursor<Document>> {
        let body = json!({
            "query": { "term": { "format": format } },
            "_source": { "includes": fields }
        });
        let scroll = ScrollConfig {
            batch_size: 500,
            ..self.scroll
        };
        let definitions = self.field_definitions.clone();
        ScrollCursor::start(&self.client, &self.name, body, scroll, move |hit| {
            Document::from_hit(&definitions, &hit)
        })
        .await
    }
}

/// Percent-encode one path segment, so ids containing slashes address a
/// single document rather than a deeper path
fn encode_path_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
