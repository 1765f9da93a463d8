use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::index::error::{FailedItem, IndexError, IndexResult};
use crate::schema::Document;

/// Matches the engine's forbidden-class messages for a write-blocked index.
/// Older engine versions phrase the block as `[FORBIDDEN/n/index write
/// (api)]`, newer ones as `[FORBIDDEN/n/index read-only / allow delete
/// (api)]`. This is a message-text heuristic, not a structured code, so it
/// can break when the engine changes its wording.
static WRITE_LOCK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[FORBIDDEN/[^/]*/index (write|read-only)").unwrap());

/// The sole lock-classification point for error messages from any write path
pub fn is_write_lock_error(message: &str) -> bool {
    WRITE_LOCK_PATTERN.is_match(message)
}

/// One document in a bulk write, with the version metadata that makes
/// out-of-order delivery safe
#[derive(Debug, Clone, PartialEq)]
pub struct BulkEntry {
    pub id: String,
    pub doc_type: String,
    pub version: Option<u64>,
    pub source: Map<String, Value>,
}

impl BulkEntry {
    pub fn new(id: &str, doc_type: &str, source: Map<String, Value>) -> Self {
        Self {
            id: id.to_string(),
            doc_type: doc_type.to_string(),
            version: None,
            source,
        }
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn from_document(document: &Document) -> IndexResult<Self> {
        let id = document.id().ok_or_else(|| {
            IndexError::InvalidRequest("document has no link or id to index under".to_string())
        })?;
        Ok(Self::new(id, document.doc_type(), document.export()))
    }
}

/// Outcome counts for a fully classified bulk response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkStats {
    /// Items the engine applied
    pub applied: usize,
    /// Version conflicts: a newer version already won, which is expected
    /// under out-of-order delivery and silently skipped
    pub skipped: usize,
}

/// Serialize entries into the bulk wire format: one action line and one
/// source line per document, newline-delimited with a trailing newline.
pub fn bulk_payload(entries: &[BulkEntry]) -> String {
    let mut payload = String::new();
    for entry in entries {
        let mut action = json!({ "_type": entry.doc_type, "_id": entry.id });
        if let Some(version) = entry.version {
            action["version"] = json!(version);
            action["version_type"] = json!("external_gte");
        }
        payload.push_str(&json!({ "index": action }).to_string());
        payload.push('\n');
        payload.push_str(&Value::Object(entry.source.clone()).to_string());
        payload.push('\n');
    }
    payload
}

/// Parse the per-item response array, classifying failures. A lock pattern
/// anywhere fails the whole call with Locked; version conflicts are counted
/// as skips; anything else failing raises BulkFailure with the failed ids.
pub fn classify_response(index_name: &str, response: &Value) -> IndexResult<BulkStats> {
    let items = response
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            IndexError::UnexpectedResponse("bulk response has no items array".to_string())
        })?;

    let mut stats = BulkStats::default();
    let mut failures: Vec<FailedItem> = Vec::new();

    for item in items {
        let data = item
            .get("index")
            .or_else(|| item.get("create"))
            .or_else(|| item.get("delete"))
            .ok_or_else(|| {
                IndexError::UnexpectedResponse(format!("unrecognised bulk item: {}", item))
            })?;

        let id = data.get("_id").and_then(Value::as_str).unwrap_or("");
        let status = data.get("status").and_then(Value::as_u64).unwrap_or(0);
        let error = data.get("error").map(error_text);

        match error {
            None => stats.applied += 1,
            Some(_) if status == 409 => {
                // Messages were processed out of order; a newer version
                // already won.
                info!(index = index_name, id = id, "version is outdated; ignoring");
                stats.skipped += 1;
            }
            Some(message) if is_write_lock_error(&message) => {
                return Err(IndexError::Locked {
                    index: index_name.to_string(),
                });
            }
            Some(message) => {
                debug!(index = index_name, id = id, error = %message, "bulk item failed");
                failures.push(FailedItem {
                    id: id.to_string(),
                    error: message,
                });
            }
        }
    }

    if !failures.is_empty() {
        return Err(IndexError::BulkFailure { failures });
    }
    Ok(stats)
}

/// Bulk item errors arrive either as a bare string (older engines) or as an
/// object with type and reason
fn error_text(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Object(o) => {
            let kind = o.get("type").and_then(Value::as_str).unwrap_or("");
            let reason = o.get("reason").and_then(Value::as_str).unwrap_or("");
            if kind.is_empty() {
                reason.to_string()
            } else if reason.is_empty() {
                kind.to_string()
            } else {
                format!("{}: {}", kind, reason)
            }
        }
        other => other.to_string(),
    }
}
