use serde_json::{json, Value};
use std::collections::VecDeque;
use tracing::debug;

use crate::client::EngineClient;
use crate::config::ScrollConfig;
use crate::index::error::{IndexError, IndexResult};

/// Iterates a large result set through the engine's cursor protocol,
/// yielding each hit exactly once through a caller-supplied transform.
///
/// The cursor token returned with each page supersedes the previous one;
/// token stability across pages is never assumed. The requested batch size
/// is applied per shard, so pages may carry a multiple of it.
pub struct ScrollCursor<T> {
    client: EngineClient,
    keepalive: String,
    map_hit: Box<dyn Fn(Value) -> T + Send + Sync>,
    buffer: VecDeque<Value>,
    scroll_token: String,
    total: u64,
    finished: bool,
}

impl<T> ScrollCursor<T> {
    /// Open a cursor over `index_names` with the given query body. The first
    /// page is fetched (and consumed) here, even when it is empty, so
    /// zero-result cursors terminate cleanly.
    pub async fn start<F>(
        client: &EngineClient,
        index_names: &str,
        mut search_body: Value,
        config: ScrollConfig,
        map_hit: F,
    ) -> IndexResult<Self>
    where
        F: Fn(Value) -> T + Send + Sync + 'static,
    {
        // Full scans must be deterministic, so default to index order
        // rather than relevance.
        if search_body.get("sort").is_none() {
            search_body["sort"] = json!(["_doc"]);
        }

        let keepalive = format!("{}m", config.keepalive_minutes);
        let path = format!(
            "{}/_search?scroll={}&search_type=query_then_fetch&version=true&size={}",
            index_names, keepalive, config.batch_size
        );
        let page = client.get_with_body(&path, &search_body).await?;

        let total = total_hits(&page);
        let scroll_token = scroll_token(&page)?;
        let buffer = page_hits(&page);
        debug!(
            indexes = index_names,
            total = total,
            first_page = buffer.len(),
            "opened scroll cursor"
        );

        Ok(Self {
            // Shards running out of results mid-scroll answer 5xx; that is
            // expected, not alert-worthy.
            client: client.quiet_server_errors(),
            keepalive,
            map_hit: Box::new(map_hit),
            buffer,
            scroll_token,
            total,
            finished: false,
        })
    }

    /// Total number of hits the cursor will yield
    pub fn total(&self) -> u64 {
        self.total
    }

    /// The next transformed hit, or None once a page comes back empty
    pub async fn next(&mut self) -> IndexResult<Option<T>> {
        loop {
            if let Some(hit) = self.buffer.pop_front() {
                return Ok(Some((self.map_hit)(hit)));
            }
            if self.finished {
                return Ok(None);
            }

            let body = json!({ "scroll": self.keepalive, "scroll_id": self.scroll_token });
            let page = self.client.post_json("/_search/scroll", &body).await?;
            self.scroll_token = scroll_token(&page)?;

            let hits = page_hits(&page);
            if hits.is_empty() {
                // All shards have run out of results.
                self.finished = true;
                return Ok(None);
            }
            debug!(hits = hits.len(), total = self.total, "retrieved scroll page");
            self.buffer = hits;
        }
    }

    /// Drain the cursor into a vector
    pub async fn collect(mut self) -> IndexResult<Vec<T>> {
        let mut out = Vec::new();
        while let Some(item) = self.next().await? {
            out.push(item);
        }
        Ok(out)
    }
}

fn scroll_token(page: &Value) -> IndexResult<String> {
    page.get("_scroll_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(IndexError::MissingScrollToken)
}

fn page_hits(page: &Value) -> VecDeque<Value> {
    match page.pointer("/hits/hits") {
        Some(Value::Array(hits)) => hits.iter().cloned().collect(),
        _ => VecDeque::new(),
    }
}

/// Either a plain integer (older engines) or `{value, relation}`
pub(crate) fn total_hits(page: &Value) -> u64 {
    match page.pointer("/hits/total") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::Object(o)) => o.get("value").and_then(Value::as_u64).unwrap_or(0),
        _ => 0,
    }
}
