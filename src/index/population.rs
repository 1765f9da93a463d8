use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::PopulationConfig;
use crate::index::bulk::{bulk_payload, BulkEntry};
use crate::index::error::{IndexError, IndexResult};
use crate::index::group::IndexGroup;
use crate::index::index::Index;

/// Batch threshold for streamed input, in bytes including newlines
const STREAM_BATCH_BYTES: usize = 256 * 1024;

/// A pool of workers writing bulk payload chunks to one index concurrently.
/// The queue between producer and workers is bounded, so a slow engine
/// applies backpressure to the producer instead of buffering the whole
/// data set in memory.
pub struct PopulationPool {
    index: Index,
    sender: mpsc::Sender<String>,
    workers: Vec<JoinHandle<IndexResult<usize>>>,
}

impl PopulationPool {
    pub fn start(index: Index, config: &PopulationConfig) -> Self {
        let (sender, receiver) = mpsc::channel::<String>(config.queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..config.concurrency)
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                let index = index.clone();
                tokio::spawn(async move {
                    let mut applied = 0usize;
                    loop {
                        let chunk = { receiver.lock().await.recv().await };
                        match chunk {
                            Some(payload) => applied += index.bulk_raw(payload).await?.applied,
                            None => break,
                        }
                    }
                    debug!(worker = worker, applied = applied, "population worker finished");
                    Ok(applied)
                })
            })
            .collect();

        Self {
            index,
            sender,
            workers,
        }
    }

    /// Queue one bulk payload chunk, waiting if the workers are behind
    pub async fn push(&self, payload: String) -> IndexResult<()> {
        self.sender.send(payload).await.map_err(|_| {
            IndexError::PopulationAborted("all population workers have stopped".to_string())
        })
    }

    /// Close the queue, wait for the workers to drain it, and commit.
    /// Returns the number of documents applied; any worker failure fails
    /// the whole run.
    pub async fn finish(self) -> IndexResult<usize> {
        drop(self.sender);

        let mut total = 0usize;
        let mut first_error: Option<IndexError> = None;
        for outcome in futures::future::join_all(self.workers).await {
            match outcome {
                Ok(Ok(applied)) => total += applied,
                Ok(Err(e)) => first_error = first_error.or(Some(e)),
                Err(join_error) => {
                    first_error = first_error
                        .or_else(|| Some(IndexError::PopulationAborted(join_error.to_string())))
                }
            }
        }
        if let Some(error) = first_error {
            return Err(error);
        }

        self.index.commit().await?;
        Ok(total)
    }
}

/// Something a population run can draw documents from
#[async_trait]
pub trait DocumentSource: Send {
    /// Feed the entire source into the pool as bulk payload chunks
    async fn drain_into(self, pool: &PopulationPool) -> IndexResult<()>;
}

/// Copies every document out of an existing index
pub struct IndexSource {
    index: Index,
    batch_size: usize,
}

impl IndexSource {
    pub fn new(index: Index, batch_size: usize) -> Self {
        Self { index, batch_size }
    }
}

#[async_trait]
impl DocumentSource for IndexSource {
    async fn drain_into(self, pool: &PopulationPool) -> IndexResult<()> {
        let mut cursor = self.index.all_documents(&[]).await?;
        info!(index = %self.index.name(), total = cursor.total(), "copying documents");

        let mut batch: Vec<BulkEntry> = Vec::with_capacity(self.batch_size);
        while let Some(document) = cursor.next().await? {
            batch.push(BulkEntry::from_document(&document)?);
            if batch.len() >= self.batch_size {
                pool.push(bulk_payload(&batch)).await?;
                batch.clear();
            }
        }
        if !batch.is_empty() {
            pool.push(bulk_payload(&batch)).await?;
        }
        Ok(())
    }
}

/// Reads action/source line pairs from an NDJSON stream, batching them by
/// byte size. Pairs are never split across batches.
pub struct NdjsonSource<R> {
    reader: R,
}

impl<R> NdjsonSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl<R> DocumentSource for NdjsonSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn drain_into(self, pool: &PopulationPool) -> IndexResult<()> {
        let mut lines = self.reader.lines();
        let mut chunk = String::new();
        let mut pending_action: Option<String> = None;

        while let Some(line) = lines.next_line().await? {
            match pending_action.take() {
                None => pending_action = Some(line),
                Some(action) => {
                    chunk.push_str(&action);
                    chunk.push('\n');
                    chunk.push_str(&line);
                    chunk.push('\n');
                    if chunk.len() >= STREAM_BATCH_BYTES {
                        pool.push(std::mem::take(&mut chunk)).await?;
                    }
                }
            }
        }

        if pending_action.is_some() {
            return Err(IndexError::InvalidRequest(
                "bulk stream ended with an action line and no document".to_string(),
            ));
        }
        if !chunk.is_empty() {
            pool.push(chunk).await?;
        }
        Ok(())
    }
}

/// Create a fresh index in the group, fill it from the live one and swap
/// the alias over. Returns the number of documents applied.
pub async fn reindex(group: &IndexGroup, config: &PopulationConfig) -> IndexResult<usize> {
    let new_index = group.create_index().await?;
    let old_index = group.current_real().await?;
    let source = old_index
        .as_ref()
        .map(|old| IndexSource::new(old.clone(), config.batch_size));
    populate_and_switch(group, &new_index, old_index.as_ref(), source, config).await
}

/// Create a fresh index in the group, fill it from an NDJSON stream of
/// action/source line pairs and swap the alias over
pub async fn load_stream<R>(
    group: &IndexGroup,
    reader: R,
    config: &PopulationConfig,
) -> IndexResult<usize>
where
    R: AsyncBufRead + Unpin + Send,
{
    let new_index = group.create_index().await?;
    let old_index = group.current_real().await?;
    populate_and_switch(
        group,
        &new_index,
        old_index.as_ref(),
        Some(NdjsonSource::new(reader)),
        config,
    )
    .await
}

async fn populate_and_switch<S: DocumentSource>(
    group: &IndexGroup,
    new_index: &Index,
    old_index: Option<&Index>,
    source: Option<S>,
    config: &PopulationConfig,
) -> IndexResult<usize> {
    match old_index {
        Some(old) => {
            info!(from = %old.name(), to = %new_index.name(), "repopulating group");
            old.with_lock(async {
                let applied = populate(new_index, source, config).await?;
                // Swap inside the lock, so there is no window where the old
                // index can take writes after the new one goes live.
                group.switch_to(new_index).await?;
                old.close().await?;
                Ok(applied)
            })
            .await
        }
        None => {
            info!(to = %new_index.name(), "populating group with no live index");
            let applied = populate(new_index, source, config).await?;
            group.switch_to(new_index).await?;
            Ok(applied)
        }
    }
}

async fn populate<S: DocumentSource>(
    target: &Index,
    source: Option<S>,
    config: &PopulationConfig,
) -> IndexResult<usize> {
    info!(index = %target.name(), "indexing documents");
    let pool = PopulationPool::start(target.clone(), config);
    if let Some(source) = source {
        source.drain_into(&pool).await?;
    }
    pool.finish().await
}
