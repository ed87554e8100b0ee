//! Batch persistence writer.
//!
//! Takes the full in-memory document set for one collection, slices it
//! into fixed-size batches, and dispatches them with bounded concurrency.
//! Batches are independent once the collection is fully generated, so
//! overlapping them only hides network latency; ordering *between*
//! collections is the caller's job (parents before children).

pub mod backoff;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::{GenError, Result};
use crate::store::{DocumentStore, StoreError};
use backoff::Backoff;

const INITIAL_BACKOFF_MS: u64 = 100;
const MAX_BACKOFF_MS: u64 = 5_000;

/// Writer tuning, carved out of the run configuration.
#[derive(Debug, Clone, Copy)]
pub struct WriterOptions {
    pub batch_size: usize,
    pub concurrency: usize,
    pub max_attempts: u32,
}

/// Outcome of one collection's write pass.
#[derive(Debug)]
pub struct WriteReport {
    pub collection: &'static str,
    pub documents: usize,
    pub batches: usize,
}

/// Serialize records into the JSON documents the store accepts.
pub fn to_documents<T: Serialize>(records: &[T]) -> Result<Vec<Value>> {
    records
        .iter()
        .map(|r| serde_json::to_value(r).map_err(GenError::from))
        .collect()
}

/// Write one collection's documents in batches.
///
/// `progress` counts documents written across the whole run; `total`
/// is the run-wide expected document count, reported with every batch.
/// A batch that exhausts its retry budget aborts the pass with the
/// collection name and batch offset so the run can be resumed.
pub async fn write_collection(
    store: &Arc<dyn DocumentStore>,
    collection: &'static str,
    documents: Vec<Value>,
    opts: WriterOptions,
    progress: &Arc<AtomicUsize>,
    total: usize,
) -> Result<WriteReport> {
    let document_count = documents.len();
    if document_count == 0 {
        return Ok(WriteReport {
            collection,
            documents: 0,
            batches: 0,
        });
    }

    let batches: Vec<Vec<Value>> = documents
        .chunks(opts.batch_size)
        .map(<[Value]>::to_vec)
        .collect();
    let batch_count = batches.len();

    tracing::info!(
        collection,
        documents = document_count,
        batches = batch_count,
        batch_size = opts.batch_size,
        concurrency = opts.concurrency,
        "Writing collection"
    );

    let inflight = Arc::new(Semaphore::new(opts.concurrency));
    let mut tasks: JoinSet<Result<()>> = JoinSet::new();

    for (batch_idx, batch) in batches.into_iter().enumerate() {
        let permit = inflight
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore closed");

        let store = Arc::clone(store);
        let progress = Arc::clone(progress);
        let offset = batch_idx * opts.batch_size;
        let max_attempts = opts.max_attempts;

        tasks.spawn(async move {
            let result =
                write_batch_with_retry(store.as_ref(), collection, &batch, max_attempts).await;
            drop(permit);
            match result {
                Ok(()) => {
                    let written =
                        progress.fetch_add(batch.len(), Ordering::Relaxed) + batch.len();
                    tracing::info!(
                        collection,
                        batch = batch_idx + 1,
                        written,
                        total,
                        "Batch written"
                    );
                    Ok(())
                }
                Err(source) => Err(GenError::Write {
                    collection,
                    offset,
                    written: progress.load(Ordering::Relaxed),
                    source,
                }),
            }
        });

        // Eagerly drain completed tasks so a failure aborts promptly.
        while let Some(joined) = tasks.try_join_next() {
            flatten(joined)?;
        }
    }

    while let Some(joined) = tasks.join_next().await {
        flatten(joined)?;
    }

    Ok(WriteReport {
        collection,
        documents: document_count,
        batches: batch_count,
    })
}

fn flatten(joined: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    joined.map_err(|e| GenError::invariant("writer", format!("write task aborted: {e}")))?
}

async fn write_batch_with_retry(
    store: &dyn DocumentStore,
    collection: &str,
    batch: &[Value],
    max_attempts: u32,
) -> std::result::Result<(), StoreError> {
    let mut backoff = Backoff::new(INITIAL_BACKOFF_MS, MAX_BACKOFF_MS, max_attempts);
    loop {
        match store.insert_batch(collection, batch).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_transient() => match backoff.next_delay() {
                Some(delay) => {
                    tracing::warn!(
                        collection,
                        attempt = backoff.attempts(),
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient write failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => return Err(e),
            },
            Err(e) => return Err(e),
        }
    }
}
