//! Chunked reading: groups streamed rows into fixed-size batches.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::reader::DelimitedReader;
use super::ROW_BUFFER;
use crate::error::{Error, Result};
use crate::format::Row;

impl DelimitedReader {
    /// Streams rows to `tx` in chunks of `chunk_size`, in source order.
    ///
    /// Every chunk except possibly the last holds exactly `chunk_size` rows;
    /// the last one holds the remainder and is never empty. Returns the
    /// number of rows read.
    ///
    /// The row producer and the batcher share a child of `cancel`, so a
    /// failure in either stops the other without touching the caller's token.
    ///
    /// # Errors
    ///
    /// - `InvalidChunkSize` if `chunk_size` is zero.
    /// - The first non-cancellation error of either stage, otherwise
    ///   `Cancelled` if the pipeline was cancelled.
    pub async fn read_chunks(
        &self,
        cancel: &CancellationToken,
        tx: &mpsc::Sender<Vec<Row>>,
        chunk_size: usize,
    ) -> Result<usize> {
        if chunk_size == 0 {
            return Err(Error::InvalidChunkSize);
        }

        let pipeline = cancel.child_token();
        let (row_tx, row_rx) = mpsc::channel::<Row>(ROW_BUFFER);

        let producer = async {
            let row_tx = row_tx;
            let result = self.read(&pipeline, &row_tx).await;
            if result.is_err() {
                pipeline.cancel();
            }
            result
        };

        let batcher = async {
            let result = batch_rows(&pipeline, row_rx, tx, chunk_size).await;
            if result.is_err() {
                pipeline.cancel();
            }
            result
        };

        let (read_result, batch_result) = tokio::join!(producer, batcher);

        match (read_result, batch_result) {
            (Ok(count), Ok(chunks)) => {
                tracing::debug!(rows = count, chunks, chunk_size, "Finished chunked read");
                Ok(count)
            }
            (Err(read_err), Err(batch_err)) => {
                if read_err.is_cancelled() {
                    Err(batch_err)
                } else {
                    Err(read_err)
                }
            }
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
        }
    }
}

/// Collects rows from `rx` into chunks and sends them to `tx`.
///
/// Returns the number of chunks sent.
async fn batch_rows(
    cancel: &CancellationToken,
    mut rx: mpsc::Receiver<Row>,
    tx: &mpsc::Sender<Vec<Row>>,
    chunk_size: usize,
) -> Result<usize> {
    let mut chunk = Vec::with_capacity(chunk_size);
    let mut chunks = 0usize;

    loop {
        let row = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            row = rx.recv() => row,
        };

        match row {
            Some(row) => {
                chunk.push(row);
                if chunk.len() == chunk_size {
                    let full = std::mem::replace(&mut chunk, Vec::with_capacity(chunk_size));
                    send_chunk(cancel, tx, full).await?;
                    chunks += 1;
                }
            }
            None => {
                if !chunk.is_empty() {
                    send_chunk(cancel, tx, chunk).await?;
                    chunks += 1;
                }
                return Ok(chunks);
            }
        }
    }
}

async fn send_chunk(
    cancel: &CancellationToken,
    tx: &mpsc::Sender<Vec<Row>>,
    chunk: Vec<Row>,
) -> Result<()> {
    let rows = chunk.len();
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        sent = tx.send(chunk) => {
            sent.map_err(|_| Error::ChannelClosed)?;
            tracing::trace!(rows, "Sent chunk");
            Ok(())
        }
    }
}
