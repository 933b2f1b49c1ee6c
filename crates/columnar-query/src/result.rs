//! Query results
//!
//! A [`QueryResult`] owns the row reader for one request. Rows are pulled on
//! demand; the caller must [`QueryResult::close`] it to release the stream
//! (the consuming helpers [`QueryResult::buffer`] and
//! [`QueryResult::into_rows`] close it themselves).

use crate::error::{Error, Result};
use crate::metadata::QueryMetadata;
use crate::reader::{RowReader, StreamState};
use crate::unmarshal::Unmarshaler;
use futures::Stream;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

/// One raw result row plus the unmarshaler chosen for the request
#[derive(Clone)]
pub struct QueryResultRow {
    raw: Vec<u8>,
    unmarshaler: Arc<dyn Unmarshaler>,
}

impl QueryResultRow {
    /// Raw row bytes
    pub fn bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Take the raw row bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.raw
    }

    /// Decode the row into `T` using the request's unmarshaler
    pub fn content_as<T: DeserializeOwned>(&self) -> Result<T> {
        let value = self.unmarshaler.unmarshal(&self.raw)?;
        serde_json::from_value(value).map_err(|e| Error::Unmarshal(e.to_string()))
    }
}

impl fmt::Debug for QueryResultRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResultRow")
            .field("raw", &String::from_utf8_lossy(&self.raw))
            .finish()
    }
}

/// Every row of a result plus its metadata
#[derive(Debug, Clone)]
pub struct BufferedQueryResult {
    /// Rows in arrival order
    pub rows: Vec<QueryResultRow>,
    /// Trailing metadata
    pub metadata: QueryMetadata,
}

/// Streaming result of a successful dispatch
pub struct QueryResult {
    reader: RowReader,
    unmarshaler: Arc<dyn Unmarshaler>,
}

impl QueryResult {
    pub(crate) fn new(reader: RowReader, unmarshaler: Arc<dyn Unmarshaler>) -> Self {
        Self {
            reader,
            unmarshaler,
        }
    }

    /// Next row, or `None` once the stream is exhausted, failed or closed.
    /// Check [`Self::err`] after `None` to tell exhaustion from failure.
    pub async fn next_row(&mut self) -> Option<QueryResultRow> {
        let raw = self.reader.next_row().await?;
        Some(QueryResultRow {
            raw,
            unmarshaler: Arc::clone(&self.unmarshaler),
        })
    }

    /// Trailing metadata; complete only after the rows are drained or the
    /// result is closed
    pub async fn metadata(&mut self) -> Result<QueryMetadata> {
        self.reader.metadata().await
    }

    /// First deferred stream error, if any
    pub fn err(&mut self) -> Option<&Error> {
        self.reader.err()
    }

    /// Lifecycle state of the underlying reader
    pub fn state(&self) -> StreamState {
        self.reader.state()
    }

    /// Release the underlying stream
    pub async fn close(&mut self) -> Result<()> {
        self.reader.close().await
    }

    /// Drain every row, then read metadata and close.
    ///
    /// A deferred stream error takes precedence over everything after it;
    /// the stream is still closed in that case.
    pub async fn buffer(mut self) -> Result<BufferedQueryResult> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row().await {
            rows.push(row);
        }

        if let Some(err) = self.take_err() {
            let _ = self.reader.close().await;
            return Err(err);
        }

        let metadata = match self.reader.metadata().await {
            Ok(metadata) => metadata,
            Err(err) => {
                let _ = self.reader.close().await;
                return Err(err);
            }
        };
        self.reader.close().await?;

        Ok(BufferedQueryResult { rows, metadata })
    }

    /// Consume the result as a stream of rows. A deferred stream error is
    /// yielded as the final item; the source is closed when the stream ends.
    pub fn into_rows(self) -> impl Stream<Item = Result<QueryResultRow>> {
        let mut result = self;
        async_stream::stream! {
            while let Some(row) = result.next_row().await {
                yield Ok(row);
            }
            if let Some(err) = result.take_err() {
                let _ = result.reader.close().await;
                yield Err(err);
            } else if let Err(err) = result.reader.close().await {
                yield Err(err);
            }
        }
    }

    /// Owned copy of the deferred error for consuming helpers
    fn take_err(&mut self) -> Option<Error> {
        self.reader.err()?;
        self.reader.take_error()
    }
}

impl fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResult")
            .field("state", &self.reader.state())
            .field("unmarshaler", &self.unmarshaler)
            .finish()
    }
}
