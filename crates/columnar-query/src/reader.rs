//! Row stream adapter
//!
//! Wraps an [`AgentRowStream`] as an explicit state machine:
//!
//! ```text
//!   Open --(source returns no row)--------------> Exhausted
//!   Open --(deferred error / context fired)-----> Errored
//!   Open | Exhausted | Errored --(close)--------> Closed
//! ```
//!
//! Metadata is only complete once the stream is `Exhausted` or `Closed`; it
//! is cached from then on. Reads made while `Open` go to the source each time
//! and may see partial data. After close, the last successfully decoded
//! snapshot is returned without going back to the source.
//!
//! Every transport failure surfaced here (`err`, `metadata`, `close`) is
//! classified independently.

use crate::agent::AgentRowStream;
use crate::classify::{classify, classify_context};
use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::metadata::QueryMetadata;
use tracing::{debug, trace};

/// Lifecycle of a [`RowReader`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Rows may still arrive
    Open,
    /// Every row was read; metadata is available
    Exhausted,
    /// Released by the caller
    Closed,
    /// A deferred stream error or context failure ended the read
    Errored,
}

/// Single-owner reader over a streaming row source
pub struct RowReader {
    stream: Box<dyn AgentRowStream>,
    ctx: RequestContext,
    statement: String,
    state: StreamState,
    error: Option<Error>,
    metadata: Option<QueryMetadata>,
    last_seen: Option<QueryMetadata>,
    rows_read: u64,
}

impl RowReader {
    /// Wrap `stream`; `ctx` bounds every later read
    pub fn new(
        stream: Box<dyn AgentRowStream>,
        ctx: RequestContext,
        statement: impl Into<String>,
    ) -> Self {
        Self {
            stream,
            ctx,
            statement: statement.into(),
            state: StreamState::Open,
            error: None,
            metadata: None,
            last_seen: None,
            rows_read: 0,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Next row's raw bytes; `None` once exhausted, errored or closed.
    ///
    /// Returns `None` repeatedly after exhaustion. A cancelled or expired
    /// context ends the stream and records a classified error for [`Self::err`].
    pub async fn next_row(&mut self) -> Option<Vec<u8>> {
        if self.state != StreamState::Open {
            return None;
        }

        let polled = tokio::select! {
            biased;
            done = self.ctx.done() => Err(done),
            row = self.stream.next_row() => Ok(row),
        };

        match polled {
            Ok(Some(row)) => {
                self.rows_read += 1;
                Some(row)
            }
            Ok(None) => {
                match self.stream.err() {
                    Some(err) => self.fail(classify(err)),
                    None => {
                        debug!(rows = self.rows_read, "Row stream exhausted");
                        self.state = StreamState::Exhausted;
                    }
                }
                None
            }
            Err(done) => {
                self.fail(classify_context(done, &self.statement));
                None
            }
        }
    }

    /// Retrieve and decode the trailing metadata.
    ///
    /// Waits on the source first and only reports the context error if the
    /// source is still pending when the context fires.
    pub async fn metadata(&mut self) -> Result<QueryMetadata> {
        if let Some(meta) = &self.metadata {
            return Ok(meta.clone());
        }
        if self.state == StreamState::Closed {
            if let Some(meta) = self.last_seen.take() {
                self.metadata = Some(meta.clone());
                return Ok(meta);
            }
        }

        let polled = tokio::select! {
            biased;
            bytes = self.stream.metadata() => Ok(bytes),
            done = self.ctx.done() => Err(done),
        };

        let bytes = match polled {
            Ok(bytes) => bytes.map_err(classify)?,
            Err(done) => return Err(classify_context(done, &self.statement)),
        };

        let meta = QueryMetadata::from_json(&bytes)?;
        if matches!(self.state, StreamState::Exhausted | StreamState::Closed) {
            self.metadata = Some(meta.clone());
        } else {
            self.last_seen = Some(meta.clone());
        }
        Ok(meta)
    }

    /// First deferred stream-level error, classified
    pub fn err(&mut self) -> Option<&Error> {
        if self.error.is_none() {
            if let Some(err) = self.stream.err() {
                self.fail(classify(err));
            }
        }
        self.error.as_ref()
    }

    /// Release the source. The source is closed at most once; later calls
    /// return `Ok(())`.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == StreamState::Closed {
            return Ok(());
        }
        self.state = StreamState::Closed;
        trace!(rows = self.rows_read, "Closing row stream");
        self.stream.close().await.map_err(classify)
    }

    /// Move the recorded error out, leaving the state untouched
    pub(crate) fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    fn fail(&mut self, err: Error) {
        debug!(error = %err, "Row stream failed");
        if self.state != StreamState::Closed {
            self.state = StreamState::Errored;
        }
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}
