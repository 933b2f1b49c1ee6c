//! Scripted transport for tests
//!
//! [`MockAgent`] replays queued responses and records every dispatched
//! [`AgentQueryOptions`]; [`MockRowStream`] replays rows, metadata and
//! failures, and can stall forever to exercise cancellation.

use crate::agent::{AgentError, AgentQueryOptions, AgentRowStream, ColumnarAgent};
use crate::context::RequestContext;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Counters shared between a [`MockRowStream`] and the test that built it
#[derive(Debug, Clone, Default)]
pub struct MockStreamHandle {
    metadata_calls: Arc<AtomicUsize>,
    close_calls: Arc<AtomicUsize>,
}

impl MockStreamHandle {
    /// Times the stream was asked for metadata
    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    /// Times the stream was closed
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Closed at least once
    pub fn is_closed(&self) -> bool {
        self.close_calls() > 0
    }
}

/// Replays a fixed sequence of rows followed by a metadata envelope
#[derive(Debug, Default)]
pub struct MockRowStream {
    rows: VecDeque<Vec<u8>>,
    metadata: Vec<u8>,
    metadata_error: Option<AgentError>,
    deferred_error: Option<AgentError>,
    close_error: Option<AgentError>,
    stalled: bool,
    closed: bool,
    handle: MockStreamHandle,
}

impl MockRowStream {
    /// Replay `rows`, then an empty metadata object
    pub fn new(rows: Vec<Vec<u8>>) -> Self {
        Self {
            rows: rows.into(),
            metadata: b"{}".to_vec(),
            ..Self::default()
        }
    }

    /// Rows from JSON values, one row per value
    pub fn from_json(rows: &[serde_json::Value]) -> Self {
        Self::new(rows.iter().map(|r| r.to_string().into_bytes()).collect())
    }

    /// Metadata envelope returned after the rows
    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = metadata.into().into_bytes();
        self
    }

    /// Fail the first metadata read with `err`
    pub fn with_metadata_error(mut self, err: AgentError) -> Self {
        self.metadata_error = Some(err);
        self
    }

    /// Error reported through `err()` once the rows run out
    pub fn with_deferred_error(mut self, err: AgentError) -> Self {
        self.deferred_error = Some(err);
        self
    }

    /// Fail the first close with `err`
    pub fn with_close_error(mut self, err: AgentError) -> Self {
        self.close_error = Some(err);
        self
    }

    /// Row and metadata reads never complete
    pub fn stalled(mut self) -> Self {
        self.stalled = true;
        self
    }

    /// Counters that outlive the stream once it is handed to an agent
    pub fn handle(&self) -> MockStreamHandle {
        self.handle.clone()
    }
}

#[async_trait]
impl AgentRowStream for MockRowStream {
    async fn next_row(&mut self) -> Option<Vec<u8>> {
        if self.stalled {
            std::future::pending::<()>().await;
        }
        if self.closed {
            return None;
        }
        self.rows.pop_front()
    }

    async fn metadata(&mut self) -> Result<Vec<u8>, AgentError> {
        self.handle.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if self.stalled {
            std::future::pending::<()>().await;
        }
        match self.metadata_error.take() {
            Some(err) => Err(err),
            None => Ok(self.metadata.clone()),
        }
    }

    fn err(&mut self) -> Option<AgentError> {
        if self.rows.is_empty() || self.closed {
            self.deferred_error.take()
        } else {
            None
        }
    }

    async fn close(&mut self) -> Result<(), AgentError> {
        self.handle.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed = true;
        match self.close_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

enum MockResponse {
    Stream(MockRowStream),
    Error(AgentError),
    Stall,
}

/// Agent returning queued responses in order; an empty queue yields an
/// empty stream
#[derive(Default)]
pub struct MockAgent {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<AgentQueryOptions>>,
    closed: AtomicBool,
}

impl MockAgent {
    /// Agent with an empty response queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful dispatch
    pub fn push_stream(&self, stream: MockRowStream) -> &Self {
        lock(&self.responses).push_back(MockResponse::Stream(stream));
        self
    }

    /// Queue a failed dispatch
    pub fn push_error(&self, err: impl Into<AgentError>) -> &Self {
        lock(&self.responses).push_back(MockResponse::Error(err.into()));
        self
    }

    /// Next dispatch never completes on its own
    pub fn push_stall(&self) -> &Self {
        lock(&self.responses).push_back(MockResponse::Stall);
        self
    }

    /// Every dispatched request, oldest first
    pub fn requests(&self) -> Vec<AgentQueryOptions> {
        lock(&self.requests).clone()
    }

    /// Most recent dispatched request
    pub fn last_request(&self) -> Option<AgentQueryOptions> {
        lock(&self.requests).last().cloned()
    }

    /// Whether [`ColumnarAgent::close`] was called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ColumnarAgent for MockAgent {
    async fn query(
        &self,
        _ctx: &RequestContext,
        options: AgentQueryOptions,
    ) -> Result<Box<dyn AgentRowStream>, AgentError> {
        lock(&self.requests).push(options);
        let response = lock(&self.responses).pop_front();
        match response {
            Some(MockResponse::Stream(stream)) => Ok(Box::new(stream)),
            Some(MockResponse::Error(err)) => Err(err),
            Some(MockResponse::Stall) => {
                std::future::pending::<()>().await;
                Ok(Box::new(MockRowStream::new(vec![])))
            }
            None => Ok(Box::new(MockRowStream::new(vec![]))),
        }
    }

    async fn close(&self) -> Result<(), AgentError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
