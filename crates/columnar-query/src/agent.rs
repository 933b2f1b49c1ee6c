//! Transport contract
//!
//! The agent performs the actual network I/O, connection pooling and retries.
//! This crate only builds what it sends and interprets what comes back, so the
//! agent is consumed through the [`ColumnarAgent`] and [`AgentRowStream`] traits.
//!
//! ## Implementations
//!
//! - `mock::MockAgent` (behind `test-utils`) - scripted responses for tests

use crate::context::RequestContext;
use crate::payload::Payload;
use async_trait::async_trait;
use thiserror::Error;

/// What the client hands to the agent for one query
#[derive(Debug, Clone, PartialEq)]
pub struct AgentQueryOptions {
    /// Wire payload, immutable once dispatched
    pub payload: Payload,
    /// Priority hint; `Some(-1)` marks a prioritized request
    pub priority: Option<i32>,
}

/// Dispatches queries to the analytics service
#[async_trait]
pub trait ColumnarAgent: Send + Sync {
    /// Send a query and return its streaming row source.
    ///
    /// Implementations must honor `ctx` cancellation and deadline.
    async fn query(
        &self,
        ctx: &RequestContext,
        options: AgentQueryOptions,
    ) -> Result<Box<dyn AgentRowStream>, AgentError>;

    /// Release agent resources
    async fn close(&self) -> Result<(), AgentError> {
        Ok(())
    }
}

/// Forward-only source of raw result rows
///
/// Single reader: calls are sequential from one owner, and `close` is never
/// concurrent with an in-flight read.
#[async_trait]
pub trait AgentRowStream: Send {
    /// Next row's raw bytes, `None` once exhausted
    async fn next_row(&mut self) -> Option<Vec<u8>>;

    /// Trailing metadata envelope; complete only after exhaustion
    async fn metadata(&mut self) -> Result<Vec<u8>, AgentError>;

    /// Take the deferred stream-level error, if any
    fn err(&mut self) -> Option<AgentError>;

    /// Release the stream; not guaranteed idempotent
    async fn close(&mut self) -> Result<(), AgentError>;
}

/// Error raised by the agent
#[derive(Debug, Error)]
pub enum AgentError {
    /// A failure carrying columnar request context
    #[error(transparent)]
    Columnar(#[from] ColumnarAgentError),

    /// Anything else; passes through classification untouched
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Low-level reason an agent request failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InnerError {
    /// The transport gave up on its own timer
    #[error("unambiguous timeout")]
    Timeout,
    /// The caller canceled the request
    #[error("context canceled")]
    Canceled,
    /// The caller deadline passed
    #[error("context deadline exceeded")]
    DeadlineExceeded,
    /// Credentials were rejected
    #[error("authentication failure")]
    AuthenticationFailure,
    /// Anything else, described by its message
    #[error("{0}")]
    Other(String),
}

/// One server-reported error unit as the agent sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentErrorDesc {
    /// Server error code
    pub code: u32,
    /// Server message
    pub message: String,
    /// Whether the server marked the failure retriable
    pub retry: bool,
}

impl AgentErrorDesc {
    /// Create a descriptor
    pub fn new(code: u32, message: impl Into<String>, retry: bool) -> Self {
        Self {
            code,
            message: message.into(),
            retry,
        }
    }
}

/// Failure of a columnar request with the context needed to classify it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{inner} (statement: {statement:?}, endpoint: {endpoint:?})")]
pub struct ColumnarAgentError {
    /// The underlying transport failure
    pub inner: InnerError,
    /// Statement that was being executed
    pub statement: String,
    /// Address of the node that handled the request
    pub endpoint: String,
    /// HTTP status of the response, if one was received
    pub http_status: Option<u16>,
    /// The request never left the client
    pub was_not_dispatched: bool,
    /// Server-reported descriptors, in server order
    pub errors: Vec<AgentErrorDesc>,
}

impl ColumnarAgentError {
    /// Wrap `inner` with empty request context
    pub fn new(inner: InnerError) -> Self {
        Self {
            inner,
            statement: String::new(),
            endpoint: String::new(),
            http_status: None,
            was_not_dispatched: false,
            errors: Vec::new(),
        }
    }

    /// Attach the statement
    pub fn with_statement(mut self, statement: impl Into<String>) -> Self {
        self.statement = statement.into();
        self
    }

    /// Attach the endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Attach the response status
    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Mark the request as never sent
    pub fn not_dispatched(mut self) -> Self {
        self.was_not_dispatched = true;
        self
    }

    /// Attach server descriptors
    pub fn with_errors(mut self, errors: Vec<AgentErrorDesc>) -> Self {
        self.errors = errors;
        self
    }
}
