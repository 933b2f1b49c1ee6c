//! Error types for columnar queries
//!
//! Every failure a caller sees is one [`Error`]. Transport failures are
//! translated exactly once by [`crate::classify`] into either a
//! [`ColumnarError`] or a [`QueryError`], each tagged with one
//! [`ErrorCause`].

use columnar_config::ConfigError;
use std::fmt;
use thiserror::Error;

/// Result type alias for columnar query operations
pub type Result<T> = std::result::Result<T, Error>;

/// The classified reason behind a columnar failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCause {
    /// Authentication failed
    InvalidCredential,
    /// The transport timed out
    Timeout,
    /// The caller canceled
    Canceled,
    /// The caller deadline passed
    DeadlineExceeded,
    /// The server rejected the statement
    Query,
    /// Nothing more specific matched; carries the original message
    Unknown(String),
}

impl fmt::Display for ErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredential => f.write_str("invalid credential"),
            Self::Timeout => f.write_str("timeout"),
            Self::Canceled => f.write_str("context canceled"),
            Self::DeadlineExceeded => f.write_str("context deadline exceeded"),
            Self::Query => f.write_str("query error"),
            Self::Unknown(msg) => f.write_str(msg),
        }
    }
}

/// One server-reported `{code, message, retry}` unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnarErrorDesc {
    /// Server error code
    pub code: u32,
    /// Server message
    pub message: String,
    /// Whether the server considers the failure retriable
    pub retriable: bool,
}

/// A classified transport failure with its request context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnarError {
    statement: String,
    endpoint: String,
    status_code: Option<u16>,
    message: String,
    errors: Vec<ColumnarErrorDesc>,
    cause: ErrorCause,
}

impl ColumnarError {
    pub(crate) fn new(
        statement: impl Into<String>,
        endpoint: impl Into<String>,
        status_code: Option<u16>,
        cause: ErrorCause,
    ) -> Self {
        Self {
            statement: statement.into(),
            endpoint: endpoint.into(),
            status_code,
            message: String::new(),
            errors: Vec::new(),
            cause,
        }
    }

    pub(crate) fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub(crate) fn with_errors(mut self, errors: Vec<ColumnarErrorDesc>) -> Self {
        self.errors = errors;
        self
    }

    pub(crate) fn set_cause(&mut self, cause: ErrorCause) {
        self.cause = cause;
    }

    pub(crate) fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    /// Statement that failed
    pub fn statement(&self) -> &str {
        &self.statement
    }

    /// Node that handled the request
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// HTTP status of the failed response, when one was received
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Transport message, or the override applied during classification
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Every descriptor the server reported, in server order
    pub fn errors(&self) -> &[ColumnarErrorDesc] {
        &self.errors
    }

    /// Classified cause
    pub fn cause(&self) -> &ErrorCause {
        &self.cause
    }

    fn fmt_context(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            " | statement: {:?}, endpoint: {:?}",
            self.statement, self.endpoint
        )?;
        if let Some(code) = self.status_code {
            write!(f, ", status: {code}")?;
        }
        if !self.errors.is_empty() {
            f.write_str(", errors: [")?;
            for (i, desc) in self.errors.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}: {}", desc.code, desc.message)?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

impl fmt::Display for ColumnarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cause = self.cause.to_string();
        f.write_str(&cause)?;
        if !self.message.is_empty() && self.message != cause {
            write!(f, ": {}", self.message)?;
        }
        self.fmt_context(f)
    }
}

impl std::error::Error for ColumnarError {}

/// The server rejected a statement.
///
/// `code`/`message` identify the chosen descriptor. The embedded
/// [`ColumnarError`] keeps the full descriptor list and a cause that is
/// [`ErrorCause::Query`] unless the transport also reported a timeout,
/// cancellation or expired deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryError {
    code: u32,
    message: String,
    columnar: ColumnarError,
}

impl QueryError {
    pub(crate) fn new(code: u32, message: impl Into<String>, columnar: ColumnarError) -> Self {
        Self {
            code,
            message: message.into(),
            columnar,
        }
    }

    /// Server error code of the selected descriptor
    pub fn code(&self) -> u32 {
        self.code
    }

    /// Server message of the selected descriptor
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Request context and cause shared with [`ColumnarError`]
    pub fn columnar(&self) -> &ColumnarError {
        &self.columnar
    }

    pub(crate) fn columnar_mut(&mut self) -> &mut ColumnarError {
        &mut self.columnar
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query error {}: {}", self.code, self.message)?;
        if self.columnar.cause != ErrorCause::Query {
            write!(f, " (cause: {})", self.columnar.cause)?;
        }
        self.columnar.fmt_context(f)
    }
}

impl std::error::Error for QueryError {}

/// Errors surfaced to callers of the query client
#[derive(Error, Debug)]
pub enum Error {
    /// A caller-supplied option was malformed; never sent to the transport
    #[error("invalid argument {argument}: {reason}")]
    InvalidArgument {
        /// Name of the offending option
        argument: String,
        /// What was wrong with it
        reason: String,
    },

    /// A classified transport failure with no server-selected descriptor
    #[error(transparent)]
    Columnar(ColumnarError),

    /// The server rejected the statement
    #[error(transparent)]
    Query(QueryError),

    /// The metadata envelope was not valid JSON of the expected shape
    #[error("failed to unmarshal metadata: {0}")]
    MetadataParse(#[source] serde_json::Error),

    /// A row could not be decoded into the requested type
    #[error("failed to unmarshal row: {0}")]
    Unmarshal(String),

    /// A transport failure without columnar structure, passed through as-is
    #[error(transparent)]
    Transport(anyhow::Error),
}

impl Error {
    /// Build an [`Error::InvalidArgument`]
    pub fn invalid_argument<A: Into<String>, R: Into<String>>(argument: A, reason: R) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            reason: reason.into(),
        }
    }

    /// Classified cause, for columnar and query errors
    pub fn cause(&self) -> Option<&ErrorCause> {
        self.columnar().map(ColumnarError::cause)
    }

    /// Request context shared by columnar and query errors
    pub fn columnar(&self) -> Option<&ColumnarError> {
        match self {
            Self::Columnar(e) => Some(e),
            Self::Query(e) => Some(e.columnar()),
            _ => None,
        }
    }

    /// Statement that failed, for columnar and query errors
    pub fn statement(&self) -> Option<&str> {
        self.columnar().map(ColumnarError::statement)
    }

    /// Node that handled the failed request
    pub fn endpoint(&self) -> Option<&str> {
        self.columnar().map(ColumnarError::endpoint)
    }

    /// HTTP status of the failed response
    pub fn status_code(&self) -> Option<u16> {
        self.columnar().and_then(ColumnarError::status_code)
    }

    /// Server-reported descriptors; empty for errors without request context
    pub fn descriptors(&self) -> &[ColumnarErrorDesc] {
        self.columnar().map(ColumnarError::errors).unwrap_or_default()
    }

    /// True when a caller option was rejected before dispatch
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    /// Cause is [`ErrorCause::InvalidCredential`]
    pub fn is_invalid_credential(&self) -> bool {
        self.cause() == Some(&ErrorCause::InvalidCredential)
    }

    /// Cause is [`ErrorCause::Timeout`]
    pub fn is_timeout(&self) -> bool {
        self.cause() == Some(&ErrorCause::Timeout)
    }

    /// Cause is [`ErrorCause::Canceled`]
    pub fn is_canceled(&self) -> bool {
        self.cause() == Some(&ErrorCause::Canceled)
    }

    /// Cause is [`ErrorCause::DeadlineExceeded`]
    pub fn is_deadline_exceeded(&self) -> bool {
        self.cause() == Some(&ErrorCause::DeadlineExceeded)
    }

    /// True for any server-rejected statement, regardless of the transport cause
    pub fn is_query_error(&self) -> bool {
        matches!(self, Self::Query(_))
    }

    /// Cause is [`ErrorCause::Unknown`]
    pub fn is_unknown(&self) -> bool {
        matches!(self.cause(), Some(ErrorCause::Unknown(_)))
    }
}

impl From<ColumnarError> for Error {
    fn from(err: ColumnarError) -> Self {
        Self::Columnar(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Self::Query(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::InvalidArgument { argument, reason } => {
                Self::InvalidArgument { argument, reason }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(code: u32, message: &str) -> ColumnarErrorDesc {
        ColumnarErrorDesc {
            code,
            message: message.to_string(),
            retriable: false,
        }
    }

    #[test]
    fn test_columnar_error_display_includes_context() {
        let err = ColumnarError::new(
            "SELECT 1",
            "10.0.0.1:18095",
            Some(401),
            ErrorCause::InvalidCredential,
        )
        .with_message("authentication failure");
        assert_eq!(
            err.to_string(),
            concat!(
                "invalid credential: authentication failure | ",
                "statement: \"SELECT 1\", endpoint: \"10.0.0.1:18095\", status: 401"
            )
        );
    }

    #[test]
    fn test_unknown_cause_message_not_repeated() {
        let err = ColumnarError::new("", "", None, ErrorCause::Unknown("socket closed".into()))
            .with_message("socket closed");
        assert!(err.to_string().starts_with("socket closed | "));
    }

    #[test]
    fn test_query_error_display_mentions_transport_cause() {
        let mut columnar = ColumnarError::new("SELECT", "ep", Some(500), ErrorCause::Query)
            .with_errors(vec![desc(24045, "Cannot find dataset")]);
        let plain = QueryError::new(24045, "Cannot find dataset", columnar.clone());
        assert!(plain.to_string().starts_with("query error 24045: Cannot find dataset | "));
        assert!(plain.to_string().ends_with("errors: [24045: Cannot find dataset]"));

        columnar.set_cause(ErrorCause::Timeout);
        let timed_out = QueryError::new(24045, "Cannot find dataset", columnar);
        assert!(timed_out.to_string().contains("(cause: timeout)"));
    }

    #[test]
    fn test_accessors_on_query_error() {
        let columnar = ColumnarError::new("SELECT", "ep", Some(400), ErrorCause::Canceled)
            .with_errors(vec![desc(1, "a"), desc(2, "b")]);
        let err = Error::from(QueryError::new(2, "b", columnar));
        assert!(err.is_query_error());
        assert!(err.is_canceled());
        assert_eq!(err.status_code(), Some(400));
        assert_eq!(err.descriptors().len(), 2);
        assert_eq!(err.statement(), Some("SELECT"));
    }

    #[test]
    fn test_config_error_converts_to_invalid_argument() {
        let err = Error::from(ConfigError::invalid_argument(
            "QueryTimeout",
            "must be greater than 0",
        ));
        assert!(err.is_invalid_argument());
        assert_eq!(err.to_string(), "invalid argument QueryTimeout: must be greater than 0");
        assert!(err.cause().is_none());
        assert!(err.descriptors().is_empty());
    }
}
