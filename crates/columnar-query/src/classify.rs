//! Error classification
//!
//! Turns an [`AgentError`] into exactly one caller-facing [`Error`]. Checks run
//! top to bottom and the first match wins:
//!
//! 1. No columnar structure: pass the error through unchanged.
//! 2. HTTP 401 or an authentication failure: `InvalidCredential`.
//! 3. Server descriptors present: pick the first non-retriable descriptor
//!    (or the first one if all are retriable) and classify by its code. Codes
//!    other than the credential/timeout codes become a [`QueryError`], with a
//!    transport timeout, cancellation or expired deadline kept as its cause.
//! 4. Otherwise classify by the transport's inner error.

use crate::agent::{AgentError, ColumnarAgentError, InnerError};
use crate::context::ContextError;
use crate::error::{ColumnarError, ColumnarErrorDesc, Error, ErrorCause, QueryError};
use tracing::debug;

/// Server code for an authentication denial reported inside the error list
pub const AUTH_DENIED_CODE: u32 = 20000;

/// Server code for a server-side request timeout
pub const SERVER_TIMEOUT_CODE: u32 = 21002;

const NOT_SENT_TIMEOUT: &str = "operation not sent to server, as timeout would be exceeded";
const NOT_SENT_CANCELED: &str = "operation not sent to server, as context was cancelled";
const NOT_SENT_DEADLINE: &str =
    "operation not sent to server, as context deadline would be exceeded";

/// Classify a transport error into the caller-facing taxonomy
pub fn classify(err: AgentError) -> Error {
    let err = match err {
        AgentError::Columnar(err) => err,
        AgentError::Other(other) => return Error::Transport(other),
    };

    let classified = classify_columnar(&err);
    debug!(
        cause = ?classified.cause(),
        status = ?err.http_status,
        descriptors = err.errors.len(),
        "Classified columnar error"
    );
    classified
}

/// Classify a context that fired while this crate was waiting on the transport
pub(crate) fn classify_context(err: ContextError, statement: &str) -> Error {
    let inner = match err {
        ContextError::Canceled => InnerError::Canceled,
        ContextError::DeadlineExceeded => InnerError::DeadlineExceeded,
    };
    classify(ColumnarAgentError::new(inner).with_statement(statement).into())
}

/// First non-retriable descriptor, else the first descriptor
pub fn select_descriptor(descs: &[ColumnarErrorDesc]) -> Option<&ColumnarErrorDesc> {
    descs.iter().find(|d| !d.retriable).or_else(|| descs.first())
}

fn classify_columnar(err: &ColumnarAgentError) -> Error {
    let base = |cause: ErrorCause| {
        ColumnarError::new(
            err.statement.clone(),
            err.endpoint.clone(),
            err.http_status,
            cause,
        )
    };

    if err.http_status == Some(401) || err.inner == InnerError::AuthenticationFailure {
        return base(ErrorCause::InvalidCredential)
            .with_message(err.inner.to_string())
            .into();
    }

    let descs: Vec<ColumnarErrorDesc> = err
        .errors
        .iter()
        .map(|d| ColumnarErrorDesc {
            code: d.code,
            message: d.message.clone(),
            retriable: d.retry,
        })
        .collect();

    if let Some(chosen) = select_descriptor(&descs) {
        let (code, message) = (chosen.code, chosen.message.clone());

        match code {
            AUTH_DENIED_CODE => {
                return base(ErrorCause::InvalidCredential)
                    .with_errors(descs)
                    .into();
            }
            SERVER_TIMEOUT_CODE => {
                return base(ErrorCause::Timeout).with_errors(descs).into();
            }
            _ => {}
        }

        let mut query_err =
            QueryError::new(code, message, base(ErrorCause::Query).with_errors(descs));
        if let Some(cause) = transport_cause(&err.inner) {
            query_err.columnar_mut().set_cause(cause);
        }
        return query_err.into();
    }

    let mut base_err =
        base(ErrorCause::Unknown(err.to_string())).with_message(err.inner.to_string());
    match &err.inner {
        InnerError::Timeout => {
            base_err.set_cause(ErrorCause::Timeout);
            if err.was_not_dispatched {
                base_err.set_message(NOT_SENT_TIMEOUT);
            }
        }
        InnerError::Canceled => {
            base_err.set_cause(ErrorCause::Canceled);
            if err.was_not_dispatched {
                base_err.set_message(NOT_SENT_CANCELED);
            }
        }
        InnerError::DeadlineExceeded => {
            base_err.set_cause(ErrorCause::DeadlineExceeded);
            if err.was_not_dispatched {
                base_err.set_message(NOT_SENT_DEADLINE);
            }
        }
        InnerError::AuthenticationFailure => base_err.set_cause(ErrorCause::InvalidCredential),
        InnerError::Other(_) => {}
    }
    base_err.into()
}

/// Transport-level cause worth keeping on a descriptor-identified error
fn transport_cause(inner: &InnerError) -> Option<ErrorCause> {
    match inner {
        InnerError::Timeout => Some(ErrorCause::Timeout),
        InnerError::Canceled => Some(ErrorCause::Canceled),
        InnerError::DeadlineExceeded => Some(ErrorCause::DeadlineExceeded),
        _ => None,
    }
}
