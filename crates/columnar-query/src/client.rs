//! Query client
//!
//! Composition root for a single request: resolve the timeout, build the
//! payload, stamp the namespace and correlation id, dispatch through the
//! agent and wrap the returned stream. Holds only read-only configuration,
//! so one client can serve any number of concurrent queries.

use crate::agent::{AgentQueryOptions, ColumnarAgent, ColumnarAgentError, InnerError};
use crate::classify::{classify, classify_context};
use crate::context::{ContextError, RequestContext};
use crate::deadline::resolve_timeout_string;
use crate::error::{Error, Result};
use crate::options::QueryOptions;
use crate::payload::{build_payload, fields, priority_hint};
use crate::reader::RowReader;
use crate::result::QueryResult;
use crate::unmarshal::{JsonUnmarshaler, Unmarshaler};
use columnar_config::Namespace;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use uuid::Uuid;

/// Issues queries against one agent
#[derive(Clone)]
pub struct QueryClient {
    agent: Arc<dyn ColumnarAgent>,
    default_query_timeout: Duration,
    default_unmarshaler: Arc<dyn Unmarshaler>,
    namespace: Option<Namespace>,
}

impl QueryClient {
    /// Client with the JSON unmarshaler and no namespace.
    ///
    /// Fails with `InvalidArgument` (`QueryTimeout`) when
    /// `default_query_timeout` is zero.
    pub fn new(agent: Arc<dyn ColumnarAgent>, default_query_timeout: Duration) -> Result<Self> {
        if default_query_timeout.is_zero() {
            return Err(Error::invalid_argument("QueryTimeout", "must be greater than 0"));
        }
        Ok(Self {
            agent,
            default_query_timeout,
            default_unmarshaler: Arc::new(JsonUnmarshaler),
            namespace: None,
        })
    }

    /// Replace the default row unmarshaler
    pub fn with_unmarshaler(mut self, unmarshaler: Arc<dyn Unmarshaler>) -> Self {
        self.default_unmarshaler = unmarshaler;
        self
    }

    /// Scope every query to `namespace` via `query_context`
    pub fn with_namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = Some(namespace);
        self
    }

    /// Namespace applied to every query, if any
    pub fn namespace(&self) -> Option<&Namespace> {
        self.namespace.as_ref()
    }

    /// Timeout used when the context has no deadline
    pub fn default_query_timeout(&self) -> Duration {
        self.default_query_timeout
    }

    pub(crate) fn agent(&self) -> &Arc<dyn ColumnarAgent> {
        &self.agent
    }

    /// Execute `statement` and return its streaming result.
    ///
    /// Option validation failures are returned before anything is sent.
    /// Dispatch failures, and a context that fires while dispatch is in
    /// flight, come back classified.
    pub async fn query(
        &self,
        ctx: &RequestContext,
        statement: &str,
        options: QueryOptions,
    ) -> Result<QueryResult> {
        let timeout = resolve_timeout_string(ctx, self.default_query_timeout);
        let mut payload = build_payload(statement, &options, &timeout)?;

        if let Some(namespace) = &self.namespace {
            payload.insert(
                fields::QUERY_CONTEXT.to_string(),
                Value::from(namespace.query_context()),
            );
        }

        let client_context_id = Uuid::new_v4().to_string();
        payload.insert(
            fields::CLIENT_CONTEXT_ID.to_string(),
            Value::from(client_context_id.as_str()),
        );

        let priority = priority_hint(&options);
        debug!(
            client_context_id = %client_context_id,
            timeout = %timeout,
            prioritized = priority.is_some(),
            "Dispatching analytics query"
        );
        trace!(statement, "Analytics statement");

        if let Some(done) = ctx.err() {
            return Err(not_dispatched(done, statement));
        }

        let dispatched = tokio::select! {
            biased;
            done = ctx.done() => Err(classify_context(done, statement)),
            res = self.agent.query(ctx, AgentQueryOptions { payload, priority }) => {
                res.map_err(classify)
            }
        };
        let stream = dispatched?;

        let unmarshaler = options
            .unmarshaler
            .unwrap_or_else(|| Arc::clone(&self.default_unmarshaler));
        Ok(QueryResult::new(
            RowReader::new(stream, ctx.clone(), statement),
            unmarshaler,
        ))
    }
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("default_query_timeout", &self.default_query_timeout)
            .field("default_unmarshaler", &self.default_unmarshaler)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// A context that had already fired before dispatch
fn not_dispatched(done: ContextError, statement: &str) -> Error {
    let inner = match done {
        ContextError::Canceled => InnerError::Canceled,
        ContextError::DeadlineExceeded => InnerError::DeadlineExceeded,
    };
    classify(
        ColumnarAgentError::new(inner)
            .with_statement(statement)
            .not_dispatched()
            .into(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentErrorDesc;
    use crate::mock::{MockAgent, MockRowStream};
    use crate::options::ScanConsistency;
    use serde_json::json;
    use tracing_test::traced_test;

    const STATEMENT: &str = "SELECT 1";

    fn client(agent: &Arc<MockAgent>) -> QueryClient {
        QueryClient::new(agent.clone(), Duration::from_secs(600)).unwrap()
    }

    #[derive(Debug)]
    struct ConstUnmarshaler;

    impl Unmarshaler for ConstUnmarshaler {
        fn unmarshal(&self, _data: &[u8]) -> Result<Value> {
            Ok(json!("constant"))
        }
    }

    #[tokio::test]
    async fn test_payload_carries_statement_timeout_and_id() {
        let agent = Arc::new(MockAgent::new());
        let mut res = client(&agent)
            .query(&RequestContext::new(), STATEMENT, QueryOptions::new())
            .await
            .unwrap();
        res.close().await.unwrap();

        let request = agent.last_request().unwrap();
        assert_eq!(request.payload[fields::STATEMENT], json!(STATEMENT));
        assert_eq!(request.payload[fields::TIMEOUT], json!("10m0s"));
        assert!(!request.payload.contains_key(fields::QUERY_CONTEXT));
        assert_eq!(request.priority, None);

        let id = request.payload[fields::CLIENT_CONTEXT_ID].as_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[test]
    fn test_zero_default_timeout_rejected() {
        let agent = Arc::new(MockAgent::new());
        let err = QueryClient::new(agent, Duration::ZERO).unwrap_err();
        match err {
            Error::InvalidArgument { argument, reason } => {
                assert_eq!(argument, "QueryTimeout");
                assert_eq!(reason, "must be greater than 0");
            }
            other => panic!("expected invalid argument, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_each_request_gets_fresh_context_id() {
        let agent = Arc::new(MockAgent::new());
        let client = client(&agent);
        for _ in 0..2 {
            client
                .query(&RequestContext::new(), STATEMENT, QueryOptions::new())
                .await
                .unwrap();
        }
        let requests = agent.requests();
        assert_ne!(
            requests[0].payload[fields::CLIENT_CONTEXT_ID],
            requests[1].payload[fields::CLIENT_CONTEXT_ID]
        );
    }

    #[tokio::test]
    async fn test_namespace_sets_query_context() {
        let agent = Arc::new(MockAgent::new());
        client(&agent)
            .with_namespace(Namespace::new("travel", "inventory"))
            .query(&RequestContext::new(), STATEMENT, QueryOptions::new())
            .await
            .unwrap();

        let request = agent.last_request().unwrap();
        assert_eq!(
            request.payload[fields::QUERY_CONTEXT],
            json!("default:`travel`.`inventory`")
        );
    }

    #[tokio::test]
    async fn test_raw_cannot_override_protected_fields() {
        let agent = Arc::new(MockAgent::new());
        client(&agent)
            .with_namespace(Namespace::new("db", "sc"))
            .query(
                &RequestContext::new(),
                STATEMENT,
                QueryOptions::new()
                    .raw(fields::CLIENT_CONTEXT_ID, "mine")
                    .raw(fields::QUERY_CONTEXT, "default:`x`.`y`"),
            )
            .await
            .unwrap();

        let request = agent.last_request().unwrap();
        assert_ne!(request.payload[fields::CLIENT_CONTEXT_ID], json!("mine"));
        assert_eq!(request.payload[fields::QUERY_CONTEXT], json!("default:`db`.`sc`"));
    }

    #[tokio::test]
    async fn test_priority_hint_forwarded() {
        let agent = Arc::new(MockAgent::new());
        client(&agent)
            .query(&RequestContext::new(), STATEMENT, QueryOptions::new().priority(true))
            .await
            .unwrap();
        assert_eq!(agent.last_request().unwrap().priority, Some(-1));
    }

    #[tokio::test]
    async fn test_invalid_option_never_dispatched() {
        let agent = Arc::new(MockAgent::new());
        let err = client(&agent)
            .query(
                &RequestContext::new(),
                STATEMENT,
                QueryOptions::new().scan_consistency(ScanConsistency::from(9u8)),
            )
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(agent.requests().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_error_is_classified() {
        let agent = Arc::new(MockAgent::new());
        agent.push_error(
            ColumnarAgentError::new(InnerError::Other("server error".into()))
                .with_statement(STATEMENT)
                .with_endpoint("10.0.0.1:8095")
                .with_http_status(400)
                .with_errors(vec![AgentErrorDesc::new(24000, "Syntax error", false)]),
        );

        let err = client(&agent)
            .query(&RequestContext::new(), STATEMENT, QueryOptions::new())
            .await
            .unwrap_err();
        match &err {
            Error::Query(q) => assert_eq!(q.code(), 24000),
            other => panic!("expected query error, got {other:?}"),
        }
        assert_eq!(err.endpoint(), Some("10.0.0.1:8095"));
        assert_eq!(err.status_code(), Some(400));
    }

    #[tokio::test]
    async fn test_opaque_dispatch_error_passes_through() {
        let agent = Arc::new(MockAgent::new());
        agent.push_error(anyhow::anyhow!("connection refused"));
        let err = client(&agent)
            .query(&RequestContext::new(), STATEMENT, QueryOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(err.to_string(), "connection refused");
    }

    #[tokio::test]
    async fn test_cancelled_context_is_not_dispatched() {
        let agent = Arc::new(MockAgent::new());
        let ctx = RequestContext::new();
        ctx.cancel();

        let err = client(&agent)
            .query(&ctx, STATEMENT, QueryOptions::new())
            .await
            .unwrap_err();
        assert!(err.is_canceled());
        assert!(err.to_string().contains("not sent to server"));
        assert!(agent.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_unblocks_stalled_dispatch() {
        let agent = Arc::new(MockAgent::new());
        agent.push_stall();
        let ctx = RequestContext::new().with_timeout(Duration::from_secs(2));

        let err = client(&agent)
            .query(&ctx, STATEMENT, QueryOptions::new())
            .await
            .unwrap_err();
        assert!(err.is_deadline_exceeded());
        assert_eq!(err.statement(), Some(STATEMENT));
        assert_eq!(agent.last_request().unwrap().payload[fields::TIMEOUT], json!("7s"));
    }

    #[tokio::test]
    async fn test_request_unmarshaler_overrides_default() {
        let agent = Arc::new(MockAgent::new());
        agent.push_stream(MockRowStream::from_json(&[json!({"a": 1})]));
        agent.push_stream(MockRowStream::from_json(&[json!({"a": 1})]));
        let client = client(&agent);

        let mut res = client
            .query(&RequestContext::new(), STATEMENT, QueryOptions::new())
            .await
            .unwrap();
        let row: Value = res.next_row().await.unwrap().content_as().unwrap();
        assert_eq!(row, json!({"a": 1}));

        let mut res = client
            .query(
                &RequestContext::new(),
                STATEMENT,
                QueryOptions::new().unmarshaler(Arc::new(ConstUnmarshaler)),
            )
            .await
            .unwrap();
        let row: Value = res.next_row().await.unwrap().content_as().unwrap();
        assert_eq!(row, json!("constant"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_dispatch_logs_correlation_id() {
        let agent = Arc::new(MockAgent::new());
        client(&agent)
            .query(&RequestContext::new(), STATEMENT, QueryOptions::new())
            .await
            .unwrap();
        assert!(logs_contain("Dispatching analytics query"));
        assert!(logs_contain("client_context_id"));
    }
}
