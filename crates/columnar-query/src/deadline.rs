//! Deadline resolution for the wire `timeout` field

use crate::context::RequestContext;
use columnar_config::format_go_duration;
use std::time::Duration;
use tokio::time::Instant;

/// Added to the caller's remaining time so the server-side timeout fires
/// after the transport's own request timeout, which then reports a
/// request-scoped timeout instead of a bare cancellation.
pub const DEADLINE_MARGIN: Duration = Duration::from_secs(5);

/// Effective server timeout for a request.
///
/// With a deadline: time remaining until it plus [`DEADLINE_MARGIN`]
/// (a deadline already in the past counts as zero remaining). Without one:
/// `default_timeout`.
pub fn resolve_timeout(ctx: &RequestContext, default_timeout: Duration) -> Duration {
    match ctx.deadline() {
        Some(deadline) => deadline.saturating_duration_since(Instant::now()) + DEADLINE_MARGIN,
        None => default_timeout,
    }
}

/// [`resolve_timeout`] rendered as the duration string the server parses
pub fn resolve_timeout_string(ctx: &RequestContext, default_timeout: Duration) -> String {
    format_go_duration(resolve_timeout(ctx, default_timeout))
}
