//! # Columnar Configuration Library
//!
//! Configuration values shared by the columnar query client: timeout
//! options and their defaults, connection-string overrides, the
//! database/scope namespace, and the duration text format the analytics
//! service expects on the wire.
//!
//! ## Quick Start
//!
//! ```rust
//! use columnar_config::{ClusterOptions, TimeoutOptions};
//! use std::time::Duration;
//!
//! let options = ClusterOptions::new()
//!     .with_timeouts(TimeoutOptions::new().with_query_timeout(Duration::from_secs(30)));
//! let timeouts = options.resolve().unwrap();
//! assert_eq!(timeouts.query_timeout, Duration::from_secs(30));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod duration;
mod error;
mod namespace;
mod options;

pub use duration::{format_go_duration, parse_go_duration, DurationParseError};
pub use error::{ConfigError, ConfigResult};
pub use namespace::Namespace;
pub use options::*;
