//! Duration text codec
//!
//! The analytics service parses timeouts and reports metrics using the Go
//! `time.Duration` text format (`"7s"`, `"1m30s"`, `"12.5ms"`). This module
//! renders and parses that format so the wire payload and the metadata
//! envelope agree with the server.

use std::time::Duration;
use thiserror::Error;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;
const NANOS_PER_MIN: u128 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MIN;

/// Fraction digits beyond this are below nanosecond precision for every unit
const MAX_FRACTION_DIGITS: usize = 18;

/// Error returned when a duration string cannot be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationParseError {
    /// Input is empty or not a sequence of number+unit pairs
    #[error("invalid duration {0:?}")]
    Invalid(String),

    /// Negative durations are not meaningful as timeouts
    #[error("negative duration {0:?}")]
    Negative(String),

    /// A number was not followed by a unit
    #[error("missing unit in duration {0:?}")]
    MissingUnit(String),

    /// A unit suffix was not recognized
    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit {
        /// The unrecognized suffix
        unit: String,
        /// The full input
        input: String,
    },

    /// The value does not fit in a `Duration`
    #[error("duration {0:?} overflows")]
    Overflow(String),
}

/// Render a duration in Go `time.Duration` text form.
///
/// Sub-second values use the largest of `ns`, `µs`, `ms` that keeps the
/// integer part non-zero; larger values use `h`/`m`/`s` components with the
/// leading zero components omitted (`7s`, `1m0s`, `1h0m0s`).
pub fn format_go_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }

    if nanos < NANOS_PER_SEC {
        let (unit, scale) = if nanos < NANOS_PER_MICRO {
            ("ns", 1)
        } else if nanos < NANOS_PER_MILLI {
            ("µs", NANOS_PER_MICRO)
        } else {
            ("ms", NANOS_PER_MILLI)
        };
        return format!("{}{}", fixed_point(nanos, scale), unit);
    }

    let secs = duration.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = fixed_point(
        u128::from(secs % 60) * NANOS_PER_SEC + u128::from(duration.subsec_nanos()),
        NANOS_PER_SEC,
    );

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// `value / scale` as a decimal with trailing zeros trimmed
fn fixed_point(value: u128, scale: u128) -> String {
    let whole = value / scale;
    let frac = value % scale;
    if frac == 0 {
        return whole.to_string();
    }

    let width = scale.to_string().len() - 1;
    let digits = format!("{frac:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Parse a Go-style duration string such as `"300ms"`, `"1.5h"` or `"2h45m"`.
///
/// Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`. A bare `"0"`
/// is accepted; negative values are rejected.
pub fn parse_go_duration(input: &str) -> Result<Duration, DurationParseError> {
    let trimmed = input.trim();
    if trimmed == "0" || trimmed == "+0" {
        return Ok(Duration::ZERO);
    }
    if trimmed.starts_with('-') {
        return Err(DurationParseError::Negative(input.to_string()));
    }

    let mut rest = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if rest.is_empty() {
        return Err(DurationParseError::Invalid(input.to_string()));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let whole_len = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let whole_digits = &rest[..whole_len];
        rest = &rest[whole_len..];

        let mut frac_digits = "";
        if let Some(after_dot) = rest.strip_prefix('.') {
            let frac_len = after_dot
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after_dot.len());
            frac_digits = &after_dot[..frac_len];
            rest = &after_dot[frac_len..];
        }

        if whole_digits.is_empty() && frac_digits.is_empty() {
            return Err(DurationParseError::Invalid(input.to_string()));
        }

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let scale = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => NANOS_PER_MICRO,
            "ms" => NANOS_PER_MILLI,
            "s" => NANOS_PER_SEC,
            "m" => NANOS_PER_MIN,
            "h" => NANOS_PER_HOUR,
            "" => return Err(DurationParseError::MissingUnit(input.to_string())),
            other => {
                return Err(DurationParseError::UnknownUnit {
                    unit: other.to_string(),
                    input: input.to_string(),
                })
            }
        };

        let overflow = || DurationParseError::Overflow(input.to_string());

        let whole: u128 = if whole_digits.is_empty() {
            0
        } else {
            whole_digits.parse().map_err(|_| overflow())?
        };
        let mut component = whole.checked_mul(scale).ok_or_else(overflow)?;

        if !frac_digits.is_empty() {
            let digits = &frac_digits[..frac_digits.len().min(MAX_FRACTION_DIGITS)];
            let frac: u128 = digits
                .parse()
                .map_err(|_| DurationParseError::Invalid(input.to_string()))?;
            let denom = 10u128.pow(digits.len() as u32);
            component = component
                .checked_add(frac * scale / denom)
                .ok_or_else(overflow)?;
        }

        total = total.checked_add(component).ok_or_else(overflow)?;
    }

    let secs = u64::try_from(total / NANOS_PER_SEC)
        .map_err(|_| DurationParseError::Overflow(input.to_string()))?;
    Ok(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}

/// Serde adapter for `Option<Duration>` fields stored as Go duration text
pub mod serde_opt {
    use super::{format_go_duration, parse_go_duration};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serialize an optional duration as Go duration text
    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_str(&format_go_duration(*d)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional duration from Go duration text
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| parse_go_duration(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
