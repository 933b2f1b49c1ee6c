//! Property-based tests for the duration text codec
//!
//! Whatever we render into a payload must parse back to the same value.

use columnar_config::{format_go_duration, parse_go_duration};
use proptest::prelude::*;
use std::time::Duration;

proptest! {
    /// Property: formatting then parsing any duration is lossless
    #[test]
    fn format_then_parse_is_lossless(secs in any::<u64>(), nanos in 0u32..1_000_000_000) {
        let duration = Duration::new(secs, nanos);
        prop_assert_eq!(parse_go_duration(&format_go_duration(duration)), Ok(duration));
    }

    /// Property: sub-second values (ns, µs, ms forms) survive the round trip
    #[test]
    fn sub_second_round_trip(nanos in 1u64..1_000_000_000) {
        let duration = Duration::from_nanos(nanos);
        let text = format_go_duration(duration);
        prop_assert!(["ns", "µs", "ms"].iter().any(|unit| text.ends_with(unit)));
        prop_assert_eq!(parse_go_duration(&text), Ok(duration));
    }

    /// Property: output is never empty and always ends in a unit
    #[test]
    fn output_always_has_unit(secs in 0u64..1_000_000, nanos in 0u32..1_000_000_000) {
        let text = format_go_duration(Duration::new(secs, nanos));
        prop_assert!(!text.is_empty());
        prop_assert!(text.ends_with('s'));
    }
}
