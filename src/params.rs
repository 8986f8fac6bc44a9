//! Resolution of the per-request response shape.
//!
//! Every request carries up to three optional overrides (`length`, `unit`,
//! `time`). Anything missing or unparseable falls back to the process-wide
//! defaults, with length and time drawn at random from their configured
//! ranges.

use rand::Rng;

/// Process-wide bounds used when a request does not pin a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Upper bound (inclusive) for a randomly drawn length, in bytes.
    pub length_max: u64,
    /// Chunk size used when the request has no usable `unit`.
    pub unit_default: u64,
    /// Upper bound (inclusive) for a randomly drawn duration, in seconds.
    pub time_max: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            length_max: 10 * 1024 * 1024,
            unit_default: 1024,
            time_max: 600,
        }
    }
}

/// Raw override values as they arrived on the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub length: Option<String>,
    pub unit: Option<String>,
    pub time: Option<String>,
}

impl Overrides {
    /// Picks the recognised keys out of decoded query pairs. The first
    /// occurrence of a key wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut overrides = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "length" => &mut overrides.length,
                "unit" => &mut overrides.unit,
                "time" => &mut overrides.time,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        overrides
    }
}

/// The concrete triple that drives one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedParameters {
    /// Total body length in bytes. Passed through verbatim from the request.
    pub length: i64,
    /// Maximum bytes per chunk, always at least 1.
    pub unit: i64,
    /// Total response duration in seconds.
    pub duration: i64,
}

/// Lenient integer parse: absent, empty and malformed values all yield `None`.
pub fn parse_override(value: Option<&str>) -> Option<i64> {
    value.filter(|v| !v.is_empty()).and_then(|v| v.parse().ok())
}

/// Resolves the effective parameters for one request.
///
/// Overrides are used as given, with no clamping against the limits. The one
/// exception is `unit`, where a non-positive value is treated like a
/// malformed one so a chunk always has room for at least one byte.
pub fn resolve<R: Rng + ?Sized>(overrides: &Overrides, limits: &Limits, rng: &mut R) -> ResolvedParameters {
    let length = parse_override(overrides.length.as_deref()).unwrap_or_else(|| draw(rng, limits.length_max));
    let unit = parse_override(overrides.unit.as_deref())
        .filter(|unit| *unit >= 1)
        .unwrap_or_else(|| saturate(limits.unit_default.max(1)));
    let duration = parse_override(overrides.time.as_deref()).unwrap_or_else(|| draw(rng, limits.time_max));

    ResolvedParameters { length, unit, duration }
}

/// Uniform draw in `[1, max]`.
fn draw<R: Rng + ?Sized>(rng: &mut R, max: u64) -> i64 {
    rng.gen_range(1..=saturate(max.max(1)))
}

fn saturate(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn overrides(length: Option<&str>, unit: Option<&str>, time: Option<&str>) -> Overrides {
        Overrides {
            length: length.map(String::from),
            unit: unit.map(String::from),
            time: time.map(String::from),
        }
    }

    #[test]
    fn parse_override_is_lenient() {
        assert_eq!(parse_override(Some("42")), Some(42));
        assert_eq!(parse_override(Some("-3")), Some(-3));
        assert_eq!(parse_override(Some("+7")), Some(7));
        assert_eq!(parse_override(Some("0")), Some(0));
        assert_eq!(parse_override(Some("")), None);
        assert_eq!(parse_override(Some("abc")), None);
        assert_eq!(parse_override(Some("1.5")), None);
        assert_eq!(parse_override(Some(" 5")), None);
        assert_eq!(parse_override(None), None);
    }

    #[test]
    fn explicit_values_pass_through_unclamped() {
        let limits = Limits {
            length_max: 10,
            unit_default: 4,
            time_max: 5,
        };
        let mut rng = StdRng::seed_from_u64(1);

        let params = resolve(&overrides(Some("1000"), Some("3"), Some("60")), &limits, &mut rng);
        assert_eq!(
            params,
            ResolvedParameters {
                length: 1000,
                unit: 3,
                duration: 60
            }
        );

        let params = resolve(&overrides(Some("-5"), None, Some("0")), &limits, &mut rng);
        assert_eq!(params.length, -5);
        assert_eq!(params.unit, 4);
        assert_eq!(params.duration, 0);
    }

    #[test]
    fn missing_and_malformed_values_take_the_same_path() {
        let limits = Limits {
            length_max: 8,
            unit_default: 16,
            time_max: 3,
        };

        let absent = resolve(&Overrides::default(), &limits, &mut StdRng::seed_from_u64(9));
        let malformed = resolve(
            &overrides(Some("abc"), Some("x"), Some("")),
            &limits,
            &mut StdRng::seed_from_u64(9),
        );
        assert_eq!(absent, malformed);
        assert_eq!(absent.unit, 16);
    }

    #[test]
    fn random_draws_stay_in_range() {
        let limits = Limits {
            length_max: 5,
            unit_default: 1,
            time_max: 2,
        };
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let params = resolve(&Overrides::default(), &limits, &mut rng);
            assert!((1..=5).contains(&params.length), "length {}", params.length);
            assert!((1..=2).contains(&params.duration), "duration {}", params.duration);
        }
    }

    #[test]
    fn non_positive_unit_falls_back_to_default() {
        let limits = Limits::default();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(resolve(&overrides(None, Some("0"), None), &limits, &mut rng).unit, 1024);
        assert_eq!(resolve(&overrides(None, Some("-8"), None), &limits, &mut rng).unit, 1024);
    }

    #[test]
    fn first_query_occurrence_wins() {
        let overrides = Overrides::from_pairs([
            ("length", "10"),
            ("other", "x"),
            ("length", "20"),
            ("time", "2"),
        ]);
        assert_eq!(overrides.length.as_deref(), Some("10"));
        assert_eq!(overrides.unit, None);
        assert_eq!(overrides.time.as_deref(), Some("2"));
    }
}
