//! Lenient package version parsing and ordering
//!
//! WordPress core and plugin versions range from well-formed dotted numbers
//! to free-text strings like `trunk`. Comparisons must never fail, so every
//! string parses: dotted numeric versions order numerically and anything
//! else falls into a legacy tier below them.

use std::cmp::Ordering;
use std::fmt;

/// A version string under a total order.
///
/// Numeric versions compare segment-wise with zero padding, so `1.0` equals
/// `1.0.0` and `1.0 < 1.0.1 < 1.1 < 2.0`. A suffixed version sorts below the
/// same version without one (`7.0-alpha < 7.0`). Legacy strings without a
/// leading numeric segment sort below every numeric version and compare with
/// each other as plain strings.
#[derive(Debug, Clone)]
pub struct PackageVersion {
    raw: String,
    kind: Kind,
}

#[derive(Debug, Clone)]
enum Kind {
    /// Dotted numeric segments plus an optional pre-release suffix
    Release {
        parts: Vec<u64>,
        suffix: Option<String>,
    },
    /// Anything without a leading numeric segment
    Legacy(String),
}

impl PackageVersion {
    /// Parse a version string. Total: every input yields a value.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();

        // Split off any suffix like -alpha, -beta, rc1
        let pos = raw.find(|c: char| c == '-' || c.is_ascii_alphabetic());
        let (number_part, suffix) = match pos {
            Some(p) => (&raw[..p], Some(raw[p..].trim_start_matches('-').to_string())),
            None => (raw, None),
        };

        let parts: Vec<u64> = number_part
            .split('.')
            .filter_map(|p| p.parse().ok())
            .collect();

        let kind = if parts.is_empty() {
            Kind::Legacy(raw.to_string())
        } else {
            Kind::Release { parts, suffix }
        };

        Self {
            raw: raw.to_string(),
            kind,
        }
    }

    /// Whether the string had no leading numeric segment
    pub fn is_legacy(&self) -> bool {
        matches!(self.kind, Kind::Legacy(_))
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.kind, &other.kind) {
            (Kind::Legacy(a), Kind::Legacy(b)) => a.cmp(b),
            (Kind::Legacy(_), Kind::Release { .. }) => Ordering::Less,
            (Kind::Release { .. }, Kind::Legacy(_)) => Ordering::Greater,
            (
                Kind::Release {
                    parts: a,
                    suffix: sa,
                },
                Kind::Release {
                    parts: b,
                    suffix: sb,
                },
            ) => {
                let len = a.len().max(b.len());
                for i in 0..len {
                    let x = a.get(i).copied().unwrap_or(0);
                    let y = b.get(i).copied().unwrap_or(0);
                    match x.cmp(&y) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                }
                // A plain version is newer than its own pre-release
                match (sa, sb) {
                    (None, None) => Ordering::Equal,
                    (None, Some(_)) => Ordering::Greater,
                    (Some(_), None) => Ordering::Less,
                    (Some(x), Some(y)) => x.cmp(y),
                }
            }
        }
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PackageVersion {}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> PackageVersion {
        PackageVersion::parse(s)
    }

    #[test]
    fn numeric_ordering() {
        assert!(v("1.0") < v("1.0.1"));
        assert!(v("1.0.1") < v("1.1"));
        assert!(v("1.1") < v("2.0"));
    }

    #[test]
    fn zero_padding() {
        assert_eq!(v("1.0"), v("1.0.0"));
        assert_eq!(v("2"), v("2.0"));
    }

    #[test]
    fn prerelease_sorts_below_release() {
        assert!(v("7.0-alpha") < v("7.0"));
        assert!(v("7.0-alpha") < v("7.0-beta"));
        assert!(v("7.0") > v("7.0rc1"));
    }

    #[test]
    fn legacy_sorts_below_numeric() {
        assert!(v("trunk").is_legacy());
        assert!(v("trunk") < v("0.1"));
        assert!(v("v-latest") < v("1.0"));
    }

    #[test]
    fn legacy_compares_as_string() {
        assert!(v("alpha") < v("beta"));
        assert_eq!(v("trunk"), v("trunk"));
    }

    #[test]
    fn display_preserves_input() {
        assert_eq!(v("1.0").to_string(), "1.0");
        assert_eq!(v(" 2.3.4 ").to_string(), "2.3.4");
        assert_eq!(v("trunk").to_string(), "trunk");
    }
}
