//! Device matcher: support rules evaluated against a device identifier.
//!
//! A [`SupportRule`] is a value, not a matcher object. Evaluation compiles
//! the rule into a [`CompiledRule`] and tests clauses in order; the first
//! matching clause wins and the rest are not evaluated.
//!
//! [`SupportRule::Unconditional`] matches every device; `Devices(vec![])`
//! matches none.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, Result};

/// One clause of a device support list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Clause {
    /// The device identifier equals this string.
    Exact(String),
    /// The device identifier contains this string.
    Contains(String),
    /// Unanchored regular expression searched in the device identifier.
    Pattern(String),
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Exact(s) => write!(f, "exact:{s:?}"),
            Clause::Contains(s) => write!(f, "contains:{s:?}"),
            Clause::Pattern(s) => write!(f, "pattern:{s:?}"),
        }
    }
}

/// Which devices activate a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SupportRule {
    /// Active on every device.
    Unconditional,
    /// Active only on devices matching at least one clause.
    Devices(Vec<Clause>),
}

impl SupportRule {
    /// Rule that never matches.
    pub fn none() -> Self {
        SupportRule::Devices(Vec::new())
    }

    /// Rule built from a list of regular expressions.
    pub fn patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SupportRule::Devices(patterns.into_iter().map(|p| Clause::Pattern(p.into())).collect())
    }

    /// Rule built from a list of exact device identifiers.
    pub fn exact<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SupportRule::Devices(ids.into_iter().map(|p| Clause::Exact(p.into())).collect())
    }

    /// Compile every clause up front.
    ///
    /// Fails with [`DeviceError::AmbiguousRule`] on the first pattern that
    /// does not compile, wherever it sits in the list.
    pub fn compile(&self) -> Result<CompiledRule> {
        let clauses = match self {
            SupportRule::Unconditional => return Ok(CompiledRule { clauses: None }),
            SupportRule::Devices(clauses) => clauses,
        };

        let mut compiled = Vec::with_capacity(clauses.len());
        for clause in clauses {
            compiled.push(match clause {
                Clause::Exact(s) => CompiledClause::Exact(s.clone()),
                Clause::Contains(s) => CompiledClause::Contains(s.clone()),
                Clause::Pattern(p) => {
                    let re = Regex::new(p).map_err(|e| DeviceError::AmbiguousRule {
                        pattern: p.clone(),
                        detail: e.to_string(),
                    })?;
                    CompiledClause::Pattern(re)
                }
            });
        }
        Ok(CompiledRule {
            clauses: Some(compiled),
        })
    }
}

impl fmt::Display for SupportRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupportRule::Unconditional => f.write_str("unconditional"),
            SupportRule::Devices(clauses) => {
                f.write_str("devices[")?;
                for (i, clause) in clauses.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{clause}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[derive(Debug, Clone)]
enum CompiledClause {
    Exact(String),
    Contains(String),
    Pattern(Regex),
}

impl CompiledClause {
    fn matches(&self, device_id: &str) -> bool {
        match self {
            CompiledClause::Exact(s) => device_id == s,
            CompiledClause::Contains(s) => device_id.contains(s.as_str()),
            CompiledClause::Pattern(re) => re.is_match(device_id),
        }
    }
}

/// A support rule with its patterns compiled. Immutable and shareable.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// `None` for an unconditional rule.
    clauses: Option<Vec<CompiledClause>>,
}

impl CompiledRule {
    /// True iff any clause matches. Short-circuits on the first match.
    pub fn matches(&self, device_id: &str) -> bool {
        match &self.clauses {
            None => true,
            Some(clauses) => clauses.iter().any(|c| c.matches(device_id)),
        }
    }
}

/// Evaluate `rule` against `device_id`.
pub fn matches(rule: &SupportRule, device_id: &str) -> Result<bool> {
    Ok(rule.compile()?.matches(device_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_clause_requires_full_identifier() {
        let rule = SupportRule::exact(["CC1352P7RGZ"]);
        assert!(matches(&rule, "CC1352P7RGZ").unwrap());
        assert!(!matches(&rule, "CC1352P7RGZR").unwrap());
        assert!(!matches(&rule, "CC1352P").unwrap());
    }

    #[test]
    fn pattern_clause_is_unanchored() {
        let rule = SupportRule::patterns(["CC13.4"]);
        assert!(matches(&rule, "CC1354P10RSK").unwrap());
        assert!(matches(&rule, "xCC1314R10RSKy").unwrap());
        assert!(!matches(&rule, "CC1352R1F3RGZ").unwrap());
    }

    #[test]
    fn contains_clause() {
        let rule = SupportRule::Devices(vec![Clause::Contains("P7".into())]);
        assert!(matches(&rule, "CC2652P7RGZ").unwrap());
        assert!(!matches(&rule, "CC2652R7RGZ").unwrap());
    }

    #[test]
    fn any_clause_wins() {
        let rule = SupportRule::Devices(vec![
            Clause::Exact("CC2340R5RKP".into()),
            Clause::Pattern("CC26.4".into()),
        ]);
        assert!(matches(&rule, "CC2340R5RKP").unwrap());
        assert!(matches(&rule, "CC2674P10RGZ").unwrap());
        assert!(!matches(&rule, "CC1352P7RGZ").unwrap());
    }

    #[test]
    fn empty_device_list_never_matches() {
        let rule = SupportRule::none();
        for id in ["CC1352P7RGZ", "CC2340R5RKP", "CC2674P10RGZ", "anything"] {
            assert!(!matches(&rule, id).unwrap());
        }
    }

    #[test]
    fn unconditional_matches_all() {
        for id in ["CC1352P7RGZ", "CC2340R5RKP", "x"] {
            assert!(matches(&SupportRule::Unconditional, id).unwrap());
        }
    }

    #[test]
    fn invalid_pattern_is_ambiguous_even_after_a_match() {
        let rule = SupportRule::Devices(vec![
            Clause::Exact("CC1352P7RGZ".into()),
            Clause::Pattern("CC13(".into()),
        ]);
        let err = matches(&rule, "CC1352P7RGZ").unwrap_err();
        assert!(matches!(err, DeviceError::AmbiguousRule { ref pattern, .. } if pattern == "CC13("));
    }

    #[test]
    fn display_lists_clauses() {
        let rule = SupportRule::Devices(vec![
            Clause::Exact("A".into()),
            Clause::Pattern("B.".into()),
        ]);
        assert_eq!(rule.to_string(), r#"devices[exact:"A", pattern:"B."]"#);
        assert_eq!(SupportRule::Unconditional.to_string(), "unconditional");
    }

    #[test]
    fn toml_forms() {
        #[derive(Deserialize)]
        struct Wrapper {
            support: SupportRule,
        }
        let w: Wrapper = toml::from_str(r#"support = "unconditional""#).unwrap();
        assert_eq!(w.support, SupportRule::Unconditional);

        let w: Wrapper =
            toml::from_str(r#"support = { devices = [{ exact = "CC1352P7RGZ" }, { pattern = "CC26.4" }] }"#)
                .unwrap();
        assert_eq!(
            w.support,
            SupportRule::Devices(vec![
                Clause::Exact("CC1352P7RGZ".into()),
                Clause::Pattern("CC26.4".into()),
            ])
        );

        let w: Wrapper = toml::from_str(r#"support = { devices = [] }"#).unwrap();
        assert_eq!(w.support, SupportRule::none());
    }
}
