//!
//! # Label and field sets and selectors
//!
//! Sets are rendered as `key=value` pairs, selectors are the comma separated
//! requirements used by `labelSelector` and `fieldSelector`.
//!
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// ordered key value set, used for both labels and selectable fields
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Set(BTreeMap<String, String>);

pub type Labels = Set;
pub type Fields = Set;

impl Set {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|v| v.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    /// pairs rendered as `key=value`
    pub fn pairs(&self) -> Vec<String> {
        self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect()
    }
}

impl From<&HashMap<String, String>> for Set {
    fn from(map: &HashMap<String, String>) -> Self {
        Self(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Set {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl fmt::Display for Set {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.pairs().join(","))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorParseError {
    #[error("empty key in selector requirement: '{0}'")]
    EmptyKey(String),
    #[error("invalid selector requirement: '{0}'")]
    InvalidRequirement(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    Exists,
    DoesNotExist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub key: String,
    pub operator: Operator,
    pub value: String,
}

impl Requirement {
    pub fn matches(&self, set: &Set) -> bool {
        match self.operator {
            Operator::Equals => set.get(&self.key) == Some(self.value.as_str()),
            // missing key satisfies inequality
            Operator::NotEquals => set.get(&self.key) != Some(self.value.as_str()),
            Operator::Exists => set.has(&self.key),
            Operator::DoesNotExist => !set.has(&self.key),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.operator {
            Operator::Equals => write!(f, "{}={}", self.key, self.value),
            Operator::NotEquals => write!(f, "{}!={}", self.key, self.value),
            Operator::Exists => write!(f, "{}", self.key),
            Operator::DoesNotExist => write!(f, "!{}", self.key),
        }
    }
}

impl FromStr for Requirement {
    type Err = SelectorParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let term = raw.trim();
        let (key, operator, value) = if let Some((key, value)) = term.split_once("!=") {
            (key, Operator::NotEquals, value)
        } else if let Some((key, value)) = term.split_once("==") {
            (key, Operator::Equals, value)
        } else if let Some((key, value)) = term.split_once('=') {
            (key, Operator::Equals, value)
        } else if let Some(key) = term.strip_prefix('!') {
            (key, Operator::DoesNotExist, "")
        } else {
            (term, Operator::Exists, "")
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(SelectorParseError::EmptyKey(raw.to_owned()));
        }
        if key.contains(|c: char| c.is_whitespace() || c == '!' || c == '=') {
            return Err(SelectorParseError::InvalidRequirement(raw.to_owned()));
        }

        Ok(Self {
            key: key.to_owned(),
            operator,
            value: value.trim().to_owned(),
        })
    }
}

/// conjunction of requirements, empty selector matches everything
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Selector {
    requirements: Vec<Requirement>,
}

impl Selector {
    pub fn everything() -> Self {
        Self::default()
    }

    pub fn parse(raw: &str) -> Result<Self, SelectorParseError> {
        raw.parse()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn matches(&self, set: &Set) -> bool {
        self.requirements.iter().all(|r| r.matches(set))
    }

    /// value required for key when the selector pins it with equality
    pub fn requires_exact(&self, key: &str) -> Option<&str> {
        self.requirements
            .iter()
            .find(|r| r.key == key && r.operator == Operator::Equals)
            .map(|r| r.value.as_str())
    }
}

impl FromStr for Selector {
    type Err = SelectorParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let requirements = raw
            .split(',')
            .filter(|term| !term.trim().is_empty())
            .map(|term| term.parse())
            .collect::<Result<Vec<Requirement>, _>>()?;
        Ok(Self { requirements })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let terms: Vec<String> = self.requirements.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", terms.join(","))
    }
}

#[cfg(test)]
mod test {

    use super::Selector;
    use super::SelectorParseError;
    use super::Set;

    fn labels() -> Set {
        vec![("env", "prod"), ("tier", "web")].into_iter().collect()
    }

    #[test]
    fn test_empty_selector_matches_all() {
        let selector = Selector::parse("").expect("parse");
        assert!(selector.is_empty());
        assert!(selector.matches(&labels()));
        assert!(selector.matches(&Set::new()));
    }

    #[test]
    fn test_equality_selector() {
        let selector = Selector::parse("env=prod,tier==web").expect("parse");
        assert!(selector.matches(&labels()));
        let selector = Selector::parse("env=dev").expect("parse");
        assert!(!selector.matches(&labels()));
    }

    #[test]
    fn test_inequality_and_existence() {
        assert!(Selector::parse("env!=dev").unwrap().matches(&labels()));
        assert!(Selector::parse("missing!=x").unwrap().matches(&labels()));
        assert!(Selector::parse("tier").unwrap().matches(&labels()));
        assert!(!Selector::parse("!tier").unwrap().matches(&labels()));
        assert!(Selector::parse("!owner").unwrap().matches(&labels()));
    }

    #[test]
    fn test_invalid_selector() {
        assert_eq!(
            Selector::parse("=prod"),
            Err(SelectorParseError::EmptyKey("=prod".to_owned()))
        );
        assert!(Selector::parse("a b=c").is_err());
    }

    #[test]
    fn test_set_pairs() {
        assert_eq!(labels().pairs(), vec!["env=prod", "tier=web"]);
        assert_eq!(labels().to_string(), "env=prod,tier=web");
    }

    #[test]
    fn test_requires_exact() {
        let selector = Selector::parse("metadata.name=x,env!=dev").unwrap();
        assert_eq!(selector.requires_exact("metadata.name"), Some("x"));
        assert_eq!(selector.requires_exact("env"), None);
    }
}
