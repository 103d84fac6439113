use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use metaproc_common::{Error, Result};
use regex::{Captures, Regex, RegexBuilder};

use super::keys;
use crate::facts::{FactDeriver, Facts};
use crate::processor::Processor;

/// Live handle to a resolved processor.
pub type ProcessorHandle = Arc<dyn Processor>;

/// Live handle to a resolved fact deriver.
pub type DeriverHandle = Arc<dyn FactDeriver>;

/// A compiled, case-insensitive path pattern.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compile `source` with case-insensitive matching.
    pub fn compile(source: &str) -> std::result::Result<Self, regex::Error> {
        RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Unanchored search of `haystack`.
    pub fn is_match(&self, haystack: &str) -> bool {
        self.0.is_match(haystack)
    }

    pub fn captures<'h>(&self, haystack: &'h str) -> Option<Captures<'h>> {
        self.0.captures(haystack)
    }

    /// Names of the capture groups that carry a name.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.0.capture_names().flatten()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/i", self.as_str())
    }
}

/// A single setting value.
#[derive(Clone)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    List(Vec<Value>),
    Table(BTreeMap<String, Value>),
    Pattern(Pattern),
    Processor(ProcessorHandle),
    FactDeriver(DeriverHandle),
}

impl Value {
    /// Short name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Table(_) => "table",
            Value::Pattern(_) => "pattern",
            Value::Processor(_) => "processor",
            Value::FactDeriver(_) => "fact deriver",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_pattern(&self) -> Option<&Pattern> {
        match self {
            Value::Pattern(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Render a scalar as a fact value. Lists, tables and handles have no
    /// fact representation.
    pub fn to_fact_string(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Table(a), Value::Table(b)) => a == b,
            (Value::Pattern(a), Value::Pattern(b)) => a == b,
            (Value::Processor(a), Value::Processor(b)) => Arc::ptr_eq(a, b),
            (Value::FactDeriver(a), Value::FactDeriver(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Table(table) => f.debug_map().entries(table).finish(),
            Value::Pattern(p) => write!(f, "{p:?}"),
            Value::Processor(p) => write!(f, "<processor {}>", p.name()),
            Value::FactDeriver(d) => write!(f, "<fact deriver {}>", d.name()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

/// A set of named settings.
///
/// Clones share the underlying map; every modification goes through
/// [`Arc::make_mut`], so a configuration handed to a child directory can never
/// be changed behind the back of its parent or siblings.
#[derive(Clone, Default, PartialEq)]
pub struct Configuration {
    settings: Arc<BTreeMap<String, Value>>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: BTreeMap<String, Value>) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.settings.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.settings.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether both configurations share the same underlying map.
    pub fn shares_storage_with(&self, other: &Configuration) -> bool {
        Arc::ptr_eq(&self.settings, &other.settings)
    }

    /// Return a copy with `key` set to `value`.
    pub fn with(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut next = self.clone();
        next.set(key, value);
        next
    }

    /// Return a copy without `key`.
    pub fn without(&self, key: &str) -> Self {
        if !self.contains(key) {
            return self.clone();
        }
        let mut next = self.clone();
        Arc::make_mut(&mut next.settings).remove(key);
        next
    }

    /// Return a copy with every setting of `layer` overwriting or adding to
    /// this one.
    pub fn merged(&self, layer: BTreeMap<String, Value>) -> Self {
        let mut next = self.clone();
        if !layer.is_empty() {
            Arc::make_mut(&mut next.settings).extend(layer);
        }
        next
    }

    pub(crate) fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        Arc::make_mut(&mut self.settings).insert(key.into(), value.into());
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_text)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.get(key) {
            Some(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.get(key) {
            Some(Value::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    /// Compiled patterns of a `_REGEXPS` setting, in order. Empty when the
    /// setting is absent.
    pub fn patterns(&self, key: &str) -> impl Iterator<Item = &Pattern> {
        self.get(key)
            .and_then(Value::as_list)
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_pattern)
    }

    /// Text elements of a list setting.
    pub fn text_list(&self, key: &str) -> Result<Vec<String>> {
        let items = match self.get(key) {
            Some(Value::List(items)) => items,
            Some(other) => {
                return Err(Error::config(format!(
                    "{key} must be a list, found {}",
                    other.type_name()
                )))
            }
            None => return Err(Error::config(format!("{key} is not set"))),
        };
        items
            .iter()
            .map(|item| {
                item.as_text().map(str::to_string).ok_or_else(|| {
                    Error::config(format!(
                        "{key} must only hold text, found {}",
                        item.type_name()
                    ))
                })
            })
            .collect()
    }

    /// The resolved processor.
    pub fn processor(&self) -> Result<ProcessorHandle> {
        match self.get(keys::PROCESSOR) {
            Some(Value::Processor(p)) => Ok(p.clone()),
            Some(other) => Err(Error::config(format!(
                "{} has not been resolved to a processor (found {})",
                keys::PROCESSOR,
                other.type_name()
            ))),
            None => Err(Error::config(format!("{} is not set", keys::PROCESSOR))),
        }
    }

    /// The resolved fact deriver.
    pub fn fact_deriver(&self) -> Result<DeriverHandle> {
        match self.get(keys::FACTS_FUNCTION) {
            Some(Value::FactDeriver(d)) => Ok(d.clone()),
            Some(other) => Err(Error::config(format!(
                "{} has not been resolved to a fact deriver (found {})",
                keys::FACTS_FUNCTION,
                other.type_name()
            ))),
            None => Err(Error::config(format!(
                "{} is not set",
                keys::FACTS_FUNCTION
            ))),
        }
    }

    /// Remove the `facts` block, if any, and return it as a fact store.
    pub fn take_facts(&mut self) -> Result<Option<Facts>> {
        if !self.contains(keys::FACTS_BLOCK) {
            return Ok(None);
        }
        let block = Arc::make_mut(&mut self.settings).remove(keys::FACTS_BLOCK);
        let Some(Value::Table(table)) = block else {
            return Err(Error::config(format!(
                "`{}` must be a table of fact names to values",
                keys::FACTS_BLOCK
            )));
        };

        let mut facts = Facts::new();
        for (name, value) in table {
            let rendered = value.to_fact_string().ok_or_else(|| {
                Error::config(format!(
                    "fact `{name}` must be a scalar, found {}",
                    value.type_name()
                ))
            })?;
            facts.insert(name, rendered);
        }
        Ok(Some(facts))
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.settings.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, Value)]) -> Value {
        Value::Table(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn with_does_not_touch_the_original() {
        let base = Configuration::new().with("A", "one");
        let derived = base.with("A", "two").with("B", true);

        assert_eq!(base.text("A"), Some("one"));
        assert!(!base.contains("B"));
        assert_eq!(derived.text("A"), Some("two"));
        assert_eq!(derived.bool("B"), Some(true));
    }

    #[test]
    fn clones_share_storage_until_modified() {
        let base = Configuration::new().with("A", "one");
        let copy = base.clone();
        assert!(copy.shares_storage_with(&base));

        let changed = copy.with("A", "two");
        assert!(!changed.shares_storage_with(&base));
    }

    #[test]
    fn merged_overwrites_key_by_key() {
        let base = Configuration::new().with("A", "one").with("B", "keep");
        let mut layer = BTreeMap::new();
        layer.insert("A".to_string(), Value::from("two"));
        layer.insert("C".to_string(), Value::from(3));

        let merged = base.merged(layer);
        assert_eq!(merged.text("A"), Some("two"));
        assert_eq!(merged.text("B"), Some("keep"));
        assert_eq!(merged.integer("C"), Some(3));
        assert_eq!(base.text("A"), Some("one"));
    }

    #[test]
    fn without_removes_only_in_copy() {
        let base = Configuration::new().with("A", "one").with("B", "two");
        let stripped = base.without("A");
        assert!(!stripped.contains("A"));
        assert!(base.contains("A"));
    }

    #[test]
    fn take_facts_removes_block() {
        let mut cfg = Configuration::new().with("A", "one").with(
            keys::FACTS_BLOCK,
            table(&[
                ("type", Value::from("tv")),
                ("season_number", Value::from(2)),
            ]),
        );

        let facts = cfg.take_facts().unwrap().unwrap();
        assert_eq!(facts.get("type"), Some("tv"));
        assert_eq!(facts.get("season_number"), Some("2"));
        assert!(!cfg.contains(keys::FACTS_BLOCK));
        assert!(cfg.take_facts().unwrap().is_none());
    }

    #[test]
    fn take_facts_rejects_non_table() {
        let mut cfg = Configuration::new().with(keys::FACTS_BLOCK, "tv");
        assert!(cfg.take_facts().is_err());

        let mut cfg = Configuration::new().with(
            keys::FACTS_BLOCK,
            table(&[("type", Value::List(vec![]))]),
        );
        assert!(cfg.take_facts().is_err());
    }

    #[test]
    fn text_list_reports_shape_errors() {
        let cfg = Configuration::new()
            .with("DIRS", Value::List(vec![Value::from("/a"), Value::from("/b")]))
            .with("MIXED", Value::List(vec![Value::from("/a"), Value::from(1)]))
            .with("SCALAR", "/a");

        assert_eq!(cfg.text_list("DIRS").unwrap(), vec!["/a", "/b"]);
        assert!(cfg.text_list("MIXED").is_err());
        assert!(cfg.text_list("SCALAR").is_err());
        assert!(cfg.text_list("MISSING").is_err());
    }

    #[test]
    fn patterns_skip_uncompiled_entries() {
        let cfg = Configuration::new().with(
            "X_REGEXPS",
            Value::List(vec![
                Value::Pattern(Pattern::compile("a").unwrap()),
                Value::from("b"),
            ]),
        );
        let sources: Vec<_> = cfg.patterns("X_REGEXPS").map(Pattern::as_str).collect();
        assert_eq!(sources, vec!["a"]);
        assert_eq!(cfg.patterns("MISSING").count(), 0);
    }

    #[test]
    fn pattern_is_case_insensitive() {
        let p = Pattern::compile(r"season\s*(?P<season_number>\d+)").unwrap();
        assert!(p.is_match("SEASON 3"));
        let caps = p.captures("Season 12").unwrap();
        assert_eq!(&caps["season_number"], "12");
        assert_eq!(p.group_names().collect::<Vec<_>>(), vec!["season_number"]);
    }

    #[test]
    fn unresolved_handles_are_config_errors() {
        let cfg = Configuration::new().with(keys::PROCESSOR, "mediabrowser");
        assert!(matches!(cfg.processor(), Err(Error::Config(_))));
        assert!(matches!(cfg.fact_deriver(), Err(Error::Config(_))));
    }
}
