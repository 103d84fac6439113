use std::collections::BTreeMap;

use metaproc_common::{Error, Result};

use super::keys::{PATTERN_LIST_SUFFIX, PATTERN_SUFFIX};
use super::types::{Configuration, Pattern, Value};

/// Compile every `_REGEXP` and `_REGEXPS` setting still holding text.
///
/// Already compiled values are left alone, so running this over a
/// configuration that was compiled before is a no-op and returns a clone
/// sharing its storage.
pub fn compile_patterns(cfg: &Configuration) -> Result<Configuration> {
    let mut compiled = BTreeMap::new();

    for (key, value) in cfg.iter() {
        let upper = key.to_ascii_uppercase();
        if upper.ends_with(PATTERN_LIST_SUFFIX) {
            if let Some(list) = compile_list(key, value)? {
                compiled.insert(key.to_string(), list);
            }
        } else if upper.ends_with(PATTERN_SUFFIX) {
            if let Value::Text(source) = value {
                compiled.insert(key.to_string(), Value::Pattern(compile_one(key, source)?));
            } else if !matches!(value, Value::Pattern(_)) {
                return Err(Error::config(format!(
                    "{key} must be a regular expression, found {}",
                    value.type_name()
                )));
            }
        }
    }

    Ok(cfg.merged(compiled))
}

/// Compiled replacement for a pattern list, or `None` when nothing changed.
fn compile_list(key: &str, value: &Value) -> Result<Option<Value>> {
    let Value::List(items) = value else {
        return Err(Error::config(format!(
            "{key} must be a list of regular expressions, found {}",
            value.type_name()
        )));
    };

    if items.iter().all(|item| matches!(item, Value::Pattern(_))) {
        return Ok(None);
    }

    items
        .iter()
        .map(|item| match item {
            Value::Text(source) => compile_one(key, source).map(Value::Pattern),
            Value::Pattern(_) => Ok(item.clone()),
            other => Err(Error::config(format!(
                "{key} must only hold regular expressions, found {}",
                other.type_name()
            ))),
        })
        .collect::<Result<Vec<_>>>()
        .map(|list| Some(Value::List(list)))
}

fn compile_one(key: &str, source: &str) -> Result<Pattern> {
    Pattern::compile(source)
        .map_err(|e| Error::config(format!("{key}: invalid regular expression {source:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[&str]) -> Value {
        Value::List(items.iter().map(|s| Value::from(*s)).collect())
    }

    #[test]
    fn compiles_suffixed_settings_only() {
        let cfg = Configuration::new()
            .with("PATH_INCLUDE_REGEXPS", texts(&[r".*\.mkv$", ".*/$"]))
            .with("TITLE_REGEXP", "^(?P<movie_title>.+)$")
            .with("PLAIN", r".*\.mkv$");

        let out = compile_patterns(&cfg).unwrap();

        let sources: Vec<_> = out
            .patterns("PATH_INCLUDE_REGEXPS")
            .map(Pattern::as_str)
            .collect();
        assert_eq!(sources, vec![r".*\.mkv$", ".*/$"]);
        assert!(matches!(out.get("TITLE_REGEXP"), Some(Value::Pattern(_))));
        assert_eq!(out.text("PLAIN"), Some(r".*\.mkv$"));
    }

    #[test]
    fn suffix_is_case_insensitive() {
        let cfg = Configuration::new().with("local_regexps", texts(&["a"]));
        let out = compile_patterns(&cfg).unwrap();
        assert_eq!(out.patterns("local_regexps").count(), 1);
    }

    #[test]
    fn compiling_twice_is_a_no_op() {
        let cfg = Configuration::new().with("X_REGEXPS", texts(&["a", "b"]));
        let once = compile_patterns(&cfg).unwrap();
        let twice = compile_patterns(&once).unwrap();

        assert_eq!(once, twice);
        assert!(twice.shares_storage_with(&once));
    }

    #[test]
    fn mixed_lists_are_completed() {
        let compiled = Value::Pattern(Pattern::compile("a").unwrap());
        let cfg = Configuration::new().with(
            "X_REGEXPS",
            Value::List(vec![compiled.clone(), Value::from("b")]),
        );
        let out = compile_patterns(&cfg).unwrap();
        assert_eq!(out.patterns("X_REGEXPS").count(), 2);
    }

    #[test]
    fn invalid_pattern_is_config_error() {
        let cfg = Configuration::new().with("X_REGEXPS", texts(&["(unclosed"]));
        let err = compile_patterns(&cfg).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("X_REGEXPS")));
    }

    #[test]
    fn wrong_shapes_are_config_errors() {
        let scalar = Configuration::new().with("X_REGEXPS", "a");
        assert!(compile_patterns(&scalar).is_err());

        let numbers = Configuration::new().with("X_REGEXPS", Value::List(vec![Value::from(1)]));
        assert!(compile_patterns(&numbers).is_err());

        let list = Configuration::new().with("X_REGEXP", texts(&["a"]));
        assert!(compile_patterns(&list).is_err());
    }
}
