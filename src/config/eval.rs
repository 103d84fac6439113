//! Evaluation of settings text into setting values.
//!
//! Settings files and override layers are TOML documents. A string value of
//! the exact form `${NAME}` is a reference to the inherited setting `NAME`
//! and evaluates to a copy of its value. Inside a list, a reference to a list
//! setting is spliced in place, which is how a layer extends rather than
//! replaces an inherited list:
//!
//! ```toml
//! PATH_EXCLUDE_REGEXPS = ["${PATH_EXCLUDE_REGEXPS}", "/extras/$"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use metaproc_common::{Error, Result};

use super::types::{Configuration, Value};

/// Evaluate `source` against the settings inherited at its location.
pub fn evaluate(
    source: &str,
    origin: &Path,
    inherited: &Configuration,
) -> Result<BTreeMap<String, Value>> {
    let table: toml::Table = toml::from_str(source)
        .map_err(|e| Error::config(format!("{}: {e}", origin.display())))?;

    let ctx = EvalContext { origin, inherited };
    table
        .into_iter()
        .map(|(key, value)| Ok((key, ctx.convert(value)?)))
        .collect()
}

struct EvalContext<'a> {
    origin: &'a Path,
    inherited: &'a Configuration,
}

impl EvalContext<'_> {
    fn convert(&self, value: toml::Value) -> Result<Value> {
        Ok(match value {
            toml::Value::String(s) => match reference_name(&s) {
                Some(name) => self.lookup(name)?,
                None => Value::Text(s),
            },
            toml::Value::Integer(i) => Value::Integer(i),
            toml::Value::Float(f) => Value::Float(f),
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Datetime(d) => Value::Text(d.to_string()),
            toml::Value::Array(items) => Value::List(self.convert_list(items)?),
            toml::Value::Table(table) => Value::Table(
                table
                    .into_iter()
                    .map(|(key, value)| Ok((key, self.convert(value)?)))
                    .collect::<Result<_>>()?,
            ),
        })
    }

    fn convert_list(&self, items: Vec<toml::Value>) -> Result<Vec<Value>> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            if let toml::Value::String(s) = &item {
                if let Some(name) = reference_name(s) {
                    match self.lookup(name)? {
                        Value::List(spliced) => out.extend(spliced),
                        other => out.push(other),
                    }
                    continue;
                }
            }
            out.push(self.convert(item)?);
        }
        Ok(out)
    }

    fn lookup(&self, name: &str) -> Result<Value> {
        self.inherited.get(name).cloned().ok_or_else(|| {
            Error::config(format!(
                "{}: `${{{name}}}` refers to a setting that is not defined",
                self.origin.display()
            ))
        })
    }
}

/// Name inside a `${NAME}` reference, if `s` is exactly one.
fn reference_name(s: &str) -> Option<&str> {
    let name = s.strip_prefix("${")?.strip_suffix('}')?;
    let mut chars = name.chars();
    let first = chars.next()?;
    let valid = (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some(name)
}
