//! Typed template parameters.

use crate::sql::{array_literal, quote_ident, quote_literal, PgBindValue};
use std::collections::HashMap;

/// One named template parameter. Every variant except `Identifier` is bound, never inlined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplateValue {
    Text(String),
    TextArray(Vec<String>),
    /// Raw JSON text; the database validates it when the `::json` cast runs.
    Json(String),
    JsonArray(Vec<String>),
    /// Dot-qualified identifier, inlined double-quoted (e.g. `"public"."users"`).
    Identifier(Vec<String>),
}

impl TemplateValue {
    /// SQL literal form: `'a'`, `array['a','b']`, `'{..}'::json`, `array['{..}'::json,...]`, `"s"."t"`.
    pub fn to_literal(&self) -> String {
        match self {
            TemplateValue::Text(s) => quote_literal(s),
            TemplateValue::TextArray(items) => array_literal(items.iter().map(|s| quote_literal(s))),
            TemplateValue::Json(s) => json_literal(s),
            TemplateValue::JsonArray(items) => array_literal(items.iter().map(|s| json_literal(s))),
            TemplateValue::Identifier(parts) => qualified_ident(parts),
        }
    }

    /// Bound value plus the cast appended to its placeholder; `None` for inlined identifiers.
    pub(crate) fn binding(&self) -> Option<(PgBindValue, &'static str)> {
        match self {
            TemplateValue::Text(s) => Some((PgBindValue::Text(s.clone()), "")),
            TemplateValue::TextArray(v) => Some((PgBindValue::TextArray(v.clone()), "::text[]")),
            TemplateValue::Json(s) => Some((PgBindValue::Text(s.clone()), "::json")),
            TemplateValue::JsonArray(v) => Some((PgBindValue::TextArray(v.clone()), "::json[]")),
            TemplateValue::Identifier(_) => None,
        }
    }
}

fn json_literal(s: &str) -> String {
    format!("{}::json", quote_literal(s))
}

pub fn qualified_ident(parts: &[String]) -> String {
    parts.iter().map(|p| quote_ident(p)).collect::<Vec<_>>().join(".")
}

/// Named parameters for one render call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateParams {
    values: HashMap<String, TemplateValue>,
}

impl TemplateParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: TemplateValue) -> &mut Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn with(mut self, name: impl Into<String>, value: TemplateValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TemplateValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
