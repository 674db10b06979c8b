//! Upsert request normalization: path, query and body into typed template parameters.

use crate::error::AppError;
use crate::service::{ensure_registered, TablePath};
use crate::template::{ScriptTemplate, TemplateParams, TemplateValue};
use serde::Deserialize;
use serde_json::Value;

/// Raw upsert query string.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UpsertQuery {
    #[serde(default)]
    pub keys: Option<String>,
    #[serde(default)]
    pub batch: Option<String>,
    #[serde(default)]
    pub ignore_keys: Option<String>,
}

impl UpsertQuery {
    /// Only the exact value `true` turns batch mode on.
    pub fn is_batch(&self) -> bool {
        self.batch.as_deref() == Some("true")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpsertPayload {
    /// The request body as received, including null fields.
    Single(String),
    /// One serialized object per item, null-valued fields removed.
    Batch(Vec<String>),
}

/// Everything known about an upsert before its body is read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpsertTarget {
    pub path: TablePath,
    pub keys: Vec<String>,
    pub ignore_keys: Option<Vec<String>>,
    pub batch: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpsertRequest {
    pub path: TablePath,
    pub keys: Vec<String>,
    pub ignore_keys: Option<Vec<String>>,
    pub payload: UpsertPayload,
}

/// Comma split with order and duplicates kept.
fn split_names(raw: &str) -> Vec<String> {
    raw.split(',').map(str::to_string).collect()
}

impl UpsertTarget {
    /// Validate keys and target database. Runs before the body is read.
    pub fn from_request(path: TablePath, query: &UpsertQuery, enforced_database: Option<&str>) -> Result<Self, AppError> {
        let keys = query.keys.as_deref().unwrap_or("");
        if keys.is_empty() {
            return Err(AppError::Validation("upsert keys should be set".into()));
        }
        let ignore_keys = query
            .ignore_keys
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(split_names);
        ensure_registered(enforced_database, &path.database)?;
        Ok(UpsertTarget {
            path,
            keys: split_names(keys),
            ignore_keys,
            batch: query.is_batch(),
        })
    }

    pub fn template(&self) -> ScriptTemplate {
        ScriptTemplate::select(self.batch, self.ignore_keys.is_some())
    }

    /// Attach the buffered body. Single mode passes it through untouched; batch mode parses it
    /// and drops null-valued fields so they do not overwrite stored columns on conflict.
    pub fn with_body(self, body: &[u8]) -> Result<UpsertRequest, AppError> {
        let payload = if self.batch {
            UpsertPayload::Batch(batch_items(body)?)
        } else {
            let raw = String::from_utf8(body.to_vec())
                .map_err(|_| AppError::Validation("body must be valid UTF-8".into()))?;
            UpsertPayload::Single(raw)
        };
        Ok(UpsertRequest {
            path: self.path,
            keys: self.keys,
            ignore_keys: self.ignore_keys,
            payload,
        })
    }
}

fn batch_items(body: &[u8]) -> Result<Vec<String>, AppError> {
    let items: Vec<Value> = serde_json::from_slice(body).map_err(|e| AppError::Validation(e.to_string()))?;
    if items.is_empty() {
        return Err(AppError::Validation("body should not be empty".into()));
    }
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let Value::Object(mut fields) = item else {
            return Err(AppError::Validation("batch items must be JSON objects".into()));
        };
        fields.retain(|_, v| !v.is_null());
        out.push(Value::Object(fields).to_string());
    }
    Ok(out)
}

impl UpsertRequest {
    pub fn is_batch(&self) -> bool {
        matches!(self.payload, UpsertPayload::Batch(_))
    }

    pub fn template(&self) -> ScriptTemplate {
        ScriptTemplate::select(self.is_batch(), self.ignore_keys.is_some())
    }

    /// Parameters for the selected template: schema, table, target, keys, values, and ignore_keys when set.
    pub fn template_params(&self) -> TemplateParams {
        let mut params = TemplateParams::new();
        params
            .insert("schema", TemplateValue::Text(self.path.schema.clone()))
            .insert("table", TemplateValue::Text(self.path.table.clone()))
            .insert(
                "target",
                TemplateValue::Identifier(vec![self.path.schema.clone(), self.path.table.clone()]),
            )
            .insert("keys", TemplateValue::TextArray(self.keys.clone()));
        if let Some(ignore) = &self.ignore_keys {
            params.insert("ignore_keys", TemplateValue::TextArray(ignore.clone()));
        }
        let values = match &self.payload {
            UpsertPayload::Single(raw) => TemplateValue::Json(raw.clone()),
            UpsertPayload::Batch(items) => TemplateValue::JsonArray(items.clone()),
        };
        params.insert("values", values);
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateRegistry;

    fn path() -> TablePath {
        TablePath {
            database: "iot".into(),
            schema: "public".into(),
            table: "devices".into(),
        }
    }

    fn query(keys: &str, batch: Option<&str>, ignore: Option<&str>) -> UpsertQuery {
        UpsertQuery {
            keys: Some(keys.into()),
            batch: batch.map(String::from),
            ignore_keys: ignore.map(String::from),
        }
    }

    fn literal(req: &UpsertRequest, name: &str) -> String {
        req.template_params().get(name).unwrap().to_literal()
    }

    #[test]
    fn empty_keys_are_rejected() {
        let err = UpsertTarget::from_request(path(), &UpsertQuery::default(), None).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "upsert keys should be set"));
        let err = UpsertTarget::from_request(path(), &query("", None, None), None).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn keys_keep_order_and_duplicates() {
        let target = UpsertTarget::from_request(path(), &query("b,a,b", None, None), None).unwrap();
        assert_eq!(target.keys, vec!["b", "a", "b"]);
        let req = target.with_body(b"{}").unwrap();
        assert_eq!(literal(&req, "keys"), "array['b','a','b']");
    }

    #[test]
    fn single_mode_keeps_body_verbatim_including_nulls() {
        let body = br#"{"id":1,"name":"a","note":null}"#;
        let req = UpsertTarget::from_request(path(), &query("id,name", None, None), None)
            .unwrap()
            .with_body(body)
            .unwrap();
        assert!(!req.is_batch());
        assert_eq!(literal(&req, "keys"), "array['id','name']");
        assert_eq!(literal(&req, "values"), r#"'{"id":1,"name":"a","note":null}'::json"#);
        assert!(!req.template_params().contains("ignore_keys"));
    }

    #[test]
    fn batch_mode_strips_nulls() {
        let body = br#"[{"id":1,"x":null},{"id":2,"x":5}]"#;
        let req = UpsertTarget::from_request(path(), &query("id", Some("true"), None), None)
            .unwrap()
            .with_body(body)
            .unwrap();
        assert_eq!(literal(&req, "values"), r#"array['{"id":1}'::json,'{"id":2,"x":5}'::json]"#);
    }

    #[test]
    fn batch_mode_keeps_value_types() {
        let body = br#"[{"id":"7","n":1.5,"ok":false,"tags":["a"],"meta":{"k":null}}]"#;
        let req = UpsertTarget::from_request(path(), &query("id", Some("true"), None), None)
            .unwrap()
            .with_body(body)
            .unwrap();
        let UpsertPayload::Batch(items) = &req.payload else { panic!("expected batch") };
        let item: Value = serde_json::from_str(&items[0]).unwrap();
        assert_eq!(item["id"], Value::String("7".into()));
        assert_eq!(item["n"], serde_json::json!(1.5));
        assert_eq!(item["ok"], Value::Bool(false));
        assert_eq!(item["tags"], serde_json::json!(["a"]));
        assert_eq!(item["meta"], serde_json::json!({"k": null}));
    }

    #[test]
    fn batch_requires_non_empty_array_of_objects() {
        let target = || UpsertTarget::from_request(path(), &query("id", Some("true"), None), None).unwrap();
        assert!(matches!(target().with_body(b"[]"), Err(AppError::Validation(_))));
        assert!(matches!(target().with_body(b"{\"id\":1}"), Err(AppError::Validation(_))));
        assert!(matches!(target().with_body(b"[1,2]"), Err(AppError::Validation(_))));
        assert!(matches!(target().with_body(b"not json"), Err(AppError::Validation(_))));
    }

    #[test]
    fn batch_flag_requires_exact_true() {
        for flag in [None, Some("TRUE"), Some("1"), Some("false")] {
            let target = UpsertTarget::from_request(path(), &query("id", flag, None), None).unwrap();
            assert!(!target.batch, "{:?}", flag);
        }
        let target = UpsertTarget::from_request(path(), &query("id", Some("true"), None), None).unwrap();
        assert!(target.batch);
    }

    #[test]
    fn ignore_keys_select_the_ignore_variant() {
        let target = UpsertTarget::from_request(path(), &query("id", None, Some("created_at,owner")), None).unwrap();
        assert_eq!(target.template(), ScriptTemplate::UpsertWithIgnore);
        let req = target.with_body(b"{}").unwrap();
        assert_eq!(literal(&req, "ignore_keys"), "array['created_at','owner']");

        let target = UpsertTarget::from_request(path(), &query("id", None, Some("")), None).unwrap();
        assert_eq!(target.template(), ScriptTemplate::Upsert);
    }

    #[test]
    fn database_mismatch_is_rejected_in_single_db_mode() {
        let err = UpsertTarget::from_request(path(), &query("id", None, None), Some("other")).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("database not registered")));
        assert!(UpsertTarget::from_request(path(), &query("id", None, None), Some("iot")).is_ok());
    }

    #[test]
    fn params_render_against_every_builtin_template() {
        let registry = TemplateRegistry::builtin();
        for (batch, ignore, body) in [
            (None, None, &b"{\"id\":1}"[..]),
            (None, Some("x"), &b"{\"id\":1}"[..]),
            (Some("true"), None, &b"[{\"id\":1}]"[..]),
            (Some("true"), Some("x"), &b"[{\"id\":1}]"[..]),
        ] {
            let req = UpsertTarget::from_request(path(), &query("id", batch, ignore), None)
                .unwrap()
                .with_body(body)
                .unwrap();
            let stmt = registry.render(req.template().name(), &req.template_params()).unwrap();
            assert!(stmt.sql.contains(r#"NULL::"public"."devices""#), "{}", stmt.sql);
            assert_eq!(stmt.params.len(), if ignore.is_some() { 5 } else { 4 });
        }
    }
}
