//! Query-string and body parsing for the generic table endpoints.

use crate::error::AppError;
use crate::sql::{OrderBy, SelectOptions, MAX_PAGE_SIZE};
use serde_json::{Map, Value};

const DEFAULT_PAGE_SIZE: u32 = 100;

fn parse_u32(key: &str, raw: &str) -> Result<u32, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("{} must be a positive integer, got '{}'", key, raw)))
}

fn names(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Parameters not starting with `_` are equality filters.
pub fn query_filters(pairs: &[(String, String)]) -> Vec<(String, String)> {
    pairs.iter().filter(|(k, _)| !k.starts_with('_')).cloned().collect()
}

/// `_select`, `_order`, `_page`, `_page_size`, and equality filters.
pub fn select_options(pairs: &[(String, String)]) -> Result<SelectOptions, AppError> {
    let mut opts = SelectOptions {
        filters: query_filters(pairs),
        ..Default::default()
    };
    let mut page: Option<u32> = None;
    let mut page_size: Option<u32> = None;
    for (key, value) in pairs {
        match key.as_str() {
            "_select" => opts.columns = names(value).map(String::from).collect(),
            "_order" => {
                opts.order = names(value)
                    .map(|c| match c.strip_prefix('-') {
                        Some(col) => OrderBy { column: col.to_string(), descending: true },
                        None => OrderBy { column: c.to_string(), descending: false },
                    })
                    .collect()
            }
            "_page" => page = Some(parse_u32(key, value)?),
            "_page_size" => page_size = Some(parse_u32(key, value)?),
            _ => {}
        }
    }
    if page == Some(0) {
        return Err(AppError::Validation("_page starts at 1".into()));
    }
    let size = page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    opts.limit = Some(size);
    opts.offset = page.map(|p| (p - 1).saturating_mul(size));
    Ok(opts)
}

pub fn parse_object_body(body: &[u8]) -> Result<Map<String, Value>, AppError> {
    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) if !map.is_empty() => Ok(map),
        Ok(Value::Object(_)) => Err(AppError::Validation("body should not be empty".into())),
        Ok(_) => Err(AppError::Validation("body must be a JSON object".into())),
        Err(e) => Err(AppError::Validation(e.to_string())),
    }
}

pub fn parse_batch_body(body: &[u8]) -> Result<Vec<Map<String, Value>>, AppError> {
    let items: Vec<Value> = serde_json::from_slice(body).map_err(|e| AppError::Validation(e.to_string()))?;
    if items.is_empty() {
        return Err(AppError::Validation("body should not be empty".into()));
    }
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map),
            _ => Err(AppError::Validation("batch items must be JSON objects".into())),
        })
        .collect()
}
