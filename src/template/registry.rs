//! Named SQL templates and their rendering into bound statements.
//!
//! Placeholders use the `{{.name}}` form (inner whitespace allowed). A name used more than once
//! binds a single parameter position.

use crate::error::TemplateError;
use crate::sql::RenderedStatement;
use crate::template::{ScriptTemplate, TemplateParams};
use std::collections::HashMap;
use std::path::Path;

/// Immutable after startup; rendering is a pure function of the registry and the params.
#[derive(Clone, Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, String>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the four upsert templates.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for t in ScriptTemplate::ALL {
            registry.insert(t.name(), t.source());
        }
        registry
    }

    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.templates.insert(name.into(), source.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Add every `*.sql` file under `root`, named by its `/`-separated path relative to `root`.
    /// Files override built-ins of the same name. A missing directory adds nothing.
    pub fn load_dir(mut self, root: &Path) -> Result<Self, TemplateError> {
        if !root.is_dir() {
            tracing::debug!(path = %root.display(), "queries directory not found, using built-in templates only");
            return Ok(self);
        }
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let entries = std::fs::read_dir(&dir).map_err(|e| io_error(&dir, e))?;
            for entry in entries {
                let path = entry.map_err(|e| io_error(&dir, e))?.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                if path.extension().and_then(|e| e.to_str()) != Some("sql") {
                    continue;
                }
                let Ok(relative) = path.strip_prefix(root) else { continue };
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                let source = std::fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
                tracing::debug!(template = %name, "loaded query template");
                self.insert(name, source);
            }
        }
        Ok(self)
    }

    /// Render a named template against `params`.
    pub fn render(&self, name: &str, params: &TemplateParams) -> Result<RenderedStatement, TemplateError> {
        let source = self
            .templates
            .get(name)
            .ok_or_else(|| TemplateError::UnknownTemplate { name: name.to_string() })?;
        render_source(name, source, params)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> TemplateError {
    TemplateError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn render_source(name: &str, source: &str, params: &TemplateParams) -> Result<RenderedStatement, TemplateError> {
    let mut stmt = RenderedStatement::new(name);
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut rest = source;

    while let Some(open) = rest.find("{{") {
        stmt.sql.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let close = after.find("}}").ok_or_else(|| TemplateError::Syntax {
            name: name.to_string(),
            reason: "unclosed '{{'".into(),
        })?;
        let inner = after[..close].trim();
        let key = inner.strip_prefix('.').filter(|k| is_param_name(k)).ok_or_else(|| TemplateError::Syntax {
            name: name.to_string(),
            reason: format!("invalid placeholder '{{{{{}}}}}'", inner),
        })?;
        let value = params.get(key).ok_or_else(|| TemplateError::MissingParam {
            name: name.to_string(),
            param: key.to_string(),
        })?;
        match value.binding() {
            None => stmt.sql.push_str(&value.to_literal()),
            Some((bound, cast)) => {
                let n = match positions.get(key) {
                    Some(n) => *n,
                    None => {
                        let n = stmt.push_param(bound);
                        positions.insert(key, n);
                        n
                    }
                };
                stmt.sql.push_str(&format!("${}{}", n, cast));
            }
        }
        rest = &after[close + 2..];
    }
    stmt.sql.push_str(rest);
    Ok(stmt)
}

fn is_param_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
