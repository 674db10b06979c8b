//! An executable statement: SQL with `$n` placeholders plus its bound values, in order.

use crate::sql::PgBindValue;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedStatement {
    /// Template or builder that produced the statement (for logs).
    pub source: String,
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl RenderedStatement {
    pub fn new(source: impl Into<String>) -> Self {
        RenderedStatement {
            source: source.into(),
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Append a bound value and return its 1-based position.
    pub fn push_param(&mut self, v: PgBindValue) -> usize {
        self.params.push(v);
        self.params.len()
    }

    /// The statement with every `$n` replaced by its literal value. For diagnostics only; never executed.
    pub fn inline_sql(&self) -> String {
        let mut out = String::with_capacity(self.sql.len());
        let mut chars = self.sql.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c != '$' {
                out.push(c);
                continue;
            }
            let start = i + 1;
            let mut end = start;
            while let Some(&(j, d)) = chars.peek() {
                if d.is_ascii_digit() {
                    end = j + 1;
                    chars.next();
                } else {
                    break;
                }
            }
            let literal = self.sql[start..end]
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|idx| self.params.get(idx))
                .map(PgBindValue::to_literal);
            match literal {
                Some(l) => out.push_str(&l),
                None => out.push_str(&self.sql[i..end]),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_replaces_all_positions() {
        let mut stmt = RenderedStatement::new("test");
        for i in 1..=10 {
            stmt.push_param(PgBindValue::Text(format!("v{}", i)));
        }
        stmt.sql = "SELECT $1, $10::json, $$body$$, $11".into();
        assert_eq!(stmt.inline_sql(), "SELECT 'v1', 'v10'::json, $$body$$, $11");
    }
}
