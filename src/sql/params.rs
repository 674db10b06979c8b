//! Values bound to positional parameters. Text and text[] only; SQL casts in the statement give them their type.

use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PgBindValue {
    Text(String),
    TextArray(Vec<String>),
}

impl PgBindValue {
    /// SQL literal form, used to inline a statement for logs and error messages.
    pub fn to_literal(&self) -> String {
        match self {
            PgBindValue::Text(s) => quote_literal(s),
            PgBindValue::TextArray(items) => array_literal(items.iter().map(|s| quote_literal(s))),
        }
    }
}

/// Single-quoted SQL string literal with embedded quotes doubled.
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Double-quoted identifier (safe for any input).
pub fn quote_ident(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// `array[a,b,...]` from already-rendered element literals.
pub fn array_literal<I>(items: I) -> String
where
    I: IntoIterator<Item = String>,
{
    format!("array[{}]", items.into_iter().collect::<Vec<_>>().join(","))
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        match self {
            PgBindValue::Text(s) => <String as Encode<Postgres>>::encode_by_ref(s, buf),
            PgBindValue::TextArray(v) => <Vec<String> as Encode<Postgres>>::encode_by_ref(v, buf),
        }
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            PgBindValue::Text(_) => <String as sqlx::Type<Postgres>>::type_info(),
            PgBindValue::TextArray(_) => <Vec<String> as sqlx::Type<Postgres>>::type_info(),
        })
    }
}

impl sqlx::Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty) || <Vec<String> as sqlx::Type<Postgres>>::compatible(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_double_embedded_quotes() {
        assert_eq!(quote_literal("o'neil"), "'o''neil'");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn array_literal_has_no_trailing_comma() {
        let v = PgBindValue::TextArray(vec!["id".into(), "name".into()]);
        assert_eq!(v.to_literal(), "array['id','name']");
    }
}
