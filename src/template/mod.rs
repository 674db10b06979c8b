//! Script templates: named SQL with `{{.param}}` placeholders rendered into bound statements.

mod registry;
mod value;
pub use registry::TemplateRegistry;
pub use value::{qualified_ident, TemplateParams, TemplateValue};

/// The four fixed upsert templates, chosen by (batch, has ignored keys).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScriptTemplate {
    Upsert,
    UpsertWithIgnore,
    BatchUpsert,
    BatchUpsertWithIgnore,
}

impl ScriptTemplate {
    pub const ALL: [ScriptTemplate; 4] = [
        ScriptTemplate::Upsert,
        ScriptTemplate::UpsertWithIgnore,
        ScriptTemplate::BatchUpsert,
        ScriptTemplate::BatchUpsertWithIgnore,
    ];

    pub fn select(batch: bool, with_ignore: bool) -> Self {
        match (batch, with_ignore) {
            (false, false) => ScriptTemplate::Upsert,
            (false, true) => ScriptTemplate::UpsertWithIgnore,
            (true, false) => ScriptTemplate::BatchUpsert,
            (true, true) => ScriptTemplate::BatchUpsertWithIgnore,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ScriptTemplate::Upsert => "upsert/upsert.write.sql",
            ScriptTemplate::UpsertWithIgnore => "upsert/upsert_with_ignore.write.sql",
            ScriptTemplate::BatchUpsert => "upsert/batch_upsert.write.sql",
            ScriptTemplate::BatchUpsertWithIgnore => "upsert/batch_upsert_with_ignore.write.sql",
        }
    }

    pub fn source(self) -> &'static str {
        match self {
            ScriptTemplate::Upsert => include_str!("../../queries/upsert/upsert.write.sql"),
            ScriptTemplate::UpsertWithIgnore => include_str!("../../queries/upsert/upsert_with_ignore.write.sql"),
            ScriptTemplate::BatchUpsert => include_str!("../../queries/upsert/batch_upsert.write.sql"),
            ScriptTemplate::BatchUpsertWithIgnore => {
                include_str!("../../queries/upsert/batch_upsert_with_ignore.write.sql")
            }
        }
    }
}
