mod ddl;
mod statements;

pub use statements::{Statement, split_statements};

use super::{engine::Engine, schema::SchemaDescription};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ImportError {
    pub line: usize,
    pub message: String,
}

impl ImportError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Capability that converts dumped DDL into a schema description.
pub trait SchemaImporter: Send + Sync {
    fn import(&self, dump: &str, engine: Engine) -> Result<SchemaDescription, ImportError>;
}

/// Reads `CREATE TABLE`, `ALTER TABLE` and `CREATE INDEX` statements from
/// pg_dump and mysqldump output. Everything else in the dump is skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlImporter;

impl SchemaImporter for SqlImporter {
    fn import(&self, dump: &str, engine: Engine) -> Result<SchemaDescription, ImportError> {
        let statements = split_statements(dump, engine)?;
        let mut builder = ddl::SchemaBuilder::new(engine);
        for statement in &statements {
            builder.apply(statement)?;
        }
        Ok(builder.build())
    }
}
