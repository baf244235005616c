use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::config::DumpConfig;

use super::dump::{ConnectionParams, DumpCommand};

/// Database product targeted by a dump. Selects the dump command template
/// and the SQL dialect the importer expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Postgres,
    Mysql,
}

impl Engine {
    pub fn as_str(self) -> &'static str {
        match self {
            Engine::Postgres => "postgres",
            Engine::Mysql => "mysql",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported engine '{0}'")]
pub struct UnsupportedEngine(pub String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedEngine),
    /// The dump tool would parse the value as an option.
    #[error("{field} must not start with '-'")]
    OptionLike { field: Field },
}

impl FromStr for Engine {
    type Err = UnsupportedEngine;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Engine::Postgres),
            "mysql" => Ok(Engine::Mysql),
            _ => Err(UnsupportedEngine(s.to_string())),
        }
    }
}

/// Connection field substituted into a command template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Host,
    Port,
    User,
    Database,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Host => "host",
            Field::Port => "port",
            Field::User => "user",
            Field::Database => "database name",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgTemplate {
    Literal(String),
    Field(Field),
    /// `flag value`, dropped entirely when the value is empty.
    Flag { flag: String, field: Field },
}

impl ArgTemplate {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn flag(flag: impl Into<String>, field: Field) -> Self {
        Self::Flag {
            flag: flag.into(),
            field,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpCommandTemplate {
    pub program: String,
    pub args: Vec<ArgTemplate>,
    /// Environment variable the dump tool reads the password from.
    pub password_env: String,
}

impl DumpCommandTemplate {
    /// Fails when a field value starts with `-`, since a positional value
    /// like `--result-file=...` would otherwise reach the tool as an option.
    pub fn expand(&self, params: &ConnectionParams) -> Result<DumpCommand, CommandError> {
        let mut args = Vec::with_capacity(self.args.len() + 4);
        for arg in &self.args {
            match arg {
                ArgTemplate::Literal(value) => args.push(value.clone()),
                ArgTemplate::Field(field) => {
                    let value = field_value(params, *field)?;
                    if !value.is_empty() {
                        args.push(value);
                    }
                }
                ArgTemplate::Flag { flag, field } => {
                    let value = field_value(params, *field)?;
                    if !value.is_empty() {
                        args.push(flag.clone());
                        args.push(value);
                    }
                }
            }
        }

        Ok(DumpCommand {
            program: self.program.clone(),
            args,
            env: vec![(self.password_env.clone(), params.password.clone())],
            password: params.password.clone(),
        })
    }
}

fn field_value(params: &ConnectionParams, field: Field) -> Result<String, CommandError> {
    let value = match field {
        Field::Host => params.host.trim().to_string(),
        Field::Port => params.port.map(|port| port.to_string()).unwrap_or_default(),
        Field::User => params.user.trim().to_string(),
        Field::Database => params.database_name.trim().to_string(),
    };
    if value.starts_with('-') {
        return Err(CommandError::OptionLike { field });
    }
    Ok(value)
}

/// Lookup table from engine to dump command. An engine is supported iff it
/// has an entry here.
#[derive(Debug, Clone, Default)]
pub struct EngineRegistry {
    templates: BTreeMap<Engine, DumpCommandTemplate>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &DumpConfig) -> Self {
        Self::new()
            .with_template(Engine::Postgres, postgres_template(&cfg.postgres_program))
            .with_template(Engine::Mysql, mysql_template(&cfg.mysql_program))
    }

    pub fn with_template(mut self, engine: Engine, template: DumpCommandTemplate) -> Self {
        self.templates.insert(engine, template);
        self
    }

    pub fn resolve(&self, raw: &str) -> Result<Engine, UnsupportedEngine> {
        let engine = raw.parse::<Engine>()?;
        if !self.templates.contains_key(&engine) {
            return Err(UnsupportedEngine(raw.to_string()));
        }
        Ok(engine)
    }

    pub fn template(&self, engine: Engine) -> Option<&DumpCommandTemplate> {
        self.templates.get(&engine)
    }

    pub fn supported(&self) -> impl Iterator<Item = Engine> + '_ {
        self.templates.keys().copied()
    }

    pub fn command_for(&self, params: &ConnectionParams) -> Result<DumpCommand, CommandError> {
        let template = self
            .template(params.engine)
            .ok_or_else(|| UnsupportedEngine(params.engine.to_string()))?;
        template.expand(params)
    }
}

pub fn postgres_template(program: &str) -> DumpCommandTemplate {
    DumpCommandTemplate {
        program: program.to_string(),
        args: vec![
            ArgTemplate::literal("--schema-only"),
            ArgTemplate::flag("-h", Field::Host),
            ArgTemplate::flag("-p", Field::Port),
            ArgTemplate::flag("-U", Field::User),
            ArgTemplate::flag("-d", Field::Database),
        ],
        password_env: "PGPASSWORD".to_string(),
    }
}

pub fn mysql_template(program: &str) -> DumpCommandTemplate {
    DumpCommandTemplate {
        program: program.to_string(),
        args: vec![
            ArgTemplate::literal("--no-data"),
            ArgTemplate::flag("-h", Field::Host),
            ArgTemplate::flag("-P", Field::Port),
            ArgTemplate::flag("-u", Field::User),
            ArgTemplate::Field(Field::Database),
        ],
        password_env: "MYSQL_PWD".to_string(),
    }
}
