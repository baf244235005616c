//! DDL statement parsing for schema extraction.
//!
//! Statements are classified with regexes; table bodies and constraint
//! clauses are read from a small token stream where parenthesised groups
//! stay a single token.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::diagram::{
    engine::Engine,
    schema::{Cardinality, Column, Index, Relationship, SchemaDescription, Table},
};

use super::{ImportError, Statement};

static LEADING_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Za-z_]+)").expect("valid leading word regex"));

static CREATE_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)^\s*CREATE\s+(?:(?:GLOBAL|LOCAL)\s+)?(?:(?:TEMPORARY|TEMP|UNLOGGED)\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?",
    )
    .expect("valid create table regex")
});

static ALTER_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*ALTER\s+TABLE\s+(?:IF\s+EXISTS\s+)?(?:ONLY\s+)?")
        .expect("valid alter table regex")
});

static CREATE_INDEX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)^\s*CREATE\s+(UNIQUE\s+)?(?:(?:FULLTEXT|SPATIAL)\s+)?INDEX\s+(?:CONCURRENTLY\s+)?(?:IF\s+NOT\s+EXISTS\s+)?",
    )
    .expect("valid create index regex")
});

static CREATE_VIEW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)^\s*CREATE\s+(?:OR\s+REPLACE\s+)?(?:(?:TEMP|TEMPORARY|RECURSIVE|MATERIALIZED)\s+)?(?:ALGORITHM\s*=\s*\w+\s+)?(?:DEFINER\s*=\s*\S+\s+)?(?:SQL\s+SECURITY\s+\w+\s+)?VIEW\b",
    )
    .expect("valid create view regex")
});

/// Leading keywords of statements that may appear in a dump.
const KNOWN_COMMANDS: &[&str] = &[
    "ABORT", "ALTER", "ANALYZE", "BEGIN", "CALL", "CHECKPOINT", "CLOSE", "CLUSTER", "COMMENT",
    "COMMIT", "COPY", "CREATE", "DEALLOCATE", "DECLARE", "DELETE", "DISCARD", "DO", "DROP", "END",
    "EXECUTE", "EXPLAIN", "FETCH", "FLUSH", "GRANT", "HANDLER", "IMPORT", "INSERT", "LISTEN",
    "LOAD", "LOCK", "MOVE", "NOTIFY", "OPTIMIZE", "PREPARE", "REFRESH", "REINDEX", "RELEASE",
    "RENAME", "REPAIR", "REPLACE", "RESET", "REVOKE", "ROLLBACK", "SAVEPOINT", "SECURITY",
    "SELECT", "SET", "SHOW", "START", "TRUNCATE", "UNLOCK", "UPDATE", "USE", "VACUUM", "VALUES",
    "WITH",
];

/// Words that end a column's data type and start its constraints.
const TYPE_TERMINATORS: &[&str] = &[
    "AS", "AUTO_INCREMENT", "AUTOINCREMENT", "CHARSET", "CHECK", "COLLATE", "COLUMN_FORMAT",
    "COMMENT", "COMPRESSION", "CONSTRAINT", "DEFAULT", "ENGINE_ATTRIBUTE", "GENERATED", "IDENTITY",
    "INVISIBLE", "KEY", "NOT", "NULL", "ON", "PRIMARY", "REFERENCES", "SECONDARY_ENGINE_ATTRIBUTE",
    "SRID", "STORAGE", "UNIQUE", "VISIBLE",
];

const SERIAL_TYPES: &[&str] = &["serial", "smallserial", "bigserial", "serial2", "serial4", "serial8"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Word,
    Quoted,
    Str,
    Group,
    Symbol,
}

#[derive(Debug, Clone)]
struct Token {
    kind: Kind,
    /// Identifier text for words and quoted identifiers, inner text for
    /// groups, raw text otherwise.
    value: String,
    start: usize,
    end: usize,
}

impl Token {
    fn is_word(&self, word: &str) -> bool {
        self.kind == Kind::Word && self.value.eq_ignore_ascii_case(word)
    }

    fn ident(&self) -> Option<&str> {
        matches!(self.kind, Kind::Word | Kind::Quoted).then_some(self.value.as_str())
    }

    fn keyword(&self) -> Option<String> {
        (self.kind == Kind::Word).then(|| self.value.to_ascii_uppercase())
    }
}

struct ForeignKeyDraft {
    name: Option<String>,
    columns: Vec<String>,
    ref_schema: Option<String>,
    ref_table: String,
    ref_columns: Vec<String>,
}

struct PendingForeignKey {
    table: usize,
    line: usize,
    draft: ForeignKeyDraft,
}

pub(crate) struct SchemaBuilder {
    engine: Engine,
    tables: Vec<Table>,
    foreign_keys: Vec<PendingForeignKey>,
    skipped_views: usize,
}

impl SchemaBuilder {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            tables: Vec::new(),
            foreign_keys: Vec::new(),
            skipped_views: 0,
        }
    }

    pub fn apply(&mut self, statement: &Statement) -> Result<(), ImportError> {
        let text = statement.text.as_str();
        let line = statement.line;

        let keyword = LEADING_WORD_RE
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_ascii_uppercase());
        match keyword {
            Some(keyword) if KNOWN_COMMANDS.contains(&keyword.as_str()) => {}
            _ => {
                return Err(ImportError::new(
                    line,
                    format!("unrecognised statement '{}'", preview(text)),
                ));
            }
        }

        if let Some(m) = CREATE_TABLE_RE.find(text) {
            return self.create_table(&text[m.end()..], line);
        }
        if let Some(caps) = CREATE_INDEX_RE.captures(text) {
            let unique = caps.get(1).is_some();
            let end = caps.get(0).map(|m| m.end()).unwrap_or_default();
            return self.create_index(&text[end..], unique, line);
        }
        if let Some(m) = ALTER_TABLE_RE.find(text) {
            return self.alter_table(&text[m.end()..], line);
        }
        if CREATE_VIEW_RE.is_match(text) {
            self.skipped_views += 1;
        }
        Ok(())
    }

    pub fn build(self) -> SchemaDescription {
        let mut relationships = Vec::with_capacity(self.foreign_keys.len());
        for pending in &self.foreign_keys {
            let source = &self.tables[pending.table];
            let draft = &pending.draft;
            let Some(target) = self.resolve_table(
                draft.ref_schema.as_deref(),
                &draft.ref_table,
                source.schema.as_deref(),
            ) else {
                tracing::warn!(
                    line = pending.line,
                    table = %source.display_name(),
                    references = %draft.ref_table,
                    "dropping foreign key to a table missing from the dump"
                );
                continue;
            };
            let target = &self.tables[target];

            let to_columns = if draft.ref_columns.is_empty() {
                target.primary_key.clone()
            } else {
                draft.ref_columns.clone()
            };
            let cardinality = if source.is_unique_key(&draft.columns) {
                Cardinality::OneToOne
            } else {
                Cardinality::ManyToOne
            };

            relationships.push(Relationship {
                name: draft.name.clone(),
                from_table: source.display_name(),
                from_columns: draft.columns.clone(),
                to_table: target.display_name(),
                to_columns,
                cardinality,
            });
        }

        if self.skipped_views > 0 {
            tracing::debug!(
                engine = %self.engine,
                views = self.skipped_views,
                "views are not part of the schema description"
            );
        }

        SchemaDescription {
            tables: self.tables,
            relationships,
        }
    }

    fn create_table(&mut self, rest: &str, line: usize) -> Result<(), ImportError> {
        let tokens = tokenize(rest, self.engine, line)?;
        let mut pos = 0;
        let (schema, name) = qualified_name(&tokens, &mut pos)
            .ok_or_else(|| ImportError::new(line, "CREATE TABLE without a table name"))?;

        let body = match tokens.get(pos) {
            Some(token) if token.kind == Kind::Group => token.value.clone(),
            _ => {
                let derived = tokens[pos..]
                    .iter()
                    .any(|t| t.is_word("PARTITION") || t.is_word("OF") || t.is_word("AS"));
                if derived {
                    tracing::debug!(table = %name, "skipping table without its own column list");
                    return Ok(());
                }
                return Err(ImportError::new(
                    line,
                    format!("CREATE TABLE {name} has no column list"),
                ));
            }
        };

        if self.find_exact(schema.as_deref(), &name).is_some() {
            return Err(ImportError::new(line, format!("table {name} is defined twice")));
        }

        let mut table = Table::new(schema, name);
        let mut drafts = Vec::new();
        let body_tokens = tokenize(&body, self.engine, line)?;
        for element in split_top_level(&body_tokens) {
            table_element(&mut table, element, &body, self.engine, line, &mut drafts)?;
        }

        self.tables.push(table);
        let index = self.tables.len() - 1;
        self.queue_foreign_keys(index, line, drafts);
        Ok(())
    }

    fn alter_table(&mut self, rest: &str, line: usize) -> Result<(), ImportError> {
        let tokens = tokenize(rest, self.engine, line)?;
        let mut pos = 0;
        let (schema, name) = qualified_name(&tokens, &mut pos)
            .ok_or_else(|| ImportError::new(line, "ALTER TABLE without a table name"))?;
        let Some(index) = self.resolve_table(schema.as_deref(), &name, None) else {
            // sequences and other relations also go through ALTER TABLE
            tracing::debug!(relation = %name, "ignoring ALTER TABLE on an unknown relation");
            return Ok(());
        };

        let engine = self.engine;
        let mut drafts = Vec::new();
        for action in split_top_level(&tokens[pos..]) {
            let Some(first) = action.first() else {
                continue;
            };
            if first.is_word("ADD") {
                let mut element = &action[1..];
                if element.first().is_some_and(|t| t.is_word("COLUMN")) {
                    element = &element[1..];
                    if element.len() > 3 && element[0].is_word("IF") && element[1].is_word("NOT") {
                        element = &element[3..];
                    }
                }
                table_element(
                    &mut self.tables[index],
                    element,
                    rest,
                    engine,
                    line,
                    &mut drafts,
                )?;
            } else if first.is_word("ALTER") {
                alter_column(&mut self.tables[index], &action[1..], rest);
            }
        }

        self.queue_foreign_keys(index, line, drafts);
        Ok(())
    }

    fn create_index(&mut self, rest: &str, unique: bool, line: usize) -> Result<(), ImportError> {
        let tokens = tokenize(rest, self.engine, line)?;
        let mut pos = 0;
        let mut name = None;
        if !tokens.first().is_some_and(|t| t.is_word("ON")) {
            name = tokens.first().and_then(Token::ident).map(str::to_string);
            pos = 1;
        }
        if !tokens.get(pos).is_some_and(|t| t.is_word("ON")) {
            return Err(ImportError::new(line, "CREATE INDEX without ON <table>"));
        }
        pos += 1;
        if tokens.get(pos).is_some_and(|t| t.is_word("ONLY")) {
            pos += 1;
        }
        let (schema, table_name) = qualified_name(&tokens, &mut pos)
            .ok_or_else(|| ImportError::new(line, "CREATE INDEX without a table name"))?;
        let group = tokens[pos..]
            .iter()
            .find(|t| t.kind == Kind::Group)
            .ok_or_else(|| ImportError::new(line, "CREATE INDEX without a column list"))?;
        let columns = column_list(&group.value, self.engine, line)?;

        let Some(index) = self.resolve_table(schema.as_deref(), &table_name, None) else {
            tracing::debug!(table = %table_name, "ignoring index on an unknown table");
            return Ok(());
        };
        self.tables[index].indexes.push(Index {
            name,
            columns,
            unique,
        });
        Ok(())
    }

    fn queue_foreign_keys(&mut self, table: usize, line: usize, drafts: Vec<ForeignKeyDraft>) {
        self.foreign_keys.extend(
            drafts
                .into_iter()
                .map(|draft| PendingForeignKey { table, line, draft }),
        );
    }

    fn find_exact(&self, schema: Option<&str>, name: &str) -> Option<usize> {
        self.tables.iter().position(|table| {
            table.name.eq_ignore_ascii_case(name)
                && match (table.schema.as_deref(), schema) {
                    (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                    (None, None) => true,
                    _ => false,
                }
        })
    }

    /// Finds a table by name. An explicit schema must match; without one
    /// a table in `prefer_schema` wins over other namespaces.
    fn resolve_table(
        &self,
        schema: Option<&str>,
        name: &str,
        prefer_schema: Option<&str>,
    ) -> Option<usize> {
        if schema.is_some() {
            if let Some(index) = self.find_exact(schema, name) {
                return Some(index);
            }
        }
        let candidates: Vec<usize> = self
            .tables
            .iter()
            .enumerate()
            .filter(|(_, table)| table.name.eq_ignore_ascii_case(name))
            .filter(|(_, table)| match (schema, table.schema.as_deref()) {
                (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
                _ => true,
            })
            .map(|(index, _)| index)
            .collect();
        candidates
            .iter()
            .copied()
            .find(|&index| {
                match (self.tables[index].schema.as_deref(), prefer_schema) {
                    (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                    _ => false,
                }
            })
            .or_else(|| candidates.first().copied())
    }
}

/// One comma-separated element of a table body or an `ALTER TABLE ... ADD`.
fn table_element(
    table: &mut Table,
    tokens: &[Token],
    src: &str,
    engine: Engine,
    line: usize,
    drafts: &mut Vec<ForeignKeyDraft>,
) -> Result<(), ImportError> {
    let Some(first) = tokens.first() else {
        return Ok(());
    };

    let mut pos = 0;
    let mut constraint_name = None;
    if first.is_word("CONSTRAINT") {
        constraint_name = tokens.get(1).and_then(Token::ident).map(str::to_string);
        pos = 2;
    }

    let head = tokens.get(pos).and_then(Token::keyword);
    let next = tokens.get(pos + 1);
    match head.as_deref() {
        Some("PRIMARY") => {
            let group = first_group(&tokens[pos..])
                .ok_or_else(|| ImportError::new(line, "PRIMARY KEY without a column list"))?;
            let columns = column_list(&group.value, engine, line)?;
            table.set_primary_key(&columns);
        }
        Some("UNIQUE") => {
            let rest = &tokens[pos + 1..];
            let group = first_group(rest)
                .ok_or_else(|| ImportError::new(line, "UNIQUE without a column list"))?;
            let columns = column_list(&group.value, engine, line)?;
            let name = index_name(rest).or(constraint_name);
            if let [single] = columns.as_slice() {
                if let Some(column) = table.column_mut(single) {
                    column.unique = true;
                }
            }
            table.indexes.push(Index {
                name,
                columns,
                unique: true,
            });
        }
        Some("FOREIGN") => {
            let draft = foreign_key(&tokens[pos + 1..], constraint_name, engine, line)?;
            drafts.push(draft);
        }
        // unreserved in PostgreSQL, so there they may be bare column names
        Some("KEY" | "INDEX" | "FULLTEXT" | "SPATIAL")
            if engine == Engine::Mysql && constraint_name.is_none() =>
        {
            let rest = &tokens[pos + 1..];
            let group = first_group(rest)
                .ok_or_else(|| ImportError::new(line, "index without a column list"))?;
            table.indexes.push(Index {
                name: index_name(rest),
                columns: column_list(&group.value, engine, line)?,
                unique: false,
            });
        }
        Some("CHECK") => {}
        Some("EXCLUDE") if next.is_some_and(|t| t.kind == Kind::Group || t.is_word("USING")) => {}
        Some("LIKE") if next.is_some_and(|t| t.ident().is_some()) => {}
        Some("PERIOD") if next.is_some_and(|t| t.is_word("FOR")) => {}
        _ if constraint_name.is_some() => {}
        _ => column_definition(table, tokens, src, engine, line, drafts)?,
    }
    Ok(())
}

fn column_definition(
    table: &mut Table,
    tokens: &[Token],
    src: &str,
    engine: Engine,
    line: usize,
    drafts: &mut Vec<ForeignKeyDraft>,
) -> Result<(), ImportError> {
    let name = tokens[0].ident().ok_or_else(|| {
        ImportError::new(
            line,
            format!("unexpected '{}' in table {}", tokens[0].value, table.name),
        )
    })?;
    let name = name.to_string();

    let mut i = 1;
    while i < tokens.len() && !ends_type(tokens, i) {
        i += 1;
    }
    if i == 1 {
        return Err(ImportError::new(
            line,
            format!("column {name} in table {} has no data type", table.name),
        ));
    }
    let data_type = raw_text(src, &tokens[1..i]);
    let base_type = data_type
        .split(['(', ' '])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    let mut column = Column {
        name: name.clone(),
        data_type,
        nullable: true,
        primary_key: false,
        unique: false,
        auto_increment: SERIAL_TYPES.contains(&base_type.as_str()),
        default: None,
    };

    let mut constraint_name = None;
    while i < tokens.len() {
        let token = &tokens[i];
        let Some(keyword) = token.keyword() else {
            i += 1;
            continue;
        };
        match keyword.as_str() {
            "NOT" if tokens.get(i + 1).is_some_and(|t| t.is_word("NULL")) => {
                column.nullable = false;
                i += 2;
            }
            "DEFAULT" => {
                let start = i + 1;
                let mut end = (start + 1).min(tokens.len());
                while end < tokens.len() && !ends_type(tokens, end) {
                    end += 1;
                }
                if start < end {
                    let default = raw_text(src, &tokens[start..end]);
                    column.auto_increment |= default.to_ascii_lowercase().starts_with("nextval(");
                    column.default = Some(default);
                }
                i = end;
            }
            "PRIMARY" => {
                column.primary_key = true;
                i += 1;
            }
            "UNIQUE" => {
                column.unique = true;
                i += 1;
            }
            "AUTO_INCREMENT" | "AUTOINCREMENT" | "IDENTITY" => {
                column.auto_increment = true;
                i += 1;
            }
            "CONSTRAINT" => {
                constraint_name = tokens.get(i + 1).and_then(Token::ident).map(str::to_string);
                i += 2;
            }
            "REFERENCES" => {
                let mut pos = i + 1;
                let (ref_schema, ref_table) = qualified_name(tokens, &mut pos).ok_or_else(|| {
                    ImportError::new(line, format!("REFERENCES without a table on column {name}"))
                })?;
                let mut ref_columns = Vec::new();
                if let Some(group) = tokens.get(pos).filter(|t| t.kind == Kind::Group) {
                    ref_columns = column_list(&group.value, engine, line)?;
                    pos += 1;
                }
                drafts.push(ForeignKeyDraft {
                    name: constraint_name.take(),
                    columns: vec![name.clone()],
                    ref_schema,
                    ref_table,
                    ref_columns,
                });
                i = pos;
            }
            "CHECK" | "COMMENT" | "COLLATE" | "SRID" => i += 2,
            _ => i += 1,
        }
    }

    let primary_key = column.primary_key;
    table.columns.push(column);
    if primary_key {
        table.set_primary_key(&[name]);
    }
    Ok(())
}

/// `ALTER [COLUMN] name SET DEFAULT ... | SET NOT NULL | ADD GENERATED ... IDENTITY`
fn alter_column(table: &mut Table, tokens: &[Token], src: &str) {
    let mut pos = 0;
    if tokens.first().is_some_and(|t| t.is_word("COLUMN")) {
        pos = 1;
    }
    let Some(name) = tokens.get(pos).and_then(Token::ident) else {
        return;
    };
    let Some(column) = table.column_mut(name) else {
        return;
    };
    let rest = &tokens[pos + 1..];

    if rest.len() > 2 && rest[0].is_word("SET") && rest[1].is_word("DEFAULT") {
        let default = raw_text(src, &rest[2..]);
        column.auto_increment |= default.to_ascii_lowercase().starts_with("nextval(");
        column.default = Some(default);
    } else if rest.len() >= 3
        && rest[0].is_word("SET")
        && rest[1].is_word("NOT")
        && rest[2].is_word("NULL")
    {
        column.nullable = false;
    } else if rest.iter().any(|t| t.is_word("IDENTITY")) {
        column.auto_increment = true;
    }
}

/// `[KEY] [name] (cols) REFERENCES table [(cols)] ...`, starting after FOREIGN.
fn foreign_key(
    tokens: &[Token],
    constraint_name: Option<String>,
    engine: Engine,
    line: usize,
) -> Result<ForeignKeyDraft, ImportError> {
    let malformed = || ImportError::new(line, "malformed FOREIGN KEY constraint");

    let mut pos = 0;
    if !tokens.first().is_some_and(|t| t.is_word("KEY")) {
        return Err(malformed());
    }
    pos += 1;
    let mut name = constraint_name;
    if let Some(ident) = tokens.get(pos).and_then(Token::ident) {
        name = name.or_else(|| Some(ident.to_string()));
        pos += 1;
    }
    let columns = match tokens.get(pos) {
        Some(group) if group.kind == Kind::Group => column_list(&group.value, engine, line)?,
        _ => return Err(malformed()),
    };
    pos += 1;
    if !tokens.get(pos).is_some_and(|t| t.is_word("REFERENCES")) {
        return Err(malformed());
    }
    pos += 1;
    let (ref_schema, ref_table) = qualified_name(tokens, &mut pos).ok_or_else(malformed)?;
    let ref_columns = match tokens.get(pos) {
        Some(group) if group.kind == Kind::Group => column_list(&group.value, engine, line)?,
        _ => Vec::new(),
    };

    Ok(ForeignKeyDraft {
        name,
        columns,
        ref_schema,
        ref_table,
        ref_columns,
    })
}

fn ends_type(tokens: &[Token], i: usize) -> bool {
    let token = &tokens[i];
    if token.kind != Kind::Word {
        return false;
    }
    if token.is_word("CHARACTER") {
        return tokens.get(i + 1).is_some_and(|t| t.is_word("SET"));
    }
    TYPE_TERMINATORS
        .iter()
        .any(|word| token.value.eq_ignore_ascii_case(word))
}

fn first_group(tokens: &[Token]) -> Option<&Token> {
    tokens.iter().find(|t| t.kind == Kind::Group)
}

/// Identifier between the index keywords and the column list, if any.
fn index_name(tokens: &[Token]) -> Option<String> {
    tokens
        .iter()
        .take_while(|t| t.kind != Kind::Group)
        .filter(|t| !(t.is_word("KEY") || t.is_word("INDEX") || t.is_word("USING")))
        .find_map(Token::ident)
        .map(str::to_string)
}

/// `a, "b", c(10), (lower(d)) DESC` → `["a", "b", "c", "(lower(d))"]`
fn column_list(inner: &str, engine: Engine, line: usize) -> Result<Vec<String>, ImportError> {
    let tokens = tokenize(inner, engine, line)?;
    Ok(split_top_level(&tokens)
        .into_iter()
        .filter_map(|part| {
            let first = part.first()?;
            match first.kind {
                Kind::Word | Kind::Quoted => Some(first.value.clone()),
                _ => Some(raw_text(inner, part)),
            }
        })
        .collect())
}

/// `name`, `schema.name` or `db.schema.name`; advances `pos` past it.
fn qualified_name(tokens: &[Token], pos: &mut usize) -> Option<(Option<String>, String)> {
    let mut parts = vec![tokens.get(*pos)?.ident()?.to_string()];
    *pos += 1;
    while tokens
        .get(*pos)
        .is_some_and(|t| t.kind == Kind::Symbol && t.value == ".")
    {
        let Some(part) = tokens.get(*pos + 1).and_then(Token::ident) else {
            break;
        };
        parts.push(part.to_string());
        *pos += 2;
    }
    let name = parts.pop()?;
    Some((parts.pop(), name))
}

fn split_top_level(tokens: &[Token]) -> Vec<&[Token]> {
    tokens
        .split(|t| t.kind == Kind::Symbol && t.value == ",")
        .filter(|part| !part.is_empty())
        .collect()
}

fn raw_text(src: &str, tokens: &[Token]) -> String {
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => src[first.start..last.end]
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(40) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

/// Backslash escapes only exist in MySQL string literals; PostgreSQL dumps
/// run with `standard_conforming_strings` on.
fn tokenize(src: &str, engine: Engine, line: usize) -> Result<Vec<Token>, ImportError> {
    let backslash_escapes = engine == Engine::Mysql;
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let start = i;
        let token = match b {
            b'"' | b'`' => {
                let end = closing_quote(bytes, i, b, false)
                    .ok_or_else(|| ImportError::new(line, "unterminated quoted identifier"))?;
                let doubled = [b as char, b as char].iter().collect::<String>();
                let value = src[start + 1..end].replace(&doubled, &(b as char).to_string());
                i = end + 1;
                Token {
                    kind: Kind::Quoted,
                    value,
                    start,
                    end: i,
                }
            }
            b'\'' => {
                let end = closing_quote(bytes, i, b'\'', backslash_escapes)
                    .ok_or_else(|| ImportError::new(line, "unterminated string literal"))?;
                i = end + 1;
                Token {
                    kind: Kind::Str,
                    value: src[start..i].to_string(),
                    start,
                    end: i,
                }
            }
            b'(' => {
                let end = closing_paren(bytes, i, backslash_escapes)
                    .ok_or_else(|| ImportError::new(line, "unbalanced parentheses"))?;
                i = end + 1;
                Token {
                    kind: Kind::Group,
                    value: src[start + 1..end].to_string(),
                    start,
                    end: i,
                }
            }
            b')' => return Err(ImportError::new(line, "unbalanced parentheses")),
            _ if is_word_byte(b) => {
                while i < bytes.len() && is_word_byte(bytes[i]) {
                    i += 1;
                }
                Token {
                    kind: Kind::Word,
                    value: src[start..i].to_string(),
                    start,
                    end: i,
                }
            }
            _ => {
                let ch = src[i..].chars().next().unwrap_or(' ');
                i += ch.len_utf8();
                Token {
                    kind: Kind::Symbol,
                    value: ch.to_string(),
                    start,
                    end: i,
                }
            }
        };
        tokens.push(token);
    }

    Ok(tokens)
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

fn closing_quote(bytes: &[u8], open: usize, quote: u8, backslash_escapes: bool) -> Option<usize> {
    let mut i = open + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if backslash_escapes && b == b'\\' {
            i += 2;
            continue;
        }
        if b == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return Some(i);
        }
        i += 1;
    }
    None
}

fn closing_paren(bytes: &[u8], open: usize, backslash_escapes: bool) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            quote @ (b'\'' | b'"' | b'`') => {
                i = closing_quote(bytes, i, quote, backslash_escapes && quote == b'\'')?;
            }
            _ => {}
        }
        i += 1;
    }
    None
}
