//! Dialect-neutral description of tables, columns and relationships.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaDescription {
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    /// Namespace from a qualified name (`public.orders`), if any.
    pub schema: Option<String>,
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: Vec<String>,
    pub indexes: Vec<Index>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub auto_increment: bool,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Index {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    #[default]
    ManyToOne,
    OneToOne,
}

/// Foreign key from `from_table(from_columns)` to `to_table(to_columns)`.
/// Table names are display names, see [`Table::display_name`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    pub name: Option<String>,
    pub from_table: String,
    pub from_columns: Vec<String>,
    pub to_table: String,
    pub to_columns: Vec<String>,
    pub cardinality: Cardinality,
}

impl Table {
    pub fn new(schema: Option<String>, name: impl Into<String>) -> Self {
        Self {
            schema,
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// `schema.name`, except for the default `public` namespace.
    pub fn display_name(&self) -> String {
        match self.schema.as_deref() {
            Some(schema) if !schema.eq_ignore_ascii_case("public") => {
                format!("{schema}.{}", self.name)
            }
            _ => self.name.clone(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(name))
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns
            .iter_mut()
            .find(|column| column.name.eq_ignore_ascii_case(name))
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.name.eq_ignore_ascii_case(name))
    }

    pub fn set_primary_key(&mut self, columns: &[String]) {
        for name in columns {
            if let Some(column) = self.column_mut(name) {
                column.primary_key = true;
                column.nullable = false;
            }
            if !self
                .primary_key
                .iter()
                .any(|existing| existing.eq_ignore_ascii_case(name))
            {
                self.primary_key.push(name.clone());
            }
        }
    }

    /// True when `columns` is exactly the primary key or a unique key.
    pub fn is_unique_key(&self, columns: &[String]) -> bool {
        if same_columns(&self.primary_key, columns) {
            return true;
        }
        if let [single] = columns {
            if self.column(single).is_some_and(|column| column.unique) {
                return true;
            }
        }
        self.indexes
            .iter()
            .any(|index| index.unique && same_columns(&index.columns, columns))
    }
}

impl SchemaDescription {
    pub fn table(&self, display_name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|table| table.display_name().eq_ignore_ascii_case(display_name))
    }

    pub fn is_foreign_key_column(&self, table: &str, column: &str) -> bool {
        self.relationships.iter().any(|rel| {
            rel.from_table.eq_ignore_ascii_case(table)
                && rel
                    .from_columns
                    .iter()
                    .any(|name| name.eq_ignore_ascii_case(column))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

fn same_columns(left: &[String], right: &[String]) -> bool {
    !left.is_empty()
        && left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
}
