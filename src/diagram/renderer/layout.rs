//! Layered placement of entity boxes.
//!
//! Referenced tables sit in columns to the left of the tables that point
//! at them. Within a column boxes are stacked top to bottom by name.

use std::collections::BTreeMap;

use crate::diagram::schema::{Relationship, SchemaDescription, Table};

use super::RenderError;

pub const MARGIN: i64 = 40;
pub const HEADER_HEIGHT: i64 = 30;
pub const ROW_HEIGHT: i64 = 22;
pub const CHAR_WIDTH: i64 = 7;
pub const MIN_BOX_WIDTH: i64 = 160;
const BOX_PADDING: i64 = 16;
const MARKER_WIDTH: i64 = 28;
const LAYER_GAP: i64 = 120;
const BOX_GAP: i64 = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityBox {
    /// Index into `SchemaDescription::tables`.
    pub table: usize,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
    pub name_width: i64,
}

impl EntityBox {
    pub fn right(&self) -> i64 {
        self.x + self.width
    }

    /// Vertical centre of a column row, or of the header without one.
    pub fn anchor_y(&self, row: Option<usize>) -> i64 {
        match row {
            Some(row) => self.y + HEADER_HEIGHT + row as i64 * ROW_HEIGHT + ROW_HEIGHT / 2,
            None => self.y + HEADER_HEIGHT / 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    /// Boxes in drawing order: by layer, then by display name.
    pub boxes: Vec<EntityBox>,
    /// One per relationship, in declaration order.
    pub edges: Vec<Edge>,
    pub width: i64,
    pub height: i64,
}

impl Layout {
    pub fn compute(schema: &SchemaDescription) -> Result<Self, RenderError> {
        let names = index_by_name(schema)?;
        let edges = resolve_edges(schema, &names)?;
        let depths = layer_depths(schema.tables.len(), &edges);

        let mut layers: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (table, depth) in depths.iter().enumerate() {
            layers.entry(*depth).or_default().push(table);
        }

        let mut boxes = Vec::with_capacity(schema.tables.len());
        let mut x = MARGIN;
        let mut height = 0;
        for members in layers.values_mut() {
            members.sort_by_key(|&table| schema.tables[table].display_name().to_lowercase());

            let mut y = MARGIN;
            let mut layer_width = 0;
            for &table in members.iter() {
                let (width, name_width) = box_width(&schema.tables[table]);
                let rows = schema.tables[table].columns.len().max(1) as i64;
                let box_height = HEADER_HEIGHT + rows * ROW_HEIGHT;
                boxes.push(EntityBox {
                    table,
                    x,
                    y,
                    width,
                    height: box_height,
                    name_width,
                });
                y += box_height + BOX_GAP;
                layer_width = layer_width.max(width);
            }
            height = height.max(y - BOX_GAP);
            x += layer_width + LAYER_GAP;
        }

        if boxes.is_empty() {
            return Ok(Self {
                boxes,
                edges,
                width: 2 * MARGIN + MIN_BOX_WIDTH * 2,
                height: 2 * MARGIN + HEADER_HEIGHT,
            });
        }

        Ok(Self {
            boxes,
            edges,
            // room on the right for self-reference loops
            width: x - LAYER_GAP + MARGIN + LAYER_GAP / 2,
            height: height + MARGIN,
        })
    }

    pub fn entity(&self, table: usize) -> Option<&EntityBox> {
        self.boxes.iter().find(|entity| entity.table == table)
    }
}

/// Display name → table index. Names must be unique.
pub fn index_by_name(schema: &SchemaDescription) -> Result<BTreeMap<String, usize>, RenderError> {
    let mut names = BTreeMap::new();
    for (index, table) in schema.tables.iter().enumerate() {
        let name = table.display_name();
        if names.insert(name.to_lowercase(), index).is_some() {
            return Err(RenderError::DuplicateTable(name));
        }
    }
    Ok(names)
}

/// A relationship with both ends resolved to table and row indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: usize,
    pub from_row: Option<usize>,
    pub to: usize,
    pub to_row: Option<usize>,
}

pub fn resolve_edges(
    schema: &SchemaDescription,
    names: &BTreeMap<String, usize>,
) -> Result<Vec<Edge>, RenderError> {
    schema
        .relationships
        .iter()
        .map(|rel| {
            let from = lookup_table(rel, &rel.from_table, names)?;
            let to = lookup_table(rel, &rel.to_table, names)?;
            Ok(Edge {
                from,
                from_row: lookup_row(rel, &schema.tables[from], &rel.from_columns)?,
                to,
                to_row: lookup_row(rel, &schema.tables[to], &rel.to_columns)?,
            })
        })
        .collect()
}

fn lookup_table(
    rel: &Relationship,
    table: &str,
    names: &BTreeMap<String, usize>,
) -> Result<usize, RenderError> {
    names
        .get(&table.to_lowercase())
        .copied()
        .ok_or_else(|| RenderError::UnknownTable {
            relationship: relationship_label(rel),
            table: table.to_string(),
        })
}

/// Every named column must exist; the edge anchors on the first one.
fn lookup_row(
    rel: &Relationship,
    table: &Table,
    columns: &[String],
) -> Result<Option<usize>, RenderError> {
    let mut first = None;
    for column in columns {
        let row = table
            .column_index(column)
            .ok_or_else(|| RenderError::UnknownColumn {
                relationship: relationship_label(rel),
                table: table.display_name(),
                column: column.clone(),
            })?;
        first.get_or_insert(row);
    }
    Ok(first)
}

fn relationship_label(rel: &Relationship) -> String {
    rel.name
        .clone()
        .unwrap_or_else(|| format!("{} -> {}", rel.from_table, rel.to_table))
}

/// Longest foreign-key chain below each table. Relaxation stops after one
/// pass per table, so cycles settle instead of growing.
fn layer_depths(tables: usize, edges: &[Edge]) -> Vec<usize> {
    let mut depths = vec![0usize; tables];
    let cap = tables.saturating_sub(1);
    for _ in 0..tables {
        let mut changed = false;
        for edge in edges.iter().filter(|edge| edge.from != edge.to) {
            let wanted = (depths[edge.to] + 1).min(cap);
            if depths[edge.from] < wanted {
                depths[edge.from] = wanted;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    depths
}

/// Box width and the width reserved for column names.
fn box_width(table: &Table) -> (i64, i64) {
    let title = table.display_name().chars().count() as i64;
    let name_chars = table
        .columns
        .iter()
        .map(|column| column.name.chars().count() as i64)
        .max()
        .unwrap_or(0);
    let type_chars = table
        .columns
        .iter()
        .map(|column| column.data_type.chars().count() as i64)
        .max()
        .unwrap_or(0);

    let name_width = name_chars * CHAR_WIDTH + BOX_PADDING;
    let rows_width = MARKER_WIDTH + name_width + type_chars * CHAR_WIDTH + BOX_PADDING;
    let title_width = title * CHAR_WIDTH + 2 * BOX_PADDING;
    (rows_width.max(title_width).max(MIN_BOX_WIDTH), name_width)
}
