use std::fmt::Write;

use crate::diagram::schema::{Cardinality, SchemaDescription, Table};

use super::layout::{CHAR_WIDTH, EntityBox, HEADER_HEIGHT, Layout, MARGIN, ROW_HEIGHT};

const FONT_FAMILY: &str = "Menlo, Consolas, 'DejaVu Sans Mono', monospace";
const LOOP_REACH: i64 = 40;
const EMPTY_CAPTION: &str = "No tables found in schema";

const STYLE: &str = "\
.entity .body { fill: #ffffff; stroke: #4a5568; stroke-width: 1; }
.entity .header { fill: #2b6cb0; }
.entity .title { fill: #ffffff; font-weight: bold; }
.entity .name { fill: #1a202c; }
.entity .type { fill: #718096; }
.entity .marker { fill: #c05621; font-size: 10px; }
.entity .divider { stroke: #e2e8f0; }
.relationship { fill: none; stroke: #4a5568; stroke-width: 1.5; }
.caption { fill: #718096; }";

/// Builds the document as a string; the same schema and layout always
/// produce the same bytes.
pub fn to_svg(schema: &SchemaDescription, layout: &Layout) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" font-family=\"{FONT_FAMILY}\" font-size=\"12\">",
        w = layout.width,
        h = layout.height,
    );
    out.push_str("  <defs>\n");
    out.push_str(
        "    <marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"8\" markerHeight=\"8\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"#4a5568\"/></marker>\n",
    );
    out.push_str(
        "    <marker id=\"bar\" viewBox=\"0 0 10 10\" refX=\"2\" refY=\"5\" markerWidth=\"8\" markerHeight=\"8\" orient=\"auto\"><path d=\"M 2 0 L 2 10\" stroke=\"#4a5568\" stroke-width=\"2\"/></marker>\n",
    );
    out.push_str("  </defs>\n");
    let _ = writeln!(out, "  <style>\n{STYLE}\n  </style>");
    out.push_str("  <rect width=\"100%\" height=\"100%\" fill=\"#f7fafc\"/>\n");

    if layout.boxes.is_empty() {
        let _ = writeln!(
            out,
            "  <text class=\"caption\" x=\"{}\" y=\"{}\">{EMPTY_CAPTION}</text>",
            MARGIN,
            MARGIN + HEADER_HEIGHT / 2
        );
    }

    for entity in &layout.boxes {
        write_entity(&mut out, schema, &schema.tables[entity.table], entity);
    }

    for (rel, edge) in schema.relationships.iter().zip(&layout.edges) {
        let (Some(from), Some(to)) = (layout.entity(edge.from), layout.entity(edge.to)) else {
            continue;
        };
        let y1 = from.anchor_y(edge.from_row);
        let y2 = to.anchor_y(edge.to_row);
        let self_ref = edge.from == edge.to;
        let d = edge_path(from, y1, to, y2);
        let cardinality = match rel.cardinality {
            Cardinality::ManyToOne => "many-to-one",
            Cardinality::OneToOne => "one-to-one",
        };
        let start_marker = match rel.cardinality {
            Cardinality::OneToOne => " marker-start=\"url(#bar)\"",
            Cardinality::ManyToOne => "",
        };
        let _ = writeln!(
            out,
            "  <path class=\"relationship\" data-from=\"{}\" data-to=\"{}\" data-cardinality=\"{cardinality}\" data-self=\"{self_ref}\" d=\"{d}\"{start_marker} marker-end=\"url(#arrow)\"><title>{}.{} -&gt; {}.{}</title></path>",
            escape_xml(&rel.from_table),
            escape_xml(&rel.to_table),
            escape_xml(&rel.from_table),
            escape_xml(&rel.from_columns.join(", ")),
            escape_xml(&rel.to_table),
            escape_xml(&rel.to_columns.join(", ")),
        );
    }

    out.push_str("</svg>\n");
    out
}

fn write_entity(out: &mut String, schema: &SchemaDescription, table: &Table, entity: &EntityBox) {
    let name = table.display_name();
    let EntityBox {
        x,
        y,
        width,
        height,
        name_width,
        ..
    } = *entity;

    let _ = writeln!(
        out,
        "  <g class=\"entity\" data-table=\"{}\">",
        escape_xml(&name)
    );
    let _ = writeln!(
        out,
        "    <rect class=\"body\" x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" rx=\"4\"/>"
    );
    let _ = writeln!(
        out,
        "    <rect class=\"header\" x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{HEADER_HEIGHT}\" rx=\"4\"/>"
    );
    let _ = writeln!(
        out,
        "    <text class=\"title\" x=\"{}\" y=\"{}\">{}</text>",
        x + width / 2 - (name.chars().count() as i64 * CHAR_WIDTH) / 2,
        y + HEADER_HEIGHT / 2 + 4,
        escape_xml(&name)
    );

    for (row, column) in table.columns.iter().enumerate() {
        let row_top = y + HEADER_HEIGHT + row as i64 * ROW_HEIGHT;
        let baseline = row_top + ROW_HEIGHT / 2 + 4;
        if row > 0 {
            let _ = writeln!(
                out,
                "    <line class=\"divider\" x1=\"{x}\" y1=\"{row_top}\" x2=\"{}\" y2=\"{row_top}\"/>",
                x + width
            );
        }

        let mut markers = Vec::new();
        if column.primary_key {
            markers.push("PK");
        }
        if schema.is_foreign_key_column(&name, &column.name) {
            markers.push("FK");
        }
        if markers.is_empty() && !column.nullable {
            markers.push("NN");
        }
        if !markers.is_empty() {
            let _ = writeln!(
                out,
                "    <text class=\"marker\" x=\"{}\" y=\"{baseline}\">{}</text>",
                x + 6,
                markers.join(" ")
            );
        }
        let _ = writeln!(
            out,
            "    <text class=\"name\" x=\"{}\" y=\"{baseline}\">{}</text>",
            x + 34,
            escape_xml(&column.name)
        );
        let _ = writeln!(
            out,
            "    <text class=\"type\" x=\"{}\" y=\"{baseline}\">{}</text>",
            x + 34 + name_width,
            escape_xml(&column.data_type)
        );
    }

    out.push_str("  </g>\n");
}

/// Cubic curve between facing box edges. Boxes in the same column are
/// joined on their right edges; a self reference loops out to the right.
fn edge_path(from: &EntityBox, y1: i64, to: &EntityBox, y2: i64) -> String {
    if from.table == to.table {
        let r = from.right();
        return format!(
            "M {r} {y1} C {c} {y1}, {c} {y2}, {r} {y2}",
            c = r + LOOP_REACH
        );
    }
    if from.x >= to.right() {
        let (x1, x2) = (from.x, to.right());
        let mid = (x1 + x2) / 2;
        return format!("M {x1} {y1} C {mid} {y1}, {mid} {y2}, {x2} {y2}");
    }
    if from.right() <= to.x {
        let (x1, x2) = (from.right(), to.x);
        let mid = (x1 + x2) / 2;
        return format!("M {x1} {y1} C {mid} {y1}, {mid} {y2}, {x2} {y2}");
    }
    let (x1, x2) = (from.right(), to.right());
    let c = x1.max(x2) + LOOP_REACH;
    format!("M {x1} {y1} C {c} {y1}, {c} {y2}, {x2} {y2}")
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_all_xml_specials() {
        assert_eq!(escape_xml("<a href=\"x\">'&'</a>"), "&lt;a href=&quot;x&quot;&gt;&apos;&amp;&apos;&lt;/a&gt;");
    }

    #[test]
    fn edges_between_columns_use_facing_sides() {
        let left = EntityBox {
            table: 0,
            x: 40,
            y: 40,
            width: 160,
            height: 74,
            name_width: 50,
        };
        let right = EntityBox {
            table: 1,
            x: 320,
            ..left.clone()
        };

        assert_eq!(edge_path(&right, 90, &left, 80), "M 320 90 C 260 90, 260 80, 200 80");
        assert_eq!(edge_path(&left, 80, &left, 100), "M 200 80 C 240 80, 240 100, 200 100");
    }
}
