mod layout;
mod svg;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::schema::SchemaDescription;

pub use layout::{EntityBox, Layout};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Svg,
}

impl OutputFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::Svg => "image/svg+xml",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Svg => f.write_str("svg"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(OutputFormat::Svg),
            other => Err(RenderError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("unsupported output format '{0}'")]
    UnsupportedFormat(String),
    #[error("two tables share the name {0}")]
    DuplicateTable(String),
    #[error("relationship {relationship} references unknown table {table}")]
    UnknownTable { relationship: String, table: String },
    #[error("relationship {relationship} references unknown column {table}.{column}")]
    UnknownColumn {
        relationship: String,
        table: String,
        column: String,
    },
}

/// Capability that draws a schema description as a document.
pub trait DiagramRenderer: Send + Sync {
    fn render(
        &self,
        schema: &SchemaDescription,
        format: OutputFormat,
    ) -> Result<String, RenderError>;
}

/// Entity-relationship diagram as a standalone SVG document.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgRenderer;

impl DiagramRenderer for SvgRenderer {
    fn render(
        &self,
        schema: &SchemaDescription,
        format: OutputFormat,
    ) -> Result<String, RenderError> {
        match format {
            OutputFormat::Svg => {
                let layout = Layout::compute(schema)?;
                Ok(svg::to_svg(schema, &layout))
            }
        }
    }
}
