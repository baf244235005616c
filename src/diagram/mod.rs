//! Schema diagram generation: dump a live database, import its DDL and
//! render an entity-relationship diagram.

pub mod dump;
pub mod engine;
pub mod importer;
pub mod pipeline;
pub mod renderer;
pub mod schema;

pub use dump::{ConnectionParams, DumpCommand, DumpError, DumpRunner, ProcessDumpRunner};
pub use engine::{CommandError, Engine, EngineRegistry, UnsupportedEngine};
pub use importer::{ImportError, SchemaImporter, SqlImporter};
pub use pipeline::{Diagram, DiagramError, DiagramPipeline, DiagramRequest};
pub use renderer::{DiagramRenderer, OutputFormat, RenderError, SvgRenderer};
pub use schema::SchemaDescription;
