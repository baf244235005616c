use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use tracing::Instrument;
use uuid::Uuid;

use super::{
    dump::{ConnectionParams, DumpError, DumpRunner, REDACTED},
    engine::{CommandError, EngineRegistry},
    importer::SchemaImporter,
    renderer::{DiagramRenderer, OutputFormat},
};

const DUMP_HINT: &str =
    "verify credentials, host and port, and that the dump tool is installed on the server";

/// Connection parameters as submitted by a client. The engine stays text
/// until the registry has accepted it.
#[derive(Clone, Deserialize)]
pub struct DiagramRequest {
    pub engine: String,
    #[serde(default)]
    pub host: String,
    #[serde(default, deserialize_with = "deserialize_port")]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: String,
    #[serde(default, deserialize_with = "deserialize_password")]
    pub password: String,
    #[serde(default, alias = "dbname")]
    pub database_name: String,
    #[serde(default)]
    pub format: OutputFormat,
}

impl fmt::Debug for DiagramRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagramRequest")
            .field("engine", &self.engine)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &REDACTED)
            .field("database_name", &self.database_name)
            .field("format", &self.format)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagram {
    pub document: String,
    pub format: OutputFormat,
    pub tables: usize,
    pub relationships: usize,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiagramError {
    #[error("unsupported engine '{engine}'")]
    UnsupportedEngine { engine: String, supported: Vec<String> },
    #[error("dump failed: {details}")]
    DumpFailed { details: String, hint: String },
    #[error("schema conversion failed: {details}")]
    ImportFailed { details: String },
    #[error("render failed: {details}")]
    RenderFailed { details: String },
}

impl DiagramError {
    /// Short, stable category label shown to clients.
    pub fn category(&self) -> &'static str {
        match self {
            DiagramError::UnsupportedEngine { .. } => "unsupported engine",
            DiagramError::DumpFailed { .. } => "dump failed",
            DiagramError::ImportFailed { .. } => "schema conversion failed",
            DiagramError::RenderFailed { .. } => "render failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Received,
    Dumped,
    Imported,
    Rendered,
}

/// Dump → import → render, one linear pass per request.
#[derive(Clone)]
pub struct DiagramPipeline {
    engines: Arc<EngineRegistry>,
    runner: Arc<dyn DumpRunner>,
    importer: Arc<dyn SchemaImporter>,
    renderer: Arc<dyn DiagramRenderer>,
}

impl DiagramPipeline {
    pub fn new(
        engines: Arc<EngineRegistry>,
        runner: Arc<dyn DumpRunner>,
        importer: Arc<dyn SchemaImporter>,
        renderer: Arc<dyn DiagramRenderer>,
    ) -> Self {
        Self {
            engines,
            runner,
            importer,
            renderer,
        }
    }

    pub fn engines(&self) -> &EngineRegistry {
        &self.engines
    }

    pub async fn generate(&self, request: DiagramRequest) -> Result<Diagram, DiagramError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "diagram",
            %request_id,
            engine = %request.engine,
            database = %request.database_name,
        );
        async move {
            let result = self.run_stages(request).await;
            match &result {
                Ok(diagram) => tracing::info!(
                    tables = diagram.tables,
                    relationships = diagram.relationships,
                    bytes = diagram.document.len(),
                    "diagram generated"
                ),
                Err(err @ DiagramError::UnsupportedEngine { .. }) => {
                    tracing::warn!(error = %err, "diagram request rejected")
                }
                Err(err) => tracing::error!(error = %err, "diagram generation failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_stages(&self, request: DiagramRequest) -> Result<Diagram, DiagramError> {
        let mut stage = Stage::Received;
        let unsupported = |raw: &str| DiagramError::UnsupportedEngine {
            engine: raw.to_string(),
            supported: self
                .engines
                .supported()
                .map(|engine| engine.to_string())
                .collect(),
        };

        let engine = self
            .engines
            .resolve(&request.engine)
            .map_err(|err| unsupported(&err.0))?;
        let params = ConnectionParams {
            engine,
            host: request.host,
            port: request.port,
            user: request.user,
            password: request.password,
            database_name: request.database_name,
        };
        let command = self.engines.command_for(&params).map_err(|err| match err {
            CommandError::Unsupported(err) => unsupported(&err.0),
            invalid @ CommandError::OptionLike { .. } => DiagramError::DumpFailed {
                details: invalid.to_string(),
                hint: DUMP_HINT.to_string(),
            },
        })?;
        tracing::debug!(?stage, command = ?command, "running dump");

        let dump = self
            .runner
            .run(&command)
            .await
            .map_err(|err| dump_failed(&err, &params.password))?;
        stage = Stage::Dumped;
        tracing::debug!(?stage, bytes = dump.len(), "dump captured");

        let importer = Arc::clone(&self.importer);
        let schema = tokio::task::spawn_blocking(move || importer.import(&dump, engine))
            .await
            .map_err(|err| DiagramError::ImportFailed {
                details: format!("importer task failed: {err}"),
            })?
            .map_err(|err| DiagramError::ImportFailed {
                details: redact(&err.to_string(), &params.password),
            })?;
        stage = Stage::Imported;
        tracing::debug!(
            ?stage,
            tables = schema.tables.len(),
            relationships = schema.relationships.len(),
            "schema imported"
        );

        let tables = schema.tables.len();
        let relationships = schema.relationships.len();
        let renderer = Arc::clone(&self.renderer);
        let format = request.format;
        let document = tokio::task::spawn_blocking(move || renderer.render(&schema, format))
            .await
            .map_err(|err| DiagramError::RenderFailed {
                details: format!("renderer task failed: {err}"),
            })?
            .map_err(|err| DiagramError::RenderFailed {
                details: redact(&err.to_string(), &params.password),
            })?;
        stage = Stage::Rendered;
        tracing::debug!(?stage, bytes = document.len(), "diagram rendered");

        Ok(Diagram {
            document,
            format,
            tables,
            relationships,
            generated_at: Utc::now(),
        })
    }
}

fn dump_failed(err: &DumpError, password: &str) -> DiagramError {
    DiagramError::DumpFailed {
        details: redact(&err.to_string(), password),
        hint: DUMP_HINT.to_string(),
    }
}

fn redact(text: &str, password: &str) -> String {
    super::dump::redact(text, password)
}

/// Accepts text, numbers and `null`. Type errors never quote the value, so
/// a rejected body cannot echo the password back.
pub fn deserialize_password<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    match Option::<Raw>::deserialize(deserializer) {
        Ok(None) => Ok(String::new()),
        Ok(Some(Raw::Text(text))) => Ok(text),
        Ok(Some(Raw::Number(number))) => Ok(number.to_string()),
        Err(_) => Err(de::Error::custom("password must be a string")),
    }
}

/// Accepts `5432`, `"5432"`, `""` and `null`.
pub fn deserialize_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(port)) => u16::try_from(port)
            .map(Some)
            .map_err(|_| de::Error::custom(format!("port {port} is out of range"))),
        Some(Raw::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Raw::Text(text)) => text
            .trim()
            .parse::<u16>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("port '{text}' is not a number"))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;

    use super::*;
    use crate::diagram::{
        dump::DumpCommand,
        engine::Engine,
        importer::{ImportError, SqlImporter},
        renderer::{RenderError, SvgRenderer},
        schema::SchemaDescription,
    };

    const SHOP_DUMP: &str = "CREATE TABLE public.customers (id integer NOT NULL);\n\
        CREATE TABLE public.orders (id integer NOT NULL, customer_id integer);\n\
        ALTER TABLE ONLY public.customers ADD CONSTRAINT customers_pkey PRIMARY KEY (id);\n\
        ALTER TABLE ONLY public.orders ADD CONSTRAINT orders_customer_id_fkey FOREIGN KEY (customer_id) REFERENCES public.customers(id);\n";

    struct FakeRunner {
        output: Result<String, DumpError>,
        calls: AtomicUsize,
        seen: Mutex<Vec<DumpCommand>>,
    }

    impl FakeRunner {
        fn new(output: Result<String, DumpError>) -> Arc<Self> {
            Arc::new(Self {
                output,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl DumpRunner for FakeRunner {
        async fn run(&self, command: &DumpCommand) -> Result<String, DumpError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().expect("lock").push(command.clone());
            self.output.clone()
        }
    }

    #[derive(Default)]
    struct CountingRenderer {
        calls: AtomicUsize,
    }

    impl DiagramRenderer for CountingRenderer {
        fn render(
            &self,
            schema: &SchemaDescription,
            format: OutputFormat,
        ) -> Result<String, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            SvgRenderer.render(schema, format)
        }
    }

    struct FailingImporter;

    impl SchemaImporter for FailingImporter {
        fn import(&self, _dump: &str, _engine: Engine) -> Result<SchemaDescription, ImportError> {
            Err(ImportError::new(1, "password hunter2 leaked into parser"))
        }
    }

    fn registry() -> Arc<EngineRegistry> {
        Arc::new(EngineRegistry::from_config(&crate::config::DumpConfig::default()))
    }

    fn request(engine: &str) -> DiagramRequest {
        DiagramRequest {
            engine: engine.to_string(),
            host: "localhost".to_string(),
            port: Some(5432),
            user: "root".to_string(),
            password: "hunter2".to_string(),
            database_name: "shop".to_string(),
            format: OutputFormat::Svg,
        }
    }

    fn pipeline(
        runner: Arc<FakeRunner>,
        importer: Arc<dyn SchemaImporter>,
        renderer: Arc<CountingRenderer>,
    ) -> DiagramPipeline {
        DiagramPipeline::new(registry(), runner, importer, renderer)
    }

    #[tokio::test]
    async fn shop_dump_becomes_two_boxes_and_one_edge() {
        let runner = FakeRunner::new(Ok(SHOP_DUMP.to_string()));
        let renderer = Arc::new(CountingRenderer::default());
        let diagram = pipeline(runner.clone(), Arc::new(SqlImporter), renderer.clone())
            .generate(request("postgres"))
            .await
            .expect("diagram");

        assert_eq!(diagram.tables, 2);
        assert_eq!(diagram.relationships, 1);
        assert_eq!(diagram.document.matches("class=\"entity\"").count(), 2);
        assert_eq!(diagram.document.matches("class=\"relationship\"").count(), 1);

        let seen = runner.seen.lock().expect("lock");
        assert_eq!(seen[0].program, "pg_dump");
        assert!(!seen[0].args.iter().any(|arg| arg.contains("hunter2")));
        assert!(seen[0].env.contains(&("PGPASSWORD".to_string(), "hunter2".to_string())));
    }

    #[tokio::test]
    async fn unsupported_engine_never_runs_a_dump() {
        let runner = FakeRunner::new(Ok(String::new()));
        let err = pipeline(runner.clone(), Arc::new(SqlImporter), Arc::default())
            .generate(request("mongodb"))
            .await
            .expect_err("mongodb is unsupported");

        assert_eq!(err.category(), "unsupported engine");
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
        match err {
            DiagramError::UnsupportedEngine { supported, .. } => {
                assert_eq!(supported, vec!["postgres", "mysql"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn dump_failure_is_redacted_and_hinted() {
        let runner = FakeRunner::new(Err(DumpError::Exited {
            program: "pg_dump".to_string(),
            status: "status 1".to_string(),
            stderr: "password authentication failed (tried hunter2)".to_string(),
        }));
        let err = pipeline(runner, Arc::new(SqlImporter), Arc::default())
            .generate(request("postgres"))
            .await
            .expect_err("dump should fail");

        match err {
            DiagramError::DumpFailed { details, hint } => {
                assert!(details.contains("password authentication failed"));
                assert!(!details.contains("hunter2"));
                assert!(hint.contains("verify credentials"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn import_failure_skips_the_renderer() {
        let runner = FakeRunner::new(Ok("not sql at all;".to_string()));
        let renderer = Arc::new(CountingRenderer::default());
        let err = pipeline(runner, Arc::new(SqlImporter), renderer.clone())
            .generate(request("postgres"))
            .await
            .expect_err("import should fail");

        assert_eq!(err.category(), "schema conversion failed");
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn import_details_never_echo_the_password() {
        let runner = FakeRunner::new(Ok(String::new()));
        let err = pipeline(runner, Arc::new(FailingImporter), Arc::default())
            .generate(request("postgres"))
            .await
            .expect_err("importer fails");

        assert!(!err.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn option_like_database_name_never_runs_a_dump() {
        let runner = FakeRunner::new(Ok(SHOP_DUMP.to_string()));
        let mut request = request("mysql");
        request.database_name = "--result-file=/tmp/out.sql".to_string();
        let err = pipeline(runner.clone(), Arc::new(SqlImporter), Arc::default())
            .generate(request)
            .await
            .expect_err("option-like database name");

        assert_eq!(err.category(), "dump failed");
        assert!(err.to_string().contains("database name must not start with '-'"));
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn dump_timeout_is_a_dump_failure() {
        use std::time::Duration;

        use crate::diagram::{
            dump::ProcessDumpRunner,
            engine::{ArgTemplate, DumpCommandTemplate},
        };

        let engines = EngineRegistry::new().with_template(
            Engine::Postgres,
            DumpCommandTemplate {
                program: "sh".to_string(),
                args: vec![ArgTemplate::literal("-c"), ArgTemplate::literal("sleep 30")],
                password_env: "PGPASSWORD".to_string(),
            },
        );
        let renderer = Arc::new(CountingRenderer::default());
        let pipeline = DiagramPipeline::new(
            Arc::new(engines),
            Arc::new(ProcessDumpRunner::new(Duration::from_millis(300), 1024)),
            Arc::new(SqlImporter),
            renderer.clone(),
        );

        let err = pipeline
            .generate(request("postgres"))
            .await
            .expect_err("dump should time out");

        match &err {
            DiagramError::DumpFailed { details, hint } => {
                assert!(details.contains("was terminated"));
                assert!(hint.contains("verify credentials"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn same_request_twice_gives_same_document() {
        let runner = FakeRunner::new(Ok(SHOP_DUMP.to_string()));
        let pipeline = pipeline(runner, Arc::new(SqlImporter), Arc::default());

        let first = pipeline.generate(request("postgres")).await.expect("first");
        let second = pipeline.generate(request("postgres")).await.expect("second");
        assert_eq!(first.document, second.document);
    }

    #[test]
    fn password_accepts_text_and_numbers_without_echoing() {
        let parse = |json: &str| {
            serde_json::from_str::<DiagramRequest>(json).map(|request| request.password)
        };

        assert_eq!(parse(r#"{"engine":"mysql","password":"pw"}"#).expect("text"), "pw");
        assert_eq!(parse(r#"{"engine":"mysql","password":98765432}"#).expect("number"), "98765432");
        assert_eq!(parse(r#"{"engine":"mysql","password":null}"#).expect("null"), "");
        let err = parse(r#"{"engine":"mysql","password":["hunter2"]}"#).expect_err("array");
        assert!(!err.to_string().contains("hunter2"));
    }

    #[test]
    fn port_accepts_numbers_strings_and_blanks() {
        let parse = |json: &str| {
            serde_json::from_str::<DiagramRequest>(json).map(|request| request.port)
        };

        assert_eq!(parse(r#"{"engine":"mysql","port":3306}"#).expect("number"), Some(3306));
        assert_eq!(parse(r#"{"engine":"mysql","port":"3306"}"#).expect("text"), Some(3306));
        assert_eq!(parse(r#"{"engine":"mysql","port":""}"#).expect("blank"), None);
        assert_eq!(parse(r#"{"engine":"mysql","port":null}"#).expect("null"), None);
        assert_eq!(parse(r#"{"engine":"mysql"}"#).expect("missing"), None);
        assert!(parse(r#"{"engine":"mysql","port":70000}"#).is_err());
        assert!(parse(r#"{"engine":"mysql","port":"abc"}"#).is_err());
    }

    #[test]
    fn debug_output_hides_password() {
        assert!(!format!("{:?}", request("postgres")).contains("hunter2"));
    }
}
