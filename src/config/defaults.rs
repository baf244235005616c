pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: i64 = 3000;
pub const DEFAULT_RUST_LOG: &str = "info,tower_http=info";
pub const DEFAULT_FILES_DIR: &str = "files_to_edit";
pub const DEFAULT_PROFILES_DIR: &str = "database_configs";
pub const DEFAULT_DUMP_TIMEOUT_SECS: i64 = 60;
pub const DEFAULT_DUMP_MAX_OUTPUT_BYTES: i64 = 32 * 1024 * 1024;
pub const DEFAULT_POSTGRES_PROGRAM: &str = "pg_dump";
pub const DEFAULT_MYSQL_PROGRAM: &str = "mysqldump";
