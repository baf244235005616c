use anyhow::{Result, bail};

use super::AppConfig;

pub fn validate(cfg: &AppConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    if cfg.general.host.trim().is_empty() {
        errors.push("general.host must not be empty".to_string());
    }

    if cfg.storage.files_dir.as_os_str().is_empty() {
        errors.push("storage.files_dir must not be empty".to_string());
    }

    if cfg.storage.profiles_dir.as_os_str().is_empty() {
        errors.push("storage.profiles_dir must not be empty".to_string());
    }

    if cfg.dump.timeout_secs == 0 {
        errors.push("dump.timeout_secs must be > 0".to_string());
    }

    if cfg.dump.max_output_bytes == 0 {
        errors.push("dump.max_output_bytes must be > 0".to_string());
    }

    if cfg.dump.postgres_program.trim().is_empty() {
        errors.push("dump.postgres_program must not be empty".to_string());
    }

    if cfg.dump.mysql_program.trim().is_empty() {
        errors.push("dump.mysql_program must not be empty".to_string());
    }

    if errors.is_empty() {
        return Ok(());
    }

    bail!("invalid app config:\n- {}", errors.join("\n- "))
}
