//! Tracing subscriber setup.
//!
//! The log file always receives output. The console only does with
//! `-v` or `--debug`, so step previews never interleave with REPL answers.

use datacopilot_config::LoggingConfig;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub fn init(config: &LoggingConfig, console: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive(&config.level)));

    if let Some(parent) = config.file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.file)
        .map_err(|e| format!("Cannot open log file {}: {e}", config.file.display()))?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);

    let console_layer = console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()?;
    Ok(())
}

/// Scope the configured level to our crates; dependencies stay at `warn`.
fn directive(level: &str) -> String {
    let level = level.to_ascii_lowercase();
    format!(
        "warn,datacopilot={level},datacopilot_agent={level},datacopilot_tools={level},\
         datacopilot_providers={level},datacopilot_warehouse={level},datacopilot_config={level}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_scopes_level_to_workspace_crates() {
        let d = directive("DEBUG");
        assert!(d.starts_with("warn,"));
        assert!(d.contains("datacopilot_agent=debug"));
        assert!(EnvFilter::try_new(&d).is_ok());
    }
}
