use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

const FALLBACK_DIRECTIVE: &str = "info";

/// Directives from `RUST_LOG` take precedence over the configured level.
/// Anything unparsable falls back to `info`.
pub fn build_filter(env_directives: Option<&str>, default_level: &str) -> EnvFilter {
    env_directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(default_level).ok())
        .unwrap_or_else(|| EnvFilter::new(FALLBACK_DIRECTIVE))
}

pub fn init_logging(default_level: &str) -> Result<()> {
    let env_directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    fmt()
        .with_env_filter(build_filter(env_directives.as_deref(), default_level))
        .with_target(true)
        .compact()
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(())
}
