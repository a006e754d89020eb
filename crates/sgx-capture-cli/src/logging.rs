use tracing_subscriber::EnvFilter;

/// Install a compact stderr subscriber. `RUST_LOG` overrides `level`.
pub fn init(level: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        // stdout carries the result; keep diagnostics off it
        .with_target(false)
        .compact()
        .try_init()?;
    Ok(())
}
