//! Logging initialization for embedders and test binaries.

/// Initialize tracing with an env-filter, writing to stderr.
///
/// Honors `RUST_LOG`; defaults to `info`. Safe to call more than once —
/// subsequent calls are no-ops.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_is_idempotent() {
        super::init();
        super::init();
    }
}
