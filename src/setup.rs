//! Tracing initialization.

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` is always respected; if unset, the default keeps this
/// crate at `info` and everything else at `warn`:
///
/// ```text
/// RUST_LOG=debug                      # everything at debug
/// RUST_LOG=info,retail_datagen=debug  # generator internals at debug
/// ```
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,retail_datagen=info".into()),
        )
        .init();
}
