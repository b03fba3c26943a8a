pub mod cache;
pub mod config;
pub mod crypto;
pub mod datasource;
pub mod error;

/// Installs a `tracing` subscriber reading `RUST_LOG`. Intended for binaries
/// and integration tests embedding this crate; safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
