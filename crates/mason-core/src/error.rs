use thiserror::Error;

/// Mason's internal error taxonomy (§7). External HTTP clients and `main`
/// still lean on `anyhow::Context` for one-off failures; these variants
/// exist where the poll loop or execution engine need to match on error
/// *kind* for control flow.
#[derive(Debug, Error)]
pub enum MasonError {
    #[error("configuration missing: {0}")]
    ConfigMissing(String),

    #[error("configuration invalid: {0}")]
    ConfigInvalid(String),

    #[error("http request failed: {0}")]
    Http(String),

    #[error("provider not initialized: {0}")]
    ProviderNotInitialized(String),
}
