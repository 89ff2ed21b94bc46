#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("{0} is already configured")]
    ConfigurationConflict(&'static str),

    #[error("Security provider error: {0}")]
    SecurityProvider(String),

    #[error("Cookie store error: {0}")]
    CookieStore(String),

    #[error("Network error: {0}")]
    Network(String),
}
