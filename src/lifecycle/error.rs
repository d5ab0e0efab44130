/// Error type hooks may fail with.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// What every startup and shutdown hook returns.
pub type HookResult = Result<(), HookError>;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("startup hook with priority {priority} failed")]
    Startup {
        priority: i32,
        #[source]
        source: HookError,
    },
    #[error("shutdown hook with priority {priority} failed")]
    Shutdown {
        priority: i32,
        #[source]
        source: HookError,
    },
    #[error("shutdown hook with priority {priority} panicked: {message}")]
    ShutdownPanic { priority: i32, message: String },
}
