use thiserror::Error;

/// Main error type for kubectl-ps
#[derive(Error, Debug)]
pub enum PsError {
    /// Bad scope, grammar string or option
    #[error("{0}")]
    Usage(#[from] UsageError),

    /// Kubernetes API errors
    #[error("Kubernetes error: {0}")]
    Kubernetes(#[from] KubernetesError),

    /// metrics.k8s.io errors
    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors in the scope argument or the metric flag string.
///
/// All of them are fatal and reported together with the usage text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("unknown scope {0}")]
    UnknownScope(String),

    #[error("unknown flag letter {0}")]
    UnknownFlag(char),

    /// A known letter used in a scope that does not support it
    #[error("flag {flag} only valid for {allowed} scope")]
    InvalidFlag { flag: char, allowed: &'static str },

    #[error("flags must include m and/or c")]
    MissingFamily,

    #[error("flags must include at least one metric letter (rlupft)")]
    MissingMetric,
}

/// Kubernetes-specific errors
#[derive(Error, Debug)]
pub enum KubernetesError {
    /// Kubeconfig could not be loaded or the client could not be built
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Listing a resource failed
    #[error("API error: {0}")]
    ApiError(String),
}

/// Errors from the usage sample source (metrics-server)
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("metrics-server unavailable: {0}")]
    Unavailable(String),
}

/// Helper type alias for Results
pub type Result<T> = std::result::Result<T, PsError>;
