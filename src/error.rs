use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Control plane returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("{kind} status for [{name}] expected was [{expected}] but got [{actual}] because of [{reason}]")]
    UnexpectedStatus {
        kind: &'static str,
        name: String,
        expected: String,
        actual: String,
        reason: String,
    },

    #[error("{operation} did not converge within {timeout:?} after {attempts} attempts{}", detail_suffix(.last_detail))]
    Timeout {
        operation: String,
        timeout: Duration,
        attempts: u32,
        last_detail: Option<String>,
    },

    #[error("Invalid retry policy: {0}")]
    InvalidRetryPolicy(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("{0} soft check(s) failed")]
    SoftFailures(usize),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!(": {d}"),
        None => String::new(),
    }
}

impl Error {
    pub fn reason(&self) -> &str {
        match self {
            Error::Kube(_) => "KubernetesError",
            Error::Http(_) => "HttpError",
            Error::Serialization(_) => "SerializationError",
            Error::Yaml(_) => "SerializationError",
            Error::ObjectStore(_) => "ObjectStoreError",
            Error::Io(_) => "IoError",
            Error::Regex(_) => "RegexError",
            Error::Api { .. } => "ApiError",
            Error::NotFound { .. } => "NotFound",
            Error::UnexpectedStatus { .. } => "UnexpectedStatus",
            Error::Timeout { .. } => "Timeout",
            Error::InvalidRetryPolicy(_) => "InvalidRetryPolicy",
            Error::InvalidConfig(_) => "InvalidConfiguration",
            Error::Precondition(_) => "PreconditionFailed",
            Error::SoftFailures(_) => "SoftFailures",
        }
    }

    /// True when the error means the referenced object does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Api { status, .. } => *status == 404,
            Error::Kube(kube::Error::Api(ae)) => ae.code == 404,
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}
