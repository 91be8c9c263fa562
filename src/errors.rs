//! Error types for the deployment monitor

use std::fmt;

pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Debug)]
pub enum MonitorError {
    /// IO operation failed
    Io(std::io::Error),

    /// HTTP request failed
    Http(reqwest::Error),

    /// JSON serialization/deserialization failed
    Json(serde_json::Error),

    /// A required identifier was not supplied
    ConfigurationMissing(String),

    /// An expected resource does not exist
    ResourceNotFound(String),

    /// Provider API call failed
    Provider(ProviderError),

    /// The template engine reported a failed stack operation
    Deployment(String),

    /// Generic error with message
    Other(String),
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::Io(err) => write!(f, "IO error: {}", err),
            MonitorError::Http(err) => write!(f, "HTTP error: {}", err),
            MonitorError::Json(err) => write!(f, "JSON error: {}", err),
            MonitorError::ConfigurationMissing(what) => {
                write!(f, "Configuration missing: {}", what)
            }
            MonitorError::ResourceNotFound(name) => write!(f, "Resource not found: {}", name),
            MonitorError::Provider(err) => write!(f, "Provider error: {}", err),
            MonitorError::Deployment(msg) => write!(f, "Deployment failed: {}", msg),
            MonitorError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Io(err) => Some(err),
            MonitorError::Http(err) => Some(err),
            MonitorError::Json(err) => Some(err),
            MonitorError::Provider(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(err: std::io::Error) -> Self {
        MonitorError::Io(err)
    }
}

impl From<reqwest::Error> for MonitorError {
    fn from(err: reqwest::Error) -> Self {
        MonitorError::Http(err)
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Json(err)
    }
}

impl From<ProviderError> for MonitorError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(name) => MonitorError::ResourceNotFound(name),
            other => MonitorError::Provider(other),
        }
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Failure of a single provider request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider answered that the object does not exist
    NotFound(String),

    /// The call did not complete in time
    Timeout,

    /// Credentials were rejected or lack permission
    AccessDenied(String),

    /// The provider throttled the request
    Throttled(String),

    /// The provider client could not be started
    Unavailable(String),

    /// The response could not be understood
    Malformed(String),

    /// Any other failed call, with the provider's message
    Failed(String),
}

impl ProviderError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound(_))
    }

    /// Short form used in `error: <message>` status values
    pub fn status_message(&self) -> String {
        match self {
            ProviderError::NotFound(name) => format!("not found: {}", name),
            ProviderError::Timeout => "timeout".to_string(),
            ProviderError::AccessDenied(msg) => format!("access denied: {}", msg),
            ProviderError::Throttled(msg) => format!("throttled: {}", msg),
            ProviderError::Unavailable(msg) => format!("provider unavailable: {}", msg),
            ProviderError::Malformed(msg) => format!("malformed response: {}", msg),
            ProviderError::Failed(msg) => msg.clone(),
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.status_message())
    }
}

impl std::error::Error for ProviderError {}
