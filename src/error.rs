use thiserror::Error;

/// Errors that can occur while acquiring, caching or reporting on a repository
#[derive(Error, Debug)]
pub enum BriefError {
    #[error("Invalid GitHub URL: {url}")]
    InvalidUrl { url: String },

    #[error("GitHub returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("GitHub account not linked or access token is missing")]
    AuthRequired,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to decode content: {message}")]
    Decode { message: String },

    #[error("No provider found for model: {model}")]
    UnsupportedModel { model: String },

    #[error("LLM provider error: {message}")]
    Provider { message: String },

    #[error("Report not found: {id}")]
    ReportNotFound { id: String },

    #[error("Repository tree not cached for {repo_url}")]
    TreeNotCached { repo_url: String },
}

impl BriefError {
    /// Text suitable for showing to the person who submitted the request.
    ///
    /// Every upstream failure maps to one message, whatever the status.
    pub fn user_message(&self) -> String {
        match self {
            BriefError::InvalidUrl { .. } => {
                "Invalid GitHub URL. Ensure it includes the owner and repository name.".to_string()
            }
            BriefError::Upstream { .. } | BriefError::Network(_) => {
                "Repository not found or access denied.".to_string()
            }
            BriefError::AuthRequired => {
                "Please sign in with GitHub again to access private repositories.".to_string()
            }
            BriefError::TreeNotCached { .. } => {
                "Repository tree not found in database. Please try again later.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Result type alias for CodeBrief operations
pub type Result<T> = std::result::Result<T, BriefError>;
