use async_trait::async_trait;

use crate::{
    error::Result,
    types::{GitTreeResponse, RepoMetadata},
    url::RepoInfo,
};

/// Core abstraction for where repository trees come from
///
/// The production implementation is [`crate::github::GitHubClient`]; tests
/// plug in in-memory sources.
#[async_trait]
pub trait TreeSource: Send + Sync {
    /// Fetch the flat recursive tree at the tip of `branch`
    ///
    /// Returns `BriefError::Upstream` if the repository or branch can't be read
    async fn fetch_flat_tree(
        &self,
        info: &RepoInfo,
        branch: &str,
        token: Option<&str>,
    ) -> Result<GitTreeResponse>;

    /// Fetch repository metadata (description, default branch, visibility)
    async fn describe(&self, info: &RepoInfo, token: Option<&str>) -> Result<RepoMetadata>;

    /// Text of the blob `sha`
    async fn read_blob(&self, info: &RepoInfo, sha: &str, token: Option<&str>) -> Result<String>;

    /// Get a human-readable identifier for this source (for logging/debugging)
    fn identifier(&self) -> String;
}
