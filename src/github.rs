use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    error::{BriefError, Result},
    source::TreeSource,
    types::{GitBranch, GitTreeResponse, RepoMetadata},
    url::{parse_repo_url, RepoInfo, GITHUB_API_ROOT},
};

const ACCEPT: &str = "application/vnd.github+json";

/// GitHub REST API client
///
/// Every call is a single request: there are no retries, and any non-2xx
/// status ends the call with `BriefError::Upstream`. A bearer token is
/// attached only when one is passed in; otherwise GitHub's anonymous rate
/// limits apply.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    api_root: String,
}

#[derive(Deserialize)]
struct GitBlob {
    content: String,
    #[serde(default)]
    encoding: String,
}

impl GitHubClient {
    /// Create a client against the public API
    pub fn new(user_agent: &str) -> Self {
        Self::with_api_root(user_agent, GITHUB_API_ROOT)
    }

    /// Create a client against another API root (GitHub Enterprise, test servers)
    pub fn with_api_root(user_agent: &str, api_root: &str) -> Self {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_root: api_root.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    /// `{api_root}/repos/<owner>/<repo>`
    pub fn base_url(&self, info: &RepoInfo) -> String {
        info.api_base_url_at(&self.api_root)
    }

    fn get(&self, url: &str, token: Option<&str>) -> RequestBuilder {
        let request = self.client.get(url).header("Accept", ACCEPT);
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, url: &str, token: Option<&str>) -> Result<Response> {
        debug!(url, authenticated = token.is_some(), "GitHub request");
        let response = self.get(url, token).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .text()
            .await
            .ok()
            .filter(|body| !body.is_empty())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
        Err(BriefError::Upstream {
            status: status.as_u16(),
            message,
        })
    }

    /// `GET {base_url}/branches/{branch}`
    pub async fn fetch_branch(&self, base_url: &str, branch: &str, token: Option<&str>) -> Result<GitBranch> {
        let url = format!("{}/branches/{}", base_url, branch);
        Ok(self.send(&url, token).await?.json().await?)
    }

    /// SHA of the root tree of `branch`'s head commit
    pub async fn fetch_tree_sha(&self, base_url: &str, branch: &str, token: Option<&str>) -> Result<String> {
        let branch = self.fetch_branch(base_url, branch, token).await?;
        Ok(branch.commit.commit.tree.sha)
    }

    /// `GET {base_url}/git/trees/{sha}`, with `?recursive=1` when asked
    ///
    /// The `truncated` flag is passed through as GitHub reports it.
    pub async fn fetch_git_tree(
        &self,
        base_url: &str,
        sha: &str,
        recursive: bool,
        token: Option<&str>,
    ) -> Result<GitTreeResponse> {
        let url = if recursive {
            format!("{}/git/trees/{}?recursive=1", base_url, sha)
        } else {
            format!("{}/git/trees/{}", base_url, sha)
        };
        let tree: GitTreeResponse = self.send(&url, token).await?.json().await?;
        if tree.truncated {
            warn!(sha, entries = tree.tree.len(), "GitHub truncated the tree listing");
        }
        Ok(tree)
    }

    /// `GET {base_url}`
    pub async fn fetch_repository(&self, base_url: &str, token: Option<&str>) -> Result<RepoMetadata> {
        Ok(self.send(base_url, token).await?.json().await?)
    }

    /// Description of the repository behind a github.com URL
    pub async fn repo_description(&self, repo_url: &str, token: Option<&str>) -> Result<Option<String>> {
        let info = parse_repo_url(repo_url)?;
        let metadata = self.fetch_repository(&self.base_url(&info), token).await?;
        Ok(metadata.description)
    }

    /// `GET /user/repos` for the account owning `token`
    pub async fn list_user_repos(&self, token: Option<&str>) -> Result<Vec<RepoMetadata>> {
        let token = token.ok_or(BriefError::AuthRequired)?;
        let url = format!("{}/user/repos", self.api_root);
        Ok(self.send(&url, Some(token)).await?.json().await?)
    }

    /// Text of a blob, decoded from GitHub's base64 transport encoding
    pub async fn fetch_blob(&self, base_url: &str, sha: &str, token: Option<&str>) -> Result<String> {
        let url = format!("{}/git/blobs/{}", base_url, sha);
        let blob: GitBlob = self.send(&url, token).await?.json().await?;
        decode_blob(blob)
    }
}

fn decode_blob(blob: GitBlob) -> Result<String> {
    if blob.encoding != "base64" {
        return Ok(blob.content);
    }
    // GitHub wraps the payload every 60 characters
    let compact: String = blob.content.split_whitespace().collect();
    let bytes = STANDARD.decode(compact).map_err(|e| BriefError::Decode {
        message: e.to_string(),
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[async_trait]
impl TreeSource for GitHubClient {
    async fn fetch_flat_tree(
        &self,
        info: &RepoInfo,
        branch: &str,
        token: Option<&str>,
    ) -> Result<GitTreeResponse> {
        let base_url = self.base_url(info);
        let sha = self.fetch_tree_sha(&base_url, branch, token).await?;
        self.fetch_git_tree(&base_url, &sha, true, token).await
    }

    async fn describe(&self, info: &RepoInfo, token: Option<&str>) -> Result<RepoMetadata> {
        self.fetch_repository(&self.base_url(info), token).await
    }

    async fn read_blob(&self, info: &RepoInfo, sha: &str, token: Option<&str>) -> Result<String> {
        self.fetch_blob(&self.base_url(info), sha, token).await
    }

    fn identifier(&self) -> String {
        format!("github://{}", self.api_root)
    }
}
