use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;

use crate::error::{BriefError, Result};

/// Public GitHub REST API root
pub const GITHUB_API_ROOT: &str = "https://api.github.com";

static REPO_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"github\.com/([^/]+)/([^/]+)(?:/|$)").expect("valid regex"));

static REPO_URL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://)?(www\.)?github\.com/[\w.-]+/[\w.-]+(/.*)?$").expect("valid regex")
});

/// Owner and name of a GitHub repository
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoInfo {
    pub owner: String,
    pub repo: String,
}

impl RepoInfo {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// `https://api.github.com/repos/<owner>/<repo>`
    pub fn api_base_url(&self) -> String {
        self.api_base_url_at(GITHUB_API_ROOT)
    }

    /// Same as [`RepoInfo::api_base_url`] against another API root
    pub fn api_base_url_at(&self, api_root: &str) -> String {
        format!(
            "{}/repos/{}/{}",
            api_root.trim_end_matches('/'),
            self.owner,
            self.repo
        )
    }

    /// Display title, `"owner / repo"`
    pub fn title(&self) -> String {
        format!("{} / {}", self.owner, self.repo)
    }
}

/// Extract owner and repository from a GitHub URL
///
/// Accepts `https://github.com/owner/repo`, a trailing `.git`, and any
/// trailing path segments (`/tree/main/src`), which are ignored.
pub fn parse_repo_url(url: &str) -> Result<RepoInfo> {
    let captures = REPO_PATTERN
        .captures(url)
        .ok_or_else(|| BriefError::InvalidUrl {
            url: url.to_string(),
        })?;

    let owner = &captures[1];
    let repo = captures[2].strip_suffix(".git").unwrap_or(&captures[2]);
    if repo.is_empty() {
        return Err(BriefError::InvalidUrl {
            url: url.to_string(),
        });
    }

    Ok(RepoInfo::new(owner, repo))
}

/// Loose shape check used before accepting user input
pub fn is_github_repo_url(url: &str) -> bool {
    REPO_URL_SHAPE.is_match(url)
}

/// Base URL plus an endpoint and an optional query string
///
/// ```
/// use codebrief::url::{build_api_url, RepoInfo, GITHUB_API_ROOT};
///
/// let info = RepoInfo::new("owner", "repo");
/// let url = build_api_url(&info, GITHUB_API_ROOT, "/contents", &[("ref", "main")]).unwrap();
/// assert_eq!(url, "https://api.github.com/repos/owner/repo/contents?ref=main");
/// ```
pub fn build_api_url(
    info: &RepoInfo,
    api_root: &str,
    endpoint: &str,
    query: &[(&str, &str)],
) -> Result<String> {
    let raw = format!("{}{}", info.api_base_url_at(api_root), endpoint);
    let mut url = Url::parse(&raw).map_err(|e| BriefError::InvalidUrl {
        url: format!("{} ({})", raw, e),
    })?;

    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query.iter());
    }

    Ok(url.to_string())
}
