use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BriefError, Result};

/// Kind of a node in the nested repository tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    File,
    Dir,
}

/// One path segment of a repository
///
/// A `File` never has children. A `Dir` holds children that are unique by
/// `name`, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoTreeNode {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RepoTreeNode>,
}

impl RepoTreeNode {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node_type: NodeType::File,
            children: Vec::new(),
        }
    }

    pub fn dir(name: impl Into<String>, children: Vec<RepoTreeNode>) -> Self {
        Self {
            name: name.into(),
            node_type: NodeType::Dir,
            children,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.node_type == NodeType::Dir
    }

    /// Number of nodes in this subtree, including `self`
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(RepoTreeNode::count).sum::<usize>()
    }
}

/// Git object kind as reported by the trees API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitObjectType {
    Blob,
    Tree,
    /// Submodule pointer
    Commit,
}

/// A flat entry from `GET /git/trees/{sha}?recursive=1`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitTreeNode {
    pub path: String,
    #[serde(default)]
    pub mode: String,
    #[serde(rename = "type")]
    pub object_type: GitObjectType,
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

impl GitTreeNode {
    pub fn blob(path: impl Into<String>) -> Self {
        Self::with_type(path, GitObjectType::Blob)
    }

    pub fn tree(path: impl Into<String>) -> Self {
        Self::with_type(path, GitObjectType::Tree)
    }

    fn with_type(path: impl Into<String>, object_type: GitObjectType) -> Self {
        Self {
            path: path.into(),
            mode: String::new(),
            object_type,
            sha: String::new(),
            url: None,
            size: None,
        }
    }
}

/// Response body of the git trees endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitTreeResponse {
    pub sha: String,
    #[serde(default)]
    pub url: Option<String>,
    pub tree: Vec<GitTreeNode>,
    /// Set by GitHub when the listing was capped; passed through untouched
    #[serde(default)]
    pub truncated: bool,
}

/// Response body of the branches endpoint, reduced to what we read
#[derive(Debug, Clone, Deserialize)]
pub struct GitBranch {
    pub name: String,
    pub commit: BranchCommit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BranchCommit {
    pub sha: String,
    pub commit: CommitDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    pub tree: TreeRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreeRef {
    pub sha: String,
}

/// Repository metadata from `GET /repos/{owner}/{repo}` and `GET /user/repos`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoMetadata {
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_branch_name")]
    pub default_branch: String,
    #[serde(default)]
    pub private: bool,
}

fn default_branch_name() -> String {
    "main".to_string()
}

/// Persisted cache record, one per repository URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRepoTree {
    pub id: String,
    pub repo_url: String,
    pub tree_data: Vec<RepoTreeNode>,
    #[serde(default)]
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
}

/// Result of a cache lookup; `id` is set only when the tree is persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedTree {
    pub tree_data: Vec<RepoTreeNode>,
    pub id: Option<String>,
}

/// Markdown rendering of a depth-limited tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedTree {
    pub markdown: String,
}

/// Identity of the caller, when one is signed in
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserContext {
    pub user_id: String,
    /// Token of the linked GitHub account
    pub access_token: Option<String>,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}

/// Whether reading a repository needs the caller's GitHub token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    /// Token to send upstream for a repository of this visibility
    ///
    /// Private repositories need a signed-in user with a linked token;
    /// anything less is `AuthRequired`.
    pub fn token_for<'a>(self, user: Option<&'a UserContext>) -> Result<Option<&'a str>> {
        let token = user.and_then(|u| u.access_token.as_deref());
        match (self, token) {
            (Visibility::Private, None) => Err(BriefError::AuthRequired),
            _ => Ok(token),
        }
    }
}

/// Packed file contents of a repository, as handed to a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoContext {
    pub id: String,
    pub repo_url: String,
    pub user_id: Option<String>,
    pub context: String,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of a generated report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Completed,
    Failed,
}

/// A report generated for one user and repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub user_id: String,
    pub repo_url: String,
    /// Cached tree the report was generated from
    pub repo_tree_id: Option<String>,
    pub model: Option<String>,
    pub content: Option<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

/// Share of recognized files written in one language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageBreakdown {
    pub language: String,
    pub percentage: f64,
    pub color: String,
}

/// A tree node labelled with its pre-order position across the whole forest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DfsRepoTreeNode {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DfsRepoTreeNode>,
    pub dfs_index: usize,
}
