use std::sync::Arc;

use tracing::debug;

use crate::{
    store::RepoTreeStore,
    types::{RepoTreeNode, UserContext},
    url::parse_repo_url,
};

/// What a repository page shows at a point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepoReportState {
    pub tree_data: Option<Vec<RepoTreeNode>>,
    pub is_loading: bool,
    /// User-facing error text from the last lookup
    pub error: Option<String>,
    /// `"owner / repo"`, empty when the URL doesn't parse
    pub title: String,
}

/// Ties a repository URL to the cached tree lookup
///
/// The first tree loaded is kept for the lifetime of the view; later loads
/// update loading/error state but never swap the tree out from under a
/// rendered page.
pub struct RepoReportView {
    store: Arc<RepoTreeStore>,
    pinned: Option<Vec<RepoTreeNode>>,
}

impl RepoReportView {
    pub fn new(store: Arc<RepoTreeStore>) -> Self {
        Self { store, pinned: None }
    }

    /// State before any lookup has finished
    pub fn loading(repo_url: &str) -> RepoReportState {
        RepoReportState {
            tree_data: None,
            is_loading: true,
            error: None,
            title: title_for(repo_url),
        }
    }

    /// Look up the tree for `repo_url`; `None` leaves the view idle
    pub async fn load(&mut self, repo_url: Option<&str>, user: Option<&UserContext>) -> RepoReportState {
        let Some(repo_url) = repo_url else {
            return RepoReportState::default();
        };

        let title = title_for(repo_url);
        match self.store.get_or_build_tree(repo_url, user).await {
            Ok(result) => {
                let tree = self.pinned.get_or_insert(result.tree_data).clone();
                RepoReportState {
                    tree_data: Some(tree),
                    is_loading: false,
                    error: None,
                    title,
                }
            }
            Err(e) => {
                debug!(repo_url, error = %e, "repo tree lookup failed");
                RepoReportState {
                    tree_data: self.pinned.clone(),
                    is_loading: false,
                    error: Some(e.user_message()),
                    title,
                }
            }
        }
    }
}

fn title_for(repo_url: &str) -> String {
    parse_repo_url(repo_url)
        .map(|info| info.title())
        .unwrap_or_default()
}
