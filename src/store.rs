use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    cache::Cache,
    config::Config,
    error::Result,
    source::TreeSource,
    tree::build_repo_tree,
    types::{CachedRepoTree, CachedTree, FormattedTree, UserContext, Visibility},
    url::parse_repo_url,
    visualize::format_repo_tree_to_markdown,
};

/// Repository trees keyed by repository URL
///
/// A lookup hit returns the stored tree as is: there is no expiry and no
/// freshness check. A miss fetches and builds the full-depth tree, and
/// persists it only when the caller is signed in, so anonymous previews
/// never write to the cache.
pub struct RepoTreeStore {
    source: Arc<dyn TreeSource>,
    cache: Arc<dyn Cache>,
    branch: String,
    formatted_depth: usize,
}

impl RepoTreeStore {
    pub fn new(source: Arc<dyn TreeSource>, cache: Arc<dyn Cache>) -> Self {
        let defaults = Config::default();
        Self {
            source,
            cache,
            branch: defaults.default_branch,
            formatted_depth: defaults.formatted_depth,
        }
    }

    pub fn from_config(source: Arc<dyn TreeSource>, cache: Arc<dyn Cache>, config: &Config) -> Self {
        Self {
            source,
            cache,
            branch: config.default_branch.clone(),
            formatted_depth: config.formatted_depth,
        }
    }

    fn cache_key(repo_url: &str) -> String {
        format!("repo-tree:{}", repo_url)
    }

    /// Stored record for `repo_url`, if any
    pub async fn get_cached(&self, repo_url: &str) -> Result<Option<CachedRepoTree>> {
        match self.cache.get(&Self::cache_key(repo_url)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Cached tree for a public repository, building (and maybe persisting) it on a miss
    pub async fn get_or_build_tree(&self, repo_url: &str, user: Option<&UserContext>) -> Result<CachedTree> {
        self.get_or_build_tree_as(repo_url, user, Visibility::Public).await
    }

    /// Cached tree for `repo_url`, building (and maybe persisting) it on a miss
    ///
    /// A private repository, or a stored tree recorded as private, fails with
    /// `AuthRequired` unless the user has a linked token. That check runs
    /// before any upstream request.
    pub async fn get_or_build_tree_as(
        &self,
        repo_url: &str,
        user: Option<&UserContext>,
        visibility: Visibility,
    ) -> Result<CachedTree> {
        let info = parse_repo_url(repo_url)?;
        let token = visibility.token_for(user)?;

        if let Some(record) = self.get_cached(repo_url).await? {
            record.visibility.token_for(user)?;
            info!(repo_url, id = %record.id, "repo tree cache hit");
            return Ok(CachedTree {
                tree_data: record.tree_data,
                id: Some(record.id),
            });
        }

        info!(repo_url, source = %self.source.identifier(), "repo tree cache miss");
        let flat = self.source.fetch_flat_tree(&info, &self.branch, token).await?;
        let tree_data = build_repo_tree(&flat.tree, None);

        let Some(user) = user else {
            debug!(repo_url, "anonymous request, tree not persisted");
            return Ok(CachedTree { tree_data, id: None });
        };

        let record = CachedRepoTree {
            id: Uuid::new_v4().to_string(),
            repo_url: repo_url.to_string(),
            tree_data,
            visibility,
            created_at: Utc::now(),
        };
        let bytes = Bytes::from(serde_json::to_vec(&record)?);

        if self.cache.insert_if_absent(&Self::cache_key(repo_url), bytes).await? {
            info!(repo_url, id = %record.id, user_id = %user.user_id, "repo tree cached");
            return Ok(CachedTree {
                tree_data: record.tree_data,
                id: Some(record.id),
            });
        }

        // Another request persisted this URL first; its record is canonical
        warn!(repo_url, "concurrent cache write lost, using stored tree");
        match self.get_cached(repo_url).await? {
            Some(stored) => Ok(CachedTree {
                tree_data: stored.tree_data,
                id: Some(stored.id),
            }),
            None => Ok(CachedTree {
                tree_data: record.tree_data,
                id: None,
            }),
        }
    }

    /// Alias matching the query surface name
    pub async fn get_repo_tree_cached(&self, repo_url: &str, user: Option<&UserContext>) -> Result<CachedTree> {
        self.get_or_build_tree(repo_url, user).await
    }

    /// Depth-limited Markdown rendering, always fetched fresh
    ///
    /// `depth` defaults to the configured formatted depth.
    pub async fn get_repo_tree_formatted(&self, repo_url: &str, depth: Option<usize>) -> Result<FormattedTree> {
        let info = parse_repo_url(repo_url)?;
        let flat = self.source.fetch_flat_tree(&info, &self.branch, None).await?;
        let tree = build_repo_tree(&flat.tree, Some(depth.unwrap_or(self.formatted_depth)));
        Ok(FormattedTree {
            markdown: format_repo_tree_to_markdown(&tree),
        })
    }

    /// Repository description from GitHub metadata
    pub async fn get_repo_description(&self, repo_url: &str) -> Result<Option<String>> {
        let info = parse_repo_url(repo_url)?;
        Ok(self.source.describe(&info, None).await?.description)
    }

    /// Whether a tree is stored for `repo_url`
    pub async fn is_cached(&self, repo_url: &str) -> bool {
        self.cache.contains(&Self::cache_key(repo_url)).await
    }

    /// Drop the stored tree for `repo_url`; the next lookup rebuilds it
    pub async fn evict(&self, repo_url: &str) -> Result<()> {
        info!(repo_url, "evicting cached repo tree");
        self.cache.remove(&Self::cache_key(repo_url)).await
    }

    /// Drop every stored tree
    pub async fn clear(&self) -> Result<()> {
        info!("clearing repo tree cache");
        self.cache.clear().await
    }
}
