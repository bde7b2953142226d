// Integration tests for the repository tree pipeline
//
// These run against in-memory sources, without network access

use codebrief::{
    assign_dfs_indices, calculate_language_breakdown, format_repo_tree_to_markdown, BriefError,
    CachedTree, ContextStore, ContextStyle, DiskCache, GitTreeNode, GitTreeResponse, MemoryCache, NodeType, RepoInfo,
    RepoContextService, RepoMetadata, RepoTreeStore, TreeSource, UserContext, Visibility,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

// Mock source keyed by "owner/repo"
struct MockTreeSource {
    trees: HashMap<String, Vec<GitTreeNode>>,
    fetches: AtomicUsize,
    tokens_seen: std::sync::Mutex<Vec<Option<String>>>,
}

impl MockTreeSource {
    fn new() -> Self {
        Self {
            trees: HashMap::new(),
            fetches: AtomicUsize::new(0),
            tokens_seen: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn add_repo(&mut self, full_name: &str, paths: &[(&str, bool)]) {
        let entries = paths
            .iter()
            .map(|(path, is_dir)| {
                let mut node = if *is_dir {
                    GitTreeNode::tree(*path)
                } else {
                    GitTreeNode::blob(*path)
                };
                node.sha = path.to_string();
                node
            })
            .collect();
        self.trees.insert(full_name.to_string(), entries);
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TreeSource for MockTreeSource {
    async fn fetch_flat_tree(
        &self,
        info: &RepoInfo,
        _branch: &str,
        token: Option<&str>,
    ) -> codebrief::Result<GitTreeResponse> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.tokens_seen.lock().unwrap().push(token.map(String::from));

        let key = format!("{}/{}", info.owner, info.repo);
        let tree = self.trees.get(&key).cloned().ok_or(BriefError::Upstream {
            status: 404,
            message: "Not Found".to_string(),
        })?;
        Ok(GitTreeResponse {
            sha: "root".to_string(),
            url: None,
            tree,
            truncated: false,
        })
    }

    async fn describe(&self, info: &RepoInfo, _token: Option<&str>) -> codebrief::Result<RepoMetadata> {
        Ok(RepoMetadata {
            full_name: format!("{}/{}", info.owner, info.repo),
            description: None,
            default_branch: "main".to_string(),
            private: false,
        })
    }

    async fn read_blob(&self, _info: &RepoInfo, sha: &str, _token: Option<&str>) -> codebrief::Result<String> {
        Ok(format!("// contents of {}", sha))
    }

    fn identifier(&self) -> String {
        "mock".to_string()
    }
}

fn sample_source() -> MockTreeSource {
    let mut source = MockTreeSource::new();
    source.add_repo(
        "foo/bar",
        &[
            ("a.txt", false),
            ("dir1", true),
            ("dir1/b.txt", false),
            ("src", true),
            ("src/main.rs", false),
            ("src/web", true),
            ("src/web/app.ts", false),
        ],
    );
    source
}

#[tokio::test]
async fn test_cache_lookup_is_idempotent() {
    let source = Arc::new(sample_source());
    let store = RepoTreeStore::new(source.clone(), Arc::new(MemoryCache::new()));
    let user = UserContext::new("user-1");

    let first = store.get_or_build_tree("https://github.com/foo/bar", Some(&user)).await.unwrap();
    let second = store.get_or_build_tree("https://github.com/foo/bar", Some(&user)).await.unwrap();

    assert_eq!(
        serde_json::to_vec(&first.tree_data).unwrap(),
        serde_json::to_vec(&second.tree_data).unwrap()
    );
    assert_eq!(first.id, second.id);
    assert_eq!(source.fetches(), 1);
}

#[tokio::test]
async fn test_anonymous_and_signed_in_share_entry_after_write() {
    let source = Arc::new(sample_source());
    let store = RepoTreeStore::new(source.clone(), Arc::new(MemoryCache::new()));
    let url = "https://github.com/foo/bar";

    let anonymous = store.get_or_build_tree(url, None).await.unwrap();
    assert!(anonymous.id.is_none());

    let signed_in = store.get_or_build_tree(url, Some(&UserContext::new("u"))).await.unwrap();
    assert!(signed_in.id.is_some());
    assert_eq!(source.fetches(), 2);

    // Anonymous callers now read the persisted tree
    let later = store.get_or_build_tree(url, None).await.unwrap();
    assert_eq!(later.id, signed_in.id);
    assert_eq!(source.fetches(), 2);
}

#[tokio::test]
async fn test_token_is_forwarded_to_source() {
    let source = Arc::new(sample_source());
    let store = RepoTreeStore::new(source.clone(), Arc::new(MemoryCache::new()));
    let user = UserContext::new("u").with_token("gho_secret");

    store.get_or_build_tree("https://github.com/foo/bar", Some(&user)).await.unwrap();
    store.get_or_build_tree("https://github.com/foo/bar/", None).await.unwrap();

    let seen = source.tokens_seen.lock().unwrap().clone();
    assert_eq!(seen, vec![Some("gho_secret".to_string()), None]);
}

#[tokio::test]
async fn test_disk_cache_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let cache_path = temp_dir.path().to_path_buf();
    let url = "https://github.com/foo/bar";

    let source = Arc::new(sample_source());
    let cache = Arc::new(DiskCache::new(cache_path.clone()).await.unwrap());
    let store = RepoTreeStore::new(source, cache);
    let first = store.get_or_build_tree(url, Some(&UserContext::new("u"))).await.unwrap();

    // New store with an empty source (simulates restart against a dead upstream)
    let empty = Arc::new(MockTreeSource::new());
    let cache2 = Arc::new(DiskCache::new(cache_path).await.unwrap());
    let store2 = RepoTreeStore::new(empty.clone(), cache2);

    let cached = store2.get_or_build_tree(url, None).await.unwrap();
    assert_eq!(cached, first);
    assert_eq!(empty.fetches(), 0);
}

#[tokio::test]
async fn test_concurrent_misses_converge_on_one_record() {
    let source = Arc::new(sample_source());
    let store = Arc::new(RepoTreeStore::new(source, Arc::new(MemoryCache::new())));
    let url = "https://github.com/foo/bar";

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                let user = UserContext::new(format!("user-{}", i));
                store.get_or_build_tree(url, Some(&user)).await.unwrap()
            })
        })
        .collect();

    let mut results: Vec<CachedTree> = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    let stored = store.get_cached(url).await.unwrap().unwrap();
    assert!(results.iter().all(|r| r.id.as_deref() == Some(stored.id.as_str())));
}

#[tokio::test]
async fn test_upstream_failure_is_terminal_and_uncached() {
    let source = Arc::new(sample_source());
    let store = RepoTreeStore::new(source.clone(), Arc::new(MemoryCache::new()));
    let user = UserContext::new("u");
    let url = "https://github.com/foo/missing";

    for _ in 0..2 {
        let err = store.get_or_build_tree(url, Some(&user)).await.unwrap_err();
        assert!(matches!(err, BriefError::Upstream { status: 404, .. }));
        assert_eq!(err.user_message(), "Repository not found or access denied.");
    }
    assert_eq!(source.fetches(), 2);
    assert!(store.get_cached(url).await.unwrap().is_none());
}

#[tokio::test]
async fn test_pipeline_derivations() {
    let store = RepoTreeStore::new(Arc::new(sample_source()), Arc::new(MemoryCache::new()));
    let tree = store
        .get_or_build_tree("https://github.com/foo/bar.git", None)
        .await
        .unwrap()
        .tree_data;

    assert_eq!(tree[1].node_type, NodeType::Dir);
    assert_eq!(
        format_repo_tree_to_markdown(&tree),
        "```text\n├── a.txt\n├── dir1\n│   └── b.txt\n└── src\n    ├── main.rs\n    └── web\n        └── app.ts\n\n```"
    );

    let breakdown = calculate_language_breakdown(&tree);
    let languages: Vec<_> = breakdown.iter().map(|b| (b.language.as_str(), b.percentage)).collect();
    assert_eq!(languages, vec![("Rust", 50.0), ("TypeScript", 50.0)]);

    let annotated = assign_dfs_indices(&tree);
    assert_eq!(annotated[2].dfs_index, 3);
    assert_eq!(annotated[2].children[1].children[0].dfs_index, 6);
}

#[tokio::test]
async fn test_formatted_tree_respects_depth() {
    let store = RepoTreeStore::new(Arc::new(sample_source()), Arc::new(MemoryCache::new()));

    let shallow = store.get_repo_tree_formatted("https://github.com/foo/bar", None).await.unwrap();
    assert!(shallow.markdown.contains("└── web"));
    assert!(!shallow.markdown.contains("app.ts"));

    let deep = store.get_repo_tree_formatted("https://github.com/foo/bar", Some(3)).await.unwrap();
    assert!(deep.markdown.contains("app.ts"));
}

#[tokio::test]
async fn test_repo_context_is_packed_and_stored_per_user() {
    let store = Arc::new(ContextStore::new());
    let service = RepoContextService::new(Arc::new(sample_source()), store.clone());
    let url = "https://github.com/foo/bar";

    let first = service
        .generate(url, Some(&UserContext::new("u1")), Visibility::Public)
        .await
        .unwrap();
    assert!(first.context.starts_with("<directory_structure>\n├── a.txt\n"));
    assert!(first
        .context
        .contains("<file path=\"src/web/app.ts\">\n// contents of src/web/app.ts\n</file>"));

    let second = service
        .generate(url, Some(&UserContext::new("u2")), Visibility::Public)
        .await
        .unwrap();

    assert_eq!(store.latest(url, Some("u1")).await.unwrap().id, first.id);
    assert_eq!(store.latest(url, None).await.unwrap().id, second.id);
    assert!(store.latest("https://github.com/foo/other", None).await.is_none());
    assert_eq!(ContextStyle::default(), ContextStyle::Xml);
}
