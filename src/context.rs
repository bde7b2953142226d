//! Packed repository contents
//!
//! A context is the directory structure plus the text of every code and
//! text file, laid out in one of three styles. Contexts are stored per
//! repository URL and user, and the newest one is what reports read.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    config::Config,
    error::{BriefError, Result},
    language::{infer_file_type, FileType},
    source::TreeSource,
    tree::build_repo_tree,
    types::{GitObjectType, GitTreeNode, RepoContext, RepoTreeNode, UserContext, Visibility},
    url::parse_repo_url,
    visualize::format_repo_tree_lines,
};

/// Layout of a packed context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextStyle {
    #[default]
    Xml,
    Markdown,
    Plain,
}

impl fmt::Display for ContextStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContextStyle::Xml => "xml",
            ContextStyle::Markdown => "markdown",
            ContextStyle::Plain => "plain",
        })
    }
}

impl FromStr for ContextStyle {
    type Err = BriefError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "xml" => Ok(ContextStyle::Xml),
            "markdown" => Ok(ContextStyle::Markdown),
            "plain" => Ok(ContextStyle::Plain),
            other => Err(BriefError::InvalidConfig {
                message: format!("unknown context style {:?}", other),
            }),
        }
    }
}

/// One file's path and text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedFile {
    pub path: String,
    pub content: String,
}

/// Lay out the directory structure and file contents in `style`
pub fn pack_repository(tree: &[RepoTreeNode], files: &[PackedFile], style: ContextStyle) -> String {
    let structure = format_repo_tree_lines(tree);
    let mut out = String::new();

    match style {
        ContextStyle::Xml => {
            out.push_str("<directory_structure>\n");
            out.push_str(&structure);
            out.push_str("</directory_structure>\n\n<files>\n");
            for file in files {
                out.push_str(&format!("<file path=\"{}\">\n", file.path));
                push_line(&mut out, &file.content);
                out.push_str("</file>\n\n");
            }
            out.push_str("</files>\n");
        }
        ContextStyle::Markdown => {
            out.push_str("# Directory Structure\n```\n");
            out.push_str(&structure);
            out.push_str("```\n\n# Files\n");
            for file in files {
                out.push_str(&format!("\n## File: {}\n```\n", file.path));
                push_line(&mut out, &file.content);
                out.push_str("```\n");
            }
        }
        ContextStyle::Plain => {
            let rule = "=".repeat(16);
            out.push_str(&format!("{rule}\nDirectory Structure\n{rule}\n"));
            out.push_str(&structure);
            for file in files {
                out.push_str(&format!("\n{rule}\nFile: {}\n{rule}\n", file.path));
                push_line(&mut out, &file.content);
            }
        }
    }
    out
}

fn push_line(out: &mut String, text: &str) {
    out.push_str(text);
    if !text.ends_with('\n') {
        out.push('\n');
    }
}

/// Whether a flat entry's text belongs in a context
fn is_packable(entry: &GitTreeNode, max_file_bytes: u64) -> bool {
    if entry.object_type != GitObjectType::Blob {
        return false;
    }
    if entry.size.is_some_and(|size| size > max_file_bytes) {
        return false;
    }
    let name = entry.path.rsplit('/').next().unwrap_or(&entry.path);
    matches!(infer_file_type(name), FileType::Code | FileType::Text)
}

/// In-memory contexts, newest last
#[derive(Default)]
pub struct ContextStore {
    contexts: RwLock<Vec<RepoContext>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, repo_url: &str, user_id: Option<&str>, context: String) -> RepoContext {
        let record = RepoContext {
            id: Uuid::new_v4().to_string(),
            repo_url: repo_url.to_string(),
            user_id: user_id.map(String::from),
            context,
            created_at: Utc::now(),
        };
        self.contexts.write().await.push(record.clone());
        record
    }

    /// Newest context for `repo_url`; narrowed to `user_id` when one is given
    pub async fn latest(&self, repo_url: &str, user_id: Option<&str>) -> Option<RepoContext> {
        self.contexts
            .read()
            .await
            .iter()
            .rev()
            .find(|c| c.repo_url == repo_url && user_id.map_or(true, |id| c.user_id.as_deref() == Some(id)))
            .cloned()
    }
}

/// Builds contexts from a [`TreeSource`] and keeps them in a [`ContextStore`]
pub struct RepoContextService {
    source: Arc<dyn TreeSource>,
    store: Arc<ContextStore>,
    branch: String,
    style: ContextStyle,
    max_file_bytes: u64,
}

impl RepoContextService {
    pub fn new(source: Arc<dyn TreeSource>, store: Arc<ContextStore>) -> Self {
        Self::from_config(source, store, &Config::default())
    }

    pub fn from_config(source: Arc<dyn TreeSource>, store: Arc<ContextStore>, config: &Config) -> Self {
        Self {
            source,
            store,
            branch: config.default_branch.clone(),
            style: config.context_style,
            max_file_bytes: config.context_max_file_bytes,
        }
    }

    pub fn store(&self) -> &Arc<ContextStore> {
        &self.store
    }

    /// Fetch and pack `repo_url` without storing it
    ///
    /// Private repositories need a linked token; the check runs before any
    /// upstream request. Blobs are read one at a time and the first failure
    /// ends the pack.
    pub async fn pack(&self, repo_url: &str, user: Option<&UserContext>, visibility: Visibility) -> Result<String> {
        let info = parse_repo_url(repo_url)?;
        let token = visibility.token_for(user)?;

        let flat = self.source.fetch_flat_tree(&info, &self.branch, token).await?;
        let tree = build_repo_tree(&flat.tree, None);

        let mut files = Vec::new();
        for entry in flat.tree.iter().filter(|e| is_packable(e, self.max_file_bytes)) {
            debug!(repo_url, path = %entry.path, "reading blob");
            let content = self.source.read_blob(&info, &entry.sha, token).await?;
            files.push(PackedFile {
                path: entry.path.clone(),
                content,
            });
        }

        info!(repo_url, files = files.len(), style = %self.style, "repository packed");
        Ok(pack_repository(&tree, &files, self.style))
    }

    /// Pack `repo_url` and store the result for the user
    pub async fn generate(
        &self,
        repo_url: &str,
        user: Option<&UserContext>,
        visibility: Visibility,
    ) -> Result<RepoContext> {
        let context = self.pack(repo_url, user, visibility).await?;
        let user_id = user.map(|u| u.user_id.as_str());
        Ok(self.store.insert(repo_url, user_id, context).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GitTreeResponse, RepoMetadata};
    use crate::url::RepoInfo;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct BlobSource {
        reads: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TreeSource for BlobSource {
        async fn fetch_flat_tree(&self, _: &RepoInfo, _: &str, _: Option<&str>) -> Result<GitTreeResponse> {
            let mut big = GitTreeNode::blob("data/huge.json");
            big.sha = "big".to_string();
            big.size = Some(10_000_000);
            let mut entries = vec![
                GitTreeNode::tree("src"),
                GitTreeNode::blob("src/main.rs"),
                GitTreeNode::blob("README.md"),
                GitTreeNode::blob("logo.png"),
                GitTreeNode::blob("LICENSE"),
                big,
            ];
            for entry in &mut entries {
                if entry.sha.is_empty() {
                    entry.sha = format!("sha-{}", entry.path);
                }
            }
            Ok(GitTreeResponse {
                sha: "root".to_string(),
                url: None,
                tree: entries,
                truncated: false,
            })
        }

        async fn describe(&self, _: &RepoInfo, _: Option<&str>) -> Result<RepoMetadata> {
            unreachable!("contexts never describe")
        }

        async fn read_blob(&self, _: &RepoInfo, sha: &str, _: Option<&str>) -> Result<String> {
            self.reads.lock().unwrap().push(sha.to_string());
            Ok(match sha {
                "sha-src/main.rs" => "fn main() {}".to_string(),
                "sha-README.md" => "# Demo\n".to_string(),
                other => panic!("unexpected blob {}", other),
            })
        }

        fn identifier(&self) -> String {
            "blobs".to_string()
        }
    }

    fn service() -> (RepoContextService, Arc<BlobSource>) {
        let source = Arc::new(BlobSource {
            reads: Mutex::new(Vec::new()),
        });
        let service = RepoContextService::new(source.clone(), Arc::new(ContextStore::new()));
        (service, source)
    }

    #[test]
    fn test_pack_xml_layout() {
        let tree = vec![RepoTreeNode::file("a.rs")];
        let files = vec![PackedFile {
            path: "a.rs".to_string(),
            content: "let x = 1;".to_string(),
        }];
        assert_eq!(
            pack_repository(&tree, &files, ContextStyle::Xml),
            "<directory_structure>\n└── a.rs\n</directory_structure>\n\n<files>\n<file path=\"a.rs\">\nlet x = 1;\n</file>\n\n</files>\n"
        );
    }

    #[test]
    fn test_pack_markdown_and_plain_layouts() {
        let tree = vec![RepoTreeNode::file("a.rs")];
        let files = vec![PackedFile {
            path: "a.rs".to_string(),
            content: "x\n".to_string(),
        }];

        let markdown = pack_repository(&tree, &files, ContextStyle::Markdown);
        assert!(markdown.starts_with("# Directory Structure\n```\n└── a.rs\n```\n"));
        assert!(markdown.ends_with("## File: a.rs\n```\nx\n```\n"));

        let plain = pack_repository(&tree, &files, ContextStyle::Plain);
        assert!(plain.contains("File: a.rs\n================\nx\n"));
    }

    #[test]
    fn test_style_parsing() {
        assert_eq!("markdown".parse::<ContextStyle>().unwrap(), ContextStyle::Markdown);
        assert_eq!(ContextStyle::default().to_string(), "xml");
        assert!(matches!(
            "json".parse::<ContextStyle>(),
            Err(BriefError::InvalidConfig { .. })
        ));
    }

    #[tokio::test]
    async fn test_pack_reads_only_code_and_text_blobs() {
        let (service, source) = service();
        let packed = service.pack("https://github.com/o/r", None, Visibility::Public).await.unwrap();

        let reads = source.reads.lock().unwrap().clone();
        assert_eq!(reads, vec!["sha-src/main.rs", "sha-README.md"]);
        assert!(packed.contains("<file path=\"src/main.rs\">\nfn main() {}\n</file>"));
        assert!(packed.contains("├── src\n│   └── main.rs\n"));
        assert!(!packed.contains("<file path=\"logo.png\">"));
    }

    #[tokio::test]
    async fn test_private_pack_needs_token() {
        let (service, source) = service();
        let user = UserContext::new("u1");
        let result = service.generate("https://github.com/o/r", Some(&user), Visibility::Private).await;
        assert!(matches!(result, Err(BriefError::AuthRequired)));
        assert!(source.reads.lock().unwrap().is_empty());
        assert!(service.store().latest("https://github.com/o/r", None).await.is_none());
    }

    #[tokio::test]
    async fn test_latest_context_is_newest_for_user() {
        let (service, _) = service();
        let url = "https://github.com/o/r";
        let first = service.generate(url, Some(&UserContext::new("u1")), Visibility::Public).await.unwrap();
        let second = service.generate(url, Some(&UserContext::new("u1")), Visibility::Public).await.unwrap();
        let other = service.generate(url, Some(&UserContext::new("u2")), Visibility::Public).await.unwrap();

        let store = service.store();
        assert_eq!(store.latest(url, Some("u1")).await.unwrap().id, second.id);
        assert_ne!(store.latest(url, Some("u1")).await.unwrap().id, first.id);
        assert_eq!(store.latest(url, None).await.unwrap().id, other.id);
        assert!(store.latest(url, Some("u3")).await.is_none());
        assert!(store.latest("https://github.com/o/other", None).await.is_none());
    }
}
