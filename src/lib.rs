pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod github;
pub mod language;
pub mod llm;
pub mod logging;
pub mod notify;
pub mod prompt;
pub mod report;
pub mod source;
pub mod store;
pub mod tree;
pub mod types;
pub mod url;
pub mod view;
pub mod visualize;

pub use cache::{Cache, DiskCache, MemoryCache, NoCache};
pub use config::Config;
pub use context::{pack_repository, ContextStore, ContextStyle, PackedFile, RepoContextService};
pub use error::{BriefError, Result};
pub use github::GitHubClient;
pub use language::{infer_file_type, infer_language, FileType, LanguageDetail};
pub use llm::{LlmProvider, Model, Provider, ProviderSet};
pub use notify::{ReportNotifier, ReportSubscription};
pub use report::{build_repo_context, ReportRequest, ReportService, ReportStore};
pub use source::TreeSource;
pub use store::RepoTreeStore;
pub use tree::build_repo_tree;
pub use types::{
    CachedRepoTree, CachedTree, DfsRepoTreeNode, FormattedTree, GitObjectType, GitTreeNode,
    GitTreeResponse, LanguageBreakdown, NodeType, RepoContext, RepoMetadata, RepoTreeNode, Report,
    ReportStatus, UserContext, Visibility,
};
pub use url::{parse_repo_url, RepoInfo};
pub use view::{RepoReportState, RepoReportView};
pub use visualize::{
    assign_dfs_indices, calculate_language_breakdown, format_repo_tree_to_markdown, reveal_delay,
};
