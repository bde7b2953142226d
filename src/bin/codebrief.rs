use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use codebrief::{
    assign_dfs_indices, calculate_language_breakdown, format_repo_tree_to_markdown, llm, logging,
    prompt, reveal_delay, Cache, Config, ContextStore, DfsRepoTreeNode, DiskCache, GitHubClient,
    MemoryCache, NoCache, ProviderSet, RepoContextService, RepoTreeStore, ReportNotifier,
    ReportRequest, ReportService, ReportStore, Result, TreeSource, UserContext, Visibility,
};

#[derive(Parser)]
#[command(name = "codebrief", version, about = "Repository trees and LLM reports for GitHub repositories")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true, default_value = "codebrief.toml")]
    config: PathBuf,

    /// Log filter, overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Signed-in user id; enables cache writes
    #[arg(long, global = true)]
    user: Option<String>,

    /// GitHub token of the user's linked account
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Treat the repository as private; requires a token
    #[arg(long, global = true)]
    private: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the repository tree
    Tree {
        url: String,
        /// Limit depth; renders fresh instead of using the cache
        #[arg(long)]
        depth: Option<usize>,
        /// Show each node's reveal delay
        #[arg(long)]
        reveal: bool,
    },
    /// Print the language breakdown
    Languages { url: String },
    /// Print the repository description
    Describe { url: String },
    /// Inspect or drop cached trees
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Pack the repository's code and text files into one context document
    Context { url: String },
    /// List report sections
    Sections,
    /// List supported models
    Models,
    /// Generate a report
    Report {
        url: String,
        #[arg(long, default_value = "gpt-4o-mini")]
        model: String,
        /// Section to include; repeatable
        #[arg(long = "section", required = true)]
        sections: Vec<String>,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report whether a repository's tree is cached
    Status { url: String },
    /// Drop the cached tree for a repository
    Evict { url: String },
    /// Drop every cached tree
    Clear,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(&cli.config).and_then(Config::apply_env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    if let Err(e) = logging::init(&level) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    let cache: Arc<dyn Cache> = match &config.cache_dir {
        _ if !config.cache_enabled => Arc::new(NoCache),
        Some(dir) => Arc::new(DiskCache::new(dir.clone()).await?),
        None => Arc::new(MemoryCache::new()),
    };
    let github: Arc<dyn TreeSource> =
        Arc::new(GitHubClient::with_api_root(&config.user_agent, &config.github_api_root));
    let store = Arc::new(RepoTreeStore::from_config(github.clone(), cache, &config));
    let contexts = Arc::new(RepoContextService::from_config(
        github,
        Arc::new(ContextStore::new()),
        &config,
    ));
    let visibility = if cli.private {
        Visibility::Private
    } else {
        Visibility::Public
    };

    let user = cli.user.map(|id| UserContext {
        user_id: id,
        access_token: cli.token.clone(),
    });

    match cli.command {
        Command::Tree { url, depth: Some(depth), .. } => {
            let formatted = store.get_repo_tree_formatted(&url, Some(depth)).await?;
            println!("{}", formatted.markdown);
        }
        Command::Tree { url, depth: None, reveal } => {
            let tree = store.get_or_build_tree_as(&url, user.as_ref(), visibility).await?;
            if reveal {
                let step = Duration::from_millis(config.reveal_delay_ms);
                print_reveal(&assign_dfs_indices(&tree.tree_data), step, 0);
            } else {
                println!("{}", format_repo_tree_to_markdown(&tree.tree_data));
            }
        }
        Command::Languages { url } => {
            let tree = store.get_or_build_tree_as(&url, user.as_ref(), visibility).await?;
            for entry in calculate_language_breakdown(&tree.tree_data) {
                println!("{:<12} {:>6.2}%  {}", entry.language, entry.percentage, entry.color);
            }
        }
        Command::Describe { url } => {
            let description = store.get_repo_description(&url).await?;
            println!("{}", description.unwrap_or_default());
        }
        Command::Cache { action } => match action {
            CacheAction::Status { url } => {
                let status = if store.is_cached(&url).await { "cached" } else { "not cached" };
                println!("{}: {}", url, status);
            }
            CacheAction::Evict { url } => store.evict(&url).await?,
            CacheAction::Clear => store.clear().await?,
        },
        Command::Context { url } => {
            let context = contexts.generate(&url, user.as_ref(), visibility).await?;
            println!("{}", context.context);
        }
        Command::Sections => {
            for name in prompt::section_names() {
                println!("{}", name);
            }
        }
        Command::Models => {
            for (provider, models) in llm::supported_models() {
                println!("{}: {}", provider, models.join(", "));
            }
        }
        Command::Report { url, model, sections } => {
            let user = user.unwrap_or_else(|| UserContext {
                user_id: "local".to_string(),
                access_token: cli.token.clone(),
            });
            let service = ReportService::new(
                store,
                contexts,
                Arc::new(ReportStore::new()),
                Arc::new(ProviderSet::from_config(&config)),
                ReportNotifier::new(),
            );
            let mut request = ReportRequest::new(url, model).with_sections(sections);
            request.visibility = visibility;
            let report = service.generate(&user, &request).await?;
            println!("{}", report.content.unwrap_or_default());
        }
    }
    Ok(())
}

fn print_reveal(nodes: &[DfsRepoTreeNode], step: Duration, indent: usize) {
    for node in nodes {
        println!(
            "{:>6}ms  {}{}",
            reveal_delay(node, step).as_millis(),
            "  ".repeat(indent),
            node.name
        );
        print_reveal(&node.children, step, indent + 1);
    }
}
