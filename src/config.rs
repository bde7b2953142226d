//! Runtime configuration
//!
//! Values come from, lowest to highest priority: built-in defaults, an
//! optional TOML file, then `CODEBRIEF_*` environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::context::ContextStyle;
use crate::error::{BriefError, Result};
use crate::url::GITHUB_API_ROOT;

/// CodeBrief configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// GitHub REST API root
    #[serde(default = "default_api_root")]
    pub github_api_root: String,

    /// Branch whose head tree is fetched
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// User-Agent sent to GitHub, which rejects requests without one
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Persist trees at all; when off every lookup goes upstream
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Directory for the on-disk tree cache; in-memory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Depth used by formatted (Markdown) tree queries
    #[serde(default = "default_formatted_depth")]
    pub formatted_depth: usize,

    /// Per-node stagger of the tree reveal animation, in milliseconds
    #[serde(default = "default_reveal_delay_ms")]
    pub reveal_delay_ms: u64,

    /// Layout of packed repository contexts
    #[serde(default)]
    pub context_style: ContextStyle,

    /// Files larger than this are left out of packed contexts
    #[serde(default = "default_context_max_file_bytes")]
    pub context_max_file_bytes: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,

    /// Log filter directive, e.g. `info` or `codebrief=debug`
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_api_root() -> String {
    GITHUB_API_ROOT.to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_user_agent() -> String {
    format!("codebrief/{}", env!("CARGO_PKG_VERSION"))
}

fn default_formatted_depth() -> usize {
    2
}

fn default_reveal_delay_ms() -> u64 {
    50
}

fn default_context_max_file_bytes() -> u64 {
    512 * 1024
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github_api_root: default_api_root(),
            default_branch: default_branch(),
            user_agent: default_user_agent(),
            cache_enabled: true,
            cache_dir: None,
            formatted_depth: default_formatted_depth(),
            reveal_delay_ms: default_reveal_delay_ms(),
            context_style: ContextStyle::default(),
            context_max_file_bytes: default_context_max_file_bytes(),
            openai_api_key: None,
            gemini_api_key: None,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load config from a TOML file, or return defaults if it doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| BriefError::InvalidConfig {
            message: e.to_string(),
        })
    }

    /// Overlay values from the process environment
    pub fn apply_env(self) -> Result<Self> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    /// Overlay values from `lookup`; empty values are ignored
    pub fn apply_vars<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(v) = var("CODEBRIEF_GITHUB_API_ROOT") {
            self.github_api_root = v;
        }
        if let Some(v) = var("CODEBRIEF_DEFAULT_BRANCH") {
            self.default_branch = v;
        }
        if let Some(v) = var("CODEBRIEF_USER_AGENT") {
            self.user_agent = v;
        }
        if let Some(v) = var("CODEBRIEF_CACHE_ENABLED") {
            self.cache_enabled = v.parse().map_err(|_| BriefError::InvalidConfig {
                message: format!("CODEBRIEF_CACHE_ENABLED must be true or false, got {:?}", v),
            })?;
        }
        if let Some(v) = var("CODEBRIEF_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = var("CODEBRIEF_FORMATTED_DEPTH") {
            self.formatted_depth = parse_number("CODEBRIEF_FORMATTED_DEPTH", &v)?;
        }
        if let Some(v) = var("CODEBRIEF_REVEAL_DELAY_MS") {
            self.reveal_delay_ms = parse_number("CODEBRIEF_REVEAL_DELAY_MS", &v)?;
        }
        if let Some(v) = var("CODEBRIEF_CONTEXT_STYLE") {
            self.context_style = v.parse()?;
        }
        if let Some(v) = var("CODEBRIEF_CONTEXT_MAX_FILE_BYTES") {
            self.context_max_file_bytes = parse_number("CODEBRIEF_CONTEXT_MAX_FILE_BYTES", &v)?;
        }
        if let Some(v) = var("CODEBRIEF_LOG") {
            self.log_level = v;
        }
        if let Some(v) = var("OPENAI_API_KEY") {
            self.openai_api_key = Some(v);
        }
        if let Some(v) = var("GEMINI_API_KEY") {
            self.gemini_api_key = Some(v);
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.github_api_root.starts_with("http://") && !self.github_api_root.starts_with("https://") {
            return Err(BriefError::InvalidConfig {
                message: format!("github_api_root must be an http(s) URL, got {}", self.github_api_root),
            });
        }
        if self.default_branch.trim().is_empty() {
            return Err(BriefError::InvalidConfig {
                message: "default_branch must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| BriefError::InvalidConfig {
        message: format!("{} must be a non-negative integer, got {:?}", name, value),
    })
}
