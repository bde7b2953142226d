//! File extension lookups

use serde::{Deserialize, Serialize};

/// Language name and its display color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageDetail {
    pub language: &'static str,
    pub color: &'static str,
}

const fn lang(language: &'static str, color: &'static str) -> LanguageDetail {
    LanguageDetail { language, color }
}

/// Broad category of a file, used to pick a viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Image,
    Code,
    Text,
    Unknown,
}

/// Lowercased text after the last `.`, if the name has one
fn extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

/// Language of a file judged by its extension
pub fn infer_language(filename: &str) -> Option<LanguageDetail> {
    let detail = match extension(filename)?.as_str() {
        "ts" | "tsx" => lang("TypeScript", "#3178c6"),
        "js" | "jsx" => lang("JavaScript", "#f1e05a"),
        "py" => lang("Python", "#3572A5"),
        "java" => lang("Java", "#b07219"),
        "rb" => lang("Ruby", "#701516"),
        "php" => lang("PHP", "#4F5D95"),
        "cs" => lang("C#", "#178600"),
        "cpp" | "c" | "h" | "hpp" => lang("C/C++", "#f34b7d"),
        "go" => lang("Go", "#00ADD8"),
        "sh" | "bash" | "zsh" | "ksh" => lang("Shell", "#89e051"),
        "html" | "htm" => lang("HTML", "#e34c26"),
        "css" => lang("CSS", "#563d7c"),
        "scss" => lang("SCSS", "#c6538c"),
        "yml" | "yaml" => lang("YAML", "#cb171e"),
        "swift" => lang("Swift", "#F05138"),
        "rs" => lang("Rust", "#dea584"),
        "kt" | "kts" => lang("Kotlin", "#A97BFF"),
        _ => return None,
    };
    Some(detail)
}

pub fn infer_file_type(filename: &str) -> FileType {
    let Some(ext) = extension(filename) else {
        return FileType::Unknown;
    };
    match ext.as_str() {
        "png" | "jpg" | "jpeg" | "gif" | "bmp" | "svg" => FileType::Image,
        "js" | "ts" | "jsx" | "tsx" | "py" | "java" | "c" | "cpp" | "cs" | "rb" | "go" | "rs" | "php" => {
            FileType::Code
        }
        "md" | "txt" | "json" | "html" | "css" | "xml" | "yml" | "yaml" => FileType::Text,
        _ => FileType::Unknown,
    }
}
