//! Read-only derivations over a built repository tree

use std::time::Duration;

use crate::language::infer_language;
use crate::types::{DfsRepoTreeNode, LanguageBreakdown, NodeType, RepoTreeNode};

/// Render the forest as an ASCII tree inside a ```` ```text ```` fence
///
/// ```text
/// ├── a.txt
/// └── dir1
///     └── b.txt
/// ```
///
/// Sibling order is the order of `tree`; nothing is sorted. Every line ends
/// in `\n` and the closing fence starts on a line of its own after that, so
/// a blank line precedes it.
pub fn format_repo_tree_to_markdown(tree: &[RepoTreeNode]) -> String {
    let mut out = String::from("```text\n");
    write_tree_lines(tree, "", &mut out);
    out.push_str("\n```");
    out
}

/// The tree lines alone, without the fence; used for packed contexts
pub(crate) fn format_repo_tree_lines(tree: &[RepoTreeNode]) -> String {
    let mut out = String::new();
    write_tree_lines(tree, "", &mut out);
    out
}

fn write_tree_lines(nodes: &[RepoTreeNode], prefix: &str, out: &mut String) {
    for (index, node) in nodes.iter().enumerate() {
        let is_last = index + 1 == nodes.len();
        out.push_str(prefix);
        out.push_str(if is_last { "└── " } else { "├── " });
        out.push_str(&node.name);
        out.push('\n');

        if !node.children.is_empty() {
            let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
            write_tree_lines(&node.children, &child_prefix, out);
        }
    }
}

/// Share of each recognized language among all recognized files
///
/// Files with unmapped extensions are left out of the denominator. Entries
/// come in order of each language's first appearance.
pub fn calculate_language_breakdown(tree: &[RepoTreeNode]) -> Vec<LanguageBreakdown> {
    let mut counts: Vec<(&'static str, &'static str, usize)> = Vec::new();
    count_languages(tree, &mut counts);

    let total: usize = counts.iter().map(|(_, _, count)| count).sum();
    if total == 0 {
        return Vec::new();
    }

    counts
        .into_iter()
        .map(|(language, color, count)| LanguageBreakdown {
            language: language.to_string(),
            percentage: count as f64 / total as f64 * 100.0,
            color: color.to_string(),
        })
        .collect()
}

fn count_languages(nodes: &[RepoTreeNode], counts: &mut Vec<(&'static str, &'static str, usize)>) {
    for node in nodes {
        match node.node_type {
            NodeType::File => {
                let Some(detail) = infer_language(&node.name) else {
                    continue;
                };
                match counts.iter_mut().find(|(language, _, _)| *language == detail.language) {
                    Some((_, _, count)) => *count += 1,
                    None => counts.push((detail.language, detail.color, 1)),
                }
            }
            NodeType::Dir => count_languages(&node.children, counts),
        }
    }
}

/// Label every node with its pre-order index across the whole forest
///
/// Siblings and descendants share one counter, so indices run `0..N`.
pub fn assign_dfs_indices(tree: &[RepoTreeNode]) -> Vec<DfsRepoTreeNode> {
    let mut next = 0;
    annotate(tree, &mut next)
}

fn annotate(nodes: &[RepoTreeNode], next: &mut usize) -> Vec<DfsRepoTreeNode> {
    nodes
        .iter()
        .map(|node| {
            let dfs_index = *next;
            *next += 1;
            DfsRepoTreeNode {
                name: node.name.clone(),
                node_type: node.node_type,
                children: annotate(&node.children, next),
                dfs_index,
            }
        })
        .collect()
}

/// Delay before `node` is revealed, `dfs_index * step`
pub fn reveal_delay(node: &DfsRepoTreeNode, step: Duration) -> Duration {
    step.saturating_mul(u32::try_from(node.dfs_index).unwrap_or(u32::MAX))
}
