//! Flat git tree listing to nested directory forest

use crate::types::{GitObjectType, GitTreeNode, NodeType, RepoTreeNode};

/// Build a nested forest from the flat `{path, type}` listing
///
/// Each path is split on `/` and inserted one segment at a time under a
/// synthetic root. Every segment but the last becomes a directory; the last
/// takes the entry's own type. With `max_depth = Some(n)` (n > 0) paths are
/// cut to their first `n` segments. The root's children are returned.
///
/// Children are matched by name with a linear scan, so sibling order is the
/// order in which names first appear in `flat_nodes`.
pub fn build_repo_tree(flat_nodes: &[GitTreeNode], max_depth: Option<usize>) -> Vec<RepoTreeNode> {
    let mut root = RepoTreeNode::dir("", Vec::new());

    for entry in flat_nodes {
        let mut parts: Vec<&str> = entry.path.split('/').filter(|p| !p.is_empty()).collect();
        if let Some(depth) = max_depth.filter(|d| *d > 0) {
            parts.truncate(depth);
        }

        let last = parts.len().saturating_sub(1);
        let mut current = &mut root;
        for (i, part) in parts.iter().enumerate() {
            let node_type = if i == last {
                leaf_type(entry.object_type)
            } else {
                NodeType::Dir
            };
            current = child_entry(current, part, node_type);
        }
    }

    root.children
}

fn leaf_type(object_type: GitObjectType) -> NodeType {
    match object_type {
        GitObjectType::Tree => NodeType::Dir,
        GitObjectType::Blob | GitObjectType::Commit => NodeType::File,
    }
}

/// Find `name` among `parent`'s children, inserting it when absent.
///
/// An existing node keeps its type, except that a file about to receive
/// children is promoted to a directory.
fn child_entry<'a>(parent: &'a mut RepoTreeNode, name: &str, node_type: NodeType) -> &'a mut RepoTreeNode {
    let index = match parent.children.iter().position(|c| c.name == name) {
        Some(index) => {
            let existing = &mut parent.children[index];
            if node_type == NodeType::Dir && existing.node_type == NodeType::File {
                existing.node_type = NodeType::Dir;
            }
            index
        }
        None => {
            parent.children.push(RepoTreeNode {
                name: name.to_string(),
                node_type,
                children: Vec::new(),
            });
            parent.children.len() - 1
        }
    };
    &mut parent.children[index]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sample() -> Vec<GitTreeNode> {
        vec![
            GitTreeNode::blob("README.md"),
            GitTreeNode::tree("src"),
            GitTreeNode::blob("src/main.rs"),
            GitTreeNode::tree("src/bin"),
            GitTreeNode::blob("src/bin/cli.rs"),
            GitTreeNode::blob("Cargo.toml"),
        ]
    }

    fn leaves(nodes: &[RepoTreeNode], prefix: &str, out: &mut Vec<String>) {
        for node in nodes {
            let path = if prefix.is_empty() {
                node.name.clone()
            } else {
                format!("{}/{}", prefix, node.name)
            };
            if node.children.is_empty() {
                out.push(path);
            } else {
                leaves(&node.children, &path, out);
            }
        }
    }

    fn assert_unique_children(nodes: &[RepoTreeNode]) {
        let names: HashSet<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names.len(), nodes.len());
        for node in nodes {
            if node.node_type == NodeType::File {
                assert!(node.children.is_empty());
            }
            assert_unique_children(&node.children);
        }
    }

    #[test]
    fn test_builds_nested_forest() {
        let tree = build_repo_tree(&sample(), None);

        let names: Vec<_> = tree.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["README.md", "src", "Cargo.toml"]);

        let src = &tree[1];
        assert_eq!(src.node_type, NodeType::Dir);
        assert_eq!(src.children[0], RepoTreeNode::file("main.rs"));
        assert_eq!(src.children[1].name, "bin");
        assert_eq!(src.children[1].children[0], RepoTreeNode::file("cli.rs"));
        assert_unique_children(&tree);
    }

    #[test]
    fn test_leaves_match_inputs_one_to_one() {
        let flat = vec![
            GitTreeNode::blob("a/b/c.txt"),
            GitTreeNode::blob("a/b/d.txt"),
            GitTreeNode::blob("a/e.txt"),
            GitTreeNode::tree("empty"),
            GitTreeNode::blob("z.txt"),
        ];
        let tree = build_repo_tree(&flat, None);

        let mut out = Vec::new();
        leaves(&tree, "", &mut out);
        out.sort();
        assert_eq!(out, vec!["a/b/c.txt", "a/b/d.txt", "a/e.txt", "empty", "z.txt"]);
        assert_unique_children(&tree);
    }

    #[test]
    fn test_missing_intermediate_dirs_are_created() {
        let tree = build_repo_tree(&[GitTreeNode::blob("deep/er/file.rs")], None);
        assert_eq!(tree[0].name, "deep");
        assert_eq!(tree[0].node_type, NodeType::Dir);
        assert_eq!(tree[0].children[0].node_type, NodeType::Dir);
        assert_eq!(tree[0].children[0].children[0].node_type, NodeType::File);
    }

    #[test]
    fn test_max_depth_truncates_paths() {
        let tree = build_repo_tree(&sample(), Some(1));
        assert_eq!(tree.len(), 3);
        assert!(tree.iter().all(|n| n.children.is_empty()));
        // "src/main.rs" cut to "src" reuses the node made by the "src" tree entry
        assert_eq!(tree[1].node_type, NodeType::Dir);

        let tree = build_repo_tree(&sample(), Some(2));
        let src = &tree[1];
        assert_eq!(src.children.len(), 2);
        assert!(src.children[1].children.is_empty());
    }

    #[test]
    fn test_zero_depth_means_full_depth() {
        assert_eq!(build_repo_tree(&sample(), Some(0)), build_repo_tree(&sample(), None));
    }

    #[test]
    fn test_duplicate_paths_are_idempotent() {
        let flat = vec![GitTreeNode::blob("a/b.txt"), GitTreeNode::blob("a/b.txt")];
        let tree = build_repo_tree(&flat, None);
        assert_eq!(tree, vec![RepoTreeNode::dir("a", vec![RepoTreeNode::file("b.txt")])]);
    }

    #[test]
    fn test_conflicting_types_keep_first_and_promote_on_descent() {
        let flat = vec![GitTreeNode::tree("x"), GitTreeNode::blob("x")];
        assert_eq!(build_repo_tree(&flat, None)[0].node_type, NodeType::Dir);

        let flat = vec![GitTreeNode::blob("x"), GitTreeNode::blob("x/y")];
        let tree = build_repo_tree(&flat, None);
        assert_eq!(tree[0].node_type, NodeType::Dir);
        assert_eq!(tree[0].children[0], RepoTreeNode::file("y"));
    }

    #[test]
    fn test_submodules_become_files() {
        let mut entry = GitTreeNode::blob("vendor/lib");
        entry.object_type = GitObjectType::Commit;
        let tree = build_repo_tree(&[entry], None);
        assert_eq!(tree[0].children[0].node_type, NodeType::File);
    }

    #[test]
    fn test_empty_input() {
        assert!(build_repo_tree(&[], None).is_empty());
        assert!(build_repo_tree(&[GitTreeNode::blob("")], None).is_empty());
    }
}
