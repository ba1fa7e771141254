//! Command tree rendering for `--list`

use termtree::Tree;

use super::aggregator::{MountNode, RootApplication};
use crate::domain::{CommandSpec, Registry};

/// Render every mounted group and visible command as a tree.
///
/// Hidden commands are left out; aliases follow the command name and
/// groups whose script failed to load are marked.
pub fn command_tree(root: &RootApplication) -> Tree<String> {
    let name = root.command().get_name().to_string();
    let mut tree = Tree::new(name);
    for (segment, node) in &root.tree.children {
        tree.push(group_tree(segment, node, &root.registry));
    }
    tree
}

fn group_tree(segment: &str, node: &MountNode, registry: &Registry) -> Tree<String> {
    let mut label = segment.to_string();
    let entry = node.app.as_ref().and_then(|ns| registry.get(ns));
    if let Some(help) = entry.and_then(|e| e.app.help()) {
        label = format!("{label} - {}", first_line(help));
    }
    if let Some(failure) = node.broken.and_then(|idx| registry.failures().get(idx)) {
        label = format!("{label} [failed to load: {}]", failure.message);
    }

    let mut tree = Tree::new(label);
    if let Some(entry) = entry {
        for spec in entry.app.commands().iter().filter(|c| !c.hidden) {
            tree.push(Tree::new(command_label(spec)));
        }
    }
    for (child_segment, child) in &node.children {
        tree.push(group_tree(child_segment, child, registry));
    }
    tree
}

fn command_label(spec: &CommandSpec) -> String {
    let mut label = spec.name.clone();
    if !spec.aliases.is_empty() {
        label = format!("{label} ({})", spec.aliases.join(", "));
    }
    match spec.help.as_deref() {
        Some(help) => format!("{label} - {}", first_line(help)),
        None => label,
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}
