//! ASCII tree rendering for feature hierarchies.

use crate::models::FeatureTreeNode;

const ON: char = '●';
const GATED: char = '○';
const OFF: char = '✗';

/// Symbol for a node: on, enabled but switched off by an ancestor, or off.
fn state_symbol(node: &FeatureTreeNode) -> char {
    match (node.status.enabled, node.status.effective) {
        (_, true) => ON,
        (true, false) => GATED,
        (false, false) => OFF,
    }
}

/// Render a feature tree as ASCII art with status symbols.
///
/// Example output:
/// ```text
/// ✗ monitor
/// ├── ○ cpu
/// │   └── ○ cpu-cores
/// └── ✗ memory
/// ● email
/// ```
pub fn render_tree(nodes: &[FeatureTreeNode]) -> String {
    let mut output = String::new();
    for (i, node) in nodes.iter().enumerate() {
        let is_last = i == nodes.len() - 1;
        render_node(&mut output, node, "", is_last, true);
    }
    output
}

fn render_node(
    output: &mut String,
    node: &FeatureTreeNode,
    prefix: &str,
    is_last: bool,
    is_root: bool,
) {
    if !is_root {
        let branch = if is_last { "└── " } else { "├── " };
        output.push_str(prefix);
        output.push_str(branch);
    }
    output.push(state_symbol(node));
    output.push(' ');
    output.push_str(&node.status.key);
    output.push('\n');

    let child_prefix = if is_root {
        String::new()
    } else {
        let continuation = if is_last { "    " } else { "│   " };
        format!("{}{}", prefix, continuation)
    };

    for (i, child) in node.children.iter().enumerate() {
        let child_is_last = i == node.children.len() - 1;
        render_node(output, child, &child_prefix, child_is_last, false);
    }
}
