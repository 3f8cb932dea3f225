use crate::node::Node;

pub const ASCII_HEADER: &str = "R,G,B = F(X,Y) :";

/// Every node with its depth, root first, children in order.
pub fn walk_preorder(root: &Node) -> Vec<(usize, &Node)> {
    let mut out = Vec::new();
    let mut stack = vec![(0, root)];
    while let Some((depth, node)) = stack.pop() {
        out.push((depth, node));
        for child in node.children().iter().rev() {
            stack.push((depth + 1, child));
        }
    }
    out
}

pub fn size(node: &Node) -> usize {
    1 + node.children().iter().map(size).sum::<usize>()
}

pub fn depth(node: &Node) -> usize {
    1 + node.children().iter().map(depth).max().unwrap_or(0)
}

/// Indented dump of the tree, one `describe()` line per node.
pub fn ascii_tree(root: &Node) -> String {
    let mut out = String::from(ASCII_HEADER);
    out.push('\n');
    for (depth, node) in walk_preorder(root) {
        out.push_str(&"   ".repeat(depth));
        out.push_str("--");
        out.push_str(&node.describe());
        out.push('\n');
    }
    out
}
