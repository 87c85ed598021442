//! Tree display utilities for query expressions.

use std::fmt;

/// A node in a display tree.
pub trait TreeNode {
    /// Display label of this node.
    fn label(&self) -> String;

    /// Child nodes, in display order.
    fn children(&self) -> Vec<&dyn TreeNode> {
        Vec::new()
    }

    /// Additional details shown in parentheses after the label.
    fn details(&self) -> Option<String> {
        None
    }
}

/// Helper for displaying tree structures.
pub struct DisplayTree<'a> {
    root: &'a dyn TreeNode,
}

impl<'a> DisplayTree<'a> {
    /// Create a new display tree.
    pub fn new(root: &'a dyn TreeNode) -> Self {
        Self { root }
    }

    fn fmt_line(f: &mut fmt::Formatter<'_>, node: &dyn TreeNode) -> fmt::Result {
        write!(f, "{}", node.label())?;
        if let Some(details) = node.details() {
            write!(f, " ({details})")?;
        }
        writeln!(f)
    }

    fn fmt_children(f: &mut fmt::Formatter<'_>, node: &dyn TreeNode, prefix: &str) -> fmt::Result {
        let children = node.children();
        let last = children.len().saturating_sub(1);

        for (i, child) in children.into_iter().enumerate() {
            let is_last = i == last;
            let connector = if is_last { "└─ " } else { "├─ " };
            write!(f, "{prefix}{connector}")?;
            Self::fmt_line(f, child)?;

            let child_prefix = format!("{prefix}{}", if is_last { "   " } else { "│  " });
            Self::fmt_children(f, child, &child_prefix)?;
        }

        Ok(())
    }
}

impl fmt::Display for DisplayTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Self::fmt_line(f, self.root)?;
        Self::fmt_children(f, self.root, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestNode {
        label: &'static str,
        details: Option<&'static str>,
        children: Vec<TestNode>,
    }

    impl TestNode {
        fn leaf(label: &'static str) -> Self {
            Self {
                label,
                details: None,
                children: vec![],
            }
        }
    }

    impl TreeNode for TestNode {
        fn label(&self) -> String {
            self.label.to_string()
        }

        fn children(&self) -> Vec<&dyn TreeNode> {
            self.children.iter().map(|c| c as &dyn TreeNode).collect()
        }

        fn details(&self) -> Option<String> {
            self.details.map(str::to_string)
        }
    }

    #[test]
    fn test_display_tree() {
        let tree = TestNode {
            label: "Union",
            details: Some("comparer=default"),
            children: vec![TestNode::leaf("Source(a)"), TestNode::leaf("Source(b)")],
        };

        let output = DisplayTree::new(&tree).to_string();
        assert_eq!(
            output,
            "Union (comparer=default)\n├─ Source(a)\n└─ Source(b)\n"
        );
    }

    #[test]
    fn test_nested_prefixes() {
        let tree = TestNode {
            label: "Root",
            details: None,
            children: vec![TestNode {
                label: "Mid",
                details: None,
                children: vec![TestNode::leaf("Leaf")],
            }],
        };

        let output = DisplayTree::new(&tree).to_string();
        assert_eq!(output, "Root\n└─ Mid\n   └─ Leaf\n");
    }
}
