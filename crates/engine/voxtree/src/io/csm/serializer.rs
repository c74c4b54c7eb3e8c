use crate::core::{ChildIndex, NodeId, Octree};
use std::fmt::{self, Display, Write as FmtWrite};

/// Serialize a tree's items to CSM text in depth-first order
pub fn serialize_csm<T>(tree: &Octree<T>) -> String
where
    T: Clone + PartialEq + fmt::Debug + Display,
{
    let mut output = String::new();
    serialize_node(tree, tree.root(), &mut output);
    output
}

fn serialize_node<T>(tree: &Octree<T>, id: NodeId, output: &mut String)
where
    T: Clone + PartialEq + fmt::Debug + Display,
{
    let Some(node) = tree.node(id) else {
        return;
    };
    if let Some(item) = node.item() {
        write_statement(&node.path().to_string(), &item.to_string(), output);
        return;
    }
    if node.is_leaf() {
        return;
    }

    if let Some(array) = leaf_array(tree, id) {
        write_statement(&node.path().to_string(), &array, output);
        return;
    }
    for (_, child) in node.children() {
        serialize_node(tree, child, output);
    }
}

/// Format children as an array like "[1 2 _ 4 5 6 7 8]" when every occupied
/// slot is a solid leaf and at least half of them are filled
fn leaf_array<T>(tree: &Octree<T>, id: NodeId) -> Option<String>
where
    T: Clone + PartialEq + fmt::Debug + Display,
{
    let node = tree.node(id)?;
    if node.child_count() < 4 {
        return None;
    }
    let mut values = Vec::with_capacity(8);
    for index in ChildIndex::all() {
        match node.child(index) {
            None => values.push("_".to_string()),
            Some(child) => {
                let child = tree.node(child)?;
                if !child.is_solid() {
                    return None;
                }
                values.push(child.item()?.to_string());
            }
        }
    }
    Some(format!("[{}]", values.join(" ")))
}

/// Write a CSM statement like ">abc 42" or ">a [1 2 3 4 5 6 7 8]"
fn write_statement(path: &str, value: &str, output: &mut String) {
    let _ = writeln!(output, ">{path} {value}");
}
