use alloc::{string::String, vec::Vec};

use crate::{
    tree::{NodeData, NodeId},
    Property, Tree,
};

/// One node under construction
pub struct NodeBuilder {
    name: String,
    props: Vec<Property>,
    children: Vec<NodeBuilder>,
}

impl NodeBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: String::from(name),
            props: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn prop(&mut self, prop: Property) -> &mut Self {
        self.props.push(prop);
        self
    }

    pub fn flag(&mut self, name: &str) -> &mut Self {
        self.prop(Property::flag(name))
    }

    pub fn u32(&mut self, name: &str, value: u32) -> &mut Self {
        self.prop(Property::u32(name, value))
    }

    pub fn u32s(&mut self, name: &str, cells: &[u32]) -> &mut Self {
        self.prop(Property::u32s(name, cells))
    }

    pub fn string(&mut self, name: &str, value: &str) -> &mut Self {
        self.prop(Property::string(name, value))
    }

    pub fn strings(&mut self, name: &str, values: &[&str]) -> &mut Self {
        self.prop(Property::strings(name, values))
    }

    pub fn compatible(&mut self, values: &[&str]) -> &mut Self {
        self.strings("compatible", values)
    }

    pub fn phandle(&mut self, phandle: u32) -> &mut Self {
        self.u32("phandle", phandle)
    }

    pub fn disabled(&mut self) -> &mut Self {
        self.string("status", "disabled")
    }

    /// Append a child node, filled in by `f`
    pub fn node(&mut self, name: &str, f: impl FnOnce(&mut NodeBuilder)) -> &mut Self {
        let mut child = NodeBuilder::new(name);
        f(&mut child);
        self.children.push(child);
        self
    }

    fn flatten(self, nodes: &mut Vec<NodeData>, parent: Option<NodeId>) {
        let id = NodeId(nodes.len());
        nodes.push(NodeData {
            name: self.name,
            parent,
            children: Vec::new(),
            props: self.props,
        });
        if let Some(parent) = parent {
            nodes[parent.0].children.push(id);
        }
        for child in self.children {
            child.flatten(nodes, Some(id));
        }
    }
}

/// Assembles a [`Tree`] in document order
///
/// ```
/// use oreboot_fdt::TreeBuilder;
///
/// let tree = TreeBuilder::new()
///     .node("uart@1000", |n| {
///         n.compatible(&["ns16550a"]).u32("reg", 0x1000);
///     })
///     .build();
/// assert!(tree.find_node("/uart@1000").is_some());
/// ```
pub struct TreeBuilder {
    root: NodeBuilder,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            root: NodeBuilder::new(""),
        }
    }

    /// Properties of the root node itself
    pub fn root(mut self, f: impl FnOnce(&mut NodeBuilder)) -> Self {
        f(&mut self.root);
        self
    }

    pub fn node(mut self, name: &str, f: impl FnOnce(&mut NodeBuilder)) -> Self {
        self.root.node(name, f);
        self
    }

    pub fn build(self) -> Tree {
        let mut nodes = Vec::new();
        self.root.flatten(&mut nodes, None);
        Tree::from_nodes(nodes)
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
