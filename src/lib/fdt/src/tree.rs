use alloc::{collections::BTreeMap, string::String, vec::Vec};
use log::{debug, error};

use crate::{FdtError, Property};

/// Index of a node inside its [`Tree`]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

pub(crate) struct NodeData {
    pub(crate) name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) props: Vec<Property>,
}

/// An owned hardware description
///
/// Nodes are stored in document pre-order, so iterating `0..len` visits them
/// in the order a flattened blob lists them. The root node is always index 0.
pub struct Tree {
    nodes: Vec<NodeData>,
    phandles: BTreeMap<u32, NodeId>,
}

impl Tree {
    pub(crate) fn from_nodes(nodes: Vec<NodeData>) -> Self {
        let mut phandles = BTreeMap::new();
        for (i, node) in nodes.iter().enumerate() {
            let phandle = node
                .props
                .iter()
                .find(|p| p.name() == "phandle" || p.name() == "linux,phandle")
                .and_then(Property::as_u32);
            if let Some(ph) = phandle {
                phandles.insert(ph, NodeId(i));
            }
        }

        Self { nodes, phandles }
    }

    /// Import a flattened devicetree blob
    pub fn from_fdt(blob: &[u8]) -> Result<Self, FdtError> {
        let fdt = fdt::Fdt::new(blob).map_err(|e| {
            error!("fdt: cannot parse blob: {:?}", e);
            FdtError::BadBlob
        })?;
        let root = fdt.find_node("/").ok_or(FdtError::MissingRoot)?;

        let mut nodes = Vec::new();
        import(&mut nodes, None, root);
        debug!("fdt: imported {} nodes", nodes.len());

        Ok(Self::from_nodes(nodes))
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    /// Full node name, including any unit address
    pub fn name(&self, id: NodeId) -> &str {
        &self.data(id).name
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.data(id).children
    }

    pub fn properties(&self, id: NodeId) -> &[Property] {
        &self.data(id).props
    }

    pub fn property(&self, id: NodeId, name: &str) -> Option<&Property> {
        self.properties(id).iter().find(|p| p.name() == name)
    }

    /// Find a direct child by name
    ///
    /// A name without a unit address also matches a child that has one, so
    /// `"serial"` finds `serial@1000` when it is the first such child.
    pub fn subnode(&self, id: NodeId, name: &str) -> Option<NodeId> {
        let exact = name.contains('@');
        self.children(id).iter().copied().find(|child| {
            let full = self.name(*child);
            full == name || (!exact && full.split('@').next() == Some(name))
        })
    }

    pub fn path(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut cur = Some(id);
        while let Some(node) = cur {
            if self.parent(node).is_some() {
                parts.push(self.name(node));
            }
            cur = self.parent(node);
        }
        if parts.is_empty() {
            return String::from("/");
        }
        let mut path = String::new();
        for part in parts.iter().rev() {
            path.push('/');
            path.push_str(part);
        }
        path
    }

    /// Look a node up by absolute path or by alias name
    pub fn find_node(&self, path: &str) -> Option<NodeId> {
        if !path.starts_with('/') {
            let target = self.alias_path(path).filter(|t| t.starts_with('/'))?;
            return self.find_node(target);
        }
        let mut node = self.root();
        for section in path.split('/').filter(|s| !s.is_empty()) {
            node = self.subnode(node, section)?;
        }
        Some(node)
    }

    pub fn find_phandle(&self, phandle: u32) -> Option<NodeId> {
        self.phandles.get(&phandle).copied()
    }

    fn aliases(&self) -> &[Property] {
        match self.subnode(self.root(), "aliases") {
            Some(id) => self.properties(id),
            None => &[],
        }
    }

    fn alias_path(&self, alias: &str) -> Option<&str> {
        self.aliases()
            .iter()
            .find(|p| p.name() == alias)
            .and_then(Property::as_str)
    }

    /// Sequence number given to `id` by an alias such as `serial2`
    pub fn alias_id(&self, stem: &str, id: NodeId) -> Option<u32> {
        self.aliases().iter().find_map(|p| {
            let n = alias_number(p.name(), stem)?;
            let target = self.find_node(p.as_str()?)?;
            (target == id).then_some(n)
        })
    }

    /// Highest sequence number any alias with this stem claims
    pub fn alias_highest_id(&self, stem: &str) -> Option<u32> {
        self.aliases()
            .iter()
            .filter_map(|p| alias_number(p.name(), stem))
            .max()
    }

    /// Node named by `/chosen/stdout-path`, with any `:options` suffix dropped
    pub fn chosen_stdout(&self) -> Option<NodeId> {
        let chosen = self.subnode(self.root(), "chosen")?;
        let path = self.property(chosen, "stdout-path")?.as_str()?;
        let path = path.split(':').next()?;
        self.find_node(path)
    }
}

fn alias_number(name: &str, stem: &str) -> Option<u32> {
    let digits = name.strip_prefix(stem)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn import(nodes: &mut Vec<NodeData>, parent: Option<NodeId>, node: fdt::node::FdtNode<'_, '_>) {
    let id = NodeId(nodes.len());
    let name = if parent.is_none() { "" } else { node.name };
    nodes.push(NodeData {
        name: String::from(name),
        parent,
        children: Vec::new(),
        props: node
            .properties()
            .map(|p| Property::new(p.name, p.value.to_vec()))
            .collect(),
    });
    if let Some(parent) = parent {
        nodes[parent.0].children.push(id);
    }
    for child in node.children() {
        import(nodes, Some(id), child);
    }
}
