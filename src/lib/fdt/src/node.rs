use alloc::{rc::Rc, string::String, vec::Vec};
use core::fmt;

use crate::{NodeId, Property, Tree};

/// Handle on one node of a shared [`Tree`]
///
/// Cloning an `Ofnode` is cheap; it only bumps the tree's reference count.
#[derive(Clone)]
pub struct Ofnode {
    tree: Rc<Tree>,
    id: NodeId,
}

impl Ofnode {
    pub fn new(tree: Rc<Tree>, id: NodeId) -> Self {
        Self { tree, id }
    }

    pub fn root(tree: Rc<Tree>) -> Self {
        let id = tree.root();
        Self { tree, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &Rc<Tree> {
        &self.tree
    }

    fn at(&self, id: NodeId) -> Self {
        Self {
            tree: self.tree.clone(),
            id,
        }
    }

    pub fn name(&self) -> &str {
        self.tree.name(self.id)
    }

    pub fn path(&self) -> String {
        self.tree.path(self.id)
    }

    pub fn parent(&self) -> Option<Self> {
        self.tree.parent(self.id).map(|id| self.at(id))
    }

    pub fn children(&self) -> impl Iterator<Item = Ofnode> + '_ {
        self.tree.children(self.id).iter().map(|id| self.at(*id))
    }

    pub fn child_count(&self) -> usize {
        self.tree.children(self.id).len()
    }

    pub fn subnode(&self, name: &str) -> Option<Self> {
        self.tree.subnode(self.id, name).map(|id| self.at(id))
    }

    pub fn properties(&self) -> &[Property] {
        self.tree.properties(self.id)
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.tree.property(self.id, name)
    }

    /// Presence test; the value, if any, is ignored
    pub fn read_bool(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    pub fn read_string(&self, name: &str) -> Option<&str> {
        self.property(name)?.as_str()
    }

    pub fn read_string_list(&self, name: &str) -> Vec<&str> {
        self.property(name)
            .map(Property::as_str_list)
            .unwrap_or_default()
    }

    /// Position of `value` in a string-list property
    pub fn string_index(&self, name: &str, value: &str) -> Option<usize> {
        self.read_string_list(name).iter().position(|s| *s == value)
    }

    pub fn read_u32(&self, name: &str) -> Option<u32> {
        self.property(name)?.as_u32()
    }

    pub fn read_u32_default(&self, name: &str, default: u32) -> u32 {
        self.read_u32(name).unwrap_or(default)
    }

    pub fn read_u32_index(&self, name: &str, index: usize) -> Option<u32> {
        self.property(name)?.u32_at(index)
    }

    pub fn read_u32_array(&self, name: &str) -> Option<Vec<u32>> {
        self.property(name).map(Property::as_u32_array)
    }

    /// Resolve the `index`th phandle cell of a property to its node
    pub fn read_phandle_index(&self, name: &str, index: usize) -> Option<Self> {
        let phandle = self.read_u32_index(name, index)?;
        self.tree.find_phandle(phandle).map(|id| self.at(id))
    }

    pub fn read_phandle(&self, name: &str) -> Option<Self> {
        self.read_phandle_index(name, 0)
    }

    /// A node is enabled unless its `status` says otherwise
    pub fn is_enabled(&self) -> bool {
        match self.read_string("status") {
            None => true,
            Some(status) => status == "okay" || status == "ok",
        }
    }
}

impl PartialEq for Ofnode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Rc::ptr_eq(&self.tree, &other.tree)
    }
}

impl Eq for Ofnode {}

impl fmt::Debug for Ofnode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ofnode({})", self.path())
    }
}
