//! Hardware description access for the oreboot driver model
//!
//! The driver model never parses a flattened devicetree itself. It works on a
//! [`Tree`], an owned copy of the description that is either imported from a
//! blob with [`Tree::from_fdt`] or assembled by board code with a
//! [`TreeBuilder`]. Devices refer to their node through an [`Ofnode`] handle.
#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod builder;
mod error;
mod node;
mod prop;
mod tree;

pub use self::{
    builder::{NodeBuilder, TreeBuilder},
    error::FdtError,
    node::Ofnode,
    prop::Property,
    tree::{NodeId, Tree},
};
