//! Object masks: which related properties the API should include in a result.
//!
//! A mask is either an already formatted expression such as
//! `mask[id,datacenter[longName]]` or an `ObjectMask` tree built one property
//! at a time:
//!
//! ```
//! use softlayer_core::ObjectMask;
//!
//! let mut mask = ObjectMask::new();
//! mask.child("datacenter");
//! mask.child("softwareComponents").child("passwords");
//! assert_eq!(mask.len(), 2);
//! ```

use indexmap::IndexMap;

use crate::value::{Map, Value};

/// A node in an object mask tree. Leaves are nodes without children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMask {
    children: IndexMap<String, ObjectMask>,
}

impl ObjectMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the child named `name`, creating an empty one first if needed.
    pub fn child(&mut self, name: &str) -> &mut ObjectMask {
        self.children.entry(name.to_string()).or_default()
    }

    pub fn get(&self, name: &str) -> Option<&ObjectMask> {
        self.children.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Nested structs, one member per child; leaves are empty structs.
    pub fn to_value(&self) -> Value {
        Value::Struct(
            self.children
                .iter()
                .map(|(name, node)| (name.clone(), node.to_value()))
                .collect::<Map>(),
        )
    }
}

impl From<ObjectMask> for Value {
    fn from(mask: ObjectMask) -> Self {
        mask.to_value()
    }
}

impl From<&ObjectMask> for Value {
    fn from(mask: &ObjectMask) -> Self {
        mask.to_value()
    }
}

/// Either form accepted by `Client::set_object_mask`.
///
/// The variant decides which header name the mask travels under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mask {
    Text(String),
    Tree(ObjectMask),
}

impl Mask {
    pub(crate) fn is_empty(&self) -> bool {
        match self {
            Mask::Text(text) => text.trim().is_empty(),
            Mask::Tree(_) => false,
        }
    }

    pub(crate) fn into_value(self) -> Value {
        match self {
            Mask::Text(text) => Value::String(text),
            Mask::Tree(tree) => tree.to_value(),
        }
    }
}

impl From<&str> for Mask {
    fn from(text: &str) -> Self {
        Mask::Text(text.to_string())
    }
}

impl From<String> for Mask {
    fn from(text: String) -> Self {
        Mask::Text(text)
    }
}

impl From<ObjectMask> for Mask {
    fn from(tree: ObjectMask) -> Self {
        Mask::Tree(tree)
    }
}
