//! Hierarchical configuration nodes.
//!
//! A [`ConfigNode`] holds a property struct plus an optional parent. Nothing is
//! copied from the parent when the link is made; every read walks the chain:
//!
//! | Property      | Resolution                                             |
//! |---------------|--------------------------------------------------------|
//! | [`Scalar`]    | local value, else the parent's resolved value          |
//! | [`MapProp`]   | parent's resolved map, local entries win per key       |
//! | [`ListProp`]  | parent's resolved elements followed by local elements  |
//!
//! The parent link is a [`Weak`] reference: a node never keeps its parent
//! alive. Nodes are only mutated during the single-threaded configuration
//! phase, so `Rc<RefCell<_>>` is enough.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use serde::Deserialize;

use crate::error::ConfigError;

/// Shared handle to a config node.
pub type NodeRef<T> = Rc<RefCell<ConfigNode<T>>>;

// ---------------------------------------------------------------------------
// Property kinds
// ---------------------------------------------------------------------------

/// A single value that is either set locally or inherited.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Scalar<T>(Option<T>);

impl<T> Default for Scalar<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T> From<Option<T>> for Scalar<T> {
    fn from(value: Option<T>) -> Self {
        Self(value)
    }
}

impl<T> Scalar<T> {
    pub fn set(&mut self, value: T) {
        self.0 = Some(value);
    }

    pub fn local(&self) -> Option<&T> {
        self.0.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }
}

/// A keyed map whose local entries override parent entries with the same key.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct MapProp<V>(BTreeMap<String, V>);

impl<V> Default for MapProp<V> {
    fn default() -> Self {
        Self(BTreeMap::new())
    }
}

impl<V> MapProp<V> {
    pub fn put(&mut self, key: impl Into<String>, value: V) {
        self.0.insert(key.into(), value);
    }

    pub fn local(&self) -> &BTreeMap<String, V> {
        &self.0
    }
}

/// An ordered collection; parent elements precede local ones.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ListProp<T>(Vec<T>);

impl<T> Default for ListProp<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> ListProp<T> {
    pub fn add(&mut self, value: T) {
        self.0.push(value);
    }

    pub fn local(&self) -> &[T] {
        &self.0
    }

    pub fn local_mut(&mut self) -> &mut Vec<T> {
        &mut self.0
    }
}

// ---------------------------------------------------------------------------
// ConfigNode
// ---------------------------------------------------------------------------

/// A configuration scope that inherits from an optional parent scope.
#[derive(Debug, Default)]
pub struct ConfigNode<T> {
    props: T,
    parent: Option<Weak<RefCell<ConfigNode<T>>>>,
}

impl<T> ConfigNode<T> {
    /// Create a detached node.
    pub fn new(props: T) -> NodeRef<T> {
        Rc::new(RefCell::new(Self {
            props,
            parent: None,
        }))
    }

    /// Create a node already linked to `parent`.
    pub fn with_parent(props: T, parent: &NodeRef<T>) -> NodeRef<T> {
        Rc::new(RefCell::new(Self {
            props,
            parent: Some(Rc::downgrade(parent)),
        }))
    }

    /// Link `child` to `parent`, replacing any previous parent.
    ///
    /// Local values on `child` are kept. Fails with [`ConfigError::ParentCycle`]
    /// if `child` is `parent` or one of its ancestors.
    pub fn set_parent(child: &NodeRef<T>, parent: &NodeRef<T>) -> Result<(), ConfigError> {
        let mut cursor = Some(Rc::clone(parent));
        while let Some(node) = cursor {
            if Rc::ptr_eq(&node, child) {
                return Err(ConfigError::ParentCycle);
            }
            cursor = node.borrow().parent();
        }
        child.borrow_mut().parent = Some(Rc::downgrade(parent));
        Ok(())
    }

    /// The live parent, if one is linked and still alive.
    pub fn parent(&self) -> Option<NodeRef<T>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn props(&self) -> &T {
        &self.props
    }

    pub fn props_mut(&mut self) -> &mut T {
        &mut self.props
    }

    /// Resolve a scalar: local value, else the parent chain, else `None`.
    pub fn resolve_scalar<V, F>(&self, select: F) -> Option<V>
    where
        V: Clone,
        F: Fn(&T) -> &Scalar<V> + Copy,
    {
        if let Some(value) = select(&self.props).local() {
            return Some(value.clone());
        }
        self.with_parent_node(|parent| parent.resolve_scalar(select))
            .flatten()
    }

    /// Resolve a keyed map: parent entries first, local entries override.
    pub fn resolve_map<V, F>(&self, select: F) -> BTreeMap<String, V>
    where
        V: Clone,
        F: Fn(&T) -> &MapProp<V> + Copy,
    {
        let mut resolved = self
            .with_parent_node(|parent| parent.resolve_map(select))
            .unwrap_or_default();
        for (key, value) in select(&self.props).local() {
            resolved.insert(key.clone(), value.clone());
        }
        resolved
    }

    /// Local maps along the chain, outermost ancestor first.
    ///
    /// Used where entries need more than a per-key override to combine.
    pub fn map_layers<V, F>(&self, select: F) -> Vec<BTreeMap<String, V>>
    where
        V: Clone,
        F: Fn(&T) -> &MapProp<V> + Copy,
    {
        let mut layers = self
            .with_parent_node(|parent| parent.map_layers(select))
            .unwrap_or_default();
        layers.push(select(&self.props).local().clone());
        layers
    }

    /// Resolve an ordered list: parent elements, then local elements.
    pub fn resolve_list<V, F>(&self, select: F) -> Vec<V>
    where
        V: Clone,
        F: Fn(&T) -> &ListProp<V> + Copy,
    {
        let mut resolved = self
            .with_parent_node(|parent| parent.resolve_list(select))
            .unwrap_or_default();
        resolved.extend(select(&self.props).local().iter().cloned());
        resolved
    }

    fn with_parent_node<R>(&self, f: impl FnOnce(&ConfigNode<T>) -> R) -> Option<R> {
        let parent = self.parent()?;
        let node = parent.borrow();
        let result = f(&node);
        Some(result)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Props {
        level: Scalar<u32>,
        labels: MapProp<String>,
        files: ListProp<String>,
    }

    #[test]
    fn detached_node_resolves_local_only() {
        let node = ConfigNode::new(Props::default());
        assert_eq!(node.borrow().resolve_scalar(|p: &Props| &p.level), None);
        node.borrow_mut().props_mut().level.set(3);
        assert_eq!(node.borrow().resolve_scalar(|p: &Props| &p.level), Some(3));
    }

    #[test]
    fn child_sees_later_parent_changes() {
        let parent = ConfigNode::new(Props::default());
        let child = ConfigNode::with_parent(Props::default(), &parent);

        parent.borrow_mut().props_mut().level.set(7);
        assert_eq!(child.borrow().resolve_scalar(|p: &Props| &p.level), Some(7));

        child.borrow_mut().props_mut().level.set(1);
        parent.borrow_mut().props_mut().level.set(9);
        assert_eq!(child.borrow().resolve_scalar(|p: &Props| &p.level), Some(1));
    }

    #[test]
    fn late_parent_keeps_local_overrides() {
        let parent = ConfigNode::new(Props::default());
        parent.borrow_mut().props_mut().level.set(5);
        parent.borrow_mut().props_mut().files.add("base.yaml".into());

        let child = ConfigNode::new(Props::default());
        child.borrow_mut().props_mut().level.set(2);
        child.borrow_mut().props_mut().files.add("local.yaml".into());

        ConfigNode::set_parent(&child, &parent).expect("link");
        let node = child.borrow();
        assert_eq!(node.resolve_scalar(|p: &Props| &p.level), Some(2));
        assert_eq!(
            node.resolve_list(|p: &Props| &p.files),
            vec!["base.yaml".to_string(), "local.yaml".to_string()]
        );
    }

    #[test]
    fn map_local_entry_overrides_parent_key() {
        let parent = ConfigNode::new(Props::default());
        parent.borrow_mut().props_mut().labels.put("tier", "web".to_string());
        parent.borrow_mut().props_mut().labels.put("team", "core".to_string());
        let child = ConfigNode::with_parent(Props::default(), &parent);
        child.borrow_mut().props_mut().labels.put("tier", "db".to_string());

        let resolved = child.borrow().resolve_map(|p: &Props| &p.labels);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved["tier"], "db");
        assert_eq!(resolved["team"], "core");
    }

    #[test]
    fn map_layers_run_root_first() {
        let root = ConfigNode::new(Props::default());
        root.borrow_mut().props_mut().labels.put("tier", "web".to_string());
        let leaf = ConfigNode::with_parent(Props::default(), &root);
        leaf.borrow_mut().props_mut().labels.put("tier", "db".to_string());

        let layers = leaf.borrow().map_layers(|p: &Props| &p.labels);
        let tiers: Vec<&str> = layers.iter().map(|l| l["tier"].as_str()).collect();
        assert_eq!(tiers, vec!["web", "db"]);
    }

    #[test]
    fn dropped_parent_resolves_as_detached() {
        let child = {
            let parent = ConfigNode::new(Props::default());
            parent.borrow_mut().props_mut().level.set(4);
            ConfigNode::with_parent(Props::default(), &parent)
        };
        assert!(child.borrow().parent().is_none());
        assert_eq!(child.borrow().resolve_scalar(|p: &Props| &p.level), None);
    }

    #[test]
    fn self_parent_is_rejected() {
        let node = ConfigNode::new(Props::default());
        let err = ConfigNode::set_parent(&node, &node).unwrap_err();
        assert!(matches!(err, ConfigError::ParentCycle));
    }

    #[test]
    fn ancestor_as_parent_is_rejected() {
        let root = ConfigNode::new(Props::default());
        let child = ConfigNode::with_parent(Props::default(), &root);
        let err = ConfigNode::set_parent(&root, &child).unwrap_err();
        assert!(matches!(err, ConfigError::ParentCycle));
    }
}
