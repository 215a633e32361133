//! Decoration callbacks.
//!
//! One optional callback per entity kind. Each receives the finished entity
//! and returns attributes that are merged into the entity's own map, with
//! returned keys overwriting existing ones. An absent callback adds nothing.

use crate::component::ComponentSet;
use crate::core::{Attributes, Superedge, Supernode};
use std::fmt;
use std::sync::Arc;

/// Callback decorating supernodes.
pub type SupernodeDecorator = Arc<dyn Fn(&Supernode) -> Attributes + Send + Sync>;
/// Callback decorating superedges.
pub type SuperedgeDecorator = Arc<dyn Fn(&Superedge) -> Attributes + Send + Sync>;
/// Callback decorating component sets.
pub type ComponentSetDecorator = Arc<dyn Fn(&ComponentSet) -> Attributes + Send + Sync>;

/// The decoration callbacks of one scheme.
#[derive(Clone, Default)]
pub struct Decorators {
    supernode: Option<SupernodeDecorator>,
    superedge: Option<SuperedgeDecorator>,
    component_set: Option<ComponentSetDecorator>,
}

impl Decorators {
    /// No callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the supernode callback.
    pub fn with_supernode<F>(mut self, f: F) -> Self
    where
        F: Fn(&Supernode) -> Attributes + Send + Sync + 'static,
    {
        self.supernode = Some(Arc::new(f));
        self
    }

    /// Builder: set the superedge callback.
    pub fn with_superedge<F>(mut self, f: F) -> Self
    where
        F: Fn(&Superedge) -> Attributes + Send + Sync + 'static,
    {
        self.superedge = Some(Arc::new(f));
        self
    }

    /// Builder: set the component-set callback.
    pub fn with_component_set<F>(mut self, f: F) -> Self
    where
        F: Fn(&ComponentSet) -> Attributes + Send + Sync + 'static,
    {
        self.component_set = Some(Arc::new(f));
        self
    }

    /// Merges the supernode callback's attributes into `node`.
    pub fn decorate_supernode(&self, node: &mut Supernode) {
        if let Some(f) = &self.supernode {
            let attrs = f(node);
            node.attributes.extend(attrs);
        }
    }

    /// Merges the superedge callback's attributes into `edge`.
    pub fn decorate_superedge(&self, edge: &mut Superedge) {
        if let Some(f) = &self.superedge {
            let attrs = f(edge);
            edge.attributes.extend(attrs);
        }
    }

    /// Merges the component-set callback's attributes into `set`.
    pub fn decorate_component_set(&self, set: &mut ComponentSet) {
        if let Some(f) = &self.component_set {
            let attrs = f(set);
            set.attributes.extend(attrs);
        }
    }
}

impl fmt::Debug for Decorators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decorators")
            .field("supernode", &self.supernode.is_some())
            .field("superedge", &self.superedge.is_some())
            .field("component_set", &self.component_set.is_some())
            .finish()
    }
}
