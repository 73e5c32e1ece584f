//! Display names for message type numbers.

use hagall_messages::{hagall, odal, MessageFamily, ProtocolMessage};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

type NameResolver = fn(i32) -> Option<&'static str>;

/// Caches the display name of every message type number seen so far.
///
/// Names are resolved through the registered families, first match wins.
/// A number no family knows is named after its decimal value. The cache only
/// grows with the number of distinct types, so it is never pruned.
pub struct TypeRegistry {
    families: Vec<(&'static str, NameResolver)>,
    names: RwLock<HashMap<i32, Arc<str>>>,
}

impl TypeRegistry {
    /// Registry without any family; every type is named by its number.
    pub fn new() -> Self {
        Self {
            families: Vec::new(),
            names: RwLock::new(HashMap::new()),
        }
    }

    /// Registry knowing the Hagall and Odal families.
    pub fn standard() -> Self {
        Self::new()
            .with_family::<hagall::MsgType>()
            .with_family::<odal::MsgType>()
    }

    /// Register a family's names.
    pub fn with_family<F: MessageFamily>(mut self) -> Self {
        self.families.push((F::NAME, F::type_name));
        self
    }

    /// Display name of `number`.
    pub fn type_name(&self, number: i32) -> Arc<str> {
        if let Some(name) = self
            .names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&number)
        {
            return Arc::clone(name);
        }

        let resolved = self.resolve(number);
        let mut names = self.names.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(names.entry(number).or_insert(resolved))
    }

    /// Display name of a typed message's type.
    pub fn message_type_name<M: ProtocolMessage>(&self, msg: &M) -> Arc<str> {
        self.type_name(msg.type_tag())
    }

    /// Number of cached names.
    pub fn len(&self) -> usize {
        self.names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no name has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn resolve(&self, number: i32) -> Arc<str> {
        for (family, resolver) in &self.families {
            if let Some(name) = resolver(number) {
                trace!(family, number, name, "resolved message type name");
                return Arc::from(name);
            }
        }
        Arc::from(number.to_string())
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let families: Vec<_> = self.families.iter().map(|(name, _)| *name).collect();
        f.debug_struct("TypeRegistry")
            .field("families", &families)
            .field("cached", &self.len())
            .finish()
    }
}
