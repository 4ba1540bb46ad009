//! # Handler registry: typed and general handler lists.
//!
//! [`HandlerRegistry`] owns two mappings:
//! - **typed**: event kind → ordered list of handlers for that kind
//! - **general**: ordered list of handlers invoked for every kind
//!
//! ## Rules
//! - A handler appears at most once per kind and at most once in the general list;
//!   duplicate registration is a no-op.
//! - Unregistering a missing handler is a no-op.
//! - A kind whose list becomes empty is removed entirely, so "has handlers for
//!   this kind" never sees an empty entry.
//! - Readers take a **snapshot** (cloned `Arc`s) under a short read lock and
//!   iterate outside of it. Mutations during a dispatch never tear the list the
//!   dispatch is walking, and handlers may (un)register re-entrantly.
//!
//! ## Example
//! ```rust
//! use eventvisor::{Event, HandlerFn, HandlerRef, HandlerRegistry};
//!
//! let registry: HandlerRegistry<HandlerRef> = HandlerRegistry::new();
//! let h: HandlerRef = HandlerFn::arc("h", |_ev: &Event| Ok(()));
//!
//! registry.register("order", h.clone());
//! registry.register("order", h.clone()); // no-op
//! assert_eq!(registry.typed_len("order"), 1);
//!
//! registry.unregister("order", &h);
//! assert!(!registry.has_typed("order"));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::handlers::handler::SameHandler;

struct Lists<H> {
    typed: HashMap<Arc<str>, Vec<H>>,
    general: Vec<H>,
}

/// Typed and general handler lists, safe to mutate concurrently with dispatch.
pub struct HandlerRegistry<H> {
    lists: RwLock<Lists<H>>,
}

impl<H: SameHandler + Clone> HandlerRegistry<H> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            lists: RwLock::new(Lists {
                typed: HashMap::new(),
                general: Vec::new(),
            }),
        }
    }

    /// Appends `handler` to the list of `kind` unless it is already there.
    pub fn register(&self, kind: &str, handler: H) {
        let mut lists = self.write();
        push_unique(lists.typed.entry(Arc::from(kind)).or_default(), handler);
    }

    /// Removes `handler` from the list of `kind`; drops the kind once its list is empty.
    pub fn unregister(&self, kind: &str, handler: &H) {
        let mut lists = self.write();
        let now_empty = match lists.typed.get_mut(kind) {
            Some(list) => {
                list.retain(|h| !h.same_handler(handler));
                list.is_empty()
            }
            None => false,
        };
        if now_empty {
            lists.typed.remove(kind);
        }
    }

    /// Appends `handler` to the general list unless it is already there.
    pub fn register_general(&self, handler: H) {
        push_unique(&mut self.write().general, handler);
    }

    /// Removes `handler` from the general list.
    pub fn unregister_general(&self, handler: &H) {
        self.write().general.retain(|h| !h.same_handler(handler));
    }

    /// Snapshot of the handlers registered for `kind`, in registration order.
    ///
    /// Returns `None` when nothing is registered for the kind.
    pub fn typed(&self, kind: &str) -> Option<Vec<H>> {
        self.read().typed.get(kind).cloned()
    }

    /// Snapshot of the general handlers, in registration order.
    pub fn general(&self) -> Vec<H> {
        self.read().general.clone()
    }

    /// Returns true if at least one handler is registered for `kind`.
    pub fn has_typed(&self, kind: &str) -> bool {
        self.read().typed.contains_key(kind)
    }

    pub fn typed_len(&self, kind: &str) -> usize {
        self.read().typed.get(kind).map_or(0, Vec::len)
    }

    pub fn general_len(&self) -> usize {
        self.read().general.len()
    }

    /// Returns sorted list of kinds with at least one typed handler.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.read().typed.keys().map(|k| k.to_string()).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Returns true if no typed or general handler is registered.
    pub fn is_empty(&self) -> bool {
        let lists = self.read();
        lists.typed.is_empty() && lists.general.is_empty()
    }

    /// Removes every handler.
    pub fn clear(&self) {
        let mut lists = self.write();
        lists.typed.clear();
        lists.general.clear();
    }

    // Handlers never run under the lock, so a poisoned lock still holds consistent lists.
    fn read(&self) -> RwLockReadGuard<'_, Lists<H>> {
        self.lists.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Lists<H>> {
        self.lists.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<H: SameHandler + Clone> Default for HandlerRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

fn push_unique<H: SameHandler>(list: &mut Vec<H>, handler: H) {
    if !list.iter().any(|h| h.same_handler(&handler)) {
        list.push(handler);
    }
}
