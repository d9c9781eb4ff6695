//! Tool registry with immutable per-call snapshots.

use arc_swap::ArcSwap;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::FunctionCallback;
use crate::types::ToolDefinition;
use crate::{Error, ErrorContext, Result};

type CallbackMap = HashMap<String, Arc<dyn FunctionCallback>>;

/// Registry of [`FunctionCallback`]s keyed by name.
///
/// Registration swaps in a new map; readers holding a [`ToolSnapshot`] keep
/// seeing the map they started with.
pub struct ToolRegistry {
    callbacks: ArcSwap<CallbackMap>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            callbacks: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Register (or replace) a callback under its name.
    pub fn register(&self, callback: Arc<dyn FunctionCallback>) {
        self.register_all(std::iter::once(callback));
    }

    pub fn register_all(&self, callbacks: impl IntoIterator<Item = Arc<dyn FunctionCallback>>) {
        let callbacks: Vec<_> = callbacks.into_iter().collect();
        if callbacks.is_empty() {
            return;
        }
        self.callbacks.rcu(|current| {
            let mut next = CallbackMap::clone(current);
            for cb in &callbacks {
                next.insert(cb.name().to_string(), cb.clone());
            }
            next
        });
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<dyn FunctionCallback>> {
        let mut removed = None;
        self.callbacks.rcu(|current| {
            let mut next = CallbackMap::clone(current);
            removed = next.remove(name);
            next
        });
        removed
    }

    pub fn snapshot(&self) -> ToolSnapshot {
        ToolSnapshot {
            callbacks: self.callbacks.load_full(),
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable view of the registry used for the whole of one call.
#[derive(Clone)]
pub struct ToolSnapshot {
    callbacks: Arc<CallbackMap>,
}

impl ToolSnapshot {
    pub fn empty() -> Self {
        Self {
            callbacks: Arc::new(HashMap::new()),
        }
    }

    /// Overlay call-local callbacks on top of this snapshot.
    pub fn with_callbacks<'a>(
        &self,
        extra: impl IntoIterator<Item = &'a Arc<dyn FunctionCallback>>,
    ) -> Self {
        let mut extra = extra.into_iter().peekable();
        if extra.peek().is_none() {
            return self.clone();
        }
        let mut map = CallbackMap::clone(&self.callbacks);
        for cb in extra {
            map.insert(cb.name().to_string(), cb.clone());
        }
        Self {
            callbacks: Arc::new(map),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn FunctionCallback>> {
        self.callbacks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.callbacks.contains_key(name)
    }

    /// Resolve a name the model asked for, failing on unknown tools.
    pub fn lookup(&self, name: &str) -> Result<&Arc<dyn FunctionCallback>> {
        self.get(name).ok_or_else(|| {
            Error::configuration_with_context(
                format!("No function callback found for function name: {}", name),
                ErrorContext::new()
                    .with_details(format!("registered: {:?}", self.names()))
                    .with_source("tool_registry"),
            )
        })
    }

    /// Definitions for the enabled names, sorted by name.
    pub fn definitions(&self, names: &BTreeSet<String>) -> Result<Vec<ToolDefinition>> {
        names
            .iter()
            .map(|name| {
                self.lookup(name)
                    .map(|cb| cb.definition())
                    .map_err(|_| {
                        Error::configuration_with_context(
                            format!("No function callback found for function name: {}", name),
                            ErrorContext::new()
                                .with_field_path("options.functions")
                                .with_source("options_merger"),
                        )
                    })
            })
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.callbacks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
