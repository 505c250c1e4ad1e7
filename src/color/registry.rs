use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use crate::foundation::core::Rgb8;

/// Named replacement colors shared between a host and every session it creates.
///
/// Names are stored as `[|name|]` tags; fills and strokes whose layer-document name carries
/// the same tag pick up the registered color. Cloning the registry clones the handle, not the
/// table.
#[derive(Clone, Debug, Default)]
pub struct ColorRegistry {
    inner: Arc<RwLock<HashMap<String, u32>>>,
}

impl ColorRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a plain name into its `[|name|]` tag.
    pub fn tag(name: &str) -> String {
        format!("[|{name}|]")
    }

    /// Register (or replace) the `0xAARRGGBB` color for `name`.
    pub fn register(&self, name: &str, argb: u32) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(Self::tag(name), argb);
    }

    /// Remove a registration. Returns `true` when it existed.
    pub fn unregister(&self, name: &str) -> bool {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&Self::tag(name))
            .is_some()
    }

    /// Color registered for a plain `name`.
    pub fn lookup(&self, name: &str) -> Option<Rgb8> {
        self.resolve_tag(&Self::tag(name))
    }

    /// Color registered for an already-tagged `[|name|]` string.
    pub fn resolve_tag(&self, tag: &str) -> Option<Rgb8> {
        if !(tag.starts_with("[|") && tag.ends_with("|]")) {
            return None;
        }
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tag)
            .map(|&argb| Rgb8::from_argb(argb))
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
