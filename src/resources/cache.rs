//! Per-model texture cache keyed by the path a material references.

use std::collections::HashMap;

use crate::data_structures::material::{TextureKind, TextureRef};

/// Remembers every texture a model has uploaded.
///
/// Lookups compare the material path string exactly. The first texture loaded
/// for a path is reused for every later reference, whatever kind that
/// reference asks for. Nothing is ever reloaded.
#[derive(Debug)]
pub struct TextureCache<H> {
    handles: HashMap<String, H>,
    order: Vec<String>,
}

impl<H> Default for TextureCache<H> {
    fn default() -> Self {
        Self {
            handles: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<H: Clone> TextureCache<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the texture for `path`, calling `load` only on the first request.
    ///
    /// A failed load is not cached; the next request for the same path tries
    /// again.
    pub fn get_or_load<E>(
        &mut self,
        path: &str,
        kind: TextureKind,
        load: impl FnOnce() -> Result<H, E>,
    ) -> Result<TextureRef<H>, E> {
        let handle = match self.handles.get(path) {
            Some(handle) => handle.clone(),
            None => {
                let handle = load()?;
                self.handles.insert(path.to_string(), handle.clone());
                self.order.push(path.to_string());
                handle
            }
        };
        Ok(TextureRef {
            handle,
            kind,
            path: path.to_string(),
        })
    }

    pub fn get(&self, path: &str) -> Option<&H> {
        self.handles.get(path)
    }
}

impl<H> TextureCache<H> {
    pub fn contains(&self, path: &str) -> bool {
        self.handles.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Cached paths in the order they were first loaded.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Cached handles in the order they were first loaded.
    pub fn handles(&self) -> impl Iterator<Item = &H> {
        self.order.iter().filter_map(|path| self.handles.get(path))
    }
}
