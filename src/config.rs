//! Loader configuration.

use std::path::{Path, PathBuf};

/// Post-processing and lookup options applied while importing a scene.
///
/// The defaults match what the renderer's shaders expect: triangles only,
/// UV origin in the top-left corner, tangent space present and mipmapped
/// material textures.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadOptions {
    /// Split polygons into triangles during import.
    pub triangulate: bool,
    /// Flip the V texture coordinate (OBJ stores a bottom-left origin).
    pub flip_uvs: bool,
    /// Generate per-vertex tangents for formats that do not carry them.
    pub calc_tangent_space: bool,
    /// Build a full mip chain for material textures.
    pub generate_mipmaps: bool,
    /// Directory relative scene paths are resolved against. `None` uses paths as given.
    pub asset_root: Option<PathBuf>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            triangulate: true,
            flip_uvs: true,
            calc_tangent_space: true,
            generate_mipmaps: true,
            asset_root: None,
        }
    }
}

impl LoadOptions {
    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = Some(root.into());
        self
    }

    /// Resolve a scene path against [`asset_root`](Self::asset_root).
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        match &self.asset_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}
