//! Error types for scene import and texture upload.
//!
//! Most loader entry points return [`LoadError`]. [`Model::load`](crate::data_structures::model::Model::load)
//! swallows them into an empty model after logging, [`Model::try_load`](crate::data_structures::model::Model::try_load)
//! hands them to the caller.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while turning a scene file into meshes.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file could not be read from disk.
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file extension maps to no known importer.
    #[error("unsupported scene format: {0}")]
    UnsupportedFormat(PathBuf),

    /// The OBJ importer rejected the file.
    #[error("obj import failed for {path}: {source}")]
    Obj {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    /// The glTF importer rejected the file.
    #[error("gltf import failed for {path}: {source}")]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    /// The importer flagged the scene as incomplete.
    #[error("scene is incomplete")]
    IncompleteScene,

    /// The scene has no root node to start the traversal from.
    #[error("scene has no root node")]
    MissingRoot,

    /// A node or mesh points at a mesh/material/buffer that does not exist.
    #[error("dangling {what} reference {index}")]
    DanglingReference { what: &'static str, index: usize },

    /// A face index points past the end of the vertex list.
    #[error("index {index} is out of range for {vertex_count} vertices in mesh {mesh}")]
    IndexOutOfRange {
        mesh: String,
        index: u32,
        vertex_count: usize,
    },

    /// A decoded image has a channel layout we cannot upload.
    #[error("unsupported channel count {channels} in texture {path}")]
    UnsupportedChannelCount { path: String, channels: u8 },

    /// A decoded image is larger than the device can hold in one texture.
    #[error("texture {path} is {width}x{height}, the device allows at most {limit}")]
    TextureTooLarge {
        path: String,
        width: u32,
        height: u32,
        limit: u32,
    },
}
