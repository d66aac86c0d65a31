//! Mesh asset capability interface.
//!
//! Mesh file codecs are external to this crate; the pipelines only need
//! "load an asset by path" and "save a body's mesh at a resolution". The
//! [`MeshAssets`] trait is that seam, and [`MemoryAssets`] is an in-memory
//! implementation used by tests and embedding hosts without a file system.

use crate::error::AdfError;
use glam::{Mat4, Vec3};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Mesh file formats understood by the pipelines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshFormat {
    Stl,
    Obj,
    ThreeDs,
    Ply,
    Dae,
}

impl MeshFormat {
    /// File extension written for this format, including the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Stl => ".STL",
            Self::Obj => ".OBJ",
            Self::ThreeDs => ".3DS",
            Self::Ply => ".PLY",
            Self::Dae => ".DAE",
        }
    }

    /// Classifies a path by extension.
    ///
    /// Returns `Ok(None)` for an extension-less path, which denotes a
    /// placeholder (non-mesh) body. Unknown extensions are an error for the
    /// body being processed, not for the whole document.
    pub fn from_path(path: &Path) -> Result<Option<Self>, AdfError> {
        let Some(ext) = path.extension() else {
            return Ok(None);
        };
        match ext.to_string_lossy().to_ascii_lowercase().as_str() {
            "stl" => Ok(Some(Self::Stl)),
            "obj" => Ok(Some(Self::Obj)),
            "3ds" => Ok(Some(Self::ThreeDs)),
            "ply" => Ok(Some(Self::Ply)),
            "dae" => Ok(Some(Self::Dae)),
            _ => Err(AdfError::UnsupportedMeshFormat {
                path: path.display().to_string(),
            }),
        }
    }
}

/// Output resolution of a saved mesh.
///
/// Low resolution applies a decimation-style simplification inside the
/// capability implementation; this crate only routes the request to the
/// parallel `high_res/` / `low_res/` directories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshResolution {
    High,
    Low,
}

/// Local-space mesh data of a body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshAsset {
    pub vertices: Vec<Vec3>,
}

impl MeshAsset {
    pub fn new(vertices: Vec<Vec3>) -> Self {
        Self { vertices }
    }

    /// Applies a transform to every vertex in place.
    pub fn transform(&mut self, m: &Mat4) {
        for v in &mut self.vertices {
            *v = m.transform_point3(*v);
        }
    }

    /// Axis-aligned bounds of the vertex set, `None` when empty.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.vertices.first()?;
        let mut min = first;
        let mut max = first;
        for v in &self.vertices[1..] {
            min = min.min(*v);
            max = max.max(*v);
        }
        Some((min, max))
    }

    /// Bounding-box extent, zero when the mesh is empty.
    pub fn extent(&self) -> Vec3 {
        self.bounds().map_or(Vec3::ZERO, |(min, max)| max - min)
    }

    /// Bounding-box center, zero when the mesh is empty.
    pub fn bounds_center(&self) -> Vec3 {
        self.bounds()
            .map_or(Vec3::ZERO, |(min, max)| (min + max) / 2.0)
    }
}

/// Kinds of elements a loaded asset may contain.
///
/// Some formats (notably collada) import cameras and lights alongside
/// meshes; the importer prunes everything that is not a mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetPartKind {
    Mesh,
    Camera,
    Light,
}

/// One element of a loaded asset, with its own placement transform.
#[derive(Clone, Debug)]
pub struct AssetPart {
    pub kind: AssetPartKind,
    pub transform: Mat4,
    pub mesh: MeshAsset,
}

impl AssetPart {
    pub fn mesh(mesh: MeshAsset) -> Self {
        Self {
            kind: AssetPartKind::Mesh,
            transform: Mat4::IDENTITY,
            mesh,
        }
    }
}

/// The raw result of loading an asset, before format quirk handling.
#[derive(Clone, Debug, Default)]
pub struct LoadedAsset {
    pub parts: Vec<AssetPart>,
}

/// Capability for resolving and persisting mesh assets by path.
pub trait MeshAssets {
    /// Loads the asset at `path`.
    fn load(&mut self, path: &Path) -> Result<LoadedAsset, AdfError>;

    /// Saves `mesh` to `path` in `format` at the requested resolution.
    fn save(
        &mut self,
        path: &Path,
        mesh: &MeshAsset,
        format: MeshFormat,
        resolution: MeshResolution,
    ) -> Result<(), AdfError>;
}

/// In-memory [`MeshAssets`] implementation.
#[derive(Debug, Default)]
pub struct MemoryAssets {
    store: HashMap<PathBuf, LoadedAsset>,
    /// Everything saved through this store, in call order.
    pub saved: Vec<(PathBuf, MeshResolution, MeshAsset)>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a single-part mesh asset under `path`.
    pub fn insert_mesh(&mut self, path: impl Into<PathBuf>, mesh: MeshAsset) {
        self.store.insert(
            path.into(),
            LoadedAsset {
                parts: vec![AssetPart::mesh(mesh)],
            },
        );
    }

    /// Registers a multi-part asset under `path`.
    pub fn insert_asset(&mut self, path: impl Into<PathBuf>, asset: LoadedAsset) {
        self.store.insert(path.into(), asset);
    }
}

impl MeshAssets for MemoryAssets {
    fn load(&mut self, path: &Path) -> Result<LoadedAsset, AdfError> {
        self.store
            .get(path)
            .cloned()
            .ok_or_else(|| AdfError::MissingAsset {
                path: path.display().to_string(),
            })
    }

    fn save(
        &mut self,
        path: &Path,
        mesh: &MeshAsset,
        _format: MeshFormat,
        resolution: MeshResolution,
    ) -> Result<(), AdfError> {
        self.saved.push((path.to_path_buf(), resolution, mesh.clone()));
        Ok(())
    }
}
