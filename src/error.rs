//! Error types for ADF export and import.

use thiserror::Error;

/// Errors that can occur while converting between a scene graph and an ADF document.
#[derive(Debug, Error)]
pub enum AdfError {
    /// YAML (de)serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File system error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Mesh file extension is not one of the supported formats.
    #[error("unsupported mesh format: {path}")]
    UnsupportedMeshFormat {
        /// The offending asset path.
        path: String,
    },

    /// The mesh asset capability could not resolve a path.
    #[error("mesh asset not found: {path}")]
    MissingAsset {
        /// The unresolved asset path.
        path: String,
    },

    /// A loaded asset contained no usable mesh parts after pruning.
    #[error("asset has no mesh parts: {path}")]
    EmptyAsset {
        /// The asset path.
        path: String,
    },

    /// A name listed under `bodies`/`joints` has no matching sub-mapping.
    #[error("record not found for listed name: {key}")]
    MissingRecord {
        /// The listed record key.
        key: String,
    },

    /// A required top-level list is absent from the document.
    #[error("document is missing the {key} list")]
    MissingSection {
        /// The absent key.
        key: &'static str,
    },

    /// A joint record references a body that was never loaded.
    #[error("reference to undefined body: {body} in {context}")]
    UndefinedBody {
        /// The referenced body key.
        body: String,
        /// The joint or operation that held the reference.
        context: String,
    },

    /// A constraint has no active limit flag to classify a joint type from.
    #[error("constraint on {body} has no classifiable limit flags")]
    UnclassifiableConstraint {
        /// The body carrying the constraint.
        body: String,
    },

    /// The residual offset rotation axis is neither parallel nor antiparallel
    /// to the child axis, so the offset angle's sign cannot be resolved.
    #[error("joint {joint}: offset axis is neither parallel nor antiparallel to the child axis")]
    OffsetAxisInconsistent {
        /// The joint name.
        joint: String,
    },
}
