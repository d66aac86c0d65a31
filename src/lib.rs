//! # adf-bridge
//!
//! A conversion crate between an in-memory articulated-body scene graph and
//! the textual AMBF Description Format (ADF) used by robot simulators.
//!
//! It decouples the *scene* (bodies, meshes, constraints) from the *document*
//! (an ordered YAML mapping), with geometric reconciliation in between: joint
//! pivot/axis extraction under non-uniform scale, offset-angle algebra and an
//! optional axis-alignment correction pass.

pub mod assets;
pub mod document;
pub mod error;
pub mod export;
pub mod import;
pub mod math;
pub mod namespace;
pub mod scene;
pub mod shape;
pub mod tree;

pub use assets::*;
pub use document::*;
pub use error::*;
pub use export::*;
pub use import::*;
pub use scene::*;
pub use shape::*;
