//! Node-based shader material compiler with image-based lighting helpers.
//!
//! Materials are authored as block graphs ([`graph`]), compiled into paired
//! vertex/fragment GLSL programs ([`compiler`]) and persisted as JSON. The
//! [`ibl`] module covers the lighting preprocessing the materials consume:
//! spherical-harmonics projection of cubemaps and HDR specular prefiltering.

pub mod compiler;
pub mod error;
pub mod graph;
pub mod ibl;
pub mod validation;

pub use compiler::{compile, CompiledMaterial, DrawState};
pub use error::{FilteringError, GraphError, ProjectionError};
pub use graph::types::{BlockTarget, NodeValueType, ShaderStage};
pub use graph::Graph;
