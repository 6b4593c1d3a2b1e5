//! Error taxonomy for graph compilation and the IBL pipeline.

use thiserror::Error;

use crate::graph::types::NodeValueType;

/// Errors raised while authoring or compiling a block graph.
///
/// All of these abort the compile in progress; a caller never receives a
/// partially built shader.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error(
        "cannot connect {from_block}.{from_port} ({candidate}) to {to_block}.{to_port}: \
type is not accepted by the input"
    )]
    Type {
        from_block: String,
        from_port: String,
        to_block: String,
        to_port: String,
        candidate: NodeValueType,
    },

    #[error(
        "linked inputs {first} and {second} on block {block} resolved to different types \
({first_type} vs {second_type})"
    )]
    LinkedTypeMismatch {
        block: String,
        first: String,
        second: String,
        first_type: NodeValueType,
        second_type: NodeValueType,
    },

    #[error("block {block} must only be used in a {expected} shader")]
    Target { block: String, expected: &'static str },

    #[error("cyclic graph detected at block {block}")]
    Cyclic { block: String },

    #[error("block {block} produced no usable type for port {port}")]
    UnresolvedType { block: String, port: String },

    #[error("input {block}.{port} is not connected and has no default")]
    MissingInput { block: String, port: String },

    #[error("block {block} has no port named {port}")]
    UnknownPort { block: String, port: String },

    #[error("input {block}.{port} already has a connection")]
    AlreadyConnected { block: String, port: String },

    #[error("a {class} block already exists in this graph and must be unique")]
    DuplicateUniqueBlock { class: &'static str },

    #[error("graph has no {stage} output block")]
    MissingRoot { stage: &'static str },

    #[error("internal compiler invariant violated: {0}")]
    Internal(String),
}

/// Errors raised while projecting a cubemap onto the spherical-harmonics basis.
///
/// NaN texels are recovered locally (replaced by zero) and never surface here;
/// these errors cover degenerate inputs where no defined result exists.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("cubemap integration accumulated zero total solid angle")]
    ZeroSolidAngle,

    #[error("cubemap size must be non-zero")]
    EmptySize,

    #[error("face {face} holds {actual} values, expected {expected} for a {size}x{size} face")]
    FaceSize {
        face: &'static str,
        actual: usize,
        expected: usize,
        size: usize,
    },
}

/// Errors raised by the HDR cubemap prefilter control loop.
#[derive(Debug, Error)]
pub enum FilteringError {
    #[error(
        "environment does not support float or half-float render targets required for prefiltering"
    )]
    CapabilityUnavailable,

    #[error("a prefilter operation is already in flight for texture {texture}")]
    AlreadyInFlight { texture: u64 },

    #[error("prefilter backend error: {0}")]
    Backend(String),
}
