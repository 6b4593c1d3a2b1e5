//! Value kinds, block targets and shader stages shared across the graph and compiler.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Value kind carried by a connection point.
///
/// `AutoDetect` and `BasedOnInput` are placeholder kinds: they exist only while
/// the graph is being authored and must resolve to a concrete kind before any
/// code is emitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeValueType {
    Float,
    Int,
    Vector2,
    Vector3,
    Vector4,
    Color3,
    Color4,
    Matrix,
    Object,
    AutoDetect,
    BasedOnInput,
}

impl NodeValueType {
    /// True for the two placeholder kinds resolved during compilation.
    pub fn is_placeholder(self) -> bool {
        matches!(self, NodeValueType::AutoDetect | NodeValueType::BasedOnInput)
    }

    /// GLSL type name, or `None` for kinds that have no shader representation.
    pub fn glsl(self) -> Option<&'static str> {
        match self {
            NodeValueType::Float => Some("float"),
            NodeValueType::Int => Some("int"),
            NodeValueType::Vector2 => Some("vec2"),
            NodeValueType::Vector3 | NodeValueType::Color3 => Some("vec3"),
            NodeValueType::Vector4 | NodeValueType::Color4 => Some("vec4"),
            NodeValueType::Matrix => Some("mat4"),
            NodeValueType::Object
            | NodeValueType::AutoDetect
            | NodeValueType::BasedOnInput => None,
        }
    }

    /// GLSL expression for a zero value of this kind.
    pub fn zero_literal(self) -> Option<&'static str> {
        match self {
            NodeValueType::Float => Some("0.0"),
            NodeValueType::Int => Some("0"),
            NodeValueType::Vector2 => Some("vec2(0.0)"),
            NodeValueType::Vector3 | NodeValueType::Color3 => Some("vec3(0.0)"),
            NodeValueType::Vector4 | NodeValueType::Color4 => Some("vec4(0.0)"),
            NodeValueType::Matrix => Some("mat4(0.0)"),
            NodeValueType::Object
            | NodeValueType::AutoDetect
            | NodeValueType::BasedOnInput => None,
        }
    }
}

impl fmt::Display for NodeValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// One of the two shader programs compiled from the same graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn label(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

/// Stage affinity of a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockTarget {
    Vertex,
    Fragment,
    /// Compiled into both stages, each stage getting its own textual emission.
    VertexAndFragment,
    /// No intrinsic affinity; follows whatever stage reaches it.
    Neutral,
}

impl BlockTarget {
    /// Whether a block with this affinity may be built while compiling `stage`.
    pub fn allows(self, stage: ShaderStage) -> bool {
        match self {
            BlockTarget::Vertex => stage == ShaderStage::Vertex,
            BlockTarget::Fragment => stage == ShaderStage::Fragment,
            BlockTarget::VertexAndFragment | BlockTarget::Neutral => true,
        }
    }

    /// Stage name used in target-violation errors, when the affinity is exclusive.
    pub fn required_stage(self) -> Option<&'static str> {
        match self {
            BlockTarget::Vertex => Some("vertex"),
            BlockTarget::Fragment => Some("fragment"),
            _ => None,
        }
    }
}
