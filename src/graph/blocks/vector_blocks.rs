//! Geometric vector operations: dot, cross, normalize and matrix transform.

use crate::compiler::EmitCtx;
use crate::error::GraphError;
use crate::graph::types::{BlockTarget, NodeValueType};
use crate::graph::{Block, BlockId, InputPort, OutputPort};

use super::math_blocks::shader_type;
use super::BlockKind;

const NON_VECTOR: &[NodeValueType] = &[
    NodeValueType::Float,
    NodeValueType::Int,
    NodeValueType::Matrix,
    NodeValueType::Object,
];

/// Dot product. Operands share one vector type; the result is always scalar.
pub fn dot(name: &str) -> Block {
    Block::new(BlockKind::Dot, name, BlockTarget::Neutral)
        .with_input(InputPort::new("left", NodeValueType::AutoDetect).excludes(NON_VECTOR))
        .with_input(InputPort::new("right", NodeValueType::AutoDetect).excludes(NON_VECTOR))
        .with_output(OutputPort::new("output", NodeValueType::Float))
        .with_linked_inputs(&["left", "right"], None)
}

/// Cross product over three-component vectors.
pub fn cross(name: &str) -> Block {
    Block::new(BlockKind::Cross, name, BlockTarget::Neutral)
        .with_input(
            InputPort::new("left", NodeValueType::Vector3).accepts(&[NodeValueType::Color3]),
        )
        .with_input(
            InputPort::new("right", NodeValueType::Vector3).accepts(&[NodeValueType::Color3]),
        )
        .with_output(OutputPort::new("output", NodeValueType::Vector3))
}

/// Unit-length rescale, preserving the operand type.
pub fn normalize(name: &str) -> Block {
    Block::new(BlockKind::Normalize, name, BlockTarget::Neutral)
        .with_input(InputPort::new("input", NodeValueType::AutoDetect).excludes(NON_VECTOR))
        .with_output(OutputPort::based_on("output", "input"))
}

/// Matrix transform of a vector. Three-component inputs are promoted with a
/// `w` of one before the multiply.
pub fn transform(name: &str) -> Block {
    Block::new(BlockKind::Transform, name, BlockTarget::Neutral)
        .with_input(InputPort::new("vector", NodeValueType::Vector4).accepts(&[
            NodeValueType::Vector3,
            NodeValueType::Color3,
            NodeValueType::Color4,
        ]))
        .with_input(InputPort::new("transform", NodeValueType::Matrix))
        .with_output(OutputPort::new("output", NodeValueType::Vector4))
}

pub(crate) fn emit_dot(ctx: &mut EmitCtx, id: BlockId) -> Result<(), GraphError> {
    let hint = ctx.block(id).name.clone();
    let (left, _) = ctx.require_input(id, "left")?;
    let (right, _) = ctx.require_input(id, "right")?;
    let (out, _) = ctx.declare_output(id, 0, &hint)?;
    ctx.state
        .push_main(format!("float {out} = dot({left}, {right});"));
    Ok(())
}

pub(crate) fn emit_cross(ctx: &mut EmitCtx, id: BlockId) -> Result<(), GraphError> {
    let hint = ctx.block(id).name.clone();
    let (left, _) = ctx.require_input(id, "left")?;
    let (right, _) = ctx.require_input(id, "right")?;
    let (out, _) = ctx.declare_output(id, 0, &hint)?;
    ctx.state
        .push_main(format!("vec3 {out} = cross({left}, {right});"));
    Ok(())
}

pub(crate) fn emit_normalize(ctx: &mut EmitCtx, id: BlockId) -> Result<(), GraphError> {
    let hint = ctx.block(id).name.clone();
    let (input, _) = ctx.require_input(id, "input")?;
    let (out, ty) = ctx.declare_output(id, 0, &hint)?;
    let glsl = shader_type(ctx, id, ty)?;
    ctx.state
        .push_main(format!("{glsl} {out} = normalize({input});"));
    Ok(())
}

pub(crate) fn emit_transform(ctx: &mut EmitCtx, id: BlockId) -> Result<(), GraphError> {
    let hint = ctx.block(id).name.clone();
    let (vector, vector_ty) = ctx.require_input(id, "vector")?;
    let (matrix, _) = ctx.require_input(id, "transform")?;
    let (out, _) = ctx.declare_output(id, 0, &hint)?;
    let operand = match vector_ty {
        NodeValueType::Vector3 | NodeValueType::Color3 => format!("vec4({vector}, 1.0)"),
        _ => vector,
    };
    ctx.state
        .push_main(format!("vec4 {out} = {matrix} * {operand};"));
    Ok(())
}
