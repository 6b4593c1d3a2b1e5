//! Componentwise arithmetic blocks.

use serde::{Deserialize, Serialize};

use crate::compiler::EmitCtx;
use crate::error::GraphError;
use crate::graph::types::{BlockTarget, NodeValueType};
use crate::graph::{Block, BlockId, InputPort, OutputPort};

use super::BlockKind;

/// The arithmetic family. All variants operate componentwise and forward the
/// type of their primary operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    /// Multiply a vector or scalar by a scalar factor.
    Scale,
    /// `mix(left, right, gradient)`.
    Lerp,
}

const NON_ARITHMETIC: &[NodeValueType] = &[NodeValueType::Matrix, NodeValueType::Object];

/// Build a math block. Binary variants link `left` and `right` so both
/// operands resolve to one shared type.
pub fn math(name: &str, op: MathOp) -> Block {
    let block = Block::new(BlockKind::Math(op), name, BlockTarget::Neutral);
    match op {
        MathOp::Add | MathOp::Subtract | MathOp::Multiply | MathOp::Divide => block
            .with_input(InputPort::new("left", NodeValueType::AutoDetect).excludes(NON_ARITHMETIC))
            .with_input(InputPort::new("right", NodeValueType::AutoDetect).excludes(NON_ARITHMETIC))
            .with_output(OutputPort::based_on("output", "left"))
            .with_linked_inputs(&["left", "right"], None),
        MathOp::Scale => block
            .with_input(InputPort::new("input", NodeValueType::AutoDetect).excludes(NON_ARITHMETIC))
            .with_input(InputPort::new("factor", NodeValueType::Float))
            .with_output(OutputPort::based_on("output", "input")),
        MathOp::Lerp => block
            .with_input(InputPort::new("left", NodeValueType::AutoDetect).excludes(NON_ARITHMETIC))
            .with_input(InputPort::new("right", NodeValueType::AutoDetect).excludes(NON_ARITHMETIC))
            .with_input(InputPort::new("gradient", NodeValueType::Float))
            .with_output(OutputPort::based_on("output", "left"))
            .with_linked_inputs(&["left", "right"], None),
    }
}

pub(crate) fn emit(ctx: &mut EmitCtx, id: BlockId, op: MathOp) -> Result<(), GraphError> {
    let hint = ctx.block(id).name.clone();
    match op {
        MathOp::Add | MathOp::Subtract | MathOp::Multiply | MathOp::Divide => {
            let (left, _) = ctx.require_input(id, "left")?;
            let (right, _) = ctx.require_input(id, "right")?;
            let (out, ty) = ctx.declare_output(id, 0, &hint)?;
            let glsl = shader_type(ctx, id, ty)?;
            let operator = match op {
                MathOp::Add => "+",
                MathOp::Subtract => "-",
                MathOp::Multiply => "*",
                MathOp::Divide => "/",
                _ => unreachable!(),
            };
            ctx.state
                .push_main(format!("{glsl} {out} = {left} {operator} {right};"));
        }
        MathOp::Scale => {
            let (input, _) = ctx.require_input(id, "input")?;
            let (factor, _) = ctx.require_input(id, "factor")?;
            let (out, ty) = ctx.declare_output(id, 0, &hint)?;
            let glsl = shader_type(ctx, id, ty)?;
            ctx.state
                .push_main(format!("{glsl} {out} = {input} * {factor};"));
        }
        MathOp::Lerp => {
            let (left, _) = ctx.require_input(id, "left")?;
            let (right, _) = ctx.require_input(id, "right")?;
            let (gradient, _) = ctx.require_input(id, "gradient")?;
            let (out, ty) = ctx.declare_output(id, 0, &hint)?;
            let glsl = shader_type(ctx, id, ty)?;
            ctx.state
                .push_main(format!("{glsl} {out} = mix({left}, {right}, {gradient});"));
        }
    }
    Ok(())
}

pub(crate) fn shader_type(
    ctx: &EmitCtx,
    id: BlockId,
    ty: NodeValueType,
) -> Result<&'static str, GraphError> {
    ty.glsl().ok_or_else(|| {
        GraphError::Internal(format!(
            "block '{}' resolved to non-shader type {ty}",
            ctx.block(id).name
        ))
    })
}
