//! Branch selection over scalar comparisons.

use serde::{Deserialize, Serialize};

use crate::compiler::EmitCtx;
use crate::error::GraphError;
use crate::graph::types::{BlockTarget, NodeValueType};
use crate::graph::{Block, BlockId, InputPort, OutputPort};

use super::BlockKind;

/// Scalar comparison driving a conditional block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionalOp {
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessOrEqual,
    GreaterOrEqual,
}

impl ConditionalOp {
    fn symbol(self) -> &'static str {
        match self {
            ConditionalOp::Equal => "==",
            ConditionalOp::NotEqual => "!=",
            ConditionalOp::LessThan => "<",
            ConditionalOp::GreaterThan => ">",
            ConditionalOp::LessOrEqual => "<=",
            ConditionalOp::GreaterOrEqual => ">=",
        }
    }
}

/// Compare two scalars and select between two branch values. The branches are
/// linked and default to `Float` when both are left unwired; an unwired branch
/// contributes a zero of the resolved type.
pub fn conditional(name: &str, op: ConditionalOp) -> Block {
    Block::new(BlockKind::Conditional(op), name, BlockTarget::Neutral)
        .with_input(InputPort::new("a", NodeValueType::Float))
        .with_input(InputPort::new("b", NodeValueType::Float))
        .with_input(InputPort::new("true", NodeValueType::AutoDetect).optional())
        .with_input(InputPort::new("false", NodeValueType::AutoDetect).optional())
        .with_output(OutputPort::based_on("output", "true"))
        .with_linked_inputs(&["true", "false"], Some(NodeValueType::Float))
}

pub(crate) fn emit(ctx: &mut EmitCtx, id: BlockId, op: ConditionalOp) -> Result<(), GraphError> {
    let hint = ctx.block(id).name.clone();
    let (a, _) = ctx.require_input(id, "a")?;
    let (b, _) = ctx.require_input(id, "b")?;
    let out_ty = ctx.resolved_output_type(id, 0)?;
    let zero = out_ty.zero_literal().ok_or_else(|| {
        GraphError::Internal(format!(
            "conditional '{}' resolved to non-shader type {out_ty}",
            ctx.block(id).name
        ))
    })?;
    let when_true = match ctx.optional_input(id, "true")? {
        Some((var, _)) => var,
        None => zero.to_string(),
    };
    let when_false = match ctx.optional_input(id, "false")? {
        Some((var, _)) => var,
        None => zero.to_string(),
    };
    let (out, ty) = ctx.declare_output(id, 0, &hint)?;
    let glsl = super::math_blocks::shader_type(ctx, id, ty)?;
    let symbol = op.symbol();
    ctx.state.push_main(format!(
        "{glsl} {out} = ({a} {symbol} {b}) ? {when_true} : {when_false};"
    ));
    Ok(())
}
