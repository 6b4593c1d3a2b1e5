//! Block catalog.
//!
//! Each submodule owns the constructors and the emission routine for one
//! family of blocks; [`emit_block`] is the single dispatch point the build
//! walk calls once per block per stage.

pub mod input_blocks;
pub mod logic_blocks;
pub mod math_blocks;
pub mod output_blocks;
pub mod texture_blocks;
pub mod vector_blocks;

pub use input_blocks::{ConstantValue, InputSource, SystemValue};
pub use logic_blocks::ConditionalOp;
pub use math_blocks::MathOp;

use crate::compiler::EmitCtx;
use crate::error::GraphError;

use super::BlockId;

/// What a block computes. Drives both class naming for serialization and
/// emission dispatch.
#[derive(Clone, Debug, PartialEq)]
pub enum BlockKind {
    Input(InputSource),
    Math(MathOp),
    Dot,
    Cross,
    Normalize,
    Transform,
    Conditional(ConditionalOp),
    Texture,
    VertexOutput,
    FragmentOutput,
}

impl BlockKind {
    /// Serialized class name. One name per constructor, so a round-tripped
    /// graph rebuilds through the same constructor that made it.
    pub fn class_name(&self) -> &'static str {
        match self {
            BlockKind::Input(_) => "InputBlock",
            BlockKind::Math(MathOp::Add) => "AddBlock",
            BlockKind::Math(MathOp::Subtract) => "SubtractBlock",
            BlockKind::Math(MathOp::Multiply) => "MultiplyBlock",
            BlockKind::Math(MathOp::Divide) => "DivideBlock",
            BlockKind::Math(MathOp::Scale) => "ScaleBlock",
            BlockKind::Math(MathOp::Lerp) => "LerpBlock",
            BlockKind::Dot => "DotBlock",
            BlockKind::Cross => "CrossBlock",
            BlockKind::Normalize => "NormalizeBlock",
            BlockKind::Transform => "TransformBlock",
            BlockKind::Conditional(_) => "ConditionalBlock",
            BlockKind::Texture => "TextureBlock",
            BlockKind::VertexOutput => "VertexOutputBlock",
            BlockKind::FragmentOutput => "FragmentOutputBlock",
        }
    }
}

/// Emit one block's GLSL into the current stage.
pub(crate) fn emit_block(ctx: &mut EmitCtx, id: BlockId) -> Result<(), GraphError> {
    let kind = ctx.block(id).kind.clone();
    match kind {
        BlockKind::Input(source) => input_blocks::emit(ctx, id, &source),
        BlockKind::Math(op) => math_blocks::emit(ctx, id, op),
        BlockKind::Dot => vector_blocks::emit_dot(ctx, id),
        BlockKind::Cross => vector_blocks::emit_cross(ctx, id),
        BlockKind::Normalize => vector_blocks::emit_normalize(ctx, id),
        BlockKind::Transform => vector_blocks::emit_transform(ctx, id),
        BlockKind::Conditional(op) => logic_blocks::emit(ctx, id, op),
        BlockKind::Texture => texture_blocks::emit(ctx, id),
        BlockKind::VertexOutput => output_blocks::emit_vertex_output(ctx, id),
        BlockKind::FragmentOutput => output_blocks::emit_fragment_output(ctx, id),
    }
}
