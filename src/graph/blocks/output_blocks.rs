//! Stage roots: the blocks that write `gl_Position` and `gl_FragColor`.

use crate::compiler::EmitCtx;
use crate::error::GraphError;
use crate::graph::types::{BlockTarget, NodeValueType};
use crate::graph::{Block, BlockId, InputPort};

use super::BlockKind;

/// The vertex-stage root. At most one per graph.
pub fn vertex_output(name: &str) -> Block {
    Block::new(BlockKind::VertexOutput, name, BlockTarget::Vertex)
        .unique()
        .with_input(
            InputPort::new("vector", NodeValueType::Vector4).accepts(&[NodeValueType::Color4]),
        )
}

/// A fragment-stage root; a graph may carry several. Three-component colors
/// are promoted with an opaque alpha.
pub fn fragment_output(name: &str) -> Block {
    Block::new(BlockKind::FragmentOutput, name, BlockTarget::Fragment)
        .with_input(InputPort::new("rgba", NodeValueType::Color4).accepts(&[
            NodeValueType::Vector4,
            NodeValueType::Color3,
            NodeValueType::Vector3,
        ]))
}

pub(crate) fn emit_vertex_output(ctx: &mut EmitCtx, id: BlockId) -> Result<(), GraphError> {
    let (vector, _) = ctx.require_input(id, "vector")?;
    ctx.state.push_main(format!("gl_Position = {vector};"));
    Ok(())
}

pub(crate) fn emit_fragment_output(ctx: &mut EmitCtx, id: BlockId) -> Result<(), GraphError> {
    let (rgba, ty) = ctx.require_input(id, "rgba")?;
    let value = match ty {
        NodeValueType::Color3 | NodeValueType::Vector3 => format!("vec4({rgba}, 1.0)"),
        _ => rgba,
    };
    ctx.state.push_main(format!("gl_FragColor = {value};"));
    Ok(())
}
