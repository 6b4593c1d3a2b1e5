//! 2D texture sampling.
//!
//! Texture blocks are fragment-only. Each one owns a sampler symbol and a
//! preprocessor define; when the bound texture is flagged as gamma-encoded at
//! draw time, the define routes the sampled value through a shared
//! sRGB-to-linear helper.

use crate::compiler::EmitCtx;
use crate::error::GraphError;
use crate::graph::types::{BlockTarget, NodeValueType};
use crate::graph::{Block, BlockId, InputPort, OutputPort};

use super::BlockKind;

pub(crate) const TO_LINEAR_SPACE: &str = "vec4 toLinearSpace(vec4 color) {
    return vec4(pow(color.rgb, vec3(2.2)), color.a);
}";

/// Sample a 2D texture at the given UV. Exposes the full RGBA sample and a
/// derived RGB view that only costs a statement when actually consumed.
pub fn texture(name: &str) -> Block {
    Block::new(BlockKind::Texture, name, BlockTarget::Fragment)
        .with_input(InputPort::new("uv", NodeValueType::Vector2))
        .with_output(OutputPort::new("rgba", NodeValueType::Color4))
        .with_output(OutputPort::new("rgb", NodeValueType::Color3))
}

pub(crate) fn emit(ctx: &mut EmitCtx, id: BlockId) -> Result<(), GraphError> {
    let name = ctx.block(id).name.clone();
    let (uv, _) = ctx.require_input(id, "uv")?;

    let sampler = ctx.shared.names.free_name(&format!("{name}Sampler"));
    ctx.state.emit_sampler(&sampler);
    ctx.shared.register_bindable(id, &sampler);
    ctx.shared.register_texture_block(id);
    let define = ctx
        .shared
        .register_define(id, &format!("{}_GAMMA", name.to_uppercase()));

    ctx.state.emit_function(
        "toLinearSpace",
        TO_LINEAR_SPACE,
        Some("sRGB decode applied to samples flagged as gamma-encoded"),
    );

    let rgba_idx = ctx.block(id).output_index("rgba").ok_or_else(|| {
        GraphError::Internal(format!("texture block '{name}' lost its rgba port"))
    })?;
    let (rgba, _) = ctx.declare_output(id, rgba_idx, &name)?;
    ctx.state
        .push_main(format!("vec4 {rgba} = texture2D({sampler}, {uv});"));
    ctx.state.push_main(format!(
        "#ifdef {define}\n{rgba} = toLinearSpace({rgba});\n#endif"
    ));

    // The rgb view is derived lazily: no consumer, no statement.
    let rgb_idx = ctx.block(id).output_index("rgb").ok_or_else(|| {
        GraphError::Internal(format!("texture block '{name}' lost its rgb port"))
    })?;
    if !ctx.block(id).outputs[rgb_idx].fanout.is_empty() {
        let (rgb, _) = ctx.declare_output(id, rgb_idx, &format!("{name}Rgb"))?;
        ctx.state.push_main(format!("vec3 {rgb} = {rgba}.rgb;"));
    }
    Ok(())
}
