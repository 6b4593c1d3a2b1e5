//! Graph entry points: mesh attributes, engine-supplied uniforms, user
//! uniforms and inline constants.
//!
//! Input blocks are the only blocks without input ports. Their emission
//! differs per source kind: attributes declare `attribute` symbols in the
//! vertex stage and are smuggled into the fragment stage through an
//! auto-generated varying; uniforms register themselves for per-draw upload;
//! constants fold straight into a `const` declaration.

use serde::{Deserialize, Serialize};

use crate::compiler::EmitCtx;
use crate::error::GraphError;
use crate::graph::types::{BlockTarget, NodeValueType, ShaderStage};
use crate::graph::{Block, BlockId, OutputPort, PortRef};

use super::BlockKind;

/// Engine-supplied uniform values resolvable without user input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SystemValue {
    World,
    View,
    Projection,
    WorldViewProjection,
    CameraPosition,
    Time,
}

impl SystemValue {
    pub fn value_type(self) -> NodeValueType {
        match self {
            SystemValue::World
            | SystemValue::View
            | SystemValue::Projection
            | SystemValue::WorldViewProjection => NodeValueType::Matrix,
            SystemValue::CameraPosition => NodeValueType::Vector3,
            SystemValue::Time => NodeValueType::Float,
        }
    }
}

/// A literal baked into the emitted source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConstantValue {
    Float(f32),
    Vector2([f32; 2]),
    Vector3([f32; 3]),
    Vector4([f32; 4]),
    Color3([f32; 3]),
    Color4([f32; 4]),
    Matrix([f32; 16]),
}

impl ConstantValue {
    pub fn value_type(&self) -> NodeValueType {
        match self {
            ConstantValue::Float(_) => NodeValueType::Float,
            ConstantValue::Vector2(_) => NodeValueType::Vector2,
            ConstantValue::Vector3(_) => NodeValueType::Vector3,
            ConstantValue::Vector4(_) => NodeValueType::Vector4,
            ConstantValue::Color3(_) => NodeValueType::Color3,
            ConstantValue::Color4(_) => NodeValueType::Color4,
            ConstantValue::Matrix(_) => NodeValueType::Matrix,
        }
    }

    /// GLSL constructor expression for this literal.
    pub fn glsl_literal(&self) -> String {
        fn join(values: &[f32]) -> String {
            values
                .iter()
                .map(|v| format!("{v:?}"))
                .collect::<Vec<_>>()
                .join(", ")
        }
        match self {
            ConstantValue::Float(v) => format!("{v:?}"),
            ConstantValue::Vector2(v) => format!("vec2({})", join(v)),
            ConstantValue::Vector3(v) | ConstantValue::Color3(v) => {
                format!("vec3({})", join(v))
            }
            ConstantValue::Vector4(v) | ConstantValue::Color4(v) => {
                format!("vec4({})", join(v))
            }
            ConstantValue::Matrix(v) => format!("mat4({})", join(v)),
        }
    }
}

/// Where an input block's value comes from at draw time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "camelCase")]
pub enum InputSource {
    /// Per-vertex mesh data. The block name doubles as the attribute symbol.
    Attribute { name: String },
    /// Uploaded once per draw; `system` values are filled by the engine,
    /// `None` means a user-owned uniform.
    Uniform { system: Option<SystemValue> },
    /// Folded into the shader text.
    Constant { value: ConstantValue },
}

fn input_block(name: &str, source: InputSource, ty: NodeValueType) -> Block {
    Block::new(BlockKind::Input(source), name, BlockTarget::Neutral)
        .with_output(OutputPort::new("output", ty))
}

/// A mesh attribute of the given type, e.g. `position` as `Vector3`.
pub fn attribute(name: &str, ty: NodeValueType) -> Block {
    input_block(
        name,
        InputSource::Attribute {
            name: name.to_string(),
        },
        ty,
    )
}

/// An engine-filled uniform (world matrix, camera position, time).
pub fn system_uniform(name: &str, system: SystemValue) -> Block {
    input_block(
        name,
        InputSource::Uniform {
            system: Some(system),
        },
        system.value_type(),
    )
}

/// A user-owned uniform uploaded per draw.
pub fn uniform(name: &str, ty: NodeValueType) -> Block {
    input_block(name, InputSource::Uniform { system: None }, ty)
}

/// An inline constant.
pub fn constant(name: &str, value: ConstantValue) -> Block {
    let ty = value.value_type();
    input_block(name, InputSource::Constant { value }, ty)
}

/// Convenience for an RGB color constant.
pub fn color3_constant(name: &str, rgb: [f32; 3]) -> Block {
    constant(name, ConstantValue::Color3(rgb))
}

/// Convenience for an RGBA color constant.
pub fn color4_constant(name: &str, rgba: [f32; 4]) -> Block {
    constant(name, ConstantValue::Color4(rgba))
}

pub(crate) fn emit(ctx: &mut EmitCtx, id: BlockId, source: &InputSource) -> Result<(), GraphError> {
    match source {
        InputSource::Constant { value } => {
            let hint = ctx.block(id).name.clone();
            let (name, ty) = ctx.declare_output(id, 0, &hint)?;
            let glsl = glsl_or_internal(ctx, id, ty)?;
            ctx.state.emit_constant(&name, glsl, &value.glsl_literal());
        }
        InputSource::Uniform { .. } => {
            let hint = ctx.block(id).name.clone();
            let (name, ty) = ctx.declare_output(id, 0, &hint)?;
            let glsl = glsl_or_internal(ctx, id, ty)?;
            ctx.state.emit_uniform(&name, glsl, None);
            ctx.shared.register_bindable(id, &name);
        }
        InputSource::Attribute { name } => {
            let ty = ctx.resolved_output_type(id, 0)?;
            let glsl = glsl_or_internal(ctx, id, ty)?;
            let port = PortRef { block: id, port: 0 };
            match ctx.stage {
                ShaderStage::Vertex => {
                    ctx.state.emit_attribute(name, glsl);
                    ctx.shared.set_output_var(ShaderStage::Vertex, port, name.clone());
                }
                ShaderStage::Fragment => {
                    // Attributes are not addressable from the fragment stage;
                    // route the value through a varying fed at the end of the
                    // vertex main.
                    let varying = format!("v_{name}");
                    let vertex = ctx.vertex_state.as_deref_mut().ok_or_else(|| {
                        GraphError::Internal(format!(
                            "attribute '{name}' pulled by the fragment stage with no vertex program in flight"
                        ))
                    })?;
                    vertex.emit_attribute(name, glsl);
                    if vertex.emit_varying(&varying, glsl, None) {
                        vertex.push_at_end(format!("{varying} = {name};"));
                    }
                    ctx.state.emit_varying(&varying, glsl, None);
                    ctx.shared
                        .set_output_var(ShaderStage::Fragment, port, varying);
                }
            }
        }
    }
    Ok(())
}

fn glsl_or_internal(
    ctx: &EmitCtx,
    id: BlockId,
    ty: NodeValueType,
) -> Result<&'static str, GraphError> {
    ty.glsl().ok_or_else(|| {
        GraphError::Internal(format!(
            "input block '{}' resolved to non-shader type {ty}",
            ctx.block(id).name
        ))
    })
}
