//! Graph-to-GLSL compilation.
//!
//! [`compile`] resolves port types, then walks the graph once per stage from
//! its output roots, emitting each reachable block exactly once per stage.
//! Symbol names and per-block draw metadata live in [`SharedData`] so the two
//! stage programs stay mutually consistent.

pub mod build_state;
pub mod naming;
pub mod shared;

use std::collections::{HashMap, HashSet};

use crate::error::GraphError;
use crate::graph::blocks::{self, BlockKind, InputSource};
use crate::graph::resolve::{resolve_types, ResolvedTypes};
use crate::graph::types::{NodeValueType, ShaderStage};
use crate::graph::{Block, BlockId, Graph, PortRef};

use build_state::BuildState;
use shared::{BindableBlock, SharedData};

/// Everything a block emission routine can reach: the immutable graph and
/// resolved types, the current stage's build state, the vertex state when the
/// fragment stage needs to inject varyings, and the cross-stage registries.
pub struct EmitCtx<'a> {
    pub graph: &'a Graph,
    pub types: &'a ResolvedTypes,
    pub stage: ShaderStage,
    pub state: &'a mut BuildState,
    /// Present only while building the fragment stage.
    pub vertex_state: Option<&'a mut BuildState>,
    pub shared: &'a mut SharedData,
}

impl<'a> EmitCtx<'a> {
    pub fn block(&self, id: BlockId) -> &'a Block {
        self.graph.block(id)
    }

    /// Variable name and resolved type feeding the named input, or an error
    /// when the input is unwired.
    pub fn require_input(
        &self,
        id: BlockId,
        name: &str,
    ) -> Result<(String, NodeValueType), GraphError> {
        match self.optional_input(id, name)? {
            Some(found) => Ok(found),
            None => Err(GraphError::MissingInput {
                block: self.block(id).name.clone(),
                port: name.to_string(),
            }),
        }
    }

    /// As [`Self::require_input`], but an unwired port is `Ok(None)`.
    pub fn optional_input(
        &self,
        id: BlockId,
        name: &str,
    ) -> Result<Option<(String, NodeValueType)>, GraphError> {
        let block = self.block(id);
        let idx = block.input_index(name).ok_or_else(|| GraphError::UnknownPort {
            block: block.name.clone(),
            port: name.to_string(),
        })?;
        let Some(src) = block.inputs[idx].connected else {
            return Ok(None);
        };
        let ty = self
            .types
            .output(src)
            .ok_or_else(|| GraphError::UnresolvedType {
                block: block.name.clone(),
                port: name.to_string(),
            })?;
        // The feeder was built before us in the same stage, so its symbol
        // must already exist.
        let var = self
            .shared
            .output_var(self.stage, src)
            .or_else(|| self.shared.output_var_any_stage(src))
            .ok_or_else(|| {
                GraphError::Internal(format!(
                    "input '{name}' of '{}' read before its feeder was emitted",
                    block.name
                ))
            })?
            .to_string();
        Ok(Some((var, ty)))
    }

    pub fn resolved_output_type(
        &self,
        id: BlockId,
        port: usize,
    ) -> Result<NodeValueType, GraphError> {
        let block = self.block(id);
        self.types
            .output(PortRef { block: id, port })
            .ok_or_else(|| GraphError::UnresolvedType {
                block: block.name.clone(),
                port: block.outputs[port].name.clone(),
            })
    }

    /// Allocate (or re-use, when the other stage already emitted this port)
    /// the variable an output port is written to in the current stage.
    pub fn declare_output(
        &mut self,
        id: BlockId,
        port: usize,
        hint: &str,
    ) -> Result<(String, NodeValueType), GraphError> {
        let ty = self.resolved_output_type(id, port)?;
        let port_ref = PortRef { block: id, port };
        let name = match self.shared.output_var_any_stage(port_ref) {
            Some(existing) => existing.to_string(),
            None => self.shared.names.free_name(hint),
        };
        self.shared
            .set_output_var(self.stage, port_ref, name.clone());
        Ok((name, ty))
    }
}

/// Recursive build walk: dependencies first, then the block itself, with
/// cycle and stage-affinity checks on the way down.
pub(crate) fn build_block(ctx: &mut EmitCtx, id: BlockId) -> Result<(), GraphError> {
    if ctx.state.visited.contains(&id) {
        return Ok(());
    }
    if !ctx.state.visiting.insert(id) {
        return Err(GraphError::Cyclic {
            block: ctx.block(id).name.clone(),
        });
    }

    let block = ctx.block(id);
    if !block.target.allows(ctx.stage) {
        return Err(GraphError::Target {
            block: block.name.clone(),
            expected: block.target.required_stage().unwrap_or("any"),
        });
    }

    let feeders: Vec<BlockId> = block
        .inputs
        .iter()
        .filter(|input| {
            input
                .target_restriction
                .is_none_or(|target| target.allows(ctx.stage))
        })
        .filter_map(|input| input.connected.map(|src| src.block))
        .collect();
    for feeder in feeders {
        build_block(ctx, feeder)?;
    }

    blocks::emit_block(ctx, id)?;

    ctx.state.visiting.remove(&id);
    ctx.state.visited.insert(id);
    Ok(())
}

/// Per-draw toggles resolved against a compiled material's define table.
#[derive(Debug, Default)]
pub struct DrawState {
    /// Texture blocks whose bound texture is gamma-encoded this draw.
    pub gamma_textures: HashSet<BlockId>,
}

/// The result of one compile: both stage sources plus the metadata a renderer
/// needs to bind values and toggle defines at draw time.
#[derive(Debug)]
pub struct CompiledMaterial {
    pub vertex_source: String,
    pub fragment_source: String,
    /// Blocks needing a per-draw upload, with their shader symbols.
    pub bindable_blocks: Vec<BindableBlock>,
    /// Blocks owning a preprocessor conditional, in emission order.
    pub blocks_with_defines: Vec<BlockId>,
    /// Texture-consuming blocks, in emission order.
    pub texture_blocks: Vec<BlockId>,
    pub define_names: HashMap<BlockId, String>,
}

impl CompiledMaterial {
    /// `#define` lines to prepend for one draw, in stable emission order.
    pub fn prepare_defines(&self, draw: &DrawState) -> Vec<String> {
        self.blocks_with_defines
            .iter()
            .filter(|block| draw.gamma_textures.contains(block))
            .filter_map(|block| self.define_names.get(block))
            .map(|define| format!("#define {define}"))
            .collect()
    }
}

/// Compile a graph into a vertex and a fragment program.
///
/// Requires one vertex root and at least one fragment root. The vertex stage
/// is built first so the fragment walk can still append varying transfers to
/// the end of the vertex main.
pub fn compile(graph: &Graph) -> Result<CompiledMaterial, GraphError> {
    let types = resolve_types(graph)?;

    let mut shared = SharedData::new();
    // Attribute symbols (and their varying twins) are fixed by the mesh
    // layout; claim them before any generated name can shadow them.
    for block in graph.blocks() {
        if let BlockKind::Input(InputSource::Attribute { name }) = &block.kind {
            shared.names.reserve(name);
            shared.names.reserve(&format!("v_{name}"));
        }
    }

    let vertex_root = graph
        .vertex_root()
        .ok_or(GraphError::MissingRoot { stage: "vertex" })?;
    let fragment_roots = graph.fragment_roots();
    if fragment_roots.is_empty() {
        return Err(GraphError::MissingRoot { stage: "fragment" });
    }

    let mut vertex_state = BuildState::new(ShaderStage::Vertex);
    {
        let mut ctx = EmitCtx {
            graph,
            types: &types,
            stage: ShaderStage::Vertex,
            state: &mut vertex_state,
            vertex_state: None,
            shared: &mut shared,
        };
        build_block(&mut ctx, vertex_root)?;
    }

    let mut fragment_state = BuildState::new(ShaderStage::Fragment);
    {
        let mut ctx = EmitCtx {
            graph,
            types: &types,
            stage: ShaderStage::Fragment,
            state: &mut fragment_state,
            vertex_state: Some(&mut vertex_state),
            shared: &mut shared,
        };
        for root in fragment_roots {
            build_block(&mut ctx, root)?;
        }
    }

    let vertex_source = vertex_state.finalize();
    let fragment_source = fragment_state.finalize();
    log::debug!(
        "compiled material: {} blocks, {} bindables, {} defines",
        graph.block_count(),
        shared.bindable_blocks.len(),
        shared.blocks_with_defines.len(),
    );

    Ok(CompiledMaterial {
        vertex_source,
        fragment_source,
        bindable_blocks: shared.bindable_blocks,
        blocks_with_defines: shared.blocks_with_defines,
        texture_blocks: shared.texture_blocks,
        define_names: shared.define_names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::blocks::{input_blocks, output_blocks, texture_blocks, vector_blocks};
    use crate::graph::types::NodeValueType;

    fn minimal_graph() -> Graph {
        let mut g = Graph::new();
        let position = g
            .add(input_blocks::attribute("position", NodeValueType::Vector3))
            .unwrap();
        let wvp = g
            .add(input_blocks::system_uniform(
                "worldViewProjection",
                input_blocks::SystemValue::WorldViewProjection,
            ))
            .unwrap();
        let transformed = g.add(vector_blocks::transform("worldPos")).unwrap();
        let vout = g.add(output_blocks::vertex_output("vertexOutput")).unwrap();
        let tint = g
            .add(input_blocks::color3_constant("tint", [1.0, 0.5, 0.25]))
            .unwrap();
        let fout = g
            .add(output_blocks::fragment_output("fragmentOutput"))
            .unwrap();
        g.connect(position, "output", transformed, "vector").unwrap();
        g.connect(wvp, "output", transformed, "transform").unwrap();
        g.connect(transformed, "output", vout, "vector").unwrap();
        g.connect(tint, "output", fout, "rgba").unwrap();
        g
    }

    #[test]
    fn minimal_material_emits_both_stages() {
        let material = compile(&minimal_graph()).unwrap();
        assert!(material.vertex_source.contains("attribute vec3 position;"));
        assert!(material
            .vertex_source
            .contains("uniform mat4 worldViewProjection;"));
        assert!(material
            .vertex_source
            .contains("vec4 worldPos = worldViewProjection * vec4(position, 1.0);"));
        assert!(material.vertex_source.contains("gl_Position = worldPos;"));
        assert!(material
            .fragment_source
            .contains("const vec3 tint = vec3(1.0, 0.5, 0.25);"));
        assert!(material
            .fragment_source
            .contains("gl_FragColor = vec4(tint, 1.0);"));
    }

    #[test]
    fn missing_roots_are_reported_per_stage() {
        let mut g = Graph::new();
        g.add(output_blocks::fragment_output("fragmentOutput"))
            .unwrap();
        assert!(matches!(
            compile(&g),
            Err(GraphError::MissingRoot { stage: "vertex" })
        ));

        let mut g = Graph::new();
        g.add(output_blocks::vertex_output("vertexOutput")).unwrap();
        assert!(matches!(
            compile(&g),
            Err(GraphError::MissingRoot { stage: "fragment" })
        ));
    }

    #[test]
    fn fragment_only_block_in_vertex_path_is_a_target_error() {
        let mut g = Graph::new();
        let tex = g.add(texture_blocks::texture("albedo")).unwrap();
        let vout = g.add(output_blocks::vertex_output("vertexOutput")).unwrap();
        g.add(output_blocks::fragment_output("fragmentOutput"))
            .unwrap();
        g.connect(tex, "rgba", vout, "vector").unwrap();

        let err = compile(&g).unwrap_err();
        assert!(matches!(err, GraphError::Target { expected: "fragment", .. }));
    }

    #[test]
    fn gamma_defines_follow_draw_state() {
        let mut g = Graph::new();
        let uv = g
            .add(input_blocks::attribute("uv", NodeValueType::Vector2))
            .unwrap();
        let tex = g.add(texture_blocks::texture("albedo")).unwrap();
        let fout = g
            .add(output_blocks::fragment_output("fragmentOutput"))
            .unwrap();
        let position = g
            .add(input_blocks::attribute("position", NodeValueType::Vector4))
            .unwrap();
        let vout = g.add(output_blocks::vertex_output("vertexOutput")).unwrap();
        g.connect(position, "output", vout, "vector").unwrap();
        g.connect(uv, "output", tex, "uv").unwrap();
        g.connect(tex, "rgba", fout, "rgba").unwrap();

        let material = compile(&g).unwrap();
        assert_eq!(material.texture_blocks, vec![tex]);

        let mut draw = DrawState::default();
        assert!(material.prepare_defines(&draw).is_empty());
        draw.gamma_textures.insert(tex);
        assert_eq!(material.prepare_defines(&draw), vec!["#define ALBEDO_GAMMA"]);
    }
}
