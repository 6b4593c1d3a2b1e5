//! Cross-stage compilation registries.
//!
//! One [`SharedData`] instance is created per compile and handed to both
//! stages' build states, so symbol names, define names and per-block
//! bookkeeping stay consistent between the vertex and fragment programs.

use std::collections::{HashMap, HashSet};

use crate::graph::types::ShaderStage;
use crate::graph::{BlockId, PortRef};

use super::naming::NameAllocator;

/// A block that needs its runtime value uploaded once per draw call, together
/// with the shader symbol it binds to.
#[derive(Clone, Debug)]
pub struct BindableBlock {
    pub block: BlockId,
    pub variable: String,
}

/// Registries shared by both stages for the lifetime of one compile.
#[derive(Debug)]
pub struct SharedData {
    /// Variable namespace, shared so the two stages never collide on a symbol.
    pub names: NameAllocator,
    /// Define namespace, separate from variable names.
    pub defines: NameAllocator,
    /// Blocks needing per-draw uniform upload, in first-emission order.
    pub bindable_blocks: Vec<BindableBlock>,
    /// Blocks contributing preprocessor conditionals, in first-emission order.
    pub blocks_with_defines: Vec<BlockId>,
    /// Texture-consuming blocks, in first-emission order.
    pub texture_blocks: Vec<BlockId>,
    /// Define name owned by each define-contributing block.
    pub define_names: HashMap<BlockId, String>,
    output_vars: HashMap<(ShaderStage, PortRef), String>,
    bindable_seen: HashSet<BlockId>,
    textures_seen: HashSet<BlockId>,
}

impl SharedData {
    pub fn new() -> Self {
        Self {
            names: NameAllocator::new(),
            defines: NameAllocator::without_reserved_words(),
            bindable_blocks: Vec::new(),
            blocks_with_defines: Vec::new(),
            texture_blocks: Vec::new(),
            define_names: HashMap::new(),
            output_vars: HashMap::new(),
            bindable_seen: HashSet::new(),
            textures_seen: HashSet::new(),
        }
    }

    /// Variable name an output port was emitted under in `stage`, if built.
    pub fn output_var(&self, stage: ShaderStage, port: PortRef) -> Option<&str> {
        self.output_vars.get(&(stage, port)).map(String::as_str)
    }

    /// Variable name this port already carries in either stage. Lets a
    /// neutral block re-emitted by the second stage keep its symbol.
    pub fn output_var_any_stage(&self, port: PortRef) -> Option<&str> {
        self.output_vars
            .get(&(ShaderStage::Vertex, port))
            .or_else(|| self.output_vars.get(&(ShaderStage::Fragment, port)))
            .map(String::as_str)
    }

    pub fn set_output_var(&mut self, stage: ShaderStage, port: PortRef, name: String) {
        self.output_vars.insert((stage, port), name);
    }

    /// Idempotent per block.
    pub fn register_bindable(&mut self, block: BlockId, variable: &str) {
        if self.bindable_seen.insert(block) {
            self.bindable_blocks.push(BindableBlock {
                block,
                variable: variable.to_string(),
            });
        }
    }

    /// Idempotent per block.
    pub fn register_texture_block(&mut self, block: BlockId) {
        if self.textures_seen.insert(block) {
            self.texture_blocks.push(block);
        }
    }

    /// First registration wins; later calls return the existing define name.
    pub fn register_define(&mut self, block: BlockId, hint: &str) -> String {
        if let Some(existing) = self.define_names.get(&block) {
            return existing.clone();
        }
        let define = self.defines.free_name(hint);
        self.define_names.insert(block, define.clone());
        self.blocks_with_defines.push(block);
        define
    }
}

impl Default for SharedData {
    fn default() -> Self {
        Self::new()
    }
}
