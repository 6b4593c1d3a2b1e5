//! Per-stage mutable compilation context.
//!
//! A [`BuildState`] accumulates the declaration buffers and the `main` body
//! for one shader stage, then [`BuildState::finalize`] assembles them in the
//! fixed order GLSL requires: declarations before the function bodies that
//! reference them.

use std::collections::{BTreeMap, HashSet};

use crate::graph::types::ShaderStage;
use crate::graph::BlockId;

/// Wraps a declaration in `#ifdef` (or `#ifndef` when negated).
#[derive(Clone, Debug)]
pub struct DefineGuard {
    pub define: String,
    pub negated: bool,
}

impl DefineGuard {
    pub fn ifdef(define: impl Into<String>) -> Self {
        Self {
            define: define.into(),
            negated: false,
        }
    }

    pub fn ifndef(define: impl Into<String>) -> Self {
        Self {
            define: define.into(),
            negated: true,
        }
    }
}

/// Mutable compilation context for one shader stage.
#[derive(Debug)]
pub struct BuildState {
    pub stage: ShaderStage,
    compilation: Vec<String>,
    attributes: Vec<String>,
    uniforms: Vec<String>,
    samplers: Vec<String>,
    varyings: Vec<String>,
    constants: Vec<String>,
    functions: Vec<(String, Option<String>, String)>,
    extensions: BTreeMap<String, String>,
    inject_at_end: Vec<String>,
    emitted_attributes: HashSet<String>,
    emitted_uniforms: HashSet<String>,
    emitted_samplers: HashSet<String>,
    emitted_varyings: HashSet<String>,
    emitted_constants: HashSet<String>,
    emitted_functions: HashSet<String>,
    /// Blocks already emitted in this stage (diamond dependencies).
    pub visited: HashSet<BlockId>,
    /// Blocks currently on the recursion path (cycle detection).
    pub visiting: HashSet<BlockId>,
}

impl BuildState {
    pub fn new(stage: ShaderStage) -> Self {
        Self {
            stage,
            compilation: Vec::new(),
            attributes: Vec::new(),
            uniforms: Vec::new(),
            samplers: Vec::new(),
            varyings: Vec::new(),
            constants: Vec::new(),
            functions: Vec::new(),
            extensions: BTreeMap::new(),
            inject_at_end: Vec::new(),
            emitted_attributes: HashSet::new(),
            emitted_uniforms: HashSet::new(),
            emitted_samplers: HashSet::new(),
            emitted_varyings: HashSet::new(),
            emitted_constants: HashSet::new(),
            emitted_functions: HashSet::new(),
            visited: HashSet::new(),
            visiting: HashSet::new(),
        }
    }

    /// Append one statement (possibly spanning several lines) to the stage's
    /// `main` body.
    pub fn push_main(&mut self, code: impl Into<String>) {
        self.compilation.push(code.into());
    }

    /// Statements deferred to the very end of `main`, after everything else
    /// (varying transfer out of the vertex stage).
    pub fn push_at_end(&mut self, code: impl Into<String>) {
        self.inject_at_end.push(code.into());
    }

    /// Vertex-stage-only attribute declaration, idempotent by name.
    pub fn emit_attribute(&mut self, name: &str, glsl_type: &str) -> bool {
        debug_assert_eq!(self.stage, ShaderStage::Vertex);
        if !self.emitted_attributes.insert(name.to_string()) {
            return false;
        }
        self.attributes.push(format!("attribute {glsl_type} {name};"));
        true
    }

    /// Uniform declaration, idempotent by name, optionally define-guarded.
    pub fn emit_uniform(&mut self, name: &str, glsl_type: &str, guard: Option<&DefineGuard>) -> bool {
        if !self.emitted_uniforms.insert(name.to_string()) {
            return false;
        }
        let decl = format!("uniform {glsl_type} {name};");
        self.uniforms.push(Self::guarded(decl, guard));
        true
    }

    /// Sampler declaration, idempotent by name.
    pub fn emit_sampler(&mut self, name: &str) -> bool {
        if !self.emitted_samplers.insert(name.to_string()) {
            return false;
        }
        self.samplers.push(format!("uniform sampler2D {name};"));
        true
    }

    /// Varying declaration, idempotent by name, optionally define-guarded.
    pub fn emit_varying(&mut self, name: &str, glsl_type: &str, guard: Option<&DefineGuard>) -> bool {
        if !self.emitted_varyings.insert(name.to_string()) {
            return false;
        }
        let decl = format!("varying {glsl_type} {name};");
        self.varyings.push(Self::guarded(decl, guard));
        true
    }

    /// Constant declaration, idempotent by name.
    pub fn emit_constant(&mut self, name: &str, glsl_type: &str, literal: &str) -> bool {
        if !self.emitted_constants.insert(name.to_string()) {
            return false;
        }
        self.constants
            .push(format!("const {glsl_type} {name} = {literal};"));
        true
    }

    /// Helper function registration: first writer wins, later calls with the
    /// same name are no-ops so several blocks can share one helper.
    pub fn emit_function(&mut self, name: &str, code: &str, comment: Option<&str>) -> bool {
        if !self.emitted_functions.insert(name.to_string()) {
            return false;
        }
        self.functions.push((
            name.to_string(),
            comment.map(str::to_string),
            code.to_string(),
        ));
        true
    }

    /// Preprocessor extension directive, idempotent by extension name.
    pub fn emit_extension(&mut self, name: &str, directive: &str) {
        self.extensions
            .entry(name.to_string())
            .or_insert_with(|| directive.to_string());
    }

    /// Assemble the final stage source. Ordering is load-bearing: GLSL needs
    /// every declaration before the first use.
    pub fn finalize(&self) -> String {
        let mut out = String::new();
        out.push_str("precision highp float;\n");

        for directive in self.extensions.values() {
            out.push_str(directive);
            out.push('\n');
        }

        if self.stage == ShaderStage::Vertex {
            Self::write_section(&mut out, &self.attributes);
        }
        Self::write_section(&mut out, &self.uniforms);
        Self::write_section(&mut out, &self.samplers);
        Self::write_section(&mut out, &self.varyings);
        Self::write_section(&mut out, &self.constants);

        for (_, comment, code) in &self.functions {
            out.push('\n');
            if let Some(comment) = comment {
                out.push_str(&format!("// {comment}\n"));
            }
            out.push_str(code);
            if !code.ends_with('\n') {
                out.push('\n');
            }
        }

        out.push_str("\nvoid main(void) {\n");
        for statement in self.compilation.iter().chain(self.inject_at_end.iter()) {
            for line in statement.lines() {
                out.push_str("    ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push_str("}\n");
        out
    }

    fn write_section(out: &mut String, decls: &[String]) {
        if decls.is_empty() {
            return;
        }
        out.push('\n');
        for decl in decls {
            out.push_str(decl);
            out.push('\n');
        }
    }

    fn guarded(decl: String, guard: Option<&DefineGuard>) -> String {
        match guard {
            None => decl,
            Some(g) => {
                let directive = if g.negated { "#ifndef" } else { "#ifdef" };
                format!("{directive} {}\n{decl}\n#endif", g.define)
            }
        }
    }
}
