//! Deterministic symbol-name generation for emitted shader code.
//!
//! One allocator instance is owned by the per-compile shared data and used by
//! both stages, so vertex- and fragment-emitted names can never collide. A
//! fresh allocator per compile guarantees no cross-material leakage.

use std::collections::{HashMap, HashSet};

/// GLSL words (and builtins we emit against) that may never be handed out as
/// generated identifiers.
const RESERVED_WORDS: &[&str] = &[
    "attribute", "uniform", "varying", "const", "void", "main", "float", "int", "bool", "vec2",
    "vec3", "vec4", "mat2", "mat3", "mat4", "sampler2D", "samplerCube", "texture2D",
    "textureCube", "precision", "highp", "mediump", "lowp", "in", "out", "inout", "if", "else",
    "for", "while", "do", "return", "discard", "struct", "true", "false", "mix", "dot", "cross",
    "normalize", "pow", "gl_Position", "gl_FragColor",
];

/// Incrementing name registry keyed by requested prefix.
///
/// The first request for a prefix returns the bare prefix, unless the prefix
/// is reserved, in which case it is suffixed with `0` on first use too. Every
/// subsequent request returns the prefix with an incrementing integer.
#[derive(Debug)]
pub struct NameAllocator {
    counters: HashMap<String, u32>,
    reserved: HashSet<String>,
    issued: HashSet<String>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self {
            counters: HashMap::new(),
            reserved: RESERVED_WORDS.iter().map(|w| w.to_string()).collect(),
            issued: HashSet::new(),
        }
    }

    /// An allocator with no seeded reserved words; used for the define
    /// namespace, which never collides with GLSL keywords.
    pub fn without_reserved_words() -> Self {
        Self {
            counters: HashMap::new(),
            reserved: HashSet::new(),
            issued: HashSet::new(),
        }
    }

    /// Claim a name before any allocation happens (the `initialize` contract
    /// of blocks that rely on well-known symbols such as attribute names).
    pub fn reserve(&mut self, name: &str) {
        self.reserved.insert(name.to_string());
    }

    /// Hand out a unique identifier derived from `hint`.
    pub fn free_name(&mut self, hint: &str) -> String {
        let prefix = sanitize_identifier(hint);
        loop {
            let count = self.counters.entry(prefix.clone()).or_insert(0);
            let candidate = if *count == 0 && !self.reserved.contains(&prefix) {
                prefix.clone()
            } else {
                format!("{prefix}{count}")
            };
            *count += 1;
            // A previously issued name can shadow a candidate when one hint is
            // another hint plus a digit; keep counting until clear.
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

impl Default for NameAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip non-identifier characters from a name hint.
pub fn sanitize_identifier(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        }
    }
    if out.is_empty() {
        out.push('v');
    } else if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}
