//! Type-resolution pass.
//!
//! Runs a fixpoint over the graph in block-id order, so the resolved concrete
//! type of every port is identical across repeated compiles of the same graph
//! and connection order. Placeholder kinds (`AutoDetect`, `BasedOnInput`)
//! concretize here; anything left unresolved is reported lazily, at the point
//! emission asks for it.

use std::collections::{HashMap, HashSet};

use crate::error::GraphError;

use super::types::NodeValueType;
use super::{Graph, PortRef};

/// Resolved concrete types for every port that could be concretized.
#[derive(Debug, Default)]
pub struct ResolvedTypes {
    inputs: HashMap<PortRef, NodeValueType>,
    outputs: HashMap<PortRef, NodeValueType>,
}

impl ResolvedTypes {
    pub fn input(&self, port: PortRef) -> Option<NodeValueType> {
        self.inputs.get(&port).copied()
    }

    pub fn output(&self, port: PortRef) -> Option<NodeValueType> {
        self.outputs.get(&port).copied()
    }
}

/// Resolve every port type that has enough information to concretize.
///
/// The effective type of a connected input is the feeding output's resolved
/// type, subject to the accepted/excluded filters; a filter violation that
/// only becomes visible once a placeholder output concretizes is still a
/// connection-type error.
pub fn resolve_types(graph: &Graph) -> Result<ResolvedTypes, GraphError> {
    let mut resolved = ResolvedTypes::default();
    let mut validated: HashSet<PortRef> = HashSet::new();

    // Seed: concrete declared output types, and unconnected inputs with a
    // concrete declared type.
    for block in graph.blocks() {
        for (idx, output) in block.outputs.iter().enumerate() {
            if !output.declared.is_placeholder() {
                resolved.outputs.insert(
                    PortRef {
                        block: block.id,
                        port: idx,
                    },
                    output.declared,
                );
            }
        }
        for (idx, input) in block.inputs.iter().enumerate() {
            if input.connected.is_none() && !input.declared.is_placeholder() {
                resolved.inputs.insert(
                    PortRef {
                        block: block.id,
                        port: idx,
                    },
                    input.declared,
                );
            }
        }
    }

    // Fixpoint: each round propagates across one hop, so the bound below
    // covers the longest possible based-on-input chain.
    let max_rounds = graph.blocks().map(|b| b.inputs.len() + b.outputs.len()).sum::<usize>() + 1;
    for _ in 0..max_rounds {
        let mut changed = false;

        for block in graph.blocks() {
            // Connected inputs adopt the feeding output's type once known.
            for (idx, input) in block.inputs.iter().enumerate() {
                let key = PortRef {
                    block: block.id,
                    port: idx,
                };
                let Some(src) = input.connected else { continue };
                let Some(candidate) = resolved.outputs.get(&src).copied() else {
                    continue;
                };
                if validated.insert(key) && !input.accepts_candidate(candidate) {
                    let src_block = graph.block(src.block);
                    return Err(GraphError::Type {
                        from_block: src_block.name.clone(),
                        from_port: src_block.outputs[src.port].name.clone(),
                        to_block: block.name.clone(),
                        to_port: input.name.clone(),
                        candidate,
                    });
                }
                if resolved.inputs.insert(key, candidate) != Some(candidate) {
                    changed = true;
                }
            }

            // Linked groups: one resolved member drags the unconnected rest
            // along; no connection on any member falls back to the documented
            // default; two members resolving differently is an error.
            for group in &block.linked_groups {
                let mut group_type: Option<(usize, NodeValueType)> = None;
                for &member in &group.members {
                    let key = PortRef {
                        block: block.id,
                        port: member,
                    };
                    let Some(ty) = resolved.inputs.get(&key).copied() else {
                        continue;
                    };
                    match group_type {
                        None => group_type = Some((member, ty)),
                        Some((first, first_ty)) if first_ty != ty => {
                            return Err(GraphError::LinkedTypeMismatch {
                                block: block.name.clone(),
                                first: block.inputs[first].name.clone(),
                                second: block.inputs[member].name.clone(),
                                first_type: first_ty,
                                second_type: ty,
                            });
                        }
                        Some(_) => {}
                    }
                }

                let fallback = match group_type {
                    Some((_, ty)) => Some(ty),
                    None if group.members.iter().all(|&m| block.inputs[m].connected.is_none()) => {
                        group.default
                    }
                    None => None,
                };
                if let Some(ty) = fallback {
                    for &member in &group.members {
                        if block.inputs[member].connected.is_some() {
                            continue;
                        }
                        let key = PortRef {
                            block: block.id,
                            port: member,
                        };
                        if resolved.inputs.insert(key, ty) != Some(ty) {
                            changed = true;
                        }
                    }
                }
            }

            // Based-on-input outputs mirror their designated source port.
            for (idx, output) in block.outputs.iter().enumerate() {
                if output.declared != NodeValueType::BasedOnInput {
                    continue;
                }
                let Some(source_name) = &output.type_source else {
                    continue;
                };
                let Some(source_idx) = block.input_index(source_name) else {
                    continue;
                };
                let source_key = PortRef {
                    block: block.id,
                    port: source_idx,
                };
                let Some(ty) = resolved.inputs.get(&source_key).copied() else {
                    continue;
                };
                let key = PortRef {
                    block: block.id,
                    port: idx,
                };
                if resolved.outputs.insert(key, ty) != Some(ty) {
                    changed = true;
                }
            }
        }

        if !changed {
            break;
        }
    }

    Ok(resolved)
}
