//! Block graph model: typed nodes with named ports, connection rules and
//! type propagation.
//!
//! A material is authored as a directed graph of [`Block`]s. Inputs accept at
//! most one connection; outputs fan out freely. Connection legality is checked
//! when the wire is made where both endpoint types are already concrete, and
//! re-checked during the type-resolution pass for placeholder endpoints.

pub mod blocks;
pub mod resolve;
pub mod serialization;
pub mod types;

use crate::error::GraphError;
use blocks::BlockKind;
use types::{BlockTarget, NodeValueType};

/// Stable handle for a block inside one [`Graph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub(crate) u32);

impl BlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Addresses one port (input or output, depending on context) on one block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub block: BlockId,
    pub port: usize,
}

/// An input connection point. Holds at most one incoming wire.
#[derive(Clone, Debug)]
pub struct InputPort {
    pub name: String,
    pub declared: NodeValueType,
    /// Types accepted in addition to the declared one.
    pub accepted: Vec<NodeValueType>,
    /// Types rejected even when the declared kind would otherwise take them.
    pub excluded: Vec<NodeValueType>,
    pub optional: bool,
    /// Restricts which stage may pull this input during the build walk.
    pub target_restriction: Option<BlockTarget>,
    pub connected: Option<PortRef>,
}

impl InputPort {
    pub fn new(name: impl Into<String>, declared: NodeValueType) -> Self {
        Self {
            name: name.into(),
            declared,
            accepted: Vec::new(),
            excluded: Vec::new(),
            optional: false,
            target_restriction: None,
            connected: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn accepts(mut self, extra: &[NodeValueType]) -> Self {
        self.accepted.extend_from_slice(extra);
        self
    }

    pub fn excludes(mut self, rejected: &[NodeValueType]) -> Self {
        self.excluded.extend_from_slice(rejected);
        self
    }

    pub fn restrict_to(mut self, target: BlockTarget) -> Self {
        self.target_restriction = Some(target);
        self
    }

    /// Connection-time and resolution-time legality check for a candidate
    /// feeding type. Exclusion wins over everything, including `AutoDetect`.
    pub fn accepts_candidate(&self, candidate: NodeValueType) -> bool {
        if self.excluded.contains(&candidate) {
            return false;
        }
        match self.declared {
            NodeValueType::AutoDetect | NodeValueType::BasedOnInput => true,
            declared => candidate == declared || self.accepted.contains(&candidate),
        }
    }
}

/// An output connection point. May feed any number of inputs.
#[derive(Clone, Debug)]
pub struct OutputPort {
    pub name: String,
    pub declared: NodeValueType,
    /// For `BasedOnInput` outputs: name of the input port this one mirrors.
    pub type_source: Option<String>,
    pub fanout: Vec<PortRef>,
}

impl OutputPort {
    pub fn new(name: impl Into<String>, declared: NodeValueType) -> Self {
        Self {
            name: name.into(),
            declared,
            type_source: None,
            fanout: Vec::new(),
        }
    }

    /// Declare a `BasedOnInput` output mirroring the named input port.
    pub fn based_on(name: impl Into<String>, source_input: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared: NodeValueType::BasedOnInput,
            type_source: Some(source_input.into()),
            fanout: Vec::new(),
        }
    }
}

/// A set of ports that must share one resolved type.
#[derive(Clone, Debug)]
pub struct LinkedGroup {
    /// Input port indices participating in the group.
    pub members: Vec<usize>,
    /// Fallback type applied when no member is connected.
    pub default: Option<NodeValueType>,
}

/// A named graph node; the unit of code emission.
#[derive(Clone, Debug)]
pub struct Block {
    pub id: BlockId,
    pub name: String,
    pub kind: BlockKind,
    pub target: BlockTarget,
    /// Only one block of this class may exist per graph.
    pub unique: bool,
    pub inputs: Vec<InputPort>,
    pub outputs: Vec<OutputPort>,
    pub linked_groups: Vec<LinkedGroup>,
}

impl Block {
    pub(crate) fn new(kind: BlockKind, name: impl Into<String>, target: BlockTarget) -> Self {
        Self {
            id: BlockId(u32::MAX),
            name: name.into(),
            kind,
            target,
            unique: false,
            inputs: Vec::new(),
            outputs: Vec::new(),
            linked_groups: Vec::new(),
        }
    }

    pub(crate) fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Ports are registered at construction time; their order is significant
    /// and must not change afterwards.
    pub(crate) fn with_input(mut self, port: InputPort) -> Self {
        self.inputs.push(port);
        self
    }

    pub(crate) fn with_output(mut self, port: OutputPort) -> Self {
        self.outputs.push(port);
        self
    }

    /// Link already-registered input ports so they resolve to one shared type.
    pub(crate) fn with_linked_inputs(
        mut self,
        names: &[&str],
        default: Option<NodeValueType>,
    ) -> Self {
        let members = names
            .iter()
            .filter_map(|n| self.inputs.iter().position(|p| p.name == *n))
            .collect();
        self.linked_groups.push(LinkedGroup { members, default });
        self
    }

    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|p| p.name == name)
    }

    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|p| p.name == name)
    }
}

/// A recorded wire, in connection order. The order drives deterministic type
/// resolution and serialization.
#[derive(Clone, Copy, Debug)]
pub struct Connection {
    pub from: PortRef,
    pub to: PortRef,
}

/// A directed block graph describing one material.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    blocks: Vec<Block>,
    connections: Vec<Connection>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a block, assigning its id. Unique-per-graph blocks (the stage
    /// output roots) are rejected when a block of the same class is present.
    pub fn add(&mut self, mut block: Block) -> Result<BlockId, GraphError> {
        if block.unique {
            let class = block.kind.class_name();
            if self.blocks.iter().any(|b| b.kind.class_name() == class) {
                return Err(GraphError::DuplicateUniqueBlock { class });
            }
        }
        let id = BlockId(self.blocks.len() as u32);
        block.id = id;
        self.blocks.push(block);
        Ok(id)
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Wire an output into an input.
    ///
    /// Legality is checked immediately when the feeding type is concrete;
    /// placeholder outputs are re-checked once resolved. A rejected connection
    /// leaves both ports untouched.
    pub fn connect(
        &mut self,
        from: BlockId,
        from_port: &str,
        to: BlockId,
        to_port: &str,
    ) -> Result<(), GraphError> {
        let from_idx = self.output_index_or_err(from, from_port)?;
        let to_idx = self.input_index_or_err(to, to_port)?;

        let input = &self.blocks[to.index()].inputs[to_idx];
        if input.connected.is_some() {
            return Err(GraphError::AlreadyConnected {
                block: self.blocks[to.index()].name.clone(),
                port: to_port.to_string(),
            });
        }

        let candidate = self.blocks[from.index()].outputs[from_idx].declared;
        if !candidate.is_placeholder() && !input.accepts_candidate(candidate) {
            return Err(GraphError::Type {
                from_block: self.blocks[from.index()].name.clone(),
                from_port: from_port.to_string(),
                to_block: self.blocks[to.index()].name.clone(),
                to_port: to_port.to_string(),
                candidate,
            });
        }

        self.blocks[to.index()].inputs[to_idx].connected = Some(PortRef {
            block: from,
            port: from_idx,
        });
        self.blocks[from.index()].outputs[from_idx].fanout.push(PortRef {
            block: to,
            port: to_idx,
        });
        self.connections.push(Connection {
            from: PortRef {
                block: from,
                port: from_idx,
            },
            to: PortRef {
                block: to,
                port: to_idx,
            },
        });
        Ok(())
    }

    /// The single designated vertex root, if present.
    pub fn vertex_root(&self) -> Option<BlockId> {
        self.blocks
            .iter()
            .find(|b| matches!(b.kind, BlockKind::VertexOutput))
            .map(|b| b.id)
    }

    /// All fragment-color-producing roots, in insertion order.
    pub fn fragment_roots(&self) -> Vec<BlockId> {
        self.blocks
            .iter()
            .filter(|b| matches!(b.kind, BlockKind::FragmentOutput))
            .map(|b| b.id)
            .collect()
    }

    /// Drops blocks that participate in no connection, to avoid later stages
    /// tripping over editor leftovers. Ids are reassigned densely.
    pub fn treeshake_unlinked_blocks(&self) -> Graph {
        let mut keep = vec![false; self.blocks.len()];
        for c in &self.connections {
            keep[c.from.block.index()] = true;
            keep[c.to.block.index()] = true;
        }

        let mut remap = vec![None; self.blocks.len()];
        let mut blocks = Vec::new();
        for (idx, block) in self.blocks.iter().enumerate() {
            if keep[idx] {
                remap[idx] = Some(BlockId(blocks.len() as u32));
                blocks.push(block.clone());
            }
        }

        let remap_ref = |r: PortRef| PortRef {
            block: remap[r.block.index()].expect("kept block referenced a dropped block"),
            port: r.port,
        };

        for (new_id, block) in blocks.iter_mut().enumerate() {
            block.id = BlockId(new_id as u32);
            for input in &mut block.inputs {
                input.connected = input.connected.map(remap_ref);
            }
            for output in &mut block.outputs {
                for consumer in &mut output.fanout {
                    *consumer = remap_ref(*consumer);
                }
            }
        }

        let connections = self
            .connections
            .iter()
            .map(|c| Connection {
                from: remap_ref(c.from),
                to: remap_ref(c.to),
            })
            .collect();

        Graph {
            blocks,
            connections,
        }
    }

    fn output_index_or_err(&self, id: BlockId, name: &str) -> Result<usize, GraphError> {
        self.block(id)
            .output_index(name)
            .ok_or_else(|| GraphError::UnknownPort {
                block: self.block(id).name.clone(),
                port: name.to_string(),
            })
    }

    fn input_index_or_err(&self, id: BlockId, name: &str) -> Result<usize, GraphError> {
        self.block(id)
            .input_index(name)
            .ok_or_else(|| GraphError::UnknownPort {
                block: self.block(id).name.clone(),
                port: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::blocks::{input_blocks, math_blocks, output_blocks, MathOp};
    use super::types::NodeValueType;
    use super::*;
    use crate::error::GraphError;

    #[test]
    fn connect_rejects_excluded_matrix_and_leaves_port_untouched() {
        let mut g = Graph::new();
        let world = g
            .add(input_blocks::system_uniform(
                "world",
                input_blocks::SystemValue::World,
            ))
            .unwrap();
        let add = g.add(math_blocks::math("sum", MathOp::Add)).unwrap();

        let err = g.connect(world, "output", add, "left").unwrap_err();
        assert!(matches!(err, GraphError::Type { candidate, .. }
            if candidate == NodeValueType::Matrix));

        // Rejection must not mutate the port.
        let left = g.block(add).input_index("left").unwrap();
        assert!(g.block(add).inputs[left].connected.is_none());
        assert!(g.connections().is_empty());
    }

    #[test]
    fn inputs_are_single_assignment() {
        let mut g = Graph::new();
        let a = g
            .add(input_blocks::constant(
                "a",
                input_blocks::ConstantValue::Float(1.0),
            ))
            .unwrap();
        let b = g
            .add(input_blocks::constant(
                "b",
                input_blocks::ConstantValue::Float(2.0),
            ))
            .unwrap();
        let add = g.add(math_blocks::math("sum", MathOp::Add)).unwrap();

        g.connect(a, "output", add, "left").unwrap();
        let err = g.connect(b, "output", add, "left").unwrap_err();
        assert!(matches!(err, GraphError::AlreadyConnected { .. }));
    }

    #[test]
    fn unique_blocks_cannot_repeat() {
        let mut g = Graph::new();
        g.add(output_blocks::vertex_output("vertexOutput")).unwrap();
        let err = g
            .add(output_blocks::vertex_output("vertexOutput2"))
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateUniqueBlock { .. }));
    }

    #[test]
    fn treeshake_drops_unwired_blocks() {
        let mut g = Graph::new();
        let a = g
            .add(input_blocks::constant(
                "a",
                input_blocks::ConstantValue::Float(1.0),
            ))
            .unwrap();
        let _orphan = g
            .add(input_blocks::constant(
                "orphan",
                input_blocks::ConstantValue::Float(0.0),
            ))
            .unwrap();
        let scale = g.add(math_blocks::math("scaled", MathOp::Scale)).unwrap();
        g.connect(a, "output", scale, "input").unwrap();

        let shaken = g.treeshake_unlinked_blocks();
        assert_eq!(shaken.block_count(), 2);
        assert!(shaken.blocks().all(|b| b.name != "orphan"));
        assert_eq!(shaken.connections().len(), 1);
    }
}
