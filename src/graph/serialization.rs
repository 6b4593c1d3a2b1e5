//! JSON persistence for graphs.
//!
//! The wire format is a flat block list plus an ordered connection list.
//! Connection order is preserved because it drives deterministic compilation;
//! a graph loaded from JSON compiles to the same sources as the one that was
//! saved.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::blocks::{
    input_blocks, logic_blocks, math_blocks, output_blocks, texture_blocks, vector_blocks,
    BlockKind, ConditionalOp, InputSource, MathOp,
};
use super::types::NodeValueType;
use super::{BlockId, Graph};

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphJson {
    blocks: Vec<BlockJson>,
    connections: Vec<ConnectionJson>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockJson {
    class_name: String,
    id: u32,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    options: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionJson {
    output_block_id: u32,
    output_port_name: String,
    input_block_id: u32,
    input_port_name: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputOptions {
    #[serde(rename = "type")]
    value_type: NodeValueType,
    #[serde(flatten)]
    source: InputSource,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConditionalOptions {
    operator: ConditionalOp,
}

impl Graph {
    /// Serialize to the JSON wire format.
    pub fn to_json(&self) -> Result<String> {
        let blocks = self
            .blocks()
            .map(|block| {
                let options = match &block.kind {
                    BlockKind::Input(source) => Some(serde_json::to_value(InputOptions {
                        value_type: block.outputs[0].declared,
                        source: source.clone(),
                    })?),
                    BlockKind::Conditional(op) => {
                        Some(serde_json::to_value(ConditionalOptions { operator: *op })?)
                    }
                    _ => None,
                };
                Ok(BlockJson {
                    class_name: block.kind.class_name().to_string(),
                    id: block.id.0,
                    name: block.name.clone(),
                    options,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let connections = self
            .connections()
            .iter()
            .map(|c| ConnectionJson {
                output_block_id: c.from.block.0,
                output_port_name: self.block(c.from.block).outputs[c.from.port].name.clone(),
                input_block_id: c.to.block.0,
                input_port_name: self.block(c.to.block).inputs[c.to.port].name.clone(),
            })
            .collect();

        serde_json::to_string_pretty(&GraphJson {
            blocks,
            connections,
        })
        .context("serializing graph")
    }

    /// Rebuild a graph from the JSON wire format. Connections are replayed in
    /// saved order through the same legality checks as live editing.
    pub fn from_json(json: &str) -> Result<Graph> {
        let parsed: GraphJson = serde_json::from_str(json).context("parsing graph JSON")?;

        let mut graph = Graph::new();
        let mut remap: std::collections::HashMap<u32, BlockId> = std::collections::HashMap::new();
        for block in parsed.blocks {
            let built = build_block(&block)
                .with_context(|| format!("rebuilding block '{}'", block.name))?;
            let id = graph
                .add(built)
                .with_context(|| format!("inserting block '{}'", block.name))?;
            if remap.insert(block.id, id).is_some() {
                bail!("duplicate block id {} in graph JSON", block.id);
            }
        }

        for c in parsed.connections {
            let from = *remap
                .get(&c.output_block_id)
                .with_context(|| format!("connection references unknown block {}", c.output_block_id))?;
            let to = *remap
                .get(&c.input_block_id)
                .with_context(|| format!("connection references unknown block {}", c.input_block_id))?;
            graph
                .connect(from, &c.output_port_name, to, &c.input_port_name)
                .with_context(|| {
                    format!(
                        "reconnecting {}.{} -> {}.{}",
                        c.output_block_id, c.output_port_name, c.input_block_id, c.input_port_name
                    )
                })?;
        }

        Ok(graph)
    }
}

fn build_block(json: &BlockJson) -> Result<super::Block> {
    let name = json.name.as_str();
    let block = match json.class_name.as_str() {
        "InputBlock" => {
            let options: InputOptions = serde_json::from_value(
                json.options.clone().context("InputBlock without options")?,
            )
            .context("parsing InputBlock options")?;
            match options.source {
                InputSource::Attribute { .. } => {
                    input_blocks::attribute(name, options.value_type)
                }
                InputSource::Uniform { system: Some(sv) } => {
                    input_blocks::system_uniform(name, sv)
                }
                InputSource::Uniform { system: None } => {
                    input_blocks::uniform(name, options.value_type)
                }
                InputSource::Constant { value } => input_blocks::constant(name, value),
            }
        }
        "AddBlock" => math_blocks::math(name, MathOp::Add),
        "SubtractBlock" => math_blocks::math(name, MathOp::Subtract),
        "MultiplyBlock" => math_blocks::math(name, MathOp::Multiply),
        "DivideBlock" => math_blocks::math(name, MathOp::Divide),
        "ScaleBlock" => math_blocks::math(name, MathOp::Scale),
        "LerpBlock" => math_blocks::math(name, MathOp::Lerp),
        "DotBlock" => vector_blocks::dot(name),
        "CrossBlock" => vector_blocks::cross(name),
        "NormalizeBlock" => vector_blocks::normalize(name),
        "TransformBlock" => vector_blocks::transform(name),
        "ConditionalBlock" => {
            let options: ConditionalOptions = serde_json::from_value(
                json.options
                    .clone()
                    .context("ConditionalBlock without options")?,
            )
            .context("parsing ConditionalBlock options")?;
            logic_blocks::conditional(name, options.operator)
        }
        "TextureBlock" => texture_blocks::texture(name),
        "VertexOutputBlock" => output_blocks::vertex_output(name),
        "FragmentOutputBlock" => output_blocks::fragment_output(name),
        other => bail!("unknown block class '{other}'"),
    };
    Ok(block)
}
