//! Kind-tagged records for saving trees and bringing them back exactly.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::fractal::Viewport;
use crate::node::{FractalLeaf, Kind, Node, Params};

/// One node as stored: its kind tag, its sampled parameters, its children.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct NodeRecord {
    pub kind: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeRecord>,
}

impl Node {
    pub fn to_record(&self) -> NodeRecord {
        let mut params = BTreeMap::new();
        match self.params() {
            Params::None => {}
            Params::Color { r, g, b } => {
                params.insert("r".to_string(), *r);
                params.insert("g".to_string(), *g);
                params.insert("b".to_string(), *b);
            }
            Params::Sine { phase, freq } => {
                params.insert("phase".to_string(), *phase);
                params.insert("freq".to_string(), *freq);
            }
            Params::Threshold(t) => {
                params.insert("threshold".to_string(), *t);
            }
            Params::Fractal(leaf) => {
                params.insert("xmin".to_string(), leaf.viewport.xmin);
                params.insert("xmax".to_string(), leaf.viewport.xmax);
                params.insert("ymin".to_string(), leaf.viewport.ymin);
                params.insert("ymax".to_string(), leaf.viewport.ymax);
                params.insert("max_iter".to_string(), leaf.max_iter as f64);
                params.insert("normalize".to_string(), if leaf.normalize { 1.0 } else { 0.0 });
            }
        }
        NodeRecord {
            kind: self.kind().name().to_string(),
            params,
            children: self.children().iter().map(Node::to_record).collect(),
        }
    }

    /// Rebuild a tree, keeping every stored parameter as is.
    pub fn from_record(record: &NodeRecord) -> Result<Node> {
        let kind: Kind = record.kind.parse()?;
        let children = record
            .children
            .iter()
            .map(Node::from_record)
            .collect::<Result<Vec<_>>>()?;

        let get = |name: &str| -> Result<f64> {
            record.params.get(name).copied().ok_or_else(|| EngineError::InvalidParams {
                kind: record.kind.clone(),
                reason: format!("missing parameter `{}`", name),
            })
        };

        let params = match kind {
            Kind::Constant => Params::Color { r: get("r")?, g: get("g")?, b: get("b")? },
            Kind::Sin => Params::Sine { phase: get("phase")?, freq: get("freq")? },
            Kind::Level => Params::Threshold(get("threshold")?),
            Kind::Mandelbrot => {
                let max_iter = get("max_iter")?;
                if !(0.0..=u32::MAX as f64).contains(&max_iter) || max_iter.fract() != 0.0 {
                    return Err(EngineError::InvalidParams {
                        kind: record.kind.clone(),
                        reason: format!("max_iter {} is not a valid iteration cap", max_iter),
                    });
                }
                let viewport = Viewport::new(get("xmin")?, get("xmax")?, get("ymin")?, get("ymax")?);
                Params::Fractal(FractalLeaf::new(viewport, max_iter as u32, get("normalize")? != 0.0))
            }
            _ => Params::None,
        };

        Node::new(kind, params, children)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_record())?)
    }

    pub fn from_json(text: &str) -> Result<Node> {
        let record: NodeRecord = serde_json::from_str(text)?;
        Node::from_record(&record)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Node> {
        let text = fs::read_to_string(path)?;
        Node::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::Generator;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn json_restores_parameters_verbatim() {
        let tree = Generator::new(StdRng::seed_from_u64(11)).generate(40);
        let back = Node::from_json(&tree.to_json().unwrap()).unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn fractal_leaf_round_trips() {
        let leaf = FractalLeaf::new(Viewport::new(0.1, 0.105, -0.6, -0.595), 265, true);
        let node = Node::leaf(Kind::Mandelbrot, Params::Fractal(leaf)).unwrap();
        let back = Node::from_json(&node.to_json().unwrap()).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let text = r#"{"kind": "Spiral"}"#;
        assert!(matches!(Node::from_json(text), Err(EngineError::UnknownKind(k)) if k == "Spiral"));
    }

    #[test]
    fn wrong_child_count_is_rejected() {
        let text = r#"{"kind": "Product", "children": [{"kind": "ReadX"}]}"#;
        assert!(matches!(Node::from_json(text), Err(EngineError::ArityMismatch { .. })));
    }

    #[test]
    fn missing_parameter_is_rejected() {
        let text = r#"{"kind": "Sin", "params": {"phase": 1.0}, "children": [{"kind": "ReadY"}]}"#;
        assert!(matches!(Node::from_json(text), Err(EngineError::InvalidParams { .. })));
    }

    #[test]
    fn bincode_round_trip() {
        let tree = Generator::new(StdRng::seed_from_u64(12)).generate(25);
        let cfg = bincode::config::standard();
        let bytes = bincode::encode_to_vec(tree.to_record(), cfg).unwrap();
        let (record, _len): (NodeRecord, usize) = bincode::decode_from_slice(&bytes, cfg).unwrap();
        assert_eq!(Node::from_record(&record).unwrap(), tree);
    }
}
