//! Post-order evaluation of expression trees over coordinate fields.
//!
//! The core walk is pure. Recording per-node outputs (for thumbnails or
//! tree plots) is layered on top through [`Recorder`] and never changes the
//! values returned.

use std::collections::BTreeMap;

use crate::error::{EngineError, Result};
use crate::field::{Field, Rgb, coordinate_grid};
use crate::node::{Kind, Node};
use crate::tree::size;

/// Side channel receiving each node's output as the walk completes it.
pub trait Recorder {
    /// `index` is the node's position in a pre-order walk from the root.
    fn record(&mut self, index: usize, node: &Node, output: &Rgb);
}

struct Discard;

impl Recorder for Discard {
    fn record(&mut self, _index: usize, _node: &Node, _output: &Rgb) {}
}

/// Keeps node outputs small enough to be thumbnails.
#[derive(Debug, Default)]
pub struct Thumbnails {
    pub max_side: usize,
    pub images: BTreeMap<usize, (String, Rgb)>,
}

impl Thumbnails {
    pub fn new(max_side: usize) -> Self {
        Thumbnails { max_side, images: BTreeMap::new() }
    }

    pub fn get(&self, index: usize) -> Option<&Rgb> {
        self.images.get(&index).map(|(_, rgb)| rgb)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl Recorder for Thumbnails {
    fn record(&mut self, index: usize, node: &Node, output: &Rgb) {
        let (rows, cols) = output.shape();
        // full-size renders would cost too much memory
        if rows <= self.max_side && cols <= self.max_side {
            self.images.insert(index, (node.describe(), output.clone()));
        }
    }
}

/// Evaluate `node` over the coordinate fields `x` and `y`.
pub fn evaluate(node: &Node, x: &Field, y: &Field) -> Result<Rgb> {
    evaluate_recorded(node, x, y, &mut Discard)
}

/// Same as [`evaluate`], handing every node's output to `recorder`.
pub fn evaluate_recorded<Rec: Recorder + ?Sized>(
    node: &Node,
    x: &Field,
    y: &Field,
    recorder: &mut Rec,
) -> Result<Rgb> {
    x.check_shape(y)?;
    let mut next_index = 0;
    walk(node, x, y, &mut next_index, recorder)
}

/// Evaluate over the unit square at `resolution`×`resolution`.
pub fn render(node: &Node, resolution: usize) -> Result<Rgb> {
    let (x, y) = coordinate_grid(resolution);
    log::debug!("evaluating expressions at {}x{}", resolution, resolution);
    let out = evaluate(node, &x, &y);
    log::debug!("evaluation done");
    out
}

/// Render while keeping thumbnails of every node no larger than `max_side`.
pub fn render_thumbnails(node: &Node, resolution: usize, max_side: usize) -> Result<(Rgb, Thumbnails)> {
    let (x, y) = coordinate_grid(resolution);
    let mut thumbs = Thumbnails::new(max_side);
    let out = evaluate_recorded(node, &x, &y, &mut thumbs)?;
    Ok((out, thumbs))
}

fn walk<Rec: Recorder + ?Sized>(
    node: &Node,
    x: &Field,
    y: &Field,
    next_index: &mut usize,
    recorder: &mut Rec,
) -> Result<Rgb> {
    let index = *next_index;
    *next_index += 1;

    let out = if node.kind().is_leaf() {
        node.apply_leaf(x, y)
    } else if node.kind() == Kind::Mod {
        let result = combine(node, x, y, next_index, recorder);
        if result.is_err() {
            // skip whatever part of the subtree never got an index
            *next_index = index + size(node);
        }
        zero_on_failure(result, x.shape())
    } else {
        combine(node, x, y, next_index, recorder)?
    };

    recorder.record(index, node, &out);
    Ok(out)
}

fn zero_on_failure(result: Result<Rgb>, (rows, cols): (usize, usize)) -> Rgb {
    result.unwrap_or_else(|err| {
        log::warn!("modulo degraded to zero: {}", err);
        Rgb::zeros(rows, cols)
    })
}

fn combine<Rec: Recorder + ?Sized>(
    node: &Node,
    x: &Field,
    y: &Field,
    next_index: &mut usize,
    recorder: &mut Rec,
) -> Result<Rgb> {
    let inputs = node
        .children()
        .iter()
        .map(|child| walk(child, x, y, next_index, recorder))
        .collect::<Result<Vec<Rgb>>>()?;
    let out = node.apply_internal(&inputs)?;
    if out.shape() != x.shape() {
        return Err(EngineError::ShapeMismatch { left: out.shape(), right: x.shape() });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fractal::Viewport;
    use crate::node::{FractalLeaf, Params};

    fn leaf(kind: Kind) -> Node {
        Node::leaf(kind, Params::None).unwrap()
    }

    fn constant(v: f64) -> Node {
        Node::leaf(Kind::Constant, Params::Color { r: v, g: v, b: v }).unwrap()
    }

    fn grid(n: usize) -> (Field, Field) {
        coordinate_grid(n)
    }

    #[test]
    fn read_x_copies_x_into_every_channel() {
        let (x, y) = grid(4);
        let out = evaluate(&leaf(Kind::ReadX), &x, &y).unwrap();
        assert_eq!(out.shape(), (4, 4));
        for ch in out.channels() {
            assert_eq!(ch, &x);
        }
    }

    #[test]
    fn constant_broadcasts() {
        let node = Node::leaf(Kind::Constant, Params::Color { r: 0.1, g: 0.2, b: 0.3 }).unwrap();
        let (x, y) = grid(3);
        let out = evaluate(&node, &x, &y).unwrap();
        assert_eq!(out.r, Field::filled(3, 3, 0.1));
        assert_eq!(out.g, Field::filled(3, 3, 0.2));
        assert_eq!(out.b, Field::filled(3, 3, 0.3));
    }

    #[test]
    fn well_of_zero_is_minus_one() {
        let node = Node::new(Kind::Well, Params::None, vec![constant(0.0)]).unwrap();
        let (x, y) = grid(4);
        let out = evaluate(&node, &x, &y).unwrap();
        for ch in out.channels() {
            assert!(ch.data.iter().all(|&v| v == -1.0));
        }
    }

    #[test]
    fn mod_zero_divisor_gives_zero() {
        // divisor is x, which is 0 in the first column
        let node = Node::new(Kind::Mod, Params::None, vec![constant(0.7), leaf(Kind::ReadX)]).unwrap();
        let (x, y) = grid(5);
        let out = evaluate(&node, &x, &y).unwrap();
        for ch in out.channels() {
            for row in 0..5 {
                assert_eq!(ch.get(row, 0), 0.0);
            }
            // 0.7 mod 0.5 = 0.2
            assert!((ch.get(0, 2) - 0.2).abs() < 1e-12);
        }
    }

    #[test]
    fn mod_degrades_on_shape_failure() {
        let node = Node::new(Kind::Mod, Params::None, vec![leaf(Kind::ReadX), leaf(Kind::ReadY)]).unwrap();
        let failed = node.apply_internal(&[Rgb::zeros(2, 2), Rgb::zeros(3, 3)]);
        assert!(failed.is_err());
        assert_eq!(zero_on_failure(failed, (2, 2)), Rgb::zeros(2, 2));
    }

    #[test]
    fn mod_over_fractal_leaf_keeps_shape() {
        let fractal = FractalLeaf::new(Viewport::new(-2.0, 1.0, -1.5, 1.5), 5, false);
        let node = Node::new(
            Kind::Mod,
            Params::None,
            vec![leaf(Kind::ReadX), Node::leaf(Kind::Mandelbrot, Params::Fractal(fractal)).unwrap()],
        )
        .unwrap();
        let (x, y) = grid(3);
        let out = evaluate(&node, &x, &y).unwrap();
        assert_eq!(out.shape(), (3, 3));
    }

    #[test]
    fn level_selects_per_channel() {
        let selector = Node::leaf(Kind::Constant, Params::Color { r: -0.5, g: 0.5, b: -0.5 }).unwrap();
        let node = Node::new(
            Kind::Level,
            Params::Threshold(0.0),
            vec![selector, constant(0.1), constant(0.9)],
        )
        .unwrap();
        let (x, y) = grid(2);
        let out = evaluate(&node, &x, &y).unwrap();
        assert_eq!(out.r, Field::filled(2, 2, 0.1));
        assert_eq!(out.g, Field::filled(2, 2, 0.9));
        assert_eq!(out.b, Field::filled(2, 2, 0.1));
    }

    #[test]
    fn mix_ignores_weight_child() {
        let with_x = Node::new(Kind::Mix, Params::None, vec![leaf(Kind::ReadX), constant(0.2), constant(0.6)]).unwrap();
        let with_y = Node::new(Kind::Mix, Params::None, vec![leaf(Kind::ReadY), constant(0.2), constant(0.6)]).unwrap();
        let (x, y) = grid(3);
        let a = evaluate(&with_x, &x, &y).unwrap();
        let b = evaluate(&with_y, &x, &y).unwrap();
        assert_eq!(a, b);
        assert!((a.r.get(1, 1) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn product_and_average() {
        let (x, y) = grid(3);
        let prod = Node::new(Kind::Product, Params::None, vec![leaf(Kind::ReadX), leaf(Kind::ReadY)]).unwrap();
        let avg = Node::new(Kind::Average, Params::None, vec![leaf(Kind::ReadX), leaf(Kind::ReadY)]).unwrap();
        let p = evaluate(&prod, &x, &y).unwrap();
        let a = evaluate(&avg, &x, &y).unwrap();
        assert_eq!(p.g.get(2, 1), 0.5);
        assert_eq!(a.b.get(2, 0), 0.5);
    }

    #[test]
    fn sin_and_tent_apply_per_channel() {
        let (x, y) = grid(2);
        let sin = Node::new(Kind::Sin, Params::Sine { phase: 0.0, freq: 2.0 }, vec![leaf(Kind::ReadX)]).unwrap();
        let out = evaluate(&sin, &x, &y).unwrap();
        assert!((out.r.get(0, 1) - 2.0f64.sin()).abs() < 1e-12);
        let tent = Node::new(Kind::Tent, Params::None, vec![leaf(Kind::ReadY)]).unwrap();
        let out = evaluate(&tent, &x, &y).unwrap();
        assert_eq!(out.b.get(1, 0), -1.0);
    }

    #[test]
    fn mismatched_coordinates_are_an_error() {
        let x = Field::zeros(2, 2);
        let y = Field::zeros(2, 3);
        assert!(matches!(evaluate(&leaf(Kind::ReadX), &x, &y), Err(EngineError::ShapeMismatch { .. })));
    }

    #[test]
    fn recording_does_not_change_output() {
        let tree = Node::new(
            Kind::Level,
            Params::Threshold(0.3),
            vec![leaf(Kind::ReadX), constant(0.1), Node::new(Kind::Well, Params::None, vec![leaf(Kind::ReadY)]).unwrap()],
        )
        .unwrap();
        let (x, y) = grid(6);
        let plain = evaluate(&tree, &x, &y).unwrap();
        let mut thumbs = Thumbnails::new(200);
        let recorded = evaluate_recorded(&tree, &x, &y, &mut thumbs).unwrap();
        assert_eq!(plain, recorded);
        assert_eq!(thumbs.len(), 5);
        assert_eq!(thumbs.get(0), Some(&plain));
        assert_eq!(thumbs.images[&3].0, "WellFunction(E1)");
    }

    #[test]
    fn thumbnails_skip_large_outputs() {
        let (_, thumbs) = render_thumbnails(&leaf(Kind::ReadX), 8, 4).unwrap();
        assert!(thumbs.is_empty());
    }
}
