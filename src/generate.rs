use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::{EngineError, Result};
use crate::fractal::DEFAULT_MAX_ITER;
use crate::node::{Kind, Node, Params};

#[derive(Clone, Copy, Debug)]
pub struct GeneratorOptions {
    /// Let the escape-time leaf take part in leaf selection.
    pub fractal_leaves: bool,
    pub fractal_iterations: u32,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        GeneratorOptions { fractal_leaves: false, fractal_iterations: DEFAULT_MAX_ITER }
    }
}

/// Random tree builder over any random source.
pub struct Generator<R: Rng> {
    rng: R,
    leaves: Vec<Kind>,
    internals: Vec<Kind>,
    options: GeneratorOptions,
}

impl<R: Rng> Generator<R> {
    pub fn new(rng: R) -> Self {
        Self::with_options(rng, GeneratorOptions::default())
    }

    pub fn with_options(rng: R, options: GeneratorOptions) -> Self {
        let leaves = Kind::leaves()
            .filter(|k| options.fractal_leaves || *k != Kind::Mandelbrot)
            .collect();
        Generator { rng, leaves, internals: Kind::internals().collect(), options }
    }

    /// Randomly build a tree whose size is steered by the budget `k`.
    ///
    /// A spent budget yields a leaf. Otherwise an internal kind is picked
    /// and `k - 1` is split between its children at random cut points.
    pub fn generate(&mut self, k: usize) -> Node {
        let kind = if k == 0 {
            *self.leaves.choose(&mut self.rng).unwrap_or(&Kind::ReadX)
        } else {
            *self.internals.choose(&mut self.rng).unwrap_or(&Kind::Average)
        };

        let mut children = Vec::with_capacity(kind.arity());
        if kind.arity() > 0 {
            let mut cuts: Vec<usize> = (0..kind.arity() - 1).map(|_| self.rng.gen_range(0..k)).collect();
            cuts.sort_unstable();

            let mut used = 0;
            for cut in cuts {
                children.push(self.generate(cut - used));
                used = cut;
            }
            children.push(self.generate(k - 1 - used));
        }

        let params = Params::sample(kind, &mut self.rng, self.options.fractal_iterations);
        // children were built to match the arity chosen above
        Node::assemble(kind, params, children)
    }

    /// Draw `k` uniformly from `[min, max)` and generate.
    pub fn generate_between(&mut self, min: usize, max: usize) -> Result<Node> {
        if min >= max {
            return Err(EngineError::InvalidRange { min, max });
        }
        let k = self.rng.gen_range(min..max);
        log::debug!("generating tree with complexity {}", k);
        Ok(self.generate(k))
    }

    pub fn rng(&mut self) -> &mut R {
        &mut self.rng
    }
}

/// Generate with the thread-local random source.
pub fn generate(k: usize) -> Node {
    Generator::new(rand::thread_rng()).generate(k)
}

/// A fresh tree with complexity drawn from `[min, max)`.
pub fn get_art(min: usize, max: usize) -> Result<Node> {
    Generator::new(rand::thread_rng()).generate_between(min, max)
}
