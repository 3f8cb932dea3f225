//! The operator catalog: a closed set of node kinds, the parameters each one
//! samples at construction, and the rule each one applies to its inputs.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use rand::Rng;

use crate::error::{EngineError, Result};
use crate::field::{Field, Rgb};
use crate::fractal::{DEFAULT_MAX_ITER, Viewport, escape_field};
use crate::math::{average, protected_rem, tent, well};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    ReadX,
    ReadY,
    Constant,
    Mandelbrot,
    Average,
    Product,
    Mod,
    Well,
    Tent,
    Sin,
    Level,
    Mix,
}

impl Kind {
    pub const ALL: [Kind; 12] = [
        Kind::ReadX,
        Kind::ReadY,
        Kind::Constant,
        Kind::Mandelbrot,
        Kind::Average,
        Kind::Product,
        Kind::Mod,
        Kind::Well,
        Kind::Tent,
        Kind::Sin,
        Kind::Level,
        Kind::Mix,
    ];

    pub fn arity(self) -> usize {
        match self {
            Kind::ReadX | Kind::ReadY | Kind::Constant | Kind::Mandelbrot => 0,
            Kind::Well | Kind::Tent | Kind::Sin => 1,
            Kind::Average | Kind::Product | Kind::Mod => 2,
            Kind::Level | Kind::Mix => 3,
        }
    }

    pub fn is_leaf(self) -> bool {
        self.arity() == 0
    }

    /// Stable tag used in persisted trees.
    pub fn name(self) -> &'static str {
        match self {
            Kind::ReadX => "ReadX",
            Kind::ReadY => "ReadY",
            Kind::Constant => "Constant",
            Kind::Mandelbrot => "Mandelbrot",
            Kind::Average => "Average",
            Kind::Product => "Product",
            Kind::Mod => "Mod",
            Kind::Well => "Well",
            Kind::Tent => "Tent",
            Kind::Sin => "Sin",
            Kind::Level => "Level",
            Kind::Mix => "Mix",
        }
    }

    pub fn leaves() -> impl Iterator<Item = Kind> {
        Self::ALL.into_iter().filter(|k| k.is_leaf())
    }

    pub fn internals() -> impl Iterator<Item = Kind> {
        Self::ALL.into_iter().filter(|k| !k.is_leaf())
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Kind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        Kind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| EngineError::UnknownKind(s.to_string()))
    }
}

/// Escape-time leaf state. The computed field is cached per requested
/// shape and belongs to this leaf alone.
#[derive(Debug)]
pub struct FractalLeaf {
    pub viewport: Viewport,
    pub max_iter: u32,
    /// Rescale by the field maximum. Fixed at construction.
    pub normalize: bool,
    cache: Mutex<HashMap<(usize, usize), Arc<Field>>>,
}

impl FractalLeaf {
    pub fn new(viewport: Viewport, max_iter: u32, normalize: bool) -> Self {
        FractalLeaf { viewport, max_iter, normalize, cache: Mutex::new(HashMap::new()) }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R, max_iter: u32) -> Self {
        let viewport = Viewport::random(rng);
        let normalize = rng.gen_bool(0.5);
        FractalLeaf::new(viewport, max_iter, normalize)
    }

    /// The escape field at `rows`×`cols`, computed once per shape.
    pub fn field(&self, rows: usize, cols: usize) -> Arc<Field> {
        let key = (rows, cols);
        if let Some(hit) = self.lock_cache().get(&key) {
            return Arc::clone(hit);
        }

        // computed outside the lock; a racing writer stores an identical field
        let mut field = escape_field(&self.viewport, rows, cols, self.max_iter);
        if self.normalize {
            if let Some(max) = field.max().filter(|m| *m > 0.0) {
                field = field.map(|v| v / max);
            }
        }
        let field = Arc::new(field);
        self.lock_cache().insert(key, Arc::clone(&field));
        field
    }

    pub fn cached_shapes(&self) -> usize {
        self.lock_cache().len()
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<(usize, usize), Arc<Field>>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// a clone starts with an empty cache so fields are never shared between leaves
impl Clone for FractalLeaf {
    fn clone(&self) -> Self {
        FractalLeaf::new(self.viewport, self.max_iter, self.normalize)
    }
}

impl PartialEq for FractalLeaf {
    fn eq(&self, other: &Self) -> bool {
        self.viewport == other.viewport
            && self.max_iter == other.max_iter
            && self.normalize == other.normalize
    }
}

/// Per-kind state drawn once when the node is built.
#[derive(Clone, Debug, PartialEq)]
pub enum Params {
    None,
    Color { r: f64, g: f64, b: f64 },
    Sine { phase: f64, freq: f64 },
    Threshold(f64),
    Fractal(FractalLeaf),
}

impl Params {
    pub fn sample<R: Rng + ?Sized>(kind: Kind, rng: &mut R, max_iter: u32) -> Params {
        match kind {
            Kind::Constant => Params::Color {
                r: rng.gen_range(0.0..1.0),
                g: rng.gen_range(0.0..1.0),
                b: rng.gen_range(0.0..1.0),
            },
            Kind::Sin => Params::Sine {
                phase: rng.gen_range(0.0..PI),
                freq: rng.gen_range(1.0..6.0),
            },
            Kind::Level => Params::Threshold(rng.gen_range(-1.0..1.0)),
            Kind::Mandelbrot => Params::Fractal(FractalLeaf::random(rng, max_iter)),
            _ => Params::None,
        }
    }

    fn fits(&self, kind: Kind) -> bool {
        matches!(
            (kind, self),
            (Kind::Constant, Params::Color { .. })
                | (Kind::Sin, Params::Sine { .. })
                | (Kind::Level, Params::Threshold(_))
                | (Kind::Mandelbrot, Params::Fractal(_))
                | (
                    Kind::ReadX
                        | Kind::ReadY
                        | Kind::Average
                        | Kind::Product
                        | Kind::Mod
                        | Kind::Well
                        | Kind::Tent
                        | Kind::Mix,
                    Params::None
                )
        )
    }
}

/// One element of an expression tree. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    kind: Kind,
    params: Params,
    children: Vec<Node>,
}

impl Node {
    /// Build a node from explicit parts, checking child count and parameter shape.
    pub fn new(kind: Kind, params: Params, children: Vec<Node>) -> Result<Node> {
        if children.len() != kind.arity() {
            return Err(EngineError::ArityMismatch {
                kind: kind.name().to_string(),
                expected: kind.arity(),
                got: children.len(),
            });
        }
        if !params.fits(kind) {
            return Err(EngineError::InvalidParams {
                kind: kind.name().to_string(),
                reason: format!("{:?} does not belong to this kind", params),
            });
        }
        Ok(Node { kind, params, children })
    }

    pub(crate) fn assemble(kind: Kind, params: Params, children: Vec<Node>) -> Node {
        debug_assert_eq!(children.len(), kind.arity());
        Node { kind, params, children }
    }

    /// Build a node drawing fresh parameters for `kind`.
    pub fn sample<R: Rng + ?Sized>(kind: Kind, children: Vec<Node>, rng: &mut R) -> Result<Node> {
        Node::new(kind, Params::sample(kind, rng, DEFAULT_MAX_ITER), children)
    }

    pub fn leaf(kind: Kind, params: Params) -> Result<Node> {
        Node::new(kind, params, Vec::new())
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn arity(&self) -> usize {
        self.kind.arity()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// One-line label naming the kind and its sampled parameters.
    pub fn describe(&self) -> String {
        match (&self.kind, &self.params) {
            (Kind::ReadX, _) => "ReturnX(X,Y)".to_string(),
            (Kind::ReadY, _) => "ReturnY(X,Y)".to_string(),
            (Kind::Constant, Params::Color { r, g, b }) => {
                format!("ConstantColor(r={:.2},g={:.2},b={:.2})", r, g, b)
            }
            (Kind::Mandelbrot, Params::Fractal(leaf)) => format!(
                "Mandelbrot(re={:.4}..{:.4},im={:.4}..{:.4},iter={}{})",
                leaf.viewport.xmin,
                leaf.viewport.xmax,
                leaf.viewport.ymin,
                leaf.viewport.ymax,
                leaf.max_iter,
                if leaf.normalize { ",normalized" } else { "" }
            ),
            (Kind::Average, _) => "Average(E1,E2)".to_string(),
            (Kind::Product, _) => "Product(E1,E2)".to_string(),
            (Kind::Mod, _) => "Modulo(E1,E2)".to_string(),
            (Kind::Well, _) => "WellFunction(E1)".to_string(),
            (Kind::Tent, _) => "TentFunction(E1)".to_string(),
            (Kind::Sin, Params::Sine { phase, freq }) => {
                format!("Sine(E1)(phase={:.2},freq={:.2})", phase, freq)
            }
            (Kind::Level, Params::Threshold(t)) => format!("Level(E1,E2,E3)(threshold={:.2})", t),
            (Kind::Mix, _) => "Mix(W,E1,E2)".to_string(),
            (kind, _) => kind.name().to_string(),
        }
    }

    /// Output of a leaf over coordinate fields `x` and `y`.
    pub(crate) fn apply_leaf(&self, x: &Field, y: &Field) -> Rgb {
        let (rows, cols) = x.shape();
        match &self.params {
            Params::Color { r, g, b } => Rgb {
                r: Field::filled(rows, cols, *r),
                g: Field::filled(rows, cols, *g),
                b: Field::filled(rows, cols, *b),
            },
            Params::Fractal(leaf) => Rgb::splat(leaf.field(rows, cols).as_ref().clone()),
            _ if self.kind == Kind::ReadY => Rgb::splat(y.clone()),
            _ => Rgb::splat(x.clone()),
        }
    }

    /// Combine already-evaluated children. `inputs` holds one entry per child, in order.
    pub(crate) fn apply_internal(&self, inputs: &[Rgb]) -> Result<Rgb> {
        match (self.kind, &self.params, inputs) {
            (Kind::Average, _, [a, b]) | (Kind::Mix, _, [_, a, b]) => {
                a.zip_with(b, |p, q| average(p, q, 0.5))
            }
            (Kind::Product, _, [a, b]) => a.zip_with(b, |p, q| p * q),
            (Kind::Mod, _, [a, b]) => a.zip_with(b, protected_rem),
            (Kind::Well, _, [a]) => Ok(a.map(well)),
            (Kind::Tent, _, [a]) => Ok(a.map(tent)),
            (Kind::Sin, Params::Sine { phase, freq }, [a]) => {
                let (phase, freq) = (*phase, *freq);
                Ok(a.map(move |v| (phase + freq * v).sin()))
            }
            (Kind::Level, Params::Threshold(t), [sel, a, b]) => {
                let t = *t;
                let pick = move |s: f64, p: f64, q: f64| if s < t { p } else { q };
                Ok(Rgb {
                    r: sel.r.zip3_with(&a.r, &b.r, pick)?,
                    g: sel.g.zip3_with(&a.g, &b.g, pick)?,
                    b: sel.b.zip3_with(&a.b, &b.b, pick)?,
                })
            }
            _ => Err(EngineError::ArityMismatch {
                kind: self.kind.name().to_string(),
                expected: self.arity(),
                got: inputs.len(),
            }),
        }
    }
}

/// Nested expression form, e.g. `Product(x, Sin(0.5 + 2 * y))`.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.children;
        match (&self.kind, &self.params) {
            (Kind::ReadX, _) => write!(f, "x"),
            (Kind::ReadY, _) => write!(f, "y"),
            (Kind::Constant, Params::Color { r, g, b }) => write!(f, "Constant({}, {}, {})", r, g, b),
            (Kind::Mandelbrot, Params::Fractal(leaf)) => write!(
                f,
                "Mandelbrot({}, {}, {}, {}, {}, {})",
                leaf.viewport.xmin,
                leaf.viewport.xmax,
                leaf.viewport.ymin,
                leaf.viewport.ymax,
                leaf.max_iter,
                leaf.normalize
            ),
            (Kind::Sin, Params::Sine { phase, freq }) => {
                write!(f, "Sin({} + {} * {})", phase, freq, c[0])
            }
            (Kind::Level, Params::Threshold(t)) => {
                write!(f, "Level({}, {}, {}, {})", t, c[0], c[1], c[2])
            }
            (kind, _) => {
                write!(f, "{}(", kind.name())?;
                for (i, child) in c.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
        }
    }
}
