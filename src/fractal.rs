use std::f64::consts::PI;

use rand::Rng;
use rayon::prelude::*;

use crate::field::Field;
use crate::math::{C, linspace};

pub const DEFAULT_MAX_ITER: u32 = 265;
pub const DEFAULT_WINDOW: f64 = 0.005;

/// A rectangle of the complex plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl Viewport {
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Self {
        Viewport { xmin, xmax, ymin, ymax }
    }

    /// Square window of side `delta` with its corner at `corner`.
    pub fn anchored(corner: C, delta: f64) -> Self {
        Viewport::new(corner.re, corner.re + delta, corner.im, corner.im + delta)
    }

    /// Small window sitting on the main cardioid, where the detail is.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let t = rng.gen_range(0.0..2.0 * PI);
        Viewport::anchored(main_cardioid_boundary(t), DEFAULT_WINDOW)
    }
}

/// Point on the boundary of the main cardioid: e^(it)/2 - e^(2it)/4.
pub fn main_cardioid_boundary(t: f64) -> C {
    let a = C::cis(t).scale(0.5);
    let b = C::cis(2.0 * t).scale(-0.25);
    a.add(b)
}

/// Number of `z ← z² + c` steps (z starting at c) before |z|² > 4.
///
/// Points that never escape within `max_iter` report 0, same as points that
/// are outside from the start.
pub fn escape_count(c: C, max_iter: u32) -> u32 {
    let mut re = c.re;
    let mut im = c.im;
    for n in 0..max_iter {
        let re2 = re * re;
        let im2 = im * im;
        if re2 + im2 > 4.0 {
            return n;
        }
        im = 2.0 * re * im + c.im;
        re = re2 - im2 + c.re;
    }
    0
}

/// Escape counts over a `rows`×`cols` grid covering `viewport`.
///
/// Row index walks the real axis, column index the imaginary axis. Rows are
/// computed in parallel.
pub fn escape_field(viewport: &Viewport, rows: usize, cols: usize, max_iter: u32) -> Field {
    let real_axis = linspace(viewport.xmin, viewport.xmax, rows);
    let imag_axis = linspace(viewport.ymin, viewport.ymax, cols);

    log::debug!("starting escape-time field {}x{} (cap {})", rows, cols, max_iter);
    let mut data = vec![0.0; rows * cols];
    if cols > 0 {
        data.par_chunks_mut(cols).zip(real_axis.par_iter()).for_each(|(row, &re)| {
            for (cell, &im) in row.iter_mut().zip(imag_axis.iter()) {
                *cell = escape_count(C::new(re, im), max_iter) as f64;
            }
        });
    }
    log::debug!("finished escape-time field");

    Field { rows, cols, data }
}
