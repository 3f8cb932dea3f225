use rayon::prelude::*;

use crate::error::{EngineError, Result};
use crate::math::linspace;

// below this many samples the rayon split costs more than it saves
const PAR_MIN_LEN: usize = 4096;

/// A 2D grid of samples, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

impl Field {
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Field { rows, cols, data: vec![value; rows * cols] }
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 0.0)
    }

    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(EngineError::ShapeMismatch {
                left: (rows, cols),
                right: (data.len(), 1),
            });
        }
        Ok(Field { rows, cols, data })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Largest non-NaN sample, or None for an empty field.
    pub fn max(&self) -> Option<f64> {
        self.data
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
    }

    pub fn map<F>(&self, f: F) -> Field
    where
        F: Fn(f64) -> f64 + Sync + Send,
    {
        let data = self.data.par_iter().with_min_len(PAR_MIN_LEN).map(|&v| f(v)).collect();
        Field { rows: self.rows, cols: self.cols, data }
    }

    pub fn zip_with<F>(&self, other: &Field, f: F) -> Result<Field>
    where
        F: Fn(f64, f64) -> f64 + Sync + Send,
    {
        self.check_shape(other)?;
        let data = self
            .data
            .par_iter()
            .zip(other.data.par_iter())
            .with_min_len(PAR_MIN_LEN)
            .map(|(&a, &b)| f(a, b))
            .collect();
        Ok(Field { rows: self.rows, cols: self.cols, data })
    }

    pub fn zip3_with<F>(&self, a: &Field, b: &Field, f: F) -> Result<Field>
    where
        F: Fn(f64, f64, f64) -> f64 + Sync + Send,
    {
        self.check_shape(a)?;
        self.check_shape(b)?;
        let data = self
            .data
            .par_iter()
            .zip(a.data.par_iter())
            .zip(b.data.par_iter())
            .with_min_len(PAR_MIN_LEN)
            .map(|((&s, &p), &q)| f(s, p, q))
            .collect();
        Ok(Field { rows: self.rows, cols: self.cols, data })
    }

    pub fn check_shape(&self, other: &Field) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(EngineError::ShapeMismatch { left: self.shape(), right: other.shape() });
        }
        Ok(())
    }
}

/// Three equally shaped fields, one per color channel.
#[derive(Clone, Debug, PartialEq)]
pub struct Rgb {
    pub r: Field,
    pub g: Field,
    pub b: Field,
}

impl Rgb {
    pub fn splat(field: Field) -> Self {
        Rgb { r: field.clone(), g: field.clone(), b: field }
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::splat(Field::zeros(rows, cols))
    }

    pub fn shape(&self) -> (usize, usize) {
        self.r.shape()
    }

    pub fn channels(&self) -> [&Field; 3] {
        [&self.r, &self.g, &self.b]
    }

    pub fn map<F>(&self, f: F) -> Rgb
    where
        F: Fn(f64) -> f64 + Sync + Send,
    {
        Rgb { r: self.r.map(&f), g: self.g.map(&f), b: self.b.map(&f) }
    }

    /// Channel-wise combination: red with red, green with green, blue with blue.
    pub fn zip_with<F>(&self, other: &Rgb, f: F) -> Result<Rgb>
    where
        F: Fn(f64, f64) -> f64 + Sync + Send,
    {
        Ok(Rgb {
            r: self.r.zip_with(&other.r, &f)?,
            g: self.g.zip_with(&other.g, &f)?,
            b: self.b.zip_with(&other.b, &f)?,
        })
    }
}

/// The unit-square coordinate fields for a `resolution`×`resolution` image.
///
/// X varies along columns and Y along rows, both from 0 to 1 inclusive.
pub fn coordinate_grid(resolution: usize) -> (Field, Field) {
    let axis = linspace(0.0, 1.0, resolution);
    let n = resolution;
    let mut x = Vec::with_capacity(n * n);
    let mut y = Vec::with_capacity(n * n);
    for &row_v in &axis {
        x.extend_from_slice(&axis);
        y.extend(std::iter::repeat(row_v).take(n));
    }
    (
        Field { rows: n, cols: n, data: x },
        Field { rows: n, cols: n, data: y },
    )
}
