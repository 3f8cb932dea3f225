#[derive(Clone, Copy, Debug, PartialEq)]
pub struct C {
    pub re: f64,
    pub im: f64,
}

impl C {
    pub fn new(re: f64, im: f64) -> Self {
        C { re, im }
    }

    pub fn abs_sq(&self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    pub fn add(&self, other: C) -> C {
        C::new(self.re + other.re, self.im + other.im)
    }

    pub fn mul(&self, other: C) -> C {
        C::new(
            self.re * other.re - self.im * other.im,
            self.re * other.im + self.im * other.re
        )
    }

    pub fn square(&self) -> C {
        self.mul(*self)
    }

    /// e^(i·t)
    pub fn cis(t: f64) -> C {
        let (s, c) = t.sin_cos();
        C::new(c, s)
    }

    pub fn scale(&self, k: f64) -> C {
        C::new(self.re * k, self.im * k)
    }
}

/// Weighted blend of two samples. With w = 0.5 this is the plain average.
pub fn average(a: f64, b: f64, w: f64) -> f64 {
    w * a + (1.0 - w) * b
}

/// Looks a bit like a well: -1 at zero, rising to 1 for large |v|.
pub fn well(v: f64) -> f64 {
    // (1 + v²)^8 overflows to inf for |v| > ~1e19, which lands on 1.0
    1.0 - 2.0 / (1.0 + v * v).powi(8)
}

/// Looks a bit like a tent: peaks at 1 for zero.
pub fn tent(v: f64) -> f64 {
    1.0 - 2.0 * v.abs()
}

/// Floored remainder (sign follows the divisor) for positive divisors, 0 otherwise.
pub fn protected_rem(a: f64, b: f64) -> f64 {
    if b > 0.0 {
        a.rem_euclid(b)
    } else {
        0.0
    }
}

/// `n` evenly spaced samples over `[start, stop]`, endpoints included.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}
