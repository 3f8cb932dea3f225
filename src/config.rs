use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fractal::DEFAULT_MAX_ITER;
use crate::generate::GeneratorOptions;

pub const CONFIG_FILE: &str = "randomart.toml";

/// Complexity bounds fed to the generator, `min` inclusive, `max` exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Complexity {
    pub min: usize,
    pub max: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Side of the regular render.
    pub resolution: usize,
    /// Side of the print-size render.
    pub large_resolution: usize,
    /// Largest side for which per-node outputs are kept.
    pub thumbnail_size: usize,
    /// First image; kept low so it shows up quickly.
    pub first: Complexity,
    /// Every image after the first.
    pub higher: Complexity,
    /// Range used when nothing more specific applies.
    pub default_range: Complexity,
    pub fractal_leaves: bool,
    pub fractal_iterations: u32,
    pub gallery_limit: usize,
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            resolution: 900,
            large_resolution: 1920,
            thumbnail_size: 200,
            first: Complexity { min: 15, max: 30 },
            higher: Complexity { min: 30, max: 80 },
            default_range: Complexity { min: 20, max: 150 },
            fractal_leaves: false,
            fractal_iterations: DEFAULT_MAX_ITER,
            gallery_limit: crate::gallery::DEFAULT_LIMIT,
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// `randomart.toml` from the working directory if there is one, defaults otherwise.
    pub fn discover() -> Result<Self> {
        let path = Path::new(CONFIG_FILE);
        if path.exists() {
            log::info!("using {}", path.display());
            Self::load(path)
        } else {
            Ok(Config::default())
        }
    }

    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            fractal_leaves: self.fractal_leaves,
            fractal_iterations: self.fractal_iterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn partial_override() {
        let cfg = Config::from_toml(
            r#"
            resolution = 300
            fractal_leaves = true

            [higher]
            min = 50
            max = 60
            "#,
        )
        .unwrap();
        assert_eq!(cfg.resolution, 300);
        assert!(cfg.fractal_leaves);
        assert_eq!(cfg.higher, Complexity { min: 50, max: 60 });
        assert_eq!(cfg.thumbnail_size, 200);
        assert_eq!(cfg.default_range, Complexity { min: 20, max: 150 });
        assert!(cfg.generator_options().fractal_leaves);
    }

    #[test]
    fn bad_types_are_reported() {
        assert!(Config::from_toml("resolution = \"big\"").is_err());
    }
}
