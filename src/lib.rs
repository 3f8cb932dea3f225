pub mod error;
pub mod math;
pub mod field;
pub mod fractal;
pub mod node;
pub mod generate;
pub mod eval;
pub mod tree;
pub mod persist;
pub mod gallery;
pub mod image;
pub mod config;

pub use error::{EngineError, Result};
pub use math::C;
pub use field::{Field, Rgb, coordinate_grid};
pub use fractal::{Viewport, escape_count, escape_field, main_cardioid_boundary};
pub use node::{FractalLeaf, Kind, Node, Params};
pub use generate::{Generator, GeneratorOptions, generate, get_art};
pub use eval::{Recorder, Thumbnails, evaluate, evaluate_recorded, render, render_thumbnails};
pub use tree::{ascii_tree, walk_preorder};
pub use persist::NodeRecord;
pub use gallery::Gallery;
pub use self::image::{save_image, thumbnail_sheet, to_rgb_image};
pub use config::Config;
