// Turns evaluated channel fields into 8-bit pictures.
// Scaling happens here, not in the evaluator: each sample becomes value * 256
// cast to a byte, so out-of-range values saturate and NaN becomes black.

use std::path::Path;

use image::{Rgb as Pixel, RgbImage, imageops};

use crate::error::Result;
use crate::eval::{Thumbnails, render};
use crate::field::{Field, Rgb};
use crate::node::Node;

pub fn to_byte(value: f64) -> u8 {
    (value * 256.0) as u8
}

pub fn to_rgb_image(rgb: &Rgb) -> RgbImage {
    let (rows, cols) = rgb.shape();
    RgbImage::from_fn(cols as u32, rows as u32, |x, y| {
        let (row, col) = (y as usize, x as usize);
        Pixel([to_byte(rgb.r.get(row, col)), to_byte(rgb.g.get(row, col)), to_byte(rgb.b.get(row, col))])
    })
}

/// Single-channel view, handy for looking at one field on its own.
pub fn field_to_gray(field: &Field) -> RgbImage {
    RgbImage::from_fn(field.cols as u32, field.rows as u32, |x, y| {
        let v = to_byte(field.get(y as usize, x as usize));
        Pixel([v, v, v])
    })
}

/// Render `node` at `resolution` and write it out; format follows the extension.
pub fn save_image<P: AsRef<Path>>(node: &Node, resolution: usize, path: P) -> Result<()> {
    let rgb = render(node, resolution)?;
    to_rgb_image(&rgb).save(path)?;
    Ok(())
}

/// Recorded node outputs side by side in pre-order, each scaled to `tile` pixels.
pub fn thumbnail_sheet(thumbs: &Thumbnails, tile: u32) -> RgbImage {
    let count = thumbs.images.len() as u32;
    let mut sheet = RgbImage::new(tile * count.max(1), tile);
    for (slot, (_label, rgb)) in thumbs.images.values().enumerate() {
        let img = to_rgb_image(rgb);
        let scaled = imageops::resize(&img, tile, tile, imageops::FilterType::Nearest);
        imageops::replace(&mut sheet, &scaled, (slot as u32 * tile) as i64, 0);
    }
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::render_thumbnails;
    use crate::node::{Kind, Params};

    #[test]
    fn byte_scaling_saturates() {
        assert_eq!(to_byte(0.0), 0);
        assert_eq!(to_byte(0.5), 128);
        assert_eq!(to_byte(0.999), 255);
        assert_eq!(to_byte(1.5), 255);
        assert_eq!(to_byte(-0.3), 0);
        assert_eq!(to_byte(f64::NAN), 0);
    }

    #[test]
    fn image_axes_follow_fields() {
        let x = Node::leaf(Kind::ReadX, Params::None).unwrap();
        let rgb = render(&x, 3).unwrap();
        let img = to_rgb_image(&rgb);
        assert_eq!(img.dimensions(), (3, 3));
        assert_eq!(img.get_pixel(0, 2)[0], 0);
        assert_eq!(img.get_pixel(1, 0)[0], 128);
        assert_eq!(img.get_pixel(2, 0)[0], 255);
    }

    #[test]
    fn sheet_has_one_tile_per_node() {
        let x = Node::leaf(Kind::ReadX, Params::None).unwrap();
        let tree = Node::new(Kind::Tent, Params::None, vec![x]).unwrap();
        let (_, thumbs) = render_thumbnails(&tree, 8, 200).unwrap();
        let sheet = thumbnail_sheet(&thumbs, 16);
        assert_eq!(sheet.dimensions(), (32, 16));
    }

    #[test]
    fn saves_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("art.png");
        let y = Node::leaf(Kind::ReadY, Params::None).unwrap();
        save_image(&y, 10, &path).unwrap();
        let back = ::image::open(&path).unwrap().to_rgb8();
        assert_eq!(back.dimensions(), (10, 10));
    }
}
