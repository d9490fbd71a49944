use std::io::Cursor;

use image::DynamicImage;

/// EXIF orientation handling (rotation and flipping)
pub struct ImageOrientation;

impl ImageOrientation {
    /// Read the EXIF orientation tag from encoded image data.
    ///
    /// Returns the tag value (1–8), or 1 (normal) when the data carries no
    /// EXIF block, the tag is absent, or the value is out of range.
    pub fn read_exif_orientation(data: &[u8]) -> u32 {
        let exif = match exif::Reader::new().read_from_container(&mut Cursor::new(data)) {
            Ok(exif) => exif,
            Err(_) => return 1,
        };

        exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .filter(|value| (1..=8).contains(value))
            .unwrap_or(1)
    }

    /// Whether the displayed image has width and height swapped relative to
    /// the stored pixel buffer (orientations 5 to 8 all involve a quarter turn).
    pub fn swaps_axes(orientation: u32) -> bool {
        (5..=8).contains(&orientation)
    }

    /// Operations turning stored pixels into displayed pixels, applied as
    /// rotation (clockwise) first, then flips.
    /// Returns (rotate_angle, flip_horizontal, flip_vertical)
    pub fn orientation_transforms(orientation: u32) -> (Option<u16>, bool, bool) {
        match orientation {
            1 => (None, false, false),      // Normal
            2 => (None, true, false),       // Mirror horizontal
            3 => (Some(180), false, false), // Rotate 180
            4 => (None, false, true),       // Mirror vertical
            5 => (Some(90), true, false),   // Transpose
            6 => (Some(90), false, false),  // Rotate 90 CW
            7 => (Some(270), true, false),  // Transverse
            8 => (Some(270), false, false), // Rotate 270 CW
            _ => (None, false, false),
        }
    }

    /// Bake `orientation` into the pixels so the result displays upright
    /// without any EXIF tag.
    pub fn apply(mut img: DynamicImage, orientation: u32) -> DynamicImage {
        let (rotate, flip_h, flip_v) = Self::orientation_transforms(orientation);

        tracing::debug!(
            orientation = orientation,
            rotate = ?rotate,
            flip_horizontal = flip_h,
            flip_vertical = flip_v,
            "Applying EXIF orientation"
        );

        if let Some(angle) = rotate {
            img = Self::rotate_by_angle(img, angle);
        }
        if flip_h {
            img = img.fliph();
        }
        if flip_v {
            img = img.flipv();
        }

        img
    }

    /// Rotate image by 90, 180 or 270 degrees clockwise. Other angles are a no-op.
    pub fn rotate_by_angle(img: DynamicImage, angle: u16) -> DynamicImage {
        match angle {
            90 => img.rotate90(),
            180 => img.rotate180(),
            270 => img.rotate270(),
            _ => img,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageFormat, Rgb, RgbImage};

    /// 2x1 image: red on the left, blue on the right.
    fn two_pixel_image() -> DynamicImage {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 0, 255]));
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_read_exif_orientation_without_exif() {
        let mut buffer = Vec::new();
        RgbImage::from_pixel(8, 8, Rgb([10, 20, 30]))
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        assert_eq!(ImageOrientation::read_exif_orientation(&buffer), 1);
        assert_eq!(ImageOrientation::read_exif_orientation(b""), 1);
    }

    #[test]
    fn test_swaps_axes() {
        for orientation in 1..=4 {
            assert!(!ImageOrientation::swaps_axes(orientation));
        }
        for orientation in 5..=8 {
            assert!(ImageOrientation::swaps_axes(orientation));
        }
        assert!(!ImageOrientation::swaps_axes(0));
        assert!(!ImageOrientation::swaps_axes(9));
    }

    #[test]
    fn test_apply_swaps_dimensions_for_quarter_turns() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(4, 2));
        for orientation in 1..=8 {
            let oriented = ImageOrientation::apply(img.clone(), orientation);
            if ImageOrientation::swaps_axes(orientation) {
                assert_eq!(oriented.dimensions(), (2, 4), "orientation {}", orientation);
            } else {
                assert_eq!(oriented.dimensions(), (4, 2), "orientation {}", orientation);
            }
        }
    }

    #[test]
    fn test_orientation_6_puts_left_pixel_on_top() {
        let oriented = ImageOrientation::apply(two_pixel_image(), 6);
        assert_eq!(oriented.dimensions(), (1, 2));
        assert_eq!(oriented.to_rgb8().get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(oriented.to_rgb8().get_pixel(0, 1), &Rgb([0, 0, 255]));
    }

    #[test]
    fn test_orientation_8_puts_left_pixel_at_bottom() {
        let oriented = ImageOrientation::apply(two_pixel_image(), 8);
        assert_eq!(oriented.to_rgb8().get_pixel(0, 0), &Rgb([0, 0, 255]));
        assert_eq!(oriented.to_rgb8().get_pixel(0, 1), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_orientation_2_mirrors() {
        let oriented = ImageOrientation::apply(two_pixel_image(), 2);
        assert_eq!(oriented.to_rgb8().get_pixel(0, 0), &Rgb([0, 0, 255]));
    }

    #[test]
    fn test_rotate_by_invalid_angle_is_noop() {
        let img = two_pixel_image();
        let rotated = ImageOrientation::rotate_by_angle(img.clone(), 45);
        assert_eq!(rotated.dimensions(), img.dimensions());
    }
}
