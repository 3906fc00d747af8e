use exif::{In, Reader, Tag};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use log::debug;
use std::io::Cursor;

use crate::storage::StorageArea;
use crate::upload::UploadResult;

/// The two derived copies produced for every upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rendition {
    Large, // fit inside 1200x1200
    Thumb, // cover 260x260
}

impl Rendition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rendition::Large => "large",
            Rendition::Thumb => "thumb",
        }
    }

    pub fn to_pixels(self) -> u32 {
        match self {
            Rendition::Large => 1200,
            Rendition::Thumb => 260,
        }
    }

    pub fn quality(self) -> u8 {
        match self {
            Rendition::Large => 82,
            Rendition::Thumb => 72,
        }
    }

    pub fn area(self) -> StorageArea {
        match self {
            Rendition::Large => StorageArea::Large,
            Rendition::Thumb => StorageArea::Thumbs,
        }
    }

    /// `<stamp>-large.jpg` / `<stamp>-thumb.jpg`
    pub fn filename(self, stamp: i64) -> String {
        format!("{}-{}.jpg", stamp, self.as_str())
    }

    /// Resizes an already oriented source for this rendition.
    pub fn resize(self, source: &DynamicImage) -> DynamicImage {
        let side = self.to_pixels();
        match self {
            Rendition::Large => fit_inside(source, side),
            Rendition::Thumb => cover_square(source, side),
        }
    }

    /// Resizes and encodes as JPEG at this rendition's quality.
    pub fn render(self, source: &DynamicImage) -> UploadResult<Vec<u8>> {
        let resized = self.resize(source);
        debug!(
            "Rendering {} rendition at {}x{}",
            self.as_str(),
            resized.width(),
            resized.height()
        );
        encode_jpeg(&resized, self.quality())
    }
}

/// Pixel dimensions read from the image header, before orientation is applied.
pub fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// EXIF orientation tag (1-8), if the container carries one.
pub fn read_orientation(bytes: &[u8]) -> Option<u32> {
    let exif = Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    exif.get_field(Tag::Orientation, In::PRIMARY)?
        .value
        .get_uint(0)
}

/// Decodes the upload and rotates/flips it upright.
pub fn decode_oriented(bytes: &[u8]) -> UploadResult<DynamicImage> {
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;
    Ok(apply_orientation(img, read_orientation(bytes)))
}

pub fn apply_orientation(img: DynamicImage, orientation: Option<u32>) -> DynamicImage {
    match orientation {
        Some(2) => img.fliph(),
        Some(3) => img.rotate180(),
        Some(4) => img.flipv(),
        Some(5) => img.fliph().rotate270(), // Transpose: flip horizontal, then rotate 90 CCW (270 CW)
        Some(6) => img.rotate90(),
        Some(7) => img.fliph().rotate90(), // Transverse: flip horizontal, then rotate 90 CW
        Some(8) => img.rotate270(),
        _ => img, // 1 or None = no transformation needed
    }
}

/// Shrinks to fit within `max_side` on both axes; images already small enough are left alone.
fn fit_inside(img: &DynamicImage, max_side: u32) -> DynamicImage {
    if img.width() <= max_side && img.height() <= max_side {
        return img.clone();
    }
    img.resize(max_side, max_side, FilterType::Lanczos3)
}

/// Center-crops to a square before scaling, so the intermediate never exceeds the source.
fn cover_square(img: &DynamicImage, side: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    let crop = width.min(height);
    img.crop_imm((width - crop) / 2, (height - crop) / 2, crop, crop)
        .resize_exact(side, side, FilterType::Lanczos3)
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> UploadResult<Vec<u8>> {
    // JPEG has no alpha channel
    let rgb = img.to_rgb8();
    let mut buffer = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        encoder.encode_image(&rgb)?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb, Rgba};

    fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(width, height, |x, _y| Rgb([(x % 256) as u8, 80, 160]));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buffer, format)
            .unwrap();
        buffer.into_inner()
    }

    fn decoded_dimensions(jpeg: &[u8]) -> (u32, u32) {
        let img = image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn test_probe_dimensions() {
        assert_eq!(
            probe_dimensions(&encoded(2000, 1000, ImageFormat::Jpeg)),
            Some((2000, 1000))
        );
        assert_eq!(
            probe_dimensions(&encoded(30, 40, ImageFormat::Png)),
            Some((30, 40))
        );
        assert_eq!(probe_dimensions(b"definitely not an image"), None);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_oriented(b"definitely not an image").is_err());
    }

    #[test]
    fn test_large_fits_inside_preserving_aspect() {
        let source = decode_oriented(&encoded(2000, 1000, ImageFormat::Jpeg)).unwrap();
        let jpeg = Rendition::Large.render(&source).unwrap();
        assert_eq!(decoded_dimensions(&jpeg), (1200, 600));

        let portrait = decode_oriented(&encoded(900, 3000, ImageFormat::Png)).unwrap();
        let jpeg = Rendition::Large.render(&portrait).unwrap();
        assert_eq!(decoded_dimensions(&jpeg), (360, 1200));
    }

    #[test]
    fn test_large_never_upscales() {
        let source = decode_oriented(&encoded(640, 480, ImageFormat::Png)).unwrap();
        let jpeg = Rendition::Large.render(&source).unwrap();
        assert_eq!(decoded_dimensions(&jpeg), (640, 480));
    }

    #[test]
    fn test_thumb_is_exact_square() {
        for (w, h) in [(2000, 1000), (100, 700), (50, 50)] {
            let source = decode_oriented(&encoded(w, h, ImageFormat::Png)).unwrap();
            let jpeg = Rendition::Thumb.render(&source).unwrap();
            assert_eq!(decoded_dimensions(&jpeg), (260, 260), "source {}x{}", w, h);
        }
    }

    #[test]
    fn test_thumb_of_extreme_aspect_ratio() {
        let strip = decode_oriented(&encoded(1, 12000, ImageFormat::Png)).unwrap();
        let jpeg = Rendition::Thumb.render(&strip).unwrap();
        assert_eq!(decoded_dimensions(&jpeg), (260, 260));

        let banner = decode_oriented(&encoded(12000, 3, ImageFormat::Png)).unwrap();
        let jpeg = Rendition::Thumb.render(&banner).unwrap();
        assert_eq!(decoded_dimensions(&jpeg), (260, 260));
    }

    #[test]
    fn test_thumb_crops_from_center() {
        // Left and right thirds red, middle third blue
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_fn(300, 100, |x, _y| {
            if (100..200).contains(&x) {
                Rgb([0, 0, 255])
            } else {
                Rgb([255, 0, 0])
            }
        });
        let thumb = Rendition::Thumb.resize(&DynamicImage::ImageRgb8(img)).to_rgb8();
        assert_eq!(thumb.dimensions(), (260, 260));
        for (x, y) in [(0, 0), (130, 130), (259, 259)] {
            let Rgb([r, _, b]) = *thumb.get_pixel(x, y);
            assert!(b > 200 && r < 50, "pixel {},{} is {:?}", x, y, (r, b));
        }
    }

    #[test]
    fn test_render_flattens_alpha() {
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_fn(20, 10, |_x, _y| Rgba([10, 20, 30, 128]));
        let jpeg = Rendition::Thumb
            .render(&DynamicImage::ImageRgba8(img))
            .unwrap();
        assert_eq!(decoded_dimensions(&jpeg), (260, 260));
    }

    #[test]
    fn test_apply_orientation_values() {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(4, 2, Rgb([0, 0, 0])));

        for orientation in [None, Some(1), Some(2), Some(3), Some(4)] {
            let out = apply_orientation(img.clone(), orientation);
            assert_eq!((out.width(), out.height()), (4, 2));
        }
        for orientation in [Some(5), Some(6), Some(7), Some(8)] {
            let out = apply_orientation(img.clone(), orientation);
            assert_eq!((out.width(), out.height()), (2, 4));
        }
    }

    /// Minimal little-endian TIFF block holding a single Orientation entry.
    fn orientation_exif(orientation: u8) -> Vec<u8> {
        vec![
            0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00, // header, IFD0 at offset 8
            0x01, 0x00, // one entry
            0x12, 0x01, 0x03, 0x00, 0x01, 0x00, 0x00, 0x00, // Orientation, SHORT, count 1
            orientation, 0x00, 0x00, 0x00, // value
            0x00, 0x00, 0x00, 0x00, // no next IFD
        ]
    }

    fn jpeg_with_orientation(width: u32, height: u32, orientation: u8) -> Vec<u8> {
        use image::{ExtendedColorType, ImageEncoder};

        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(width, height, |x, _y| Rgb([(x % 256) as u8, 80, 160]));
        let mut buffer = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, 90);
        encoder
            .set_exif_metadata(orientation_exif(orientation))
            .unwrap();
        encoder
            .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
            .unwrap();
        buffer
    }

    #[test]
    fn test_rotated_upload_is_rendered_upright() {
        let bytes = jpeg_with_orientation(40, 20, 6);

        assert_eq!(read_orientation(&bytes), Some(6));
        // Header dimensions stay as stored
        assert_eq!(probe_dimensions(&bytes), Some((40, 20)));

        let source = decode_oriented(&bytes).unwrap();
        assert_eq!((source.width(), source.height()), (20, 40));
        let jpeg = Rendition::Large.render(&source).unwrap();
        assert_eq!(decoded_dimensions(&jpeg), (20, 40));
    }

    #[test]
    fn test_read_orientation_missing_exif() {
        assert_eq!(read_orientation(&encoded(8, 8, ImageFormat::Png)), None);
    }

    #[test]
    fn test_rendition_naming() {
        assert_eq!(Rendition::Large.filename(42), "42-large.jpg");
        assert_eq!(Rendition::Thumb.filename(42), "42-thumb.jpg");
        assert_eq!(Rendition::Large.area(), StorageArea::Large);
        assert_eq!(Rendition::Thumb.area(), StorageArea::Thumbs);
        assert_eq!(Rendition::Large.quality(), 82);
        assert_eq!(Rendition::Thumb.quality(), 72);
    }
}
