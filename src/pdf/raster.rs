//! Embedding scanned invoices (JPEG/PNG) as PDF image XObjects

use std::path::Path;

use image::DynamicImage;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};

/// An image stored in a document, ready to be drawn with `Do`
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedImage {
    pub id: ObjectId,
    pub width: u32,
    pub height: u32,
}

/// Frame header of a JPEG file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegFrame {
    pub width: u32,
    pub height: u32,
    pub components: u8,
}

impl JpegFrame {
    /// PDF color space for the frame, if readers can take the data as is
    fn color_space(&self) -> Option<&'static [u8]> {
        match self.components {
            1 => Some(b"DeviceGray"),
            3 => Some(b"DeviceRGB"),
            // CMYK data is often stored inverted, decode it instead
            _ => None,
        }
    }
}

/// Add the image at `path` to `doc`
///
/// 8-bit gray and color JPEGs are stored unchanged with `DCTDecode`.
/// Everything else is decoded and stored as 8-bit DeviceRGB, with a
/// DeviceGray soft mask for images with an alpha channel.
pub fn embed_image(doc: &mut Document, path: &Path) -> Result<EmbeddedImage> {
    let source_error = |reason: String| Error::Source {
        path: path.to_path_buf(),
        reason,
    };

    let data = std::fs::read(path).map_err(|e| source_error(e.to_string()))?;

    if let Some(frame) = jpeg_frame(&data) {
        if let Some(color_space) = frame.color_space() {
            return Ok(add_jpeg(doc, data, &frame, color_space));
        }
    }

    // Trust the content over the extension, scanners are sloppy about it
    let img = image::load_from_memory(&data).map_err(|e| source_error(e.to_string()))?;
    Ok(add_image(doc, &img))
}

/// Store JPEG data without re-encoding it
fn add_jpeg(doc: &mut Document, data: Vec<u8>, frame: &JpegFrame, color_space: &[u8]) -> EmbeddedImage {
    let mut dict = image_dictionary(frame.width, frame.height, color_space);
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));

    let mut stream = Stream::new(dict, data);
    stream.allows_compression = false;
    let id = doc.add_object(stream);

    EmbeddedImage {
        id,
        width: frame.width,
        height: frame.height,
    }
}

/// Read the frame header of baseline, extended or progressive 8-bit JPEG data
///
/// Returns `None` for anything else, including other JPEG codings.
pub fn jpeg_frame(data: &[u8]) -> Option<JpegFrame> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        match marker {
            // Fill byte
            0xFF => {
                pos += 1;
                continue;
            }
            // Markers without a length
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            // End of image or start of scan before any frame header
            0xD9 | 0xDA => return None,
            _ => {}
        }

        let length = usize::from(u16::from_be_bytes([*data.get(pos + 2)?, *data.get(pos + 3)?]));

        if (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC) {
            if !matches!(marker, 0xC0..=0xC2) {
                return None;
            }
            // precision, height, width, component count
            let header = data.get(pos + 4..pos + 10)?;
            if header[0] != 8 {
                return None;
            }
            return Some(JpegFrame {
                height: u32::from(u16::from_be_bytes([header[1], header[2]])),
                width: u32::from(u16::from_be_bytes([header[3], header[4]])),
                components: header[5],
            });
        }

        pos += 2 + length;
    }

    None
}

/// Add already decoded pixels to `doc`
pub fn add_image(doc: &mut Document, img: &DynamicImage) -> EmbeddedImage {
    let (width, height) = (img.width(), img.height());

    let soft_mask = if img.color().has_alpha() {
        let alpha: Vec<u8> = img.to_rgba8().pixels().map(|p| p[3]).collect();
        Some(doc.add_object(Stream::new(
            image_dictionary(width, height, b"DeviceGray"),
            alpha,
        )))
    } else {
        None
    };

    let mut dict = image_dictionary(width, height, b"DeviceRGB");
    if let Some(mask_id) = soft_mask {
        dict.set("SMask", Object::Reference(mask_id));
    }

    let id = doc.add_object(Stream::new(dict, img.to_rgb8().into_raw()));

    EmbeddedImage { id, width, height }
}

fn image_dictionary(width: u32, height: u32, color_space: &[u8]) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(i64::from(width)));
    dict.set("Height", Object::Integer(i64::from(height)));
    dict.set("ColorSpace", Object::Name(color_space.to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
    use tempfile::TempDir;

    #[test]
    fn test_add_opaque_image() {
        let mut doc = Document::with_version("1.5");
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 2, Rgb([10, 20, 30])));

        let embedded = add_image(&mut doc, &img);
        assert_eq!((embedded.width, embedded.height), (4, 2));

        let stream = doc.get_object(embedded.id).unwrap().as_stream().unwrap();
        assert_eq!(stream.content.len(), 4 * 2 * 3);
        assert_eq!(stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceRGB");
        assert!(stream.dict.get(b"SMask").is_err());
    }

    #[test]
    fn test_add_transparent_image_gets_soft_mask() {
        let mut doc = Document::with_version("1.5");
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 128])));

        let embedded = add_image(&mut doc, &img);
        let stream = doc.get_object(embedded.id).unwrap().as_stream().unwrap();
        let mask_id = stream.dict.get(b"SMask").unwrap().as_reference().unwrap();

        let mask = doc.get_object(mask_id).unwrap().as_stream().unwrap();
        assert_eq!(mask.content, vec![128; 9]);
        assert_eq!(mask.dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceGray");
    }

    #[test]
    fn test_embed_color_jpeg_keeps_original_data() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("scan.jpg");
        RgbImage::from_pixel(40, 24, Rgb([90, 120, 200])).save(&path).unwrap();
        let original = std::fs::read(&path).unwrap();

        let mut doc = Document::with_version("1.5");
        let embedded = embed_image(&mut doc, &path).unwrap();
        assert_eq!((embedded.width, embedded.height), (40, 24));

        let stream = doc.get_object(embedded.id).unwrap().as_stream().unwrap();
        assert_eq!(stream.content, original);
        assert!(!stream.allows_compression);
        assert_eq!(stream.dict.get(b"Filter").unwrap().as_name().unwrap(), b"DCTDecode");
        assert_eq!(stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceRGB");
    }

    #[test]
    fn test_embed_gray_jpeg_uses_device_gray() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fax.jpeg");
        GrayImage::from_pixel(16, 16, Luma([128])).save(&path).unwrap();

        let mut doc = Document::with_version("1.5");
        let embedded = embed_image(&mut doc, &path).unwrap();

        let stream = doc.get_object(embedded.id).unwrap().as_stream().unwrap();
        assert_eq!(stream.dict.get(b"Filter").unwrap().as_name().unwrap(), b"DCTDecode");
        assert_eq!(stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceGray");
    }

    #[test]
    fn test_embed_png_is_decoded() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("photo.png");
        RgbImage::from_pixel(5, 7, Rgb([1, 2, 3])).save(&path).unwrap();

        let mut doc = Document::with_version("1.5");
        let embedded = embed_image(&mut doc, &path).unwrap();

        let stream = doc.get_object(embedded.id).unwrap().as_stream().unwrap();
        assert!(stream.dict.get(b"Filter").is_err());
        assert_eq!(stream.content.len(), 5 * 7 * 3);
    }

    #[test]
    fn test_jpeg_frame_of_other_data() {
        assert_eq!(jpeg_frame(b"\x89PNG\r\n\x1a\n"), None);
        assert_eq!(jpeg_frame(&[0xFF, 0xD8]), None);
        assert_eq!(jpeg_frame(&[0xFF, 0xD8, 0xFF, 0xD9]), None);
    }

    #[test]
    fn test_jpeg_frame_skips_segments_before_header() {
        let mut data = vec![0xFF, 0xD8];
        // APP0 with a 4 byte payload, then a fill byte
        data.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x06, b'J', b'F', b'I', b'F', 0xFF]);
        // SOF0: length 17, precision 8, height 300, width 200, 3 components
        data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08, 0x01, 0x2C, 0x00, 0xC8, 0x03]);

        assert_eq!(
            jpeg_frame(&data),
            Some(JpegFrame {
                width: 200,
                height: 300,
                components: 3,
            })
        );
    }

    #[test]
    fn test_embed_unreadable_image() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();

        let mut doc = Document::with_version("1.5");
        let result = embed_image(&mut doc, &path);
        assert!(matches!(result, Err(Error::Source { .. })));
    }
}
