use std::io::Cursor;

use super::*;

fn png_bytes(width: u32, height: u32, rgba: Vec<u8>) -> Vec<u8> {
    let img = image::RgbaImage::from_raw(width, height, rgba).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_png_normalizes_straight_alpha() {
    let bytes = png_bytes(1, 1, vec![255, 0, 51, 128]);
    let img = decode_texels(&bytes, SourceFormat::Raster).unwrap();
    assert_eq!((img.width, img.height), (1, 1));
    let px = img.texels[0];
    assert!((px[0] - 1.0).abs() < 1e-6);
    assert!(px[1].abs() < 1e-6);
    assert!((px[2] - 0.2).abs() < 1e-6);
    assert!((px[3] - 128.0 / 255.0).abs() < 1e-6);
}

#[test]
fn decode_garbage_fails() {
    assert!(decode_texels(b"not an image", SourceFormat::Raster).is_err());
    assert!(decode_texels(b"not an exr", SourceFormat::OpenExr).is_err());
}

#[test]
fn decode_exr_keeps_float_range() {
    let img = image::Rgba32FImage::from_raw(2, 1, vec![0.25, 0.75, 0.0, 1.0, 2.0, 0.5, 0.0, 1.0])
        .unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba32F(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::OpenExr)
        .unwrap();

    let decoded = decode_texels(&buf, SourceFormat::OpenExr).unwrap();
    assert_eq!((decoded.width, decoded.height), (2, 1));
    assert!((decoded.texels[0][0] - 0.25).abs() < 1e-3);
    assert!((decoded.texels[1][0] - 2.0).abs() < 1e-3);
}

#[test]
fn crop_extracts_sub_rectangle() {
    let image = DecodedImage {
        width: 3,
        height: 2,
        texels: (0..6).map(|i| [i as f32, 0.0, 0.0, 1.0]).collect(),
    };
    let rect = CropRect {
        x: 1.0,
        y: 0.0,
        width: 2.0,
        height: 2.0,
    };
    let out = crop_decoded(&image, &rect).unwrap();
    assert_eq!((out.width, out.height), (2, 2));
    let reds: Vec<f32> = out.texels.iter().map(|t| t[0]).collect();
    assert_eq!(reds, vec![1.0, 2.0, 4.0, 5.0]);
}

#[test]
fn crop_outside_image_is_rejected() {
    let image = DecodedImage {
        width: 2,
        height: 2,
        texels: vec![[0.0; 4]; 4],
    };
    let rect = CropRect {
        x: 5.0,
        y: 5.0,
        width: 1.0,
        height: 1.0,
    };
    assert!(crop_decoded(&image, &rect).is_err());
    assert!(crop_decoded(&image, &CropRect::default()).is_err());
}

#[test]
fn dimensions_come_from_the_header() {
    let bytes = png_bytes(3, 2, vec![0; 3 * 2 * 4]);
    assert_eq!(read_dimensions(&bytes, SourceFormat::Raster).unwrap(), (3, 2));
    assert!(read_dimensions(&bytes, SourceFormat::OpenExr).is_err());
    assert!(read_dimensions(b"nope", SourceFormat::Raster).is_err());
}
