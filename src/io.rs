use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tga::TgaEncoder;
use image::codecs::tiff::TiffEncoder;
use image::{ColorType, DynamicImage, ImageEncoder, RgbaImage};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LibraryError, PickError};

/// Encodings the photo library can write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveFormat {
    #[default]
    Png,
    Jpeg,
    Bmp,
    Tga,
    Tiff,
}

impl SaveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Bmp => "bmp",
            SaveFormat::Tga => "tga",
            SaveFormat::Tiff => "tiff",
        }
    }

    /// Infer the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<SaveFormat> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }
}

impl fmt::Display for SaveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for SaveFormat {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "png" => Ok(SaveFormat::Png),
            "jpeg" | "jpg" => Ok(SaveFormat::Jpeg),
            "bmp" => Ok(SaveFormat::Bmp),
            "tga" => Ok(SaveFormat::Tga),
            "tiff" | "tif" => Ok(SaveFormat::Tiff),
            other => Err(LibraryError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Decode any raster format supported by the `image` crate into RGBA.
///
/// The header is inspected first so oversized files are rejected before a
/// full decode allocates for them.
pub fn load_image_sync(path: &Path, max_pixels: u64) -> Result<RgbaImage, PickError> {
    let io_err = |source| PickError::Io { path: path.to_path_buf(), source };
    let decode_err = |source| PickError::Decode { path: path.to_path_buf(), source };

    let (width, height) = image::io::Reader::open(path)
        .map_err(io_err)?
        .with_guessed_format()
        .map_err(io_err)?
        .into_dimensions()
        .map_err(decode_err)?;

    if width as u64 * height as u64 > max_pixels {
        return Err(PickError::TooLarge {
            path: path.to_path_buf(),
            width,
            height,
            max_pixels,
        });
    }

    let img = image::io::Reader::open(path)
        .map_err(io_err)?
        .with_guessed_format()
        .map_err(io_err)?
        .decode()
        .map_err(decode_err)?;

    Ok(img.to_rgba8())
}

/// Encode and write an image to a file.
/// This is a standalone function so it can be called from background threads
/// via `rayon::spawn`.
pub fn encode_and_write(
    image: &RgbaImage,
    path: &Path,
    format: SaveFormat,
    quality: u8,
) -> Result<(), LibraryError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let (w, h) = image.dimensions();

    match format {
        SaveFormat::Png => {
            PngEncoder::new(&mut writer).write_image(image.as_raw(), w, h, ColorType::Rgba8)?;
        }
        SaveFormat::Jpeg => {
            // JPEG has no alpha channel.
            let rgb_image = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100)).write_image(
                rgb_image.as_raw(),
                w,
                h,
                ColorType::Rgb8,
            )?;
        }
        SaveFormat::Bmp => {
            BmpEncoder::new(&mut writer).write_image(image.as_raw(), w, h, ColorType::Rgba8)?;
        }
        SaveFormat::Tga => {
            TgaEncoder::new(&mut writer).write_image(image.as_raw(), w, h, ColorType::Rgba8)?;
        }
        SaveFormat::Tiff => {
            TiffEncoder::new(&mut writer).write_image(image.as_raw(), w, h, ColorType::Rgba8)?;
        }
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample() -> RgbaImage {
        RgbaImage::from_fn(6, 5, |x, y| Rgba([x as u8 * 40, y as u8 * 50, 99, 255]))
    }

    #[test]
    fn format_parsing_and_inference() {
        assert_eq!("JPG".parse::<SaveFormat>().unwrap(), SaveFormat::Jpeg);
        assert_eq!(SaveFormat::from_path(Path::new("a/b.tif")), Some(SaveFormat::Tiff));
        assert_eq!(SaveFormat::from_path(Path::new("noext")), None);
        assert!(matches!(
            "webp".parse::<SaveFormat>(),
            Err(LibraryError::UnsupportedFormat(f)) if f == "webp"
        ));
    }

    #[test]
    fn lossless_formats_preserve_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let img = sample();
        for format in [SaveFormat::Png, SaveFormat::Bmp, SaveFormat::Tga, SaveFormat::Tiff] {
            let path = dir.path().join(format!("out.{}", format.extension()));
            encode_and_write(&img, &path, format, 90).unwrap();
            let back = load_image_sync(&path, u64::MAX).unwrap();
            assert_eq!(back, img, "{format}");
        }
    }

    #[test]
    fn jpeg_writes_decodable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        encode_and_write(&sample(), &path, SaveFormat::Jpeg, 80).unwrap();
        let back = load_image_sync(&path, u64::MAX).unwrap();
        assert_eq!(back.dimensions(), (6, 5));
    }

    #[test]
    fn oversized_image_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        encode_and_write(&sample(), &path, SaveFormat::Png, 90).unwrap();
        assert!(matches!(
            load_image_sync(&path, 10),
            Err(PickError::TooLarge { width: 6, height: 5, .. })
        ));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(matches!(load_image_sync(&path, u64::MAX), Err(PickError::Decode { .. })));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_image_sync(&dir.path().join("nope.png"), u64::MAX),
            Err(PickError::Io { .. })
        ));
    }
}
