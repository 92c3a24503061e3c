//! # File formats
//!
//! Single layer image files, read and written through `image`. Formats that can't hold
//! transparency get the alpha channel dropped.

pub mod animation;

use std::path::Path;

use image::buffer::ConvertBuffer;
use image::{RgbImage, RgbaImage};

use crate::document::save::{DocumentWriter, SaveError, SavePayload};
use crate::document::Document;
use crate::StateError;

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Decode(#[from] image::ImageError),
    #[error(transparent)]
    State(#[from] StateError),
}

#[derive(strum::AsRefStr, strum::EnumIter, Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum FileFormat {
    Jpg,
    Png,
    Tiff,
    Gif,
    Bmp,
    Tga,
}

impl FileFormat {
    /// Case insensitive, without the dot.
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        Some(match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Self::Jpg,
            "png" => Self::Png,
            "tif" | "tiff" => Self::Tiff,
            "gif" => Self::Gif,
            "bmp" => Self::Bmp,
            "tga" => Self::Tga,
            _ => return None,
        })
    }
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()?.to_str().and_then(Self::from_extension)
    }
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Tiff => "tiff",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tga => "tga",
        }
    }
    #[must_use]
    pub fn has_alpha(self) -> bool {
        !matches!(self, Self::Jpg | Self::Bmp)
    }
    #[must_use]
    pub fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Jpg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
            Self::Tiff => image::ImageFormat::Tiff,
            Self::Gif => image::ImageFormat::Gif,
            Self::Bmp => image::ImageFormat::Bmp,
            Self::Tga => image::ImageFormat::Tga,
        }
    }
}

impl DocumentWriter for FileFormat {
    fn write(&self, payload: &SavePayload, path: &Path) -> Result<(), SaveError> {
        let SavePayload::Composite(image) = payload else {
            return Err(SaveError::Unsupported(self.as_ref().to_owned()));
        };
        if self.has_alpha() {
            image.save_with_format(path, self.image_format())?;
        } else {
            let opaque: RgbImage = image.convert();
            opaque.save_with_format(path, self.image_format())?;
        }
        Ok(())
    }
}

/// # Errors
/// If the file can't be read or decoded.
pub fn read_image(path: &Path) -> Result<RgbaImage, LoadError> {
    Ok(image::open(path)?.into_rgba8())
}

/// Open an image file as a single layer document.
///
/// # Errors
/// If the file can't be read or decoded, or is empty.
pub fn read_document(path: &Path) -> Result<Document, LoadError> {
    let image = read_image(path)?;
    log::debug!(
        "read {}x{} from {}",
        image.width(),
        image.height(),
        path.display()
    );
    Ok(Document::from_image(image, Some(path.to_owned()), None)?)
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use image::Rgba;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("stratum-{}-{name}", std::process::id()))
    }

    #[test]
    fn extensions() {
        assert_eq!(FileFormat::from_extension("JPEG"), Some(FileFormat::Jpg));
        assert_eq!(FileFormat::from_extension("tif"), Some(FileFormat::Tiff));
        assert_eq!(FileFormat::from_extension("psd"), None);
        assert_eq!(
            FileFormat::from_path(Path::new("a/b.Png")),
            Some(FileFormat::Png)
        );
        assert_eq!(FileFormat::from_path(Path::new("noext")), None);
        for format in <FileFormat as strum::IntoEnumIterator>::iter() {
            assert_eq!(FileFormat::from_extension(format.extension()), Some(format));
        }
    }
    #[test]
    fn png_keeps_alpha() {
        let path = temp_path("alpha.png");
        let mut image = RgbaImage::from_pixel(3, 3, Rgba([10, 20, 30, 255]));
        image.put_pixel(1, 1, Rgba([0, 0, 0, 0]));
        FileFormat::Png
            .write(&SavePayload::Composite(Arc::new(image.clone())), &path)
            .unwrap();
        let document = read_document(&path).unwrap();
        assert_eq!(document.canvas().size(), [3, 3]);
        assert_eq!(document.file(), Some(path.as_path()));
        let pixels = document.layers()[0].as_raster().unwrap().image();
        assert_eq!(**pixels, image);
        std::fs::remove_file(path).unwrap();
    }
    #[test]
    fn bmp_drops_alpha() {
        let path = temp_path("opaque.bmp");
        let image = RgbaImage::from_pixel(2, 2, Rgba([200, 100, 50, 0]));
        FileFormat::Bmp
            .write(&SavePayload::Composite(Arc::new(image)), &path)
            .unwrap();
        let read = read_image(&path).unwrap();
        assert_eq!(*read.get_pixel(0, 0), Rgba([200, 100, 50, 255]));
        std::fs::remove_file(path).unwrap();
    }
    #[test]
    fn layers_unsupported() {
        let payload = SavePayload::Layers {
            canvas: [1, 1],
            layers: Vec::new(),
        };
        assert!(matches!(
            FileFormat::Png.write(&payload, &temp_path("never.png")),
            Err(SaveError::Unsupported(_))
        ));
    }
    #[test]
    fn missing_file() {
        assert!(matches!(
            read_document(&temp_path("does-not-exist.png")),
            Err(LoadError::Decode(_))
        ));
    }
}
