//! # Undo store
//!
//! Undo entries touching many rasters can swap them out to disk instead of holding full copies
//! in memory. Each raster is written as an 8-bit straight RGBA PNG holding the populated region of
//! the image, and read back when the entry is reverted.
//!
//! A [`StoredImage`] owns its file: dropping it deletes the file, so history that is discarded or
//! abandoned never leaks temporaries.

use std::path::{Path, PathBuf};

use crate::chunky::ChunkyImage;
use crate::color::Pixel;
use crate::util::{RectI, VecI};

#[derive(thiserror::Error, Debug)]
pub enum UndoStoreError {
    #[error("io: {}", .0)]
    Io(#[from] std::io::Error),
    #[error("encoding image: {}", .0)]
    Encode(#[from] png::EncodingError),
    #[error("decoding image: {}", .0)]
    Decode(#[from] png::DecodingError),
    #[error("stored image {path:?} is malformed")]
    Malformed { path: PathBuf },
}

pub struct UndoStore {
    dir: PathBuf,
}
impl UndoStore {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
    /// A per-user cache directory, or the system temporary directory if there is none.
    #[must_use]
    pub fn default_dir() -> PathBuf {
        match dirs::cache_dir() {
            Some(mut dir) => {
                dir.push(env!("CARGO_PKG_NAME"));
                dir.push("undo");
                dir
            }
            None => std::env::temp_dir().join(concat!(env!("CARGO_PKG_NAME"), "-undo")),
        }
    }
    #[must_use]
    pub fn from_settings(settings: &crate::settings::TrackerSettings) -> Self {
        Self::new(
            settings
                .undo_store_dir
                .clone()
                .unwrap_or_else(Self::default_dir),
        )
    }
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
    /// Write an image out. Empty images don't touch the disk.
    pub fn store(&self, image: &ChunkyImage) -> Result<StoredImage, UndoStoreError> {
        let size = image.size();
        let Some(region) = image.populated_bounds() else {
            return Ok(StoredImage {
                path: None,
                size,
                region: RectI::EMPTY,
            });
        };
        std::fs::create_dir_all(&self.dir)?;
        let path = self
            .dir
            .join(format!("{}.png", uuid::Uuid::new_v4().as_simple()));
        let pixels = image.read_region(region);
        let bytes: &[u8] = bytemuck::cast_slice(&pixels);

        // Construct the owner first, so a failed write still cleans up after itself.
        let stored = StoredImage {
            path: Some(path.clone()),
            size,
            region,
        };
        let write = || -> Result<(), UndoStoreError> {
            let file = std::fs::File::create(&path)?;
            let mut encoder = png::Encoder::new(
                std::io::BufWriter::new(file),
                region.width.unsigned_abs(),
                region.height.unsigned_abs(),
            );
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(bytes)?;
            writer.finish()?;
            Ok(())
        };
        write()?;
        log::debug!(
            "Swapped {} of raster to {:?}",
            human_bytes::human_bytes(bytes.len() as f64),
            stored.path()
        );
        Ok(stored)
    }
}

/// An image written by an [`UndoStore`].
#[derive(Debug)]
pub struct StoredImage {
    /// None if the image was empty.
    path: Option<PathBuf>,
    size: VecI,
    region: RectI,
}
impl StoredImage {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
    /// Canvas size of the original image.
    #[must_use]
    pub fn size(&self) -> VecI {
        self.size
    }
    /// Read the image back. The file is kept until `self` is dropped.
    pub fn load(&self) -> Result<ChunkyImage, UndoStoreError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(ChunkyImage::new(self.size));
        };
        let malformed = || UndoStoreError::Malformed {
            path: path.to_owned(),
        };
        let file = std::fs::File::open(path)?;
        let mut reader = png::Decoder::new(std::io::BufReader::new(file)).read_info()?;
        let mut buffer = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buffer)?;
        if info.color_type != png::ColorType::Rgba
            || info.bit_depth != png::BitDepth::Eight
            || info.width != self.region.width.unsigned_abs()
            || info.height != self.region.height.unsigned_abs()
        {
            return Err(malformed());
        }
        let bytes = buffer.get(..info.buffer_size()).ok_or_else(malformed)?;
        let pixels: &[Pixel] = bytemuck::cast_slice(bytes);
        Ok(ChunkyImage::from_region(self.size, self.region, pixels))
    }
}
impl Drop for StoredImage {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                log::warn!("Failed to remove undo file {path:?}: {e}");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::chunky::Paint;
    use crate::color::Color;

    pub(crate) fn temp_store() -> UndoStore {
        UndoStore::new(
            std::env::temp_dir()
                .join("tilepaint-core-tests")
                .join(uuid::Uuid::new_v4().to_string()),
        )
    }
    #[test]
    fn round_trip_and_cleanup() {
        let store = temp_store();
        let mut image = ChunkyImage::new(VecI::new(300, 200));
        image.draw_rect(RectI::new(70, 10, 100, 150), &Paint::over(Color::opaque(1, 2, 3)));
        image.draw_line(
            VecI::new(0, 0),
            VecI::new(299, 199),
            3,
            &Paint::over(Color::rgba(200, 100, 50, 77)),
        );

        let stored = store.store(&image).unwrap();
        let path = stored.path().unwrap().to_owned();
        assert!(path.exists());
        assert_eq!(stored.load().unwrap(), image);
        drop(stored);
        assert!(!path.exists(), "file removed on drop");
    }
    #[test]
    fn empty_image_skips_disk() {
        let store = temp_store();
        let stored = store.store(&ChunkyImage::new(VecI::new(10, 10))).unwrap();
        assert!(stored.path().is_none());
        assert!(stored.load().unwrap().is_empty());
        assert!(!store.dir().exists());
    }
    #[test]
    fn missing_file_is_error() {
        let store = temp_store();
        let mut image = ChunkyImage::new(VecI::new(10, 10));
        image.draw_rect(RectI::new(0, 0, 3, 3), &Paint::over(Color::WHITE));
        let stored = store.store(&image).unwrap();
        std::fs::remove_file(stored.path().unwrap()).unwrap();
        assert!(matches!(stored.load(), Err(UndoStoreError::Io(_))));
    }
}
