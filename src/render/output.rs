//! Atomic output writes.
//!
//! Every write goes to `<target>.<ext>.tmp` first and is then renamed over
//! the target, so an interrupted process never leaves a half-written
//! wallpaper behind.

use image::{DynamicImage, ImageFormat};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::error::{Result, WallpaperError};

/// Encodes `image` as `format` and atomically replaces `target`.
///
/// The image is flattened to 8-bit RGB first; wallpapers carry no alpha and
/// JPEG/BMP writers expect RGB.
pub fn save_atomic(image: &DynamicImage, format: ImageFormat, target: &Path) -> Result<()> {
    ensure_parent_dir(target)?;
    let temp = temp_path_for(target);
    if temp.exists() {
        let _ = fs::remove_file(&temp);
    }

    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    if let Err(e) = rgb.save_with_format(&temp, format) {
        let _ = fs::remove_file(&temp);
        return Err(WallpaperError::output_write_failed(target, e.to_string()));
    }
    replace(&temp, target)
}

/// Copies `source` byte-for-byte and atomically replaces `target`.
pub fn copy_atomic(source: &Path, target: &Path) -> Result<()> {
    ensure_parent_dir(target)?;
    let temp = temp_path_for(target);
    if let Err(e) = fs::copy(source, &temp) {
        let _ = fs::remove_file(&temp);
        return Err(WallpaperError::output_write_failed(
            target,
            format!("copying {}: {}", source.display(), e),
        ));
    }
    replace(&temp, target)
}

/// Returns a string that changes whenever the file's contents likely changed.
pub fn source_fingerprint(path: &Path) -> String {
    let metadata = fs::metadata(path).ok();
    let size = metadata.as_ref().map(|meta| meta.len()).unwrap_or(0);
    let modified_nanos = metadata
        .and_then(|meta| meta.modified().ok())
        .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
        .map(|duration| duration.as_nanos())
        .unwrap_or(0);
    format!("{}|{}", size, modified_nanos)
}

fn replace(temp: &Path, target: &Path) -> Result<()> {
    fs::rename(temp, target).map_err(|e| {
        let _ = fs::remove_file(temp);
        WallpaperError::output_write_failed(target, format!("replacing file: {}", e))
    })
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|e| WallpaperError::output_write_failed(path, format!("creating directory: {}", e))),
        _ => Ok(()),
    }
}

fn temp_path_for(target: &Path) -> PathBuf {
    let ext = target
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("img");
    target.with_extension(format!("{ext}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_creates_parent_and_leaves_no_temp() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested/out.bmp");
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(3, 2, image::Rgb([9, 8, 7])));

        save_atomic(&img, ImageFormat::Bmp, &target).unwrap();

        assert!(target.exists());
        assert!(!temp_path_for(&target).exists());
        let back = image::open(&target).unwrap().to_rgb8();
        assert_eq!(back.dimensions(), (3, 2));
        assert_eq!(back.get_pixel(0, 0).0, [9, 8, 7]);
    }

    #[test]
    fn save_overwrites_in_place() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.png");
        let red = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(1, 1, image::Rgb([255, 0, 0])));
        let blue = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(1, 1, image::Rgb([0, 0, 255])));

        save_atomic(&red, ImageFormat::Png, &target).unwrap();
        save_atomic(&blue, ImageFormat::Png, &target).unwrap();

        let back = image::open(&target).unwrap().to_rgb8();
        assert_eq!(back.get_pixel(0, 0).0, [0, 0, 255]);
    }

    #[test]
    fn copy_is_byte_identical() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src.jpg");
        std::fs::write(&source, b"not really a jpeg").unwrap();
        let target = dir.path().join("out/current.jpg");

        copy_atomic(&source, &target).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"not really a jpeg");
    }

    #[test]
    fn fingerprint_changes_with_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"a").unwrap();
        let first = source_fingerprint(&path);
        std::fs::write(&path, b"abc").unwrap();
        assert_ne!(first, source_fingerprint(&path));
    }

    #[test]
    fn temp_path_keeps_extension() {
        assert_eq!(
            temp_path_for(Path::new("/x/current.png")),
            PathBuf::from("/x/current.png.tmp")
        );
    }
}
