//! Image saving utilities.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use image::{DynamicImage, ImageBuffer, Luma, Rgb};

use crate::error::{Error, Result};

use super::{ImageTensor, RGB_CHANNELS};

/// Save every batch item of an output tensor as a PNG file.
///
/// The tensor holds per-channel planes with values in [0, 1]; each plane is
/// scaled by 255, clamped, and the planes are merged back into an RGB (or
/// grayscale) image. Files are named `sr_<index>.png` with a 1-based index
/// and written into `dir`, which is created if absent.
///
/// # Errors
///
/// Returns an error if the directory cannot be created, the channel count is
/// unsupported, or an image cannot be encoded.
pub fn save_outputs(output: &ImageTensor, dir: &Path) -> Result<Vec<PathBuf>> {
    let batch = output.dim().0;

    fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(batch);
    for i in 0..batch {
        let img = batch_item_to_image(output, i)?;
        let path = dir.join(output_name(i));

        img.save(&path).map_err(|source| Error::ImageSave {
            path: path.clone(),
            source,
        })?;

        tracing::info!("Saved {}", path.display());
        written.push(path);
    }

    Ok(written)
}

/// Open an image file in the platform's default viewer.
///
/// The viewer is spawned detached; this call does not block on it.
///
/// # Errors
///
/// Returns an error if the viewer process cannot be spawned.
pub fn open_in_viewer(path: &Path) -> Result<()> {
    let mut command = if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]).arg(path);
        c
    } else if cfg!(target_os = "macos") {
        let mut c = Command::new("open");
        c.arg(path);
        c
    } else {
        let mut c = Command::new("xdg-open");
        c.arg(path);
        c
    };

    command.spawn()?;
    Ok(())
}

/// Merge the channel planes of one batch item into an image.
#[allow(clippy::cast_possible_truncation)]
fn batch_item_to_image(output: &ImageTensor, index: usize) -> Result<DynamicImage> {
    let (_, channels, height, width) = output.dim();
    let (w, h) = (width as u32, height as u32);

    match channels {
        1 => Ok(DynamicImage::ImageLuma8(ImageBuffer::from_fn(w, h, |x, y| {
            Luma([to_pixel(output[[index, 0, y as usize, x as usize]])])
        }))),
        RGB_CHANNELS => Ok(DynamicImage::ImageRgb8(ImageBuffer::from_fn(w, h, |x, y| {
            Rgb([
                to_pixel(output[[index, 0, y as usize, x as usize]]),
                to_pixel(output[[index, 1, y as usize, x as usize]]),
                to_pixel(output[[index, 2, y as usize, x as usize]]),
            ])
        }))),
        other => Err(Error::UnsupportedChannels { channels: other }),
    }
}

/// Output file name for the image at `index` within the batch.
fn output_name(index: usize) -> String {
    format!("sr_{}.png", index + 1)
}

/// Scale a plane value from [0, 1] to [0, 255] with clamping.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_pixel(value: f32) -> u8 {
    // Safe: clamped to [0, 255] range before casting
    (value * 255.0).clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    #[test]
    fn test_to_pixel() {
        assert_eq!(to_pixel(0.0), 0);
        assert_eq!(to_pixel(0.5), 127);
        assert_eq!(to_pixel(1.0), 255);
    }

    #[test]
    fn test_to_pixel_clamp() {
        assert_eq!(to_pixel(-0.5), 0);
        assert_eq!(to_pixel(2.0), 255);
    }

    #[test]
    fn test_output_name() {
        assert_eq!(output_name(0), "sr_1.png");
        assert_eq!(output_name(9), "sr_10.png");
    }

    #[test]
    fn test_plane_merge() {
        let mut output = Array4::<f32>::zeros((1, 3, 2, 2));
        output[[0, 0, 0, 0]] = 1.0;
        output[[0, 1, 0, 0]] = 0.5;
        output[[0, 2, 0, 0]] = 0.0;

        let img = batch_item_to_image(&output, 0).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(0, 0), &Rgb([255, 127, 0]));
        assert_eq!(img.get_pixel(1, 1), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_grayscale_output() {
        let output = Array4::<f32>::from_elem((1, 1, 3, 4), 1.0);

        let img = batch_item_to_image(&output, 0).unwrap();
        assert_eq!(img.to_luma8().get_pixel(2, 1), &Luma([255]));
    }

    #[test]
    fn test_unsupported_output_channels() {
        let output = Array4::<f32>::zeros((1, 2, 2, 2));

        assert!(matches!(
            batch_item_to_image(&output, 0),
            Err(Error::UnsupportedChannels { channels: 2 })
        ));
    }
}
