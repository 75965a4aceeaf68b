//! Image loading utilities.

use std::fs;
use std::path::{Path, PathBuf};

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::Array4;

use crate::error::{Error, Result};

use super::{ImageTensor, RGB_CHANNELS};

/// File extensions considered when scanning an input directory.
const IMAGE_EXTENSIONS: &[&str] = &["bmp", "jpeg", "jpg", "png", "tif", "tiff", "webp"];

/// A decoded input image together with the path it was read from.
pub struct InputImage {
    pub path: PathBuf,
    pub image: DynamicImage,
}

/// Expand the input arguments into a flat list of candidate image paths.
///
/// Files are taken as given; directories are scanned (non-recursively, in
/// sorted order) for files with a known image extension.
///
/// # Errors
///
/// Returns [`Error::NoImagesFound`] if the expansion yields no paths, or an
/// IO error if a directory cannot be read.
pub fn collect_image_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let mut entries: Vec<PathBuf> = fs::read_dir(input)?
                .filter_map(std::result::Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.is_file() && is_image_file(path))
                .collect();
            entries.sort();
            paths.extend(entries);
        } else {
            paths.push(input.clone());
        }
    }

    if paths.is_empty() {
        return Err(Error::NoImagesFound);
    }

    Ok(paths)
}

/// Decode the candidate images, keeping only the usable ones.
///
/// An image that cannot be decoded is skipped with a warning. When
/// `required` fixes the expected (width, height), images of any other size
/// are skipped with a warning; when it is `None` (dynamic input axes), the
/// first decoded image fixes the size for the rest of the batch.
///
/// # Errors
///
/// Returns [`Error::NoUsableImages`] if every candidate was skipped.
pub fn read_matching(paths: &[PathBuf], required: Option<(u32, u32)>) -> Result<Vec<InputImage>> {
    let mut required = required;
    let mut images = Vec::new();

    for path in paths {
        let img = match image::open(path) {
            Ok(img) => img,
            Err(err) => {
                tracing::warn!("Image {} cannot be read: {err}", path.display());
                continue;
            }
        };

        let (width, height) = img.dimensions();
        match required {
            Some((w, h)) if (width, height) != (w, h) => {
                tracing::warn!(
                    "Size of image {} is {width}x{height}, not the expected {w}x{h}; skipped",
                    path.display()
                );
                continue;
            }
            None => required = Some((width, height)),
            Some(_) => {}
        }

        images.push(InputImage {
            path: path.clone(),
            image: img,
        });
    }

    if images.is_empty() {
        return Err(Error::NoUsableImages);
    }

    Ok(images)
}

/// Convert decoded images to a batched NCHW tensor of raw pixel intensities.
///
/// No normalization is applied: the super-resolution topologies this demo
/// targets consume values in [0, 255].
///
/// # Errors
///
/// Returns an error if `channels` is neither 1 nor 3.
pub fn to_batch_tensor(images: &[InputImage], channels: usize) -> Result<ImageTensor> {
    let refs: Vec<&DynamicImage> = images.iter().map(|input| &input.image).collect();
    images_to_tensor(&refs, channels)
}

/// Like [`to_batch_tensor`], but bicubic-resize every image to
/// `(width, height)` first. Feeds the auxiliary up-sampled input of
/// two-input topologies.
///
/// # Errors
///
/// Returns an error if `channels` is neither 1 nor 3.
pub fn to_resized_batch(
    images: &[InputImage],
    (width, height): (u32, u32),
    channels: usize,
) -> Result<ImageTensor> {
    let resized: Vec<DynamicImage> = images
        .iter()
        .map(|input| input.image.resize_exact(width, height, FilterType::CatmullRom))
        .collect();
    let refs: Vec<&DynamicImage> = resized.iter().collect();
    images_to_tensor(&refs, channels)
}

/// Fill an NCHW tensor from decoded images, one batch item per image.
#[allow(clippy::cast_possible_truncation)]
fn images_to_tensor(images: &[&DynamicImage], channels: usize) -> Result<ImageTensor> {
    let (width, height) = images.first().map_or((0, 0), |img| img.dimensions());
    let (w, h) = (width as usize, height as usize);

    let mut tensor = Array4::<f32>::zeros((images.len(), channels, h, w));

    match channels {
        1 => {
            for (i, img) in images.iter().enumerate() {
                let luma = img.to_luma8();
                for (x, y, pixel) in luma.enumerate_pixels() {
                    tensor[[i, 0, y as usize, x as usize]] = f32::from(pixel[0]);
                }
            }
        }
        RGB_CHANNELS => {
            for (i, img) in images.iter().enumerate() {
                let rgb = img.to_rgb8();
                for (x, y, pixel) in rgb.enumerate_pixels() {
                    for c in 0..RGB_CHANNELS {
                        tensor[[i, c, y as usize, x as usize]] = f32::from(pixel[c]);
                    }
                }
            }
        }
        other => return Err(Error::UnsupportedChannels { channels: other }),
    }

    Ok(tensor)
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn white_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([255, 255, 255])))
    }

    #[test]
    fn test_batch_tensor_shape() {
        let images = vec![
            InputImage {
                path: PathBuf::from("a.png"),
                image: DynamicImage::new_rgb8(6, 4),
            },
            InputImage {
                path: PathBuf::from("b.png"),
                image: DynamicImage::new_rgb8(6, 4),
            },
        ];

        let tensor = to_batch_tensor(&images, RGB_CHANNELS).unwrap();
        assert_eq!(tensor.shape(), &[2, 3, 4, 6]);
    }

    #[test]
    fn test_raw_intensity_range() {
        let images = vec![InputImage {
            path: PathBuf::from("white.png"),
            image: white_image(2, 2),
        }];

        let tensor = to_batch_tensor(&images, RGB_CHANNELS).unwrap();
        assert!(tensor.iter().all(|&v| (v - 255.0).abs() < f32::EPSILON));
    }

    #[test]
    fn test_grayscale_tensor() {
        let images = vec![InputImage {
            path: PathBuf::from("white.png"),
            image: white_image(3, 3),
        }];

        let tensor = to_batch_tensor(&images, 1).unwrap();
        assert_eq!(tensor.shape(), &[1, 1, 3, 3]);
        assert!((tensor[[0, 0, 0, 0]] - 255.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unsupported_channels() {
        let images = vec![InputImage {
            path: PathBuf::from("a.png"),
            image: DynamicImage::new_rgb8(2, 2),
        }];

        assert!(matches!(
            to_batch_tensor(&images, 4),
            Err(Error::UnsupportedChannels { channels: 4 })
        ));
    }

    #[test]
    fn test_resized_batch_dims() {
        let images = vec![InputImage {
            path: PathBuf::from("a.png"),
            image: DynamicImage::new_rgb8(4, 4),
        }];

        let tensor = to_resized_batch(&images, (8, 6), RGB_CHANNELS).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 6, 8]);
    }

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("photo.PNG")));
        assert!(is_image_file(Path::new("photo.jpg")));
        assert!(!is_image_file(Path::new("notes.txt")));
        assert!(!is_image_file(Path::new("no_extension")));
    }
}
