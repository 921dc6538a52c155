//! Image decoding into voxel arrays and TIFF slice encoding

use crate::format::voxel::{Element, VoxelType};
use crate::io::error::{CubingError, Result, invalid_parameter};
use image::{ColorType, DynamicImage, ImageBuffer, ImageFormat, Pixel};
use ndarray::{Array3, ArrayView3};
use num_traits::{NumCast, Zero};
use std::path::Path;

/// Width, height and channel count of a source tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileShape {
    /// Extent along x in pixels
    pub width: usize,
    /// Extent along y in pixels
    pub height: usize,
    /// Channels per pixel
    pub channels: usize,
}

impl TileShape {
    const fn as_tuple(self) -> (usize, usize, usize) {
        (self.width, self.height, self.channels)
    }

    fn of(image: &DynamicImage) -> Self {
        Self {
            width: image.width() as usize,
            height: image.height() as usize,
            channels: image.color().channel_count().into(),
        }
    }
}

#[derive(Clone, Copy)]
enum SampleDepth {
    Eight,
    Sixteen,
    Float,
}

fn open_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|source| CubingError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })
}

/// Determine tile shape from a reference image
///
/// # Errors
///
/// Returns an error if the image cannot be opened or decoded
pub fn read_tile_shape(path: &Path) -> Result<TileShape> {
    Ok(TileShape::of(&open_image(path)?))
}

/// Decode a tile into an `(x, y, channel)` array of `T`
///
/// Samples are converted numerically; values that do not fit `T` become zero.
///
/// # Errors
///
/// Returns an error if the image cannot be decoded or its shape differs from
/// `expected`
pub fn read_tile<T: Element>(path: &Path, expected: TileShape) -> Result<Array3<T>> {
    let image = open_image(path)?;
    let found = TileShape::of(&image);
    if found != expected {
        return Err(CubingError::TileShapeMismatch {
            path: path.to_path_buf(),
            expected: expected.as_tuple(),
            found: found.as_tuple(),
        });
    }

    Ok(image_samples(&image))
}

/// Decode an image of any shape into an `(x, y, channel)` array of `T`
///
/// # Errors
///
/// Returns an error if the image cannot be opened or decoded
pub fn read_image<T: Element>(path: &Path) -> Result<Array3<T>> {
    Ok(image_samples(&open_image(path)?))
}

fn image_samples<T: Element>(image: &DynamicImage) -> Array3<T> {
    let found = TileShape::of(image);
    let depth = match image.color() {
        ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16 => {
            SampleDepth::Sixteen
        }
        ColorType::Rgb32F | ColorType::Rgba32F => SampleDepth::Float,
        _ => SampleDepth::Eight,
    };

    let mut out = Array3::<T>::zeros((found.width, found.height, found.channels));
    match (found.channels, depth) {
        (1, SampleDepth::Eight) => fill_samples(&image.to_luma8(), &mut out),
        (1, SampleDepth::Sixteen) => fill_samples(&image.to_luma16(), &mut out),
        (1, SampleDepth::Float) => fill_samples(&image.to_luma32f(), &mut out),
        (2, SampleDepth::Eight) => fill_samples(&image.to_luma_alpha8(), &mut out),
        (2, SampleDepth::Sixteen) => fill_samples(&image.to_luma_alpha16(), &mut out),
        (2, SampleDepth::Float) => fill_samples(&image.to_luma_alpha32f(), &mut out),
        (3, SampleDepth::Eight) => fill_samples(&image.to_rgb8(), &mut out),
        (3, SampleDepth::Sixteen) => fill_samples(&image.to_rgb16(), &mut out),
        (3, SampleDepth::Float) => fill_samples(&image.to_rgb32f(), &mut out),
        (_, SampleDepth::Eight) => fill_samples(&image.to_rgba8(), &mut out),
        (_, SampleDepth::Sixteen) => fill_samples(&image.to_rgba16(), &mut out),
        (_, SampleDepth::Float) => fill_samples(&image.to_rgba32f(), &mut out),
    }

    out
}

fn fill_samples<P: Pixel, T: Element>(buffer: &ImageBuffer<P, Vec<P::Subpixel>>, out: &mut Array3<T>) {
    for (x, y, pixel) in buffer.enumerate_pixels() {
        for (channel, &sample) in pixel.channels().iter().enumerate() {
            if let Some(dst) = out.get_mut((x as usize, y as usize, channel)) {
                *dst = <T as NumCast>::from(sample).unwrap_or_else(T::zero);
            }
        }
    }
}

/// Whether slices of `channels` samples of `voxel_type` have a TIFF color type
pub const fn tiff_supports(voxel_type: VoxelType, channels: usize) -> bool {
    matches!(
        (voxel_type, channels),
        (VoxelType::U8 | VoxelType::U16, 1 | 3 | 4) | (VoxelType::F32, 3 | 4)
    )
}

/// Encode an `(x, y, channel)` slice as a TIFF image
///
/// # Errors
///
/// Returns an error if the element type and channel count have no TIFF color
/// type, or the file cannot be written
pub fn write_tiff_slice<T: Element>(path: &Path, slice: ArrayView3<'_, T>) -> Result<()> {
    let (width, height, channels) = slice.dim();
    let unsupported = || CubingError::Unsupported {
        feature: format!("TIFF slices with {channels} channel(s) of {}", T::VOXEL_TYPE),
    };
    let width = u32::try_from(width).map_err(|err| invalid_parameter("width", &width, &err))?;
    let height = u32::try_from(height).map_err(|err| invalid_parameter("height", &height, &err))?;

    let image = match (T::VOXEL_TYPE, channels) {
        (VoxelType::U8, 1) => pixels(width, height, slice).map(DynamicImage::ImageLuma8),
        (VoxelType::U8, 3) => pixels(width, height, slice).map(DynamicImage::ImageRgb8),
        (VoxelType::U8, 4) => pixels(width, height, slice).map(DynamicImage::ImageRgba8),
        (VoxelType::U16, 1) => pixels(width, height, slice).map(DynamicImage::ImageLuma16),
        (VoxelType::U16, 3) => pixels(width, height, slice).map(DynamicImage::ImageRgb16),
        (VoxelType::U16, 4) => pixels(width, height, slice).map(DynamicImage::ImageRgba16),
        (VoxelType::F32, 3) => pixels(width, height, slice).map(DynamicImage::ImageRgb32F),
        (VoxelType::F32, 4) => pixels(width, height, slice).map(DynamicImage::ImageRgba32F),
        _ => None,
    }
    .ok_or_else(unsupported)?;

    image
        .save_with_format(path, ImageFormat::Tiff)
        .map_err(|source| CubingError::ImageSave {
            path: path.to_path_buf(),
            source,
        })
}

// Image buffers store rows of pixels with interleaved channels
fn pixels<P: Pixel, T: Element>(
    width: u32,
    height: u32,
    slice: ArrayView3<'_, T>,
) -> Option<ImageBuffer<P, Vec<P::Subpixel>>> {
    let samples = slice
        .permuted_axes([1, 0, 2])
        .iter()
        .map(|&sample| <P::Subpixel as NumCast>::from(sample).unwrap_or_else(P::Subpixel::zero))
        .collect();
    ImageBuffer::from_raw(width, height, samples)
}
