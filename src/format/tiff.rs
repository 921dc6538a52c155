//! Voxel storage as a stack of TIFF images
//!
//! Each z slice is one image named by a pattern such as `{z}.tif`, relative
//! to the storage directory. Tiled stacks split every slice into images of
//! `tile_size` pixels, addressed by tile column and row as in
//! `{z}/{y}/{x}.tif`. Pixels outside the stored images read as zero.

use crate::cubing::pattern::{Axis, InputPattern};
use crate::format::voxel::{Element, VoxelType};
use crate::io::error::{CubingError, Result, WithPath, format_error, invalid_parameter};
use crate::io::image::{read_image, tiff_supports, write_tiff_slice};
use ndarray::{Array3, Array4, ArrayView3, ArrayView4, s};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Handle to a directory of TIFF slices
#[derive(Debug, Clone)]
pub struct TiffDataset {
    root: PathBuf,
    pattern: InputPattern,
    tile_size: Option<[u32; 2]>,
    voxel_type: VoxelType,
    num_channels: usize,
}

/// One image of a slice and the pixel position of its top left corner
#[derive(Debug, Clone, Copy)]
struct Tile {
    coords: [u64; 3],
    origin: [u64; 2],
}

impl TiffDataset {
    /// Use `root` for slices named by `pattern`, creating the directory
    ///
    /// Untiled stacks need a `{z}` placeholder, tiled stacks need all three.
    ///
    /// # Errors
    ///
    /// Returns an error if a placeholder is missing, a tile side is zero, the
    /// voxel type and channel count have no TIFF colour type, or the
    /// directory cannot be created
    pub fn create(
        root: &Path,
        pattern: &str,
        tile_size: Option<[u32; 2]>,
        voxel_type: VoxelType,
        num_channels: usize,
    ) -> Result<Self> {
        let required: &[Axis] = if tile_size.is_some() { &Axis::ALL } else { &[Axis::Z] };
        let pattern = InputPattern::parse_with_axes(pattern, required)?;
        if let Some(size) = tile_size.filter(|size| size.contains(&0)) {
            return Err(invalid_parameter("tile_size", &format!("{size:?}"), &"must be positive"));
        }
        if !tiff_supports(voxel_type, num_channels) {
            return Err(CubingError::Unsupported {
                feature: format!("TIFF slices with {num_channels} channel(s) of {voxel_type}"),
            });
        }

        std::fs::create_dir_all(root).with_path(root, "create TIFF directory")?;
        Ok(Self {
            root: root.to_path_buf(),
            pattern,
            tile_size,
            voxel_type,
            num_channels,
        })
    }

    /// Storage directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File name pattern
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Tile width and height, `None` for one image per slice
    pub const fn tile_size(&self) -> Option<[u32; 2]> {
        self.tile_size
    }

    /// Element type of each channel
    pub const fn voxel_type(&self) -> VoxelType {
        self.voxel_type
    }

    /// Channels per voxel
    pub const fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Path of the image holding tile `[x, y]` of slice `z`
    pub fn file_path(&self, tile: [u64; 3]) -> PathBuf {
        self.root.join(self.pattern.format(tile, self.pattern.digit_counts()))
    }

    /// Read a `(channels, x, y, z)` array of `shape` at the voxel `offset`
    ///
    /// # Errors
    ///
    /// Returns an error if the element type differs from the stack, an image
    /// has another channel count, or decoding fails
    pub fn read<T: Element>(&self, offset: [u64; 3], shape: [usize; 3]) -> Result<Array4<T>> {
        self.check_type::<T>()?;
        let [sx, sy, sz] = shape;
        let mut out = Array4::<T>::zeros((self.num_channels, sx, sy, sz));
        if shape.contains(&0) {
            return Ok(out);
        }

        for (slot, z) in (offset[2]..offset[2] + sz as u64).enumerate() {
            for tile in self.tiles(offset, shape, z) {
                let path = self.file_path(tile.coords);
                if !path.is_file() {
                    continue;
                }
                let image = self.load::<T>(&path)?;
                let (width, height, _) = image.dim();
                let Some([(image_x, view_x), (image_y, view_y)]) =
                    overlap(tile.origin, [width, height], [offset[0], offset[1]], [sx, sy])
                else {
                    continue;
                };
                out.slice_mut(s![.., view_x, view_y, slot])
                    .assign(&image.slice(s![image_x, image_y, ..]).permuted_axes([2, 0, 1]));
            }
        }
        Ok(out)
    }

    /// Write `data` shaped `(channels, x, y, z)` at the voxel `offset`
    ///
    /// Existing images are patched. Untiled slices grow to cover the written
    /// region.
    ///
    /// # Errors
    ///
    /// Returns an error if the element type or channel count differs from
    /// the stack, or an image cannot be decoded or written
    pub fn write<T: Element>(&self, offset: [u64; 3], data: ArrayView4<'_, T>) -> Result<()> {
        self.check_type::<T>()?;
        let (channels, sx, sy, sz) = data.dim();
        if channels != self.num_channels {
            return Err(invalid_parameter(
                "data",
                &format!("{channels} channels"),
                &format!("TIFF stack has {} channels", self.num_channels),
            ));
        }
        let shape = [sx, sy, sz];
        if shape.contains(&0) {
            return Ok(());
        }

        for (slot, z) in (offset[2]..offset[2] + sz as u64).enumerate() {
            let plane = data.slice(s![.., .., .., slot]);
            for tile in self.tiles(offset, shape, z) {
                let path = self.file_path(tile.coords);
                let mut image = self.canvas::<T>(&path, [offset[0], offset[1]], [sx, sy])?;
                let (width, height, _) = image.dim();
                if let Some([(image_x, view_x), (image_y, view_y)]) =
                    overlap(tile.origin, [width, height], [offset[0], offset[1]], [sx, sy])
                {
                    image
                        .slice_mut(s![image_x, image_y, ..])
                        .assign(&plane.slice(s![.., view_x, view_y]).permuted_axes([1, 2, 0]));
                }
                save_slice(&path, image.view())?;
            }
        }
        Ok(())
    }

    fn check_type<T: Element>(&self) -> Result<()> {
        if T::VOXEL_TYPE == self.voxel_type {
            Ok(())
        } else {
            Err(CubingError::VoxelTypeMismatch {
                expected: self.voxel_type,
                found: T::VOXEL_TYPE,
            })
        }
    }

    // Images of slice `z` touched by the x/y extent of a request
    fn tiles(&self, offset: [u64; 3], shape: [usize; 3], z: u64) -> Vec<Tile> {
        let Some([tile_width, tile_height]) = self.tile_size.map(|size| size.map(u64::from)) else {
            return vec![Tile {
                coords: [0, 0, z],
                origin: [0, 0],
            }];
        };

        let columns = offset[0] / tile_width..=(offset[0] + shape[0] as u64 - 1) / tile_width;
        let rows = offset[1] / tile_height..=(offset[1] + shape[1] as u64 - 1) / tile_height;
        rows.flat_map(|row| {
            columns.clone().map(move |column| Tile {
                coords: [column, row, z],
                origin: [column * tile_width, row * tile_height],
            })
        })
        .collect()
    }

    fn load<T: Element>(&self, path: &Path) -> Result<Array3<T>> {
        let image = read_image::<T>(path)?;
        let (_, _, channels) = image.dim();
        if channels != self.num_channels {
            return Err(format_error(
                path,
                &format!("image has {channels} channels, the stack stores {}", self.num_channels),
            ));
        }
        Ok(image)
    }

    // Image to patch: a tile, or a slice covering the write region, holding
    // the existing pixels
    fn canvas<T: Element>(&self, path: &Path, offset: [u64; 2], size: [usize; 2]) -> Result<Array3<T>> {
        let existing = path.is_file().then(|| self.load::<T>(path)).transpose()?;
        let (existing_width, existing_height) = existing
            .as_ref()
            .map_or((0, 0), |image| (image.dim().0, image.dim().1));

        let (width, height) = match self.tile_size {
            Some([tile_width, tile_height]) => (tile_width as usize, tile_height as usize),
            None => (
                existing_width.max(offset[0] as usize + size[0]),
                existing_height.max(offset[1] as usize + size[1]),
            ),
        };

        let mut canvas = Array3::<T>::zeros((width, height, self.num_channels));
        if let Some(image) = existing {
            let keep_x = existing_width.min(width);
            let keep_y = existing_height.min(height);
            canvas
                .slice_mut(s![..keep_x, ..keep_y, ..])
                .assign(&image.slice(s![..keep_x, ..keep_y, ..]));
        }
        Ok(canvas)
    }
}

fn save_slice<T: Element>(path: &Path, image: ArrayView3<'_, T>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_path(parent, "create TIFF directory")?;
    }
    write_tiff_slice(path, image)?;
    log::trace!("Wrote TIFF slice {}", path.display());
    Ok(())
}

// Per axis, the ranges shared by an image at `origin` and a request at
// `offset`, local to the image and to the request
fn overlap(
    origin: [u64; 2],
    image: [usize; 2],
    offset: [u64; 2],
    size: [usize; 2],
) -> Option<[(Range<usize>, Range<usize>); 2]> {
    let mut axes = origin
        .into_iter()
        .zip(image)
        .zip(offset.into_iter().zip(size))
        .map(|((image_start, image_len), (request_start, request_len))| {
            let start = image_start.max(request_start);
            let end = (image_start + image_len as u64).min(request_start + request_len as u64);
            (start < end).then(|| {
                (
                    (start - image_start) as usize..(end - image_start) as usize,
                    (start - request_start) as usize..(end - request_start) as usize,
                )
            })
        });
    let x = axes.next()??;
    let y = axes.next()??;
    Some([x, y])
}
