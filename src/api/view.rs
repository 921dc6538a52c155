//! Bounded window onto one magnification of a layer

use crate::api::layer::MagStorage;
use crate::format::voxel::Element;
use crate::io::error::{CubingError, Result};
use ndarray::{Array4, ArrayView4};

/// Region of a magnification addressed relative to its own offset
#[derive(Debug, Clone)]
pub struct View {
    storage: MagStorage,
    global_offset: [u64; 3],
    size: [usize; 3],
}

impl View {
    /// Window of `size` voxels starting at `global_offset`
    pub fn new(storage: impl Into<MagStorage>, global_offset: [u64; 3], size: [usize; 3]) -> Self {
        Self {
            storage: storage.into(),
            global_offset,
            size,
        }
    }

    /// Offset of the view inside the dataset
    pub const fn global_offset(&self) -> [u64; 3] {
        self.global_offset
    }

    /// Extent of the view
    pub const fn size(&self) -> [usize; 3] {
        self.size
    }

    /// Read `(channels, x, y, z)` data at a view-relative offset
    ///
    /// # Errors
    ///
    /// Returns an error if the region leaves the view or reading fails
    pub fn read<T: Element>(&self, offset: [u64; 3], size: [usize; 3]) -> Result<Array4<T>> {
        self.check_bounds(offset, size)?;
        self.storage.read(self.absolute(offset), size)
    }

    /// Read the whole view
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails
    pub fn read_all<T: Element>(&self) -> Result<Array4<T>> {
        self.read([0, 0, 0], self.size)
    }

    /// Write `(channels, x, y, z)` data at a view-relative offset
    ///
    /// # Errors
    ///
    /// Returns an error if the data leaves the view or writing fails
    pub fn write<T: Element>(&self, offset: [u64; 3], data: ArrayView4<'_, T>) -> Result<()> {
        let (_, sx, sy, sz) = data.dim();
        self.check_bounds(offset, [sx, sy, sz])?;
        self.storage.write(self.absolute(offset), data)
    }

    fn absolute(&self, offset: [u64; 3]) -> [u64; 3] {
        [
            self.global_offset[0] + offset[0],
            self.global_offset[1] + offset[1],
            self.global_offset[2] + offset[2],
        ]
    }

    fn check_bounds(&self, offset: [u64; 3], size: [usize; 3]) -> Result<()> {
        let inside = offset
            .iter()
            .zip(size)
            .zip(self.size)
            .all(|((start, len), bound)| start + len as u64 <= bound as u64);
        if inside {
            Ok(())
        } else {
            Err(CubingError::OutOfBounds {
                offset,
                size,
                bounds: self.size,
            })
        }
    }
}
