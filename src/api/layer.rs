//! Layers and the storage behind each of their magnifications

use crate::api::mag::Mag;
use crate::api::properties::{Category, LayerProperties, TiffSettings};
use crate::format::dataset::WkwDataset;
use crate::format::header::{BlockType, Header};
use crate::format::tiff::TiffDataset;
use crate::format::voxel::{Element, VoxelType};
use crate::io::configuration::{DEFAULT_BLOCK_LEN, DEFAULT_CUBE_LENGTH, HEADER_FILE_NAME};
use crate::io::error::{CubingError, Result, WithPath, invalid_parameter};
use ndarray::{Array4, ArrayView4};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Files holding the voxels of one magnification
#[derive(Debug, Clone)]
pub enum MagStorage {
    /// WKW dataset directory
    Wkw(WkwDataset),
    /// Stack of TIFF slices
    Tiff(TiffDataset),
}

impl MagStorage {
    /// Storage directory
    pub fn path(&self) -> &Path {
        match self {
            Self::Wkw(wkw) => wkw.root(),
            Self::Tiff(tiff) => tiff.root(),
        }
    }

    /// The WKW dataset, if stored as WKW
    pub const fn as_wkw(&self) -> Option<&WkwDataset> {
        match self {
            Self::Wkw(wkw) => Some(wkw),
            Self::Tiff(_) => None,
        }
    }

    /// The TIFF stack, if stored as TIFF slices
    pub const fn as_tiff(&self) -> Option<&TiffDataset> {
        match self {
            Self::Wkw(_) => None,
            Self::Tiff(tiff) => Some(tiff),
        }
    }

    /// Read a `(channels, x, y, z)` array of `shape` at the voxel `offset`
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails
    pub fn read<T: Element>(&self, offset: [u64; 3], shape: [usize; 3]) -> Result<Array4<T>> {
        match self {
            Self::Wkw(wkw) => wkw.read(offset, shape),
            Self::Tiff(tiff) => tiff.read(offset, shape),
        }
    }

    /// Write `(channels, x, y, z)` data at the voxel `offset`
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails
    pub fn write<T: Element>(&self, offset: [u64; 3], data: ArrayView4<'_, T>) -> Result<()> {
        match self {
            Self::Wkw(wkw) => wkw.write(offset, data),
            Self::Tiff(tiff) => tiff.write(offset, data),
        }
    }
}

impl From<WkwDataset> for MagStorage {
    fn from(wkw: WkwDataset) -> Self {
        Self::Wkw(wkw)
    }
}

impl From<TiffDataset> for MagStorage {
    fn from(tiff: TiffDataset) -> Self {
        Self::Tiff(tiff)
    }
}

/// One magnification of a layer, backed by `<layer>/<mag>/`
#[derive(Debug, Clone)]
pub struct MagDataset {
    mag: Mag,
    storage: MagStorage,
}

impl MagDataset {
    /// Magnification
    pub const fn mag(&self) -> Mag {
        self.mag
    }

    /// Files holding the voxels
    pub const fn storage(&self) -> &MagStorage {
        &self.storage
    }

    /// Directory of this magnification
    pub fn path(&self) -> &Path {
        self.storage.path()
    }

    /// Read `(channels, x, y, z)` data in this magnification's coordinates
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails
    pub fn read<T: Element>(&self, offset: [u64; 3], size: [usize; 3]) -> Result<Array4<T>> {
        self.storage.read(offset, size)
    }

    /// Write `(channels, x, y, z)` data in this magnification's coordinates
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails
    pub fn write<T: Element>(&self, offset: [u64; 3], data: ArrayView4<'_, T>) -> Result<()> {
        self.storage.write(offset, data)
    }
}

/// A named data layer of a dataset
#[derive(Debug, Clone)]
pub struct Layer {
    name: String,
    path: PathBuf,
    category: Category,
    voxel_type: VoxelType,
    num_channels: usize,
    tiff: Option<TiffSettings>,
    mags: BTreeMap<Mag, MagDataset>,
}

impl Layer {
    pub(crate) fn new(
        dataset_path: &Path,
        properties: &LayerProperties,
        tiff: Option<&TiffSettings>,
    ) -> Self {
        Self {
            name: properties.name.clone(),
            path: dataset_path.join(&properties.name),
            category: properties.category,
            voxel_type: properties.element_class,
            num_channels: properties.num_channels,
            tiff: tiff.cloned(),
            mags: BTreeMap::new(),
        }
    }

    /// Layer name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Layer directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Color or segmentation
    pub const fn category(&self) -> Category {
        self.category
    }

    /// Element type of each channel
    pub const fn voxel_type(&self) -> VoxelType {
        self.voxel_type
    }

    /// Channels per voxel
    pub const fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Magnifications from finest to coarsest
    pub fn mags(&self) -> impl Iterator<Item = &MagDataset> {
        self.mags.values()
    }

    /// Look up a magnification
    ///
    /// # Errors
    ///
    /// Returns an error if the magnification is not part of the layer
    pub fn get_mag(&self, mag: Mag) -> Result<&MagDataset> {
        self.mags.get(&mag).ok_or_else(|| CubingError::MagNotFound {
            layer: self.name.clone(),
            mag: mag.to_layer_name(),
        })
    }

    fn mag_path(&self, mag: Mag) -> PathBuf {
        self.path.join(mag.to_layer_name())
    }

    /// Whether the layer stores TIFF slices instead of WKW files
    pub const fn is_tiff(&self) -> bool {
        self.tiff.is_some()
    }

    // Attach an existing magnification directory, creating the WKW header if
    // absent
    pub(crate) fn setup_mag(&mut self, mag: Mag, cube_length: Option<u64>) -> Result<&MagDataset> {
        let mag_path = self.mag_path(mag);
        let storage = match &self.tiff {
            Some(tiff) => self.tiff_storage(&mag_path, tiff)?,
            None if mag_path.join(HEADER_FILE_NAME).is_file() => {
                WkwDataset::open(&mag_path)?.into()
            }
            None => {
                let header = self.header_for(cube_length.unwrap_or(DEFAULT_CUBE_LENGTH))?;
                WkwDataset::create(&mag_path, header)?.into()
            }
        };
        Ok(self.mags.entry(mag).or_insert(MagDataset { mag, storage }))
    }

    pub(crate) fn add_mag(&mut self, mag: Mag, cube_length: u64) -> Result<&MagDataset> {
        if self.mags.contains_key(&mag) {
            return Err(invalid_parameter(
                "mag",
                &mag,
                &format!("layer '{}' already has this magnification", self.name),
            ));
        }
        let mag_path = self.mag_path(mag);
        let storage = match &self.tiff {
            Some(tiff) => self.tiff_storage(&mag_path, tiff)?,
            None => WkwDataset::create(&mag_path, self.header_for(cube_length)?)?.into(),
        };
        log::debug!("Added mag {mag} to layer {}", self.name);
        Ok(self.mags.entry(mag).or_insert(MagDataset { mag, storage }))
    }

    pub(crate) fn delete_mag(&mut self, mag: Mag) -> Result<()> {
        let path = self.get_mag(mag)?.path().to_path_buf();
        std::fs::remove_dir_all(&path).with_path(&path, "delete mag directory")?;
        self.mags.remove(&mag);
        Ok(())
    }

    fn tiff_storage(&self, mag_path: &Path, tiff: &TiffSettings) -> Result<MagStorage> {
        let stack = TiffDataset::create(
            mag_path,
            &tiff.pattern,
            tiff.tile_size,
            self.voxel_type,
            self.num_channels,
        )?;
        Ok(stack.into())
    }

    fn header_for(&self, cube_length: u64) -> Result<Header> {
        let cube_length = usize::try_from(cube_length)
            .map_err(|err| invalid_parameter("cubeLength", &cube_length, &err))?;
        if cube_length < DEFAULT_BLOCK_LEN || cube_length % DEFAULT_BLOCK_LEN != 0 {
            return Err(invalid_parameter(
                "cubeLength",
                &cube_length,
                &format!("must be a multiple of the block length {DEFAULT_BLOCK_LEN}"),
            ));
        }
        Header::new(
            self.voxel_type,
            self.num_channels,
            DEFAULT_BLOCK_LEN,
            cube_length / DEFAULT_BLOCK_LEN,
            BlockType::Raw,
        )
    }
}
