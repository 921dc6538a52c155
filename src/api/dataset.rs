//! Dataset: a directory of layers described by `datasource-properties.json`
//!
//! Layers store their magnifications as WKW files, or as TIFF slices when
//! the properties carry an image name pattern. Every mutation of the layer
//! structure is written back to the properties file immediately, so the
//! on-disk metadata always matches the directories.

use crate::api::layer::{Layer, MagDataset};
use crate::api::mag::Mag;
use crate::api::properties::{
    BoundingBox, Category, DatasourceProperties, LayerProperties, TiffSettings, WkwResolution,
};
use crate::api::view::View;
use crate::format::voxel::VoxelType;
use crate::io::configuration::{DEFAULT_CUBE_LENGTH, PROPERTIES_FILE_NAME};
use crate::io::error::{CubingError, Result, WithPath, invalid_parameter};
use crate::io::image::tiff_supports;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default size of [`Dataset::get_slice`] views
pub const DEFAULT_SLICE_SIZE: [usize; 3] = [1024, 1024, 1024];

/// Open dataset with its layers
#[derive(Debug)]
pub struct Dataset {
    path: PathBuf,
    properties: DatasourceProperties,
    layers: BTreeMap<String, Layer>,
}

impl Dataset {
    /// Create an empty dataset; its name is the last path component
    ///
    /// # Errors
    ///
    /// Returns an error if `path` already exists or cannot be created
    pub fn create(path: &Path, scale: [f64; 3]) -> Result<Self> {
        Self::create_with_properties(path, DatasourceProperties::new(&dataset_name(path), scale))
    }

    /// Create an empty dataset storing one TIFF image per z slice
    ///
    /// `pattern` names the images inside each magnification directory and
    /// needs a `{z}` placeholder, e.g. `{z}.tif`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is invalid, or `path` already exists
    /// or cannot be created
    pub fn create_tiff(path: &Path, scale: [f64; 3], pattern: &str) -> Result<Self> {
        let tiff = TiffSettings::new(pattern, None)?;
        let properties = DatasourceProperties::new_tiff(&dataset_name(path), scale, tiff);
        Self::create_with_properties(path, properties)
    }

    /// Create an empty dataset storing every z slice as TIFF tiles
    ///
    /// `pattern` needs `{x}`, `{y}` and `{z}` placeholders, e.g.
    /// `{z}/{y}/{x}.tif`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern or tile size is invalid, or `path`
    /// already exists or cannot be created
    pub fn create_tiff_tiled(
        path: &Path,
        scale: [f64; 3],
        tile_size: [u32; 2],
        pattern: &str,
    ) -> Result<Self> {
        let tiff = TiffSettings::new(pattern, Some(tile_size))?;
        let properties = DatasourceProperties::new_tiff(&dataset_name(path), scale, tiff);
        Self::create_with_properties(path, properties)
    }

    /// Create a dataset from prepared properties
    ///
    /// # Errors
    ///
    /// Returns an error if `path` already exists, or the directories or the
    /// properties file cannot be written
    pub fn create_with_properties(path: &Path, properties: DatasourceProperties) -> Result<Self> {
        if path.exists() {
            return Err(CubingError::DatasetExists {
                path: path.to_path_buf(),
            });
        }
        std::fs::create_dir_all(path).with_path(path, "create dataset directory")?;

        let dataset = Self::from_properties(path, properties)?;
        dataset.export_properties()?;
        log::info!("Created dataset {} at {}", dataset.properties.id.name, path.display());
        Ok(dataset)
    }

    /// Open an existing dataset
    ///
    /// # Errors
    ///
    /// Returns an error if the properties file or a magnification header
    /// cannot be read
    pub fn open(path: &Path) -> Result<Self> {
        let properties = DatasourceProperties::from_json_file(&path.join(PROPERTIES_FILE_NAME))?;
        Self::from_properties(path, properties)
    }

    /// Open the dataset at `path`, creating it if it has no properties file
    ///
    /// # Errors
    ///
    /// Returns an error if opening or creating fails
    pub fn open_or_create(path: &Path, scale: [f64; 3]) -> Result<Self> {
        if path.join(PROPERTIES_FILE_NAME).is_file() {
            return Self::open(path);
        }
        if path.is_dir() {
            // An existing but empty target directory is adopted
            let properties = DatasourceProperties::new(&dataset_name(path), scale);
            let dataset = Self::from_properties(path, properties)?;
            dataset.export_properties()?;
            return Ok(dataset);
        }
        Self::create(path, scale)
    }

    fn from_properties(path: &Path, properties: DatasourceProperties) -> Result<Self> {
        let mut layers = BTreeMap::new();
        for layer_properties in &properties.data_layers {
            let mut layer = Layer::new(path, layer_properties, properties.tiff.as_ref());
            for resolution in &layer_properties.wkw_resolutions {
                layer.setup_mag(resolution.resolution, resolution.cube_length)?;
            }
            layers.insert(layer_properties.name.clone(), layer);
        }

        Ok(Self {
            path: path.to_path_buf(),
            properties,
            layers,
        })
    }

    /// Dataset directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// TIFF stack layout, `None` for WKW datasets
    pub const fn tiff(&self) -> Option<&TiffSettings> {
        self.properties.tiff.as_ref()
    }

    /// Current metadata
    pub const fn properties(&self) -> &DatasourceProperties {
        &self.properties
    }

    /// Layers ordered by name
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    /// Look up a layer
    ///
    /// # Errors
    ///
    /// Returns an error if the layer does not exist
    pub fn get_layer(&self, name: &str) -> Result<&Layer> {
        self.layers.get(name).ok_or_else(|| CubingError::LayerNotFound {
            name: name.to_string(),
        })
    }

    /// Add an empty layer
    ///
    /// # Errors
    ///
    /// Returns an error if a layer with that name exists, a TIFF dataset
    /// cannot store the voxel type and channel count, or the properties
    /// cannot be written
    pub fn add_layer(
        &mut self,
        name: &str,
        category: Category,
        voxel_type: VoxelType,
        num_channels: usize,
    ) -> Result<&Layer> {
        if self.layers.contains_key(name) {
            return Err(CubingError::LayerExists {
                name: name.to_string(),
            });
        }
        if num_channels == 0 {
            return Err(invalid_parameter(
                "num_channels",
                &num_channels,
                &"must be at least 1",
            ));
        }
        if self.properties.tiff.is_some() && !tiff_supports(voxel_type, num_channels) {
            return Err(CubingError::Unsupported {
                feature: format!("TIFF layers with {num_channels} channel(s) of {voxel_type}"),
            });
        }

        let layer_properties = LayerProperties::new(name, category, voxel_type, num_channels);
        let layer = Layer::new(&self.path, &layer_properties, self.properties.tiff.as_ref());
        std::fs::create_dir_all(layer.path()).with_path(layer.path(), "create layer directory")?;

        self.properties.add_layer(layer_properties);
        self.export_properties()?;
        log::debug!("Added layer {name} ({category}, {voxel_type}, {num_channels} channels)");
        Ok(self.layers.entry(name.to_string()).or_insert(layer))
    }

    /// Return the layer if it matches the request, otherwise add it
    ///
    /// # Errors
    ///
    /// Returns an error if an existing layer differs in category, voxel type
    /// or channel count, or adding fails
    pub fn get_or_add_layer(
        &mut self,
        name: &str,
        category: Category,
        voxel_type: VoxelType,
        num_channels: usize,
    ) -> Result<&Layer> {
        if !self.layers.contains_key(name) {
            return self.add_layer(name, category, voxel_type, num_channels);
        }
        let existing = self.get_layer(name)?;

        let mismatch = if existing.category() != category {
            Some(format!("its category is {}", existing.category()))
        } else if existing.voxel_type() != voxel_type {
            Some(format!("its dtype is {}", existing.voxel_type()))
        } else if existing.num_channels() != num_channels {
            Some(format!("it has {} channels", existing.num_channels()))
        } else {
            None
        };

        match mismatch {
            Some(reason) => Err(CubingError::LayerMismatch {
                name: name.to_string(),
                reason,
            }),
            None => Ok(existing),
        }
    }

    /// Remove a layer and its files
    ///
    /// # Errors
    ///
    /// Returns an error if the layer does not exist or deletion fails
    pub fn delete_layer(&mut self, name: &str) -> Result<()> {
        let path = self.get_layer(name)?.path().to_path_buf();
        if path.exists() {
            std::fs::remove_dir_all(&path).with_path(&path, "delete layer directory")?;
        }

        self.layers.remove(name);
        self.properties.delete_layer(name);
        self.export_properties()?;
        log::debug!("Deleted layer {name}");
        Ok(())
    }

    /// Add a magnification, WKW layers with the default cube length
    ///
    /// # Errors
    ///
    /// Returns an error if the layer is missing, already has the
    /// magnification, or files cannot be written
    pub fn add_mag(&mut self, layer_name: &str, mag: Mag) -> Result<&MagDataset> {
        let layer = self.layer_mut(layer_name)?;
        layer.add_mag(mag, DEFAULT_CUBE_LENGTH)?;
        let cube_length = (!layer.is_tiff()).then_some(DEFAULT_CUBE_LENGTH);
        self.record_mag(layer_name, mag, cube_length)?;
        self.get_layer(layer_name)?.get_mag(mag)
    }

    /// Return the magnification, adding it if absent
    ///
    /// # Errors
    ///
    /// Returns an error if the layer is missing or adding fails
    pub fn get_or_add_mag(&mut self, layer_name: &str, mag: Mag) -> Result<&MagDataset> {
        if self.get_layer(layer_name)?.get_mag(mag).is_ok() {
            return self.get_layer(layer_name)?.get_mag(mag);
        }
        self.add_mag(layer_name, mag)
    }

    /// Remove a magnification and its files
    ///
    /// # Errors
    ///
    /// Returns an error if the layer or magnification is missing or
    /// deletion fails
    pub fn delete_mag(&mut self, layer_name: &str, mag: Mag) -> Result<()> {
        self.layer_mut(layer_name)?.delete_mag(mag)?;
        if let Some(layer) = self.properties.layer_mut(layer_name) {
            layer.delete_resolution(mag);
        }
        self.export_properties()
    }

    /// View of `size` voxels at `global_offset` in one magnification
    ///
    /// # Errors
    ///
    /// Returns an error if the layer or magnification is missing
    pub fn get_slice(
        &self,
        layer_name: &str,
        mag: Mag,
        size: [usize; 3],
        global_offset: [u64; 3],
    ) -> Result<View> {
        let mag_dataset = self.get_layer(layer_name)?.get_mag(mag)?;
        Ok(View::new(mag_dataset.storage().clone(), global_offset, size))
    }

    /// Replace the bounding box of a layer
    ///
    /// # Errors
    ///
    /// Returns an error if the layer is missing or the properties cannot be
    /// written
    pub fn set_bounding_box(&mut self, layer_name: &str, offset: [i64; 3], size: [u64; 3]) -> Result<()> {
        self.layer_properties_mut(layer_name)?.bounding_box = BoundingBox::new(offset, size);
        self.export_properties()
    }

    /// Grow the bounding box of a layer to include a region
    ///
    /// # Errors
    ///
    /// Returns an error if the layer is missing or the properties cannot be
    /// written
    pub fn expand_bounding_box(&mut self, layer_name: &str, offset: [i64; 3], size: [u64; 3]) -> Result<()> {
        let layer = self.layer_properties_mut(layer_name)?;
        layer.bounding_box = layer.bounding_box.union(&BoundingBox::new(offset, size));
        self.export_properties()
    }

    fn layer_mut(&mut self, name: &str) -> Result<&mut Layer> {
        self.layers.get_mut(name).ok_or_else(|| CubingError::LayerNotFound {
            name: name.to_string(),
        })
    }

    fn layer_properties_mut(&mut self, name: &str) -> Result<&mut LayerProperties> {
        self.properties
            .layer_mut(name)
            .ok_or_else(|| CubingError::LayerNotFound {
                name: name.to_string(),
            })
    }

    fn record_mag(&mut self, layer_name: &str, mag: Mag, cube_length: Option<u64>) -> Result<()> {
        self.layer_properties_mut(layer_name)?
            .add_resolution(WkwResolution {
                resolution: mag,
                cube_length,
            });
        self.export_properties()
    }

    fn export_properties(&self) -> Result<()> {
        self.properties
            .export_as_json(&self.path.join(PROPERTIES_FILE_NAME))
    }
}

// Datasets are named after their directory
fn dataset_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().to_string())
}
