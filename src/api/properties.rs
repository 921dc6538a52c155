//! `datasource-properties.json` model
//!
//! The file describes the dataset identity, its voxel scale and every data
//! layer with element class, channel count, bounding box and the stored
//! magnifications. Unknown keys are carried along so files written by other
//! tools survive a rewrite.

use crate::api::mag::Mag;
use crate::cubing::pattern::{Axis, InputPattern};
use crate::format::header::Header;
use crate::format::voxel::VoxelType;
use crate::io::configuration::{EMPTY_BOUNDING_BOX_TOP_LEFT, PROPERTIES_INDENT};
use crate::io::error::{CubingError, Result, WithPath, invalid_parameter};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::path::Path;

/// Dataset name and owning team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetId {
    /// Dataset name, by default the directory name
    pub name: String,
    /// Owning team, empty if unassigned
    #[serde(default)]
    pub team: String,
}

/// Kind of data stored in a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Intensity data
    Color,
    /// Label data
    Segmentation,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Color => f.write_str("color"),
            Self::Segmentation => f.write_str("segmentation"),
        }
    }
}

impl std::str::FromStr for Category {
    type Err = CubingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "color" => Ok(Self::Color),
            "segmentation" => Ok(Self::Segmentation),
            other => Err(invalid_parameter(
                "category",
                &other,
                &"expected 'color' or 'segmentation'",
            )),
        }
    }
}

/// Layer bounding box in mag 1 voxel coordinates
///
/// A top left corner of `[-1, -1, -1]` with zero extent marks a layer
/// without data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoundingBox {
    /// Minimum corner
    pub top_left: [i64; 3],
    /// Extent along x
    pub width: u64,
    /// Extent along y
    pub height: u64,
    /// Extent along z
    pub depth: u64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            top_left: EMPTY_BOUNDING_BOX_TOP_LEFT,
            width: 0,
            height: 0,
            depth: 0,
        }
    }
}

impl BoundingBox {
    /// Box from a corner and an extent
    pub const fn new(top_left: [i64; 3], size: [u64; 3]) -> Self {
        Self {
            top_left,
            width: size[0],
            height: size[1],
            depth: size[2],
        }
    }

    /// Whether the box holds no voxels
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.depth == 0
    }

    /// Extent as `[width, height, depth]`
    pub const fn size(&self) -> [u64; 3] {
        [self.width, self.height, self.depth]
    }

    /// Minimum corner
    pub const fn offset(&self) -> [i64; 3] {
        self.top_left
    }

    /// Smallest box containing both boxes; empty boxes are ignored
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }

        let mut top_left = [0i64; 3];
        let mut size = [0u64; 3];
        let axes = self
            .top_left
            .iter()
            .zip(self.size())
            .zip(other.top_left.iter().zip(other.size()));
        for ((out_start, out_len), ((a_start, a_len), (b_start, b_len))) in
            top_left.iter_mut().zip(size.iter_mut()).zip(axes)
        {
            let start = (*a_start).min(*b_start);
            let end = (a_start + a_len as i64).max(b_start + b_len as i64);
            *out_start = start;
            *out_len = (end - start) as u64;
        }
        Self::new(top_left, size)
    }
}

/// One stored magnification of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WkwResolution {
    /// Magnification
    pub resolution: Mag,
    /// Side length of one WKW file in voxels, absent for TIFF stacks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cube_length: Option<u64>,
}

/// Layout of a dataset stored as TIFF slices
///
/// Written at the top level of the properties file as `pattern`,
/// `tile_size` and `grid_shape`. An untiled stack stores `tile_size` as an
/// empty object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TiffSettings {
    /// Image file name pattern inside each magnification directory
    pub pattern: String,
    /// Tile width and height, `None` for one image per slice
    pub tile_size: Option<[u32; 2]>,
    /// Extent of the tile grid, carried along as recorded
    pub grid_shape: [u64; 2],
}

impl TiffSettings {
    /// Validated settings with an empty grid
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern lacks `{z}`, or for tiled stacks
    /// `{x}` and `{y}`, or a tile side is zero
    pub fn new(pattern: &str, tile_size: Option<[u32; 2]>) -> Result<Self> {
        let required: &[Axis] = if tile_size.is_some() { &Axis::ALL } else { &[Axis::Z] };
        InputPattern::parse_with_axes(pattern, required)?;
        if let Some(size) = tile_size.filter(|size| size.contains(&0)) {
            return Err(invalid_parameter("tile_size", &format!("{size:?}"), &"must be positive"));
        }
        Ok(Self {
            pattern: pattern.to_string(),
            tile_size,
            grid_shape: [0, 0],
        })
    }

    // Top level keys of a properties file; no pattern means a WKW dataset
    fn from_stored(
        pattern: Option<String>,
        tile_size: Option<Value>,
        grid_shape: Option<[u64; 2]>,
        path: &Path,
    ) -> Result<Option<Self>> {
        let Some(pattern) = pattern else {
            return Ok(None);
        };
        let tile_size = match tile_size {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) if map.is_empty() => None,
            Some(value) => Some(serde_json::from_value::<[u32; 2]>(value).map_err(|source| {
                CubingError::Properties {
                    path: path.to_path_buf(),
                    source,
                }
            })?),
        };
        Ok(Some(Self {
            pattern,
            tile_size,
            grid_shape: grid_shape.unwrap_or_default(),
        }))
    }
}

impl Serialize for TiffSettings {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("pattern", &self.pattern)?;
        let tile_size = self
            .tile_size
            .map_or_else(|| Value::Object(Map::new()), |size| Value::from(size.to_vec()));
        map.serialize_entry("tile_size", &tile_size)?;
        map.serialize_entry("grid_shape", &self.grid_shape)?;
        map.end()
    }
}

/// Metadata of one data layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerProperties {
    /// Layer name, also its directory name
    pub name: String,
    /// Color or segmentation
    pub category: Category,
    /// Element type of each channel
    pub element_class: VoxelType,
    /// Channels per voxel
    #[serde(rename = "num_channels")]
    pub num_channels: usize,
    /// Region holding data
    pub bounding_box: BoundingBox,
    /// Stored magnifications in insertion order
    pub wkw_resolutions: Vec<WkwResolution>,
    /// Highest label id, segmentation layers only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub largest_segment_id: Option<u64>,
    /// Keys this tool does not interpret
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

// On-disk shape of a layer, where the channel count may be missing
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredLayer {
    name: String,
    category: Category,
    element_class: VoxelType,
    #[serde(rename = "num_channels", default)]
    num_channels: Option<usize>,
    #[serde(default)]
    bounding_box: BoundingBox,
    #[serde(default)]
    wkw_resolutions: Vec<WkwResolution>,
    #[serde(default)]
    largest_segment_id: Option<u64>,
    #[serde(flatten)]
    attributes: Map<String, Value>,
}

impl LayerProperties {
    /// Metadata for a new, empty layer
    pub fn new(name: &str, category: Category, element_class: VoxelType, num_channels: usize) -> Self {
        Self {
            name: name.to_string(),
            category,
            element_class,
            num_channels,
            bounding_box: BoundingBox::default(),
            wkw_resolutions: Vec::new(),
            largest_segment_id: (category == Category::Segmentation).then_some(0),
            attributes: Map::new(),
        }
    }

    /// Whether the magnification is recorded
    pub fn has_mag(&self, mag: Mag) -> bool {
        self.wkw_resolutions.iter().any(|r| r.resolution == mag)
    }

    /// Record a magnification unless already present
    pub fn add_resolution(&mut self, resolution: WkwResolution) -> bool {
        if self.has_mag(resolution.resolution) {
            return false;
        }
        self.wkw_resolutions.push(resolution);
        true
    }

    /// Forget a magnification
    pub fn delete_resolution(&mut self, mag: Mag) -> bool {
        let before = self.wkw_resolutions.len();
        self.wkw_resolutions.retain(|r| r.resolution != mag);
        self.wkw_resolutions.len() != before
    }

    /// Bounding box extent
    pub const fn bounding_box_size(&self) -> [u64; 3] {
        self.bounding_box.size()
    }

    /// Bounding box corner
    pub const fn bounding_box_offset(&self) -> [i64; 3] {
        self.bounding_box.offset()
    }

    fn from_stored(stored: StoredLayer, dataset_dir: &Path, tiff: bool) -> Result<Self> {
        let num_channels = match stored.num_channels {
            Some(n) => n,
            None if tiff => 1,
            None => channels_from_header(dataset_dir, &stored.name, stored.wkw_resolutions.first())?,
        };
        Ok(Self {
            name: stored.name,
            category: stored.category,
            element_class: stored.element_class,
            num_channels,
            bounding_box: stored.bounding_box,
            wkw_resolutions: stored.wkw_resolutions,
            largest_segment_id: stored.largest_segment_id,
            attributes: stored.attributes,
        })
    }
}

// Datasets not written by this tool may lack `num_channels`; the header of
// the first magnification knows it
fn channels_from_header(
    dataset_dir: &Path,
    layer: &str,
    first: Option<&WkwResolution>,
) -> Result<usize> {
    let mag_name = first.map_or_else(|| Mag::ONE.to_layer_name(), |r| r.resolution.to_layer_name());
    let mag_dir = dataset_dir.join(layer).join(mag_name);
    let header_path = mag_dir.join(crate::io::configuration::HEADER_FILE_NAME);
    if !header_path.is_file() {
        return Err(CubingError::MissingChannelCount {
            layer: layer.to_string(),
            header: header_path,
        });
    }
    Ok(Header::open(&mag_dir)?.num_channels())
}

/// Contents of `datasource-properties.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceProperties {
    /// Dataset identity
    pub id: DatasetId,
    /// Voxel size in nanometers
    pub scale: [f64; 3],
    /// Layers in insertion order
    pub data_layers: Vec<LayerProperties>,
    /// TIFF stack layout, `None` for WKW datasets
    #[serde(flatten)]
    pub tiff: Option<TiffSettings>,
    /// Keys this tool does not interpret
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredProperties {
    id: DatasetId,
    scale: [f64; 3],
    #[serde(default)]
    data_layers: Vec<StoredLayer>,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(rename = "tile_size", default)]
    tile_size: Option<Value>,
    #[serde(rename = "grid_shape", default)]
    grid_shape: Option<[u64; 2]>,
    #[serde(flatten)]
    attributes: Map<String, Value>,
}

impl DatasourceProperties {
    /// Properties of a dataset without layers
    pub fn new(name: &str, scale: [f64; 3]) -> Self {
        Self {
            id: DatasetId {
                name: name.to_string(),
                team: String::new(),
            },
            scale,
            data_layers: Vec::new(),
            tiff: None,
            attributes: Map::new(),
        }
    }

    /// Properties of a TIFF dataset without layers
    pub fn new_tiff(name: &str, scale: [f64; 3], tiff: TiffSettings) -> Self {
        Self {
            tiff: Some(tiff),
            ..Self::new(name, scale)
        }
    }

    /// Load from a properties file, resolving missing channel counts from
    /// the WKW headers next to it
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or a channel
    /// count cannot be determined
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_path(path, "read properties")?;
        let stored: StoredProperties =
            serde_json::from_str(&content).map_err(|source| CubingError::Properties {
                path: path.to_path_buf(),
                source,
            })?;

        let tiff = TiffSettings::from_stored(stored.pattern, stored.tile_size, stored.grid_shape, path)?;
        let dataset_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let data_layers = stored
            .data_layers
            .into_iter()
            .map(|layer| LayerProperties::from_stored(layer, dataset_dir, tiff.is_some()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            id: stored.id,
            scale: stored.scale,
            data_layers,
            tiff,
            attributes: stored.attributes,
        })
    }

    /// Serialize with four space indentation
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_json(&self, path: &Path) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(PROPERTIES_INDENT);
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut serializer)
            .map_err(|source| CubingError::Properties {
                path: path.to_path_buf(),
                source,
            })?;
        out.push(b'\n');
        Ok(out)
    }

    /// Write the properties file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn export_as_json(&self, path: &Path) -> Result<()> {
        let json = self.to_json(path)?;
        std::fs::write(path, json).with_path(path, "write properties")
    }

    /// Look up a layer by name
    pub fn layer(&self, name: &str) -> Option<&LayerProperties> {
        self.data_layers.iter().find(|l| l.name == name)
    }

    /// Look up a layer by name for modification
    pub fn layer_mut(&mut self, name: &str) -> Option<&mut LayerProperties> {
        self.data_layers.iter_mut().find(|l| l.name == name)
    }

    /// Append a layer unless one with that name exists
    pub fn add_layer(&mut self, layer: LayerProperties) -> bool {
        if self.layer(&layer.name).is_some() {
            return false;
        }
        self.data_layers.push(layer);
        true
    }

    /// Remove a layer, returning its metadata
    pub fn delete_layer(&mut self, name: &str) -> Option<LayerProperties> {
        let index = self.data_layers.iter().position(|l| l.name == name)?;
        Some(self.data_layers.remove(index))
    }
}
