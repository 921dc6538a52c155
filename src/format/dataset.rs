//! Chunked voxel storage in a WKW dataset directory
//!
//! Data files live at `z{z}/y{y}/x{x}.wkw` below the dataset root, each
//! holding `file_len³` blocks of `block_len³` voxels in Morton order.
//! Voxels inside a block are stored x fastest, channels interleaved.

use crate::format::header::{HEADER_SIZE, Header};
use crate::format::morton::morton_encode;
use crate::format::voxel::Element;
use crate::io::configuration::{DATA_FILE_EXTENSION, HEADER_FILE_NAME};
use crate::io::error::{CubingError, Result, WithPath, format_error, invalid_parameter};
use ndarray::{Array4, ArrayView4};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Handle to a WKW dataset directory
#[derive(Debug, Clone)]
pub struct WkwDataset {
    root: PathBuf,
    header: Header,
}

/// Open data file together with the block offset it declares
struct DataFile {
    file: File,
    path: PathBuf,
    data_offset: u64,
}

/// Axis-aligned region in voxel coordinates, `end` exclusive
#[derive(Debug, Clone, Copy)]
struct Region {
    start: [u64; 3],
    end: [u64; 3],
}

impl Region {
    fn from_offset(offset: [u64; 3], shape: [usize; 3]) -> Self {
        Self {
            start: offset,
            end: [
                offset[0] + shape[0] as u64,
                offset[1] + shape[1] as u64,
                offset[2] + shape[2] as u64,
            ],
        }
    }

    fn is_empty(&self) -> bool {
        self.start.iter().zip(self.end).any(|(start, end)| *start >= end)
    }

    fn intersect(&self, other: &Self) -> Self {
        Self {
            start: [
                self.start[0].max(other.start[0]),
                self.start[1].max(other.start[1]),
                self.start[2].max(other.start[2]),
            ],
            end: [
                self.end[0].min(other.end[0]),
                self.end[1].min(other.end[1]),
                self.end[2].min(other.end[2]),
            ],
        }
    }

    // Block indices touched by this region, z outermost
    fn blocks(&self, block_len: u64) -> Vec<[u64; 3]> {
        let first = self.start.map(|v| v / block_len);
        let last = self.end.map(|v| (v - 1) / block_len);
        let mut blocks = Vec::new();
        for bz in first[2]..=last[2] {
            for by in first[1]..=last[1] {
                for bx in first[0]..=last[0] {
                    blocks.push([bx, by, bz]);
                }
            }
        }
        blocks
    }
}

impl WkwDataset {
    /// Create the dataset directory and its `header.wkw`
    ///
    /// An existing dataset with a compatible header is reused as is.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, or an existing
    /// header describes a different layout
    pub fn create(root: &Path, header: Header) -> Result<Self> {
        std::fs::create_dir_all(root).with_path(root, "create dataset directory")?;

        let header_path = root.join(HEADER_FILE_NAME);
        if header_path.is_file() {
            let existing = Header::open(root)?;
            if !existing.is_compatible(&header) {
                return Err(format_error(
                    &header_path,
                    &format!("existing header {existing:?} does not match {header:?}"),
                ));
            }
            return Ok(Self {
                root: root.to_path_buf(),
                header: existing,
            });
        }

        header.save(root)?;
        log::debug!("Created WKW dataset at {}", root.display());
        Ok(Self {
            root: root.to_path_buf(),
            header: Header {
                data_offset: 0,
                ..header
            },
        })
    }

    /// Open an existing dataset directory
    ///
    /// # Errors
    ///
    /// Returns an error if `header.wkw` is missing or invalid
    pub fn open(root: &Path) -> Result<Self> {
        let header = Header::open(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            header,
        })
    }

    /// Dataset directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Dataset header
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Path of the data file with the given file coordinates
    pub fn file_path(&self, file: [u64; 3]) -> PathBuf {
        self.root
            .join(format!("z{}", file[2]))
            .join(format!("y{}", file[1]))
            .join(format!("x{}.{DATA_FILE_EXTENSION}", file[0]))
    }

    /// Write `data` shaped `(channels, x, y, z)` at the voxel `offset`
    ///
    /// Partially covered blocks are read, patched and written back.
    ///
    /// # Errors
    ///
    /// Returns an error if the element type or channel count does not match
    /// the header, the block type is compressed, or file I/O fails
    pub fn write<T: Element>(&self, offset: [u64; 3], data: ArrayView4<'_, T>) -> Result<()> {
        self.check_access::<T>()?;
        let (channels, sx, sy, sz) = data.dim();
        if channels != self.header.num_channels() {
            return Err(invalid_parameter(
                "data",
                &format!("{channels} channels"),
                &format!("dataset has {} channels", self.header.num_channels()),
            ));
        }

        let region = Region::from_offset(offset, [sx, sy, sz]);
        if region.is_empty() {
            return Ok(());
        }

        let block_len = self.header.block_len() as u64;
        let voxel_size = self.header.voxel_size as usize;
        let element_size = T::VOXEL_TYPE.size();
        let mut files: HashMap<[u64; 3], DataFile> = HashMap::new();
        let mut buffer = vec![0u8; self.header.block_size_bytes()];

        for block in region.blocks(block_len) {
            let block_region = self.block_region(block);
            let part = region.intersect(&block_region);
            let full_block = part.start == block_region.start && part.end == block_region.end;

            let (file_coord, index) = self.locate_block(block);
            let data_file = match files.entry(file_coord) {
                std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
                std::collections::hash_map::Entry::Vacant(entry) => {
                    entry.insert(self.open_for_write(file_coord)?)
                }
            };

            if full_block {
                buffer.fill(0);
            } else {
                data_file.read_block(index, &mut buffer)?;
            }

            for z in part.start[2]..part.end[2] {
                for y in part.start[1]..part.end[1] {
                    for x in part.start[0]..part.end[0] {
                        let local = [
                            x - block_region.start[0],
                            y - block_region.start[1],
                            z - block_region.start[2],
                        ];
                        let voxel_start = voxel_index(local, block_len) * voxel_size;
                        for channel in 0..channels {
                            let value = data
                                .get((
                                    channel,
                                    (x - offset[0]) as usize,
                                    (y - offset[1]) as usize,
                                    (z - offset[2]) as usize,
                                ))
                                .copied()
                                .unwrap_or_else(T::zero);
                            let start = voxel_start + channel * element_size;
                            if let Some(dst) = buffer.get_mut(start..start + element_size) {
                                value.write_le(dst);
                            }
                        }
                    }
                }
            }

            data_file.write_block(index, &buffer)?;
        }

        Ok(())
    }

    /// Read a `(channels, x, y, z)` array of `shape` at the voxel `offset`
    ///
    /// Voxels in data files that do not exist read as zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the element type does not match the header, the
    /// block type is compressed, or file I/O fails
    pub fn read<T: Element>(&self, offset: [u64; 3], shape: [usize; 3]) -> Result<Array4<T>> {
        self.check_access::<T>()?;
        let channels = self.header.num_channels();
        let mut out = Array4::<T>::zeros((channels, shape[0], shape[1], shape[2]));

        let region = Region::from_offset(offset, shape);
        if region.is_empty() {
            return Ok(out);
        }

        let block_len = self.header.block_len() as u64;
        let voxel_size = self.header.voxel_size as usize;
        let element_size = T::VOXEL_TYPE.size();
        let mut files: HashMap<[u64; 3], Option<DataFile>> = HashMap::new();
        let mut buffer = vec![0u8; self.header.block_size_bytes()];

        for block in region.blocks(block_len) {
            let (file_coord, index) = self.locate_block(block);
            let data_file = match files.entry(file_coord) {
                std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
                std::collections::hash_map::Entry::Vacant(entry) => {
                    entry.insert(self.open_for_read(file_coord)?)
                }
            };
            let Some(data_file) = data_file else {
                continue;
            };
            data_file.read_block(index, &mut buffer)?;

            let block_region = self.block_region(block);
            let part = region.intersect(&block_region);
            for z in part.start[2]..part.end[2] {
                for y in part.start[1]..part.end[1] {
                    for x in part.start[0]..part.end[0] {
                        let local = [
                            x - block_region.start[0],
                            y - block_region.start[1],
                            z - block_region.start[2],
                        ];
                        let voxel_start = voxel_index(local, block_len) * voxel_size;
                        for channel in 0..channels {
                            let start = voxel_start + channel * element_size;
                            let Some(src) = buffer.get(start..start + element_size) else {
                                continue;
                            };
                            if let Some(dst) = out.get_mut((
                                channel,
                                (x - offset[0]) as usize,
                                (y - offset[1]) as usize,
                                (z - offset[2]) as usize,
                            )) {
                                *dst = T::read_le(src);
                            }
                        }
                    }
                }
            }
        }

        Ok(out)
    }

    fn check_access<T: Element>(&self) -> Result<()> {
        if T::VOXEL_TYPE != self.header.voxel_type {
            return Err(CubingError::VoxelTypeMismatch {
                expected: self.header.voxel_type,
                found: T::VOXEL_TYPE,
            });
        }
        if self.header.block_type.is_compressed() {
            return Err(CubingError::Unsupported {
                feature: format!("{:?} block encoding", self.header.block_type),
            });
        }
        Ok(())
    }

    fn block_region(&self, block: [u64; 3]) -> Region {
        let block_len = self.header.block_len() as u64;
        let start = block.map(|b| b * block_len);
        Region {
            start,
            end: start.map(|s| s + block_len),
        }
    }

    // File coordinates and Morton index of a global block
    fn locate_block(&self, block: [u64; 3]) -> ([u64; 3], u64) {
        let file_len = self.header.file_len() as u64;
        let file = block.map(|b| b / file_len);
        let inner = block.map(|b| b % file_len);
        (file, morton_encode(inner))
    }

    fn open_for_write(&self, file_coord: [u64; 3]) -> Result<DataFile> {
        let path = self.file_path(file_coord);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_path(parent, "create directory")?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_path(&path, "open data file")?;

        let file_header = self.header.for_data_file();
        let expected_len =
            HEADER_SIZE + self.header.blocks_per_file() * self.header.block_size_bytes() as u64;
        let len = file.metadata().with_path(&path, "stat data file")?.len();

        let data_offset = if len < HEADER_SIZE {
            let mut bytes = Vec::with_capacity(HEADER_SIZE as usize);
            file_header
                .write_to(&mut bytes)
                .with_path(&path, "encode data file header")?;
            file.write_all(&bytes)
                .with_path(&path, "write data file header")?;
            file_header.data_offset
        } else {
            file.seek(SeekFrom::Start(0))
                .with_path(&path, "seek data file")?;
            let existing = Header::read_from(&mut file, &path)?;
            if !existing.is_compatible(&self.header) {
                return Err(format_error(&path, &"data file header does not match dataset"));
            }
            existing.data_offset
        };

        if len < expected_len {
            file.set_len(expected_len)
                .with_path(&path, "allocate data file")?;
        }

        Ok(DataFile {
            file,
            path,
            data_offset,
        })
    }

    fn open_for_read(&self, file_coord: [u64; 3]) -> Result<Option<DataFile>> {
        let path = self.file_path(file_coord);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(crate::io::error::file_system(&path, "open data file", e)),
        };
        let mut reader = BufReader::new(file);
        let existing = Header::read_from(&mut reader, &path)?;
        if !existing.is_compatible(&self.header) {
            return Err(format_error(&path, &"data file header does not match dataset"));
        }
        Ok(Some(DataFile {
            file: reader.into_inner(),
            path,
            data_offset: existing.data_offset,
        }))
    }
}

impl DataFile {
    fn block_position(&self, index: u64, block_bytes: usize) -> u64 {
        self.data_offset + index * block_bytes as u64
    }

    fn read_block(&mut self, index: u64, buffer: &mut [u8]) -> Result<()> {
        let position = self.block_position(index, buffer.len());
        self.file
            .seek(SeekFrom::Start(position))
            .with_path(&self.path, "seek block")?;
        self.file
            .read_exact(buffer)
            .with_path(&self.path, "read block")
    }

    fn write_block(&mut self, index: u64, buffer: &[u8]) -> Result<()> {
        let position = self.block_position(index, buffer.len());
        self.file
            .seek(SeekFrom::Start(position))
            .with_path(&self.path, "seek block")?;
        self.file
            .write_all(buffer)
            .with_path(&self.path, "write block")
    }
}

const fn voxel_index(local: [u64; 3], block_len: u64) -> usize {
    ((local[2] * block_len + local[1]) * block_len + local[0]) as usize
}
