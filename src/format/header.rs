//! WKW file header
//!
//! Every WKW dataset directory carries a `header.wkw` describing the voxel
//! type, channel count and chunk geometry. Each data file starts with the same
//! 16 byte header, differing only in its data offset.

use crate::format::voxel::VoxelType;
use crate::io::configuration::{DEFAULT_BLOCK_LEN, DEFAULT_FILE_LEN, HEADER_FILE_NAME};
use crate::io::error::{Result, WithPath, format_error, invalid_parameter};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

/// File magic
pub const MAGIC: &[u8; 3] = b"WKW";
/// Supported format version
pub const VERSION: u8 = 1;
/// Serialized header size in bytes
pub const HEADER_SIZE: u64 = 16;
/// Largest accepted log2 of the block side length
pub const MAX_BLOCK_LEN_LOG2: u8 = 6;
/// Largest accepted log2 of the file side length in blocks
pub const MAX_FILE_LEN_LOG2: u8 = 7;

/// Encoding of the blocks in a data file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    /// Uncompressed blocks at fixed positions
    Raw = 1,
    /// LZ4 compressed blocks behind a jump table
    Lz4 = 2,
    /// LZ4 high-compression blocks behind a jump table
    Lz4Hc = 3,
}

impl BlockType {
    /// Look up a block type by its header code
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Raw),
            2 => Some(Self::Lz4),
            3 => Some(Self::Lz4Hc),
            _ => None,
        }
    }

    /// Whether blocks are compressed
    pub const fn is_compressed(self) -> bool {
        !matches!(self, Self::Raw)
    }
}

/// Parsed WKW header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Element type of each channel
    pub voxel_type: VoxelType,
    /// Bytes per voxel, all channels included
    pub voxel_size: u8,
    /// Block encoding
    pub block_type: BlockType,
    /// log2 of the block side length in voxels
    pub block_len_log2: u8,
    /// log2 of the file side length in blocks
    pub file_len_log2: u8,
    /// Byte offset of the first block
    pub data_offset: u64,
}

impl Header {
    /// Create a header for a new dataset
    ///
    /// # Errors
    ///
    /// Returns an error if a length is not a power of two, the channel count is
    /// zero, or the voxel size does not fit into a byte
    pub fn new(
        voxel_type: VoxelType,
        num_channels: usize,
        block_len: usize,
        file_len: usize,
        block_type: BlockType,
    ) -> Result<Self> {
        let block_len_log2 = log2_len("block_len", block_len, MAX_BLOCK_LEN_LOG2)?;
        let file_len_log2 = log2_len("file_len", file_len, MAX_FILE_LEN_LOG2)?;

        if num_channels == 0 {
            return Err(invalid_parameter(
                "num_channels",
                &num_channels,
                &"must be at least 1",
            ));
        }
        let voxel_size = u8::try_from(voxel_type.size() * num_channels).map_err(|err| {
            let reason = format!("voxel size exceeds 255 bytes ({err})");
            invalid_parameter("num_channels", &num_channels, &reason)
        })?;

        Ok(Self {
            voxel_type,
            voxel_size,
            block_type,
            block_len_log2,
            file_len_log2,
            data_offset: 0,
        })
    }

    /// Raw header with the default 32³ blocks in 32³ block files
    ///
    /// # Errors
    ///
    /// Returns an error if the channel count is invalid
    pub fn raw(voxel_type: VoxelType, num_channels: usize) -> Result<Self> {
        Self::new(
            voxel_type,
            num_channels,
            DEFAULT_BLOCK_LEN,
            DEFAULT_FILE_LEN,
            BlockType::Raw,
        )
    }

    /// Block side length in voxels
    pub const fn block_len(&self) -> usize {
        1 << self.block_len_log2
    }

    /// File side length in blocks
    pub const fn file_len(&self) -> usize {
        1 << self.file_len_log2
    }

    /// File side length in voxels
    pub const fn cube_length(&self) -> usize {
        self.block_len() * self.file_len()
    }

    /// Number of channels per voxel
    pub const fn num_channels(&self) -> usize {
        self.voxel_size as usize / self.voxel_type.size()
    }

    /// Bytes in one block
    pub const fn block_size_bytes(&self) -> usize {
        let len = self.block_len();
        len * len * len * self.voxel_size as usize
    }

    /// Number of blocks in one file
    pub const fn blocks_per_file(&self) -> u64 {
        let len = self.file_len() as u64;
        len * len * len
    }

    /// Copy of this header as stored at the top of a data file
    pub const fn for_data_file(&self) -> Self {
        Self {
            data_offset: HEADER_SIZE,
            ..*self
        }
    }

    /// Whether two headers describe the same dataset layout
    pub fn is_compatible(&self, other: &Self) -> bool {
        Self {
            data_offset: 0,
            ..*self
        } == Self {
            data_offset: 0,
            ..*other
        }
    }

    /// Serialize the header
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(MAGIC)?;
        writer.write_u8(VERSION)?;
        writer.write_u8((self.file_len_log2 << 4) | (self.block_len_log2 & 0x0f))?;
        writer.write_u8(self.block_type as u8)?;
        writer.write_u8(self.voxel_type.code())?;
        writer.write_u8(self.voxel_size)?;
        writer.write_u64::<LittleEndian>(self.data_offset)?;
        Ok(())
    }

    /// Parse a header, `path` is only used for error messages
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or any field is invalid
    pub fn read_from<R: Read>(reader: &mut R, path: &Path) -> Result<Self> {
        let mut magic = [0u8; 3];
        reader
            .read_exact(&mut magic)
            .with_path(path, "read header")?;
        if &magic != MAGIC {
            return Err(format_error(path, &"bad magic bytes"));
        }

        let version = reader.read_u8().with_path(path, "read header")?;
        if version != VERSION {
            return Err(format_error(path, &format!("unsupported version {version}")));
        }

        let per_dim_log2 = reader.read_u8().with_path(path, "read header")?;
        let block_type_code = reader.read_u8().with_path(path, "read header")?;
        let voxel_type_code = reader.read_u8().with_path(path, "read header")?;
        let voxel_size = reader.read_u8().with_path(path, "read header")?;
        let data_offset = reader
            .read_u64::<LittleEndian>()
            .with_path(path, "read header")?;

        let block_type = BlockType::from_code(block_type_code)
            .ok_or_else(|| format_error(path, &format!("unknown block type {block_type_code}")))?;
        let voxel_type = VoxelType::from_code(voxel_type_code)
            .ok_or_else(|| format_error(path, &format!("unknown voxel type {voxel_type_code}")))?;

        if voxel_size == 0 || voxel_size as usize % voxel_type.size() != 0 {
            return Err(format_error(
                path,
                &format!("voxel size {voxel_size} does not fit voxel type {voxel_type}"),
            ));
        }

        let block_len_log2 = per_dim_log2 & 0x0f;
        let file_len_log2 = per_dim_log2 >> 4;
        if block_len_log2 > MAX_BLOCK_LEN_LOG2 || file_len_log2 > MAX_FILE_LEN_LOG2 {
            return Err(format_error(
                path,
                &format!(
                    "block length 2^{block_len_log2} or file length 2^{file_len_log2} exceeds \
                     2^{MAX_BLOCK_LEN_LOG2} voxels per block and 2^{MAX_FILE_LEN_LOG2} blocks per file"
                ),
            ));
        }

        Ok(Self {
            voxel_type,
            voxel_size,
            block_type,
            block_len_log2,
            file_len_log2,
            data_offset,
        })
    }

    /// Read `header.wkw` from a dataset directory
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsed
    pub fn open(dataset_root: &Path) -> Result<Self> {
        let path = dataset_root.join(HEADER_FILE_NAME);
        let file = File::open(&path).with_path(&path, "open header")?;
        Self::read_from(&mut BufReader::new(file), &path)
    }

    /// Write `header.wkw` into a dataset directory
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save(&self, dataset_root: &Path) -> Result<()> {
        let path = dataset_root.join(HEADER_FILE_NAME);
        let mut bytes = Vec::with_capacity(HEADER_SIZE as usize);
        Self {
            data_offset: 0,
            ..*self
        }
        .write_to(&mut bytes)
        .with_path(&path, "encode header")?;
        std::fs::write(&path, bytes).with_path(&path, "write header")
    }
}

fn log2_len(parameter: &'static str, len: usize, max_log2: u8) -> Result<u8> {
    if !len.is_power_of_two() || len.trailing_zeros() > u32::from(max_log2) {
        return Err(invalid_parameter(
            parameter,
            &len,
            &format!("must be a power of two up to 2^{max_log2}"),
        ));
    }
    Ok(len.trailing_zeros() as u8)
}
