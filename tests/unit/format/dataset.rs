//! Tests for block-level reading and writing of WKW data files

#[cfg(test)]
mod tests {
    use ndarray::{Array4, s};
    use std::fs;
    use wkcuber::CubingError;
    use wkcuber::format::dataset::WkwDataset;
    use wkcuber::format::header::{BlockType, HEADER_SIZE, Header};
    use wkcuber::format::voxel::VoxelType;

    fn small_header(voxel_type: VoxelType, channels: usize) -> Header {
        Header::new(voxel_type, channels, 8, 4, BlockType::Raw).unwrap()
    }

    fn ramp(shape: (usize, usize, usize, usize)) -> Array4<u8> {
        Array4::from_shape_fn(shape, |(c, x, y, z)| ((c * 7 + x + 3 * y + 5 * z) % 250 + 1) as u8)
    }

    // Tests data written across block and file boundaries reads back unchanged
    // Verified by swapping x and y in the voxel index
    #[test]
    fn test_write_read_across_files() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = WkwDataset::create(dir.path(), small_header(VoxelType::U8, 1)).unwrap();

        let data = ramp((1, 40, 20, 10));
        dataset.write([5, 3, 30], data.view()).unwrap();

        let read: Array4<u8> = dataset.read([5, 3, 30], [40, 20, 10]).unwrap();
        assert_eq!(read, data);
        assert!(dataset.file_path([1, 0, 1]).is_file());
    }

    // Tests unwritten regions read as zero
    // Verified by returning uninitialized buffers for missing files
    #[test]
    fn test_missing_files_read_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = WkwDataset::create(dir.path(), small_header(VoxelType::U16, 2)).unwrap();

        let read: Array4<u16> = dataset.read([100, 100, 100], [4, 4, 4]).unwrap();
        assert_eq!(read.dim(), (2, 4, 4, 4));
        assert!(read.iter().all(|v| *v == 0));
    }

    // Tests partial block writes keep neighbouring voxels
    // Verified by zero-filling every block before patching
    #[test]
    fn test_partial_write_preserves_neighbours() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = WkwDataset::create(dir.path(), small_header(VoxelType::U8, 1)).unwrap();

        let base = Array4::<u8>::from_elem((1, 8, 8, 8), 9);
        dataset.write([0, 0, 0], base.view()).unwrap();
        let patch = Array4::<u8>::from_elem((1, 2, 2, 2), 200);
        dataset.write([3, 3, 3], patch.view()).unwrap();

        let read: Array4<u8> = dataset.read([0, 0, 0], [8, 8, 8]).unwrap();
        assert_eq!(read[[0, 0, 0, 0]], 9);
        assert_eq!(read[[0, 3, 3, 3]], 200);
        assert_eq!(read[[0, 4, 4, 4]], 200);
        assert_eq!(read[[0, 5, 5, 5]], 9);
    }

    // Tests channels are interleaved per voxel on disk
    // Verified by storing channels as separate planes
    #[test]
    fn test_channel_interleaving() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = WkwDataset::create(dir.path(), small_header(VoxelType::U8, 3)).unwrap();

        let mut data = Array4::<u8>::zeros((3, 8, 8, 8));
        data[[0, 1, 0, 0]] = 10;
        data[[1, 1, 0, 0]] = 20;
        data[[2, 1, 0, 0]] = 30;
        dataset.write([0, 0, 0], data.view()).unwrap();

        let bytes = fs::read(dataset.file_path([0, 0, 0])).unwrap();
        let start = HEADER_SIZE as usize + 3;
        assert_eq!(&bytes[start..start + 3], &[10, 20, 30]);
    }

    // Tests the second block of a file follows Morton order
    // Verified by placing blocks in row-major order
    #[test]
    fn test_block_placement_morton() {
        let dir = tempfile::tempdir().unwrap();
        let header = small_header(VoxelType::U8, 1);
        let dataset = WkwDataset::create(dir.path(), header).unwrap();

        let data = Array4::<u8>::from_elem((1, 1, 1, 1), 77);
        dataset.write([0, 8, 0], data.view()).unwrap();

        let bytes = fs::read(dataset.file_path([0, 0, 0])).unwrap();
        let block_bytes = header.block_size_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE as usize + block_bytes * 64);
        assert_eq!(bytes[HEADER_SIZE as usize + 2 * block_bytes], 77);
    }

    // Tests data files carry a header with the block data offset
    // Verified by writing the dataset header unchanged
    #[test]
    fn test_data_file_header() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = WkwDataset::create(dir.path(), small_header(VoxelType::U8, 1)).unwrap();
        dataset
            .write([0, 0, 0], Array4::<u8>::ones((1, 1, 1, 1)).view())
            .unwrap();

        let bytes = fs::read(dataset.file_path([0, 0, 0])).unwrap();
        assert_eq!(&bytes[0..3], b"WKW");
        assert_eq!(u64::from_le_bytes(bytes[8..16].try_into().unwrap()), HEADER_SIZE);
    }

    // Tests element type and channel checks on access
    // Verified by removing check_access
    #[test]
    fn test_type_and_channel_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = WkwDataset::create(dir.path(), small_header(VoxelType::U8, 1)).unwrap();

        let wrong_type = Array4::<u16>::zeros((1, 2, 2, 2));
        let err = dataset.write([0, 0, 0], wrong_type.view()).unwrap_err();
        assert!(matches!(err, CubingError::VoxelTypeMismatch { .. }));

        let wrong_channels = Array4::<u8>::zeros((2, 2, 2, 2));
        assert!(dataset.write([0, 0, 0], wrong_channels.view()).is_err());
    }

    // Tests compressed datasets are refused
    // Verified by treating LZ4 blocks as raw
    #[test]
    fn test_compressed_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let header = Header::new(VoxelType::U8, 1, 8, 4, BlockType::Lz4).unwrap();
        let dataset = WkwDataset::create(dir.path(), header).unwrap();

        let err = dataset.read::<u8>([0, 0, 0], [1, 1, 1]).unwrap_err();
        assert!(matches!(err, CubingError::Unsupported { .. }));
    }

    // Tests create reuses a compatible header and rejects a different one
    // Verified by overwriting the existing header
    #[test]
    fn test_create_existing() {
        let dir = tempfile::tempdir().unwrap();
        WkwDataset::create(dir.path(), small_header(VoxelType::U8, 1)).unwrap();

        let reopened = WkwDataset::create(dir.path(), small_header(VoxelType::U8, 1)).unwrap();
        assert_eq!(reopened.header().voxel_type, VoxelType::U8);
        assert!(WkwDataset::create(dir.path(), small_header(VoxelType::U16, 1)).is_err());

        let opened = WkwDataset::open(dir.path()).unwrap();
        assert_eq!(opened.header().block_len(), 8);
    }

    // Tests file paths follow the z/y/x layout
    // Verified by reversing the coordinate order
    #[test]
    fn test_file_path_layout() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = WkwDataset::create(dir.path(), small_header(VoxelType::U8, 1)).unwrap();
        let path = dataset.file_path([1, 2, 3]);
        assert_eq!(path, dir.path().join("z3").join("y2").join("x1.wkw"));
    }

    // Tests writing a sub-view of a larger array
    // Verified by ignoring array strides
    #[test]
    fn test_write_strided_view() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = WkwDataset::create(dir.path(), small_header(VoxelType::U8, 1)).unwrap();

        let data = ramp((1, 12, 12, 12));
        let part = data.slice(s![.., 2..10, 4..6, 1..9]);
        dataset.write([0, 0, 0], part).unwrap();

        let read: Array4<u8> = dataset.read([0, 0, 0], [8, 2, 8]).unwrap();
        assert_eq!(read, part);
    }

    // Tests a dataset whose header.wkw announces oversized blocks cannot be opened
    // Verified by skipping the length check when parsing
    #[test]
    fn test_open_rejects_oversized_header() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = b"WKW".to_vec();
        bytes.extend_from_slice(&[1, 0xFF, 1, 1, 1]);
        bytes.extend_from_slice(&0u64.to_le_bytes());
        fs::write(dir.path().join("header.wkw"), bytes).unwrap();

        let err = WkwDataset::open(dir.path()).unwrap_err();
        assert!(matches!(err, CubingError::InvalidFormat { .. }));
    }
}
