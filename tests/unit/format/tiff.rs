//! Tests for voxel storage as TIFF slices

#[cfg(test)]
mod tests {
    use ndarray::{Array4, s};
    use wkcuber::CubingError;
    use wkcuber::format::tiff::TiffDataset;
    use wkcuber::format::voxel::VoxelType;
    use wkcuber::io::image::{read_image, read_tile_shape};

    fn ramp(shape: (usize, usize, usize, usize)) -> Array4<u8> {
        Array4::from_shape_fn(shape, |(c, x, y, z)| ((c * 7 + x + 3 * y + 5 * z) % 250 + 1) as u8)
    }

    // Tests each z slice lands in its own image and reads back unchanged
    // Verified by writing every slice into the first image
    #[test]
    fn test_write_read_slices() {
        let dir = tempfile::tempdir().unwrap();
        let stack = TiffDataset::create(dir.path(), "{z}.tif", None, VoxelType::U8, 1).unwrap();

        let data = ramp((1, 12, 7, 3));
        stack.write([0, 0, 4], data.view()).unwrap();

        let read: Array4<u8> = stack.read([0, 0, 4], [12, 7, 3]).unwrap();
        assert_eq!(read, data);
        assert!(dir.path().join("4.tif").is_file());
        assert!(dir.path().join("6.tif").is_file());
        assert!(!dir.path().join("3.tif").exists());
    }

    // Tests slices grow to cover writes at an offset and keep earlier pixels
    // Verified by sizing each image to the latest write only
    #[test]
    fn test_slices_grow() {
        let dir = tempfile::tempdir().unwrap();
        let stack = TiffDataset::create(dir.path(), "{z}.tif", None, VoxelType::U16, 1).unwrap();

        let first = Array4::<u16>::from_elem((1, 4, 4, 1), 7);
        stack.write([0, 0, 0], first.view()).unwrap();
        let second = Array4::<u16>::from_elem((1, 2, 3, 1), 9);
        stack.write([6, 5, 0], second.view()).unwrap();

        let shape = read_tile_shape(&dir.path().join("0.tif")).unwrap();
        assert_eq!((shape.width, shape.height), (8, 8));

        let read: Array4<u16> = stack.read([0, 0, 0], [8, 8, 1]).unwrap();
        assert_eq!(read[[0, 3, 3, 0]], 7);
        assert_eq!(read[[0, 7, 7, 0]], 9);
        assert_eq!(read[[0, 5, 0, 0]], 0);
    }

    // Tests regions outside stored images read as zero
    // Verified by failing on missing slices
    #[test]
    fn test_missing_slices_read_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let stack = TiffDataset::create(dir.path(), "{zz}.tif", None, VoxelType::U8, 3).unwrap();

        let data = ramp((3, 4, 4, 1));
        stack.write([0, 0, 1], data.view()).unwrap();
        assert!(dir.path().join("01.tif").is_file());

        let read: Array4<u8> = stack.read([2, 2, 0], [6, 6, 3]).unwrap();
        assert!(read.slice(s![.., .., .., 0]).iter().all(|&v| v == 0));
        assert!(read.slice(s![.., .., .., 2]).iter().all(|&v| v == 0));
        assert_eq!(read.slice(s![.., ..2, ..2, 1]), data.slice(s![.., 2.., 2.., 0]));
        assert!(read.slice(s![.., 2.., .., 1]).iter().all(|&v| v == 0));
    }

    // Tests tiled stacks split slices into fixed size images
    // Verified by swapping tile column and row in the file name
    #[test]
    fn test_tiled_write_read() {
        let dir = tempfile::tempdir().unwrap();
        let stack =
            TiffDataset::create(dir.path(), "{z}/{y}/{x}.tif", Some([8, 4]), VoxelType::U8, 1)
                .unwrap();

        let data = ramp((1, 20, 10, 2));
        stack.write([3, 1, 0], data.view()).unwrap();

        let read: Array4<u8> = stack.read([3, 1, 0], [20, 10, 2]).unwrap();
        assert_eq!(read, data);

        assert_eq!(stack.file_path([2, 1, 0]), dir.path().join("0/1/2.tif"));
        assert!(stack.file_path([2, 2, 1]).is_file());
        assert!(!stack.file_path([3, 0, 0]).exists());
        let tile = read_image::<u8>(&stack.file_path([0, 0, 0])).unwrap();
        assert_eq!(tile.dim(), (8, 4, 1));
        assert_eq!(tile[[3, 1, 0]], data[[0, 0, 0, 0]]);
        assert_eq!(tile[[0, 0, 0]], 0);
    }

    // Tests invalid patterns, tile sizes and colour types are refused
    // Verified by accepting tiled patterns without x and y
    #[test]
    fn test_create_validation() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        assert!(TiffDataset::create(root, "slice.tif", None, VoxelType::U8, 1).is_err());
        assert!(TiffDataset::create(root, "{z}.tif", Some([8, 8]), VoxelType::U8, 1).is_err());
        assert!(matches!(
            TiffDataset::create(root, "{z}/{y}/{x}.tif", Some([0, 8]), VoxelType::U8, 1),
            Err(CubingError::InvalidParameter { .. })
        ));
        assert!(matches!(
            TiffDataset::create(root, "{z}.tif", None, VoxelType::U64, 1),
            Err(CubingError::Unsupported { .. })
        ));
        assert!(matches!(
            TiffDataset::create(root, "{z}.tif", None, VoxelType::U8, 2),
            Err(CubingError::Unsupported { .. })
        ));

        let stack = TiffDataset::create(root, "{z}.tif", None, VoxelType::U16, 3).unwrap();
        assert_eq!(stack.pattern(), "{z}.tif");
        assert_eq!(stack.tile_size(), None);
        assert_eq!(stack.num_channels(), 3);
    }

    // Tests element type and channel count must match the stack
    // Verified by casting data to the stored type
    #[test]
    fn test_access_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let stack = TiffDataset::create(dir.path(), "{z}.tif", None, VoxelType::U8, 1).unwrap();

        let wrong_type = Array4::<u16>::zeros((1, 2, 2, 1));
        assert!(matches!(
            stack.write([0, 0, 0], wrong_type.view()),
            Err(CubingError::VoxelTypeMismatch { .. })
        ));
        assert!(matches!(
            stack.read::<u16>([0, 0, 0], [2, 2, 1]),
            Err(CubingError::VoxelTypeMismatch { .. })
        ));
        let wrong_channels = Array4::<u8>::zeros((3, 2, 2, 1));
        assert!(matches!(
            stack.write([0, 0, 0], wrong_channels.view()),
            Err(CubingError::InvalidParameter { .. })
        ));

        let rgb = TiffDataset::create(dir.path(), "{z}.tif", None, VoxelType::U8, 3).unwrap();
        rgb.write([0, 0, 0], Array4::<u8>::zeros((3, 2, 2, 1)).view()).unwrap();
        assert!(matches!(
            stack.read::<u8>([0, 0, 0], [2, 2, 1]),
            Err(CubingError::InvalidFormat { .. })
        ));
    }
}
