//! Tests for decoding source tiles into voxel arrays

#[cfg(test)]
mod tests {
    use image::{GrayImage, ImageBuffer, Luma, LumaA, Rgb, RgbImage, Rgba, RgbaImage};
    use std::path::Path;
    use wkcuber::CubingError;
    use ndarray::Array3;
    use wkcuber::format::voxel::VoxelType;
    use wkcuber::io::image::{
        TileShape, read_image, read_tile, read_tile_shape, tiff_supports, write_tiff_slice,
    };

    fn save_gray16(path: &Path, value: u16) {
        ImageBuffer::<Luma<u16>, Vec<u16>>::from_pixel(3, 2, Luma([value]))
            .save(path)
            .unwrap();
    }

    // Tests the tile shape lookup reports width, height and channels
    // Verified by swapping width and height
    #[test]
    fn test_read_tile_shape() {
        let dir = tempfile::tempdir().unwrap();
        let gray = dir.path().join("gray.png");
        GrayImage::new(7, 3).save(&gray).unwrap();
        let rgba = dir.path().join("rgba.png");
        RgbaImage::new(2, 5).save(&rgba).unwrap();

        assert_eq!(
            read_tile_shape(&gray).unwrap(),
            TileShape {
                width: 7,
                height: 3,
                channels: 1
            }
        );
        assert_eq!(read_tile_shape(&rgba).unwrap().channels, 4);
    }

    // Tests tiles are indexed (x, y, channel)
    // Verified by transposing the output array
    #[test]
    fn test_read_tile_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.png");
        GrayImage::from_fn(4, 2, |x, y| Luma([(10 * y + x) as u8])).save(&path).unwrap();

        let shape = read_tile_shape(&path).unwrap();
        let tile = read_tile::<u8>(&path, shape).unwrap();
        assert_eq!(tile.dim(), (4, 2, 1));
        assert_eq!(tile[[3, 0, 0]], 3);
        assert_eq!(tile[[1, 1, 0]], 11);
    }

    // Tests colour channels keep their order
    // Verified by converting to luma
    #[test]
    fn test_read_rgb_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.png");
        RgbImage::from_pixel(2, 2, Rgb([5, 6, 7])).save(&path).unwrap();

        let shape = read_tile_shape(&path).unwrap();
        let tile = read_tile::<u32>(&path, shape).unwrap();
        assert_eq!(tile[[1, 1, 0]], 5);
        assert_eq!(tile[[1, 1, 1]], 6);
        assert_eq!(tile[[1, 1, 2]], 7);
    }

    // Tests alpha channels are kept
    // Verified by dropping alpha on decode
    #[test]
    fn test_read_luma_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("la.png");
        ImageBuffer::<LumaA<u8>, Vec<u8>>::from_pixel(1, 1, LumaA([9, 200]))
            .save(&path)
            .unwrap();
        let rgba_path = dir.path().join("rgba.png");
        RgbaImage::from_pixel(1, 1, Rgba([1, 2, 3, 4])).save(&rgba_path).unwrap();

        let tile = read_tile::<u8>(&path, read_tile_shape(&path).unwrap()).unwrap();
        assert_eq!(tile.iter().copied().collect::<Vec<_>>(), vec![9, 200]);
        let rgba = read_tile::<u8>(&rgba_path, read_tile_shape(&rgba_path).unwrap()).unwrap();
        assert_eq!(rgba.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    // Tests 16 bit samples are not truncated to 8 bit
    // Verified by decoding every image with to_luma8
    #[test]
    fn test_read_sixteen_bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray16.png");
        save_gray16(&path, 1000);

        let shape = read_tile_shape(&path).unwrap();
        let tile = read_tile::<u16>(&path, shape).unwrap();
        assert!(tile.iter().all(|v| *v == 1000));
        let as_float = read_tile::<f32>(&path, shape).unwrap();
        assert!(as_float.iter().all(|v| (*v - 1000.0).abs() < f32::EPSILON));
    }

    // Tests samples that do not fit the target type become zero
    // Verified by saturating instead
    #[test]
    fn test_read_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray16.png");
        save_gray16(&path, 300);

        let tile = read_tile::<u8>(&path, read_tile_shape(&path).unwrap()).unwrap();
        assert!(tile.iter().all(|v| *v == 0));
        let signed = read_tile::<i16>(&path, read_tile_shape(&path).unwrap()).unwrap();
        assert!(signed.iter().all(|v| *v == 300));
    }

    // Tests a differently shaped tile is rejected
    // Verified by skipping the shape comparison
    #[test]
    fn test_shape_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.png");
        GrayImage::new(4, 4).save(&path).unwrap();

        let expected = TileShape {
            width: 4,
            height: 4,
            channels: 3,
        };
        let err = read_tile::<u8>(&path, expected).unwrap_err();
        assert!(matches!(err, CubingError::TileShapeMismatch { .. }));
    }

    // Tests undecodable files are load errors
    // Verified by mapping decode errors to file system errors
    #[test]
    fn test_invalid_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();

        let err = read_tile_shape(&path).unwrap_err();
        assert!(matches!(err, CubingError::ImageLoad { .. }));
    }

    // Tests a written TIFF slice decodes to the same samples
    // Verified by writing columns as rows
    #[test]
    fn test_write_tiff_slice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slice.tif");
        let slice = Array3::<u16>::from_shape_fn((5, 3, 1), |(x, y, _)| (100 * y + x) as u16);
        write_tiff_slice(&path, slice.view()).unwrap();

        let decoded = read_image::<u16>(&path).unwrap();
        assert_eq!(decoded, slice);
        assert_eq!(read_tile_shape(&path).unwrap().width, 5);
    }

    // Tests colour slices keep their channel order
    // Verified by encoding the channels as luma
    #[test]
    fn test_write_tiff_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.tif");
        let slice = Array3::<u8>::from_shape_fn((2, 2, 3), |(_, _, c)| 10 + c as u8);
        write_tiff_slice(&path, slice.view()).unwrap();

        let decoded = read_image::<u8>(&path).unwrap();
        assert_eq!(decoded.dim(), (2, 2, 3));
        assert_eq!(decoded[[1, 1, 2]], 12);
    }

    // Tests element types and channel counts without a TIFF colour type are refused
    // Verified by falling back to an 8-bit encoding
    #[test]
    fn test_tiff_unsupported() {
        assert!(tiff_supports(VoxelType::U8, 1));
        assert!(tiff_supports(VoxelType::U16, 4));
        assert!(tiff_supports(VoxelType::F32, 3));
        assert!(!tiff_supports(VoxelType::U8, 2));
        assert!(!tiff_supports(VoxelType::F32, 1));
        assert!(!tiff_supports(VoxelType::U32, 1));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.tif");
        let slice = Array3::<u32>::zeros((2, 2, 1));
        let err = write_tiff_slice(&path, slice.view()).unwrap_err();
        assert!(matches!(err, CubingError::Unsupported { .. }));
        assert!(!path.exists());
    }
}
