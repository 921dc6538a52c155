//! Tests for command-line parsing and the dataset overview

#[cfg(test)]
mod tests {
    use clap::Parser;
    use std::path::PathBuf;
    use wkcuber::api::dataset::Dataset;
    use wkcuber::api::mag::Mag;
    use wkcuber::api::properties::Category;
    use wkcuber::format::voxel::VoxelType;
    use wkcuber::io::cli::{Cli, Command, default_jobs, describe_dataset, parse_scale};
    use wkcuber::io::configuration::{DEFAULT_BATCH_SIZE, DEFAULT_INPUT_PATH_PATTERN};

    // Tests cube parsing with only the required paths
    // Verified by changing default values to ensure defaults are used
    #[test]
    fn test_cube_minimal_args() {
        let cli = Cli::parse_from(["wkcuber", "cube", "tiles", "out"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);

        let Command::Cube(args) = cli.command else {
            unreachable!("Expected cube command");
        };
        assert_eq!(args.source_path, PathBuf::from("tiles"));
        assert_eq!(args.target_path, PathBuf::from("out"));
        assert_eq!(args.layer_name, "color");
        assert_eq!(args.dtype, VoxelType::U8);
        assert_eq!(args.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(args.input_path_pattern, DEFAULT_INPUT_PATH_PATTERN);
        assert_eq!(args.jobs, None);
        assert_eq!(args.scale, [1.0, 1.0, 1.0]);

        let config = args.to_config();
        assert_eq!(config.jobs, default_jobs());
    }

    // Tests cube parsing with all available arguments
    // Verified by modifying custom parsers to ensure they're invoked
    #[test]
    fn test_cube_all_args() {
        let cli = Cli::parse_from([
            "wkcuber",
            "-vv",
            "cube",
            "tiles",
            "out",
            "--layer-name",
            "em",
            "--dtype",
            "uint16",
            "--batch-size",
            "8",
            "--input-path-pattern",
            "{zzz}/{yy}/{xx}.png",
            "--jobs",
            "3",
            "--scale",
            "11.24,11.24,25",
        ]);
        assert_eq!(cli.verbose, 2);

        let Command::Cube(args) = cli.command else {
            unreachable!("Expected cube command");
        };
        let config = args.to_config();
        assert_eq!(config.layer_name, "em");
        assert_eq!(config.voxel_type, VoxelType::U16);
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.input_path_pattern, "{zzz}/{yy}/{xx}.png");
        assert_eq!(config.jobs, 3);
        assert_eq!(config.scale, [11.24, 11.24, 25.0]);
    }

    // Tests invalid values are rejected by the parser
    // Verified by removing the value parsers
    #[test]
    fn test_cube_rejects_invalid() {
        assert!(Cli::try_parse_from(["wkcuber", "cube", "a", "b", "--dtype", "uint7"]).is_err());
        assert!(Cli::try_parse_from(["wkcuber", "cube", "a", "b", "--batch-size", "0"]).is_err());
        assert!(Cli::try_parse_from(["wkcuber", "cube", "a", "b", "--jobs", "0"]).is_err());
        assert!(
            Cli::try_parse_from(["wkcuber", "cube", "a", "b", "--input-path-pattern", "{x}.png"])
                .is_err()
        );
        assert!(Cli::try_parse_from(["wkcuber", "cube", "a"]).is_err());
    }

    // Tests the global quiet flag after the subcommand
    // Verified by making the flag non-global
    #[test]
    fn test_info_quiet() {
        let cli = Cli::parse_from(["wkcuber", "info", "dataset", "-q"]);
        assert!(cli.quiet);
        let Command::Info(args) = cli.command else {
            unreachable!("Expected info command");
        };
        assert_eq!(args.dataset_path, PathBuf::from("dataset"));
    }

    // Tests scale parsing
    // Verified by accepting two components
    #[test]
    fn test_parse_scale() {
        assert_eq!(parse_scale("1,2,3").unwrap(), [1.0, 2.0, 3.0]);
        assert_eq!(parse_scale(" 4.5 , 4.5 ,9 ").unwrap(), [4.5, 4.5, 9.0]);
        assert!(parse_scale("1,2").is_err());
        assert!(parse_scale("1,2,3,4").is_err());
        assert!(parse_scale("1,x,3").is_err());
        assert!(parse_scale("1,0,3").is_err());
    }

    // Tests the overview lists layers, bounding boxes and mags
    // Verified by omitting the mag list
    #[test]
    fn test_describe_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let mut dataset = Dataset::create(&dir.path().join("ds"), [11.0, 11.0, 25.0]).unwrap();
        dataset.add_layer("color", Category::Color, VoxelType::U8, 1).unwrap();
        dataset.add_mag("color", Mag::ONE).unwrap();
        dataset.add_mag("color", Mag::new([2, 2, 1]).unwrap()).unwrap();
        dataset.set_bounding_box("color", [0, 0, 3], [64, 32, 10]).unwrap();
        dataset
            .add_layer("segmentation", Category::Segmentation, VoxelType::U32, 1)
            .unwrap();

        let text = describe_dataset(&dataset);
        assert!(text.contains("Dataset ds"));
        assert!(text.contains("Scale: 11 x 11 x 25 nm"));
        assert!(text.contains("Storage: WKW"));
        assert!(text.contains("Layer color (color): uint8, 1 channel(s)"));
        assert!(text.contains("Bounding box: (0, 0, 3) size 64 x 32 x 10"));
        assert!(text.contains("Mags: 1, 2-2-1"));
        assert!(text.contains("Layer segmentation (segmentation): uint32"));
        assert!(text.contains("Bounding box: empty"));
    }

    // Tests the overview names the TIFF layout
    // Verified by reporting every dataset as WKW
    #[test]
    fn test_describe_tiff_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let slices = Dataset::create_tiff(&dir.path().join("slices"), [1.0; 3], "{z}.tif").unwrap();
        assert!(describe_dataset(&slices).contains("Storage: TIFF slices named {z}.tif"));

        let tiled =
            Dataset::create_tiff_tiled(&dir.path().join("tiled"), [1.0; 3], [64, 32], "{z}/{y}/{x}.tif")
                .unwrap();
        assert!(describe_dataset(&tiled).contains("Storage: TIFF tiles of 64 x 32 named {z}/{y}/{x}.tif"));
    }

    // Tests the default job count is positive
    // Verified by returning zero when parallelism is unknown
    #[test]
    fn test_default_jobs() {
        assert!(default_jobs() >= 1);
    }
}
