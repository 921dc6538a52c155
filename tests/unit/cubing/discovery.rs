//! Tests for source tile discovery

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use wkcuber::cubing::discovery::{detect_interval, find_file_with_dimensions};
    use wkcuber::cubing::pattern::InputPattern;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn pattern_in(dir: &Path, relative: &str) -> InputPattern {
        InputPattern::parse(&format!("{}/{relative}", dir.display())).unwrap()
    }

    // Tests the interval covers every matching file
    // Verified by tracking only the maximum
    #[test]
    fn test_detect_interval() {
        let dir = tempfile::tempdir().unwrap();
        for (z, y, x) in [(3, 1, 2), (4, 0, 5), (10, 2, 1)] {
            touch(&dir.path().join(format!("{z}/{y}/{x}.png")));
        }
        touch(&dir.path().join("4/0/notes.txt"));

        let pattern = pattern_in(dir.path(), "{zz}/{y}/{x}.png");
        let found = detect_interval(&pattern).unwrap().unwrap();

        assert_eq!(found.file_count, 3);
        assert_eq!(found.interval.min, [1, 0, 3]);
        assert_eq!(found.interval.max, [5, 2, 10]);
        assert_eq!(found.interval.extent()[2], 8);
        assert_eq!(found.arbitrary_file, dir.path().join("10/2/1.png"));
    }

    // Tests padded names are recognised
    // Verified by requiring the full placeholder width
    #[test]
    fn test_detect_padded_names() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("0007/0001/0002.jpg"));

        let pattern = pattern_in(dir.path(), "{zzzz}/{yyyy}/{xxxx}.jpg");
        let found = detect_interval(&pattern).unwrap().unwrap();
        assert_eq!(found.interval.min, [2, 1, 7]);
        assert_eq!(found.interval.max, [2, 1, 7]);
    }

    // Tests no match yields None and a missing root is not an error
    // Verified by erroring on missing directories
    #[test]
    fn test_detect_nothing() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("0/0/0.tif"));

        assert!(detect_interval(&pattern_in(dir.path(), "{z}/{y}/{x}.png")).unwrap().is_none());
        let missing = dir.path().join("missing");
        assert!(detect_interval(&pattern_in(&missing, "{z}/{y}/{x}.png")).unwrap().is_none());
    }

    // Tests the unpadded file takes precedence over the padded one
    // Verified by checking the padded name first
    #[test]
    fn test_find_file_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = pattern_in(dir.path(), "{zzz}/{yyy}/{xxx}.png");
        let counts = pattern.digit_counts();

        touch(&dir.path().join("001/002/003.png"));
        assert_eq!(
            find_file_with_dimensions(&pattern, [3, 2, 1], counts),
            Some(dir.path().join("001/002/003.png"))
        );

        touch(&dir.path().join("1/2/3.png"));
        assert_eq!(
            find_file_with_dimensions(&pattern, [3, 2, 1], counts),
            Some(dir.path().join("1/2/3.png"))
        );
        assert_eq!(find_file_with_dimensions(&pattern, [9, 9, 9], counts), None);
    }
}
