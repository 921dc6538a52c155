//! Locating source tiles on disk

use crate::cubing::pattern::InputPattern;
use crate::io::error::{Result, WithPath};
use std::path::{Path, PathBuf};

/// Inclusive per-axis range of tile coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileInterval {
    /// Smallest `[x, y, z]` seen
    pub min: [u64; 3],
    /// Largest `[x, y, z]` seen
    pub max: [u64; 3],
}

impl TileInterval {
    fn from_point(point: [u64; 3]) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    fn include(&mut self, point: [u64; 3]) {
        for ((min, max), value) in self.min.iter_mut().zip(self.max.iter_mut()).zip(point) {
            *min = (*min).min(value);
            *max = (*max).max(value);
        }
    }

    /// Number of coordinates covered per axis
    pub const fn extent(&self) -> [u64; 3] {
        [
            self.max[0] - self.min[0] + 1,
            self.max[1] - self.min[1] + 1,
            self.max[2] - self.min[2] + 1,
        ]
    }
}

/// Result of scanning for source tiles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredTiles {
    /// Coordinate range of all matches
    pub interval: TileInterval,
    /// First match in lexicographic order, used to read the tile shape
    pub arbitrary_file: PathBuf,
    /// Number of matching files
    pub file_count: usize,
}

/// Scan the file system for files matching `pattern`
///
/// Only the directory tree below the literal prefix of the pattern is
/// visited, down to the depth the pattern prescribes.
///
/// # Errors
///
/// Returns an error if a directory cannot be listed
pub fn detect_interval(pattern: &InputPattern) -> Result<Option<DiscoveredTiles>> {
    let prefix = pattern.literal_prefix();
    let root = prefix.rfind('/').map_or("", |i| prefix.get(..=i).unwrap_or(""));
    let depth = pattern
        .as_str()
        .get(root.len()..)
        .map_or(0, |rest| rest.matches('/').count());

    let mut matches = Vec::new();
    walk(root, depth, pattern, &mut matches)?;

    let Some((first_path, first_coords)) = matches.iter().min_by(|a, b| a.0.cmp(&b.0)) else {
        return Ok(None);
    };

    let mut interval = TileInterval::from_point(*first_coords);
    for (_, coords) in &matches {
        interval.include(*coords);
    }

    log::debug!(
        "Detected {} source files in x={}-{} y={}-{} z={}-{}",
        matches.len(),
        interval.min[0],
        interval.max[0],
        interval.min[1],
        interval.max[1],
        interval.min[2],
        interval.max[2]
    );

    Ok(Some(DiscoveredTiles {
        interval,
        arbitrary_file: PathBuf::from(first_path),
        file_count: matches.len(),
    }))
}

fn walk(
    dir: &str,
    remaining_depth: usize,
    pattern: &InputPattern,
    matches: &mut Vec<(String, [u64; 3])>,
) -> Result<()> {
    let read_path = if dir.is_empty() { Path::new(".") } else { Path::new(dir) };
    let entries = match std::fs::read_dir(read_path) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(crate::io::error::file_system(read_path, "list directory", e)),
    };

    for entry in entries {
        let entry = entry.with_path(read_path, "list directory")?;
        let name = entry.file_name().to_string_lossy().to_string();
        let candidate = format!("{dir}{name}");
        let entry_path = entry.path();

        if remaining_depth == 0 {
            if entry_path.is_file() {
                if let Some(coords) = pattern.match_path(&candidate) {
                    matches.push((candidate, coords));
                }
            }
        } else if entry_path.is_dir() {
            walk(&format!("{candidate}/"), remaining_depth - 1, pattern, matches)?;
        }
    }
    Ok(())
}

/// Resolve the file for one tile
///
/// The unpadded name takes precedence over the zero-padded one.
pub fn find_file_with_dimensions(
    pattern: &InputPattern,
    coords: [u64; 3],
    digit_counts: [usize; 3],
) -> Option<PathBuf> {
    let unpadded = PathBuf::from(pattern.format(coords, [0; 3]));
    if unpadded.is_file() {
        return Some(unpadded);
    }

    let padded = PathBuf::from(pattern.format(coords, digit_counts));
    padded.is_file().then_some(padded)
}
