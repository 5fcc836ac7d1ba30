//! Tile directory fixtures following the sen2mosaic naming convention:
//! `<prefix>_R<res>m_B<band>.tif`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Acquisition date range token embedded in [`TILE_PREFIX`].
pub const TIMEFRAME: &str = "20230601_20230630";

/// Filename prefix shared by every band file of the default fixture tile.
pub const TILE_PREFIX: &str = "T35VLG_20230601_20230630";

/// EPSG code of the fixture tiles (WGS 84 / UTM zone 35N).
pub const UTM35N_EPSG: u16 = 32635;

/// Upper-left corner of the fixture tiles in UTM 35N metres.
pub const TILE_ORIGIN: (f64, f64) = (400000.0, 6800000.0);

/// Band codes shipped at 10 m.
pub const BANDS_10M: &[&str] = &["02", "03", "04", "08"];

/// Band codes shipped at 20 m.
pub const BANDS_20M: &[&str] = &["02", "03", "04", "8A", "11", "12"];

/// File name of one band: `band_file_name("tile", 10, "04")` is `tile_R10m_B04.tif`.
pub fn band_file_name(prefix: &str, resolution_m: u32, code: &str) -> String {
    format!("{}_R{}m_B{}.tif", prefix, resolution_m, code)
}

/// A temporary workspace with an input area for tile directories and an
/// output area for pipeline results. Everything is removed on drop.
pub struct TileWorkspace {
    root: TempDir,
}

impl TileWorkspace {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            root: tempfile::tempdir()?,
        })
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Create (if needed) and return `<root>/input/<name>`.
    pub fn tile_dir(&self, name: &str) -> io::Result<PathBuf> {
        let dir = self.root.path().join("input").join(name);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Path of `<root>/output`, not created.
    pub fn output_dir(&self) -> PathBuf {
        self.root.path().join("output")
    }

    /// Write a text file under the root, one entry per line.
    pub fn list_file(&self, name: &str, lines: &[&str]) -> io::Result<PathBuf> {
        let path = self.root.path().join(name);
        fs::write(&path, lines.join("\n"))?;
        Ok(path)
    }
}

/// Every `(resolution, code)` pair of a complete fixture tile.
pub fn all_band_files() -> Vec<(u32, &'static str)> {
    BANDS_10M
        .iter()
        .map(|code| (10, *code))
        .chain(BANDS_20M.iter().map(|code| (20, *code)))
        .collect()
}
