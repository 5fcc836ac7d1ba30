//! Tile directories: one scene's co-registered band files.

use std::io;
use std::path::{Path, PathBuf};

use tile_common::{BandId, Resolution, SpectralBand};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{IndexError, Result};
use crate::naming::NamingConvention;

/// A band file recognised by the naming convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandFile {
    pub path: PathBuf,
    pub prefix: String,
    pub resolution: Resolution,
    pub band: SpectralBand,
}

impl BandFile {
    pub fn id(&self) -> BandId {
        BandId::new(self.band, self.resolution)
    }
}

/// A directory of band files for one tile and timeframe.
///
/// The prefix and timeframe come from the lexicographically first band file.
#[derive(Debug, Clone)]
pub struct TileDirectory {
    path: PathBuf,
    prefix: String,
    timeframe: Option<String>,
    bands: Vec<BandFile>,
}

impl TileDirectory {
    /// List `path` (not recursively) and keep the files `naming` recognises.
    pub fn scan(path: &Path, naming: &NamingConvention) -> Result<Self> {
        let files = list_files(path)?;

        let bands: Vec<BandFile> = files
            .into_iter()
            .filter_map(|file| {
                let name = file.file_name()?.to_str()?;
                match naming.parse(name) {
                    Some(parsed) => Some(BandFile {
                        prefix: parsed.prefix,
                        resolution: parsed.resolution,
                        band: parsed.band,
                        path: file,
                    }),
                    None => {
                        debug!(file = %name, "Skipping file outside the naming convention");
                        None
                    }
                }
            })
            .collect();

        let first = bands
            .first()
            .ok_or_else(|| IndexError::NoBandFiles(path.to_path_buf()))?;
        let prefix = first.prefix.clone();
        let timeframe = naming.timeframe(&prefix);

        debug!(
            directory = %path.display(),
            prefix = %prefix,
            timeframe = ?timeframe,
            band_files = bands.len(),
            "Scanned tile directory"
        );

        Ok(Self {
            path: path.to_path_buf(),
            prefix,
            timeframe,
            bands,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Filename prefix shared by the band files, e.g. `T35VLG_20230601_20230630`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Acquisition timeframe token, if the prefix carries one.
    pub fn timeframe(&self) -> Option<&str> {
        self.timeframe.as_deref()
    }

    pub fn band_files(&self) -> &[BandFile] {
        &self.bands
    }

    /// All files matching a band and resolution, in lexicographic order.
    pub fn candidates(&self, id: BandId) -> Vec<&BandFile> {
        self.bands.iter().filter(|b| b.id() == id).collect()
    }

    /// The file for a band and resolution.
    ///
    /// No match is a [`IndexError::BandNotFound`]. Several matches (e.g. two
    /// mosaics sharing a folder) resolve to the lexicographically first path.
    pub fn resolve(&self, id: BandId) -> Result<&Path> {
        let candidates = self.candidates(id);
        match candidates.as_slice() {
            [] => Err(IndexError::BandNotFound {
                directory: self.path.clone(),
                band: id,
            }),
            [only] => Ok(&only.path),
            [first, ..] => {
                warn!(
                    directory = %self.path.display(),
                    band = %id,
                    candidates = ?candidates.iter().map(|c| c.path.display().to_string()).collect::<Vec<_>>(),
                    chosen = %first.path.display(),
                    "Several files match band, using the first"
                );
                Ok(&first.path)
            }
        }
    }
}

/// Regular, non-hidden files directly under `dir`, sorted by name.
///
/// Symlinks count when they point at a regular file; dangling links are skipped.
pub(crate) fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IndexError::DirectoryRead {
            path: dir.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, "not a directory"),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| IndexError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden && entry.path().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
