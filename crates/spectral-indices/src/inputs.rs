//! List arguments that may be given inline or as a file of lines.

use std::path::Path;

use tracing::info;

use crate::error::{IndexError, Result};

/// What a list argument holds; decides how file entries are normalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// Index names; file entries are lower-cased.
    Indices,
    /// Directory paths; file entries are kept as written.
    Directories,
}

/// Expand a list argument.
///
/// A single value naming an existing file is replaced by that file's
/// non-empty lines (trimmed, lower-cased for [`ListKind::Indices`]). Anything
/// else is returned verbatim.
pub fn expand_list_argument(values: &[String], kind: ListKind) -> Result<Vec<String>> {
    let expanded = match values {
        [single] if Path::new(single).is_file() => {
            let content = std::fs::read_to_string(single).map_err(|e| {
                IndexError::invalid_argument(format!("failed to read list file {}: {}", single, e))
            })?;
            info!(file = %single, kind = ?kind, "Reading list from file");
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| match kind {
                    ListKind::Indices => line.to_lowercase(),
                    ListKind::Directories => line.to_string(),
                })
                .collect()
        }
        _ => values.to_vec(),
    };

    if expanded.is_empty() {
        return Err(IndexError::invalid_argument(format!(
            "no {} given",
            match kind {
                ListKind::Indices => "indices",
                ListKind::Directories => "directories",
            }
        )));
    }
    Ok(expanded)
}
