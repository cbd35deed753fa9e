//! Splitting a large entry file into per-worker parts.

use crate::error::{Result, SozlukError};
use crate::persist;
use std::path::{Path, PathBuf};
use tracing::info;

/// Split the entries of `input` into `parts` contiguous files in `output_dir`.
///
/// Each part holds `ceil(total / parts)` entries except possibly the last
/// ones; files are named `part_1.json` to `part_{parts}.json`. Returns each
/// written path with its entry count.
pub fn split_file(input: &Path, output_dir: &Path, parts: usize) -> Result<Vec<(PathBuf, usize)>> {
    if parts == 0 {
        return Err(SozlukError::InvalidConfig(
            "parts must be greater than 0".to_string(),
        ));
    }

    let entries = persist::load(input)?;
    let total = entries.len();
    let chunk_size = total.div_ceil(parts);

    std::fs::create_dir_all(output_dir).map_err(|e| SozlukError::OutputFileWrite {
        path: output_dir.to_path_buf(),
        source: e,
    })?;

    info!(total, parts, chunk_size, "Splitting entries");

    let mut written = Vec::with_capacity(parts);
    for i in 0..parts {
        let start = (i * chunk_size).min(total);
        let end = ((i + 1) * chunk_size).min(total);
        let path = output_dir.join(format!("part_{}.json", i + 1));

        persist::save(&entries[start..end], &path)?;
        info!(file = %path.display(), entries = end - start, "Part written");
        written.push((path, end - start));
    }

    Ok(written)
}
