//! Batch loading of numpy array files.
//!
//! Evaluation artifacts (latent batches, score tables) are dumped as one
//! array per file, `.npz` archives keyed `arr_0` or plain `.npy` payloads.
//! The loaders here read a set of such files and concatenate along axis 0.

use candle_core::{Device, Tensor};
use std::path::{Path, PathBuf};

/// Array key numpy assigns to the first unnamed array in an `.npz` archive.
pub const DEFAULT_ARRAY_KEY: &str = "arr_0";

#[derive(Debug, thiserror::Error)]
pub enum NpzError {
    #[error("no array files to load from {path}")]
    Empty { path: PathBuf },

    #[error("archive {path} has no `{key}` array")]
    MissingArray { path: PathBuf, key: &'static str },

    #[error("failed to list directory: {path}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("candle error: {0}")]
    Candle(#[from] candle_core::Error),
}

/// Load every `.npz`/`.npy` file in `dir` (sorted by file name) and
/// concatenate the arrays along axis 0.
///
/// Fails on an empty directory; shape mismatches along non-concatenation
/// axes surface as candle errors from the concat.
pub fn load_npz_from_dir(dir: &Path, device: &Device) -> Result<Tensor, NpzError> {
    let entries = std::fs::read_dir(dir).map_err(|source| NpzError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("npz") | Some("npy")
            )
        })
        .collect();
    paths.sort();
    if paths.is_empty() {
        return Err(NpzError::Empty {
            path: dir.to_path_buf(),
        });
    }
    load_npz_from_paths(&paths, device)
}

/// Load the named files and concatenate the arrays along axis 0.
pub fn load_npz_from_paths(paths: &[PathBuf], device: &Device) -> Result<Tensor, NpzError> {
    if paths.is_empty() {
        return Err(NpzError::Empty {
            path: PathBuf::new(),
        });
    }
    let mut arrays = Vec::with_capacity(paths.len());
    for path in paths {
        arrays.push(load_array(path, device)?);
    }
    Ok(Tensor::cat(&arrays, 0)?)
}

fn load_array(path: &Path, device: &Device) -> Result<Tensor, NpzError> {
    let is_npz = path.extension().and_then(|e| e.to_str()) == Some("npz");
    let tensor = if is_npz {
        let arrays = Tensor::read_npz(path)?;
        arrays
            .into_iter()
            .find(|(name, _)| name == DEFAULT_ARRAY_KEY)
            .map(|(_, t)| t)
            .ok_or_else(|| NpzError::MissingArray {
                path: path.to_path_buf(),
                key: DEFAULT_ARRAY_KEY,
            })?
    } else {
        Tensor::read_npy(path)?
    };
    Ok(tensor.to_device(device)?)
}
