//! Video batch serialization.
//!
//! Sampling produces a `[batch, samples, channels, frames, height, width]`
//! tensor in `[-1, 1]`. Each batch item becomes one animated GIF: per frame,
//! the `samples` dimension is tiled horizontally into a grid image, rescaled
//! to 8-bit, and written at the requested frame rate.

use candle_core::{DType, IndexOp, Result as CandleResult, Tensor};
use rayon::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    #[error("expected a [b, n, c, t, h, w] rgb tensor, got shape {dims:?}")]
    BadShape { dims: Vec<usize> },

    #[error("expected {expected} filenames for the batch, got {got}")]
    FilenameCount { expected: usize, got: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("gif encoding error: {0}")]
    Gif(#[from] gif::EncodingError),

    #[error("candle error: {0}")]
    Candle(#[from] candle_core::Error),
}

/// Tile a `[n, c, h, w]` batch of images into a single `[c, H, W]` grid with
/// `nrow` images per row. Incomplete rows are padded with black cells.
pub fn make_grid(images: &Tensor, nrow: usize) -> CandleResult<Tensor> {
    let (n, c, h, w) = images.dims4()?;
    let cols = nrow.clamp(1, n.max(1));
    let rows = n.div_ceil(cols);

    let mut row_tensors = Vec::with_capacity(rows);
    for row in 0..rows {
        let mut cells = Vec::with_capacity(cols);
        for col in 0..cols {
            let idx = row * cols + col;
            if idx < n {
                cells.push(images.i(idx)?);
            } else {
                cells.push(Tensor::zeros((c, h, w), images.dtype(), images.device())?);
            }
        }
        row_tensors.push(Tensor::cat(&cells, 2)?);
    }
    Tensor::cat(&row_tensors, 1)
}

/// Write one GIF per batch item under `dir`, named `<filename>.gif`.
///
/// `batch` is `[b, n, c, t, h, w]` with 3 channels and values in `[-1, 1]`
/// (clamped here); `filenames` supplies one stem per batch item.
pub fn save_videos(
    batch: &Tensor,
    dir: &Path,
    filenames: &[impl AsRef<str>],
    fps: u32,
) -> Result<(), VideoError> {
    let dims = batch.dims().to_vec();
    let &[b, n, c, t, h, w] = dims.as_slice() else {
        return Err(VideoError::BadShape { dims });
    };
    if c != 3 {
        return Err(VideoError::BadShape { dims });
    }
    if filenames.len() != b {
        return Err(VideoError::FilenameCount {
            expected: b,
            got: filenames.len(),
        });
    }
    // GIF frame dimensions are u16.
    if n * w > u16::MAX as usize || h > u16::MAX as usize {
        return Err(VideoError::BadShape { dims });
    }

    std::fs::create_dir_all(dir)?;
    let delay = (100.0 / fps.max(1) as f64).round().max(1.0) as u16;

    for (idx, stem) in filenames.iter().enumerate() {
        // [n, c, t, h, w] -> [t, n, c, h, w]
        let video = batch
            .i(idx)?
            .to_dtype(DType::F32)?
            .clamp(-1f64, 1f64)?
            .permute((2, 0, 1, 3, 4))?;

        let mut frame_data = Vec::with_capacity(t);
        for frame_idx in 0..t {
            let sheet = video.i(frame_idx)?; // [n, c, h, w]
            let grid = make_grid(&sheet, n)?; // [c, h, n*w]
            let rgb = ((grid + 1.0)? * 127.5)?
                .clamp(0f64, 255f64)?
                .to_dtype(DType::U8)?
                .permute((1, 2, 0))?; // [h, n*w, c]
            frame_data.push(rgb.flatten_all()?.to_vec1::<u8>()?);
        }

        let grid_w = (n * w) as u16;
        let grid_h = h as u16;
        let frames: Vec<_> = frame_data
            .par_iter()
            .map(|data| {
                let mut frame = gif::Frame::from_rgb_speed(grid_w, grid_h, data, 30);
                frame.delay = delay;
                frame
            })
            .collect();

        let path = dir.join(format!("{}.gif", stem.as_ref()));
        let mut file = File::create(&path)?;
        let mut encoder = gif::Encoder::new(&mut file, grid_w, grid_h, &[])?;
        encoder.set_repeat(gif::Repeat::Infinite)?;
        for frame in &frames {
            encoder.write_frame(frame)?;
        }
        info!("saved {} frames to {}", t, path.display());
    }

    Ok(())
}
