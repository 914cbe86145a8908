//! Image resizing to model-friendly dimensions.
//!
//! Diffusion backbones here want spatial dims that are multiples of 64, so
//! resizing picks one uniform scale factor and snaps both dimensions to the
//! nearest 64-multiple before a Lanczos resample.

use image::imageops::FilterType;
use image::DynamicImage;

/// Granularity both output dimensions are rounded to.
pub const DIM_MULTIPLE: usize = 64;

/// How the uniform scale factor is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizePolicy {
    /// Scale so the shorter edge lands on the given length.
    ShortEdge(usize),
    /// Scale so the total pixel count lands on the given budget.
    MaxResolution(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum ImagingError {
    #[error("image has a zero dimension: {height}x{width}")]
    EmptyImage { height: usize, width: usize },

    #[error("resize policy has a zero target")]
    ZeroTarget,
}

/// Output `(height, width)` for an input of the given size under `policy`.
///
/// Both results are positive multiples of [`DIM_MULTIPLE`]; the aspect ratio
/// is preserved up to that rounding.
pub fn fit_dimensions(
    height: usize,
    width: usize,
    policy: ResizePolicy,
) -> Result<(usize, usize), ImagingError> {
    if height == 0 || width == 0 {
        return Err(ImagingError::EmptyImage { height, width });
    }
    let k = match policy {
        ResizePolicy::ShortEdge(0) | ResizePolicy::MaxResolution(0) => {
            return Err(ImagingError::ZeroTarget)
        }
        ResizePolicy::ShortEdge(target) => target as f64 / height.min(width) as f64,
        ResizePolicy::MaxResolution(budget) => {
            (budget as f64 / (height * width) as f64).sqrt()
        }
    };
    Ok((snap(height as f64 * k), snap(width as f64 * k)))
}

fn snap(dim: f64) -> usize {
    let snapped = (dim / DIM_MULTIPLE as f64).round() as usize * DIM_MULTIPLE;
    snapped.max(DIM_MULTIPLE)
}

/// Resize `image` per `policy` using Lanczos resampling.
pub fn resize_image(
    image: &DynamicImage,
    policy: ResizePolicy,
) -> Result<DynamicImage, ImagingError> {
    let (h, w) = (image.height() as usize, image.width() as usize);
    let (out_h, out_w) = fit_dimensions(h, w, policy)?;
    Ok(image.resize_exact(out_w as u32, out_h as u32, FilterType::Lanczos3))
}
