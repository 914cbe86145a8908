//! Model parameter accounting helpers.

use candle_core::Tensor;
use candle_nn::VarMap;
use tracing::info;

/// Total element count across an iterator of parameter tensors.
pub fn count_params<'a>(tensors: impl IntoIterator<Item = &'a Tensor>) -> usize {
    tensors.into_iter().map(Tensor::elem_count).sum()
}

/// [`count_params`] over a `VarMap`, logging a summary line in millions of
/// parameters when `verbose` is set.
pub fn count_varmap_params(name: &str, varmap: &VarMap, verbose: bool) -> usize {
    let vars = varmap.all_vars();
    let total = count_params(vars.iter().map(|v| v.as_tensor()));
    if verbose {
        info!("{} has {:.2} M params.", name, total as f64 * 1e-6);
    }
    total
}

/// Whether any of `patterns` occurs as a substring of the parameter `name`.
///
/// Used to select parameter subsets (freezing, LoRA targeting) by partial
/// name.
pub fn is_target_param(name: &str, patterns: &[impl AsRef<str>]) -> bool {
    patterns.iter().any(|p| name.contains(p.as_ref()))
}
