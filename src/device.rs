//! Process-wide device binding.
//!
//! Multi-process launchers hand each worker a device index through the
//! `LOCAL_RANK` environment variable. The first [`setup_device`] call binds
//! the process to that device; later calls are no-ops that return the bound
//! device regardless of their argument.

use candle_core::Device;
use std::sync::OnceLock;
use tracing::{info, warn};

static DEVICE: OnceLock<Device> = OnceLock::new();

/// Environment variable carrying the per-process device index.
pub const LOCAL_RANK_ENV: &str = "LOCAL_RANK";

/// Device index for this process from the environment, defaulting to 0.
pub fn local_rank_from_env() -> usize {
    std::env::var(LOCAL_RANK_ENV)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

/// Bind this process to CUDA device `local_rank`, falling back to CPU when
/// CUDA is unavailable. Idempotent: only the first call selects a device.
pub fn setup_device(local_rank: usize) -> &'static Device {
    DEVICE.get_or_init(|| match Device::new_cuda(local_rank) {
        Ok(device) => {
            info!("bound to cuda:{}", local_rank);
            device
        }
        Err(err) => {
            warn!("cuda:{} unavailable ({}), using cpu", local_rank, err);
            Device::Cpu
        }
    })
}

/// The bound device, if [`setup_device`] has run.
pub fn current_device() -> Option<&'static Device> {
    DEVICE.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_is_idempotent() {
        let first = setup_device(0) as *const Device;
        let second = setup_device(7) as *const Device;
        assert_eq!(first, second);
    }
}
