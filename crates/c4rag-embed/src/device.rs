use c4rag_core::config::DeviceKind;
use candle_core::Device;
use tracing::{info, warn};

/// Falls back to the CPU when the requested accelerator is unavailable.
pub fn select_device(kind: DeviceKind) -> Device {
    if kind == DeviceKind::Metal {
        #[cfg(feature = "metal")]
        {
            if let Ok(dev) = Device::new_metal(0) { info!("🚀 Device: Metal (MPS)"); return dev; }
        }
        warn!("Metal device requested but unavailable; using CPU");
    }
    info!("🖥️  Device: CPU");
    Device::Cpu
}
