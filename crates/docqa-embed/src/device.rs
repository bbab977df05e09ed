use candle_core::Device;

/// Pick the compute device once per model load. `APP_FORCE_CPU=1` skips accelerators.
pub fn select_device() -> Device {
    let force_cpu = std::env::var("APP_FORCE_CPU").map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if !force_cpu {
        #[cfg(feature = "metal")]
        {
            if let Ok(dev) = Device::new_metal(0) { tracing::info!("device: Metal (MPS)"); return dev; }
        }
        #[cfg(feature = "cuda")]
        {
            if let Ok(dev) = Device::new_cuda(0) { tracing::info!("device: CUDA 0"); return dev; }
        }
    }
    tracing::info!("device: CPU");
    Device::Cpu
}
