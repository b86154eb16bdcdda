use std::str::FromStr;

use candle_core::Device;
use tracing::info;

use recom_core::Error;

/// Where the encoder runs, as requested by `model.device`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevicePreference {
    /// First accelerator compiled in and present, else the CPU.
    Auto,
    Cpu,
}

impl FromStr for DevicePreference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            other => Err(Error::InvalidConfig(format!("model.device must be 'auto' or 'cpu', got '{other}'"))),
        }
    }
}

pub fn select_device(preference: DevicePreference) -> Device {
    if preference == DevicePreference::Cpu {
        info!("device: CPU (forced)");
        return Device::Cpu;
    }
    #[cfg(feature = "cuda")]
    match Device::new_cuda(0) {
        Ok(dev) => {
            info!("device: CUDA 0");
            return dev;
        }
        Err(e) => tracing::warn!(error = %e, "CUDA unavailable"),
    }
    #[cfg(feature = "metal")]
    match Device::new_metal(0) {
        Ok(dev) => {
            info!("device: Metal (MPS)");
            return dev;
        }
        Err(e) => tracing::warn!(error = %e, "Metal unavailable"),
    }
    info!("device: CPU");
    Device::Cpu
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preference_parses_known_values() {
        assert_eq!("auto".parse::<DevicePreference>().unwrap(), DevicePreference::Auto);
        assert_eq!(" CPU ".parse::<DevicePreference>().unwrap(), DevicePreference::Cpu);
        assert_eq!("".parse::<DevicePreference>().unwrap(), DevicePreference::Auto);
        assert!(matches!("tpu".parse::<DevicePreference>(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn forced_cpu_is_cpu() {
        assert!(select_device(DevicePreference::Cpu).is_cpu());
    }

    #[cfg(not(any(feature = "cuda", feature = "metal")))]
    #[test]
    fn auto_without_accelerators_falls_back_to_cpu() {
        assert!(select_device(DevicePreference::Auto).is_cpu());
    }
}
