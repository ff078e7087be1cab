use std::fmt::{self, Display};

use log::warn;

/// Where a run would like to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cuda(usize),
    Mps,
    Cpu,
}

/// Reports which accelerators are present.
pub trait DeviceProbe {
    fn cuda_available(&self) -> bool;
    fn mps_available(&self) -> bool;
}

/// The probe of the host backend, which has no accelerators.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostProbe;

impl DeviceProbe for HostProbe {
    fn cuda_available(&self) -> bool {
        false
    }

    fn mps_available(&self) -> bool {
        false
    }
}

impl Device {
    /// Picks the first GPU if CUDA is present, then MPS, then the CPU, warning about every tier
    /// that isn't available.
    ///
    /// # Arguments
    /// * `gpus` - The requested GPU indices, CUDA is only considered when there's at least one.
    /// * `probe` - What is actually available.
    pub fn resolve(gpus: &[usize], probe: &dyn DeviceProbe) -> Self {
        if let Some(&gpu) = gpus.first() {
            if probe.cuda_available() {
                return Self::Cuda(gpu);
            }

            warn!("CUDA is not available, can't use gpu {gpu}");
        }

        if probe.mps_available() {
            return Self::Mps;
        }

        warn!("MPS is not available, defaulting to the cpu");
        Self::Cpu
    }
}

impl Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cuda(gpu) => write!(f, "cuda:{gpu}"),
            Self::Mps => write!(f, "mps"),
            Self::Cpu => write!(f, "cpu"),
        }
    }
}
