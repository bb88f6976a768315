/// Per-process battery attribution.
pub trait BatteryProbe {
    fn drain(&self, pid: &str) -> f64;
}

/// Placeholder until per-app battery stats are read from the device;
/// always reports zero.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unsupported;

impl BatteryProbe for Unsupported {
    fn drain(&self, _pid: &str) -> f64 {
        0.0
    }
}
