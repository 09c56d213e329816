//! Growth policy of mirrored sequence buffers

use serde::{Deserialize, Serialize};

use crate::constants::growth::{
    DEFAULT_CPU_CAPACITY, DEFAULT_CPU_GROW_RATE, DEFAULT_DEVICE_CAPACITY,
    DEFAULT_DEVICE_GROW_RATE, DEFAULT_STACK_CAPACITY, DEFAULT_STACK_GROW_RATE, MIN_GROW_RATE,
};
use crate::error::{MirrorError, MirrorResult};

/// Initial capacities and growth rates, all counted in elements
///
/// Loadable from TOML; missing keys take their defaults:
///
/// ```toml
/// cpu_capacity = 256
/// device_grow_rate = 2.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    pub cpu_capacity: usize,
    pub device_capacity: usize,
    pub stack_capacity: usize,
    pub cpu_grow_rate: f64,
    pub device_grow_rate: f64,
    pub stack_grow_rate: f64,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            cpu_capacity: DEFAULT_CPU_CAPACITY,
            device_capacity: DEFAULT_DEVICE_CAPACITY,
            stack_capacity: DEFAULT_STACK_CAPACITY,
            cpu_grow_rate: DEFAULT_CPU_GROW_RATE,
            device_grow_rate: DEFAULT_DEVICE_GROW_RATE,
            stack_grow_rate: DEFAULT_STACK_GROW_RATE,
        }
    }
}

impl GrowthConfig {
    /// Same initial capacity on the CPU and device side
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.cpu_capacity = capacity;
        self.device_capacity = capacity;
        self
    }

    pub fn with_stack_capacity(mut self, capacity: usize) -> Self {
        self.stack_capacity = capacity;
        self
    }

    pub fn with_rates(mut self, cpu: f64, device: f64, stack: f64) -> Self {
        self.cpu_grow_rate = cpu;
        self.device_grow_rate = device;
        self.stack_grow_rate = stack;
        self
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> MirrorResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| MirrorError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> MirrorResult<String> {
        toml::to_string_pretty(self).map_err(|e| MirrorError::ConfigParse(e.to_string()))
    }

    /// Every rate must be finite and at least the minimum growth rate
    pub fn validate(&self) -> MirrorResult<()> {
        for (name, rate) in [
            ("cpu_grow_rate", self.cpu_grow_rate),
            ("device_grow_rate", self.device_grow_rate),
            ("stack_grow_rate", self.stack_grow_rate),
        ] {
            if !rate.is_finite() || rate < MIN_GROW_RATE {
                return Err(MirrorError::InvalidConfig(format!(
                    "{} is {}, must be at least {}",
                    name, rate, MIN_GROW_RATE
                )));
            }
        }
        Ok(())
    }
}
