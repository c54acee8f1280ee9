pub mod audio;

pub use audio::{
    SimulatedBuffer, SimulatedDevice, SimulatedDriver, SimulatedHardware, SimulatedOutput,
};
