pub mod audio;
pub mod audio_device;

pub use audio::AudioDriver;
pub use audio_device::AudioDevice;
