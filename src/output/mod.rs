pub mod directory;
pub mod producer;
pub mod render;
pub mod session;

pub use directory::{DeviceDirectory, OutputTargets};
pub use producer::{from_fn, PlaybackProducer};
pub use session::{OutputSession, SessionState};
