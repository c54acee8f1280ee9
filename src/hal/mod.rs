pub mod traits;
pub mod types;
pub mod format_converter;
pub mod channel_mapper;
pub mod drivers;
pub mod mock;

pub use traits::{HardwareDriver, Device, RenderFn};
pub use types::{
    HardwareFormat, SampleFormat, AudioFormat, NegotiatedFormat, StreamRequest,
    DeviceId, DeviceDescriptor, SampleBufferMut,
};
pub use format_converter::FormatTable;
pub use channel_mapper::{ChannelShim, ShimOutcome};
