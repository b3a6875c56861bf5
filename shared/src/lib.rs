pub mod grid;
pub mod mask;
pub mod protocol;
pub mod scale;
pub mod session;

pub use grid::{CoordinateCache, GridDescriptor, GridError};
pub use mask::{EditGesture, MotionMask};
pub use protocol::{Command, MotionControl, ProtocolError, VideoControl};
pub use scale::ScalingState;
pub use session::{ChannelState, MotionEffect, SessionCore, VideoEffect};
