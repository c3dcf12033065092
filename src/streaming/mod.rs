pub mod buffer;
pub mod event;
pub mod frame;

pub use buffer::ChunkBuffer;
pub use event::{Status, StreamEvent};
pub use frame::{DATA_PREFIX, EventFrameParser};
