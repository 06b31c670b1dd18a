mod emitter;
mod frame;

pub use emitter::{emit, sse_response};
pub use frame::{
    ChannelConnection, Connection, FrameError, FrameWriter, WriterConnection, encode_frame,
};
