//! IPC codec and wire protocol.
//!
//! Frames are a big-endian `u32` length followed by a MessagePack map
//! tagged by `type`.

pub mod codec;
pub mod protocol;
