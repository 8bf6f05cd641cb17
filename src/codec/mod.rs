//! Binary ucm format
//!
//! Layout, in the byte order fixed by the magic number:
//!
//! ```text
//! i32 magic (47561009)
//! i32 header item count, then per item:
//!     string name, i32 type, string comment, typed payload
//! i32 ccd count, then per ccd:
//!     i32 window count, then per window:
//!         i32 llx, lly, nx, ny, xbin, ybin, nxtot, nytot, iout
//!         nx*ny pixels (f32 if iout = 0, u16 if iout = 1)
//! ```
//!
//! Strings are an `i32` byte count followed by the raw bytes.

mod format;
mod item;
mod reader;
pub mod wire;
mod writer;

pub use format::{Endian, PixelEncoding, WindowRecord, MAGIC, WINDOW_RECORD_SIZE};
pub use item::{check_item, read_item, write_item};
pub use reader::FrameReader;
pub use writer::FrameWriter;

use std::io::{Read, Write};

use crate::config::LimitsConfig;
use crate::frame::Frame;
use crate::Result;

/// Decode a frame with default limits
///
/// # Errors
///
/// Returns error if the stream is not a complete, valid frame
pub fn decode<R: Read>(reader: R) -> Result<Frame> {
    decode_with(reader, &LimitsConfig::default())
}

/// Decode a frame with the given limits
///
/// # Errors
///
/// Returns error if the stream is not a complete, valid frame
pub fn decode_with<R: Read>(reader: R, limits: &LimitsConfig) -> Result<Frame> {
    FrameReader::new(reader, limits.clone())?.read_frame()
}

/// Encode a frame in host byte order
///
/// # Errors
///
/// Returns error if the frame cannot be represented or the write fails
pub fn encode<W: Write>(frame: &Frame, writer: W) -> Result<()> {
    encode_with(frame, writer, Endian::NATIVE)
}

/// Encode a frame in the given byte order
///
/// # Errors
///
/// Returns error if the frame cannot be represented or the write fails
pub fn encode_with<W: Write>(frame: &Frame, writer: W, endian: Endian) -> Result<()> {
    FrameWriter::new(writer, endian).write_frame(frame)
}
