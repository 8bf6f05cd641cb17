//! Frame encoder

use std::io::Write;

use tracing::{debug, trace};

use super::format::{Endian, PixelEncoding, WindowRecord, MAGIC};
use super::item::{check_item, write_item};
use super::wire::WireWriter;
use crate::frame::{Frame, Window};
use crate::{Result, UcmError};

/// Writer for ucm frames
///
/// Pixels are always written as 4-byte floats (`iout = 0`).
pub struct FrameWriter<W> {
    wire: WireWriter<W>,
}

impl<W: Write> FrameWriter<W> {
    /// Create a writer using the given byte order
    pub fn new(inner: W, endian: Endian) -> Self {
        Self {
            wire: WireWriter::new(inner, endian),
        }
    }

    /// Write a complete frame
    ///
    /// The header is checked for reserved item types before anything is
    /// written.
    ///
    /// # Errors
    ///
    /// Returns [`UcmError::UnsupportedType`] for reserved header types,
    /// [`UcmError::InvalidFrame`] if a dimension does not fit the wire
    /// format, or an I/O error
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        for item in frame.header().items() {
            check_item(item)?;
        }

        self.wire.write_i32(MAGIC)?;

        self.wire
            .write_count(frame.header().len(), "header item count")?;
        for item in frame.header().items() {
            write_item(&mut self.wire, item)?;
        }

        self.wire.write_count(frame.ccd_count(), "ccd count")?;
        for (nc, ccd) in frame.ccds().iter().enumerate() {
            self.wire.write_count(ccd.len(), "window count")?;
            for (nw, window) in ccd.windows().iter().enumerate() {
                trace!("Writing CCD {} window {}", nc, nw);
                self.write_window(frame, window)?;
            }
        }

        self.wire.flush()?;
        debug!(
            "Encoded frame: {} header items, {} CCDs, {} bytes, {:?}-endian",
            frame.header().len(),
            frame.ccd_count(),
            self.wire.offset(),
            self.wire.endian()
        );
        Ok(())
    }

    /// Unwrap the underlying stream
    pub fn into_inner(self) -> W {
        self.wire.into_inner()
    }

    fn write_window(&mut self, frame: &Frame, window: &Window) -> Result<()> {
        let record = WindowRecord {
            llx: window.llx(),
            lly: window.lly(),
            nx: wire_dimension(window.nx(), "nx")?,
            ny: wire_dimension(window.ny(), "ny")?,
            xbin: frame.xbin(),
            ybin: frame.ybin(),
            nxtot: frame.nxtot(),
            nytot: frame.nytot(),
            iout: PixelEncoding::Float32 as i32,
        };
        self.wire.write_bytes(&record.to_wire(self.wire.endian()))?;

        match window.data().as_slice() {
            Some(pixels) => self.wire.write_f32_array(pixels),
            None => {
                let pixels: Vec<f32> = window.data().iter().copied().collect();
                self.wire.write_f32_array(&pixels)
            }
        }
    }
}

fn wire_dimension(value: usize, name: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| UcmError::InvalidFrame(format!("window {name} {value} exceeds i32 range")))
}
