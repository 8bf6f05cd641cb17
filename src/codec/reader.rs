//! Frame decoder

use std::io::Read;

use ndarray::Array2;
use tracing::{debug, trace, warn};

use super::format::{Endian, PixelEncoding, WindowRecord, WINDOW_RECORD_SIZE};
use super::item::read_item;
use super::wire::WireReader;
use crate::config::LimitsConfig;
use crate::frame::{Ccd, Frame, Window};
use crate::header::Header;
use crate::{Result, UcmError};

/// Binning and extent carried by each window record
///
/// A frame without windows carries none, so it falls back to 1x1 binning on
/// a 1x1 extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Binning {
    xbin: i32,
    ybin: i32,
    nxtot: i32,
    nytot: i32,
}

impl Default for Binning {
    fn default() -> Self {
        Self {
            xbin: 1,
            ybin: 1,
            nxtot: 1,
            nytot: 1,
        }
    }
}

/// Reader for ucm frames
pub struct FrameReader<R> {
    wire: WireReader<R>,
    limits: LimitsConfig,
}

impl<R: Read> FrameReader<R> {
    /// Start reading a frame: checks the magic number and fixes the byte order
    ///
    /// # Errors
    ///
    /// Returns [`UcmError::BadMagic`] if the stream is not a ucm frame
    pub fn new(inner: R, limits: LimitsConfig) -> Result<Self> {
        let mut wire = WireReader::new(inner, Endian::NATIVE, 0);
        let magic = wire.read_array::<4>("magic number")?;
        let endian = Endian::detect(magic)?;
        debug!("Detected {:?}-endian frame", endian);

        Ok(Self {
            wire: WireReader::new(wire.into_inner(), endian, 4),
            limits,
        })
    }

    /// Byte order of the stream
    #[must_use]
    pub fn endian(&self) -> Endian {
        self.wire.endian()
    }

    /// Read the whole frame
    ///
    /// # Errors
    ///
    /// Returns error on any malformed, unsupported or truncated content
    pub fn read_frame(mut self) -> Result<Frame> {
        let header = self.read_header()?;

        let nccd = self.wire.read_count("ccd count", self.limits.max_ccds)?;
        debug!("Reading {} CCDs", nccd);

        let mut binning: Option<Binning> = None;
        let mut ccds = Vec::with_capacity(nccd);
        for nc in 0..nccd {
            let nwin = self.wire.read_count("window count", self.limits.max_windows)?;
            let mut windows = Vec::with_capacity(nwin);
            for nw in 0..nwin {
                let (window, window_binning) = self.read_window()?;
                trace!(
                    "CCD {} window {}: {}x{} at ({}, {})",
                    nc,
                    nw,
                    window.nx(),
                    window.ny(),
                    window.llx(),
                    window.lly()
                );
                if binning.is_some_and(|b| b != window_binning) {
                    warn!(
                        "CCD {} window {} has binning {:?}, differing from earlier windows",
                        nc, nw, window_binning
                    );
                }
                binning = Some(window_binning);
                windows.push(window);
            }
            ccds.push(Ccd::new(windows));
        }

        // Last window read decides the frame-wide values
        let Binning {
            xbin,
            ybin,
            nxtot,
            nytot,
        } = binning.unwrap_or_default();

        debug!("Decoded frame of {} bytes", self.wire.offset());
        Ok(Frame::new(header, ccds, xbin, ybin, nxtot, nytot))
    }

    /// Read the header item count and items
    ///
    /// # Errors
    ///
    /// Returns error on any malformed, unsupported or truncated item
    pub fn read_header(&mut self) -> Result<Header> {
        let count = self
            .wire
            .read_count("header item count", self.limits.max_header_items)?;
        debug!("Reading {} header items", count);

        let mut header = Header::new();
        for _ in 0..count {
            let item = read_item(&mut self.wire, &self.limits)?;
            if let Some(old) = header.set(item) {
                warn!("Duplicate header item '{}' replaced", old.name());
            }
        }
        Ok(header)
    }

    fn read_window(&mut self) -> Result<(Window, Binning)> {
        let record_offset = self.wire.offset();
        let raw = self.wire.read_array::<WINDOW_RECORD_SIZE>("window record")?;
        let record = WindowRecord::from_wire(&raw, self.wire.endian());

        let nx = dimension(record.nx, "nx", record_offset)?;
        let ny = dimension(record.ny, "ny", record_offset)?;
        let npix = nx
            .checked_mul(ny)
            .filter(|&n| n <= self.limits.max_window_pixels)
            .ok_or_else(|| {
                UcmError::invalid(
                    record_offset,
                    format!(
                        "window of {nx}x{ny} pixels exceeds limit of {}",
                        self.limits.max_window_pixels
                    ),
                )
            })?;

        let encoding =
            PixelEncoding::from_iout(record.iout).ok_or(UcmError::UnknownPixelEncoding {
                iout: record.iout,
                offset: record_offset + 32,
            })?;

        let pixels = match encoding {
            PixelEncoding::Float32 => self.wire.read_f32_array(npix, "float pixels")?,
            PixelEncoding::UInt16 => self
                .wire
                .read_u16_array(npix, "uint16 pixels")?
                .into_iter()
                .map(f32::from)
                .collect(),
        };

        let data = Array2::from_shape_vec((ny, nx), pixels)
            .map_err(|e| UcmError::invalid(record_offset, format!("window shape: {e}")))?;

        let binning = Binning {
            xbin: record.xbin,
            ybin: record.ybin,
            nxtot: record.nxtot,
            nytot: record.nytot,
        };
        Ok((Window::new(record.llx, record.lly, data), binning))
    }
}

fn dimension(value: i32, name: &str, offset: u64) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| UcmError::invalid(offset, format!("negative window {name}: {value}")))
}
