//! In-memory frame: header plus CCDs of pixel windows

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use ndarray::{Array2, ArrayViewMut2};
use tracing::debug;

use crate::codec;
use crate::config::Config;
use crate::header::Header;
use crate::{Result, UcmError};

/// File extension of ucm frames
pub const EXTENSION: &str = "ucm";

/// Rectangular block of pixels with its lower-left position on the CCD
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    llx: i32,
    lly: i32,
    data: Array2<f32>,
}

impl Window {
    /// Create a window from a `(ny, nx)` array
    #[must_use]
    pub fn new(llx: i32, lly: i32, data: Array2<f32>) -> Self {
        Self { llx, lly, data }
    }

    /// Create a zero-filled window of `nx` by `ny` pixels
    #[must_use]
    pub fn zeros(llx: i32, lly: i32, nx: usize, ny: usize) -> Self {
        Self::new(llx, lly, Array2::zeros((ny, nx)))
    }

    /// Lower-left X pixel
    #[must_use]
    pub fn llx(&self) -> i32 {
        self.llx
    }

    /// Lower-left Y pixel
    #[must_use]
    pub fn lly(&self) -> i32 {
        self.lly
    }

    /// `(llx, lly)`
    #[must_use]
    pub fn offset(&self) -> (i32, i32) {
        (self.llx, self.lly)
    }

    /// Width in pixels
    #[must_use]
    pub fn nx(&self) -> usize {
        self.data.ncols()
    }

    /// Height in pixels
    #[must_use]
    pub fn ny(&self) -> usize {
        self.data.nrows()
    }

    /// `(ny, nx)`
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Pixel values, row `y` then column `x`
    #[must_use]
    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    /// Editable pixel values; the shape stays fixed
    pub fn data_mut(&mut self) -> ArrayViewMut2<'_, f32> {
        self.data.view_mut()
    }

    /// Smallest pixel value, `None` for an empty window
    #[must_use]
    pub fn min(&self) -> Option<f32> {
        self.data.iter().copied().reduce(f32::min)
    }

    /// Largest pixel value, `None` for an empty window
    #[must_use]
    pub fn max(&self) -> Option<f32> {
        self.data.iter().copied().reduce(f32::max)
    }
}

/// Ordered windows of one detector
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ccd {
    windows: Vec<Window>,
}

impl Ccd {
    /// Create a CCD from its windows
    #[must_use]
    pub fn new(windows: Vec<Window>) -> Self {
        Self { windows }
    }

    /// Windows in file order
    #[must_use]
    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    /// Window by index
    #[must_use]
    pub fn window(&self, index: usize) -> Option<&Window> {
        self.windows.get(index)
    }

    /// Mutable window by index
    pub fn window_mut(&mut self, index: usize) -> Option<&mut Window> {
        self.windows.get_mut(index)
    }

    /// Number of windows
    #[must_use]
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// True if the CCD has no windows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Smallest pixel over all windows, `0.0` when there are no pixels
    #[must_use]
    pub fn min(&self) -> f32 {
        self.windows.iter().filter_map(Window::min).reduce(f32::min).unwrap_or(0.0)
    }

    /// Largest pixel over all windows, `0.0` when there are no pixels
    #[must_use]
    pub fn max(&self) -> f32 {
        self.windows.iter().filter_map(Window::max).reduce(f32::max).unwrap_or(0.0)
    }
}

impl FromIterator<Window> for Ccd {
    fn from_iter<I: IntoIterator<Item = Window>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A complete ucm frame
///
/// Binning factors and total extent are frame-wide even though the file
/// repeats them in every window.
#[derive(Debug, Clone)]
pub struct Frame {
    header: Header,
    ccds: Vec<Ccd>,
    xbin: i32,
    ybin: i32,
    nxtot: i32,
    nytot: i32,
}

impl Frame {
    /// Assemble a frame from its parts
    #[must_use]
    pub fn new(header: Header, ccds: Vec<Ccd>, xbin: i32, ybin: i32, nxtot: i32, nytot: i32) -> Self {
        Self {
            header,
            ccds,
            xbin,
            ybin,
            nxtot,
            nytot,
        }
    }

    /// Read a frame file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened or is not a valid frame
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, &Config::default())
    }

    /// Read a frame file using the given decode limits
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened or is not a valid frame
    pub fn open_with(path: &Path, config: &Config) -> Result<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(UcmError::Truncated {
                offset: 0,
                context: "magic number",
            });
        }

        // SAFETY: the map is read-only and dropped before this function returns.
        let mmap = unsafe { Mmap::map(&file)? };
        debug!("Decoding {} ({} bytes)", path.display(), mmap.len());

        codec::decode_with(&mmap[..], &config.limits)
    }

    /// Write the frame to a file, appending `.ucm` if needed
    ///
    /// Returns the path actually written.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written or the frame cannot be
    /// encoded
    pub fn save(&self, path: &Path) -> Result<PathBuf> {
        self.save_with(path, &Config::default())
    }

    /// Write the frame to a file with the given output options
    ///
    /// An existing file is left unchanged if the frame cannot be encoded.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written or the frame cannot be
    /// encoded
    pub fn save_with(&self, path: &Path, config: &Config) -> Result<PathBuf> {
        let path = if config.output.append_extension {
            with_extension(path)
        } else {
            path.to_path_buf()
        };

        // Nothing touches the target until encoding has succeeded
        let mut bytes = Vec::new();
        codec::encode_with(self, &mut bytes, config.output.byte_order.endian())?;

        let mut out = BufWriter::new(File::create(&path)?);
        out.write_all(&bytes)?;
        out.into_inner().map_err(|e| UcmError::Io(e.into_error()))?;

        debug!("Wrote {}", path.display());
        Ok(path)
    }

    /// Decode a frame from an in-memory byte sequence
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a valid frame
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        codec::decode(bytes)
    }

    /// Encode the frame in host byte order
    ///
    /// # Errors
    ///
    /// Returns error if the frame cannot be encoded
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        codec::encode(self, &mut out)?;
        Ok(out)
    }

    /// Header items
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Editable header items
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    /// All CCDs
    #[must_use]
    pub fn ccds(&self) -> &[Ccd] {
        &self.ccds
    }

    /// CCD by index
    #[must_use]
    pub fn ccd(&self, ccd: usize) -> Option<&Ccd> {
        self.ccds.get(ccd)
    }

    /// Number of CCDs
    #[must_use]
    pub fn ccd_count(&self) -> usize {
        self.ccds.len()
    }

    /// Number of windows of a CCD
    #[must_use]
    pub fn window_count(&self, ccd: usize) -> Option<usize> {
        self.ccd(ccd).map(Ccd::len)
    }

    /// Window `win` of CCD `ccd`
    #[must_use]
    pub fn window(&self, ccd: usize, win: usize) -> Option<&Window> {
        self.ccd(ccd).and_then(|c| c.window(win))
    }

    /// Mutable window `win` of CCD `ccd`
    pub fn window_mut(&mut self, ccd: usize, win: usize) -> Option<&mut Window> {
        self.ccds.get_mut(ccd).and_then(|c| c.window_mut(win))
    }

    /// `(llx, lly)` of a window
    #[must_use]
    pub fn offset(&self, ccd: usize, win: usize) -> Option<(i32, i32)> {
        self.window(ccd, win).map(Window::offset)
    }

    /// `(ny, nx)` of a window
    #[must_use]
    pub fn shape(&self, ccd: usize, win: usize) -> Option<(usize, usize)> {
        self.window(ccd, win).map(Window::shape)
    }

    /// X binning factor
    #[must_use]
    pub fn xbin(&self) -> i32 {
        self.xbin
    }

    /// Y binning factor
    #[must_use]
    pub fn ybin(&self) -> i32 {
        self.ybin
    }

    /// Total unbinned X extent
    ///
    /// Decoded frames without windows report 1.
    #[must_use]
    pub fn nxtot(&self) -> i32 {
        self.nxtot
    }

    /// Total unbinned Y extent
    ///
    /// Decoded frames without windows report 1.
    #[must_use]
    pub fn nytot(&self) -> i32 {
        self.nytot
    }

    /// Smallest pixel of a CCD (`0.0` if it has no windows)
    #[must_use]
    pub fn min(&self, ccd: usize) -> Option<f32> {
        self.ccd(ccd).map(Ccd::min)
    }

    /// Largest pixel of a CCD (`0.0` if it has no windows)
    #[must_use]
    pub fn max(&self, ccd: usize) -> Option<f32> {
        self.ccd(ccd).map(Ccd::max)
    }

    /// Whether two frames share a layout.
    ///
    /// Compares CCD and window counts, window shapes and offsets, binning and
    /// total extent. Header contents and pixel values are ignored.
    #[must_use]
    pub fn same_layout(&self, other: &Frame) -> bool {
        if self.xbin != other.xbin
            || self.ybin != other.ybin
            || self.nxtot != other.nxtot
            || self.nytot != other.nytot
            || self.ccds.len() != other.ccds.len()
        {
            return false;
        }

        self.ccds.iter().zip(&other.ccds).all(|(a, b)| {
            a.len() == b.len()
                && a.windows
                    .iter()
                    .zip(&b.windows)
                    .all(|(wa, wb)| wa.shape() == wb.shape() && wa.offset() == wb.offset())
        })
    }
}

fn with_extension(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == EXTENSION) {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(".");
        name.push(EXTENSION);
        PathBuf::from(name)
    }
}
