//! Wire format constants and fixed-layout records

use bytemuck::{Pod, Zeroable};

use crate::{Result, UcmError};

/// Magic number at the start of every ucm file
pub const MAGIC: i32 = 47_561_009;

/// Size of the fixed part of a window record
pub const WINDOW_RECORD_SIZE: usize = 36;

/// Byte order of a ucm stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

impl Endian {
    /// Byte order of the host
    #[cfg(target_endian = "little")]
    pub const NATIVE: Endian = Endian::Little;
    /// Byte order of the host
    #[cfg(target_endian = "big")]
    pub const NATIVE: Endian = Endian::Big;

    /// The opposite byte order
    #[must_use]
    pub fn swapped(self) -> Self {
        match self {
            Endian::Little => Endian::Big,
            Endian::Big => Endian::Little,
        }
    }

    /// Whether this is the host byte order
    #[must_use]
    pub fn is_native(self) -> bool {
        self == Self::NATIVE
    }

    /// Work out the byte order of a stream from its first four bytes.
    ///
    /// The native interpretation is tried first, then the swapped one.
    ///
    /// # Errors
    ///
    /// Returns [`UcmError::BadMagic`] if neither interpretation gives
    /// [`MAGIC`].
    pub fn detect(magic: [u8; 4]) -> Result<Self> {
        if i32::from_ne_bytes(magic) == MAGIC {
            return Ok(Self::NATIVE);
        }
        if i32::from_ne_bytes(magic).swap_bytes() == MAGIC {
            return Ok(Self::NATIVE.swapped());
        }
        Err(UcmError::BadMagic { found: magic })
    }

    /// Magic number as it appears on the wire in this byte order
    #[must_use]
    pub fn magic_bytes(self) -> [u8; 4] {
        match self {
            Endian::Little => MAGIC.to_le_bytes(),
            Endian::Big => MAGIC.to_be_bytes(),
        }
    }
}

/// Physical encoding of a window's pixels, the `iout` selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum PixelEncoding {
    /// 4-byte floats
    Float32 = 0,
    /// 2-byte unsigned ints, widened to floats on read
    UInt16 = 1,
}

impl PixelEncoding {
    /// Map a raw `iout` value
    #[must_use]
    pub fn from_iout(iout: i32) -> Option<Self> {
        match iout {
            0 => Some(PixelEncoding::Float32),
            1 => Some(PixelEncoding::UInt16),
            _ => None,
        }
    }

    /// Bytes per pixel on the wire
    #[must_use]
    pub fn pixel_size(self) -> usize {
        match self {
            PixelEncoding::Float32 => 4,
            PixelEncoding::UInt16 => 2,
        }
    }
}

/// Fixed part of a window record (36 bytes)
///
/// Binning and total extent are repeated in every window even though the
/// frame holds a single set of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct WindowRecord {
    /// Lower-left X pixel
    pub llx: i32,
    /// Lower-left Y pixel
    pub lly: i32,
    /// Window width
    pub nx: i32,
    /// Window height
    pub ny: i32,
    /// X binning factor
    pub xbin: i32,
    /// Y binning factor
    pub ybin: i32,
    /// Total unbinned X extent
    pub nxtot: i32,
    /// Total unbinned Y extent
    pub nytot: i32,
    /// Pixel encoding selector
    pub iout: i32,
}

static_assertions::const_assert_eq!(std::mem::size_of::<WindowRecord>(), WINDOW_RECORD_SIZE);

impl WindowRecord {
    /// Decode from wire bytes in the given byte order
    #[must_use]
    pub fn from_wire(bytes: &[u8; WINDOW_RECORD_SIZE], endian: Endian) -> Self {
        let record: WindowRecord = bytemuck::pod_read_unaligned(bytes);
        if endian.is_native() {
            record
        } else {
            record.swap_bytes()
        }
    }

    /// Encode to wire bytes in the given byte order
    #[must_use]
    pub fn to_wire(&self, endian: Endian) -> [u8; WINDOW_RECORD_SIZE] {
        let record = if endian.is_native() {
            *self
        } else {
            self.swap_bytes()
        };
        let mut out = [0u8; WINDOW_RECORD_SIZE];
        out.copy_from_slice(bytemuck::bytes_of(&record));
        out
    }

    fn swap_bytes(&self) -> Self {
        Self {
            llx: self.llx.swap_bytes(),
            lly: self.lly.swap_bytes(),
            nx: self.nx.swap_bytes(),
            ny: self.ny.swap_bytes(),
            xbin: self.xbin.swap_bytes(),
            ybin: self.ybin.swap_bytes(),
            nxtot: self.nxtot.swap_bytes(),
            nytot: self.nytot.swap_bytes(),
            iout: self.iout.swap_bytes(),
        }
    }
}
