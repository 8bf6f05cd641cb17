//! Byte-order aware primitive reads and writes
//!
//! Scalars, length-prefixed strings and count-prefixed vectors, all in the
//! byte order chosen for the stream. Both ends track the byte offset so
//! errors can say where they happened.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use tracing::debug;

use super::format::Endian;
use crate::{Result, UcmError};

macro_rules! read_scalar {
    ($(#[$doc:meta] $name:ident => $ty:ty, $size:expr, $read:ident;)*) => {
        $(
            #[$doc]
            ///
            /// # Errors
            ///
            /// Returns [`UcmError::Truncated`] if the stream ends early
            pub fn $name(&mut self, context: &'static str) -> Result<$ty> {
                let buf = self.read_array::<$size>(context)?;
                Ok(match self.endian {
                    Endian::Little => LittleEndian::$read(&buf),
                    Endian::Big => BigEndian::$read(&buf),
                })
            }
        )*
    };
}

macro_rules! write_scalar {
    ($(#[$doc:meta] $name:ident => $ty:ty, $size:expr, $write:ident;)*) => {
        $(
            #[$doc]
            ///
            /// # Errors
            ///
            /// Returns error if the underlying write fails
            pub fn $name(&mut self, value: $ty) -> Result<()> {
                let mut buf = [0u8; $size];
                match self.endian {
                    Endian::Little => LittleEndian::$write(&mut buf, value),
                    Endian::Big => BigEndian::$write(&mut buf, value),
                }
                self.write_bytes(&buf)
            }
        )*
    };
}

fn short_read(err: io::Error, offset: u64, context: &'static str) -> UcmError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        UcmError::Truncated { offset, context }
    } else {
        UcmError::Io(err)
    }
}

/// Reader of wire primitives
pub struct WireReader<R> {
    inner: R,
    endian: Endian,
    offset: u64,
}

impl<R: Read> WireReader<R> {
    /// Wrap a stream positioned at `offset` bytes from its start
    pub fn new(inner: R, endian: Endian, offset: u64) -> Self {
        Self {
            inner,
            endian,
            offset,
        }
    }

    /// Byte order in use
    #[must_use]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Bytes consumed from the start of the stream
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Unwrap the underlying stream
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Read exactly `N` bytes
    ///
    /// # Errors
    ///
    /// Returns [`UcmError::Truncated`] if the stream ends early
    pub fn read_array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner
            .read_exact(&mut buf)
            .map_err(|e| short_read(e, self.offset, context))?;
        self.offset += N as u64;
        Ok(buf)
    }

    /// Read exactly `len` bytes.
    ///
    /// The buffer grows with the data actually read, so a corrupt length
    /// on a short stream fails without a large up-front allocation.
    ///
    /// # Errors
    ///
    /// Returns [`UcmError::Truncated`] if the stream ends early
    pub fn read_bytes(&mut self, len: usize, context: &'static str) -> Result<Vec<u8>> {
        let start = self.offset;
        let mut buf = Vec::new();
        (&mut self.inner)
            .take(len as u64)
            .read_to_end(&mut buf)
            .map_err(|e| short_read(e, start, context))?;
        self.offset += buf.len() as u64;
        if buf.len() < len {
            return Err(UcmError::Truncated {
                offset: start,
                context,
            });
        }
        Ok(buf)
    }

    read_scalar! {
        /// Read a signed 32-bit int
        read_i32 => i32, 4, read_i32;
        /// Read an unsigned 32-bit int
        read_u32 => u32, 4, read_u32;
        /// Read an unsigned 16-bit int
        read_u16 => u16, 2, read_u16;
        /// Read a 4-byte float
        read_f32 => f32, 4, read_f32;
        /// Read an 8-byte float
        read_f64 => f64, 8, read_f64;
    }

    /// Read a single byte
    ///
    /// # Errors
    ///
    /// Returns [`UcmError::Truncated`] if the stream ends early
    pub fn read_u8(&mut self, context: &'static str) -> Result<u8> {
        Ok(self.read_array::<1>(context)?[0])
    }

    /// Read an `i32` count and check it against `0..=max`
    ///
    /// # Errors
    ///
    /// Returns [`UcmError::InvalidFormat`] for negative or oversized counts
    pub fn read_count(&mut self, context: &'static str, max: usize) -> Result<usize> {
        let start = self.offset;
        let raw = self.read_i32(context)?;
        let count = usize::try_from(raw)
            .map_err(|_| UcmError::invalid(start, format!("negative {context}: {raw}")))?;
        if count > max {
            return Err(UcmError::invalid(
                start,
                format!("{context} {count} exceeds limit of {max}"),
            ));
        }
        Ok(count)
    }

    /// Read a length-prefixed string
    ///
    /// Text that is not valid UTF-8 is taken as Latin-1, so every byte
    /// sequence decodes.
    ///
    /// # Errors
    ///
    /// Returns error on truncation or an oversized length
    pub fn read_string(&mut self, context: &'static str, max_len: usize) -> Result<String> {
        let len = self.read_count(context, max_len)?;
        let start = self.offset;
        let bytes = self.read_bytes(len, context)?;
        Ok(String::from_utf8(bytes).unwrap_or_else(|e| {
            debug!("{} at offset {} is not UTF-8, reading as Latin-1", context, start);
            e.into_bytes().into_iter().map(char::from).collect()
        }))
    }

    /// Read `count` packed 4-byte floats
    ///
    /// # Errors
    ///
    /// Returns [`UcmError::Truncated`] if the stream ends early
    pub fn read_f32_array(&mut self, count: usize, context: &'static str) -> Result<Vec<f32>> {
        let bytes = self.read_bytes(self.byte_len(count, 4, context)?, context)?;
        if self.endian.is_native() {
            return Ok(bytemuck::pod_collect_to_vec::<u8, f32>(&bytes));
        }
        let mut out = vec![0f32; count];
        match self.endian {
            Endian::Little => LittleEndian::read_f32_into(&bytes, &mut out),
            Endian::Big => BigEndian::read_f32_into(&bytes, &mut out),
        }
        Ok(out)
    }

    /// Read `count` packed 8-byte floats
    ///
    /// # Errors
    ///
    /// Returns [`UcmError::Truncated`] if the stream ends early
    pub fn read_f64_array(&mut self, count: usize, context: &'static str) -> Result<Vec<f64>> {
        let bytes = self.read_bytes(self.byte_len(count, 8, context)?, context)?;
        let mut out = vec![0f64; count];
        match self.endian {
            Endian::Little => LittleEndian::read_f64_into(&bytes, &mut out),
            Endian::Big => BigEndian::read_f64_into(&bytes, &mut out),
        }
        Ok(out)
    }

    /// Read `count` packed signed 32-bit ints
    ///
    /// # Errors
    ///
    /// Returns [`UcmError::Truncated`] if the stream ends early
    pub fn read_i32_array(&mut self, count: usize, context: &'static str) -> Result<Vec<i32>> {
        let bytes = self.read_bytes(self.byte_len(count, 4, context)?, context)?;
        let mut out = vec![0i32; count];
        match self.endian {
            Endian::Little => LittleEndian::read_i32_into(&bytes, &mut out),
            Endian::Big => BigEndian::read_i32_into(&bytes, &mut out),
        }
        Ok(out)
    }

    /// Read `count` packed unsigned 16-bit ints
    ///
    /// # Errors
    ///
    /// Returns [`UcmError::Truncated`] if the stream ends early
    pub fn read_u16_array(&mut self, count: usize, context: &'static str) -> Result<Vec<u16>> {
        let bytes = self.read_bytes(self.byte_len(count, 2, context)?, context)?;
        let mut out = vec![0u16; count];
        match self.endian {
            Endian::Little => LittleEndian::read_u16_into(&bytes, &mut out),
            Endian::Big => BigEndian::read_u16_into(&bytes, &mut out),
        }
        Ok(out)
    }

    /// Read an `i32` count followed by that many 8-byte floats
    ///
    /// # Errors
    ///
    /// Returns error on truncation or an invalid count
    pub fn read_f64_vec(&mut self, context: &'static str, max: usize) -> Result<Vec<f64>> {
        let count = self.read_count(context, max)?;
        self.read_f64_array(count, context)
    }

    /// Read an `i32` count followed by that many 4-byte ints
    ///
    /// # Errors
    ///
    /// Returns error on truncation or an invalid count
    pub fn read_i32_vec(&mut self, context: &'static str, max: usize) -> Result<Vec<i32>> {
        let count = self.read_count(context, max)?;
        self.read_i32_array(count, context)
    }

    /// Read an `i32` count followed by that many 4-byte floats
    ///
    /// # Errors
    ///
    /// Returns error on truncation or an invalid count
    pub fn read_f32_vec(&mut self, context: &'static str, max: usize) -> Result<Vec<f32>> {
        let count = self.read_count(context, max)?;
        self.read_f32_array(count, context)
    }

    fn byte_len(&self, count: usize, size: usize, context: &'static str) -> Result<usize> {
        count
            .checked_mul(size)
            .ok_or_else(|| UcmError::invalid(self.offset, format!("{context} too large")))
    }
}

/// Writer of wire primitives
pub struct WireWriter<W> {
    inner: W,
    endian: Endian,
    offset: u64,
}

impl<W: Write> WireWriter<W> {
    /// Wrap a stream, writing in the given byte order
    pub fn new(inner: W, endian: Endian) -> Self {
        Self {
            inner,
            endian,
            offset: 0,
        }
    }

    /// Byte order in use
    #[must_use]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Bytes written so far
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Unwrap the underlying stream
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Flush the underlying stream
    ///
    /// # Errors
    ///
    /// Returns error if the flush fails
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Write raw bytes
    ///
    /// # Errors
    ///
    /// Returns error if the underlying write fails
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    write_scalar! {
        /// Write a signed 32-bit int
        write_i32 => i32, 4, write_i32;
        /// Write an unsigned 32-bit int
        write_u32 => u32, 4, write_u32;
        /// Write an unsigned 16-bit int
        write_u16 => u16, 2, write_u16;
        /// Write a 4-byte float
        write_f32 => f32, 4, write_f32;
        /// Write an 8-byte float
        write_f64 => f64, 8, write_f64;
    }

    /// Write a single byte
    ///
    /// # Errors
    ///
    /// Returns error if the underlying write fails
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    /// Write a length or count as an `i32`
    ///
    /// # Errors
    ///
    /// Returns [`UcmError::InvalidFrame`] if `count` does not fit in an `i32`
    pub fn write_count(&mut self, count: usize, context: &str) -> Result<()> {
        let count = i32::try_from(count)
            .map_err(|_| UcmError::InvalidFrame(format!("{context} {count} exceeds i32 range")))?;
        self.write_i32(count)
    }

    /// Write a length-prefixed string
    ///
    /// # Errors
    ///
    /// Returns error if the string is too long or the write fails
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_count(value.len(), "string length")?;
        self.write_bytes(value.as_bytes())
    }

    /// Write packed 4-byte floats without a count
    ///
    /// # Errors
    ///
    /// Returns error if the underlying write fails
    pub fn write_f32_array(&mut self, values: &[f32]) -> Result<()> {
        if self.endian.is_native() {
            return self.write_bytes(bytemuck::cast_slice(values));
        }
        let mut buf = vec![0u8; values.len() * 4];
        match self.endian {
            Endian::Little => LittleEndian::write_f32_into(values, &mut buf),
            Endian::Big => BigEndian::write_f32_into(values, &mut buf),
        }
        self.write_bytes(&buf)
    }

    /// Write packed 8-byte floats without a count
    ///
    /// # Errors
    ///
    /// Returns error if the underlying write fails
    pub fn write_f64_array(&mut self, values: &[f64]) -> Result<()> {
        let mut buf = vec![0u8; values.len() * 8];
        match self.endian {
            Endian::Little => LittleEndian::write_f64_into(values, &mut buf),
            Endian::Big => BigEndian::write_f64_into(values, &mut buf),
        }
        self.write_bytes(&buf)
    }

    /// Write packed signed 32-bit ints without a count
    ///
    /// # Errors
    ///
    /// Returns error if the underlying write fails
    pub fn write_i32_array(&mut self, values: &[i32]) -> Result<()> {
        let mut buf = vec![0u8; values.len() * 4];
        match self.endian {
            Endian::Little => LittleEndian::write_i32_into(values, &mut buf),
            Endian::Big => BigEndian::write_i32_into(values, &mut buf),
        }
        self.write_bytes(&buf)
    }

    /// Write packed unsigned 16-bit ints without a count
    ///
    /// # Errors
    ///
    /// Returns error if the underlying write fails
    pub fn write_u16_array(&mut self, values: &[u16]) -> Result<()> {
        let mut buf = vec![0u8; values.len() * 2];
        match self.endian {
            Endian::Little => LittleEndian::write_u16_into(values, &mut buf),
            Endian::Big => BigEndian::write_u16_into(values, &mut buf),
        }
        self.write_bytes(&buf)
    }

    /// Write a count-prefixed vector of 8-byte floats
    ///
    /// # Errors
    ///
    /// Returns error if the vector is too long or the write fails
    pub fn write_f64_vec(&mut self, values: &[f64]) -> Result<()> {
        self.write_count(values.len(), "vector length")?;
        self.write_f64_array(values)
    }

    /// Write a count-prefixed vector of 4-byte ints
    ///
    /// # Errors
    ///
    /// Returns error if the vector is too long or the write fails
    pub fn write_i32_vec(&mut self, values: &[i32]) -> Result<()> {
        self.write_count(values.len(), "vector length")?;
        self.write_i32_array(values)
    }

    /// Write a count-prefixed vector of 4-byte floats
    ///
    /// # Errors
    ///
    /// Returns error if the vector is too long or the write fails
    pub fn write_f32_vec(&mut self, values: &[f32]) -> Result<()> {
        self.write_count(values.len(), "vector length")?;
        self.write_f32_array(values)
    }
}
