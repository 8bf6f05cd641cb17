//! Header item encoding and decoding
//!
//! Each item is laid out as name, type code, comment, then a payload whose
//! shape depends on the type. Reserved types have no known payload size, so
//! hitting one aborts the whole frame rather than risk losing sync.

use std::io::{Read, Write};

use super::wire::{WireReader, WireWriter};
use crate::config::LimitsConfig;
use crate::header::{HeaderItem, HeaderValue, TypeTag, UtcTime};
use crate::{Result, UcmError};

/// Read one header item
///
/// # Errors
///
/// Returns [`UcmError::UnknownTypeTag`] for codes outside the type table,
/// [`UcmError::UnsupportedType`] for reserved types, and format errors for
/// truncated or oversized fields.
pub fn read_item<R: Read>(r: &mut WireReader<R>, limits: &LimitsConfig) -> Result<HeaderItem> {
    let name = r.read_string("header item name", limits.max_string_len)?;

    let tag_offset = r.offset();
    let code = r.read_i32("header item type")?;
    let tag = TypeTag::from_code(code).ok_or(UcmError::UnknownTypeTag {
        tag: code,
        offset: tag_offset,
    })?;

    let comment = r.read_string("header item comment", limits.max_string_len)?;

    let value = match tag {
        TypeTag::Double => HeaderValue::Double(r.read_f64("double value")?),
        TypeTag::Int => HeaderValue::Int(r.read_i32("int value")?),
        TypeTag::UInt => HeaderValue::UInt(r.read_u32("uint value")?),
        TypeTag::Float => HeaderValue::Float(r.read_f32("float value")?),
        TypeTag::String => {
            HeaderValue::String(r.read_string("string value", limits.max_string_len)?)
        }
        TypeTag::Bool => HeaderValue::Bool(r.read_u8("bool value")? != 0),
        TypeTag::Directory => HeaderValue::Directory,
        TypeTag::Time => {
            let mjd = r.read_i32("time day number")?;
            let hour = r.read_f64("time hour")?;
            HeaderValue::Time(UtcTime::new(mjd, hour))
        }
        TypeTag::DVector => HeaderValue::DVector(r.read_f64_vec("dvector", limits.max_vector_len)?),
        TypeTag::IVector => HeaderValue::IVector(r.read_i32_vec("ivector", limits.max_vector_len)?),
        TypeTag::FVector => HeaderValue::FVector(r.read_f32_vec("fvector", limits.max_vector_len)?),
        TypeTag::UChar => HeaderValue::UChar(r.read_u8("uchar value")?),
        TypeTag::USInt => HeaderValue::USInt(r.read_u16("usint value")?),
        TypeTag::Char
        | TypeTag::LInt
        | TypeTag::ULInt
        | TypeTag::Date
        | TypeTag::Position
        | TypeTag::Telescope => return Err(UcmError::UnsupportedType { tag, name }),
    };

    Ok(HeaderItem::new(name, value, comment))
}

/// Check that an item can be written
///
/// # Errors
///
/// Returns [`UcmError::UnsupportedType`] for reserved types
pub fn check_item(item: &HeaderItem) -> Result<()> {
    let tag = item.type_tag();
    if tag.is_supported() {
        Ok(())
    } else {
        Err(UcmError::UnsupportedType {
            tag,
            name: item.name().to_string(),
        })
    }
}

/// Write one header item
///
/// Nothing is written for an item of a reserved type.
///
/// # Errors
///
/// Returns [`UcmError::UnsupportedType`] for reserved types, or an error if
/// the write fails
pub fn write_item<W: Write>(w: &mut WireWriter<W>, item: &HeaderItem) -> Result<()> {
    check_item(item)?;

    w.write_string(item.name())?;
    w.write_i32(item.type_tag().code())?;
    w.write_string(&item.comment)?;

    match &item.value {
        HeaderValue::Double(v) => w.write_f64(*v),
        HeaderValue::Int(v) => w.write_i32(*v),
        HeaderValue::UInt(v) => w.write_u32(*v),
        HeaderValue::Float(v) => w.write_f32(*v),
        HeaderValue::String(v) => w.write_string(v),
        HeaderValue::Bool(v) => w.write_u8(u8::from(*v)),
        HeaderValue::Directory => Ok(()),
        HeaderValue::Time(t) => {
            w.write_i32(t.mjd)?;
            w.write_f64(t.hour)
        }
        HeaderValue::DVector(v) => w.write_f64_vec(v),
        HeaderValue::IVector(v) => w.write_i32_vec(v),
        HeaderValue::FVector(v) => w.write_f32_vec(v),
        HeaderValue::UChar(v) => w.write_u8(*v),
        HeaderValue::USInt(v) => w.write_u16(*v),
        HeaderValue::Char
        | HeaderValue::LInt
        | HeaderValue::ULInt
        | HeaderValue::Date
        | HeaderValue::Position
        | HeaderValue::Telescope => Err(UcmError::UnsupportedType {
            tag: item.type_tag(),
            name: item.name().to_string(),
        }),
    }
}
