//! ucm - reader and writer for ULTRACAM frame files
//!
//! A frame holds a typed, ordered header and any number of CCDs, each made
//! of rectangular pixel windows.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::multiple_crate_versions
)]

pub mod codec;
pub mod config;
pub mod error;
pub mod frame;
pub mod header;

pub use codec::{decode, encode, Endian};
pub use config::Config;
pub use error::{Result, UcmError};
pub use frame::{Ccd, Frame, Window};
pub use header::{Header, HeaderItem, HeaderValue, TypeTag, UtcTime};
