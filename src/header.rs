//! Header items and the ordered header store
//!
//! Names are dotted paths such as `Site.Observatory`. The dots are only a
//! naming convention: the store is a single flat, ordered map keyed on the
//! full name, and insertion order is the order items are written.

use std::collections::HashMap;
use std::fmt;

/// Wire type codes of header items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum TypeTag {
    /// 8-byte float
    Double = 0,
    /// Reserved
    Char = 1,
    /// 4-byte signed int
    Int = 2,
    /// 4-byte unsigned int
    UInt = 3,
    /// Reserved
    LInt = 4,
    /// Reserved
    ULInt = 5,
    /// 4-byte float
    Float = 6,
    /// Length-prefixed text
    String = 7,
    /// Single byte
    Bool = 8,
    /// Directory marker, no payload
    Directory = 9,
    /// Reserved
    Date = 10,
    /// MJD day number plus hour of day
    Time = 11,
    /// Reserved
    Position = 12,
    /// Vector of doubles
    DVector = 13,
    /// Single unsigned byte
    UChar = 14,
    /// Reserved
    Telescope = 15,
    /// 2-byte unsigned int
    USInt = 16,
    /// Vector of 4-byte ints
    IVector = 17,
    /// Vector of 4-byte floats
    FVector = 18,
}

impl TypeTag {
    /// All tags in code order
    pub const ALL: [TypeTag; 19] = [
        TypeTag::Double,
        TypeTag::Char,
        TypeTag::Int,
        TypeTag::UInt,
        TypeTag::LInt,
        TypeTag::ULInt,
        TypeTag::Float,
        TypeTag::String,
        TypeTag::Bool,
        TypeTag::Directory,
        TypeTag::Date,
        TypeTag::Time,
        TypeTag::Position,
        TypeTag::DVector,
        TypeTag::UChar,
        TypeTag::Telescope,
        TypeTag::USInt,
        TypeTag::IVector,
        TypeTag::FVector,
    ];

    /// Look up a tag by its wire code
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    /// Wire code of this tag
    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Whether items of this type can be read and written
    #[must_use]
    pub fn is_supported(self) -> bool {
        !matches!(
            self,
            TypeTag::Char
                | TypeTag::LInt
                | TypeTag::ULInt
                | TypeTag::Date
                | TypeTag::Position
                | TypeTag::Telescope
        )
    }

    /// Short lowercase name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Double => "double",
            TypeTag::Char => "char",
            TypeTag::Int => "int",
            TypeTag::UInt => "uint",
            TypeTag::LInt => "lint",
            TypeTag::ULInt => "ulint",
            TypeTag::Float => "float",
            TypeTag::String => "string",
            TypeTag::Bool => "bool",
            TypeTag::Directory => "directory",
            TypeTag::Date => "date",
            TypeTag::Time => "time",
            TypeTag::Position => "position",
            TypeTag::DVector => "dvector",
            TypeTag::UChar => "uchar",
            TypeTag::Telescope => "telescope",
            TypeTag::USInt => "usint",
            TypeTag::IVector => "ivector",
            TypeTag::FVector => "fvector",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A time stamp: integer MJD day number plus hour of day (0-24)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtcTime {
    /// Modified Julian day number
    pub mjd: i32,
    /// Hour within the day
    pub hour: f64,
}

impl UtcTime {
    /// Create a time stamp
    #[must_use]
    pub fn new(mjd: i32, hour: f64) -> Self {
        Self { mjd, hour }
    }
}

impl fmt::Display for UtcTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MJD {} + {:.6} h", self.mjd, self.hour)
    }
}

/// Value of a header item
///
/// Every wire type has a variant. The payload-free `Char`, `LInt`, `ULInt`,
/// `Date`, `Position` and `Telescope` variants are reserved by the format;
/// encoding them fails with [`UcmError::UnsupportedType`](crate::UcmError).
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    /// 8-byte float
    Double(f64),
    /// Reserved
    Char,
    /// 4-byte signed int
    Int(i32),
    /// 4-byte unsigned int
    UInt(u32),
    /// Reserved
    LInt,
    /// Reserved
    ULInt,
    /// 4-byte float
    Float(f32),
    /// Text
    String(String),
    /// Boolean
    Bool(bool),
    /// Directory marker
    Directory,
    /// Reserved
    Date,
    /// Time stamp
    Time(UtcTime),
    /// Reserved
    Position,
    /// Vector of doubles
    DVector(Vec<f64>),
    /// Unsigned byte
    UChar(u8),
    /// Reserved
    Telescope,
    /// 2-byte unsigned int
    USInt(u16),
    /// Vector of ints
    IVector(Vec<i32>),
    /// Vector of floats
    FVector(Vec<f32>),
}

impl HeaderValue {
    /// Type tag matching this value
    #[must_use]
    pub fn type_tag(&self) -> TypeTag {
        match self {
            HeaderValue::Double(_) => TypeTag::Double,
            HeaderValue::Char => TypeTag::Char,
            HeaderValue::Int(_) => TypeTag::Int,
            HeaderValue::UInt(_) => TypeTag::UInt,
            HeaderValue::LInt => TypeTag::LInt,
            HeaderValue::ULInt => TypeTag::ULInt,
            HeaderValue::Float(_) => TypeTag::Float,
            HeaderValue::String(_) => TypeTag::String,
            HeaderValue::Bool(_) => TypeTag::Bool,
            HeaderValue::Directory => TypeTag::Directory,
            HeaderValue::Date => TypeTag::Date,
            HeaderValue::Time(_) => TypeTag::Time,
            HeaderValue::Position => TypeTag::Position,
            HeaderValue::DVector(_) => TypeTag::DVector,
            HeaderValue::UChar(_) => TypeTag::UChar,
            HeaderValue::Telescope => TypeTag::Telescope,
            HeaderValue::USInt(_) => TypeTag::USInt,
            HeaderValue::IVector(_) => TypeTag::IVector,
            HeaderValue::FVector(_) => TypeTag::FVector,
        }
    }

    /// Numeric value as `f64`, for scalar numeric types
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            HeaderValue::Double(v) => Some(v),
            HeaderValue::Float(v) => Some(f64::from(v)),
            HeaderValue::Int(v) => Some(f64::from(v)),
            HeaderValue::UInt(v) => Some(f64::from(v)),
            HeaderValue::USInt(v) => Some(f64::from(v)),
            HeaderValue::UChar(v) => Some(f64::from(v)),
            _ => None,
        }
    }

    /// Text value, for string items
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Double(v) => write!(f, "{v}"),
            HeaderValue::Int(v) => write!(f, "{v}"),
            HeaderValue::UInt(v) => write!(f, "{v}"),
            HeaderValue::Float(v) => write!(f, "{v}"),
            HeaderValue::String(v) => write!(f, "{v}"),
            HeaderValue::Bool(v) => write!(f, "{v}"),
            HeaderValue::Directory => Ok(()),
            HeaderValue::Time(t) => write!(f, "{t}"),
            HeaderValue::DVector(v) => write!(f, "{v:?}"),
            HeaderValue::UChar(v) => write!(f, "{v}"),
            HeaderValue::USInt(v) => write!(f, "{v}"),
            HeaderValue::IVector(v) => write!(f, "{v:?}"),
            HeaderValue::FVector(v) => write!(f, "{v:?}"),
            HeaderValue::Char
            | HeaderValue::LInt
            | HeaderValue::ULInt
            | HeaderValue::Date
            | HeaderValue::Position
            | HeaderValue::Telescope => write!(f, "<{}>", self.type_tag()),
        }
    }
}

/// One named, typed, commented header entry
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderItem {
    name: String,
    /// Free-text comment
    pub comment: String,
    /// Typed value
    pub value: HeaderValue,
}

impl HeaderItem {
    /// Create an item
    pub fn new(name: impl Into<String>, value: HeaderValue, comment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comment: comment.into(),
            value,
        }
    }

    /// Full dotted name
    ///
    /// Fixed at construction so the store's name index stays valid.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create a directory marker item
    pub fn directory(name: impl Into<String>, comment: impl Into<String>) -> Self {
        Self::new(name, HeaderValue::Directory, comment)
    }

    /// Wire type of the value
    #[must_use]
    pub fn type_tag(&self) -> TypeTag {
        self.value.type_tag()
    }

    /// Nesting depth implied by the dotted name (0 for top level)
    #[must_use]
    pub fn depth(&self) -> usize {
        self.name.matches('.').count()
    }

    /// Last segment of the dotted name
    #[must_use]
    pub fn leaf_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

/// Ordered, flat store of header items keyed on full dotted name
#[derive(Debug, Clone, Default)]
pub struct Header {
    items: Vec<HeaderItem>,
    index: HashMap<String, usize>,
}

impl Header {
    /// Create an empty header
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an item by full name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HeaderItem> {
        self.index.get(name).map(|&i| &self.items[i])
    }

    /// Mutable lookup by full name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut HeaderItem> {
        match self.index.get(name) {
            Some(&i) => Some(&mut self.items[i]),
            None => None,
        }
    }

    /// Whether an item of this name exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Insert an item, keyed on its name
    ///
    /// An existing item of the same name is replaced in place and returned;
    /// otherwise the item is appended.
    pub fn set(&mut self, item: HeaderItem) -> Option<HeaderItem> {
        if let Some(&i) = self.index.get(&item.name) {
            return Some(std::mem::replace(&mut self.items[i], item));
        }
        self.index.insert(item.name.clone(), self.items.len());
        self.items.push(item);
        None
    }

    /// Shorthand for [`Header::set`] with a freshly built item
    pub fn set_value(
        &mut self,
        name: impl Into<String>,
        value: HeaderValue,
        comment: impl Into<String>,
    ) -> Option<HeaderItem> {
        self.set(HeaderItem::new(name, value, comment))
    }

    /// Remove an item, keeping the order of the rest
    pub fn delete(&mut self, name: &str) -> Option<HeaderItem> {
        let pos = self.index.remove(name)?;
        let removed = self.items.remove(pos);
        for item in &self.items[pos..] {
            if let Some(i) = self.index.get_mut(&item.name) {
                *i -= 1;
            }
        }
        Some(removed)
    }

    /// Items in insertion order
    pub fn items(&self) -> impl Iterator<Item = &HeaderItem> + '_ {
        self.items.iter()
    }

    /// Items directly below a dotted directory name
    ///
    /// `children("Site")` yields `Site.Observatory` but not
    /// `Site.Telescope.Name`.
    pub fn children<'a>(&'a self, dir: &'a str) -> impl Iterator<Item = &'a HeaderItem> + 'a {
        self.items.iter().filter(move |item| {
            item.name
                .strip_prefix(dir)
                .and_then(|rest| rest.strip_prefix('.'))
                .is_some_and(|leaf| !leaf.is_empty() && !leaf.contains('.'))
        })
    }

    /// Number of items
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if the header has no items
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<HeaderItem> for Header {
    fn from_iter<I: IntoIterator<Item = HeaderItem>>(iter: I) -> Self {
        let mut header = Header::new();
        for item in iter {
            header.set(item);
        }
        header
    }
}

impl<'a> IntoIterator for &'a Header {
    type Item = &'a HeaderItem;
    type IntoIter = std::slice::Iter<'a, HeaderItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
