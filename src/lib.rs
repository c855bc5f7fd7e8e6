//! nom-imgmeta extracts tag metadata from JFIF (JPEG) and TIFF images,
//! including the Exif data a JPEG carries in its APP1 segment. Parsing is
//! written in pure Rust, with [nom](https://github.com/rust-bakery/nom) for
//! the fixed-layout structures.
//!
//! ## Key Features
//!
//! - Format detection: the file format is recognized from the stream prefix,
//!   no need to check file extensions. The recognizers are pluggable, see
//!   [`MetadataParser::with_recognizer`].
//!
//! - Random access over any `Read + Seek`: out-of-line values and
//!   sub-directories are reached by seeking, the stream is never loaded as a
//!   whole. Offsets inside an embedded TIFF blob are resolved relative to the
//!   blob itself.
//!
//! - Robustness: every offset and length read from the input is checked
//!   against the stream size before anything is allocated or read. Cyclic
//!   directory chains are detected and reported as
//!   [`Error::InvariantViolation`] instead of looping, a broken entry or
//!   segment is skipped and the rest of the file is still read.
//!
//! - Explicit configuration: tag registries, recognizers and policies live in
//!   an immutable [`MetadataParser`], which can be shared between threads.
//!
//! ## Supported File Types
//!
//! - *.jpg, *.jpeg (JFIF/Exif)
//! - *.tif, *.tiff (both byte orders)
//!
//! ## Usage
//!
//! ```rust
//! use nom_imgmeta::*;
//! use std::io::Cursor;
//!
//! fn main() -> Result<()> {
//!     // A little-endian TIFF with an `Orientation` entry (SHORT, 6).
//!     let mut tiff = b"II\x2a\0\x08\0\0\0\x01\0".to_vec();
//!     tiff.extend([0x12, 0x01, 3, 0, 1, 0, 0, 0, 6, 0, 0, 0, 0, 0, 0, 0]);
//!
//!     let found = read_metadata(Cursor::new(&tiff))?;
//!     let tag = found.get(0x0112).unwrap();
//!     assert_eq!(tag.name, "Orientation");
//!     assert_eq!(tag.scope, Scope::Root);
//!     assert_eq!(tag.format, DataFormat::Ushort);
//!     assert_eq!(tag.value.first_u32(), Some(6));
//!
//!     for tag in &found {
//!         println!("0x{:04x} {} » {:?}", tag.id, tag.name, tag.value);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Tag Scopes
//!
//! Tags are resolved against four registries: the TIFF root tags, and the
//! Exif, GPS and Interoperability sub-directories (reached through the
//! `ExifOffset`, `GPSInfo` and `InteropOffset` pointer tags). Inside a
//! sub-directory the sub-directory's registry is consulted first, then the
//! root one. All decoded tags land in one flat [`FoundTags`] map keyed by tag
//! id; [`Tag::scope`] tells where a name was resolved. When an id is decoded
//! twice, [`DuplicatePolicy`] decides which value stays.

use std::io::{Read, Seek};

pub use cursor::{Cursor, ReadSeek};
pub use error::Error;
pub use exif::{
    decode_value, recognize_tiff_big_endian, recognize_tiff_little_endian, DirectoryEntry, Scope,
    TagBehavior, TagDescriptor, TagRegistries, TagRegistry, TiffReader,
};
pub use found::{DuplicatePolicy, FoundTags};
pub use jpeg::{recognize_jfif, JfifReader};
pub use nom::number::Endianness;
pub use parser::{ImageFormat, ImageReader, MetadataParser, Recognizer};
pub use values::{DataFormat, IRational, Rational, Tag, URational, Value};

pub type Result<T> = std::result::Result<T, Error>;

/// Read all tags from `reader` with a default [`MetadataParser`].
pub fn read_metadata<R: Read + Seek>(reader: R) -> Result<FoundTags> {
    MetadataParser::new().read(reader)
}

mod cursor;
mod error;
mod exif;
mod found;
mod jpeg;
mod parser;
mod values;

#[cfg(test)]
mod testkit;
