//! TIFF structures: the 8-byte header, 12-byte directory entries, and the
//! [`TiffReader`] that walks a chain of Image File Directories.
//!
//! A TIFF stream either stands alone (`*.tif`) or is embedded in the APP1
//! segment of a JFIF file, where it carries the Exif metadata. Both cases go
//! through the same reader, since the embedded blob gets its own
//! [`Cursor`] origin.

use nom::{
    branch::alt, bytes::complete::tag, combinator, number::Endianness, sequence, IResult,
};

use crate::{
    cursor::Cursor,
    error::convert_parse_error,
    found::FoundTags,
    parser::{ImageFormat, ImageReader, MetadataParser},
    values::DataFormat,
};

pub use decode::decode_value;
pub use tags::{Scope, TagBehavior, TagDescriptor, TagRegistries, TagRegistry};
#[cfg(test)]
pub(crate) use tags::{EXIF_IFD_POINTER, GPS_IFD_POINTER, INTEROP_IFD_POINTER};
use walker::IfdWalker;

mod decode;
mod tags;
mod walker;

/// Byte order mark, magic 42 and the offset of IFD 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TiffHeader {
    pub endian: Endianness,
    pub ifd0_offset: u32,
}

impl TiffHeader {
    pub const SIZE: usize = 8;
    const MAGIC: u16 = 0x2a;

    pub fn parse(input: &[u8]) -> IResult<&[u8], TiffHeader> {
        use nom::number::complete::{u16, u32};
        let (input, endian) = alt((
            combinator::value(Endianness::Big, tag("MM")),
            combinator::value(Endianness::Little, tag("II")),
        ))(input)?;
        let (input, _) = combinator::verify(u16(endian), |m| *m == Self::MAGIC)(input)?;
        combinator::map(u32(endian), move |ifd0_offset| TiffHeader {
            endian,
            ifd0_offset,
        })(input)
    }
}

pub(crate) const IFD_ENTRY_SIZE: usize = 12;

/// One 12-byte IFD record.
///
/// `format` is kept as the raw type code so that pointer tags can be
/// dispatched before the code is validated; use [`Self::data_format`] to
/// interpret it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub tag: u16,
    pub format: u16,
    pub count: u32,
    /// The value itself when it fits in four bytes, an offset otherwise.
    pub value_or_offset: u32,
}

impl DirectoryEntry {
    pub(crate) fn parse(input: &[u8], endian: Endianness) -> IResult<&[u8], DirectoryEntry> {
        use nom::number::complete::{u16, u32};
        let (remain, (tag, format, count, value_or_offset)) =
            sequence::tuple((u16(endian), u16(endian), u32(endian), u32(endian)))(input)?;
        Ok((
            remain,
            DirectoryEntry {
                tag,
                format,
                count,
                value_or_offset,
            },
        ))
    }

    pub fn data_format(&self) -> crate::Result<DataFormat> {
        DataFormat::try_from(self.format)
    }

    /// Total payload size in bytes, `None` on overflow.
    pub fn data_size(&self, format: DataFormat) -> Option<u64> {
        format.element_size().checked_mul(u64::from(self.count))
    }
}

/// Reads a TIFF stream of a known byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffReader {
    endian: Endianness,
}

impl TiffReader {
    pub fn new(endian: Endianness) -> Self {
        Self { endian }
    }
}

impl ImageReader for TiffReader {
    fn format(&self) -> ImageFormat {
        ImageFormat::Tiff(self.endian)
    }

    #[tracing::instrument(skip_all, fields(endian = ?self.endian))]
    fn read_partial(
        &self,
        cursor: &mut Cursor<'_>,
        parser: &MetadataParser,
        found: &mut FoundTags,
    ) -> crate::Result<u64> {
        cursor.set_endian(self.endian);
        cursor.seek_absolute(0)?;

        let mut buf = [0u8; TiffHeader::SIZE];
        cursor.read_exact(&mut buf)?;
        let (_, header) =
            TiffHeader::parse(&buf).map_err(|e| convert_parse_error(e, "invalid TIFF header"))?;
        if header.endian != self.endian {
            return Err(crate::Error::malformed("TIFF byte order changed after detection"));
        }
        tracing::debug!(?header, "TIFF header");

        IfdWalker::new(parser).walk_chain(cursor, header.ifd0_offset, None, found)?;
        Ok(cursor.offset())
    }
}

/// Recognizer for big-endian TIFF streams (`4D 4D 00 2A`).
pub fn recognize_tiff_big_endian(
    cursor: &mut Cursor<'_>,
) -> crate::Result<Option<Box<dyn ImageReader>>> {
    recognize_tiff(cursor, Endianness::Big)
}

/// Recognizer for little-endian TIFF streams (`49 49 2A 00`).
pub fn recognize_tiff_little_endian(
    cursor: &mut Cursor<'_>,
) -> crate::Result<Option<Box<dyn ImageReader>>> {
    recognize_tiff(cursor, Endianness::Little)
}

fn recognize_tiff(
    cursor: &mut Cursor<'_>,
    endian: Endianness,
) -> crate::Result<Option<Box<dyn ImageReader>>> {
    let magic: &[u8] = match endian {
        Endianness::Big => &[0x4D, 0x4D, 0x00, 0x2A],
        _ => &[0x49, 0x49, 0x2A, 0x00],
    };

    let mut buf = [0u8; 4];
    let n = cursor.read_available(&mut buf)?;
    if tag::<_, _, nom::error::Error<_>>(magic)(&buf[..n]).is_err() {
        return Ok(None);
    }
    Ok(Some(Box::new(TiffReader::new(endian))))
}

#[cfg(test)]
mod tests {
    use std::io;

    use test_case::test_case;

    use super::*;
    use crate::{testkit::TiffBuilder, Error};

    #[test_case(b"MM\0\x2a\0\0\0\x08", Endianness::Big, 8)]
    #[test_case(b"II\x2a\0\x10\0\0\0", Endianness::Little, 16)]
    fn header(data: &[u8], endian: Endianness, ifd0_offset: u32) {
        let (remain, header) = TiffHeader::parse(data).unwrap();
        assert!(remain.is_empty());
        assert_eq!(
            header,
            TiffHeader {
                endian,
                ifd0_offset
            }
        );
    }

    #[test_case(b"MM\0\x2b\0\0\0\x08")]
    #[test_case(b"IM\x2a\0\x08\0\0\0")]
    #[test_case(b"II\x2a\0")]
    fn bad_header(data: &[u8]) {
        TiffHeader::parse(data).unwrap_err();
    }

    #[test]
    fn directory_entry() {
        let data = [0x01, 0x0f, 0x00, 0x02, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x1a];
        let (_, entry) = DirectoryEntry::parse(&data, Endianness::Big).unwrap();
        assert_eq!(
            entry,
            DirectoryEntry {
                tag: 0x010f,
                format: 2,
                count: 5,
                value_or_offset: 0x1a,
            }
        );
        assert_eq!(entry.data_format().unwrap(), DataFormat::AsciiString);
        assert_eq!(entry.data_size(DataFormat::AsciiString), Some(5));

        let (_, entry) = DirectoryEntry::parse(&data, Endianness::Little).unwrap();
        assert_eq!(entry.tag, 0x0f01);
        assert_eq!(entry.count, 0x05000000);
    }

    #[test_case(&[0x4D, 0x4D, 0x00, 0x2A], Some(Endianness::Big))]
    #[test_case(&[0x49, 0x49, 0x2A, 0x00], Some(Endianness::Little))]
    #[test_case(&[0x49, 0x49, 0x01, 0x01], None)]
    #[test_case(&[0x4D, 0x4D], None)]
    fn recognizers(data: &[u8], expect: Option<Endianness>) {
        let mut src = io::Cursor::new(data.to_vec());
        let mut c = Cursor::new(&mut src, Endianness::Big).unwrap();
        let be = recognize_tiff_big_endian(&mut c).unwrap().map(|r| r.format());
        c.seek_absolute(0).unwrap();
        let le = recognize_tiff_little_endian(&mut c).unwrap().map(|r| r.format());

        let got = be.or(le);
        assert_eq!(got, expect.map(ImageFormat::Tiff));
    }

    #[test_case(Endianness::Big)]
    #[test_case(Endianness::Little)]
    fn acme(endian: Endianness) {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let mut b = TiffBuilder::new(endian);
        b.ascii(0, 0x010f, "Acme");
        let data = b.build();

        let found = crate::read_metadata(io::Cursor::new(data)).unwrap();
        assert_eq!(found.len(), 1);
        let tag = found.get(0x010f).unwrap();
        assert_eq!(tag.name, "Make");
        assert_eq!(tag.scope, Scope::Root);
        assert_eq!(tag.format, DataFormat::AsciiString);
        assert_eq!(tag.value.as_str(), Some("Acme"));
    }

    #[test_case(Endianness::Big)]
    #[test_case(Endianness::Little)]
    fn camera_tiff(endian: Endianness) {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let mut b = TiffBuilder::new(endian);
        let exif = b.add_ifd();
        let gps = b.add_ifd();
        let interop = b.add_ifd();
        b.ascii(0, 0x010f, "vivo")
            .ascii(0, 0x0110, "vivo X90 Pro+")
            .shorts(0, 0x0112, &[1])
            .rationals(0, 0x011a, &[(72, 1)])
            .pointer(0, EXIF_IFD_POINTER, exif)
            .pointer(0, GPS_IFD_POINTER, gps);
        b.rationals(exif, 0x829a, &[(1, 100)])
            .srationals(exif, 0x9204, &[(-1, 3)])
            .ascii(exif, 0x9003, "2023:07:09 20:36:33")
            .pointer(exif, INTEROP_IFD_POINTER, interop);
        b.bytes(gps, 0x0000, &[2, 2, 0, 0])
            .ascii(gps, 0x0001, "N")
            .rationals(gps, 0x0002, &[(22, 1), (31, 1), (5208, 100)]);
        b.ascii(interop, 0x0001, "R98");
        let data = b.build();

        let found = crate::read_metadata(io::Cursor::new(data)).unwrap();

        assert_eq!(found.value(0x0110).unwrap().as_str(), Some("vivo X90 Pro+"));
        assert_eq!(found.value(0x0112).unwrap().first_u32(), Some(1));
        assert_eq!(
            found.value(0x011a).unwrap().as_urationals(),
            Some(&[(72, 1).into()][..])
        );
        assert_eq!(
            found.value(0x829a).unwrap().as_urationals(),
            Some(&[(1, 100).into()][..])
        );
        assert_eq!(
            found.value(0x9204).unwrap().as_irationals(),
            Some(&[(-1, 3).into()][..])
        );
        assert_eq!(found.get(0x9003).unwrap().scope, Scope::Exif);
        assert_eq!(found.get(0x9003).unwrap().name, "DateTimeOriginal");

        assert_eq!(found.value(0x0000).unwrap().as_unsigned(), Some(&[2, 2, 0, 0][..]));
        let lat = found.get(0x0002).unwrap();
        assert_eq!(lat.scope, Scope::Gps);
        assert_eq!(lat.name, "GPSLatitude");
        assert_eq!(lat.value.len(), 3);

        // Interop index shares id 0x0001 with GPSLatitudeRef; interop is
        // visited from the Exif directory, before GPS.
        let r = found.get(0x0001).unwrap();
        assert_eq!(r.scope, Scope::Gps);
        assert_eq!(r.value.as_str(), Some("N"));

        // Pointer tags are followed, not recorded.
        assert!(!found.contains(EXIF_IFD_POINTER));
        assert!(!found.contains(GPS_IFD_POINTER));
        assert!(!found.contains(INTEROP_IFD_POINTER));
    }

    #[test]
    fn header_magic_mismatch_after_detection() {
        let mut data = TiffBuilder::new(Endianness::Big).build();
        data[3] = 0x2b;
        let mut src = io::Cursor::new(data);
        let mut c = Cursor::new(&mut src, Endianness::Big).unwrap();
        let parser = MetadataParser::new();
        let mut found = FoundTags::new();
        let e = TiffReader::new(Endianness::Big)
            .read_partial(&mut c, &parser, &mut found)
            .unwrap_err();
        assert!(matches!(e, Error::MalformedStream(_)), "{e:?}");
    }

    #[test]
    fn ifd0_out_of_range() {
        let mut b = TiffBuilder::new(Endianness::Little);
        b.ascii(0, 0x010f, "Acme");
        let mut data = b.build();
        // IFD0 offset far beyond the end
        data[4..8].copy_from_slice(&0x0010_0000u32.to_le_bytes());
        let e = crate::read_metadata(io::Cursor::new(data)).unwrap_err();
        assert!(matches!(e, Error::MalformedStream(_)), "{e:?}");
    }
}
