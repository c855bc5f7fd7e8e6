use nom::{bytes::complete::tag, number, number::Endianness, sequence::tuple};

use crate::{
    cursor::Cursor,
    found::FoundTags,
    parser::{ImageFormat, ImageReader, MetadataParser},
    Error,
};

/// Identifier of the APPn segment carrying Exif data, the NUL excluded.
const EXIF_IDENT: &str = "Exif";

/// Reads the marker segments of a JFIF stream and parses the TIFF blob of
/// every `Exif` APPn segment it meets, until EOI or the end of the stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JfifReader;

impl ImageReader for JfifReader {
    fn format(&self) -> ImageFormat {
        ImageFormat::Jfif
    }

    #[tracing::instrument(skip_all)]
    fn read_partial(
        &self,
        cursor: &mut Cursor<'_>,
        parser: &MetadataParser,
        found: &mut FoundTags,
    ) -> crate::Result<u64> {
        cursor.set_endian(Endianness::Big);

        // Set after SOS/RSTn (entropy-coded data follows) and after garbage
        // where a marker was expected.
        let mut scanning = false;
        loop {
            if scanning && !cursor.scan_to_unescaped_marker_byte()? {
                tracing::debug!("stream ends inside entropy-coded data");
                break;
            }
            scanning = false;

            let marker = match next_marker(cursor)? {
                Next::Marker(m) => m,
                Next::End => break,
                Next::Garbage(byte) => {
                    tracing::warn!(
                        offset = cursor.offset(),
                        byte = format!("0x{byte:02x}"),
                        "marker expected, resyncing"
                    );
                    scanning = true;
                    continue;
                }
            };
            tracing::debug!(?marker, offset = cursor.offset(), "marker");

            let res = match marker {
                Marker::Soi => Ok(()),
                Marker::Eoi => break,
                // SOS has no usable length; its header and the entropy-coded
                // data are scanned alike.
                Marker::Sos | Marker::Rst(_) => {
                    scanning = true;
                    Ok(())
                }
                Marker::App(n) => read_app_segment(cursor, parser, found, n),
                Marker::Other(_) => skip_segment(cursor),
            };

            if let Err(e) = res {
                if !e.is_recoverable() {
                    return Err(e);
                }
                tracing::warn!(?marker, ?e, "broken segment, scan ends");
                break;
            }
        }

        Ok(cursor.offset())
    }
}

/// Recognizer for JFIF streams (`FF D8`).
pub fn recognize_jfif(cursor: &mut Cursor<'_>) -> crate::Result<Option<Box<dyn ImageReader>>> {
    let mut buf = [0u8; 2];
    let n = cursor.read_available(&mut buf)?;
    if check_jpeg(&buf[..n]).is_err() {
        return Ok(None);
    }
    Ok(Some(Box::new(JfifReader)))
}

pub(crate) fn check_jpeg(input: &[u8]) -> crate::Result<()> {
    // check soi marker [0xff, 0xd8]
    let (_, (_, code)) = tuple((
        tag::<_, _, nom::error::Error<_>>([0xFF]),
        number::complete::u8,
    ))(input)?;

    if code != SOI {
        return Err(Error::malformed("invalid JPEG file; SOI marker not found"));
    }
    Ok(())
}

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;

/// The kind of marker a code (the byte following 0xFF) indicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Soi,
    Eoi,
    Sos,
    Rst(u8),
    App(u8),
    Other(u8),
}

impl From<u8> for Marker {
    fn from(code: u8) -> Self {
        match code {
            SOI => Marker::Soi,
            EOI => Marker::Eoi,
            SOS => Marker::Sos,
            0xD0..=0xD7 => Marker::Rst(code - 0xD0),
            0xE0..=0xEF => Marker::App(code - 0xE0),
            x => Marker::Other(x),
        }
    }
}

enum Next {
    Marker(Marker),
    Garbage(u8),
    End,
}

fn next_marker(cursor: &mut Cursor<'_>) -> crate::Result<Next> {
    let Some(b) = cursor.try_read_u8()? else {
        return Ok(Next::End);
    };
    if b != 0xFF {
        return Ok(Next::Garbage(b));
    }

    // Any number of 0xFF fill bytes may precede the code.
    loop {
        match cursor.try_read_u8()? {
            None => return Ok(Next::End),
            Some(0xFF) => continue,
            Some(0x00) => return Ok(Next::Garbage(0x00)),
            Some(code) => return Ok(Next::Marker(code.into())),
        }
    }
}

/// Read a segment's length field and return its payload size. The whole
/// payload must lie inside the stream.
fn segment_length(cursor: &mut Cursor<'_>) -> crate::Result<u64> {
    let len = cursor.read_u16()?;
    if len < 2 {
        return Err(Error::malformed(format!("invalid segment length {len}")));
    }
    let payload = u64::from(len - 2);
    cursor.check_range(cursor.offset(), payload)?;
    Ok(payload)
}

fn skip_segment(cursor: &mut Cursor<'_>) -> crate::Result<()> {
    let payload = segment_length(cursor)?;
    cursor.discard(payload)
}

fn read_app_segment(
    cursor: &mut Cursor<'_>,
    parser: &MetadataParser,
    found: &mut FoundTags,
    n: u8,
) -> crate::Result<()> {
    let payload = segment_length(cursor)?;
    let end = cursor.offset() + payload;
    let ident = cursor.read_null_terminated_string(payload)?;
    tracing::debug!(app = n, ident, payload, "APPn segment");

    if ident == EXIF_IDENT && cursor.offset() < end {
        // pad byte after "Exif\0"
        cursor.discard(1)?;
        let len = end - cursor.offset();
        read_embedded(cursor, parser, found, len)?;
    }

    cursor.seek_absolute(end)
}

/// Parse the next `len` bytes as a stream of their own.
fn read_embedded(
    cursor: &mut Cursor<'_>,
    parser: &MetadataParser,
    found: &mut FoundTags,
    len: u64,
) -> crate::Result<()> {
    if cursor.depth() >= parser.max_nesting() {
        tracing::warn!(depth = cursor.depth(), "embedded stream nested too deep, skipped");
        return Ok(());
    }

    match cursor.embedded(len, |sub| parser.dispatch_and_read(sub, found))? {
        Ok(_) => Ok(()),
        Err(e) if e.is_recoverable() || matches!(e, Error::UnrecognizedFileFormat) => {
            tracing::warn!(?e, "Exif segment skipped");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
