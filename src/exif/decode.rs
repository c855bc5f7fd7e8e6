use crate::{
    cursor::Cursor,
    values::{DataFormat, IRational, URational, Value},
};

use super::DirectoryEntry;

/// Decode the value of `entry`.
///
/// Values of at most four bytes are unpacked from the entry's inline field
/// without touching the stream. Larger values are read from
/// `entry.value_or_offset` (relative to the cursor's origin); the cursor is
/// moved there and back, so its position is unchanged on return.
///
/// Errors:
///
/// - [`UnsupportedFeature`](crate::Error::UnsupportedFeature) for an unknown
///   data format code.
/// - [`MalformedStream`](crate::Error::MalformedStream) if the out-of-line
///   range doesn't lie inside the stream.
pub fn decode_value(entry: &DirectoryEntry, cursor: &mut Cursor<'_>) -> crate::Result<Value> {
    let format = entry.data_format()?;
    if entry.count == 0 {
        return Ok(empty(format));
    }

    let size = entry.data_size(format).ok_or_else(|| {
        crate::Error::malformed(format!("tag 0x{:04x}: value size overflow", entry.tag))
    })?;
    let inline = size <= 4;
    let width = format.element_size() as usize;

    let value = match format {
        DataFormat::AsciiString => {
            if inline {
                let bytes = cursor.packed_bytes(entry.value_or_offset);
                Value::Text(first_string(&bytes[..entry.count as usize])) // Safe-slice
            } else {
                let count = u64::from(entry.count);
                out_of_line(cursor, entry, size, |c| c.read_null_terminated_string(count))?.into()
            }
        }
        DataFormat::Ubyte | DataFormat::Ushort | DataFormat::Ulong => {
            Value::Unsigned(unsigned(cursor, entry, size, width)?)
        }
        DataFormat::Sbyte | DataFormat::Sshort | DataFormat::Slong => Value::Signed(
            unsigned(cursor, entry, size, width)?
                .into_iter()
                .map(|v| sign_extend(v, width))
                .collect(),
        ),
        DataFormat::Urational => Value::URationals(out_of_line(cursor, entry, size, |c| {
            (0..entry.count)
                .map(|_| -> crate::Result<URational> {
                    let n = c.read_u32()?;
                    let d = c.read_u32()?;
                    Ok(URational::from((n, d)))
                })
                .collect()
        })?),
        DataFormat::Srational => Value::IRationals(out_of_line(cursor, entry, size, |c| {
            (0..entry.count)
                .map(|_| -> crate::Result<IRational> {
                    let n = c.read_u32()? as i32;
                    let d = c.read_u32()? as i32;
                    Ok(IRational::from((n, d)))
                })
                .collect()
        })?),
        DataFormat::Sfloat => {
            if inline {
                Value::F32(vec![f32::from_bits(entry.value_or_offset)])
            } else {
                Value::F32(out_of_line(cursor, entry, size, |c| {
                    (0..entry.count)
                        .map(|_| c.read_u32().map(f32::from_bits))
                        .collect()
                })?)
            }
        }
        DataFormat::Dfloat => Value::F64(out_of_line(cursor, entry, size, |c| {
            (0..entry.count)
                .map(|_| c.read_u64().map(f64::from_bits))
                .collect()
        })?),
        DataFormat::Undefined => {
            if inline {
                let bytes = cursor.packed_bytes(entry.value_or_offset);
                Value::Undefined(bytes[..entry.count as usize].to_vec()) // Safe-slice
            } else {
                Value::Undefined(out_of_line(cursor, entry, size, |c| c.read_bytes(size))?)
            }
        }
    };

    Ok(value)
}

fn empty(format: DataFormat) -> Value {
    match format {
        DataFormat::AsciiString => Value::Text(String::new()),
        DataFormat::Ubyte | DataFormat::Ushort | DataFormat::Ulong => Value::Unsigned(Vec::new()),
        DataFormat::Sbyte | DataFormat::Sshort | DataFormat::Slong => Value::Signed(Vec::new()),
        DataFormat::Urational => Value::URationals(Vec::new()),
        DataFormat::Srational => Value::IRationals(Vec::new()),
        DataFormat::Sfloat => Value::F32(Vec::new()),
        DataFormat::Dfloat => Value::F64(Vec::new()),
        DataFormat::Undefined => Value::Undefined(Vec::new()),
    }
}

fn unsigned(
    cursor: &mut Cursor<'_>,
    entry: &DirectoryEntry,
    size: u64,
    width: usize,
) -> crate::Result<Vec<u32>> {
    if size <= 4 {
        return Ok(cursor.unpack_inline(entry.count, entry.value_or_offset, width));
    }
    out_of_line(cursor, entry, size, |c| {
        (0..entry.count)
            .map(|_| match width {
                1 => c.read_u8().map(u32::from),
                2 => c.read_u16().map(u32::from),
                _ => c.read_u32(),
            })
            .collect()
    })
}

fn sign_extend(v: u32, width: usize) -> i32 {
    match width {
        1 => i32::from(v as u8 as i8),
        2 => i32::from(v as u16 as i16),
        _ => v as i32,
    }
}

/// Only the first string of a (possibly multi-string) ASCII field is kept.
fn first_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned() // Safe-slice
}

/// Check the range, seek to the entry's offset, run `f`, seek back.
fn out_of_line<T, F>(
    cursor: &mut Cursor<'_>,
    entry: &DirectoryEntry,
    size: u64,
    f: F,
) -> crate::Result<T>
where
    F: FnOnce(&mut Cursor<'_>) -> crate::Result<T>,
{
    let offset = u64::from(entry.value_or_offset);
    cursor.check_range(offset, size).map_err(|e| {
        tracing::debug!(tag = format!("0x{:04x}", entry.tag), ?e, "value out of range");
        e
    })?;
    cursor.restoring(|c| {
        c.seek_absolute(offset)?;
        f(c)
    })
}
