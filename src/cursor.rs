use std::{
    fmt::Debug,
    io::{Read, Seek, SeekFrom},
};

use nom::number::Endianness;

/// Object-safe union of [`Read`] and [`Seek`], so a [`Cursor`] can erase the
/// concrete source type.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// An endian-aware, random-access reader over a seekable byte source.
///
/// All offsets accepted or returned by a `Cursor` are relative to its
/// *origin*, the absolute stream position where the cursor was created.
/// Nested containers (e.g. the TIFF blob embedded in a JPEG APP1 segment) get
/// their own cursor via [`Cursor::embedded`], whose origin is the start of the
/// embedded data, so offsets found inside TIFF structures can be used as-is.
///
/// The cursor tracks its position itself, only explicit seeks
/// ([`Cursor::seek_absolute`], [`Cursor::discard`], [`Cursor::restoring`])
/// reach the underlying source's [`Seek`] implementation.
///
/// The readable window ends at the stream end measured at construction time
/// (or at the window limit of an embedded cursor). Every read, seek and
/// discard is checked against it and fails with
/// [`MalformedStream`](crate::Error::MalformedStream) instead of running past
/// the end.
pub struct Cursor<'a> {
    inner: &'a mut dyn ReadSeek,

    // Absolute positions in `inner`.
    origin: u64,
    pos: u64,
    end: u64,

    endian: Endianness,
    depth: usize,
}

impl Debug for Cursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("origin", &self.origin)
            .field("pos", &self.pos)
            .field("end", &self.end)
            .field("endian", &self.endian)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

impl<'a> Cursor<'a> {
    /// Create a cursor whose origin is the current position of `inner`.
    pub fn new<R: Read + Seek>(inner: &'a mut R, endian: Endianness) -> crate::Result<Self> {
        let origin = inner.stream_position()?;
        let end = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(origin))?;

        Ok(Self {
            inner,
            origin,
            pos: origin,
            end: end.max(origin),
            endian,
            depth: 0,
        })
    }

    pub fn endian(&self) -> Endianness {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endianness) {
        self.endian = endian;
    }

    /// Number of embedded sub-streams between this cursor and the top-level
    /// one (0 for a top-level cursor).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Current offset relative to the origin.
    pub fn offset(&self) -> u64 {
        self.pos - self.origin
    }

    /// Size of the readable window, measured from the origin.
    pub fn len(&self) -> u64 {
        self.end - self.origin
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes left between the current position and the end of the window.
    pub fn remaining(&self) -> u64 {
        self.end.saturating_sub(self.pos)
    }

    /// Seek to `offset`, relative to the origin.
    pub fn seek_absolute(&mut self, offset: u64) -> crate::Result<()> {
        let target = self
            .origin
            .checked_add(offset)
            .filter(|t| *t <= self.end)
            .ok_or_else(|| {
                crate::Error::malformed(format!(
                    "seek to 0x{offset:08x} is out of range (len 0x{:08x})",
                    self.len()
                ))
            })?;
        self.inner.seek(SeekFrom::Start(target))?;
        self.pos = target;
        Ok(())
    }

    /// Skip `n` bytes.
    pub fn discard(&mut self, n: u64) -> crate::Result<()> {
        let target = self
            .offset()
            .checked_add(n)
            .ok_or_else(|| crate::Error::malformed("discard overflow"))?;
        self.seek_absolute(target)
    }

    /// Check that `len` bytes starting at `offset` lie inside the window.
    pub fn check_range(&self, offset: u64, len: u64) -> crate::Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len() => Ok(()),
            _ => Err(crate::Error::malformed(format!(
                "range 0x{offset:08x}+0x{len:x} is out of range (len 0x{:08x})",
                self.len()
            ))),
        }
    }

    /// Run `f`, then restore the current position, whether `f` succeeded or
    /// not.
    pub fn restoring<T, F>(&mut self, f: F) -> crate::Result<T>
    where
        F: FnOnce(&mut Self) -> crate::Result<T>,
    {
        let saved = self.offset();
        let res = f(self);
        let restored = self.seek_absolute(saved);
        let v = res?;
        restored?;
        Ok(v)
    }

    /// Run `f` on a nested cursor confined to the next `len` bytes (clamped
    /// to the current window). The nested cursor's origin is the current
    /// position. Afterwards this cursor is positioned right after the
    /// window, regardless of how much of it `f` consumed.
    pub fn embedded<T, F>(&mut self, len: u64, f: F) -> crate::Result<T>
    where
        F: FnOnce(&mut Cursor<'_>) -> T,
    {
        let start = self.pos;
        let end = start.saturating_add(len).min(self.end);
        let mut sub = Cursor {
            inner: &mut *self.inner,
            origin: start,
            pos: start,
            end,
            endian: self.endian,
            depth: self.depth + 1,
        };
        let v = f(&mut sub);
        self.seek_absolute(end - self.origin)?;
        Ok(v)
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> crate::Result<()> {
        let len = buf.len() as u64;
        if self.remaining() < len {
            return Err(crate::Error::malformed(format!(
                "short read: wanted {len} bytes at 0x{:08x}, {} left",
                self.offset(),
                self.remaining()
            )));
        }
        self.inner.read_exact(buf)?;
        self.pos += len;
        Ok(())
    }

    /// Fill as much of `buf` as the window allows and return the number of
    /// bytes read. Hitting the end is not an error here.
    pub fn read_available(&mut self, buf: &mut [u8]) -> crate::Result<usize> {
        let n = (buf.len() as u64).min(self.remaining()) as usize;
        self.read_exact(&mut buf[..n])?; // Safe-slice
        Ok(n)
    }

    pub fn read_bytes(&mut self, len: u64) -> crate::Result<Vec<u8>> {
        self.check_range(self.offset(), len)?;
        let mut buf = vec![0u8; len as usize];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_array<const N: usize>(&mut self) -> crate::Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> crate::Result<u8> {
        let [b] = self.read_array::<1>()?;
        Ok(b)
    }

    /// Like [`Self::read_u8`], but returns `Ok(None)` at a clean end of
    /// window instead of an error.
    pub fn try_read_u8(&mut self) -> crate::Result<Option<u8>> {
        if self.remaining() == 0 {
            return Ok(None);
        }
        self.read_u8().map(Some)
    }

    pub fn read_u16(&mut self) -> crate::Result<u16> {
        let b = self.read_array::<2>()?;
        Ok(if self.is_big_endian() {
            u16::from_be_bytes(b)
        } else {
            u16::from_le_bytes(b)
        })
    }

    pub fn read_u32(&mut self) -> crate::Result<u32> {
        let b = self.read_array::<4>()?;
        Ok(if self.is_big_endian() {
            u32::from_be_bytes(b)
        } else {
            u32::from_le_bytes(b)
        })
    }

    pub fn read_u64(&mut self) -> crate::Result<u64> {
        let b = self.read_array::<8>()?;
        Ok(if self.is_big_endian() {
            u64::from_be_bytes(b)
        } else {
            u64::from_le_bytes(b)
        })
    }

    /// Read a NUL-terminated string of at most `max_len` bytes (terminator
    /// excluded). The terminator, if present, is consumed but not returned.
    ///
    /// The string is located with a first scan, then the cursor is put back
    /// to where the string starts and the known-length buffer is read, so a
    /// failing scan never leaves the cursor in the middle of the string.
    pub fn read_null_terminated_string(&mut self, max_len: u64) -> crate::Result<String> {
        let start = self.offset();
        let mut len = 0u64;
        let mut terminated = false;
        while len < max_len {
            match self.try_read_u8()? {
                Some(0) => {
                    terminated = true;
                    break;
                }
                Some(_) => len += 1,
                None => break,
            }
        }

        self.seek_absolute(start)?;
        let buf = self.read_bytes(len)?;
        if terminated {
            self.discard(1)?;
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Scan forward for the first `0xFF` byte that is not followed by `0x00`
    /// (JPEG byte stuffing), and stop right before it.
    ///
    /// Returns `false` if the window is exhausted before such a marker is
    /// found.
    pub fn scan_to_unescaped_marker_byte(&mut self) -> crate::Result<bool> {
        loop {
            let Some(b) = self.try_read_u8()? else {
                return Ok(false);
            };
            if b != 0xFF {
                continue;
            }
            let Some(next) = self.try_read_u8()? else {
                return Ok(false);
            };
            if next == 0x00 {
                continue;
            }
            self.seek_absolute(self.offset() - 2)?;
            return Ok(true);
        }
    }

    /// Split an inline 32-bit value field into `count` elements of `width`
    /// bytes (1, 2 or 4), first element first.
    ///
    /// `packed` must have been read with this cursor's byte order: big-endian
    /// streams keep the first element in the most significant byte(s),
    /// little-endian streams in the least significant ones.
    pub fn unpack_inline(&self, count: u32, packed: u32, width: usize) -> Vec<u32> {
        let width = width.clamp(1, 4);
        let per_word = 4 / width;
        let n = (count as usize).min(per_word);
        let bits = width * 8;
        let mask = (1u64 << bits) - 1;

        (0..n)
            .map(|i| {
                let shift = if self.is_big_endian() {
                    32 - bits * (i + 1)
                } else {
                    bits * i
                };
                ((u64::from(packed) >> shift) & mask) as u32
            })
            .collect()
    }

    /// The four bytes of an inline value field, in file order.
    pub fn packed_bytes(&self, packed: u32) -> [u8; 4] {
        if self.is_big_endian() {
            packed.to_be_bytes()
        } else {
            packed.to_le_bytes()
        }
    }

    fn is_big_endian(&self) -> bool {
        match self.endian {
            Endianness::Big => true,
            Endianness::Little => false,
            Endianness::Native => cfg!(target_endian = "big"),
        }
    }
}
