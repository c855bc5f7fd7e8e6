//! Synthetic inputs for tests: TIFF streams laid out from a description,
//! JFIF wrappers, and a reader that counts seeks.

use std::{
    cell::Cell,
    io::{self, Read, Seek, SeekFrom},
    rc::Rc,
};

use nom::number::Endianness;

enum Payload {
    Data(Vec<u8>),
    Ifd(usize),
    Raw(u32),
}

struct EntrySpec {
    tag: u16,
    format: u16,
    count: u32,
    payload: Payload,
}

enum Link {
    Ifd(usize),
    Raw(u32),
}

#[derive(Default)]
struct IfdSpec {
    entries: Vec<EntrySpec>,
    next: Option<Link>,
}

/// Lays out a TIFF stream: the 8-byte header, then every IFD in creation
/// order, each directly followed by its out-of-line values.
///
/// IFD 0 always exists and is the one the header points at.
pub struct TiffBuilder {
    endian: Endianness,
    ifds: Vec<IfdSpec>,
}

impl TiffBuilder {
    pub fn new(endian: Endianness) -> Self {
        Self {
            endian,
            ifds: vec![IfdSpec::default()],
        }
    }

    pub fn add_ifd(&mut self) -> usize {
        self.ifds.push(IfdSpec::default());
        self.ifds.len() - 1
    }

    /// Add an entry whose value bytes are already encoded.
    pub fn entry(&mut self, ifd: usize, tag: u16, format: u16, count: u32, data: Vec<u8>) -> &mut Self {
        self.push(ifd, tag, format, count, Payload::Data(data))
    }

    /// Add an entry with a verbatim value/offset field.
    pub fn raw_entry(&mut self, ifd: usize, tag: u16, format: u16, count: u32, value: u32) -> &mut Self {
        self.push(ifd, tag, format, count, Payload::Raw(value))
    }

    /// Add a sub-directory pointer (LONG) to `target`.
    pub fn pointer(&mut self, ifd: usize, tag: u16, target: usize) -> &mut Self {
        self.push(ifd, tag, 4, 1, Payload::Ifd(target))
    }

    /// Overwrite the format code of an existing entry.
    pub fn retype(&mut self, ifd: usize, index: usize, format: u16) -> &mut Self {
        self.ifds[ifd].entries[index].format = format;
        self
    }

    pub fn ascii(&mut self, ifd: usize, tag: u16, s: &str) -> &mut Self {
        let mut data = s.as_bytes().to_vec();
        data.push(0);
        let count = data.len() as u32;
        self.entry(ifd, tag, 2, count, data)
    }

    pub fn bytes(&mut self, ifd: usize, tag: u16, v: &[u8]) -> &mut Self {
        self.entry(ifd, tag, 1, v.len() as u32, v.to_vec())
    }

    pub fn undefined(&mut self, ifd: usize, tag: u16, v: &[u8]) -> &mut Self {
        self.entry(ifd, tag, 7, v.len() as u32, v.to_vec())
    }

    pub fn shorts(&mut self, ifd: usize, tag: u16, v: &[u16]) -> &mut Self {
        let data = v.iter().flat_map(|x| self.u16_bytes(*x)).collect();
        self.entry(ifd, tag, 3, v.len() as u32, data)
    }

    pub fn longs(&mut self, ifd: usize, tag: u16, v: &[u32]) -> &mut Self {
        let data = v.iter().flat_map(|x| self.u32_bytes(*x)).collect();
        self.entry(ifd, tag, 4, v.len() as u32, data)
    }

    pub fn rationals(&mut self, ifd: usize, tag: u16, v: &[(u32, u32)]) -> &mut Self {
        let data = v
            .iter()
            .flat_map(|(n, d)| [self.u32_bytes(*n), self.u32_bytes(*d)].concat())
            .collect();
        self.entry(ifd, tag, 5, v.len() as u32, data)
    }

    pub fn srationals(&mut self, ifd: usize, tag: u16, v: &[(i32, i32)]) -> &mut Self {
        let data = v
            .iter()
            .flat_map(|(n, d)| [self.u32_bytes(*n as u32), self.u32_bytes(*d as u32)].concat())
            .collect();
        self.entry(ifd, tag, 10, v.len() as u32, data)
    }

    pub fn sshorts(&mut self, ifd: usize, tag: u16, v: &[i16]) -> &mut Self {
        let data = v.iter().flat_map(|x| self.u16_bytes(*x as u16)).collect();
        self.entry(ifd, tag, 8, v.len() as u32, data)
    }

    pub fn doubles(&mut self, ifd: usize, tag: u16, v: &[f64]) -> &mut Self {
        let data = v
            .iter()
            .flat_map(|x| match self.endian {
                Endianness::Big => x.to_be_bytes(),
                _ => x.to_le_bytes(),
            })
            .collect();
        self.entry(ifd, tag, 12, v.len() as u32, data)
    }

    /// Set the next pointer of `from` to the address of `to`.
    pub fn link(&mut self, from: usize, to: usize) -> &mut Self {
        self.ifds[from].next = Some(Link::Ifd(to));
        self
    }

    /// Set the next pointer of `from` to a verbatim offset.
    pub fn link_raw(&mut self, from: usize, offset: u32) -> &mut Self {
        self.ifds[from].next = Some(Link::Raw(offset));
        self
    }

    /// Address of every IFD, and of every out-of-line value.
    fn layout(&self) -> (Vec<u32>, Vec<Vec<u32>>) {
        let mut ifd_offsets = Vec::new();
        let mut data_offsets = Vec::new();
        let mut pos = 8u32;
        for ifd in &self.ifds {
            ifd_offsets.push(pos);
            pos += 2 + 12 * ifd.entries.len() as u32 + 4;

            let mut offsets = Vec::new();
            for e in &ifd.entries {
                match &e.payload {
                    Payload::Data(d) if d.len() > 4 => {
                        offsets.push(pos);
                        pos += d.len() as u32;
                    }
                    _ => offsets.push(0),
                }
            }
            data_offsets.push(offsets);
        }
        (ifd_offsets, data_offsets)
    }

    pub fn build(&self) -> Vec<u8> {
        let (ifd_offsets, data_offsets) = self.layout();

        let mut out = Vec::new();
        out.extend_from_slice(match self.endian {
            Endianness::Big => b"MM",
            _ => b"II",
        });
        out.extend(self.u16_bytes(0x2a));
        out.extend(self.u32_bytes(ifd_offsets[0]));

        for (i, ifd) in self.ifds.iter().enumerate() {
            assert_eq!(out.len() as u32, ifd_offsets[i]);
            out.extend(self.u16_bytes(ifd.entries.len() as u16));
            for (j, e) in ifd.entries.iter().enumerate() {
                out.extend(self.u16_bytes(e.tag));
                out.extend(self.u16_bytes(e.format));
                out.extend(self.u32_bytes(e.count));
                match &e.payload {
                    Payload::Data(d) if d.len() <= 4 => {
                        let mut field = [0u8; 4];
                        field[..d.len()].copy_from_slice(d);
                        out.extend(field);
                    }
                    Payload::Data(_) => out.extend(self.u32_bytes(data_offsets[i][j])),
                    Payload::Ifd(t) => out.extend(self.u32_bytes(ifd_offsets[*t])),
                    Payload::Raw(v) => out.extend(self.u32_bytes(*v)),
                }
            }
            let next = match ifd.next {
                None => 0,
                Some(Link::Ifd(t)) => ifd_offsets[t],
                Some(Link::Raw(v)) => v,
            };
            out.extend(self.u32_bytes(next));

            for e in &ifd.entries {
                if let Payload::Data(d) = &e.payload {
                    if d.len() > 4 {
                        out.extend(d);
                    }
                }
            }
        }
        out
    }

    fn push(&mut self, ifd: usize, tag: u16, format: u16, count: u32, payload: Payload) -> &mut Self {
        self.ifds[ifd].entries.push(EntrySpec {
            tag,
            format,
            count,
            payload,
        });
        self
    }

    fn u16_bytes(&self, v: u16) -> [u8; 2] {
        match self.endian {
            Endianness::Big => v.to_be_bytes(),
            _ => v.to_le_bytes(),
        }
    }

    fn u32_bytes(&self, v: u32) -> [u8; 4] {
        match self.endian {
            Endianness::Big => v.to_be_bytes(),
            _ => v.to_le_bytes(),
        }
    }
}

/// A marker segment with a length field: `FF marker len(2) payload`.
pub fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, marker];
    out.extend(((payload.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// An `Exif\0\0` APP1 payload wrapping `tiff`.
pub fn exif_payload(tiff: &[u8]) -> Vec<u8> {
    let mut out = b"Exif\0\0".to_vec();
    out.extend_from_slice(tiff);
    out
}

/// SOS marker, a scan header and entropy-coded data containing a stuffed
/// byte and a restart marker. The header holds no 0xFF byte, so the scanner
/// passes over it like any other scan data.
pub fn scan() -> Vec<u8> {
    let mut out = segment(0xDA, &[0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]);
    out.extend([0x12, 0xFF, 0x00, 0xAB, 0x34, 0xFF, 0xD0, 0x56, 0xFF, 0x00, 0x78]);
    out
}

/// A small but complete JFIF stream: SOI, APP0, the given `segments`, DQT,
/// one scan, EOI.
pub fn jfif_with(segments: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    out.extend(segment(0xE0, b"JFIF\0\x01\x02\x00\x00\x01\x00\x01\x00\x00"));
    for s in segments {
        out.extend_from_slice(s);
    }
    out.extend(segment(0xDB, &[0u8; 65]));
    out.extend(scan());
    out.extend([0xFF, 0xD9]);
    out
}

/// A JFIF stream carrying `tiff` in an Exif APP1 segment.
pub fn jfif_with_exif(tiff: &[u8]) -> Vec<u8> {
    jfif_with(&[segment(0xE1, &exif_payload(tiff))])
}

/// Wraps a reader and counts calls to [`Seek::seek`].
pub struct SeekCounter<R> {
    inner: R,
    seeks: Rc<Cell<usize>>,
}

impl<R> SeekCounter<R> {
    pub fn new(inner: R) -> (Self, Rc<Cell<usize>>) {
        let seeks = Rc::new(Cell::new(0));
        (
            Self {
                inner,
                seeks: seeks.clone(),
            },
            seeks,
        )
    }
}

impl<R: Read> Read for SeekCounter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Seek> Seek for SeekCounter<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.seeks.set(self.seeks.get() + 1);
        self.inner.seek(pos)
    }
}
