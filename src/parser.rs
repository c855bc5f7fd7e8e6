use std::{
    fmt::Debug,
    fs::File,
    io::{BufReader, Read, Seek},
    path::Path,
    sync::Arc,
};

use nom::number::Endianness;

use crate::{
    cursor::Cursor,
    exif::{recognize_tiff_big_endian, recognize_tiff_little_endian, TagRegistries},
    found::{DuplicatePolicy, FoundTags},
    jpeg::recognize_jfif,
    Error,
};

/// Container formats a recognizer can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jfif,
    Tiff(Endianness),
    /// Reported by user supplied recognizers.
    Other(&'static str),
}

/// A reader for one container format, handed out by a [`Recognizer`] that
/// accepted the stream.
pub trait ImageReader: Debug {
    fn format(&self) -> ImageFormat;

    /// Read all tags reachable from the cursor's origin into `found`, and
    /// return the offset (relative to the origin) where reading stopped.
    fn read_partial(
        &self,
        cursor: &mut Cursor<'_>,
        parser: &MetadataParser,
        found: &mut FoundTags,
    ) -> crate::Result<u64>;

    fn read(&self, cursor: &mut Cursor<'_>, parser: &MetadataParser) -> crate::Result<FoundTags> {
        let mut found = FoundTags::new();
        self.read_partial(cursor, parser, &mut found)?;
        Ok(found)
    }
}

/// Inspects the stream prefix at the cursor's position.
///
/// Returns `Ok(None)` if the prefix doesn't match (a stream too short to
/// decide is a mismatch too). The cursor position on return doesn't matter,
/// the caller rewinds it.
pub type Recognizer = fn(&mut Cursor<'_>) -> crate::Result<Option<Box<dyn ImageReader>>>;

const DEFAULT_MAX_NESTING: usize = 4;

/// Parses image metadata with an explicit, immutable configuration: the tag
/// registries, the ordered list of format recognizers and a few policies.
///
/// A `MetadataParser` holds no per-parse state. Build one, then share it
/// between threads and parses as needed.
///
/// ## Example
///
/// ```rust
/// use nom_imgmeta::*;
/// use std::io::Cursor;
///
/// // A big-endian TIFF with a single `Make` entry.
/// let mut tiff = b"MM\0\x2a\0\0\0\x08\0\x01".to_vec();
/// tiff.extend([0x01, 0x0f, 0, 2, 0, 0, 0, 5, 0, 0, 0, 0x1a, 0, 0, 0, 0]);
/// tiff.extend(b"Acme\0");
///
/// let parser = MetadataParser::new().with_duplicate_policy(DuplicatePolicy::FirstWins);
/// assert_eq!(
///     parser.detect(Cursor::new(&tiff)).unwrap(),
///     ImageFormat::Tiff(Endianness::Big)
/// );
///
/// let found = parser.read(Cursor::new(&tiff)).unwrap();
/// let make = found.get(0x010f).unwrap();
/// assert_eq!(make.name, "Make");
/// assert_eq!(make.value.as_str(), Some("Acme"));
/// ```
#[derive(Clone)]
pub struct MetadataParser {
    registries: Arc<TagRegistries>,
    recognizers: Vec<Recognizer>,
    duplicate_policy: DuplicatePolicy,
    record_unknown: bool,
    max_nesting: usize,
}

impl Debug for MetadataParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataParser")
            .field("recognizers", &self.recognizers.len())
            .field("duplicate_policy", &self.duplicate_policy)
            .field("record_unknown", &self.record_unknown)
            .field("max_nesting", &self.max_nesting)
            .finish_non_exhaustive()
    }
}

impl Default for MetadataParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataParser {
    /// Standard registries; JFIF, big-endian TIFF and little-endian TIFF
    /// recognizers, tried in that order.
    pub fn new() -> Self {
        Self {
            registries: TagRegistries::shared(),
            recognizers: vec![
                recognize_jfif,
                recognize_tiff_big_endian,
                recognize_tiff_little_endian,
            ],
            duplicate_policy: DuplicatePolicy::default(),
            record_unknown: false,
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }

    pub fn with_registries(mut self, registries: impl Into<Arc<TagRegistries>>) -> Self {
        self.registries = registries.into();
        self
    }

    /// Append a recognizer, tried after the existing ones.
    pub fn with_recognizer(mut self, recognizer: Recognizer) -> Self {
        self.recognizers.push(recognizer);
        self
    }

    /// Replace the recognizer list.
    pub fn with_recognizers(mut self, recognizers: impl IntoIterator<Item = Recognizer>) -> Self {
        self.recognizers = recognizers.into_iter().collect();
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Decode entries no registry knows, and store them under the name
    /// `"Unknown"`, instead of skipping them.
    pub fn with_unknown_tags(mut self, record: bool) -> Self {
        self.record_unknown = record;
        self
    }

    /// Limit how deep embedded streams (e.g. the TIFF blob in a JPEG APP1
    /// segment) may nest.
    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }

    pub fn registries(&self) -> &TagRegistries {
        &self.registries
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicate_policy
    }

    pub fn records_unknown(&self) -> bool {
        self.record_unknown
    }

    pub fn max_nesting(&self) -> usize {
        self.max_nesting
    }

    /// Run the recognizers only.
    pub fn detect<R: Read + Seek>(&self, mut reader: R) -> crate::Result<ImageFormat> {
        let mut cursor = Cursor::new(&mut reader, Endianness::Big)?;
        Ok(self.dispatch(&mut cursor)?.format())
    }

    pub fn read<R: Read + Seek>(&self, reader: R) -> crate::Result<FoundTags> {
        let mut found = FoundTags::new();
        self.read_partial(reader, &mut found)?;
        Ok(found)
    }

    /// Like [`Self::read`], but merges into a caller-owned map. Returns the
    /// offset, relative to the reader's initial position, where reading
    /// stopped.
    ///
    /// Tags decoded before an error are kept in `found`.
    pub fn read_partial<R: Read + Seek>(
        &self,
        mut reader: R,
        found: &mut FoundTags,
    ) -> crate::Result<u64> {
        let mut cursor = Cursor::new(&mut reader, Endianness::Big)?;
        self.dispatch_and_read(&mut cursor, found)
    }

    /// Open `path` and read it with a buffered reader.
    pub fn read_file<P: AsRef<Path>>(&self, path: P) -> crate::Result<FoundTags> {
        self.read(BufReader::new(File::open(path)?))
    }

    /// Try every recognizer, in order, at the cursor's position and return
    /// the first matching reader. The cursor is rewound to where it was.
    #[tracing::instrument(skip_all)]
    pub fn dispatch(&self, cursor: &mut Cursor<'_>) -> crate::Result<Box<dyn ImageReader>> {
        let start = cursor.offset();
        for recognize in &self.recognizers {
            cursor.seek_absolute(start)?;
            if let Some(reader) = recognize(cursor)? {
                tracing::debug!(format = ?reader.format(), depth = cursor.depth(), "format recognized");
                cursor.seek_absolute(start)?;
                return Ok(reader);
            }
        }
        Err(Error::UnrecognizedFileFormat)
    }

    pub(crate) fn dispatch_and_read(
        &self,
        cursor: &mut Cursor<'_>,
        found: &mut FoundTags,
    ) -> crate::Result<u64> {
        let reader = self.dispatch(cursor)?;
        reader.read_partial(cursor, self, found)
    }
}
