use std::collections::HashSet;

use crate::{
    cursor::Cursor,
    found::FoundTags,
    parser::MetadataParser,
    values::Tag,
    Error,
};

use super::{decode_value, DirectoryEntry, Scope, TagBehavior, IFD_ENTRY_SIZE};

/// Nested sub-directories deeper than this are skipped.
const MAX_IFD_DEPTH: usize = 8;

/// Walks IFD chains and the sub-directories their pointer tags lead to,
/// collecting decoded tags into a [`FoundTags`].
///
/// One walker serves a whole TIFF stream: the set of visited directory
/// addresses is shared by the top-level chain and every recursion, so a
/// directory reached twice is reported as
/// [`InvariantViolation`](Error::InvariantViolation) instead of being walked
/// again. This includes acyclic sharing, e.g. IFD0 and the Exif IFD both
/// pointing at the same Interoperability IFD.
pub(crate) struct IfdWalker<'p> {
    parser: &'p MetadataParser,
    visited: HashSet<u32>,
    depth: usize,
}

impl<'p> IfdWalker<'p> {
    pub fn new(parser: &'p MetadataParser) -> Self {
        Self {
            parser,
            visited: HashSet::new(),
            depth: 0,
        }
    }

    /// Walk the chain of directories starting at `start`, following next
    /// pointers until one is 0.
    ///
    /// A failure in the first directory is returned; a recoverable failure
    /// in a later one ends the chain and keeps what was found so far.
    #[tracing::instrument(skip_all, fields(start = format!("0x{start:08x}"), overlay = ?overlay))]
    pub fn walk_chain(
        &mut self,
        cursor: &mut Cursor<'_>,
        start: u32,
        overlay: Option<Scope>,
        found: &mut FoundTags,
    ) -> crate::Result<()> {
        let mut addr = start;
        let mut index = 0usize;

        while addr != 0 {
            if !self.visited.insert(addr) {
                return Err(Error::InvariantViolation(format!(
                    "IFD at 0x{addr:08x} is reached twice"
                )));
            }

            match self.walk_directory(cursor, addr, overlay, found) {
                Ok(next) => addr = next,
                Err(e) if index > 0 && e.is_recoverable() => {
                    tracing::warn!(index, addr = format!("0x{addr:08x}"), ?e, "IFD skipped, chain ends");
                    break;
                }
                Err(e) => return Err(e),
            }
            index += 1;
        }

        Ok(())
    }

    /// Walk one directory and return its next pointer.
    fn walk_directory(
        &mut self,
        cursor: &mut Cursor<'_>,
        addr: u32,
        overlay: Option<Scope>,
        found: &mut FoundTags,
    ) -> crate::Result<u32> {
        cursor.seek_absolute(u64::from(addr))?;
        let entry_num = cursor.read_u16()?;
        cursor.check_range(cursor.offset(), u64::from(entry_num) * IFD_ENTRY_SIZE as u64)?;
        tracing::debug!(addr = format!("0x{addr:08x}"), entry_num, ?overlay, "IFD");

        for _ in 0..entry_num {
            let mut buf = [0u8; IFD_ENTRY_SIZE];
            cursor.read_exact(&mut buf)?;
            let (_, entry) = DirectoryEntry::parse(&buf, cursor.endian())?;
            self.visit_entry(cursor, &entry, overlay, found)?;
        }

        // Some writers drop the trailing next pointer of the last IFD.
        match cursor.read_u32() {
            Ok(next) => Ok(next),
            Err(e) if e.is_recoverable() => {
                tracing::debug!(?e, "missing next IFD pointer");
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    fn visit_entry(
        &mut self,
        cursor: &mut Cursor<'_>,
        entry: &DirectoryEntry,
        overlay: Option<Scope>,
        found: &mut FoundTags,
    ) -> crate::Result<()> {
        let parser = self.parser;
        let Some((scope, descriptor)) = parser.registries().lookup(entry.tag, overlay) else {
            if parser.records_unknown() {
                return self.decode_into(cursor, entry, "Unknown", overlay.unwrap_or(Scope::Root), found);
            }
            tracing::trace!(tag = format!("0x{:04x}", entry.tag), ?overlay, "unknown tag skipped");
            return Ok(());
        };

        match descriptor.behavior {
            TagBehavior::Decode => self.decode_into(cursor, entry, descriptor.name, scope, found),
            TagBehavior::RecurseInto(sub) => self.recurse(cursor, entry, sub, found),
        }
    }

    fn recurse(
        &mut self,
        cursor: &mut Cursor<'_>,
        entry: &DirectoryEntry,
        scope: Scope,
        found: &mut FoundTags,
    ) -> crate::Result<()> {
        if self.depth >= MAX_IFD_DEPTH {
            tracing::warn!(depth = self.depth, ?scope, "sub-IFD is nested too deep, skipped");
            return Ok(());
        }

        let target = entry.value_or_offset;
        self.depth += 1;
        let res = cursor.restoring(|c| self.walk_chain(c, target, Some(scope), found));
        self.depth -= 1;

        match res {
            Ok(()) => Ok(()),
            Err(e) if e.is_recoverable() => {
                tracing::warn!(tag = format!("0x{:04x}", entry.tag), ?scope, ?e, "sub-IFD skipped");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn decode_into(
        &mut self,
        cursor: &mut Cursor<'_>,
        entry: &DirectoryEntry,
        name: &'static str,
        scope: Scope,
        found: &mut FoundTags,
    ) -> crate::Result<()> {
        let res = entry
            .data_format()
            .and_then(|format| decode_value(entry, cursor).map(|value| (format, value)));

        match res {
            Ok((format, value)) => {
                let tag = Tag {
                    id: entry.tag,
                    name,
                    scope,
                    format,
                    value,
                };
                found.insert(tag, self.parser.duplicate_policy());
                Ok(())
            }
            Err(e) if e.is_recoverable() => {
                tracing::warn!(tag = format!("0x{:04x}", entry.tag), name, ?e, "entry skipped");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
