use std::fs::Metadata;
use std::io::Read;

use tar::{EntryType, Header, HeaderMode};

use crate::error::{Error, Result};

/// One logical member of an archive stream.
///
/// Entries are transient: built while walking or reading and dropped once
/// written to the stream or materialized on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Slash-separated, relative member name.
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    pub mode: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink { target: String },
    /// A hard link to an earlier member, named by its archive path.
    HardLink { target: String },
    /// Devices, fifos and other members that carry no extractable content.
    Other,
}

impl ArchiveEntry {
    pub fn file(name: impl Into<String>, size: u64, mode: u32) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            size,
            mode,
        }
    }

    pub fn directory(name: impl Into<String>, mode: u32) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            size: 0,
            mode,
        }
    }

    pub fn symlink(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Symlink {
                target: target.into(),
            },
            size: 0,
            mode: 0o777,
        }
    }

    /// Build a GNU header for this entry from the source's `lstat` metadata.
    ///
    /// The path is left unset; the builder writes it (with long-name records
    /// when needed) when the entry is appended.
    pub(crate) fn header(&self, metadata: &Metadata) -> Header {
        let mut header = Header::new_gnu();
        header.set_metadata_in_mode(metadata, HeaderMode::Complete);
        header.set_mode(self.mode);
        match &self.kind {
            EntryKind::File => {
                header.set_entry_type(EntryType::Regular);
                header.set_size(self.size);
            }
            EntryKind::Directory => {
                header.set_entry_type(EntryType::Directory);
                header.set_size(0);
            }
            EntryKind::Symlink { .. } => {
                header.set_entry_type(EntryType::Symlink);
                header.set_size(0);
            }
            EntryKind::HardLink { .. } => {
                header.set_entry_type(EntryType::Link);
                header.set_size(0);
            }
            EntryKind::Other => {}
        }
        header
    }

    /// Read the metadata of an entry coming off an archive stream.
    pub(crate) fn from_tar<R: Read>(entry: &tar::Entry<'_, R>) -> Result<Self> {
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let header = entry.header();
        let size = entry.size();
        let mode = header.mode().unwrap_or(0o644);

        let link = || -> Result<String> {
            entry
                .link_name_bytes()
                .map(|t| String::from_utf8_lossy(&t).into_owned())
                .ok_or_else(|| Error::Corrupted {
                    entry: name.clone(),
                    prefix: String::new(),
                })
        };

        let entry_type = header.entry_type();
        let kind = if entry_type.is_dir() {
            EntryKind::Directory
        } else if entry_type.is_symlink() {
            EntryKind::Symlink { target: link()? }
        } else if entry_type.is_hard_link() {
            EntryKind::HardLink { target: link()? }
        } else if entry_type.is_file() || entry_type == EntryType::Continuous {
            EntryKind::File
        } else {
            EntryKind::Other
        };

        Ok(Self {
            name,
            kind,
            size,
            mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_fields() {
        let entry = ArchiveEntry::file("tmp/app/bin/tool", 1024, 0o755);
        assert_eq!(entry.name, "tmp/app/bin/tool");
        assert_eq!(entry.size, 1024);
        assert_eq!(entry.kind, EntryKind::File);
        assert_eq!(entry.mode, 0o755);
    }

    #[test]
    fn entry_directory() {
        let entry = ArchiveEntry::directory("tmp/app/empty", 0o755);
        assert_eq!(entry.kind, EntryKind::Directory);
        assert_eq!(entry.size, 0);
    }

    #[test]
    fn entry_symlink() {
        let entry = ArchiveEntry::symlink("lib/lib.so", "liblib.so.1");
        assert_eq!(
            entry.kind,
            EntryKind::Symlink {
                target: "liblib.so.1".into()
            }
        );
        assert_eq!(entry.mode, 0o777);
    }

    #[test]
    fn header_round_trips_through_reader() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("data.txt");
        std::fs::write(&source, b"hello").unwrap();
        let metadata = std::fs::symlink_metadata(&source).unwrap();

        let entry = ArchiveEntry::file("srv/data.txt", 5, 0o640);
        let mut header = entry.header(&metadata);

        let mut builder = tar::Builder::new(Vec::new());
        builder
            .append_data(&mut header, &entry.name, &b"hello"[..])
            .unwrap();
        let bytes = builder.into_inner().unwrap();

        let mut archive = tar::Archive::new(&bytes[..]);
        let read_back = archive.entries().unwrap().next().unwrap().unwrap();
        let parsed = ArchiveEntry::from_tar(&read_back).unwrap();

        assert_eq!(parsed.name, "srv/data.txt");
        assert_eq!(parsed.size, 5);
        assert_eq!(parsed.mode & 0o777, 0o640);
        assert_eq!(parsed.kind, EntryKind::File);
    }
}
