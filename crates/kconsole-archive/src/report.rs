use crate::entry::{ArchiveEntry, EntryKind};

/// Counters accumulated while packing or unpacking one stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    pub entries: usize,
    pub files: usize,
    pub directories: usize,
    pub symlinks: usize,
    pub hard_links: usize,
    pub skipped: usize,
    pub bytes: u64,
}

impl ArchiveStats {
    pub(crate) fn record(&mut self, entry: &ArchiveEntry) {
        self.entries += 1;
        match entry.kind {
            EntryKind::File => {
                self.files += 1;
                self.bytes += entry.size;
            }
            EntryKind::Directory => self.directories += 1,
            EntryKind::Symlink { .. } => self.symlinks += 1,
            EntryKind::HardLink { .. } => self.hard_links += 1,
            EntryKind::Other => self.skipped += 1,
        }
    }

    pub(crate) fn skip(&mut self) {
        self.skipped += 1;
    }
}
