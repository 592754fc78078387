use std::fs::{self, File, Metadata};
use std::io::{self, Read, Write};
use std::path::Path;

use tar::Builder;
use tracing::{debug, warn};

use crate::entry::{ArchiveEntry, EntryKind};
use crate::error::{Error, Result};
use crate::report::ArchiveStats;
use crate::sanitize::{base_name, clean, dir_name, has_glob_magic, join, normalize};

/// Streams a local tree into a tar archive.
///
/// Entry bytes go straight from the source files into `W`; nothing is staged
/// in memory beyond the copy buffer. The packer never closes `W`: [`Packer::finish`]
/// writes the end-of-archive marker and hands the writer back.
pub struct Packer<W: Write> {
    builder: Builder<PoisonWriter<W>>,
    stats: ArchiveStats,
}

impl<W: Write> Packer<W> {
    pub fn new(writer: W) -> Self {
        let mut builder = Builder::new(PoisonWriter::new(writer));
        builder.follow_symlinks(false);
        Self {
            builder,
            stats: ArchiveStats::default(),
        }
    }

    pub fn stats(&self) -> &ArchiveStats {
        &self.stats
    }

    /// Pack `source` so that extracting the archive relative to `/` recreates
    /// it at `dest`.
    pub fn pack_path(&mut self, source: &str, dest: &str) -> Result<()> {
        let source = clean(source);
        let dest = clean(dest);
        self.pack(
            &dir_name(&source),
            &base_name(&source),
            &dir_name(&dest),
            &base_name(&dest),
        )
    }

    /// Pack `source_base/source_leaf` under the member name `dest_base/dest_leaf`.
    ///
    /// The leaf may be a shell glob. A literal leaf keeps `dest_leaf` as its
    /// name; each glob match is placed under `dest_leaf/<match name>`.
    pub fn pack(
        &mut self,
        source_base: &str,
        source_leaf: &str,
        dest_base: &str,
        dest_leaf: &str,
    ) -> Result<()> {
        let result = self.pack_matches(source_base, source_leaf, dest_base, dest_leaf);
        if result.is_err() {
            self.builder.get_mut().poison();
        }
        result
    }

    fn pack_matches(
        &mut self,
        source_base: &str,
        source_leaf: &str,
        dest_base: &str,
        dest_leaf: &str,
    ) -> Result<()> {
        let pattern = join(source_base, source_leaf);
        let dest = join(dest_base, dest_leaf);

        if !has_glob_magic(source_leaf) {
            return self.pack_one(Path::new(&pattern), &dest);
        }

        let paths = glob::glob(&pattern).map_err(|source| Error::Pattern {
            pattern: pattern.clone(),
            source,
        })?;

        let mut matched = 0usize;
        for path in paths {
            let path = path.map_err(|e| Error::ReadFailed {
                path: e.path().to_path_buf(),
                source: io::Error::from(e),
            })?;
            let leaf = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.pack_one(&path, &join(&dest, &leaf))?;
            matched += 1;
        }

        if matched == 0 {
            return Err(Error::NoMatch { pattern });
        }
        Ok(())
    }

    fn pack_one(&mut self, path: &Path, dest: &str) -> Result<()> {
        let metadata = fs::symlink_metadata(path).map_err(read_failed(path))?;
        let file_type = metadata.file_type();

        let mut name = normalize(dest);
        if name.is_empty() && !file_type.is_dir() {
            // a single file packed onto the root keeps its own name
            name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
        }

        if file_type.is_dir() {
            let mut children = fs::read_dir(path).map_err(read_failed(path))?.peekable();
            if children.peek().is_none() {
                if !name.is_empty() {
                    let entry = ArchiveEntry::directory(name, mode_of(&metadata));
                    self.append(&entry, &metadata, io::empty())?;
                }
                return Ok(());
            }
            for child in children {
                let child = child.map_err(read_failed(path))?;
                let child_name = child.file_name().to_string_lossy().into_owned();
                self.pack_one(&child.path(), &join(dest, &child_name))?;
            }
        } else if file_type.is_symlink() {
            let target = fs::read_link(path).map_err(read_failed(path))?;
            let entry = ArchiveEntry::symlink(name, target.to_string_lossy());
            self.append(&entry, &metadata, io::empty())?;
        } else if file_type.is_file() {
            let file = File::open(path).map_err(read_failed(path))?;
            let entry = ArchiveEntry::file(name, metadata.len(), mode_of(&metadata));
            let data = ExactReader::new(file, entry.size);
            self.append(&entry, &metadata, data)?;
        } else {
            warn!(path = %path.display(), "skipping special file");
            self.stats.skip();
        }
        Ok(())
    }

    fn append<R: Read>(&mut self, entry: &ArchiveEntry, metadata: &Metadata, data: R) -> Result<()> {
        let mut header = entry.header(metadata);
        let written = match &entry.kind {
            EntryKind::Symlink { target } => {
                self.builder.append_link(&mut header, &entry.name, target)
            }
            _ => self.builder.append_data(&mut header, &entry.name, data),
        };
        written.map_err(|source| Error::WriteFailed {
            entry: entry.name.clone(),
            source,
        })?;

        self.stats.record(entry);
        debug!(entry = %entry.name, size = entry.size, "packed entry");
        Ok(())
    }

    /// Write the end-of-archive marker and return the writer with the totals.
    pub fn finish(self) -> Result<(W, ArchiveStats)> {
        let stats = self.stats;
        let writer = self
            .builder
            .into_inner()
            .map_err(|source| Error::WriteFailed {
                entry: "<end of archive>".to_string(),
                source,
            })?;
        Ok((writer.into_inner(), stats))
    }
}

/// Pack `source` for extraction at `dest` into `writer` and finish the archive.
pub fn make_tar<W: Write>(source: &str, dest: &str, writer: W) -> Result<(W, ArchiveStats)> {
    let mut packer = Packer::new(writer);
    packer.pack_path(source, dest)?;
    packer.finish()
}

fn read_failed(path: &Path) -> impl FnOnce(io::Error) -> Error + '_ {
    move |source| Error::ReadFailed {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(unix)]
fn mode_of(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(metadata: &Metadata) -> u32 {
    match (metadata.is_dir(), metadata.permissions().readonly()) {
        (true, _) => 0o755,
        (false, true) => 0o444,
        (false, false) => 0o644,
    }
}

/// Refuses further writes once packing has failed, so the builder's drop does
/// not append a trailer that would make a partial archive look complete.
struct PoisonWriter<W> {
    inner: W,
    poisoned: bool,
}

impl<W> PoisonWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            poisoned: false,
        }
    }

    fn poison(&mut self) {
        self.poisoned = true;
    }

    fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for PoisonWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.poisoned {
            return Err(io::Error::other("archive aborted"));
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Yields exactly `expected` bytes of a file whose size was recorded in the
/// header, failing if the file shrank underneath us.
struct ExactReader<R> {
    inner: io::Take<R>,
    remaining: u64,
}

impl<R: Read> ExactReader<R> {
    fn new(inner: R, expected: u64) -> Self {
        Self {
            inner: inner.take(expected),
            remaining: expected,
        }
    }
}

impl<R: Read> Read for ExactReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 && self.remaining > 0 && !buf.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "file shrank while packing",
            ));
        }
        self.remaining -= n as u64;
        Ok(n)
    }
}
