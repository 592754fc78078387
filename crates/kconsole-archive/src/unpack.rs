use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use tar::EntryType;
use tracing::{debug, warn};

use crate::entry::{ArchiveEntry, EntryKind};
use crate::error::{Error, Result};
use crate::options::{ExistingPolicy, UnpackOptions};
use crate::report::ArchiveStats;
use crate::sanitize::{normalize, resolve_within};

/// Materializes an archive stream under a destination directory.
///
/// Every member must live under `prefix`; the prefix is stripped and the rest
/// normalized before it is joined onto `dest_dir`. Members are written in
/// stream order and each regular file is consumed to its declared length
/// before the next header is read.
#[derive(Clone, Debug)]
pub struct Unpacker {
    dest_dir: PathBuf,
    prefix: String,
    options: UnpackOptions,
}

impl Unpacker {
    pub fn new(dest_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dest_dir: dest_dir.into(),
            prefix: prefix.into(),
            options: UnpackOptions::default(),
        }
    }

    pub fn with_options(mut self, options: UnpackOptions) -> Self {
        self.options = options;
        self
    }

    pub fn unpack<R: Read>(&self, reader: R) -> Result<ArchiveStats> {
        let mut archive = tar::Archive::new(reader);
        let mut stats = ArchiveStats::default();

        for entry in archive.entries().map_err(Error::Stream)? {
            let mut entry = entry.map_err(Error::Stream)?;
            if entry.header().entry_type() == EntryType::XGlobalHeader {
                continue;
            }

            let meta = ArchiveEntry::from_tar(&entry)?;
            let relative = self.strip_prefix(&meta.name)?;
            let target = resolve_within(&self.dest_dir, &meta.name, &relative)?;
            self.prepare_parent(&meta.name, &target)?;

            match &meta.kind {
                EntryKind::Directory => self.create_dir(&meta.name, &target)?,
                EntryKind::Symlink { target: link } => {
                    self.create_symlink(&meta.name, link, &target)?
                }
                EntryKind::HardLink { target: link } => {
                    self.create_hard_link(&meta.name, link, &target)?
                }
                EntryKind::File => self.write_file(&mut entry, &meta, &target)?,
                EntryKind::Other => {
                    debug!(entry = %meta.name, "skipping unsupported member type");
                }
            }

            debug!(entry = %meta.name, path = %target.display(), "unpacked entry");
            stats.record(&meta);
        }

        Ok(stats)
    }

    /// Strip the transfer prefix from a member name, failing on any member
    /// that does not live under it.
    fn strip_prefix(&self, name: &str) -> Result<String> {
        let rest = name
            .strip_prefix(self.prefix.as_str())
            .filter(|rest| self.prefix.is_empty() || rest.is_empty() || rest.starts_with('/'))
            .ok_or_else(|| Error::Corrupted {
                entry: name.to_string(),
                prefix: self.prefix.clone(),
            })?;
        Ok(normalize(rest))
    }

    fn prepare_parent(&self, entry: &str, target: &Path) -> Result<()> {
        let Some(parent) = target.parent() else {
            return Ok(());
        };
        self.reject_symlink_ancestors(entry, parent)?;
        self.mkdir_all(parent)
    }

    /// Refuse to descend through a symlink at or below the destination root:
    /// an earlier member could otherwise redirect later writes anywhere.
    fn reject_symlink_ancestors(&self, entry: &str, dir: &Path) -> Result<()> {
        let Ok(inside) = dir.strip_prefix(&self.dest_dir) else {
            return Ok(());
        };

        let mut current = self.dest_dir.clone();
        let mut components = inside.components();
        loop {
            match fs::symlink_metadata(&current) {
                Ok(meta) if meta.file_type().is_symlink() => {
                    return Err(Error::PathTraversal {
                        entry: entry.to_string(),
                        resolved: current,
                    });
                }
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => break,
                Err(source) => {
                    return Err(Error::ExtractionFailed {
                        path: current,
                        source,
                    });
                }
            }
            let Some(component) = components.next() else {
                break;
            };
            current.push(component);
        }
        Ok(())
    }

    fn mkdir_all(&self, dir: &Path) -> Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(self.options.dir_mode);
        }
        builder
            .create(dir)
            .map_err(|source| Error::DirectoryCreationFailed {
                path: dir.to_path_buf(),
                source,
            })
    }

    fn create_dir(&self, entry: &str, target: &Path) -> Result<()> {
        if let Ok(meta) = fs::symlink_metadata(target)
            && meta.file_type().is_symlink()
        {
            return Err(Error::PathTraversal {
                entry: entry.to_string(),
                resolved: target.to_path_buf(),
            });
        }
        self.mkdir_all(target)
    }

    fn create_symlink(&self, entry: &str, link: &str, target: &Path) -> Result<()> {
        self.clear_existing(target, true)?;
        self.check_link_target(entry, link, target);

        make_symlink(link, target).map_err(|source| Error::SymlinkCreationFailed {
            target: PathBuf::from(link),
            link: target.to_path_buf(),
            source,
        })
    }

    fn create_hard_link(&self, entry: &str, link: &str, target: &Path) -> Result<()> {
        let source_relative = self.strip_prefix(link)?;
        let source = resolve_within(&self.dest_dir, entry, &source_relative)?;
        if let Some(source_parent) = source.parent() {
            self.reject_symlink_ancestors(entry, source_parent)?;
        }
        self.clear_existing(target, true)?;

        fs::hard_link(&source, target).map_err(|e| Error::ExtractionFailed {
            path: target.to_path_buf(),
            source: e,
        })
    }

    fn write_file<R: Read>(
        &self,
        entry: &mut tar::Entry<'_, R>,
        meta: &ArchiveEntry,
        target: &Path,
    ) -> Result<()> {
        self.clear_existing(target, false)?;

        let extraction_failed = |source: io::Error| Error::ExtractionFailed {
            path: target.to_path_buf(),
            source,
        };

        let mut file = File::create(target).map_err(extraction_failed)?;
        let copied = io::copy(entry, &mut file).map_err(extraction_failed)?;
        if copied != meta.size {
            return Err(extraction_failed(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {} bytes, stream ended after {copied}", meta.size),
            )));
        }
        drop(file);

        if self.options.preserve_permissions {
            set_mode(target, meta.mode).map_err(extraction_failed)?;
        }
        Ok(())
    }

    /// Deal with whatever already occupies `target`.
    ///
    /// A symlink is never written through. Regular files are truncated in
    /// place by file members; link members (`always`) apply the policy to any
    /// existing non-directory.
    fn clear_existing(&self, target: &Path, always: bool) -> Result<()> {
        let existing = match fs::symlink_metadata(target) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(Error::ExtractionFailed {
                    path: target.to_path_buf(),
                    source,
                });
            }
        };

        let file_type = existing.file_type();
        if !always && !file_type.is_symlink() {
            return Ok(());
        }

        match self.options.existing {
            ExistingPolicy::Replace if !file_type.is_dir() => {
                fs::remove_file(target).map_err(|source| Error::ExtractionFailed {
                    path: target.to_path_buf(),
                    source,
                })
            }
            _ => Err(Error::AlreadyExists {
                path: target.to_path_buf(),
            }),
        }
    }

    fn check_link_target(&self, entry: &str, link: &str, target: &Path) {
        if Path::new(link).is_absolute() {
            debug!(entry, link, "absolute symlink target kept verbatim");
            return;
        }
        let (Some(parent), Ok(root)) = (target.parent(), fs::canonicalize(&self.dest_dir)) else {
            return;
        };
        let Ok(real_parent) = fs::canonicalize(parent) else {
            return;
        };

        let resolved = lexical_join(&real_parent, link);
        if !resolved.starts_with(&root) {
            warn!(
                entry,
                link,
                resolved = %resolved.display(),
                "symlink target points outside the destination"
            );
        }
    }
}

/// Unpack `reader` into `dest_dir`, requiring every member to live under `prefix`.
pub fn unpack<R: Read>(reader: R, dest_dir: &Path, prefix: &str) -> Result<ArchiveStats> {
    Unpacker::new(dest_dir, prefix).unpack(reader)
}

fn lexical_join(base: &Path, relative: &str) -> PathBuf {
    let mut out = base.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
            _ => {}
        }
    }
    out
}

#[cfg(unix)]
fn make_symlink(original: &str, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
fn make_symlink(original: &str, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(original, link)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777))
}

#[cfg(not(unix))]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(mode & 0o222 == 0);
    fs::set_permissions(path, perms)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Append a member with a raw name, bypassing the builder's path checks.
    fn raw_member(builder: &mut tar::Builder<Vec<u8>>, name: &str, kind: EntryType, link: Option<&str>, data: &[u8]) {
        let mut header = tar::Header::new_gnu();
        {
            let gnu = header.as_gnu_mut().unwrap();
            gnu.name[..name.len()].copy_from_slice(name.as_bytes());
            if let Some(link) = link {
                gnu.linkname[..link.len()].copy_from_slice(link.as_bytes());
            }
        }
        header.set_entry_type(kind);
        header.set_mode(0o644);
        header.set_size(data.len() as u64);
        header.set_cksum();
        builder.append(&header, data).unwrap();
    }

    fn archive(members: &[(&str, EntryType, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, kind, link, data) in members {
            raw_member(&mut builder, name, *kind, *link, data);
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn strips_prefix_and_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nginx");
        let bytes = archive(&[
            ("etc/nginx/", EntryType::Directory, None, b""),
            ("etc/nginx/conf.d/site.conf", EntryType::Regular, None, b"server {}"),
        ]);

        let stats = unpack(&bytes[..], &dest, "etc/nginx").unwrap();

        assert_eq!(
            fs::read(dest.join("conf.d/site.conf")).unwrap(),
            b"server {}"
        );
        assert_eq!(stats.files, 1);
        assert_eq!(stats.directories, 1);
        assert_eq!(stats.bytes, 9);
    }

    #[test]
    fn single_file_lands_on_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("hosts");
        let bytes = archive(&[("etc/hosts", EntryType::Regular, None, b"127.0.0.1 localhost")]);

        unpack(&bytes[..], &dest, "etc/hosts").unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"127.0.0.1 localhost");
    }

    #[test]
    fn member_outside_prefix_is_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        let bytes = archive(&[("etc/shadow", EntryType::Regular, None, b"root:x")]);

        let result = unpack(&bytes[..], &dest, "var/log");

        assert!(matches!(result, Err(Error::Corrupted { .. })));
        assert!(!dest.exists());
    }

    #[test]
    fn prefix_must_end_on_segment() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = archive(&[("etc/nginx-evil/x", EntryType::Regular, None, b"x")]);
        let result = unpack(&bytes[..], dir.path(), "etc/nginx");
        assert!(matches!(result, Err(Error::Corrupted { .. })));
    }

    #[test]
    fn traversal_is_defanged_inside_root() {
        let jail = tempfile::tempdir().unwrap();
        let dest = jail.path().join("a/b/dest");
        let bytes = archive(&[("../../etc/passwd", EntryType::Regular, None, b"pwned")]);

        unpack(&bytes[..], &dest, "").unwrap();

        assert_eq!(fs::read(dest.join("etc/passwd")).unwrap(), b"pwned");
        assert!(!jail.path().join("a/etc").exists());
        assert!(!jail.path().join("etc").exists());
    }

    #[cfg(unix)]
    #[test]
    fn write_through_symlinked_directory_is_rejected() {
        let jail = tempfile::tempdir().unwrap();
        let outside = jail.path().join("outside");
        fs::create_dir(&outside).unwrap();
        let dest = jail.path().join("dest");

        let outside_str = outside.to_str().unwrap().to_string();
        let bytes = archive(&[
            ("data/escape", EntryType::Symlink, Some(&outside_str), b""),
            ("data/escape/owned", EntryType::Regular, None, b"gotcha"),
        ]);

        let result = unpack(&bytes[..], &dest, "data");

        assert!(matches!(result, Err(Error::PathTraversal { .. })));
        assert!(!outside.join("owned").exists());
    }

    #[cfg(unix)]
    #[test]
    fn destination_root_symlink_is_not_followed() {
        let jail = tempfile::tempdir().unwrap();
        let outside = jail.path().join("outside");
        fs::create_dir(&outside).unwrap();
        let local = jail.path().join("local");
        fs::create_dir(&local).unwrap();
        let dest = local.join("data");

        let outside_str = outside.to_str().unwrap().to_string();
        let bytes = archive(&[
            ("data", EntryType::Symlink, Some(&outside_str), b""),
            ("data/owned", EntryType::Regular, None, b"gotcha"),
        ]);

        let result = unpack(&bytes[..], &dest, "data");

        assert!(matches!(result, Err(Error::PathTraversal { .. })));
        assert!(!outside.join("owned").exists());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_as_whole_download_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("current");
        let bytes = archive(&[("srv/current", EntryType::Symlink, Some("releases/7"), b"")]);

        let stats = unpack(&bytes[..], &dest, "srv/current").unwrap();

        assert_eq!(stats.symlinks, 1);
        assert_eq!(fs::read_link(&dest).unwrap(), Path::new("releases/7"));
    }

    #[cfg(unix)]
    #[test]
    fn existing_symlink_rejected_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dest");
        fs::create_dir(&dest).unwrap();
        std::os::unix::fs::symlink("old", dest.join("link")).unwrap();

        let bytes = archive(&[("d/link", EntryType::Symlink, Some("new"), b"")]);
        let result = unpack(&bytes[..], &dest, "d");

        assert!(matches!(result, Err(Error::AlreadyExists { .. })));
        assert_eq!(fs::read_link(dest.join("link")).unwrap(), Path::new("old"));
    }

    #[cfg(unix)]
    #[test]
    fn existing_symlink_replaced_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dest");
        fs::create_dir(&dest).unwrap();
        std::os::unix::fs::symlink("old", dest.join("link")).unwrap();

        let bytes = archive(&[("d/link", EntryType::Symlink, Some("new"), b"")]);
        Unpacker::new(&dest, "d")
            .with_options(UnpackOptions::default().existing(ExistingPolicy::Replace))
            .unpack(&bytes[..])
            .unwrap();

        assert_eq!(fs::read_link(dest.join("link")).unwrap(), Path::new("new"));
    }

    #[cfg(unix)]
    #[test]
    fn file_member_never_writes_through_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dest");
        fs::create_dir(&dest).unwrap();
        let victim = dir.path().join("victim");
        fs::write(&victim, b"original").unwrap();
        std::os::unix::fs::symlink(&victim, dest.join("file")).unwrap();

        let bytes = archive(&[("d/file", EntryType::Regular, None, b"overwritten")]);
        let result = unpack(&bytes[..], &dest, "d");

        assert!(matches!(result, Err(Error::AlreadyExists { .. })));
        assert_eq!(fs::read(&victim).unwrap(), b"original");
    }

    #[cfg(unix)]
    #[test]
    fn file_member_replaces_symlink_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dest");
        fs::create_dir(&dest).unwrap();
        let victim = dir.path().join("victim");
        fs::write(&victim, b"original").unwrap();
        std::os::unix::fs::symlink(&victim, dest.join("file")).unwrap();

        let bytes = archive(&[("d/file", EntryType::Regular, None, b"fresh")]);
        Unpacker::new(&dest, "d")
            .with_options(UnpackOptions::default().existing(ExistingPolicy::Replace))
            .unpack(&bytes[..])
            .unwrap();

        let meta = fs::symlink_metadata(dest.join("file")).unwrap();
        assert!(meta.file_type().is_file());
        assert_eq!(fs::read(dest.join("file")).unwrap(), b"fresh");
        assert_eq!(fs::read(&victim).unwrap(), b"original");
    }

    #[test]
    fn existing_hard_link_destination_rejected_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dest");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("alias"), b"mine").unwrap();

        let bytes = archive(&[
            ("d/original", EntryType::Regular, None, b"shared"),
            ("d/alias", EntryType::Link, Some("d/original"), b""),
        ]);
        let result = unpack(&bytes[..], &dest, "d");

        assert!(matches!(result, Err(Error::AlreadyExists { .. })));
        assert_eq!(fs::read(dest.join("alias")).unwrap(), b"mine");
    }

    #[test]
    fn existing_hard_link_destination_replaced_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dest");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("alias"), b"mine").unwrap();

        let bytes = archive(&[
            ("d/original", EntryType::Regular, None, b"shared"),
            ("d/alias", EntryType::Link, Some("d/original"), b""),
        ]);
        Unpacker::new(&dest, "d")
            .with_options(UnpackOptions::default().existing(ExistingPolicy::Replace))
            .unpack(&bytes[..])
            .unwrap();

        assert_eq!(fs::read(dest.join("alias")).unwrap(), b"shared");
    }

    #[test]
    fn existing_regular_file_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dest");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("f"), b"a much longer previous body").unwrap();

        let bytes = archive(&[("d/f", EntryType::Regular, None, b"new")]);
        unpack(&bytes[..], &dest, "d").unwrap();

        assert_eq!(fs::read(dest.join("f")).unwrap(), b"new");
    }

    #[test]
    fn unrelated_content_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dest");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("keep.txt"), b"mine").unwrap();

        let bytes = archive(&[("d/new.txt", EntryType::Regular, None, b"theirs")]);
        unpack(&bytes[..], &dest, "d").unwrap();

        assert_eq!(fs::read(dest.join("keep.txt")).unwrap(), b"mine");
        assert_eq!(fs::read(dest.join("new.txt")).unwrap(), b"theirs");
    }

    #[test]
    fn hard_link_points_at_earlier_member() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dest");
        let bytes = archive(&[
            ("d/original", EntryType::Regular, None, b"shared"),
            ("d/alias", EntryType::Link, Some("d/original"), b""),
        ]);

        let stats = unpack(&bytes[..], &dest, "d").unwrap();

        assert_eq!(fs::read(dest.join("alias")).unwrap(), b"shared");
        assert_eq!(stats.hard_links, 1);
    }

    #[test]
    fn hard_link_outside_prefix_is_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = archive(&[("d/alias", EntryType::Link, Some("etc/shadow"), b"")]);
        let result = unpack(&bytes[..], dir.path(), "d");
        assert!(matches!(result, Err(Error::Corrupted { .. })));
    }

    #[test]
    fn truncated_stream_fails() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = archive(&[("d/big", EntryType::Regular, None, &[7u8; 4096])]);
        let cut = &bytes[..512 + 1000];

        let result = unpack(cut, &dir.path().join("dest"), "d");

        let err = result.unwrap_err();
        assert!(err.is_pipe_closed(), "unexpected error: {err:?}");
    }

    #[test]
    fn lexical_join_resolves_parents() {
        let joined = lexical_join(Path::new("/a/b"), "../c/./d");
        assert_eq!(joined, Path::new("/a/c/d"));
    }
}
