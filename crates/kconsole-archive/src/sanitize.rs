//! Lexical handling of slash-separated archive paths.
//!
//! Everything here works on `/`-separated strings regardless of the host, since
//! tar entry names and container paths always use forward slashes. Nothing in
//! this module touches the filesystem.

use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Lexically clean a slash path: collapse repeated separators, drop `.`
/// segments and resolve `..` against the preceding segment.
///
/// A rooted path never climbs above `/`; a relative path keeps leading `..`
/// segments it cannot resolve. The empty path cleans to `.`.
pub fn clean(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if !rooted => parts.push(".."),
                _ => {}
            },
            name => parts.push(name),
        }
    }

    let body = parts.join("/");
    if rooted {
        format!("/{body}")
    } else if body.is_empty() {
        ".".to_string()
    } else {
        body
    }
}

/// Defang a path taken from an untrusted archive.
///
/// The result never starts with `/` or `../`, is never `.` or `..`, and joined
/// onto any root stays inside that root. The empty string means the root
/// itself.
pub fn normalize(raw: &str) -> String {
    let mut cleaned = clean(raw);

    while let Some(rest) = cleaned.strip_prefix("../") {
        cleaned = rest.to_string();
    }

    if cleaned == "." || cleaned == ".." {
        return String::new();
    }

    match cleaned.strip_prefix('/') {
        Some(rest) => rest.to_string(),
        None => cleaned,
    }
}

/// The prefix every entry of an archive produced for `remote_path` carries.
///
/// Remote `tar` strips the leading `/` from member names, so the prefix is the
/// requested path made relative and normalized.
pub fn remote_prefix(remote_path: &str) -> String {
    normalize(remote_path.trim_start_matches('/'))
}

/// Join slash-path elements, ignoring empty ones, and clean the result.
pub fn join(base: &str, leaf: &str) -> String {
    match (base.is_empty(), leaf.is_empty()) {
        (true, true) => String::new(),
        (true, false) => clean(leaf),
        (false, true) => clean(base),
        (false, false) => clean(&format!("{base}/{leaf}")),
    }
}

/// Last element of a slash path; `.` for the empty path and `/` for the root.
pub fn base_name(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    match trimmed.rfind('/') {
        Some(idx) => trimmed[idx + 1..].to_string(),
        None => trimmed.to_string(),
    }
}

/// Everything but the last element of a slash path, cleaned.
pub fn dir_name(path: &str) -> String {
    match path.rfind('/') {
        Some(idx) => clean(&path[..=idx]),
        None => ".".to_string(),
    }
}

/// Whether a path leaf is a shell glob rather than a literal name.
pub fn has_glob_magic(leaf: &str) -> bool {
    leaf.contains(['*', '?', '['])
}

/// Join a normalized relative path onto `root`, refusing anything that would
/// not land strictly under it.
pub fn resolve_within(root: &Path, entry: &str, relative: &str) -> Result<PathBuf> {
    let mut resolved = root.to_path_buf();

    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::PathTraversal {
                    entry: entry.to_string(),
                    resolved: root.join(relative),
                });
            }
        }
    }

    Ok(resolved)
}
