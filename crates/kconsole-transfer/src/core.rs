//! Core layer: pure decisions made before and after a transfer runs.

use std::path::{Path, PathBuf};

use kconsole_archive::{base_name, clean, has_glob_magic, remote_prefix};
use tracing::debug;

use crate::error::{RemoteError, Result, TransferError};

/// Remote command that extracts an uploaded stream read from stdin.
///
/// Member names are relative to the filesystem root, so extraction happens
/// from `/`. `-m` leaves modification times at extraction time.
pub fn upload_command() -> Vec<String> {
    ["tar", "-xmf", "-", "-C", "/"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Remote command that writes an archive of `remote_path` to stdout.
///
/// The path is the cleaned prefix made absolute. A trailing `/` on the request
/// is kept so a symlinked directory is archived by its contents.
pub fn download_command(remote_path: &str) -> Vec<String> {
    let prefix = remote_prefix(remote_path);
    let mut path = format!("/{prefix}");
    if !prefix.is_empty() && remote_path.ends_with('/') {
        path.push('/');
    }
    ["tar", "cf", "-"]
        .into_iter()
        .map(String::from)
        .chain(std::iter::once(path))
        .collect()
}

/// Remote destination of an upload. A trailing `/` means "into this
/// directory", keeping the source's base name; glob matches already land
/// under the destination by their own names.
pub fn upload_destination(local: &str, remote: &str) -> String {
    let leaf = base_name(&clean(local));
    if remote != "/" && remote.ends_with('/') && !has_glob_magic(&leaf) {
        format!("{remote}{leaf}")
    } else {
        remote.to_string()
    }
}

/// Local directory a download is materialized into: the requested local
/// directory joined with the base name of the remote prefix.
pub fn download_destination(local: &Path, prefix: &str) -> PathBuf {
    match base_name(prefix).as_str() {
        "." | "/" | "" => local.to_path_buf(),
        base => local.join(base),
    }
}

/// Local paths must be explicit about where they are anchored.
pub fn validate_local_path(path: &str) -> Result<()> {
    if path.starts_with('/') || path.starts_with("./") || path.starts_with("../") {
        Ok(())
    } else {
        Err(TransferError::Configuration(format!(
            "local path '{path}' must start with '/', './' or '../'"
        )))
    }
}

pub fn validate_remote_path(path: &str) -> Result<()> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(TransferError::Configuration(format!(
            "remote path '{path}' must be absolute"
        )))
    }
}

/// Combine the outcome of the channel and of the local task into one result.
///
/// A remote failure is the root cause when the local side only saw the pipe
/// close under it. Any other local failure wins, since the remote side usually
/// fails as a consequence of it.
pub fn settle<T>(
    remote: std::result::Result<(), RemoteError>,
    local: kconsole_archive::Result<T>,
    wrap_local: fn(kconsole_archive::Error) -> TransferError,
) -> Result<T> {
    match (remote, local) {
        (Ok(()), Ok(value)) => Ok(value),
        (Err(remote), Ok(_)) => Err(TransferError::Remote(remote)),
        (Ok(()), Err(local)) => Err(wrap_local(local)),
        (Err(remote), Err(local)) if local.is_pipe_closed() => {
            debug!(error = %local, "local side saw the channel close");
            Err(TransferError::Remote(remote))
        }
        (Err(remote), Err(local)) => {
            debug!(error = %remote, "remote side failed after local error");
            Err(wrap_local(local))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn remote_commands() {
        assert_eq!(upload_command(), ["tar", "-xmf", "-", "-C", "/"]);
        assert_eq!(
            download_command("/var/log/nginx"),
            ["tar", "cf", "-", "/var/log/nginx"]
        );
        assert_eq!(download_command("//var/log/../log/nginx"), ["tar", "cf", "-", "/var/log/nginx"]);
        assert_eq!(download_command("/"), ["tar", "cf", "-", "/"]);
    }

    #[test]
    fn download_command_keeps_trailing_slash() {
        assert_eq!(
            download_command("/srv/current/"),
            ["tar", "cf", "-", "/srv/current/"]
        );
    }

    #[test]
    fn upload_destination_into_directory() {
        assert_eq!(upload_destination("./dist/app.js", "/srv/"), "/srv/app.js");
        assert_eq!(upload_destination("./dist/", "/srv/"), "/srv/dist");
        assert_eq!(upload_destination("./dist", "/srv/www"), "/srv/www");
        assert_eq!(upload_destination("./dist", "/"), "/");
    }

    #[test]
    fn glob_upload_into_directory_keeps_destination() {
        assert_eq!(upload_destination("./dist/*.js", "/srv/"), "/srv/");
        assert_eq!(upload_destination("./dist/app-?.js", "/srv/www/"), "/srv/www/");
        assert_eq!(upload_destination("./dist/*.js", "/srv/js"), "/srv/js");
    }

    #[test]
    fn download_destination_uses_prefix_base() {
        let local = Path::new("./logs");
        assert_eq!(
            download_destination(local, "var/log/nginx"),
            Path::new("./logs/nginx")
        );
        assert_eq!(download_destination(local, ""), local);
    }

    #[test]
    fn path_validation() {
        assert!(validate_local_path("/tmp/x").is_ok());
        assert!(validate_local_path("./x").is_ok());
        assert!(validate_local_path("../x").is_ok());
        assert!(matches!(
            validate_local_path("x"),
            Err(TransferError::Configuration(_))
        ));

        assert!(validate_remote_path("/etc").is_ok());
        assert!(matches!(
            validate_remote_path("etc"),
            Err(TransferError::Configuration(_))
        ));
    }

    fn broken_pipe() -> kconsole_archive::Error {
        kconsole_archive::Error::WriteFailed {
            entry: "big.bin".into(),
            source: io::Error::from(io::ErrorKind::BrokenPipe),
        }
    }

    #[test]
    fn remote_error_wins_over_broken_pipe() {
        let result: Result<()> = settle(
            Err(RemoteError::Exit { code: Some(2) }),
            Err(broken_pipe()),
            TransferError::Pack,
        );
        assert!(matches!(result, Err(TransferError::Remote(_))));
    }

    #[test]
    fn genuine_local_error_is_root_cause() {
        let local = kconsole_archive::Error::Corrupted {
            entry: "etc/shadow".into(),
            prefix: "var/log".into(),
        };
        let result: Result<()> = settle(
            Err(RemoteError::Io(io::Error::from(io::ErrorKind::BrokenPipe))),
            Err(local),
            TransferError::Unpack,
        );
        assert!(matches!(
            result,
            Err(TransferError::Unpack(kconsole_archive::Error::Corrupted { .. }))
        ));
    }

    #[test]
    fn single_sided_failures() {
        let result = settle(Err(RemoteError::Other("gone".into())), Ok(1), TransferError::Pack);
        assert!(matches!(result, Err(TransferError::Remote(_))));

        let result: Result<()> = settle(Ok(()), Err(broken_pipe()), TransferError::Pack);
        assert!(matches!(result, Err(TransferError::Pack(_))));

        assert_eq!(settle(Ok(()), Ok(7), TransferError::Pack).unwrap(), 7);
    }
}
