use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::error::{DipError, DipResult};

pub const CA_KEY_FILE: &str = "ca.key";
pub const CA_CERT_FILE: &str = "ca.crt";

/// File stem for a leaf: `*.example.lan` → `_wildcard.example.lan`.
pub fn leaf_file_stem(domain_pattern: &str) -> String {
    domain_pattern.replace('*', "_wildcard")
}

/// True when a leaf for `domain_pattern` would land on the CA files or alias
/// another pattern's files.
pub fn is_reserved_leaf(domain_pattern: &str) -> bool {
    let stem = leaf_file_stem(domain_pattern);
    let ca_stem = CA_CERT_FILE.trim_end_matches(".crt");
    stem.eq_ignore_ascii_case(ca_stem) || domain_pattern.contains("_wildcard")
}

pub fn leaf_paths(dir: &Path, domain_pattern: &str) -> (PathBuf, PathBuf) {
    let stem = leaf_file_stem(domain_pattern);
    (
        dir.join(format!("{stem}.crt")),
        dir.join(format!("{stem}.key")),
    )
}

/// Create `dir` (and parents) restricted to the owner.
pub fn ensure_dir(dir: &Path) -> DipResult<()> {
    std::fs::create_dir_all(dir).map_err(|err| DipError::storage(dir, err))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))
            .map_err(|err| DipError::storage(dir, err))?;
    }
    Ok(())
}

/// Write (or overwrite) `path` with owner read/write only.
pub fn write_secret(path: &Path, contents: &[u8]) -> DipResult<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .map_err(|err| DipError::storage(path, err))?;

    // mode() only applies on creation; tighten files that already existed.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .map_err(|err| DipError::storage(path, err))?;
    }

    file.write_all(contents)
        .and_then(|_| file.sync_all())
        .map_err(|err| DipError::storage(path, err))
}

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Sibling of `dest` unique to this process and call.
fn temp_path(dest: &Path) -> PathBuf {
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let name = dest
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{name}.{}-{seq}.tmp", std::process::id()))
}

fn discard_temp(tmp: &Path) {
    if let Err(err) = std::fs::remove_file(tmp) {
        tracing::debug!(path = %tmp.display(), error = %err, "could not remove temporary file");
    }
}

/// Publish `contents` at `dest` only if nothing exists there yet.
///
/// The file appears fully written or not at all. Returns `false` when another
/// writer published first; `dest` is then left untouched.
pub fn publish_new(dest: &Path, contents: &[u8]) -> DipResult<bool> {
    let tmp = temp_path(dest);
    write_secret(&tmp, contents)?;
    let published = match std::fs::hard_link(&tmp, dest) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(DipError::storage(dest, err)),
    };
    discard_temp(&tmp);
    published
}

/// Replace `dest` with `contents` in one rename.
pub fn publish_replace(dest: &Path, contents: &[u8]) -> DipResult<()> {
    let tmp = temp_path(dest);
    write_secret(&tmp, contents)?;
    std::fs::rename(&tmp, dest).map_err(|err| {
        discard_temp(&tmp);
        DipError::storage(dest, err)
    })
}

/// Delete `path`; a file that is already gone is fine.
pub fn remove_stale(path: &Path) -> DipResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(DipError::storage(path, err)),
    }
}

/// Poll until `path` is a file or `timeout` elapses.
pub fn wait_for_file(path: &Path, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if path.is_file() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(25));
    }
}

pub fn read_pem(path: &Path) -> DipResult<String> {
    std::fs::read_to_string(path).map_err(|err| DipError::storage(path, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_becomes_file_safe() {
        assert_eq!(leaf_file_stem("*.example.lan"), "_wildcard.example.lan");
        assert_eq!(leaf_file_stem("app.example.lan"), "app.example.lan");
        let (crt, key) = leaf_paths(Path::new("/certs"), "*.dev.lan");
        assert_eq!(crt, Path::new("/certs/_wildcard.dev.lan.crt"));
        assert_eq!(key, Path::new("/certs/_wildcard.dev.lan.key"));
    }

    #[test]
    fn ca_names_are_reserved() {
        for pattern in ["ca", "CA", "Ca"] {
            assert!(is_reserved_leaf(pattern), "{pattern}");
        }
        assert!(is_reserved_leaf("_wildcard.example.lan"));
        assert!(is_reserved_leaf("app._wildcard.lan"));
        for pattern in ["ca.example.lan", "*.ca", "app.example.lan", "*.example.lan"] {
            assert!(!is_reserved_leaf(pattern), "{pattern}");
        }
    }

    #[test]
    fn publish_new_keeps_the_first_writer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ca.key");

        assert!(publish_new(&path, b"first").unwrap());
        assert!(!publish_new(&path, b"second").unwrap());

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("ca.key")]);
    }

    #[test]
    fn publish_replace_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ca.crt");
        publish_replace(&path, b"old").unwrap();
        publish_replace(&path, b"new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn remove_stale_ignores_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        remove_stale(&dir.path().join("gone")).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn secrets_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.key");
        std::fs::write(&path, "old").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        write_secret(&path, b"new").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn write_into_missing_dir_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing/ca.key");
        assert!(matches!(
            write_secret(&path, b"x"),
            Err(DipError::Storage { .. })
        ));
    }
}
