use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::info;

use super::Fetcher;
use crate::error::FetchError;

/// Download `url` to `dest`, creating the parent directory if needed.
/// The file only appears at `dest` once fully written.
pub fn download(
    fetcher: &dyn Fetcher,
    url: &str,
    dest: impl AsRef<Path>,
) -> Result<PathBuf, FetchError> {
    let dest = dest.as_ref();
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let io_err = |source| FetchError::Io {
        path: dest.to_path_buf(),
        source,
    };

    fs::create_dir_all(&dir).map_err(io_err)?;

    let bytes = fetcher.get_bytes(url)?;
    let mut tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;
    tmp.write_all(&bytes).map_err(io_err)?;
    tmp.persist(dest).map_err(|e| io_err(e.error))?;

    info!(url, bytes = bytes.len(), dest = %dest.display(), "downloaded");
    Ok(dest.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;
    use tempfile::tempdir;

    #[test]
    fn test_download_creates_directory() {
        let tmp = tempdir().unwrap();
        let dest = tmp.path().join("data").join("db.sqlite");
        let f = StaticFetcher::new().with("http://x.test/db.sqlite", vec![1u8, 2, 3]);

        let path = download(&f, "http://x.test/db.sqlite", &dest).unwrap();
        assert_eq!(path, dest);
        assert_eq!(fs::read(&dest).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_failed_download_leaves_nothing() {
        let tmp = tempdir().unwrap();
        let dest = tmp.path().join("db.sqlite");
        let f = StaticFetcher::new();

        assert!(download(&f, "http://x.test/missing", &dest).is_err());
        assert!(!dest.exists());
    }
}
