use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;

use anyhow::{Context, Result};

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

const FILE_SCHEME: &str = "file://";

/// Filesystem access used by the UI. Implementations must be shareable with
/// worker threads.
pub trait ImageGateway: Send + Sync {
    /// Image files directly inside `directory`. Never fails: access errors
    /// are logged and produce an empty listing.
    fn list_images(&self, directory: &Path) -> Vec<PathBuf>;

    fn read_image_bytes(&self, path: &Path) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FsGateway;

impl ImageGateway for FsGateway {
    fn list_images(&self, directory: &Path) -> Vec<PathBuf> {
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(err) => {
                log::error!("Error loading images from {}: {err}", directory.display());
                return Vec::new();
            }
        };

        let mut paths = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_image_path(path))
            .collect::<Vec<_>>();
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        log::debug!("Listed {} image(s) in {}", paths.len(), directory.display());
        paths
    }

    fn read_image_bytes(&self, path: &Path) -> Result<Vec<u8>> {
        let path = strip_file_scheme(path);
        log::debug!("Reading image {}", path.display());
        fs::read(&path).with_context(|| format!("Error reading image file {}", path.display()))
    }
}

pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

pub fn strip_file_scheme(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    match text.strip_prefix(FILE_SCHEME) {
        Some(rest) => PathBuf::from(rest),
        None => path.to_path_buf(),
    }
}

pub struct DirectoryListing {
    pub directory: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Lists `directory` on a worker thread. Dropping the receiver abandons the
/// request; the worker's send then fails silently.
pub fn spawn_listing<G>(gateway: G, directory: PathBuf) -> Receiver<DirectoryListing>
where
    G: ImageGateway + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let files = gateway.list_images(&directory);
        let _ = tx.send(DirectoryListing { directory, files });
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_images_filters_extensions_and_sorts() {
        let dir = tempfile::tempdir().expect("temp dir");
        for name in ["b_B3.png", "a_A2.JPG", "notes.txt", "c_C4.jpeg", "d.gif"] {
            fs::write(dir.path().join(name), b"x").expect("write fixture");
        }
        fs::create_dir(dir.path().join("sub.png")).expect("create subdir");

        let listed = FsGateway.list_images(dir.path());
        let names = listed
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a_A2.JPG", "b_B3.png", "c_C4.jpeg"]);
    }

    #[test]
    fn list_images_missing_directory_is_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("does-not-exist");
        assert!(FsGateway.list_images(&missing).is_empty());
    }

    #[test]
    fn read_image_bytes_strips_file_scheme() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("plate_A1.png");
        fs::write(&path, b"\x89PNG").expect("write fixture");

        let with_scheme = PathBuf::from(format!("file://{}", path.display()));
        let bytes = FsGateway
            .read_image_bytes(&with_scheme)
            .expect("read should succeed");
        assert_eq!(bytes, b"\x89PNG");
    }

    #[test]
    fn read_image_bytes_missing_file_errors() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = FsGateway
            .read_image_bytes(&dir.path().join("gone.png"))
            .expect_err("missing file should fail");
        assert!(format!("{err:#}").contains("gone.png"));
    }

    #[test]
    fn spawn_listing_reports_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(dir.path().join("x_A1.png"), b"x").expect("write fixture");

        let rx = spawn_listing(FsGateway, dir.path().to_path_buf());
        let listing = rx.recv().expect("listing should arrive");
        assert_eq!(listing.directory, dir.path());
        assert_eq!(listing.files.len(), 1);
    }
}
