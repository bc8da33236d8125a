use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{bail, Context, Result};
use eframe::egui::ColorImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use crate::gateway::ImageGateway;

pub const PREVIEW_MAX_DIM: u32 = 1024;
pub const PREVIEW_MAX_BYTES: usize = 1024 * 1024;
const JPEG_QUALITY_START: u8 = 85;
const JPEG_QUALITY_FLOOR: u8 = 40;
const JPEG_QUALITY_STEP: u8 = 15;

pub type SharedPreviewCache = Arc<Mutex<PreviewCache>>;

pub fn cache_key(path: &Path) -> String {
    format!("compressed_{}", path.display())
}

/// Encoded preview bytes keyed by `cache_key`. Entries live in memory for the
/// session and, when a directory is configured, on disk across sessions.
#[derive(Debug, Default)]
pub struct PreviewCache {
    memory: HashMap<String, Arc<[u8]>>,
    disk_dir: Option<PathBuf>,
}

impl PreviewCache {
    pub fn new(disk_dir: Option<PathBuf>) -> Self {
        Self {
            memory: HashMap::new(),
            disk_dir,
        }
    }

    pub fn shared(self) -> SharedPreviewCache {
        Arc::new(Mutex::new(self))
    }

    pub fn get(&mut self, key: &str) -> Option<Arc<[u8]>> {
        if let Some(bytes) = self.memory.get(key) {
            return Some(Arc::clone(bytes));
        }
        let disk_path = self.disk_path(key)?;
        let bytes: Arc<[u8]> = fs::read(&disk_path).ok()?.into();
        log::debug!("Preview cache disk hit for {key}");
        self.memory.insert(key.to_string(), Arc::clone(&bytes));
        Some(bytes)
    }

    pub fn insert(&mut self, key: String, bytes: Arc<[u8]>) {
        if let Some(disk_path) = self.disk_path(&key) {
            if let Err(err) = write_cache_file(&disk_path, &bytes) {
                log::warn!("Could not persist preview for {key}: {err:#}");
            }
        }
        self.memory.insert(key, bytes);
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    fn disk_path(&self, key: &str) -> Option<PathBuf> {
        let dir = self.disk_dir.as_ref()?;
        let digest = blake3::hash(key.as_bytes());
        Some(dir.join(format!("{}.bin", hex::encode(digest.as_bytes()))))
    }
}

fn write_cache_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Could not create cache directory {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("Could not write {}", path.display()))
}

/// Downscales to at most `PREVIEW_MAX_DIM` on the longest edge and re-encodes
/// as JPEG, lowering quality until the result fits `PREVIEW_MAX_BYTES` or the
/// quality floor is reached.
pub fn compress_image(original: &[u8]) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(original).context("Could not decode image")?;
    let resized = if decoded.width().max(decoded.height()) > PREVIEW_MAX_DIM {
        decoded.resize(PREVIEW_MAX_DIM, PREVIEW_MAX_DIM, FilterType::Triangle)
    } else {
        decoded
    };
    let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());

    let mut quality = JPEG_QUALITY_START;
    loop {
        let mut encoded = Vec::new();
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut encoded, quality))
            .context("Could not encode JPEG preview")?;
        if encoded.len() <= PREVIEW_MAX_BYTES || quality <= JPEG_QUALITY_FLOOR {
            return Ok(encoded);
        }
        quality = quality
            .saturating_sub(JPEG_QUALITY_STEP)
            .max(JPEG_QUALITY_FLOOR);
    }
}

pub fn decode_color_image(bytes: &[u8]) -> Result<ColorImage> {
    let rgba = image::load_from_memory(bytes)
        .context("Could not decode preview")?
        .to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}

/// Produces a display-ready preview of `path`.
///
/// Read failures are returned to the caller. Compression failures fall back
/// to the original bytes.
pub fn load_preview<G>(gateway: &G, cache: &SharedPreviewCache, path: &Path) -> Result<ColorImage>
where
    G: ImageGateway + ?Sized,
{
    let key = cache_key(path);
    let cached = match cache.lock() {
        Ok(mut guard) => guard.get(&key),
        Err(err) => bail!("Preview cache lock poisoned: {err}"),
    };
    if let Some(bytes) = cached {
        match decode_color_image(&bytes) {
            Ok(image) => return Ok(image),
            Err(err) => log::warn!("Discarding unreadable cached preview for {key}: {err:#}"),
        }
    }

    let original = gateway.read_image_bytes(path)?;
    let bytes = match compress_image(&original) {
        Ok(compressed) => {
            log::debug!(
                "Compressed {} from {} to {} bytes",
                path.display(),
                original.len(),
                compressed.len()
            );
            compressed
        }
        Err(err) => {
            log::warn!("Error compressing {}: {err:#}", path.display());
            original
        }
    };
    let image = decode_color_image(&bytes)
        .with_context(|| format!("Could not display {}", path.display()))?;

    match cache.lock() {
        Ok(mut guard) => guard.insert(key, bytes.into()),
        Err(err) => bail!("Preview cache lock poisoned: {err}"),
    }
    Ok(image)
}

pub struct PreviewUpdate {
    pub path: PathBuf,
    pub result: Result<ColorImage, String>,
}

/// Loads previews for `paths` one after another on a worker thread. The
/// worker stops once the receiver is dropped.
pub fn spawn_preview_batch<G>(
    gateway: G,
    cache: SharedPreviewCache,
    paths: Vec<PathBuf>,
) -> Receiver<PreviewUpdate>
where
    G: ImageGateway + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for path in paths {
            let result = load_preview(&gateway, &cache, &path).map_err(|err| format!("{err:#}"));
            if tx.send(PreviewUpdate { path, result }).is_err() {
                return;
            }
        }
    });
    rx
}
