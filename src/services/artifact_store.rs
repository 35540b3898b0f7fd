use crate::error::{Result, ShotError};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const ARTIFACT_PREFIX: &str = "screenshot_";
pub const ARTIFACT_EXTENSION: &str = "jpg";

/// Максимальное число кадров за прогон: имена рассчитаны на 5 цифр
pub const MAX_FRAME_COUNT: u32 = 99_999;

/// Имя файла кадра: `screenshot_00001.jpg`. Лексический порядок совпадает с порядком съёмки.
pub fn artifact_file_name(index: u32) -> String {
    format!("{}{:05}.{}", ARTIFACT_PREFIX, index, ARTIFACT_EXTENSION)
}

/// Один сохранённый кадр
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub index: u32,
    pub path: PathBuf,
}

/// Сохранённый кадр вместе с байтами, записанными на диск
#[derive(Debug, Clone)]
pub struct PersistedFrame {
    pub artifact: Artifact,
    pub encoded: Vec<u8>,
}

pub trait ArtifactStore {
    fn persist(&mut self, index: u32, image: &RgbaImage) -> Result<PersistedFrame>;
    fn remove(&mut self, artifact: &Artifact) -> Result<()>;
}

/// Кадры в виде JPEG в плоском каталоге
pub struct JpegArtifactStore {
    dir: PathBuf,
    quality: u8,
}

impl JpegArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, quality: u8) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| crate::shot_error!(save, "не удалось создать каталог {:?}: {}", dir, e))?;

        Ok(Self {
            dir,
            quality: quality.clamp(1, 100),
        })
    }

    /// Удалить кадры прошлых запусков (`screenshot_*.jpg`); другие файлы не трогаются
    pub fn clear_existing(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if is_artifact_path(&path) {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }

        if removed > 0 {
            info!("Удалено {} старых кадров из {:?}", removed, self.dir);
        }
        Ok(removed)
    }

    fn encode(&self, image: &RgbaImage) -> Result<Vec<u8>> {
        // JPEG без альфа-канала
        let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
        let mut encoded = Vec::new();
        JpegEncoder::new_with_quality(&mut encoded, self.quality)
            .encode_image(&rgb)
            .map_err(|e| crate::shot_error!(save, "кодирование JPEG не удалось: {}", e))?;
        Ok(encoded)
    }
}

impl ArtifactStore for JpegArtifactStore {
    fn persist(&mut self, index: u32, image: &RgbaImage) -> Result<PersistedFrame> {
        let encoded = self.encode(image)?;
        let path = self.dir.join(artifact_file_name(index));

        fs::write(&path, &encoded)
            .map_err(|e| crate::shot_error!(save, "не удалось записать {:?}: {}", path, e))?;
        debug!("Кадр {} записан: {:?} ({} байт)", index, path, encoded.len());

        Ok(PersistedFrame {
            artifact: Artifact { index, path },
            encoded,
        })
    }

    fn remove(&mut self, artifact: &Artifact) -> Result<()> {
        fs::remove_file(&artifact.path).map_err(|e| {
            warn!("Не удалось удалить {:?}: {}", artifact.path, e);
            ShotError::Io(e)
        })
    }
}

fn is_artifact_path(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.starts_with(ARTIFACT_PREFIX)
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(ARTIFACT_EXTENSION))
        && path.is_file()
}
