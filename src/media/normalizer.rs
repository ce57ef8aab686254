//! Модуль для нормализации изображений
//!
//! Изображения сортируются по строке пути (единственный источник порядка
//! видеоряда), приводятся точно к размеру кадра и сохраняются в RGB.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::error::{Result, TtsReelError};

/// Изображение видеоряда
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    /// Исходный путь
    pub path: PathBuf,
    /// Позиция после сортировки путей
    pub ordinal: usize,
    /// Путь к нормализованной копии
    pub normalized_path: Option<PathBuf>,
}

impl ImageAsset {
    /// Путь, который нужно отдавать кодировщику
    pub fn render_path(&self) -> &Path {
        self.normalized_path.as_deref().unwrap_or(&self.path)
    }
}

/// Результат пакетной нормализации
#[derive(Debug)]
pub struct NormalizationOutcome {
    /// Успешно нормализованные изображения, в исходном порядке
    pub normalized: Vec<ImageAsset>,
    /// Пропущенные изображения и причины
    pub failures: Vec<TtsReelError>,
}

impl NormalizationOutcome {
    /// Собрать результат из поэлементных результатов
    pub fn from_results(results: Vec<Result<ImageAsset>>) -> Self {
        let mut normalized = Vec::new();
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(asset) => normalized.push(asset),
                Err(e) => failures.push(e),
            }
        }
        Self { normalized, failures }
    }

    /// Пустой набор становится фатальной ошибкой
    pub fn into_assets(self) -> Result<Vec<ImageAsset>> {
        if self.normalized.is_empty() {
            return Err(TtsReelError::NoAssets(format!(
                "all {} image(s) failed to normalize",
                self.failures.len()
            )));
        }
        Ok(self.normalized)
    }
}

/// Найти изображения в папке и упорядочить их по пути
pub fn discover_images<P: AsRef<Path>>(image_dir: P, extensions: &[String]) -> Result<Vec<ImageAsset>> {
    let image_dir = image_dir.as_ref();
    if !image_dir.is_dir() {
        return Err(TtsReelError::NoAssets(format!(
            "image directory {} does not exist",
            image_dir.display()
        )));
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(image_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_supported_extension(path, extensions))
        .collect();

    paths.sort_by(|a, b| a.to_string_lossy().cmp(&b.to_string_lossy()));

    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(ordinal, path)| ImageAsset {
            path,
            ordinal,
            normalized_path: None,
        })
        .collect())
}

fn has_supported_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|known| known.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Нормализовать изображения: точный размер кадра, Lanczos3, RGB8.
///
/// Изображения обрабатываются параллельно, порядок результата совпадает
/// с порядком входа. Ошибки отдельных файлов не прерывают пакет.
pub fn normalize_assets(
    assets: Vec<ImageAsset>,
    target: (u32, u32),
    scratch_dir: &Path,
) -> NormalizationOutcome {
    let results: Vec<Result<ImageAsset>> = assets
        .into_par_iter()
        .map(|asset| normalize_one(asset, target, scratch_dir))
        .collect();

    let outcome = NormalizationOutcome::from_results(results);
    for failure in &outcome.failures {
        log::warn!("Skipping image: {}", failure);
    }
    outcome
}

fn normalize_one(mut asset: ImageAsset, (width, height): (u32, u32), scratch_dir: &Path) -> Result<ImageAsset> {
    let decode_error = |reason: String| TtsReelError::AssetDecode {
        path: asset.path.clone(),
        reason,
    };

    let img = image::open(&asset.path).map_err(|e| decode_error(e.to_string()))?;
    let resized = img.resize_exact(width, height, FilterType::Lanczos3).to_rgb8();

    let base_name = asset
        .path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| decode_error("path has no file name".to_string()))?;
    let normalized_path = scratch_dir.join(format!("resized_{}.png", base_name));

    resized
        .save(&normalized_path)
        .map_err(|e| decode_error(format!("failed to write {}: {}", normalized_path.display(), e)))?;

    log::debug!("Normalized {} -> {}", asset.path.display(), normalized_path.display());
    asset.normalized_path = Some(normalized_path);
    Ok(asset)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage, RgbaImage};

    pub(crate) fn exts() -> Vec<String> {
        ["jpg", "jpeg", "png", "gif", "bmp", "webp"].iter().map(|e| e.to_string()).collect()
    }

    /// Записать однотонное изображение
    pub(crate) fn write_image(path: &Path, width: u32, height: u32) {
        RgbImage::from_pixel(width, height, Rgb([200, 40, 40])).save(path).unwrap();
    }

    #[test]
    fn test_discover_sorts_by_path_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.JPG", "c.bmp", "notes.txt", "10.png", "2.png"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let assets = discover_images(dir.path(), &exts()).unwrap();
        let names: Vec<String> = assets
            .iter()
            .map(|a| a.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["10.png", "2.png", "a.JPG", "b.png", "c.bmp"]);
        assert!(assets.iter().enumerate().all(|(i, a)| a.ordinal == i));
    }

    #[test]
    fn test_discovery_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..20 {
            std::fs::write(dir.path().join(format!("img_{:02}.jpg", (i * 7) % 20)), b"x").unwrap();
        }
        let first = discover_images(dir.path(), &exts()).unwrap();
        for _ in 0..5 {
            assert_eq!(discover_images(dir.path(), &exts()).unwrap(), first);
        }
    }

    #[test]
    fn test_normalize_resizes_and_converts() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        write_image(&dir.path().join("a.png"), 40, 30);
        RgbaImage::from_pixel(16, 64, image::Rgba([1, 2, 3, 128]))
            .save(dir.path().join("b.png"))
            .unwrap();

        let assets = discover_images(dir.path(), &exts()).unwrap();
        let outcome = normalize_assets(assets, (27, 48), scratch.path());
        assert!(outcome.failures.is_empty());

        let normalized = outcome.into_assets().unwrap();
        assert_eq!(normalized.len(), 2);
        for asset in &normalized {
            let path = asset.normalized_path.as_ref().unwrap();
            assert!(path.starts_with(scratch.path()));
            let img = image::open(path).unwrap();
            assert_eq!((img.width(), img.height()), (27, 48));
            assert_eq!(img.color(), image::ColorType::Rgb8);
        }
        assert_eq!(normalized[0].ordinal, 0);
        assert!(normalized[0].render_path().ends_with("resized_a.png.png"));
    }

    #[test]
    fn test_corrupt_image_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        write_image(&dir.path().join("good.png"), 10, 10);
        std::fs::write(dir.path().join("broken.jpg"), b"not an image").unwrap();

        let assets = discover_images(dir.path(), &exts()).unwrap();
        let outcome = normalize_assets(assets, (8, 8), scratch.path());
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].is_per_asset());

        let normalized = outcome.into_assets().unwrap();
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].ordinal, 1);
    }

    #[test]
    fn test_all_corrupt_is_no_assets() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.png"), b"garbage").unwrap();

        let assets = discover_images(dir.path(), &exts()).unwrap();
        let result = normalize_assets(assets, (8, 8), scratch.path()).into_assets();
        assert!(matches!(result, Err(TtsReelError::NoAssets(_))));
    }

    #[test]
    fn test_empty_directory_is_no_assets() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let assets = discover_images(dir.path(), &exts()).unwrap();
        assert!(assets.is_empty());
        let result = normalize_assets(assets, (8, 8), scratch.path()).into_assets();
        assert!(matches!(result, Err(TtsReelError::NoAssets(_))));
    }
}
