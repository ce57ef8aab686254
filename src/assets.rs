//! Источники изображений для ролика
//!
//! Источник получает поисковые запросы и складывает найденные изображения
//! в папку рендера. Конвейеру достаточно одного пригодного изображения.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;
use crate::media::normalizer::{discover_images, ImageAsset};

/// Источник изображений
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Положить изображения для запросов в `image_dir`, вернуть их количество
    async fn fetch(&self, search_terms: &[String], image_dir: &Path) -> Result<usize>;
}

/// Источник, подбирающий изображения из локальной библиотеки
///
/// Для каждого запроса берётся первое ещё не использованное изображение, в
/// имени которого встречается слово запроса, иначе следующее по порядку.
/// Когда библиотека исчерпана, изображения идут по второму кругу.
#[derive(Debug, Clone)]
pub struct LocalAssetSource {
    library: PathBuf,
    extensions: Vec<String>,
}

impl LocalAssetSource {
    pub fn new(library: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            library: library.into(),
            extensions,
        }
    }

    fn pick<'a>(library: &'a [ImageAsset], used: &mut HashSet<usize>, term: &str, cursor: &mut usize) -> &'a ImageAsset {
        let words: Vec<String> = term
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|w| w.chars().count() > 3)
            .collect();

        let matched = library.iter().enumerate().find_map(|(index, asset)| {
            let stem = asset
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            let hit = !used.contains(&index) && words.iter().any(|w| stem.contains(w.as_str()));
            hit.then_some(index)
        });

        let index = match matched {
            Some(index) => index,
            None => {
                if used.len() >= library.len() {
                    used.clear();
                }
                while used.contains(&(*cursor % library.len())) {
                    *cursor += 1;
                }
                let index = *cursor % library.len();
                *cursor += 1;
                index
            }
        };
        used.insert(index);
        &library[index]
    }
}

#[async_trait]
impl AssetSource for LocalAssetSource {
    async fn fetch(&self, search_terms: &[String], image_dir: &Path) -> Result<usize> {
        let library = match discover_images(&self.library, &self.extensions) {
            Ok(library) => library,
            Err(e) => {
                log::warn!("Image library {} is unusable: {}", self.library.display(), e);
                return Ok(0);
            }
        };
        if library.is_empty() {
            log::warn!("Image library {} has no images", self.library.display());
            return Ok(0);
        }
        tokio::fs::create_dir_all(image_dir).await?;

        let mut used = HashSet::new();
        let mut cursor = 0;
        let mut copied = 0;
        for (i, term) in search_terms.iter().enumerate() {
            let asset = Self::pick(&library, &mut used, term, &mut cursor);
            let name = asset
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| format!("image_{}", asset.ordinal));
            // Префикс с номером запроса сохраняет порядок сценария
            let target = image_dir.join(format!("{:03}_{}", i, name));
            tokio::fs::copy(&asset.path, &target).await?;
            log::debug!("'{}' -> {}", term, target.display());
            copied += 1;
        }

        log::info!("Collected {} images for {} search terms", copied, search_terms.len());
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::normalizer::tests::{exts, write_image};

    fn library(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            write_image(&dir.path().join(name), 8, 8);
        }
        dir
    }

    fn terms(items: &[&str]) -> Vec<String> {
        items.iter().map(|t| t.to_string()).collect()
    }

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_matches_terms_by_file_name() {
        let lib = library(&["beach.png", "forest.png", "mountain.png"]);
        let out = tempfile::tempdir().unwrap();
        let source = LocalAssetSource::new(lib.path(), exts());

        let count = source
            .fetch(&terms(&["the tall mountain peak", "walk in the forest"]), out.path())
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(listing(out.path()), vec!["000_mountain.png", "001_forest.png"]);
    }

    #[tokio::test]
    async fn test_falls_back_and_wraps_around() {
        let lib = library(&["a.png", "b.png"]);
        let out = tempfile::tempdir().unwrap();
        let source = LocalAssetSource::new(lib.path(), exts());

        let count = source
            .fetch(&terms(&["one", "two", "three"]), out.path())
            .await
            .unwrap();

        assert_eq!(count, 3);
        assert_eq!(listing(out.path()), vec!["000_a.png", "001_b.png", "002_a.png"]);
    }

    #[test]
    fn test_missing_library_yields_nothing() {
        let out = tempfile::tempdir().unwrap();
        let source = LocalAssetSource::new("/nonexistent/library", exts());
        let count = tokio_test::block_on(source.fetch(&terms(&["anything"]), out.path())).unwrap();
        assert_eq!(count, 0);
        assert_eq!(listing(out.path()).len(), 0);
    }
}
