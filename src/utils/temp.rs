//! Модуль для работы с временными файлами
//!
//! Каждый рендер получает собственную рабочую папку с подпапками для аудио,
//! изображений, субтитров и промежуточных файлов.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::Result;

/// Рабочая папка одного рендера
pub struct Workspace {
    /// Временная директория (удаляется при уничтожении, если не сохранена)
    root: Option<TempDir>,
    /// Путь к корню, сохраняется и после `keep`
    root_path: PathBuf,
    /// Нужно ли удалять файлы при завершении
    cleanup: bool,
}

impl Workspace {
    /// Создать новую рабочую папку внутри `parent` (или системной временной папки)
    pub fn new(parent: Option<&Path>, render_id: &str, cleanup: bool) -> Result<Self> {
        let prefix = format!("tts-reel-{}-", render_id);
        let temp_dir = match parent {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                tempfile::Builder::new().prefix(&prefix).tempdir_in(parent)?
            }
            None => tempfile::Builder::new().prefix(&prefix).tempdir()?,
        };
        let root_path = temp_dir.path().to_path_buf();

        let workspace = Self {
            root: Some(temp_dir),
            root_path,
            cleanup,
        };
        for dir in [
            workspace.audio_dir(),
            workspace.images_dir(),
            workspace.subtitles_dir(),
            workspace.scratch_dir(),
        ] {
            fs::create_dir_all(dir)?;
        }

        Ok(workspace)
    }

    /// Корень рабочей папки
    pub fn root(&self) -> &Path {
        &self.root_path
    }

    /// Папка для синтезированной речи
    pub fn audio_dir(&self) -> PathBuf {
        self.root_path.join("audio")
    }

    /// Папка для исходных изображений
    pub fn images_dir(&self) -> PathBuf {
        self.root_path.join("images")
    }

    /// Папка для субтитров
    pub fn subtitles_dir(&self) -> PathBuf {
        self.root_path.join("subtitles")
    }

    /// Папка для нормализованных изображений и прочих промежуточных файлов
    pub fn scratch_dir(&self) -> PathBuf {
        self.root_path.join("scratch")
    }

    /// Очистить рабочую папку (если очистка не отключена)
    pub fn cleanup(&mut self) -> Result<()> {
        if let Some(root) = self.root.take() {
            if self.cleanup {
                root.close()?;
            } else {
                log::info!("Keeping workspace {}", root.into_path().display());
            }
        }
        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        // Пытаемся очистить файлы при уничтожении объекта
        let _ = self.cleanup();
    }
}
