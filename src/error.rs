//! Модуль обработки ошибок библиотеки tts-reel
//!
//! Этот модуль содержит типы ошибок, которые могут возникнуть при рендеринге видео.

use std::path::PathBuf;
use thiserror::Error;

/// Ошибки библиотеки tts-reel
#[derive(Debug, Error)]
pub enum TtsReelError {
    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Ошибка кодирования/декодирования изображения
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Ошибка конфигурации (до начала любого ввода-вывода)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Не осталось ни одного пригодного изображения
    #[error("No usable image assets: {0}")]
    NoAssets(String),

    /// Не удалось декодировать отдельное изображение
    #[error("Failed to decode asset {path}: {reason}")]
    AssetDecode {
        path: PathBuf,
        reason: String,
    },

    /// Ошибка обработки аудио
    #[error("Audio processing error: {0}")]
    AudioProcessing(String),

    /// Ошибка внешнего кодировщика
    #[error("Encode error: {0}")]
    Encode(String),

    /// Ошибка синтеза речи
    #[error("Speech synthesis error: {0}")]
    SpeechSynthesis(String),

    /// Файл не найден
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Другая ошибка
    #[error("Other error: {0}")]
    Other(String),
}

impl TtsReelError {
    /// Ошибка относится к отдельному ассету и не прерывает пакетную обработку
    pub fn is_per_asset(&self) -> bool {
        matches!(self, Self::AssetDecode { .. })
    }
}

impl From<&str> for TtsReelError {
    fn from(s: &str) -> Self {
        TtsReelError::Other(s.to_string())
    }
}

impl From<String> for TtsReelError {
    fn from(s: String) -> Self {
        TtsReelError::Other(s)
    }
}

/// Тип Result для библиотеки tts-reel
pub type Result<T> = std::result::Result<T, TtsReelError>;
