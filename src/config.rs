//! Модуль конфигурации библиотеки tts-reel
//!
//! Этот модуль содержит структуры и перечисления для настройки рендеринга.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TtsReelError};

/// Эффект, применяемый к каждому клипу перед склейкой
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Effect {
    /// Без эффекта
    None,
    /// Плавное приближение
    ZoomIn,
    /// Плавное отдаление
    ZoomOut,
    /// Въезд справа налево
    SlideLeft,
    /// Въезд слева направо
    SlideRight,
}

impl Default for Effect {
    fn default() -> Self {
        Self::ZoomIn
    }
}

impl Effect {
    /// Все поддерживаемые эффекты
    pub const ALL: [Effect; 5] = [
        Effect::None,
        Effect::ZoomIn,
        Effect::ZoomOut,
        Effect::SlideLeft,
        Effect::SlideRight,
    ];

    /// Получить строковое представление эффекта
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ZoomIn => "zoom_in",
            Self::ZoomOut => "zoom_out",
            Self::SlideLeft => "slide_left",
            Self::SlideRight => "slide_right",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Effect {
    type Err = TtsReelError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Effect::ALL
            .iter()
            .copied()
            .find(|effect| effect.as_str() == normalized)
            .ok_or_else(|| {
                let known: Vec<&str> = Effect::ALL.iter().map(Effect::as_str).collect();
                TtsReelError::Configuration(format!(
                    "Unknown effect '{}', expected one of: {}",
                    s,
                    known.join(", ")
                ))
            })
    }
}

/// Пол голоса для синтеза речи
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    Male,
    Female,
}

impl Default for VoiceGender {
    fn default() -> Self {
        Self::Male
    }
}

/// Оформление текстового оверлея
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverlayStyle {
    /// Размер шрифта в пикселях
    pub font_size: u32,
    /// Цвет текста (имя цвета или #RRGGBB)
    pub font_color: String,
    /// Цвет обводки
    pub stroke_color: String,
    /// Толщина обводки в пикселях
    pub stroke_width: u32,
}

impl OverlayStyle {
    /// Стиль субтитров по умолчанию
    pub fn caption() -> Self {
        Self {
            font_size: 64,
            font_color: "white".to_string(),
            stroke_color: "black".to_string(),
            stroke_width: 3,
        }
    }

    /// Стиль водяного знака по умолчанию
    pub fn watermark() -> Self {
        Self {
            font_size: 36,
            font_color: "white@0.7".to_string(),
            stroke_color: "black@0.5".to_string(),
            stroke_width: 1,
        }
    }
}

/// Настройки водяного знака
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatermarkConfig {
    /// Текст водяного знака, одинаковый для всех роликов
    pub text: String,
    /// Оформление
    pub style: OverlayStyle,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            text: "@tts-reel".to_string(),
            style: OverlayStyle::watermark(),
        }
    }
}

/// Параметры итогового файла
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSpec {
    /// Ширина кадра
    pub width: u32,
    /// Высота кадра
    pub height: u32,
    /// Частота кадров
    pub fps: u32,
    /// Битрейт видео (например, "8000k")
    pub bitrate: String,
    /// Видеокодек
    pub video_codec: String,
    /// Аудиокодек
    pub audio_codec: String,
    /// Путь к итоговому файлу
    pub output_path: PathBuf,
}

impl RenderSpec {
    /// Проверить параметры рендеринга
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(TtsReelError::Configuration(format!(
                "Resolution must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.fps == 0 {
            return Err(TtsReelError::Configuration("FPS must be positive".to_string()));
        }
        for (value, name) in [
            (&self.bitrate, "bitrate"),
            (&self.video_codec, "video codec"),
            (&self.audio_codec, "audio codec"),
        ] {
            if value.trim().is_empty() {
                return Err(TtsReelError::Configuration(format!("Empty {}", name)));
            }
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(TtsReelError::Configuration("Empty output path".to_string()));
        }
        Ok(())
    }

    /// Размер кадра
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Конфигурация библиотеки
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsReelConfig {
    /// Разрешение видео (ширина, высота)
    pub video_resolution: (u32, u32),
    /// Частота кадров
    pub fps: u32,
    /// Битрейт видео
    pub bitrate: String,
    /// Видеокодек
    pub video_codec: String,
    /// Аудиокодек
    pub audio_codec: String,
    /// Эффект для клипов (none, zoom_in, zoom_out, slide_left, slide_right)
    pub transition_effect: String,
    /// Оформление субтитров
    pub caption_style: OverlayStyle,
    /// Вертикальная позиция полосы субтитров (доля высоты кадра)
    pub caption_band: f32,
    /// Водяной знак
    pub watermark: WatermarkConfig,
    /// Поддерживаемые расширения изображений
    pub image_extensions: Vec<String>,
    /// Папка для готовых роликов
    pub output_folder: PathBuf,
    /// Корень рабочих папок (по умолчанию системная временная папка)
    pub temp_folder: Option<PathBuf>,
    /// Сохранять временные файлы после завершения
    pub keep_temp_files: bool,
    /// Путь к ffmpeg
    pub ffmpeg_path: String,
    /// Пол голоса
    pub voice_gender: VoiceGender,
    /// Язык озвучки
    pub language: String,
}

impl Default for TtsReelConfig {
    fn default() -> Self {
        Self {
            video_resolution: (1080, 1920),
            fps: 30,
            bitrate: "8000k".to_string(),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            transition_effect: Effect::default().as_str().to_string(),
            caption_style: OverlayStyle::caption(),
            caption_band: 0.8,
            watermark: WatermarkConfig::default(),
            image_extensions: ["jpg", "jpeg", "png", "gif", "bmp", "webp"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            output_folder: PathBuf::from("output"),
            temp_folder: None,
            keep_temp_files: false,
            ffmpeg_path: "ffmpeg".to_string(),
            voice_gender: VoiceGender::default(),
            language: "en".to_string(),
        }
    }
}

impl TtsReelConfig {
    /// Загрузить конфигурацию из JSON файла.
    ///
    /// Если файла нет, записывает в него настройки по умолчанию и возвращает их.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config: Self = serde_json::from_str(&content)?;
                log::info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Config file {} not found, using default settings", path.display());
                let config = Self::default();
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, serde_json::to_string_pretty(&config)?)?;
                Ok(config)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Разобрать имя эффекта
    pub fn effect(&self) -> Result<Effect> {
        self.transition_effect.parse()
    }

    /// Собрать параметры рендеринга для указанного выходного файла
    pub fn render_spec(&self, output_path: impl Into<PathBuf>) -> Result<RenderSpec> {
        let (width, height) = self.video_resolution;
        let spec = RenderSpec {
            width,
            height,
            fps: self.fps,
            bitrate: self.bitrate.clone(),
            video_codec: self.video_codec.clone(),
            audio_codec: self.audio_codec.clone(),
            output_path: output_path.into(),
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Проверить конфигурацию целиком, до любого ввода-вывода
    pub fn validate(&self) -> Result<Effect> {
        let effect = self.effect()?;
        let (width, height) = self.video_resolution;
        if width == 0 || height == 0 {
            return Err(TtsReelError::Configuration(format!(
                "Resolution must be positive, got {}x{}",
                width, height
            )));
        }
        if self.fps == 0 {
            return Err(TtsReelError::Configuration("FPS must be positive".to_string()));
        }
        if self.watermark.text.trim().is_empty() {
            return Err(TtsReelError::Configuration("Watermark text is empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.caption_band) {
            return Err(TtsReelError::Configuration(format!(
                "Caption band must be within 0.0..=1.0, got {}",
                self.caption_band
            )));
        }
        if self.image_extensions.is_empty() {
            return Err(TtsReelError::Configuration("No image extensions configured".to_string()));
        }
        Ok(effect)
    }
}
