//! Оверлеи поверх видеоряда: субтитры и водяной знак

use crate::config::{OverlayStyle, WatermarkConfig};
use crate::error::{Result, TtsReelError};
use crate::subtitle::parser::CaptionSpan;

/// Отступ водяного знака от края кадра в пикселях
const WATERMARK_MARGIN_PX: f32 = 24.0;

/// Вид оверлея
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    Caption,
    Watermark,
}

/// Точка текста, которая совмещается с позицией на экране
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Center,
    BottomRight,
}

/// Позиция оверлея в долях кадра
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayPosition {
    pub anchor: Anchor,
    /// Горизонтальная позиция (0.0 слева, 1.0 справа)
    pub x_fraction: f32,
    /// Вертикальная позиция (0.0 сверху, 1.0 снизу)
    pub y_fraction: f32,
}

/// Текстовый оверлей с абсолютным окном времени
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayElement {
    pub kind: OverlayKind,
    pub start_seconds: f64,
    pub duration_seconds: f64,
    pub text: String,
    pub position: OverlayPosition,
    pub style: OverlayStyle,
}

impl OverlayElement {
    pub fn end_seconds(&self) -> f64 {
        self.start_seconds + self.duration_seconds
    }
}

/// Оверлеи субтитров: по центру, на полосе `caption_band`
pub fn caption_overlays(spans: &[CaptionSpan], style: &OverlayStyle, caption_band: f32) -> Vec<OverlayElement> {
    spans
        .iter()
        .map(|span| OverlayElement {
            kind: OverlayKind::Caption,
            start_seconds: span.start_seconds,
            duration_seconds: span.duration(),
            text: span.text.clone(),
            position: OverlayPosition {
                anchor: Anchor::Center,
                x_fraction: 0.5,
                y_fraction: caption_band,
            },
            style: style.clone(),
        })
        .collect()
}

/// Водяной знак на всю длительность озвучки, в правом нижнем углу
pub fn watermark_overlay(config: &WatermarkConfig, frame: (u32, u32), audio_duration: f64) -> Result<OverlayElement> {
    if config.text.trim().is_empty() {
        return Err(TtsReelError::Configuration("Watermark text is empty".to_string()));
    }
    let (width, height) = frame;
    if width == 0 || height == 0 {
        return Err(TtsReelError::Configuration(format!(
            "Resolution must be positive, got {}x{}",
            width, height
        )));
    }

    let margin_x = (WATERMARK_MARGIN_PX / width as f32).min(0.5);
    let margin_y = (WATERMARK_MARGIN_PX / height as f32).min(0.5);

    Ok(OverlayElement {
        kind: OverlayKind::Watermark,
        start_seconds: 0.0,
        duration_seconds: audio_duration,
        text: config.text.clone(),
        position: OverlayPosition {
            anchor: Anchor::BottomRight,
            x_fraction: 1.0 - margin_x,
            y_fraction: 1.0 - margin_y,
        },
        style: config.style.clone(),
    })
}

/// Отбросить оверлеи, начинающиеся после конца ролика.
///
/// Оверлей, пересекающий конец, укорачивается до конца ролика; его
/// длительность остаётся положительной.
pub fn retain_within(overlays: Vec<OverlayElement>, audio_duration: f64) -> Vec<OverlayElement> {
    overlays
        .into_iter()
        .filter(|overlay| overlay.start_seconds < audio_duration && overlay.duration_seconds > 0.0)
        .map(|mut overlay| {
            if overlay.end_seconds() > audio_duration {
                overlay.duration_seconds = audio_duration - overlay.start_seconds;
            }
            overlay
        })
        .collect()
}

/// Собрать все оверлеи рендера: субтитры, затем водяной знак
pub fn compose_overlays(
    spans: &[CaptionSpan],
    caption_style: &OverlayStyle,
    caption_band: f32,
    watermark: &WatermarkConfig,
    frame: (u32, u32),
    audio_duration: f64,
) -> Result<Vec<OverlayElement>> {
    let mut overlays = caption_overlays(spans, caption_style, caption_band);
    overlays.push(watermark_overlay(watermark, frame, audio_duration)?);
    Ok(retain_within(overlays, audio_duration))
}
