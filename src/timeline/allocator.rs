//! Распределение времени показа между изображениями
//!
//! Каждое изображение получает равную долю длительности озвучки, независимо
//! от плотности субтитров.

use crate::config::Effect;
use crate::error::{Result, TtsReelError};
use crate::media::normalizer::ImageAsset;
use crate::subtitle::parser::CaptionSpan;

/// Клип видеоряда: одно изображение на заданное время
#[derive(Debug, Clone, PartialEq)]
pub struct VisualClip {
    /// Нормализованное изображение
    pub asset: ImageAsset,
    /// Время показа в секундах
    pub display_duration_seconds: f64,
    /// Эффект клипа
    pub effect: Effect,
}

/// Длительность показа одного изображения
pub fn allocate(audio_duration: f64, asset_count: usize) -> Result<f64> {
    if asset_count == 0 {
        return Err(TtsReelError::NoAssets(
            "cannot allocate display time for zero images".to_string(),
        ));
    }
    if !audio_duration.is_finite() || audio_duration <= 0.0 {
        return Err(TtsReelError::AudioProcessing(format!(
            "audio duration must be positive, got {}",
            audio_duration
        )));
    }
    Ok(audio_duration / asset_count as f64)
}

/// Построить клипы для нормализованных изображений
pub fn build_clips(assets: Vec<ImageAsset>, audio_duration: f64, effect: Effect) -> Result<Vec<VisualClip>> {
    let per_asset = allocate(audio_duration, assets.len())?;
    Ok(assets
        .into_iter()
        .map(|asset| VisualClip {
            asset,
            display_duration_seconds: per_asset,
            effect,
        })
        .collect())
}

/// Длительности показа субтитров
pub fn caption_durations(spans: &[CaptionSpan]) -> Vec<f64> {
    spans.iter().map(CaptionSpan::duration).collect()
}

/// Суммарная длительность видеоряда
pub fn visual_total(clips: &[VisualClip]) -> f64 {
    clips.iter().map(|clip| clip.display_duration_seconds).sum()
}
