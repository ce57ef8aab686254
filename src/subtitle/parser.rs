//! Модуль для парсинга субтитров
//!
//! Этот модуль содержит функции для парсинга SRT файлов, которые возвращает
//! синтезатор речи. Разбор «лучшим усилием»: повреждённые блоки пропускаются.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TIMING_RE: Regex = Regex::new(
        r"^\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{1,3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{1,3})"
    )
    .expect("valid timing regex");
}

/// Один субтитр с временами в секундах
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionSpan {
    /// Время начала
    pub start_seconds: f64,
    /// Время окончания (всегда больше начала)
    pub end_seconds: f64,
    /// Текст в одну строку
    pub text: String,
}

impl CaptionSpan {
    /// Создать новый экземпляр CaptionSpan
    pub fn new(start_seconds: f64, end_seconds: f64, text: impl Into<String>) -> Self {
        Self {
            start_seconds,
            end_seconds,
            text: text.into(),
        }
    }

    /// Длительность показа
    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }
}

/// Парсинг SRT текста.
///
/// Блоки без строки времени, с нечитаемыми метками, с `end <= start` или без
/// текста пропускаются. Результат отсортирован по времени начала.
pub fn parse_srt(content: &str) -> Vec<CaptionSpan> {
    let content = content.trim_start_matches('\u{feff}');
    let mut spans = Vec::new();
    let mut current_block: Vec<&str> = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            if !current_block.is_empty() {
                if let Some(span) = parse_cue_block(&current_block) {
                    spans.push(span);
                }
                current_block.clear();
            }
        } else {
            current_block.push(line);
        }
    }

    // Обрабатываем последний блок, если он есть
    if !current_block.is_empty() {
        if let Some(span) = parse_cue_block(&current_block) {
            spans.push(span);
        }
    }

    spans.sort_by(|a, b| a.start_seconds.total_cmp(&b.start_seconds));
    spans
}

/// Загрузка субтитров из файла.
///
/// Отсутствующий или нечитаемый файл означает «без субтитров», а не ошибку.
pub fn load_captions(path: Option<&Path>) -> Vec<CaptionSpan> {
    let Some(path) = path else {
        return Vec::new();
    };

    match std::fs::read(path) {
        Ok(bytes) => {
            let content = String::from_utf8_lossy(&bytes);
            let spans = parse_srt(&content);
            log::debug!("Parsed {} caption spans from {}", spans.len(), path.display());
            spans
        }
        Err(e) => {
            log::warn!("Subtitle file {} is unavailable ({}), rendering without captions", path.display(), e);
            Vec::new()
        }
    }
}

/// Парсинг блока субтитра
fn parse_cue_block(lines: &[&str]) -> Option<CaptionSpan> {
    // Строка с временными метками; номер блока перед ней не проверяется
    let timing_index = lines.iter().position(|line| line.contains("-->"))?;
    let caps = TIMING_RE.captures(lines[timing_index])?;

    let timestamp = |offset: usize| -> Option<f64> {
        let hours: u64 = caps.get(offset)?.as_str().parse().ok()?;
        let minutes: u64 = caps.get(offset + 1)?.as_str().parse().ok()?;
        let seconds: u64 = caps.get(offset + 2)?.as_str().parse().ok()?;
        let ms_str = caps.get(offset + 3)?.as_str();
        let ms: u64 = ms_str.parse().ok()?;
        let ms = match ms_str.len() {
            1 => ms * 100,
            2 => ms * 10,
            _ => ms,
        };
        if minutes >= 60 || seconds >= 60 {
            return None;
        }
        Some((hours * 3600 + minutes * 60 + seconds) as f64 + ms as f64 / 1000.0)
    };

    let start = timestamp(1)?;
    let end = timestamp(5)?;
    if end <= start {
        return None;
    }

    let text = lines[timing_index + 1..]
        .iter()
        .flat_map(|line| line.split_whitespace())
        .collect::<Vec<&str>>()
        .join(" ");
    if text.is_empty() {
        return None;
    }

    Some(CaptionSpan::new(start, end, text))
}
