//! Модуль для анализа временных меток субтитров
//!
//! Этот модуль содержит функции для анализа и выравнивания временных меток.

use crate::subtitle::parser::CaptionSpan;

/// Метрики временных меток субтитров
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingMetrics {
    /// Количество субтитров
    pub count: usize,
    /// Средняя длительность субтитра
    pub avg_duration: f64,
    /// Минимальная длительность субтитра
    pub min_duration: f64,
    /// Максимальная длительность субтитра
    pub max_duration: f64,
    /// Средний интервал между субтитрами
    pub avg_gap: f64,
    /// Количество пересечений соседних субтитров
    pub overlaps: usize,
}

/// Анализ временных меток субтитров
pub fn analyze_caption_timing(spans: &[CaptionSpan]) -> TimingMetrics {
    if spans.is_empty() {
        return TimingMetrics::default();
    }

    let mut total_duration = 0.0;
    let mut min_duration = f64::MAX;
    let mut max_duration: f64 = 0.0;
    let mut total_gap = 0.0;
    let mut gap_count = 0;
    let mut overlaps = 0;

    for (i, span) in spans.iter().enumerate() {
        let duration = span.duration();
        total_duration += duration;
        min_duration = min_duration.min(duration);
        max_duration = max_duration.max(duration);

        if let Some(next) = spans.get(i + 1) {
            let gap = next.start_seconds - span.end_seconds;
            if gap > 0.0 {
                total_gap += gap;
                gap_count += 1;
            } else if gap < 0.0 {
                overlaps += 1;
            }
        }
    }

    TimingMetrics {
        count: spans.len(),
        avg_duration: total_duration / spans.len() as f64,
        min_duration,
        max_duration,
        avg_gap: if gap_count > 0 { total_gap / gap_count as f64 } else { 0.0 },
        overlaps,
    }
}

/// Устранение пересечений: при наложении побеждает субтитр, начавшийся позже.
///
/// Предыдущий субтитр обрезается до начала следующего; если от него ничего
/// не остаётся, он удаляется. Вход должен быть отсортирован по началу.
pub fn resolve_overlaps(spans: Vec<CaptionSpan>) -> Vec<CaptionSpan> {
    let mut resolved: Vec<CaptionSpan> = Vec::with_capacity(spans.len());

    for span in spans {
        while let Some(prev) = resolved.last_mut() {
            if prev.end_seconds <= span.start_seconds {
                break;
            }
            prev.end_seconds = span.start_seconds;
            if prev.end_seconds > prev.start_seconds {
                break;
            }
            resolved.pop();
        }
        resolved.push(span);
    }

    resolved
}
