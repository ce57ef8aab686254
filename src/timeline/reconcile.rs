//! Согласование длительности видеоряда с длительностью озвучки
//!
//! Если видеоряд короче озвучки, он повторяется целиком
//! `ceil(audio / visual)` раз, затем обрезается. Если длиннее, обрезается.
//! Обрезка всегда идёт с хвоста и не меняет порядок клипов.

use crate::error::{Result, TtsReelError};
use crate::timeline::allocator::{visual_total, VisualClip};

/// Допуск сравнения времён
const EPSILON: f64 = 1e-9;

/// Отрезок согласованного видеоряда
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSegment {
    /// Индекс клипа в исходной последовательности
    pub clip_index: usize,
    /// Номер повтора видеоряда (с нуля)
    pub loop_index: usize,
    /// Начало отрезка на общей шкале
    pub start_seconds: f64,
    /// Длительность отрезка
    pub duration_seconds: f64,
}

impl TimelineSegment {
    pub fn end_seconds(&self) -> f64 {
        self.start_seconds + self.duration_seconds
    }
}

/// Согласованный видеоряд
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledTrack {
    /// Отрезки в порядке показа
    pub segments: Vec<TimelineSegment>,
    /// Сколько раз повторён исходный видеоряд
    pub loops: usize,
    /// Длительность исходного видеоряда
    pub visual_total: f64,
    /// Итоговая длительность, ровно равная длительности озвучки
    pub duration_seconds: f64,
}

impl ReconciledTrack {
    /// Сумма длительностей отрезков
    pub fn segments_total(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_seconds).sum()
    }
}

/// Количество повторов видеоряда
pub fn loop_count(visual_total: f64, audio_duration: f64) -> usize {
    if visual_total >= audio_duration {
        return 1;
    }
    let loops = ((audio_duration / visual_total).ceil() as usize).max(1);
    // Частное вида 11.000000000000002 не должно давать лишний повтор
    if loops > 1 && (loops - 1) as f64 * visual_total >= audio_duration - EPSILON {
        loops - 1
    } else {
        loops
    }
}

/// Согласовать видеоряд с озвучкой
pub fn reconcile(clips: &[VisualClip], audio_duration: f64) -> Result<ReconciledTrack> {
    let visual = visual_total(clips);
    if clips.is_empty() || visual <= 0.0 || !visual.is_finite() {
        return Err(TtsReelError::NoAssets(
            "visual track is empty, nothing to reconcile".to_string(),
        ));
    }
    if !audio_duration.is_finite() || audio_duration <= 0.0 {
        return Err(TtsReelError::AudioProcessing(format!(
            "audio duration must be positive, got {}",
            audio_duration
        )));
    }

    let loops = loop_count(visual, audio_duration);

    // Смещения клипов внутри одного повтора считаются один раз, чтобы
    // начало отрезка не накапливало погрешность от повтора к повтору
    let mut offsets = Vec::with_capacity(clips.len());
    let mut offset = 0.0;
    for clip in clips {
        offsets.push(offset);
        offset += clip.display_duration_seconds;
    }

    let mut segments = Vec::new();
    'outer: for loop_index in 0..loops {
        for (clip_index, clip) in clips.iter().enumerate() {
            let start = loop_index as f64 * visual + offsets[clip_index];
            if start >= audio_duration - EPSILON {
                break 'outer;
            }
            let mut end = start + clip.display_duration_seconds;
            if end >= audio_duration - EPSILON {
                end = audio_duration;
            }
            let duration = end - start;
            if duration > EPSILON {
                segments.push(TimelineSegment {
                    clip_index,
                    loop_index,
                    start_seconds: start,
                    duration_seconds: duration,
                });
            }
            if end >= audio_duration {
                break 'outer;
            }
        }
    }

    Ok(ReconciledTrack {
        segments,
        loops,
        visual_total: visual,
        duration_seconds: audio_duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Effect;
    use crate::timeline::allocator::tests::assets;

    fn clips_with(durations: &[f64]) -> Vec<VisualClip> {
        assets(durations.len())
            .into_iter()
            .zip(durations)
            .map(|(asset, &d)| VisualClip {
                asset,
                display_duration_seconds: d,
                effect: Effect::None,
            })
            .collect()
    }

    #[test]
    fn test_loop_and_trim() {
        // 7 секунд видеоряда, 20 секунд озвучки
        let clips = clips_with(&[2.0, 3.0, 2.0]);
        let track = reconcile(&clips, 20.0).unwrap();

        assert_eq!(track.loops, 3);
        assert_eq!(track.duration_seconds, 20.0);
        assert!((track.segments_total() - 20.0).abs() < 1e-9);
        assert_eq!(track.segments.last().unwrap().end_seconds(), 20.0);

        // Первые 7 секунд совпадают с исходным видеорядом
        for (i, clip) in clips.iter().enumerate() {
            assert_eq!(track.segments[i].clip_index, i);
            assert_eq!(track.segments[i].loop_index, 0);
            assert_eq!(track.segments[i].duration_seconds, clip.display_duration_seconds);
        }

        let order: Vec<usize> = track.segments.iter().map(|s| s.clip_index).collect();
        assert_eq!(order, vec![0, 1, 2, 0, 1, 2, 0, 1, 2]);
        // Последний клип третьего повтора обрезан до одной секунды
        assert_eq!(track.segments[8].start_seconds, 19.0);
        assert_eq!(track.segments[8].duration_seconds, 1.0);
    }

    #[test]
    fn test_truncate_only() {
        // 30 секунд видеоряда, 20 секунд озвучки
        let clips = clips_with(&[10.0, 10.0, 10.0]);
        let track = reconcile(&clips, 20.0).unwrap();

        assert_eq!(track.loops, 1);
        let order: Vec<usize> = track.segments.iter().map(|s| s.clip_index).collect();
        assert_eq!(order, vec![0, 1]);
        assert_eq!(track.segments_total(), 20.0);
    }

    #[test]
    fn test_truncate_mid_clip() {
        let clips = clips_with(&[6.0, 6.0, 6.0, 6.0, 6.0]);
        let track = reconcile(&clips, 20.0).unwrap();
        let order: Vec<usize> = track.segments.iter().map(|s| s.clip_index).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
        assert_eq!(track.segments[3].duration_seconds, 2.0);
        assert_eq!(track.segments[3].end_seconds(), 20.0);
    }

    #[test]
    fn test_exact_fit_has_single_loop() {
        let clips = clips_with(&[3.0, 3.0, 3.0, 3.0]);
        let track = reconcile(&clips, 12.0).unwrap();
        assert_eq!(track.loops, 1);
        assert_eq!(track.segments.len(), 4);
        assert_eq!(track.segments_total(), 12.0);
    }

    #[test]
    fn test_loop_count_formula() {
        for visual_tenths in 1..200u32 {
            for audio_tenths in 1..400u32 {
                let visual = visual_tenths as f64 / 10.0;
                let audio = audio_tenths as f64 / 10.0;
                let loops = loop_count(visual, audio);
                if visual >= audio {
                    assert_eq!(loops, 1);
                } else {
                    // Повторов хватает, и ни один не лишний
                    assert!(loops as f64 * visual >= audio - 1e-9);
                    assert!((loops - 1) as f64 * visual < audio);
                }
            }
        }
        assert_eq!(loop_count(7.0, 20.0), 3);
        assert_eq!(loop_count(10.0, 20.0), 2);
        assert_eq!(loop_count(0.1, 1.1), 11);
    }

    #[test]
    fn test_reconciled_length_is_exact_for_many_inputs() {
        for count in 1..12 {
            for audio_tenths in [5u32, 33, 70, 123, 200, 301, 999] {
                let audio = audio_tenths as f64 / 10.0;
                let per_clip = 1.7;
                let clips = clips_with(&vec![per_clip; count]);
                let track = reconcile(&clips, audio).unwrap();

                assert_eq!(track.duration_seconds, audio);
                assert!((track.segments_total() - audio).abs() < 1e-6);
                assert!(track.segments.iter().all(|s| s.duration_seconds > 0.0));

                // Порядок сохраняется и при повторах
                for (i, segment) in track.segments.iter().enumerate() {
                    assert_eq!(segment.clip_index, i % count);
                    assert_eq!(segment.loop_index, i / count);
                }
                for pair in track.segments.windows(2) {
                    assert!((pair[0].end_seconds() - pair[1].start_seconds).abs() < 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_empty_clips_is_no_assets() {
        assert!(matches!(reconcile(&[], 10.0), Err(TtsReelError::NoAssets(_))));
    }
}
