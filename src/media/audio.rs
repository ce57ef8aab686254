//! Модуль для работы с аудио
//!
//! Длительность озвучки измеряется по самому файлу, а не берётся на веру:
//! сначала через symphonia, при неудаче через ffprobe.

use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{Result, TtsReelError};
use crate::utils::ffmpeg;

/// Аудиодорожка ролика
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    /// Путь к аудиофайлу
    pub path: PathBuf,
    /// Измеренная длительность в секундах (> 0)
    pub duration_seconds: f64,
}

impl AudioTrack {
    /// Загрузить аудиофайл и измерить его длительность
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_ffprobe(path, "ffprobe")
    }

    /// То же, что `load`, с указанным FFprobe для запасного измерения
    pub fn load_with_ffprobe<P: AsRef<Path>>(path: P, ffprobe_path: &str) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(TtsReelError::FileNotFound(format!(
                "Audio file not found: {}",
                path.display()
            )));
        }

        let duration_seconds = match probe_duration(path) {
            Ok(duration) => duration,
            Err(e) => {
                log::debug!("symphonia could not measure {}: {}, trying ffprobe", path.display(), e);
                ffprobe_duration(path, ffprobe_path)?
            }
        };

        if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
            return Err(TtsReelError::AudioProcessing(format!(
                "Audio file {} has non-positive duration {}",
                path.display(),
                duration_seconds
            )));
        }

        log::info!("Loaded audio {} ({:.3}s)", path.display(), duration_seconds);
        Ok(Self {
            path: path.to_path_buf(),
            duration_seconds,
        })
    }
}

/// Измерение длительности через symphonia.
///
/// Файл открывается только на время измерения.
fn probe_duration(path: &Path) -> Result<f64> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| TtsReelError::AudioProcessing(format!("Unsupported audio format: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| TtsReelError::AudioProcessing("No audio track found".to_string()))?;

    let track_id = track.id;
    let params = track.codec_params.clone();

    if let (Some(n_frames), Some(time_base)) = (params.n_frames, params.time_base) {
        let time = time_base.calc_time(n_frames);
        return Ok(time.seconds as f64 + time.frac);
    }
    if let (Some(n_frames), Some(sample_rate)) = (params.n_frames, params.sample_rate) {
        return Ok(n_frames as f64 / sample_rate as f64);
    }

    // Заголовок не содержит длительности: суммируем длительности пакетов
    let time_base = params
        .time_base
        .ok_or_else(|| TtsReelError::AudioProcessing("Unknown time base".to_string()))?;
    let mut total_ts: u64 = 0;
    while let Ok(packet) = format.next_packet() {
        if packet.track_id() == track_id {
            total_ts += packet.dur;
        }
    }
    let time = time_base.calc_time(total_ts);
    Ok(time.seconds as f64 + time.frac)
}

/// Измерение длительности через ffprobe
fn ffprobe_duration(path: &Path, ffprobe_path: &str) -> Result<f64> {
    let path_str = path.to_string_lossy();
    let output = ffmpeg::run_ffprobe_command(ffprobe_path, &[
        "-v", "error",
        "-show_entries", "format=duration",
        "-of", "default=noprint_wrappers=1:nokey=1",
        &path_str,
    ])
    .map_err(|e| TtsReelError::AudioProcessing(format!("Failed to measure audio duration: {}", e)))?;

    output.trim().parse::<f64>().map_err(|_| {
        TtsReelError::AudioProcessing(format!("Failed to parse audio duration: {}", output.trim()))
    })
}
