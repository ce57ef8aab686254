//! Кодирование таймлайна в итоговый видеофайл
//!
//! Кодировщик пишет во временный файл рядом с итоговым, и только после
//! успешного завершения файл переименовывается в `output_path`. При любой
//! ошибке временный файл удаляется, и по итоговому пути ничего не остаётся.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;

use crate::config::RenderSpec;
use crate::error::{Result, TtsReelError};
use crate::media::filtergraph::{build_ffmpeg_args, chars_per_line, wrap_text};
use crate::timeline::assembler::CompositeTimeline;
use crate::timeline::overlay::OverlayKind;

/// Сколько последних строк stderr кодировщика попадает в ошибку
const STDERR_TAIL_LINES: usize = 20;

/// Задание на кодирование
#[derive(Debug, Clone, Copy)]
pub struct EncodeJob<'a> {
    pub timeline: &'a CompositeTimeline,
    pub spec: &'a RenderSpec,
    /// Временный файл, в который нужно записать результат
    pub output: &'a Path,
    /// Папка для служебных файлов кодировщика
    pub scratch_dir: &'a Path,
}

/// Внешний кодировщик видео
#[async_trait]
pub trait VideoEncoder: Send + Sync {
    async fn encode(&self, job: EncodeJob<'_>) -> Result<()>;
}

/// Кодировщик на основе FFmpeg
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    ffmpeg_path: String,
}

impl FfmpegEncoder {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

/// Записать тексты оверлеев в файлы для `drawtext=textfile=`
fn write_overlay_texts(timeline: &CompositeTimeline, spec: &RenderSpec, scratch_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(scratch_dir)?;
    timeline
        .overlays
        .iter()
        .enumerate()
        .map(|(i, overlay)| {
            let text = match overlay.kind {
                OverlayKind::Caption => wrap_text(&overlay.text, chars_per_line(spec.width, overlay.style.font_size)),
                OverlayKind::Watermark => overlay.text.clone(),
            };
            let path = scratch_dir.join(format!("overlay_{:04}.txt", i));
            std::fs::write(&path, text)?;
            Ok(path)
        })
        .collect()
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n")
}

#[async_trait]
impl VideoEncoder for FfmpegEncoder {
    async fn encode(&self, job: EncodeJob<'_>) -> Result<()> {
        let text_files = write_overlay_texts(job.timeline, job.spec, job.scratch_dir)?;
        let args = build_ffmpeg_args(job.timeline, &text_files, job.spec, job.output);
        log::debug!("Running {} {}", self.ffmpeg_path, args.join(" "));

        let output = tokio::process::Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| TtsReelError::Encode(format!("failed to start {}: {}", self.ffmpeg_path, e)))?;

        if !output.status.success() {
            return Err(TtsReelError::Encode(format!(
                "{} exited with {}:\n{}",
                self.ffmpeg_path,
                output.status,
                stderr_tail(&output.stderr)
            )));
        }
        Ok(())
    }
}

/// Закодировать таймлайн и атомарно переместить результат в `spec.output_path`
pub async fn render_to_file(
    encoder: &dyn VideoEncoder,
    timeline: &CompositeTimeline,
    spec: &RenderSpec,
    scratch_dir: &Path,
) -> Result<PathBuf> {
    let output_path = spec.output_path.clone();
    let out_dir = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&out_dir).await?;

    let suffix = output_path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let temp_path = tempfile::Builder::new()
        .prefix(".tts-reel-")
        .suffix(&suffix)
        .tempfile_in(&out_dir)?
        .into_temp_path();

    encoder
        .encode(EncodeJob {
            timeline,
            spec,
            output: &temp_path,
            scratch_dir,
        })
        .await?;

    let written = tokio::fs::metadata(&temp_path).await?.len();
    if written == 0 {
        return Err(TtsReelError::Encode("encoder produced an empty file".to_string()));
    }

    temp_path
        .persist(&output_path)
        .map_err(|e| TtsReelError::Io(e.error))?;
    Ok(output_path)
}
