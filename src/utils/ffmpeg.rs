//! Модуль для работы с FFmpeg
//!
//! Этот модуль содержит функции для проверки и запуска FFmpeg/FFprobe.

use std::path::Path;
use std::process::Command;

use crate::error::{Result, TtsReelError};

/// Проверка наличия FFmpeg
pub fn check_ffmpeg_installed(ffmpeg_path: &str) -> bool {
    Command::new(ffmpeg_path)
        .arg("-version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Получение версии FFmpeg
pub fn get_ffmpeg_version(ffmpeg_path: &str) -> Result<String> {
    let output = Command::new(ffmpeg_path)
        .arg("-version")
        .output()?;

    if !output.status.success() {
        return Err(TtsReelError::Other("Failed to get FFmpeg version".to_string()));
    }

    let version_str = String::from_utf8_lossy(&output.stdout);
    let first_line = version_str.lines().next().unwrap_or("");

    Ok(first_line.to_string())
}

/// Путь к FFprobe рядом с указанным FFmpeg
///
/// `ffmpeg` → `ffprobe`, `/opt/ff/ffmpeg.exe` → `/opt/ff/ffprobe.exe`.
/// Если в имени нет `ffmpeg`, берётся `ffprobe` из той же папки.
pub fn ffprobe_path_for(ffmpeg_path: &str) -> String {
    let path = Path::new(ffmpeg_path);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let probe_name = if name.contains("ffmpeg") {
        name.replacen("ffmpeg", "ffprobe", 1)
    } else {
        "ffprobe".to_string()
    };

    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(probe_name).to_string_lossy().to_string(),
        _ => probe_name,
    }
}

/// Запуск команды FFprobe
pub fn run_ffprobe_command(ffprobe_path: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(ffprobe_path)
        .args(args)
        .output()
        .map_err(|e| TtsReelError::Other(format!("Failed to start {}: {}", ffprobe_path, e)))?;

    if !output.status.success() {
        return Err(TtsReelError::Other(
            format!("{} failed with status: {}", ffprobe_path, output.status)
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Экранирование значения опции фильтра (путь к файлу и т.п.)
///
/// Значение заключается в одинарные кавычки; сама кавычка закрывает
/// строку, экранируется и открывает её снова.
pub fn quote_filter_value(value: &str) -> String {
    format!("'{}'", value.replace('\\', "/").replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_not_installed() {
        assert!(!check_ffmpeg_installed("definitely-not-an-ffmpeg-binary"));
    }

    #[test]
    fn test_ffprobe_path_follows_ffmpeg() {
        assert_eq!(ffprobe_path_for("ffmpeg"), "ffprobe");
        assert_eq!(ffprobe_path_for("/opt/ff/ffmpeg"), "/opt/ff/ffprobe");
        assert_eq!(ffprobe_path_for("/opt/ff/ffmpeg.exe"), "/opt/ff/ffprobe.exe");
        assert_eq!(ffprobe_path_for("/usr/local/bin/encoder"), "/usr/local/bin/ffprobe");
    }

    #[test]
    fn test_missing_ffprobe_names_binary() {
        let err = run_ffprobe_command("/nonexistent/ffprobe", &["-version"]).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/ffprobe"));
    }

    #[test]
    fn test_quote_filter_value() {
        assert_eq!(quote_filter_value("/tmp/caption_0001.txt"), "'/tmp/caption_0001.txt'");
        assert_eq!(quote_filter_value("it's"), "'it'\\''s'");
    }
}
