//! Синтез речи через утилиту `edge-tts`

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;

use crate::config::VoiceGender;
use crate::error::{Result, TtsReelError};
use crate::tts::{SpeechArtifacts, SpeechSynthesizer};
use crate::utils::temp::Workspace;

/// Синтезатор на основе CLI `edge-tts`
#[derive(Debug, Clone)]
pub struct EdgeTtsSynthesizer {
    binary: String,
    /// Изменение темпа, например `+15%`
    rate: String,
    /// Изменение высоты голоса, например `+10Hz`
    pitch: String,
}

impl Default for EdgeTtsSynthesizer {
    fn default() -> Self {
        Self {
            binary: "edge-tts".to_string(),
            rate: "+15%".to_string(),
            pitch: "+10Hz".to_string(),
        }
    }
}

impl EdgeTtsSynthesizer {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            ..Self::default()
        }
    }

    pub fn with_prosody(mut self, rate: impl Into<String>, pitch: impl Into<String>) -> Self {
        self.rate = rate.into();
        self.pitch = pitch.into();
        self
    }

    /// Голос для пола и языка
    pub fn voice_for(gender: VoiceGender, language: &str) -> Result<&'static str> {
        let voice = match (language.to_ascii_lowercase().as_str(), gender) {
            ("en", VoiceGender::Male) => "en-US-GuyNeural",
            ("en", VoiceGender::Female) => "en-US-JennyNeural",
            ("hi", VoiceGender::Male) => "hi-IN-MadhurNeural",
            ("hi", VoiceGender::Female) => "hi-IN-SwaraNeural",
            (other, _) => {
                return Err(TtsReelError::Configuration(format!(
                    "No voice for language '{}' (expected en or hi)",
                    other
                )))
            }
        };
        Ok(voice)
    }

    fn command_args(&self, voice: &str, text: &str, media: &Path, subtitles: &Path) -> Vec<String> {
        vec![
            "--voice".to_string(),
            voice.to_string(),
            "--rate".to_string(),
            self.rate.clone(),
            "--pitch".to_string(),
            self.pitch.clone(),
            "--text".to_string(),
            text.to_string(),
            "--write-media".to_string(),
            media.to_string_lossy().to_string(),
            "--write-subtitles".to_string(),
            subtitles.to_string_lossy().to_string(),
        ]
    }
}

#[async_trait]
impl SpeechSynthesizer for EdgeTtsSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice_gender: VoiceGender,
        language: &str,
        workspace: &Workspace,
    ) -> Result<SpeechArtifacts> {
        if text.trim().is_empty() {
            return Err(TtsReelError::SpeechSynthesis("script text is empty".to_string()));
        }
        let voice = Self::voice_for(voice_gender, language)?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        // edge-tts всегда пишет MP3
        let audio_path = workspace.audio_dir().join(format!("audio_{}.mp3", timestamp));
        let subtitle_path = workspace.subtitles_dir().join(format!("subtitles_{}.srt", timestamp));

        log::info!("Synthesizing {} characters with voice {}", text.chars().count(), voice);
        let output = tokio::process::Command::new(&self.binary)
            .args(self.command_args(voice, text, &audio_path, &subtitle_path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| TtsReelError::SpeechSynthesis(format!("failed to start {}: {}", self.binary, e)))?;

        if !output.status.success() {
            return Err(TtsReelError::SpeechSynthesis(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let audio_written = tokio::fs::metadata(&audio_path)
            .await
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if !audio_written {
            return Err(TtsReelError::SpeechSynthesis(format!(
                "{} did not write {}",
                self.binary,
                audio_path.display()
            )));
        }

        let subtitles_written = tokio::fs::metadata(&subtitle_path)
            .await
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if !subtitles_written {
            log::warn!("{} wrote no subtitles, captions will be empty", self.binary);
        }

        Ok(SpeechArtifacts {
            audio_path,
            subtitle_path: subtitles_written.then_some(subtitle_path),
        })
    }
}
