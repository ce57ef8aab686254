//! Полный цикл от текста сценария с подменёнными синтезатором и кодировщиком

use async_trait::async_trait;

use crate::assets::LocalAssetSource;
use crate::config::VoiceGender;
use crate::media::audio::tests::write_silent_wav;
use crate::media::encoder::tests::RecordingEncoder;
use crate::media::normalizer::tests::{exts, write_image};
use crate::tts::{SpeechArtifacts, SpeechSynthesizer};
use crate::utils::temp::Workspace;
use crate::{Result, TtsReel, TtsReelConfig, TtsReelError};

/// Синтезатор, записывающий тишину и субтитры
struct SilentSynthesizer {
    seconds: f64,
}

#[async_trait]
impl SpeechSynthesizer for SilentSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        _voice_gender: VoiceGender,
        _language: &str,
        workspace: &Workspace,
    ) -> Result<SpeechArtifacts> {
        if text.trim().is_empty() {
            return Err(TtsReelError::SpeechSynthesis("script text is empty".to_string()));
        }
        let audio_path = workspace.audio_dir().join("audio.wav");
        write_silent_wav(&audio_path, self.seconds);
        let subtitle_path = workspace.subtitles_dir().join("subtitles.srt");
        std::fs::write(&subtitle_path, "1\n00:00:00,000 --> 00:00:02,500\nfirst words\n")?;
        Ok(SpeechArtifacts {
            audio_path,
            subtitle_path: Some(subtitle_path),
        })
    }
}

const SCRIPT: &str = "The ocean covers most of our planet and hides creatures we have barely met";

#[tokio::test]
async fn test_script_to_video() {
    let dir = tempfile::tempdir().unwrap();
    let library = dir.path().join("library");
    std::fs::create_dir_all(&library).unwrap();
    for name in ["ocean.png", "planet.png", "creatures.png"] {
        write_image(&library.join(name), 32, 32);
    }

    let config = TtsReelConfig {
        video_resolution: (54, 96),
        output_folder: dir.path().join("videos"),
        temp_folder: Some(dir.path().join("work")),
        ..TtsReelConfig::default()
    };
    let encoder = RecordingEncoder::default();
    let reel = TtsReel::new(config).with_encoder(Box::new(encoder.clone()));

    let output = reel
        .create_from_script(
            SCRIPT,
            &SilentSynthesizer { seconds: 6.0 },
            &LocalAssetSource::new(&library, exts()),
        )
        .await
        .unwrap();

    assert!(output.exists());
    assert!(output.starts_with(dir.path().join("videos")));
    let name = output.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("video_") && name.ends_with(".mp4"));
    assert_eq!(encoder.calls(), 1);
}

#[tokio::test]
async fn test_empty_library_is_no_assets() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("library")).unwrap();
    let config = TtsReelConfig {
        output_folder: dir.path().join("videos"),
        temp_folder: Some(dir.path().join("work")),
        ..TtsReelConfig::default()
    };
    let encoder = RecordingEncoder::default();
    let reel = TtsReel::new(config).with_encoder(Box::new(encoder.clone()));

    let result = reel
        .create_from_script(
            SCRIPT,
            &SilentSynthesizer { seconds: 3.0 },
            &LocalAssetSource::new(dir.path().join("library"), exts()),
        )
        .await;

    assert!(matches!(result, Err(TtsReelError::NoAssets(_))));
    assert_eq!(encoder.calls(), 0);
    assert!(!dir.path().join("videos").exists());
}

#[tokio::test]
async fn test_synthesis_failure_propagates() {
    let dir = tempfile::tempdir().unwrap();
    let config = TtsReelConfig {
        output_folder: dir.path().join("videos"),
        temp_folder: Some(dir.path().join("work")),
        ..TtsReelConfig::default()
    };
    let reel = TtsReel::new(config).with_encoder(Box::new(RecordingEncoder::default()));

    let result = reel
        .create_from_script(
            "   ",
            &SilentSynthesizer { seconds: 3.0 },
            &LocalAssetSource::new(dir.path().join("library"), exts()),
        )
        .await;

    assert!(matches!(result, Err(TtsReelError::SpeechSynthesis(_))));
}
