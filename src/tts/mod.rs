//! Синтез речи из текста сценария
//!
//! Синтезатор получает текст и пишет в рабочую папку озвучку и, если
//! умеет, субтитры с временными метками.

pub mod edge;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::config::VoiceGender;
use crate::error::Result;
use crate::utils::temp::Workspace;

pub use edge::EdgeTtsSynthesizer;

/// Файлы, полученные от синтезатора
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechArtifacts {
    pub audio_path: PathBuf,
    /// Субтитры; `None`, если синтезатор их не записал
    pub subtitle_path: Option<PathBuf>,
}

/// Синтезатор речи
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        voice_gender: VoiceGender,
        language: &str,
        workspace: &Workspace,
    ) -> Result<SpeechArtifacts>;
}
