//! Контекст одного рендера
//!
//! Хранит всё, что нужно компонентам конвейера: идентификатор рендера для
//! логов, рабочие папки, параметры кодирования и выбранный эффект. Никакого
//! глобального состояния: каждый рендер создаёт свой контекст.

use std::path::PathBuf;

use crate::config::{Effect, RenderSpec, TtsReelConfig};
use crate::error::Result;
use crate::utils::temp::Workspace;

/// Контекст рендера
pub struct RenderContext {
    /// Короткий идентификатор рендера (префикс строк лога)
    render_id: String,
    /// Рабочие папки
    workspace: Workspace,
    /// Параметры итогового файла
    spec: RenderSpec,
    /// Эффект для клипов
    effect: Effect,
    /// Конфигурация, с которой запущен рендер
    config: TtsReelConfig,
}

impl RenderContext {
    /// Проверить конфигурацию и создать рабочие папки.
    ///
    /// Ошибки конфигурации возвращаются до любого обращения к диску.
    pub fn new(config: &TtsReelConfig, output_path: impl Into<PathBuf>) -> Result<Self> {
        let effect = config.validate()?;
        let spec = config.render_spec(output_path)?;

        let render_id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        let workspace = Workspace::new(
            config.temp_folder.as_deref(),
            &render_id,
            !config.keep_temp_files,
        )?;

        log::info!(
            "[render {}] workspace {} ({}x{} @ {} fps, effect {})",
            render_id,
            workspace.root().display(),
            spec.width,
            spec.height,
            spec.fps,
            effect
        );

        Ok(Self {
            render_id,
            workspace,
            spec,
            effect,
            config: config.clone(),
        })
    }

    /// Идентификатор рендера
    pub fn render_id(&self) -> &str {
        &self.render_id
    }

    /// Префикс для строк лога
    pub fn tag(&self) -> String {
        format!("[render {}]", self.render_id)
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn spec(&self) -> &RenderSpec {
        &self.spec
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    pub fn config(&self) -> &TtsReelConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TtsReelError;

    #[test]
    fn test_bad_effect_fails_before_workspace() {
        let parent = tempfile::tempdir().unwrap();
        let config = TtsReelConfig {
            transition_effect: "wobble".to_string(),
            temp_folder: Some(parent.path().join("work")),
            ..TtsReelConfig::default()
        };

        let result = RenderContext::new(&config, parent.path().join("out.mp4"));
        assert!(matches!(result, Err(TtsReelError::Configuration(_))));
        assert!(!parent.path().join("work").exists());
    }

    #[test]
    fn test_context_owns_fresh_workspace() {
        let parent = tempfile::tempdir().unwrap();
        let config = TtsReelConfig {
            temp_folder: Some(parent.path().to_path_buf()),
            ..TtsReelConfig::default()
        };

        let a = RenderContext::new(&config, "a.mp4").unwrap();
        let b = RenderContext::new(&config, "b.mp4").unwrap();
        assert_ne!(a.render_id(), b.render_id());
        assert_ne!(a.workspace().root(), b.workspace().root());
        assert_eq!(a.effect(), Effect::ZoomIn);
        assert!(a.tag().contains(a.render_id()));
    }
}
