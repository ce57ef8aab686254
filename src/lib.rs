//! Библиотека tts-reel: вертикальные ролики из озвучки, картинок и субтитров
//!
//! Конвейер одного рендера:
//! озвучка и изображения → равное распределение времени → нормализация
//! изображений → согласование длительности → субтитры и водяной знак →
//! кодирование в один файл.

pub mod assets;
pub mod config;
pub mod context;
pub mod error;
pub mod media;
pub mod notification;
pub mod progress;
pub mod script;
pub mod subtitle;
pub mod timeline;
pub mod tts;
pub mod utils;

use std::path::{Path, PathBuf};

pub use crate::config::{Effect, RenderSpec, TtsReelConfig, VoiceGender};
pub use crate::error::{Result, TtsReelError};

use crate::assets::AssetSource;
use crate::context::RenderContext;
use crate::media::audio::AudioTrack;
use crate::media::encoder::{FfmpegEncoder, VideoEncoder};
use crate::media::normalizer::{discover_images, normalize_assets, NormalizationOutcome};
use crate::progress::{ProgressObserver, ProgressReporter, ProgressTracker, RenderStep};
use crate::subtitle::{analyze_caption_timing, load_captions, resolve_overlaps};
use crate::timeline::TrackAssembler;
use crate::tts::SpeechSynthesizer;
use crate::utils::ffmpeg::ffprobe_path_for;

/// Основная структура для рендера роликов
pub struct TtsReel {
    config: TtsReelConfig,
    progress_tracker: Option<ProgressTracker>,
    encoder: Box<dyn VideoEncoder>,
}

impl TtsReel {
    /// Создать рендерер с кодировщиком FFmpeg из конфигурации
    pub fn new(config: TtsReelConfig) -> Self {
        let encoder = FfmpegEncoder::new(config.ffmpeg_path.clone());
        Self {
            config,
            progress_tracker: None,
            encoder: Box::new(encoder),
        }
    }

    pub fn with_progress_reporter(config: TtsReelConfig, reporter: Box<dyn ProgressReporter>) -> Self {
        let mut reel = Self::new(config);
        reel.progress_tracker = Some(ProgressTracker::with_reporter(reporter));
        reel
    }

    /// Заменить кодировщик
    pub fn with_encoder(mut self, encoder: Box<dyn VideoEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn config(&self) -> &TtsReelConfig {
        &self.config
    }

    pub fn set_progress_reporter(&mut self, reporter: Box<dyn ProgressReporter>) {
        match &mut self.progress_tracker {
            Some(tracker) => tracker.set_reporter(reporter),
            None => self.progress_tracker = Some(ProgressTracker::with_reporter(reporter)),
        }
    }

    /// Добавить наблюдателя; без репортера создаётся репортер по умолчанию
    pub fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize {
        let tracker = self.progress_tracker.get_or_insert_with(|| {
            ProgressTracker::with_reporter(Box::new(progress::DefaultProgressReporter::new()))
        });
        tracker.add_observer(observer).unwrap_or(0)
    }

    /// Отрендерить ролик из готовой озвучки, папки изображений и субтитров.
    ///
    /// При любой ошибке по пути `output_path` ничего не создаётся.
    pub async fn render(
        &self,
        audio_path: &Path,
        image_dir: &Path,
        subtitle_path: Option<&Path>,
        output_path: &Path,
    ) -> Result<PathBuf> {
        let ctx = RenderContext::new(&self.config, output_path)?;
        let tracker = self.render_tracker();
        self.run(&ctx, tracker.as_ref(), audio_path, image_dir, subtitle_path)
            .await
    }

    /// Полный цикл: сценарий → озвучка → изображения → ролик в `output_folder`
    pub async fn create_from_script(
        &self,
        script_text: &str,
        synthesizer: &dyn SpeechSynthesizer,
        source: &dyn AssetSource,
    ) -> Result<PathBuf> {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let output_path = self.config.output_folder.join(format!("video_{}.mp4", timestamp));
        let ctx = RenderContext::new(&self.config, &output_path)?;
        let tracker = self.render_tracker();

        if let Some(tracker) = &tracker {
            tracker.set_step(RenderStep::Preparation);
            tracker.update_step_progress(0.0, Some("Синтез речи".to_string()));
        }
        log::info!("{} generating speech and subtitles from script", ctx.tag());
        let speech = synthesizer
            .synthesize(
                script_text,
                self.config.voice_gender,
                &self.config.language,
                ctx.workspace(),
            )
            .await?;

        let terms = script::search_terms(script_text, script::DEFAULT_WORDS_PER_TERM);
        log::info!("{} {} search terms: {:?}", ctx.tag(), terms.len(), terms);
        let image_dir = ctx.workspace().images_dir();
        let fetched = source.fetch(&terms, &image_dir).await?;
        if fetched == 0 {
            let err = TtsReelError::NoAssets("asset source returned no images".to_string());
            log::error!("{} {}", ctx.tag(), err);
            return Err(err);
        }

        self.run(
            &ctx,
            tracker.as_ref(),
            &speech.audio_path,
            &image_dir,
            speech.subtitle_path.as_deref(),
        )
        .await
    }

    /// Трекер одного рендера; наблюдатели общие, прогресс начинается с нуля
    fn render_tracker(&self) -> Option<ProgressTracker> {
        self.progress_tracker.as_ref().map(ProgressTracker::fork)
    }

    async fn run(
        &self,
        ctx: &RenderContext,
        tracker: Option<&ProgressTracker>,
        audio_path: &Path,
        image_dir: &Path,
        subtitle_path: Option<&Path>,
    ) -> Result<PathBuf> {
        if let Some(t) = tracker {
            t.set_step(RenderStep::Preparation);
            t.update_step_progress(50.0, Some("Измерение длительности озвучки".to_string()));
        }

        let audio = load_audio_in_background(ctx, audio_path).await.map_err(|e| {
            log::error!("{} failed to load audio: {}", ctx.tag(), e);
            e
        })?;
        log::info!(
            "{} audio {} lasts {:.3}s",
            ctx.tag(),
            audio.path.display(),
            audio.duration_seconds
        );

        let captions = resolve_overlaps(load_captions(subtitle_path));
        let metrics = analyze_caption_timing(&captions);
        log::debug!("{} caption timing: {:?}", ctx.tag(), metrics);

        if let Some(t) = tracker {
            t.set_step(RenderStep::Normalization);
        }
        let outcome = normalize_in_background(ctx, image_dir).await?;

        let mut assembler = TrackAssembler::new(ctx).with_progress(tracker);
        assembler.accept_assets(outcome)?;
        assembler.build_clips(audio.duration_seconds)?;
        assembler.reconcile()?;
        assembler.merge_overlays(&captions)?;
        assembler.attach_audio(audio)?;
        let output = assembler.render(&*self.encoder).await?;

        if let Some(t) = tracker {
            t.complete();
        }
        Ok(output)
    }
}

/// Измерить длительность озвучки в пуле блокирующих задач
async fn load_audio_in_background(ctx: &RenderContext, audio_path: &Path) -> Result<AudioTrack> {
    let audio_path = audio_path.to_path_buf();
    let ffprobe_path = ffprobe_path_for(&ctx.config().ffmpeg_path);

    tokio::task::spawn_blocking(move || AudioTrack::load_with_ffprobe(&audio_path, &ffprobe_path))
        .await
        .map_err(|e| TtsReelError::Other(format!("audio loading task failed: {}", e)))?
}

/// Найти и нормализовать изображения в пуле блокирующих задач
async fn normalize_in_background(ctx: &RenderContext, image_dir: &Path) -> Result<NormalizationOutcome> {
    let image_dir = image_dir.to_path_buf();
    let extensions = ctx.config().image_extensions.clone();
    let target = ctx.spec().resolution();
    let scratch_dir = ctx.workspace().scratch_dir();
    let tag = ctx.tag();

    tokio::task::spawn_blocking(move || -> Result<NormalizationOutcome> {
        let assets = discover_images(&image_dir, &extensions).map_err(|e| {
            log::error!("{} {}", tag, e);
            e
        })?;
        log::info!("{} normalizing {} images to {}x{}", tag, assets.len(), target.0, target.1);
        Ok(normalize_assets(assets, target, &scratch_dir))
    })
    .await
    .map_err(|e| TtsReelError::Other(format!("normalization task failed: {}", e)))?
}

/// Отрендерить ролик с указанной конфигурацией
pub async fn render_video(
    audio_path: &Path,
    image_dir: &Path,
    subtitle_path: Option<&Path>,
    output_path: &Path,
    config: TtsReelConfig,
) -> Result<PathBuf> {
    TtsReel::new(config)
        .render(audio_path, image_dir, subtitle_path, output_path)
        .await
}

/// То же, что `render_video`, с отслеживанием прогресса
pub async fn render_video_with_progress(
    audio_path: &Path,
    image_dir: &Path,
    subtitle_path: Option<&Path>,
    output_path: &Path,
    config: TtsReelConfig,
    reporter: Box<dyn ProgressReporter>,
) -> Result<PathBuf> {
    TtsReel::with_progress_reporter(config, reporter)
        .render(audio_path, image_dir, subtitle_path, output_path)
        .await
}
