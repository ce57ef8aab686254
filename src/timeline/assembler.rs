//! Сборка итогового таймлайна одного рендера
//!
//! `TrackAssembler` проходит этапы строго по порядку:
//! `Idle → AssetsNormalized → ClipsBuilt → Reconciled → OverlaysMerged →
//! AudioAttached → Rendering → Done`. Любая ошибка переводит его в `Failed`.

use std::fmt;
use std::path::PathBuf;

use crate::context::RenderContext;
use crate::error::{Result, TtsReelError};
use crate::media::audio::AudioTrack;
use crate::media::encoder::{render_to_file, VideoEncoder};
use crate::media::normalizer::{ImageAsset, NormalizationOutcome};
use crate::progress::{ProgressTracker, RenderStep};
use crate::subtitle::parser::CaptionSpan;
use crate::timeline::allocator::{self, VisualClip};
use crate::timeline::overlay::{compose_overlays, OverlayElement};
use crate::timeline::reconcile::{reconcile, ReconciledTrack, TimelineSegment};

/// Допустимое расхождение длительностей видеоряда и озвучки
const DURATION_TOLERANCE: f64 = 1e-9;

/// Состояние сборщика
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    AssetsNormalized,
    ClipsBuilt,
    Reconciled,
    OverlaysMerged,
    AudioAttached,
    Rendering,
    Done,
    Failed,
}

impl fmt::Display for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Готовый к кодированию таймлайн
#[derive(Debug, Clone)]
pub struct CompositeTimeline {
    /// Исходные клипы (по одному на изображение)
    pub clips: Vec<VisualClip>,
    /// Согласованный видеоряд
    pub track: ReconciledTrack,
    /// Оверлеи в пределах длительности озвучки
    pub overlays: Vec<OverlayElement>,
    pub audio: AudioTrack,
}

impl CompositeTimeline {
    /// Собрать таймлайн; длительность видеоряда должна совпадать с озвучкой
    pub fn new(
        clips: Vec<VisualClip>,
        track: ReconciledTrack,
        overlays: Vec<OverlayElement>,
        audio: AudioTrack,
    ) -> Result<Self> {
        if (track.duration_seconds - audio.duration_seconds).abs() > DURATION_TOLERANCE {
            return Err(TtsReelError::AudioProcessing(format!(
                "visual track lasts {:.3}s but audio lasts {:.3}s",
                track.duration_seconds, audio.duration_seconds
            )));
        }
        if let Some(segment) = track.segments.iter().find(|s| s.clip_index >= clips.len()) {
            return Err(TtsReelError::Other(format!(
                "segment refers to clip {} of {}",
                segment.clip_index,
                clips.len()
            )));
        }
        Ok(Self {
            clips,
            track,
            overlays,
            audio,
        })
    }

    /// Длительность ролика, равная длительности озвучки
    pub fn duration_seconds(&self) -> f64 {
        self.audio.duration_seconds
    }

    /// Отрезки видеоряда вместе с клипами, которые они показывают
    pub fn segment_clips(&self) -> impl Iterator<Item = (&TimelineSegment, &VisualClip)> + '_ {
        self.track
            .segments
            .iter()
            .map(move |segment| (segment, &self.clips[segment.clip_index]))
    }
}

/// Сборщик таймлайна одного рендера
pub struct TrackAssembler<'a> {
    ctx: &'a RenderContext,
    progress: Option<&'a ProgressTracker>,
    state: RenderState,
    assets: Vec<ImageAsset>,
    audio_duration: f64,
    clips: Vec<VisualClip>,
    track: Option<ReconciledTrack>,
    overlays: Vec<OverlayElement>,
    timeline: Option<CompositeTimeline>,
}

impl<'a> TrackAssembler<'a> {
    pub fn new(ctx: &'a RenderContext) -> Self {
        Self {
            ctx,
            progress: None,
            state: RenderState::Idle,
            assets: Vec::new(),
            audio_duration: 0.0,
            clips: Vec::new(),
            track: None,
            overlays: Vec::new(),
            timeline: None,
        }
    }

    pub fn with_progress(mut self, tracker: Option<&'a ProgressTracker>) -> Self {
        self.progress = tracker;
        self
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    /// Таймлайн, доступный после `attach_audio`
    pub fn timeline(&self) -> Option<&CompositeTimeline> {
        self.timeline.as_ref()
    }

    fn expect_state(&mut self, expected: RenderState) -> Result<()> {
        if self.state == expected {
            return Ok(());
        }
        let err = TtsReelError::Other(format!(
            "invalid render transition: expected state {}, found {}",
            expected, self.state
        ));
        Err(self.fail(err))
    }

    fn fail(&mut self, err: TtsReelError) -> TtsReelError {
        log::error!("{} render failed in state {}: {}", self.ctx.tag(), self.state, err);
        self.state = RenderState::Failed;
        err
    }

    fn report(&self, step: RenderStep, details: String) {
        if let Some(tracker) = self.progress {
            tracker.set_step(step);
            tracker.update_step_progress(100.0, Some(details));
        }
    }

    /// Принять результат нормализации; пустой набор даёт `NoAssets`
    pub fn accept_assets(&mut self, outcome: NormalizationOutcome) -> Result<usize> {
        self.expect_state(RenderState::Idle)?;
        let skipped = outcome.failures.len();
        let assets = outcome.into_assets().map_err(|e| self.fail(e))?;

        log::info!(
            "{} {} images normalized, {} skipped",
            self.ctx.tag(),
            assets.len(),
            skipped
        );
        self.report(RenderStep::Normalization, format!("{} images", assets.len()));

        let count = assets.len();
        self.assets = assets;
        self.state = RenderState::AssetsNormalized;
        Ok(count)
    }

    /// Разделить длительность озвучки поровну между изображениями
    pub fn build_clips(&mut self, audio_duration: f64) -> Result<()> {
        self.expect_state(RenderState::AssetsNormalized)?;
        let assets = std::mem::take(&mut self.assets);
        let clips = allocator::build_clips(assets, audio_duration, self.ctx.effect()).map_err(|e| self.fail(e))?;

        log::info!(
            "{} {} clips of {:.3}s each ({})",
            self.ctx.tag(),
            clips.len(),
            clips.first().map(|c| c.display_duration_seconds).unwrap_or_default(),
            self.ctx.effect()
        );

        self.audio_duration = audio_duration;
        self.clips = clips;
        self.state = RenderState::ClipsBuilt;
        Ok(())
    }

    /// Согласовать видеоряд с длительностью озвучки
    pub fn reconcile(&mut self) -> Result<()> {
        self.expect_state(RenderState::ClipsBuilt)?;
        let track = reconcile(&self.clips, self.audio_duration).map_err(|e| self.fail(e))?;

        log::info!(
            "{} visual track {:.3}s looped {}x into {} segments",
            self.ctx.tag(),
            track.visual_total,
            track.loops,
            track.segments.len()
        );
        self.report(RenderStep::Timeline, format!("{} segments", track.segments.len()));

        self.track = Some(track);
        self.state = RenderState::Reconciled;
        Ok(())
    }

    /// Добавить субтитры и водяной знак
    pub fn merge_overlays(&mut self, spans: &[CaptionSpan]) -> Result<()> {
        self.expect_state(RenderState::Reconciled)?;
        let ctx = self.ctx;
        let config = ctx.config();
        let overlays = compose_overlays(
            spans,
            &config.caption_style,
            config.caption_band,
            &config.watermark,
            ctx.spec().resolution(),
            self.audio_duration,
        )
        .map_err(|e| self.fail(e))?;

        log::info!("{} {} overlays merged", self.ctx.tag(), overlays.len());
        self.report(RenderStep::Overlays, format!("{} overlays", overlays.len()));

        self.overlays = overlays;
        self.state = RenderState::OverlaysMerged;
        Ok(())
    }

    /// Подключить озвучку и собрать итоговый таймлайн
    pub fn attach_audio(&mut self, audio: AudioTrack) -> Result<&CompositeTimeline> {
        self.expect_state(RenderState::OverlaysMerged)?;
        let track = match self.track.take() {
            Some(track) => track,
            None => return Err(self.fail(TtsReelError::Other("reconciled track is missing".to_string()))),
        };
        let clips = std::mem::take(&mut self.clips);
        let overlays = std::mem::take(&mut self.overlays);
        let timeline = CompositeTimeline::new(clips, track, overlays, audio).map_err(|e| self.fail(e))?;

        log::debug!("{} audio attached: {}", self.ctx.tag(), timeline.audio.path.display());
        self.state = RenderState::AudioAttached;
        Ok(self.timeline.insert(timeline))
    }

    /// Закодировать таймлайн в итоговый файл
    pub async fn render(&mut self, encoder: &dyn VideoEncoder) -> Result<PathBuf> {
        self.expect_state(RenderState::AudioAttached)?;
        self.state = RenderState::Rendering;
        if let Some(tracker) = self.progress {
            tracker.set_step(RenderStep::Encoding);
        }

        let result = match &self.timeline {
            Some(timeline) => {
                log::info!(
                    "{} encoding {:.3}s to {}",
                    self.ctx.tag(),
                    timeline.duration_seconds(),
                    self.ctx.spec().output_path.display()
                );
                render_to_file(encoder, timeline, self.ctx.spec(), &self.ctx.workspace().scratch_dir()).await
            }
            None => Err(TtsReelError::Other("timeline is missing".to_string())),
        };

        match result {
            Ok(path) => {
                self.state = RenderState::Done;
                log::info!("{} done: {}", self.ctx.tag(), path.display());
                Ok(path)
            }
            Err(e) => Err(self.fail(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TtsReelConfig;
    use crate::media::audio::tests::write_silent_wav;
    use crate::media::encoder::tests::RecordingEncoder;
    use crate::media::normalizer::tests::{exts, write_image};
    use crate::media::normalizer::{discover_images, normalize_assets};
    use crate::timeline::overlay::OverlayKind;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        ctx: RenderContext,
    }

    fn fixture(image_count: usize) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        std::fs::create_dir_all(&images).unwrap();
        for i in 0..image_count {
            write_image(&images.join(format!("{:02}.png", i)), 40, 30);
        }
        let config = TtsReelConfig {
            video_resolution: (54, 96),
            temp_folder: Some(dir.path().to_path_buf()),
            ..TtsReelConfig::default()
        };
        let ctx = RenderContext::new(&config, dir.path().join("out").join("video.mp4")).unwrap();
        Fixture { dir, ctx }
    }

    fn normalized(fixture: &Fixture) -> NormalizationOutcome {
        let assets = discover_images(fixture.dir.path().join("images"), &exts()).unwrap();
        normalize_assets(assets, fixture.ctx.spec().resolution(), &fixture.ctx.workspace().scratch_dir())
    }

    #[tokio::test]
    async fn test_full_sequence() {
        let fixture = fixture(4);
        let audio_path = fixture.dir.path().join("speech.wav");
        write_silent_wav(&audio_path, 12.0);
        let audio = AudioTrack::load(&audio_path).unwrap();

        let mut assembler = TrackAssembler::new(&fixture.ctx);
        assert_eq!(assembler.accept_assets(normalized(&fixture)).unwrap(), 4);
        assembler.build_clips(audio.duration_seconds).unwrap();
        assembler.reconcile().unwrap();
        assembler
            .merge_overlays(&[
                CaptionSpan::new(0.0, 4.0, "Hello"),
                CaptionSpan::new(5.0, 12.0, "World"),
            ])
            .unwrap();

        let timeline = assembler.attach_audio(audio).unwrap();
        assert_eq!(timeline.duration_seconds(), 12.0);
        assert!(timeline.clips.iter().all(|c| (c.display_duration_seconds - 3.0).abs() < 1e-9));
        assert_eq!(timeline.overlays.len(), 3);
        assert_eq!(
            timeline.overlays.iter().filter(|o| o.kind == OverlayKind::Watermark).count(),
            1
        );
        assert_eq!(assembler.state(), RenderState::AudioAttached);

        let encoder = RecordingEncoder::default();
        let output = assembler.render(&encoder).await.unwrap();
        assert_eq!(assembler.state(), RenderState::Done);
        assert_eq!(output, fixture.dir.path().join("out").join("video.mp4"));
        assert!(output.exists());
        assert_eq!(encoder.calls(), 1);
    }

    #[test]
    fn test_out_of_order_transition_fails() {
        let fixture = fixture(1);
        let mut assembler = TrackAssembler::new(&fixture.ctx);

        let result = assembler.reconcile();
        assert!(matches!(result, Err(TtsReelError::Other(_))));
        assert_eq!(assembler.state(), RenderState::Failed);

        // Из Failed дальше не двигаемся
        assert!(assembler.accept_assets(normalized(&fixture)).is_err());
        assert_eq!(assembler.state(), RenderState::Failed);
    }

    #[test]
    fn test_no_assets_fails_assembler() {
        let fixture = fixture(0);
        let mut assembler = TrackAssembler::new(&fixture.ctx);
        let outcome = NormalizationOutcome::from_results(Vec::new());

        assert!(matches!(
            assembler.accept_assets(outcome),
            Err(TtsReelError::NoAssets(_))
        ));
        assert_eq!(assembler.state(), RenderState::Failed);
    }

    #[test]
    fn test_audio_mismatch_is_rejected() {
        let fixture = fixture(2);
        let mut assembler = TrackAssembler::new(&fixture.ctx);
        assembler.accept_assets(normalized(&fixture)).unwrap();
        assembler.build_clips(10.0).unwrap();
        assembler.reconcile().unwrap();
        assembler.merge_overlays(&[]).unwrap();

        let audio = AudioTrack {
            path: PathBuf::from("other.wav"),
            duration_seconds: 9.0,
        };
        assert!(matches!(
            assembler.attach_audio(audio),
            Err(TtsReelError::AudioProcessing(_))
        ));
        assert_eq!(assembler.state(), RenderState::Failed);
    }
}
