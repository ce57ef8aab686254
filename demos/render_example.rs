//! Пример рендера ролика из готовой озвучки и папки изображений
//!
//! Запуск:
//! `cargo run --example render_example -- speech.mp3 images/ out.mp4 [subtitles.srt]`
//!
//! Конфигурация читается из `config.json`; при его отсутствии файл создаётся
//! с настройками по умолчанию.

use std::path::PathBuf;

use anyhow::{bail, Context};
use tts_reel::notification::{CompositeProgressObserver, ConsoleProgressObserver, FileProgressObserver};
use tts_reel::progress::{DefaultProgressReporter, ProgressReporter};
use tts_reel::utils::ffmpeg::{check_ffmpeg_installed, get_ffmpeg_version};
use tts_reel::{TtsReel, TtsReelConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        bail!("usage: render_example <audio> <image_dir> <output> [subtitles]");
    }
    let audio = PathBuf::from(&args[0]);
    let images = PathBuf::from(&args[1]);
    let output = PathBuf::from(&args[2]);
    let subtitles = args.get(3).map(PathBuf::from);

    let config = TtsReelConfig::load_or_create("config.json").context("failed to load config.json")?;
    if !check_ffmpeg_installed(&config.ffmpeg_path) {
        bail!("ffmpeg not found at '{}'", config.ffmpeg_path);
    }
    println!("Используется {}", get_ffmpeg_version(&config.ffmpeg_path)?);

    let mut observers = CompositeProgressObserver::new();
    observers.add_observer(Box::new(ConsoleProgressObserver::with_prefix("[tts-reel] ")));
    observers.add_observer(Box::new(FileProgressObserver::new("progress.log")));
    let mut reporter = DefaultProgressReporter::new();
    reporter.add_observer(Box::new(observers));

    let reel = TtsReel::with_progress_reporter(config, Box::new(reporter));
    let path = reel
        .render(&audio, &images, subtitles.as_deref(), &output)
        .await
        .with_context(|| format!("failed to render {}", output.display()))?;

    println!("Готово: {}", path.display());
    Ok(())
}
