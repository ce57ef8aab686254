//! Построение аргументов FFmpeg для согласованного видеоряда
//!
//! Каждый отрезок видеоряда подаётся отдельным зацикленным входом-картинкой
//! с точной длительностью, проходит через фильтр эффекта, затем отрезки
//! склеиваются `concat`, а оверлеи накладываются цепочкой `drawtext`.

use std::path::{Path, PathBuf};

use crate::config::{Effect, RenderSpec};
use crate::timeline::assembler::CompositeTimeline;
use crate::timeline::overlay::{Anchor, OverlayElement};
use crate::utils::ffmpeg::quote_filter_value;

/// Длительность въезда для эффектов slide
const SLIDE_SECONDS: f64 = 0.5;
/// Максимальное увеличение для эффектов zoom
const MAX_ZOOM: f64 = 1.5;

/// Фильтр эффекта для одного отрезка (без входной и выходной метки)
pub fn effect_filter(effect: Effect, duration: f64, spec: &RenderSpec) -> String {
    let (w, h) = (spec.width, spec.height);
    let frames = ((duration * spec.fps as f64).round() as u64).max(1);
    let slide = SLIDE_SECONDS.min(duration / 2.0).max(0.001);

    match effect {
        Effect::None => format!("scale={w}:{h}"),
        Effect::ZoomIn => format!(
            "scale={w2}:{h2},zoompan=z='min(1+{delta}*on/{frames},{MAX_ZOOM})':x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':d=1:s={w}x{h}:fps={fps}",
            w2 = w * 2,
            h2 = h * 2,
            delta = MAX_ZOOM - 1.0,
            fps = spec.fps,
        ),
        Effect::ZoomOut => format!(
            "scale={w2}:{h2},zoompan=z='max({MAX_ZOOM}-{delta}*on/{frames},1)':x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':d=1:s={w}x{h}:fps={fps}",
            w2 = w * 2,
            h2 = h * 2,
            delta = MAX_ZOOM - 1.0,
            fps = spec.fps,
        ),
        Effect::SlideLeft => format!(
            "scale={w}:{h},pad=w={w2}:h={h}:x={w}:y=0:color=black,crop=w={w}:h={h}:x='min({w},{w}*t/{slide:.3})':y=0",
            w2 = w * 2,
        ),
        Effect::SlideRight => format!(
            "scale={w}:{h},pad=w={w2}:h={h}:x=0:y=0:color=black,crop=w={w}:h={h}:x='max(0,{w}-{w}*t/{slide:.3})':y=0",
            w2 = w * 2,
        ),
    }
}

/// Фильтр drawtext для одного оверлея.
///
/// Окно показа полуоткрытое `[start, end)`: у стыкующихся субтитров нет
/// общего кадра.
pub fn drawtext_filter(overlay: &OverlayElement, text_file: &Path, spec: &RenderSpec) -> String {
    let px = (overlay.position.x_fraction as f64 * spec.width as f64).round() as i64;
    let py = (overlay.position.y_fraction as f64 * spec.height as f64).round() as i64;
    let (x, y) = match overlay.position.anchor {
        Anchor::Center => (format!("{px}-text_w/2"), format!("{py}-text_h/2")),
        Anchor::BottomRight => (format!("{px}-text_w"), format!("{py}-text_h")),
    };

    format!(
        "drawtext=textfile={file}:expansion=none:fontsize={size}:fontcolor={color}:borderw={bw}:bordercolor={bc}:line_spacing=8:x={x}:y={y}:enable='gte(t,{start:.3})*lt(t,{end:.3})'",
        file = quote_filter_value(&text_file.to_string_lossy()),
        size = overlay.style.font_size,
        color = overlay.style.font_color,
        bw = overlay.style.stroke_width,
        bc = overlay.style.stroke_color,
        start = overlay.start_seconds,
        end = overlay.end_seconds(),
    )
}

/// Граф фильтров целиком, выходная метка видео `[outv]`
pub fn build_filter_graph(timeline: &CompositeTimeline, text_files: &[PathBuf], spec: &RenderSpec) -> String {
    let mut filters = Vec::new();

    for (i, (segment, clip)) in timeline.segment_clips().enumerate() {
        filters.push(format!(
            "[{i}:v]{effect},setsar=1,format=yuv420p,setpts=PTS-STARTPTS[v{i}]",
            effect = effect_filter(clip.effect, segment.duration_seconds, spec),
        ));
    }

    let labels: String = (0..timeline.track.segments.len())
        .map(|i| format!("[v{i}]"))
        .collect();
    filters.push(format!(
        "{labels}concat=n={n}:v=1:a=0[base]",
        n = timeline.track.segments.len()
    ));

    let drawtexts: Vec<String> = timeline
        .overlays
        .iter()
        .zip(text_files)
        .map(|(overlay, file)| drawtext_filter(overlay, file, spec))
        .collect();
    if drawtexts.is_empty() {
        filters.push("[base]null[outv]".to_string());
    } else {
        filters.push(format!("[base]{}[outv]", drawtexts.join(",")));
    }

    filters.join(";")
}

/// Полный список аргументов FFmpeg
pub fn build_ffmpeg_args(
    timeline: &CompositeTimeline,
    text_files: &[PathBuf],
    spec: &RenderSpec,
    output: &Path,
) -> Vec<String> {
    let mut args: Vec<String> = vec!["-hide_banner".into(), "-nostdin".into(), "-y".into()];

    for (segment, clip) in timeline.segment_clips() {
        args.extend([
            "-loop".to_string(),
            "1".to_string(),
            "-framerate".to_string(),
            spec.fps.to_string(),
            "-t".to_string(),
            format!("{:.6}", segment.duration_seconds),
            "-i".to_string(),
            clip.asset.render_path().to_string_lossy().to_string(),
        ]);
    }
    let audio_index = timeline.track.segments.len();
    args.extend(["-i".to_string(), timeline.audio.path.to_string_lossy().to_string()]);

    args.extend([
        "-filter_complex".to_string(),
        build_filter_graph(timeline, text_files, spec),
        "-map".to_string(),
        "[outv]".to_string(),
        "-map".to_string(),
        format!("{audio_index}:a"),
        "-c:v".to_string(),
        spec.video_codec.clone(),
        "-b:v".to_string(),
        spec.bitrate.clone(),
        "-r".to_string(),
        spec.fps.to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-c:a".to_string(),
        spec.audio_codec.clone(),
        "-t".to_string(),
        format!("{:.6}", timeline.duration_seconds()),
    ]);

    let is_mp4_family = output
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "mp4" | "mov" | "m4v"))
        .unwrap_or(false);
    if is_mp4_family {
        args.extend(["-movflags".to_string(), "+faststart".to_string()]);
    }

    args.push(output.to_string_lossy().to_string());
    args
}

/// Перенос текста по словам под ширину кадра
pub fn wrap_text(text: &str, max_chars: usize) -> String {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}

/// Сколько символов помещается в строку при данном размере шрифта
pub fn chars_per_line(frame_width: u32, font_size: u32) -> usize {
    let glyph_width = (font_size.max(1) as f64) * 0.55;
    ((frame_width as f64 * 0.9 / glyph_width) as usize).max(8)
}
