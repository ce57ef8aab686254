//! Субтитры: разбор SRT и выравнивание временных меток

pub mod parser;
pub mod analyzer;

pub use parser::{CaptionSpan, parse_srt, load_captions};
pub use analyzer::{TimingMetrics, analyze_caption_timing, resolve_overlaps};
