//! Вспомогательные модули: внешние инструменты и рабочие папки

pub mod ffmpeg;
pub mod temp;
