pub mod audio;
pub mod encoder;
pub mod filtergraph;
pub mod normalizer;

pub use audio::AudioTrack;
pub use encoder::{render_to_file, EncodeJob, FfmpegEncoder, VideoEncoder};
pub use normalizer::{discover_images, normalize_assets, ImageAsset, NormalizationOutcome};
