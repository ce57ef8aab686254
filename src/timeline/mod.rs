pub mod allocator;
pub mod assembler;
pub mod overlay;
pub mod reconcile;

pub use allocator::{allocate, build_clips, caption_durations, VisualClip};
pub use assembler::{CompositeTimeline, RenderState, TrackAssembler};
pub use overlay::{compose_overlays, retain_within, OverlayElement, OverlayKind};
pub use reconcile::{loop_count, reconcile, ReconciledTrack, TimelineSegment};
