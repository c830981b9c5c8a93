//! Ducking mix core
//!
//! Pure, deterministic functions over [`AudioBuffer`](crate::engine::AudioBuffer):
//! plan a [`DuckTimeline`], loop the bed to length, compose the enveloped bed
//! with the narration on top, and render the finished mix.

pub mod compositor;
pub mod extender;
pub mod renderer;
pub mod timeline;

pub use compositor::compose;
pub use extender::{extend, extend_frames};
pub use renderer::{render, MixRequest, MixResult};
pub use timeline::{DuckTimeline, Segment, SegmentKind, SegmentReport, TimelineReport};
