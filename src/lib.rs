//! bedmix - Timeline-Based Ducking Compositor
//!
//! Mixes a narration clip over a background bed, lowering the bed while the
//! narration plays and fading the whole mix out at the end.
//!
//! # Architecture
//!
//! - [`engine`]: immutable [`AudioBuffer`](engine::AudioBuffer), gain
//!   envelopes, file import/export and format conforming
//! - [`mix`]: the pure core (timeline planning, bed looping, composition,
//!   rendering)
//! - [`synthesis`]: narration sources, including the ElevenLabs client
//! - [`job`]: one end-to-end mix from files and a narration source
//! - [`server`] / [`cli`]: the HTTP service and command-line surfaces
//!
//! ```
//! use bedmix::config::MixSettings;
//! use bedmix::engine::{generate_test_tone, AudioBuffer};
//! use bedmix::mix::{render, MixRequest};
//!
//! let bed = generate_test_tone(110.0, 0.5, 10_000, 8_000, 2);
//! let narration = AudioBuffer::silence(16_000, 2, 8_000);
//! let result = render(&MixRequest::new(bed, narration, MixSettings::default())).unwrap();
//! assert_eq!(result.duration_ms(), 9_500.0);
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod job;
pub mod mix;
#[cfg(feature = "server")]
pub mod server;
pub mod synthesis;

pub use config::{Config, MixSettings};
pub use engine::AudioBuffer;
pub use error::{MixError, Result};
pub use mix::{render, DuckTimeline, MixRequest, MixResult};
