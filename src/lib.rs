//! civicCast — offline mixdown engine for the municipal announcement system.
//!
//! Combines a narrated speech track, optional background music, and an
//! optional sound effect into one broadcast-ready 16-bit PCM WAV, applying
//! offsets, fades, a 3-band music EQ, and RMS auto-ducking. The CLI and the
//! management app's worker consume this crate.

pub mod ducking;
pub mod envelope;
pub mod eq;
pub mod mixdown;
pub mod renderer;
pub mod settings;
pub mod timeline;
pub mod track;
pub mod wav;
