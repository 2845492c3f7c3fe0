//! Engine-agnostic building blocks shared by the Lightfield host.
//!
//! Nothing in here knows about manifests, drawings or HTTP. The host binary
//! composes these pieces: `time` drives frames, `scanner` spreads long work
//! across frames, `color` turns decoded pixels into palettes and `curve`
//! evaluates designer-tunable response curves.

pub mod color;
pub mod curve;
pub mod scanner;
pub mod time;
