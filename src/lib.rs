#![allow(clippy::manual_unwrap_or_default)]
#![allow(clippy::manual_unwrap_or)]

pub mod chat;
pub mod client;
pub mod console;
pub mod constants;
pub mod cot;
pub mod envelope;
pub mod logging;
pub mod main_helper;
pub mod markdown;
pub mod progress;
pub mod redaction_layer;
pub mod round;
pub mod sources;
pub mod sse;
pub mod str_utils;
pub mod streaming;
pub mod types;

pub use types::*;

pub use main_helper::Args;
