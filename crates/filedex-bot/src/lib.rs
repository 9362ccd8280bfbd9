//! Chat-platform adapter: the teloxide-backed `PlatformClient`, shared
//! bot state, command parsing and dispatch.

pub mod commands;
pub mod context;
pub mod dispatch;
pub mod handlers;
pub mod platform;

pub use commands::Command;
pub use context::Context;
pub use platform::TeloxidePlatform;
