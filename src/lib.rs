#![doc = include_str!("../README.md")]

//! # Core Concepts
//!
//! - **`EpisodicController`**: Drives one device through ON/OFF cycling episodes on its own worker thread
//! - **`PhaseDevice`**: Trait to implement for your output hardware (ON and OFF effects)
//! - **`Phase`** / **`RunState`**: The commanded device phase and whether an episode is active
//! - **`Buzzer`** / **`Backlight`**: Ready-made devices for a GPIO buzzer and an RGB backlight
//! - **`ColorHandle`**: Shared handle for configuring the backlight blink color between episodes
//! - **`Command`**: The text protocol (`start` / `stop` / `rate <millis>`) servers accept
//! - **`CommandServer`**: Single-client TCP listener dispatching commands onto a controller
//!
//! An episode always opens with an ON phase and the device is guaranteed OFF
//! whenever no episode is active, so callers can start and stop cycling at
//! any moment without leaving hardware stuck on.

// Re-export Srgb from palette for user convenience
pub use palette::Srgb;

pub mod colors;
pub mod command;
pub mod controller;
pub mod device;
pub mod server;

pub use command::{Command, CommandError};
pub use controller::{
    ControllerError, DeviceError, EpisodicController, Phase, PhaseDevice, RunState,
};
#[cfg(feature = "hardware")]
pub use device::Buzzer;
pub use device::{Backlight, BacklightPanel, ColorHandle};
pub use server::{CommandServer, ServerError};
