//! # nixiepipe
//!
//! Async host-side driver for Nixie Pipe USB display arrays.
//!
//! The device speaks a fixed-framing binary protocol over a USB serial link:
//! `[length:1][command:1][payload:length]`, one command in flight at a time.
//! This crate turns typed display operations (set number, set colour, set
//! brightness, query state) into that protocol, serializes concurrent callers
//! through a single-outstanding-command queue, and decodes inbound frames
//! into typed events.
//!
//! ## Architecture
//!
//! - **Protocol** ([`protocol`]): pure frame codec and the command-code
//!   enumeration
//! - **Queue** ([`queue`]): at-most-one-outstanding command discipline
//! - **Session** ([`session`]): handshake state machine and per-connection
//!   state
//! - **Transport** ([`transport`]): serial port discovery and opening
//! - **Facade** ([`Device`]): one operation per protocol command, driven by
//!   a single I/O task
//!
//! ## Example
//!
//! ```ignore
//! use nixiepipe::Device;
//!
//! #[tokio::main]
//! async fn main() -> nixiepipe::Result<()> {
//!     // Auto-detects the device by USB descriptor.
//!     let device = Device::builder().connect().await?;
//!     println!("firmware {}", device.firmware_version());
//!
//!     device.set_number(9999)?;
//!     device.set_colour(0, 0, 255)?;
//!     device.show()?;
//!
//!     let shown = device.get_number().await?;
//!     assert_eq!(shown, 9999);
//!     Ok(())
//! }
//! ```
//!
//! Display changes are staged by the firmware until [`Device::show`] is sent.

pub mod error;
pub mod event;
pub mod protocol;
pub mod queue;
pub mod session;
pub mod transport;

mod device;
mod dispatch;

pub use device::{Device, DeviceBuilder, DEFAULT_CONNECT_TIMEOUT, DEFAULT_RESPONSE_TIMEOUT};
pub use error::{PipeError, Result};
pub use event::Event;
