//! Tillscan Capture
//!
//! Barcode capture sessions: acquire a camera, run a decode loop against
//! it, report codes to the hosting UI under a configurable scan policy, and
//! release every resource on every exit path.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                 CaptureSession                   │
//! │  ┌───────────────┐  ┌──────────────┐  ┌────────┐ │
//! │  │ MediaProvider │─▶│ VideoSurface │─▶│ Decode │ │
//! │  │  (camera)     │  │  (binding)   │  │ Engine │ │
//! │  └───────────────┘  └──────────────┘  └───┬────┘ │
//! │                                           │ticks │
//! │        latch / policy / teardown ◀────────┘      │
//! │                   │                              │
//! │                   ▼                              │
//! │              ScanHost (UI)                       │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! States: `Idle → Acquiring → Streaming → Reporting → (Streaming | Idle)`,
//! and any state returns to `Idle` on close or host dismissal.

pub mod decode;
pub mod device;
pub mod error;
pub mod frames;
pub mod host;
pub mod qr;
pub mod scripted;
pub mod session;
pub mod surface;

pub use decode::{CancelHandle, DecodeEngine, DecodeSubscription, DecodeTick};
pub use device::{Frame, Haptics, MediaProvider, MediaStream, VideoConstraints};
pub use error::{AcquireError, ErrorKind, ScanError};
pub use frames::FrameDirectoryProvider;
pub use host::{DismissHandle, ScanHost, ScanSource, ScannedCode};
pub use qr::QrDecodeEngine;
pub use session::*;
pub use surface::VideoSurface;
pub use tillscan_common::config::{DecodeFaultPolicy, FacingMode, ScanPolicy};
