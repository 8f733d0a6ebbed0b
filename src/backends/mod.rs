// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for camera capture
//!
//! Hardware access lives here so the scanner only ever sees a
//! [`camera::CameraBackend`] handing out live streams:
//!
//! ```text
//! ┌──────────────────────────────┐
//! │        Scanner engine         │
//! └──────────────┬───────────────┘
//!                │
//! ┌──────────────┴───────────────┐
//! │         Backend layer         │
//! │  ┌────────┐  ┌─────────────┐ │
//! │  │  V4L2  │  │ File source │ │
//! │  └────────┘  └─────────────┘ │
//! └──────────────────────────────┘
//! ```

pub mod camera;
