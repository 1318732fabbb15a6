//! Interactive drawing marks for financial charts.
//!
//! Marks are geometric annotations (trend lines, channels, pitchforks,
//! fibonacci tools, harmonic patterns, text) anchored in chart domain space:
//! a bar time plus a price. The host charting engine supplies coordinate
//! conversions through a [`bridge::CoordinateBridge`]; this crate owns the
//! marks, their hit-testing and rendering, and the placement/drag/adjust
//! state machine that turns pointer events into edits. Everything runs
//! synchronously on the UI thread.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`orchestrator`] | One manager per kind, active-tool exclusion, undo/redo history |
//! | [`manager`] | Generic placement/drag/adjust state machine for one kind |
//! | [`mark`] | The generic mark: anchors, style, flags, hit-testing, drag |
//! | [`kind`] | Mark kinds and their anchor/phase/parameter descriptors |
//! | [`shape`] | Per-kind pixel geometry, regression and sector math |
//! | [`render`] | `Surface` trait, render intents, pane view drawing |
//! | [`bridge`] | Host engine boundary and a linear reference bridge |
//! | [`input`] | Keys, placement phases, handles, manager states |
//! | [`style`] | Line styles, mark styles, sparse style updates |
//! | [`geom`] | Points, bounds, distance math |
//! | [`time`] | Bar timestamps and their labels |
//! | [`config`] | Thresholds and defaults, from JSON or the environment |
//! | [`consts`] | Shared numeric constants |
//! | `web` | Canvas 2D surface (feature `web`) |

pub mod bridge;
pub mod config;
pub mod consts;
pub mod geom;
pub mod input;
pub mod kind;
pub mod manager;
pub mod mark;
pub mod orchestrator;
pub mod render;
pub mod shape;
pub mod style;
pub mod time;
#[cfg(feature = "web")]
pub mod web;
