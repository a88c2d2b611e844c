//! Terminal UI: input handling, top-level rendering, shared styles, and
//! the per-tab views.

pub mod input;
pub mod render;
pub mod styles;
pub mod tabs;
