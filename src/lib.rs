//! Caption Overlay - text stamping for image variants
//!
//! # Guarantees
//! 1. Originals are never written to
//! 2. Jobs are independent: one failure never stops the next
//! 3. Placement is pure geometry, testable without a font

pub mod color;
pub mod config;
pub mod placement;
pub mod render;
pub mod hashing;
pub mod logging;
pub mod pipeline;
pub mod report;

pub use color::HexColor;
pub use config::{ConfigError, Job, JobSpec, OverlayConfig};
pub use placement::{default_margin, outline_offsets, text_origin, Anchor};
pub use render::{render, CaptionLayout, RenderError, RenderOutput, RenderRequest};
pub use pipeline::{JobOutcome, OverlayPipeline};
pub use report::RunReport;

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf";
pub const DEFAULT_FONT_SIZE: u32 = 48;
pub const DEFAULT_COLOR: &str = "#FFFFFF";
pub const DEFAULT_OUTLINE_WIDTH: u32 = 2;
pub const DEFAULT_BLUR_RADIUS: f32 = 15.0;
