#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod marks_dump;
pub mod overlay;
pub mod pipeline;
pub mod render;
pub mod scene;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use error::{Result, SomError};
pub use overlay::SetOfMarks;
pub use scene::{Scene, SceneProvider};
