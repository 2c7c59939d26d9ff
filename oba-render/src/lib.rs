pub mod dots;
pub mod render;

pub use dots::random_dot_patch;
pub use render::StimulusRenderer;
