//! Color values used for target initialization and clears.

mod color;

pub use color::Color;
