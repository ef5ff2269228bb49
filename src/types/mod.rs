//! Value types for bulb command parameters.

mod brightness;
mod color;
mod kelvin;
mod power;

pub use brightness::Brightness;
pub use color::Color;
pub use kelvin::Kelvin;
pub use power::PowerMode;
