//! Request handlers.

pub mod ai;
pub mod cases;
pub mod health;
pub mod media;
pub mod video;

pub use ai::*;
pub use cases::*;
pub use health::*;
pub use media::*;
pub use video::*;
