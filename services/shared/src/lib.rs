pub mod combination;
pub mod constants;
pub mod pattern;
pub mod types;

pub use combination::*;
pub use constants::*;
pub use pattern::*;
pub use types::*;
