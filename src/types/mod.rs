pub mod asset;
pub mod chart;
pub mod price;
pub mod tick;

pub use asset::*;
pub use chart::*;
pub use price::*;
pub use tick::*;
