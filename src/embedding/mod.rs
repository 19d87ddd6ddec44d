pub mod embed;
pub mod hub;
pub mod model;

pub use embed::*;
pub use hub::*;
pub use model::*;
