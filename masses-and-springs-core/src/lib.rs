pub mod component;
pub mod config;
pub mod error;
pub mod model;
pub mod resource;
pub mod scene;
pub mod system;
pub mod util;

pub use error::{Error, Result};
pub use model::Model;

pub type Vec2 = cgmath::Vector2<f64>;
