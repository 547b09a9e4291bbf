mod mass;
mod spring;

pub use mass::{Energy, Glide, Mass, MassState, ReturnPath, SpringLoad};
pub use spring::{spring_constant_for, thickness_for, Spring};
