use legion::Entity;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    #[error("mass must be greater than zero, got {0}")]
    NonPositiveMass(f64),

    #[error("gravity must be zero or positive, got {0}")]
    NegativeGravity(f64),

    #[error("friction must be zero or positive, got {0}")]
    NegativeFriction(f64),

    #[error("spring constant {value} is outside of [{min}, {max}]")]
    SpringConstantOutOfRange { value: f64, min: f64, max: f64 },

    #[error("spring constant range [{min}, {max}] is empty or not positive")]
    InvalidSpringConstantRange { min: f64, max: f64 },

    #[error("natural resting length {value} is outside of [{min}, {max}]")]
    LengthOutOfRange { value: f64, min: f64, max: f64 },

    #[error("spring already holds mass {0:?}")]
    SpringOccupied(Entity),

    #[error("attachment between spring {spring:?} and mass {mass:?} is not mutual")]
    BrokenAttachment { spring: Entity, mass: Entity },

    #[error("mass value is not adjustable")]
    MassNotAdjustable,

    #[error("spring lengths can only be changed in the adjustable-length scene")]
    LengthNotAdjustable,

    #[error("no entity {0:?} in the world")]
    UnknownEntity(Entity),

    #[error("entity {entity:?} has no {component} component")]
    MissingComponent {
        entity: Entity,
        component: &'static str,
    },

    #[error("no spring at index {0}")]
    SpringIndex(usize),

    #[error("no mass at index {0}")]
    MassIndex(usize),

    #[error("snapshot holds {snapshot} {kind} but the model has {model}")]
    SnapshotMismatch {
        kind: &'static str,
        snapshot: usize,
        model: usize,
    },

    #[error("invalid setting for model speed: {0:?}")]
    UnknownSpeedMode(String),
}
