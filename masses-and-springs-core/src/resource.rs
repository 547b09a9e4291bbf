use std::str::FromStr;

use derive_more::Display;
use legion::Entity;

use crate::config::SLOW_MOTION_DIVISOR;
use crate::error::Error;

#[derive(Clone, Debug)]
pub struct Time {
    pub elapsed_seconds: f64,
}

/// World parameters the per-mass systems need.
#[derive(Clone, Debug)]
pub struct Environment {
    pub gravity: f64,
    pub floor_y: f64,
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum SpeedMode {
    #[display(fmt = "normal")]
    Normal,
    #[display(fmt = "slow")]
    Slow,
}

impl SpeedMode {
    pub fn scale(self, dt: f64) -> f64 {
        match self {
            SpeedMode::Normal => dt,
            SpeedMode::Slow => dt / SLOW_MOTION_DIVISOR,
        }
    }
}

impl Default for SpeedMode {
    fn default() -> Self {
        SpeedMode::Normal
    }
}

impl FromStr for SpeedMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(SpeedMode::Normal),
            "slow" => Ok(SpeedMode::Slow),
            _ => Err(Error::UnknownSpeedMode(s.to_string())),
        }
    }
}

/// A place whose surface gravity can be picked instead of typing a value.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum Body {
    Moon,
    Earth,
    Jupiter,
    #[display(fmt = "Planet X")]
    PlanetX,
    #[display(fmt = "Zero G")]
    ZeroG,
    /// Whatever gravity was last set by hand.
    Custom,
}

impl Body {
    pub const ALL: [Body; 6] = [
        Body::Moon,
        Body::Earth,
        Body::Jupiter,
        Body::PlanetX,
        Body::ZeroG,
        Body::Custom,
    ];

    pub fn gravity(self) -> Option<f64> {
        match self {
            Body::Moon => Some(1.62),
            Body::Earth => Some(9.8),
            Body::Jupiter => Some(24.79),
            Body::PlanetX => Some(14.2),
            Body::ZeroG => Some(0.0),
            Body::Custom => None,
        }
    }

    /// The preset with exactly this gravity, or `Custom`.
    pub fn matching(gravity: f64) -> Body {
        Body::ALL
            .iter()
            .copied()
            .find(|body| body.gravity() == Some(gravity))
            .unwrap_or(Body::Custom)
    }
}

/// Something the presentation layer may want to react to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelEvent {
    Grabbed { mass: Entity },
    Released { mass: Entity },
    Attached { mass: Entity, spring: Entity },
    Detached { mass: Entity, spring: Entity },
}
