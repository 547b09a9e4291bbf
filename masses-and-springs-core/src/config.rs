use cgmath::vec2;

use crate::component::ReturnPath;
use crate::Vec2;

/// Mass body geometry.
pub const DENSITY: f64 = 80.0;
pub const HEIGHT_RATIO: f64 = 2.5;
pub const HOOK_HEIGHT_RATIO: f64 = 0.75;
pub const SCALING_FACTOR: f64 = 4.0;

/// Horizontal and vertical distance within which a dragged mass snags a spring.
pub const GRABBING_DISTANCE: f64 = 0.1;
/// Horizontal distance past which a dragged mass lets go of its spring.
pub const DROPPING_DISTANCE: f64 = 0.1;

/// Steps longer than this are treated as the frame driver having been suspended.
pub const MAX_STEP_SECONDS: f64 = 1.0;
/// Nominal step used for manual frame advance.
pub const STEP_FORWARD_SECONDS: f64 = 1.0 / 60.0;
pub const SLOW_MOTION_DIVISOR: f64 = 8.0;

/// Return glide speed, in progress units per second.
pub const RETURN_RATE: f64 = 2.0;

pub const DEFAULT_GRAVITY: f64 = 9.8;
pub const DEFAULT_FRICTION: f64 = 0.2;

pub const DEFAULT_SPRING_LENGTH: f64 = 0.5;
pub const SPRING_LENGTH_RANGE: (f64, f64) = (0.1, 0.5);
pub const DEFAULT_SPRING_CONSTANT: f64 = 9.0;
pub const SPRING_CONSTANT_RANGE: (f64, f64) = (5.0, 15.0);

/// Maps `spring_constant * length` onto a drawn coil thickness; the defaults give a thickness of 3.
pub const THICKNESS_SCALE: f64 = 3.0 / (DEFAULT_SPRING_CONSTANT * DEFAULT_SPRING_LENGTH);

/// Stand-in inertia for a spring recoiling with nothing hung from it.
pub const UNLOADED_SPRING_MASS: f64 = 0.01;
/// Below this displacement and velocity an unloaded spring is considered at rest.
pub const SPRING_REST_TOLERANCE: f64 = 1.0e-4;

pub const FLOOR_Y: f64 = 0.0;
pub const CEILING_Y: f64 = 1.23;

#[derive(Clone, Debug, PartialEq)]
pub struct SpringSpec {
    pub anchor: Vec2,
    pub natural_resting_length: f64,
    pub spring_constant: f64,
    pub spring_constant_range: (f64, f64),
}

impl SpringSpec {
    pub fn hanging_from_ceiling(x: f64) -> SpringSpec {
        SpringSpec {
            anchor: vec2(x, CEILING_Y),
            natural_resting_length: DEFAULT_SPRING_LENGTH,
            spring_constant: DEFAULT_SPRING_CONSTANT,
            spring_constant_range: SPRING_CONSTANT_RANGE,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MassSpec {
    pub value: f64,
    pub initial_position: Vec2,
    pub adjustable: bool,
}

impl MassSpec {
    pub fn fixed(value: f64, initial_position: Vec2) -> MassSpec {
        MassSpec {
            value,
            initial_position,
            adjustable: false,
        }
    }

    pub fn adjustable(value: f64, initial_position: Vec2) -> MassSpec {
        MassSpec {
            value,
            initial_position,
            adjustable: true,
        }
    }
}

/// Everything needed to build a [`Model`](crate::Model).
#[derive(Clone, Debug, PartialEq)]
pub struct ModelConfig {
    pub gravity: f64,
    pub friction: f64,
    pub playing: bool,
    pub floor_y: f64,
    pub ceiling_y: f64,
    pub grabbing_distance: f64,
    pub dropping_distance: f64,
    pub return_path: ReturnPath,
    pub springs: Vec<SpringSpec>,
    pub masses: Vec<MassSpec>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            gravity: DEFAULT_GRAVITY,
            friction: DEFAULT_FRICTION,
            playing: true,
            floor_y: FLOOR_Y,
            ceiling_y: CEILING_Y,
            grabbing_distance: GRABBING_DISTANCE,
            dropping_distance: DROPPING_DISTANCE,
            return_path: ReturnPath::default(),
            springs: vec![
                SpringSpec::hanging_from_ceiling(0.50),
                SpringSpec::hanging_from_ceiling(0.80),
            ],
            masses: vec![
                MassSpec::fixed(0.250, vec2(0.30, 0.5)),
                MassSpec::fixed(0.100, vec2(0.40, 0.5)),
                MassSpec::fixed(0.050, vec2(0.49, 0.5)),
                MassSpec::fixed(0.200, vec2(0.80, 0.5)),
                MassSpec::fixed(0.150, vec2(0.90, 0.5)),
                MassSpec::fixed(0.075, vec2(0.98, 0.5)),
            ],
        }
    }
}
