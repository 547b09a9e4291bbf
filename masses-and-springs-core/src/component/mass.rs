use std::f64::consts::PI;

use cgmath::{vec2, VectorSpace};
use legion::Entity;

use crate::config::{
    DEFAULT_GRAVITY, DENSITY, HEIGHT_RATIO, HOOK_HEIGHT_RATIO, RETURN_RATE, SCALING_FACTOR,
};
use crate::error::{Error, Result};
use crate::util::ease_cubic_in_out;
use crate::Vec2;

/// Where a released, unattached mass glides back to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnPath {
    /// Slide back to the starting x while keeping the current height.
    Horizontal,
    /// Slide straight back to the starting position.
    Diagonal,
}

impl Default for ReturnPath {
    fn default() -> Self {
        ReturnPath::Horizontal
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Glide {
    pub start: Vec2,
    pub end: Vec2,
    /// In [0, 1].
    pub progress: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MassState {
    /// Moved by the user, possibly while hooked on a spring.
    Held { spring: Option<Entity> },
    /// Hooked on a spring and moved by it.
    Hanging { spring: Entity },
    /// Free, under gravity, until it rests on the floor.
    Falling,
    /// Free, gliding back toward its starting column.
    Returning(Glide),
}

impl MassState {
    pub fn spring(&self) -> Option<Entity> {
        match *self {
            MassState::Held { spring } => spring,
            MassState::Hanging { spring } => Some(spring),
            MassState::Falling | MassState::Returning(_) => None,
        }
    }

    pub fn is_user_controlled(&self) -> bool {
        matches!(self, MassState::Held { .. })
    }

    pub fn is_animating(&self) -> bool {
        matches!(self, MassState::Returning(_))
    }
}

/// What an attached spring contributes to a mass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpringLoad {
    pub force: f64,
    pub elastic_energy: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Energy {
    pub kinetic: f64,
    pub gravitational: f64,
    pub elastic: f64,
    pub total: f64,
    pub thermal: f64,
}

fn radius_for(value: f64) -> f64 {
    (value / (DENSITY * HEIGHT_RATIO * PI)).sqrt() * SCALING_FACTOR
}

/// A cylindrical mass with a hook on top. `position` is the top center of the body.
#[derive(Clone, Debug, PartialEq)]
pub struct Mass {
    value: f64,
    initial_value: f64,
    adjustable: bool,

    position: Vec2,
    initial_position: Vec2,
    vertical_velocity: f64,

    gravity: f64,
    spring_force: f64,
    net_force: f64,
    acceleration: f64,

    state: MassState,
    return_path: ReturnPath,

    initial_total_energy: f64,
    energy: Energy,
}

impl Mass {
    pub fn new(value: f64, initial_position: Vec2) -> Result<Mass> {
        if !(value > 0.0 && value.is_finite()) {
            return Err(Error::NonPositiveMass(value));
        }
        let mut mass = Mass {
            value,
            initial_value: value,
            adjustable: false,
            position: initial_position,
            initial_position,
            vertical_velocity: 0.0,
            gravity: DEFAULT_GRAVITY,
            spring_force: 0.0,
            net_force: 0.0,
            acceleration: 0.0,
            state: MassState::Falling,
            return_path: ReturnPath::default(),
            initial_total_energy: 0.0,
            energy: Energy::default(),
        };
        mass.update(SpringLoad::default());
        mass.zero_thermal_energy();
        Ok(mass)
    }

    /// Allows the mass value to be changed with [`Mass::set_value`].
    pub fn adjustable(mut self) -> Mass {
        self.adjustable = true;
        self
    }

    pub fn with_return_path(mut self, return_path: ReturnPath) -> Mass {
        self.return_path = return_path;
        self
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_adjustable(&self) -> bool {
        self.adjustable
    }

    pub fn radius(&self) -> f64 {
        radius_for(self.value)
    }

    pub fn cylinder_height(&self) -> f64 {
        self.radius() * HEIGHT_RATIO
    }

    pub fn hook_height(&self) -> f64 {
        self.radius() * HOOK_HEIGHT_RATIO
    }

    pub fn total_height(&self) -> f64 {
        self.cylinder_height() + self.hook_height()
    }

    /// Height of the mass when it rests on its shelf.
    pub fn zero_reference_point(&self) -> f64 {
        -self.cylinder_height() / 2.0
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn initial_position(&self) -> Vec2 {
        self.initial_position
    }

    pub fn vertical_velocity(&self) -> f64 {
        self.vertical_velocity
    }

    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    pub fn spring_force(&self) -> f64 {
        self.spring_force
    }

    pub fn net_force(&self) -> f64 {
        self.net_force
    }

    pub fn gravity(&self) -> f64 {
        self.gravity
    }

    pub fn state(&self) -> MassState {
        self.state
    }

    pub fn spring(&self) -> Option<Entity> {
        self.state.spring()
    }

    pub fn is_user_controlled(&self) -> bool {
        self.state.is_user_controlled()
    }

    pub fn is_animating(&self) -> bool {
        self.state.is_animating()
    }

    pub fn return_path(&self) -> ReturnPath {
        self.return_path
    }

    pub fn initial_total_energy(&self) -> f64 {
        self.initial_total_energy
    }

    pub fn energy(&self) -> Energy {
        self.energy
    }

    pub fn set_value(&mut self, value: f64) -> Result<()> {
        if !self.adjustable {
            return Err(Error::MassNotAdjustable);
        }
        if !(value > 0.0 && value.is_finite()) {
            return Err(Error::NonPositiveMass(value));
        }
        self.value = value;
        Ok(())
    }

    /// Advances a free mass by one tick. Held and hanging masses are moved by someone else.
    pub fn step(&mut self, gravity: f64, floor_y: f64, dt: f64) {
        let floor_position = floor_y + self.total_height();
        let mut finished_glide = false;
        match &mut self.state {
            MassState::Returning(glide) => {
                glide.progress = (glide.progress + dt * RETURN_RATE).min(1.0);
                let ratio = ease_cubic_in_out(glide.progress);
                self.position = glide.start.lerp(glide.end, ratio);
                finished_glide = glide.progress >= 1.0;
            }
            MassState::Falling => {
                let old_y = self.position.y;
                if old_y != floor_position {
                    let new_velocity = self.vertical_velocity - gravity * dt;
                    let new_y = old_y + (self.vertical_velocity + new_velocity) * dt / 2.0;
                    if new_y < floor_position {
                        // Landed.
                        self.position.y = floor_position;
                        self.vertical_velocity = 0.0;
                    } else {
                        self.position.y = new_y;
                        self.vertical_velocity = new_velocity;
                    }
                }
            }
            MassState::Held { .. } | MassState::Hanging { .. } => {}
        }
        if finished_glide {
            self.state = MassState::Falling;
        }
    }

    pub fn detach(&mut self) {
        self.vertical_velocity = 0.0;
        self.transition(self.is_user_controlled(), None, SpringLoad::default());
    }

    pub fn reset(&mut self) {
        self.position = self.initial_position;
        self.state = MassState::Falling;
        self.vertical_velocity = 0.0;
        if self.adjustable {
            self.value = self.initial_value;
        }
        self.update(SpringLoad::default());
        self.zero_thermal_energy();
    }

    /// Makes the current mechanical energy the new baseline for heat bookkeeping.
    pub fn zero_thermal_energy(&mut self) {
        self.initial_total_energy =
            self.energy.kinetic + self.energy.gravitational + self.energy.elastic;
        self.energy.thermal = if self.is_user_controlled() {
            0.0
        } else {
            self.initial_total_energy - self.energy.total
        };
    }

    /// The single place where user control and attachment change. `load` describes the spring
    /// named by `spring`, if any.
    pub(crate) fn transition(
        &mut self,
        user_controlled: bool,
        spring: Option<Entity>,
        load: SpringLoad,
    ) {
        let was_user_controlled = self.is_user_controlled();
        let previous_spring = self.spring();
        let was_free = !was_user_controlled && previous_spring.is_none();

        self.state = match (user_controlled, spring) {
            (true, spring) => MassState::Held { spring },
            (false, Some(spring)) => MassState::Hanging { spring },
            (false, None) if was_free => self.state,
            (false, None) => MassState::Returning(self.glide_home()),
        };

        if user_controlled && !was_user_controlled {
            self.vertical_velocity = 0.0;
        }

        self.update(load);

        let released = was_user_controlled && !user_controlled;
        let attached = spring.is_some() && spring != previous_spring;
        if released || attached {
            self.zero_thermal_energy();
        }
    }

    /// Recomputes forces, then energies, then heat, from the current motion.
    pub(crate) fn update(&mut self, load: SpringLoad) {
        let attached = self.spring().is_some();
        let user_controlled = self.is_user_controlled();

        self.spring_force = if attached { load.force } else { 0.0 };
        self.net_force = self.spring_force - self.value * self.gravity;
        self.acceleration = self.net_force / self.value;

        let kinetic = if user_controlled {
            0.0
        } else {
            0.5 * self.value * self.vertical_velocity * self.vertical_velocity
        };
        let height_from_zero =
            self.position.y - self.zero_reference_point() - self.total_height();
        let gravitational = self.value * self.gravity * height_from_zero;
        let elastic = if attached { load.elastic_energy } else { 0.0 };
        let total = kinetic + gravitational + elastic;
        let thermal = if user_controlled {
            0.0
        } else {
            self.initial_total_energy - total
        };

        self.energy = Energy {
            kinetic,
            gravitational,
            elastic,
            total,
            thermal,
        };
    }

    pub(crate) fn set_gravity(&mut self, gravity: f64) {
        self.gravity = gravity;
    }

    pub(crate) fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub(crate) fn follow_spring(&mut self, position: Vec2, vertical_velocity: f64) {
        self.position = position;
        self.vertical_velocity = vertical_velocity;
    }

    fn glide_home(&self) -> Glide {
        let end = match self.return_path {
            ReturnPath::Horizontal => vec2(self.initial_position.x, self.position.y),
            ReturnPath::Diagonal => self.initial_position,
        };
        Glide {
            start: self.position,
            end,
            progress: 0.0,
        }
    }
}
