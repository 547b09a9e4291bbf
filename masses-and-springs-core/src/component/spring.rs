use cgmath::vec2;
use legion::Entity;
use tracing::trace;

use crate::component::SpringLoad;
use crate::config::{
    SpringSpec, SPRING_LENGTH_RANGE, SPRING_REST_TOLERANCE, THICKNESS_SCALE, UNLOADED_SPRING_MASS,
};
use crate::error::{Error, Result};
use crate::Vec2;

/// Relative distance from critical damping inside which the critical solution is used.
const CRITICAL_TOLERANCE: f64 = 1.0e-9;

/// Coil thickness of a spring with the given length and stiffness.
pub fn thickness_for(length: f64, spring_constant: f64) -> f64 {
    spring_constant * length * THICKNESS_SCALE
}

/// Inverse of [`thickness_for`].
pub fn spring_constant_for(length: f64, thickness: f64) -> f64 {
    thickness / (length * THICKNESS_SCALE)
}

fn check_spring_constant(spring_constant: f64, (min, max): (f64, f64)) -> Result<()> {
    if (min..=max).contains(&spring_constant) {
        Ok(())
    } else {
        Err(Error::SpringConstantOutOfRange {
            value: spring_constant,
            min,
            max,
        })
    }
}

fn check_length(length: f64) -> Result<()> {
    let (min, max) = SPRING_LENGTH_RANGE;
    if (min..=max).contains(&length) {
        Ok(())
    } else {
        Err(Error::LengthOutOfRange {
            value: length,
            min,
            max,
        })
    }
}

/// Advances `u'' + gamma u' + omega0_sq u = 0` by `t` from `(u0, v0)` using the closed form
/// solution, returning the new `(u, u')`.
fn damped_motion(u0: f64, v0: f64, omega0_sq: f64, gamma: f64, t: f64) -> (f64, f64) {
    let half = gamma / 2.0;
    let discriminant = half * half - omega0_sq;
    let decay = (-half * t).exp();

    if discriminant.abs() <= CRITICAL_TOLERANCE * omega0_sq {
        let b = v0 + half * u0;
        let u = decay * (u0 + b * t);
        let v = decay * (b - half * (u0 + b * t));
        (u, v)
    } else if discriminant < 0.0 {
        let omega = (-discriminant).sqrt();
        let (sin, cos) = (omega * t).sin_cos();
        let b = (v0 + half * u0) / omega;
        let oscillation = u0 * cos + b * sin;
        let u = decay * oscillation;
        let v = decay * (-half * oscillation + omega * (b * cos - u0 * sin));
        (u, v)
    } else {
        let root = discriminant.sqrt();
        let r1 = -half + root;
        let r2 = -half - root;
        let c2 = (r1 * u0 - v0) / (r1 - r2);
        let c1 = u0 - c2;
        let e1 = (r1 * t).exp();
        let e2 = (r2 * t).exp();
        (c1 * e1 + c2 * e2, r1 * c1 * e1 + r2 * c2 * e2)
    }
}

/// An ideal damped spring hanging from a fixed anchor.
///
/// `displacement` is measured along +y, so the bottom of the spring sits at
/// `anchor.y - natural_resting_length + displacement` and a spring stretched downward has a
/// negative displacement.
#[derive(Clone, Debug, PartialEq)]
pub struct Spring {
    position: Vec2,
    natural_resting_length: f64,
    spring_constant: f64,
    spring_constant_range: (f64, f64),
    damping_coefficient: f64,
    gravity: f64,
    thickness: f64,

    displacement: f64,
    velocity: f64,
    equilibrium_position: f64,
    animating: bool,

    mass: Option<Entity>,
    mass_value: f64,

    initial: SpringSpec,
    initial_gravity: f64,
    initial_damping_coefficient: f64,
}

impl Spring {
    /// Builds a spring at rest at its natural length. The constant must lie in its range and the
    /// length in [`SPRING_LENGTH_RANGE`].
    pub fn new(spec: &SpringSpec, gravity: f64, damping_coefficient: f64) -> Result<Spring> {
        let (min, max) = spec.spring_constant_range;
        if !(min > 0.0 && min <= max && max.is_finite()) {
            return Err(Error::InvalidSpringConstantRange { min, max });
        }
        check_spring_constant(spec.spring_constant, spec.spring_constant_range)?;
        check_length(spec.natural_resting_length)?;
        Ok(Spring::build(spec, gravity, damping_coefficient))
    }

    fn build(spec: &SpringSpec, gravity: f64, damping_coefficient: f64) -> Spring {
        let mut spring = Spring {
            position: spec.anchor,
            natural_resting_length: spec.natural_resting_length,
            spring_constant: spec.spring_constant,
            spring_constant_range: spec.spring_constant_range,
            damping_coefficient,
            gravity,
            thickness: thickness_for(spec.natural_resting_length, spec.spring_constant),
            displacement: 0.0,
            velocity: 0.0,
            equilibrium_position: 0.0,
            animating: false,
            mass: None,
            mass_value: 0.0,
            initial: spec.clone(),
            initial_gravity: gravity,
            initial_damping_coefficient: damping_coefficient,
        };
        spring.update_equilibrium();
        spring
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn natural_resting_length(&self) -> f64 {
        self.natural_resting_length
    }

    pub fn spring_constant(&self) -> f64 {
        self.spring_constant
    }

    pub fn spring_constant_range(&self) -> (f64, f64) {
        self.spring_constant_range
    }

    pub fn damping_coefficient(&self) -> f64 {
        self.damping_coefficient
    }

    pub fn gravity(&self) -> f64 {
        self.gravity
    }

    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    pub fn displacement(&self) -> f64 {
        self.displacement
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn equilibrium_position(&self) -> f64 {
        self.equilibrium_position
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    pub fn mass(&self) -> Option<Entity> {
        self.mass
    }

    /// y of the free end, where a mass hooks on.
    pub fn bottom(&self) -> f64 {
        self.position.y - self.natural_resting_length + self.displacement
    }

    pub fn bottom_position(&self) -> Vec2 {
        vec2(self.position.x, self.bottom())
    }

    pub fn spring_force(&self) -> f64 {
        -self.spring_constant * self.displacement
    }

    pub fn elastic_potential_energy(&self) -> f64 {
        0.5 * self.spring_constant * self.displacement * self.displacement
    }

    pub fn load(&self) -> SpringLoad {
        SpringLoad {
            force: self.spring_force(),
            elastic_energy: self.elastic_potential_energy(),
        }
    }

    /// Hooks a mass on without moving it: the displacement is taken from where the mass is.
    ///
    /// A spring holds one mass at a time; an occupied spring rejects the new one.
    pub fn add_mass(
        &mut self,
        mass: Entity,
        mass_value: f64,
        mass_y: f64,
        mass_velocity: f64,
    ) -> Result<()> {
        if let Some(existing) = self.mass {
            return Err(Error::SpringOccupied(existing));
        }
        self.mass = Some(mass);
        self.mass_value = mass_value;
        self.displacement = mass_y - (self.position.y - self.natural_resting_length);
        self.velocity = mass_velocity;
        self.animating = true;
        self.update_equilibrium();
        Ok(())
    }

    /// Unhooks the mass, if any. The spring keeps moving and recoils on its own.
    pub fn remove_mass(&mut self) -> Option<Entity> {
        let mass = self.mass.take();
        self.mass_value = 0.0;
        self.animating = true;
        self.update_equilibrium();
        mass
    }

    /// Advances the spring by `dt` seconds with the exact damped-oscillator solution.
    pub fn oscillate(&mut self, dt: f64) {
        if self.mass.is_some() {
            let rest = self.equilibrium_displacement();
            let (u, v) = damped_motion(
                self.displacement - rest,
                self.velocity,
                self.spring_constant / self.mass_value,
                self.damping_coefficient / self.mass_value,
                dt,
            );
            self.displacement = rest + u;
            self.velocity = v;
            self.animating = true;
        } else if self.animating {
            // Nothing hung from it: recoil critically damped so it settles without ringing.
            let omega0_sq = self.spring_constant / UNLOADED_SPRING_MASS;
            let (x, v) = damped_motion(
                self.displacement,
                self.velocity,
                omega0_sq,
                2.0 * omega0_sq.sqrt(),
                dt,
            );
            if x.abs() < SPRING_REST_TOLERANCE && v.abs() < SPRING_REST_TOLERANCE {
                trace!("spring came to rest");
                self.stop();
                return;
            }
            self.displacement = x;
            self.velocity = v;
        }
        self.update_equilibrium();
    }

    /// Stops the spring dead at its natural length.
    pub fn stop(&mut self) {
        self.displacement = 0.0;
        self.velocity = 0.0;
        self.animating = false;
        self.update_equilibrium();
    }

    pub fn set_spring_constant(&mut self, spring_constant: f64) -> Result<()> {
        check_spring_constant(spring_constant, self.spring_constant_range)?;
        self.spring_constant = spring_constant;
        self.update_equilibrium();
        Ok(())
    }

    pub fn set_natural_resting_length(&mut self, length: f64) -> Result<()> {
        check_length(length)?;
        self.natural_resting_length = length;
        self.update_equilibrium();
        Ok(())
    }

    /// Sets the thickness that a spring of this length and stiffness is drawn with.
    pub fn update_thickness(&mut self, length: f64, spring_constant: f64) {
        self.thickness = thickness_for(length, spring_constant);
    }

    /// Sets the stiffness that a spring of this length and thickness has, clamped to the spring's
    /// range.
    pub fn update_spring_constant(&mut self, length: f64, thickness: f64) {
        let (min, max) = self.spring_constant_range;
        self.spring_constant = spring_constant_for(length, thickness).max(min).min(max);
        self.update_equilibrium();
    }

    pub fn reset(&mut self) {
        *self = Spring::build(
            &self.initial,
            self.initial_gravity,
            self.initial_damping_coefficient,
        );
    }

    /// Puts the spring constant back to its starting value and redraws the thickness to match.
    pub(crate) fn reset_spring_constant(&mut self) {
        self.spring_constant = self.initial.spring_constant;
        self.update_thickness(self.natural_resting_length, self.spring_constant);
        self.update_equilibrium();
    }

    /// Puts the thickness back to its starting value and derives the spring constant from it.
    pub(crate) fn reset_thickness(&mut self) {
        self.thickness = thickness_for(
            self.initial.natural_resting_length,
            self.initial.spring_constant,
        );
        self.update_spring_constant(self.natural_resting_length, self.thickness);
    }

    pub(crate) fn set_gravity(&mut self, gravity: f64) {
        self.gravity = gravity;
        self.update_equilibrium();
    }

    pub(crate) fn set_damping_coefficient(&mut self, damping_coefficient: f64) {
        self.damping_coefficient = damping_coefficient;
    }

    pub(crate) fn set_mass_value(&mut self, mass_value: f64) {
        if self.mass.is_some() {
            self.mass_value = mass_value;
            self.update_equilibrium();
        }
    }

    /// Stretches the spring so its bottom sits at `y`, at rest. Used while a hung mass is dragged.
    pub(crate) fn set_bottom(&mut self, y: f64) {
        self.displacement = y - (self.position.y - self.natural_resting_length);
        self.velocity = 0.0;
        self.animating = true;
        self.update_equilibrium();
    }

    pub(crate) fn set_velocity(&mut self, velocity: f64) {
        self.velocity = velocity;
    }

    fn equilibrium_displacement(&self) -> f64 {
        -self.mass_value * self.gravity / self.spring_constant
    }

    fn update_equilibrium(&mut self) {
        self.equilibrium_position =
            self.position.y - self.natural_resting_length + self.equilibrium_displacement();
    }
}
