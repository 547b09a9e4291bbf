use std::collections::VecDeque;

use cgmath::vec2;
use legion::{Entity, EntityStore, Resources, Schedule, World};
use tracing::{debug, trace};

use crate::component::{Mass, Spring, SpringLoad};
use crate::config::{ModelConfig, MAX_STEP_SECONDS, STEP_FORWARD_SECONDS};
use crate::error::{Error, Result};
use crate::resource::{Body, Environment, ModelEvent, SpeedMode, Time};
use crate::scene::SceneSnapshot;
use crate::system::{energy_system, fall_system, oscillate_system};
use crate::Vec2;

fn check_gravity(gravity: f64) -> Result<()> {
    if gravity >= 0.0 && gravity.is_finite() {
        Ok(())
    } else {
        Err(Error::NegativeGravity(gravity))
    }
}

fn check_friction(friction: f64) -> Result<()> {
    if friction >= 0.0 && friction.is_finite() {
        Ok(())
    } else {
        Err(Error::NegativeFriction(friction))
    }
}

/// The simulation controller. Owns every mass and spring and is the only thing that changes who
/// hangs from what.
pub struct Model {
    world: World,
    springs: Vec<Entity>,
    masses: Vec<Entity>,

    config: ModelConfig,
    playing: bool,
    speed: SpeedMode,
    gravity: f64,
    friction: f64,
    body: Body,
    events: VecDeque<ModelEvent>,

    step_resources: Resources,
    step_schedule: Schedule,

    refresh_resources: Resources,
    refresh_schedule: Schedule,
}

impl Model {
    pub fn new(config: ModelConfig) -> Result<Model> {
        check_gravity(config.gravity)?;
        check_friction(config.friction)?;

        let mut world = World::default();
        let springs = config
            .springs
            .iter()
            .map(|spec| -> Result<Entity> {
                let spring = Spring::new(spec, config.gravity, config.friction)?;
                Ok(world.push((spring,)))
            })
            .collect::<Result<Vec<_>>>()?;
        let masses = config
            .masses
            .iter()
            .map(|spec| -> Result<Entity> {
                let mut mass = Mass::new(spec.value, spec.initial_position)?
                    .with_return_path(config.return_path);
                if spec.adjustable {
                    mass = mass.adjustable();
                }
                mass.set_gravity(config.gravity);
                mass.reset();
                Ok(world.push((mass,)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Model {
            world,
            springs,
            masses,

            playing: config.playing,
            speed: SpeedMode::default(),
            gravity: config.gravity,
            friction: config.friction,
            body: Body::matching(config.gravity),
            events: VecDeque::new(),
            config,

            step_resources: Resources::default(),
            step_schedule: Schedule::builder()
                .add_system(fall_system())
                .add_system(oscillate_system())
                .add_system(energy_system())
                .build(),

            refresh_resources: Resources::default(),
            refresh_schedule: Schedule::builder().add_system(energy_system()).build(),
        })
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn springs(&self) -> &[Entity] {
        &self.springs
    }

    pub fn masses(&self) -> &[Entity] {
        &self.masses
    }

    pub fn spring_entity(&self, index: usize) -> Result<Entity> {
        self.springs
            .get(index)
            .copied()
            .ok_or(Error::SpringIndex(index))
    }

    pub fn mass_entity(&self, index: usize) -> Result<Entity> {
        self.masses.get(index).copied().ok_or(Error::MassIndex(index))
    }

    pub fn spring(&self, entity: Entity) -> Result<&Spring> {
        self.world
            .entry_ref(entity)
            .map_err(|_| Error::UnknownEntity(entity))?
            .into_component::<Spring>()
            .map_err(|_| Error::MissingComponent {
                entity,
                component: "Spring",
            })
    }

    pub fn mass(&self, entity: Entity) -> Result<&Mass> {
        self.world
            .entry_ref(entity)
            .map_err(|_| Error::UnknownEntity(entity))?
            .into_component::<Mass>()
            .map_err(|_| Error::MissingComponent {
                entity,
                component: "Mass",
            })
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    pub fn speed_mode(&self) -> SpeedMode {
        self.speed
    }

    pub fn set_speed_mode(&mut self, speed: SpeedMode) {
        self.speed = speed;
    }

    pub fn gravity(&self) -> f64 {
        self.gravity
    }

    pub fn friction(&self) -> f64 {
        self.friction
    }

    pub fn body(&self) -> Body {
        self.body
    }

    pub fn floor_y(&self) -> f64 {
        self.config.floor_y
    }

    pub fn ceiling_y(&self) -> f64 {
        self.config.ceiling_y
    }

    /// Takes every notification queued since the last call.
    pub fn drain_events(&mut self) -> Vec<ModelEvent> {
        self.events.drain(..).collect()
    }

    /// Sets gravity everywhere. A value that doesn't match the selected body switches it to
    /// [`Body::Custom`].
    pub fn set_gravity(&mut self, gravity: f64) -> Result<()> {
        check_gravity(gravity)?;
        if self.body != Body::Custom && self.body.gravity() != Some(gravity) {
            self.body = Body::Custom;
        }
        self.apply_gravity(gravity)
    }

    pub fn set_body(&mut self, body: Body) -> Result<()> {
        if let Some(gravity) = body.gravity() {
            self.apply_gravity(gravity)?;
        }
        debug!(?body, gravity = self.gravity, "selected body");
        self.body = body;
        Ok(())
    }

    pub fn set_friction(&mut self, friction: f64) -> Result<()> {
        check_friction(friction)?;
        self.friction = friction;
        for &spring in &self.springs.clone() {
            self.with_spring(spring, |spring| spring.set_damping_coefficient(friction))?;
        }
        Ok(())
    }

    pub fn set_spring_constant(&mut self, index: usize, spring_constant: f64) -> Result<()> {
        self.modify_spring(index, |spring| {
            spring.set_spring_constant(spring_constant)?;
            spring.update_thickness(spring.natural_resting_length(), spring_constant);
            Ok(())
        })
    }

    /// Changes a spring's length, keeping its spring constant and redrawing its thickness.
    pub fn set_natural_resting_length(&mut self, index: usize, length: f64) -> Result<()> {
        self.modify_spring(index, |spring| {
            spring.set_natural_resting_length(length)?;
            spring.update_thickness(length, spring.spring_constant());
            Ok(())
        })
    }

    pub fn set_mass_value(&mut self, mass: Entity, value: f64) -> Result<()> {
        self.with_mass(mass, |m| m.set_value(value))??;
        if let Some(spring) = self.mass(mass)?.spring() {
            self.with_spring(spring, |spring| spring.set_mass_value(value))?;
        }
        self.refresh();
        self.with_mass(mass, Mass::zero_thermal_energy)
    }

    /// Freezes a spring at its natural length. A mass hanging from it stops there too; a held mass
    /// stays in the hand and the spring is left stretched to it, at rest.
    pub fn stop_spring(&mut self, index: usize) -> Result<()> {
        self.modify_spring(index, |spring| {
            spring.stop();
            Ok(())
        })
    }

    pub fn set_user_controlled(&mut self, mass: Entity, user_controlled: bool) -> Result<()> {
        let (was_user_controlled, spring) = {
            let m = self.mass(mass)?;
            (m.is_user_controlled(), m.spring())
        };
        if was_user_controlled == user_controlled {
            return Ok(());
        }

        // Grabbing or letting go of a hung mass starts the spring from rest.
        let load = match spring {
            Some(spring) => self.with_spring(spring, |spring| {
                spring.set_velocity(0.0);
                spring.load()
            })?,
            None => SpringLoad::default(),
        };
        self.with_mass(mass, |m| m.transition(user_controlled, spring, load))?;

        if user_controlled {
            debug!(?mass, "grabbed mass");
            self.events.push_back(ModelEvent::Grabbed { mass });
        } else {
            debug!(?mass, "released mass");
            self.events.push_back(ModelEvent::Released { mass });
        }
        Ok(())
    }

    pub fn release_mass(&mut self, mass: Entity) -> Result<()> {
        self.set_user_controlled(mass, false)
    }

    /// Moves a dragged mass toward `proposed_position`, hooking it onto a spring it comes close
    /// to and pulling it off one it is dragged sideways away from.
    pub fn adjust_dragged_mass_position(
        &mut self,
        mass: Entity,
        proposed_position: Vec2,
    ) -> Result<()> {
        let (position, spring) = {
            let m = self.mass(mass)?;
            (m.position(), m.spring())
        };

        if let Some(spring) = spring {
            if (proposed_position.x - position.x).abs() > self.config.dropping_distance {
                self.detach(mass, spring)?;
            }
        }

        match self.mass(mass)?.spring() {
            Some(spring) => {
                let anchor_x = self.with_spring(spring, |spring| {
                    spring.set_bottom(proposed_position.y);
                    spring.position().x
                })?;
                self.with_mass(mass, |m| {
                    m.set_position(vec2(anchor_x, proposed_position.y))
                })?;
            }
            None => {
                self.with_mass(mass, |m| m.set_position(proposed_position))?;
                let grabbing_distance = self.config.grabbing_distance;
                let bottoms = self
                    .springs
                    .iter()
                    .map(|&entity| self.spring(entity).map(|s| (entity, s.bottom_position())))
                    .collect::<Result<Vec<_>>>()?;
                let target = bottoms.into_iter().find_map(|(entity, bottom)| {
                    let in_reach = (proposed_position.x - bottom.x).abs() < grabbing_distance
                        && (proposed_position.y - bottom.y).abs() < grabbing_distance;
                    if in_reach {
                        Some(entity)
                    } else {
                        None
                    }
                });
                if let Some(spring) = target {
                    self.attach(mass, spring)?;
                }
            }
        }

        self.refresh();
        Ok(())
    }

    /// Advances the simulation by `dt` seconds of wall time.
    pub fn step(&mut self, dt: f64) {
        if dt > MAX_STEP_SECONDS {
            trace!(dt, "dropping oversized step");
            return;
        }
        if !self.playing {
            return;
        }

        let dt = self.speed.scale(dt);
        self.step_resources.insert(Time {
            elapsed_seconds: dt,
        });
        self.step_resources.insert(Environment {
            gravity: self.gravity,
            floor_y: self.config.floor_y,
        });
        self.step_schedule
            .execute(&mut self.world, &mut self.step_resources);
    }

    /// Advances one nominal frame, even while paused.
    pub fn step_forward(&mut self) {
        self.playing = true;
        self.step(STEP_FORWARD_SECONDS);
        self.playing = false;
    }

    pub fn reset(&mut self) -> Result<()> {
        self.playing = self.config.playing;
        self.speed = SpeedMode::default();
        self.set_friction(self.config.friction)?;
        self.apply_gravity(self.config.gravity)?;
        self.body = Body::matching(self.config.gravity);

        for &mass in &self.masses.clone() {
            self.with_mass(mass, Mass::reset)?;
        }
        for &spring in &self.springs.clone() {
            self.with_spring(spring, Spring::reset)?;
        }
        self.refresh();
        Ok(())
    }

    pub fn snapshot(&self) -> Result<SceneSnapshot> {
        let springs = self
            .springs
            .iter()
            .map(|&spring| self.spring(spring).map(Spring::clone))
            .collect::<Result<Vec<_>>>()?;
        let masses = self
            .masses
            .iter()
            .map(|&mass| self.mass(mass).map(Mass::clone))
            .collect::<Result<Vec<_>>>()?;
        Ok(SceneSnapshot::new(springs, masses))
    }

    /// Puts every spring and mass back exactly as `snapshot` recorded them.
    pub fn restore(&mut self, snapshot: &SceneSnapshot) -> Result<()> {
        if snapshot.springs().len() != self.springs.len() {
            return Err(Error::SnapshotMismatch {
                kind: "springs",
                snapshot: snapshot.springs().len(),
                model: self.springs.len(),
            });
        }
        if snapshot.masses().len() != self.masses.len() {
            return Err(Error::SnapshotMismatch {
                kind: "masses",
                snapshot: snapshot.masses().len(),
                model: self.masses.len(),
            });
        }

        for (&entity, saved) in self.springs.clone().iter().zip(snapshot.springs()) {
            self.with_spring(entity, |spring| *spring = saved.clone())?;
        }
        for (&entity, saved) in self.masses.clone().iter().zip(snapshot.masses()) {
            self.with_mass(entity, |mass| *mass = saved.clone())?;
        }
        self.check_attachments()
    }

    /// Verifies that every spring and the mass it holds point at each other.
    pub fn check_attachments(&self) -> Result<()> {
        for &spring in &self.springs {
            if let Some(mass) = self.spring(spring)?.mass() {
                if self.mass(mass)?.spring() != Some(spring) {
                    return Err(Error::BrokenAttachment { spring, mass });
                }
            }
        }
        for &mass in &self.masses {
            if let Some(spring) = self.mass(mass)?.spring() {
                if self.spring(spring)?.mass() != Some(mass) {
                    return Err(Error::BrokenAttachment { spring, mass });
                }
            }
        }
        Ok(())
    }

    /// Applies `f` to the spring at `index`, then brings the spring and whatever hangs from it
    /// back in line and restarts the mass's heat bookkeeping. A held mass stays put and the
    /// spring is stretched to it; otherwise the mass moves to the spring's bottom.
    pub(crate) fn modify_spring(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut Spring) -> Result<()>,
    ) -> Result<()> {
        let spring = self.spring_entity(index)?;
        let mass = self.with_spring(spring, |s| f(s).map(|()| s.mass()))??;

        if let Some(mass) = mass {
            let (held, held_y) = {
                let m = self.mass(mass)?;
                (m.is_user_controlled(), m.position().y)
            };
            if held {
                self.with_spring(spring, |s| s.set_bottom(held_y))?;
            } else {
                let (bottom, velocity) =
                    self.with_spring(spring, |s| (s.bottom_position(), s.velocity()))?;
                self.with_mass(mass, |m| m.follow_spring(bottom, velocity))?;
            }
            self.refresh();
            self.with_mass(mass, Mass::zero_thermal_energy)?;
        }
        Ok(())
    }

    /// Pushes the model's gravity and friction back into every spring and mass after their state
    /// was replaced wholesale. Heat bookkeeping only restarts when gravity actually changed.
    pub(crate) fn reapply_globals(&mut self) -> Result<()> {
        self.set_friction(self.friction)?;

        let gravity = self.gravity;
        let mut stale = false;
        for &spring in &self.springs {
            stale |= self.spring(spring)?.gravity() != gravity;
        }
        for &mass in &self.masses {
            stale |= self.mass(mass)?.gravity() != gravity;
        }
        if stale {
            self.apply_gravity(gravity)?;
        }
        Ok(())
    }

    pub(crate) fn refresh(&mut self) {
        self.refresh_schedule
            .execute(&mut self.world, &mut self.refresh_resources);
    }

    fn apply_gravity(&mut self, gravity: f64) -> Result<()> {
        self.gravity = gravity;
        for &spring in &self.springs.clone() {
            self.with_spring(spring, |spring| spring.set_gravity(gravity))?;
        }
        for &mass in &self.masses.clone() {
            self.with_mass(mass, |m| m.set_gravity(gravity))?;
        }
        self.refresh();
        for &mass in &self.masses.clone() {
            self.with_mass(mass, Mass::zero_thermal_energy)?;
        }
        Ok(())
    }

    fn attach(&mut self, mass: Entity, spring: Entity) -> Result<()> {
        if let Some(occupant) = self.spring(spring)?.mass() {
            if occupant == mass {
                return Ok(());
            }
            self.detach(occupant, spring)?;
        }

        let (value, y, velocity, user_controlled) = {
            let m = self.mass(mass)?;
            (
                m.value(),
                m.position().y,
                m.vertical_velocity(),
                m.is_user_controlled(),
            )
        };
        let load = self.with_spring(spring, |s| {
            s.add_mass(mass, value, y, velocity).map(|()| s.load())
        })??;
        self.with_mass(mass, |m| m.transition(user_controlled, Some(spring), load))?;

        debug!(?mass, ?spring, "attached mass");
        self.events.push_back(ModelEvent::Attached { mass, spring });
        Ok(())
    }

    fn detach(&mut self, mass: Entity, spring: Entity) -> Result<()> {
        self.with_spring(spring, Spring::remove_mass)?;
        self.with_mass(mass, Mass::detach)?;

        debug!(?mass, ?spring, "detached mass");
        self.events.push_back(ModelEvent::Detached { mass, spring });
        Ok(())
    }

    fn with_spring<R>(&mut self, entity: Entity, f: impl FnOnce(&mut Spring) -> R) -> Result<R> {
        let mut entry = self
            .world
            .entry_mut(entity)
            .map_err(|_| Error::UnknownEntity(entity))?;
        let spring = entry
            .get_component_mut::<Spring>()
            .map_err(|_| Error::MissingComponent {
                entity,
                component: "Spring",
            })?;
        Ok(f(spring))
    }

    fn with_mass<R>(&mut self, entity: Entity, f: impl FnOnce(&mut Mass) -> R) -> Result<R> {
        let mut entry = self
            .world
            .entry_mut(entity)
            .map_err(|_| Error::UnknownEntity(entity))?;
        let mass = entry
            .get_component_mut::<Mass>()
            .map_err(|_| Error::MissingComponent {
                entity,
                component: "Mass",
            })?;
        Ok(f(mass))
    }
}
