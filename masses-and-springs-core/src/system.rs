use legion::world::SubWorld;
use legion::{EntityStore, IntoQuery};

use crate::component::{Mass, Spring, SpringLoad};
use crate::resource::{Environment, Time};

#[legion::system(for_each)]
pub fn fall(mass: &mut Mass, #[resource] time: &Time, #[resource] environment: &Environment) {
    mass.step(
        environment.gravity,
        environment.floor_y,
        time.elapsed_seconds,
    );
}

#[legion::system]
#[write_component(Spring)]
#[write_component(Mass)]
pub fn oscillate(world: &mut SubWorld, #[resource] time: &Time) {
    let mut spring_query = <&mut Spring>::query();
    let (mut spring_world, mut mass_world) = world.split_for_query(&spring_query);

    for spring in spring_query.iter_mut(&mut spring_world) {
        let mass_entity = match spring.mass() {
            Some(mass_entity) => mass_entity,
            None => {
                spring.oscillate(time.elapsed_seconds);
                continue;
            }
        };
        let mut mass_entry = match mass_world.entry_mut(mass_entity) {
            Ok(mass_entry) => mass_entry,
            Err(_) => continue,
        };
        let mass: &mut Mass = match mass_entry.get_component_mut() {
            Ok(mass) => mass,
            Err(_) => continue,
        };

        // A held mass drags the spring along instead.
        if mass.is_user_controlled() {
            continue;
        }
        spring.oscillate(time.elapsed_seconds);
        mass.follow_spring(spring.bottom_position(), spring.velocity());
    }
}

#[legion::system]
#[read_component(Spring)]
#[write_component(Mass)]
pub fn energy(world: &mut SubWorld) {
    let mut mass_query = <&mut Mass>::query();
    let (mut mass_world, spring_world) = world.split_for_query(&mass_query);

    for mass in mass_query.iter_mut(&mut mass_world) {
        let load = mass
            .spring()
            .and_then(|spring_entity| spring_world.entry_ref(spring_entity).ok())
            .and_then(|entry| entry.into_component::<Spring>().ok().map(Spring::load))
            .unwrap_or_else(SpringLoad::default);
        mass.update(load);
    }
}
