use cgmath::vec2;
use legion::Entity;
use masses_and_springs_core::component::{MassState, ReturnPath};
use masses_and_springs_core::config::{MassSpec, ModelConfig, SpringSpec};
use masses_and_springs_core::resource::{Body, ModelEvent, SpeedMode};
use masses_and_springs_core::{Error, Model};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

const DT: f64 = 1.0 / 60.0;

fn single_spring_config(friction: f64) -> ModelConfig {
    ModelConfig {
        friction,
        springs: vec![SpringSpec::hanging_from_ceiling(0.5)],
        masses: vec![MassSpec::fixed(0.25, vec2(0.3, 0.5))],
        ..ModelConfig::default()
    }
}

/// Picks `mass` up, hooks it on the bottom of spring `index` and lets go.
fn hang(model: &mut Model, mass: Entity, index: usize) {
    let spring = model.spring_entity(index).unwrap();
    let bottom = model.spring(spring).unwrap().bottom_position();
    model.set_user_controlled(mass, true).unwrap();
    model.adjust_dragged_mass_position(mass, bottom).unwrap();
    model.release_mass(mass).unwrap();
    assert_eq!(model.mass(mass).unwrap().spring(), Some(spring));
}

/// Steps until `mass` has finished gliding home.
fn glide(model: &mut Model, mass: Entity) {
    for _ in 0..60 {
        if !model.mass(mass).unwrap().is_animating() {
            return;
        }
        model.step(DT);
    }
    panic!("mass never got home");
}

#[test]
fn default_layout() {
    let model = Model::new(ModelConfig::default()).unwrap();
    assert_eq!(model.springs().len(), 2);
    assert_eq!(model.masses().len(), 6);
    assert_eq!(model.body(), Body::Earth);
    assert_eq!(model.speed_mode(), SpeedMode::Normal);
    assert!(model.is_playing());

    let spring = model.spring(model.springs()[1]).unwrap();
    assert_eq!(spring.position(), vec2(0.8, 1.23));
    let mass = model.mass(model.masses()[0]).unwrap();
    assert_eq!(mass.value(), 0.25);
    assert_eq!(mass.position(), vec2(0.3, 0.5));

    assert_eq!(model.spring_entity(2), Err(Error::SpringIndex(2)));
    assert_eq!(model.mass_entity(6), Err(Error::MassIndex(6)));
}

#[test]
fn rejects_invalid_globals() {
    let config = ModelConfig {
        gravity: -1.0,
        ..ModelConfig::default()
    };
    assert_eq!(Model::new(config).err(), Some(Error::NegativeGravity(-1.0)));

    let config = ModelConfig {
        springs: vec![SpringSpec {
            spring_constant: 0.0,
            ..SpringSpec::hanging_from_ceiling(0.5)
        }],
        ..ModelConfig::default()
    };
    assert!(matches!(
        Model::new(config).err(),
        Some(Error::SpringConstantOutOfRange { .. })
    ));

    let config = ModelConfig {
        springs: vec![SpringSpec {
            natural_resting_length: -1.0,
            ..SpringSpec::hanging_from_ceiling(0.5)
        }],
        ..ModelConfig::default()
    };
    assert!(matches!(
        Model::new(config).err(),
        Some(Error::LengthOutOfRange { .. })
    ));

    let mut model = Model::new(ModelConfig::default()).unwrap();
    assert_eq!(
        model.set_friction(-0.1),
        Err(Error::NegativeFriction(-0.1))
    );
    assert_eq!(model.friction(), 0.2);
}

#[test]
fn energy_is_conserved_without_friction() {
    let mut model = Model::new(single_spring_config(0.0)).unwrap();
    let mass = model.masses()[0];
    hang(&mut model, mass, 0);

    let baseline = model.mass(mass).unwrap().initial_total_energy();
    let mut moved = false;
    for _ in 0..600 {
        model.step(DT);
        let mass = model.mass(mass).unwrap();
        let energy = mass.energy();
        assert!(energy.thermal.abs() < 1e-9, "thermal {}", energy.thermal);
        assert!((energy.total - baseline).abs() < 1e-9);
        moved |= energy.kinetic > 0.01;
    }
    assert!(moved);
}

#[test]
fn friction_only_turns_energy_into_heat() {
    let mut model = Model::new(single_spring_config(0.2)).unwrap();
    let mass = model.masses()[0];
    hang(&mut model, mass, 0);

    let spring = model.springs()[0];
    let mut previous = model.mass(mass).unwrap().energy();
    for _ in 0..600 {
        model.step(DT);
        let m = model.mass(mass).unwrap();
        let s = model.spring(spring).unwrap();
        let energy = m.energy();

        // Mechanical energy rebuilt from the observable motion.
        let mechanical = 0.5 * m.value() * m.vertical_velocity().powi(2)
            + m.value()
                * m.gravity()
                * (m.position().y - m.zero_reference_point() - m.total_height())
            + 0.5 * s.spring_constant() * s.displacement().powi(2);
        assert!((energy.total - mechanical).abs() < 1e-12);

        assert!(energy.total <= previous.total + 1e-12);
        let lost = previous.total - energy.total;
        let gained = energy.thermal - previous.thermal;
        assert!((gained - lost).abs() < 1e-12);
        previous = energy;
    }
    assert!(previous.thermal > 0.01);
}

#[test]
fn hanging_mass_follows_the_spring() {
    let mut model = Model::new(single_spring_config(0.2)).unwrap();
    let mass = model.masses()[0];
    let spring = model.springs()[0];
    hang(&mut model, mass, 0);

    for _ in 0..30 {
        model.step(DT);
        let bottom = model.spring(spring).unwrap().bottom_position();
        let mass = model.mass(mass).unwrap();
        assert_eq!(mass.position(), bottom);
        assert_eq!(
            mass.vertical_velocity(),
            model.spring(spring).unwrap().velocity()
        );
    }
}

#[test]
fn drag_attaches_and_detaches() {
    let config = ModelConfig {
        springs: vec![SpringSpec {
            anchor: vec2(0.5, 0.9),
            natural_resting_length: 0.1,
            ..SpringSpec::hanging_from_ceiling(0.5)
        }],
        masses: vec![MassSpec::fixed(0.1, vec2(0.5, 1.0))],
        ..ModelConfig::default()
    };
    let mut model = Model::new(config).unwrap();
    let mass = model.masses()[0];
    let spring = model.springs()[0];

    model.set_user_controlled(mass, true).unwrap();
    model
        .adjust_dragged_mass_position(mass, vec2(0.5, 0.88))
        .unwrap();
    assert_eq!(model.mass(mass).unwrap().spring(), Some(spring));
    assert_eq!(model.spring(spring).unwrap().mass(), Some(mass));
    assert_eq!(model.mass(mass).unwrap().position(), vec2(0.5, 0.88));
    assert!((model.spring(spring).unwrap().bottom() - 0.88).abs() < 1e-12);

    model
        .adjust_dragged_mass_position(mass, vec2(0.8, 0.88))
        .unwrap();
    assert_eq!(model.mass(mass).unwrap().spring(), None);
    assert_eq!(model.spring(spring).unwrap().mass(), None);
    assert_eq!(model.mass(mass).unwrap().position(), vec2(0.8, 0.88));
    assert!(model.mass(mass).unwrap().is_user_controlled());

    assert_eq!(
        model.drain_events(),
        vec![
            ModelEvent::Grabbed { mass },
            ModelEvent::Attached { mass, spring },
            ModelEvent::Detached { mass, spring },
        ]
    );
    assert!(model.drain_events().is_empty());
}

#[test]
fn held_mass_drags_the_spring() {
    let mut model = Model::new(single_spring_config(0.2)).unwrap();
    let mass = model.masses()[0];
    let spring = model.springs()[0];

    model.set_user_controlled(mass, true).unwrap();
    model
        .adjust_dragged_mass_position(mass, vec2(0.52, 0.7))
        .unwrap();
    assert_eq!(model.mass(mass).unwrap().spring(), Some(spring));

    model
        .adjust_dragged_mass_position(mass, vec2(0.55, 0.6))
        .unwrap();
    assert_eq!(model.mass(mass).unwrap().position(), vec2(0.5, 0.6));
    assert!((model.spring(spring).unwrap().bottom() - 0.6).abs() < 1e-12);

    // Held masses don't move while time passes.
    model.step(DT);
    assert_eq!(model.mass(mass).unwrap().position(), vec2(0.5, 0.6));
    assert_eq!(model.mass(mass).unwrap().energy().kinetic, 0.0);
    assert_eq!(model.mass(mass).unwrap().energy().thermal, 0.0);
}

#[test]
fn dropping_on_an_occupied_spring_swaps_masses() {
    let mut model = Model::new(ModelConfig::default()).unwrap();
    let first = model.masses()[0];
    let second = model.masses()[1];
    let spring = model.springs()[0];
    hang(&mut model, first, 0);

    let bottom = model.spring(spring).unwrap().bottom_position();
    model.set_user_controlled(second, true).unwrap();
    model.adjust_dragged_mass_position(second, bottom).unwrap();

    assert_eq!(model.spring(spring).unwrap().mass(), Some(second));
    assert_eq!(model.mass(second).unwrap().spring(), Some(spring));
    assert_eq!(model.mass(first).unwrap().spring(), None);
    assert!(model.mass(first).unwrap().is_animating());
    model.check_attachments().unwrap();
}

#[test]
fn released_mass_glides_home_then_falls() {
    let config = ModelConfig {
        return_path: ReturnPath::Horizontal,
        ..single_spring_config(0.2)
    };
    let mut model = Model::new(config).unwrap();
    let mass = model.masses()[0];
    hang(&mut model, mass, 0);

    model.set_user_controlled(mass, true).unwrap();
    model
        .adjust_dragged_mass_position(mass, vec2(0.9, 0.7))
        .unwrap();
    model.release_mass(mass).unwrap();
    match model.mass(mass).unwrap().state() {
        MassState::Returning(glide) => {
            assert_eq!(glide.start, vec2(0.9, 0.7));
            assert_eq!(glide.end, vec2(0.3, 0.7));
        }
        state => panic!("unexpected state {:?}", state),
    }

    glide(&mut model, mass);
    assert_eq!(model.mass(mass).unwrap().state(), MassState::Falling);
    assert!((model.mass(mass).unwrap().position().x - 0.3).abs() < 1e-12);

    for _ in 0..120 {
        model.step(DT);
    }
    let mass = model.mass(mass).unwrap();
    assert!((mass.position().y - (model.floor_y() + mass.total_height())).abs() < 1e-12);
}

#[test]
fn diagonal_return_goes_straight_home() {
    let config = ModelConfig {
        return_path: ReturnPath::Diagonal,
        ..single_spring_config(0.2)
    };
    let mut model = Model::new(config).unwrap();
    let mass = model.masses()[0];
    hang(&mut model, mass, 0);

    model.set_user_controlled(mass, true).unwrap();
    model
        .adjust_dragged_mass_position(mass, vec2(0.9, 0.7))
        .unwrap();
    model.release_mass(mass).unwrap();
    glide(&mut model, mass);
    let position = model.mass(mass).unwrap().position();
    assert!((position.x - 0.3).abs() < 1e-12);
    assert!((position.y - 0.5).abs() < 1e-12);
}

#[test]
fn attachments_stay_mutual() {
    let mut rng = Pcg32::seed_from_u64(7);
    let mut model = Model::new(ModelConfig::default()).unwrap();
    let masses = model.masses().to_vec();

    for _ in 0..2000 {
        let mass = masses[rng.gen_range(0..masses.len())];
        match rng.gen_range(0..4) {
            0 => model.set_user_controlled(mass, true).unwrap(),
            1 => {
                let column = if rng.gen::<bool>() { 0.5 } else { 0.8 };
                let x = column + rng.gen_range(-0.15..0.15);
                let y = rng.gen_range(0.5..0.9);
                model.adjust_dragged_mass_position(mass, vec2(x, y)).unwrap();
            }
            2 => model.release_mass(mass).unwrap(),
            _ => model.step(DT),
        }
        model.check_attachments().unwrap();

        for &spring in model.springs() {
            let holders = masses
                .iter()
                .filter(|&&mass| model.mass(mass).unwrap().spring() == Some(spring))
                .count();
            assert!(holders <= 1);
        }
    }
}

#[test]
fn oversized_and_paused_steps_change_nothing() {
    let mut model = Model::new(ModelConfig::default()).unwrap();
    let before = model.snapshot().unwrap();

    model.step(1.5);
    assert_eq!(model.snapshot().unwrap(), before);

    model.set_playing(false);
    model.step(0.5);
    assert_eq!(model.snapshot().unwrap(), before);

    model.set_playing(true);
    model.step(0.5);
    assert_ne!(model.snapshot().unwrap(), before);
}

#[test]
fn step_forward_advances_one_frame_while_paused() {
    let mut model = Model::new(ModelConfig::default()).unwrap();
    let mut reference = Model::new(ModelConfig::default()).unwrap();
    model.set_playing(false);

    model.step_forward();
    reference.step(DT);
    assert!(!model.is_playing());
    assert_eq!(model.snapshot().unwrap(), reference.snapshot().unwrap());
}

#[test]
fn slow_motion_scales_time() {
    let mut slow = Model::new(ModelConfig::default()).unwrap();
    let mut normal = Model::new(ModelConfig::default()).unwrap();
    slow.set_speed_mode(SpeedMode::Slow);

    slow.step(0.08);
    normal.step(0.01);
    assert_eq!(slow.snapshot().unwrap(), normal.snapshot().unwrap());
}

#[test]
fn speed_mode_parsing() {
    assert_eq!("normal".parse::<SpeedMode>(), Ok(SpeedMode::Normal));
    assert_eq!("slow".parse::<SpeedMode>(), Ok(SpeedMode::Slow));
    assert_eq!(
        "fast".parse::<SpeedMode>(),
        Err(Error::UnknownSpeedMode("fast".to_string()))
    );
    assert!("Slow".parse::<SpeedMode>().is_err());
    assert_eq!(SpeedMode::Slow.to_string(), "slow");
    assert_eq!(Body::PlanetX.to_string(), "Planet X");
    assert_eq!(Body::Moon.to_string(), "Moon");
}

#[test]
fn gravity_follows_the_selected_body() {
    let mut model = Model::new(ModelConfig::default()).unwrap();

    model.set_body(Body::Jupiter).unwrap();
    assert_eq!(model.gravity(), 24.79);
    for &spring in model.springs() {
        assert_eq!(model.spring(spring).unwrap().gravity(), 24.79);
    }
    for &mass in model.masses() {
        assert_eq!(model.mass(mass).unwrap().gravity(), 24.79);
    }

    model.set_gravity(3.0).unwrap();
    assert_eq!(model.body(), Body::Custom);
    assert_eq!(model.gravity(), 3.0);

    model.set_body(Body::Custom).unwrap();
    assert_eq!(model.gravity(), 3.0);

    assert_eq!(model.set_gravity(-9.8), Err(Error::NegativeGravity(-9.8)));
    assert_eq!(model.gravity(), 3.0);

    model.set_body(Body::ZeroG).unwrap();
    assert_eq!(model.gravity(), 0.0);
    assert_eq!(Body::matching(1.62), Body::Moon);
    assert_eq!(Body::matching(1.7), Body::Custom);
}

#[test]
fn gravity_change_restarts_heat_bookkeeping() {
    let mut model = Model::new(single_spring_config(0.2)).unwrap();
    let mass = model.masses()[0];
    hang(&mut model, mass, 0);
    for _ in 0..60 {
        model.step(DT);
    }
    assert!(model.mass(mass).unwrap().energy().thermal > 0.0);

    model.set_body(Body::Moon).unwrap();
    assert!(model.mass(mass).unwrap().energy().thermal.abs() < 1e-12);
    let spring = model.spring(model.springs()[0]).unwrap();
    assert!((spring.equilibrium_position() - (0.73 - 0.25 * 1.62 / 9.0)).abs() < 1e-12);
}

#[test]
fn spring_constant_change_moves_equilibrium_and_thickness() {
    let mut model = Model::new(single_spring_config(0.2)).unwrap();
    let mass = model.masses()[0];
    hang(&mut model, mass, 0);

    model.set_spring_constant(0, 12.0).unwrap();
    let spring = model.spring(model.springs()[0]).unwrap();
    assert_eq!(spring.spring_constant(), 12.0);
    assert!((spring.thickness() - 4.0).abs() < 1e-12);
    assert!((spring.equilibrium_position() - (0.73 - 0.25 * 9.8 / 12.0)).abs() < 1e-12);

    assert!(model.set_spring_constant(0, 20.0).is_err());
    assert!(model.set_spring_constant(1, 10.0).is_err());
}

#[test]
fn stop_spring_freezes_the_hanging_mass() {
    let mut model = Model::new(single_spring_config(0.2)).unwrap();
    let mass = model.masses()[0];
    let spring = model.springs()[0];
    hang(&mut model, mass, 0);
    for _ in 0..20 {
        model.step(DT);
    }

    model.stop_spring(0).unwrap();
    let spring = model.spring(spring).unwrap();
    assert_eq!(spring.displacement(), 0.0);
    assert_eq!(spring.velocity(), 0.0);

    let mass = model.mass(mass).unwrap();
    assert_eq!(mass.position(), spring.bottom_position());
    assert_eq!(mass.vertical_velocity(), 0.0);
    assert!(mass.energy().thermal.abs() < 1e-12);
}

#[test]
fn stop_spring_leaves_a_held_mass_in_hand() {
    let mut model = Model::new(single_spring_config(0.2)).unwrap();
    let mass = model.masses()[0];
    let spring = model.springs()[0];
    hang(&mut model, mass, 0);

    model.set_user_controlled(mass, true).unwrap();
    model
        .adjust_dragged_mass_position(mass, vec2(0.5, 0.6))
        .unwrap();
    model.stop_spring(0).unwrap();

    let s = model.spring(spring).unwrap();
    assert!((s.bottom() - 0.6).abs() < 1e-12);
    assert_eq!(s.velocity(), 0.0);
    assert_eq!(model.mass(mass).unwrap().position(), vec2(0.5, 0.6));
    assert_eq!(model.mass(mass).unwrap().spring(), Some(spring));
}

#[test]
fn mass_value_changes_reach_the_spring() {
    let config = ModelConfig {
        masses: vec![MassSpec::adjustable(0.1, vec2(0.3, 0.5))],
        ..single_spring_config(0.2)
    };
    let mut model = Model::new(config).unwrap();
    let mass = model.masses()[0];
    hang(&mut model, mass, 0);

    model.set_mass_value(mass, 0.3).unwrap();
    assert_eq!(model.mass(mass).unwrap().value(), 0.3);
    let spring = model.spring(model.springs()[0]).unwrap();
    assert!((spring.equilibrium_position() - (0.73 - 0.3 * 9.8 / 9.0)).abs() < 1e-12);

    let mut fixed = Model::new(single_spring_config(0.2)).unwrap();
    let fixed_mass = fixed.masses()[0];
    assert_eq!(
        fixed.set_mass_value(fixed_mass, 0.3),
        Err(Error::MassNotAdjustable)
    );
}

#[test]
fn reset_is_idempotent() {
    let mut model = Model::new(ModelConfig::default()).unwrap();
    let fresh = model.snapshot().unwrap();

    let mass = model.masses()[2];
    hang(&mut model, mass, 1);
    model.set_body(Body::Moon).unwrap();
    model.set_friction(1.0).unwrap();
    model.set_spring_constant(0, 14.0).unwrap();
    model.set_speed_mode(SpeedMode::Slow);
    for _ in 0..90 {
        model.step(DT);
    }

    model.reset().unwrap();
    let once = model.snapshot().unwrap();
    model.reset().unwrap();
    let twice = model.snapshot().unwrap();

    assert_eq!(once, twice);
    assert_eq!(once, fresh);
    assert_eq!(model.body(), Body::Earth);
    assert_eq!(model.friction(), 0.2);
    assert_eq!(model.speed_mode(), SpeedMode::Normal);
    model.check_attachments().unwrap();
}

#[test]
fn snapshot_round_trip() {
    let mut model = Model::new(ModelConfig::default()).unwrap();
    let mass = model.masses()[0];
    hang(&mut model, mass, 0);
    for _ in 0..30 {
        model.step(DT);
    }
    let saved = model.snapshot().unwrap();

    let other = model.masses()[4];
    hang(&mut model, other, 0);
    for _ in 0..60 {
        model.step(DT);
    }
    assert_ne!(model.snapshot().unwrap(), saved);

    model.restore(&saved).unwrap();
    assert_eq!(model.snapshot().unwrap(), saved);
    model.check_attachments().unwrap();

    let mut smaller = Model::new(single_spring_config(0.2)).unwrap();
    assert_eq!(
        smaller.restore(&saved),
        Err(Error::SnapshotMismatch {
            kind: "springs",
            snapshot: 2,
            model: 1,
        })
    );
}
