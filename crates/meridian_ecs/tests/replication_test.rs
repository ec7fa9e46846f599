//! # Replication Integration Tests
//!
//! Network threads push structural changes as bare ids; the simulation
//! thread replays them between ticks.

use std::thread;

use crossbeam_channel::TrySendError;
use meridian_ecs::{
    Coordinator, EcsConfig, EcsError, Entity, ReplayStats, ReplicationCommand, ReplicationInbox,
    System, TickLoop,
};

const CONFIG: &str = "\
entity_capacity = 256
max_entities = 4096
inbox_capacity = 128
tick_rate = 30
";

struct Hull(u32);

struct Shield;

#[derive(Default)]
struct ShieldedSystem {
    updates: u32,
}

impl System for ShieldedSystem {
    fn on_update(&mut self, _world: &mut Coordinator, _entities: &[Entity], _dt: f32) {
        self.updates += 1;
    }
}

fn config() -> EcsConfig {
    EcsConfig::from_toml_str(CONFIG).unwrap()
}

fn world() -> Coordinator {
    let mut world = Coordinator::with_config(&config());
    world.register_component::<Hull>().unwrap();
    world.register_component::<Shield>().unwrap();
    world.add_system(ShieldedSystem::default()).unwrap();
    world
        .set_system_signature::<ShieldedSystem, (Hull, Shield)>()
        .unwrap();
    world
}

/// Test: Spawns from several producer threads all land on their chosen ids.
#[test]
fn test_remote_spawns_from_many_threads() {
    let mut world = world();
    let inbox = ReplicationInbox::from_config(&config());

    let producers: Vec<_> = (0..4u32)
        .map(|t| {
            let tx = inbox.sender();
            thread::spawn(move || {
                for i in 0..16u32 {
                    tx.send(ReplicationCommand::Spawn {
                        id: t * 16 + i,
                        name: format!("remote-{t}-{i}"),
                    })
                    .unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let stats = world.drain_inbox(&inbox);
    assert_eq!(stats, ReplayStats { applied: 64, rejected: 0 });
    assert_eq!(world.entities().alive_count(), 64);

    let e = world.entity_from_network_id(37).unwrap();
    assert_eq!(world.entities().name(e), Some("remote-2-5"));

    // Local spawns continue after the remote range.
    assert_eq!(world.spawn_entity("local").id(), 64);
}

/// Test: Removing a component by wire id updates system membership.
#[test]
fn test_remove_by_wire_id_stops_system() {
    let mut world = world();
    let e = world.spawn_entity_with_id(3, "frigate").unwrap();
    world.add_component(e, Hull(100)).unwrap();
    world.add_component(e, Shield).unwrap();

    let mut clock = TickLoop::from_config(&config());
    assert_eq!(world.run_tick(&mut clock), 1);

    let shield_id = world.entities().component_type_id::<Shield>().unwrap();
    let inbox = ReplicationInbox::new(8);
    let tx = inbox.sender();
    tx.send(ReplicationCommand::RemoveComponent { id: 3, type_id: shield_id })
        .unwrap();
    // Ids this build does not know are ignored.
    tx.send(ReplicationCommand::RemoveComponent { id: 3, type_id: 63 })
        .unwrap();

    assert_eq!(world.drain_inbox(&inbox).applied, 2);
    assert!(!world.has_component::<Shield>(e));
    assert_eq!(world.get_component::<Hull>(e).unwrap().map(|hull| hull.0), Some(100));

    let members = world.systems().membership::<ShieldedSystem>().unwrap();
    assert!(!members.is_running());
    assert_eq!(world.run_tick(&mut clock), 0);
    assert_eq!(world.get_system::<ShieldedSystem>().unwrap().updates, 1);
}

/// Test: Bad commands are rejected without stopping the drain.
#[test]
fn test_rejections_do_not_stop_the_drain() {
    let mut world = world();
    let inbox = ReplicationInbox::new(8);
    let tx = inbox.sender();

    for command in [
        ReplicationCommand::Spawn { id: 1, name: "a".to_string() },
        ReplicationCommand::Spawn { id: 1, name: "clash".to_string() },
        ReplicationCommand::RemoveComponent { id: 9, type_id: 0 },
        ReplicationCommand::Kill { id: 9 },
        ReplicationCommand::Spawn { id: 2, name: "b".to_string() },
    ] {
        tx.try_send(command).unwrap();
    }

    let stats = world.drain_inbox(&inbox);
    assert_eq!(stats, ReplayStats { applied: 3, rejected: 2 });
    assert_eq!(stats.total(), 5);
    assert_eq!(world.entities().alive_count(), 2);
    assert_eq!(
        world.entities().name(world.entity_from_network_id(1).unwrap()),
        Some("a")
    );
}

/// Test: One TOML document sizes the inbox, bounds remote ids and sets the step.
#[test]
fn test_config_drives_inbox_ids_and_clock() {
    let config = EcsConfig::from_toml_str("max_entities = 16\ninbox_capacity = 3\ntick_rate = 20\n")
        .unwrap();
    let mut world = Coordinator::with_config(&config);
    let inbox = ReplicationInbox::from_config(&config);
    let clock = TickLoop::from_config(&config);

    assert_eq!(inbox.capacity(), 3);
    assert!((clock.delta_seconds() - 0.05).abs() < 1e-6);

    let tx = inbox.sender();
    tx.try_send(ReplicationCommand::Spawn { id: 15, name: "last".to_string() })
        .unwrap();
    tx.try_send(ReplicationCommand::Spawn { id: 16, name: "outside".to_string() })
        .unwrap();
    tx.try_send(ReplicationCommand::Kill { id: 0 }).unwrap();
    assert!(matches!(
        tx.try_send(ReplicationCommand::Kill { id: 1 }),
        Err(TrySendError::Full(_))
    ));

    assert_eq!(world.drain_inbox(&inbox), ReplayStats { applied: 2, rejected: 1 });
    assert_eq!(
        world.spawn_entity_with_id(16, "outside"),
        Err(EcsError::EntityIdOutOfRange { id: 16, max: 16 })
    );
    assert!(world.entity_from_network_id(15).is_ok());
}
