//! Event delivery modes, actor construction and teardown, definition round
//! trips.

use peglegengine::actors::actor::{Actor, ActorId, ActorState};
use peglegengine::actors::factory::ActorFactory;
use peglegengine::actors::templates::{self, PickupType, SingleAnimation};
use peglegengine::components::ambientsound::AmbientSoundDef;
use peglegengine::components::ammo::AmmoType;
use peglegengine::components::animation::{Animation, AnimationFrame};
use peglegengine::components::health::{DamageType, HealthComponent};
use peglegengine::components::position::{PositionComponent, position_definition};
use peglegengine::components::predefinedmove::PredefinedMove;
use peglegengine::components::render::HUD_RENDER_COMPONENT;
use peglegengine::components::tileplane::{PlaneProperties, TILE_PLANE_RENDER_COMPONENT};
use peglegengine::error::EngineError;
use peglegengine::events::bus::EventBus;
use peglegengine::events::{EventType, GameEvent};
use peglegengine::geometry::{Direction, Point, Rect};
use peglegengine::resources::definition::DefinitionNode;
use peglegengine::resources::loader::{ImageAsset, MemoryLoader, SoundAsset};
use peglegengine::resources::palette::Palette;
use peglegengine::resources::scenegraph::SceneGraph;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

const EPSILON: f32 = 1e-4;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn loader() -> MemoryLoader {
    let mut loader = MemoryLoader::new();
    for dir in [
        "/GAME/IMAGES/TREASURE/COINS",
        "/GAME/IMAGES/HEALTH/POTION1",
        "/GAME/IMAGES/GLITTER",
        "/GAME/IMAGES/BULLETS",
        "/GAME/IMAGES/DYNAMITEEXPLO",
        "/GAME/IMAGES/CHECKPOINTFLAG",
        "/GAME/IMAGES/EXCLAMATION",
        "/LEVEL1/IMAGES/CRATES",
        "/LEVEL1/IMAGES/POWDERKEG",
        "/LEVEL1/IMAGES/CRUMBLINGPEG",
        "/LEVEL1/TILES/ACTION",
        "/CLAW/IMAGES",
        "/HUD/ICONS",
    ] {
        for n in 1..=13 {
            loader.insert_image(&format!("{}/{:03}.pid", dir, n), ImageAsset::new(16, 16));
        }
    }
    loader.insert_sound("/GAME/SOUNDS/RAIN.WAV", SoundAsset { duration_ms: 2000 });
    loader
}

fn factory(bus: &Rc<EventBus>) -> ActorFactory {
    ActorFactory::new(Rc::clone(bus), Rc::new(loader()), Palette::new(), "pid")
}

fn record(bus: &EventBus, event_type: EventType) -> Rc<RefCell<Vec<GameEvent>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    bus.subscribe(bus.new_receiver(), event_type, move |e| sink.borrow_mut().push(e.clone()));
    seen
}

#[test]
fn immediate_is_synchronous_and_queued_waits_for_drain() {
    let bus = EventBus::new();
    let seen = record(&bus, EventType::ScoreGained);
    bus.publish(GameEvent::ScoreGained {
        actor: ActorId(1),
        points: 1,
    });
    assert_eq!(seen.borrow().len(), 1);

    bus.publish_queued(GameEvent::ScoreGained {
        actor: ActorId(1),
        points: 2,
    });
    bus.publish_queued(GameEvent::ScoreGained {
        actor: ActorId(1),
        points: 3,
    });
    assert_eq!(seen.borrow().len(), 1);
    assert!(bus.process_queue(Duration::from_millis(20)));
    let points: Vec<i32> = seen
        .borrow()
        .iter()
        .filter_map(|e| match e {
            GameEvent::ScoreGained { points, .. } => Some(*points),
            _ => None,
        })
        .collect();
    assert_eq!(points, vec![1, 2, 3]);
}

#[test]
fn spent_budget_carries_events_over_in_order() {
    let bus = EventBus::new();
    let seen = record(&bus, EventType::ScoreGained);
    for points in 0..5 {
        bus.publish_queued(GameEvent::ScoreGained {
            actor: ActorId(1),
            points,
        });
    }
    assert!(!bus.process_queue(Duration::ZERO));
    assert_eq!(seen.borrow().len(), 1);
    assert_eq!(bus.queued_len(), 4);
    while !bus.process_queue(Duration::ZERO) {}
    assert_eq!(seen.borrow().len(), 5);
    assert!(matches!(
        seen.borrow()[4],
        GameEvent::ScoreGained { points: 4, .. }
    ));
}

#[test]
fn unsubscribing_twice_is_harmless() {
    let bus = EventBus::new();
    let receiver = bus.new_receiver();
    let hits = Rc::new(Cell::new(0));
    let sink = Rc::clone(&hits);
    assert!(bus.subscribe(receiver, EventType::MoveActor, move |_| sink.set(sink.get() + 1)));
    assert!(bus.unsubscribe(receiver, EventType::MoveActor));
    assert!(!bus.unsubscribe(receiver, EventType::MoveActor));
    bus.publish(GameEvent::MoveActor {
        actor: ActorId(1),
        position: Point::default(),
    });
    assert_eq!(hits.get(), 0);
}

#[test]
fn destroy_announces_once_and_releases_everything() {
    let bus = Rc::new(EventBus::new());
    let graph = SceneGraph::attach(&bus);
    let destroyed = record(&bus, EventType::ActorDestroyed);
    let factory = factory(&bus);

    let coin = factory
        .create_actor(&templates::pickup_definition(
            PickupType::TreasureCoin,
            Point::new(50.0, 50.0),
            true,
        ))
        .expect("coin");
    let id = coin.id();
    assert_eq!(graph.nodes_of(id).len(), 1);
    let weak: Weak<Actor> = Rc::downgrade(&coin);
    let position = Rc::downgrade(&coin.component::<PositionComponent>().expect("position"));

    assert!(coin.destroy());
    assert!(!coin.destroy());
    assert_eq!(coin.state(), ActorState::Destroyed);
    assert_eq!(destroyed.borrow().len(), 1);
    assert!(graph.nodes_of(id).is_empty());
    assert_eq!(coin.component_count(), 0);

    drop(coin);
    assert!(weak.upgrade().is_none());
    assert!(position.upgrade().is_none());
}

#[test]
fn failed_actor_is_discarded_silently() {
    let bus = Rc::new(EventBus::new());
    let destroyed = record(&bus, EventType::ActorDestroyed);
    let factory = factory(&bus);

    let broken = DefinitionNode::new("Actor")
        .with_attr("Type", "Broken")
        .with_child(position_definition(Point::new(1.0, 1.0)))
        .with_child(DefinitionNode::new("HealthComponent"));
    assert!(matches!(
        factory.create_actor(&broken),
        Err(EngineError::MissingField { .. })
    ));

    let unknown = DefinitionNode::new("Actor")
        .with_attr("Type", "Broken")
        .with_child(DefinitionNode::new("WobbleComponent"));
    assert!(matches!(
        factory.create_actor(&unknown),
        Err(EngineError::UnknownComponent(_))
    ));
    assert!(destroyed.borrow().is_empty());

    let fine = factory
        .create_actor(&DefinitionNode::new("Actor").with_attr("Type", "Fine").with_child(
            position_definition(Point::new(3.0, 4.0)),
        ))
        .expect("fine actor");
    let position = fine.component::<PositionComponent>().expect("position");
    assert!(approx_eq(position.borrow().x(), 3.0));
    assert!(approx_eq(position.borrow().y(), 4.0));
}

#[test]
fn zero_spawn_checkpoint_is_rejected() {
    let bus = Rc::new(EventBus::new());
    let factory = factory(&bus);
    let err = factory
        .create_actor(&templates::checkpoint_definition(
            "/GAME/IMAGES/CHECKPOINTFLAG/*",
            Point::new(10.0, 10.0),
            1000,
            Point::default(),
            false,
            0,
        ))
        .unwrap_err();
    assert!(matches!(err, EngineError::InvariantViolation(_)));
}

fn assert_round_trip(factory: &ActorFactory, definition: &DefinitionNode) {
    let actor = factory.create_actor(definition).expect("first build");
    let emitted = actor.to_definition();
    let again = factory.create_actor(&emitted).expect("second build");
    assert_eq!(again.to_definition(), emitted, "{:?}", actor);
}

#[test]
fn template_actors_emit_what_they_parse() {
    let bus = Rc::new(EventBus::new());
    let factory = factory(&bus);
    let at = Point::new(120.0, 80.0);

    assert_round_trip(&factory, &templates::pickup_definition(PickupType::PotionSmall, at, false));
    assert_round_trip(
        &factory,
        &templates::player_projectile_definition(AmmoType::Pistol, Direction::Left, at),
    );
    assert_round_trip(
        &factory,
        &templates::area_damage_definition(
            at,
            Point::new(64.0, 64.0),
            30,
            peglegengine::components::physics::collision_flag::ENEMY,
            "Rectangle",
            DamageType::Explosion,
            Point::new(0.0, -10.0),
            Some("/GAME/IMAGES/DYNAMITEEXPLO/*"),
            1000,
        ),
    );
    assert_round_trip(&factory, &templates::single_animation_definition(at, SingleAnimation::Explosion));
    assert_round_trip(
        &factory,
        &templates::checkpoint_definition("/GAME/IMAGES/CHECKPOINTFLAG/*", at, 1000, at, true, 2),
    );
    assert_round_trip(
        &factory,
        &templates::sound_trigger_definition("/GAME/SOUNDS/RAIN.WAV", at, Point::new(100.0, 100.0), 1),
    );
    assert_round_trip(
        &factory,
        &templates::global_ambient_sound_definition(&AmbientSoundDef {
            sound: "/GAME/SOUNDS/RAIN.WAV".to_string(),
            volume: 50,
            min_time_off: 1000,
            max_time_off: 2000,
            min_time_on: 500,
            max_time_on: 1500,
            is_looping: false,
        }),
    );
}

#[test]
fn health_round_trip_keeps_current_value() {
    let bus = Rc::new(EventBus::new());
    let factory = factory(&bus);
    let actor = factory
        .create_actor(
            &DefinitionNode::new("Actor").with_attr("Type", "Crate").with_child(
                DefinitionNode::new("HealthComponent")
                    .with_text_child("Health", 30)
                    .with_text_child("MaxHealth", 40),
            ),
        )
        .expect("crate");
    let health = actor.component::<HealthComponent>().expect("health");
    HealthComponent::add_health(&health, -5, DamageType::Melee, Point::default());
    let again = factory.create_actor(&actor.to_definition()).expect("again");
    let health = again.component::<HealthComponent>().expect("health");
    assert_eq!(health.borrow().health(), 25);
    assert_eq!(health.borrow().max_health(), 40);
}

#[test]
fn breakables_markers_and_level_triggers_emit_what_they_parse() {
    let bus = Rc::new(EventBus::new());
    let factory = factory(&bus);
    let at = Point::new(320.0, 240.0);

    assert_round_trip(
        &factory,
        &templates::crate_definition(
            "/LEVEL1/IMAGES/CRATES/*",
            at,
            &[PickupType::TreasureCoin, PickupType::AmmoShot],
            5,
            1000,
        ),
    );
    assert_round_trip(
        &factory,
        &templates::powder_keg_definition("/LEVEL1/IMAGES/POWDERKEG/*", at, 40, 1000),
    );
    assert_round_trip(
        &factory,
        &templates::crumbling_peg_definition("/LEVEL1/IMAGES/CRUMBLINGPEG/*", at, 1000),
    );
    assert_round_trip(
        &factory,
        &templates::follower_definition("/GAME/IMAGES/EXCLAMATION/*", 100, at),
    );
    assert_round_trip(
        &factory,
        &DefinitionNode::new("Actor")
            .with_attr("Type", "Officer")
            .with_child(position_definition(at))
            .with_child(templates::followable_component_definition(
                Point::new(0.0, -80.0),
                "/GAME/IMAGES/EXCLAMATION/*",
                120,
            )),
    );
    assert_round_trip(
        &factory,
        &templates::preset_sound_trigger_definition(
            "/GAME/SOUNDS/RAIN.WAV",
            "WideSoundTrigger",
            at,
            Rect::default(),
            -1,
        ),
    );
    assert_round_trip(
        &factory,
        &templates::preset_sound_trigger_definition(
            "/GAME/SOUNDS/RAIN.WAV",
            "SmallSoundTrigger",
            at,
            Rect::new(100, 200, 40, 60),
            1,
        ),
    );
}

fn still(image: &str) -> AnimationFrame {
    AnimationFrame {
        image: image.to_string(),
        duration_ms: 100,
        event: None,
    }
}

#[test]
fn player_components_emit_what_they_parse() {
    let bus = Rc::new(EventBus::new());
    let factory = factory(&bus);

    let mut animation = DefinitionNode::new("AnimationComponent");
    for a in [
        Animation::from_frames("stand", true, vec![still("frame001")]),
        Animation::from_frames("damage", true, vec![still("frame002")]),
        Animation::from_frames("death", false, vec![still("frame003")]),
    ] {
        animation.push_child(a.to_definition());
    }
    animation.push_text_child("DefaultAnimation", "stand");

    let player = DefinitionNode::new("Actor")
        .with_attr("Type", "Player")
        .with_child(position_definition(Point::new(64.0, 64.0)))
        .with_child(templates::actor_render_component_definition("/CLAW/IMAGES/*", 4000, false))
        .with_child(animation)
        .with_child(templates::health_component_definition(80, 100))
        .with_child(
            DefinitionNode::new("AmmoComponent")
                .with_text_child("Pistol", 10)
                .with_text_child("Magic", 5)
                .with_text_child("Dynamite", 3)
                .with_text_child("ActiveAmmo", AmmoType::Magic),
        )
        .with_child(
            DefinitionNode::new("PowerupComponent")
                .with_text_child("ActivePowerup", "Catnip")
                .with_text_child("RemainingMs", 5000),
        )
        .with_child(templates::glitter_component_definition("Glitter_Yellow", false, true))
        .with_child(
            DefinitionNode::new("PlayerControllableComponent")
                .with_text_child("TakeDamageDuration", 750)
                .with_text_child("TakeDamageSound", "/CLAW/SOUNDS/HIT1.WAV"),
        );
    assert_round_trip(&factory, &player);

    let lift = DefinitionNode::new("Actor")
        .with_attr("Type", "Lift")
        .with_child(position_definition(Point::new(500.0, 300.0)))
        .with_child(templates::predefined_move_component_definition(
            &[
                PredefinedMove {
                    duration_ms: 2000,
                    pixels_per_second: Point::new(0.0, -50.0),
                },
                PredefinedMove {
                    duration_ms: 2000,
                    pixels_per_second: Point::new(0.0, 50.0),
                },
            ],
            true,
        ));
    assert_round_trip(&factory, &lift);
}

#[test]
fn planes_and_hud_emit_what_they_parse() {
    let bus = Rc::new(EventBus::new());
    let factory = factory(&bus);

    let props = PlaneProperties {
        name: "Action".to_string(),
        is_main_plane: true,
        tile_pixel_width: 64,
        tile_pixel_height: 64,
        plane_pixel_width: 192,
        plane_pixel_height: 128,
        movement_percent_x: 80,
        fill_color: 3,
        z_coord: 2000,
        ..PlaneProperties::default()
    };
    let mut tiles = DefinitionNode::new("Tiles");
    for tile in [5, -1, 7, 7, 5, -1] {
        tiles.push_text_child("Tile", tile);
    }
    assert_round_trip(
        &factory,
        &DefinitionNode::new("Actor").with_attr("Type", "Plane").with_child(
            DefinitionNode::new(TILE_PLANE_RENDER_COMPONENT)
                .with_text_child("ImagePath", "/LEVEL1/TILES/ACTION/*")
                .with_child(props.to_definition())
                .with_child(tiles),
        ),
    );

    assert_round_trip(
        &factory,
        &DefinitionNode::new("Actor")
            .with_attr("Type", "Hud")
            .with_child(position_definition(Point::new(0.0, 0.0)))
            .with_child(
                DefinitionNode::new(HUD_RENDER_COMPONENT)
                    .with_text_child("ImagePath", "/HUD/ICONS/*")
                    .with_text_child("AnchorRight", true)
                    .with_text_child("HUDElementKey", "score"),
            ),
    );
}
