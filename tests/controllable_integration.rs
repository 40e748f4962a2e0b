//! Player state machine driven through a factory-built actor: intents,
//! damage, death and the frame events of attack animations.

use peglegengine::actors::actor::Actor;
use peglegengine::actors::factory::ActorFactory;
use peglegengine::components::animation::{Animation, AnimationComponent, AnimationFrame};
use peglegengine::components::controllable::{
    Controllable, ControllableState, PlayerControllableComponent,
};
use peglegengine::components::health::{DamageType, HealthComponent};
use peglegengine::components::position::position_definition;
use peglegengine::events::bus::EventBus;
use peglegengine::events::{EventType, GameEvent};
use peglegengine::geometry::{Direction, Point};
use peglegengine::resources::definition::DefinitionNode;
use peglegengine::resources::loader::{ImageAsset, MemoryLoader};
use peglegengine::resources::palette::Palette;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

const TAKE_DAMAGE_MS: u32 = 500;

fn frame(n: u32, duration_ms: u32, event: Option<&str>) -> AnimationFrame {
    AnimationFrame {
        image: format!("frame{:03}", n),
        duration_ms,
        event: event.map(str::to_string),
    }
}

fn player_definition() -> DefinitionNode {
    let animations = [
        Animation::from_frames("stand", true, vec![frame(1, 200, None)]),
        Animation::from_frames("walk", true, vec![frame(1, 100, None), frame(2, 100, None)]),
        Animation::from_frames("damage", true, vec![frame(3, 100, None)]),
        Animation::from_frames("death", false, vec![frame(4, 100, None)]),
        Animation::from_frames(
            "swipe",
            true,
            vec![frame(5, 100, Some("attack")), frame(6, 100, None)],
        ),
        Animation::from_frames(
            "pistol",
            true,
            vec![frame(5, 100, Some("fire")), frame(6, 100, None)],
        ),
    ];
    let mut animation = DefinitionNode::new("AnimationComponent");
    for a in &animations {
        animation.push_child(a.to_definition());
    }
    animation.push_text_child("DefaultAnimation", "stand");

    DefinitionNode::new("Actor")
        .with_attr("Type", "Player")
        .with_child(position_definition(Point::new(100.0, 100.0)))
        .with_child(
            DefinitionNode::new("ActorRenderComponent")
                .with_text_child("ImagePath", "/CLAW/IMAGES/*"),
        )
        .with_child(animation)
        .with_child(DefinitionNode::new("HealthComponent").with_text_child("Health", 100))
        .with_child(DefinitionNode::new("AmmoComponent").with_text_child("Pistol", 2))
        .with_child(
            DefinitionNode::new("PlayerControllableComponent")
                .with_text_child("TakeDamageDuration", TAKE_DAMAGE_MS),
        )
}

fn setup() -> (Rc<EventBus>, Rc<Actor>) {
    let mut loader = MemoryLoader::new();
    for n in 1..=6 {
        loader.insert_image(&format!("/CLAW/IMAGES/{:03}.pid", n), ImageAsset::new(32, 64));
    }
    let bus = Rc::new(EventBus::new());
    let factory = ActorFactory::new(Rc::clone(&bus), Rc::new(loader), Palette::new(), "pid");
    let actor = factory.create_actor(&player_definition()).expect("player");
    (bus, actor)
}

fn controllable(actor: &Actor) -> Rc<RefCell<PlayerControllableComponent>> {
    actor
        .component::<PlayerControllableComponent>()
        .expect("controllable")
}

fn state(actor: &Actor) -> ControllableState {
    controllable(actor).borrow().state()
}

fn hurt(actor: &Actor, amount: i32) {
    let health = actor.component::<HealthComponent>().expect("health");
    HealthComponent::add_health(&health, -amount, DamageType::Melee, Point::default());
}

fn count(bus: &Rc<EventBus>, event_type: EventType) -> Rc<Cell<u32>> {
    let seen = Rc::new(Cell::new(0));
    let sink = Rc::clone(&seen);
    bus.subscribe(bus.new_receiver(), event_type, move |_| sink.set(sink.get() + 1));
    seen
}

#[test]
fn starts_standing_and_walks() {
    let (_bus, actor) = setup();
    assert_eq!(state(&actor), ControllableState::Standing);
    controllable(&actor).borrow_mut().on_run();
    assert_eq!(state(&actor), ControllableState::Walking);
    let animation = actor.component::<AnimationComponent>().expect("animation");
    assert_eq!(animation.borrow().current_name(), Some("walk"));
    controllable(&actor).borrow_mut().on_stop_moving();
    assert_eq!(state(&actor), ControllableState::Standing);
}

#[test]
fn taking_damage_reverts_after_exactly_the_duration() {
    let (_bus, actor) = setup();
    controllable(&actor).borrow_mut().on_duck();
    hurt(&actor, 10);
    assert_eq!(state(&actor), ControllableState::TakingDamage);
    assert!(!controllable(&actor).borrow().can_move());
    assert!(!controllable(&actor).borrow().in_physics_capable_state());

    for _ in 0..(TAKE_DAMAGE_MS / 100 - 1) {
        actor.update(100);
        assert_eq!(state(&actor), ControllableState::TakingDamage);
    }
    actor.update(100);
    assert_eq!(state(&actor), ControllableState::Ducking);
}

#[test]
fn second_hit_restarts_damage_timer() {
    let (_bus, actor) = setup();
    hurt(&actor, 10);
    actor.update(400);
    hurt(&actor, 10);
    actor.update(400);
    assert_eq!(state(&actor), ControllableState::TakingDamage);
    actor.update(100);
    assert_eq!(state(&actor), ControllableState::Standing);
}

#[test]
fn dying_ignores_intents_until_reset() {
    let (bus, actor) = setup();
    let died = count(&bus, EventType::ControllableDied);
    hurt(&actor, 150);
    assert_eq!(state(&actor), ControllableState::Dying);

    {
        let c = controllable(&actor);
        let mut c = c.borrow_mut();
        c.on_run();
        c.on_start_jumping();
        c.on_attack();
        c.on_fire(false);
        c.on_duck();
        c.on_direction_change(Direction::Left);
        assert!(c.is_dying());
        assert!(!c.can_move());
        assert_eq!(c.direction(), Direction::Right);
    }
    assert_eq!(state(&actor), ControllableState::Dying);

    // Healing does not revive.
    let health = actor.component::<HealthComponent>().expect("health");
    HealthComponent::add_health(&health, 500, DamageType::None, Point::default());
    assert_eq!(state(&actor), ControllableState::Dying);

    actor.update(100);
    actor.update(100);
    bus.process_queue(Duration::from_millis(20));
    assert_eq!(died.get(), 1);

    controllable(&actor).borrow_mut().reset();
    assert_eq!(state(&actor), ControllableState::Standing);
    controllable(&actor).borrow_mut().on_run();
    assert_eq!(state(&actor), ControllableState::Walking);
}

#[test]
fn lethal_hit_during_damage_wins() {
    let (_bus, actor) = setup();
    hurt(&actor, 10);
    assert_eq!(state(&actor), ControllableState::TakingDamage);
    hurt(&actor, 100);
    assert_eq!(state(&actor), ControllableState::Dying);
    actor.update(TAKE_DAMAGE_MS);
    assert_eq!(state(&actor), ControllableState::Dying);
}

#[test]
fn attack_frame_event_fires_once_per_swing() {
    let (bus, actor) = setup();
    let attacks = count(&bus, EventType::ActorAttack);
    controllable(&actor).borrow_mut().on_attack();
    assert_eq!(state(&actor), ControllableState::Attacking);
    assert!(!controllable(&actor).borrow().can_move());

    actor.update(50);
    assert_eq!(attacks.get(), 1);
    actor.update(50);
    actor.update(100);
    assert_eq!(state(&actor), ControllableState::Standing);
    assert_eq!(attacks.get(), 1);
}

#[test]
fn fire_consumes_ammo() {
    let (bus, actor) = setup();
    let shots = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&shots);
    bus.subscribe(bus.new_receiver(), EventType::ActorFire, move |event| {
        if let GameEvent::ActorFire { ammo, .. } = event {
            sink.borrow_mut().push(*ammo);
        }
    });
    controllable(&actor).borrow_mut().on_fire(false);
    assert_eq!(state(&actor), ControllableState::Shooting);
    actor.update(10);
    assert_eq!(shots.borrow().len(), 1);
    let ammo = actor
        .component::<peglegengine::components::ammo::AmmoComponent>()
        .expect("ammo");
    assert_eq!(
        ammo.borrow().ammo(peglegengine::components::ammo::AmmoType::Pistol),
        1
    );
}

#[test]
fn out_of_ammo_does_not_shoot() {
    let (_bus, actor) = setup();
    controllable(&actor).borrow_mut().on_fire(true);
    assert_eq!(state(&actor), ControllableState::Standing);
}
