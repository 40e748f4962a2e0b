//! Game session.
//!
//! A [`Game`] owns everything one play session needs: the event bus, the
//! actor factory and table, the scene graph, the audio bridge and the frame
//! clock. It also answers the requests components queue on the bus:
//!
//! | Event | Handling |
//! |-------|----------|
//! | `RequestNewActor` | build the actor, add it to the table, publish `NewActor` |
//! | `RequestDestroyActor` | remove the actor from the table and destroy it |
//! | `MoveActor` | set the actor's position |
//! | `CheckpointReached` | remember the spawn position of the actor that reached it |
//! | `ControllableDied` | respawn: move to the spawn position, reset, full health |
//! | `ScoreGained` | add to the session score |
//! | `ActorFire` | queue a projectile in front of the shooter |
//! | `ActorAttack` | queue a one-pulse melee damage area in front of the attacker |
//!
//! One [`Game::tick`]:
//! 1. frame guard ([`WorldTime::advance`]); a lag spike skips the whole tick
//! 2. queued events drained within the configured budget
//! 3. every active actor updated, in id order
//! 4. render sweep over the scene graph

use crate::actors::actor::{Actor, ActorId, ActorTable};
use crate::actors::factory::{ActorFactory, ActorSpawner};
use crate::actors::templates;
use crate::components::ammo::AmmoType;
use crate::components::controllable::PlayerControllableComponent;
use crate::components::health::{DamageType, HealthComponent};
use crate::components::physics::{PhysicsComponent, collision_flag};
use crate::components::position::PositionComponent;
use crate::error::{EngineError, EngineResult};
use crate::events::audio::AudioCmd;
use crate::events::bus::{EventBus, ReceiverId};
use crate::events::{EventType, GameEvent};
use crate::geometry::{Direction, Point};
use crate::resources::audio::AudioBridge;
use crate::resources::definition::DefinitionNode;
use crate::resources::gameconfig::GameConfig;
use crate::resources::loader::ResourceLoader;
use crate::resources::palette::Palette;
use crate::resources::scenegraph::SceneGraph;
use crate::resources::worldtime::WorldTime;
use crate::systems::audio::attach_audio;
use crate::systems::render::{DrawItem, render_sweep};
use crossbeam_channel::Receiver;
use log::{debug, error, info, warn};
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

pub const LEVEL_ELEMENT: &str = "Level";

/// Where shots leave the shooter, for a shooter facing right.
const MUZZLE_OFFSET: Point = Point { x: 40.0, y: -10.0 };
const MELEE_OFFSET: Point = Point { x: 50.0, y: 0.0 };
const MELEE_SIZE: Point = Point { x: 60.0, y: 40.0 };
const MELEE_DAMAGE: i32 = 10;

#[derive(Debug)]
pub enum TickOutcome {
    /// The frame was a lag spike; nothing ran.
    Skipped,
    Rendered(Vec<DrawItem>),
}

/// State the bus handlers share with the [`Game`].
struct Session {
    factory: ActorFactory,
    actors: RefCell<ActorTable>,
    spawn_points: RefCell<FxHashMap<ActorId, Point>>,
    score: Cell<i64>,
}

impl Session {
    fn spawn(&self, definition: &DefinitionNode, requester: Option<ActorId>) -> EngineResult<Rc<Actor>> {
        let actor = self.factory.create_actor(definition)?;
        if actor.component::<PlayerControllableComponent>().is_some() {
            if let Some(position) = actor.component::<PositionComponent>() {
                self.spawn_points
                    .borrow_mut()
                    .insert(actor.id(), position.borrow().position());
            }
        }
        self.actors.borrow_mut().insert(Rc::clone(&actor));
        self.factory.bus().publish(GameEvent::NewActor {
            actor: actor.id(),
            type_name: actor.type_name().to_string(),
            requester,
        });
        Ok(actor)
    }

    fn destroy_actor(&self, id: ActorId) -> bool {
        let removed = self.actors.borrow_mut().remove(id);
        self.spawn_points.borrow_mut().remove(&id);
        match removed {
            Some(actor) => actor.destroy(),
            None => {
                debug!("Actor {} already gone", id);
                false
            }
        }
    }

    fn move_actor(&self, id: ActorId, to: Point) {
        let Some(actor) = self.actors.borrow().get(id) else {
            return;
        };
        let Some(position) = actor.component::<PositionComponent>() else {
            return;
        };
        match position.try_borrow_mut() {
            Ok(mut position) => position.set_position(to),
            Err(_) => warn!("Position of actor {} is busy, move to {:?} dropped", id, to),
        };
    }

    /// Position of `id` shifted by `offset`, mirrored for actors facing left.
    fn in_front_of(&self, id: ActorId, direction: Direction, offset: Point) -> Option<Point> {
        let actor = self.actors.borrow().get(id)?;
        let position = actor.component::<PositionComponent>()?;
        let position = position.try_borrow().ok()?.position();
        Some(Point::new(
            position.x + direction.sign() * offset.x,
            position.y + offset.y,
        ))
    }

    fn fire(&self, id: ActorId, direction: Direction, ammo: AmmoType) {
        let Some(at) = self.in_front_of(id, direction, MUZZLE_OFFSET) else {
            warn!("Actor {} fired {} from nowhere", id, ammo);
            return;
        };
        self.factory.bus().publish_queued(GameEvent::RequestNewActor {
            definition: Rc::new(templates::player_projectile_definition(ammo, direction, at)),
            requester: Some(id),
        });
    }

    fn attack(&self, id: ActorId, direction: Direction) {
        let Some(at) = self.in_front_of(id, direction, MELEE_OFFSET) else {
            return;
        };
        let area = templates::area_damage_definition(
            at,
            MELEE_SIZE,
            MELEE_DAMAGE,
            collision_flag::ENEMY,
            "Rectangle",
            DamageType::Melee,
            Point::default(),
            None,
            0,
        );
        self.factory.bus().publish_queued(GameEvent::RequestNewActor {
            definition: Rc::new(area),
            requester: Some(id),
        });
    }

    fn respawn(&self, id: ActorId) {
        let Some(actor) = self.actors.borrow().get(id) else {
            warn!("Cannot respawn unknown actor {}", id);
            return;
        };
        let spawn = self.spawn_points.borrow().get(&id).copied();
        info!("Respawning actor {} at {:?}", id, spawn);
        if let (Some(spawn), Some(position)) = (spawn, actor.component::<PositionComponent>()) {
            match position.try_borrow_mut() {
                Ok(mut position) => position.set_position(spawn),
                Err(_) => warn!("Position of actor {} is busy, respawned in place", id),
            }
        }
        if let Some(physics) = actor.component::<PhysicsComponent>() {
            match physics.try_borrow_mut() {
                Ok(mut physics) => physics.stop(),
                Err(_) => warn!("Physics of actor {} is busy, not stopped", id),
            }
        }
        if let Some(health) = actor.component::<HealthComponent>() {
            match health.try_borrow_mut() {
                Ok(mut health) => health.restore(),
                Err(_) => warn!("Health of actor {} is busy, not restored", id),
            }
        }
        if let Some(controllable) = actor.component::<PlayerControllableComponent>() {
            match controllable.try_borrow_mut() {
                Ok(mut controllable) => controllable.reset(),
                Err(_) => error!("Controllable of actor {} is busy, not reset", id),
            }
        }
    }
}

pub struct Game {
    config: GameConfig,
    bus: Rc<EventBus>,
    session: Rc<Session>,
    scene: Rc<SceneGraph>,
    audio: Rc<AudioBridge>,
    time: WorldTime,
    receivers: Vec<ReceiverId>,
}

impl Game {
    /// Create a session. The returned receiver is the audio thread's end of
    /// the command channel.
    pub fn new(
        config: GameConfig,
        loader: Rc<dyn ResourceLoader>,
        palette: Palette,
    ) -> (Self, Receiver<AudioCmd>) {
        let bus = Rc::new(EventBus::new());
        let factory = ActorFactory::new(Rc::clone(&bus), loader, palette, &config.image_extension);
        let session = Rc::new(Session {
            factory,
            actors: RefCell::new(ActorTable::new()),
            spawn_points: RefCell::new(FxHashMap::default()),
            score: Cell::new(0),
        });
        let scene = SceneGraph::attach(&bus);
        let (bridge, rx_cmd) = AudioBridge::new(&config);
        let audio = Rc::new(bridge);

        let mut receivers = vec![attach_audio(&bus, Rc::clone(&audio))];
        receivers.push(subscribe_session(&bus, Rc::downgrade(&session)));

        let time = WorldTime::new(config.max_frame_ms, config.lag_spike_warning);
        let game = Game {
            config,
            bus,
            session,
            scene,
            audio,
            time,
            receivers,
        };
        (game, rx_cmd)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn factory(&self) -> &ActorFactory {
        &self.session.factory
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn audio(&self) -> &AudioBridge {
        &self.audio
    }

    pub fn time(&self) -> &WorldTime {
        &self.time
    }

    pub fn score(&self) -> i64 {
        self.session.score.get()
    }

    pub fn actor(&self, id: ActorId) -> Option<Rc<Actor>> {
        self.session.actors.borrow().get(id)
    }

    pub fn actors(&self) -> Vec<Rc<Actor>> {
        self.session.actors.borrow().snapshot()
    }

    pub fn actor_count(&self) -> usize {
        self.session.actors.borrow().len()
    }

    pub fn find_by_type(&self, type_name: &str) -> Vec<Rc<Actor>> {
        self.session.actors.borrow().find_by_type(type_name)
    }

    pub fn spawn_point(&self, id: ActorId) -> Option<Point> {
        self.session.spawn_points.borrow().get(&id).copied()
    }

    /// Build an actor and add it to the session.
    pub fn spawn(&self, definition: &DefinitionNode) -> EngineResult<Rc<Actor>> {
        self.session.spawn(definition, None)
    }

    /// Spawn every `<Actor>` of a `<Level>` tree. Broken actors are logged and
    /// skipped; returns how many were spawned.
    pub fn load_level(&self, level: &DefinitionNode) -> EngineResult<usize> {
        if level.name != LEVEL_ELEMENT {
            return Err(EngineError::malformed(LEVEL_ELEMENT, "root", &level.name));
        }
        let mut spawned = 0;
        let mut failed = 0;
        for definition in &level.children {
            match self.session.spawn(definition, None) {
                Ok(_) => spawned += 1,
                Err(_) => failed += 1,
            }
        }
        if failed > 0 {
            warn!("Level loaded with {} broken actors", failed);
        }
        info!("Level loaded: {} actors", spawned);
        Ok(spawned)
    }

    pub fn destroy_actor(&self, id: ActorId) -> bool {
        self.session.destroy_actor(id)
    }

    /// Run one tick of `frame_ms` milliseconds.
    pub fn tick(&mut self, frame_ms: u32) -> TickOutcome {
        if !self.time.advance(frame_ms) {
            return TickOutcome::Skipped;
        }
        self.bus.process_queue(self.config.event_budget());
        let actors = self.session.actors.borrow().snapshot();
        for actor in actors {
            actor.update(frame_ms);
        }
        TickOutcome::Rendered(render_sweep(&self.scene))
    }

    /// Destroy every actor and stop forwarding to the audio thread.
    pub fn shutdown(&mut self) {
        let ids: Vec<ActorId> = self.session.actors.borrow().ids().to_vec();
        for id in ids {
            self.session.destroy_actor(id);
        }
        self.scene.detach(&self.bus);
        for receiver in self.receivers.drain(..) {
            self.bus.unsubscribe_all(receiver);
        }
        self.audio.shutdown();
        info!("Session shut down after {} frames", self.time.frame_count);
    }
}

impl ActorSpawner for Game {
    fn spawn_actor(&self, definition: &DefinitionNode) -> EngineResult<Rc<Actor>> {
        self.spawn(definition)
    }
}

fn subscribe_session(bus: &Rc<EventBus>, session: Weak<Session>) -> ReceiverId {
    let receiver = bus.new_receiver();

    let weak = session.clone();
    bus.subscribe(receiver, EventType::RequestNewActor, move |event| {
        if let (Some(session), GameEvent::RequestNewActor { definition, requester }) =
            (weak.upgrade(), event)
        {
            if let Err(e) = session.spawn(definition, *requester) {
                error!("Requested actor not created: {}", e);
                if let Some(requester) = requester {
                    session.factory.bus().publish(GameEvent::NewActorFailed {
                        requester: *requester,
                        type_name: definition.attr("Type").unwrap_or_default().to_string(),
                    });
                }
            }
        }
    });

    let weak = session.clone();
    bus.subscribe(receiver, EventType::RequestDestroyActor, move |event| {
        if let (Some(session), GameEvent::RequestDestroyActor { actor }) = (weak.upgrade(), event) {
            session.destroy_actor(*actor);
        }
    });

    let weak = session.clone();
    bus.subscribe(receiver, EventType::MoveActor, move |event| {
        if let (Some(session), GameEvent::MoveActor { actor, position }) = (weak.upgrade(), event) {
            session.move_actor(*actor, *position);
        }
    });

    let weak = session.clone();
    bus.subscribe(receiver, EventType::CheckpointReached, move |event| {
        if let (
            Some(session),
            GameEvent::CheckpointReached {
                actor,
                spawn_position,
                ..
            },
        ) = (weak.upgrade(), event)
        {
            session
                .spawn_points
                .borrow_mut()
                .insert(*actor, *spawn_position);
        }
    });

    let weak = session.clone();
    bus.subscribe(receiver, EventType::ActorFire, move |event| {
        if let (
            Some(session),
            GameEvent::ActorFire {
                actor,
                direction,
                ammo,
            },
        ) = (weak.upgrade(), event)
        {
            session.fire(*actor, *direction, *ammo);
        }
    });

    let weak = session.clone();
    bus.subscribe(receiver, EventType::ActorAttack, move |event| {
        if let (Some(session), GameEvent::ActorAttack { actor, direction }) = (weak.upgrade(), event) {
            session.attack(*actor, *direction);
        }
    });

    let weak = session.clone();
    bus.subscribe(receiver, EventType::ControllableDied, move |event| {
        if let (Some(session), GameEvent::ControllableDied { actor }) = (weak.upgrade(), event) {
            session.respawn(*actor);
        }
    });

    bus.subscribe(receiver, EventType::ScoreGained, move |event| {
        if let (Some(session), GameEvent::ScoreGained { points, .. }) = (session.upgrade(), event) {
            session.score.set(session.score.get() + *points as i64);
        }
    });

    receiver
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::position::position_definition;
    use crate::resources::loader::MemoryLoader;

    fn game() -> Game {
        let (game, _rx) = Game::new(GameConfig::new(), Rc::new(MemoryLoader::new()), Palette::new());
        game
    }

    fn marker(at: Point) -> DefinitionNode {
        DefinitionNode::new("Actor")
            .with_attr("Type", "Marker")
            .with_child(position_definition(at))
    }

    #[test]
    fn test_requests_are_served_on_next_tick() {
        let mut game = game();
        game.bus().publish_queued(GameEvent::RequestNewActor {
            definition: Rc::new(marker(Point::new(1.0, 2.0))),
            requester: None,
        });
        assert_eq!(game.actor_count(), 0);
        game.tick(16);
        assert_eq!(game.actor_count(), 1);

        let id = game.actors()[0].id();
        game.bus().publish_queued(GameEvent::MoveActor {
            actor: id,
            position: Point::new(9.0, 9.0),
        });
        game.bus().publish_queued(GameEvent::RequestDestroyActor { actor: id });
        game.tick(16);
        assert_eq!(game.actor_count(), 0);
    }

    #[test]
    fn test_lag_spike_skips_tick() {
        let mut game = game();
        game.bus().publish_queued(GameEvent::RequestNewActor {
            definition: Rc::new(marker(Point::new(1.0, 2.0))),
            requester: None,
        });
        assert!(matches!(game.tick(5000), TickOutcome::Skipped));
        assert_eq!(game.bus().queued_len(), 1);
        assert!(matches!(game.tick(16), TickOutcome::Rendered(_)));
        assert_eq!(game.actor_count(), 1);
    }

    #[test]
    fn test_level_skips_broken_actors() {
        let game = game();
        let level = DefinitionNode::new(LEVEL_ELEMENT)
            .with_child(marker(Point::new(1.0, 1.0)))
            .with_child(
                DefinitionNode::new("Actor")
                    .with_attr("Type", "Broken")
                    .with_child(DefinitionNode::new("NoSuchComponent")),
            )
            .with_child(marker(Point::new(2.0, 2.0)));
        assert_eq!(game.load_level(&level).unwrap(), 2);
        assert_eq!(game.actor_count(), 2);
    }

    #[test]
    fn test_score_accumulates() {
        let mut game = game();
        game.bus().publish(GameEvent::ScoreGained {
            actor: ActorId(1),
            points: 500,
        });
        game.bus().publish_queued(GameEvent::ScoreGained {
            actor: ActorId(1),
            points: 100,
        });
        game.tick(16);
        assert_eq!(game.score(), 600);
    }
}
