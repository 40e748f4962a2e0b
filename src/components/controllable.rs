//! Player-controlled state machine.
//!
//! [`Controllable`] is the intent interface the input mapping talks to.
//! [`PlayerControllableComponent`] implements it for the player character:
//! every intent and every observed world notification moves it between
//! [`ControllableState`]s and selects the matching animation.
//!
//! Rules
//! - `Dying` is terminal. Intents are ignored until [`PlayerControllableComponent::reset`].
//! - `TakingDamage` lasts `TakeDamageDuration` ms of ticks, then the state the
//!   damage interrupted is restored (attacks resolve to their base stance).
//!   A lethal hit during that time wins.
//! - `can_move` and `in_physics_capable_state` are false in both.
//! - Attack and shoot states end when their animation loops.
//! - Frame events `attack`/`fire` on the current animation publish
//!   `ActorAttack`/`ActorFire`.
//! - Standing still for `IdleDelay` ms switches to `Idle` and plays the next
//!   idle quote from a [`ShuffleCursor`].

use crate::actors::actor::Owner;
use crate::components::ammo::{AmmoComponent, AmmoType};
use crate::components::animation::{
    AnimationComponent, AnimationFrame, AnimationObserver, observe_animation, unobserve_animation,
};
use crate::components::health::{DamageType, HealthObserver, observe_health, unobserve_health};
use crate::components::physics::PhysicsComponent;
use crate::components::render::RenderComponent;
use crate::components::{Component, InitContext};
use crate::error::EngineResult;
use crate::events::GameEvent;
use crate::geometry::{Direction, Point};
use crate::resources::definition::{DefinitionNode, Fields};
use log::{debug, info};

pub const PLAYER_CONTROLLABLE_COMPONENT: &str = "PlayerControllableComponent";

const DEFAULT_TAKE_DAMAGE_DURATION_MS: u32 = 500;
const DEFAULT_IDLE_DELAY_MS: u32 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllableState {
    #[default]
    None,
    Standing,
    Walking,
    Jumping,
    Falling,
    Climbing,
    Ducking,
    Shooting,
    DuckShooting,
    JumpShooting,
    Attacking,
    DuckAttacking,
    JumpAttacking,
    TakingDamage,
    Dying,
    Idle,
}

impl ControllableState {
    pub fn is_attacking_or_shooting(self) -> bool {
        matches!(
            self,
            ControllableState::Shooting
                | ControllableState::DuckShooting
                | ControllableState::JumpShooting
                | ControllableState::Attacking
                | ControllableState::DuckAttacking
                | ControllableState::JumpAttacking
        )
    }

    /// The stance an action was started from.
    fn base_stance(self) -> ControllableState {
        match self {
            ControllableState::Shooting | ControllableState::Attacking => {
                ControllableState::Standing
            }
            ControllableState::DuckShooting | ControllableState::DuckAttacking => {
                ControllableState::Ducking
            }
            ControllableState::JumpShooting | ControllableState::JumpAttacking => {
                ControllableState::Falling
            }
            ControllableState::None | ControllableState::Idle => ControllableState::Standing,
            other => other,
        }
    }

    fn animation(self) -> &'static str {
        match self {
            ControllableState::None | ControllableState::Standing => "stand",
            ControllableState::Walking => "walk",
            ControllableState::Jumping => "jump",
            ControllableState::Falling => "fall",
            ControllableState::Climbing => "climb",
            ControllableState::Ducking => "duck",
            ControllableState::Attacking => "swipe",
            ControllableState::DuckAttacking => "duckswipe",
            ControllableState::JumpAttacking => "jumpswipe",
            ControllableState::Shooting => "pistol",
            ControllableState::DuckShooting => "duckpistol",
            ControllableState::JumpShooting => "jumppistol",
            ControllableState::TakingDamage => "damage",
            ControllableState::Dying => "death",
            ControllableState::Idle => "idle",
        }
    }
}

fn fire_animation(state: ControllableState, ammo: AmmoType) -> &'static str {
    match (ammo, state) {
        (AmmoType::Pistol, _) => state.animation(),
        (AmmoType::Magic, ControllableState::DuckShooting) => "duckmagic",
        (AmmoType::Magic, ControllableState::JumpShooting) => "jumpmagic",
        (AmmoType::Magic, _) => "magic",
        (AmmoType::Dynamite, ControllableState::DuckShooting) => "duckpostdynamite",
        (AmmoType::Dynamite, ControllableState::JumpShooting) => "jumpdynamite",
        (AmmoType::Dynamite, _) => "postdynamite",
    }
}

/// Intents from the input mapping and the physics collaborator.
pub trait Controllable {
    fn on_start_falling(&mut self);
    fn on_land_on_ground(&mut self);
    fn on_start_jumping(&mut self);
    fn on_direction_change(&mut self, direction: Direction);
    fn on_stop_moving(&mut self);
    fn on_run(&mut self);
    fn on_climb(&mut self);
    fn on_stop_climbing(&mut self);
    fn on_attack(&mut self);
    fn on_fire(&mut self, out_of_ammo: bool);
    fn on_duck(&mut self);
    fn on_stand(&mut self);

    fn can_move(&self) -> bool;
    fn is_ducking(&self) -> bool;
    fn is_dying(&self) -> bool;
    fn in_physics_capable_state(&self) -> bool;
    fn is_climbing(&self) -> bool;
}

/// Random order over `0..len` without repeats until every index was drawn.
/// The first draw after a reshuffle never repeats the last draw before it.
pub struct ShuffleCursor {
    order: Vec<usize>,
    pos: usize,
    rng: fastrand::Rng,
}

impl ShuffleCursor {
    pub fn new(len: usize, rng: fastrand::Rng) -> Self {
        let mut cursor = Self {
            order: (0..len).collect(),
            pos: 0,
            rng,
        };
        cursor.rng.shuffle(&mut cursor.order);
        cursor
    }

    pub fn with_seed(len: usize, seed: u64) -> Self {
        Self::new(len, fastrand::Rng::with_seed(seed))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn next_index(&mut self) -> Option<usize> {
        if self.order.is_empty() {
            return None;
        }
        if self.pos == self.order.len() {
            let last = self.order[self.pos - 1];
            self.rng.shuffle(&mut self.order);
            let n = self.order.len();
            if n > 1 && self.order[0] == last {
                self.order.swap(0, n - 1);
            }
            self.pos = 0;
        }
        let idx = self.order[self.pos];
        self.pos += 1;
        Some(idx)
    }
}

pub struct PlayerControllableComponent {
    owner: Owner,
    active: bool,
    state: ControllableState,
    last_state: ControllableState,
    direction: Direction,
    take_damage_duration_ms: u32,
    take_damage_left_ms: u32,
    pre_damage_state: ControllableState,
    take_damage_sounds: Vec<String>,
    idle_quotes: Vec<String>,
    idle_delay_ms: u32,
    idle_time_ms: u32,
    idle_cursor: ShuffleCursor,
    death_reported: bool,
    rng: fastrand::Rng,
}

impl PlayerControllableComponent {
    pub fn new(owner: Owner) -> Self {
        Self::with_rng(owner, fastrand::Rng::new())
    }

    pub fn with_rng(owner: Owner, rng: fastrand::Rng) -> Self {
        let mut rng = rng;
        let cursor_rng = rng.fork();
        Self {
            owner,
            active: true,
            state: ControllableState::None,
            last_state: ControllableState::None,
            direction: Direction::Right,
            take_damage_duration_ms: DEFAULT_TAKE_DAMAGE_DURATION_MS,
            take_damage_left_ms: 0,
            pre_damage_state: ControllableState::Standing,
            take_damage_sounds: Vec::new(),
            idle_quotes: Vec::new(),
            idle_delay_ms: DEFAULT_IDLE_DELAY_MS,
            idle_time_ms: 0,
            idle_cursor: ShuffleCursor::new(0, cursor_rng),
            death_reported: false,
            rng,
        }
    }

    pub fn state(&self) -> ControllableState {
        self.state
    }

    pub fn last_state(&self) -> ControllableState {
        self.last_state
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn take_damage_duration_ms(&self) -> u32 {
        self.take_damage_duration_ms
    }

    pub fn take_damage_left_ms(&self) -> u32 {
        self.take_damage_left_ms
    }

    /// Back to `Standing` after death, e.g. on respawn.
    pub fn reset(&mut self) {
        info!("Controllable {} reset", self.owner.id());
        self.take_damage_left_ms = 0;
        self.death_reported = false;
        self.active = true;
        self.enter(ControllableState::Standing);
    }

    fn accepts_intents(&self) -> bool {
        self.active && self.in_physics_capable_state()
    }

    fn enter(&mut self, state: ControllableState) {
        self.enter_with_animation(state, state.animation());
    }

    fn enter_with_animation(&mut self, state: ControllableState, animation: &str) {
        if state != self.state {
            debug!(
                "Controllable {}: {:?} -> {:?}",
                self.owner.id(),
                self.state,
                state
            );
            self.last_state = self.state;
            self.state = state;
        }
        self.idle_time_ms = 0;
        if let Some(component) = self.owner.component::<AnimationComponent>() {
            if let Ok(mut component) = component.try_borrow_mut() {
                component.set_animation(animation);
            }
        }
    }

    fn stop_physics(&self) {
        if let Some(physics) = self.owner.component::<PhysicsComponent>() {
            if let Ok(mut physics) = physics.try_borrow_mut() {
                physics.stop();
            }
        }
    }

    fn play(&self, sound: &str) {
        self.owner.bus().publish(GameEvent::play_sound(sound, 100));
    }

    fn is_airborne(&self) -> bool {
        matches!(
            self.state,
            ControllableState::Jumping | ControllableState::Falling
        )
    }

    fn active_ammo(&self) -> AmmoType {
        self.owner
            .component::<AmmoComponent>()
            .and_then(|a| a.try_borrow().ok().map(|a| a.active_ammo()))
            .unwrap_or_default()
    }

    fn report_death(&mut self) {
        if self.death_reported {
            return;
        }
        self.death_reported = true;
        self.owner
            .bus()
            .publish_queued(GameEvent::ControllableDied {
                actor: self.owner.id(),
            });
    }

    fn die(&mut self) {
        self.take_damage_left_ms = 0;
        self.stop_physics();
        let has_death_animation = self
            .owner
            .component::<AnimationComponent>()
            .is_some_and(|a| a.try_borrow().is_ok_and(|a| a.has_animation("death")));
        self.enter(ControllableState::Dying);
        if !has_death_animation {
            self.report_death();
        }
    }
}

impl Controllable for PlayerControllableComponent {
    fn on_start_falling(&mut self) {
        if !self.accepts_intents() || self.state.is_attacking_or_shooting() {
            return;
        }
        if self.state != ControllableState::Climbing {
            self.enter(ControllableState::Falling);
        }
    }

    fn on_land_on_ground(&mut self) {
        if !self.accepts_intents() {
            return;
        }
        if self.is_airborne() || self.state == ControllableState::JumpAttacking
            || self.state == ControllableState::JumpShooting
        {
            self.enter(ControllableState::Standing);
        }
    }

    fn on_start_jumping(&mut self) {
        if !self.accepts_intents() || !self.can_move() || self.state == ControllableState::Ducking {
            return;
        }
        if !self.is_airborne() {
            self.enter(ControllableState::Jumping);
        }
    }

    fn on_direction_change(&mut self, direction: Direction) {
        if !self.accepts_intents() || self.direction == direction {
            return;
        }
        self.direction = direction;
        if let Some(render) = self.owner.component::<RenderComponent>() {
            if let Ok(mut render) = render.try_borrow_mut() {
                render.set_mirrored(direction == Direction::Left);
            }
        }
    }

    fn on_stop_moving(&mut self) {
        if !self.accepts_intents() {
            return;
        }
        if self.state == ControllableState::Walking {
            self.enter(ControllableState::Standing);
        }
    }

    fn on_run(&mut self) {
        if !self.accepts_intents() || !self.can_move() {
            return;
        }
        if matches!(
            self.state,
            ControllableState::None | ControllableState::Standing | ControllableState::Idle
        ) {
            self.enter(ControllableState::Walking);
        }
    }

    fn on_climb(&mut self) {
        if !self.accepts_intents() || self.state.is_attacking_or_shooting() {
            return;
        }
        self.enter(ControllableState::Climbing);
    }

    fn on_stop_climbing(&mut self) {
        if self.accepts_intents() && self.state == ControllableState::Climbing {
            self.enter(ControllableState::Falling);
        }
    }

    fn on_attack(&mut self) {
        if !self.accepts_intents()
            || self.state.is_attacking_or_shooting()
            || self.state == ControllableState::Climbing
        {
            return;
        }
        let next = match self.state {
            ControllableState::Ducking => ControllableState::DuckAttacking,
            ControllableState::Jumping | ControllableState::Falling => {
                ControllableState::JumpAttacking
            }
            _ => ControllableState::Attacking,
        };
        self.enter(next);
    }

    fn on_fire(&mut self, out_of_ammo: bool) {
        if !self.accepts_intents()
            || self.state.is_attacking_or_shooting()
            || self.state == ControllableState::Climbing
        {
            return;
        }
        if out_of_ammo {
            debug!("Controllable {} is out of ammo", self.owner.id());
            return;
        }
        let next = match self.state {
            ControllableState::Ducking => ControllableState::DuckShooting,
            ControllableState::Jumping | ControllableState::Falling => {
                ControllableState::JumpShooting
            }
            _ => ControllableState::Shooting,
        };
        let animation = fire_animation(next, self.active_ammo());
        self.enter_with_animation(next, animation);
    }

    fn on_duck(&mut self) {
        if !self.accepts_intents() {
            return;
        }
        if matches!(
            self.state,
            ControllableState::Standing | ControllableState::Walking | ControllableState::Idle
        ) {
            self.enter(ControllableState::Ducking);
        }
    }

    fn on_stand(&mut self) {
        if self.accepts_intents() && self.state == ControllableState::Ducking {
            self.enter(ControllableState::Standing);
        }
    }

    fn can_move(&self) -> bool {
        !matches!(
            self.state,
            ControllableState::Shooting
                | ControllableState::Attacking
                | ControllableState::DuckAttacking
                | ControllableState::DuckShooting
                | ControllableState::TakingDamage
                | ControllableState::Dying
        )
    }

    fn is_ducking(&self) -> bool {
        self.state == ControllableState::Ducking
    }

    fn is_dying(&self) -> bool {
        self.state == ControllableState::Dying
    }

    fn in_physics_capable_state(&self) -> bool {
        !matches!(
            self.state,
            ControllableState::Dying | ControllableState::TakingDamage
        )
    }

    fn is_climbing(&self) -> bool {
        self.state == ControllableState::Climbing
    }
}

impl AnimationObserver for PlayerControllableComponent {
    fn on_animation_frame_changed(
        &mut self,
        _animation: &str,
        _last: Option<&AnimationFrame>,
        new: &AnimationFrame,
    ) {
        if !self.state.is_attacking_or_shooting() {
            return;
        }
        let bus = self.owner.bus();
        match new.event.as_deref() {
            Some("attack") => {
                bus.publish(GameEvent::ActorAttack {
                    actor: self.owner.id(),
                    direction: self.direction,
                });
            }
            Some("fire") => {
                let Some(ammo) = self.owner.component::<AmmoComponent>() else {
                    return;
                };
                let fired = {
                    let Ok(mut ammo) = ammo.try_borrow_mut() else {
                        return;
                    };
                    ammo.consume_ammo().then(|| ammo.active_ammo())
                };
                if let Some(ammo) = fired {
                    bus.publish(GameEvent::ActorFire {
                        actor: self.owner.id(),
                        direction: self.direction,
                        ammo,
                    });
                }
            }
            _ => {}
        }
    }

    fn on_animation_looped(&mut self, _animation: &str) {
        if self.state.is_attacking_or_shooting() {
            self.enter(self.state.base_stance());
        }
    }

    fn on_animation_at_last_frame(&mut self, animation: &str) {
        if self.state == ControllableState::Dying && animation == "death" {
            self.report_death();
        }
    }
}

impl HealthObserver for PlayerControllableComponent {
    fn on_health_below_zero(&mut self, damage_type: DamageType) {
        if self.state == ControllableState::Dying {
            return;
        }
        info!(
            "Controllable {} died ({})",
            self.owner.id(),
            damage_type
        );
        self.die();
    }

    fn on_health_changed(
        &mut self,
        old_health: i32,
        new_health: i32,
        _damage_type: DamageType,
        _impact: Point,
    ) {
        if new_health >= old_health || new_health <= 0 || self.state == ControllableState::Dying {
            return;
        }
        if self.state != ControllableState::TakingDamage {
            self.pre_damage_state = self.state.base_stance();
        }
        self.take_damage_left_ms = self.take_damage_duration_ms;
        self.stop_physics();
        self.enter(ControllableState::TakingDamage);
        if !self.take_damage_sounds.is_empty() {
            let idx = self.rng.usize(..self.take_damage_sounds.len());
            self.play(&self.take_damage_sounds[idx]);
        }
    }
}

impl Component for PlayerControllableComponent {
    fn name(&self) -> &'static str {
        PLAYER_CONTROLLABLE_COMPONENT
    }

    fn owner(&self) -> &Owner {
        &self.owner
    }

    fn init(&mut self, data: &DefinitionNode, _ctx: &InitContext) -> EngineResult<()> {
        let f = Fields::new(data, PLAYER_CONTROLLABLE_COMPONENT);
        f.set_bool_if(&mut self.active, "IsActive")?;
        f.set_if(&mut self.take_damage_duration_ms, "TakeDamageDuration")?;
        f.set_if(&mut self.idle_delay_ms, "IdleDelay")?;
        self.take_damage_sounds = data
            .children_named("TakeDamageSound")
            .filter_map(|n| n.text())
            .map(str::to_string)
            .collect();
        self.idle_quotes = data
            .children_named("IdleQuoteSound")
            .filter_map(|n| n.text())
            .map(str::to_string)
            .collect();
        self.idle_cursor = ShuffleCursor::new(self.idle_quotes.len(), self.rng.fork());
        Ok(())
    }

    fn post_init(&mut self) -> EngineResult<()> {
        observe_animation::<PlayerControllableComponent>(&self.owner)?;
        observe_health::<PlayerControllableComponent>(&self.owner)?;
        self.enter(ControllableState::Standing);
        Ok(())
    }

    fn wants_update(&self) -> bool {
        matches!(
            self.state,
            ControllableState::TakingDamage | ControllableState::Standing
        )
    }

    fn update(&mut self, delta_ms: u32) {
        match self.state {
            ControllableState::TakingDamage => {
                self.take_damage_left_ms = self.take_damage_left_ms.saturating_sub(delta_ms);
                if self.take_damage_left_ms == 0 {
                    self.enter(self.pre_damage_state);
                }
            }
            ControllableState::Standing if self.active => {
                self.idle_time_ms += delta_ms;
                if self.idle_time_ms < self.idle_delay_ms {
                    return;
                }
                self.enter(ControllableState::Idle);
                if let Some(idx) = self.idle_cursor.next_index() {
                    self.play(&self.idle_quotes[idx]);
                }
            }
            _ => {}
        }
    }

    fn to_definition(&self) -> DefinitionNode {
        let mut node = DefinitionNode::new(PLAYER_CONTROLLABLE_COMPONENT)
            .with_text_child("IsActive", self.active)
            .with_text_child("TakeDamageDuration", self.take_damage_duration_ms)
            .with_text_child("IdleDelay", self.idle_delay_ms);
        for sound in &self.take_damage_sounds {
            node.push_text_child("TakeDamageSound", sound);
        }
        for sound in &self.idle_quotes {
            node.push_text_child("IdleQuoteSound", sound);
        }
        node
    }

    fn on_destroy(&mut self) {
        unobserve_animation::<PlayerControllableComponent>(&self.owner);
        unobserve_health::<PlayerControllableComponent>(&self.owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn test_shuffle_cursor_visits_all_before_repeating() {
        let mut cursor = ShuffleCursor::with_seed(5, 42);
        let first: FxHashSet<usize> = (0..5).filter_map(|_| cursor.next_index()).collect();
        assert_eq!(first.len(), 5);
    }

    #[test]
    fn test_shuffle_cursor_no_repeat_across_reshuffle() {
        for seed in 0..50 {
            let mut cursor = ShuffleCursor::with_seed(3, seed);
            let mut last = None;
            for _ in 0..30 {
                let next = cursor.next_index();
                assert_ne!(next, last);
                last = next;
            }
        }
    }

    #[test]
    fn test_shuffle_cursor_single_and_empty() {
        let mut one = ShuffleCursor::with_seed(1, 1);
        assert_eq!(one.next_index(), Some(0));
        assert_eq!(one.next_index(), Some(0));
        let mut none = ShuffleCursor::with_seed(0, 1);
        assert_eq!(none.next_index(), None);
        assert!(none.is_empty());
    }

    #[test]
    fn test_base_stance_of_actions() {
        assert_eq!(
            ControllableState::DuckShooting.base_stance(),
            ControllableState::Ducking
        );
        assert_eq!(
            ControllableState::JumpAttacking.base_stance(),
            ControllableState::Falling
        );
        assert_eq!(
            ControllableState::Walking.base_stance(),
            ControllableState::Walking
        );
    }
}
