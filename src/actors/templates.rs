//! Procedural actor definitions.
//!
//! Gameplay code asks for "a health potion here" or "a pistol shot going
//! left"; the functions below synthesize the definition tree for it. The
//! `*_definition` builders only build trees. The `create_*` helpers feed those
//! trees to an [`ActorSpawner`], so a generated actor takes exactly the same
//! path as one loaded from a level file.
//!
//! Component builders (`*_component_definition`) are exposed separately for
//! definitions assembled by hand.

use super::actor::Actor;
use super::factory::{ACTOR_ELEMENT, ActorSpawner};
use crate::components::ambientsound::AmbientSoundDef;
use crate::components::ammo::AmmoType;
use crate::components::animation::{ANIMATION_COMPONENT, Animation, AnimationFrame};
use crate::components::checkpoint::CHECKPOINT_COMPONENT;
use crate::components::crumblingpeg::CRUMBLING_PEG_COMPONENT;
use crate::components::damageaura::{BaseAuraComponentDef, DamageAuraComponentDef};
use crate::components::destroyable::{DESTROYABLE_COMPONENT, DEFAULT_EXPLOSION_SIZE, Explosion};
use crate::components::followable::{FOLLOWABLE_COMPONENT, FOLLOWER_TYPE, FOLLOWER_Z};
use crate::components::glitter::GLITTER_COMPONENT;
use crate::components::health::{DamageType, HEALTH_COMPONENT};
use crate::components::physics::{
    BodyDef, BodyType, FixtureDef, FixtureType, collision_flag, point_node, size_node, string_enum,
};
use crate::components::pickup::{PICKUP_COMPONENT, PickupEffect};
use crate::components::position::position_definition;
use crate::components::powerup::PowerupType;
use crate::components::predefinedmove::{PREDEFINED_MOVE_COMPONENT, PredefinedMove};
use crate::components::projectile::PROJECTILE_COMPONENT;
use crate::components::render::ACTOR_RENDER_COMPONENT;
use crate::components::soundtrigger::SOUND_TRIGGER_COMPONENT;
use crate::components::trigger::{TRIGGER_COMPONENT, UNLIMITED_ENTRIES};
use crate::error::EngineResult;
use crate::geometry::{Direction, Point, Rect};
use crate::resources::definition::DefinitionNode;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

pub const GLITTER_Z: i32 = 1010;
pub const PICKUP_Z: i32 = 1000;
pub const SCORE_POPUP_Z: i32 = 9000;
pub const PROJECTILE_SPEED: f32 = 500.0;
pub const PEG_CRUMBLE_DELAY_MS: u32 = 500;
pub const SOUND_CRATE_BREAK: &str = "/GAME/SOUNDS/CRATEBREAK.WAV";
pub const SOUND_KEG_EXPLODE: &str = "/GAME/SOUNDS/KEGBOOM.WAV";

const CYCLE_ANIMATION: &str = "cycle";
const SCORE_POPUP_RISE_MS: u32 = 1000;
const SCORE_POPUP_SPEED: f32 = -50.0;

/// Score values with a popup image, in image order (`frame001` = 100).
const SCORE_POPUP_POINTS: [i32; 9] = [100, 500, 1500, 2500, 5000, 7500, 10000, 15000, 25000];

// ---------------------------------------------------------------------------
// Component builders
// ---------------------------------------------------------------------------

pub fn actor_definition(type_name: &str) -> DefinitionNode {
    DefinitionNode::new(ACTOR_ELEMENT).with_attr("Type", type_name)
}

pub fn actor_render_component_definition(image_set: &str, z_coord: i32, mirrored: bool) -> DefinitionNode {
    DefinitionNode::new(ACTOR_RENDER_COMPONENT)
        .with_text_child("ImagePath", image_set)
        .with_text_child("Visible", true)
        .with_text_child("Mirrored", mirrored)
        .with_text_child("ZCoord", z_coord)
}

/// Animation component playing every image of the render component.
pub fn cycle_animation_component_definition(
    frame_ms: u32,
    looping: bool,
    remove_actor_on_finish: bool,
) -> DefinitionNode {
    DefinitionNode::new(ANIMATION_COMPONENT)
        .with_child(Animation::cycle(CYCLE_ANIMATION, looping, frame_ms).to_definition())
        .with_text_child("DefaultAnimation", CYCLE_ANIMATION)
        .with_text_child("RemoveActorOnFinish", remove_actor_on_finish)
}

pub fn animation_component_definition(
    animations: &[Animation],
    default_animation: &str,
    paused: bool,
) -> DefinitionNode {
    let mut node = DefinitionNode::new(ANIMATION_COMPONENT);
    for animation in animations {
        node.push_child(animation.to_definition());
    }
    node.with_text_child("DefaultAnimation", default_animation)
        .with_text_child("Paused", paused)
}

pub fn physics_component_definition(body: &BodyDef) -> DefinitionNode {
    body.to_definition()
}

pub fn predefined_move_component_definition(
    moves: &[PredefinedMove],
    is_infinite: bool,
) -> DefinitionNode {
    let mut node = DefinitionNode::new(PREDEFINED_MOVE_COMPONENT)
        .with_text_child("IsInfinite", is_infinite);
    for segment in moves {
        node.push_child(segment.to_definition());
    }
    node
}

pub fn glitter_component_definition(
    glitter_type: &str,
    spawn_immediate: bool,
    follow_owner: bool,
) -> DefinitionNode {
    DefinitionNode::new(GLITTER_COMPONENT)
        .with_text_child("GlitterType", glitter_type)
        .with_text_child("SpawnImmediate", spawn_immediate)
        .with_text_child("FollowOwner", follow_owner)
}

pub fn health_component_definition(health: i32, max_health: i32) -> DefinitionNode {
    DefinitionNode::new(HEALTH_COMPONENT)
        .with_text_child("Health", health)
        .with_text_child("MaxHealth", max_health)
}

pub fn destroyable_component_definition(
    loot: &[PickupType],
    death_sound: Option<&str>,
    explosion: Option<Explosion>,
) -> DefinitionNode {
    let mut node = DefinitionNode::new(DESTROYABLE_COMPONENT);
    for pickup in loot {
        node.push_text_child("Loot", pickup);
    }
    if let Some(sound) = death_sound {
        node.push_text_child("DeathSound", sound);
    }
    if let Some(explosion) = explosion {
        node.push_text_child("ExplosionDamage", explosion.damage);
        node.push_child(size_node("ExplosionSize", explosion.size));
    }
    node
}

/// Marker shown over its owner on demand, see
/// [`crate::components::followable::FollowableComponent`].
pub fn followable_component_definition(offset: Point, image_set: &str, frame_ms: u32) -> DefinitionNode {
    DefinitionNode::new(FOLLOWABLE_COMPONENT)
        .with_child(point_node("Offset", offset))
        .with_text_child("ImagePath", image_set)
        .with_text_child("FrameDuration", frame_ms)
}

pub fn damage_aura_component_definition(def: &DamageAuraComponentDef) -> DefinitionNode {
    def.to_definition()
}

pub fn trigger_component_definition(enter_count: i32) -> DefinitionNode {
    DefinitionNode::new(TRIGGER_COMPONENT).with_text_child("EnterCount", enter_count)
}

pub fn actor_fixture_def_to_definition(def: &FixtureDef) -> DefinitionNode {
    def.to_definition()
}

pub fn definition_to_actor_fixture_def(node: &DefinitionNode) -> EngineResult<FixtureDef> {
    FixtureDef::from_definition(node, ACTOR_ELEMENT)
}

pub fn damage_aura_def_to_definition(def: &DamageAuraComponentDef) -> DefinitionNode {
    def.to_definition()
}

/// Static sensor body with a single fixture of the given type.
fn sensor_body(fixture_type: FixtureType, size: Point, flag: u32, mask: u32) -> BodyDef {
    BodyDef {
        body_type: BodyType::Static,
        size,
        gravity_scale: 0.0,
        collision_flag: flag,
        collision_mask: mask,
        fixtures: vec![FixtureDef {
            fixture_type,
            is_sensor: true,
            size,
            collision_flag: flag,
            collision_mask: mask,
            ..FixtureDef::default()
        }],
        ..BodyDef::default()
    }
}

// ---------------------------------------------------------------------------
// Pickups
// ---------------------------------------------------------------------------

/// Named in level data and in `<Loot>` lists by its variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PickupType {
    TreasureCoin,
    TreasureGoldBar,
    TreasureRing,
    TreasureChalice,
    TreasureCross,
    TreasureScepter,
    TreasureGecko,
    TreasureCrown,
    TreasureSkull,
    FoodItem,
    PotionSmall,
    PotionMedium,
    PotionBig,
    AmmoShot,
    AmmoShotBag,
    AmmoMagic5,
    AmmoMagic10,
    AmmoDynamite,
    PowerupInvulnerability,
    PowerupCatnip,
    PowerupFireSword,
}
string_enum!(PickupType {
    TreasureCoin,
    TreasureGoldBar,
    TreasureRing,
    TreasureChalice,
    TreasureCross,
    TreasureScepter,
    TreasureGecko,
    TreasureCrown,
    TreasureSkull,
    FoodItem,
    PotionSmall,
    PotionMedium,
    PotionBig,
    AmmoShot,
    AmmoShotBag,
    AmmoMagic5,
    AmmoMagic10,
    AmmoDynamite,
    PowerupInvulnerability,
    PowerupCatnip,
    PowerupFireSword
});

/// What a [`PickupType`] looks like, sounds like and does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickupProfile {
    pub image_set: &'static str,
    pub sound: &'static str,
    pub effect: PickupEffect,
}

const SOUND_COIN: &str = "/GAME/SOUNDS/COIN.WAV";
const SOUND_TREASURE: &str = "/GAME/SOUNDS/TREASURE.WAV";
const SOUND_FOOD: &str = "/GAME/SOUNDS/FOODITEM.WAV";
const SOUND_POTION: &str = "/GAME/SOUNDS/MILK.WAV";
const SOUND_AMMO: &str = "/GAME/SOUNDS/AMMUNITION.WAV";
const SOUND_MAGIC: &str = "/GAME/SOUNDS/MAGICPOWERUP.WAV";
const SOUND_POWERUP: &str = "/GAME/SOUNDS/POWERUP.WAV";

impl PickupType {
    pub fn profile(self) -> PickupProfile {
        use PickupEffect as E;
        use PickupType as P;
        let (image_set, sound, effect) = match self {
            P::TreasureCoin => ("/GAME/IMAGES/TREASURE/COINS/*", SOUND_COIN, E::Treasure { points: 100 }),
            P::TreasureGoldBar => ("/GAME/IMAGES/TREASURE/GOLDBARS/*", SOUND_TREASURE, E::Treasure { points: 500 }),
            P::TreasureRing => ("/GAME/IMAGES/TREASURE/RINGS/RED/*", SOUND_TREASURE, E::Treasure { points: 1500 }),
            P::TreasureChalice => ("/GAME/IMAGES/TREASURE/CHALICES/RED/*", SOUND_TREASURE, E::Treasure { points: 2500 }),
            P::TreasureCross => ("/GAME/IMAGES/TREASURE/CROSSES/RED/*", SOUND_TREASURE, E::Treasure { points: 5000 }),
            P::TreasureScepter => ("/GAME/IMAGES/TREASURE/SCEPTERS/RED/*", SOUND_TREASURE, E::Treasure { points: 7500 }),
            P::TreasureGecko => ("/GAME/IMAGES/TREASURE/GECKOS/RED/*", SOUND_TREASURE, E::Treasure { points: 10000 }),
            P::TreasureCrown => ("/GAME/IMAGES/TREASURE/CROWNS/RED/*", SOUND_TREASURE, E::Treasure { points: 15000 }),
            P::TreasureSkull => ("/GAME/IMAGES/TREASURE/JEWELEDSKULL/RED/*", SOUND_TREASURE, E::Treasure { points: 25000 }),
            P::FoodItem => ("/GAME/IMAGES/HEALTH/FOOD/*", SOUND_FOOD, E::Health { amount: 5 }),
            P::PotionSmall => ("/GAME/IMAGES/HEALTH/POTION1/*", SOUND_POTION, E::Health { amount: 10 }),
            P::PotionMedium => ("/GAME/IMAGES/HEALTH/POTION2/*", SOUND_POTION, E::Health { amount: 15 }),
            P::PotionBig => ("/GAME/IMAGES/HEALTH/POTION3/*", SOUND_POTION, E::Health { amount: 25 }),
            P::AmmoShot => ("/GAME/IMAGES/AMMO/SHOT/*", SOUND_AMMO, E::Ammo { ammo: AmmoType::Pistol, count: 5 }),
            P::AmmoShotBag => ("/GAME/IMAGES/AMMO/SHOTBAG/*", SOUND_AMMO, E::Ammo { ammo: AmmoType::Pistol, count: 10 }),
            P::AmmoMagic5 => ("/GAME/IMAGES/AMMO/MAGIC5/*", SOUND_MAGIC, E::Ammo { ammo: AmmoType::Magic, count: 5 }),
            P::AmmoMagic10 => ("/GAME/IMAGES/AMMO/MAGIC10/*", SOUND_MAGIC, E::Ammo { ammo: AmmoType::Magic, count: 10 }),
            P::AmmoDynamite => ("/GAME/IMAGES/AMMO/DYNAMITE/*", SOUND_AMMO, E::Ammo { ammo: AmmoType::Dynamite, count: 3 }),
            P::PowerupInvulnerability => ("/GAME/IMAGES/POWERUPS/INVULNERABLE/*", SOUND_POWERUP, E::Powerup { powerup: PowerupType::Invulnerability, duration_ms: 30000 }),
            P::PowerupCatnip => ("/GAME/IMAGES/POWERUPS/CATNIP/*", SOUND_POWERUP, E::Powerup { powerup: PowerupType::Catnip, duration_ms: 30000 }),
            P::PowerupFireSword => ("/GAME/IMAGES/POWERUPS/FIRESWORD/*", SOUND_POWERUP, E::Powerup { powerup: PowerupType::FireSword, duration_ms: 30000 }),
        };
        PickupProfile {
            image_set,
            sound,
            effect,
        }
    }

    pub fn is_treasure(self) -> bool {
        matches!(self.profile().effect, PickupEffect::Treasure { .. })
    }
}

/// Pickup with an explicit look and sound.
pub fn pickup_definition_with(
    image_set: &str,
    pickup_sound: &str,
    effect: PickupEffect,
    position: Point,
    is_static: bool,
    glitter_type: Option<&str>,
) -> DefinitionNode {
    let size = Point::new(40.0, 40.0);
    let mut body = sensor_body(
        FixtureType::Trigger,
        size,
        collision_flag::PICKUP,
        collision_flag::CONTROLLER,
    );
    if !is_static {
        body.body_type = BodyType::Dynamic;
        body.gravity_scale = 1.0;
        body.collision_mask |= collision_flag::SOLID;
    }

    let mut node = actor_definition("Pickup")
        .with_child(position_definition(position))
        .with_child(actor_render_component_definition(image_set, PICKUP_Z, false))
        .with_child(cycle_animation_component_definition(100, true, false))
        .with_child(physics_component_definition(&body))
        .with_child(trigger_component_definition(UNLIMITED_ENTRIES))
        .with_child(
            DefinitionNode::new(PICKUP_COMPONENT)
                .with_text_child("PickupSound", pickup_sound)
                .with_child(effect.to_definition()),
        );
    if let Some(glitter_type) = glitter_type {
        node.push_child(glitter_component_definition(glitter_type, true, !is_static));
    }
    node
}

pub fn pickup_definition(pickup_type: PickupType, position: Point, is_static: bool) -> DefinitionNode {
    let profile = pickup_type.profile();
    let glitter = pickup_type.is_treasure().then_some("Glitter_Yellow");
    pickup_definition_with(
        profile.image_set,
        profile.sound,
        profile.effect,
        position,
        is_static,
        glitter,
    )
}

pub fn create_pickup(
    spawner: &impl ActorSpawner,
    pickup_type: PickupType,
    position: Point,
    is_static: bool,
) -> EngineResult<Rc<Actor>> {
    spawner.spawn_actor(&pickup_definition(pickup_type, position, is_static))
}

pub fn create_treasure_pickup(
    spawner: &impl ActorSpawner,
    image_set: &str,
    pickup_sound: &str,
    points: i32,
    position: Point,
    is_static: bool,
) -> EngineResult<Rc<Actor>> {
    spawner.spawn_actor(&pickup_definition_with(
        image_set,
        pickup_sound,
        PickupEffect::Treasure { points },
        position,
        is_static,
        Some("Glitter_Yellow"),
    ))
}

pub fn create_health_pickup(
    spawner: &impl ActorSpawner,
    image_set: &str,
    pickup_sound: &str,
    amount: i32,
    position: Point,
    is_static: bool,
) -> EngineResult<Rc<Actor>> {
    spawner.spawn_actor(&pickup_definition_with(
        image_set,
        pickup_sound,
        PickupEffect::Health { amount },
        position,
        is_static,
        None,
    ))
}

pub fn create_ammo_pickup(
    spawner: &impl ActorSpawner,
    image_set: &str,
    pickup_sound: &str,
    ammo: AmmoType,
    count: i32,
    position: Point,
    is_static: bool,
) -> EngineResult<Rc<Actor>> {
    spawner.spawn_actor(&pickup_definition_with(
        image_set,
        pickup_sound,
        PickupEffect::Ammo { ammo, count },
        position,
        is_static,
        None,
    ))
}

pub fn create_powerup_pickup(
    spawner: &impl ActorSpawner,
    image_set: &str,
    pickup_sound: &str,
    powerup: PowerupType,
    duration_ms: u32,
    position: Point,
    is_static: bool,
) -> EngineResult<Rc<Actor>> {
    spawner.spawn_actor(&pickup_definition_with(
        image_set,
        pickup_sound,
        PickupEffect::Powerup {
            powerup,
            duration_ms,
        },
        position,
        is_static,
        Some("Glitter_Green"),
    ))
}

// ---------------------------------------------------------------------------
// Projectiles and area damage
// ---------------------------------------------------------------------------

pub fn projectile_definition(
    image_set: &str,
    damage: i32,
    damage_type: DamageType,
    direction: Direction,
    position: Point,
    flag: u32,
    mask: u32,
) -> DefinitionNode {
    let size = Point::new(10.0, 10.0);
    let body = BodyDef {
        body_type: BodyType::Kinematic,
        size,
        gravity_scale: 0.0,
        is_bullet: true,
        collision_flag: flag,
        collision_mask: mask,
        linear_velocity: Point::new(direction.sign() * PROJECTILE_SPEED, 0.0),
        fixtures: vec![FixtureDef {
            fixture_type: FixtureType::Projectile,
            is_sensor: true,
            size,
            collision_flag: flag,
            collision_mask: mask,
            ..FixtureDef::default()
        }],
    };
    actor_definition("Projectile")
        .with_child(position_definition(position))
        .with_child(actor_render_component_definition(
            image_set,
            PICKUP_Z,
            direction == Direction::Left,
        ))
        .with_child(cycle_animation_component_definition(75, true, false))
        .with_child(physics_component_definition(&body))
        .with_child(
            DefinitionNode::new(PROJECTILE_COMPONENT)
                .with_text_child("Damage", damage)
                .with_text_child("DamageType", damage_type),
        )
}

#[allow(clippy::too_many_arguments)]
pub fn create_projectile(
    spawner: &impl ActorSpawner,
    image_set: &str,
    damage: i32,
    damage_type: DamageType,
    direction: Direction,
    position: Point,
    flag: u32,
    mask: u32,
) -> EngineResult<Rc<Actor>> {
    spawner.spawn_actor(&projectile_definition(
        image_set,
        damage,
        damage_type,
        direction,
        position,
        flag,
        mask,
    ))
}

/// Projectile fired by the player with the given ammunition.
pub fn player_projectile_definition(ammo: AmmoType, direction: Direction, position: Point) -> DefinitionNode {
    let (image_set, damage, damage_type) = match ammo {
        AmmoType::Pistol => ("/GAME/IMAGES/BULLETS/*", 10, DamageType::Bullet),
        AmmoType::Magic => ("/GAME/IMAGES/MAGICCLAW/*", 25, DamageType::Magic),
        AmmoType::Dynamite => ("/GAME/IMAGES/DYNAMITE/*", 15, DamageType::Explosion),
    };
    projectile_definition(
        image_set,
        damage,
        damage_type,
        direction,
        position,
        collision_flag::PROJECTILE,
        collision_flag::ENEMY | collision_flag::SOLID,
    )
}

pub fn create_player_projectile(
    spawner: &impl ActorSpawner,
    ammo: AmmoType,
    direction: Direction,
    position: Point,
) -> EngineResult<Rc<Actor>> {
    spawner.spawn_actor(&player_projectile_definition(ammo, direction, position))
}

/// One-shot damage volume: hits everything of `target_mask` inside it on the
/// first tick, then removes itself.
#[allow(clippy::too_many_arguments)]
pub fn area_damage_definition(
    position: Point,
    size: Point,
    damage: i32,
    target_mask: u32,
    shape: &str,
    damage_type: DamageType,
    offset: Point,
    image_set: Option<&str>,
    z_coord: i32,
) -> DefinitionNode {
    let mut body = sensor_body(
        FixtureType::DamageAura,
        size,
        collision_flag::DAMAGE_AURA,
        target_mask,
    );
    body.fixtures[0].collision_shape = shape.to_string();
    let aura = DamageAuraComponentDef {
        base: BaseAuraComponentDef {
            aura_fixture: body.fixtures[0].clone(),
            is_pulsating: true,
            is_group_pulse: true,
            apply_aura_on_enter: false,
            remove_actor_after_pulse: true,
            pulse_interval: 1,
        },
        damage,
        damage_type,
    };

    let mut node = actor_definition("AreaDamage").with_child(position_definition(Point::new(
        position.x + offset.x,
        position.y + offset.y,
    )));
    if let Some(image_set) = image_set {
        node.push_child(actor_render_component_definition(image_set, z_coord, false));
        node.push_child(cycle_animation_component_definition(50, false, false));
    }
    node.with_child(physics_component_definition(&body))
        .with_child(trigger_component_definition(UNLIMITED_ENTRIES))
        .with_child(damage_aura_component_definition(&aura))
}

#[allow(clippy::too_many_arguments)]
pub fn create_area_damage(
    spawner: &impl ActorSpawner,
    position: Point,
    size: Point,
    damage: i32,
    target_mask: u32,
    shape: &str,
    damage_type: DamageType,
    offset: Point,
    image_set: Option<&str>,
    z_coord: i32,
) -> EngineResult<Rc<Actor>> {
    spawner.spawn_actor(&area_damage_definition(
        position,
        size,
        damage,
        target_mask,
        shape,
        damage_type,
        offset,
        image_set,
        z_coord,
    ))
}

// ---------------------------------------------------------------------------
// Effects
// ---------------------------------------------------------------------------

fn glitter_image_set(glitter_type: &str) -> Option<&'static str> {
    match glitter_type {
        "Glitter_Yellow" => Some("/GAME/IMAGES/GLITTER/*"),
        "Glitter_Red" => Some("/GAME/IMAGES/GLITTERRED/*"),
        "Glitter_Green" => Some("/GAME/IMAGES/GLITTERGREEN/*"),
        "Glitter_Warp" => Some("/GAME/IMAGES/WARPGLITTER/*"),
        _ => None,
    }
}

/// `None` for unknown glitter types.
pub fn glitter_definition(glitter_type: &str, position: Point, z_coord: i32) -> Option<DefinitionNode> {
    let image_set = glitter_image_set(glitter_type)?;
    Some(
        actor_definition(glitter_type)
            .with_child(position_definition(position))
            .with_child(actor_render_component_definition(image_set, z_coord, false))
            .with_child(cycle_animation_component_definition(100, true, false)),
    )
}

pub fn create_glitter(
    spawner: &impl ActorSpawner,
    glitter_type: &str,
    position: Point,
    z_coord: i32,
) -> EngineResult<Rc<Actor>> {
    let definition = glitter_definition(glitter_type, position, z_coord).ok_or_else(|| {
        crate::error::EngineError::malformed(GLITTER_COMPONENT, "GlitterType", glitter_type)
    })?;
    spawner.spawn_actor(&definition)
}

/// The actor a [`crate::components::followable::FollowableComponent`] shows.
pub fn follower_definition(image_set: &str, frame_ms: u32, position: Point) -> DefinitionNode {
    actor_definition(FOLLOWER_TYPE)
        .with_child(position_definition(position))
        .with_child(actor_render_component_definition(image_set, FOLLOWER_Z, false))
        .with_child(cycle_animation_component_definition(frame_ms, true, false))
}

/// Floating score that rises for a second and disappears. `None` for
/// scores without a popup image.
pub fn score_popup_definition(position: Point, points: i32) -> Option<DefinitionNode> {
    let idx = SCORE_POPUP_POINTS.iter().position(|p| *p == points)? + 1;
    let image_set = format!("/GAME/IMAGES/POINTS/*{:03}.*", idx);
    let rise = PredefinedMove {
        duration_ms: SCORE_POPUP_RISE_MS,
        pixels_per_second: Point::new(0.0, SCORE_POPUP_SPEED),
    };
    Some(
        actor_definition("ScorePopup")
            .with_child(position_definition(position))
            .with_child(actor_render_component_definition(&image_set, SCORE_POPUP_Z, false))
            .with_child(predefined_move_component_definition(&[rise], false)),
    )
}

pub fn create_score_popup(
    spawner: &impl ActorSpawner,
    position: Point,
    points: i32,
) -> EngineResult<Option<Rc<Actor>>> {
    score_popup_definition(position, points)
        .map(|definition| spawner.spawn_actor(&definition))
        .transpose()
}

/// Actor that only shows an animation.
pub fn rendered_actor_definition(
    position: Point,
    image_set: &str,
    animation: Option<&Animation>,
    z_coord: i32,
) -> DefinitionNode {
    let node = actor_definition("RenderedActor")
        .with_child(position_definition(position))
        .with_child(actor_render_component_definition(image_set, z_coord, false));
    match animation {
        Some(animation) => node.with_child(animation_component_definition(
            std::slice::from_ref(animation),
            &animation.name,
            false,
        )),
        None => node,
    }
}

pub fn create_rendered_actor(
    spawner: &impl ActorSpawner,
    position: Point,
    image_set: &str,
    animation: Option<&Animation>,
    z_coord: i32,
) -> EngineResult<Rc<Actor>> {
    spawner.spawn_actor(&rendered_actor_definition(position, image_set, animation, z_coord))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleAnimation {
    Explosion,
    RedHitPoint,
    BlueHitPoint,
    Splash,
}

impl SingleAnimation {
    fn image_set(self) -> &'static str {
        match self {
            SingleAnimation::Explosion => "/GAME/IMAGES/DYNAMITEEXPLO/*",
            SingleAnimation::RedHitPoint => "/GAME/IMAGES/CLAWHIT/*",
            SingleAnimation::BlueHitPoint => "/GAME/IMAGES/CLAWHIT2/*",
            SingleAnimation::Splash => "/GAME/IMAGES/SPLASH/*",
        }
    }
}

/// Plays its animation once, then the actor removes itself.
pub fn single_animation_definition(position: Point, animation: SingleAnimation) -> DefinitionNode {
    actor_definition("SingleAnimation")
        .with_child(position_definition(position))
        .with_child(actor_render_component_definition(animation.image_set(), PICKUP_Z, false))
        .with_child(cycle_animation_component_definition(50, false, true))
}

pub fn create_single_animation(
    spawner: &impl ActorSpawner,
    position: Point,
    animation: SingleAnimation,
) -> EngineResult<Rc<Actor>> {
    spawner.spawn_actor(&single_animation_definition(position, animation))
}

// ---------------------------------------------------------------------------
// Level objects
// ---------------------------------------------------------------------------

fn frame_range(range: std::ops::RangeInclusive<u32>, duration_ms: u32) -> Vec<AnimationFrame> {
    range
        .map(|n| AnimationFrame {
            image: crate::resources::imagestore::frame_key(n),
            duration_ms,
            event: None,
        })
        .collect()
}

/// Flag that rises (frames 1-8) when reached, then waves (frames 9-13).
pub fn checkpoint_definition(
    image_set: &str,
    position: Point,
    z_coord: i32,
    spawn_position: Point,
    is_save_checkpoint: bool,
    checkpoint_number: u32,
) -> DefinitionNode {
    let animations = [
        Animation::from_frames("rise", false, frame_range(1..=8, 100)),
        Animation::from_frames("wave", true, frame_range(9..=13, 100)),
    ];
    let body = sensor_body(
        FixtureType::Trigger,
        Point::new(40.0, 100.0),
        collision_flag::TRIGGER,
        collision_flag::CONTROLLER,
    );
    actor_definition("Checkpoint")
        .with_child(position_definition(position))
        .with_child(actor_render_component_definition(image_set, z_coord, false))
        .with_child(animation_component_definition(&animations, "rise", true))
        .with_child(physics_component_definition(&body))
        .with_child(trigger_component_definition(1))
        .with_child(
            DefinitionNode::new(CHECKPOINT_COMPONENT)
                .with_child(point_node("SpawnPosition", spawn_position))
                .with_text_child("IsSaveCheckpoint", is_save_checkpoint)
                .with_text_child("SaveCheckpointNumber", checkpoint_number),
        )
}

pub fn create_checkpoint(
    spawner: &impl ActorSpawner,
    image_set: &str,
    position: Point,
    z_coord: i32,
    spawn_position: Point,
    is_save_checkpoint: bool,
    checkpoint_number: u32,
) -> EngineResult<Rc<Actor>> {
    spawner.spawn_actor(&checkpoint_definition(
        image_set,
        position,
        z_coord,
        spawn_position,
        is_save_checkpoint,
        checkpoint_number,
    ))
}

/// Static body that player attacks can hit.
fn breakable_body(size: Point) -> BodyDef {
    let mask = collision_flag::CONTROLLER | collision_flag::PROJECTILE | collision_flag::DAMAGE_AURA;
    BodyDef {
        body_type: BodyType::Static,
        size,
        collision_flag: collision_flag::ENEMY,
        collision_mask: mask,
        fixtures: vec![FixtureDef {
            fixture_type: FixtureType::Solid,
            size,
            collision_flag: collision_flag::ENEMY,
            collision_mask: mask,
            ..FixtureDef::default()
        }],
        ..BodyDef::default()
    }
}

/// Crate that drops `loot` when broken.
pub fn crate_definition(
    image_set: &str,
    position: Point,
    loot: &[PickupType],
    health: u32,
    z_coord: i32,
) -> DefinitionNode {
    let health = i32::try_from(health).unwrap_or(i32::MAX);
    actor_definition("Crate")
        .with_child(position_definition(position))
        .with_child(actor_render_component_definition(image_set, z_coord, false))
        .with_child(physics_component_definition(&breakable_body(Point::new(40.0, 40.0))))
        .with_child(health_component_definition(health, health))
        .with_child(destroyable_component_definition(loot, Some(SOUND_CRATE_BREAK), None))
}

pub fn create_crate(
    spawner: &impl ActorSpawner,
    image_set: &str,
    position: Point,
    loot: &[PickupType],
    health: u32,
    z_coord: i32,
) -> EngineResult<Rc<Actor>> {
    spawner.spawn_actor(&crate_definition(image_set, position, loot, health, z_coord))
}

/// Keg that explodes on the first hit, hurting everyone around it.
pub fn powder_keg_definition(image_set: &str, position: Point, damage: i32, z_coord: i32) -> DefinitionNode {
    let explosion = Explosion {
        damage,
        size: DEFAULT_EXPLOSION_SIZE,
    };
    actor_definition("PowderKeg")
        .with_child(position_definition(position))
        .with_child(actor_render_component_definition(image_set, z_coord, false))
        .with_child(physics_component_definition(&breakable_body(Point::new(40.0, 50.0))))
        .with_child(health_component_definition(1, 1))
        .with_child(destroyable_component_definition(
            &[],
            Some(SOUND_KEG_EXPLODE),
            Some(explosion),
        ))
}

pub fn create_powder_keg(
    spawner: &impl ActorSpawner,
    image_set: &str,
    position: Point,
    damage: i32,
    z_coord: i32,
) -> EngineResult<Rc<Actor>> {
    spawner.spawn_actor(&powder_keg_definition(image_set, position, damage, z_coord))
}

/// One-way platform that crumbles (paused `crumble` cycle, frames in image
/// order) shortly after something lands on it.
pub fn crumbling_peg_definition(image_set: &str, position: Point, z_coord: i32) -> DefinitionNode {
    let size = Point::new(64.0, 20.0);
    let body = BodyDef {
        body_type: BodyType::Static,
        size,
        collision_flag: collision_flag::SOLID,
        collision_mask: collision_flag::CONTROLLER,
        fixtures: vec![
            FixtureDef {
                fixture_type: FixtureType::Ground,
                size,
                collision_flag: collision_flag::SOLID,
                collision_mask: collision_flag::CONTROLLER,
                ..FixtureDef::default()
            },
            FixtureDef {
                fixture_type: FixtureType::Trigger,
                is_sensor: true,
                size: Point::new(size.x, 5.0),
                offset: Point::new(0.0, -size.y / 2.0),
                collision_flag: collision_flag::TRIGGER,
                collision_mask: collision_flag::CONTROLLER,
                ..FixtureDef::default()
            },
        ],
        ..BodyDef::default()
    };
    let crumble = Animation::cycle("crumble", false, 100);
    actor_definition("CrumblingPeg")
        .with_child(position_definition(position))
        .with_child(actor_render_component_definition(image_set, z_coord, false))
        .with_child(
            animation_component_definition(std::slice::from_ref(&crumble), "crumble", true)
                .with_text_child("RemoveActorOnFinish", true),
        )
        .with_child(physics_component_definition(&body))
        .with_child(trigger_component_definition(UNLIMITED_ENTRIES))
        .with_child(
            DefinitionNode::new(CRUMBLING_PEG_COMPONENT)
                .with_text_child("CrumbleDelay", PEG_CRUMBLE_DELAY_MS),
        )
}

pub fn create_crumbling_peg(
    spawner: &impl ActorSpawner,
    image_set: &str,
    position: Point,
    z_coord: i32,
) -> EngineResult<Rc<Actor>> {
    spawner.spawn_actor(&crumbling_peg_definition(image_set, position, z_coord))
}

pub fn global_ambient_sound_definition(def: &AmbientSoundDef) -> DefinitionNode {
    actor_definition("GlobalAmbientSound").with_child(def.to_definition())
}

pub fn create_global_ambient_sound(
    spawner: &impl ActorSpawner,
    def: &AmbientSoundDef,
) -> EngineResult<Rc<Actor>> {
    spawner.spawn_actor(&global_ambient_sound_definition(def))
}

pub fn sound_trigger_definition(
    sound: &str,
    position: Point,
    size: Point,
    enter_count: i32,
) -> DefinitionNode {
    let body = sensor_body(
        FixtureType::Trigger,
        size,
        collision_flag::TRIGGER,
        collision_flag::CONTROLLER,
    );
    actor_definition("SoundTrigger")
        .with_child(position_definition(position))
        .with_child(physics_component_definition(&body))
        .with_child(trigger_component_definition(enter_count))
        .with_child(DefinitionNode::new(SOUND_TRIGGER_COMPONENT).with_text_child("Sound", sound))
}

pub fn create_sound_trigger(
    spawner: &impl ActorSpawner,
    sound: &str,
    position: Point,
    size: Point,
    enter_count: i32,
) -> EngineResult<Rc<Actor>> {
    spawner.spawn_actor(&sound_trigger_definition(sound, position, size, enter_count))
}

/// Trigger volume implied by a level sound trigger's logic name.
pub fn sound_trigger_size(logic_name: &str) -> Point {
    match logic_name {
        "SmallSoundTrigger" => Point::new(32.0, 32.0),
        "BigSoundTrigger" => Point::new(128.0, 128.0),
        "HugeSoundTrigger" => Point::new(256.0, 256.0),
        "WideSoundTrigger" => Point::new(200.0, 64.0),
        "TallSoundTrigger" => Point::new(64.0, 200.0),
        _ => Point::new(64.0, 64.0),
    }
}

/// Sound trigger as placed in level data: the actor takes `logic_name` as
/// its type. A non-empty `preset` rectangle fixes the trigger's area and
/// overrides both `position` and the logic name's size.
pub fn preset_sound_trigger_definition(
    sound: &str,
    logic_name: &str,
    position: Point,
    preset: Rect,
    enter_count: i32,
) -> DefinitionNode {
    let (position, size) = if preset.is_empty() {
        (position, sound_trigger_size(logic_name))
    } else {
        (
            Point::new(
                preset.x as f32 + preset.w as f32 / 2.0,
                preset.y as f32 + preset.h as f32 / 2.0,
            ),
            Point::new(preset.w as f32, preset.h as f32),
        )
    };
    let mut node = sound_trigger_definition(sound, position, size, enter_count);
    node.set_attr("Type", logic_name);
    node
}

pub fn create_preset_sound_trigger(
    spawner: &impl ActorSpawner,
    sound: &str,
    logic_name: &str,
    position: Point,
    preset: Rect,
    enter_count: i32,
) -> EngineResult<Rc<Actor>> {
    spawner.spawn_actor(&preset_sound_trigger_definition(
        sound,
        logic_name,
        position,
        preset,
        enter_count,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_popup_only_for_known_scores() {
        let popup = score_popup_definition(Point::new(5.0, 5.0), 1500).expect("popup");
        let render = popup.child(ACTOR_RENDER_COMPONENT).expect("render");
        assert_eq!(render.child_text("ImagePath"), Some("/GAME/IMAGES/POINTS/*003.*"));
        assert!(score_popup_definition(Point::default(), 42).is_none());
    }

    #[test]
    fn test_treasure_pickups_glitter() {
        let coin = pickup_definition(PickupType::TreasureCoin, Point::new(1.0, 1.0), true);
        assert!(coin.child(GLITTER_COMPONENT).is_some());
        let food = pickup_definition(PickupType::FoodItem, Point::new(1.0, 1.0), true);
        assert!(food.child(GLITTER_COMPONENT).is_none());
    }

    #[test]
    fn test_fixture_conversion_round_trip() {
        let fixture = FixtureDef {
            fixture_type: FixtureType::Climb,
            size: Point::new(8.0, 64.0),
            ..FixtureDef::default()
        };
        let back = definition_to_actor_fixture_def(&actor_fixture_def_to_definition(&fixture))
            .expect("fixture");
        assert_eq!(back, fixture);
    }

    #[test]
    fn test_pickup_type_names_parse_back() {
        assert_eq!(PickupType::AmmoMagic10.to_string(), "AmmoMagic10");
        assert_eq!("PotionBig".parse::<PickupType>(), Ok(PickupType::PotionBig));
        assert!("Anvil".parse::<PickupType>().is_err());
    }

    #[test]
    fn test_preset_rect_overrides_size_and_position() {
        let at = Point::new(10.0, 10.0);
        let sized = preset_sound_trigger_definition("/S.WAV", "WideSoundTrigger", at, Rect::default(), 1);
        assert_eq!(sized.attr("Type"), Some("WideSoundTrigger"));
        let body = BodyDef::from_definition(sized.child("PhysicsComponent").expect("physics"))
            .expect("body");
        assert_eq!(body.size, Point::new(200.0, 64.0));

        let preset = preset_sound_trigger_definition(
            "/S.WAV",
            "SoundTrigger",
            at,
            Rect::new(100, 200, 40, 60),
            1,
        );
        let body = BodyDef::from_definition(preset.child("PhysicsComponent").expect("physics"))
            .expect("body");
        assert_eq!(body.size, Point::new(40.0, 60.0));
        let position = preset
            .child("PositionComponent")
            .and_then(|p| p.child("Position"))
            .expect("position");
        assert_eq!(position.attr("x"), Some("120"));
        assert_eq!(position.attr("y"), Some("230"));
    }

    #[test]
    fn test_crate_health_saturates() {
        let big = crate_definition("/C/*", Point::default(), &[], u32::MAX, 0);
        let health = big.child(HEALTH_COMPONENT).expect("health");
        assert_eq!(health.child_text("Health"), Some("2147483647"));
    }

    #[test]
    fn test_projectile_direction() {
        let left = player_projectile_definition(AmmoType::Pistol, Direction::Left, Point::default());
        let body = BodyDef::from_definition(left.child("PhysicsComponent").expect("physics"))
            .expect("body");
        assert_eq!(body.linear_velocity, Point::new(-PROJECTILE_SPEED, 0.0));
    }
}
