//! Pegs that give way under the player.
//!
//! The peg waits, animation paused, until something enters its trigger. After
//! `CrumbleDelay` ms the crumble animation resumes; on its last frame the body
//! leaves the simulation so whatever stood on it falls. The animation's
//! `RemoveActorOnFinish` takes the actor away afterwards.

use crate::actors::actor::{Actor, Owner};
use crate::components::animation::{
    AnimationComponent, AnimationObserver, observe_animation, unobserve_animation,
};
use crate::components::physics::PhysicsComponent;
use crate::components::trigger::{TriggerObserver, observe_trigger, unobserve_trigger};
use crate::components::{Component, InitContext};
use crate::error::EngineResult;
use crate::events::GameEvent;
use crate::resources::definition::{DefinitionNode, Fields};
use log::{debug, warn};
use std::rc::Rc;

pub const CRUMBLING_PEG_COMPONENT: &str = "CrumblingPegComponent";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PegState {
    Intact,
    /// Stepped on; the crumble starts when the delay runs out.
    Shaking { left_ms: u32 },
    Crumbling,
    Gone,
}

pub struct CrumblingPegComponent {
    owner: Owner,
    crumble_delay_ms: u32,
    crumble_sound: Option<String>,
    state: PegState,
}

impl CrumblingPegComponent {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            crumble_delay_ms: 0,
            crumble_sound: None,
            state: PegState::Intact,
        }
    }

    pub fn state(&self) -> PegState {
        self.state
    }

    fn crumble(&mut self) {
        self.state = PegState::Crumbling;
        debug!("Peg {} crumbles", self.owner.id());
        if let Some(animation) = self.owner.component::<AnimationComponent>() {
            match animation.try_borrow_mut() {
                Ok(mut animation) => animation.resume(),
                Err(_) => warn!("Animation of peg {} is busy", self.owner.id()),
            }
        }
        if let Some(sound) = &self.crumble_sound {
            self.owner
                .bus()
                .publish(GameEvent::play_sound(sound.as_str(), 100));
        }
    }
}

impl TriggerObserver for CrumblingPegComponent {
    fn on_actor_entered(&mut self, other: &Rc<Actor>) {
        if self.state != PegState::Intact {
            return;
        }
        debug!("Actor {} stepped on peg {}", other.id(), self.owner.id());
        if self.crumble_delay_ms == 0 {
            self.crumble();
        } else {
            self.state = PegState::Shaking {
                left_ms: self.crumble_delay_ms,
            };
        }
    }
}

impl AnimationObserver for CrumblingPegComponent {
    fn on_animation_at_last_frame(&mut self, _animation: &str) {
        if self.state != PegState::Crumbling {
            return;
        }
        self.state = PegState::Gone;
        if let Some(physics) = self.owner.component::<PhysicsComponent>() {
            match physics.try_borrow_mut() {
                Ok(mut physics) => physics.destroy(),
                Err(_) => warn!("Physics of peg {} is busy, body kept", self.owner.id()),
            }
        }
    }
}

impl Component for CrumblingPegComponent {
    fn name(&self) -> &'static str {
        CRUMBLING_PEG_COMPONENT
    }

    fn owner(&self) -> &Owner {
        &self.owner
    }

    fn init(&mut self, data: &DefinitionNode, _ctx: &InitContext) -> EngineResult<()> {
        let f = Fields::new(data, CRUMBLING_PEG_COMPONENT);
        f.set_if(&mut self.crumble_delay_ms, "CrumbleDelay")?;
        self.crumble_sound = f.text("CrumbleSound").map(str::to_string);
        Ok(())
    }

    fn post_init(&mut self) -> EngineResult<()> {
        observe_trigger::<CrumblingPegComponent>(&self.owner)?;
        observe_animation::<CrumblingPegComponent>(&self.owner)
    }

    fn wants_update(&self) -> bool {
        matches!(self.state, PegState::Shaking { .. })
    }

    fn update(&mut self, delta_ms: u32) {
        if let PegState::Shaking { left_ms } = self.state {
            match left_ms.checked_sub(delta_ms) {
                Some(left_ms) if left_ms > 0 => self.state = PegState::Shaking { left_ms },
                _ => self.crumble(),
            }
        }
    }

    fn to_definition(&self) -> DefinitionNode {
        let node = DefinitionNode::new(CRUMBLING_PEG_COMPONENT)
            .with_text_child("CrumbleDelay", self.crumble_delay_ms);
        match &self.crumble_sound {
            Some(sound) => node.with_text_child("CrumbleSound", sound),
            None => node,
        }
    }

    fn on_destroy(&mut self) {
        unobserve_trigger::<CrumblingPegComponent>(&self.owner);
        unobserve_animation::<CrumblingPegComponent>(&self.owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::factory::ActorFactory;
    use crate::actors::templates;
    use crate::events::EventType;
    use crate::events::bus::EventBus;
    use crate::geometry::Point;
    use crate::resources::loader::{ImageAsset, MemoryLoader};
    use crate::resources::palette::Palette;
    use std::cell::RefCell;

    fn peg(delay_ms: u32) -> (Rc<EventBus>, Rc<Actor>, Rc<Actor>) {
        let bus = Rc::new(EventBus::new());
        let mut loader = MemoryLoader::new();
        for n in 1..=3 {
            loader.insert_image(&format!("/PEG/{:03}.pid", n), ImageAsset::new(64, 20));
        }
        let factory = ActorFactory::new(Rc::clone(&bus), Rc::new(loader), Palette::new(), "pid");
        let mut definition = templates::crumbling_peg_definition("/PEG/*", Point::new(0.0, 0.0), 1000);
        definition.children.retain(|c| c.name != CRUMBLING_PEG_COMPONENT);
        definition.push_child(
            DefinitionNode::new(CRUMBLING_PEG_COMPONENT)
                .with_text_child("CrumbleDelay", delay_ms)
                .with_text_child("CrumbleSound", "/PEG/CRACK.WAV"),
        );
        let peg = factory.create_actor(&definition).expect("peg");
        let walker = factory
            .create_actor(&DefinitionNode::new("Actor").with_attr("Type", "Player"))
            .expect("walker");
        (bus, peg, walker)
    }

    fn component(actor: &Actor) -> Rc<RefCell<CrumblingPegComponent>> {
        actor.component::<CrumblingPegComponent>().expect("peg component")
    }

    #[test]
    fn test_waits_for_the_delay_before_crumbling() {
        let (_bus, peg, walker) = peg(200);
        assert!(crate::systems::triggers::actor_entered(&peg, &walker));
        assert_eq!(component(&peg).borrow().state(), PegState::Shaking { left_ms: 200 });
        peg.update(150);
        assert_eq!(component(&peg).borrow().state(), PegState::Shaking { left_ms: 50 });
        peg.update(50);
        assert_eq!(component(&peg).borrow().state(), PegState::Crumbling);
        let animation = peg.component::<AnimationComponent>().expect("animation");
        assert!(!animation.borrow().is_paused());
    }

    #[test]
    fn test_zero_delay_crumbles_at_once_with_sound() {
        let (bus, peg, walker) = peg(0);
        let sounds = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&sounds);
        bus.subscribe(bus.new_receiver(), EventType::RequestPlaySound, move |event| {
            if let GameEvent::RequestPlaySound { sound, .. } = event {
                sink.borrow_mut().push(sound.clone());
            }
        });
        crate::systems::triggers::actor_entered(&peg, &walker);
        assert_eq!(component(&peg).borrow().state(), PegState::Crumbling);
        assert_eq!(*sounds.borrow(), vec!["/PEG/CRACK.WAV".to_string()]);
    }

    #[test]
    fn test_body_leaves_on_the_last_frame() {
        let (_bus, peg, walker) = peg(0);
        crate::systems::triggers::actor_entered(&peg, &walker);
        let physics = peg.component::<PhysicsComponent>().expect("physics");
        peg.update(100);
        assert!(physics.borrow().is_active());
        peg.update(100);
        peg.update(0);
        assert_eq!(component(&peg).borrow().state(), PegState::Gone);
        assert!(!physics.borrow().is_active());
    }
}
