//! Frame sequencing for actor sprites.
//!
//! An [`AnimationComponent`] holds named [`Animation`]s and plays one at a
//! time, pushing the current frame's image into the sibling
//! [`RenderComponent`]. Other components follow playback by registering as
//! [`AnimationObserver`]s; they are told about frame changes, loops and
//! reaching the last frame.
//!
//! # Definition
//!
//! ```text
//! <AnimationComponent>
//!   <Animation name="swipe" loop="false">
//!     <Frame image="frame010" duration="80"/>
//!     <Frame image="frame011" duration="80" event="attack"/>
//!   </Animation>
//!   <Animation name="cycle100" type="cycle" duration="100"/>
//!   <DefaultAnimation>swipe</DefaultAnimation>
//!   <Paused>false</Paused>
//!   <RemoveActorOnFinish>false</RemoveActorOnFinish>
//! </AnimationComponent>
//! ```
//!
//! A `cycle` animation plays every image of the render component in key
//! order; its frames are resolved in `post_init`, once the images are loaded.
//!
//! Contract
//! - Frame durations are strictly positive.
//! - Observers are notified after the component's borrow is released, so
//!   they may call back into it (e.g. switch animation on a loop).

use crate::actors::actor::Owner;
use crate::components::render::RenderComponent;
use crate::components::{Component, Deferred, InitContext, ObserverList, notify_each};
use crate::error::{EngineError, EngineResult};
use crate::events::GameEvent;
use crate::resources::definition::{DefinitionNode, Fields, parse_bool};
use log::{debug, warn};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub const ANIMATION_COMPONENT: &str = "AnimationComponent";

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationFrame {
    pub image: String,
    pub duration_ms: u32,
    /// Gameplay cue attached to this frame (`attack`, `fire`, ...).
    pub event: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnimationSource {
    Frames(Vec<AnimationFrame>),
    /// Every render image, each shown for `duration_ms`.
    Cycle { duration_ms: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub name: String,
    pub looping: bool,
    pub source: AnimationSource,
    frames: Vec<AnimationFrame>,
}

impl Animation {
    pub fn from_frames(name: impl Into<String>, looping: bool, frames: Vec<AnimationFrame>) -> Self {
        Self {
            name: name.into(),
            looping,
            source: AnimationSource::Frames(frames.clone()),
            frames,
        }
    }

    pub fn cycle(name: impl Into<String>, looping: bool, duration_ms: u32) -> Self {
        Self {
            name: name.into(),
            looping,
            source: AnimationSource::Cycle { duration_ms },
            frames: Vec::new(),
        }
    }

    pub fn frames(&self) -> &[AnimationFrame] {
        &self.frames
    }

    fn resolve_cycle<'a>(&mut self, images: impl Iterator<Item = &'a str>) {
        if let AnimationSource::Cycle { duration_ms } = self.source {
            self.frames = images
                .map(|image| AnimationFrame {
                    image: image.to_string(),
                    duration_ms,
                    event: None,
                })
                .collect();
        }
    }

    pub fn to_definition(&self) -> DefinitionNode {
        let node = DefinitionNode::new("Animation")
            .with_attr("name", &self.name)
            .with_attr("loop", self.looping);
        match &self.source {
            AnimationSource::Cycle { duration_ms } => node
                .with_attr("type", "cycle")
                .with_attr("duration", duration_ms),
            AnimationSource::Frames(frames) => frames.iter().fold(node, |node, frame| {
                let mut f = DefinitionNode::new("Frame")
                    .with_attr("image", &frame.image)
                    .with_attr("duration", frame.duration_ms);
                if let Some(event) = &frame.event {
                    f.set_attr("event", event);
                }
                node.with_child(f)
            }),
        }
    }

    pub fn from_definition(node: &DefinitionNode) -> EngineResult<Self> {
        let name = node
            .attr("name")
            .ok_or_else(|| EngineError::missing(ANIMATION_COMPONENT, "Animation.name"))?;
        let looping = match node.attr("loop") {
            Some(raw) => parse_bool(raw)
                .ok_or_else(|| EngineError::malformed(ANIMATION_COMPONENT, "Animation.loop", raw))?,
            None => true,
        };
        let duration = |raw: Option<&str>, field: &str| -> EngineResult<u32> {
            let raw = raw.ok_or_else(|| EngineError::missing(ANIMATION_COMPONENT, field))?;
            match raw.trim().parse::<u32>() {
                Ok(ms) if ms > 0 => Ok(ms),
                _ => Err(EngineError::malformed(ANIMATION_COMPONENT, field, raw)),
            }
        };

        if node.attr("type") == Some("cycle") {
            let ms = duration(node.attr("duration"), "Animation.duration")?;
            return Ok(Animation::cycle(name, looping, ms));
        }

        let mut frames = Vec::new();
        for frame in node.children_named("Frame") {
            let image = frame
                .attr("image")
                .ok_or_else(|| EngineError::missing(ANIMATION_COMPONENT, "Frame.image"))?;
            frames.push(AnimationFrame {
                image: image.to_string(),
                duration_ms: duration(frame.attr("duration"), "Frame.duration")?,
                event: frame.attr("event").map(str::to_string),
            });
        }
        if frames.is_empty() {
            return Err(EngineError::missing(ANIMATION_COMPONENT, "Frame"));
        }
        Ok(Animation::from_frames(name, looping, frames))
    }
}

/// Receives playback notifications from an [`AnimationComponent`].
pub trait AnimationObserver {
    fn on_animation_frame_changed(
        &mut self,
        _animation: &str,
        _last: Option<&AnimationFrame>,
        _new: &AnimationFrame,
    ) {
    }
    fn on_animation_looped(&mut self, _animation: &str) {}
    fn on_animation_at_last_frame(&mut self, _animation: &str) {}
}

#[derive(Debug, Clone)]
enum Notice {
    FrameChanged {
        animation: String,
        last: Option<AnimationFrame>,
        new: AnimationFrame,
    },
    Looped(String),
    AtLastFrame(String),
}

pub struct AnimationComponent {
    owner: Owner,
    animations: Vec<Animation>,
    default_animation: Option<String>,
    current: Option<usize>,
    frame_idx: usize,
    elapsed_ms: u32,
    paused: bool,
    finished: bool,
    remove_actor_on_finish: bool,
    observers: ObserverList<dyn AnimationObserver>,
    pending: Vec<Notice>,
}

impl AnimationComponent {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            animations: Vec::new(),
            default_animation: None,
            current: None,
            frame_idx: 0,
            elapsed_ms: 0,
            paused: false,
            finished: false,
            remove_actor_on_finish: false,
            observers: ObserverList::new(),
            pending: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Weak<RefCell<dyn AnimationObserver>>) -> bool {
        self.observers.add(observer)
    }

    pub fn remove_observer(&mut self, observer: &Weak<RefCell<dyn AnimationObserver>>) {
        self.observers.remove(observer);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn has_animation(&self, name: &str) -> bool {
        self.animations.iter().any(|a| a.name == name)
    }

    pub fn current_animation(&self) -> Option<&Animation> {
        self.current.map(|i| &self.animations[i])
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current_animation().map(|a| a.name.as_str())
    }

    pub fn current_frame(&self) -> Option<&AnimationFrame> {
        self.current_animation()
            .and_then(|a| a.frames.get(self.frame_idx))
    }

    pub fn frame_index(&self) -> usize {
        self.frame_idx
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Switch to `name` from its first frame. Switching to the animation that
    /// is already playing does nothing. Returns `false` for unknown names.
    pub fn set_animation(&mut self, name: &str) -> bool {
        let Some(idx) = self.animations.iter().position(|a| a.name == name) else {
            warn!(
                "Actor {} has no animation '{}'",
                self.owner.id(),
                name
            );
            return false;
        };
        if self.current == Some(idx) && !self.finished {
            return true;
        }
        if self.animations[idx].frames.is_empty() {
            warn!("Animation '{}' has no frames", name);
            return false;
        }
        let last = self.current_frame().cloned();
        self.current = Some(idx);
        self.frame_idx = 0;
        self.elapsed_ms = 0;
        self.finished = false;
        self.enter_frame(last);
        true
    }

    fn enter_frame(&mut self, last: Option<AnimationFrame>) {
        let Some(animation) = self.current.map(|i| &self.animations[i]) else {
            return;
        };
        let new = animation.frames[self.frame_idx].clone();
        let name = animation.name.clone();
        let at_last = self.frame_idx + 1 == animation.frames.len();

        if let Some(render) = self.owner.component::<RenderComponent>() {
            match render.try_borrow_mut() {
                Ok(mut render) => render.set_image(&new.image),
                Err(_) => debug!("Render component busy, frame image deferred"),
            }
        }

        self.pending.push(Notice::FrameChanged {
            animation: name.clone(),
            last,
            new,
        });
        if at_last {
            self.pending.push(Notice::AtLastFrame(name));
        }
    }

    fn advance(&mut self) -> bool {
        let Some(idx) = self.current else {
            return false;
        };
        let len = self.animations[idx].frames.len();
        let last = self.current_frame().cloned();
        if self.frame_idx + 1 < len {
            self.frame_idx += 1;
            self.enter_frame(last);
            return true;
        }
        if self.animations[idx].looping {
            self.frame_idx = 0;
            self.pending
                .push(Notice::Looped(self.animations[idx].name.clone()));
            self.enter_frame(last);
            return true;
        }
        self.finished = true;
        if self.remove_actor_on_finish {
            self.owner
                .bus()
                .publish_queued(GameEvent::RequestDestroyActor {
                    actor: self.owner.id(),
                });
        }
        false
    }
}

impl Component for AnimationComponent {
    fn name(&self) -> &'static str {
        ANIMATION_COMPONENT
    }

    fn owner(&self) -> &Owner {
        &self.owner
    }

    fn init(&mut self, data: &DefinitionNode, _ctx: &InitContext) -> EngineResult<()> {
        let f = Fields::new(data, ANIMATION_COMPONENT);
        for node in data.children_named("Animation") {
            let animation = Animation::from_definition(node)?;
            if self.has_animation(&animation.name) {
                warn!("Duplicate animation '{}' ignored", animation.name);
                continue;
            }
            self.animations.push(animation);
        }
        if self.animations.is_empty() {
            return Err(EngineError::missing(ANIMATION_COMPONENT, "Animation"));
        }
        self.default_animation = f.text("DefaultAnimation").map(str::to_string);
        f.set_bool_if(&mut self.paused, "Paused")?;
        f.set_bool_if(&mut self.remove_actor_on_finish, "RemoveActorOnFinish")?;
        Ok(())
    }

    fn post_init(&mut self) -> EngineResult<()> {
        if self
            .animations
            .iter()
            .any(|a| matches!(a.source, AnimationSource::Cycle { .. }))
        {
            let render = self.owner.component::<RenderComponent>().ok_or_else(|| {
                EngineError::invariant("cycle animation without a render component")
            })?;
            let render = render.borrow();
            for animation in &mut self.animations {
                animation.resolve_cycle(render.image_keys());
            }
        }

        let start = match &self.default_animation {
            Some(name) if self.has_animation(name) => name.clone(),
            Some(name) => {
                return Err(EngineError::malformed(
                    ANIMATION_COMPONENT,
                    "DefaultAnimation",
                    name,
                ));
            }
            None => self.animations[0].name.clone(),
        };
        if !self.set_animation(&start) {
            warn!(
                "Actor {} starts without a playable animation",
                self.owner.id()
            );
        }
        Ok(())
    }

    fn wants_update(&self) -> bool {
        !self.paused && !self.finished && self.current.is_some()
    }

    fn update(&mut self, delta_ms: u32) {
        self.elapsed_ms += delta_ms;
        while let Some(frame) = self.current_frame() {
            let duration = frame.duration_ms;
            if self.elapsed_ms < duration {
                break;
            }
            self.elapsed_ms -= duration;
            if !self.advance() {
                self.elapsed_ms = 0;
                break;
            }
        }
    }

    fn take_deferred(&mut self) -> Vec<Deferred> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        let notices = std::mem::take(&mut self.pending);
        let observers = self.observers.snapshot();
        if observers.is_empty() {
            return Vec::new();
        }
        let work: Deferred = Box::new(move || {
            for notice in &notices {
                notify_each(&observers, |o| match notice {
                    Notice::FrameChanged {
                        animation,
                        last,
                        new,
                    } => o.on_animation_frame_changed(animation, last.as_ref(), new),
                    Notice::Looped(animation) => o.on_animation_looped(animation),
                    Notice::AtLastFrame(animation) => o.on_animation_at_last_frame(animation),
                });
            }
        });
        vec![work]
    }

    fn to_definition(&self) -> DefinitionNode {
        let mut node = DefinitionNode::new(ANIMATION_COMPONENT);
        for animation in &self.animations {
            node.push_child(animation.to_definition());
        }
        if let Some(default) = &self.default_animation {
            node.push_text_child("DefaultAnimation", default);
        }
        node.push_text_child("Paused", self.paused);
        node.push_text_child("RemoveActorOnFinish", self.remove_actor_on_finish);
        node
    }
}

/// Helper for observers registering themselves from `post_init`.
pub fn observe_animation<T: AnimationObserver + Component>(owner: &Owner) -> EngineResult<()> {
    let animation = owner
        .component::<AnimationComponent>()
        .ok_or_else(|| EngineError::invariant(format!("actor {} has no animation", owner.id())))?;
    let me = owner
        .component::<T>()
        .ok_or_else(|| EngineError::invariant("observer is not attached to its actor"))?;
    let me: Rc<RefCell<dyn AnimationObserver>> = me;
    animation.borrow_mut().add_observer(Rc::downgrade(&me));
    Ok(())
}

/// Counterpart of [`observe_animation`] for `on_destroy`.
pub fn unobserve_animation<T: AnimationObserver + Component>(owner: &Owner) {
    let (Some(animation), Some(me)) = (
        owner.component::<AnimationComponent>(),
        owner.component::<T>(),
    ) else {
        return;
    };
    let me: Rc<RefCell<dyn AnimationObserver>> = me;
    if let Ok(mut animation) = animation.try_borrow_mut() {
        animation.remove_observer(&Rc::downgrade(&me));
    }
}
