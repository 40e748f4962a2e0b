//! Scripted movement: a list of constant-velocity segments.
//!
//! Each [`PredefinedMove`] moves the actor at `pixels_per_second` for
//! `duration_ms`. An infinite sequence starts over after the last segment;
//! a finite one asks the session to remove the actor.

use crate::actors::actor::Owner;
use crate::components::physics::{point_node, read_point};
use crate::components::position::PositionComponent;
use crate::components::{Component, InitContext};
use crate::error::{EngineError, EngineResult};
use crate::events::GameEvent;
use crate::geometry::Point;
use crate::resources::definition::{DefinitionNode, Fields};

pub const PREDEFINED_MOVE_COMPONENT: &str = "PredefinedMoveComponent";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredefinedMove {
    pub duration_ms: u32,
    pub pixels_per_second: Point,
}

impl PredefinedMove {
    pub fn to_definition(&self) -> DefinitionNode {
        DefinitionNode::new("PredefinedMove")
            .with_text_child("DurationMs", self.duration_ms)
            .with_child(point_node("PixelsPerSecond", self.pixels_per_second))
    }

    fn from_definition(node: &DefinitionNode) -> EngineResult<Self> {
        let f = Fields::new(node, PREDEFINED_MOVE_COMPONENT);
        let duration_ms: u32 = f.req("DurationMs")?;
        if duration_ms == 0 {
            return Err(EngineError::malformed(
                PREDEFINED_MOVE_COMPONENT,
                "DurationMs",
                "0",
            ));
        }
        Ok(Self {
            duration_ms,
            pixels_per_second: read_point(&f, "PixelsPerSecond")?.unwrap_or_default(),
        })
    }
}

pub struct PredefinedMoveComponent {
    owner: Owner,
    moves: Vec<PredefinedMove>,
    is_infinite: bool,
    current: usize,
    elapsed_ms: u32,
    finished: bool,
}

impl PredefinedMoveComponent {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            moves: Vec::new(),
            is_infinite: false,
            current: 0,
            elapsed_ms: 0,
            finished: false,
        }
    }

    pub fn moves(&self) -> &[PredefinedMove] {
        &self.moves
    }

    pub fn current_move(&self) -> Option<&PredefinedMove> {
        self.moves.get(self.current)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn finish(&mut self) {
        self.finished = true;
        self.owner
            .bus()
            .publish_queued(GameEvent::RequestDestroyActor {
                actor: self.owner.id(),
            });
    }
}

impl Component for PredefinedMoveComponent {
    fn name(&self) -> &'static str {
        PREDEFINED_MOVE_COMPONENT
    }

    fn owner(&self) -> &Owner {
        &self.owner
    }

    fn init(&mut self, data: &DefinitionNode, _ctx: &InitContext) -> EngineResult<()> {
        let f = Fields::new(data, PREDEFINED_MOVE_COMPONENT);
        f.set_bool_if(&mut self.is_infinite, "IsInfinite")?;
        self.moves = data
            .children_named("PredefinedMove")
            .map(PredefinedMove::from_definition)
            .collect::<EngineResult<_>>()?;
        if self.moves.is_empty() {
            return Err(EngineError::missing(
                PREDEFINED_MOVE_COMPONENT,
                "PredefinedMove",
            ));
        }
        Ok(())
    }

    fn wants_update(&self) -> bool {
        !self.finished
    }

    fn update(&mut self, delta_ms: u32) {
        let Some(position) = self.owner.component::<PositionComponent>() else {
            return;
        };
        let Ok(mut position) = position.try_borrow_mut() else {
            return;
        };
        let mut left = delta_ms;
        while left > 0 && !self.finished {
            let segment = self.moves[self.current];
            let step = left.min(segment.duration_ms - self.elapsed_ms);
            let dt = step as f32 / 1000.0;
            position.translate(
                segment.pixels_per_second.x * dt,
                segment.pixels_per_second.y * dt,
            );
            self.elapsed_ms += step;
            left -= step;
            if self.elapsed_ms < segment.duration_ms {
                continue;
            }
            self.elapsed_ms = 0;
            self.current += 1;
            if self.current == self.moves.len() {
                if self.is_infinite {
                    self.current = 0;
                } else {
                    self.current -= 1;
                    self.finish();
                }
            }
        }
    }

    fn to_definition(&self) -> DefinitionNode {
        let mut node = DefinitionNode::new(PREDEFINED_MOVE_COMPONENT)
            .with_text_child("IsInfinite", self.is_infinite);
        for segment in &self.moves {
            node.push_child(segment.to_definition());
        }
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::actor::{Actor, ActorId};
    use crate::components::ComponentSlot;
    use crate::events::bus::EventBus;
    use std::rc::Rc;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    fn actor_with_moves(moves: Vec<PredefinedMove>, infinite: bool) -> Rc<Actor> {
        let bus = Rc::new(EventBus::new());
        let actor = Actor::new(ActorId(1), "Popup", bus);
        actor
            .add_component(ComponentSlot::new(PositionComponent::new(actor.owner())))
            .expect("position");
        let mut component = PredefinedMoveComponent::new(actor.owner());
        component.moves = moves;
        component.is_infinite = infinite;
        actor
            .add_component(ComponentSlot::new(component))
            .expect("moves");
        actor.post_init().expect("post_init");
        actor
    }

    #[test]
    fn test_segments_span_ticks() {
        let actor = actor_with_moves(
            vec![
                PredefinedMove {
                    duration_ms: 100,
                    pixels_per_second: Point::new(0.0, -100.0),
                },
                PredefinedMove {
                    duration_ms: 100,
                    pixels_per_second: Point::new(100.0, 0.0),
                },
            ],
            false,
        );
        actor.update(150);
        let position = actor.component::<PositionComponent>().expect("position");
        assert!(approx_eq(position.borrow().y(), -10.0));
        assert!(approx_eq(position.borrow().x(), 5.0));

        actor.update(100);
        let moves = actor.component::<PredefinedMoveComponent>().expect("moves");
        assert!(moves.borrow().is_finished());
        assert_eq!(actor.owner().bus().queued_len(), 1);
        assert!(approx_eq(position.borrow().x(), 10.0));
    }

    #[test]
    fn test_infinite_wraps() {
        let actor = actor_with_moves(
            vec![PredefinedMove {
                duration_ms: 50,
                pixels_per_second: Point::new(20.0, 0.0),
            }],
            true,
        );
        actor.update(120);
        let moves = actor.component::<PredefinedMoveComponent>().expect("moves");
        assert!(!moves.borrow().is_finished());
        assert_eq!(moves.borrow().elapsed_ms, 20);
    }
}
