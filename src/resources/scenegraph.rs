//! Scene-graph collaborator.
//!
//! Render components create one [`SceneNode`] each and announce it on the bus
//! (`NewRenderComponent`, and `NewHudElement` for HUD elements). The
//! [`SceneGraph`] only listens: it collects announced nodes and drops every
//! node of an actor when `ActorDestroyed` arrives. It never pulls from actors.
//!
//! Nodes point back at their render component weakly, so a node that outlives
//! its actor simply stops drawing.

use crate::actors::actor::ActorId;
use crate::components::render::RenderComponent;
use crate::events::bus::{EventBus, ReceiverId};
use crate::events::{EventType, GameEvent};
use crate::geometry::Point;
use log::debug;
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Draw order, back to front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RenderPass {
    Background,
    Action,
    Actor,
    Foreground,
    Hud,
}

pub struct SceneNode {
    pub owner: ActorId,
    pub renderer: Weak<RefCell<RenderComponent>>,
    pub pass: RenderPass,
    pub position: Point,
    pub z_order: i32,
}

impl fmt::Debug for SceneNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneNode")
            .field("owner", &self.owner)
            .field("pass", &self.pass)
            .field("position", &self.position)
            .field("z_order", &self.z_order)
            .field("renderer_alive", &(self.renderer.strong_count() > 0))
            .finish()
    }
}

pub type NodeHandle = Rc<SceneNode>;

pub fn create_node(
    owner: ActorId,
    renderer: Weak<RefCell<RenderComponent>>,
    pass: RenderPass,
    position: Point,
    z_order: i32,
) -> NodeHandle {
    Rc::new(SceneNode {
        owner,
        renderer,
        pass,
        position,
        z_order,
    })
}

#[derive(Default)]
pub struct SceneGraph {
    nodes: RefCell<Vec<NodeHandle>>,
    hud: RefCell<FxHashMap<String, NodeHandle>>,
    receiver: Cell<ReceiverId>,
}

impl SceneGraph {
    /// Create a graph listening on `bus`.
    pub fn attach(bus: &Rc<EventBus>) -> Rc<SceneGraph> {
        let graph = Rc::new(SceneGraph::default());
        let receiver = bus.new_receiver();
        graph.receiver.set(receiver);

        let weak = Rc::downgrade(&graph);
        bus.subscribe(receiver, EventType::NewRenderComponent, move |event| {
            if let (Some(graph), GameEvent::NewRenderComponent { node, .. }) =
                (weak.upgrade(), event)
            {
                graph.add_node(Rc::clone(node));
            }
        });

        let weak = Rc::downgrade(&graph);
        bus.subscribe(receiver, EventType::NewHudElement, move |event| {
            if let (Some(graph), GameEvent::NewHudElement { key, node, .. }) =
                (weak.upgrade(), event)
            {
                graph.add_node(Rc::clone(node));
                graph.hud.borrow_mut().insert(key.clone(), Rc::clone(node));
            }
        });

        let weak = Rc::downgrade(&graph);
        bus.subscribe(receiver, EventType::ActorDestroyed, move |event| {
            if let (Some(graph), GameEvent::ActorDestroyed { actor }) = (weak.upgrade(), event) {
                graph.remove_actor(*actor);
            }
        });

        graph
    }

    pub fn detach(&self, bus: &EventBus) {
        bus.unsubscribe_all(self.receiver.get());
    }

    fn add_node(&self, node: NodeHandle) {
        let mut nodes = self.nodes.borrow_mut();
        if nodes.iter().any(|n| Rc::ptr_eq(n, &node)) {
            return;
        }
        debug!("Scene node added for actor {:?} in {:?}", node.owner, node.pass);
        nodes.push(node);
    }

    fn remove_actor(&self, actor: ActorId) {
        self.nodes.borrow_mut().retain(|n| n.owner != actor);
        self.hud.borrow_mut().retain(|_, n| n.owner != actor);
    }

    pub fn nodes(&self) -> Vec<NodeHandle> {
        self.nodes.borrow().clone()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn nodes_of(&self, actor: ActorId) -> Vec<NodeHandle> {
        self.nodes
            .borrow()
            .iter()
            .filter(|n| n.owner == actor)
            .cloned()
            .collect()
    }

    pub fn hud_element(&self, key: &str) -> Option<NodeHandle> {
        self.hud.borrow().get(key).cloned()
    }
}
