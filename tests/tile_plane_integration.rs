//! Tile planes built through the factory: tile resolution, collideable-tile
//! reporting for the main plane and background fill.

use peglegengine::actors::factory::ActorFactory;
use peglegengine::components::render::RenderComponent;
use peglegengine::components::tileplane::{PlaneProperties, TILE_PLANE_RENDER_COMPONENT};
use peglegengine::error::EngineError;
use peglegengine::events::bus::EventBus;
use peglegengine::events::{EventType, GameEvent};
use peglegengine::resources::definition::DefinitionNode;
use peglegengine::resources::loader::{ImageAsset, MemoryLoader};
use peglegengine::resources::palette::{Palette, Rgba};
use peglegengine::resources::scenegraph::{RenderPass, SceneGraph};
use peglegengine::systems::render::render_sweep;
use std::cell::RefCell;
use std::rc::Rc;

fn loader() -> MemoryLoader {
    let mut loader = MemoryLoader::new();
    for n in [5, 7] {
        loader.insert_image(
            &format!("/LEVEL1/TILES/ACTION/{:03}.pid", n),
            ImageAsset::new(64, 64),
        );
        loader.insert_image(
            &format!("/LEVEL1/TILES/BACK/{:03}.pid", n),
            ImageAsset::new(64, 64),
        );
    }
    loader
}

fn plane(name: &str, images: &str, tiles: &[i32], tiles_per_row: i32) -> DefinitionNode {
    let props = PlaneProperties {
        name: name.to_string(),
        is_main_plane: name == "Action",
        tile_pixel_width: 64,
        tile_pixel_height: 64,
        plane_pixel_width: 64 * tiles_per_row,
        plane_pixel_height: 64 * (tiles.len() as i32 / tiles_per_row),
        fill_color: 3,
        ..PlaneProperties::default()
    };
    let mut tile_list = DefinitionNode::new("Tiles");
    for tile in tiles {
        tile_list.push_text_child("Tile", tile);
    }
    DefinitionNode::new("Actor").with_attr("Type", "Plane").with_child(
        DefinitionNode::new(TILE_PLANE_RENDER_COMPONENT)
            .with_text_child("ImagePath", images)
            .with_child(props.to_definition())
            .with_child(tile_list),
    )
}

fn record_tiles(bus: &Rc<EventBus>) -> Rc<RefCell<Vec<(i32, i32, i32)>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let receiver = bus.new_receiver();
    bus.subscribe(receiver, EventType::CollideableTileCreated, move |event| {
        if let GameEvent::CollideableTileCreated { tile_id, x, y } = event {
            sink.borrow_mut().push((*tile_id, *x, *y));
        }
    });
    seen
}

#[test]
fn main_plane_reports_every_non_empty_tile() {
    let bus = Rc::new(EventBus::new());
    let seen = record_tiles(&bus);
    let factory = ActorFactory::new(Rc::clone(&bus), Rc::new(loader()), Palette::new(), "pid");

    let actor = factory
        .create_actor(&plane("Action", "/LEVEL1/TILES/ACTION/*", &[5, 5, 5, -1, 7], 5))
        .expect("plane");
    assert_eq!(
        *seen.borrow(),
        vec![(5, 0, 0), (5, 64, 0), (5, 128, 0), (7, 256, 0)]
    );

    let render = actor.component::<RenderComponent>().expect("render");
    let render = render.borrow();
    assert!(render.tile_image(0).and_then(|w| w.upgrade()).is_some());
    assert!(render.tile_image(3).is_none());
    assert!(render.has_image("frame007"));
}

#[test]
fn runs_do_not_cross_rows() {
    let bus = Rc::new(EventBus::new());
    let seen = record_tiles(&bus);
    let factory = ActorFactory::new(Rc::clone(&bus), Rc::new(loader()), Palette::new(), "pid");
    factory
        .create_actor(&plane("Action", "/LEVEL1/TILES/ACTION/*", &[5, 5, 5, 5], 2))
        .expect("plane");
    assert_eq!(
        *seen.borrow(),
        vec![(5, 0, 0), (5, 64, 0), (5, 0, 64), (5, 64, 64)]
    );
}

#[test]
fn non_main_planes_report_nothing() {
    let bus = Rc::new(EventBus::new());
    let seen = record_tiles(&bus);
    let factory = ActorFactory::new(Rc::clone(&bus), Rc::new(loader()), Palette::new(), "pid");
    factory
        .create_actor(&plane("Front", "/LEVEL1/TILES/ACTION/*", &[5, 7], 2))
        .expect("plane");
    assert!(seen.borrow().is_empty());
}

#[test]
fn background_falls_back_to_palette_fill() {
    let bus = Rc::new(EventBus::new());
    let factory = ActorFactory::new(Rc::clone(&bus), Rc::new(loader()), Palette::new(), "pid");
    let actor = factory
        .create_actor(&plane("Background", "/LEVEL1/TILES/BACK/*", &[5, 42], 2))
        .expect("plane");
    let render = actor.component::<RenderComponent>().expect("render");
    let fill = render
        .borrow()
        .tile_image(1)
        .and_then(|w| w.upgrade())
        .expect("fill image");
    assert_eq!(fill.fill, Some(Rgba::new(3, 3, 3, 255)));
    assert_eq!((fill.width, fill.height), (64, 64));
}

#[test]
fn missing_tile_image_fails_only_that_plane() {
    let bus = Rc::new(EventBus::new());
    let factory = ActorFactory::new(Rc::clone(&bus), Rc::new(loader()), Palette::new(), "pid");
    let err = factory
        .create_actor(&plane("Action", "/LEVEL1/TILES/ACTION/*", &[5, 42], 2))
        .unwrap_err();
    assert!(matches!(err, EngineError::ResourceMissing(_)));
    assert!(
        factory
            .create_actor(&plane("Action", "/LEVEL1/TILES/ACTION/*", &[5, 7], 2))
            .is_ok()
    );
}

#[test]
fn unknown_plane_name_is_rejected() {
    let bus = Rc::new(EventBus::new());
    let factory = ActorFactory::new(Rc::clone(&bus), Rc::new(loader()), Palette::new(), "pid");
    let err = factory
        .create_actor(&plane("Middle", "/LEVEL1/TILES/ACTION/*", &[5], 1))
        .unwrap_err();
    assert!(matches!(err, EngineError::InvariantViolation(_)));
}

#[test]
fn planes_sweep_in_pass_order() {
    let bus = Rc::new(EventBus::new());
    let graph = SceneGraph::attach(&bus);
    let factory = ActorFactory::new(Rc::clone(&bus), Rc::new(loader()), Palette::new(), "pid");
    for (name, images) in [
        ("Front", "/LEVEL1/TILES/ACTION/*"),
        ("Background", "/LEVEL1/TILES/BACK/*"),
        ("Action", "/LEVEL1/TILES/ACTION/*"),
    ] {
        let mut definition = plane(name, images, &[5, 7], 2);
        definition.children.insert(
            0,
            peglegengine::components::position::position_definition(Default::default()),
        );
        factory.create_actor(&definition).expect("plane");
    }
    let passes: Vec<RenderPass> = render_sweep(&graph).iter().map(|i| i.pass).collect();
    assert_eq!(
        passes,
        vec![RenderPass::Background, RenderPass::Action, RenderPass::Foreground]
    );
}
