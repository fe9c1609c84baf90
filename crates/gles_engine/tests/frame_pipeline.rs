//! End-to-end checks of the update / render / replay pipeline

use gles_engine::foundation::fixed::Fp;
use gles_engine::foundation::time::FixedStepClock;
use gles_engine::frame::{FrameScheduler, RenderThread};
use gles_engine::input::{InputEvent, InputQueue, OverflowPolicy};
use gles_engine::render::{Color, GpuCall, Mesh, Primitive, RecordingContext, SoftwareContext};
use gles_engine::scene::{CameraNode, ClearNode, MeshNode, SceneTree, TouchRotateNode, TransformNode};
use std::time::Duration;

fn cube_scene() -> SceneTree {
    let mut tree = SceneTree::new();
    let root = tree.root();
    tree.insert(root, "clear", ClearNode::new(Color::BLACK)).unwrap();
    tree.insert(root, "camera", CameraNode::new(Fp::from_int(6))).unwrap();
    let touch = tree.insert(root, "touch", TouchRotateNode::default()).unwrap();
    let spin = tree
        .insert(touch, "spin", TransformNode::new().with_spin(Fp::ONE))
        .unwrap();
    tree.insert(spin, "cube", MeshNode::new(Mesh::cube(Fp::ONE).into_handle()))
        .unwrap();
    tree
}

#[test]
fn software_context_draws_every_frame() {
    let mut scheduler = FrameScheduler::new(cube_scene(), FixedStepClock::new(16));
    scheduler.resize(640, 480);
    let render = RenderThread::spawn(SoftwareContext::default()).unwrap();

    for _ in 0..5 {
        if let Some(chain) = render.take_recycled() {
            scheduler.recycle(chain);
        }
        let chain = scheduler.tick().unwrap().into_chain().unwrap();
        render.submit(chain).unwrap();
    }

    let (ctx, replay) = render.shutdown().unwrap();
    assert_eq!(replay.replayed, 5);
    assert_eq!(ctx.frames_completed(), 5);
    assert_eq!(ctx.viewport_size(), (640, 480));
    assert_eq!(ctx.stack_depth(), 0);

    let cube = Mesh::cube(Fp::ONE);
    let stats = ctx.last_frame_stats();
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.clears, 1);
    assert_eq!(stats.triangles as usize, cube.triangle_count());
    assert_eq!(stats.vertices_total as usize, cube.vertices().len());
    assert_eq!(stats.vertices_in_view, stats.vertices_total);
}

#[test]
fn replay_follows_chain_order() {
    let mut scheduler = FrameScheduler::new(cube_scene(), FixedStepClock::new(16));
    scheduler.resize(320, 240);
    let chain = scheduler.tick().unwrap().into_chain().unwrap();
    let names: Vec<_> = chain.iter().map(Primitive::name).collect();
    assert_eq!(
        names,
        [
            "viewport",
            "clear",
            "perspective",
            "load_identity",
            "look_at",
            "push_matrix",
            "push_matrix",
            "rotate",
            "draw_mesh",
            "pop_matrix",
            "pop_matrix",
        ]
    );

    let render = RenderThread::spawn(RecordingContext::new()).unwrap();
    render.submit(chain).unwrap();
    let (ctx, _) = render.shutdown().unwrap();
    assert_eq!(ctx.calls().len(), names.len());
    assert_eq!(ctx.calls()[0], GpuCall::Viewport(320, 240));
    assert_eq!(ctx.completed_frames(), &[1]);
}

#[test]
fn drag_input_reaches_touch_node() {
    let (mut sender, receiver) = InputQueue::new(16, OverflowPolicy::DropOldest, Duration::ZERO).split();
    let mut scheduler = FrameScheduler::new(cube_scene(), FixedStepClock::new(16)).with_input(receiver);

    assert!(sender.send(InputEvent::PointerDown { id: 1, x: 10.0, y: 10.0 }));
    assert!(sender.send(InputEvent::PointerMove { id: 1, x: 30.0, y: 10.0 }));
    scheduler.tick().unwrap();
    assert_eq!(scheduler.stats().input_consumed, 2);

    let touch = scheduler.tree().find("touch").unwrap();
    let node = scheduler.tree().get_as::<TouchRotateNode>(touch).unwrap();
    assert!(node.yaw() != Fp::ZERO);
    assert_eq!(node.pitch(), Fp::ZERO);
}
