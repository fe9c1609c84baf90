//! # Frame Scheduling
//!
//! A frame is two passes over the scene tree. The update pass mutates node
//! state and reports whether anything needs drawing; the render pass walks the
//! tree again and records a [`PrimitiveChain`]. Only the chain crosses to the
//! consumer, so the update pass for frame N+1 can run while frame N is still
//! being replayed on the [`RenderThread`].
//!
//! ```text
//!   update thread                         render thread
//!   ─────────────                         ─────────────
//!   tick(N)   ── chain N ──► bounded(1) ──► replay(N)
//!   tick(N+1)                                  │
//!       ▲                                      │
//!       └────────── recycled chain ◄───────────┘
//! ```
//!
//! A frame whose update or render pass fails is dropped. The scheduler
//! counts it and carries on with the next tick.

use crate::engine::EngineError;
use crate::events::{Event, EventArg, EventSystem, EventType};
use crate::foundation::time::Clock;
use crate::input::{InputEvent, InputReceiver};
use crate::render::{GpuContext, PrimitiveChain};
use crate::scene::{SceneError, SceneResult, SceneTree, UpdateContext};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Spare chains kept for reuse
const MAX_SPARE_CHAINS: usize = 2;

/// Counters accumulated across frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Calls to [`FrameScheduler::tick`]
    pub frames_ticked: u64,
    /// Frames that produced a chain
    pub frames_rendered: u64,
    /// Frames where no node requested a redraw
    pub frames_skipped: u64,
    /// Frames aborted by a node error, or by the consumer during replay
    pub frames_failed: u64,
    /// Primitives recorded over all rendered frames
    pub primitives: u64,
    /// Input events consumed by a node
    pub input_consumed: u64,
    /// Events consumed by an event handler
    pub events_consumed: u64,
}

/// Result of one [`FrameScheduler::tick`]
#[derive(Debug)]
pub enum FrameOutput {
    /// A chain ready to hand to the consumer
    Render(PrimitiveChain),
    /// Nothing changed; the previous frame stays on screen
    Skipped,
}

impl FrameOutput {
    /// The chain, if this frame rendered
    #[must_use]
    pub fn into_chain(self) -> Option<PrimitiveChain> {
        match self {
            Self::Render(chain) => Some(chain),
            Self::Skipped => None,
        }
    }

    /// Whether this frame produced a chain
    #[must_use]
    pub const fn is_render(&self) -> bool {
        matches!(self, Self::Render(_))
    }
}

/// Drives the update and render passes of a [`SceneTree`]
pub struct FrameScheduler {
    tree: SceneTree,
    events: EventSystem,
    clock: Box<dyn Clock>,
    input: Option<InputReceiver>,
    frame: u64,
    time_ms: u64,
    needs_redraw: bool,
    replay_failures_seen: u64,
    pending_resize: Option<(u32, u32)>,
    chain_capacity: usize,
    spare: Vec<PrimitiveChain>,
    stats: FrameStats,
}

impl FrameScheduler {
    /// Schedule `tree` with time supplied by `clock`. The first tick always renders.
    pub fn new(tree: SceneTree, clock: impl Clock + 'static) -> Self {
        Self {
            tree,
            events: EventSystem::new(),
            clock: Box::new(clock),
            input: None,
            frame: 0,
            time_ms: 0,
            needs_redraw: true,
            replay_failures_seen: 0,
            pending_resize: None,
            chain_capacity: 64,
            spare: Vec::new(),
            stats: FrameStats::default(),
        }
    }

    /// Drain `input` at the start of every tick
    #[must_use]
    pub fn with_input(mut self, input: InputReceiver) -> Self {
        self.input = Some(input);
        self
    }

    /// Preallocate `capacity` primitives for new chains
    #[must_use]
    pub fn with_chain_capacity(mut self, capacity: usize) -> Self {
        self.chain_capacity = capacity.max(1);
        self
    }

    /// The scene being scheduled
    #[must_use]
    pub const fn tree(&self) -> &SceneTree {
        &self.tree
    }

    /// Mutable access to the scene, between ticks
    pub fn tree_mut(&mut self) -> &mut SceneTree {
        &mut self.tree
    }

    /// Event dispatch, for registering handlers
    pub fn events_mut(&mut self) -> &mut EventSystem {
        &mut self.events
    }

    /// Number of the most recent tick (zero before the first)
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Seconds of clock time accumulated so far
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time_ms as f64 / 1000.0
    }

    /// Counters so far
    #[must_use]
    pub const fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Count a frame that the consumer failed to replay; the next tick redraws
    pub fn record_replay_failure(&mut self) {
        self.stats.frames_failed += 1;
        self.needs_redraw = true;
    }

    /// Catch up with the failure total reported by a [`RenderThread`]
    pub fn sync_replay_failures(&mut self, stats: ReplayStats) {
        let new = stats.failed.saturating_sub(self.replay_failures_seen);
        if new > 0 {
            self.replay_failures_seen = stats.failed;
            self.stats.frames_failed += new;
            self.needs_redraw = true;
            log::debug!("{new} frame(s) failed on the render thread, redrawing");
        }
    }

    /// Force the next tick to render
    pub fn request_redraw(&mut self) {
        self.needs_redraw = true;
    }

    /// Queue a surface resize, delivered to the tree before the next update pass
    pub fn resize(&mut self, width: u32, height: u32) {
        self.pending_resize = Some((width, height));
        self.needs_redraw = true;
    }

    /// Return a consumed chain so the next render pass can reuse its allocation
    pub fn recycle(&mut self, mut chain: PrimitiveChain) {
        if self.spare.len() < MAX_SPARE_CHAINS {
            chain.clear();
            self.spare.push(chain);
        }
    }

    /// Run one frame, with input taken from the attached receiver.
    ///
    /// # Errors
    ///
    /// The node error that aborted the update or render pass.
    pub fn tick(&mut self) -> SceneResult<FrameOutput> {
        let input = self.input.as_ref().map(InputReceiver::drain).unwrap_or_default();
        self.tick_with(&input)
    }

    /// Run one frame, offering `input` to the tree first.
    ///
    /// # Errors
    ///
    /// The node error that aborted the update or render pass. The frame is
    /// counted as failed and the scheduler is ready for the next tick.
    pub fn tick_with(&mut self, input: &[InputEvent]) -> SceneResult<FrameOutput> {
        self.frame += 1;
        self.stats.frames_ticked += 1;
        let frame = self.frame;

        let elapsed = self.clock.elapsed_ms();
        self.time_ms = self.time_ms.saturating_add(elapsed);
        let time = self.time();
        self.events.update_time(time);

        if let Some((width, height)) = self.pending_resize.take() {
            self.tree.surface_changed(width, height);
            self.events.send(Event::new(EventType::SurfaceChanged, time).with_arg("size", EventArg::Size(width, height)));
        }
        for change in self.tree.take_changes() {
            self.events.send(change.into_event(time));
            self.needs_redraw = true;
        }

        for event in input {
            if self.tree.dispatch_input(event) {
                self.stats.input_consumed += 1;
            }
        }

        let mut ctx = UpdateContext::new(frame, elapsed, time);
        let updated = self.tree.update(&mut ctx);
        for event in ctx.take_events() {
            self.events.send(event);
        }
        self.stats.events_consumed += self.events.dispatch() as u64;

        let redraw = match updated {
            Ok(redraw) => redraw,
            Err(err) => return Err(self.fail(err)),
        };

        if !(redraw || self.needs_redraw) {
            self.stats.frames_skipped += 1;
            log::trace!("Frame {frame} skipped");
            return Ok(FrameOutput::Skipped);
        }

        let mut chain = self.spare.pop().unwrap_or_else(|| PrimitiveChain::with_capacity(self.chain_capacity));
        chain.set_frame(frame);
        if let Err(err) = self.tree.render(&mut chain) {
            self.recycle(chain);
            return Err(self.fail(err));
        }

        self.needs_redraw = false;
        self.stats.frames_rendered += 1;
        self.stats.primitives += chain.len() as u64;
        log::debug!("Frame {frame}: {} primitives after {elapsed} ms", chain.len());
        Ok(FrameOutput::Render(chain))
    }

    /// Tick and replay the result on `ctx` in the calling thread.
    /// Returns whether the frame was drawn.
    ///
    /// # Errors
    ///
    /// The scene or render error that aborted the frame.
    pub fn run_frame<C: GpuContext + ?Sized>(&mut self, ctx: &mut C) -> Result<bool, EngineError> {
        let FrameOutput::Render(mut chain) = self.tick()? else {
            return Ok(false);
        };
        let replayed = chain.replay(ctx);
        self.recycle(chain);
        if let Err(err) = replayed {
            self.record_replay_failure();
            return Err(err.into());
        }
        Ok(true)
    }

    fn fail(&mut self, err: SceneError) -> SceneError {
        self.stats.frames_failed += 1;
        self.needs_redraw = true;
        log::error!("Frame {} aborted: {err}", self.frame);
        err
    }
}

enum RenderCommand {
    Frame(PrimitiveChain),
    Resize(u32, u32),
}

/// Frames seen by the [`RenderThread`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Chains replayed to completion
    pub replayed: u64,
    /// Chains whose replay the context aborted
    pub failed: u64,
}

#[derive(Debug, Default)]
struct ReplayCounters {
    replayed: AtomicU64,
    failed: AtomicU64,
}

/// Owns a [`GpuContext`] on a dedicated thread and replays submitted chains.
///
/// At most one chain waits in the hand-off while another is being replayed,
/// so [`RenderThread::submit`] blocks once the consumer falls a frame behind.
pub struct RenderThread<C: GpuContext + Send + 'static> {
    commands: Option<Sender<RenderCommand>>,
    recycled: Receiver<PrimitiveChain>,
    counters: Arc<ReplayCounters>,
    handle: Option<JoinHandle<C>>,
}

impl<C: GpuContext + Send + 'static> RenderThread<C> {
    /// Move `context` onto a new thread named `gles-render`.
    ///
    /// # Errors
    ///
    /// [`EngineError::InitializationFailed`] if the OS refuses the thread.
    pub fn spawn(mut context: C) -> Result<Self, EngineError> {
        let (command_tx, command_rx) = bounded::<RenderCommand>(1);
        let (recycle_tx, recycle_rx) = bounded::<PrimitiveChain>(MAX_SPARE_CHAINS);
        let counters = Arc::new(ReplayCounters::default());
        let thread_counters = Arc::clone(&counters);

        let handle = thread::Builder::new()
            .name("gles-render".into())
            .spawn(move || {
                log::info!("Render thread started");
                for command in command_rx {
                    match command {
                        RenderCommand::Frame(mut chain) => {
                            let frame = chain.frame();
                            match chain.replay(&mut context) {
                                Ok(count) => {
                                    thread_counters.replayed.fetch_add(1, Ordering::Relaxed);
                                    log::trace!("Frame {frame} replayed {count} primitives");
                                }
                                Err(err) => {
                                    thread_counters.failed.fetch_add(1, Ordering::Relaxed);
                                    log::error!("Frame {frame} replay aborted: {err}");
                                }
                            }
                            chain.clear();
                            if let Err(TrySendError::Full(_)) = recycle_tx.try_send(chain) {
                                log::trace!("Recycle channel full, dropping chain");
                            }
                        }
                        RenderCommand::Resize(width, height) => {
                            if let Err(err) = context.viewport(width, height) {
                                log::warn!("Viewport {width}x{height} rejected: {err}");
                            }
                        }
                    }
                }
                log::info!("Render thread stopped");
                context
            })
            .map_err(|e| EngineError::InitializationFailed(format!("Render thread: {e}")))?;

        Ok(Self {
            commands: Some(command_tx),
            recycled: recycle_rx,
            counters,
            handle: Some(handle),
        })
    }

    /// Hand a chain to the render thread, blocking while the hand-off is full.
    ///
    /// # Errors
    ///
    /// [`EngineError::RenderThreadDisconnected`] if the thread has exited.
    pub fn submit(&self, chain: PrimitiveChain) -> Result<(), EngineError> {
        self.send(RenderCommand::Frame(chain))
    }

    /// Set the viewport on the render thread, ordered with submitted frames.
    ///
    /// # Errors
    ///
    /// [`EngineError::RenderThreadDisconnected`] if the thread has exited.
    pub fn resize(&self, width: u32, height: u32) -> Result<(), EngineError> {
        self.send(RenderCommand::Resize(width, height))
    }

    /// A chain the render thread has finished with, if any
    #[must_use]
    pub fn take_recycled(&self) -> Option<PrimitiveChain> {
        self.recycled.try_recv().ok()
    }

    /// Replay counters so far
    #[must_use]
    pub fn replay_stats(&self) -> ReplayStats {
        ReplayStats {
            replayed: self.counters.replayed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Finish the queued frames, stop the thread and hand the context back
    /// with the final replay counters.
    ///
    /// # Errors
    ///
    /// [`EngineError::RenderThreadPanicked`] if the consumer panicked.
    pub fn shutdown(mut self) -> Result<(C, ReplayStats), EngineError> {
        self.commands.take();
        let handle = self.handle.take().ok_or(EngineError::RenderThreadDisconnected)?;
        let context = handle.join().map_err(|_| EngineError::RenderThreadPanicked)?;
        Ok((context, self.replay_stats()))
    }

    fn send(&self, command: RenderCommand) -> Result<(), EngineError> {
        let sender = self.commands.as_ref().ok_or(EngineError::RenderThreadDisconnected)?;
        sender.send(command).map_err(|_| EngineError::RenderThreadDisconnected)
    }
}

impl<C: GpuContext + Send + 'static> Drop for RenderThread<C> {
    fn drop(&mut self) {
        self.commands.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Render thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::fixed::Fp;
    use crate::foundation::time::FixedStepClock;
    use crate::input::{InputQueue, OverflowPolicy};
    use crate::render::{Color, GpuCall, Mesh, Primitive, RecordingContext, RenderError};
    use crate::scene::nodes::{ClearNode, MeshNode, TouchRotateNode, TransformNode};
    use crate::scene::{Node, UpdateFlags};
    use std::time::Duration;

    fn spinning_scene() -> SceneTree {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let spin = tree
            .insert(root, "spin", TransformNode::new().with_spin(Fp::ONE))
            .unwrap();
        tree.insert(spin, "cube", MeshNode::new(Mesh::cube(Fp::ONE).into_handle())).unwrap();
        tree
    }

    struct Idle;

    impl Node for Idle {}

    struct Failing;

    impl Node for Failing {
        fn update(&mut self, _ctx: &mut UpdateContext) -> SceneResult<UpdateFlags> {
            Err(SceneError::NodeFailed {
                name: "failing".into(),
                reason: "boom".into(),
            })
        }
    }

    #[test]
    fn test_tick_renders_and_counts() {
        let mut scheduler = FrameScheduler::new(spinning_scene(), FixedStepClock::new(16));
        let output = scheduler.tick_with(&[]).unwrap();
        let chain = output.into_chain().unwrap();
        assert_eq!(chain.frame(), 1);
        assert_eq!(scheduler.frame(), 1);
        assert_eq!(
            chain.iter().map(Primitive::name).collect::<Vec<_>>(),
            ["push_matrix", "rotate", "draw_mesh", "pop_matrix"]
        );

        let stats = scheduler.stats();
        assert_eq!(stats.frames_ticked, 1);
        assert_eq!(stats.frames_rendered, 1);
        assert_eq!(stats.primitives, 4);
    }

    #[test]
    fn test_idle_tree_skips_after_first_frame() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        tree.insert(root, "idle", Idle).unwrap();
        let mut scheduler = FrameScheduler::new(tree, FixedStepClock::new(16));

        assert!(scheduler.tick_with(&[]).unwrap().is_render());
        assert!(!scheduler.tick_with(&[]).unwrap().is_render());
        scheduler.resize(320, 240);
        assert!(scheduler.tick_with(&[]).unwrap().is_render());
        scheduler.request_redraw();
        assert!(scheduler.tick_with(&[]).unwrap().is_render());

        let stats = scheduler.stats();
        assert_eq!(stats.frames_ticked, 4);
        assert_eq!(stats.frames_rendered, 3);
        assert_eq!(stats.frames_skipped, 1);
    }

    #[test]
    fn test_resize_reaches_tree_before_render() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        tree.insert(root, "clear", ClearNode::new(Color::BLACK)).unwrap();
        let mut scheduler = FrameScheduler::new(tree, FixedStepClock::new(16));
        scheduler.resize(640, 480);

        let chain = scheduler.tick_with(&[]).unwrap().into_chain().unwrap();
        let first = chain.iter().next();
        assert!(matches!(first, Some(Primitive::Viewport { width: 640, height: 480 })));
        assert_eq!(scheduler.tree().surface(), Some((640, 480)));
    }

    #[test]
    fn test_failed_frame_is_dropped_and_next_tick_proceeds() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let bad = tree.insert(root, "bad", Failing).unwrap();
        let mut scheduler = FrameScheduler::new(tree, FixedStepClock::new(16));

        assert!(scheduler.tick_with(&[]).is_err());
        assert_eq!(scheduler.stats().frames_failed, 1);

        scheduler.tree_mut().destroy(bad);
        let output = scheduler.tick_with(&[]).unwrap();
        assert!(output.is_render());
        assert_eq!(scheduler.frame(), 2);
        assert_eq!(scheduler.stats().frames_rendered, 1);
    }

    #[test]
    fn test_replay_failure_forces_redraw() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        tree.insert(root, "idle", Idle).unwrap();
        let mut scheduler = FrameScheduler::new(tree, FixedStepClock::new(16));

        assert!(scheduler.tick_with(&[]).unwrap().is_render());
        assert!(!scheduler.tick_with(&[]).unwrap().is_render());

        scheduler.sync_replay_failures(ReplayStats { replayed: 0, failed: 1 });
        assert!(scheduler.tick_with(&[]).unwrap().is_render());
        // Same total again is not a new failure
        scheduler.sync_replay_failures(ReplayStats { replayed: 1, failed: 1 });
        assert!(!scheduler.tick_with(&[]).unwrap().is_render());
        assert_eq!(scheduler.stats().frames_failed, 1);
    }

    #[test]
    fn test_tree_changes_become_events() {
        let mut scheduler = FrameScheduler::new(SceneTree::new(), FixedStepClock::new(16));
        let attached = Arc::new(AtomicU64::new(0));
        let detached = Arc::new(AtomicU64::new(0));
        for (event_type, counter) in [(EventType::NodeAttached, &attached), (EventType::NodeDetached, &detached)] {
            let counter = Arc::clone(counter);
            scheduler.events_mut().register_handler(
                event_type,
                Box::new(move |event: &Event| {
                    assert_eq!(event.get_arg("parent"), Some(&EventArg::Node("root".into())));
                    counter.fetch_add(1, Ordering::Relaxed);
                    true
                }),
            );
        }
        assert!(scheduler.tick_with(&[]).unwrap().is_render());
        assert!(!scheduler.tick_with(&[]).unwrap().is_render());

        let root = scheduler.tree().root();
        let idle = scheduler.tree_mut().insert(root, "idle", Idle).unwrap();
        assert!(scheduler.tick_with(&[]).unwrap().is_render());
        assert_eq!(attached.load(Ordering::Relaxed), 1);

        assert!(scheduler.tree_mut().detach(root, idle));
        assert!(scheduler.tick_with(&[]).unwrap().is_render());
        assert_eq!(detached.load(Ordering::Relaxed), 1);
        assert_eq!(scheduler.stats().events_consumed, 2);
    }

    #[test]
    fn test_input_and_events() {
        let mut tree = SceneTree::new();
        let root = tree.root();
        let touch = tree.insert(root, "touch", TouchRotateNode::new(Fp::ONE)).unwrap();

        let (mut sender, receiver) = InputQueue::new(8, OverflowPolicy::DropOldest, Duration::ZERO).split();
        let mut scheduler = FrameScheduler::new(tree, FixedStepClock::new(16)).with_input(receiver);

        let touched = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&touched);
        scheduler.events_mut().register_handler(
            EventType::NodeTouched,
            Box::new(move |_: &Event| {
                seen.fetch_add(1, Ordering::Relaxed);
                true
            }),
        );

        assert!(sender.send(InputEvent::PointerDown { id: 0, x: 0.0, y: 0.0 }));
        assert!(sender.send(InputEvent::PointerMove { id: 0, x: 2.0, y: 0.0 }));
        assert!(sender.send(InputEvent::PointerUp { id: 0, x: 2.0, y: 0.0 }));
        scheduler.tick().unwrap();

        assert_eq!(scheduler.stats().input_consumed, 3);
        assert_eq!(scheduler.stats().events_consumed, 1);
        assert_eq!(touched.load(Ordering::Relaxed), 1);
        let node = scheduler.tree().get_as::<TouchRotateNode>(touch).unwrap();
        assert!(node.yaw() != Fp::ZERO);
    }

    #[test]
    fn test_run_frame_replays_in_place() {
        let mut scheduler = FrameScheduler::new(spinning_scene(), FixedStepClock::new(16));
        let mut ctx = RecordingContext::new();
        assert!(scheduler.run_frame(&mut ctx).unwrap());
        assert_eq!(ctx.completed_frames(), &[1]);
        assert!(matches!(ctx.calls().last(), Some(GpuCall::PopMatrix)));

        let mut failing = RecordingContext::failing_on_draw();
        let err = scheduler.run_frame(&mut failing).unwrap_err();
        assert!(matches!(err, EngineError::Render(RenderError::Backend(_))));
        assert!(failing.completed_frames().is_empty());
        assert_eq!(scheduler.stats().frames_failed, 1);
    }

    #[test]
    fn test_render_thread_replays_and_recycles() {
        let mut scheduler = FrameScheduler::new(spinning_scene(), FixedStepClock::new(16));
        let render = RenderThread::spawn(RecordingContext::new()).unwrap();

        for _ in 0..3 {
            if let Some(chain) = render.take_recycled() {
                scheduler.recycle(chain);
            }
            let chain = scheduler.tick_with(&[]).unwrap().into_chain().unwrap();
            render.submit(chain).unwrap();
        }
        render.resize(100, 50).unwrap();

        let (ctx, replay) = render.shutdown().unwrap();
        assert_eq!(replay, ReplayStats { replayed: 3, failed: 0 });
        assert_eq!(ctx.completed_frames(), &[1, 2, 3]);
        assert_eq!(ctx.calls().last(), Some(&GpuCall::Viewport(100, 50)));
        assert_eq!(ctx.calls().iter().filter(|call| matches!(call, GpuCall::DrawMesh { .. })).count(), 3);
    }

    #[test]
    fn test_render_thread_skips_failed_frames() {
        let mut scheduler = FrameScheduler::new(spinning_scene(), FixedStepClock::new(16));
        let render = RenderThread::spawn(RecordingContext::failing_on_draw()).unwrap();
        for _ in 0..2 {
            let chain = scheduler.tick_with(&[]).unwrap().into_chain().unwrap();
            render.submit(chain).unwrap();
        }
        while render.replay_stats().failed < 2 {
            thread::yield_now();
        }
        let (ctx, replay) = render.shutdown().unwrap();
        assert_eq!(replay.replayed, 0);
        assert!(ctx.completed_frames().is_empty());
    }
}
