//! Core engine implementation

use crate::{
    application::{AppControl, Application},
    config::ConfigError,
    core::config::EngineConfig,
    events::EventSystem,
    foundation::time::{Clock, SystemClock},
    frame::{FrameOutput, FrameScheduler, FrameStats, RenderThread, ReplayStats},
    input::{InputEvent, InputQueue, InputSender},
    render::{GpuContext, RenderError},
    scene::{SceneError, SceneTree},
};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Main engine struct
///
/// The engine owns the scene and its scheduler and runs the update side of the
/// pipeline; the GPU context lives on the render thread for the whole run.
pub struct Engine {
    /// Frame scheduling over the scene tree
    scheduler: FrameScheduler,

    /// Producer half of the input queue, until an application takes it
    input: Option<InputSender>,

    /// Engine configuration
    config: EngineConfig,

    /// Whether the engine should continue running
    running: bool,
}

/// What [`Engine::run`] hands back once the loop has ended
#[derive(Debug)]
pub struct RunOutcome<C> {
    /// The GPU context, returned from the render thread
    pub context: C,
    /// Update-side frame counters
    pub stats: FrameStats,
    /// Render-side frame counters
    pub replay: ReplayStats,
}

impl Engine {
    /// Create a new engine instance driven by the system clock
    ///
    /// # Errors
    ///
    /// [`EngineError::Config`] if the configuration does not validate.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_clock(config, SystemClock::new())
    }

    /// Create a new engine instance driven by `clock`
    ///
    /// # Errors
    ///
    /// [`EngineError::Config`] if the configuration does not validate.
    pub fn with_clock(config: EngineConfig, clock: impl Clock + 'static) -> Result<Self, EngineError> {
        config.validate()?;
        log::info!("Initializing engine...");

        let (sender, receiver) = InputQueue::from_config(&config.input).split();
        let scheduler = FrameScheduler::new(SceneTree::new(), clock)
            .with_input(receiver)
            .with_chain_capacity(config.render.chain_capacity);

        Ok(Self {
            scheduler,
            input: Some(sender),
            config,
            running: true,
        })
    }

    /// Run the engine main loop with the given application, replaying frames
    /// on `context` from a dedicated render thread.
    ///
    /// The loop ends when the application returns [`AppControl::Exit`], calls
    /// [`Engine::quit`], or `max_frames` ticks have run. Failed frames are
    /// counted and skipped.
    ///
    /// # Errors
    ///
    /// Configuration, application or render-thread failures.
    pub fn run<A, C>(config: EngineConfig, app: &mut A, context: C) -> Result<RunOutcome<C>, EngineError>
    where
        A: Application,
        C: GpuContext + Send + 'static,
    {
        crate::foundation::logging::init_with_filter(&config.log_level);
        let mut engine = Self::new(config)?;
        engine.run_app(app, context)
    }

    /// Run the main loop on an engine that is already set up.
    ///
    /// # Errors
    ///
    /// Application or render-thread failures.
    pub fn run_app<A, C>(&mut self, app: &mut A, context: C) -> Result<RunOutcome<C>, EngineError>
    where
        A: Application,
        C: GpuContext + Send + 'static,
    {
        app.initialize(self)
            .map_err(|e| EngineError::ApplicationError(format!("App initialization: {e}")))?;

        let render = RenderThread::spawn(context)?;
        log::info!("Starting main loop...");
        let looped = self.main_loop(app, &render);

        app.cleanup(self);
        let (context, replay) = render.shutdown()?;
        looped?;

        self.scheduler.sync_replay_failures(replay);
        let stats = self.stats();
        log::info!(
            "Engine shutdown complete: {} frames ticked, {} rendered, {} skipped, {} failed",
            stats.frames_ticked,
            stats.frames_rendered,
            stats.frames_skipped,
            stats.frames_failed
        );
        Ok(RunOutcome { context, stats, replay })
    }

    fn main_loop<A, C>(&mut self, app: &mut A, render: &RenderThread<C>) -> Result<(), EngineError>
    where
        A: Application,
        C: GpuContext + Send + 'static,
    {
        let budget = self.config.target_fps.map(|fps| Duration::from_secs(1) / fps);

        while self.running {
            if self.config.max_frames.is_some_and(|max| self.frame() >= max) {
                log::debug!("Frame limit reached");
                break;
            }
            let started = Instant::now();

            match app.on_frame(self) {
                Ok(AppControl::Continue) => {}
                Ok(AppControl::Exit) => break,
                Err(e) => return Err(EngineError::ApplicationError(format!("App frame: {e}"))),
            }

            while let Some(chain) = render.take_recycled() {
                self.scheduler.recycle(chain);
            }
            self.scheduler.sync_replay_failures(render.replay_stats());

            // Scene failures are logged and counted by the scheduler
            if let Ok(FrameOutput::Render(chain)) = self.scheduler.tick() {
                render.submit(chain)?;
            }

            if let Some(budget) = budget {
                let spent = started.elapsed();
                if spent < budget {
                    thread::sleep(budget - spent);
                }
            }
        }
        Ok(())
    }

    /// Request engine shutdown
    pub fn quit(&mut self) {
        log::info!("Engine shutdown requested");
        self.running = false;
    }

    /// Get the engine configuration
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the scene tree
    pub const fn scene(&self) -> &SceneTree {
        self.scheduler.tree()
    }

    /// Get mutable access to the scene tree
    pub fn scene_mut(&mut self) -> &mut SceneTree {
        self.scheduler.tree_mut()
    }

    /// Get the event system, to register handlers
    pub fn events_mut(&mut self) -> &mut EventSystem {
        self.scheduler.events_mut()
    }

    /// Get the frame scheduler
    pub fn scheduler_mut(&mut self) -> &mut FrameScheduler {
        &mut self.scheduler
    }

    /// Queue an input event for the next frame; `false` if it was dropped
    pub fn send_input(&mut self, event: InputEvent) -> bool {
        self.input.as_mut().is_some_and(|sender| sender.send(event))
    }

    /// Take the input producer, to feed it from another thread
    pub fn take_input_sender(&mut self) -> Option<InputSender> {
        self.input.take()
    }

    /// Deliver a new surface size before the next frame
    pub fn resize(&mut self, width: u32, height: u32) {
        self.scheduler.resize(width, height);
    }

    /// Number of the most recent frame
    pub const fn frame(&self) -> u64 {
        self.scheduler.frame()
    }

    /// Frame counters so far
    pub const fn stats(&self) -> FrameStats {
        self.scheduler.stats()
    }
}

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Initialization error
    #[error("Engine initialization failed: {0}")]
    InitializationFailed(String),

    /// A node aborted the frame
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// The GPU context aborted the frame
    #[error("Rendering error: {0}")]
    Render(#[from] RenderError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The render thread is gone
    #[error("Render thread disconnected")]
    RenderThreadDisconnected,

    /// The render thread panicked
    #[error("Render thread panicked")]
    RenderThreadPanicked,

    /// Application error
    #[error("Application error: {0}")]
    ApplicationError(String),
}
