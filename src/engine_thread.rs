use image::RgbImage;
use std::sync::{mpsc, Arc};
use std::thread;

use crate::engine::{Engine, RunOutcome};
use crate::error::RunError;
use crate::events::{CancelToken, ProgressEvent};
use crate::settings::RunConfig;
use crate::snapshot::SnapshotSink;
use crate::sprites::SpriteLibrary;

/// a placement loop running on the background "engine" thread
pub struct RunHandle {
    events: mpsc::Receiver<ProgressEvent>,
    cancel: CancelToken,
    thread: thread::JoinHandle<Result<RunOutcome, RunError>>,
}

impl RunHandle {
    /// blocking stream of progress events; ends when the engine thread finishes
    pub fn events(&self) -> mpsc::Iter<'_, ProgressEvent> {
        self.events.iter()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// ask the engine to stop at its next round or iteration boundary
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// wait for the engine thread and return its outcome
    pub fn join(self) -> Result<RunOutcome, RunError> {
        self.thread.join().map_err(|_| RunError::WorkerPanicked)?
    }
}

/// spawn background engine thread.
/// configuration and resource errors surface through `join`.
pub fn spawn<P>(
    config: RunConfig,
    sprites: Arc<SpriteLibrary>,
    target: RgbImage,
    mut snapshots: P,
) -> Result<RunHandle, RunError>
where
    P: SnapshotSink + Send + 'static,
{
    let (mut update_tx, events) = mpsc::channel();
    let cancel = CancelToken::new();
    let engine_cancel = cancel.clone();

    let thread = thread::Builder::new()
        .name("engine".to_owned())
        .spawn(move || {
            profiling::register_thread!("engine");
            let engine = Engine::new(&config, &sprites, &target)?;
            // update_tx drops with this closure, which ends the event stream
            engine.run(&mut update_tx, &engine_cancel, &mut snapshots)
        })
        .map_err(RunError::Spawn)?;

    Ok(RunHandle { events, cancel, thread })
}
