use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::{PipelineError, Result};

/// Lifecycle of a pipeline.
///
/// `Stopped → Running → Stopping → Stopped`. Only a stopped pipeline can be
/// started; `join()` brings any pipeline back to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Stopped,
    Running,
    Stopping,
}

impl PipelineState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Stopping => "stopping",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cancellation flag shared by the stages of one pipeline run.
#[derive(Debug, Clone)]
pub(crate) struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub(crate) fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn stop(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Decide what a closed wire or ground means to a stage.
    ///
    /// After a stop request it is the expected result of teardown. Otherwise
    /// the stage fails, and sibling stages are told to stop as well.
    pub(crate) fn fail_unless_stopping(&self, stage: &str, err: PipelineError) -> Result<()> {
        if !self.is_running() {
            debug!(stage, error = %err, "link closed during shutdown");
            return Ok(());
        }
        error!(stage, error = %err, "stage failed");
        self.stop();
        Err(err)
    }
}

pub(crate) type StageFn = Box<dyn FnOnce(RunFlag) -> Result<()> + Send>;

struct Inner {
    state: PipelineState,
    run: Option<RunFlag>,
    handles: Vec<(&'static str, JoinHandle<Result<()>>)>,
}

/// Thread bookkeeping shared by the downlink and uplink pipelines.
pub(crate) struct Stages {
    pipeline: &'static str,
    inner: Mutex<Inner>,
}

impl Stages {
    pub(crate) fn new(pipeline: &'static str) -> Self {
        Self {
            pipeline,
            inner: Mutex::new(Inner {
                state: PipelineState::Stopped,
                run: None,
                handles: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> PipelineState {
        self.lock().state
    }

    /// Spawn one named thread per stage with a fresh cancellation flag.
    pub(crate) fn start(&self, stages: Vec<(&'static str, StageFn)>) -> Result<()> {
        let mut inner = self.lock();
        if inner.state != PipelineState::Stopped {
            return Err(PipelineError::InvalidState {
                pipeline: self.pipeline,
                action: "start",
                state: inner.state,
            });
        }

        let run = RunFlag::new();
        let mut handles = Vec::with_capacity(stages.len());
        for (stage, body) in stages {
            let flag = run.clone();
            let spawned = thread::Builder::new()
                .name(format!("{}-{stage}", self.pipeline))
                .spawn(move || body(flag));
            match spawned {
                Ok(handle) => handles.push((stage, handle)),
                Err(source) => {
                    run.stop();
                    for (_, handle) in handles {
                        let _ = handle.join();
                    }
                    return Err(PipelineError::Spawn { stage, source });
                }
            }
        }

        inner.handles = handles;
        inner.run = Some(run);
        inner.state = PipelineState::Running;
        info!(pipeline = self.pipeline, "pipeline started");
        Ok(())
    }

    /// Ask every stage to exit. Does not wait.
    pub(crate) fn stop(&self) {
        let mut inner = self.lock();
        if inner.state != PipelineState::Running {
            return;
        }
        if let Some(run) = &inner.run {
            run.stop();
        }
        inner.state = PipelineState::Stopping;
        debug!(pipeline = self.pipeline, "stop requested");
    }

    /// Whether any stage thread has exited.
    pub(crate) fn is_finished(&self) -> bool {
        self.lock()
            .handles
            .iter()
            .any(|(_, handle)| handle.is_finished())
    }

    /// Wait for every stage thread and report the first failure.
    pub(crate) fn join(&self) -> Result<()> {
        // Joining happens outside the lock so `stop()` stays callable.
        let handles = std::mem::take(&mut self.lock().handles);

        let mut first_err = None;
        for (stage, handle) in handles {
            let outcome = match handle.join() {
                Ok(result) => result,
                Err(_) => Err(PipelineError::StagePanicked(format!(
                    "{}-{stage}",
                    self.pipeline
                ))),
            };
            if let Err(err) = outcome {
                first_err.get_or_insert(err);
            }
        }

        let mut inner = self.lock();
        inner.run = None;
        if inner.state != PipelineState::Stopped {
            inner.state = PipelineState::Stopped;
            info!(pipeline = self.pipeline, "pipeline stopped");
        }
        drop(inner);

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
