//! Tokio runner for a form machine.

use std::future::{Future, pending};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use form_fsm_core::{Event, FormContext, ShutdownMode, TaskError};
use form_fsm_gen::{Dispatch, DispatchError, FormMachine, SubmitFuture};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::runtime::{FormSnapshot, Interpreter, RuntimeError};

/// Runner configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Capacity of the event queue.
    pub channel_size: usize,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self { channel_size: 100 }
    }
}

/// Starts `machine` on the current Tokio runtime.
///
/// The returned task resolves with the final context once the machine
/// reaches its final state, is shut down, or every handle is dropped.
pub fn spawn(
    machine: &FormMachine,
    options: RunnerOptions,
) -> Result<(FormHandle, FormTask), RuntimeError> {
    let interpreter = Interpreter::new(machine)?;

    let (event_tx, event_rx) = mpsc::channel(options.channel_size.max(1));
    let (state_tx, state_rx) = watch::channel(interpreter.snapshot());
    let (shutdown_tx, shutdown_rx) = watch::channel(None);

    let shutdown_tx = Arc::new(shutdown_tx);
    let handle = tokio::spawn(run(interpreter, event_rx, shutdown_rx, state_tx));

    Ok((
        FormHandle {
            event_tx,
            state_rx,
            shutdown_tx,
        },
        FormTask { handle },
    ))
}

struct Runner {
    interpreter: Interpreter,
    in_flight: Option<SubmitFuture>,
    state_tx: watch::Sender<FormSnapshot>,
}

impl Runner {
    fn handle(&mut self, event: Event) -> Result<(), RuntimeError> {
        tracing::trace!(?event, "handling event");
        self.interpreter.send(&event)?;

        if self.interpreter.invoking().is_none() && self.in_flight.take().is_some() {
            tracing::debug!("dropping result of cancelled service");
        }
        if let Some(service) = self.interpreter.start_service()? {
            self.in_flight = Some(service);
        }

        let _ = self.state_tx.send(self.interpreter.snapshot());
        Ok(())
    }
}

async fn run(
    interpreter: Interpreter,
    mut events: mpsc::Receiver<Event>,
    mut shutdown: watch::Receiver<Option<ShutdownMode>>,
    state_tx: watch::Sender<FormSnapshot>,
) -> Result<FormContext, RuntimeError> {
    let mut runner = Runner {
        interpreter,
        in_flight: None,
        state_tx,
    };

    while !runner.interpreter.is_done() {
        tokio::select! {
            Ok(()) = shutdown.changed() => {
                let mode = *shutdown.borrow();
                match mode {
                    Some(ShutdownMode::Immediate) => break,
                    Some(ShutdownMode::Graceful) => {
                        while let Ok(event) = events.try_recv() {
                            runner.handle(event)?;
                        }
                        break;
                    }
                    None => {}
                }
            }
            settled = async {
                match runner.in_flight.as_mut() {
                    Some(service) => service.await,
                    None => pending().await,
                }
            }, if runner.in_flight.is_some() => {
                runner.in_flight = None;
                let event = match settled {
                    Ok(data) => Event::SubmitDone(data),
                    Err(data) => Event::SubmitError(data),
                };
                runner.handle(event)?;
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                runner.handle(event)?;
            }
        }
    }

    tracing::debug!(done = runner.interpreter.is_done(), "form machine stopped");
    Ok(runner.interpreter.into_context())
}

/// Handle to a running form machine.
#[derive(Debug, Clone)]
pub struct FormHandle {
    event_tx: mpsc::Sender<Event>,
    state_rx: watch::Receiver<FormSnapshot>,
    shutdown_tx: Arc<watch::Sender<Option<ShutdownMode>>>,
}

impl FormHandle {
    /// Sends an event, waiting for queue capacity.
    pub async fn send(&self, event: Event) -> Result<(), mpsc::error::SendError<Event>> {
        self.event_tx.send(event).await
    }

    /// Attempts to send an event without awaiting capacity.
    pub fn try_send(&self, event: Event) -> Result<(), mpsc::error::TrySendError<Event>> {
        self.event_tx.try_send(event)
    }

    /// The latest published state configuration and context.
    pub fn snapshot(&self) -> FormSnapshot {
        self.state_rx.borrow().clone()
    }

    /// Waits until a published snapshot satisfies `predicate` and returns it.
    pub async fn wait_for<F>(
        &self,
        mut predicate: F,
    ) -> Result<FormSnapshot, watch::error::RecvError>
    where
        F: FnMut(&FormSnapshot) -> bool,
    {
        let mut rx = self.state_rx.clone();
        loop {
            {
                let snapshot = rx.borrow_and_update();
                if predicate(&snapshot) {
                    return Ok(snapshot.clone());
                }
            }
            rx.changed().await?;
        }
    }

    /// Initiates a graceful shutdown. Processes queued events before exiting.
    pub fn shutdown_graceful(&self) {
        let _ = self.shutdown_tx.send(Some(ShutdownMode::Graceful));
    }

    /// Initiates an immediate shutdown. Drops queued events.
    pub fn shutdown_immediate(&self) {
        let _ = self.shutdown_tx.send(Some(ShutdownMode::Immediate));
    }
}

impl Dispatch for FormHandle {
    fn dispatch(&self, event: Event) -> Result<(), DispatchError> {
        self.try_send(event).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => DispatchError::Full,
            mpsc::error::TrySendError::Closed(_) => DispatchError::Closed,
        })
    }
}

/// Background task of a running form machine.
#[derive(Debug)]
pub struct FormTask {
    handle: JoinHandle<Result<FormContext, RuntimeError>>,
}

impl FormTask {
    /// Aborts the background task.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl Future for FormTask {
    type Output = Result<FormContext, TaskError<RuntimeError>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(Ok(context))) => Poll::Ready(Ok(context)),
            Poll::Ready(Ok(Err(e))) => Poll::Ready(Err(TaskError::Runtime(e))),
            Poll::Ready(Err(e)) => Poll::Ready(Err(TaskError::Join(e))),
            Poll::Pending => Poll::Pending,
        }
    }
}
