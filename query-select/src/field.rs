//! The mounted field: a [`SelectionController`] driven by a tokio task.
//!
//! Widget events go in over a command channel. The task owns the debounce
//! deadline, spawns each search and value lookup as its own task, feeds
//! completions back into the controller, and publishes a fresh
//! [`SelectView`] on a watch channel after every transition. Dropping the
//! handle (or calling [`SelectField::shutdown`]) unmounts the field;
//! responses that arrive afterwards are ignored.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::client::QueryClient;
use crate::controller::{Effect, SelectView, SelectionController};
use crate::error::{Result, SelectError};
use crate::resolver::ResolvedBatch;
use crate::searcher::SearchOutcome;
use crate::types::{SelectHandlers, SelectOption, SelectProps};

#[derive(Debug)]
enum Command {
    Input(String),
    Select(Vec<SelectOption>),
    SetProps(SelectProps),
    Reset,
}

enum Completion {
    Search { seq: u64, outcome: SearchOutcome },
    Resolve { seq: u64, batch: ResolvedBatch },
}

/// Handle to a running selection field.
pub struct SelectField {
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<SelectView>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SelectField {
    /// Mount `controller` and start its event loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        mut controller: SelectionController,
        client: Arc<dyn QueryClient>,
        handlers: SelectHandlers,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(controller.view());
        let cancel = CancellationToken::new();

        let event_loop = EventLoop {
            controller,
            client,
            handlers,
            view: view_tx,
            completions: completions_tx,
            deadline: None,
        };
        let task = tokio::spawn(event_loop.run(commands_rx, completions_rx, cancel.clone()));

        Self {
            commands: commands_tx,
            view: view_rx,
            cancel,
            task: Some(task),
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| SelectError::FieldClosed)
    }

    /// The user typed; `text` is the whole input.
    pub fn input_changed(&self, text: impl Into<String>) -> Result<()> {
        self.send(Command::Input(text.into()))
    }

    /// The user committed a selection: the complete new set of options.
    pub fn select(&self, options: Vec<SelectOption>) -> Result<()> {
        self.send(Command::Select(options))
    }

    /// The form re-rendered with new props.
    pub fn set_props(&self, props: SelectProps) -> Result<()> {
        self.send(Command::SetProps(props))
    }

    /// Clear search text, e.g. when the menu closes.
    pub fn reset(&self) -> Result<()> {
        self.send(Command::Reset)
    }

    /// The most recently published view.
    pub fn view(&self) -> SelectView {
        self.view.borrow().clone()
    }

    /// A receiver notified on every re-render.
    pub fn subscribe(&self) -> watch::Receiver<SelectView> {
        self.view.clone()
    }

    /// Unmount and wait for the event loop to stop.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SelectField {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct EventLoop {
    controller: SelectionController,
    client: Arc<dyn QueryClient>,
    handlers: SelectHandlers,
    view: watch::Sender<SelectView>,
    completions: mpsc::UnboundedSender<Completion>,
    deadline: Option<Instant>,
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl EventLoop {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
        cancel: CancellationToken,
    ) {
        debug!("selection field mounted");
        let effects = self.controller.mount();
        self.apply(effects);
        self.publish();

        loop {
            let effects = tokio::select! {
                _ = cancel.cancelled() => break,
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                Some(done) = completions.recv() => {
                    self.complete(done);
                    Vec::new()
                }
                _ = wait_for(self.deadline), if self.deadline.is_some() => {
                    self.deadline = None;
                    self.controller.debounce_elapsed()
                }
            };
            self.apply(effects);
            self.publish();
        }
        debug!("selection field unmounted");
    }

    fn handle(&mut self, command: Command) -> Vec<Effect> {
        trace!(?command, "field command");
        match command {
            Command::Input(text) => self.controller.input_changed(text),
            Command::Select(options) => self.controller.select(options),
            Command::SetProps(props) => self.controller.set_props(props),
            Command::Reset => self.controller.reset(),
        }
    }

    fn complete(&mut self, done: Completion) {
        match done {
            Completion::Search { seq, outcome } => {
                self.controller.search_completed(seq, outcome);
            }
            Completion::Resolve { seq, batch } => {
                self.controller.resolution_completed(seq, batch);
            }
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ArmDebounce(delay) => self.deadline = Some(Instant::now() + delay),
                Effect::CancelDebounce => self.deadline = None,
                Effect::Search { seq, request } => {
                    debug!(seq, "issuing option search");
                    let searcher = self.controller.searcher();
                    let client = self.client.clone();
                    let completions = self.completions.clone();
                    tokio::spawn(async move {
                        let outcome = searcher.search(client.as_ref(), request).await;
                        let _ = completions.send(Completion::Search { seq, outcome });
                    });
                }
                Effect::Resolve { seq, ids } => {
                    debug!(seq, batch = ids.len(), "issuing value lookup");
                    let resolver = self.controller.resolver();
                    let client = self.client.clone();
                    let completions = self.completions.clone();
                    tokio::spawn(async move {
                        let batch = resolver.fetch(client.as_ref(), ids).await;
                        let _ = completions.send(Completion::Resolve { seq, batch });
                    });
                }
                Effect::Change(value) => (self.handlers.on_change)(value),
                Effect::Create(text) => {
                    if let Some(on_create) = &self.handlers.on_create {
                        on_create(text);
                    }
                }
            }
        }
    }

    fn publish(&mut self) {
        let view = self.controller.view();
        self.view.send_replace(view);
    }
}
