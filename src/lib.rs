//! Panel host for keystash
//!
//! A panel owns a slice of application state, reacts to its own messages and
//! may emit one output per message. The host keeps every installed panel,
//! routes type-erased [`PanelMessage`]s to the right one and fans outputs out
//! to whoever listens through a [`PanelHandle`].

use iced::futures::channel::mpsc;
use iced::futures::stream::BoxStream;
use iced::{Subscription, Task};
use std::any::{Any, TypeId};
use std::collections::{HashMap, VecDeque};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

pub mod notify;

pub use notify::{Level, Notification, Notifier};

/// A unit of state and behaviour driven by the [`PanelHost`].
pub trait Panel: Send + Sync {
    /// The message type this panel handles
    type Message: Clone + Send + Sync + 'static;

    /// The state type for this panel
    type State: Send + 'static;

    /// Output emitted to listeners after handling a message
    type Output: Clone + Send + Sync + 'static;

    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Build the initial state and an optional startup task
    fn init(&self) -> (Self::State, Task<Self::Message>);

    /// Handle one message to completion
    fn update(
        &self,
        state: &mut Self::State,
        message: Self::Message,
    ) -> (Task<Self::Message>, Option<Self::Output>);

    /// Subscribe to external events; may depend on the current state
    fn subscription(&self, state: &Self::State) -> Subscription<Self::Message>;
}

/// Most outputs held per panel while nobody listens
const BACKLOG_LIMIT: usize = 64;

/// Where panel outputs go.
///
/// Outputs reach every live listener of their panel. A panel with no live
/// listener keeps its outputs in a backlog, handed to the next listener that
/// subscribes; startup tasks can run before any listener stream is polled.
#[derive(Default)]
struct Outbox {
    listeners: HashMap<usize, Vec<mpsc::UnboundedSender<PanelOutput>>>,
    backlog: HashMap<usize, VecDeque<PanelOutput>>,
}

impl Outbox {
    fn subscribe(&mut self, panel_index: usize) -> mpsc::UnboundedReceiver<PanelOutput> {
        let (sender, receiver) = mpsc::unbounded();
        for output in self.backlog.remove(&panel_index).into_iter().flatten() {
            if sender.unbounded_send(output).is_err() {
                break;
            }
        }
        self.listeners.entry(panel_index).or_default().push(sender);
        receiver
    }

    fn deliver(&mut self, output: PanelOutput) {
        let panel_index = output.panel_index;
        let listeners = self.listeners.entry(panel_index).or_default();
        listeners.retain(|sender| sender.unbounded_send(output.clone()).is_ok());
        if !listeners.is_empty() {
            return;
        }

        let backlog = self.backlog.entry(panel_index).or_default();
        if backlog.len() == BACKLOG_LIMIT {
            backlog.pop_front();
            tracing::warn!(index = panel_index, "no listener, oldest panel output dropped");
        }
        backlog.push_back(output);
    }
}

type SharedOutbox = Arc<Mutex<Outbox>>;

fn subscribe(outbox: &SharedOutbox, panel_index: usize) -> Option<mpsc::UnboundedReceiver<PanelOutput>> {
    match outbox.lock() {
        Ok(mut outbox) => Some(outbox.subscribe(panel_index)),
        Err(_) => {
            tracing::error!(index = panel_index, "output registry poisoned, listener not added");
            None
        }
    }
}

/// Subscription recipe for the outputs of one panel
struct Listener<O> {
    panel_index: usize,
    outbox: SharedOutbox,
    _output: PhantomData<fn() -> O>,
}

impl<O> std::hash::Hash for Listener<O> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.panel_index.hash(state);
        std::any::type_name::<O>().hash(state);
    }
}

impl<O: Clone + Send + Sync + 'static> Listener<O> {
    fn stream(&self) -> BoxStream<'static, O> {
        use iced::futures::{SinkExt, StreamExt};

        let panel_index = self.panel_index;
        let outbox = Arc::clone(&self.outbox);

        Box::pin(iced::stream::channel(100, move |mut sink: mpsc::Sender<O>| async move {
            let Some(mut outputs) = subscribe(&outbox, panel_index) else {
                return;
            };

            while let Some(output) = outputs.next().await {
                let Some(output) = output.downcast::<O>().cloned() else {
                    continue;
                };
                if sink.send(output).await.is_err() {
                    break;
                }
            }
            // The sender left behind is pruned by the next `Outbox::deliver`.
        }))
    }
}

/// Typed handle to an installed panel
pub struct PanelHandle<P: Panel> {
    panel_index: usize,
    outbox: SharedOutbox,
    _panel: PhantomData<fn() -> P>,
}

impl<P: Panel> std::fmt::Debug for PanelHandle<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelHandle")
            .field("panel_index", &self.panel_index)
            .finish_non_exhaustive()
    }
}

impl<P: Panel> Clone for PanelHandle<P> {
    fn clone(&self) -> Self {
        Self {
            panel_index: self.panel_index,
            outbox: Arc::clone(&self.outbox),
            _panel: PhantomData,
        }
    }
}

impl<P: Panel> PanelHandle<P> {
    /// Task that delivers `message` to this panel on the next update
    pub fn dispatch(&self, message: P::Message) -> Task<PanelMessage> {
        Task::done(self.message(message))
    }

    /// Wrap a message for direct use with [`PanelHost::update`]
    pub fn message(&self, message: P::Message) -> PanelMessage {
        PanelMessage::new(self.panel_index, message)
    }

    /// Subscribe to every output this panel emits, starting with any it
    /// emitted before the subscription began.
    ///
    /// # Example
    /// ```ignore
    /// fn subscription(&self) -> Subscription<Message> {
    ///     Subscription::batch([
    ///         self.panels.subscriptions().map(Message::Panel),
    ///         self.kv.listen().map(Message::Notified),
    ///     ])
    /// }
    /// ```
    pub fn listen(&self) -> Subscription<P::Output> {
        let listener = Listener::<P::Output> {
            panel_index: self.panel_index,
            outbox: Arc::clone(&self.outbox),
            _output: PhantomData,
        };
        Subscription::run_with(listener, Listener::<P::Output>::stream)
    }
}

/// A message addressed to one installed panel
#[derive(Clone, Debug)]
pub struct PanelMessage {
    panel_index: usize,
    message: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
}

impl PanelMessage {
    fn new<M: 'static + Send + Sync>(panel_index: usize, message: M) -> Self {
        Self {
            panel_index,
            type_id: TypeId::of::<M>(),
            message: Arc::new(message),
        }
    }
}

/// An output emitted by one installed panel
#[derive(Clone, Debug)]
pub struct PanelOutput {
    panel_index: usize,
    output: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
}

impl PanelOutput {
    fn new<O: 'static + Send + Sync>(panel_index: usize, output: O) -> Self {
        Self {
            panel_index,
            type_id: TypeId::of::<O>(),
            output: Arc::new(output),
        }
    }

    /// Borrow the output as `O` if that is what the panel emitted
    pub fn downcast<O: 'static>(&self) -> Option<&O> {
        if self.type_id == TypeId::of::<O>() {
            self.output.downcast_ref::<O>()
        } else {
            None
        }
    }
}

type UpdateFn = Box<
    dyn Fn(&mut dyn Any, &(dyn Any + Send + Sync)) -> Option<(Task<PanelMessage>, Option<PanelOutput>)>
        + Send
        + Sync,
>;

type SubscriptionFn = Box<dyn Fn(&dyn Any) -> Subscription<PanelMessage> + Send + Sync>;

struct PanelEntry {
    name: &'static str,
    state: Box<dyn Any + Send>,
    state_type_id: TypeId,
    message_type_id: TypeId,
    update_fn: UpdateFn,
    subscription_fn: SubscriptionFn,
}

impl std::fmt::Debug for PanelEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelEntry")
            .field("name", &self.name)
            .field("state_type_id", &self.state_type_id)
            .field("message_type_id", &self.message_type_id)
            .finish_non_exhaustive()
    }
}

fn wrap_subscription<M: Send + Sync + 'static>(
    inner: Subscription<M>,
    panel_index: usize,
) -> Subscription<PanelMessage> {
    inner
        .with(panel_index)
        .map(|(panel_index, message)| PanelMessage::new(panel_index, message))
}

/// Owns every installed panel and its state.
///
/// Embed it in the application state and forward [`PanelMessage`]s to
/// [`PanelHost::update`].
pub struct PanelHost {
    panels: Vec<PanelEntry>,
    outbox: SharedOutbox,
}

impl std::fmt::Debug for PanelHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelHost")
            .field("panels", &self.panels)
            .finish_non_exhaustive()
    }
}

impl Default for PanelHost {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelHost {
    pub fn new() -> Self {
        Self {
            panels: Vec::new(),
            outbox: SharedOutbox::default(),
        }
    }

    /// Install a panel and return its handle together with its startup task.
    pub fn install<P>(&mut self, panel: P) -> (PanelHandle<P>, Task<PanelMessage>)
    where
        P: Panel + 'static,
    {
        let name = panel.name();
        let panel = Arc::new(panel);
        let panel_index = self.panels.len();
        let (state, init_task) = panel.init();

        let for_update = Arc::clone(&panel);
        let update_fn: UpdateFn = Box::new(move |state: &mut dyn Any, message: &(dyn Any + Send + Sync)| {
            let message = message.downcast_ref::<P::Message>()?;
            let state = state.downcast_mut::<P::State>()?;
            let (task, output) = for_update.update(state, message.clone());
            let task = task.map(move |message| PanelMessage::new(panel_index, message));
            Some((task, output.map(|o| PanelOutput::new(panel_index, o))))
        });

        let for_subscription = Arc::clone(&panel);
        let subscription_fn: SubscriptionFn = Box::new(move |state: &dyn Any| {
            match state.downcast_ref::<P::State>() {
                Some(state) => {
                    wrap_subscription(for_subscription.subscription(state), panel_index)
                }
                None => Subscription::none(),
            }
        });

        self.panels.push(PanelEntry {
            name,
            state: Box::new(state),
            state_type_id: TypeId::of::<P::State>(),
            message_type_id: TypeId::of::<P::Message>(),
            update_fn,
            subscription_fn,
        });
        tracing::debug!(panel = name, index = panel_index, "panel installed");

        let handle = PanelHandle {
            panel_index,
            outbox: Arc::clone(&self.outbox),
            _panel: PhantomData,
        };
        let init_task = init_task.map(move |message| PanelMessage::new(panel_index, message));
        (handle, init_task)
    }

    /// Route a message to its panel and deliver any output to its listeners,
    /// or to the panel's backlog while it has none.
    pub fn update(&mut self, message: PanelMessage) -> Task<PanelMessage> {
        let panel_index = message.panel_index;

        let Some(entry) = self.panels.get_mut(panel_index) else {
            tracing::warn!(index = panel_index, "message for unknown panel dropped");
            return Task::none();
        };

        if entry.message_type_id != message.type_id {
            tracing::warn!(panel = entry.name, "message of unexpected type dropped");
            return Task::none();
        }

        let Some((task, output)) = (entry.update_fn)(entry.state.as_mut(), message.message.as_ref())
        else {
            return Task::none();
        };

        if let Some(output) = output {
            match self.outbox.lock() {
                Ok(mut outbox) => outbox.deliver(output),
                Err(_) => tracing::error!(panel = entry.name, "output registry poisoned, output dropped"),
            }
        }

        task
    }

    /// Batch the subscriptions of every installed panel
    pub fn subscriptions(&self) -> Subscription<PanelMessage> {
        Subscription::batch(
            self.panels
                .iter()
                .map(|entry| (entry.subscription_fn)(entry.state.as_ref())),
        )
    }

    /// Borrow the state of the first installed panel of type `P`
    pub fn state<P: Panel>(&self) -> Option<&P::State> {
        self.panels
            .iter()
            .find(|p| TypeId::of::<P::State>() == p.state_type_id)
            .and_then(|p| p.state.downcast_ref::<P::State>())
    }
}

/// Collects panels and their startup tasks
#[derive(Default)]
pub struct PanelHostBuilder {
    host: PanelHost,
    init_tasks: Vec<Task<PanelMessage>>,
}

impl PanelHostBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install<P>(&mut self, panel: P) -> PanelHandle<P>
    where
        P: Panel + 'static,
    {
        let (handle, task) = self.host.install(panel);
        self.init_tasks.push(task);
        handle
    }

    /// Finish building; the returned task runs every panel's startup task.
    pub fn build(self) -> (PanelHost, Task<PanelMessage>) {
        (self.host, Task::batch(self.init_tasks))
    }
}
