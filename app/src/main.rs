//! Keystash: store, list and delete key/value pairs kept on this machine.

mod config;

use std::sync::Arc;

use iced::widget::{Column, button, column, container, row, scrollable, text, text_input};
use iced::{Color, Element, Length, Subscription, Task};
use keystash::{Level, Notification, PanelHandle, PanelHost, PanelHostBuilder, PanelMessage};
use keystash_kv_panel::{Entry, KvMessage, KvPanelPlugin, Phase};
use keystash_store::{AppName, FileStore, MemoryStore, SharedStore};
use keystash_toast_panel::{ToastMessage, ToastPanel};

use crate::config::{Config, StoreConfig};

type KvPanel = KvPanelPlugin<SharedStore>;

fn main() -> iced::Result {
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    for warning in config.warnings() {
        tracing::warn!("{warning}");
    }

    iced::application(move || App::new(&config), App::update, App::view)
        .subscription(App::subscription)
        .run()
}

fn app_name() -> AppName {
    AppName::new("com", "keystash", "keystash")
}

/// Build the store the configuration asks for
fn open_store(config: &Config) -> SharedStore {
    match &config.store {
        StoreConfig::Memory => {
            tracing::info!("using in-memory store, nothing will be saved");
            let store = match config.quota_bytes {
                Some(quota) => MemoryStore::new().with_quota(quota),
                None => MemoryStore::new(),
            };
            Arc::new(store)
        }
        StoreConfig::Path(path) => with_quota(FileStore::at(path), config),
        StoreConfig::Origin(origin) => with_quota(FileStore::for_origin(&app_name(), origin), config),
    }
}

fn with_quota(store: FileStore, config: &Config) -> SharedStore {
    let store = match config.quota_bytes {
        Some(quota) => store.with_quota(quota),
        None => store,
    };
    tracing::info!(path = %store.path().display(), "using file store");
    Arc::new(store)
}

struct App {
    panels: PanelHost,
    kv: PanelHandle<KvPanel>,
    toasts: PanelHandle<ToastPanel>,
}

#[derive(Debug, Clone)]
enum Message {
    Panel(PanelMessage),
    Notified(Notification),

    KeyChanged(String),
    ValueChanged(String),
    Save,
    Delete(String),
    ClearAll,
    DismissToast(u64),
}

impl App {
    fn new(config: &Config) -> (App, Task<Message>) {
        let mut builder = PanelHostBuilder::new();
        let kv = builder.install(KvPanelPlugin::new(open_store(config)));
        let toasts = builder.install(ToastPanel::new(config.toast_ttl));
        let (panels, init_task) = builder.build();

        let app = App { panels, kv, toasts };

        (app, init_task.map(Message::Panel))
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        let routed = match message {
            Message::Panel(panel_msg) => panel_msg,
            Message::Notified(notification) => {
                self.toasts.message(ToastMessage::Push(notification))
            }
            Message::KeyChanged(key) => self.kv.message(KvMessage::KeyChanged(key)),
            Message::ValueChanged(value) => self.kv.message(KvMessage::ValueChanged(value)),
            Message::Save => self.kv.message(KvMessage::Submit),
            Message::Delete(key) => self.kv.message(KvMessage::Delete(key)),
            Message::ClearAll => self.kv.message(KvMessage::ClearAll),
            Message::DismissToast(id) => self.toasts.message(ToastMessage::Dismiss(id)),
        };

        self.panels.update(routed).map(Message::Panel)
    }

    fn view(&self) -> Element<'_, Message> {
        let Some(kv) = self.panels.state::<KvPanel>() else {
            return text("Key/value panel is not installed").into();
        };

        let title = text("Local Storage Demo").size(32);
        let subtitle = text("Store and manage key/value pairs on this machine.").size(16);

        let key_input = column![
            text("Key"),
            text_input("Enter a key (e.g., username)", kv.pending_key())
                .on_input(Message::KeyChanged)
                .on_submit(Message::Save),
        ]
        .spacing(4)
        .width(Length::Fill);

        let value_input = column![
            text("Value"),
            text_input("Enter a value (e.g., John Doe)", kv.pending_value())
                .on_input(Message::ValueChanged)
                .on_submit(Message::Save),
        ]
        .spacing(4)
        .width(Length::Fill);

        let buttons = row![
            button("Save").on_press(Message::Save).width(Length::Fill),
            button("Clear All").on_press_maybe((!kv.is_empty()).then_some(Message::ClearAll)),
        ]
        .spacing(10);

        let add_card = column![
            text("Add New Data").size(20),
            row![key_input, value_input].spacing(10),
            buttons,
        ]
        .spacing(10);

        let entries: Element<'_, Message> = match kv.phase() {
            Phase::Loading => text("Loading...").into(),
            Phase::Ready if kv.is_empty() => {
                text("No data stored yet. Add some data above to get started!").into()
            }
            Phase::Ready => Column::with_children(kv.snapshot().entries().iter().map(entry_row))
                .spacing(8)
                .into(),
        };

        let stored_card = column![
            text(format!("Stored Data ({} items)", kv.count())).size(20),
            entries,
        ]
        .spacing(10);

        let content = column![
            title,
            subtitle,
            text("").size(10),
            add_card,
            text("").size(10),
            stored_card,
            text("").size(10),
            self.toast_view(),
        ]
        .spacing(10)
        .padding(20);

        scrollable(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn toast_view(&self) -> Element<'_, Message> {
        let Some(state) = self.panels.state::<ToastPanel>() else {
            return column![].into();
        };

        Column::with_children(state.toasts().iter().map(|toast| {
            let color = match toast.notification.level {
                Level::Success => Color::from_rgb(0.1, 0.5, 0.2),
                Level::Error => Color::from_rgb(0.75, 0.1, 0.1),
            };
            button(text(&toast.notification.message).color(color))
                .on_press(Message::DismissToast(toast.id))
                .into()
        }))
        .spacing(6)
        .into()
    }

    fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            self.panels.subscriptions().map(Message::Panel),
            self.kv.listen().map(Message::Notified),
        ])
    }
}

fn entry_row(entry: &Entry) -> Element<'_, Message> {
    container(
        row![
            column![text(&entry.key).size(16), text(&entry.value).size(14)].width(Length::Fill),
            button("Delete").on_press(Message::Delete(entry.key.clone())),
        ]
        .spacing(10),
    )
    .padding(10)
    .width(Length::Fill)
    .into()
}
