/// WebSocket connection actor
///
/// Every connection owns its own `ViewCoordinator`. Loads run as futures
/// spawned on the actor's context; their progress comes back as actor
/// messages and their result is handed to the coordinator when the future
/// resolves. Stale progress and results are dropped by the coordinator.
use actix::prelude::*;
use actix_web::web;
use actix_web_actors::ws;
use log::{debug, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::ServerConfig;
use crate::directory::DirectoryProvider;
use crate::loader::{ChunkLoader, LoadProgress};
use crate::messages::{ClientMessage, ServerMessage};
use crate::view::{LoadOutcome, LoadTicket, ViewCoordinator};

/// How often heartbeat pings are sent
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
/// How long before lack of client response causes a timeout
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared state for all WebSocket connections
pub struct AppState {
    pub provider: Arc<DirectoryProvider>,
    pub loader: ChunkLoader<DirectoryProvider>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        let provider = Arc::new(DirectoryProvider::new(&config.data_dir));
        Self {
            loader: ChunkLoader::new(Arc::clone(&provider)),
            provider,
        }
    }
}

/// Progress of a load started by this connection
#[derive(Message)]
#[rtype(result = "()")]
struct LoadProgressed {
    ticket: LoadTicket,
    progress: LoadProgress,
}

pub struct RecordViewSocket {
    hb: Instant,
    state: web::Data<AppState>,
    view: ViewCoordinator,
}

impl RecordViewSocket {
    pub fn new(state: web::Data<AppState>) -> Self {
        Self {
            hb: Instant::now(),
            state,
            view: ViewCoordinator::new(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                warn!("WebSocket client heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn send(&self, msg: ServerMessage, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.text(msg.to_json());
    }

    fn send_view(&self, ctx: &mut ws::WebsocketContext<Self>) {
        self.send(ServerMessage::view(self.view.snapshot()), ctx);
    }

    /// Run the load described by `ticket` in the background.
    fn start_load(&mut self, ticket: LoadTicket, ctx: &mut ws::WebsocketContext<Self>) {
        let loader = self.state.loader.clone();
        let addr = ctx.address();
        let progress_ticket = ticket.clone();

        let load = async move {
            let guard = ticket.guard().clone();
            let source = ticket.source().to_string();
            let result = loader
                .load(&source, &guard, move |progress| {
                    addr.do_send(LoadProgressed {
                        ticket: progress_ticket.clone(),
                        progress,
                    })
                })
                .await;
            (ticket, result)
        };

        ctx.spawn(load.into_actor(self).map(|(ticket, result), act, ctx| {
            match act.view.complete_load(&ticket, result) {
                LoadOutcome::Ignored => {}
                LoadOutcome::Applied | LoadOutcome::Failed => act.send_view(ctx),
            }
        }));

        // The client sees the Loading status right away
        self.send_view(ctx);
    }

    fn list_sources(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let provider = Arc::clone(&self.state.provider);
        let listing = async move { provider.list_sources().await };
        ctx.spawn(listing.into_actor(self).map(|result, act, ctx| {
            let msg = match result {
                Ok(sources) => ServerMessage::Sources { sources },
                Err(e) => ServerMessage::error(e),
            };
            act.send(msg, ctx);
        }));
    }

    fn handle_client_message(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        debug!("Client message: {:?}", msg);
        let edit = match msg {
            ClientMessage::ListSources => {
                self.list_sources(ctx);
                return;
            }

            ClientMessage::SelectSource { source } => {
                match self.view.select_source(&source) {
                    Some(ticket) => self.start_load(ticket, ctx),
                    None => self.send_view(ctx),
                }
                return;
            }

            ClientMessage::Reload => {
                match self.view.reload() {
                    Some(ticket) => self.start_load(ticket, ctx),
                    None => self.send(ServerMessage::error("No dataset is loaded"), ctx),
                }
                return;
            }

            ClientMessage::CancelLoad => {
                self.view.cancel_load();
                Ok(())
            }

            ClientMessage::SetQuery { query } => self.view.set_query(query),

            ClientMessage::ClearQuery => {
                self.view.clear_query();
                Ok(())
            }

            ClientMessage::SetSort { column } => self.view.set_sort(&column),

            ClientMessage::SetPage { page } => {
                self.view.set_page(page);
                Ok(())
            }

            ClientMessage::NextPage => {
                self.view.next_page();
                Ok(())
            }

            ClientMessage::PreviousPage => {
                self.view.previous_page();
                Ok(())
            }

            ClientMessage::SetSelectedColumns { columns } => {
                self.view.set_selected_columns(&columns)
            }

            ClientMessage::RecordDetail { index } => {
                let msg = match self.view.record_detail(index) {
                    Some(detail) => ServerMessage::Detail { detail },
                    None => ServerMessage::error(format!("No record at index {}", index)),
                };
                self.send(msg, ctx);
                return;
            }
        };

        match edit {
            Ok(()) => self.send_view(ctx),
            Err(e) => self.send(ServerMessage::error(e), ctx),
        }
    }
}

impl Actor for RecordViewSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        // Late chunk responses of an unfinished load are dropped
        self.view.cancel_load();
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for RecordViewSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => self.handle_client_message(client_msg, ctx),
                Err(e) => self.send(ServerMessage::error(format!("Invalid message format: {}", e)), ctx),
            },
            Ok(ws::Message::Binary(_)) => {
                warn!("Unexpected binary message");
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            _ => ctx.stop(),
        }
    }
}

impl Handler<LoadProgressed> for RecordViewSocket {
    type Result = ();

    fn handle(&mut self, msg: LoadProgressed, ctx: &mut Self::Context) {
        if self.view.apply_progress(&msg.ticket, msg.progress) {
            self.send(ServerMessage::progress(msg.ticket.source(), msg.progress), ctx);
        }
    }
}
