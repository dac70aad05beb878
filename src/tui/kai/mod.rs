//! KAI, the personal companion: converse, create, analyze and a memory archive.

pub mod async_ops;
pub mod key;
pub mod message;
pub mod render;
pub mod types;

use crossterm::event::Event;
use ratatui::Frame;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

use crate::app::Runtime;
use crate::engine::KaiEngine;
use crate::errors::CliError;
use crate::state::kai::KaiState;
use crate::state::message::ChatMessage;
use crate::tui::{Screen, reject_json, run};
use types::{App, TuiMsg};

impl Screen for App {
    type Msg = TuiMsg;

    fn draw(&mut self, f: &mut Frame) {
        render::ui(f, self);
    }

    fn tick(&mut self) {
        self.spinner.tick();
    }

    fn busy(&self) -> bool {
        self.waiting
    }

    fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn handle_event(&mut self, tx: &UnboundedSender<TuiMsg>, event: Event) -> Result<(), CliError> {
        key::handle_event(self, tx, event)
    }

    fn handle_msg(&mut self, _tx: &UnboundedSender<TuiMsg>, msg: TuiMsg) {
        message::handle_tui_msg(self, msg);
    }

    fn report_error(&mut self, err: CliError) {
        self.state.push_message(ChatMessage::error(format!("Error: {err}")));
        self.status = "Error".to_string();
    }
}

pub async fn handle(runtime: &Runtime) -> Result<(), CliError> {
    reject_json(runtime.output.json, "kai")?;

    let store = runtime.store::<KaiState>()?;
    let state = store.load();
    let engine = KaiEngine::new(runtime.backend()?);
    info!(path = %store.path().display(), model = %runtime.resolved_model(), "launching kai");

    let mut app = App::new(state, store, engine);
    run(&mut app)
}
