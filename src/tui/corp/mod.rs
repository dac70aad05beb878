//! The Autonomous Corp console: dashboard, directive chat and tools.

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
use crate::engine::CorpEngine;
use crate::errors::CliError;
use crate::state::corp::CorpState;
use crate::tui::{Screen, reject_json, run};
use types::{App, TuiMsg};

impl Screen for App {
    type Msg = TuiMsg;

    fn draw(&mut self, f: &mut Frame) {
        render::ui(f, self);
    }

    fn tick(&mut self) {
        self.spinner.tick();
        self.directive.start(render::active_directive(self));
        self.directive.tick();
    }

    fn busy(&self) -> bool {
        self.waiting || !self.directive.done()
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
        self.push_system(format!("Error: {err}"));
        self.status = "Error".to_string();
    }
}

pub async fn handle(runtime: &Runtime) -> Result<(), CliError> {
    reject_json(runtime.output.json, "corp")?;

    let store = runtime.store::<CorpState>()?;
    let state = store.load();
    let engine = CorpEngine::new(runtime.backend()?);
    info!(path = %store.path().display(), model = %runtime.resolved_model(), "launching corp");

    let mut app = App::new(state, store, engine);
    run(&mut app)
}
