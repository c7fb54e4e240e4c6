//! Interactive board: a single event loop over auth changes, snapshot
//! pushes, sign-in results and typed lines.
//!
//! Every event is handled to completion before the next one is read. The
//! store subscription lives exactly as long as the signed-in identity it
//! was opened for.

use std::sync::Arc;

use anyhow::{Context, Result};
use console::Term;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use quadrant_common::Identity;

use crate::auth::{AuthSession, AuthState};
use crate::board::{BoardController, Notice};
use crate::errors::{AuthError, BoardError};
use crate::store::{Snapshot, Subscription, TaskStore};
use crate::ui::{self, UserAction, render};

#[derive(Debug)]
pub enum AppEvent {
    Auth(AuthState),
    Snapshot(Snapshot),
    SignInFinished(Result<Identity, AuthError>),
    Input(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    auth: Arc<AuthSession>,
    store: Arc<dyn TaskStore>,
    auth_state: AuthState,
    board: Option<BoardController>,
    subscription: Option<Subscription>,
    login_notice: Option<Notice>,
    sign_in_tx: mpsc::Sender<Result<Identity, AuthError>>,
    sign_in_rx: mpsc::Receiver<Result<Identity, AuthError>>,
    sign_in_task: Option<JoinHandle<()>>,
    show_help: bool,
}

impl App {
    pub fn new(auth: Arc<AuthSession>, store: Arc<dyn TaskStore>) -> Self {
        let (sign_in_tx, sign_in_rx) = mpsc::channel(1);
        Self {
            auth,
            store,
            auth_state: AuthState::Unresolved,
            board: None,
            subscription: None,
            login_notice: None,
            sign_in_tx,
            sign_in_rx,
            sign_in_task: None,
            show_help: false,
        }
    }

    pub fn board(&self) -> Option<&BoardController> {
        self.board.as_ref()
    }

    fn signing_in(&self) -> bool {
        self.sign_in_task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Typed input waits until the auth state and first snapshot are in.
    fn awaiting_data(&self) -> bool {
        match (&self.auth_state, &self.board) {
            (AuthState::Unresolved, _) => true,
            (AuthState::SignedIn(_), Some(board)) => {
                !board.model.is_loaded() && board.model.notice().is_none()
            }
            _ => false,
        }
    }

    /// Current screen as text.
    pub fn render(&self) -> String {
        let mut out = match (&self.auth_state, &self.board) {
            (AuthState::Unresolved, _) => render::render_loading(),
            (AuthState::SignedIn(identity), Some(board)) => {
                render::render_board(identity, &board.model)
            }
            (AuthState::SignedIn(_), None) => render::render_loading(),
            (AuthState::SignedOut, _) if self.signing_in() => render::render_signing_in(),
            (AuthState::SignedOut, _) => {
                render::render_login(self.auth.provider_name(), self.login_notice.as_ref())
            }
        };
        if self.show_help {
            out.push('\n');
            out.push_str(&ui::render_help());
        }
        out
    }

    /// Tear down the board for the old identity and open one for the new.
    async fn on_auth(&mut self, state: AuthState) {
        let same_owner = match (&self.board, state.identity()) {
            (Some(board), Some(identity)) => board.owner().uid == identity.uid,
            _ => false,
        };
        if !same_owner {
            if let Some(mut sub) = self.subscription.take() {
                sub.cancel();
            }
            self.board = None;
            if let Some(identity) = state.identity() {
                let mut board = BoardController::new(self.store.clone(), identity.clone());
                match board.subscribe().await {
                    Ok(sub) => self.subscription = Some(sub),
                    Err(e) => board.model.snapshot_failed(&e),
                }
                self.board = Some(board);
                self.login_notice = None;
            }
        }
        self.auth_state = state;
    }

    fn start_sign_in(&mut self) {
        if self.auth_state.identity().is_some() || self.signing_in() {
            return;
        }
        self.login_notice = None;
        let auth = self.auth.clone();
        let tx = self.sign_in_tx.clone();
        self.sign_in_task = Some(tokio::spawn(async move {
            let result = auth.sign_in().await;
            let _ = tx.send(result).await;
        }));
    }

    fn notify(&mut self, notice: Notice) {
        match self.board.as_mut() {
            Some(board) => board.model.set_notice(notice),
            None => self.login_notice = Some(notice),
        }
    }

    pub async fn handle(&mut self, event: AppEvent) -> Flow {
        match event {
            AppEvent::Auth(state) => self.on_auth(state).await,
            AppEvent::Snapshot(snapshot) => {
                if let Some(board) = self.board.as_mut() {
                    match snapshot {
                        Ok(tasks) => board.model.apply_snapshot(tasks),
                        Err(e) => board.model.snapshot_failed(&e),
                    }
                }
            }
            AppEvent::SignInFinished(result) => {
                if let Err(e) = result {
                    self.login_notice = Some(Notice::Error(e.to_string()));
                }
            }
            AppEvent::Input(line) => {
                self.show_help = false;
                if let Some(board) = self.board.as_mut() {
                    board.model.clear_notice();
                }
                match ui::parse(&line) {
                    Ok(Some(action)) => return self.dispatch(action).await,
                    Ok(None) => {}
                    Err(e) => self.notify(Notice::Error(e.to_string())),
                }
            }
        }
        Flow::Continue
    }

    async fn dispatch(&mut self, action: UserAction) -> Flow {
        match action {
            UserAction::Quit => return Flow::Quit,
            UserAction::Help => self.show_help = true,
            UserAction::Login => self.start_sign_in(),
            UserAction::Logout => {
                if let Err(e) = self.auth.sign_out().await {
                    self.notify(Notice::Error(e.to_string()));
                }
            }
            action => match self.board.as_mut() {
                Some(board) => {
                    let result = apply_board_action(board, action).await;
                    if let Some(Some(notice)) = board.surface(result) {
                        board.model.set_notice(notice);
                    }
                }
                None => self.login_notice = Some(Notice::Error(BoardError::NotSignedIn.to_string())),
            },
        }
        Flow::Continue
    }

    /// Run until `quit` or end of input.
    pub async fn run(mut self, input: impl AsyncBufRead + Unpin) -> Result<()> {
        let term = Term::stdout();
        let mut auth_rx = self.auth.subscribe();
        let mut lines = input.lines();

        self.draw(&term)?;
        if let Err(e) = self.auth.restore() {
            self.login_notice = Some(Notice::Error(e.to_string()));
        }

        loop {
            let accepts_input = !self.awaiting_data();
            let event = tokio::select! {
                biased;
                changed = auth_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    AppEvent::Auth(auth_rx.borrow_and_update().clone())
                }
                Some(snapshot) = next_snapshot(&mut self.subscription) => AppEvent::Snapshot(snapshot),
                Some(result) = self.sign_in_rx.recv() => AppEvent::SignInFinished(result),
                line = lines.next_line(), if accepts_input => match line.context("Failed to read input")? {
                    Some(line) => AppEvent::Input(line),
                    None => break,
                },
            };
            if self.handle(event).await == Flow::Quit {
                break;
            }
            self.draw(&term)?;
        }

        self.shutdown();
        Ok(())
    }

    fn draw(&self, term: &Term) -> Result<()> {
        // The device prompt is printed by the sign-in task; don't wipe it.
        if !self.signing_in() {
            term.clear_screen().context("Failed to clear terminal")?;
        }
        term.write_str(&self.render())
            .context("Failed to write to terminal")?;
        term.write_str("\n› ").context("Failed to write to terminal")?;
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Some(mut sub) = self.subscription.take() {
            sub.cancel();
        }
        if let Some(task) = self.sign_in_task.take() {
            task.abort();
        }
    }
}

async fn next_snapshot(subscription: &mut Option<Subscription>) -> Option<Snapshot> {
    match subscription {
        Some(sub) => sub.next().await,
        None => std::future::pending().await,
    }
}

/// Resolve the reference to a task id in the current snapshot.
fn resolve(board: &BoardController, reference: &str) -> Result<String, BoardError> {
    Ok(board.model.resolve(reference)?.id.clone())
}

/// Apply one board action. Returns an info notice to show, if any.
async fn apply_board_action(
    board: &mut BoardController,
    action: UserAction,
) -> Result<Option<Notice>, BoardError> {
    match action {
        UserAction::Add(text) => {
            board.model.form.text = text;
            board.submit().await?;
        }
        UserAction::Save(text) => {
            if let Some(text) = text {
                board.model.form.text = text;
            }
            board.submit().await?;
        }
        UserAction::Edit(reference) => {
            let id = resolve(board, &reference)?;
            board.model.click_task(&id)?;
        }
        UserAction::Cancel => board.model.cancel_edit(),
        UserAction::SelectCategory(category) => board.model.form.category = category,
        UserAction::Check(reference) => {
            let id = resolve(board, &reference)?;
            board.set_completed(&id, true).await?;
        }
        UserAction::Uncheck(reference) => {
            let id = resolve(board, &reference)?;
            board.set_completed(&id, false).await?;
        }
        UserAction::Drag(reference) => {
            let id = resolve(board, &reference)?;
            board.drag_start(&id)?;
        }
        UserAction::Over(target) => board.drag_over(Some(&target)),
        UserAction::Drop(target) => {
            board.drag_end(target.as_deref()).await?;
        }
        UserAction::Abort => board.drag_cancel(),
        UserAction::Move(reference, category) => {
            let id = resolve(board, &reference)?;
            board.drop_on(&id, category.as_str()).await?;
        }
        UserAction::Clear => {
            let removed = board.clear_completed().await?;
            return Ok(Some(Notice::Info(format!("Rensade {} uppgifter", removed))));
        }
        UserAction::ToggleSidebar => board.model.toggle_completed_panel(),
        UserAction::Login | UserAction::Logout | UserAction::Help | UserAction::Quit => {}
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{LocalProvider, SessionStore};
    use crate::store::SqliteTaskStore;
    use console::strip_ansi_codes;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        app: App,
        auth: Arc<AuthSession>,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let auth = Arc::new(AuthSession::new(
            Arc::new(LocalProvider::new("ada", Some("Ada".into()))),
            SessionStore::new(dir.path().join("session.json")),
        ));
        let store: Arc<dyn TaskStore> = Arc::new(SqliteTaskStore::in_memory().unwrap());
        let app = App::new(auth.clone(), store);
        Harness { _dir: dir, app, auth }
    }

    fn screen(app: &App) -> String {
        strip_ansi_codes(&app.render()).to_string()
    }

    async fn pump_snapshot(app: &mut App) {
        let snapshot = tokio::time::timeout(Duration::from_secs(5), next_snapshot(&mut app.subscription))
            .await
            .expect("snapshot within timeout")
            .expect("subscription open");
        app.handle(AppEvent::Snapshot(snapshot)).await;
    }

    async fn input(app: &mut App, line: &str) -> Flow {
        app.handle(AppEvent::Input(line.to_string())).await
    }

    async fn sign_in(h: &mut Harness) {
        h.auth.sign_in().await.unwrap();
        h.app.handle(AppEvent::Auth(h.auth.state())).await;
        pump_snapshot(&mut h.app).await;
    }

    #[tokio::test]
    async fn test_screens_follow_auth_state() {
        let mut h = harness();
        assert!(screen(&h.app).contains("Laddar..."));

        h.auth.restore().unwrap();
        h.app.handle(AppEvent::Auth(h.auth.state())).await;
        assert!(screen(&h.app).contains("Logga in"));

        sign_in(&mut h).await;
        let out = screen(&h.app);
        assert!(out.contains("Att göra"));
        assert!(out.contains("Ada"));
    }

    #[tokio::test]
    async fn test_typed_commands_drive_the_board() {
        let mut h = harness();
        sign_in(&mut h).await;

        input(&mut h.app, "add Buy milk").await;
        pump_snapshot(&mut h.app).await;
        assert!(screen(&h.app).contains("Buy milk"));

        input(&mut h.app, "check 1").await;
        pump_snapshot(&mut h.app).await;
        assert!(screen(&h.app).contains("Klarmarkerade (1)"));

        input(&mut h.app, "uncheck 1").await;
        pump_snapshot(&mut h.app).await;
        input(&mut h.app, "move 1 3").await;
        pump_snapshot(&mut h.app).await;
        let board = h.app.board().unwrap();
        assert_eq!(board.model.tasks()[0].category, "bratttom_inte_viktigt");
    }

    #[tokio::test]
    async fn test_drag_drop_via_commands() {
        let mut h = harness();
        sign_in(&mut h).await;
        input(&mut h.app, "add Buy milk").await;
        pump_snapshot(&mut h.app).await;

        input(&mut h.app, "drag 1").await;
        input(&mut h.app, "over 2").await;
        assert!(h.app.board().unwrap().model.drag.is_active());
        input(&mut h.app, "drop").await;
        pump_snapshot(&mut h.app).await;
        let board = h.app.board().unwrap();
        assert!(!board.model.drag.is_active());
        assert_eq!(board.model.tasks()[0].category, "viktigt_inte_bratttom");
    }

    #[tokio::test]
    async fn test_bad_input_shows_notice() {
        let mut h = harness();
        sign_in(&mut h).await;
        input(&mut h.app, "frobnicate").await;
        assert!(screen(&h.app).contains("Unknown command"));

        input(&mut h.app, "check zz").await;
        assert!(screen(&h.app).contains("No task matches 'zz'"));

        // The next input clears it.
        input(&mut h.app, "sidebar").await;
        assert!(!screen(&h.app).contains("No task matches"));
    }

    #[tokio::test]
    async fn test_logout_tears_down_subscription() {
        let mut h = harness();
        sign_in(&mut h).await;
        assert!(h.app.subscription.is_some());

        input(&mut h.app, "logout").await;
        h.app.handle(AppEvent::Auth(h.auth.state())).await;
        assert!(h.app.subscription.is_none());
        assert!(h.app.board().is_none());
        assert!(screen(&h.app).contains("Logga in"));
    }

    #[tokio::test]
    async fn test_sign_in_failure_is_shown_on_login_screen() {
        let mut h = harness();
        h.auth.restore().unwrap();
        h.app.handle(AppEvent::Auth(h.auth.state())).await;
        h.app
            .handle(AppEvent::SignInFinished(Err(AuthError::Denied("popup closed".into()))))
            .await;
        assert!(screen(&h.app).contains("popup closed"));
    }

    #[tokio::test]
    async fn test_board_actions_need_a_session() {
        let mut h = harness();
        h.auth.restore().unwrap();
        h.app.handle(AppEvent::Auth(h.auth.state())).await;
        input(&mut h.app, "add Buy milk").await;
        assert!(screen(&h.app).contains("Not signed in"));
    }

    #[tokio::test]
    async fn test_help_and_quit() {
        let mut h = harness();
        sign_in(&mut h).await;
        input(&mut h.app, "help").await;
        assert!(screen(&h.app).contains("drag <ref>"));
        assert_eq!(input(&mut h.app, "quit").await, Flow::Quit);
    }
}
