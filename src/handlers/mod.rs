pub mod admin;
pub mod elections;
pub mod results;
pub mod vote;

use std::sync::Arc;

use log::info;

use crate::api::{ElectionApi, IdentityApi};
use crate::booth::Booth;
use crate::commands::{Command, HELP};
use crate::error::{Error, Result};
use crate::models::Credentials;
use crate::session::Session;
use results::Publisher;
use vote::BoothAction;

/// Receives a status line before a slow request goes out.
pub type Progress<'a> = &'a mut dyn FnMut(&str);

/// A missing election reads as unavailable rather than as a raw 404.
pub(crate) fn unavailable(err: Error) -> Error {
    match err {
        Error::NotFound(_) => Error::NotFound("This election is unavailable.".to_string()),
        other => other,
    }
}

/// Text printed for a failed command, with a retry prompt when running the
/// same line again could succeed.
pub fn error_reply(err: &Error, line: &str) -> String {
    let message = err.user_message();
    if !err.is_retryable() {
        return message;
    }
    let line = line.trim();
    // Never echo a password back.
    let command = match line.split_whitespace().next() {
        Some(word) if word.eq_ignore_ascii_case("login") => "login <username> <password>",
        _ => line,
    };
    format!("{message}\nRun `{command}` again to retry.")
}

/// What the input loop should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

/// Everything one terminal user holds: identity, the open booth and any
/// publish in flight.
pub struct App<A> {
    api: Arc<A>,
    session: Session,
    booth: Booth,
    publisher: Publisher,
    progress: Box<dyn FnMut(&str)>,
}

impl<A> App<A>
where
    A: ElectionApi + IdentityApi,
{
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            session: Session::new(),
            booth: Booth::new(),
            publisher: Publisher::new(),
            progress: Box::new(|_| {}),
        }
    }

    /// Where busy indicators go while a request is outstanding.
    pub fn with_progress(mut self, progress: impl FnMut(&str) + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    pub async fn initialize(&mut self) {
        self.session.initialize(self.api.as_ref()).await;
    }

    pub fn prompt(&self) -> String {
        let who = self
            .session
            .user()
            .map(|u| u.username.as_str())
            .unwrap_or("guest");
        match self.booth.flow().election() {
            Some(election) => format!("{who}@{}> ", election.id),
            None => format!("{who}> "),
        }
    }

    pub async fn handle(&mut self, command: Command) -> Result<Reply> {
        let api = self.api.as_ref();
        let text = match command {
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Reply::Quit),
            Command::Login { username, password } => {
                // A different voter must not inherit the open ballot.
                self.booth = Booth::new();
                if self.session.is_authenticated() {
                    self.session.logout(api);
                }
                let credentials = Credentials { username, password };
                let user = self.session.login(api, &credentials).await?;
                format!("Signed in as {} ({}).", user.full_name(), user.username)
            }
            Command::Logout => {
                self.booth = Booth::new();
                self.session.logout(api);
                "Signed out.".to_string()
            }
            Command::WhoAmI => match self.session.user() {
                Some(user) => format!(
                    "{} ({}){}",
                    user.full_name(),
                    user.username,
                    if self.session.is_admin() { ", administrator" } else { "" }
                ),
                None => "Not signed in.".to_string(),
            },
            Command::Elections => elections::list_elections(api).await?,
            Command::Vote(id) => {
                let progress = &mut *self.progress;
                vote::enter_booth(api, &self.session, &mut self.booth, id, progress).await?
            }
            Command::Results(id) => results::show_results(api, &self.session, id).await?,
            Command::Publish(id) => {
                let progress = &mut *self.progress;
                results::publish(api, &self.session, &mut self.publisher, id, progress).await?
            }
            Command::Stats(id) => {
                admin::show_stats(api, &self.session, id, &mut *self.progress).await?
            }
            Command::Activate(id) => admin::set_active(api, &self.session, id, true).await?,
            Command::Deactivate(id) => admin::set_active(api, &self.session, id, false).await?,
            Command::Choose(n) => self.booth_action(BoothAction::Choose(n)).await?,
            Command::Next => self.booth_action(BoothAction::Next).await?,
            Command::Back => self.booth_action(BoothAction::Back).await?,
            Command::Skip => self.booth_action(BoothAction::Skip).await?,
            Command::Change(n) => self.booth_action(BoothAction::Change(n)).await?,
            Command::Submit => self.booth_action(BoothAction::Submit).await?,
            Command::Cancel => self.booth_action(BoothAction::Cancel).await?,
        };
        Ok(Reply::Text(text))
    }

    async fn booth_action(&mut self, action: BoothAction) -> Result<String> {
        if action == BoothAction::Submit {
            info!("Submitting ballot");
        }
        vote::booth_action(
            self.api.as_ref(),
            &mut self.booth,
            action,
            &mut *self.progress,
        )
        .await
    }
}
