// The share session: a small state machine driven by the UI loop.
//
// The loop calls `update` on every tick and `render` to draw. Network work
// (token polling, the gist upload) runs on a background thread that owns no
// session state and reports back with exactly one `Completion` on the
// session's channel. Only `update` mutates the session, so nothing here is
// locked.
//
//   Initial ──(no diff)──────────────────────────────▶ Done
//      │ ──(no token)──▶ AwaitingAuthorization ──err──▶ Done
//      │                        │ ok
//      │ ◀──────────────────────┘
//      └──(token)──▶ Uploading ──ok/err──────────────▶ Done

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::api::device::{Authorizer, DeviceCode};
use crate::api::gist::{NewGist, Uploader};
use crate::api::AccessToken;
use crate::clipboard::Clipboard;
use crate::error::{AuthError, StartupError, UploadError};
use crate::git;
use crate::store::CredentialStore;

pub const NO_DIFF_MESSAGE: &str = "No diff found to share";

/// Dot spinner, one frame per tick.
pub const SPINNER_FRAMES: &[&str] = &["⣾ ", "⣽ ", "⣻ ", "⢿ ", "⡿ ", "⣟ ", "⣯ ", "⣷ "];

/// Collaborators the session talks to.
pub struct Services {
    pub authorizer: Arc<dyn Authorizer>,
    pub uploader: Arc<dyn Uploader>,
    pub store: Arc<dyn CredentialStore>,
    pub clipboard: Box<dyn Clipboard>,
}

/// The one message a background task sends before it exits.
#[derive(Debug)]
pub enum Completion {
    Authorization(Result<AccessToken, AuthError>),
    Upload(Result<String, UploadError>),
}

/// How a session ended. The text is what gets printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NothingToShare(String),
    Shared(String),
    Failed(String),
}

impl Outcome {
    pub fn text(&self) -> &str {
        match self {
            Outcome::NothingToShare(text) | Outcome::Shared(text) | Outcome::Failed(text) => text,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_failure() {
            1
        } else {
            0
        }
    }
}

#[derive(Debug)]
pub enum State {
    Initial,
    AwaitingAuthorization(DeviceCode),
    Uploading,
    Done(Outcome),
}

/// `State` without its payload, for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Initial,
    AwaitingAuthorization,
    Uploading,
    Done,
}

impl State {
    pub fn kind(&self) -> StateKind {
        match self {
            State::Initial => StateKind::Initial,
            State::AwaitingAuthorization(_) => StateKind::AwaitingAuthorization,
            State::Uploading => StateKind::Uploading,
            State::Done(_) => StateKind::Done,
        }
    }
}

/// What the driver feeds into `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Periodic timer tick; advances the spinner.
    Tick,
    /// Immediate re-evaluation requested by `Control::Resume`.
    Resume,
}

/// What the driver should do after `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    /// Call `update(Event::Resume)` again right away.
    Resume,
    /// The session has an outcome; stop the loop.
    Terminal,
}

enum Pending {
    Received(Completion),
    Waiting,
    Lost,
}

pub struct Session {
    diff: Vec<u8>,
    state: State,
    credential: Option<AccessToken>,
    services: Services,
    events_tx: Sender<Completion>,
    events_rx: Receiver<Completion>,
    in_flight: Option<JoinHandle<()>>,
    spawned: usize,
    frame: usize,
}

impl Session {
    /// Capture the working tree diff, load the cached token and start in
    /// `Initial`.
    pub fn construct(services: Services) -> Result<Self, StartupError> {
        let diff = git::working_tree_diff()?;
        let credential = services.store.load()?;
        Ok(Self::new(diff, credential, services))
    }

    pub fn new(diff: Vec<u8>, credential: Option<AccessToken>, services: Services) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Session {
            diff,
            state: State::Initial,
            credential,
            services,
            events_tx,
            events_rx,
            in_flight: None,
            spawned: 0,
            frame: 0,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_kind(&self) -> StateKind {
        self.state.kind()
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        match &self.state {
            State::Done(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn credential(&self) -> Option<&AccessToken> {
        self.credential.as_ref()
    }

    /// Number of background tasks started so far.
    pub fn spawned_tasks(&self) -> usize {
        self.spawned
    }

    pub fn has_task_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Advance the session by one step. Never blocks on background work.
    pub fn update(&mut self, event: Event) -> Control {
        match self.state.kind() {
            StateKind::Initial => self.start(),
            StateKind::AwaitingAuthorization => match self.take_completion() {
                Pending::Received(Completion::Authorization(result)) => self.on_authorized(result),
                Pending::Received(other) => self.unexpected(other),
                Pending::Lost => self.fail(
                    "error while retrieving token: authorization task exited unexpectedly".into(),
                ),
                Pending::Waiting => self.animate(event),
            },
            StateKind::Uploading => match self.take_completion() {
                Pending::Received(Completion::Upload(result)) => self.on_uploaded(result),
                Pending::Received(other) => self.unexpected(other),
                Pending::Lost => self.fail(
                    "error while uploading diff to gist: upload task exited unexpectedly".into(),
                ),
                Pending::Waiting => self.animate(event),
            },
            StateKind::Done => Control::Terminal,
        }
    }

    /// Text for the current state. Calling it twice without an `update` in
    /// between returns the same string.
    pub fn render(&self) -> String {
        let spinner = SPINNER_FRAMES[self.frame];
        match &self.state {
            State::Initial => format!("{}Preparing diff", spinner),
            State::AwaitingAuthorization(code) => format!(
                "{}We request to grant us the gist access to store your git diff\n\
                 please open the given link: {} and enter the code {}",
                spinner, code.verification_uri, code.user_code
            ),
            State::Uploading => format!("{}Uploading diff to gist", spinner),
            State::Done(outcome) => outcome.text().to_string(),
        }
    }

    fn start(&mut self) -> Control {
        if self.diff.is_empty() {
            tracing::info!("working tree is clean, nothing to share");
            return self.finish(Outcome::NothingToShare(NO_DIFF_MESSAGE.to_string()));
        }
        match self.credential.clone() {
            None => self.request_access(),
            Some(token) => self.upload(token),
        }
    }

    fn request_access(&mut self) -> Control {
        let code = match self.services.authorizer.request_code() {
            Ok(code) => code,
            Err(e) => return self.fail(e.to_string()),
        };

        let authorizer = Arc::clone(&self.services.authorizer);
        let store = Arc::clone(&self.services.store);
        let tx = self.events_tx.clone();
        let poll_code = code.clone();
        self.spawn("authorization", move || {
            let result = authorizer.poll_for_token(&poll_code).and_then(|token| {
                store.save(&token).map_err(AuthError::Store)?;
                Ok(token)
            });
            let _ = tx.send(Completion::Authorization(result));
        });

        self.transition(State::AwaitingAuthorization(code));
        Control::Continue
    }

    fn upload(&mut self, token: AccessToken) -> Control {
        let uploader = Arc::clone(&self.services.uploader);
        let gist = NewGist::for_diff(&self.diff);
        let tx = self.events_tx.clone();
        self.spawn("upload", move || {
            let result = uploader.create_gist(&token, &gist);
            let _ = tx.send(Completion::Upload(result));
        });

        self.transition(State::Uploading);
        Control::Continue
    }

    fn on_authorized(&mut self, result: Result<AccessToken, AuthError>) -> Control {
        match result {
            Ok(token) => {
                self.credential = Some(token);
                // Back to the start: with a token in hand it now uploads.
                self.transition(State::Initial);
                Control::Resume
            }
            Err(AuthError::Store(e)) => self.fail(format!("error while storing token: {}", e)),
            Err(e) => self.fail(format!("error while retrieving token: {}", e)),
        }
    }

    fn on_uploaded(&mut self, result: Result<String, UploadError>) -> Control {
        let raw_url = match result {
            Ok(url) => url,
            Err(e) => return self.fail(format!("error while uploading diff to gist: {}", e)),
        };

        let command = apply_command(&raw_url);
        if let Err(e) = self.services.clipboard.write_text(&command) {
            tracing::debug!(error = %e, "could not copy command to clipboard");
        }
        self.finish(Outcome::Shared(success_message(&command)))
    }

    fn unexpected(&mut self, completion: Completion) -> Control {
        tracing::error!(?completion, state = ?self.state.kind(), "completion does not match state");
        self.fail("internal error: unexpected background result".into())
    }

    fn animate(&mut self, event: Event) -> Control {
        if event == Event::Tick {
            self.frame = (self.frame + 1) % SPINNER_FRAMES.len();
        }
        Control::Continue
    }

    fn take_completion(&mut self) -> Pending {
        // Checked before reading the channel so a message sent just before
        // the thread exited is still picked up.
        let finished = self.in_flight.as_ref().map_or(true, |h| h.is_finished());
        match self.events_rx.try_recv() {
            Ok(completion) => {
                self.in_flight = None;
                Pending::Received(completion)
            }
            Err(_) if finished => {
                self.in_flight = None;
                Pending::Lost
            }
            Err(_) => Pending::Waiting,
        }
    }

    fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        debug_assert!(self.in_flight.is_none(), "a background task is already running");
        tracing::debug!(task = name, "spawning background task");
        self.in_flight = Some(thread::spawn(task));
        self.spawned += 1;
    }

    fn transition(&mut self, next: State) {
        tracing::debug!(from = ?self.state.kind(), to = ?next.kind(), "state transition");
        self.state = next;
    }

    fn fail(&mut self, message: String) -> Control {
        tracing::warn!(%message, "session failed");
        self.finish(Outcome::Failed(message))
    }

    fn finish(&mut self, outcome: Outcome) -> Control {
        self.transition(State::Done(outcome));
        Control::Terminal
    }
}

/// Shell command that fetches the raw diff and applies it.
pub fn apply_command(raw_url: &str) -> String {
    format!("wget -q -O - {} | git apply -v", raw_url)
}

fn success_message(command: &str) -> String {
    format!(
        "Diff has been uploaded successfully. Now you can use the following command to apply diff\n\
         {}\n\n\
         Commands are copied to your clipboard so you can just paste it easily",
        command
    )
}
