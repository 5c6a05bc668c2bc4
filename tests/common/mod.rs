//! Fake collaborators for driving a `Session` without network or disk.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use diffshare::api::device::{Authorizer, DeviceCode};
use diffshare::api::gist::{NewGist, Uploader};
use diffshare::api::{AccessToken, ApiError};
use diffshare::clipboard::Clipboard;
use diffshare::error::{AuthError, StoreError, UploadError};
use diffshare::session::{Control, Event, Services, Session, StateKind};
use diffshare::store::CredentialStore;

/// Tracks how many background calls run at the same time.
#[derive(Default)]
pub struct Activity {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl Activity {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

pub fn device_code() -> DeviceCode {
    DeviceCode {
        device_code: "dev-123".into(),
        user_code: "ABCD-1234".into(),
        verification_uri: "https://github.com/login/device".into(),
        expires_in: 900,
        interval: 5,
    }
}

#[derive(Clone, Copy)]
pub enum PollBehavior {
    Grant,
    Deny,
    Expire,
    /// The poll thread dies without reporting.
    Panic,
}

pub struct FakeAuthorizer {
    pub fail_code_request: bool,
    pub behavior: PollBehavior,
    pub polls: AtomicUsize,
    gate: Option<Mutex<Receiver<()>>>,
    activity: Arc<Activity>,
}

impl FakeAuthorizer {
    pub fn new(behavior: PollBehavior, activity: Arc<Activity>) -> Self {
        FakeAuthorizer {
            fail_code_request: false,
            behavior,
            polls: AtomicUsize::new(0),
            gate: None,
            activity,
        }
    }

    /// Polling blocks until the returned sender fires.
    pub fn gated(behavior: PollBehavior, activity: Arc<Activity>) -> (Self, Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let mut fake = Self::new(behavior, activity);
        fake.gate = Some(Mutex::new(rx));
        (fake, tx)
    }
}

impl Authorizer for FakeAuthorizer {
    fn request_code(&self) -> Result<DeviceCode, AuthError> {
        if self.fail_code_request {
            return Err(AuthError::CodeRequest(ApiError::Protocol(
                "service unavailable".into(),
            )));
        }
        Ok(device_code())
    }

    fn poll_for_token(&self, _code: &DeviceCode) -> Result<AccessToken, AuthError> {
        self.activity.enter();
        self.polls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _ = gate.lock().unwrap().recv();
        }
        let result = match self.behavior {
            PollBehavior::Grant => Ok(AccessToken::new("gho_fresh")),
            PollBehavior::Deny => Err(AuthError::Denied),
            PollBehavior::Expire => Err(AuthError::Expired),
            PollBehavior::Panic => panic!("authorizer crashed"),
        };
        self.activity.exit();
        result
    }
}

pub struct FakeUploader {
    result: Result<String, String>,
    panic: bool,
    pub calls: Mutex<Vec<(AccessToken, NewGist)>>,
    activity: Arc<Activity>,
}

impl FakeUploader {
    pub fn ok(raw_url: &str, activity: Arc<Activity>) -> Self {
        FakeUploader {
            result: Ok(raw_url.to_string()),
            panic: false,
            calls: Mutex::new(Vec::new()),
            activity,
        }
    }

    pub fn failing(message: &str, activity: Arc<Activity>) -> Self {
        FakeUploader {
            result: Err(message.to_string()),
            panic: false,
            calls: Mutex::new(Vec::new()),
            activity,
        }
    }

    /// `create_gist` panics instead of returning.
    pub fn panicking(activity: Arc<Activity>) -> Self {
        FakeUploader {
            result: Err("unreachable".to_string()),
            panic: true,
            calls: Mutex::new(Vec::new()),
            activity,
        }
    }
}

impl Uploader for FakeUploader {
    fn create_gist(&self, token: &AccessToken, gist: &NewGist) -> Result<String, UploadError> {
        self.activity.enter();
        self.calls.lock().unwrap().push((token.clone(), gist.clone()));
        if self.panic {
            panic!("uploader crashed");
        }
        let result = match &self.result {
            Ok(url) => Ok(url.clone()),
            Err(msg) => Err(UploadError::Api(ApiError::Protocol(msg.clone()))),
        };
        self.activity.exit();
        result
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub token: Mutex<Option<AccessToken>>,
    pub fail_save: bool,
    pub saves: AtomicUsize,
}

impl MemoryStore {
    pub fn failing() -> Self {
        MemoryStore {
            fail_save: true,
            ..Default::default()
        }
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Option<AccessToken>, StoreError> {
        Ok(self.token.lock().unwrap().clone())
    }

    fn save(&self, token: &AccessToken) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_save {
            return Err(StoreError::Io {
                path: "/nonexistent/token.json".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        *self.token.lock().unwrap() = Some(token.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingClipboard {
    pub writes: Arc<Mutex<Vec<String>>>,
    pub fail: bool,
}

impl Clipboard for RecordingClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), String> {
        if self.fail {
            return Err("no display".into());
        }
        self.writes.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Everything a test needs to build a session and inspect it afterwards.
pub struct Harness {
    pub authorizer: Arc<FakeAuthorizer>,
    pub uploader: Arc<FakeUploader>,
    pub store: Arc<MemoryStore>,
    pub clipboard: RecordingClipboard,
    pub activity: Arc<Activity>,
}

impl Harness {
    pub fn new(authorizer: FakeAuthorizer, uploader: FakeUploader, store: MemoryStore, activity: Arc<Activity>) -> Self {
        Harness {
            authorizer: Arc::new(authorizer),
            uploader: Arc::new(uploader),
            store: Arc::new(store),
            clipboard: RecordingClipboard::default(),
            activity,
        }
    }

    /// Granting authorizer, uploader returning `raw_url`, empty store.
    pub fn happy(raw_url: &str) -> Self {
        let activity = Arc::new(Activity::default());
        Self::new(
            FakeAuthorizer::new(PollBehavior::Grant, activity.clone()),
            FakeUploader::ok(raw_url, activity.clone()),
            MemoryStore::default(),
            activity,
        )
    }

    pub fn services(&self) -> Services {
        Services {
            authorizer: self.authorizer.clone(),
            uploader: self.uploader.clone(),
            store: self.store.clone(),
            clipboard: Box::new(self.clipboard.clone()),
        }
    }

    pub fn session(&self, diff: &[u8], credential: Option<AccessToken>) -> Session {
        Session::new(diff.to_vec(), credential, self.services())
    }

    pub fn clipboard_writes(&self) -> Vec<String> {
        self.clipboard.writes.lock().unwrap().clone()
    }
}

/// Drive `session` the way the UI loop does and return the distinct states
/// it passed through, in order.
pub fn drive(session: &mut Session) -> Vec<StateKind> {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut seen = vec![session.state_kind()];
    let mut event = Event::Tick;
    loop {
        let control = session.update(event);
        let kind = session.state_kind();
        if seen.last() != Some(&kind) {
            seen.push(kind);
        }
        match control {
            Control::Terminal => return seen,
            Control::Resume => event = Event::Resume,
            Control::Continue => {
                event = Event::Tick;
                thread::sleep(Duration::from_millis(2));
            }
        }
        assert!(Instant::now() < deadline, "session did not reach a terminal state");
    }
}
