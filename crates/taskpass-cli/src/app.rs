//! Application state management for the taskpass terminal front-end.
//!
//! This module contains the `App` struct that owns the session context, the
//! task store and the notification hub, parses shell commands and prints the
//! three views (Dashboard, Alerts, Tasks).

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use taskpass_core::api::ApiClient;
use taskpass_core::auth::CredentialStore;
use taskpass_core::config::Config;
use taskpass_core::context::{ProfileView, SessionContext, SessionState, SignOutOutcome};
use taskpass_core::notifications::{
    Notification, NotificationHub, PushClient, PushMessage, ReceivedNotification,
    ScheduledNotification, Subscription,
};
use taskpass_core::tasks::TaskStore;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 8;

/// Maximum length for username input.
const MAX_USERNAME_LENGTH: usize = 50;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Delay for `notify` when no seconds are given
const DEFAULT_NOTIFY_DELAY_SECS: u64 = 5;

const USERNAME_ENV: &str = "TASKPASS_USERNAME";
const PASSWORD_ENV: &str = "TASKPASS_PASSWORD";

// ============================================================================
// UI State Types
// ============================================================================

/// Main navigation tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Alerts,
    Tasks,
}

impl Tab {
    /// Get the display title for this tab.
    pub fn title(&self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Alerts => "Alerts",
            Tab::Tasks => "Tasks",
        }
    }

    /// Get the next tab (wrapping around)
    pub fn next(&self) -> Self {
        match self {
            Tab::Dashboard => Tab::Alerts,
            Tab::Alerts => Tab::Tasks,
            Tab::Tasks => Tab::Dashboard,
        }
    }

    /// Get the previous tab (wrapping around)
    pub fn prev(&self) -> Self {
        match self {
            Tab::Dashboard => Tab::Tasks,
            Tab::Alerts => Tab::Dashboard,
            Tab::Tasks => Tab::Alerts,
        }
    }

    const ALL: [Tab; 3] = [Tab::Dashboard, Tab::Alerts, Tab::Tasks];
}

/// A parsed shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login,
    Logout,
    Profile,
    Switch(Tab),
    NextTab,
    PrevTab,
    Add(String),
    Edit(i64, String),
    Remove(i64),
    Notify(u64),
    Push(String),
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        match name.to_lowercase().as_str() {
            "login" => Ok(Command::Login),
            "logout" => Ok(Command::Logout),
            "profile" => Ok(Command::Profile),
            "dashboard" => Ok(Command::Switch(Tab::Dashboard)),
            "alerts" => Ok(Command::Switch(Tab::Alerts)),
            "tasks" => Ok(Command::Switch(Tab::Tasks)),
            "next" => Ok(Command::NextTab),
            "prev" => Ok(Command::PrevTab),
            "add" if rest.is_empty() => Err("Usage: add <text>".to_string()),
            "add" => Ok(Command::Add(rest.to_string())),
            "edit" => {
                let (id, text) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| "Usage: edit <id> <text>".to_string())?;
                Ok(Command::Edit(parse_id(id)?, text.trim().to_string()))
            }
            "rm" | "delete" => Ok(Command::Remove(parse_id(rest)?)),
            "notify" if rest.is_empty() => Ok(Command::Notify(DEFAULT_NOTIFY_DELAY_SECS)),
            "notify" => rest
                .parse()
                .map(Command::Notify)
                .map_err(|_| format!("Not a number of seconds: {}", rest)),
            "push" if rest.is_empty() => Err("Usage: push <token>".to_string()),
            "push" => Ok(Command::Push(rest.to_string())),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            "" => Err(String::new()),
            other => Err(format!("Unknown command: {} (type `help`)", other)),
        }
    }
}

fn parse_id(s: &str) -> Result<i64, String> {
    s.trim()
        .parse()
        .map_err(|_| format!("Not a task id: {}", s.trim()))
}

/// A change to the task list
enum TaskEdit {
    Add(String),
    Update(i64, String),
    Delete(i64),
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent back from spawned tasks.
///
/// Each profile request carries the request number it was started with;
/// results for superseded requests are dropped.
#[derive(Debug)]
enum BackgroundResult {
    Profile { request: u64, view: ProfileView },
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    pub config: Config,
    session: Arc<SessionContext>,
    session_rx: watch::Receiver<SessionState>,
    tasks: Option<TaskStore>,
    hub: NotificationHub,
    push: PushClient,

    pub current_tab: Tab,
    /// `None` while a profile request is outstanding
    pub profile: Option<ProfileView>,
    profile_request: u64,

    last_notification: Arc<Mutex<Option<ReceivedNotification>>>,
    _notification_listener: Subscription,
    scheduled: Vec<ScheduledNotification>,

    background_rx: mpsc::Receiver<BackgroundResult>,
    background_tx: mpsc::Sender<BackgroundResult>,

    pub status_message: Option<String>,
    quitting: bool,
}

impl App {
    /// Create a new application instance.
    ///
    /// With `ephemeral` the session and tasks live in memory only.
    pub async fn new(config: Config, ephemeral: bool) -> Result<Self> {
        let credentials = if ephemeral {
            CredentialStore::in_memory()
        } else {
            CredentialStore::keyring()
        };

        let api = ApiClient::with_timeout(
            &config.base_url,
            credentials.clone(),
            config.request_timeout(),
        )
        .context("Failed to create API client")?;
        debug!(base_url = api.base_url(), "API client configured");

        let session = Arc::new(SessionContext::new(api, credentials));
        let session_rx = session.subscribe();

        let mut status_message = None;
        let tasks = match Self::open_tasks(&config, ephemeral).await {
            Ok(store) => Some(store),
            Err(e) => {
                let cause = format!("{:#}", e);
                error!(error = %cause, "Task database unavailable");
                status_message = Some("Task list unavailable, see log for details".to_string());
                None
            }
        };

        let hub = NotificationHub::new();
        let last_notification = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&last_notification);
        let listener = hub.subscribe(move |received: &ReceivedNotification| {
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(received.clone());
        });

        let push = PushClient::with_timeout(&config.push_url, config.request_timeout())
            .context("Failed to create push client")?;

        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        Ok(Self {
            config,
            session,
            session_rx,
            tasks,
            hub,
            push,

            current_tab: Tab::Dashboard,
            profile: None,
            profile_request: 0,

            last_notification,
            _notification_listener: listener,
            scheduled: Vec::new(),

            background_rx: rx,
            background_tx: tx,

            status_message,
            quitting: false,
        })
    }

    async fn open_tasks(config: &Config, ephemeral: bool) -> Result<TaskStore> {
        if ephemeral {
            return Ok(TaskStore::open_in_memory().await?);
        }
        let path = config.database_path()?;
        debug!(path = %path.display(), "Opening task database");
        Ok(TaskStore::open(path).await?)
    }

    // =========================================================================
    // Main Loop
    // =========================================================================

    pub async fn run(&mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        self.session.init();
        self.check_session_changes();
        self.render();

        while !self.quitting {
            self.check_background_tasks();
            self.check_session_changes();
            self.print_status();

            print!("{}> ", self.current_tab.title().to_lowercase());
            io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match Command::parse(&line) {
                Ok(command) => self.handle_command(command, &mut lines).await?,
                Err(message) if message.is_empty() => {}
                Err(message) => self.status_message = Some(message),
            }
        }

        info!("Shell closed");
        Ok(())
    }

    async fn handle_command(
        &mut self,
        command: Command,
        lines: &mut Lines<BufReader<Stdin>>,
    ) -> Result<()> {
        match command {
            Command::Login => self.login(lines).await?,
            Command::Logout => self.logout().await,
            Command::Profile => {
                self.current_tab = Tab::Dashboard;
                if self.session.state().is_authenticated() {
                    self.start_profile_fetch();
                } else {
                    self.status_message = Some("Sign in first with `login`".to_string());
                }
            }
            Command::Switch(tab) => self.current_tab = tab,
            Command::NextTab => self.current_tab = self.current_tab.next(),
            Command::PrevTab => self.current_tab = self.current_tab.prev(),
            Command::Add(text) => self.edit_tasks(TaskEdit::Add(text)).await,
            Command::Edit(id, text) => self.edit_tasks(TaskEdit::Update(id, text)).await,
            Command::Remove(id) => self.edit_tasks(TaskEdit::Delete(id)).await,
            Command::Notify(secs) => self.schedule_notification(secs),
            Command::Push(token) => self.send_push(&token).await,
            Command::Help => {
                print_help();
                return Ok(());
            }
            Command::Quit => {
                self.quitting = true;
                return Ok(());
            }
        }

        self.check_session_changes();
        self.render();
        Ok(())
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    async fn login(&mut self, lines: &mut Lines<BufReader<Stdin>>) -> Result<()> {
        if self.session.state().is_authenticated() {
            self.status_message = Some("Already signed in; `logout` first".to_string());
            return Ok(());
        }

        let username = match std::env::var(USERNAME_ENV).ok().filter(|u| !u.is_empty()) {
            Some(username) => username,
            None => self.prompt_username(lines).await?,
        };

        let password = match std::env::var(PASSWORD_ENV).ok().filter(|p| !p.is_empty()) {
            Some(password) => password,
            None => rpassword::prompt_password("Password: ")?,
        };

        if let Err(message) = validate_credentials(&username, &password) {
            self.status_message = Some(message.to_string());
            return Ok(());
        }

        println!("Signing in...");
        let result = self.session.sign_in(&username, &password).await;

        if result.success {
            self.config.last_username = Some(username.trim().to_string());
            if let Err(e) = self.config.save() {
                warn!(error = %e, "Failed to save config");
            }
            self.status_message = Some("Signed in".to_string());
            self.current_tab = Tab::Dashboard;
        } else {
            self.status_message = result.message;
        }
        Ok(())
    }

    async fn prompt_username(&self, lines: &mut Lines<BufReader<Stdin>>) -> Result<String> {
        match self.config.last_username {
            Some(ref last_user) => print!("Username [{}]: ", last_user),
            None => print!("Username: "),
        }
        io::stdout().flush()?;

        let input = lines.next_line().await?.unwrap_or_default();
        let input = input.trim();
        if input.is_empty() {
            Ok(self.config.last_username.clone().unwrap_or_default())
        } else {
            Ok(input.to_string())
        }
    }

    async fn logout(&mut self) {
        if !self.session.state().is_authenticated() {
            self.status_message = Some("Not signed in".to_string());
            return;
        }

        self.status_message = Some(match self.session.sign_out().await {
            SignOutOutcome::Confirmed => "Signed out".to_string(),
            SignOutOutcome::LocalOnly { reason } => {
                format!("Signed out on this device only (server said: {})", reason)
            }
        });
    }

    /// React to session transitions: fetch the profile on sign-in, drop it on sign-out
    fn check_session_changes(&mut self) {
        if !self.session_rx.has_changed().unwrap_or(false) {
            return;
        }

        let state = self.session_rx.borrow_and_update().clone();
        debug!(
            loading = state.is_loading(),
            authenticated = state.is_authenticated(),
            "Session state changed"
        );
        match state {
            SessionState::Authenticated(_) => self.start_profile_fetch(),
            SessionState::Unauthenticated | SessionState::Unknown => {
                self.profile_request += 1;
                self.profile = None;
            }
        }
    }

    // =========================================================================
    // Background Tasks
    // =========================================================================

    fn start_profile_fetch(&mut self) {
        self.profile_request += 1;
        self.profile = None;

        let request = self.profile_request;
        let session = Arc::clone(&self.session);
        let tx = self.background_tx.clone();
        tokio::spawn(async move {
            let view = session.fetch_profile().await;
            Self::send_result(&tx, BackgroundResult::Profile { request, view }).await;
        });
    }

    async fn send_result(tx: &mpsc::Sender<BackgroundResult>, result: BackgroundResult) {
        if tx.send(result).await.is_err() {
            debug!("Front-end closed, dropping background result");
        }
    }

    /// Apply results that arrived since the last prompt
    pub fn check_background_tasks(&mut self) {
        while let Ok(result) = self.background_rx.try_recv() {
            match result {
                BackgroundResult::Profile { request, view } => {
                    if request != self.profile_request {
                        debug!(
                            request,
                            current = self.profile_request,
                            "Ignoring stale profile result"
                        );
                        continue;
                    }
                    if view == ProfileView::Unavailable {
                        self.status_message = Some("Could not load your profile".to_string());
                    }
                    self.profile = Some(view);
                    if self.current_tab == Tab::Dashboard {
                        self.render();
                    }
                }
            }
        }
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    async fn edit_tasks(&mut self, edit: TaskEdit) {
        self.current_tab = Tab::Tasks;
        let Some(store) = self.tasks.as_mut() else {
            self.status_message = Some("Task list unavailable".to_string());
            return;
        };

        let (op, result) = match edit {
            TaskEdit::Add(text) => ("add", store.add_task(&text).await),
            TaskEdit::Update(id, text) => ("update", store.update_task(id, &text).await),
            TaskEdit::Delete(id) => ("delete", store.delete_task(id).await),
        };

        if let Err(e) = result {
            warn!(op, error = %e, "Task command failed");
            self.status_message = Some(format!("Could not {} task", op));
        }
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    fn schedule_notification(&mut self, secs: u64) {
        self.scheduled.retain(|scheduled| !scheduled.is_finished());

        let notification =
            Notification::new("New notification", "This message was sent from your app.")
                .with_data(serde_json::json!({ "extraData": "Extra data here" }));
        self.scheduled
            .push(self.hub.schedule(notification, Duration::from_secs(secs)));

        self.current_tab = Tab::Alerts;
        self.status_message = Some(format!("Notification scheduled in {}s", secs));
    }

    async fn send_push(&mut self, token: &str) {
        let notification =
            Notification::new("You have an alert!", "This is a test message from the system.")
                .with_data(serde_json::json!({ "someData": "Attached information" }));

        let message = PushMessage::new(token, &notification);
        self.status_message = Some(match self.push.send(&message).await {
            Ok(()) => "Push message sent".to_string(),
            Err(e) => format!("Push failed: {}", e),
        });
        self.current_tab = Tab::Alerts;
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    fn print_status(&mut self) {
        if let Some(message) = self.status_message.take() {
            println!("* {}", message);
        }
    }

    pub fn render(&self) {
        let tabs: Vec<String> = Tab::ALL
            .iter()
            .map(|tab| {
                if *tab == self.current_tab {
                    format!("[{}]", tab.title())
                } else {
                    format!(" {} ", tab.title())
                }
            })
            .collect();
        println!();
        println!("{}", tabs.join(" "));

        match self.current_tab {
            Tab::Dashboard => self.render_dashboard(),
            Tab::Alerts => self.render_alerts(),
            Tab::Tasks => self.render_tasks(),
        }
    }

    fn render_dashboard(&self) {
        match self.session.state() {
            SessionState::Unknown => println!("Loading..."),
            SessionState::Unauthenticated => println!("Not signed in. Type `login` to sign in."),
            SessionState::Authenticated(record) => match self.profile {
                None => println!(
                    "Signed in as {}. Loading profile...",
                    record.user.display_username()
                ),
                Some(ProfileView::Available(ref user)) => {
                    println!("User panel");
                    println!("  Full name: {}", user.full_name());
                    println!("  Username:  {}", user.display_username());
                    println!("  Email:     {}", user.email.as_deref().unwrap_or(""));
                }
                Some(ProfileView::Unavailable) => println!("Profile could not be shown."),
            },
        }
    }

    fn render_alerts(&self) {
        let pending = self
            .scheduled
            .iter()
            .filter(|scheduled| !scheduled.is_finished())
            .count();
        println!("Pending local notifications: {}", pending);

        let last = self
            .last_notification
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match last {
            Some(received) => {
                println!("Last message ({})", received.received_at.format("%H:%M:%S"));
                println!("  Title: {}", received.notification.title);
                println!("  Body:  {}", received.notification.body);
            }
            None => println!("No messages received yet."),
        }
    }

    fn render_tasks(&self) {
        let Some(ref store) = self.tasks else {
            println!("Task list unavailable.");
            return;
        };

        if store.tasks().is_empty() {
            println!("No tasks yet. Add one with `add <text>`.");
            return;
        }
        for task in store.tasks() {
            println!("  [{}] {}", task.id, task.text);
        }
    }
}

pub fn print_help() {
    println!("Commands:");
    println!("  login | logout | profile");
    println!("  dashboard | alerts | tasks | next | prev");
    println!("  add <text> | edit <id> <text> | rm <id>");
    println!("  notify [secs] | push <token>");
    println!("  help | quit");
}

// ============================================================================
// Input Validation
// ============================================================================

/// Check login form input before contacting the server
pub fn validate_credentials(username: &str, password: &str) -> Result<(), &'static str> {
    if username.trim().is_empty() || password.is_empty() {
        return Err("Username and password required");
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err("Username is too long");
    }
    if password.chars().count() > MAX_PASSWORD_LENGTH {
        return Err("Password is too long");
    }
    Ok(())
}
