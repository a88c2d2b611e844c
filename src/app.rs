//! Application state management for Coindeck.
//!
//! This module contains the core `App` struct that owns the session manager,
//! the device registrar, all UI state, and the channels that background
//! market refreshes report over.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::api::ApiClient;
use crate::auth::store::SERVICE_NAME;
use crate::auth::{CredentialStore, SessionEvent, SessionManager, SessionState};
use crate::config::Config;
use crate::models::{Cryptocurrency, MarketSortColumn, PricePoint, Timeframe, UserPreferences};
use crate::push::DeviceRegistrar;

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channels.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Maximum length for email input.
/// 64 chars covers the local part of an address plus a sane domain.
const MAX_EMAIL_LENGTH: usize = 64;

/// Maximum length for password input.
/// Long enough for generated passwords out of a manager.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum length for the display-name input.
const MAX_NAME_LENGTH: usize = 64;

/// Number of rows to scroll on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

/// Maximum concurrent price-history requests during a market refresh.
const MAX_CONCURRENT_REQUESTS: usize = 4;

/// Seconds between automatic market refreshes while the app is open.
const AUTO_REFRESH_SECS: i64 = 60;

// ============================================================================
// UI State Types
// ============================================================================

/// Main navigation tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Market,
    Account,
}

impl Tab {
    /// Get the display title for this tab.
    pub fn title(&self) -> &'static str {
        match self {
            Tab::Market => "Market",
            Tab::Account => "Account",
        }
    }

    /// Get the next tab (wrapping around)
    pub fn next(&self) -> Self {
        match self {
            Tab::Market => Tab::Account,
            Tab::Account => Tab::Market,
        }
    }

    /// Get the previous tab (wrapping around)
    pub fn prev(&self) -> Self {
        match self {
            Tab::Market => Tab::Account,
            Tab::Account => Tab::Market,
        }
    }
}

/// Current UI focus area (asset list or detail panel)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    Detail,
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    LoggingIn,
    EditingName,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoginFocus {
    Email,
    Password,
    Button,
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Result types from background refresh tasks.
///
/// These variants are sent through an MPSC channel from spawned refresh
/// tasks back to the main application loop.
enum RefreshResult {
    /// Full market price list fetched successfully
    Prices(Vec<Cryptocurrency>),
    /// Price history for a single asset (asset id, samples)
    History(String, Vec<PricePoint>),
    /// Detail record for a single asset, with the fields the list omits
    Detail(Cryptocurrency),
    /// Signal that a refresh pass has finished
    RefreshComplete,
    /// An error occurred during refresh
    Error(String),
}

// ============================================================================
// Main Application Struct
// ============================================================================

/// Main application state container
pub struct App {
    // Core services
    pub config: Config,
    pub store: Arc<CredentialStore>,
    pub api: ApiClient,
    pub session: SessionManager,
    pub registrar: DeviceRegistrar,

    // UI state
    pub state: AppState,
    pub current_tab: Tab,
    pub focus: Focus,

    // Login form state
    pub login_email: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,

    // Profile edit state
    pub name_input: String,

    // Market tab state
    pub assets: Vec<Cryptocurrency>,
    /// Price history per asset id, for the active timeframe only.
    pub histories: HashMap<String, Vec<PricePoint>>,
    /// Detail fetches already issued since the last full refresh.
    details_requested: HashSet<String>,
    pub market_selection: usize,
    pub sort_column: MarketSortColumn,
    pub sort_reversed: bool,
    pub timeframe: Timeframe,

    // Account tab state
    pub push_enabled: bool,

    // Event channels
    session_rx: mpsc::Receiver<SessionEvent>,
    push_rx: mpsc::Receiver<String>,
    refresh_rx: Option<mpsc::Receiver<RefreshResult>>,
    refresh_tx: mpsc::Sender<RefreshResult>,

    // Refresh bookkeeping
    refresh_in_flight: bool,
    pub last_refresh: Option<DateTime<Utc>>,

    /// Distinguishes a fresh sign-in from a profile refresh when an
    /// authenticated event arrives.
    was_authenticated: bool,

    // Status message
    pub status_message: Option<String>,
}

impl App {
    /// Create a new application instance
    pub fn new() -> Result<Self> {
        debug!("App::new() starting");
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let data_dir = Config::data_dir()?;
        debug!(?data_dir, "Data directory configured");
        let store = Arc::new(CredentialStore::new(SERVICE_NAME, &data_dir));

        let base_override = std::env::var("COINDECK_API_BASE")
            .ok()
            .or_else(|| config.api_base.clone());
        let api = match base_override {
            Some(base) => {
                debug!(base = %base, "Using API base override");
                ApiClient::with_base_url(Arc::clone(&store), &base)?
            }
            None => ApiClient::new(Arc::clone(&store))?,
        };

        let mut session = SessionManager::new(api.clone(), Arc::clone(&store));
        let session_rx = session.subscribe();
        let registrar = DeviceRegistrar::new(api.clone(), Arc::clone(&store));

        let (refresh_tx, refresh_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        // Push tokens arrive as discrete events. The terminal has no push
        // runtime, so the sources are the environment and the token kept
        // from an earlier run; whichever exists is queued until a session
        // is established.
        let (push_tx, push_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let push_token = std::env::var("COINDECK_PUSH_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| store.device_token());
        if let Some(token) = push_token {
            let _ = push_tx.try_send(token);
        }

        // Prefill the login form from env vars or config
        let login_email = std::env::var("COINDECK_EMAIL")
            .ok()
            .or_else(|| config.last_email.clone())
            .unwrap_or_default();
        let login_password = std::env::var("COINDECK_PASSWORD").unwrap_or_default();

        let push_enabled = store
            .preferences::<UserPreferences>()
            .unwrap_or_default()
            .notifications_enabled;

        Ok(Self {
            config,
            store,
            api,
            session,
            registrar,

            state: AppState::Normal,
            current_tab: Tab::Market,
            focus: Focus::List,

            login_email,
            login_password,
            login_focus: LoginFocus::Email,
            login_error: None,

            name_input: String::new(),

            assets: Vec::new(),
            histories: HashMap::new(),
            details_requested: HashSet::new(),
            market_selection: 0,
            sort_column: MarketSortColumn::default(),
            sort_reversed: false,
            timeframe: Timeframe::default(),

            push_enabled,

            session_rx,
            push_rx,
            refresh_rx: Some(refresh_rx),
            refresh_tx,

            refresh_in_flight: false,
            last_refresh: None,

            was_authenticated: false,

            status_message: None,
        })
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Start the login process (show login overlay)
    pub fn start_login(&mut self) {
        self.state = AppState::LoggingIn;
        self.login_focus = if self.login_email.is_empty() {
            LoginFocus::Email
        } else {
            LoginFocus::Password
        };
        self.login_error = None;
    }

    /// Attempt login with the credentials from the login form.
    ///
    /// Failures land in the session state and reach `login_error` through
    /// the session event channel.
    pub async fn attempt_login(&mut self) {
        let email = self.login_email.trim().to_string();
        let password = self.login_password.clone();

        if email.is_empty() || password.is_empty() {
            self.login_error = Some("Email and password required".to_string());
            return;
        }

        self.login_error = None;
        self.status_message = Some("Signing in...".to_string());

        if self.session.login(&email, &password).await {
            self.config.last_email = Some(email);
            if let Err(e) = self.config.save() {
                warn!(error = %e, "Failed to save config");
            }
            self.login_password.clear();
            self.state = AppState::Normal;
        }
    }

    /// End the session and bring the login overlay back.
    pub async fn logout(&mut self) {
        self.session.logout().await;
        self.status_message = Some("Signed out".to_string());
    }

    /// Ask the server to email a password reset link to the signed-in user.
    pub async fn reset_password(&mut self) {
        let email = match self.session.user() {
            Some(user) => user.email.clone(),
            None => return,
        };
        self.status_message = Some(match self.session.request_password_reset(&email).await {
            Ok(message) => message,
            Err(message) => format!("Error: {}", message),
        });
    }

    /// Open the display-name editor seeded with the current name.
    pub fn start_edit_name(&mut self) {
        if let Some(user) = self.session.user() {
            self.name_input = user.name.clone();
            self.state = AppState::EditingName;
        }
    }

    /// PUT the edited display name and adopt the server's copy of the
    /// profile. An empty or unchanged name is a no-op.
    pub async fn save_name(&mut self) {
        self.state = AppState::Normal;
        let name = self.name_input.trim().to_string();
        let unchanged = self
            .session
            .user()
            .map(|user| user.name == name)
            .unwrap_or(true);
        if name.is_empty() || unchanged {
            return;
        }

        let fields = serde_json::json!({ "name": name });
        self.status_message = Some(match self.session.update_profile(&fields).await {
            Ok(message) => message,
            Err(message) => format!("Error: {}", message),
        });
    }

    /// Flip push delivery for this device on the server, then persist the
    /// preference locally. No-op on the server side without a registered
    /// device id; the registrar logs that case.
    pub async fn toggle_push(&mut self) {
        let target = !self.push_enabled;
        if self.registrar.set_push_enabled(target).await {
            self.push_enabled = target;
            let preferences = UserPreferences {
                notifications_enabled: target,
            };
            if !self.store.set_preferences(&preferences) {
                warn!("Failed to persist notification preference");
            }
            self.status_message = Some(if target {
                "Push notifications enabled".to_string()
            } else {
                "Push notifications disabled".to_string()
            });
        } else {
            self.status_message = Some("Could not update notification settings".to_string());
        }
    }

    // =========================================================================
    // Background Market Refresh
    // =========================================================================

    /// Spawn a background task to refresh the market price list and the
    /// per-asset histories. Prices do not require a session, so this also
    /// runs behind the login overlay.
    pub fn refresh_market_background(&mut self) {
        if self.refresh_in_flight {
            debug!("Refresh already in flight, skipping");
            return;
        }

        info!("Starting background market refresh");
        self.refresh_in_flight = true;
        self.last_refresh = Some(Utc::now());

        let tx = self.refresh_tx.clone();
        let api = self.api.clone();
        let timeframe = self.timeframe;

        tokio::spawn(async move {
            Self::execute_market_refresh(tx, api, timeframe).await;
        });

        self.status_message = Some("Refreshing market data...".to_string());
    }

    /// True when the periodic refresh interval has elapsed.
    pub fn auto_refresh_due(&self) -> bool {
        match self.last_refresh {
            Some(at) => {
                Utc::now().signed_duration_since(at)
                    >= chrono::Duration::seconds(AUTO_REFRESH_SECS)
            }
            None => true,
        }
    }

    /// Seconds since the last refresh started, for the status bar.
    pub fn refresh_age_secs(&self) -> Option<i64> {
        self.last_refresh
            .map(|at| Utc::now().signed_duration_since(at).num_seconds())
    }

    /// Helper to send refresh results, logging any channel errors
    async fn send_result(tx: &mpsc::Sender<RefreshResult>, result: RefreshResult) {
        if let Err(e) = tx.send(result).await {
            error!(error = %e, "Failed to send refresh result - channel closed");
        }
    }

    /// Execute the background refresh task.
    ///
    /// Runs in a spawned Tokio task: fetches the full price list first, then
    /// the history for each listed asset with bounded concurrency, sending
    /// each piece back through the channel as it lands.
    async fn execute_market_refresh(
        tx: mpsc::Sender<RefreshResult>,
        api: ApiClient,
        timeframe: Timeframe,
    ) {
        match api.fetch_market_prices().await {
            Ok(assets) => {
                info!(count = assets.len(), "Market prices fetched");

                // Extract ids before sending to avoid cloning the asset list
                let ids: Vec<String> = assets.iter().map(|a| a.id.clone()).collect();

                Self::send_result(&tx, RefreshResult::Prices(assets)).await;

                debug!(
                    "Fetching price history with max {} concurrent requests...",
                    MAX_CONCURRENT_REQUESTS
                );

                let tx_clone = tx.clone();
                stream::iter(ids)
                    .map(|id| {
                        let api = api.clone();
                        async move {
                            let points = api.fetch_price_history(&id, timeframe).await;
                            (id, points)
                        }
                    })
                    .buffer_unordered(MAX_CONCURRENT_REQUESTS)
                    .for_each(|(id, result)| {
                        let tx = tx_clone.clone();
                        async move {
                            match result {
                                Ok(points) => {
                                    debug!(id = %id, samples = points.len(), "History fetched");
                                    Self::send_result(&tx, RefreshResult::History(id, points))
                                        .await;
                                }
                                Err(e) => {
                                    debug!(id = %id, error = %e, "History fetch failed");
                                }
                            }
                        }
                    })
                    .await;

                debug!("Price histories complete");
            }
            Err(e) => {
                error!(error = %e, "Market prices fetch failed");
                Self::send_result(&tx, RefreshResult::Error(e.to_string())).await;
            }
        }

        Self::send_result(&tx, RefreshResult::RefreshComplete).await;
    }

    /// Fetch what the detail pane is missing for the selected asset: price
    /// history for the active timeframe, and the detail record when the
    /// list payload came without market cap or volume.
    pub fn fetch_selection_data(&mut self) {
        let (id, need_history, need_detail) = match self.selected_asset() {
            Some(asset) => (
                asset.id.clone(),
                !self.histories.contains_key(&asset.id),
                (asset.market_cap.is_none() || asset.volume_24h.is_none())
                    && !self.details_requested.contains(&asset.id),
            ),
            None => return,
        };

        if need_history {
            let tx = self.refresh_tx.clone();
            let api = self.api.clone();
            let timeframe = self.timeframe;
            let history_id = id.clone();

            tokio::spawn(async move {
                match api.fetch_price_history(&history_id, timeframe).await {
                    Ok(points) => {
                        Self::send_result(&tx, RefreshResult::History(history_id, points)).await;
                    }
                    Err(e) => {
                        debug!(id = %history_id, error = %e, "On-demand history fetch failed");
                    }
                }
            });
        }

        if need_detail {
            self.details_requested.insert(id.clone());
            let tx = self.refresh_tx.clone();
            let api = self.api.clone();

            tokio::spawn(async move {
                match api.fetch_market_detail(&id).await {
                    Ok(asset) => {
                        Self::send_result(&tx, RefreshResult::Detail(asset)).await;
                    }
                    Err(e) => {
                        debug!(id = %id, error = %e, "Detail fetch failed");
                    }
                }
            });
        }
    }

    // =========================================================================
    // Event Processing
    // =========================================================================

    /// Check for completed background tasks and queued events, and fold
    /// their results into the app state.
    pub async fn check_background_tasks(&mut self) {
        // Session state transitions
        let mut session_events = Vec::new();
        while let Ok(event) = self.session_rx.try_recv() {
            session_events.push(event);
        }
        for event in session_events {
            self.handle_session_event(event).await;
        }

        // Queued push tokens are held back until a session exists
        if self.session.is_authenticated() {
            let mut tokens = Vec::new();
            while let Ok(token) = self.push_rx.try_recv() {
                tokens.push(token);
            }
            for token in tokens {
                self.registrar.handle_token(&token).await;
            }
        }

        // Collect all pending refresh results first to avoid borrow conflicts
        let results: Vec<RefreshResult> = {
            if let Some(ref mut rx) = self.refresh_rx {
                let mut results = Vec::new();
                while let Ok(result) = rx.try_recv() {
                    results.push(result);
                }
                results
            } else {
                Vec::new()
            }
        };

        for result in results {
            self.process_refresh_result(result);
        }
    }

    /// React to one session state transition.
    async fn handle_session_event(&mut self, event: SessionEvent) {
        let SessionEvent::StateChanged(state) = event;
        match state {
            SessionState::Loading => {}
            SessionState::Authenticated(user) => {
                // An authenticated event while already signed in is a
                // profile refresh, not a sign-in.
                if !self.was_authenticated {
                    self.status_message = Some(format!("Signed in as {}", user.email));
                    if self.state == AppState::LoggingIn {
                        self.state = AppState::Normal;
                    }
                    self.refresh_market_background();
                }
                self.was_authenticated = true;
            }
            SessionState::Unauthenticated => {
                self.was_authenticated = false;
                if self.state == AppState::Normal {
                    self.start_login();
                }
            }
            SessionState::Failed(reason) => {
                self.was_authenticated = false;
                if self.state != AppState::LoggingIn {
                    self.start_login();
                }
                self.login_error = Some(reason);
            }
        }
    }

    /// Process a single refresh result from a background task.
    fn process_refresh_result(&mut self, result: RefreshResult) {
        match result {
            RefreshResult::Prices(mut assets) => {
                let column = self.sort_column;
                column.sort(&mut assets);
                if self.sort_reversed {
                    assets.reverse();
                }

                // Keep the same asset selected across refreshes
                let selected_id = self.selected_asset().map(|a| a.id.clone());
                if let Some(pos) = Self::position_of(&assets, selected_id.as_deref()) {
                    self.market_selection = pos;
                } else if self.market_selection >= assets.len() {
                    self.market_selection = assets.len().saturating_sub(1);
                }
                self.assets = assets;
                self.details_requested.clear();
            }
            RefreshResult::History(id, points) => {
                self.histories.insert(id, points);
            }
            RefreshResult::Detail(asset) => {
                // No resort; a detail arriving must not reshuffle the list
                // under the cursor.
                if let Some(pos) = Self::position_of(&self.assets, Some(asset.id.as_str())) {
                    self.assets[pos] = asset;
                }
            }
            RefreshResult::RefreshComplete => {
                self.refresh_in_flight = false;
                // Only clear progress messages, preserve errors
                if let Some(ref msg) = self.status_message {
                    if !msg.starts_with("Error:") {
                        self.status_message = None;
                    }
                }
            }
            RefreshResult::Error(msg) => {
                error!(error = %msg, "Background refresh error");
                // Simplify common error messages for the user
                let lower = msg.to_lowercase();
                let user_message = if lower.contains("rate limit") {
                    "Exchange is busy. Please wait a moment and try again.".to_string()
                } else if lower.contains("unauthorized") || msg.contains("401") {
                    "Session expired. Please log in again.".to_string()
                } else if lower.contains("network") || lower.contains("connect") {
                    "Network error. Check your connection.".to_string()
                } else {
                    format!("Error: {}", msg)
                };
                self.status_message = Some(user_message);
            }
        }
    }

    // =========================================================================
    // Market View Helpers
    // =========================================================================

    pub fn selected_asset(&self) -> Option<&Cryptocurrency> {
        self.assets.get(self.market_selection)
    }

    /// History samples for the selected asset, if already fetched.
    pub fn selected_history(&self) -> Option<&[PricePoint]> {
        let asset = self.selected_asset()?;
        self.histories.get(&asset.id).map(|points| points.as_slice())
    }

    /// Advance the sort column and re-sort, keeping the selection on the
    /// same asset.
    pub fn cycle_sort_column(&mut self) {
        self.sort_column = self.sort_column.next();
        self.sort_reversed = false;
        self.apply_sort();
    }

    /// Flip the current sort direction.
    pub fn reverse_sort(&mut self) {
        self.sort_reversed = !self.sort_reversed;
        self.apply_sort();
    }

    fn apply_sort(&mut self) {
        let selected_id = self.selected_asset().map(|a| a.id.clone());
        let column = self.sort_column;
        column.sort(&mut self.assets);
        if self.sort_reversed {
            self.assets.reverse();
        }
        if let Some(pos) = Self::position_of(&self.assets, selected_id.as_deref()) {
            self.market_selection = pos;
        }
    }

    /// Switch the history window and drop samples from the old one.
    pub fn cycle_timeframe(&mut self) {
        self.timeframe = self.timeframe.next();
        self.histories.clear();
        self.fetch_selection_data();
    }

    /// Index of `selected_id` in `assets`, when still listed.
    fn position_of(assets: &[Cryptocurrency], selected_id: Option<&str>) -> Option<usize> {
        let id = selected_id?;
        assets.iter().position(|a| a.id == id)
    }
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if an email character should be accepted
pub fn can_add_email_char(current_len: usize, c: char) -> bool {
    current_len < MAX_EMAIL_LENGTH && is_valid_input_char(c)
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

/// Check if a display-name character should be accepted
pub fn can_add_name_char(current_len: usize, c: char) -> bool {
    current_len < MAX_NAME_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================
