//! Coindeck: a terminal client for the Coindeck cryptocurrency exchange.
//!
//! Market data loads without an account; signing in unlocks the profile
//! tab, password reset, and push notification settings.

mod api;
mod app;
mod auth;
mod config;
mod models;
mod push;
mod ui;
mod utils;

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::api::ApiClient;
use crate::app::{App, AppState};
use crate::auth::store::SERVICE_NAME;
use crate::auth::{CredentialStore, SessionManager};
use crate::config::Config;

// ============================================================================
// Constants
// ============================================================================

/// How long to block waiting for a key event each loop tick.
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Logs go to a file under the data directory. Writing to stderr would
/// corrupt the alternate screen.
fn init_tracing() -> Option<WorkerGuard> {
    let dir = Config::data_dir().ok()?.join("logs");
    std::fs::create_dir_all(&dir).ok()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let appender = tracing_appender::rolling::never(dir, "coindeck.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("coindeck {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let _guard = init_tracing();

    if args.iter().any(|a| a == "--register") {
        return register_flow().await;
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new()?;
    app.session.check_status().await;
    if !app.session.is_authenticated() {
        app.start_login();
    }
    app.refresh_market_background();

    let result = run_app(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::render::render(f, app))?;

        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    // Ctrl+C always quits, regardless of mode.
                    if key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL)
                    {
                        return Ok(());
                    }
                    if ui::input::handle_input(app, key).await? {
                        return Ok(());
                    }
                }
            }
        }

        app.check_background_tasks().await;

        if app.auto_refresh_due() {
            app.refresh_market_background();
        }

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}

// ============================================================================
// Account registration (plain console, outside the TUI)
// ============================================================================

/// Interactive account creation. Runs before terminal setup so the
/// password prompts can own the terminal.
async fn register_flow() -> Result<()> {
    let config = Config::load().unwrap_or_default();
    let data_dir = Config::data_dir()?;
    let store = Arc::new(CredentialStore::new(SERVICE_NAME, &data_dir));
    let api = match std::env::var("COINDECK_API_BASE")
        .ok()
        .or_else(|| config.api_base.clone())
    {
        Some(base) => ApiClient::with_base_url(Arc::clone(&store), &base)?,
        None => ApiClient::new(Arc::clone(&store))?,
    };
    let mut session = SessionManager::new(api, store);

    let email = prompt_line("Email: ")?;
    let name = prompt_line("Name: ")?;
    let password = rpassword::prompt_password("Password: ")?;
    let confirm = rpassword::prompt_password("Confirm password: ")?;
    let details = registration_details(&email, &name, &password, &confirm)?;

    complete_registration(&mut session, &details).await?;
    println!("Account created. Start coindeck and sign in with your new credentials.");
    Ok(())
}

/// Validate the prompt answers into the registration payload. Errors
/// propagate to `main` so the log writer still flushes on the way out.
fn registration_details(
    email: &str,
    name: &str,
    password: &str,
    confirm: &str,
) -> Result<serde_json::Value> {
    if password != confirm {
        return Err(anyhow::anyhow!("Passwords do not match"));
    }
    Ok(serde_json::json!({
        "email": email,
        "password": password,
        "name": name,
    }))
}

/// Submit the registration. A rejection surfaces the server's reason as
/// the error.
async fn complete_registration(
    session: &mut SessionManager,
    details: &serde_json::Value,
) -> Result<()> {
    if session.register(details).await {
        Ok(())
    } else {
        match session.error() {
            Some(reason) => Err(anyhow::anyhow!("Registration failed: {}", reason)),
            None => Err(anyhow::anyhow!("Registration failed")),
        }
    }
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::auth::store::use_mock_keyring;

    #[test]
    fn test_mismatched_passwords_become_an_error() {
        let result = registration_details("a@b.test", "Ada", "pw-one", "pw-two");
        let err = result.err().map(|e| e.to_string());
        assert_eq!(err.as_deref(), Some("Passwords do not match"));
    }

    #[test]
    fn test_registration_details_carry_the_prompt_answers() {
        let details = registration_details("a@b.test", "Ada", "pw", "pw")
            .expect("Matching passwords must produce a payload");
        assert_eq!(details["email"], "a@b.test");
        assert_eq!(details["name"], "Ada");
        assert_eq!(details["password"], "pw");
    }

    #[tokio::test]
    async fn test_rejected_registration_becomes_an_error() {
        use_mock_keyring();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let service = format!("coindeck-register-{}", std::process::id());
        let store = Arc::new(CredentialStore::new(&service, dir.path()));
        let server = MockServer::start().await;
        let api = ApiClient::with_base_url(Arc::clone(&store), &server.uri())
            .expect("Failed to build client");
        let mut session = SessionManager::new(api, store);

        Mock::given(method("POST"))
            .and(path("/api/auth/register"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "message": "Email already registered",
            })))
            .mount(&server)
            .await;

        let details = json!({ "email": "a@b.test", "password": "pw", "name": "Ada" });
        let result = complete_registration(&mut session, &details).await;
        let err = result.err().map(|e| e.to_string());
        assert_eq!(
            err.as_deref(),
            Some("Registration failed: Email already registered")
        );
    }
}
