//! Keyboard dispatch.
//!
//! Modal states (login, help, quit confirmation) capture input first;
//! everything else flows through the global bindings and then the
//! per-tab handlers. Returns `Ok(true)` when the app should exit.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{can_add_email_char, can_add_name_char, can_add_password_char};
use crate::app::{App, AppState, Focus, LoginFocus, Tab, PAGE_SCROLL_SIZE};

pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    if matches!(app.state, AppState::LoggingIn) {
        return handle_login_input(app, key).await;
    }

    if matches!(app.state, AppState::EditingName) {
        return handle_edit_name_input(app, key).await;
    }

    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(
            key.code,
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')
        ) {
            app.state = AppState::Normal;
        }
        return Ok(false);
    }

    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::ConfirmingQuit;
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
        }
        KeyCode::Char('1') => {
            app.current_tab = Tab::Market;
            app.focus = Focus::List;
        }
        KeyCode::Char('2') => {
            app.current_tab = Tab::Account;
            app.focus = Focus::List;
        }
        KeyCode::Left => {
            app.current_tab = app.current_tab.prev();
            app.focus = Focus::List;
        }
        KeyCode::Right => {
            app.current_tab = app.current_tab.next();
            app.focus = Focus::List;
        }
        KeyCode::Tab => {
            app.focus = match app.focus {
                Focus::List => Focus::Detail,
                Focus::Detail => Focus::List,
            };
        }
        KeyCode::Esc => {
            app.focus = Focus::List;
        }
        KeyCode::Char('r') => {
            app.refresh_market_background();
        }
        KeyCode::Char('l') => {
            if !app.session.is_authenticated() {
                app.start_login();
            }
        }
        _ => match app.current_tab {
            Tab::Market => handle_market_input(app, key).await?,
            Tab::Account => handle_account_input(app, key).await?,
        },
    }

    Ok(false)
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        // Market data is public; the overlay can be dismissed without
        // signing in.
        KeyCode::Esc => {
            app.state = AppState::Normal;
        }
        KeyCode::Down | KeyCode::Tab => {
            app.login_focus = match app.login_focus {
                LoginFocus::Email => LoginFocus::Password,
                LoginFocus::Password => LoginFocus::Button,
                LoginFocus::Button => LoginFocus::Email,
            };
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.login_focus = match app.login_focus {
                LoginFocus::Email => LoginFocus::Button,
                LoginFocus::Password => LoginFocus::Email,
                LoginFocus::Button => LoginFocus::Password,
            };
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Email => {
                app.login_focus = LoginFocus::Password;
            }
            LoginFocus::Password => {
                app.login_focus = LoginFocus::Button;
            }
            LoginFocus::Button => {
                app.attempt_login().await;
            }
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Email => {
                app.login_email.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Email => {
                if can_add_email_char(app.login_email.chars().count(), c) {
                    app.login_email.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.chars().count(), c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Button => {}
        },
        _ => {}
    }
    Ok(false)
}

async fn handle_edit_name_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::Normal;
        }
        KeyCode::Enter => {
            app.save_name().await;
        }
        KeyCode::Backspace => {
            app.name_input.pop();
        }
        KeyCode::Char(c) => {
            if can_add_name_char(app.name_input.chars().count(), c) {
                app.name_input.push(c);
            }
        }
        _ => {}
    }
    Ok(false)
}

async fn handle_market_input(app: &mut App, key: KeyEvent) -> Result<()> {
    let max_index = app.assets.len().saturating_sub(1);
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            if app.market_selection < max_index {
                app.market_selection += 1;
                app.fetch_selection_data();
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if app.market_selection > 0 {
                app.market_selection -= 1;
                app.fetch_selection_data();
            }
        }
        KeyCode::Home => {
            app.market_selection = 0;
            app.fetch_selection_data();
        }
        KeyCode::End => {
            app.market_selection = max_index;
            app.fetch_selection_data();
        }
        KeyCode::PageDown => {
            app.market_selection = (app.market_selection + PAGE_SCROLL_SIZE).min(max_index);
            app.fetch_selection_data();
        }
        KeyCode::PageUp => {
            app.market_selection = app.market_selection.saturating_sub(PAGE_SCROLL_SIZE);
            app.fetch_selection_data();
        }
        KeyCode::Enter => {
            app.focus = Focus::Detail;
            app.fetch_selection_data();
        }
        KeyCode::Char('t') => {
            app.cycle_timeframe();
        }
        KeyCode::Char('s') => {
            app.cycle_sort_column();
        }
        KeyCode::Char('S') => {
            app.reverse_sort();
        }
        _ => {}
    }
    Ok(())
}

async fn handle_account_input(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Char('e') => {
            app.start_edit_name();
        }
        KeyCode::Char('p') => {
            app.reset_password().await;
        }
        KeyCode::Char('n') => {
            if app.session.is_authenticated() {
                app.toggle_push().await;
            }
        }
        KeyCode::Char('o') => {
            if app.session.is_authenticated() {
                app.logout().await;
            }
        }
        _ => {}
    }
    Ok(())
}
