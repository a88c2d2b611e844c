//! Account tab: profile details, notification settings, and session actions.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::{App, Focus};
use crate::auth::SessionState;
use crate::ui::styles;
use crate::utils::format_optional;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(7)])
        .split(area);

    render_profile(frame, app, chunks[0]);
    render_settings(frame, app, chunks[1]);
}

fn render_profile(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.focus, Focus::List);

    let lines = match app.session.state() {
        SessionState::Authenticated(user) => {
            let two_factor = if user.has_two_factor_auth {
                Span::styled("enabled", styles::success_style())
            } else {
                Span::styled("disabled", styles::muted_style())
            };
            vec![
                Line::from(""),
                Line::from(vec![
                    Span::styled(format!(" {}  ", user.display_name()), styles::title_style()),
                    Span::styled(user.role_display(), styles::muted_style()),
                ]),
                Line::from(""),
                Line::from(vec![
                    Span::styled(" Email:       ", styles::muted_style()),
                    Span::raw(user.email.clone()),
                ]),
                Line::from(vec![
                    Span::styled(" Two-factor:  ", styles::muted_style()),
                    two_factor,
                ]),
                Line::from(vec![
                    Span::styled(" Avatar:      ", styles::muted_style()),
                    Span::raw(format_optional(&user.profile_image, "none")),
                ]),
            ]
        }
        SessionState::Loading => vec![
            Line::from(""),
            Line::from(Span::styled("  Checking session...", styles::muted_style())),
        ],
        SessionState::Unauthenticated => vec![
            Line::from(""),
            Line::from(Span::styled("  Not signed in", styles::muted_style())),
            Line::from(""),
            Line::from(vec![
                Span::styled("  [l] ", styles::help_key_style()),
                Span::styled("sign in", styles::help_desc_style()),
            ]),
        ],
        SessionState::Failed(reason) => vec![
            Line::from(""),
            Line::from(Span::styled(format!("  {}", reason), styles::error_style())),
            Line::from(""),
            Line::from(vec![
                Span::styled("  [l] ", styles::help_key_style()),
                Span::styled("try again", styles::help_desc_style()),
            ]),
        ],
    };

    let block = Block::default()
        .title(" Profile ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_settings(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.focus, Focus::Detail);

    let push = if app.push_enabled {
        Span::styled("enabled", styles::success_style())
    } else {
        Span::styled("disabled", styles::muted_style())
    };
    let device = match (app.registrar.has_token(), app.registrar.device_id()) {
        (_, Some(id)) => Span::raw(format!("registered ({})", id)),
        (true, None) => Span::styled("pending registration", styles::muted_style()),
        (false, None) => Span::styled("none", styles::muted_style()),
    };

    let mut lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(" Push notifications:  ", styles::muted_style()),
            push,
        ]),
        Line::from(vec![
            Span::styled(" Push device:         ", styles::muted_style()),
            device,
        ]),
        Line::from(""),
    ];
    if app.session.is_authenticated() {
        lines.push(Line::from(vec![
            Span::styled(" [e] ", styles::help_key_style()),
            Span::styled("edit name   ", styles::help_desc_style()),
            Span::styled("[n] ", styles::help_key_style()),
            Span::styled("toggle notifications   ", styles::help_desc_style()),
            Span::styled("[p] ", styles::help_key_style()),
            Span::styled("reset password   ", styles::help_desc_style()),
            Span::styled("[o] ", styles::help_key_style()),
            Span::styled("sign out", styles::help_desc_style()),
        ]));
    }

    let block = Block::default()
        .title(" Settings ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
