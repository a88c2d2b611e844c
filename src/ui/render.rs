//! Top-level layout: title bar, tab strip, active tab content, status bar,
//! and the modal overlays.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::app::{App, AppState, LoginFocus, Tab};
use crate::models::Timeframe;
use crate::ui::{styles, tabs};
use crate::utils::truncate_string;

const LOGO: [&str; 3] = [
    "╔═╗╔═╗╦╔╗╔╔╦╗╔═╗╔═╗╦╔═",
    "║  ║ ║║║║║ ║║║╣ ║  ╠╩╗",
    "╚═╝╚═╝╩╝╚╝═╩╝╚═╝╚═╝╩ ╩",
];

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title bar
            Constraint::Length(3), // tab strip
            Constraint::Min(10),   // active tab content
            Constraint::Length(2), // status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_tab_bar(frame, app, chunks[1]);

    match app.current_tab {
        Tab::Market => tabs::market::render(frame, app, chunks[2]),
        Tab::Account => tabs::account::render(frame, app, chunks[2]),
    }

    render_status_bar(frame, app, chunks[3]);

    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::LoggingIn => render_login_overlay(frame, app),
        AppState::EditingName => render_edit_name_overlay(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        _ => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let brand = "  Coindeck";
    let session = match app.session.user() {
        Some(user) => format!("{}  ", user.email),
        None => String::new(),
    };
    let help = "[?] Help  ";
    let padding = (area.width as usize)
        .saturating_sub(brand.len() + session.chars().count() + help.len());

    let line = Line::from(vec![
        Span::styled(brand, styles::title_style()),
        Span::raw(" ".repeat(padding)),
        Span::styled(session, styles::muted_style()),
        Span::styled(help, styles::muted_style()),
    ]);
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::border_style(false));
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_tab_bar(frame: &mut Frame, app: &App, area: Rect) {
    let titles = [Tab::Market, Tab::Account];
    let mut spans = vec![Span::raw(" ")];
    for (i, tab) in titles.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        spans.push(Span::styled(
            format!("[{}] {}", i + 1, tab.title()),
            styles::tab_style(*tab == app.current_tab),
        ));
    }

    // The market tab shows the timeframe selector on the right.
    if matches!(app.current_tab, Tab::Market) {
        let timeframes = [
            Timeframe::Day,
            Timeframe::Week,
            Timeframe::Month,
            Timeframe::Year,
        ];
        let main_width: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        let selector_width: usize = timeframes.iter().map(|tf| tf.label().len()).sum::<usize>()
            + (timeframes.len() - 1) * 3
            + "[t] ".len()
            + 2;
        let padding = (area.width as usize).saturating_sub(main_width + selector_width);
        spans.push(Span::raw(" ".repeat(padding)));
        spans.push(Span::styled("[t] ", styles::muted_style()));
        for (i, timeframe) in timeframes.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" | ", styles::muted_style()));
            }
            spans.push(Span::styled(
                timeframe.label(),
                styles::tab_style(*timeframe == app.timeframe),
            ));
        }
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::border_style(false));
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let updated = match app.refresh_age_secs() {
        Some(age) if age < 5 => "just now".to_string(),
        Some(age) if age < 120 => format!("{}s ago", age),
        Some(age) => format!("{}m ago", age / 60),
        None => "never".to_string(),
    };
    let left = match &app.status_message {
        Some(message) => message.clone(),
        None => format!("Prices updated {}", updated),
    };
    let left_style = if left.starts_with("Error:") {
        styles::error_style()
    } else {
        Style::default()
    };

    let right = "[r] refresh  [?] help  [q] quit";
    let padding = (area.width as usize).saturating_sub(left.chars().count() + right.len() + 3);
    let line = Line::from(vec![
        Span::raw(" "),
        Span::styled(left, left_style),
        Span::raw(" ".repeat(padding)),
        Span::raw(right),
        Span::raw("  "),
    ]);
    frame.render_widget(Paragraph::new(line).style(styles::status_bar_style()), area);
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 29, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![Line::from("")];
    lines.extend(logo_lines(14));
    lines.push(Line::from(Span::styled(
        format!("{:^50}", concat!("v", env!("CARGO_PKG_VERSION"))),
        styles::muted_style(),
    )));
    lines.push(Line::from(""));

    lines.push(Line::from(Span::styled(
        "  Navigation",
        styles::highlight_style(),
    )));
    lines.push(help_line("1-2", "switch tabs"));
    lines.push(help_line("←/→", "switch tabs"));
    lines.push(help_line("Tab", "toggle list/detail focus"));
    lines.push(help_line("↑/↓ j/k", "move selection"));
    lines.push(help_line("PgUp/PgDn", "page through assets"));
    lines.push(Line::from(""));

    lines.push(Line::from(Span::styled(
        "  Market",
        styles::highlight_style(),
    )));
    lines.push(help_line("r", "refresh prices"));
    lines.push(help_line("t", "cycle timeframe"));
    lines.push(help_line("s", "cycle sort column"));
    lines.push(help_line("S", "reverse sort order"));
    lines.push(Line::from(""));

    lines.push(Line::from(Span::styled(
        "  Account",
        styles::highlight_style(),
    )));
    lines.push(help_line("l", "sign in"));
    lines.push(help_line("e", "edit display name"));
    lines.push(help_line("n", "toggle push notifications"));
    lines.push(help_line("p", "send password reset email"));
    lines.push(help_line("o", "sign out"));
    lines.push(Line::from(""));

    lines.push(Line::from(Span::styled(
        "  Press ? or Esc to close",
        styles::muted_style(),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let height = if app.login_error.is_some() { 14 } else { 12 };
    let area = centered_rect_fixed(46, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![Line::from("")];
    lines.extend(logo_lines(11));
    lines.push(Line::from(""));

    let email_focused = matches!(app.login_focus, LoginFocus::Email);
    lines.push(Line::from(vec![
        Span::styled("  Email:    [", styles::muted_style()),
        Span::styled(
            field_display(&app.login_email, email_focused, 24),
            field_style(email_focused),
        ),
        Span::styled("]", styles::muted_style()),
    ]));

    let password_focused = matches!(app.login_focus, LoginFocus::Password);
    let masked = "*".repeat(app.login_password.chars().count());
    lines.push(Line::from(vec![
        Span::styled("  Password: [", styles::muted_style()),
        Span::styled(
            field_display(&masked, password_focused, 24),
            field_style(password_focused),
        ),
        Span::styled("]", styles::muted_style()),
    ]));
    lines.push(Line::from(""));

    let button_focused = matches!(app.login_focus, LoginFocus::Button);
    let label = if button_focused {
        " ▶ Sign in ◀ "
    } else {
        "   Sign in   "
    };
    lines.push(Line::from(vec![
        Span::raw(" ".repeat(14)),
        Span::styled("[", styles::muted_style()),
        Span::styled(
            label,
            if button_focused {
                styles::selected_style()
            } else {
                styles::list_item_style()
            },
        ),
        Span::styled("]", styles::muted_style()),
    ]));

    if let Some(error) = &app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("  {}", truncate_string(error, 40)),
            styles::error_style(),
        )));
    }

    lines.push(Line::from(Span::styled(
        "  [Esc] browse markets without signing in",
        styles::muted_style(),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_edit_name_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(46, 9, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("{:^44}", "Edit display name"),
            styles::title_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Name: [", styles::muted_style()),
            Span::styled(field_display(&app.name_input, true, 30), field_style(true)),
            Span::styled("]", styles::muted_style()),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "  [Enter] save    [Esc] cancel",
            styles::muted_style(),
        )),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 10, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![Line::from("")];
    lines.extend(logo_lines(11));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::raw(format!("{:^44}", "Quit Coindeck?"))));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw(" ".repeat(12)),
        Span::styled("[Y] ", styles::help_key_style()),
        Span::styled("quit", styles::help_desc_style()),
        Span::raw("    "),
        Span::styled("[N] ", styles::help_key_style()),
        Span::styled("stay", styles::help_desc_style()),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn logo_lines(pad: usize) -> Vec<Line<'static>> {
    LOGO.iter()
        .map(|row| {
            Line::from(Span::styled(
                format!("{}{}", " ".repeat(pad), row),
                styles::title_style(),
            ))
        })
        .collect()
}

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("   {:<9} ", key), styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

/// Shows the tail of the value when it outgrows the field, with a block
/// cursor appended while the field has focus.
fn field_display(value: &str, focused: bool, width: usize) -> String {
    let visible = if focused { width - 1 } else { width };
    let len = value.chars().count();
    let shown: String = value.chars().skip(len.saturating_sub(visible)).collect();
    if focused {
        format!("{:<width$}", format!("{}▌", shown), width = width)
    } else {
        format!("{:<width$}", shown, width = width)
    }
}

fn field_style(focused: bool) -> Style {
    if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    }
}

/// Centers a fixed-size rectangle inside `r`, clamping to its bounds on
/// small terminals.
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let width = width.min(r.width);
    let height = height.min(r.height);
    let x = r.x + (r.width - width) / 2;
    let y = r.y + (r.height - height) / 2;
    Rect {
        x,
        y,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_display_pads_short_values() {
        assert_eq!(field_display("abc", false, 8), "abc     ");
    }

    #[test]
    fn test_field_display_shows_tail_when_overflowing() {
        assert_eq!(field_display("abcdefghij", false, 8), "cdefghij");
    }

    #[test]
    fn test_field_display_cursor_occupies_last_column() {
        let shown = field_display("abcdefghij", true, 8);
        assert_eq!(shown.chars().count(), 8);
        assert!(shown.ends_with('▌'));
        assert!(shown.starts_with("defghij"));
    }

    #[test]
    fn test_centered_rect_clamps_to_small_terminals() {
        let outer = Rect {
            x: 0,
            y: 0,
            width: 40,
            height: 12,
        };
        let rect = centered_rect_fixed(52, 28, outer);
        assert_eq!(rect.width, 40);
        assert_eq!(rect.height, 12);
        assert_eq!(rect.x, 0);
        assert_eq!(rect.y, 0);
    }
}
