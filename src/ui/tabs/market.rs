//! Market tab: sortable asset table on the left, detail pane with a
//! price-history sparkline on the right.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Sparkline, Table, TableState};
use ratatui::Frame;

use crate::app::{App, Focus};
use crate::models::{Cryptocurrency, PricePoint};
use crate::ui::styles;
use crate::utils::{format_change, format_compact, format_price, format_timestamp, truncate_string};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    render_asset_table(frame, app, chunks[0]);
    render_asset_detail(frame, app, chunks[1]);
}

fn render_asset_table(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.focus, Focus::List);

    let header_cells = ["Sym", "Name", "Price", "24h"].iter().map(|h| Cell::from(*h));
    let header = Row::new(header_cells).style(styles::title_style()).height(1);

    let rows = app.assets.iter().enumerate().map(|(i, asset)| {
        let style = if i == app.market_selection {
            styles::selected_style()
        } else {
            styles::list_item_style()
        };
        Row::new(vec![
            Cell::from(asset.symbol.clone()),
            Cell::from(truncate_string(&asset.name, 18)),
            Cell::from(format!("{:>12}", format_price(asset.price))),
            Cell::from(Span::styled(
                format!("{:>8}", format_change(asset.change_24h)),
                change_style(asset.change_24h),
            )),
        ])
        .style(style)
    });

    let widths = [
        Constraint::Length(6),  // symbol
        Constraint::Min(12),    // name
        Constraint::Length(12), // price
        Constraint::Length(8),  // 24h change
    ];

    let direction = if app.sort_reversed { "asc" } else { "desc" };
    let title = format!(
        " Assets ({}) - by {} {} ",
        app.assets.len(),
        app.sort_column.label(),
        direction
    );
    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(focused)),
        )
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    state.select(Some(app.market_selection));
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_asset_detail(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.focus, Focus::Detail);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(8)])
        .split(area);

    let lines = match app.selected_asset() {
        Some(asset) => {
            let mut lines = asset_lines(asset);
            if let Some(last) = app.selected_history().and_then(|points| points.last()) {
                lines.push(Line::from(""));
                lines.push(Line::from(vec![
                    Span::styled(" As of:       ", styles::muted_style()),
                    Span::styled(format_timestamp(last.timestamp), styles::muted_style()),
                ]));
            }
            lines
        }
        None => vec![
            Line::from(""),
            Line::from(Span::styled(
                "  Select an asset from the list",
                styles::muted_style(),
            )),
        ],
    };

    let block = Block::default()
        .title(" Detail ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));
    frame.render_widget(Paragraph::new(lines).block(block), chunks[0]);

    render_history(frame, app, chunks[1]);
}

fn asset_lines(asset: &Cryptocurrency) -> Vec<Line<'static>> {
    let market_cap = asset
        .market_cap
        .map(format_compact)
        .unwrap_or_else(|| "-".to_string());
    let volume = asset
        .volume_24h
        .map(format_compact)
        .unwrap_or_else(|| "-".to_string());

    vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(format!(" {}  ", asset.name), styles::title_style()),
            Span::styled(asset.symbol.clone(), styles::muted_style()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled(" Price:       ", styles::muted_style()),
            Span::raw(format_price(asset.price)),
        ]),
        Line::from(vec![
            Span::styled(" 24h change:  ", styles::muted_style()),
            Span::styled(format_change(asset.change_24h), change_style(asset.change_24h)),
        ]),
        Line::from(vec![
            Span::styled(" Market cap:  ", styles::muted_style()),
            Span::raw(market_cap),
        ]),
        Line::from(vec![
            Span::styled(" Volume 24h:  ", styles::muted_style()),
            Span::raw(volume),
        ]),
    ]
}

fn render_history(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.focus, Focus::Detail);

    let points = match app.selected_asset() {
        Some(_) => app.selected_history().unwrap_or(&[]),
        None => {
            let block = Block::default()
                .title(" History ")
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(focused));
            frame.render_widget(block, area);
            return;
        }
    };

    if points.is_empty() {
        let block = Block::default()
            .title(format!(" History ({}) ", app.timeframe.label()))
            .title_style(styles::muted_style())
            .borders(Borders::ALL)
            .border_style(styles::border_style(focused));
        let paragraph = Paragraph::new("Loading history...")
            .style(styles::muted_style())
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let (low, high) = price_bounds(points);
    let trend_up = points.last().map(|p| p.price) >= points.first().map(|p| p.price);
    let title = format!(
        " History ({}) - low {} high {} ",
        app.timeframe.label(),
        format_price(low),
        format_price(high)
    );

    let data = sparkline_data(points);
    let sparkline = Sparkline::default()
        .block(
            Block::default()
                .title(title)
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(focused)),
        )
        .data(&data)
        .style(if trend_up {
            styles::success_style()
        } else {
            styles::error_style()
        });
    frame.render_widget(sparkline, area);
}

fn change_style(change: f64) -> Style {
    if change >= 0.0 {
        styles::success_style()
    } else {
        styles::error_style()
    }
}

/// Scales prices into the 0-100 range the sparkline expects. A flat series
/// renders as a midline rather than an empty strip.
fn sparkline_data(points: &[PricePoint]) -> Vec<u64> {
    let (low, high) = price_bounds(points);
    let range = high - low;
    points
        .iter()
        .map(|point| {
            if range <= f64::EPSILON {
                50
            } else {
                (((point.price - low) / range) * 100.0).round() as u64
            }
        })
        .collect()
}

fn price_bounds(points: &[PricePoint]) -> (f64, f64) {
    let mut low = f64::INFINITY;
    let mut high = f64::NEG_INFINITY;
    for point in points {
        low = low.min(point.price);
        high = high.max(point.price);
    }
    (low, high)
}
