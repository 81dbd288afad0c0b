use chrono::{DateTime, Local, Utc};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Tabs, Wrap},
};
use serde_json::Value;

use crate::app::{App, Tab};

const NAV_HINT: &str = "Tab/←/→ switch view · ↑/↓ scroll · q/Ctrl-C quit";

pub(crate) fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.area();

    // Outer layout: title, state, tabs, main content, status line
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [header_area, state_area, tabs_area, content_area, status_area] = chunks else {
        return;
    };

    let header = Paragraph::new(format!(
        "{} · monitoring {}",
        app.signal.name, app.signal.unique_id
    ))
    .block(Block::default().borders(Borders::ALL).title("Vypadek"));
    frame.render_widget(header, *header_area);

    draw_state(frame, app, *state_area);

    let titles = Tab::ALL.iter().map(|tab| tab.title()).collect::<Vec<_>>();
    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, *tabs_area);

    match app.tab {
        Tab::Outages | Tab::TownOutages => draw_outages(frame, app, *content_area),
        Tab::Addresses => draw_addresses(frame, app, *content_area),
    }

    let status_text = match app.received_at {
        Some(received_at) => format!("Updated {} · {NAV_HINT}", received_at.format("%H:%M:%S")),
        None => format!("Waiting for first refresh… · {NAV_HINT}"),
    };
    let status_style = if app.received_at.is_none() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let status = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(status_style)
        .wrap(Wrap { trim: true });

    frame.render_widget(status, *status_area);
}

fn draw_state(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let (label, style) = if app.signal.is_on {
        (
            "OUTAGE",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    } else {
        ("no known outage", Style::default().fg(Color::Green))
    };

    let attributes = &app.signal.attributes;
    let lines = vec![
        Line::from(vec![Span::raw("State: "), Span::styled(label, style)]),
        Line::from(format!(
            "{} local · {} in town",
            attributes.outages.len(),
            attributes.outages_in_town.len()
        )),
        Line::from(format!(
            "Last refresh {} · next {} · every {} s",
            local_time(app.aggregator.last_refresh()),
            local_time(app.aggregator.next_refresh()),
            app.aggregator.interval().num_seconds()
        )),
    ];

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Signal"));
    frame.render_widget(paragraph, area);
}

fn draw_outages(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let title = format!("{} (↑/↓)", app.tab.title());
    let rows = app.outage_rows();

    if rows.is_empty() {
        let paragraph = Paragraph::new("Nothing reported.")
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    let rows = rows.into_iter().map(|row| {
        Row::new(vec![
            Cell::from(timestamp_label(&row.opened_at)),
            Cell::from(timestamp_label(&row.fix_expected_at)),
            Cell::from(row.details),
        ])
    });

    let column_widths = [
        Constraint::Length(22),
        Constraint::Length(22),
        Constraint::Min(20),
    ];

    let table = Table::new(rows, column_widths)
        .header(
            Row::new(vec!["From", "Expected fix", "Details"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().fg(Color::Yellow))
        .column_spacing(1);

    let mut state = TableState::default();
    state.select(Some(app.list_index));
    frame.render_stateful_widget(table, area, &mut state);
}

fn draw_addresses(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let rows = app.address_statuses().into_iter().map(|status| {
        let (summary, style) = match status.outages {
            Some((0, in_town)) => (
                format!("ok · {in_town} in town"),
                Style::default().fg(Color::Green),
            ),
            Some((local, in_town)) => (
                format!("{local} outage(s) · {in_town} in town"),
                Style::default().fg(Color::Red),
            ),
            None => ("unknown".to_owned(), Style::default().fg(Color::DarkGray)),
        };

        Row::new(vec![Cell::from(status.label), Cell::from(summary)]).style(style)
    });

    let table = Table::new(rows, [Constraint::Percentage(50), Constraint::Percentage(50)])
        .header(
            Row::new(vec!["Address", "Last lookup"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Monitored addresses"),
        )
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .column_spacing(1);

    let mut state = TableState::default();
    state.select(Some(app.list_index));
    frame.render_stateful_widget(table, area, &mut state);
}

fn local_time(instant: Option<DateTime<Utc>>) -> String {
    instant.map_or_else(
        || "–".to_owned(),
        |instant| instant.with_timezone(&Local).format("%d.%m. %H:%M:%S").to_string(),
    )
}

fn timestamp_label(value: &Value) -> String {
    match value {
        Value::Null => "–".to_owned(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

