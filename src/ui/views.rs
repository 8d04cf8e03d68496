// Screen renderers
// Each screen is drawn straight from the application state; nothing in here
// changes state

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::player::controller::Readiness;
use crate::player::handle::PlaybackHandle;
use crate::pod::{Pod, PRESETS};
use crate::ui::navigation::{Screen, MENU_ITEMS};

// Row layout of the playlist screen: presets, then the custom-id row, then tracks
pub const CUSTOM_ROW: usize = PRESETS.len();
pub const FIRST_TRACK_ROW: usize = PRESETS.len() + 1;

// UI-local state the renderers need besides the Pod
pub struct Inputs<'a> {
    pub search_query: &'a str,
    pub custom_playlist: &'a str,
    pub api_key_draft: &'a str,
    pub list_cursor: usize,
    pub editing_custom: bool,
    pub status_message: &'a str,
}

pub fn draw<H: PlaybackHandle>(frame: &mut Frame, pod: &Pod<H>, inputs: &Inputs) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(3)])
        .split(frame.size());

    match pod.screen() {
        Screen::Menu => draw_menu(frame, chunks[0], pod),
        Screen::NowPlaying => draw_now_playing(frame, chunks[0], pod),
        Screen::Playlist => draw_playlist(frame, chunks[0], pod, inputs),
        Screen::Search => draw_search(frame, chunks[0], pod, inputs),
        Screen::Settings => draw_settings(frame, chunks[0], pod, inputs),
    }

    draw_footer(frame, chunks[1], pod, inputs);
}

fn selected_style() -> Style {
    Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
}

fn draw_menu<H: PlaybackHandle>(frame: &mut Frame, area: Rect, pod: &Pod<H>) {
    let items: Vec<ListItem> = MENU_ITEMS
        .iter()
        .enumerate()
        .map(|(i, (_, label))| {
            let style = if i == pod.menu_cursor() { selected_style() } else { Style::default() };
            ListItem::new(format!(" {} ", label)).style(style)
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" iPod "));
    frame.render_widget(list, area);
}

fn draw_now_playing<H: PlaybackHandle>(frame: &mut Frame, area: Rect, pod: &Pod<H>) {
    let playlist = pod.playlist();
    let playback = pod.playback();
    let block = Block::default().borders(Borders::ALL).title(" Now Playing ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(4), Constraint::Length(1), Constraint::Length(1)])
        .split(inner);

    let position = if playlist.is_empty() {
        "No playlist loaded".to_string()
    } else {
        format!("{} of {}", playlist.current_index() + 1, playlist.len())
    };
    let title = playlist.current().map(|t| t.title.as_str()).unwrap_or("-");
    let state = if playback.is_playing { "Playing" } else { "Paused" };

    let mut lines = vec![
        Line::from(position),
        Line::from(""),
        Line::styled(title.to_string(), Style::default().add_modifier(Modifier::BOLD)),
        Line::from(state),
    ];
    if pod.readiness() != Readiness::Ready {
        lines.push(Line::styled(
            "Waiting for player...",
            Style::default().fg(Color::DarkGray),
        ));
    }
    let meta = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(meta, rows[0]);

    let ratio = if playback.duration_seconds > 0.0 {
        (playback.position_seconds / playback.duration_seconds).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(ratio)
        .label("");
    frame.render_widget(gauge, rows[1]);

    let duration = if playback.duration_seconds > 0.0 {
        format_time(playback.duration_seconds)
    } else {
        "-:--".to_string()
    };
    let times = Paragraph::new(format!(
        "{}  /  {}",
        format_time(playback.position_seconds),
        duration
    ))
    .alignment(Alignment::Center);
    frame.render_widget(times, rows[2]);
}

fn draw_playlist<H: PlaybackHandle>(frame: &mut Frame, area: Rect, pod: &Pod<H>, inputs: &Inputs) {
    let playlist = pod.playlist();
    let mut items: Vec<ListItem> = PRESETS
        .iter()
        .map(|p| ListItem::new(format!("[preset] {}", p.label)))
        .collect();

    let custom = if inputs.editing_custom {
        format!("Custom URL or ID: {}_", inputs.custom_playlist)
    } else if inputs.custom_playlist.is_empty() {
        "Load custom playlist (Enter to type a URL or ID)".to_string()
    } else {
        format!("Load custom playlist: {}", inputs.custom_playlist)
    };
    items.push(ListItem::new(custom).style(Style::default().fg(Color::Yellow)));

    if playlist.is_empty() {
        if !playlist.empty_hint().is_empty() {
            items.push(
                ListItem::new(playlist.empty_hint().to_string())
                    .style(Style::default().fg(Color::DarkGray)),
            );
        }
    } else {
        for (i, track) in playlist.tracks().iter().enumerate() {
            let marker = if i == playlist.current_index() { ">" } else { " " };
            items.push(ListItem::new(format!("{} {}", marker, track.title)));
        }
    }

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", playlist.title())),
        )
        .highlight_style(selected_style());

    let mut state = ListState::default();
    state.select(Some(inputs.list_cursor));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_search<H: PlaybackHandle>(frame: &mut Frame, area: Rect, pod: &Pod<H>, inputs: &Inputs) {
    let status = pod.search_status();
    let mut lines = vec![
        Line::from(format!("Search: {}_", inputs.search_query)),
        Line::from(""),
    ];
    if status.searching {
        lines.push(Line::from("Searching..."));
    } else if let Some(error) = status.error {
        lines.push(Line::styled(error, Style::default().fg(Color::Red)));
    }
    if pod.credential().is_empty() {
        lines.push(Line::styled(
            "Set an API key in Settings first.",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Search "))
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, area);
}

fn draw_settings<H: PlaybackHandle>(frame: &mut Frame, area: Rect, pod: &Pod<H>, inputs: &Inputs) {
    let saved = if pod.credential().is_empty() { "not set" } else { "saved" };
    let lines = vec![
        Line::from(format!("API key: {}_", inputs.api_key_draft)),
        Line::from(format!("Stored key: {}", saved)),
        Line::from(""),
        Line::styled(
            "Your key is stored locally so you only set it once.",
            Style::default().fg(Color::DarkGray),
        ),
        Line::styled(
            "Choose playlists from the Playlist menu.",
            Style::default().fg(Color::DarkGray),
        ),
    ];
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Settings "))
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, area);
}

fn draw_footer<H: PlaybackHandle>(frame: &mut Frame, area: Rect, pod: &Pod<H>, inputs: &Inputs) {
    let text = if !inputs.status_message.is_empty() {
        inputs.status_message.to_string()
    } else {
        match pod.screen() {
            Screen::Menu => "[↑/↓]Scroll [Enter]Select [Tab/Space]Play/Pause [q]Quit".to_string(),
            Screen::Search | Screen::Settings => {
                "Type, [Enter]Submit [Esc]Menu [←/→]Prev/Next [Tab]Play/Pause".to_string()
            }
            _ => "[Esc]Menu [←/→]Prev/Next [Space]Play/Pause [↑/↓]Scroll [Enter]Select [q]Quit"
                .to_string(),
        }
    };
    let footer = Paragraph::new(text).block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, area);
}

// m:ss, or -:-- for anything that isn't a sane number of seconds
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "-:--".to_string();
    }
    let total = seconds as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
