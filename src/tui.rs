#![cfg(feature = "tui")]

use crate::clipboard;
use crate::controller::{Controller, RequestForm, Submission};
use crate::model::ModelId;
use crate::view::{ShakeTarget, StatusDot, Tone, View};
use anyhow::Context;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use std::io;
use tokio::sync::mpsc;
use tokio::time::Instant;

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    ApiKey,
    Prompt,
    Model,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::ApiKey => Focus::Prompt,
            Focus::Prompt => Focus::Model,
            Focus::Model => Focus::ApiKey,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::ApiKey => Focus::Model,
            Focus::Prompt => Focus::ApiKey,
            Focus::Model => Focus::Prompt,
        }
    }
}

/// Editable input controls.
#[derive(Clone)]
struct Inputs {
    api_key: String,
    prompt: String,
    model: ModelId,
    focus: Focus,
}

impl Inputs {
    fn new(form: RequestForm) -> Self {
        let focus = if form.api_key.trim().is_empty() {
            Focus::ApiKey
        } else {
            Focus::Prompt
        };
        Self {
            api_key: form.api_key,
            prompt: form.prompt,
            model: form.model,
            focus,
        }
    }

    fn form(&self) -> RequestForm {
        RequestForm {
            api_key: self.api_key.clone(),
            prompt: self.prompt.clone(),
            model: self.model,
        }
    }

    fn focused_text(&mut self) -> Option<&mut String> {
        match self.focus {
            Focus::ApiKey => Some(&mut self.api_key),
            Focus::Prompt => Some(&mut self.prompt),
            Focus::Model => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    None,
    Submit,
    Copy,
    Quit,
}

pub async fn run_tui(controller: Controller, form: RequestForm) -> anyhow::Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("enter alt screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let (ev_tx, mut ev_rx) = mpsc::unbounded_channel::<Event>();
    std::thread::spawn(move || {
        while let Ok(ev) = crossterm::event::read() {
            if ev_tx.send(ev).is_err() {
                break;
            }
        }
    });

    let clip = clipboard::system();
    let mut inputs = Inputs::new(form);
    let started = Instant::now();
    let mut ticker = tokio::time::interval(std::time::Duration::from_millis(33));

    let res = loop {
        tokio::select! {
            _ = ticker.tick() => {
                let view = controller.view();
                if let Err(e) = terminal.draw(|f| draw(f, &view, &inputs, started)) {
                    break Err(anyhow::Error::new(e).context("draw"));
                }
            }
            Some(ev) = ev_rx.recv() => {
                let Event::Key(key) = ev else { continue };
                match handle_key(key, &mut inputs) {
                    Action::Quit => break Ok(()),
                    Action::Submit => submit(&controller, &inputs),
                    Action::Copy => {
                        controller.copy(clip.as_ref());
                    }
                    Action::None => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    res
}

fn submit(controller: &Controller, inputs: &Inputs) {
    if let Submission::Started(exchange) = controller.submit(&inputs.form()) {
        tokio::spawn(async move {
            exchange.run().await;
        });
    }
}

fn handle_key(key: KeyEvent, inputs: &mut Inputs) -> Action {
    if key.kind != KeyEventKind::Press {
        return Action::None;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Action::Quit,
            KeyCode::Char('y') => Action::Copy,
            _ => Action::None,
        };
    }

    match key.code {
        KeyCode::Esc => return Action::Quit,
        KeyCode::Enter => return Action::Submit,
        KeyCode::Tab => inputs.focus = inputs.focus.next(),
        KeyCode::BackTab => inputs.focus = inputs.focus.prev(),
        KeyCode::Left if inputs.focus == Focus::Model => inputs.model = inputs.model.prev(),
        KeyCode::Right if inputs.focus == Focus::Model => inputs.model = inputs.model.next(),
        KeyCode::Backspace => {
            if let Some(text) = inputs.focused_text() {
                text.pop();
            }
        }
        KeyCode::Char(c) => {
            if let Some(text) = inputs.focused_text() {
                text.push(c);
            }
        }
        _ => {}
    }

    Action::None
}

fn tone_style(tone: Tone) -> Style {
    match tone {
        Tone::Plain => Style::default(),
        Tone::Success => Style::default().fg(Color::Green),
        Tone::Error => Style::default().fg(Color::Red),
        Tone::Done => Style::default().fg(Color::Cyan),
    }
}

fn dot_style(dot: StatusDot) -> Style {
    match dot {
        StatusDot::Neutral => Style::default().fg(Color::DarkGray),
        StatusDot::Online => Style::default().fg(Color::Green),
        StatusDot::Error => Style::default().fg(Color::Red),
    }
}

fn shifted(r: Rect, dx: u16) -> Rect {
    Rect {
        x: r.x + dx.min(r.width),
        width: r.width.saturating_sub(dx),
        ..r
    }
}

fn field_block(title: &str, focused: bool) -> Block<'_> {
    let style = if focused {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Block::default().borders(Borders::ALL).border_style(style).title(title)
}

fn draw(f: &mut Frame, view: &View, inputs: &Inputs, started: Instant) {
    let now = Instant::now();
    let area = shifted(f.area(), view.shake_offset(ShakeTarget::Panel, now));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // status
            Constraint::Length(3), // api key
            Constraint::Length(5), // prompt
            Constraint::Length(3), // model
            Constraint::Length(3), // submit + metrics
            Constraint::Min(3),    // response
            Constraint::Length(1), // help
        ])
        .split(area);

    let status = Line::from(vec![
        Span::styled("● ", dot_style(view.status_dot)),
        Span::styled(view.status_text.clone(), tone_style(view.status_tone)),
    ]);
    f.render_widget(
        Paragraph::new(status).block(Block::default().borders(Borders::ALL).title("gemini-probe")),
        chunks[0],
    );

    let key_area = shifted(chunks[1], view.shake_offset(ShakeTarget::KeyInput, now));
    let masked: String = "•".repeat(inputs.api_key.chars().count());
    f.render_widget(
        Paragraph::new(masked).block(field_block("API KEY", inputs.focus == Focus::ApiKey)),
        key_area,
    );

    f.render_widget(
        Paragraph::new(inputs.prompt.as_str())
            .block(field_block("PROMPT", inputs.focus == Focus::Prompt))
            .wrap(Wrap { trim: false }),
        chunks[2],
    );

    f.render_widget(
        Paragraph::new(format!("< {} >", inputs.model))
            .block(field_block("MODEL", inputs.focus == Focus::Model)),
        chunks[3],
    );

    let row = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(10)])
        .split(chunks[4]);

    let submit_label = if view.busy {
        let frame = (now.duration_since(started).as_millis() / 100) as usize % SPINNER.len();
        format!("{} WORKING", SPINNER[frame])
    } else {
        "SEND REQUEST".to_string()
    };
    let submit_style = if view.submit_enabled {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    f.render_widget(
        Paragraph::new(Span::styled(submit_label, submit_style))
            .block(Block::default().borders(Borders::ALL).title("Enter")),
        row[0],
    );

    let metrics = Line::from(vec![
        Span::raw("LATENCY "),
        Span::styled(view.latency.clone(), tone_style(view.metrics_tone)),
        Span::raw("   STATUS "),
        Span::styled(view.http_status.clone(), tone_style(view.metrics_tone)),
    ]);
    f.render_widget(
        Paragraph::new(metrics).block(Block::default().borders(Borders::ALL).title("metrics")),
        row[1],
    );

    if view.results_visible {
        let copy_style = if view.copy_confirmed {
            Style::default().fg(Color::Green)
        } else {
            Style::default()
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title("RESPONSE")
            .title_top(Line::from(Span::styled(format!("Ctrl-Y {}", view.copy_label), copy_style)).right_aligned());
        f.render_widget(
            Paragraph::new(Text::styled(view.response.clone(), tone_style(view.response_tone)))
                .block(block)
                .wrap(Wrap { trim: false }),
            chunks[5],
        );
    }

    f.render_widget(
        Paragraph::new("Tab/Shift-Tab: field  ←/→: model  Enter: send  Ctrl-Y: copy  Esc: quit")
            .style(Style::default().fg(Color::DarkGray)),
        chunks[6],
    );

    let cursor = match inputs.focus {
        Focus::ApiKey => Some((key_area, inputs.api_key.chars().count())),
        Focus::Prompt => Some((chunks[2], inputs.prompt.chars().count())),
        Focus::Model => None,
    };
    if let Some((r, len)) = cursor {
        f.set_cursor_position((cursor_x(r, len), r.y + 1));
    }
}

/// Column after `len` characters inside the bordered field `r`, clamped to
/// the last inner cell.
fn cursor_x(r: Rect, len: usize) -> u16 {
    let len = u16::try_from(len).unwrap_or(u16::MAX);
    let x = r.x.saturating_add(1).saturating_add(len);
    x.min(r.x.saturating_add(r.width.saturating_sub(2)))
}
