use crate::conversation::{ConversationController, PendingExchange};
use crate::error::CompletionError;
use crate::events::PanelState;
use crate::llm::{CompletionBackend, CompletionReply};
use crate::prompts::{INPUT_PLACEHOLDER, WIDGET_TITLE};
use crate::ui::conversation::{ComposerResult, ConversationComposer, ConversationHistory, SuggestionChips};
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, MissedTickBehavior};

const TICK: Duration = Duration::from_millis(50);
const PANEL_WIDTH: u16 = 56;
const PANEL_HEIGHT: u16 = 24;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// A request running on its own task
struct InFlight {
    pending: PendingExchange,
    result_rx: oneshot::Receiver<Result<CompletionReply, CompletionError>>,
}

/// Drives the chat widget: routes keys into the controller, runs requests off
/// the UI loop and draws the panel.
pub struct ConversationManager<B> {
    controller: ConversationController<B>,
    composer: ConversationComposer,
    chips: SuggestionChips,
    questions: Vec<String>,
    in_flight: Option<InFlight>,
}

impl<B> ConversationManager<B>
where
    B: CompletionBackend + Clone + Send + Sync + 'static,
{
    pub fn new(controller: ConversationController<B>, questions: Vec<String>) -> Self {
        Self {
            controller,
            composer: ConversationComposer::new(),
            chips: SuggestionChips::new(),
            questions,
            in_flight: None,
        }
    }

    pub fn controller(&self) -> &ConversationController<B> {
        &self.controller
    }

    /// Run the widget until the user quits
    pub async fn run<T: Backend>(&mut self, terminal: &mut Terminal<T>) -> Result<()> {
        let events = spawn_event_reader();
        self.run_with_events(terminal, events).await
    }

    /// Drive the loop from an event channel. Redraws on every event and on
    /// each tick so replies and the typing indicator show up without input.
    pub async fn run_with_events<T: Backend>(
        &mut self,
        terminal: &mut Terminal<T>,
        mut events: mpsc::UnboundedReceiver<io::Result<Event>>,
    ) -> Result<()> {
        let mut tick = tokio::time::interval(TICK);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            self.poll_in_flight();
            terminal.draw(|frame| self.draw(frame))?;

            tokio::select! {
                _ = tick.tick() => {}
                event = events.recv() => match event {
                    Some(Ok(Event::Key(key))) => {
                        if self.handle_key(key) == ConversationAction::Exit {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => return Err(err).context("Failed to read terminal event"),
                    None => break,
                },
            }
        }

        Ok(())
    }

    /// Apply the in-flight result if it has arrived.
    ///
    /// A task that went away without reporting resolves as interrupted, so
    /// the controller never stays stuck awaiting.
    pub fn poll_in_flight(&mut self) {
        let Some(mut in_flight) = self.in_flight.take() else {
            return;
        };

        match in_flight.result_rx.try_recv() {
            Ok(outcome) => {
                self.controller.resolve(in_flight.pending, outcome);
            }
            Err(oneshot::error::TryRecvError::Empty) => {
                self.in_flight = Some(in_flight);
            }
            Err(oneshot::error::TryRecvError::Closed) => {
                self.controller
                    .resolve(in_flight.pending, Err(CompletionError::Interrupted));
            }
        }
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => return ConversationAction::Exit,
            KeyCode::F(2) => {
                self.controller.toggle_panel();
                return ConversationAction::None;
            }
            KeyCode::Char('t') if ctrl => {
                self.controller.toggle_panel();
                return ConversationAction::None;
            }
            _ => {}
        }

        if !self.controller.is_panel_open() {
            match key.code {
                KeyCode::Enter => self.controller.toggle_panel(),
                KeyCode::Char('q') | KeyCode::Esc => return ConversationAction::Exit,
                _ => {}
            }
            return ConversationAction::None;
        }

        match key.code {
            KeyCode::Esc => {
                self.controller.close_panel();
            }
            KeyCode::Tab if self.controller.shows_suggestions() => {
                self.chips.cycle(self.questions.len());
            }
            KeyCode::Enter
                if self.controller.pending_input().trim().is_empty()
                    && self.controller.shows_suggestions() =>
            {
                if let Some(question) = self.chips.selected(&self.questions).map(str::to_string) {
                    self.dispatch(&question);
                }
            }
            _ => {
                let can_submit = !self.controller.is_awaiting_response();
                let result = self
                    .composer
                    .handle_key(key, self.controller.pending_input_mut(), can_submit);
                if let ComposerResult::Submitted(text) = result {
                    self.dispatch(&text);
                }
            }
        }

        ConversationAction::None
    }

    /// Hand a submission to the controller and issue its request on a task
    fn dispatch(&mut self, text: &str) {
        let Some(pending) = self.controller.begin_submit(text) else {
            return;
        };
        self.chips.clear();

        let backend = self.controller.backend().clone();
        let request = pending.request().clone();
        let (tx, result_rx) = oneshot::channel();

        tokio::spawn(async move {
            let outcome = backend.complete(&request).await;
            // receiver only disappears when the widget is shutting down
            let _ = tx.send(outcome);
        });

        self.in_flight = Some(InFlight { pending, result_rx });
    }

    pub fn draw(&self, frame: &mut Frame) {
        let area = frame.size();
        self.draw_backdrop(frame, area);

        match self.controller.panel_state() {
            PanelState::Closed => self.draw_launcher(frame, area),
            PanelState::Idle | PanelState::Awaiting => self.draw_panel(frame, area),
        }
    }

    fn draw_backdrop(&self, frame: &mut Frame, area: Rect) {
        let lines = vec![
            Line::from(Span::styled(
                "SoftSell",
                Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            )),
            Line::from("Turn unused software licenses into cash."),
            Line::from(""),
            Line::from(Span::styled(
                "F2 chat · Ctrl+C quit",
                Style::default().fg(Color::DarkGray),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        let top = Rect { height: area.height.min(4), ..area };
        frame.render_widget(paragraph, top);
    }

    fn draw_launcher(&self, frame: &mut Frame, area: Rect) {
        let label = Span::styled(" 💬 Open chat (F2) ", Style::default().fg(Color::White).bg(Color::Blue));
        let width = (label.width() as u16 + 2).min(area.width);
        let height = 3.min(area.height);
        let launcher = Rect {
            x: area.x + area.width.saturating_sub(width + 1),
            y: area.y + area.height.saturating_sub(height),
            width,
            height,
        };

        let button = Paragraph::new(Line::from(label)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(Color::Blue)),
        );
        frame.render_widget(button, launcher);
    }

    fn draw_panel(&self, frame: &mut Frame, area: Rect) {
        let width = PANEL_WIDTH.min(area.width);
        let height = PANEL_HEIGHT.min(area.height);
        let panel = Rect {
            x: area.x + area.width.saturating_sub(width + 1),
            y: area.y + area.height.saturating_sub(height),
            width,
            height,
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Blue))
            .title(Span::styled(
                format!(" 💬 {} ", WIDGET_TITLE),
                Style::default().fg(Color::White).bg(Color::Blue).add_modifier(Modifier::BOLD),
            ))
            .title_alignment(Alignment::Left);

        let inner = block.inner(panel);
        frame.render_widget(Clear, panel);
        frame.render_widget(block, panel);

        let suggestions_height = if self.controller.shows_suggestions() {
            SuggestionChips::height(&self.questions, inner.width)
        } else {
            0
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),                     // Transcript
                Constraint::Length(suggestions_height), // Suggestions
                Constraint::Length(3),                  // Composer
            ])
            .split(inner);

        frame.render_widget(
            ConversationHistory::new(
                self.controller.display_messages(),
                self.controller.is_awaiting_response(),
            ),
            chunks[0],
        );

        if suggestions_height > 0 {
            frame.render_widget(self.chips.view(&self.questions), chunks[1]);
        }

        frame.render_widget(
            self.composer.view(
                self.controller.pending_input(),
                INPUT_PLACEHOLDER,
                self.controller.is_awaiting_response(),
            ),
            chunks[2],
        );
    }
}

/// Read terminal events on the blocking pool and forward them to the loop.
///
/// The reader stops once the receiving side is dropped.
fn spawn_event_reader() -> mpsc::UnboundedReceiver<io::Result<Event>> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::task::spawn_blocking(move || {
        while !tx.is_closed() {
            match event::poll(TICK) {
                Ok(false) => {}
                Ok(true) => {
                    if tx.send(event::read()).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    let _ = tx.send(Err(err));
                    break;
                }
            }
        }
    });

    rx
}
