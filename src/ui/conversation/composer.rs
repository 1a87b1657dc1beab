use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::block::{Position, Title},
    widgets::{Block, Borders, Widget},
};

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    Submitted(String),
    None,
}

/// Cursor state for the single-line message input.
///
/// The text itself lives in the conversation controller; the composer only
/// tracks where the cursor sits in it (in chars).
#[derive(Debug, Clone, Default)]
pub struct ConversationComposer {
    cursor: usize,
}

impl ConversationComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle key input against the pending text.
    ///
    /// Enter only yields a submission when `can_submit` is set and the text is
    /// not blank; the text is left in place for the controller to clear.
    pub fn handle_key(&mut self, key: KeyEvent, input: &mut String, can_submit: bool) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        self.cursor = self.cursor.min(input.chars().count());

        match key.code {
            KeyCode::Enter => {
                if can_submit && !input.trim().is_empty() {
                    return ComposerResult::Submitted(input.clone());
                }
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                let at = byte_index(input, self.cursor);
                input.insert(at, c);
                self.cursor += 1;
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = byte_index(input, self.cursor);
                    input.remove(at);
                }
            }
            KeyCode::Delete => {
                if self.cursor < input.chars().count() {
                    let at = byte_index(input, self.cursor);
                    input.remove(at);
                }
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(input.chars().count());
            }
            KeyCode::Home => {
                self.cursor = 0;
            }
            KeyCode::End => {
                self.cursor = input.chars().count();
            }
            _ => {}
        }

        ComposerResult::None
    }

    pub fn view<'a>(&self, input: &'a str, placeholder: &'a str, awaiting: bool) -> ComposerView<'a> {
        ComposerView {
            input,
            placeholder,
            cursor: self.cursor.min(input.chars().count()),
            awaiting,
        }
    }
}

fn byte_index(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Render-time snapshot of the composer
pub struct ComposerView<'a> {
    input: &'a str,
    placeholder: &'a str,
    cursor: usize,
    awaiting: bool,
}

impl Widget for ComposerView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let can_send = !self.awaiting && !self.input.trim().is_empty();
        let send_style = if can_send {
            Style::default().fg(Color::Blue)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let block = Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(
                Title::from(Span::styled("Enter ➤ send", send_style))
                    .position(Position::Bottom)
                    .alignment(Alignment::Right),
            );

        let inner = block.inner(area);
        block.render(area, buf);

        let line = if self.input.is_empty() {
            Line::from(Span::styled(self.placeholder, Style::default().fg(Color::DarkGray)))
        } else {
            let mut content: String = self.input.to_string();
            if !self.awaiting {
                content.insert(byte_index(&content, self.cursor), '▌');
            }
            Line::from(Span::raw(content))
        };

        buf.set_line(inner.x, inner.y, &line, inner.width);
    }
}
