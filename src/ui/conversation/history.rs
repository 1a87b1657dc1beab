//! Transcript display component

use crate::events::{DisplayMessage, Sender};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// Transcript of the conversation, newest entries anchored to the bottom
pub struct ConversationHistory<'a> {
    messages: &'a [DisplayMessage],
    is_typing: bool,
}

impl<'a> ConversationHistory<'a> {
    pub fn new(messages: &'a [DisplayMessage], is_typing: bool) -> Self {
        Self { messages, is_typing }
    }
}

/// A rendered row and whether it hugs the right edge
struct Row {
    line: Line<'static>,
    right: bool,
}

impl Widget for ConversationHistory<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        // bubbles take at most three quarters of the panel
        let bubble_width = (area.width as usize * 3 / 4).max(8);
        let mut rows = Vec::new();

        for message in self.messages {
            rows.extend(render_message(message, bubble_width));
            rows.push(Row { line: Line::default(), right: false });
        }

        if self.is_typing {
            rows.push(Row { line: typing_indicator(), right: false });
        }

        let height = area.height as usize;
        let start = rows.len().saturating_sub(height);

        for (i, row) in rows[start..].iter().enumerate() {
            let y = area.y + i as u16;
            let width = row.line.width() as u16;
            let x = if row.right {
                area.x + area.width.saturating_sub(width)
            } else {
                area.x
            };
            buf.set_line(x, y, &row.line, area.right() - x);
        }
    }
}

fn render_message(message: &DisplayMessage, width: usize) -> Vec<Row> {
    let right = message.is_user();
    let (label, style) = match message.sender {
        Sender::User => ("You", Style::default().fg(Color::White).bg(Color::Blue)),
        Sender::Bot => ("SoftSell", Style::default().fg(Color::Black).bg(Color::Gray)),
    };

    let header = format!("{} · {}", label, message.sent_at.format("%H:%M"));
    let mut rows = vec![Row {
        line: Line::from(Span::styled(header, Style::default().fg(Color::DarkGray))),
        right,
    }];

    for text in wrap_text(&message.text, width.saturating_sub(2)) {
        rows.push(Row {
            line: Line::from(Span::styled(format!(" {} ", text), style)),
            right,
        });
    }

    rows
}

fn typing_indicator() -> Line<'static> {
    let phase = (chrono::Utc::now().timestamp_millis() / 200).rem_euclid(3) as usize;
    let dots: Vec<Span> = (0..3)
        .map(|i| {
            let color = if i == phase { Color::White } else { Color::DarkGray };
            Span::styled("● ", Style::default().fg(color).bg(Color::Gray))
        })
        .collect();
    Line::from(dots)
}

/// Wrap text to fit within the given width
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current_line = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let word_len = word.chars().count();
            if current_len > 0 && current_len + 1 + word_len > width {
                lines.push(std::mem::take(&mut current_line));
                current_len = 0;
            }
            if current_len > 0 {
                current_line.push(' ');
                current_len += 1;
            }
            current_line.push_str(word);
            current_len += word_len;
        }

        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}
