//! Quick-question chips shown before the first exchange

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// Which chip, if any, is highlighted
#[derive(Debug, Clone, Default)]
pub struct SuggestionChips {
    selected: Option<usize>,
}

impl SuggestionChips {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the highlight to the next chip, wrapping around
    pub fn cycle(&mut self, count: usize) {
        if count == 0 {
            self.selected = None;
            return;
        }
        self.selected = Some(match self.selected {
            Some(index) => (index + 1) % count,
            None => 0,
        });
    }

    pub fn selected<'a>(&self, questions: &'a [String]) -> Option<&'a str> {
        self.selected
            .and_then(|index| questions.get(index))
            .map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    /// Rows needed to render `questions` in the given width, heading included
    pub fn height(questions: &[String], width: u16) -> u16 {
        1 + layout_rows(questions, width).len() as u16
    }

    pub fn view<'a>(&self, questions: &'a [String]) -> SuggestionsView<'a> {
        SuggestionsView { questions, selected: self.selected }
    }
}

/// Greedily pack chips into rows; each row lists chip indices
fn layout_rows(questions: &[String], width: u16) -> Vec<Vec<usize>> {
    let width = width as usize;
    let mut rows: Vec<Vec<usize>> = Vec::new();
    let mut used = 0;

    for (index, question) in questions.iter().enumerate() {
        let chip = chip_width(question);
        match rows.last_mut() {
            Some(row) if used + chip <= width => {
                row.push(index);
                used += chip;
            }
            _ => {
                rows.push(vec![index]);
                used = chip;
            }
        }
    }

    rows
}

fn chip_width(question: &str) -> usize {
    // "( question ) "
    question.chars().count() + 5
}

pub struct SuggestionsView<'a> {
    questions: &'a [String],
    selected: Option<usize>,
}

impl Widget for SuggestionsView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }

        let heading = Line::from(Span::styled(
            "Frequently asked questions (Tab to pick):",
            Style::default().fg(Color::DarkGray),
        ));
        buf.set_line(area.x, area.y, &heading, area.width);

        for (row_index, row) in layout_rows(self.questions, area.width).iter().enumerate() {
            let y = area.y + 1 + row_index as u16;
            if y >= area.y + area.height {
                break;
            }

            let spans: Vec<Span> = row
                .iter()
                .map(|&index| {
                    let style = if self.selected == Some(index) {
                        Style::default().fg(Color::White).bg(Color::Blue).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(Color::Blue)
                    };
                    Span::styled(format!("( {} ) ", self.questions[index]), style)
                })
                .collect();
            buf.set_line(area.x, y, &Line::from(spans), area.width);
        }
    }
}
