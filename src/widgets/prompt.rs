//! A small multi-field input modal: labeled text fields, Tab to move
//! between them, Enter to confirm, Esc to cancel.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};

#[derive(Debug, Clone)]
pub struct PromptField {
    pub label: String,
    pub value: String,
    /// Render the value as asterisks (passwords).
    pub masked: bool,
}

impl PromptField {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            value: String::new(),
            masked: false,
        }
    }

    pub fn with_value(label: &str, value: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            value: value.into(),
            masked: false,
        }
    }

    pub fn masked(label: &str) -> Self {
        Self {
            label: label.to_string(),
            value: String::new(),
            masked: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Prompt {
    pub title: String,
    pub fields: Vec<PromptField>,
    pub active: usize,
}

impl Prompt {
    pub fn new(title: &str, fields: Vec<PromptField>) -> Self {
        Self {
            title: title.to_string(),
            fields,
            active: 0,
        }
    }

    pub fn next_field(&mut self) {
        self.active = (self.active + 1) % self.fields.len();
    }

    pub fn prev_field(&mut self) {
        self.active = if self.active == 0 {
            self.fields.len() - 1
        } else {
            self.active - 1
        };
    }

    pub fn insert_char(&mut self, c: char) {
        self.fields[self.active].value.push(c);
    }

    pub fn backspace(&mut self) {
        self.fields[self.active].value.pop();
    }

    /// The trimmed value of field `idx`.
    pub fn value(&self, idx: usize) -> &str {
        self.fields[idx].value.trim()
    }
}

/// Center a `width` x `height` box inside `area`, clamped to fit.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

pub struct PromptView<'a> {
    pub prompt: &'a Prompt,
    pub accent: Color,
}

impl Widget for PromptView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let height = self.prompt.fields.len() as u16 + 3;
        let width = 64.min(area.width.saturating_sub(4)).max(20);
        let modal = centered(area, width, height);
        Clear.render(modal, buf);

        let mut lines = Vec::with_capacity(self.prompt.fields.len() + 1);
        for (idx, field) in self.prompt.fields.iter().enumerate() {
            let shown = if field.masked {
                "*".repeat(field.value.chars().count())
            } else {
                field.value.clone()
            };
            let style = if idx == self.prompt.active {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let cursor = if idx == self.prompt.active { "_" } else { "" };
            lines.push(Line::from(vec![
                Span::styled(format!("{}: ", field.label), style),
                Span::styled(format!("{shown}{cursor}"), style),
            ]));
        }
        lines.push(Line::from(Span::styled(
            "Enter confirm | Tab next field | Esc cancel",
            Style::default().add_modifier(Modifier::DIM),
        )));

        Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.accent))
                    .title(self.prompt.title.clone()),
            )
            .render(modal, buf);
    }
}
