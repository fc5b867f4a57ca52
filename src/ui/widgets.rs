//! Custom widgets for the recite TUI.

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{block::BorderType, Block, Borders, Gauge, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthChar;

use super::theme::{icons, Theme};
use crate::models::{ProgressSummary, Status};

// ══════════════════════════════════════════════════════════════════════════
// Logo Widget
// ══════════════════════════════════════════════════════════════════════════

pub struct Logo;

impl Logo {
    const ART: &'static str = r#"
                 _ _
  _ __ ___  ___(_) |_ ___
 | '__/ _ \/ __| | __/ _ \
 | | |  __/ (__| | ||  __/
 |_|  \___|\___|_|\__\___|"#;

    pub fn render_to(theme: &Theme, area: Rect, buf: &mut Buffer) {
        let lines: Vec<Line> = Self::ART
            .lines()
            .skip(1)
            .map(|line| Line::from(Span::styled(line, Style::default().fg(theme.colors.primary))))
            .collect();

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .render(area, buf);
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Summary Bar Widget
// ══════════════════════════════════════════════════════════════════════════

/// Per-status counts plus the number of items due today.
pub struct SummaryBar<'a> {
    summary: ProgressSummary,
    due: usize,
    theme: &'a Theme,
}

impl<'a> SummaryBar<'a> {
    pub fn new(summary: ProgressSummary, due: usize, theme: &'a Theme) -> Self {
        Self { summary, due, theme }
    }
}

impl Widget for SummaryBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::horizontal([Constraint::Percentage(25); 4]).split(area);

        for (i, status) in Status::ALL.iter().enumerate() {
            let color = status.color_for_theme(self.theme);
            let line = Line::from(vec![
                Span::styled("● ", Style::default().fg(color)),
                Span::styled(
                    format!("{}: ", status.name()),
                    Style::default().fg(self.theme.colors.text_muted),
                ),
                Span::styled(
                    self.summary.count(*status).to_string(),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
            ]);
            Paragraph::new(line)
                .alignment(Alignment::Center)
                .render(chunks[i], buf);
        }

        let due = if self.due > 0 {
            Line::from(vec![
                Span::raw(format!("{} ", icons::BELL)),
                Span::styled("Due today: ", Style::default().fg(self.theme.colors.text_muted)),
                Span::styled(self.due.to_string(), self.theme.stats_due()),
            ])
        } else {
            Line::from(Span::styled(
                "Nothing due",
                Style::default().fg(self.theme.colors.text_dim),
            ))
        };
        Paragraph::new(due)
            .alignment(Alignment::Center)
            .render(chunks[3], buf);
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Goal Widget
// ══════════════════════════════════════════════════════════════════════════

/// Monthly goal gauge with the streak beside it.
pub struct GoalWidget<'a> {
    goal: u32,
    completed_this_month: usize,
    total_completed: usize,
    streak: u32,
    theme: &'a Theme,
}

impl<'a> GoalWidget<'a> {
    pub fn new(
        goal: u32,
        completed_this_month: usize,
        total_completed: usize,
        streak: u32,
        theme: &'a Theme,
    ) -> Self {
        Self {
            goal,
            completed_this_month,
            total_completed,
            streak,
            theme,
        }
    }
}

impl Widget for GoalWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(self.theme.colors.primary))
            .title(" This month ")
            .title_style(self.theme.highlight());
        let inner = block.inner(area);
        block.render(area, buf);

        let rows = Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).split(inner);

        let ratio = (self.completed_this_month as f64 / self.goal.max(1) as f64).min(1.0);
        Gauge::default()
            .gauge_style(
                Style::default()
                    .fg(self.theme.colors.status_mastered)
                    .bg(self.theme.colors.bg_elevated),
            )
            .ratio(ratio)
            .label(format!("{} / {}", self.completed_this_month, self.goal))
            .render(rows[0], buf);

        let streak = if self.streak > 0 {
            format!("{} {} day streak", icons::FIRE, self.streak)
        } else {
            "No streak yet".to_string()
        };
        let info = Line::from(vec![
            Span::styled(
                format!("Mastered overall: {}   ", self.total_completed),
                Style::default().fg(self.theme.colors.text_muted),
            ),
            Span::styled(streak, Style::default().fg(self.theme.colors.warning)),
        ]);
        Paragraph::new(info)
            .alignment(Alignment::Center)
            .render(rows[1], buf);
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Flashcard Widget
// ══════════════════════════════════════════════════════════════════════════

pub struct FlashcardWidget<'a> {
    content: &'a str,
    is_front: bool,
    theme: &'a Theme,
}

impl<'a> FlashcardWidget<'a> {
    pub fn new(content: &'a str, is_front: bool, theme: &'a Theme) -> Self {
        Self { content, is_front, theme }
    }
}

impl Widget for FlashcardWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (label, label_style, border_style) = if self.is_front {
            ("REFERENCE", self.theme.card_front(), Style::default().fg(self.theme.colors.accent))
        } else {
            ("TEXT", self.theme.card_back(), Style::default().fg(self.theme.colors.success))
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(border_style)
            .title(Line::from(vec![
                Span::raw(" "),
                Span::styled(label, label_style),
                Span::raw(" "),
            ]))
            .title_alignment(Alignment::Center);

        let inner = block.inner(area);
        block.render(area, buf);

        let content_width = inner.width.saturating_sub(4);

        // Center vertically using the wrapped height, not the raw line count.
        let content_height = if content_width > 0 {
            textwrap::wrap(self.content, content_width as usize).len() as u16
        } else {
            0
        };
        let vertical_padding = inner.height.saturating_sub(content_height) / 2;

        let content_area = Rect {
            x: inner.x + 2,
            y: inner.y + vertical_padding,
            width: content_width,
            height: inner.height.saturating_sub(vertical_padding),
        };

        Paragraph::new(self.content)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(self.theme.colors.text))
            .render(content_area, buf);
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Word Bank Widget
// ══════════════════════════════════════════════════════════════════════════

/// Numbered choices; used ones are dimmed.
pub struct WordBank<'a> {
    words: Vec<(&'a str, bool)>,
    enabled: bool,
    theme: &'a Theme,
}

impl<'a> WordBank<'a> {
    pub fn new(words: Vec<(&'a str, bool)>, enabled: bool, theme: &'a Theme) -> Self {
        Self { words, enabled, theme }
    }
}

impl Widget for WordBank<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut spans = Vec::new();
        for (i, (word, used)) in self.words.iter().enumerate() {
            let key = choice_key(i).map(String::from).unwrap_or_else(|| " ".into());
            let style = if *used || !self.enabled {
                Style::default().fg(self.theme.colors.text_dim)
            } else {
                Style::default().fg(self.theme.colors.text)
            };
            spans.push(Span::styled(format!("{} ", key), self.theme.key_highlight()));
            spans.push(Span::styled(format!("{}   ", word), style));
        }

        Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(self.theme.colors.text_dim))
                    .title(" Word bank ")
                    .title_style(Style::default().fg(self.theme.colors.text_muted)),
            )
            .render(area, buf);
    }
}

/// Key that selects the `index`-th choice: 1-9 then 0.
pub fn choice_key(index: usize) -> Option<char> {
    match index {
        0..=8 => char::from_digit(index as u32 + 1, 10),
        9 => Some('0'),
        _ => None,
    }
}

/// Inverse of [`choice_key`].
pub fn choice_index(c: char) -> Option<usize> {
    match c {
        '1'..='9' => c.to_digit(10).map(|d| d as usize - 1),
        '0' => Some(9),
        _ => None,
    }
}

/// Render text split on blanks as styled lines, with each blank showing its
/// filled word (or a placeholder) and, once checked, right/wrong coloring.
pub fn blank_lines<'a>(
    parts: &[&'a str],
    filled: &[Option<String>],
    checked: &[Option<bool>],
    theme: &Theme,
) -> Vec<Line<'a>> {
    let mut lines = vec![Vec::new()];

    for (i, part) in parts.iter().enumerate() {
        for (n, segment) in part.split('\n').enumerate() {
            if n > 0 {
                lines.push(Vec::new());
            }
            if !segment.is_empty() {
                if let Some(current) = lines.last_mut() {
                    current.push(Span::styled(segment, Style::default().fg(theme.colors.text)));
                }
            }
        }

        if i + 1 < parts.len() {
            let word = filled.get(i).cloned().flatten();
            let style = match checked.get(i).copied().flatten() {
                Some(true) => Style::default()
                    .fg(theme.colors.success)
                    .add_modifier(Modifier::BOLD),
                Some(false) => theme.error_text(),
                None => theme.blank(),
            };
            let label = format!(" {} ", word.as_deref().unwrap_or("_____"));
            if let Some(current) = lines.last_mut() {
                current.push(Span::styled(label, style));
            }
        }
    }

    lines.into_iter().map(Line::from).collect()
}

/// Cut a string to at most `width` terminal columns, adding an ellipsis.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    let first_line = text.lines().next().unwrap_or("");
    let mut used = 0;
    let mut out = String::new();
    for c in first_line.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width.saturating_sub(1) {
            out.push('…');
            return out;
        }
        used += w;
        out.push(c);
    }
    if text.lines().nth(1).is_some() && used < width {
        out.push('…');
    }
    out
}

// ══════════════════════════════════════════════════════════════════════════
// Key Hints Widget
// ══════════════════════════════════════════════════════════════════════════

pub struct KeyHints<'a> {
    hints: &'a [(&'a str, &'a str)],
    theme: &'a Theme,
}

impl<'a> KeyHints<'a> {
    pub fn new(hints: &'a [(&'a str, &'a str)], theme: &'a Theme) -> Self {
        Self { hints, theme }
    }
}

impl Widget for KeyHints<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let spans: Vec<Span> = self
            .hints
            .iter()
            .flat_map(|(key, desc)| {
                vec![
                    Span::styled(*key, self.theme.key_highlight()),
                    Span::styled(format!(" {} ", desc), self.theme.key_hint()),
                    Span::styled("│ ", Style::default().fg(self.theme.colors.text_dim)),
                ]
            })
            .collect();

        Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}
