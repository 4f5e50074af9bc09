use engage_core::formatting::{format_count, percentage};
use ratatui::style::Style;
use ratatui::text::{Line, Span};

use crate::text::fit_width;
use crate::themes::Theme;

/// Configuration controlling the visual appearance of a share bar.
pub struct ShareBarConfig {
    /// Width in terminal columns of the bar portion (excluding labels).
    pub width: u16,
    /// Width reserved for the category label in front of the bar.
    pub label_width: u16,
    /// Character used to fill the category's share.
    pub filled_char: char,
    /// Character used for the rest of the bar.
    pub empty_char: char,
}

impl Default for ShareBarConfig {
    fn default() -> Self {
        Self {
            width: 40,
            label_width: 16,
            filled_char: '\u{2588}', // █  FULL BLOCK
            empty_char: '\u{2591}',  // ░  LIGHT SHADE
        }
    }
}

// ── ShareBar ─────────────────────────────────────────────────────────────────

/// One category's share of a whole, drawn as a horizontal bar.
///
/// Renders as `label ████░░░░ 66.7% (4)`.
pub struct ShareBar<'a> {
    pub label: String,
    pub count: u64,
    /// Share of the total in percent, in `[0.0, 100.0]`.
    pub percentage: f64,
    pub style: Style,
    pub theme: &'a Theme,
    pub config: ShareBarConfig,
}

impl<'a> ShareBar<'a> {
    /// Construct a bar for `count` out of `total`.
    pub fn new(label: impl Into<String>, count: u64, total: u64, style: Style, theme: &'a Theme) -> Self {
        Self {
            label: label.into(),
            count,
            percentage: percentage(count as f64, total as f64, 1).min(100.0),
            style,
            theme,
            config: ShareBarConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ShareBarConfig) -> Self {
        self.config = config;
        self
    }

    /// Render the bar as a [`Line`].
    pub fn to_line(&self) -> Line<'a> {
        let filled = ((self.percentage / 100.0) * self.config.width as f64).round() as u16;
        let filled = filled.min(self.config.width);
        let empty = self.config.width - filled;

        let filled_str: String =
            std::iter::repeat_n(self.config.filled_char, filled as usize).collect();
        let empty_str: String =
            std::iter::repeat_n(self.config.empty_char, empty as usize).collect();

        Line::from(vec![
            Span::styled(
                format!("{} ", fit_width(&self.label, self.config.label_width as usize)),
                self.theme.label,
            ),
            Span::styled(filled_str, self.style),
            Span::styled(empty_str, self.theme.share_empty),
            Span::styled(
                format!(" {:>5.1}% ({})", self.percentage, format_count(self.count)),
                self.theme.value,
            ),
        ])
    }
}

// ── ProportionStrip ──────────────────────────────────────────────────────────

/// A single multi-coloured strip in which every category takes a segment
/// proportional to its share.
pub struct ProportionStrip<'a> {
    /// Ordered `(style, count)` segments.
    pub segments: Vec<(Style, u64)>,
    pub width: u16,
    pub theme: &'a Theme,
}

impl<'a> ProportionStrip<'a> {
    pub fn new(segments: Vec<(Style, u64)>, width: u16, theme: &'a Theme) -> Self {
        Self {
            segments,
            width,
            theme,
        }
    }

    /// Render the strip as a [`Line`]. Segment widths always add up to the
    /// full strip width when the total is non-zero.
    pub fn to_line(&self) -> Line<'a> {
        let total: u64 = self.segments.iter().map(|(_, n)| *n).sum();
        if total == 0 || self.width == 0 {
            return Line::from(Span::styled(
                "\u{2591}".repeat(self.width as usize),
                self.theme.share_empty,
            ));
        }

        // Cumulative rounding keeps the sum exact.
        let mut spans: Vec<Span<'a>> = Vec::new();
        let mut running = 0u64;
        let mut drawn = 0usize;
        for (style, count) in &self.segments {
            running += count;
            let end = ((running as f64 / total as f64) * self.width as f64).round() as usize;
            let chars = end.saturating_sub(drawn);
            if chars > 0 {
                spans.push(Span::styled("\u{2588}".repeat(chars), *style));
            }
            drawn = end;
        }

        Line::from(spans)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
