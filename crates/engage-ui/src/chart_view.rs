//! Chart rendering.
//!
//! Draws a [`PreparedChart`] into a ratatui [`Buffer`]: counts as a horizontal
//! bar chart, histogram bins as vertical bars, proportions as share bars and
//! rates as a scatter plot.

use engage_core::chart::{ChartData, ChartKind, PreparedChart};
use engage_core::formatting::{format_count, format_rate};
use engage_core::models::{GroupResult, HistogramBin};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    symbols,
    text::{Line, Span, Text},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Chart, Dataset, GraphType, Paragraph, Widget, Wrap,
    },
};

use crate::components::share_bar::{ProportionStrip, ShareBar, ShareBarConfig};
use crate::text::{buffer_to_string, truncate};
use crate::themes::Theme;

/// Message shown in place of a chart with nothing to draw.
pub const NO_DATA_MESSAGE: &str = "No data available for visualization.";

/// Draw `chart` into `area` of `buf`.
pub fn draw_chart(area: Rect, buf: &mut Buffer, chart: &PreparedChart, theme: &Theme) {
    if chart.data.is_empty() {
        render_no_data(area, buf, &chart.title, theme);
        return;
    }

    match (&chart.data, chart.kind) {
        (ChartData::Counts(counts), ChartKind::Pie) => draw_shares(area, buf, chart, counts, theme),
        (ChartData::Counts(counts), _) => draw_counts(area, buf, chart, counts, theme),
        (ChartData::Bins(bins), _) => draw_histogram(area, buf, chart, bins, theme),
        (ChartData::Rates(rates), _) => draw_rates(area, buf, chart, rates, theme),
    }
}

/// Render the "no data" placeholder for a chart titled `title`.
pub fn render_no_data(area: Rect, buf: &mut Buffer, title: &str, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(NO_DATA_MESSAGE, theme.warning)),
    ];
    Paragraph::new(Text::from(text))
        .block(titled_block(title, theme))
        .render(area, buf);
}

/// Rows `chart` would like to occupy. Histograms and scatter plots use
/// `base_height`; bar and pie charts grow with their categories up to three
/// times that.
pub fn preferred_height(chart: &PreparedChart, base_height: u16) -> u16 {
    let rows = chart.data.len().min(u16::MAX as usize) as u16;
    let cap = base_height.saturating_mul(3).max(5);
    match chart.kind {
        ChartKind::Bar => rows.saturating_add(2).clamp(5, cap),
        ChartKind::Pie => rows.saturating_add(4).clamp(5, cap),
        ChartKind::Histogram | ChartKind::Scatter => base_height.max(5),
    }
}

/// Draw `chart` into an off-screen buffer and return its plain text.
pub fn render_to_string(chart: &PreparedChart, theme: &Theme, width: u16, height: u16) -> String {
    let area = Rect::new(0, 0, width, preferred_height(chart, height));
    let mut buf = Buffer::empty(area);
    draw_chart(area, &mut buf, chart, theme);
    buffer_to_string(&buf)
}

/// Plain text of the "no data" placeholder.
pub fn no_data_to_string(title: &str, theme: &Theme, width: u16) -> String {
    let area = Rect::new(0, 0, width, 4);
    let mut buf = Buffer::empty(area);
    render_no_data(area, &mut buf, title, theme);
    buffer_to_string(&buf)
}

// ── Chart kinds ──────────────────────────────────────────────────────────────

fn draw_counts(
    area: Rect,
    buf: &mut Buffer,
    chart: &PreparedChart,
    counts: &GroupResult<u64>,
    theme: &Theme,
) {
    let block = titled_block(&chart.title, theme).title_bottom(axis_caption(chart, theme));
    let label_width = (block.inner(area).width / 3).clamp(4, 24) as usize;
    let style = theme.series_style(chart.color.as_deref());

    let bars: Vec<Bar> = counts
        .iter()
        .map(|(label, n)| {
            Bar::default()
                .label(Line::from(truncate(label, label_width)))
                .value(*n)
                .text_value(format_count(*n))
                .style(style)
        })
        .collect();

    BarChart::default()
        .block(block)
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .label_style(theme.label)
        .data(BarGroup::default().bars(&bars))
        .render(area, buf);
}

fn draw_histogram(
    area: Rect,
    buf: &mut Buffer,
    chart: &PreparedChart,
    bins: &[HistogramBin],
    theme: &Theme,
) {
    let block = titled_block(&chart.title, theme).title_bottom(axis_caption(chart, theme));
    let inner_width = block.inner(area).width as usize;
    let bar_width = (inner_width / bins.len().max(1)).saturating_sub(1).clamp(1, 12) as u16;
    let style = theme.series_style(chart.color.as_deref());

    let bars: Vec<Bar> = bins
        .iter()
        .map(|bin| {
            Bar::default()
                .label(Line::from(truncate(&bin.label(), bar_width as usize)))
                .value(bin.count)
                .text_value(format_count(bin.count))
                .style(style)
        })
        .collect();

    BarChart::default()
        .block(block)
        .bar_width(bar_width)
        .bar_gap(1)
        .label_style(theme.label)
        .data(BarGroup::default().bars(&bars))
        .render(area, buf);
}

fn draw_shares(
    area: Rect,
    buf: &mut Buffer,
    chart: &PreparedChart,
    counts: &GroupResult<u64>,
    theme: &Theme,
) {
    let block = titled_block(&chart.title, theme);
    let inner_width = block.inner(area).width;
    let total = counts.total();

    let longest = counts
        .labels()
        .iter()
        .map(|l| unicode_width::UnicodeWidthStr::width(*l))
        .max()
        .unwrap_or(0) as u16;
    let label_width = longest.clamp(3, (inner_width / 3).max(3));
    // Room for " 100.0% (n,nnn)" after the bar.
    let bar_width = inner_width.saturating_sub(label_width + 1 + 16).max(1);

    let mut lines = vec![
        ProportionStrip::new(
            counts
                .iter()
                .enumerate()
                .map(|(i, (_, n))| (theme.palette_style(i), *n))
                .collect(),
            inner_width,
            theme,
        )
        .to_line(),
        Line::from(""),
    ];

    for (i, (label, n)) in counts.iter().enumerate() {
        let bar = ShareBar::new(label, *n, total, theme.palette_style(i), theme).with_config(
            ShareBarConfig {
                width: bar_width,
                label_width,
                ..ShareBarConfig::default()
            },
        );
        lines.push(bar.to_line());
    }

    Paragraph::new(Text::from(lines)).block(block).render(area, buf);
}

fn draw_rates(
    area: Rect,
    buf: &mut Buffer,
    chart: &PreparedChart,
    rates: &GroupResult<f64>,
    theme: &Theme,
) {
    let block = titled_block(&chart.title, theme);
    let inner = block.inner(area);
    block.render(area, buf);

    let [plot_area, legend_area] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(2)])
        .areas(inner);

    // Category i sits at x = i; one empty slot on either side.
    let points: Vec<(f64, f64)> = rates
        .iter()
        .enumerate()
        .filter(|(_, (_, r))| r.is_finite())
        .map(|(i, (_, r))| (i as f64, *r))
        .collect();

    let n = rates.len();
    let slot = plot_area.width as usize / (n + 2).max(1);
    let x_labels: Vec<Line> = if slot >= 4 {
        std::iter::once(String::new())
            .chain(rates.labels().iter().map(|l| truncate(l, slot - 1)))
            .chain(std::iter::once(String::new()))
            .map(Line::from)
            .collect()
    } else {
        Vec::new()
    };

    let dataset = Dataset::default()
        .marker(symbols::Marker::Dot)
        .graph_type(GraphType::Scatter)
        .style(theme.series_style(chart.color.as_deref()))
        .data(&points);

    Chart::new(vec![dataset])
        .x_axis(
            Axis::default()
                .title(Span::styled(chart.x_label.clone(), theme.axis))
                .style(theme.axis)
                .bounds([-1.0, n as f64])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title(Span::styled(chart.y_label.clone(), theme.axis))
                .style(theme.axis)
                .bounds([0.0, 1.0])
                .labels(vec![
                    Line::from("0%"),
                    Line::from("50%"),
                    Line::from("100%"),
                ]),
        )
        .render(plot_area, buf);

    let mut legend: Vec<Span> = Vec::new();
    for (label, rate) in rates.iter() {
        legend.push(Span::styled(format!("{} ", label), theme.label));
        legend.push(Span::styled(format!("{}   ", format_rate(*rate)), theme.value));
    }
    Paragraph::new(Line::from(legend))
        .wrap(Wrap { trim: true })
        .render(legend_area, buf);
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn titled_block<'a>(title: &str, theme: &Theme) -> Block<'a> {
    Block::bordered()
        .border_style(theme.border)
        .title(Line::from(Span::styled(format!(" {} ", title), theme.title)))
}

/// Bottom caption naming what is measured against what.
fn axis_caption<'a>(chart: &PreparedChart, theme: &Theme) -> Line<'a> {
    Line::from(Span::styled(
        format!(" {} by {} ", chart.y_label, chart.x_label),
        theme.dim,
    ))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use engage_core::chart::ChartSpec;
    use engage_core::models::{CellValue, GroupEntry};

    fn counts(pairs: &[(&str, u64)]) -> GroupResult<u64> {
        GroupResult::new(
            "g",
            pairs
                .iter()
                .map(|(label, value)| GroupEntry {
                    key: CellValue::from(*label),
                    label: label.to_string(),
                    value: *value,
                })
                .collect(),
        )
    }

    fn rates(pairs: &[(&str, f64)]) -> GroupResult<f64> {
        GroupResult::new(
            "g",
            pairs
                .iter()
                .map(|(label, value)| GroupEntry {
                    key: CellValue::from(*label),
                    label: label.to_string(),
                    value: *value,
                })
                .collect(),
        )
    }

    fn prepared(spec: ChartSpec, data: ChartData) -> PreparedChart {
        PreparedChart::new(&spec, data)
    }

    #[test]
    fn test_bar_chart_text() {
        let chart = prepared(
            ChartSpec::new(ChartKind::Bar, "WeaponTarget")
                .measuring("WeaponName")
                .titled("Number of Missiles Used Per Target"),
            ChartData::Counts(counts(&[("T1", 2), ("T2", 1)])),
        );
        let text = render_to_string(&chart, &Theme::plain(), 60, 20);

        assert!(text.contains("Number of Missiles Used Per Target"), "{text}");
        assert!(text.contains("T1"), "{text}");
        assert!(text.contains("T2"), "{text}");
        assert!(text.contains("WeaponName count by WeaponTarget"), "{text}");
        // Two bars inside the frame plus one spare row.
        assert_eq!(text.lines().count(), 5, "{text}");
    }

    #[test]
    fn test_histogram_text() {
        let chart = prepared(
            ChartSpec::new(ChartKind::Histogram, "WeaponName").titled("Shots Per Kill"),
            ChartData::Bins(vec![
                HistogramBin {
                    lower: 1.0,
                    upper: 1.5,
                    count: 2,
                },
                HistogramBin {
                    lower: 1.5,
                    upper: 2.0,
                    count: 1,
                },
            ]),
        );
        let text = render_to_string(&chart, &Theme::plain(), 60, 12);
        assert!(text.contains("Shots Per Kill"), "{text}");
        assert!(text.contains("1.0-1.5"), "{text}");
        assert!(text.contains("1.5-2.0"), "{text}");
    }

    #[test]
    fn test_pie_share_text() {
        let chart = prepared(
            ChartSpec::new(ChartKind::Pie, "WeaponEffect").titled("Proportion of Missile Outcomes"),
            ChartData::Counts(counts(&[("HIT", 3), ("MISS", 1)])),
        );
        let text = render_to_string(&chart, &Theme::plain(), 70, 20);
        assert!(text.contains("HIT"), "{text}");
        assert!(text.contains("75.0% (3)"), "{text}");
        assert!(text.contains("25.0% (1)"), "{text}");
    }

    #[test]
    fn test_scatter_text_lists_rates_and_skips_nan() {
        let chart = prepared(
            ChartSpec::new(ChartKind::Scatter, "WeaponName")
                .measuring("WeaponEffect")
                .matching("HIT")
                .titled("Missile Type vs. Kill Effectiveness"),
            ChartData::Rates(rates(&[("AIM-9", 0.5), ("AGM-88", 1.0), ("X", f64::NAN)])),
        );
        let text = render_to_string(&chart, &Theme::plain(), 80, 16);
        assert!(text.contains("AIM-9 50.0%"), "{text}");
        assert!(text.contains("AGM-88 100.0%"), "{text}");
        assert!(text.contains("X n/a"), "{text}");
        assert!(text.contains("100%"), "{text}");
    }

    #[test]
    fn test_empty_chart_renders_placeholder() {
        let chart = prepared(
            ChartSpec::new(ChartKind::Bar, "t").titled("Empty"),
            ChartData::Counts(counts(&[])),
        );
        let text = render_to_string(&chart, &Theme::plain(), 50, 10);
        assert!(text.contains(NO_DATA_MESSAGE), "{text}");

        let placeholder = no_data_to_string("Missile Usage Count", &Theme::dark(), 50);
        assert!(placeholder.contains("Missile Usage Count"));
        assert!(placeholder.contains(NO_DATA_MESSAGE));
    }

    #[test]
    fn test_preferred_height() {
        let many = prepared(
            ChartSpec::new(ChartKind::Bar, "t"),
            ChartData::Counts(counts(&[("a", 1); 100])),
        );
        assert_eq!(preferred_height(&many, 20), 60);

        let few = prepared(
            ChartSpec::new(ChartKind::Pie, "t"),
            ChartData::Counts(counts(&[("a", 1), ("b", 2)])),
        );
        assert_eq!(preferred_height(&few, 20), 6);

        let scatter = prepared(
            ChartSpec::new(ChartKind::Scatter, "t"),
            ChartData::Rates(rates(&[("a", 0.5)])),
        );
        assert_eq!(preferred_height(&scatter, 20), 20);
    }

    #[test]
    fn test_draw_in_tiny_area_does_not_panic() {
        let chart = prepared(
            ChartSpec::new(ChartKind::Scatter, "t"),
            ChartData::Rates(rates(&[("a", 0.5), ("b", 0.25)])),
        );
        let area = Rect::new(0, 0, 3, 2);
        let mut buf = Buffer::empty(area);
        draw_chart(area, &mut buf, &chart, &Theme::dark());
    }
}
