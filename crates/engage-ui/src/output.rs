//! Chart output.
//!
//! [`ChartPrinter`] writes charts into the terminal scrollback through an
//! inline viewport, falls back to plain text when stdout is not a terminal,
//! and saves text renditions to disk.

use std::io::{self, Stdout, Write};
use std::path::{Path, PathBuf};

use crossterm::tty::IsTty;
use engage_core::chart::PreparedChart;
use ratatui::{
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    Terminal, TerminalOptions, Viewport,
};
use tracing::debug;

use crate::chart_view::{
    draw_chart, no_data_to_string, preferred_height, render_no_data, render_to_string,
};
use crate::themes::Theme;

/// Prints charts one after another.
pub struct ChartPrinter {
    theme: Theme,
    width: u16,
    height: u16,
    plain: bool,
    terminal: Option<Terminal<CrosstermBackend<Stdout>>>,
}

impl ChartPrinter {
    /// `force_plain` disables colour and terminal control; it is also implied
    /// when stdout is not a terminal.
    pub fn new(theme_name: &str, width: u16, height: u16, force_plain: bool) -> Self {
        let plain = force_plain || !io::stdout().is_tty();
        let theme = if plain {
            Theme::plain()
        } else {
            Theme::from_name(theme_name)
        };
        debug!("Chart printer: {}x{}, plain={}", width, height, plain);
        Self {
            theme,
            width,
            height,
            plain,
            terminal: None,
        }
    }

    pub fn is_plain(&self) -> bool {
        self.plain
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Print one chart followed by a blank line.
    pub fn print(&mut self, chart: &PreparedChart) -> io::Result<()> {
        if self.plain {
            let text = render_to_string(chart, &self.theme, self.width, self.height);
            return write_plain(&text);
        }

        let height = preferred_height(chart, self.height);
        let width = self.width;
        let theme = &self.theme;
        let terminal = inline_terminal(&mut self.terminal)?;
        terminal.insert_before(height + 1, |buf: &mut Buffer| {
            let area = chart_area(buf.area, width, height);
            draw_chart(area, buf, chart, theme);
        })
    }

    /// Print the "no data" placeholder for the chart titled `title`.
    pub fn print_no_data(&mut self, title: &str) -> io::Result<()> {
        if self.plain {
            return write_plain(&no_data_to_string(title, &self.theme, self.width));
        }

        let width = self.width;
        let theme = &self.theme;
        let terminal = inline_terminal(&mut self.terminal)?;
        terminal.insert_before(5, |buf: &mut Buffer| {
            let area = chart_area(buf.area, width, 4);
            render_no_data(area, buf, title, theme);
        })
    }

    /// Save an uncoloured rendition of `chart` as `NN-slug.txt` in `dir`.
    pub fn write_to_dir(&self, dir: &Path, index: usize, chart: &PreparedChart) -> io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{:02}-{}.txt", index, chart.slug()));
        let mut text = render_to_string(chart, &Theme::plain(), self.width, self.height);
        text.push('\n');
        std::fs::write(&path, text)?;
        debug!("Wrote {}", path.display());
        Ok(path)
    }
}

fn inline_terminal(
    slot: &mut Option<Terminal<CrosstermBackend<Stdout>>>,
) -> io::Result<&mut Terminal<CrosstermBackend<Stdout>>> {
    let terminal = match slot.take() {
        Some(terminal) => terminal,
        None => Terminal::with_options(
            CrosstermBackend::new(io::stdout()),
            TerminalOptions {
                viewport: Viewport::Inline(1),
            },
        )?,
    };
    Ok(slot.insert(terminal))
}

/// Top-left `width` x `height` of `area`, clipped to it.
fn chart_area(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        width: width.min(area.width),
        height: height.min(area.height),
        ..area
    }
}

fn write_plain(text: &str) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{}\n", text)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use engage_core::chart::{ChartData, ChartKind, ChartSpec};
    use engage_core::models::{CellValue, GroupEntry, GroupResult};
    use tempfile::TempDir;

    fn usage_chart() -> PreparedChart {
        let counts = GroupResult::new(
            "WeaponName",
            vec![
                GroupEntry {
                    key: CellValue::from("AIM-9"),
                    label: "AIM-9".to_string(),
                    value: 3,
                },
                GroupEntry {
                    key: CellValue::from("AGM-88"),
                    label: "AGM-88".to_string(),
                    value: 1,
                },
            ],
        );
        PreparedChart::new(
            &ChartSpec::new(ChartKind::Bar, "WeaponName").titled("Missile Usage Count"),
            ChartData::Counts(counts),
        )
    }

    #[test]
    fn test_forced_plain_uses_plain_theme() {
        let printer = ChartPrinter::new("dark", 80, 20, true);
        assert!(printer.is_plain());
        assert!(printer.theme().is_plain());
    }

    #[test]
    fn test_write_to_dir_names_file_after_title() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("charts");
        let printer = ChartPrinter::new("dark", 60, 10, true);

        let path = printer.write_to_dir(&out, 1, &usage_chart()).unwrap();
        assert_eq!(path, out.join("01-missile-usage-count.txt"));

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Missile Usage Count"));
        assert!(text.contains("AIM-9"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_chart_area_is_clipped() {
        let area = Rect::new(0, 3, 40, 10);
        assert_eq!(chart_area(area, 100, 4), Rect::new(0, 3, 40, 4));
        assert_eq!(chart_area(area, 20, 50), Rect::new(0, 3, 20, 10));
    }
}
