//! Chart descriptions shared by the data pipeline and the renderer.
//!
//! A [`ChartSpec`] says what to aggregate; the pipeline turns it into a
//! [`PreparedChart`] carrying the aggregated [`ChartData`] plus axis labels,
//! which is all the renderer ever sees.

use serde::{Deserialize, Serialize};

use crate::models::{CellValue, FilterSpec, GroupOrder, GroupResult, HistogramBin};

/// Default number of histogram bins.
pub const DEFAULT_BINS: usize = 10;

/// The four chart shapes the renderer knows how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    /// Row counts per group.
    Bar,
    /// Distribution of per-group row counts.
    Histogram,
    /// Proportion of each distinct value.
    Pie,
    /// Match rate per group.
    Scatter,
}

impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ChartKind::Bar => "bar",
            ChartKind::Histogram => "histogram",
            ChartKind::Pie => "pie",
            ChartKind::Scatter => "scatter",
        };
        f.write_str(name)
    }
}

/// One chart to build from a loaded table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Grouping column.
    pub group: String,
    /// Measured column (bar), predicate column (scatter) or the column that
    /// selects counted rows (histogram).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure: Option<String>,
    /// Value the predicate column must equal (scatter, histogram).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_value: Option<CellValue>,
    /// Extra row filters applied before aggregating this chart only.
    #[serde(default, skip_serializing_if = "FilterSpec::is_empty")]
    pub filters: FilterSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bins: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<GroupOrder>,
}

impl ChartSpec {
    /// A chart of `kind` grouped by `group` with every optional field unset.
    pub fn new(kind: ChartKind, group: impl Into<String>) -> Self {
        Self {
            kind,
            title: None,
            group: group.into(),
            measure: None,
            match_value: None,
            filters: FilterSpec::default(),
            bins: None,
            color: None,
            order: None,
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn measuring(mut self, measure: impl Into<String>) -> Self {
        self.measure = Some(measure.into());
        self
    }

    pub fn matching(mut self, value: impl Into<CellValue>) -> Self {
        self.match_value = Some(value.into());
        self
    }

    pub fn filtered(mut self, filters: FilterSpec) -> Self {
        self.filters = filters;
        self
    }

    pub fn colored(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// The standard six-chart weapon engagement report: usage per weapon,
    /// missiles per target, missiles per kill, shots per kill, outcome
    /// proportions and hit rate per weapon.
    pub fn engagement_report(weapon: &str, target: &str, effect: &str, hit_value: &str) -> Vec<Self> {
        let hits = FilterSpec::new().with(effect, CellValue::Text(hit_value.to_string()));
        vec![
            Self::new(ChartKind::Bar, weapon).titled("Missile Usage Count"),
            Self::new(ChartKind::Bar, target)
                .measuring(weapon)
                .titled("Number of Missiles Used Per Target")
                .colored("green"),
            Self::new(ChartKind::Bar, target)
                .measuring(weapon)
                .filtered(hits)
                .titled("Missiles Required Per Kill")
                .colored("red"),
            Self::new(ChartKind::Histogram, weapon)
                .measuring(effect)
                .matching(CellValue::Text(hit_value.to_string()))
                .titled("Distribution of Missile Shots Per Kill")
                .colored("blue"),
            Self::new(ChartKind::Pie, effect).titled("Proportion of Missile Outcomes"),
            Self::new(ChartKind::Scatter, weapon)
                .measuring(effect)
                .matching(CellValue::Text(hit_value.to_string()))
                .titled("Missile Type vs. Kill Effectiveness")
                .colored("purple"),
        ]
    }

    /// Measured column, falling back to the grouping column.
    pub fn measure_column(&self) -> &str {
        self.measure.as_deref().unwrap_or(&self.group)
    }

    pub fn bin_count(&self) -> usize {
        self.bins.unwrap_or(DEFAULT_BINS).max(1)
    }

    /// Explicit order, or the natural order for the chart kind.
    pub fn group_order(&self) -> GroupOrder {
        self.order.unwrap_or(match self.kind {
            ChartKind::Pie => GroupOrder::ValueDescending,
            _ => GroupOrder::Sorted,
        })
    }

    pub fn display_title(&self) -> String {
        if let Some(title) = &self.title {
            return title.clone();
        }
        match self.kind {
            ChartKind::Bar => format!("{} count by {}", self.measure_column(), self.group),
            ChartKind::Histogram => format!("Distribution of rows per {}", self.group),
            ChartKind::Pie => format!("Proportion of {}", self.group),
            ChartKind::Scatter => format!("{} vs. {} rate", self.group, self.match_label()),
        }
    }

    /// `(x, y)` axis captions.
    pub fn axis_labels(&self) -> (String, String) {
        match self.kind {
            ChartKind::Bar => (self.group.clone(), format!("{} count", self.measure_column())),
            ChartKind::Histogram => (format!("Rows per {}", self.group), "Frequency".to_string()),
            ChartKind::Pie => (self.group.clone(), String::new()),
            ChartKind::Scatter => (self.group.clone(), format!("{} rate", self.match_label())),
        }
    }

    fn match_label(&self) -> String {
        self.match_value
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "match".to_string())
    }
}

/// Aggregated values handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    /// Non-negative counts per group (bar, pie).
    Counts(GroupResult<u64>),
    /// Ratios in `[0, 1]` per group (scatter).
    Rates(GroupResult<f64>),
    /// Equal-width bins (histogram).
    Bins(Vec<HistogramBin>),
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        match self {
            ChartData::Counts(r) => r.is_empty(),
            ChartData::Rates(r) => r.is_empty(),
            ChartData::Bins(b) => b.is_empty(),
        }
    }

    /// Number of categories or bins.
    pub fn len(&self) -> usize {
        match self {
            ChartData::Counts(r) => r.len(),
            ChartData::Rates(r) => r.len(),
            ChartData::Bins(b) => b.len(),
        }
    }
}

/// A chart ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedChart {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub color: Option<String>,
    pub data: ChartData,
}

impl PreparedChart {
    pub fn new(spec: &ChartSpec, data: ChartData) -> Self {
        let (x_label, y_label) = spec.axis_labels();
        Self {
            kind: spec.kind,
            title: spec.display_title(),
            x_label,
            y_label,
            color: spec.color.clone(),
            data,
        }
    }

    /// File-system friendly form of the title.
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.title.len());
        let mut last_dash = true;
        for ch in self.title.chars() {
            if ch.is_ascii_alphanumeric() {
                slug.push(ch.to_ascii_lowercase());
                last_dash = false;
            } else if !last_dash {
                slug.push('-');
                last_dash = true;
            }
        }
        while slug.ends_with('-') {
            slug.pop();
        }
        if slug.is_empty() {
            slug.push_str(&self.kind.to_string());
        }
        slug
    }
}
