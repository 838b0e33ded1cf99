//! ASCII forecast charts: one series, or p10/p50/p90 quantile bands.
//!
//! The plot functions are pure. Identical inputs always produce identical
//! grids, which is what lets the copy and export paths reuse a rendered view.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use crate::client::types::{P10, P50, P90, QuantileSnapshot};
use crate::tui::canvas::{Line, Span};
use crate::tui::theme::Tone;

/// Width of the y-axis label column including the `┤` tick.
const Y_LABEL_COLS: u16 = 7;
/// Normalized distance under which the single-line plot draws a dot.
const SINGLE_NEAR: f64 = 0.05;
/// Normalized distance under which the single-line plot draws a faint dot.
const SINGLE_FAR: f64 = 0.1;
/// Row distance under which a quantile line claims a cell.
const QUANTILE_THRESHOLD: f64 = 0.5;

/// A plotted grid plus the value range its rows span.
#[derive(Debug, Clone, PartialEq)]
pub struct Plot {
    /// Row 0 is the top of the chart.
    pub rows: Vec<Vec<(char, Tone)>>,
    pub min: f64,
    pub max: f64,
}

impl Plot {
    #[must_use]
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn to_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.iter().map(|(ch, _)| *ch).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Column → source index: `floor(col / (width-1) * (len-1))`, clamped.
#[must_use]
pub fn source_index(col: usize, width: usize, len: usize) -> usize {
    if len <= 1 || width <= 1 {
        return 0;
    }
    let idx = (col as f64 / (width - 1) as f64 * (len - 1) as f64).floor() as usize;
    idx.min(len - 1)
}

/// Padded range for a single series: 10% of the span on both ends, falling
/// back to 10% of the max, then to 1, when the series is flat.
#[must_use]
pub fn padded_range(values: &[f64]) -> Option<(f64, f64)> {
    let (min, max) = min_max(values.iter().copied())?;
    let mut margin = (max - min) * 0.1;
    if margin == 0.0 {
        margin = (max * 0.1).abs();
    }
    if margin == 0.0 {
        margin = 1.0;
    }
    Some((min - margin, max + margin))
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Single-series plot. `None` when there is nothing to draw or the grid is
/// smaller than 2×2.
#[must_use]
pub fn plot_single(values: &[f64], width: u16, height: u16) -> Option<Plot> {
    if values.is_empty() || width < 2 || height < 2 {
        return None;
    }
    let (min, max) = padded_range(values)?;
    let span = max - min;
    let (w, h) = (usize::from(width), usize::from(height));

    let rows = (0..h)
        .map(|row| {
            let row_norm = (h - 1 - row) as f64 / (h - 1) as f64;
            (0..w)
                .map(|col| {
                    let value = values[source_index(col, w, values.len())];
                    let diff = ((value - min) / span - row_norm).abs();
                    if diff < SINGLE_NEAR {
                        ('●', Tone::P50)
                    } else if diff < SINGLE_FAR {
                        ('·', Tone::P50)
                    } else {
                        (' ', Tone::Normal)
                    }
                })
                .collect()
        })
        .collect();

    Some(Plot { rows, min, max })
}

/// The three bands of a quantile forecast; p50 is mandatory.
#[derive(Debug, Clone, Copy)]
pub struct Bands<'a> {
    pub p10: Option<&'a [f64]>,
    pub p50: &'a [f64],
    pub p90: Option<&'a [f64]>,
}

impl<'a> Bands<'a> {
    /// Bands of a v2 snapshot, or `None` when p50 is missing or the payload
    /// is v1.
    #[must_use]
    pub fn from_snapshot(snapshot: &'a QuantileSnapshot) -> Option<Self> {
        if snapshot.api_version < 2 {
            return None;
        }
        Some(Self {
            p10: snapshot.band(P10),
            p50: snapshot.band(P50)?,
            p90: snapshot.band(P90),
        })
    }

    fn present(&self) -> impl Iterator<Item = &'a [f64]> {
        [self.p10, Some(self.p50), self.p90].into_iter().flatten()
    }
}

/// Quantile plot. Each cell shows the band line nearest to the row when it
/// is closer than half a row; exact ties go to p10, then p50, then p90.
#[must_use]
pub fn plot_quantiles(bands: Bands<'_>, width: u16, height: u16) -> Option<Plot> {
    if bands.p50.is_empty() || width < 2 || height < 2 {
        return None;
    }
    let (min, mut max) = min_max(bands.present().flat_map(|b| b.iter().copied()))?;
    if max == min {
        max = min + 1.0;
    }
    let (w, h) = (usize::from(width), usize::from(height));
    let scale = (h - 1) as f64 / (max - min);
    let ordered: [(Option<&[f64]>, char, Tone); 3] = [
        (bands.p10, '·', Tone::P10),
        (Some(bands.p50), '●', Tone::P50),
        (bands.p90, '■', Tone::P90),
    ];

    let rows = (0..h)
        .map(|row| {
            let current = (h - 1 - row) as f64;
            (0..w)
                .map(|col| {
                    let idx = source_index(col, w, bands.p50.len());
                    let mut best: Option<(f64, char, Tone)> = None;
                    for (band, glyph, tone) in ordered {
                        let Some(value) = band.and_then(|b| b.get(idx)) else {
                            continue;
                        };
                        let dist = (current - (value - min) * scale).abs();
                        if best.is_none_or(|(d, _, _)| dist < d) {
                            best = Some((dist, glyph, tone));
                        }
                    }
                    match best {
                        Some((dist, glyph, tone)) if dist < QUANTILE_THRESHOLD => (glyph, tone),
                        _ => (' ', Tone::Normal),
                    }
                })
                .collect()
        })
        .collect();

    Some(Plot { rows, min, max })
}

/// Full chart view for the Charts tab: title, plot with y labels, x axis,
/// time labels, and a legend for quantile charts.
#[must_use]
pub fn chart_lines(snapshot: Option<&QuantileSnapshot>, width: u16, height: u16) -> Vec<Line> {
    let Some(snapshot) = snapshot else {
        return vec![Line::styled("No forecast data available", Tone::Muted)];
    };
    let bands = Bands::from_snapshot(snapshot);
    let mut lines = Vec::new();

    match bands {
        Some(_) => lines.push(Line::new(vec![
            Span::new("Forecast Timeline (P10/P50/P90)", Tone::Primary).bold(),
        ])),
        None => {
            lines.push(Line::new(vec![
                Span::new("Forecast Timeline", Tone::Primary).bold(),
            ]));
            lines.push(Line::styled(
                "⚠ Quantiles unavailable. Showing single-point forecast.",
                Tone::Warning,
            ));
        }
    }
    lines.push(Line::empty());

    let footer_rows: u16 = if bands.is_some() { 4 } else { 2 };
    let header_rows = u16::try_from(lines.len()).unwrap_or(u16::MAX);
    let plot_w = width.saturating_sub(Y_LABEL_COLS);
    let plot_h = height.saturating_sub(header_rows + footer_rows);

    let plot = match bands {
        Some(bands) => plot_quantiles(bands, plot_w, plot_h),
        None => plot_single(snapshot.median(), plot_w, plot_h),
    };
    let Some(plot) = plot else {
        let reason = if snapshot.median().is_empty() {
            "No forecast data available"
        } else {
            "Chart area too small"
        };
        return vec![Line::styled(reason, Tone::Muted)];
    };

    let rows = plot.rows.len();
    for (r, cells) in plot.rows.iter().enumerate() {
        let label = if r == 0 || r == rows / 2 || r + 1 == rows {
            let frac = (rows - 1 - r) as f64 / (rows - 1) as f64;
            format!("{:6.1}", plot.min + frac * (plot.max - plot.min))
        } else {
            " ".repeat(6)
        };
        let mut line = Line::new(vec![Span::new(label, Tone::Muted), Span::new("┤", Tone::Border)]);
        for (ch, tone) in cells {
            line.push(Span::new(ch.to_string(), *tone));
        }
        lines.push(line);
    }

    let w = plot.width();
    lines.push(Line::styled(format!("{}└{}", " ".repeat(6), "─".repeat(w)), Tone::Border));
    let horizon = format!("+{}m", snapshot.horizon().as_secs() / 60);
    let gap = w.saturating_sub(3 + horizon.len()).max(1);
    lines.push(Line::styled(
        format!("{}Now{}{}", " ".repeat(usize::from(Y_LABEL_COLS)), " ".repeat(gap), horizon),
        Tone::Muted,
    ));

    if bands.is_some() {
        lines.push(Line::empty());
        lines.push(Line::new(vec![
            Span::plain("Legend: "),
            Span::new("···", Tone::P10),
            Span::plain(" P10  "),
            Span::new("●●●", Tone::P50),
            Span::plain(" P50  "),
            Span::new("■■■", Tone::P90),
            Span::plain(" P90"),
        ]));
    }
    lines
}
