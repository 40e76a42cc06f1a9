//! Chart rendering for projections and principal history.
//!
//! PNG output by default, SVG when the output path ends in `.svg`.

use plotters::prelude::*;
use std::error::Error;
use std::path::Path;

use crate::config::HistoryEntry;
use crate::core::Projection;

#[derive(Clone)]
pub struct PlotConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub xlabel: String,
    pub ylabel: String,
    pub stock_label: String,
    pub target_label: String,
    pub stock_color: RGBColor,
    pub target_color: RGBColor,
    pub background: RGBColor,
    pub line_width: u32,
    pub show_grid: bool,
    /// Horizontal label offset left of the crossing, as a fraction of the x span.
    pub label_x_fraction: f64,
    /// Vertical offset of the "years" label above the crossing, as a fraction of the y span.
    pub label_above_fraction: f64,
    /// Vertical offset of the value label below the crossing, as a fraction of the y span.
    pub label_below_fraction: f64,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            title: "Stock vs. Inflation".to_string(),
            xlabel: "Years".to_string(),
            ylabel: "Principal".to_string(),
            stock_label: "Future Stock Values".to_string(),
            target_label: "Future Inflation Values".to_string(),
            stock_color: BLUE,
            target_color: RGBColor(255, 127, 14),
            background: WHITE,
            line_width: 2,
            show_grid: true,
            label_x_fraction: 0.2,
            label_above_fraction: 0.06,
            label_below_fraction: 0.01,
        }
    }
}

impl PlotConfig {
    /// Fixed goal instead of an inflating target.
    pub fn goal_only() -> Self {
        Self {
            title: "Time to Goal".to_string(),
            target_label: "Principal Goal".to_string(),
            ..Self::default()
        }
    }

    pub fn history() -> Self {
        Self {
            title: "Principal History".to_string(),
            xlabel: "Time".to_string(),
            stock_label: "Historical Principal Values".to_string(),
            target_label: "Principal Goal".to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationOffsets {
    pub x: f64,
    pub above: f64,
    pub below: f64,
}

/// Label offsets scaled to the rendered axis ranges.
pub fn annotation_offsets(x_span: f64, y_span: f64, config: &PlotConfig) -> AnnotationOffsets {
    AnnotationOffsets {
        x: x_span * config.label_x_fraction,
        above: y_span * config.label_above_fraction,
        below: y_span * config.label_below_fraction,
    }
}

/// Rounds to whole currency units with thousands separators, e.g. `$1,234,567`.
pub fn format_currency(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

pub fn format_years(time_in_years: f64) -> String {
    format!("{time_in_years:.1} years")
}

/// Stock and target curves with the crossing marked and labelled.
pub fn plot_projection(
    projection: &Projection,
    output_path: &str,
    config: Option<&PlotConfig>,
) -> Result<(), Box<dyn Error>> {
    if projection.samples.is_empty() {
        return Err("projection has no samples".into());
    }
    let default_config = PlotConfig::default();
    let config = config.unwrap_or(&default_config);

    if is_svg(output_path) {
        let backend = SVGBackend::new(output_path, (config.width, config.height));
        plot_projection_impl(backend, projection, config)
    } else {
        let backend = BitMapBackend::new(output_path, (config.width, config.height));
        plot_projection_impl(backend, projection, config)
    }
}

/// Observed principal values against a horizontal goal line.
pub fn plot_history(
    history: &[HistoryEntry],
    goal: f64,
    output_path: &str,
    config: Option<&PlotConfig>,
) -> Result<(), Box<dyn Error>> {
    if history.is_empty() {
        return Err("principal history is empty".into());
    }
    let default_config = PlotConfig::history();
    let config = config.unwrap_or(&default_config);

    if is_svg(output_path) {
        let backend = SVGBackend::new(output_path, (config.width, config.height));
        plot_history_impl(backend, history, goal, config)
    } else {
        let backend = BitMapBackend::new(output_path, (config.width, config.height));
        plot_history_impl(backend, history, goal, config)
    }
}

fn is_svg(output_path: &str) -> bool {
    Path::new(output_path)
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
}

fn plot_projection_impl<DB: DrawingBackend>(
    backend: DB,
    projection: &Projection,
    config: &PlotConfig,
) -> Result<(), Box<dyn Error>>
where
    DB::ErrorType: 'static,
{
    let root = backend.into_drawing_area();
    root.fill(&config.background)?;

    let x_length = projection.x_length();
    let y_max = projection.max_value().max(1.0) * 1.05;

    let mut chart = ChartBuilder::on(&root)
        .caption(&config.title, ("sans-serif", 32).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(100)
        .build_cartesian_2d(0.0..x_length, 0.0..y_max)?;

    if config.show_grid {
        chart
            .configure_mesh()
            .x_desc(&config.xlabel)
            .y_desc(&config.ylabel)
            .x_label_formatter(&|x| format!("{:.0}", x))
            .y_label_formatter(&|y| format_currency(*y))
            .draw()?;
    }

    chart
        .draw_series(LineSeries::new(
            projection.samples.iter().map(|s| (s.years, s.stock)),
            ShapeStyle::from(&config.stock_color).stroke_width(config.line_width),
        ))?
        .label(config.stock_label.as_str())
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &config.stock_color));

    chart
        .draw_series(LineSeries::new(
            projection.samples.iter().map(|s| (s.years, s.target)),
            ShapeStyle::from(&config.target_color).stroke_width(config.line_width),
        ))?
        .label(config.target_label.as_str())
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &config.target_color));

    let crossing = projection.crossing;
    if crossing.time_in_years >= 0.0 {
        let offsets = annotation_offsets(x_length, y_max, config);
        let label_x = (crossing.time_in_years - offsets.x).max(0.0);
        let point = (crossing.time_in_years, crossing.value);

        chart.draw_series(std::iter::once(Circle::new(point, 5, BLACK.filled())))?;
        chart.draw_series(std::iter::once(Text::new(
            format_years(crossing.time_in_years),
            (label_x, crossing.value + offsets.above),
            ("sans-serif", 18).into_font(),
        )))?;
        chart.draw_series(std::iter::once(Text::new(
            format_currency(crossing.value),
            (label_x, crossing.value - offsets.below),
            ("sans-serif", 18).into_font(),
        )))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&config.background.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn plot_history_impl<DB: DrawingBackend>(
    backend: DB,
    history: &[HistoryEntry],
    goal: f64,
    config: &PlotConfig,
) -> Result<(), Box<dyn Error>>
where
    DB::ErrorType: 'static,
{
    let root = backend.into_drawing_area();
    root.fill(&config.background)?;

    let x_max = (history.len() - 1).max(1) as f64;
    let y_max = history
        .iter()
        .map(|e| e.principal_stock)
        .fold(goal, f64::max)
        .max(1.0)
        * 1.1;
    let dates: Vec<&str> = history.iter().map(|e| e.date.as_str()).collect();
    let date_label = |x: &f64| {
        let idx = x.round();
        if idx < 0.0 || (idx - x).abs() > 1e-6 {
            return String::new();
        }
        dates.get(idx as usize).map(|d| d.to_string()).unwrap_or_default()
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(&config.title, ("sans-serif", 32).into_font())
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(100)
        .build_cartesian_2d(0.0..x_max, 0.0..y_max)?;

    if config.show_grid {
        chart
            .configure_mesh()
            .x_desc(&config.xlabel)
            .y_desc(&config.ylabel)
            .x_labels(history.len().min(24))
            .x_label_formatter(&date_label)
            .y_label_formatter(&|y| format_currency(*y))
            .draw()?;
    }

    chart
        .draw_series(LineSeries::new(
            history
                .iter()
                .enumerate()
                .map(|(i, e)| (i as f64, e.principal_stock)),
            ShapeStyle::from(&config.stock_color).stroke_width(config.line_width),
        ))?
        .label(config.stock_label.as_str())
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &config.stock_color));

    chart
        .draw_series(LineSeries::new(
            vec![(0.0, goal), (x_max, goal)],
            ShapeStyle::from(&config.target_color).stroke_width(config.line_width),
        ))?
        .label(config.target_label.as_str())
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &config.target_color));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::MiddleLeft)
        .background_style(&config.background.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(0.0), "$0");
        assert_eq!(format_currency(999.4), "$999");
        assert_eq!(format_currency(1_000.0), "$1,000");
        assert_eq!(format_currency(1_234_567.6), "$1,234,568");
        assert_eq!(format_currency(-52_000.0), "-$52,000");
    }

    #[test]
    fn years_label_has_one_decimal() {
        assert_eq!(format_years(27.2285), "27.2 years");
        assert_eq!(format_years(0.0), "0.0 years");
    }

    #[test]
    fn annotation_offsets_scale_with_axis_ranges() {
        let config = PlotConfig::default();
        let small = annotation_offsets(10.0, 1_000.0, &config);
        let large = annotation_offsets(100.0, 1_000_000.0, &config);

        assert!((small.x - 2.0).abs() < 1e-12);
        assert!((large.x - 20.0).abs() < 1e-12);
        assert!((small.above - 60.0).abs() < 1e-9);
        assert!((large.above - 60_000.0).abs() < 1e-6);
        assert!(large.below < large.above);
    }

    #[test]
    fn svg_detection_uses_extension() {
        assert!(is_svg("chart.svg"));
        assert!(is_svg("out/chart.SVG"));
        assert!(!is_svg("image.png"));
        assert!(!is_svg("image"));
    }

    #[test]
    fn empty_inputs_are_rejected_before_rendering() {
        let err = plot_history(&[], 1.0, "unused.png", None).expect_err("no data");
        assert!(err.to_string().contains("empty"));
    }
}
