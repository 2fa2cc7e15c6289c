//! SVG line charts of model predictions.
//!
//! The chart description is data-driven: series and bounds are computed from the
//! predictions first, then `render_svg` only draws. One line per series label,
//! x = survey year, y = predicted reading score.

use std::path::Path;

use plotters::prelude::*;

use crate::error::AppError;
use crate::predict::Prediction;

const SIZE: (u32, u32) = (960, 640);

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DidChart {
    pub title: String,
    pub series: Vec<Series>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
}

impl DidChart {
    /// Group predictions by series label, in first-seen order.
    pub fn from_predictions(title: impl Into<String>, predictions: &[Prediction]) -> Result<Self, AppError> {
        let mut series: Vec<Series> = Vec::new();
        for p in predictions {
            if !p.predicted.is_finite() {
                continue;
            }
            let point = (f64::from(p.point.year.value()), p.predicted);
            match series.iter_mut().find(|s| s.label == p.point.series) {
                Some(s) => s.points.push(point),
                None => series.push(Series {
                    label: p.point.series.clone(),
                    points: vec![point],
                }),
            }
        }
        for s in &mut series {
            s.points.sort_by(|a, b| a.0.total_cmp(&b.0));
        }

        let ys = series.iter().flat_map(|s| s.points.iter().map(|p| p.1));
        let (y_min, y_max) = ys.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| (lo.min(y), hi.max(y)));
        if !(y_min.is_finite() && y_max.is_finite()) {
            return Err(AppError::Output("No finite predictions to chart.".into()));
        }
        let pad = ((y_max - y_min) * 0.1).max(1.0);

        Ok(Self {
            title: title.into(),
            series,
            x_bounds: [2017.0, 2023.0],
            y_bounds: [y_min - pad, y_max + pad],
        })
    }

    pub fn render_svg(&self, path: &Path) -> Result<(), AppError> {
        self.draw(path)
            .map_err(|e| AppError::Output(format!("Failed to render chart {}: {e}", path.display())))?;
        log::debug!("Wrote chart {}", path.display());
        Ok(())
    }

    fn draw(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;

        let root = SVGBackend::new(path, SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&self.title, ("sans-serif", 22))
            .margin(12)
            .set_label_area_size(LabelAreaPosition::Left, 60)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(x0..x1, y0..y1)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc("Survey year")
            .y_desc("Predicted reading score")
            .x_labels(7)
            .y_labels(8)
            .x_label_formatter(&|v| format!("{v:.0}"))
            .y_label_formatter(&|v| format!("{v:.0}"))
            .draw()?;

        for (i, s) in self.series.iter().enumerate() {
            let color = Palette99::pick(i).to_rgba();
            chart
                .draw_series(LineSeries::new(s.points.iter().copied(), color.stroke_width(2)))?
                .label(s.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(2)));
            chart.draw_series(s.points.iter().map(|&p| Circle::new(p, 3, color.filled())))?;
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK)
            .draw()?;

        root.present()?;
        Ok(())
    }
}
