use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;
use compress_io::compress::CompressIo;
use plotters::prelude::*;

const PAGE_SIZE: (u32, u32) = (900, 600);

const COLORS: [RGBColor; 6] = [BLUE, RED, GREEN, MAGENTA, CYAN, BLACK];

#[derive(Debug, Clone, Copy)]
pub enum SeriesStyle {
    Line,
    Points,
}

/// A single labelled data series on a report page
pub struct Series<'a> {
    pub label: &'a str,
    pub style: SeriesStyle,
    pub x: &'a [f64],
    pub y: &'a [f64],
}

/// Report
///
/// Multi-page plot sink.  Pages are rendered as they are added and the
/// finished document is written out as a single HTML file on close().
pub struct Report {
    path: PathBuf,
    title: String,
    pages: Vec<String>,
}

impl Report {
    pub fn new<P: AsRef<Path>, S: Into<String>>(path: P, title: S) -> Self {
        Self {
            path: path.as_ref().to_owned(),
            title: title.into(),
            pages: Vec::new(),
        }
    }

    pub fn n_pages(&self) -> usize {
        self.pages.len()
    }

    /// Render one chart page from the supplied series
    pub fn add_page(
        &mut self,
        title: &str,
        xlab: &str,
        ylab: &str,
        series: &[Series],
    ) -> anyhow::Result<()> {
        let (xr, yr) = data_ranges(series)
            .ok_or_else(|| anyhow!("Cannot render page '{}': no data points", title))?;

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, PAGE_SIZE).into_drawing_area();
            root.fill(&WHITE)
                .map_err(|e| anyhow!("Error filling page '{}': {}", title, e))?;
            let mut chart = ChartBuilder::on(&root)
                .caption(title, ("sans-serif", 22))
                .margin(10)
                .x_label_area_size(45)
                .y_label_area_size(60)
                .build_cartesian_2d(xr.0..xr.1, yr.0..yr.1)
                .map_err(|e| anyhow!("Error building chart '{}': {}", title, e))?;

            chart
                .configure_mesh()
                .x_desc(xlab)
                .y_desc(ylab)
                .draw()
                .map_err(|e| anyhow!("Error drawing axes for '{}': {}", title, e))?;

            for (i, s) in series.iter().enumerate() {
                let color = COLORS[i % COLORS.len()];
                let style = color.filled();
                let pts: Vec<(f64, f64)> =
                    s.x.iter().copied().zip(s.y.iter().copied()).collect();
                match s.style {
                    SeriesStyle::Line => chart
                        .draw_series(LineSeries::new(pts, &color))
                        .map_err(|e| anyhow!("Error drawing series '{}': {}", s.label, e))?,
                    SeriesStyle::Points => chart
                        .draw_series(pts.into_iter().map(|p| Circle::new(p, 3, style)))
                        .map_err(|e| anyhow!("Error drawing series '{}': {}", s.label, e))?,
                }
                .label(s.label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], style));
            }

            chart
                .configure_series_labels()
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()
                .map_err(|e| anyhow!("Error drawing legend for '{}': {}", title, e))?;

            root.present()
                .map_err(|e| anyhow!("Error finalizing page '{}': {}", title, e))?;
        }
        self.pages.push(svg);
        Ok(())
    }

    /// Write the collected pages out as a single HTML document
    pub fn close(self) -> anyhow::Result<()> {
        let mut wrt = CompressIo::new()
            .path(&self.path)
            .bufwriter()
            .with_context(|| format!("Could not open report file {}", self.path.display()))?;
        writeln!(
            wrt,
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>",
            self.title
        )?;
        writeln!(wrt, "<h1>{}</h1>", self.title)?;
        for page in self.pages.iter() {
            writeln!(wrt, "<section>\n{}\n</section>\n<hr/>", page)?;
        }
        writeln!(wrt, "</body>\n</html>")
            .with_context(|| format!("Error writing report to {}", self.path.display()))?;
        Ok(())
    }
}

fn data_ranges(series: &[Series]) -> Option<((f64, f64), (f64, f64))> {
    let mut xr: Option<(f64, f64)> = None;
    let mut yr: Option<(f64, f64)> = None;
    let upd = |r: &mut Option<(f64, f64)>, v: f64| {
        if v.is_finite() {
            *r = Some(match *r {
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
                None => (v, v),
            })
        }
    };
    for s in series {
        for &v in s.x {
            upd(&mut xr, v)
        }
        for &v in s.y {
            upd(&mut yr, v)
        }
    }
    let pad = |(lo, hi): (f64, f64)| {
        let d = if hi > lo { (hi - lo) * 0.05 } else { 0.5 };
        (lo - d, hi + d)
    };
    match (xr, yr) {
        (Some(x), Some(y)) => Some((pad(x), pad(y))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_line_and_point_pages() {
        let mut rep = Report::new("test_report.html", "Test report");
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 4.0, 9.0, 16.0];
        rep.add_page(
            "squares",
            "x",
            "y",
            &[
                Series {
                    label: "line",
                    style: SeriesStyle::Line,
                    x: &x,
                    y: &y,
                },
                Series {
                    label: "points",
                    style: SeriesStyle::Points,
                    x: &x,
                    y: &y,
                },
            ],
        )
        .unwrap();
        assert_eq!(rep.n_pages(), 1);
        assert!(rep.pages[0].contains("<svg"));
    }

    #[test]
    fn empty_page_is_an_error() {
        let mut rep = Report::new("test_report.html", "Test report");
        assert!(rep
            .add_page(
                "empty",
                "x",
                "y",
                &[Series {
                    label: "none",
                    style: SeriesStyle::Line,
                    x: &[],
                    y: &[],
                }],
            )
            .is_err());
    }
}
