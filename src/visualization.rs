//! Visualization utilities for benchmark results.
//!
//! Generates SVG charts from solver statistics and run summaries; PNG output goes
//! through resvg when the `resvg` feature is enabled and external converters otherwise.

use crate::benchmark::AlgorithmStatistics;
use crate::error::Result;
use crate::summary::RunSummary;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::Command;
#[cfg(feature = "resvg")]
use resvg::render;
#[cfg(feature = "resvg")]
use resvg::tiny_skia::{Pixmap, Transform};
#[cfg(feature = "resvg")]
use resvg::usvg;
#[cfg(feature = "resvg")]
use resvg::usvg::TreeParsing;
#[cfg(feature = "resvg")]
use resvg::FitTo;

const PALETTE: [&str; 5] = ["#3498db", "#e74c3c", "#2ecc71", "#f39c12", "#9b59b6"];

/// SVG chart generator
pub struct Visualizer {
    /// Canvas width
    pub width: f64,
    /// Canvas height
    pub height: f64,
    /// Margin
    pub margin: f64,
}

impl Default for Visualizer {
    fn default() -> Self {
        Visualizer {
            width: 800.0,
            height: 500.0,
            margin: 60.0,
        }
    }
}

impl Visualizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total profit per solver
    pub fn profit_chart(&self, stats: &[AlgorithmStatistics]) -> String {
        let labels: Vec<&str> = stats.iter().map(|s| s.solver.as_str()).collect();
        let totals: Vec<f64> = stats.iter().map(|s| s.total_profit).collect();
        self.bar_chart("Total profit per solver", &labels, &[("total", totals)])
    }

    /// Mean against median profit per solver
    pub fn mean_median_chart(&self, stats: &[AlgorithmStatistics]) -> String {
        let labels: Vec<&str> = stats.iter().map(|s| s.solver.as_str()).collect();
        self.bar_chart(
            "Mean vs median profit",
            &labels,
            &[
                ("mean", stats.iter().map(|s| s.mean_profit).collect()),
                ("median", stats.iter().map(|s| s.median_profit).collect()),
            ],
        )
    }

    /// Worst and best profit per solver
    pub fn min_max_chart(&self, stats: &[AlgorithmStatistics]) -> String {
        let labels: Vec<&str> = stats.iter().map(|s| s.solver.as_str()).collect();
        self.bar_chart(
            "Min and max profit",
            &labels,
            &[
                ("min", stats.iter().map(|s| s.min_profit).collect()),
                ("max", stats.iter().map(|s| s.max_profit).collect()),
            ],
        )
    }

    /// Total compute time per solver
    pub fn time_chart(&self, stats: &[AlgorithmStatistics]) -> String {
        let labels: Vec<&str> = stats.iter().map(|s| s.solver.as_str()).collect();
        let totals: Vec<f64> = stats.iter().map(|s| s.total_time).collect();
        self.bar_chart("Total compute time (s)", &labels, &[("time", totals)])
    }

    /// Runtime percentiles per solver
    pub fn percentile_chart(&self, stats: &[AlgorithmStatistics]) -> String {
        let labels: Vec<&str> = stats.iter().map(|s| s.solver.as_str()).collect();
        self.bar_chart(
            "Runtime percentiles (s)",
            &labels,
            &[
                ("p80", stats.iter().map(|s| s.p80_time).collect()),
                ("p90", stats.iter().map(|s| s.p90_time).collect()),
                ("p95", stats.iter().map(|s| s.p95_time).collect()),
                ("p99", stats.iter().map(|s| s.p99_time).collect()),
            ],
        )
    }

    /// Items against orders, one point per dataset
    pub fn distribution_chart(&self, runs: &[RunSummary]) -> String {
        let mut points: Vec<(usize, usize)> = runs.iter().map(|r| (r.nr_items, r.nr_orders)).collect();
        points.sort_unstable();
        points.dedup();

        let max_x = points.iter().map(|p| p.0).max().unwrap_or(0).max(1) as f64;
        let max_y = points.iter().map(|p| p.1).max().unwrap_or(0).max(1) as f64;
        let plot_w = self.width - 2.0 * self.margin;
        let plot_h = self.height - 2.0 * self.margin;

        let mut svg = self.header("Dataset distribution");
        self.axes(&mut svg, max_y);
        for (items, orders) in &points {
            let x = self.margin + *items as f64 / max_x * plot_w;
            let y = self.height - self.margin - *orders as f64 / max_y * plot_h;
            svg.push_str(&format!(
                r##"<circle cx="{:.2}" cy="{:.2}" r="4" fill="{}" fill-opacity="0.7"/>
"##,
                x, y, PALETTE[0]
            ));
        }
        svg.push_str(&format!(
            r##"<text x="{:.2}" y="{:.2}" class="label" text-anchor="middle">items (max {})</text>
"##,
            self.width / 2.0,
            self.height - 15.0,
            max_x
        ));
        svg.push_str(&format!(
            r##"<text x="15" y="{:.2}" class="label">orders</text>
"##,
            self.margin - 10.0
        ));
        svg.push_str("</svg>");
        svg
    }

    fn header(&self, title: &str) -> String {
        format!(
            r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">
<style>
    .axis {{ stroke: #2c3e50; stroke-width: 1; }}
    .label {{ font-family: Arial; font-size: 11px; fill: #2c3e50; }}
    .title {{ font-family: Arial; font-size: 14px; fill: #2c3e50; font-weight: bold; }}
</style>
<rect width="100%" height="100%" fill="#ecf0f1"/>
<text x="{}" y="30" class="title">{}</text>
"##,
            self.width,
            self.height,
            self.width,
            self.height,
            self.margin,
            escape(title)
        )
    }

    fn axes(&self, svg: &mut String, y_max: f64) {
        let bottom = self.height - self.margin;
        svg.push_str(&format!(
            r##"<line x1="{m}" y1="{b}" x2="{r}" y2="{b}" class="axis"/>
<line x1="{m}" y1="{m}" x2="{m}" y2="{b}" class="axis"/>
<text x="{tx}" y="{ty}" class="label" text-anchor="end">{y_max:.5}</text>
<text x="{tx}" y="{b}" class="label" text-anchor="end">0</text>
"##,
            m = self.margin,
            b = bottom,
            r = self.width - self.margin,
            tx = self.margin - 5.0,
            ty = self.margin + 4.0,
            y_max = y_max
        ));
    }

    /// Grouped bars: one group per label, one bar per series
    fn bar_chart(&self, title: &str, labels: &[&str], series: &[(&str, Vec<f64>)]) -> String {
        let y_max = series
            .iter()
            .flat_map(|(_, values)| values.iter().copied())
            .filter(|v| v.is_finite())
            .fold(0.0, f64::max);
        let y_max = if y_max > 0.0 { y_max } else { 1.0 };

        let plot_w = self.width - 2.0 * self.margin;
        let plot_h = self.height - 2.0 * self.margin;
        let group_w = plot_w / labels.len().max(1) as f64;
        let bar_w = group_w * 0.8 / series.len().max(1) as f64;
        let bottom = self.height - self.margin;

        let mut svg = self.header(title);
        self.axes(&mut svg, y_max);

        for (g, label) in labels.iter().enumerate() {
            let group_x = self.margin + g as f64 * group_w + group_w * 0.1;
            for (s, (_, values)) in series.iter().enumerate() {
                let value = values.get(g).copied().filter(|v| v.is_finite()).unwrap_or(0.0);
                let h = (value / y_max * plot_h).max(0.0);
                svg.push_str(&format!(
                    r##"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"/>
"##,
                    group_x + s as f64 * bar_w,
                    bottom - h,
                    bar_w,
                    h,
                    PALETTE[s % PALETTE.len()]
                ));
            }
            svg.push_str(&format!(
                r##"<text x="{:.2}" y="{:.2}" class="label" text-anchor="middle">{}</text>
"##,
                group_x + group_w * 0.4,
                bottom + 16.0,
                escape(label)
            ));
        }

        if series.len() > 1 {
            for (s, (name, _)) in series.iter().enumerate() {
                let x = self.width - self.margin - 90.0;
                let y = self.margin + s as f64 * 18.0;
                svg.push_str(&format!(
                    r##"<rect x="{:.2}" y="{:.2}" width="12" height="12" fill="{}"/>
<text x="{:.2}" y="{:.2}" class="label">{}</text>
"##,
                    x,
                    y,
                    PALETTE[s % PALETTE.len()],
                    x + 18.0,
                    y + 10.0,
                    escape(name)
                ));
            }
        }

        svg.push_str("</svg>");
        svg
    }

    /// Save SVG to file
    pub fn save_svg<P: AsRef<Path>>(&self, svg: &str, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(svg.as_bytes())?;
        Ok(())
    }

    /// Save SVG as PNG, natively with resvg or through an external converter.
    pub fn save_png<P: AsRef<Path>>(&self, svg: &str, path: P) -> Result<()> {
        let path = path.as_ref();

        #[cfg(feature = "resvg")]
        {
            let opt = usvg::Options::default();
            let rtree = usvg::Tree::from_str(svg, &opt)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("usvg parse error: {}", e)))?;
            let mut pixmap = Pixmap::new(self.width as u32, self.height as u32).ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::Other, "Failed to create pixmap")
            })?;
            render(&rtree, FitTo::Original, Transform::default(), pixmap.as_mut())
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "resvg render failed"))?;
            pixmap.save_png(path).map_err(|e| {
                std::io::Error::new(std::io::ErrorKind::Other, format!("save_png failed: {}", e))
            })?;
            return Ok(());
        }

        let tmp_svg = path.with_extension("svg.tmp");
        std::fs::write(&tmp_svg, svg)?;
        let input = tmp_svg.to_string_lossy().to_string();
        let output = path.to_string_lossy().to_string();

        let converters: [(&str, Vec<&str>); 3] = [
            ("rsvg-convert", vec!["-o", output.as_str(), input.as_str()]),
            ("magick", vec!["convert", input.as_str(), output.as_str()]),
            ("inkscape", vec![input.as_str(), "--export-type=png", "--export-filename", output.as_str()]),
        ];
        for (program, args) in &converters {
            if let Ok(status) = Command::new(program).args(args).status() {
                if status.success() {
                    let _ = std::fs::remove_file(&tmp_svg);
                    return Ok(());
                }
            }
        }

        let _ = std::fs::remove_file(&tmp_svg);
        Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            "No SVG->PNG converter succeeded (tried rsvg-convert, magick, inkscape)",
        )
        .into())
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::compute_statistics;

    fn runs() -> Vec<RunSummary> {
        ["GreedyBigBet", "AntColony"]
            .iter()
            .enumerate()
            .map(|(i, solver)| RunSummary {
                status: "Finished".to_string(),
                delta_time: 0.5 + i as f64,
                nr_items: 10 + i,
                nr_orders: 40,
                profit: 100.0 * (i + 1) as f64,
                file_path: "data/a.txt".to_string(),
                name: "a.txt".to_string(),
                solver: solver.to_string(),
                timeout: 5.0,
                feasible_profit: None,
                epochs: None,
            })
            .collect()
    }

    #[test]
    fn test_bar_charts() {
        let stats = compute_statistics(&runs());
        let viz = Visualizer::new();

        let svg = viz.profit_chart(&stats);
        assert!(svg.starts_with("<?xml"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("GreedyBigBet"));
        // one bar per solver, plus the background
        assert_eq!(svg.matches("<rect").count(), 3);

        let svg = viz.percentile_chart(&stats);
        assert!(svg.contains("p99"));
        assert_eq!(svg.matches("<rect").count(), 1 + 2 * 4 + 4);

        assert!(viz.time_chart(&stats).contains("Total compute time"));
        assert!(viz.mean_median_chart(&stats).contains("median"));
    }

    #[test]
    fn test_min_max_chart() {
        let mut runs = runs();
        let worse = RunSummary {
            profit: 40.0,
            ..runs[0].clone()
        };
        runs.push(worse);
        let stats = compute_statistics(&runs);
        let svg = Visualizer::new().min_max_chart(&stats);

        assert!(svg.contains("Min and max profit"));
        // two bars per solver, two legend boxes, the background
        assert_eq!(svg.matches("<rect").count(), 1 + 2 * 2 + 2);
        let greedy = stats.iter().find(|s| s.solver == "GreedyBigBet").unwrap();
        assert_eq!((greedy.min_profit, greedy.max_profit), (40.0, 100.0));
    }

    #[test]
    fn test_distribution_chart() {
        let svg = Visualizer::new().distribution_chart(&runs());
        assert_eq!(svg.matches("<circle").count(), 2);
    }

    #[test]
    fn test_empty_charts() {
        let viz = Visualizer::new();
        assert!(viz.profit_chart(&[]).ends_with("</svg>"));
        assert!(viz.distribution_chart(&[]).ends_with("</svg>"));
    }

    #[test]
    fn test_save_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profit.svg");
        let viz = Visualizer::new();
        viz.save_svg(&viz.profit_chart(&[]), &path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("Total profit"));
    }
}
