//! Chart rendering with plotters (SVG output).
//!
//! SVG keeps rendering free of system font dependencies. Charts cover the
//! active and inactive compounds only; intermediate ones are left out.

use anyhow::Result;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::model::RegressionPlotInfo;
use crate::records::{CompoundRecord, PotencyClass};

/// URL prefix under which the outputs directory is served.
pub const OUTPUTS_URL_PREFIX: &str = "/outputs/";

const CLASSES: [PotencyClass; 2] = [PotencyClass::Active, PotencyClass::Inactive];
const ACTIVE_COLOR: RGBColor = RGBColor(31, 119, 180);
const INACTIVE_COLOR: RGBColor = RGBColor(255, 127, 14);
const CHART_SIZE: (u32, u32) = (600, 600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotKind {
    Bar,
    Scatter,
    Box,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlotInfo {
    pub name: String,
    pub description: String,
    pub image_path: String,
    #[serde(rename = "type")]
    pub kind: PlotKind,
}

struct BoxSpec {
    stem: &'static str,
    column: &'static str,
    y_desc: &'static str,
    name: &'static str,
    description: &'static str,
}

const BOX_PLOTS: [BoxSpec; 5] = [
    BoxSpec {
        stem: "plot_ic50",
        column: "pIC50",
        y_desc: "pIC50 value",
        name: "pIC50 Distribution",
        description: "Box plot of pIC50 values by bioactivity class",
    },
    BoxSpec {
        stem: "plot_MW",
        column: "MW",
        y_desc: "MW",
        name: "Molecular Weight Distribution",
        description: "Box plot of molecular weights by bioactivity class",
    },
    BoxSpec {
        stem: "plot_LogP",
        column: "LogP",
        y_desc: "LogP",
        name: "LogP Distribution",
        description: "Box plot of LogP values by bioactivity class",
    },
    BoxSpec {
        stem: "plot_NumHDonors",
        column: "NumHDonors",
        y_desc: "NumHDonors",
        name: "Hydrogen Donors Distribution",
        description: "Box plot of H-bond donors by bioactivity class",
    },
    BoxSpec {
        stem: "plot_NumHAcceptors",
        column: "NumHAcceptors",
        y_desc: "NumHAcceptors",
        name: "Hydrogen Acceptors Distribution",
        description: "Box plot of H-bond acceptors by bioactivity class",
    },
];

fn class_color(class: PotencyClass) -> RGBColor {
    match class {
        PotencyClass::Inactive => INACTIVE_COLOR,
        _ => ACTIVE_COLOR,
    }
}

fn class_label(x: &SegmentValue<i32>) -> String {
    match x {
        SegmentValue::CenterOf(i) => CLASSES
            .get(*i as usize)
            .map(|c| c.as_str().to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Range around `values` with 10% headroom; degenerate ranges widen by 1.
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let pad = if hi > lo { (hi - lo) * 0.1 } else { 1.0 };
    (lo - pad, hi + pad)
}

/// Writes chart files into one directory.
pub struct PlotRenderer {
    output_dir: PathBuf,
    url_prefix: String,
}

impl PlotRenderer {
    /// Charts directly under `output_dir`, served at `/outputs/<file>`.
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            url_prefix: OUTPUTS_URL_PREFIX.to_string(),
        }
    }

    /// Charts under `outputs_dir/<run_id>`, served at
    /// `/outputs/<run_id>/<file>`. Concurrent runs never share a file.
    pub fn for_run<P: AsRef<Path>>(outputs_dir: P, run_id: &str) -> Self {
        Self {
            output_dir: outputs_dir.as_ref().join(run_id),
            url_prefix: format!("{}{}/", OUTPUTS_URL_PREFIX, run_id),
        }
    }

    fn file(&self, stem: &str) -> (PathBuf, String) {
        let name = format!("{}.svg", stem);
        (self.output_dir.join(&name), format!("{}{}", self.url_prefix, name))
    }

    /// Render the descriptor charts. Any failure is logged and yields no
    /// charts at all.
    pub fn render_all(&self, records: &[CompoundRecord]) -> Vec<PlotInfo> {
        let two_class: Vec<&CompoundRecord> = records
            .iter()
            .filter(|r| r.class != PotencyClass::Intermediate)
            .collect();
        if two_class.is_empty() {
            warn!("No active/inactive compounds to plot");
            return Vec::new();
        }

        match self.try_render_all(&two_class) {
            Ok(plots) => {
                info!("Generated {} plots", plots.len());
                plots
            }
            Err(e) => {
                error!("Plot generation failed: {}", e);
                Vec::new()
            }
        }
    }

    fn try_render_all(&self, records: &[&CompoundRecord]) -> Result<Vec<PlotInfo>> {
        std::fs::create_dir_all(&self.output_dir)?;
        let mut plots = Vec::with_capacity(2 + BOX_PLOTS.len());

        let (path, url) = self.file("plot_bioactivity_class");
        class_bar_chart(&path, records)?;
        plots.push(PlotInfo {
            name: "Bioactivity Class Distribution".into(),
            description: "Count of compounds by bioactivity classification".into(),
            image_path: url,
            kind: PlotKind::Bar,
        });

        let (path, url) = self.file("plot_MW_vs_LogP");
        mw_logp_scatter(&path, records)?;
        plots.push(PlotInfo {
            name: "Molecular Weight vs LogP".into(),
            description: "Relationship between molecular weight and lipophilicity".into(),
            image_path: url,
            kind: PlotKind::Scatter,
        });

        for spec in &BOX_PLOTS {
            let (path, url) = self.file(spec.stem);
            class_box_plot(&path, records, spec)?;
            plots.push(PlotInfo {
                name: spec.name.into(),
                description: spec.description.into(),
                image_path: url,
                kind: PlotKind::Box,
            });
        }
        Ok(plots)
    }

    /// Predicted vs experimental scatter with the identity line.
    pub fn render_regression(&self, actual: &[f64], predicted: &[f64]) -> Option<RegressionPlotInfo> {
        let (path, url) = self.file("predicted_experimental_pIC50");
        let rendered = std::fs::create_dir_all(&self.output_dir)
            .map_err(anyhow::Error::from)
            .and_then(|_| regression_scatter(&path, actual, predicted));
        match rendered {
            Ok(()) => {
                info!("Regression plot saved");
                Some(RegressionPlotInfo {
                    name: "Predicted vs Experimental pIC50".into(),
                    description: "Scatter plot showing model predictions against experimental values with perfect prediction line".into(),
                    image_path: url,
                })
            }
            Err(e) => {
                error!("Failed to generate regression plot: {}", e);
                None
            }
        }
    }
}

fn class_bar_chart(path: &Path, records: &[&CompoundRecord]) -> Result<()> {
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let counts: Vec<u32> = CLASSES
        .iter()
        .map(|c| records.iter().filter(|r| r.class == *c).count() as u32)
        .collect();
    let max_count = counts.iter().copied().max().unwrap_or(0).max(1);

    let mut chart = ChartBuilder::on(&root)
        .caption("Bioactivity Class Distribution", ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((0i32..2).into_segmented(), 0u32..max_count + max_count / 10 + 1)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(2)
        .x_label_formatter(&class_label)
        .x_desc("Bioactivity class")
        .y_desc("Frequency")
        .draw()?;

    for (i, (class, count)) in CLASSES.iter().zip(&counts).enumerate() {
        let i = i as i32;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(SegmentValue::Exact(i), 0), (SegmentValue::Exact(i + 1), *count)],
            class_color(*class).filled(),
        )))?;
    }

    root.present()?;
    Ok(())
}

fn mw_logp_scatter(path: &Path, records: &[&CompoundRecord]) -> Result<()> {
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let (x_lo, x_hi) = padded_range(records.iter().map(|r| r.descriptors.mw));
    let (y_lo, y_hi) = padded_range(records.iter().map(|r| r.descriptors.logp));
    let (p_lo, p_hi) = records
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| (lo.min(r.pic50), hi.max(r.pic50)));
    // Marker radius 3..=9 px scaled by pIC50.
    let radius = |pic50: f64| -> i32 {
        let t = if p_hi > p_lo { (pic50 - p_lo) / (p_hi - p_lo) } else { 0.5 };
        (3.0 + 6.0 * t).round() as i32
    };

    let mut chart = ChartBuilder::on(&root)
        .caption("MW vs LogP", ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

    chart.configure_mesh().x_desc("MW").y_desc("LogP").draw()?;

    for class in CLASSES {
        let color = class_color(class);
        chart
            .draw_series(records.iter().filter(|r| r.class == class).map(|r| {
                Circle::new((r.descriptors.mw, r.descriptors.logp), radius(r.pic50), color.mix(0.7).filled())
            }))?
            .label(class.as_str())
            .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn class_box_plot(path: &Path, records: &[&CompoundRecord], spec: &BoxSpec) -> Result<()> {
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let groups: Vec<Vec<f64>> = CLASSES
        .iter()
        .map(|c| {
            records
                .iter()
                .filter(|r| r.class == *c)
                .filter_map(|r| r.column(spec.column))
                .collect()
        })
        .collect();
    let (lo, hi) = padded_range(groups.iter().flatten().copied());

    let mut chart = ChartBuilder::on(&root)
        .caption(spec.name, ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((0i32..2).into_segmented(), lo as f32..hi as f32)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(2)
        .x_label_formatter(&class_label)
        .x_desc("Bioactivity class")
        .y_desc(spec.y_desc)
        .draw()?;

    for (i, (class, values)) in CLASSES.iter().zip(&groups).enumerate() {
        if values.is_empty() {
            continue;
        }
        let quartiles = Quartiles::new(values);
        chart.draw_series(std::iter::once(
            Boxplot::new_vertical(SegmentValue::CenterOf(i as i32), &quartiles)
                .width(60)
                .whisker_width(0.5)
                .style(class_color(*class)),
        ))?;
    }

    root.present()?;
    Ok(())
}

fn regression_scatter(path: &Path, actual: &[f64], predicted: &[f64]) -> Result<()> {
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let (lo, hi) = padded_range(actual.iter().chain(predicted).copied());
    let mut chart = ChartBuilder::on(&root)
        .caption("Predicted vs Experimental pIC50", ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(lo..hi, lo..hi)?;

    chart
        .configure_mesh()
        .x_desc("Experimental pIC50")
        .y_desc("Predicted pIC50")
        .draw()?;

    chart.draw_series(
        actual
            .iter()
            .zip(predicted)
            .map(|(&a, &p)| Circle::new((a, p), 4, ACTIVE_COLOR.mix(0.4).filled())),
    )?;

    // Identity line between the data extremes, dashed.
    let (min_val, max_val) = actual
        .iter()
        .chain(predicted)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if min_val < max_val {
        const DASHES: usize = 40;
        let step = (max_val - min_val) / DASHES as f64;
        chart.draw_series((0..DASHES).step_by(2).map(|k| {
            let a = min_val + step * k as f64;
            let b = a + step;
            PathElement::new(vec![(a, a), (b, b)], RED.mix(0.8).stroke_width(2))
        }))?;
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use drugpredict_molecules::LipinskiDescriptors;

    fn record(id: usize, class: PotencyClass) -> CompoundRecord {
        let f = id as f64;
        CompoundRecord {
            molecule_chembl_id: format!("CHEMBL{}", id),
            canonical_smiles: "CCO".into(),
            standard_value: 100.0,
            class,
            descriptors: LipinskiDescriptors { mw: 200.0 + 10.0 * f, logp: 1.0 + 0.1 * f, h_donors: 1, h_acceptors: 2 },
            pic50: 5.0 + 0.2 * f,
        }
    }

    #[test]
    fn test_render_all_writes_seven_charts() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<_> = (0..8)
            .map(|i| {
                let class = match i % 3 {
                    0 => PotencyClass::Active,
                    1 => PotencyClass::Inactive,
                    _ => PotencyClass::Intermediate,
                };
                record(i, class)
            })
            .collect();

        let plots = PlotRenderer::new(dir.path()).render_all(&records);
        assert_eq!(plots.len(), 7);
        assert_eq!(plots[0].image_path, "/outputs/plot_bioactivity_class.svg");
        assert_eq!(plots[1].kind, PlotKind::Scatter);
        assert!(plots[2..].iter().all(|p| p.kind == PlotKind::Box));
        for plot in &plots {
            let file = plot.image_path.trim_start_matches(OUTPUTS_URL_PREFIX);
            assert!(dir.path().join(file).is_file(), "missing {}", file);
        }

        let json = serde_json::to_value(&plots[0]).unwrap();
        assert_eq!(json["type"], "bar");
        assert_eq!(json["imagePath"], "/outputs/plot_bioactivity_class.svg");
    }

    #[test]
    fn test_single_class_still_renders() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<_> = (0..4).map(|i| record(i, PotencyClass::Active)).collect();
        assert_eq!(PlotRenderer::new(dir.path()).render_all(&records).len(), 7);
    }

    #[test]
    fn test_no_two_class_records_gives_no_plots() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![record(1, PotencyClass::Intermediate)];
        assert!(PlotRenderer::new(dir.path()).render_all(&records).is_empty());
    }

    #[test]
    fn test_runs_write_to_separate_directories() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<_> = (0..4).map(|i| record(i, PotencyClass::Active)).collect();

        let first = PlotRenderer::for_run(dir.path(), "run-a").render_all(&records);
        let second = PlotRenderer::for_run(dir.path(), "run-b").render_all(&records);

        assert_eq!(first[1].image_path, "/outputs/run-a/plot_MW_vs_LogP.svg");
        assert_eq!(second[1].image_path, "/outputs/run-b/plot_MW_vs_LogP.svg");
        assert!(dir.path().join("run-a").join("plot_MW_vs_LogP.svg").is_file());
        assert!(dir.path().join("run-b").join("plot_MW_vs_LogP.svg").is_file());
    }

    #[test]
    fn test_regression_plot() {
        let dir = tempfile::tempdir().unwrap();
        let info = PlotRenderer::new(dir.path())
            .render_regression(&[5.0, 6.0, 7.0], &[5.2, 5.9, 6.5])
            .unwrap();
        assert_eq!(info.image_path, "/outputs/predicted_experimental_pIC50.svg");
        assert!(dir.path().join("predicted_experimental_pIC50.svg").is_file());
    }
}
