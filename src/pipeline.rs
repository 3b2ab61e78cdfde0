// =============================================================================
// Render Pipeline
// =============================================================================
//
// validate -> estimate -> synthesize, and optionally execute with an
// injected executor.

use serde::Serialize;

use crate::compiler::synthesize;
use crate::config::PlotConfig;
use crate::data::RawRow;
use crate::error::{ForestError, ForestResult};
use crate::layout::{estimate, PlotDimensions};
use crate::runtime::{DeviceSpec, RenderedImage, ScriptExecutor};
use crate::validate::{validate_dataset, ValidationResult};

/// A synthesized script with the facts it was built from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedPlot {
    pub script: String,
    pub dimensions: PlotDimensions,
    pub validation: ValidationResult,
    /// Rows drawn as a point with an interval.
    pub plotted_rows: usize,
    /// Rows emitted into the data table, plotted or not.
    pub total_rows: usize,
}

impl PreparedPlot {
    pub fn device(&self, config: &PlotConfig) -> DeviceSpec {
        DeviceSpec::new(self.dimensions, config.dpi)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPlot {
    pub prepared: PreparedPlot,
    pub image: RenderedImage,
}

/// Validate, size and synthesize a script for `rows`.
///
/// Validation problems are reported in the result, not as an error; only a
/// bad configuration or a dataset with no labelled rows fails.
#[tracing::instrument(skip(rows, config), fields(rows = rows.len()))]
pub fn prepare(rows: &[RawRow], config: &PlotConfig) -> ForestResult<PreparedPlot> {
    config.validate()?;

    let dataset = validate_dataset(rows, config.validation);
    if dataset.rows.is_empty() {
        let reason = dataset
            .result
            .errors
            .first()
            .cloned()
            .unwrap_or_else(|| "Dataset is empty".to_string());
        return Err(ForestError::empty_input(reason));
    }

    let plot_rows = dataset.plot_rows();
    let dimensions = estimate(plot_rows.len(), config);
    let script = synthesize(&plot_rows, config, dimensions)?;
    let plotted_rows = dataset.eligible_count();

    tracing::info!(
        plotted = plotted_rows,
        total = plot_rows.len(),
        errors = dataset.result.errors.len(),
        "prepared script"
    );
    Ok(PreparedPlot {
        script,
        dimensions,
        plotted_rows,
        total_rows: plot_rows.len(),
        validation: dataset.result,
    })
}

/// Owns the execution boundary so callers never reach a global runtime.
pub struct ForestPipeline<E: ScriptExecutor> {
    executor: E,
}

impl<E: ScriptExecutor> ForestPipeline<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn prepare(&self, rows: &[RawRow], config: &PlotConfig) -> ForestResult<PreparedPlot> {
        prepare(rows, config)
    }

    /// Prepare and execute. The executor must report ready before any
    /// synthesis happens.
    pub fn render(&self, rows: &[RawRow], config: &PlotConfig) -> ForestResult<RenderedPlot> {
        if !self.executor.is_ready() {
            return Err(ForestError::not_ready("script executor is not ready"));
        }
        let prepared = prepare(rows, config)?;
        let image = self
            .executor
            .execute(&prepared.script, &prepared.device(config))?;
        Ok(RenderedPlot { prepared, image })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutStyle;
    use crate::data::{Cell, OutcomeRow};
    use std::cell::RefCell;

    /// Records what it was asked to run and returns a 1x1 PNG.
    struct RecordingExecutor {
        ready: bool,
        calls: RefCell<Vec<(String, DeviceSpec)>>,
    }

    impl RecordingExecutor {
        fn new(ready: bool) -> Self {
            Self { ready, calls: RefCell::new(Vec::new()) }
        }
    }

    impl ScriptExecutor for RecordingExecutor {
        fn is_ready(&self) -> bool {
            self.ready
        }

        fn execute(&self, script: &str, device: &DeviceSpec) -> ForestResult<RenderedImage> {
            self.calls.borrow_mut().push((script.to_string(), *device));
            let img = image::RgbaImage::new(1, 1);
            let mut buf = std::io::Cursor::new(Vec::new());
            image::DynamicImage::ImageRgba8(img)
                .write_to(&mut buf, image::ImageOutputFormat::Png)
                .map_err(|e| ForestError::execution(e.to_string()))?;
            RenderedImage::from_png(buf.into_inner())
        }
    }

    fn raw_rows() -> Vec<RawRow> {
        vec![
            RawRow::from_outcome(&OutcomeRow::new("Trial 1", 1.5, 1.1, 2.0)),
            RawRow::from_outcome(&OutcomeRow::new("Trial 2", 0.8, 0.5, 1.2)),
            RawRow {
                outcome: Some("Trial 3".into()),
                value: Some(Cell::Text("abc".into())),
                ..RawRow::default()
            },
        ]
    }

    #[test]
    fn test_prepare_reports_and_keeps_labels() {
        let prepared = prepare(&raw_rows(), &PlotConfig::default()).unwrap();
        assert_eq!(prepared.plotted_rows, 2);
        assert_eq!(prepared.total_rows, 3);
        assert_eq!(prepared.validation.errors, vec!["Row 3: Value must be a number"]);
        assert!(prepared.script.contains(r#""Trial 3""#));
        // 2.5 + 1 + 0.5 * 3
        assert_eq!(prepared.dimensions, PlotDimensions { width: 10.0, height: 5.0 });
    }

    #[test]
    fn test_partial_row_keeps_slot_but_is_not_plotted() {
        let rows = vec![
            RawRow::from_outcome(&OutcomeRow::new("A", 1.5, 1.1, 2.0)),
            RawRow {
                outcome: Some("B".into()),
                value: Some(Cell::Number(9.0)),
                ..RawRow::default()
            },
        ];
        let prepared = prepare(&rows, &PlotConfig::default()).unwrap();
        assert!(prepared.validation.is_valid);
        assert_eq!(prepared.plotted_rows, 1);
        assert_eq!(prepared.total_rows, 2);
        assert!(prepared.script.contains("plotted = c(TRUE, FALSE)"));
        // Range comes from the drawn interval only
        assert!(prepared.script.contains("limits = c(0.8462, 2.6000)"));
    }

    #[test]
    fn test_prepare_empty_dataset() {
        let err = prepare(&[], &PlotConfig::default()).unwrap_err();
        assert!(matches!(err, ForestError::EmptyInput(ref m) if m == "Dataset is empty"));
    }

    #[test]
    fn test_prepare_rejects_bad_config() {
        let config = PlotConfig { point_size: -1.0, ..PlotConfig::default() };
        assert!(matches!(prepare(&raw_rows(), &config), Err(ForestError::Config(_))));
    }

    #[test]
    fn test_render_requires_ready_executor() {
        let pipeline = ForestPipeline::new(RecordingExecutor::new(false));
        let err = pipeline.render(&raw_rows(), &PlotConfig::default()).unwrap_err();
        assert!(matches!(err, ForestError::NotReady(_)));
        assert!(pipeline.executor().calls.borrow().is_empty());
    }

    #[test]
    fn test_render_passes_script_and_device() {
        let pipeline = ForestPipeline::new(RecordingExecutor::new(true));
        let config = PlotConfig { layout_style: LayoutStyle::Table, ..PlotConfig::default() };
        let rendered = pipeline.render(&raw_rows(), &config).unwrap();

        assert_eq!(rendered.image.width, 1);
        let calls = pipeline.executor().calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, rendered.prepared.script);
        // Table style: 12in wide, 3.5 + 1 + 0.4 * 3 = 5.7in tall, at 300 dpi
        assert_eq!(calls[0].1, DeviceSpec { width_px: 3600, height_px: 1710, dpi: 300 });
    }
}
