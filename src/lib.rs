// Library exports for forestgen

pub mod config;
pub mod data;
pub mod error;
pub mod ingest;
pub mod numeric;
pub mod parser;
pub mod session;
pub mod validate;

// Script synthesis
pub mod compiler;
pub mod ir;
pub mod layout;
pub mod printer;
pub mod scale;

// Execution and orchestration
pub mod pipeline;
pub mod runtime;

pub use compiler::{synthesize, synthesize_script};
pub use config::{Auto, AxisType, ColorScheme, Dpi, EffectMeasure, LayoutStyle, PlotConfig};
pub use data::{Cell, OutcomeRow, RawRow};
pub use error::{ForestError, ForestResult};
pub use layout::{estimate, PlotDimensions};
pub use pipeline::{prepare, ForestPipeline, PreparedPlot, RenderedPlot};
pub use runtime::{DeviceSpec, RenderedImage, RscriptConfig, RscriptExecutor, ScriptExecutor};
pub use validate::{validate_dataset, validate_row, ValidationPolicy, ValidationResult};
