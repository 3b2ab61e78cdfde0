// =============================================================================
// Execution Boundary
// =============================================================================
//
// Runs a synthesized script in an external R process and reads back the
// rendered image. The core never calls this directly; `pipeline` owns an
// injected executor.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::Context as _;
use base64::Engine as _;

use crate::compiler::required_packages;
use crate::config::{Dpi, LayoutStyle};
use crate::error::{ForestError, ForestResult};
use crate::ir::{Arg, Expr, Script, Statement};
use crate::layout::PlotDimensions;
use crate::printer::print_script;

/// Raster device the script draws into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSpec {
    pub width_px: u32,
    pub height_px: u32,
    pub dpi: u32,
}

impl DeviceSpec {
    pub fn new(dimensions: PlotDimensions, dpi: Dpi) -> Self {
        let (width_px, height_px) = dimensions.pixels(dpi);
        Self {
            width_px,
            height_px,
            dpi: dpi.value(),
        }
    }

    pub fn validate(&self) -> ForestResult<()> {
        if self.width_px == 0 || self.height_px == 0 {
            return Err(ForestError::execution("device width/height must be non-zero"));
        }
        Ok(())
    }
}

/// A decoded-and-checked PNG produced by the runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RenderedImage {
    /// Accept `bytes` only if they decode as a PNG.
    pub fn from_png(png: Vec<u8>) -> ForestResult<Self> {
        let decoded = image::load_from_memory_with_format(&png, image::ImageFormat::Png)
            .map_err(|e| ForestError::execution(format!("runtime produced an invalid PNG: {e}")))?;
        Ok(Self {
            width: decoded.width(),
            height: decoded.height(),
            png,
        })
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.png)
    }

    /// `data:image/png;base64,...` for embedding.
    pub fn to_data_uri(&self) -> String {
        format!("data:image/png;base64,{}", self.to_base64())
    }
}

/// Something that can turn script text into an image.
pub trait ScriptExecutor {
    /// Whether `execute` may be called.
    fn is_ready(&self) -> bool;

    fn execute(&self, script: &str, device: &DeviceSpec) -> ForestResult<RenderedImage>;
}

pub fn is_rscript_on_path(program: &Path) -> bool {
    Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[derive(Debug, Clone)]
pub struct RscriptConfig {
    pub program: PathBuf,
    /// Packages checked during initialization.
    pub packages: Vec<String>,
    /// Install missing packages instead of failing.
    pub install_missing: bool,
    pub repos: String,
    pub timeout: Option<Duration>,
}

impl Default for RscriptConfig {
    fn default() -> Self {
        let mut packages: Vec<String> = Vec::new();
        for style in [LayoutStyle::Layered, LayoutStyle::Table] {
            for pkg in required_packages(style) {
                if !packages.iter().any(|p| p.as_str() == *pkg) {
                    packages.push((*pkg).to_string());
                }
            }
        }
        Self {
            program: PathBuf::from("Rscript"),
            packages,
            install_missing: false,
            repos: "https://cloud.r-project.org".to_string(),
            timeout: Some(Duration::from_secs(120)),
        }
    }
}

/// Exit status the package check uses to report missing packages.
const MISSING_PACKAGES_STATUS: i32 = 3;

/// Executor backed by a local `Rscript` binary.
pub struct RscriptExecutor {
    config: RscriptConfig,
    ready: bool,
}

impl RscriptExecutor {
    pub fn new(config: RscriptConfig) -> Self {
        Self {
            config,
            ready: false,
        }
    }

    pub fn config(&self) -> &RscriptConfig {
        &self.config
    }

    /// Check the binary and required packages. Calling it again after
    /// success is a no-op.
    #[tracing::instrument(skip(self), fields(program = %self.config.program.display()))]
    pub fn initialize(&mut self) -> ForestResult<()> {
        if self.ready {
            return Ok(());
        }
        if !is_rscript_on_path(&self.config.program) {
            return Err(ForestError::not_ready(format!(
                "'{}' was not found; install R or pass its path",
                self.config.program.display()
            )));
        }

        let dir = tempfile::tempdir().context("failed to create scratch directory")?;
        let check = dir.path().join("packages.R");
        std::fs::write(&check, package_check_script(&self.config))
            .with_context(|| format!("failed to write '{}'", check.display()))?;

        let output = Command::new(&self.config.program)
            .arg("--vanilla")
            .arg(&check)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to spawn '{}'", self.config.program.display()))?;

        if !output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            if output.status.code() == Some(MISSING_PACKAGES_STATUS) {
                let missing: Vec<&str> = stdout.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
                return Err(ForestError::not_ready(format!(
                    "missing R packages: {} (rerun with package installation enabled)",
                    missing.join(", ")
                )));
            }
            return Err(ForestError::not_ready(format!(
                "package check failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        tracing::info!(packages = ?self.config.packages, "R runtime ready");
        self.ready = true;
        Ok(())
    }

    fn run(&self, wrapper: &Path, stderr_path: &Path) -> ForestResult<()> {
        let stderr = File::create(stderr_path)
            .with_context(|| format!("failed to create '{}'", stderr_path.display()))?;
        let mut child = Command::new(&self.config.program)
            .arg("--vanilla")
            .arg(wrapper)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(|e| {
                ForestError::execution(format!(
                    "failed to spawn '{}': {e}",
                    self.config.program.display()
                ))
            })?;

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait().context("failed to poll R process")? {
                break status;
            }
            if let Some(limit) = self.config.timeout {
                if started.elapsed() > limit {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ForestError::execution(format!(
                        "R process exceeded the {}s timeout",
                        limit.as_secs()
                    )));
                }
            }
            std::thread::sleep(Duration::from_millis(50));
        };

        if !status.success() {
            let log = std::fs::read_to_string(stderr_path).unwrap_or_default();
            return Err(ForestError::execution(format!(
                "R exited with {}: {}",
                status,
                last_lines(&log, 20)
            )));
        }
        Ok(())
    }
}

impl ScriptExecutor for RscriptExecutor {
    fn is_ready(&self) -> bool {
        self.ready
    }

    #[tracing::instrument(skip(self, script), fields(bytes = script.len()))]
    fn execute(&self, script: &str, device: &DeviceSpec) -> ForestResult<RenderedImage> {
        if !self.ready {
            return Err(ForestError::not_ready("R runtime has not been initialized"));
        }
        device.validate()?;

        let dir = tempfile::tempdir().context("failed to create scratch directory")?;
        let script_path = dir.path().join("plot.R");
        let wrapper_path = dir.path().join("run.R");
        let png_path = dir.path().join("plot.png");
        let stderr_path = dir.path().join("stderr.log");

        std::fs::write(&script_path, script)
            .with_context(|| format!("failed to write '{}'", script_path.display()))?;
        std::fs::write(&wrapper_path, device_wrapper(&script_path, &png_path, device))
            .with_context(|| format!("failed to write '{}'", wrapper_path.display()))?;

        self.run(&wrapper_path, &stderr_path)?;

        let png = std::fs::read(&png_path).map_err(|e| {
            ForestError::execution(format!("R finished but wrote no image: {e}"))
        })?;
        let image = RenderedImage::from_png(png)?;
        tracing::info!(width = image.width, height = image.height, "rendered plot");
        Ok(image)
    }
}

fn path_str(path: &Path) -> Expr {
    Expr::str(path.to_string_lossy().into_owned())
}

/// Opens the device, sources the script, and always closes the device.
pub fn device_wrapper(script: &Path, png: &Path, device: &DeviceSpec) -> String {
    let mut wrapper = Script::new();
    wrapper.push(Statement::Expr(Expr::call(
        "png",
        vec![
            Arg::named("filename", path_str(png)),
            Arg::named("width", Expr::Num(f64::from(device.width_px))),
            Arg::named("height", Expr::Num(f64::from(device.height_px))),
            Arg::named("res", Expr::Num(f64::from(device.dpi))),
        ],
    )));
    wrapper.push(Statement::Expr(Expr::call(
        "tryCatch",
        vec![
            Arg::positional(Expr::call(
                "source",
                vec![
                    Arg::positional(path_str(script)),
                    Arg::named("local", Expr::call("new.env", vec![])),
                ],
            )),
            Arg::named(
                "finally",
                Expr::call("invisible", vec![Arg::positional(Expr::call("dev.off", vec![]))]),
            ),
        ],
    )));
    print_script(&wrapper)
}

/// Lists missing packages on stdout and exits with a dedicated status, or
/// installs them when configured to.
fn package_check_script(config: &RscriptConfig) -> String {
    let wanted = Expr::Vector(config.packages.iter().map(|p| Expr::str(p.as_str())).collect());
    let missing = Expr::call(
        "setdiff",
        vec![
            Arg::positional(wanted),
            Arg::positional(Expr::call(
                "rownames",
                vec![Arg::positional(Expr::call("installed.packages", vec![]))],
            )),
        ],
    );

    let mut script = Script::new();
    script.push(Statement::assign("missing", missing));
    let action = if config.install_missing {
        format!(
            "install.packages(missing, repos = {})",
            crate::printer::quote(&config.repos)
        )
    } else {
        format!(
            "{{ cat(missing, sep = \"\\n\"); quit(status = {}) }}",
            MISSING_PACKAGES_STATUS
        )
    };
    let mut text = print_script(&script);
    text.push_str(&format!("if (length(missing) > 0) {}\n", action));
    text
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([255, 0, 0, 255]));
        let mut buf = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, image::ImageOutputFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_device_spec_pixels() {
        let dims = PlotDimensions { width: 10.0, height: 5.5 };
        let spec = DeviceSpec::new(dims, Dpi::D300);
        assert_eq!(spec, DeviceSpec { width_px: 3000, height_px: 1650, dpi: 300 });
        assert!(spec.validate().is_ok());
        assert!(DeviceSpec { width_px: 0, height_px: 1, dpi: 72 }.validate().is_err());
    }

    #[test]
    fn test_rendered_image_checks_png() {
        let image = RenderedImage::from_png(tiny_png()).unwrap();
        assert_eq!((image.width, image.height), (3, 2));
        assert!(image.to_data_uri().starts_with("data:image/png;base64,iVBORw0KGgo"));

        let err = RenderedImage::from_png(b"not a png".to_vec()).unwrap_err();
        assert!(matches!(err, ForestError::Execution(_)));
    }

    #[test]
    fn test_device_wrapper_closes_device() {
        let device = DeviceSpec { width_px: 3000, height_px: 1200, dpi: 300 };
        let text = device_wrapper(Path::new("/tmp/a b/plot.R"), Path::new("/tmp/a b/plot.png"), &device);
        assert_eq!(
            text,
            "png(filename = \"/tmp/a b/plot.png\", width = 3000, height = 1200, res = 300)\n\
             tryCatch(source(\"/tmp/a b/plot.R\", local = new.env()), finally = invisible(dev.off()))\n"
        );
    }

    #[test]
    fn test_package_check_script() {
        let config = RscriptConfig::default();
        assert_eq!(config.packages, vec!["ggplot2", "meta", "grid"]);

        let text = package_check_script(&config);
        assert!(text.starts_with(
            "missing <- setdiff(c(\"ggplot2\", \"meta\", \"grid\"), rownames(installed.packages()))\n"
        ));
        assert!(text.contains("quit(status = 3)"));

        let install = RscriptConfig { install_missing: true, ..RscriptConfig::default() };
        assert!(package_check_script(&install)
            .contains("install.packages(missing, repos = \"https://cloud.r-project.org\")"));
    }

    #[test]
    fn test_uninitialized_executor_is_not_ready() {
        let executor = RscriptExecutor::new(RscriptConfig::default());
        assert!(!executor.is_ready());
        let device = DeviceSpec { width_px: 10, height_px: 10, dpi: 72 };
        let err = executor.execute("plot(1)", &device).unwrap_err();
        assert!(matches!(err, ForestError::NotReady(_)));
    }

    #[test]
    fn test_missing_binary_fails_initialization() {
        let mut executor = RscriptExecutor::new(RscriptConfig {
            program: PathBuf::from("/nonexistent/forestgen-rscript"),
            ..RscriptConfig::default()
        });
        let err = executor.initialize().unwrap_err();
        assert!(matches!(err, ForestError::NotReady(_)));
        assert!(!executor.is_ready());
    }

    #[test]
    fn test_last_lines() {
        assert_eq!(last_lines("a\nb\nc", 2), "b\nc");
        assert_eq!(last_lines("", 3), "");
    }
}
