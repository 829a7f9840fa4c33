//! Page rasterization through external rendering tools.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use super::Rasterizer;
use crate::context::CallContext;
use crate::error::{ExtractError, Result};
use crate::models::config::PdfConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Rasterizer that shells out to `pdftoppm`, then ImageMagick `convert`.
///
/// The second tool runs only when the first is missing or exits with an
/// error. Running tools are killed once the call context is done.
#[derive(Debug, Clone)]
pub struct ExternalRasterizer {
    dpi: u32,
    quality: u8,
    primary: String,
    fallback: String,
}

impl ExternalRasterizer {
    pub fn new(config: &PdfConfig) -> Self {
        Self {
            dpi: config.render_dpi,
            quality: config.jpeg_quality,
            primary: config.primary_renderer.clone(),
            fallback: config.fallback_renderer.clone(),
        }
    }

    /// Arguments for `tool`, chosen by its program name.
    fn render_args(&self, tool: &str, input: &Path, out_dir: &Path) -> Vec<String> {
        let program = Path::new(tool)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(tool);

        if program == "pdftoppm" {
            vec![
                "-jpeg".to_string(),
                "-r".to_string(),
                self.dpi.to_string(),
                "-jpegopt".to_string(),
                format!("quality={}", self.quality),
                input.display().to_string(),
                out_dir.join("page").display().to_string(),
            ]
        } else {
            vec![
                "-density".to_string(),
                self.dpi.to_string(),
                "-quality".to_string(),
                self.quality.to_string(),
                input.display().to_string(),
                out_dir.join("page.jpg").display().to_string(),
            ]
        }
    }

    fn render_with(&self, ctx: &CallContext, tool: &str, input: &Path, out_dir: &Path) -> std::result::Result<(), String> {
        let mut command = Command::new(tool);
        command.args(self.render_args(tool, input, out_dir));
        debug!("Rendering PDF with {}", tool);
        run_to_completion(ctx, command)
    }
}

impl Default for ExternalRasterizer {
    fn default() -> Self {
        Self::new(&PdfConfig::default())
    }
}

impl Rasterizer for ExternalRasterizer {
    fn rasterize(&self, ctx: &CallContext, data: &[u8]) -> Result<Vec<Vec<u8>>> {
        let dir = tempfile::Builder::new()
            .prefix("invx-render-")
            .tempdir()
            .map_err(|e| ExtractError::Render(format!("cannot create render directory: {}", e)))?;
        let input = stage_input(dir.path(), data)?;

        if let Err(primary_err) = self.render_with(ctx, &self.primary, &input, dir.path()) {
            warn!("{} failed, trying {}: {}", self.primary, self.fallback, primary_err);
            if let Err(fallback_err) = self.render_with(ctx, &self.fallback, &input, dir.path()) {
                return Err(ExtractError::Render(format!(
                    "{} and {} both failed: {}; {}",
                    self.primary, self.fallback, primary_err, fallback_err
                )));
            }
        }

        let images = collect_images(dir.path())
            .map_err(|e| ExtractError::Render(format!("cannot read rendered pages: {}", e)))?;
        if images.is_empty() {
            return Err(ExtractError::NoImagesProduced);
        }

        debug!("Rendered {} page images", images.len());
        Ok(images)
    }
}

/// Write the PDF bytes where the rendering tools can read them.
fn stage_input(dir: &Path, data: &[u8]) -> Result<PathBuf> {
    let input = dir.join("input.pdf");
    std::fs::write(&input, data)
        .map_err(|e| ExtractError::Render(format!("cannot stage PDF for rendering: {}", e)))?;
    Ok(input)
}

/// Run a command, killing it if the context finishes first.
///
/// Stderr is drained on a helper thread so a chatty tool never blocks on a
/// full pipe while we poll for its exit.
fn run_to_completion(ctx: &CallContext, mut command: Command) -> std::result::Result<(), String> {
    let program = command.get_program().to_string_lossy().into_owned();
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("{}: {}", program, e))?;

    let stderr_reader = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    });

    let status: ExitStatus = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if ctx.is_done() => {
                let _ = child.kill();
                let _ = child.wait();
                // Grandchildren may still hold the pipe; leave the reader detached.
                return Err(format!("{}: cancelled", program));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(format!("{}: {}", program, e));
            }
        }
    };

    let stderr = stderr_reader
        .and_then(|reader| reader.join().ok())
        .unwrap_or_default();

    if status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(stderr_tail(&stderr));
    Err(format!("{}: {} {}", program, status, stderr.trim()).trim_end().to_string())
}

/// Last few kilobytes of tool output, enough for the error message.
fn stderr_tail(buf: &[u8]) -> &[u8] {
    const MAX_STDERR: usize = 4096;
    &buf[buf.len().saturating_sub(MAX_STDERR)..]
}

/// Read every rendered page image in `dir`, sorted by file name.
fn collect_images(dir: &Path) -> std::io::Result<Vec<Vec<u8>>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    paths.iter().map(std::fs::read).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pdftoppm_arguments() {
        let rasterizer = ExternalRasterizer::default();
        let args = rasterizer.render_args("pdftoppm", Path::new("/tmp/x/input.pdf"), Path::new("/tmp/x"));
        assert_eq!(
            args,
            vec!["-jpeg", "-r", "100", "-jpegopt", "quality=80", "/tmp/x/input.pdf", "/tmp/x/page"]
        );
    }

    #[test]
    fn test_convert_arguments() {
        let mut config = PdfConfig::default();
        config.render_dpi = 150;
        let rasterizer = ExternalRasterizer::new(&config);
        let args = rasterizer.render_args("/usr/bin/convert", Path::new("in.pdf"), Path::new("out"));
        assert_eq!(args, vec!["-density", "150", "-quality", "80", "in.pdf", "out/page.jpg"]);
    }

    #[test]
    fn test_both_tools_missing() {
        let mut config = PdfConfig::default();
        config.primary_renderer = "invx-missing-renderer-one".to_string();
        config.fallback_renderer = "invx-missing-renderer-two".to_string();
        let rasterizer = ExternalRasterizer::new(&config);

        let err = rasterizer
            .rasterize(&CallContext::background(), b"%PDF-1.4")
            .unwrap_err();
        match err {
            ExtractError::Render(message) => {
                assert!(message.contains("invx-missing-renderer-one"));
                assert!(message.contains("invx-missing-renderer-two"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_collect_images_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page-2.jpg"), b"second").unwrap();
        std::fs::write(dir.path().join("page-1.jpg"), b"first").unwrap();
        std::fs::write(dir.path().join("cover.PNG"), b"png").unwrap();
        std::fs::write(dir.path().join("input.pdf"), b"%PDF").unwrap();

        let images = collect_images(dir.path()).unwrap();
        assert_eq!(images, vec![b"png".to_vec(), b"first".to_vec(), b"second".to_vec()]);
    }

    #[test]
    fn test_empty_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_images(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_staging_failure_is_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");

        let err = stage_input(&missing, b"%PDF-1.4").unwrap_err();
        assert!(matches!(err, ExtractError::Render(_)));
        assert_eq!(err.kind(), "render_failure");
        assert!(err.to_string().contains("cannot stage PDF"));
    }

    #[test]
    fn test_stage_input_writes_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let input = stage_input(dir.path(), b"%PDF-1.4").unwrap();
        assert_eq!(std::fs::read(input).unwrap(), b"%PDF-1.4".to_vec());
    }

    #[test]
    fn test_stderr_tail_keeps_end() {
        let buf: Vec<u8> = (0..5000).map(|i| if i < 4000 { b'a' } else { b'z' }).collect();
        let tail = stderr_tail(&buf);
        assert_eq!(tail.len(), 4096);
        assert!(tail.ends_with(b"zzz"));
        assert_eq!(stderr_tail(b"short"), b"short");
    }

    #[cfg(unix)]
    #[test]
    fn test_noisy_tool_does_not_block_on_stderr() {
        // Far more than a pipe buffer holds before the tool can exit.
        let mut command = Command::new("sh");
        command.args(["-c", "head -c 200000 /dev/zero | tr '\\0' x >&2; echo broken >&2; exit 3"]);

        let ctx = CallContext::with_timeout(Duration::from_secs(30));
        let started = std::time::Instant::now();
        let err = run_to_completion(&ctx, command).unwrap_err();

        assert!(!err.contains("cancelled"), "{}", err);
        assert!(err.ends_with("broken"), "{}", err);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn test_cancelled_context_kills_tool() {
        let ctx = CallContext::background();
        ctx.cancel();

        let mut command = Command::new("sleep");
        command.arg("5");
        let started = std::time::Instant::now();
        let err = run_to_completion(&ctx, command).unwrap_err();

        assert!(err.contains("cancelled"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
