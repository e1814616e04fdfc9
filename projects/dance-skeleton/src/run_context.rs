use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Creates the upload and output directories. Safe to call repeatedly.
pub fn ensure_dirs(upload_dir: &Path, processed_dir: &Path) -> Result<()> {
    for dir in [upload_dir, processed_dir] {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {:?}", dir))?;
    }
    Ok(())
}

/// Paths owned by one upload, keyed by a short random id.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job_id: String,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    output_name: String,
}

impl JobContext {
    pub fn new(upload_dir: &Path, processed_dir: &Path, original_name: Option<&str>) -> Self {
        let job_id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();

        let suffix = original_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        let output_name = format!("{}_sidebyside.mp4", job_id);

        Self {
            input_path: upload_dir.join(format!("{}_temp{}", job_id, suffix)),
            output_path: processed_dir.join(&output_name),
            output_name,
            job_id,
        }
    }

    /// URL path under which the static server exposes the output.
    pub fn public_output_path(&self) -> String {
        format!("processed/{}", self.output_name)
    }
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed {:?}", path),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove {:?}: {}", path, e),
    }
}

/// Uploaded input; deleted when the guard drops, whatever the outcome.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        remove_quietly(&self.path);
    }
}

/// Output video; deleted on drop unless [`OutputFile::keep`] was called.
#[derive(Debug)]
pub struct OutputFile {
    path: PathBuf,
    keep: bool,
}

impl OutputFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn keep(mut self) {
        self.keep = true;
    }
}

impl Drop for OutputFile {
    fn drop(&mut self) {
        if !self.keep {
            remove_quietly(&self.path);
        }
    }
}
