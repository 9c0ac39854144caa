use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;

use crate::app_config::Config;
use crate::file_utils::{FileManager, ADJUSTED_PREFIX, TRANSLATED_PREFIX};
use crate::subtitle_processor::{self, ShiftDelta};
use crate::translation::TranslationService;

// @module: Application controller for subtitle processing

/// What to do with each subtitle file
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Move every timestamp by a signed number of seconds
    Shift { offset_secs: f64 },
    /// Translate text lines between the configured languages
    Translate,
}

impl Operation {
    // @returns: Output filename prefix for this operation
    pub fn output_prefix(&self) -> &'static str {
        match self {
            Self::Shift { .. } => ADJUSTED_PREFIX,
            Self::Translate => TRANSLATED_PREFIX,
        }
    }
}

/// Main application controller: reads subtitle files, transforms them and writes the result
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Injected translation service, built from config when absent
    translation: Option<TranslationService>,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self {
            config,
            translation: None,
        })
    }

    /// Create a controller that translates through the given service
    pub fn with_translation_service(config: Config, service: TranslationService) -> Result<Self> {
        Ok(Self {
            config,
            translation: Some(service),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run an operation on a single subtitle file
    ///
    /// Returns the written output path, or `None` when an existing output was left alone.
    pub async fn run(&self, input_file: &Path, output_dir: &Path, operation: &Operation, force_overwrite: bool) -> Result<Option<PathBuf>> {
        match operation {
            Operation::Shift { offset_secs } => {
                self.shift_file(input_file, output_dir, *offset_secs, force_overwrite)
            }
            Operation::Translate => {
                self.translate_file(input_file, output_dir, force_overwrite).await
            }
        }
    }

    /// Shift every timestamp of `input_file` and write `adjusted_<name>` into `output_dir`
    pub fn shift_file(&self, input_file: &Path, output_dir: &Path, offset_secs: f64, force_overwrite: bool) -> Result<Option<PathBuf>> {
        let delta = ShiftDelta::from_seconds(offset_secs)?;

        Self::check_input(input_file)?;
        let Some(output_path) = Self::prepare_output(input_file, output_dir, ADJUSTED_PREFIX, force_overwrite)? else {
            return Ok(None);
        };

        let start_time = Instant::now();
        let reader = BufReader::new(
            File::open(input_file)
                .with_context(|| format!("Failed to open subtitle file: {:?}", input_file))?,
        );

        let mut temp = NamedTempFile::new_in(output_dir)
            .with_context(|| format!("Failed to create temporary file in {:?}", output_dir))?;
        let stats = subtitle_processor::shift_reader(reader, BufWriter::new(temp.as_file_mut()), &delta)
            .with_context(|| format!("Failed to shift subtitles in {:?}", input_file))?;
        temp.persist(&output_path)
            .map_err(|e| anyhow!("Failed to write {:?}: {}", output_path, e.error))?;

        if stats.lines > 0 && stats.shifted == 0 {
            warn!("No timing lines found in {:?}, output is an unshifted copy", input_file);
        }
        if stats.malformed > 0 {
            warn!("{} timing line(s) could not be parsed and were left unchanged", stats.malformed);
        }
        info!(
            "Shifted {} timing lines by {}s ({} clamped at zero) in {:.2?}: {:?}",
            stats.shifted, offset_secs, stats.clamped, start_time.elapsed(), output_path
        );

        Ok(Some(output_path))
    }

    /// Translate the text of `input_file` and write `translated_<name>` into `output_dir`
    pub async fn translate_file(&self, input_file: &Path, output_dir: &Path, force_overwrite: bool) -> Result<Option<PathBuf>> {
        let built;
        let service = match &self.translation {
            Some(service) => service,
            None => {
                built = TranslationService::from_config(&self.config)?;
                &built
            }
        };

        Self::check_input(input_file)?;
        let Some(output_path) = Self::prepare_output(input_file, output_dir, TRANSLATED_PREFIX, force_overwrite)? else {
            return Ok(None);
        };

        let start_time = Instant::now();
        let content = FileManager::read_to_string(input_file)?;
        let translated = service.translate_srt_string(&content).await
            .with_context(|| format!("Failed to translate {:?}", input_file))?;
        FileManager::write_atomic(&output_path, &translated)?;

        info!(
            "Translated {} -> {} in {:.2?}: {:?}",
            service.source_language(), service.target_language(), start_time.elapsed(), output_path
        );

        Ok(Some(output_path))
    }

    /// Run an operation on every `.srt` file below `input_dir`, writing next to each input
    ///
    /// Files produced by earlier runs (`adjusted_*`, `translated_*`) are skipped.
    /// Returns the number of files written.
    pub async fn run_folder(&self, input_dir: &Path, operation: &Operation, force_overwrite: bool) -> Result<usize> {
        if !FileManager::dir_exists(input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }
        if let Operation::Shift { offset_secs } = operation {
            ShiftDelta::from_seconds(*offset_secs)?;
        }

        info!("Processing subtitles in directory: {:?}", input_dir);

        let mut processed_count = 0;
        for path in FileManager::find_files(input_dir, "srt")? {
            if Self::is_generated_output(&path) {
                info!("Skipping {:?}, its name marks it as an earlier output", path);
                continue;
            }

            let output_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
            match self.run(&path, &output_dir, operation, force_overwrite).await {
                Ok(Some(_)) => processed_count += 1,
                Ok(None) => {}
                Err(e) => error!("Error processing file {:?}: {:#}", path, e),
            }
        }

        info!("Finished processing {} files", processed_count);
        Ok(processed_count)
    }

    fn check_input(input_file: &Path) -> Result<()> {
        if !FileManager::file_exists(input_file) {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }
        if !FileManager::is_srt_file(input_file) {
            return Err(anyhow!("Not a SubRip (.srt) file: {:?}", input_file));
        }
        Ok(())
    }

    /// Resolve the output path, or `None` if it exists and must not be overwritten
    fn prepare_output(input_file: &Path, output_dir: &Path, prefix: &str, force_overwrite: bool) -> Result<Option<PathBuf>> {
        FileManager::ensure_dir(output_dir)?;

        let output_path = FileManager::generate_output_path(input_file, output_dir, prefix);
        if output_path.exists() && !force_overwrite {
            warn!("Skipping {:?}, output already exists (use -f to force overwrite)", output_path);
            return Ok(None);
        }

        Ok(Some(output_path))
    }

    fn is_generated_output(path: &Path) -> bool {
        path.file_name()
            .map(|name| name.to_string_lossy())
            .is_some_and(|name| name.starts_with(ADJUSTED_PREFIX) || name.starts_with(TRANSLATED_PREFIX))
    }
}
