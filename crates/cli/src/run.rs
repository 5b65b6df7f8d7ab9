//! `streetscape run` / `streetscape validate`: config-driven feature pipeline.

use std::path::{Path, PathBuf};

use streetscape_cli::pipeline::{http_segmenter, run_pipeline, PipelineError, RunSummary};
use streetscape_config::{resolve_path, PipelineConfig};
use streetscape_engine::Segmenter;

use crate::exit_codes::{
    pipeline_exit_code, EXIT_ERROR, EXIT_INPUT, EXIT_INVALID_CONFIG, EXIT_OUTPUT, EXIT_USAGE,
};
use crate::CliError;

fn pipeline_err(err: PipelineError) -> CliError {
    let hint = match &err {
        PipelineError::Engine(streetscape_engine::EngineError::ConceptNotInVocabulary(_)) => {
            Some("every [embedding] concept must have a vector; check `concepts` and `limit`")
        }
        PipelineError::Recon(_) => Some("re-run with -v to see per-stage record counts"),
        _ => None,
    };
    CliError {
        code: pipeline_exit_code(&err),
        message: err.to_string(),
        hint: hint.map(String::from),
    }
}

/// Config file plus the directory its relative paths resolve against.
fn load_config(config_path: &Path) -> Result<(PipelineConfig, PathBuf), CliError> {
    let config = PipelineConfig::from_file(config_path).map_err(|e| CliError {
        code: EXIT_INVALID_CONFIG,
        message: e.to_string(),
        hint: None,
    })?;
    let base_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    Ok((config, base_dir))
}

/// `--output` must not point at the config it was given.
fn check_output_path(config_path: &Path, output_file: Option<&Path>) -> Result<(), CliError> {
    let Some(output) = output_file else {
        return Ok(());
    };
    let same = output == config_path
        || matches!(
            (output.canonicalize(), config_path.canonicalize()),
            (Ok(a), Ok(b)) if a == b
        );
    if same {
        return Err(CliError {
            code: EXIT_USAGE,
            message: format!("--output would overwrite the config file {}", output.display()),
            hint: Some("write the summary to a separate .json file".into()),
        });
    }
    Ok(())
}

pub fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    skip_segmentation: bool,
) -> Result<(), CliError> {
    check_output_path(&config_path, output_file.as_deref())?;
    let (config, base_dir) = load_config(&config_path)?;

    let segmenter = if skip_segmentation {
        log::info!("segmentation skipped (--skip-segmentation)");
        None
    } else {
        http_segmenter(&config.segmentation, &base_dir).map_err(pipeline_err)?
    };
    let segmenter_ref = segmenter.as_ref().map(|s| s as &dyn Segmenter);

    let summary = run_pipeline(&config, &base_dir, segmenter_ref).map_err(pipeline_err)?;

    let json_str = serde_json::to_string_pretty(&summary).map_err(|e| CliError {
        code: EXIT_ERROR,
        message: format!("JSON serialization error: {e}"),
        hint: None,
    })?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str).map_err(|e| CliError {
            code: EXIT_OUTPUT,
            message: format!("cannot write {}: {e}", path.display()),
            hint: None,
        })?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    print_summary(&summary);
    Ok(())
}

/// Human summary to stderr.
fn print_summary(summary: &RunSummary) {
    let r = &summary.reconciliation;
    eprintln!(
        "{}: {} row(s) x {} column(s); kept {}/{} parcels, {}/{} observations, {}/{} images",
        summary.name,
        summary.rows,
        summary.columns,
        r.parcels.kept,
        r.parcels.input,
        r.observations.kept,
        r.observations.input,
        r.images.kept,
        r.images.input,
    );
    if r.unparseable_parcel_keys > 0 {
        eprintln!("dropped {} observation(s) with a non-integer parcel key", r.unparseable_parcel_keys);
    }
    if let Some(ref greenery) = summary.greenery {
        eprintln!(
            "segmentation: {} image(s) segmented, {} failed",
            greenery.segmented,
            greenery.failed.len()
        );
    }
    if let Some(ref projection) = summary.projection {
        eprintln!(
            "projection: {} of {} known word(s) projected",
            projection.projected_words, projection.known_words
        );
    }
    for path in &summary.outputs {
        eprintln!("wrote {}", path.display());
    }
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&config_path)?;

    let sources = &config.sources;
    let mut inputs = vec![
        ("sources.parcels.file", sources.parcels.file.as_str()),
        ("sources.observations.file", sources.observations.file.as_str()),
        ("sources.images.file", sources.images.file.as_str()),
        ("embedding.path", config.embedding.path.as_str()),
    ];
    if config.segmentation.enabled {
        if let Some(ref dir) = config.segmentation.images_dir {
            inputs.push(("segmentation.images_dir", dir.as_str()));
        }
    }

    let mut missing = Vec::new();
    for (key, raw) in inputs {
        let path = resolve_path(&base_dir, raw).map_err(|e| CliError {
            code: EXIT_INVALID_CONFIG,
            message: e.to_string(),
            hint: None,
        })?;
        if !path.exists() {
            missing.push(format!("{key} = {}", path.display()));
        }
    }

    if !missing.is_empty() {
        return Err(CliError {
            code: EXIT_INPUT,
            message: format!("config is valid but {} input(s) do not exist", missing.len()),
            hint: Some(missing.join("; ")),
        });
    }

    eprintln!(
        "valid: pipeline '{}' with {} concept(s), segmentation {}, projection {}",
        config.name,
        config.embedding.concepts.len(),
        if config.segmentation.enabled { "on" } else { "off" },
        if config.projection.enabled { "on" } else { "off" },
    );
    Ok(())
}
