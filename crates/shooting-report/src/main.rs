mod bootstrap;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use incident_core::settings::Settings;
use incident_data::export;
use incident_data::pipeline::run_pipeline;
use incident_ui::app::{App, ViewMode};

fn main() -> Result<()> {
    let settings = Settings::parse();

    bootstrap::setup_logging(settings.effective_log_level(), settings.log_file.as_deref())?;

    tracing::info!("shooting-report v{} starting", env!("CARGO_PKG_VERSION"));
    let config = settings.pipeline_config()?;
    tracing::info!(
        "Source: {}, Policy: {:?}, View: {}, Theme: {}",
        config.source,
        config.parse_policy,
        settings.view,
        settings.theme
    );

    let output = run_pipeline(&config).context("pipeline failed")?;

    if let Some(path) = &settings.export_groups {
        export::write_groups_csv(path, &output.groups)?;
    }
    if let Some(path) = &settings.export_model {
        match &output.model {
            Ok(model) => export::write_model_json(path, model)?,
            Err(e) => anyhow::bail!("cannot export model to {}: {}", path.display(), e),
        }
    }

    if settings.no_tui {
        print!("{}", report::render_text(&output));
    } else {
        let app = App::new(&settings.theme, ViewMode::from_name(&settings.view));
        app.run_report(&output)?;
    }

    Ok(())
}
