use std::{
    collections::HashMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    ControllerOptions, FormController, HttpTransport, ReportRenderer, ReportTransport, ReportView,
};
use shared::{
    domain::{FieldKind, FormSchema, FormVariant},
    protocol::ReportNode,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, Settings};

#[derive(Parser, Debug)]
#[command(
    name = "compliance-report",
    about = "Generate medical device compliance report drafts"
)]
struct Cli {
    /// Config file (defaults to ./report-client.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Base URL of the report service.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Form variant: basic or extended.
    #[arg(long, global = true)]
    variant: Option<FormVariant>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the fields of the active form.
    Fields,
    /// Fill the form from arguments and generate a report.
    Submit {
        #[arg(long = "field", value_name = "NAME=VALUE", value_parser = parse_field)]
        fields: Vec<(String, String)>,
        /// TOML file of `name = "value"` pairs, applied before --field.
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Ask for each field on stdin, then generate a report.
    Prompt {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Render a saved report JSON document.
    Render { file: PathBuf },
    /// Check that the report service is up.
    Health,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    apply_cli_overrides(&mut settings, &cli);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Fields => {
            print!("{}", describe_fields(FormSchema::for_variant(settings.variant)));
            Ok(ExitCode::SUCCESS)
        }
        Command::Render { file } => {
            let report = read_report(&file)?;
            let renderer = ReportRenderer::new(FormSchema::for_variant(settings.variant).label_style);
            print!("{}", renderer.render(&report));
            Ok(ExitCode::SUCCESS)
        }
        Command::Health => {
            let controller = build_controller(&settings)?;
            let status = controller
                .check_health()
                .await
                .with_context(|| format!("health check against {} failed", settings.api_url))?;
            println!("{status}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Submit {
            fields,
            input,
            format,
        } => {
            let controller = build_controller(&settings)?;
            if let Some(path) = input {
                for (name, value) in read_field_file(&path)? {
                    controller
                        .set_field(&name, value)
                        .await
                        .with_context(|| format!("in input file '{}'", path.display()))?;
                }
            }
            for (name, value) in fields {
                controller.set_field(&name, value).await?;
            }
            run_submission(&controller, format).await
        }
        Command::Prompt { format } => {
            let controller = build_controller(&settings)?;
            prompt_fields(&controller).await?;
            run_submission(&controller, format).await
        }
    }
}

/// Command-line flags win over the file and environment layers.
fn apply_cli_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(api_url) = &cli.api_url {
        settings.api_url = api_url.clone();
    }
    if let Some(variant) = cli.variant {
        settings.variant = variant;
    }
}

fn build_controller(settings: &Settings) -> Result<FormController<HttpTransport>> {
    let controller = FormController::connect(
        &settings.api_url,
        ControllerOptions {
            variant: settings.variant,
            clear_report_on_error: settings.clear_report_on_error,
        },
    )?;
    info!(
        api_url = %controller.transport().base_url(),
        variant = %settings.variant,
        "report client ready"
    );
    Ok(controller)
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing field name in '{raw}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

fn read_field_file(path: &Path) -> Result<Vec<(String, String)>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read input file '{}'", path.display()))?;
    let values: HashMap<String, String> = toml::from_str(&raw).with_context(|| {
        format!(
            "input file '{}' must contain only string values",
            path.display()
        )
    })?;
    let mut values: Vec<(String, String)> = values.into_iter().collect();
    values.sort();
    Ok(values)
}

fn read_report(path: &Path) -> Result<ReportNode> {
    let raw = fs::read(path)
        .with_context(|| format!("failed to read report file '{}'", path.display()))?;
    ReportNode::from_slice(&raw)
        .with_context(|| format!("'{}' is not a report document", path.display()))
}

fn describe_fields(schema: &FormSchema) -> String {
    let mut out = String::new();
    for spec in schema.fields() {
        let kind = match spec.kind {
            FieldKind::Text => "text",
            FieldKind::TextArea => "textarea",
            FieldKind::MultiValue => "list",
        };
        let required = if spec.required { "required" } else { "optional" };
        out.push_str(&format!(
            "{:<22} {:<22} {:<9} {:<9} {}\n",
            spec.name, spec.label, kind, required, spec.placeholder
        ));
    }
    out
}

async fn prompt_fields<T: ReportTransport>(controller: &FormController<T>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    for spec in controller.schema().fields() {
        eprint!("{} ({}): ", spec.label, spec.placeholder);
        io::stderr().flush()?;
        let Some(line) = lines
            .next_line()
            .await
            .context("failed to read from stdin")?
        else {
            warn!(field = spec.name, "stdin closed before every field was entered");
            break;
        };
        controller.set_field(spec.name, line.trim_end()).await?;
    }
    Ok(())
}

async fn run_submission<T: ReportTransport>(
    controller: &FormController<T>,
    format: OutputFormat,
) -> Result<ExitCode> {
    let missing = controller.form().await.missing_required();
    if !missing.is_empty() {
        warn!(?missing, "required fields are blank; the service may reject the request");
    }

    info!("generating report");
    match controller.submit().await {
        Ok(view) => {
            let rendered = format_report(&view, controller.renderer(), format)?;
            io::stdout().lock().write_all(rendered.as_bytes())?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            let message = controller
                .error()
                .await
                .unwrap_or_else(|| err.user_message());
            eprintln!("Error: {message}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn format_report(view: &ReportView, renderer: ReportRenderer, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(&view.report)?)),
        OutputFormat::Text => Ok(format!(
            "Generated Report\nGenerated at: {}\n\n{}",
            view.received_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S"),
            renderer.render(&view.report)
        )),
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
