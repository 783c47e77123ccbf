mod cli;
mod config;
mod deliver;
mod logging;
mod preview;

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use recdoc_core::{AuthContext, AuthGate};
use recdoc_engine::{decode_html, Pipeline, Preview, RunOutput, RunRequest, Template};
use recdoc_logging::{engine_debug, engine_error, engine_info, level_for_verbosity};

use cli::Cli;
use config::AppConfig;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            engine_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(&cli.config)?;
    logging::initialize(config.log_destination, level_for_verbosity(cli.verbose));
    engine_debug!("config: {:?}", config);

    let gate = AuthGate::from_env(&config.password_env);
    let auth = authenticate(&gate)?;

    let date = chrono::Local::now().format("%d/%m/%Y").to_string();
    let request = cli.run_request(&config, date);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;

    if cli.preview {
        let pipeline = Pipeline::without_template(config.fetch_settings());
        let preview = runtime.block_on(fetch_preview(&pipeline, &auth, &cli, request))?;
        print!("{}", preview::format(&preview));
        return Ok(());
    }

    let template_path = cli.template_path(&config);
    let template = Template::open(&template_path)?;
    let pipeline = Pipeline::new(config.fetch_settings(), template);
    let mut output = runtime.block_on(execute(&pipeline, &auth, &cli, request))?;

    deliver::warn_missing_placeholders(&output.document.placeholders_found);
    let path = deliver::save_document(&cli.output_dir(&config), &mut output)?;

    engine_info!("{}", output.state.view().summary());
    println!("{}", path.display());
    Ok(())
}

/// Prompts only when a secret is configured, so an unset variable fails fast.
fn authenticate(gate: &AuthGate) -> Result<AuthContext> {
    let attempt = if gate.is_configured() {
        read_password()?
    } else {
        String::new()
    };
    Ok(gate.verify(&attempt)?)
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn read_saved_page(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let decoded = decode_html(&bytes, None)?;
    engine_info!("Using saved page {:?} ({})", path, decoded.encoding_label);
    Ok(decoded.html)
}

async fn execute(
    pipeline: &Pipeline,
    auth: &AuthContext,
    cli: &Cli,
    request: RunRequest,
) -> Result<RunOutput> {
    let result = match &cli.html_file {
        Some(path) => {
            let html = read_saved_page(path)?;
            pipeline.run_with_html(auth, &html, request).await
        }
        None => pipeline.run(auth, request).await,
    };
    result.map_err(|err| anyhow!(err.user_message()))
}

async fn fetch_preview(
    pipeline: &Pipeline,
    auth: &AuthContext,
    cli: &Cli,
    request: RunRequest,
) -> Result<Preview> {
    let result = match &cli.html_file {
        Some(path) => {
            let html = read_saved_page(path)?;
            pipeline.preview_html(auth, &html, request).await
        }
        None => pipeline.preview(auth, request).await,
    };
    result.map_err(|err| anyhow!(err.user_message()))
}
