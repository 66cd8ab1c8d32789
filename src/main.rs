use clap::error::ErrorKind;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mashup::cli::{usage, Cli};
use mashup::utils::{check_dependencies, display_absolute};
use mashup::{Config, MashupError, MashupPipeline, MashupRequest, Reporter, RunSummary, Variant};

const RULE: &str = "============================================================";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => err.exit(),
        Err(err) => {
            println!("{}", RULE);
            println!("🎵 MASHUP TOOL - COMMAND LINE VERSION");
            println!("{}", RULE);
            println!("\n❌ Error: Incorrect number of parameters");
            println!("{}", err);
            println!("\n{}", usage());
            return ExitCode::FAILURE;
        }
    };

    // Logs go to stderr so they never interleave with the progress output
    let default_filter = if cli.verbose { "mashup=debug" } else { "mashup=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    println!("{}", RULE);
    println!("🎵 MASHUP TOOL - COMMAND LINE VERSION");
    println!("{}", RULE);

    let raw = cli.raw_request();
    println!("\n📋 Input Parameters:");
    println!("  Singer Name     : {}", raw.query);
    println!("  Number of Videos: {}", raw.count);
    println!("  Audio Duration  : {} seconds", raw.trim_seconds);
    println!("  Output File     : {}", raw.destination);

    let request = match MashupRequest::parse_cli(&raw) {
        Ok(request) => request,
        Err(errors) => {
            println!("\n❌ Validation Errors:");
            for error in &errors {
                println!("  • {}", error);
            }
            tracing::debug!("{}", MashupError::Validation(errors));
            return ExitCode::FAILURE;
        }
    };

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            println!("\n❌ Fatal Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    // Missing tools are reported but not fatal; the run fails later if they are really absent
    let missing = check_dependencies(&config.tools).await;
    if !missing.is_empty() {
        println!("⚠️  Dependency check warnings:");
        for dep in missing {
            println!("   • {}", dep);
        }
        println!("   (Continuing anyway - tools may be available)");
    }

    if let Some(cookies) = &config.fetch.cookies_file {
        if cookies.exists() {
            println!("  Using cookies file for authentication");
        }
    }

    let pipeline = MashupPipeline::from_config(config);
    let workspace = pipeline.new_workspace(Variant::Cli);
    let reporter = Reporter::console();

    tokio::select! {
        result = pipeline.run_to_file(&request, &workspace, &reporter) => match result {
            Ok(summary) => {
                print_summary(&summary);
                ExitCode::SUCCESS
            }
            // The reporter has already printed the failure
            Err(_) => ExitCode::FAILURE,
        },
        _ = tokio::signal::ctrl_c() => {
            println!("\n\n⚠️  {}", MashupError::Interrupted);
            if let Err(e) = workspace.teardown() {
                tracing::warn!("Cleanup after interrupt failed: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!("\n{}", RULE);
    println!("{}", style("✅ MASHUP COMPLETED SUCCESSFULLY").green().bold());
    println!("{}", RULE);
    println!("📊 Summary:");
    println!("  Total videos downloaded : {}", summary.fetched);
    println!("  Total audios trimmed    : {}", summary.trimmed);
    println!("  Final output file       : {}", display_absolute(&summary.merge.output).display());
    if !summary.skipped.is_empty() {
        println!("  Skipped items           : {}", summary.skipped.len());
    }
    println!("{}", RULE);
}
