use anyhow::Result;
use clap::Parser;
use iamdreamingof_interpreter::app::App;
use iamdreamingof_interpreter::models::Config;
use iamdreamingof_interpreter::{Feature, ReasoningState};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "iamdreamingof-interpreter")]
#[command(about = "Interpret dreams with a generative model")]
struct CliArgs {
    /// Reasoning mode to use.
    #[arg(long, value_enum, default_value_t = Feature::Text)]
    feature: Feature,

    /// Image (text/photo modes) or audio (audio mode) file to attach.
    #[arg(long = "attach", value_name = "PATH")]
    attachments: Vec<PathBuf>,

    /// Dream to interpret. When omitted, dreams are read from stdin, one per line.
    #[arg(value_name = "DREAM")]
    dream: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "iamdreamingof_interpreter=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let app = App::new(&config, args.feature);
    let attachments = app.load_attachments(&args.attachments).await?;
    info!(
        "Starting {} session with {} attachment(s)",
        args.feature,
        attachments.len()
    );

    let mut stdout = std::io::stdout();

    if let Some(dream) = args.dream {
        return match app.interpret(&dream, &attachments, &mut stdout).await? {
            ReasoningState::Error(message) => {
                error!("Interpretation failed: {}", message);
                std::process::exit(1);
            }
            _ => Ok(()),
        };
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if let ReasoningState::Error(message) =
            app.interpret(&line, &attachments, &mut stdout).await?
        {
            error!("Interpretation failed: {}", message);
        }
    }

    info!("Session finished");
    Ok(())
}
