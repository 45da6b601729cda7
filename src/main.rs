use clap::Parser;
use genstudio::config::cli::load_image_data_url;
use genstudio::utils::error::ErrorSeverity;
use genstudio::utils::logger::{self, LogFormat};
use genstudio::utils::validation::Validate;
use genstudio::{CancellationToken, CliConfig, GenError, Studio, Style};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    logger::init_logger(format, cli.verbose);

    if cli.list_styles {
        for style in Style::ALL {
            println!("{:<11} {}", style.id(), style.description());
        }
        return Ok(());
    }

    tracing::info!("🚀 Starting genstudio");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run(&cli).await {
        tracing::error!(
            "❌ Generation failed: {} (Severity: {:?})",
            e,
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 130,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        std::process::exit(exit_code);
    }

    Ok(())
}

async fn run(cli: &CliConfig) -> Result<(), GenError> {
    let config = cli.resolve()?;
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        return Err(e);
    }

    let mut studio = Studio::new(config.build_service());

    let image = match &cli.image {
        Some(path) => Some(load_image_data_url(path).await?),
        None => None,
    };
    let style = cli.style.as_deref().map(str::parse::<Style>).transpose()?;

    let service = studio.service();
    let max_attempts = service.policy().max_attempts;
    let interrupted = CancellationToken::new();
    {
        let interrupted = interrupted.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if interrupted.is_cancelled() {
                    eprintln!("Interrupted twice, exiting");
                    std::process::exit(130);
                }
                tracing::warn!("Interrupted, aborting in-flight generation");
                interrupted.cancel();
                service.abort();
            }
        });
    }

    for round in 1..=cli.count.max(1) {
        if interrupted.is_cancelled() {
            return Err(GenError::Aborted);
        }
        studio.set_image(image.clone());
        studio.set_prompt(cli.prompt.clone());
        studio.set_style(style);
        if !studio.can_generate() {
            return Err(GenError::validation(
                "Provide --image or --prompt, and choose a --style",
            ));
        }

        let response = studio
            .generate(|attempt, err| {
                println!(
                    "🔄 Retrying ({}/{}) after: {}",
                    attempt + 1,
                    max_attempts,
                    err
                );
            })
            .await?;

        println!(
            "✅ [{}] {} ({}) → {}",
            round, response.id, response.style, response.image_url
        );
    }

    println!("\n🕘 History (most recent first):");
    for item in studio.history().iter() {
        println!(
            "  {}  {:<11} {:<40} {}",
            item.created_at.format("%Y-%m-%d %H:%M:%S"),
            item.style.id(),
            truncate(&item.prompt, 40),
            item.image_url
        );
    }

    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut shortened: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    shortened.push('…');
    shortened
}
