use std::io::{self, IsTerminal, Read};

use anyhow::{Result, anyhow};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "llm-captioner-rust",
    version,
    about = "Generate an illustration and composite a caption onto it"
)]
struct Cli {
    /// Run the HTTP server instead of a one-shot invocation
    #[arg(long = "serve")]
    serve: bool,

    /// Server bind address (defaults to the settings value)
    #[arg(long = "addr")]
    addr: Option<String>,

    /// Title used as the illustration theme
    #[arg(short = 't', long = "title")]
    title: Option<String>,

    /// Extra generation instructions passed to the image model
    #[arg(short = 'i', long = "instruction")]
    instruction: Option<String>,

    /// Painting style directive (e.g. "watercolor")
    #[arg(long = "painting-style")]
    painting_style: Option<String>,

    /// Font file name inside the fonts directory
    #[arg(long = "font")]
    font: Option<String>,

    /// Starting caption size in px (default: 24)
    #[arg(long = "font-size")]
    font_size: Option<f32>,

    /// Explicit caption fill color (skips contrast selection)
    #[arg(long = "text-color")]
    text_color: Option<String>,

    /// Explicit caption outline color
    #[arg(long = "outline-color")]
    outline_color: Option<String>,

    /// Placement hint ("top left", "center", ...); omitted = ask the model
    #[arg(short = 'p', long = "position")]
    position: Option<String>,

    /// Build the generation prompt from extracted keywords
    #[arg(long = "use-keywords")]
    use_keywords: bool,

    /// Caption via translate -> summarize -> translate back
    #[arg(long = "round-trip")]
    round_trip: bool,

    /// API key (overrides environment variables)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    llm_captioner_rust::logging::init(cli.verbose)?;

    if cli.serve {
        let settings_path = cli.read_settings.as_deref().map(std::path::Path::new);
        let settings = llm_captioner_rust::settings::load_settings(settings_path)?;
        let addr = cli.addr.unwrap_or_else(|| settings.server_addr.clone());
        return llm_captioner_rust::server::run_server(settings, addr).await;
    }

    if io::stdin().is_terminal() {
        return Err(anyhow!("pipe the caption message via stdin"));
    }
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;

    let output = llm_captioner_rust::run(
        llm_captioner_rust::Config {
            title: cli.title,
            instruction: cli.instruction,
            painting_style: cli.painting_style,
            font: cli.font,
            font_size: cli.font_size,
            text_color: cli.text_color,
            outline_color: cli.outline_color,
            position: cli.position,
            use_keywords: cli.use_keywords,
            round_trip: cli.round_trip,
            key: cli.key,
            settings_path: cli.read_settings,
        },
        Some(input),
    )
    .await?;

    println!("{}", output);
    Ok(())
}
