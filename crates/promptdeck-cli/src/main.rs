use std::io::{self, ErrorKind, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use promptdeck_contracts::events::EventLog;
use promptdeck_contracts::request::GenerationOptions;
use promptdeck_contracts::session::{parse_intent, IntentAction, SESSION_HELP_COMMANDS};
use promptdeck_engine::{
    ActionError, ActionReport, ClientConfig, DryrunApi, GeminiClient, GenerationApi,
    RenderedItem, Session, DEFAULT_EXPLAIN_MAX_TOKENS, DEFAULT_EXPLAIN_TEMPERATURE,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const EXIT_ACTION_FAILED: i32 = 1;
const EXIT_MISSING_CREDENTIAL: i32 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "promptdeck",
    version,
    about = "Ask Gemini questions and generate images from the terminal"
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Directory for generated images and the event log.
    #[arg(long, global = true, default_value = "promptdeck-out")]
    out: PathBuf,
    #[arg(long, global = true)]
    events: Option<PathBuf>,
    #[arg(long, global = true)]
    text_model: Option<String>,
    #[arg(long, global = true)]
    image_model: Option<String>,
    /// Answer locally without calling the API.
    #[arg(long, global = true)]
    dryrun: bool,
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ask a question.
    Ask(PromptArgs),
    /// Get an explanation with tunable length and temperature.
    Explain(ExplainArgs),
    /// Generate an image.
    Image(PromptArgs),
    /// Interactive loop with all three actions.
    Session,
}

#[derive(Debug, Args)]
struct PromptArgs {
    #[arg(long)]
    prompt: String,
}

#[derive(Debug, Args)]
struct ExplainArgs {
    #[arg(long)]
    prompt: String,
    #[arg(long, default_value_t = DEFAULT_EXPLAIN_MAX_TOKENS)]
    max_output_tokens: u32,
    #[arg(long, default_value_t = DEFAULT_EXPLAIN_TEMPERATURE)]
    temperature: f64,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("promptdeck error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.common.verbose);
    execute(cli, ClientConfig::from_env)
}

/// Runs the parsed command. `load_config` is only called for the live API.
fn execute(
    cli: Cli,
    load_config: impl FnOnce() -> Result<ClientConfig, ActionError>,
) -> Result<i32> {
    let api = match build_api(&cli.common, load_config) {
        Ok(api) => api,
        Err(err @ ActionError::MissingCredential { .. }) => {
            eprintln!("promptdeck error: {err}");
            return Ok(EXIT_MISSING_CREDENTIAL);
        }
        Err(err) => return Err(err.into()),
    };

    let events_path = cli
        .common
        .events
        .clone()
        .unwrap_or_else(|| cli.common.out.join("events.jsonl"));
    let session_id = format!("session-{}", Uuid::new_v4().simple());
    debug!(%session_id, events = %events_path.display(), "starting session");
    let mut session = Session::new(
        api.api,
        &cli.common.out,
        EventLog::new(events_path, session_id),
        api.text_model.as_deref(),
        api.image_model.as_deref(),
    )?;

    let code = match cli.command {
        Command::Ask(args) => exit_code(&session.ask(&args.prompt))?,
        Command::Explain(args) => exit_code(&session.explain(
            &args.prompt,
            args.max_output_tokens,
            args.temperature,
        ))?,
        Command::Image(args) => exit_code(&session.generate_image(&args.prompt))?,
        Command::Session => {
            run_interactive(&mut session)?;
            0
        }
    };
    session.finish()?;
    Ok(code)
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

struct ResolvedApi {
    api: Box<dyn GenerationApi>,
    text_model: Option<String>,
    image_model: Option<String>,
}

/// Loads credentials before any action can run; a missing key stops here.
fn build_api(
    common: &CommonArgs,
    load_config: impl FnOnce() -> Result<ClientConfig, ActionError>,
) -> Result<ResolvedApi, ActionError> {
    if common.dryrun {
        return Ok(ResolvedApi {
            api: Box::new(DryrunApi),
            text_model: common.text_model.clone(),
            image_model: common.image_model.clone(),
        });
    }
    let config = load_config()?
        .with_text_model(common.text_model.clone())
        .with_image_model(common.image_model.clone());
    let text_model = config.text_model().map(str::to_string);
    let image_model = config.image_model().map(str::to_string);
    Ok(ResolvedApi {
        api: Box::new(GeminiClient::new(config)?),
        text_model,
        image_model,
    })
}

fn exit_code(report: &ActionReport) -> Result<i32> {
    let stdout = io::stdout();
    let stderr = io::stderr();
    render_report(report, &mut stdout.lock(), &mut stderr.lock())?;
    Ok(if report.is_success() {
        0
    } else {
        EXIT_ACTION_FAILED
    })
}

fn render_report(report: &ActionReport, out: &mut impl Write, err: &mut impl Write) -> Result<()> {
    for item in &report.items {
        match item {
            RenderedItem::Text(text) => writeln!(out, "{text}")?,
            RenderedItem::Image {
                path,
                mime_type,
                dimensions,
            } => match dimensions {
                Some((width, height)) => writeln!(
                    out,
                    "Image saved to {} ({width}x{height}, {mime_type})",
                    path.display()
                )?,
                None => writeln!(out, "Image saved to {} ({mime_type})", path.display())?,
            },
            RenderedItem::DecodeFailed(message) => {
                writeln!(err, "Image part skipped: {message}")?
            }
        }
    }
    if let Some(message) = &report.error {
        writeln!(err, "{} failed: {message}", report.action)?;
    }
    Ok(())
}

/// Session-local settings for the explanation action.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ExplainSettings {
    max_output_tokens: u32,
    temperature: f64,
}

impl Default for ExplainSettings {
    fn default() -> Self {
        Self {
            max_output_tokens: DEFAULT_EXPLAIN_MAX_TOKENS,
            temperature: DEFAULT_EXPLAIN_TEMPERATURE,
        }
    }
}

impl ExplainSettings {
    fn with_max_tokens(self, raw: Option<&str>) -> Result<Self, String> {
        let value = raw
            .and_then(|value| value.parse::<u32>().ok())
            .ok_or_else(|| "/max_tokens expects a positive integer".to_string())?;
        GenerationOptions::new(value, self.temperature).map_err(|err| err.to_string())?;
        Ok(Self {
            max_output_tokens: value,
            ..self
        })
    }

    fn with_temperature(self, raw: Option<&str>) -> Result<Self, String> {
        let value = raw
            .and_then(|value| value.parse::<f64>().ok())
            .ok_or_else(|| "/temperature expects a number between 0 and 2".to_string())?;
        GenerationOptions::new(self.max_output_tokens, value).map_err(|err| err.to_string())?;
        Ok(Self {
            temperature: value,
            ..self
        })
    }
}

fn run_interactive(session: &mut Session) -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut line = String::new();
    let mut settings = ExplainSettings::default();

    println!("promptdeck session started. Type /help for commands.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let intent = parse_intent(line.trim_end_matches(['\n', '\r']));
        let report = match intent.action {
            IntentAction::Noop => continue,
            IntentAction::Quit => break,
            IntentAction::Help => {
                println!("Commands: {}", SESSION_HELP_COMMANDS.join("  "));
                continue;
            }
            IntentAction::ShowSettings => {
                println!(
                    "text_model={} image_model={} max_tokens={} temperature={}",
                    session.text_model(),
                    session.image_model(),
                    settings.max_output_tokens,
                    settings.temperature
                );
                continue;
            }
            IntentAction::SetMaxTokens => {
                match settings.with_max_tokens(intent.argument.as_deref()) {
                    Ok(updated) => {
                        settings = updated;
                        println!("max_tokens set to {}", settings.max_output_tokens);
                    }
                    Err(message) => println!("{message}"),
                }
                continue;
            }
            IntentAction::SetTemperature => {
                match settings.with_temperature(intent.argument.as_deref()) {
                    Ok(updated) => {
                        settings = updated;
                        println!("temperature set to {}", settings.temperature);
                    }
                    Err(message) => println!("{message}"),
                }
                continue;
            }
            IntentAction::SetTextModel | IntentAction::SetImageModel => {
                let Some(requested) = intent.argument.as_deref() else {
                    println!("model commands require a model name");
                    continue;
                };
                let selected = if intent.action == IntentAction::SetTextModel {
                    session.set_text_model(requested)
                } else {
                    session.set_image_model(requested)
                };
                match selected {
                    Ok(model) => println!("Model set to {model}"),
                    Err(err) => println!("{err}"),
                }
                continue;
            }
            IntentAction::Unknown => {
                println!(
                    "Unknown command /{}; type /help",
                    intent.argument.as_deref().unwrap_or_default()
                );
                continue;
            }
            IntentAction::Ask => session.ask(intent.prompt.as_deref().unwrap_or_default()),
            IntentAction::Explain => session.explain(
                intent.prompt.as_deref().unwrap_or_default(),
                settings.max_output_tokens,
                settings.temperature,
            ),
            IntentAction::GenerateImage => {
                session.generate_image(intent.prompt.as_deref().unwrap_or_default())
            }
        };
        render_report(&report, &mut stdout.lock(), &mut stderr.lock())
            .context("failed to print report")?;
    }

    let (completed, failed) = session.counts();
    println!("Session finished: {completed} completed, {failed} failed.");
    Ok(())
}
