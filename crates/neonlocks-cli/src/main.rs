use std::env;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use neonlocks_contracts::commands::{parse_command, Command as SessionCommand, SESSION_HELP_COMMANDS};
use neonlocks_contracts::session::SessionState;
use neonlocks_contracts::styles::{StyleCatalog, StyleCategory, CUSTOM_STYLE_ID};
use neonlocks_engine::config::{find_dotenv, DEFAULT_API_BASE, DEFAULT_MODEL};
use neonlocks_engine::{
    CredentialSource, EditorConfig, GeminiImageEditor, LocalImageFile, Session, StyleGenerator,
    SubmitOutcome,
};
use serde_json::{json, Value};

#[derive(Debug, Parser)]
#[command(name = "neonlocks", version, about = "Try on a new hairstyle with an image model")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the preset styles.
    Styles(StylesArgs),
    /// Edit one photo and save the result.
    Generate(GenerateArgs),
    /// Interactive session driven by slash commands.
    Session(SessionArgs),
}

#[derive(Debug, Args)]
struct StylesArgs {
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Args)]
struct ModelArgs {
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,
    #[arg(long, default_value = DEFAULT_API_BASE)]
    api_base: String,
    /// Request timeout in seconds; unset means wait for the service.
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// `.env` file holding GEMINI_API_KEY or API_KEY. Searched upward from the
    /// working directory when omitted.
    #[arg(long)]
    env_file: Option<PathBuf>,
    /// Append session events to this JSONL file.
    #[arg(long)]
    events: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long, conflicts_with = "prompt", required_unless_present = "prompt")]
    style: Option<String>,
    #[arg(long)]
    prompt: Option<String>,
    #[arg(long, default_value = ".")]
    out: PathBuf,
    #[command(flatten)]
    model: ModelArgs,
}

#[derive(Debug, Args)]
struct SessionArgs {
    #[arg(long, default_value = ".")]
    out: PathBuf,
    #[command(flatten)]
    model: ModelArgs,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("neonlocks error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Styles(args) => run_styles(args),
        Command::Generate(args) => run_generate(args),
        Command::Session(args) => {
            run_session(args)?;
            Ok(0)
        }
    }
}

fn editor_config(args: &ModelArgs) -> EditorConfig {
    EditorConfig::with_model(args.model.trim())
        .api_base(&args.api_base)
        .request_timeout(args.timeout_secs.map(Duration::from_secs))
}

fn credential_source(args: &ModelArgs) -> CredentialSource {
    let dotenv = args.env_file.clone().or_else(|| {
        env::current_dir()
            .ok()
            .and_then(|dir| find_dotenv(&dir))
    });
    CredentialSource::from_env(dotenv)
}

fn open_session(args: &ModelArgs) -> Result<Session<GeminiImageEditor>> {
    let config = editor_config(args);
    let editor = GeminiImageEditor::new(&config)?;
    let generator = StyleGenerator::new(editor, credential_source(args), config.model.clone());
    let session = Session::new(generator, StyleCatalog::default());
    match args.events.as_ref() {
        Some(path) => session
            .with_event_log(path)
            .with_context(|| format!("failed to open event log {}", path.display())),
        None => Ok(session),
    }
}

fn run_styles(args: StylesArgs) -> Result<i32> {
    let catalog = StyleCatalog::default();
    if args.json {
        let rows: Vec<Value> = catalog
            .list()
            .map(|preset| serde_json::to_value(preset))
            .collect::<Result<_, _>>()?;
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(0);
    }
    print!("{}", format_styles(&catalog));
    Ok(0)
}

fn run_generate(args: GenerateArgs) -> Result<i32> {
    let mut session = open_session(&args.model)?;
    let file = LocalImageFile::open(&args.image)
        .with_context(|| format!("failed to open {}", args.image.display()))?;
    session.select_image(&file)?;

    match (args.style.as_deref(), args.prompt.as_deref()) {
        (Some(style), _) => session.select_style(style)?,
        (None, Some(prompt)) => session.edit_custom_prompt(prompt),
        (None, None) => bail!("either --style or --prompt is required"),
    }
    if session.state().instruction().is_none() {
        bail!("style instruction is empty");
    }

    eprintln!("Designing hair with {}...", session.generator().model());
    match session.submit() {
        SubmitOutcome::Succeeded => {
            let path = session.save_result(&args.out)?;
            println!("Saved {}", path.display());
            Ok(0)
        }
        SubmitOutcome::Failed(message) => {
            eprintln!("Generation failed: {message}");
            Ok(1)
        }
        SubmitOutcome::Rejected => bail!("nothing to generate"),
    }
}

fn run_session(args: SessionArgs) -> Result<()> {
    let mut session = open_session(&args.model)?;
    let stdin = io::stdin();
    let mut line = String::new();

    println!("NeonLocks session started. Type /help for commands.");

    loop {
        print!("{}> ", session.phase().as_str());
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

        let input = line.trim_end_matches(['\n', '\r']);
        match parse_command(input) {
            SessionCommand::Noop => {}
            SessionCommand::Help => {
                println!("Commands: {}", SESSION_HELP_COMMANDS.join("  "));
                println!("Any other text sets a custom prompt.");
            }
            SessionCommand::ListStyles => print!("{}", format_styles(session.catalog())),
            SessionCommand::SelectImage { path } => {
                if path.is_empty() {
                    println!("/image requires a path");
                    continue;
                }
                let file = match LocalImageFile::open(&path) {
                    Ok(file) => file,
                    Err(err) => {
                        println!("Upload failed: {path}: {err}");
                        continue;
                    }
                };
                match session.select_image(&file) {
                    Ok(()) => println!(
                        "Image loaded: {} ({})",
                        file.path().display(),
                        file_size_label(file.path())
                    ),
                    Err(err) => println!("Upload failed: {err}"),
                }
            }
            SessionCommand::SelectStyle { id } => {
                if id.is_empty() {
                    println!("/style requires an id (see /styles)");
                    continue;
                }
                match session.select_style(&id) {
                    Ok(()) => println!("Style: {}", describe_style(session.state(), session.catalog())),
                    Err(err) => println!("{err}"),
                }
            }
            SessionCommand::EditPrompt { text } => {
                session.edit_custom_prompt(&text);
                if text.trim().is_empty() {
                    println!("Custom prompt cleared");
                } else {
                    println!("Custom prompt: {text}");
                }
            }
            SessionCommand::Generate => {
                if !session.state().can_submit() {
                    println!("{}", submit_blocker(session.state()));
                    continue;
                }
                println!("Designing hair...");
                match session.submit() {
                    SubmitOutcome::Succeeded => {
                        println!("New look applied. /save to download, /reset to try again.")
                    }
                    SubmitOutcome::Failed(message) => println!("Error: {message}"),
                    SubmitOutcome::Rejected => println!("{}", submit_blocker(session.state())),
                }
            }
            SessionCommand::ResetResult => {
                session.reset_result();
                println!("Result cleared");
            }
            SessionCommand::Clear => {
                session.clear();
                println!("Session cleared");
            }
            SessionCommand::Status => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&status_json(session.state(), session.catalog()))?
                );
            }
            SessionCommand::Save { dir } => {
                let dir = dir.map(PathBuf::from).unwrap_or_else(|| args.out.clone());
                match session.save_result(&dir) {
                    Ok(path) => println!("Saved {}", path.display()),
                    Err(err) => println!("Save failed: {err:#}"),
                }
            }
            SessionCommand::Unknown { command } => {
                println!("Unknown command /{command}. Type /help for commands.");
            }
        }
    }

    Ok(())
}

fn format_styles(catalog: &StyleCatalog) -> String {
    let mut out = String::new();
    for category in StyleCategory::ALL {
        for preset in catalog.by_category(category) {
            out.push_str(&format!(
                "{:<20} {:<16} [{}] {}\n",
                preset.id,
                preset.name,
                category.label(),
                preset.prompt
            ));
        }
    }
    out.push_str(&format!(
        "{:<20} {:<16} type any text to describe your own look\n",
        CUSTOM_STYLE_ID, "Custom"
    ));
    out
}

fn describe_style(state: &SessionState, catalog: &StyleCatalog) -> String {
    match state.selected_style_id.as_deref() {
        Some(id) if id == CUSTOM_STYLE_ID => format!("custom ({})", state.instruction),
        Some(id) => catalog
            .get(id)
            .map(|preset| format!("{} ({})", preset.name, preset.id))
            .unwrap_or_else(|| id.to_string()),
        None => "none".to_string(),
    }
}

fn submit_blocker(state: &SessionState) -> &'static str {
    if state.in_flight {
        "A generation is already running"
    } else if state.source_image.is_none() {
        "Load a photo first with /image <path>"
    } else if state.instruction().is_none() {
        "Pick a style with /style <id> or type a custom prompt"
    } else {
        "Nothing to generate"
    }
}

fn status_json(state: &SessionState, catalog: &StyleCatalog) -> Value {
    json!({
        "phase": state.phase().as_str(),
        "source_image": state.source_image.as_ref().map(|image| json!({
            "mime_type": image.mime_type(),
            "bytes": image.byte_len(),
        })),
        "style": describe_style(state, catalog),
        "instruction": state.instruction,
        "in_flight": state.in_flight,
        "result": state.result.as_ref().map(|image| json!({
            "mime_type": image.mime_type(),
            "bytes": image.byte_len(),
        })),
        "error": state.last_error,
        "can_generate": state.can_submit(),
    })
}

fn file_size_label(path: &Path) -> String {
    let bytes = std::fs::metadata(path).map(|meta| meta.len()).unwrap_or(0);
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use neonlocks_contracts::session::{reduce, SessionEvent};
    use neonlocks_contracts::EncodedImage;

    use super::*;

    fn loaded_state() -> SessionState {
        reduce(
            &SessionState::default(),
            SessionEvent::ImageSelected(EncodedImage::from_bytes("image/png", b"face")),
        )
    }

    #[test]
    fn generate_requires_style_or_prompt() {
        assert!(Cli::try_parse_from(["neonlocks", "generate", "--image", "me.png"]).is_err());
        assert!(Cli::try_parse_from([
            "neonlocks", "generate", "--image", "me.png", "--style", "buzz-cut", "--prompt", "x",
        ])
        .is_err());

        let cli = Cli::try_parse_from([
            "neonlocks",
            "generate",
            "--image",
            "me.png",
            "--prompt",
            "fiery red mohawk",
            "--timeout-secs",
            "30",
        ]);
        match cli.map(|cli| cli.command) {
            Ok(Command::Generate(args)) => {
                assert_eq!(args.prompt.as_deref(), Some("fiery red mohawk"));
                assert_eq!(args.model.model, DEFAULT_MODEL);
                assert_eq!(args.out, PathBuf::from("."));
                let config = editor_config(&args.model);
                assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
                assert_eq!(config.api_base, DEFAULT_API_BASE);
            }
            other => panic!("unexpected parse result: {other:?}"),
        }
    }

    #[test]
    fn session_defaults_to_no_timeout() {
        match Cli::try_parse_from(["neonlocks", "session"]).map(|cli| cli.command) {
            Ok(Command::Session(args)) => {
                assert_eq!(editor_config(&args.model).request_timeout, None);
                assert!(args.model.events.is_none());
            }
            other => panic!("unexpected parse result: {other:?}"),
        }
    }

    #[test]
    fn styles_listing_includes_presets_and_custom() {
        let listing = format_styles(&StyleCatalog::default());
        assert_eq!(listing.lines().count(), 9);
        assert!(listing.contains("buzz-cut"));
        assert!(listing.contains("[Short]"));
        assert!(listing.lines().last().unwrap_or_default().starts_with("custom"));
        let ids: Vec<&str> = listing
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .collect();
        assert_eq!(
            ids[..4],
            ["blonde-bob", "long-wavy-brunette", "afro-volume", "pixie-pink"]
        );
    }

    #[test]
    fn submit_blocker_names_the_missing_input() {
        assert_eq!(
            submit_blocker(&SessionState::default()),
            "Load a photo first with /image <path>"
        );
        assert_eq!(
            submit_blocker(&loaded_state()),
            "Pick a style with /style <id> or type a custom prompt"
        );
    }

    #[test]
    fn status_json_omits_image_payloads() {
        let catalog = StyleCatalog::default();
        let state = reduce(
            &loaded_state(),
            SessionEvent::StyleSelected {
                id: "buzz-cut".to_string(),
                prompt: "change the hair to a very short military buzz cut".to_string(),
            },
        );
        let status = status_json(&state, &catalog);
        assert_eq!(status["phase"], json!("ready"));
        assert_eq!(status["style"], json!("Clean Buzz (buzz-cut)"));
        assert_eq!(status["source_image"]["bytes"], json!(4));
        assert_eq!(status["can_generate"], json!(true));
        assert!(!status.to_string().contains("base64"));
    }

    #[test]
    fn describe_style_handles_custom_and_none() {
        let catalog = StyleCatalog::default();
        assert_eq!(describe_style(&SessionState::default(), &catalog), "none");
        let custom = reduce(
            &SessionState::default(),
            SessionEvent::CustomPromptEdited("pink mullet".to_string()),
        );
        assert_eq!(describe_style(&custom, &catalog), "custom (pink mullet)");
    }
}
