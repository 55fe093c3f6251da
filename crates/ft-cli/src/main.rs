//! FilterTube CLI
//!
//! Runs the filtering engine over saved payloads and probes single
//! decisions against a settings file.

mod io;

use std::path::Path;
use std::time::Instant;

use clap::{Parser, Subcommand};
use serde_json::Value;

use ft_compiler::parser::parse_channel_entry;
use ft_compiler::{normalize_settings, CacheContext};
use ft_core::{canonicalize_channel_input, channel_matches_filter, ChannelIdentity, FilterState};

#[derive(Parser)]
#[command(name = "ft-cli")]
#[command(about = "FilterTube payload filter and settings tools")]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter a saved payload
    Filter {
        /// Settings file
        #[arg(short, long)]
        settings: String,

        /// Payload file, or - for stdin
        #[arg(short, long, default_value = "-")]
        input: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Pretty-print the filtered payload
        #[arg(long)]
        pretty: bool,

        /// Fail if the input changed or a second pass removes anything
        #[arg(long)]
        verify: bool,
    },

    /// Normalize a settings file and print the report
    Validate {
        /// Settings file
        #[arg(short, long)]
        settings: String,
    },

    /// Check a channel identity against the settings or a single filter
    MatchChannel {
        /// Settings file
        #[arg(short, long)]
        settings: Option<String>,

        /// Identity as JSON, e.g. {"handle": "@name"}
        #[arg(long)]
        identity: String,

        /// Single filter entry as JSON, e.g. "@name"
        #[arg(long)]
        filter: Option<String>,
    },

    /// Check text against the keyword list
    MatchText {
        /// Settings file
        #[arg(short, long)]
        settings: String,

        /// Text to test
        text: String,

        /// Use comment-scoped keywords
        #[arg(long)]
        comment: bool,
    },

    /// Classify channel inputs
    Canonicalize {
        /// Raw inputs (URLs, handles, ids, names)
        #[arg(required = true)]
        inputs: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Commands::Filter {
            settings,
            input,
            output,
            pretty,
            verify,
        } => cmd_filter(&settings, &input, output.as_deref(), pretty, verify),
        Commands::Validate { settings } => cmd_validate(&settings),
        Commands::MatchChannel {
            settings,
            identity,
            filter,
        } => cmd_match_channel(settings.as_deref(), &identity, filter.as_deref()),
        Commands::MatchText {
            settings,
            text,
            comment,
        } => cmd_match_text(&settings, &text, comment),
        Commands::Canonicalize { inputs } => cmd_canonicalize(&inputs),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_state(path: &str) -> Result<FilterState, String> {
    let raw = io::read_json(path)?;
    if !raw.is_object() {
        return Err(format!("Settings in '{}' must be a JSON object", path));
    }

    let mut cache = CacheContext::new();
    let (state, report) = normalize_settings(&raw, &mut cache, None);
    log::debug!(
        "Loaded {} keywords ({} dropped) and {} channels from '{}'",
        report.keywords,
        report.dropped_keywords,
        report.channels,
        path
    );
    Ok(state)
}

fn cmd_filter(
    settings: &str,
    input: &str,
    output: Option<&str>,
    pretty: bool,
    verify: bool,
) -> Result<(), String> {
    let state = load_state(settings)?;
    let payload = io::read_json(input)?;
    let pristine = verify.then(|| payload.clone());

    let start = Instant::now();
    let outcome = state.filter(&payload);
    let elapsed = start.elapsed();

    let removed = outcome.removed;
    let reasons = outcome.reasons;
    let filtered = outcome.into_value();

    if let Some(pristine) = &pristine {
        if *pristine != payload {
            return Err("Filter pass modified its input".to_string());
        }
        let again = state.filter(&filtered);
        if again.removed != 0 {
            return Err(format!("Second pass removed {} more items", again.removed));
        }
        if again.into_value() != filtered {
            return Err("Second pass changed the filtered payload".to_string());
        }
    }

    io::write_json(output.map(Path::new), &filtered, pretty)?;

    eprintln!("Removed {} items in {:.2}ms", removed, elapsed.as_secs_f64() * 1000.0);
    for (reason, count) in reasons.iter().filter(|(_, count)| *count > 0) {
        eprintln!("  {:<16} {}", reason.as_str(), count);
    }
    if verify {
        eprintln!("  Verified:        input untouched, second pass is a no-op");
    }

    Ok(())
}

fn cmd_validate(settings: &str) -> Result<(), String> {
    let raw = io::read_json(settings)?;
    let mut cache = CacheContext::new();
    let (_, report) = normalize_settings(&raw, &mut cache, None);

    let text = serde_json::to_string_pretty(&report)
        .map_err(|e| format!("Failed to serialize report: {}", e))?;
    println!("{}", text);

    Ok(())
}

fn cmd_match_channel(settings: Option<&str>, identity: &str, filter: Option<&str>) -> Result<(), String> {
    let identity: ChannelIdentity =
        serde_json::from_str(identity).map_err(|e| format!("Invalid identity: {}", e))?;

    let state = match settings {
        Some(path) => load_state(path)?,
        None => FilterState::default(),
    };

    let matched = match filter {
        Some(filter) => {
            let raw: Value = serde_json::from_str(filter).map_err(|e| format!("Invalid filter: {}", e))?;
            let entry = parse_channel_entry(&raw).ok_or_else(|| "Filter entry is empty".to_string())?;
            channel_matches_filter(&identity, &entry, &state.channel_map)
        }
        None if settings.is_none() => {
            return Err("Either --settings or --filter is required".to_string());
        }
        None => match state.channels.matches(&identity, &state.channel_map) {
            Some(step) => {
                println!("matched by {}", step.as_str());
                return Ok(());
            }
            None => false,
        },
    };

    println!("{}", if matched { "matched" } else { "no match" });
    Ok(())
}

fn cmd_match_text(settings: &str, text: &str, comment: bool) -> Result<(), String> {
    let state = load_state(settings)?;

    let keyword = if comment {
        state.keywords.first_comment_match(text)
    } else {
        state.keywords.first_match(text)
    };

    match keyword {
        Some(keyword) => println!("matched {}", keyword.source()),
        None => println!("no match"),
    }
    Ok(())
}

fn cmd_canonicalize(inputs: &[String]) -> Result<(), String> {
    for raw in inputs {
        let canonical = canonicalize_channel_input(raw);
        println!("{:<8} {:<40} {}", canonical.kind.as_str(), canonical.value, raw);
    }
    Ok(())
}
