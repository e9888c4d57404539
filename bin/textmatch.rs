use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use textmatch::query::MAX_EVAL_DEPTH;
use textmatch::{tokenize, CompositeAnchor, DslError, MatchOptions, Matcher};
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "textmatch")]
#[command(about = "Match text against boolean and ordering expressions", long_about = None)]
struct Args {
    /// Expression to evaluate, e.g. `first < last & ~draft`
    expression: String,

    /// Text to match; read from stdin when omitted
    text: Option<String>,

    /// Compare text exactly instead of ignoring case
    #[arg(long, env = "TEXTMATCH_CASE_SENSITIVE")]
    case_sensitive: bool,

    /// Position used for grouped `&`/`|` operands of `<` (earliest, latest)
    #[arg(long, env = "TEXTMATCH_ANCHOR")]
    anchor: Option<String>,

    /// Maximum nesting of groups and negations
    #[arg(long, env = "TEXTMATCH_MAX_DEPTH")]
    max_depth: Option<usize>,

    /// JSON file with match options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read the text from a file
    #[arg(long, conflicts_with = "text")]
    file: Option<PathBuf>,

    /// Print the parsed expression as JSON and exit
    #[arg(long)]
    ast: bool,

    /// Print the token stream as JSON and exit
    #[arg(long, conflicts_with = "ast")]
    tokens: bool,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    debug!("textmatch v{}", textmatch::VERSION);

    let options = load_options(&args)?;
    debug!(
        ignore_case = options.ignore_case,
        anchor = %options.composite_anchor,
        max_depth = options.max_depth,
        "Match options"
    );

    if args.tokens {
        return match tokenize(&args.expression) {
            Ok(tokens) => {
                println!("{}", serde_json::to_string_pretty(&tokens)?);
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => Ok(report(&args.expression, &e.into())),
        };
    }

    let matcher = match Matcher::compile(&args.expression, options) {
        Ok(matcher) => matcher,
        Err(e) => return Ok(report(&args.expression, &e)),
    };

    if args.ast {
        // JSON serialization recurses once per level
        if let Some(depth) = matcher.root().map(|root| root.depth()) {
            if depth > MAX_EVAL_DEPTH {
                bail!("Expression tree is {} levels tall, too tall to print as JSON", depth);
            }
        }
        println!("{}", serde_json::to_string_pretty(&matcher.root())?);
        return Ok(ExitCode::SUCCESS);
    }

    let text = read_text(&args)?;
    match matcher.is_match(&text) {
        Ok(matched) => {
            println!("{}", matched);
            Ok(if matched {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
        Err(e) => Ok(report(&args.expression, &e)),
    }
}

/// Config file first, then command line overrides
fn load_options(args: &Args) -> Result<MatchOptions> {
    let mut options = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {:?}", path))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Invalid config file {:?}", path))?
        }
        None => MatchOptions::default(),
    };

    if args.case_sensitive {
        options = options.with_ignore_case(false);
    }

    if let Some(anchor) = &args.anchor {
        match anchor.parse::<CompositeAnchor>() {
            Ok(policy) => options = options.with_composite_anchor(policy),
            Err(_) => warn!(
                "Unknown anchor policy '{}', using '{}'",
                anchor, options.composite_anchor
            ),
        }
    }

    if let Some(max_depth) = args.max_depth {
        options = options.with_max_depth(max_depth);
    }

    Ok(options)
}

fn read_text(args: &Args) -> Result<String> {
    if let Some(path) = &args.file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read text file {:?}", path));
    }
    if let Some(text) = &args.text {
        return Ok(text.clone());
    }

    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read text from stdin")?;
    Ok(text)
}

fn report(expression: &str, err: &DslError) -> ExitCode {
    eprintln!("error: {}", err);
    if let Some(context) = err.context(expression) {
        eprintln!("{}", context);
    }
    ExitCode::from(2)
}
