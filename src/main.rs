use clap::{Parser, Subcommand};
use colored::Colorize;
use refmark::annotate::line_col;
use refmark::search::matches;
use refmark::{Config, DocumentRef, ListItem, RebuildOutcome, Session};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// refmark - Reference index and inline title annotation for ID-named markdown documents
#[derive(Parser)]
#[command(name = "refmark")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true, default_value = refmark::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Root of the document tree (overrides the config file)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log index activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the reference index and write the snapshot
    Build,

    /// List indexed documents, grouped by type
    Search {
        /// Filter terms matched against id and title
        query: Vec<String>,

        /// Only list this type (e.g. TOOL, TECH, MASWE)
        #[arg(short = 't', long = "type")]
        kind: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the annotations for a document
    Annotate {
        /// Markdown file
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Completion candidates for the text before the cursor
    Complete {
        /// Line text up to the cursor
        prefix: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the path of the document for an identifier
    Resolve {
        /// Identifier, e.g. MASTG-TECH-0001
        key: String,
    },
}

fn main() {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let result = open_session(&cli.config, cli.root.as_deref()).and_then(|mut session| {
        match cli.command {
            Commands::Build => cmd_build(&mut session, cli.quiet),
            Commands::Search { query, kind, json } => {
                cmd_search(&mut session, &query, kind.as_deref(), json)
            }
            Commands::Annotate { file, json } => cmd_annotate(&mut session, &file, json),
            Commands::Complete { prefix, json } => cmd_complete(&mut session, &prefix, json),
            Commands::Resolve { key } => cmd_resolve(&mut session, &key),
        }
    });

    if let Err(e) = result {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("refmark=debug,info")
        } else {
            EnvFilter::new("warn")
        }
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn open_session(
    config_path: &Path,
    root: Option<&Path>,
) -> Result<Session, Box<dyn std::error::Error>> {
    let mut config = Config::load(config_path)?;
    if let Some(root) = root {
        config.root = root.to_path_buf();
    }
    Ok(Session::new(config)?)
}

/// Load the snapshot, reporting a corrupt one without giving up.
fn activate(session: &mut Session) {
    if let Err(e) = session.on_activate() {
        eprintln!("{}: {}", "warning".yellow().bold(), e);
    }
}

fn cmd_build(session: &mut Session, quiet: bool) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let root = session.config().root.clone();

    if !quiet {
        println!("{} {}", "Indexing".cyan().bold(), root.display());
    }

    match session.on_rebuild_requested()? {
        RebuildOutcome::Updated { entries, snapshot } => {
            if !quiet {
                println!();
                println!("{}", "References updated".green().bold());
                println!("  Documents indexed: {}", entries.to_string().cyan());
                println!("  Time elapsed:      {:.2?}", start.elapsed());
                println!();
                println!(
                    "{} {}",
                    "Snapshot written to".green(),
                    snapshot.display().to_string().cyan()
                );
            }
        }
        RebuildOutcome::Empty => {
            println!("{}", "No valid front matter titles found in markdown files.".yellow());
        }
    }

    Ok(())
}

fn cmd_search(
    session: &mut Session,
    query: &[String],
    kind: Option<&str>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    activate(session);

    if let Some(kind) = kind {
        if !session.taxonomy().kinds().contains(&kind) {
            return Err(format!(
                "unknown type '{}' (expected one of: {})",
                kind,
                session.taxonomy().kinds().join(", ")
            )
            .into());
        }
    }

    let items = matches(&session.search(kind), &query.join(" "));

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("{}", "No references found.".yellow());
        return Ok(());
    }

    for item in &items {
        match item {
            ListItem::Separator { label } => println!("\n{}", label.green().bold()),
            ListItem::Entry { label, path, .. } => {
                println!("  {}  {}", label, path.display().to_string().dimmed())
            }
        }
    }

    Ok(())
}

fn cmd_annotate(
    session: &mut Session,
    file: &Path,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    activate(session);

    let text = fs::read_to_string(file).map_err(|e| format!("{}: {}", file.display(), e))?;
    let doc = DocumentRef::from_path(file);
    let spans = session.on_document_changed(&doc, &text).to_vec();

    if json {
        println!("{}", serde_json::to_string_pretty(&spans)?);
        return Ok(());
    }

    if spans.is_empty() {
        println!("{}", "No references in document.".yellow());
        return Ok(());
    }

    for span in &spans {
        let (line, col) = line_col(&text, span.start);
        let label = if span.resolved {
            span.label().dimmed().italic()
        } else {
            span.label().red().italic()
        };
        println!(
            "{}:{}:{}  {}{}",
            file.display(),
            line + 1,
            col + 1,
            span.key.cyan(),
            label
        );
    }

    Ok(())
}

fn cmd_complete(
    session: &mut Session,
    prefix: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    activate(session);

    let Some(items) = session.complete(prefix) else {
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    for item in items {
        println!("{}", item.label);
    }

    Ok(())
}

fn cmd_resolve(session: &mut Session, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    activate(session);

    let request = session
        .resolve(key)
        .ok_or_else(|| format!("No browsable document for {}", key))?;
    println!("{}", request.path.display());

    Ok(())
}
