//! `tailor`: submit a résumé and a job listing, follow the generation stages
//! and print the cover letter, suggestions and résumé diff.

mod observability;
mod render;

use std::io::IsTerminal as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context as _, bail};
use clap::{Args, Parser, Subcommand};
use tailor_client::{
    AnalysisResult, AnalyzeClient, AnalyzeRequest, ClientConfig, ClientError, CvDocument,
    DiffStats, TrailingFragment, diff_lines,
};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "tailor", version, about = "Tailor a résumé and cover letter to a job listing")]
struct Cli {
    /// Log at debug level unless TAILOR_LOG_LEVEL / RUST_LOG say otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable ANSI colours in diffs.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a résumé and a job listing and stream the results.
    Analyze(AnalyzeArgs),
    /// Diff two local files line by line.
    Diff {
        original: PathBuf,
        revised: PathBuf,
        /// Print only line totals.
        #[arg(long)]
        stat: bool,
    },
    /// Print the download URL for an artifact name.
    Url {
        filename: String,
        #[arg(long, env = "TAILOR_API_URL")]
        api_url: Option<String>,
    },
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Résumé file (.md, .txt or .tex).
    #[arg(long)]
    cv: PathBuf,

    /// Job listing text.
    #[arg(long, conflicts_with = "job_listing_file")]
    job_listing: Option<String>,

    /// File containing the job listing text.
    #[arg(long)]
    job_listing_file: Option<PathBuf>,

    /// URL of the job listing for the service to fetch.
    #[arg(long)]
    job_url: Option<String>,

    /// Background about you that is not in the résumé.
    #[arg(long, default_value = "")]
    profile_context: String,

    /// Extra instructions for the generated documents.
    #[arg(long, default_value = "")]
    extra_context: String,

    /// Model API key forwarded to the service.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Service base URL.
    #[arg(long, env = "TAILOR_API_URL")]
    api_url: Option<String>,

    /// Give up after this many seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Treat an unterminated final line as an event instead of dropping it.
    #[arg(long)]
    flush_trailing: bool,

    /// Write the cover letter and revised résumé into this directory.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Print the raw result as JSON instead of formatted text.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    observability::init_observability(cli.verbose);

    let color = !cli.no_color && std::io::stdout().is_terminal();
    match run(cli.command, color).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, color: bool) -> anyhow::Result<()> {
    match command {
        Command::Analyze(args) => analyze(args, color).await,
        Command::Diff {
            original,
            revised,
            stat,
        } => {
            let original = read_text(&original)?;
            let revised = read_text(&revised)?;
            let runs = diff_lines(&original, &revised);
            if stat {
                println!("{}", render::render_stats(&DiffStats::from_runs(&runs)));
            } else {
                print!("{}", render::render_diff(&runs, color));
            }
            Ok(())
        }
        Command::Url { filename, api_url } => {
            let config = client_config(api_url, None, false)?;
            println!("{}", config.download_url(&filename));
            Ok(())
        }
    }
}

fn client_config(
    api_url: Option<String>,
    timeout: Option<u64>,
    flush_trailing: bool,
) -> anyhow::Result<ClientConfig> {
    let mut config = match api_url {
        Some(url) => ClientConfig::new(url),
        None => ClientConfig::from_env().map_err(user_error)?,
    };
    if let Some(secs) = timeout {
        config = config.timeout(Duration::from_secs(secs));
    }
    if flush_trailing {
        config = config.trailing_fragment(TrailingFragment::Flush);
    }
    Ok(config)
}

async fn analyze(args: AnalyzeArgs, color: bool) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.cv)
        .with_context(|| format!("failed to read résumé {}", args.cv.display()))?;
    let filename = args
        .cv
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("cv.md")
        .to_string();
    let cv = CvDocument::new(filename, bytes);
    let original = cv.text();

    let job_listing = match (&args.job_listing, &args.job_listing_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => read_text(path)?,
        (None, None) => String::new(),
    };
    let request = AnalyzeRequest::builder(cv)
        .job_listing(job_listing)
        .job_url(args.job_url.clone().unwrap_or_default())
        .profile_context(args.profile_context.clone())
        .extra_context(args.extra_context.clone())
        .api_key(args.api_key.clone())
        .build()
        .map_err(user_error)?;

    let config = client_config(args.api_url.clone(), args.timeout, args.flush_trailing)?;
    let client = AnalyzeClient::new(config).map_err(user_error)?;
    let session = client.new_session();
    let abort = session.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            abort.abort();
        }
    });

    debug!(session_id = %session.id(), "submitting analyze request");
    let result = client
        .analyze_with(session, &request, |stage| eprintln!("… {stage}"))
        .await
        .map_err(user_error)?;

    if let Some(dir) = &args.out_dir {
        write_artifacts(dir, &result)?;
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print!(
        "{}",
        render::render_result(&result, |name| client.download_url(name))
    );
    let runs = result.revised_diff(&original);
    println!("{}\n", render::render_stats(&DiffStats::from_runs(&runs)));
    print!("{}", render::render_diff(&runs, color));
    Ok(())
}

/// Shows the client's detail text verbatim, without the classification prefix.
fn user_error(err: ClientError) -> anyhow::Error {
    anyhow::Error::msg(err.detail())
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Writes both generated documents under `dir` using the names the service chose.
fn write_artifacts(dir: &Path, result: &AnalysisResult) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let files = [
        (&result.cover_letter.filename, &result.cover_letter.markdown),
        (&result.revised_cv.filename, &result.revised_cv.content),
    ];
    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        let Some(safe_name) = Path::new(name.as_str()).file_name() else {
            bail!("service returned an unusable file name `{name}`");
        };
        let path = dir.join(safe_name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}
