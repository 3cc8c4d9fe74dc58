use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use uimark_core::{
    RenderConfig, UimarkError, chapter_list_view, chapter_list_view_to_raw_json, chapter_payload,
    chapter_pure_html, delete_chapter_in_file, edit_chapter_in_file, load_view,
    payload_to_raw_json, render_transcript_markdown,
};

#[derive(Debug, Parser)]
#[command(
    name = "uimark",
    version,
    about = "Inspect and edit generated UI transcripts"
)]
struct Cli {
    /// Transcript file holding every chapter of one item
    path: PathBuf,

    /// Output chapters as raw JSON instead of markdown
    #[arg(long)]
    raw: bool,

    /// Print the pure HTML of chapter <IDX>
    #[arg(long, value_name = "IDX")]
    html: Option<usize>,

    /// Print the {html, scripts, pureHtml} preview payload of chapter <IDX>
    #[arg(long, value_name = "IDX")]
    payload: Option<usize>,

    /// Delete chapter <IDX> and rewrite the transcript
    #[arg(long, value_name = "IDX")]
    delete: Option<usize>,

    /// Record the HTML in --from as an edit of chapter <IDX> and rewrite the transcript
    #[arg(long, value_name = "IDX")]
    edit: Option<usize>,

    /// File with the edited HTML, used with --edit
    #[arg(long, value_name = "FILE")]
    from: Option<PathBuf>,

    /// Prompt used for chapters that precede any prompt header
    #[arg(long, default_value = "")]
    prompt: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> uimark_core::Result<()> {
    let modes = [
        cli.raw,
        cli.html.is_some(),
        cli.payload.is_some(),
        cli.delete.is_some(),
        cli.edit.is_some(),
    ];
    if modes.iter().filter(|enabled| **enabled).count() > 1 {
        return Err(UimarkError::InvalidMode(
            "--raw, --html, --payload, --delete and --edit are mutually exclusive".to_string(),
        ));
    }
    if cli.from.is_some() && cli.edit.is_none() {
        return Err(UimarkError::InvalidMode(
            "--from can only be used with --edit".to_string(),
        ));
    }

    let config = RenderConfig::from_env();

    if let Some(idx) = cli.edit {
        let Some(from) = cli.from.as_deref() else {
            return Err(UimarkError::InvalidMode(
                "--edit requires --from <FILE>".to_string(),
            ));
        };
        let html = read_edit_file(from)?;
        let new_idx = edit_chapter_in_file(&cli.path, &cli.prompt, idx, &html, &config)?;
        println!("{new_idx}");
        return Ok(());
    }

    if let Some(idx) = cli.delete {
        let markdown = delete_chapter_in_file(&cli.path, &cli.prompt, idx, &config)?;
        print!("{markdown}");
        return Ok(());
    }

    let view = load_view(&cli.path, &cli.prompt, &config)?;

    if let Some(idx) = cli.html {
        let html = chapter_pure_html(&view, idx)?;
        println!("{html}");
    } else if let Some(idx) = cli.payload {
        let payload = chapter_payload(&view, idx, None).await?;
        let raw_json = payload_to_raw_json(&payload)?;
        print!("{raw_json}");
    } else if cli.raw {
        let raw_json = chapter_list_view_to_raw_json(&chapter_list_view(&view))?;
        print!("{raw_json}");
    } else {
        let markdown = render_transcript_markdown(&cli.path, &view);
        print!("{markdown}");
    }

    Ok(())
}

fn read_edit_file(path: &Path) -> uimark_core::Result<String> {
    let html = fs::read_to_string(path).map_err(|source| UimarkError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let html = html.trim();
    if html.is_empty() {
        return Err(UimarkError::EmptyEditFile {
            path: path.to_path_buf(),
        });
    }
    Ok(html.to_string())
}
