use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use memoir_application::{
    PreviewNavigator, RenderOutcome, RenderScheduler, export_pdf, preview_spread,
};
use memoir_core::{Manuscript, Settings};
use memoir_engine::{Engine, EngineOptions};
use memoir_storage::{FileProjectRepository, ProjectRepository, SettingsStore};

#[derive(Parser)]
#[command(name = "memoir", version, about = "Lay out memoir projects as print-ready PDF")]
struct Cli {
    /// Settings file (defaults to the per-user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a fresh, empty project file
    New {
        project: PathBuf,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long)]
        author: Option<String>,
    },
    /// Render a project to PDF, optionally only a page range
    Render {
        project: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        start: i32,
        /// Pages to keep from --start; an empty range writes the whole document
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        count: i32,
    },
    /// Print the number of rendered pages
    Pages { project: PathBuf },
    /// Print word, character and image totals
    Stats { project: PathBuf },
    /// Render in the background and write the spread around one page
    Preview {
        project: PathBuf,
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        page: i64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write a timestamped backup copy of a project
    Backup { project: PathBuf },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let store = match cli.config {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::default_location()?,
    };
    let settings = store.load()?;
    let repo = FileProjectRepository::new();
    let engine = Engine::with_options(EngineOptions::from(&settings));

    match cli.command {
        Command::New {
            project,
            title,
            author,
        } => {
            anyhow::ensure!(
                !project.exists(),
                "refusing to overwrite {}",
                project.display()
            );
            let author = author
                .or_else(|| std::env::var("USER").ok())
                .unwrap_or_default();
            let manuscript = repo.create_new(&title, &author);
            repo.save(&manuscript, &project)?;
            println!("created {}", project.display());
        }
        Command::Render {
            project,
            output,
            start,
            count,
        } => {
            let manuscript = repo.load(&project)?;
            let output = output.unwrap_or_else(|| project.with_extension("pdf"));
            if start <= 1 && count <= 0 {
                let rendered = export_pdf(&engine, &manuscript, &output, |percent| {
                    log::info!("export {percent}%");
                })?;
                println!("{} pages -> {}", rendered.page_count, output.display());
            } else {
                let rendered = engine.render(&manuscript)?;
                let subset = engine.extract_range(&rendered.bytes, start, count);
                write_file(&output, &subset)?;
                println!(
                    "{} of {} pages -> {}",
                    engine.page_count(&subset),
                    rendered.page_count,
                    output.display()
                );
            }
        }
        Command::Pages { project } => {
            let manuscript = repo.load(&project)?;
            println!("{}", engine.render(&manuscript)?.page_count);
        }
        Command::Stats { project } => {
            let manuscript = repo.load(&project)?;
            print_stats(&manuscript);
        }
        Command::Preview {
            project,
            page,
            output,
        } => {
            let manuscript = repo.load(&project)?;
            let output = output.unwrap_or_else(|| project.with_extension("preview.pdf"));
            preview(&engine, &settings, manuscript, page, &output)?;
        }
        Command::Backup { project } => {
            let manuscript = repo.load(&project)?;
            let backup = repo.create_backup(&manuscript, &project)?;
            println!("backup -> {}", backup.display());
        }
    }

    Ok(())
}

fn preview(
    engine: &Engine,
    settings: &Settings,
    manuscript: Manuscript,
    page: i64,
    output: &Path,
) -> anyhow::Result<()> {
    let scheduler = RenderScheduler::new(Arc::new(engine.clone()), settings.debounce());
    let rendered = match scheduler.request_render(Arc::new(manuscript)).wait() {
        RenderOutcome::Completed(rendered) => rendered,
        RenderOutcome::Failed(err) => return Err(err.context("background render")),
        RenderOutcome::Cancelled => anyhow::bail!("render was cancelled"),
    };

    let mut navigator = PreviewNavigator::new(settings.preview_pages as usize);
    navigator.set_total_pages(rendered.page_count);
    navigator.go_to(page);

    let spread = preview_spread(engine, &rendered, &navigator);
    write_file(output, &spread)?;

    let absolute = std::path::absolute(output).unwrap_or_else(|_| output.to_path_buf());
    let reference = format!("file://{}", absolute.display());
    println!(
        "page {} of {}: {}",
        navigator.current_page(),
        navigator.total_pages(),
        navigator.spread_fragment(&reference)
    );
    Ok(())
}

fn print_stats(manuscript: &Manuscript) {
    println!("title:      {}", manuscript.metadata.title);
    println!("chapters:   {}", manuscript.chapters.len());
    println!("blocks:     {}", manuscript.blocks().count());
    println!("words:      {}", manuscript.total_word_count());
    println!("characters: {}", manuscript.total_character_count());
    println!("images:     {}", manuscript.total_image_count());
}

fn write_file(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write {}", path.display()))
}
