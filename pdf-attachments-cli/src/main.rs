use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pdf_attachments::output::write_atomic;
use pdf_attachments::{
    add_attachments_to_file, get_attachment, list_attachments, RenameMap, WriterConfig,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pdf-attachments",
    about = "List, extract and add PDF file attachments",
    version,
    author
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all attachments in a PDF with name, size, page and description
    List {
        /// PDF file to inspect
        pdf: PathBuf,

        /// Print the attachment list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract a single attachment by its exact name
    Get {
        /// PDF file containing the attachment
        pdf: PathBuf,

        /// Exact attachment name (see `list`)
        name: String,

        /// Output file path; defaults to the attachment's name in the current directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Embed files into a PDF as document-level attachments
    Add {
        /// PDF file to add attachments to
        pdf: PathBuf,

        /// Files to embed
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output PDF path; required unless --in-place is set
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite the input PDF
        #[arg(short, long)]
        in_place: bool,

        /// Rename an attachment: 'original:newname' (repeatable)
        #[arg(short, long = "name", value_name = "ORIGINAL:NEW")]
        name: Vec<String>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::List { .. } => "list",
            Commands::Get { .. } => "get",
            Commands::Add { .. } => "add",
        }
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    tracing::debug!("running {}", command.name());
    match command {
        Commands::List { pdf, json } => list(&pdf, json),
        Commands::Get { pdf, name, output } => get(&pdf, &name, output),
        Commands::Add {
            pdf,
            files,
            output,
            in_place,
            name,
        } => add(&pdf, &files, output, in_place, &name),
    }
}

fn list(pdf: &Path, json: bool) -> Result<()> {
    if !pdf.is_file() {
        bail!("file not found: {}", pdf.display());
    }
    let attachments = list_attachments(pdf)?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&attachments).context("failed to encode attachment list")?;
        println!("{rendered}");
        return Ok(());
    }

    println!("PDF: {}", pdf.display());
    println!("Attachments: {}", attachments.len());
    println!("{}", "-".repeat(50));
    if attachments.is_empty() {
        println!("  (none)");
    }
    for attachment in &attachments {
        println!("{attachment}");
    }
    Ok(())
}

fn get(pdf: &Path, name: &str, output: Option<PathBuf>) -> Result<()> {
    if !pdf.is_file() {
        bail!("file not found: {}", pdf.display());
    }
    let attachment = get_attachment(pdf, name)?;
    let destination = match output {
        Some(path) => path,
        None => attachment.default_output_path()?,
    };
    let data = attachment.data.unwrap_or_default();

    write_atomic(&destination, &data)?;
    println!(
        "Extracted: {} \u{2192} {}  ({} bytes)",
        attachment.name,
        destination.display(),
        data.len()
    );
    Ok(())
}

fn add(
    pdf: &Path,
    files: &[PathBuf],
    output: Option<PathBuf>,
    in_place: bool,
    name: &[String],
) -> Result<()> {
    if !pdf.is_file() {
        bail!("PDF file not found: {}", pdf.display());
    }
    if let Some(missing) = files.iter().find(|file| !file.is_file()) {
        bail!("file not found: {}", missing.display());
    }

    let renames = RenameMap::parse(name)?;
    let file_names: Vec<String> = files
        .iter()
        .map(|file| {
            file.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .collect();
    let unknown = renames.unknown_keys(file_names.iter().map(String::as_str));
    if !unknown.is_empty() {
        bail!(
            "--name key(s) don't match any input file: {}",
            unknown.join(", ")
        );
    }

    let destination = match (output, in_place) {
        (Some(_), true) => bail!("--output and --in-place are mutually exclusive."),
        (None, false) => bail!(
            "specify --output/-o or --in-place/-i. \
             Refusing to overwrite input PDF without explicit --in-place."
        ),
        (Some(output), false) => output,
        (None, true) => pdf.to_path_buf(),
    };

    let count = add_attachments_to_file(pdf, files, &renames, &destination, &WriterConfig::default())?;
    println!(
        "Added {count} attachment(s) \u{2192} {}",
        destination.display()
    );
    Ok(())
}
