use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use serde::Deserialize;

use pdf_create::{ContentElement, DocumentSettings, FileExistsAction, FileProperties, Options};

#[derive(Parser)]
#[command(name = "pdf-create", version, about = "Create a PDF document from a JSON job file")]
struct Cli {
    /// Job file with OutputFile, DocumentSettings, Content and Options
    #[arg(value_name = "JOB")]
    job: PathBuf,

    /// Output directory, overrides OutputFile.Directory
    #[arg(long, value_name = "DIR")]
    directory: Option<PathBuf>,

    /// Output file name, overrides OutputFile.FileName
    #[arg(long, value_name = "NAME")]
    file_name: Option<String>,

    /// What to do when the output file exists
    #[arg(long, value_enum)]
    if_exists: Option<IfExists>,

    /// Report failures in the result instead of exiting with an error
    #[arg(long)]
    no_throw: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum IfExists {
    Error,
    Overwrite,
    Rename,
}

impl From<IfExists> for FileExistsAction {
    fn from(value: IfExists) -> Self {
        match value {
            IfExists::Error => FileExistsAction::Error,
            IfExists::Overwrite => FileExistsAction::Overwrite,
            IfExists::Rename => FileExistsAction::Rename,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct Job {
    output_file: FileProperties,
    document_settings: DocumentSettings,
    content: Vec<ContentElement>,
    options: Options,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let text = match std::fs::read_to_string(&cli.job) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.job.display());
            return ExitCode::FAILURE;
        }
    };
    let mut job: Job = match serde_json::from_str(&text) {
        Ok(job) => job,
        Err(e) => {
            eprintln!("Error parsing {}: {e}", cli.job.display());
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = cli.directory {
        job.output_file.directory = dir;
    }
    if let Some(name) = cli.file_name {
        job.output_file.file_name = name;
    }
    if let Some(action) = cli.if_exists {
        job.output_file.file_exists_action = action.into();
    }
    if cli.no_throw {
        job.options.throw_error_on_failure = false;
    }

    match pdf_create::create(&job.document_settings, &job.content, &job.output_file, job.options) {
        Ok(result) => {
            match serde_json::to_string(&result) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("Error: {e}"),
            }
            if result.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
