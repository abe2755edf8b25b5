use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use serde_json::json;

use crate::args::BaseArgs;
use crate::client::DiscourseClient;
use crate::download::report_download;
use crate::queries::load_catalog;
use crate::session;
use crate::ui::{print_command_status, with_spinner, CommandStatus};

#[derive(Debug, Clone, Args)]
pub struct AnnotationArgs {
    #[command(subcommand)]
    command: AnnotationCommands,
}

#[derive(Debug, Clone, Subcommand)]
enum AnnotationCommands {
    /// Export a saved query in the layout the annotation tooling expects
    Download {
        /// Saved query name
        #[arg(value_name = "NAME")]
        name: String,

        /// Output CSV file [default: for_annotation_<NAME>.csv]
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },
    /// Upload an annotated CSV to the current database
    Upload {
        /// Annotated CSV file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

pub async fn run(base: BaseArgs, args: AnnotationArgs) -> Result<()> {
    let session = session::resolve(&base)?;
    let mut client = DiscourseClient::connect(&session)?;

    match args.command {
        AnnotationCommands::Download { name, out } => {
            load_catalog(&mut client).await?;
            let query = client.query_content(&name)?;
            let path = out.unwrap_or_else(|| PathBuf::from(format!("for_annotation_{name}.csv")));
            let report = with_spinner(
                &format!("Exporting '{name}' for annotation..."),
                client.download_for_annotation(&query, &path),
            )
            .await?;
            report_download(&report, base.json)
        }
        AnnotationCommands::Upload { file } => {
            if !file.is_file() {
                bail!("{} is not a file", file.display());
            }
            let response = with_spinner(
                &format!("Uploading {}...", file.display()),
                client.upload_annotated(&file),
            )
            .await?;

            if base.json {
                let summary = json!({ "status": response.status.as_u16(), "body": response.body });
                println!("{summary}");
            }
            if !response.status.is_success() {
                bail!("upload failed ({}): {}", response.status, response.body);
            }
            print_command_status(
                CommandStatus::Success,
                &format!("Uploaded {} ({})", file.display(), response.status),
            );
            Ok(())
        }
    }
}
