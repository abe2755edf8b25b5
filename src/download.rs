use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Args;
use serde_json::json;

use crate::args::BaseArgs;
use crate::client::{DiscourseClient, PartsReport};
use crate::output::{DownloadReport, WriteMode};
use crate::queries::load_catalog;
use crate::session;
use crate::ui::{
    apply_column_padding, header, print_command_status, styled_table, with_spinner, CommandStatus,
};
use crate::utils::pluralize;

#[derive(Debug, Clone, Args)]
pub struct DownloadArgs {
    /// Saved query name
    #[arg(value_name = "NAME")]
    name: String,

    /// Output CSV file [default: data_<NAME>.csv]
    #[arg(long, short = 'o')]
    out: Option<PathBuf>,

    /// Issue one request per discourse part and collect them into one file
    #[arg(long)]
    by_parts: bool,

    /// Append rows to the output file instead of replacing it
    #[arg(long, conflicts_with = "by_parts")]
    append: bool,
}

pub fn default_output(name: &str) -> PathBuf {
    PathBuf::from(format!("data_{name}.csv"))
}

pub async fn run(base: BaseArgs, args: DownloadArgs) -> Result<()> {
    let session = session::resolve(&base)?;
    let mut client = DiscourseClient::connect(&session)?;
    load_catalog(&mut client).await?;

    let query = client.query_content(&args.name)?;
    let path = args.out.unwrap_or_else(|| default_output(&args.name));

    if args.by_parts {
        let report = with_spinner(
            &format!("Downloading '{}' by parts...", args.name),
            client.download_by_parts(&query, &path),
        )
        .await?;
        return report_parts(&report, &path, base.json);
    }

    let mode = if args.append {
        WriteMode::Append
    } else {
        WriteMode::Truncate
    };
    let report = with_spinner(
        &format!("Downloading '{}'...", args.name),
        client.download(&query, &path, mode),
    )
    .await?;
    report_download(&report, base.json)
}

pub fn report_download(report: &DownloadReport, json: bool) -> Result<()> {
    if let Err(err) = &report.written {
        print_command_status(
            CommandStatus::Error,
            &format!("Download was not saved to {}", report.path.display()),
        );
        bail!("{err}");
    }

    if json {
        let summary = json!({
            "path": report.path,
            "mode": report.mode,
            "rows": report.row_count(),
        });
        println!("{summary}");
        return Ok(());
    }

    match report.row_count() {
        Some(rows) => print_command_status(
            CommandStatus::Success,
            &format!(
                "Saved {rows} {} to {}",
                pluralize(rows, "row", None),
                report.path.display()
            ),
        ),
        None => print_command_status(
            CommandStatus::Warning,
            &format!("Saved {} (row count unavailable)", report.path.display()),
        ),
    }
    Ok(())
}

fn report_parts(report: &PartsReport, path: &Path, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
    } else {
        let mut table = styled_table();
        table.set_header(vec![header("Part"), header("Rows"), header("Error")]);
        apply_column_padding(&mut table, (0, 4));
        for part in &report.parts {
            let rows = part
                .rows
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string());
            let error = part.error.clone().unwrap_or_default();
            table.add_row(vec![part.part.to_string(), rows, error]);
        }
        println!("{table}");
    }

    let total = report.parts.len();
    let failed = report.failed();
    if failed > 0 {
        print_command_status(
            CommandStatus::Error,
            &format!(
                "Saved {} {} from {} of {total} {}",
                report.total_rows,
                pluralize(report.total_rows, "row", None),
                total - failed,
                pluralize(total, "part", None)
            ),
        );
        bail!(
            "{failed} of {total} {} failed; {} may be incomplete",
            pluralize(total, "part", None),
            path.display()
        );
    }

    print_command_status(
        CommandStatus::Success,
        &format!(
            "Saved {} {} from {total} {} to {}",
            report.total_rows,
            pluralize(report.total_rows, "row", None),
            pluralize(total, "part", None),
            path.display()
        ),
    );
    Ok(())
}
