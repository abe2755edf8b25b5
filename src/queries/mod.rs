use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use crate::args::BaseArgs;
use crate::client::DiscourseClient;
use crate::http::{HttpTransport, Payload};
use crate::session;
use crate::ui::with_spinner;

mod list;
mod view;

#[derive(Debug, Clone, Args)]
pub struct QueriesArgs {
    #[command(subcommand)]
    command: Option<QueriesCommands>,
}

#[derive(Debug, Clone, Subcommand)]
enum QueriesCommands {
    /// List saved queries in the current database
    List,
    /// Print the definition of a saved query
    View(ViewArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ViewArgs {
    /// Saved query name
    #[arg(value_name = "NAME")]
    name: String,
}

pub async fn run(base: BaseArgs, args: QueriesArgs) -> Result<()> {
    let session = session::resolve(&base)?;
    let mut client = DiscourseClient::connect(&session)?;

    match args.command {
        None | Some(QueriesCommands::List) => list::run(&mut client, base.json).await,
        Some(QueriesCommands::View(v)) => view::run(&mut client, &v.name, base.json).await,
    }
}

/// Fetches the catalog; a body that is not a catalog becomes the error message.
pub async fn load_catalog(client: &mut DiscourseClient<HttpTransport>) -> Result<Vec<String>> {
    match with_spinner("Loading saved queries...", client.list_saved_queries()).await? {
        Payload::Parsed(names) => Ok(names),
        Payload::Raw(body) => bail!("service did not return a query catalog:\n{body}"),
    }
}
