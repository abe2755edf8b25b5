use std::fmt::Write as _;

use anyhow::Result;
use dialoguer::console;
use serde_json::json;

use crate::client::DiscourseClient;
use crate::http::HttpTransport;
use crate::ui::{apply_column_padding, header, styled_table};
use crate::utils::pluralize;

use super::load_catalog;

pub async fn run(client: &mut DiscourseClient<HttpTransport>, json: bool) -> Result<()> {
    let names = load_catalog(client).await?;
    let database_of = |name: &str| {
        client
            .catalog()
            .and_then(|entries| entries.iter().find(|e| e.name == name))
            .and_then(|entry| entry.database())
    };

    if json {
        let rows: Vec<_> = names
            .iter()
            .map(|name| json!({ "name": name, "database": database_of(name) }))
            .collect();
        println!("{}", serde_json::to_string(&rows)?);
        return Ok(());
    }

    let mut output = String::new();
    let scope = client.scope().unwrap_or("all databases");
    writeln!(
        output,
        "{} saved {} in {}\n",
        console::style(names.len()),
        pluralize(names.len(), "query", Some("queries")),
        console::style(scope).bold()
    )?;

    let mut table = styled_table();
    table.set_header(vec![header("Name"), header("Database")]);
    apply_column_padding(&mut table, (0, 6));
    for name in &names {
        let database = database_of(name).unwrap_or_else(|| "-".to_string());
        table.add_row(vec![name.as_str(), database.as_str()]);
    }

    write!(output, "{table}")?;
    println!("{output}");
    Ok(())
}
