use anyhow::Result;

use crate::client::DiscourseClient;
use crate::http::HttpTransport;

use super::load_catalog;

pub async fn run(
    client: &mut DiscourseClient<HttpTransport>,
    name: &str,
    json: bool,
) -> Result<()> {
    load_catalog(client).await?;
    if json {
        println!("{}", serde_json::to_string(&client.query_content(name)?)?);
        return Ok(());
    }
    client.dump_query(name)
}
