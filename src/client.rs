use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::catalog::{self, SavedQuery};
use crate::http::{HttpTransport, Payload, ServiceResponse, Transport};
use crate::output::{self, DownloadReport, WriteMode};
use crate::query::{discourse_parts, render_query, with_single_part};
use crate::session::Session;

pub const CATALOG_ENDPOINT: &str = "browsing/prop_list";
pub const CSV_EXPORT_ENDPOINT: &str =
    "browsing/action/downloadQueryCsvExpandible/discoursedb_data.csv";
pub const ANNOTATION_EXPORT_ENDPOINT: &str =
    "browsing/action/downloadLightsideQuery/for_annotation.csv";
const UPLOAD_FIELD: &str = "file_annotatedFileForUpload";
const EXTERNAL_DATABASE_PREFIX: &str = "discoursedb_ext_";

/// Outcome of one partition in [`DiscourseClient::download_by_parts`].
#[derive(Debug, Clone, Serialize)]
pub struct PartOutcome {
    pub part: Value,
    pub rows: Option<usize>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PartsReport {
    pub parts: Vec<PartOutcome>,
    pub total_rows: usize,
}

impl PartsReport {
    pub fn failed(&self) -> usize {
        self.parts.iter().filter(|p| p.error.is_some()).count()
    }
}

/// Session state against the browsing service: scope plus the last fetched catalog.
pub struct DiscourseClient<T> {
    transport: T,
    scope: Option<String>,
    catalog: Option<Vec<SavedQuery>>,
}

impl DiscourseClient<HttpTransport> {
    pub fn connect(session: &Session) -> Result<Self> {
        let mut client = Self::new(HttpTransport::new(session)?);
        client.set_scope(session.scope.clone());
        Ok(client)
    }
}

impl<T: Transport> DiscourseClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            scope: None,
            catalog: None,
        }
    }

    /// Limit listing and uploads to one database, or `None` for all of them.
    pub fn set_scope(&mut self, scope: Option<String>) {
        self.scope = scope;
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// Entries cached by the last successful [`Self::list_saved_queries`].
    pub fn catalog(&self) -> Option<&[SavedQuery]> {
        self.catalog.as_deref()
    }

    /// Fetches the full catalog, caches it, and returns the names in scope.
    pub async fn list_saved_queries(&mut self) -> Result<Payload<Vec<String>>> {
        let response = self
            .transport
            .get_text(CATALOG_ENDPOINT, &[("ptype", "query")])
            .await?;

        match catalog::parse_catalog(response.body) {
            Payload::Parsed(entries) => {
                let names = catalog::filter_names(&entries, self.scope());
                self.catalog = Some(entries);
                Ok(Payload::Parsed(names))
            }
            Payload::Raw(body) => {
                self.catalog = None;
                Ok(Payload::Raw(body))
            }
        }
    }

    /// Encoded definition of the first saved query called `name`.
    pub fn query_literal(&self, name: &str) -> Result<Option<&str>> {
        let entries = self
            .catalog
            .as_ref()
            .ok_or_else(|| anyhow!("saved queries not loaded; list them first"))?;
        Ok(entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.literal.as_str()))
    }

    pub fn query_content(&self, name: &str) -> Result<Value> {
        let literal = self
            .query_literal(name)?
            .ok_or_else(|| anyhow!("saved query '{name}' not found"))?;
        serde_json::from_str(literal)
            .with_context(|| format!("saved query '{name}' is not valid JSON"))
    }

    pub fn dump_query(&self, name: &str) -> Result<()> {
        println!("{}", render_query(&self.query_content(name)?)?);
        Ok(())
    }

    /// Runs `query` and writes the CSV export to `path`.
    ///
    /// Only transport failures are returned as `Err`; write and row-count
    /// failures are recorded in the report.
    pub async fn download(
        &self,
        query: &Value,
        path: &Path,
        mode: WriteMode,
    ) -> Result<DownloadReport> {
        self.export(CSV_EXPORT_ENDPOINT, query, path, mode).await
    }

    /// Same as [`Self::download`] against the annotation export, always truncating.
    pub async fn download_for_annotation(
        &self,
        query: &Value,
        path: &Path,
    ) -> Result<DownloadReport> {
        self.export(ANNOTATION_EXPORT_ENDPOINT, query, path, WriteMode::Truncate)
            .await
    }

    /// Downloads one request per `rows.discourse_part` entry into a single file.
    ///
    /// The first part truncates `path`, later parts append without their
    /// header. A failed part is recorded and the remaining parts still run.
    pub async fn download_by_parts(&self, query: &Value, path: &Path) -> Result<PartsReport> {
        let parts = discourse_parts(query)?;
        info!(parts = parts.len(), "breaking query into parts");

        let mut report = PartsReport::default();
        for (index, part) in parts.iter().enumerate() {
            let mode = if index == 0 {
                WriteMode::Truncate
            } else {
                WriteMode::Append
            };
            let narrowed = with_single_part(query, part)?;
            info!(part = %part, "downloading part {}/{}", index + 1, parts.len());

            let outcome = match self.download(&narrowed, path, mode).await {
                Ok(download) => PartOutcome {
                    part: part.clone(),
                    rows: download.row_count(),
                    error: download.written.err().map(|err| err.to_string()),
                },
                Err(err) => {
                    warn!(part = %part, error = %err, "part download failed");
                    PartOutcome {
                        part: part.clone(),
                        rows: None,
                        error: Some(format!("{err:#}")),
                    }
                }
            };

            report.total_rows += outcome.rows.unwrap_or(0);
            info!(
                rows = ?outcome.rows,
                total = report.total_rows,
                "part {}/{} done",
                index + 1,
                parts.len()
            );
            report.parts.push(outcome);
        }
        Ok(report)
    }

    /// Posts an annotated file to the upload endpoint of the scoped database.
    pub async fn upload_annotated(&self, path: &Path) -> Result<ServiceResponse> {
        let Some(scope) = self.scope() else {
            bail!(
                "a database is required to upload annotations. Use --database or set DDB_DATABASE"
            );
        };
        let database = scope.strip_prefix(EXTERNAL_DATABASE_PREFIX).unwrap_or(scope);
        let endpoint = format!("browsing/action/database/{database}/uploadLightside");
        self.transport
            .post_file(&endpoint, UPLOAD_FIELD, path)
            .await
    }

    async fn export(
        &self,
        endpoint: &str,
        query: &Value,
        path: &Path,
        mode: WriteMode,
    ) -> Result<DownloadReport> {
        let encoded = serde_json::to_string(query).context("failed to encode query")?;
        let response = self
            .transport
            .get_text(endpoint, &[("query", encoded.as_str())])
            .await?;
        Ok(output::materialize(path, &response.body, mode))
    }
}
