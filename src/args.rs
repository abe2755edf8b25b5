use std::path::PathBuf;

use clap::Args;

#[derive(Debug, Clone, Default, Args)]
pub struct BaseArgs {
    /// Output as JSON
    #[arg(short = 'j', long, global = true)]
    pub json: bool,

    /// DiscourseDB user id, usually an email address (or via DDB_USER)
    #[arg(long, env = "DDB_USER", global = true)]
    pub user: Option<String>,

    /// DiscourseDB password, not a Google password (or via DDB_PASSWORD)
    #[arg(long, env = "DDB_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Override the browsing service URL (or via DDB_URL)
    #[arg(long, env = "DDB_URL", global = true)]
    pub url: Option<String>,

    /// Restrict listing and uploads to one database (or via DDB_DATABASE)
    #[arg(short = 'd', long, env = "DDB_DATABASE", global = true)]
    pub database: Option<String>,

    /// Skip TLS certificate verification (or via DDB_INSECURE)
    #[arg(long, env = "DDB_INSECURE", global = true)]
    pub insecure: bool,

    /// Path to a .env file to load before running commands.
    #[arg(long, env = "DDB_ENV_FILE", hide_env_values = true)]
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct CLIArgs<T: Args> {
    #[command(flatten)]
    pub base: BaseArgs,

    #[command(flatten)]
    pub args: T,
}
