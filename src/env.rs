use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Loads `.env` files before clap parses, so their values feed `env = "DDB_*"` fallbacks.
pub fn bootstrap_from_args(args: &[OsString]) -> Result<()> {
    let explicit = extract_env_file_arg(args)
        .or_else(|| std::env::var_os("DDB_ENV_FILE").map(PathBuf::from));
    load_env(explicit.as_ref())
}

pub fn load_env(explicit_env_file: Option<&PathBuf>) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let mut loaded = HashMap::new();

    for env_file in resolve_env_files(&cwd, explicit_env_file) {
        if !env_file.exists() && explicit_env_file.is_none() {
            continue;
        }

        let parsed = dotenvy::from_path_iter(&env_file)
            .with_context(|| format!("failed to read env file {}", env_file.display()))?;
        for item in parsed {
            let (key, value) =
                item.with_context(|| format!("failed to parse env file {}", env_file.display()))?;
            // The process environment always wins over files.
            if std::env::var_os(&key).is_some() {
                continue;
            }
            loaded.insert(key, value);
        }
    }

    let mut envs: Vec<(String, String)> = loaded.into_iter().collect();
    envs.sort_by(|a, b| a.0.cmp(&b.0));
    for (key, value) in envs {
        std::env::set_var(key, value);
    }
    Ok(())
}

fn extract_env_file_arg(args: &[OsString]) -> Option<PathBuf> {
    let mut explicit = None;
    let mut idx = 1usize;
    while idx < args.len() {
        let Some(arg) = args[idx].to_str() else {
            idx += 1;
            continue;
        };

        if arg == "--" {
            break;
        }

        if arg == "--env-file" {
            if let Some(next) = args.get(idx + 1) {
                explicit = Some(PathBuf::from(next));
            }
            idx += 2;
            continue;
        }

        if let Some(value) = arg.strip_prefix("--env-file=") {
            explicit = Some(PathBuf::from(value));
        }

        idx += 1;
    }
    explicit
}

/// Lowest precedence first: later files override earlier ones.
fn resolve_env_files(cwd: &Path, explicit_env_file: Option<&PathBuf>) -> Vec<PathBuf> {
    match explicit_env_file {
        Some(path) if path.is_absolute() => vec![path.clone()],
        Some(path) => vec![cwd.join(path)],
        None => vec![cwd.join(".env"), cwd.join(".env.local")],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<OsString> {
        items.iter().map(OsString::from).collect()
    }

    #[test]
    fn env_file_flag_in_both_forms() {
        assert_eq!(
            extract_env_file_arg(&argv(&["ddb", "--env-file", "prod.env", "queries"])),
            Some(PathBuf::from("prod.env"))
        );
        assert_eq!(
            extract_env_file_arg(&argv(&["ddb", "queries", "--env-file=dev.env"])),
            Some(PathBuf::from("dev.env"))
        );
    }

    #[test]
    fn env_file_flag_after_separator_is_ignored() {
        assert_eq!(
            extract_env_file_arg(&argv(&["ddb", "--", "--env-file", "x.env"])),
            None
        );
    }

    #[test]
    fn default_env_files_are_relative_to_cwd() {
        let cwd = Path::new("/work");
        assert_eq!(
            resolve_env_files(cwd, None),
            vec![PathBuf::from("/work/.env"), PathBuf::from("/work/.env.local")]
        );
        assert_eq!(
            resolve_env_files(cwd, Some(&PathBuf::from("secrets.env"))),
            vec![PathBuf::from("/work/secrets.env")]
        );
    }
}
