use std::{
    env, io,
    path::{self, PathBuf},
};

use anyhow::{Context, Result};

const APPLICATION_DIR: &str = "focuslog";

/// Application directory from `--dir`, or the default one. The result is always absolute, since
/// the daemon moves its working directory to the filesystem root.
pub fn resolve_application_path(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(dir) => path::absolute(&dir)
            .with_context(|| format!("Couldn't resolve application directory {dir:?}")),
        None => create_application_default_path(),
    }
}

/// Resolves the directory for records and logs, creating it if needed. On Windows it's
/// `%APPDATA%\focuslog`, elsewhere `$XDG_STATE_HOME/focuslog` or `$HOME/.local/state/focuslog`.
pub fn create_application_default_path() -> Result<PathBuf> {
    let mut path = {
        #[cfg(windows)]
        {
            env::var("APPDATA")
                .map(PathBuf::from)
                .context("APPDATA should be present on Windows")?
        }
        #[cfg(not(windows))]
        {
            env::var("XDG_STATE_HOME")
                .map(PathBuf::from)
                .or_else(|_| {
                    env::var("HOME").map(|home| {
                        let mut path = PathBuf::from(home);
                        path.push(".local/state");
                        path
                    })
                })
                .context("Couldn't find neither XDG_STATE_HOME nor HOME")?
        }
    };
    path.push(APPLICATION_DIR);

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::{env, path::PathBuf};

    use anyhow::Result;
    use tempfile::tempdir;

    use super::resolve_application_path;

    #[test]
    fn test_relative_dir_is_made_absolute() -> Result<()> {
        let resolved = resolve_application_path(Some(PathBuf::from("data")))?;
        assert!(resolved.is_absolute());
        assert_eq!(resolved, env::current_dir()?.join("data"));
        Ok(())
    }

    #[test]
    fn test_absolute_dir_is_kept() -> Result<()> {
        let dir = tempdir()?;
        assert_eq!(
            resolve_application_path(Some(dir.path().to_owned()))?,
            dir.path()
        );
        Ok(())
    }
}
