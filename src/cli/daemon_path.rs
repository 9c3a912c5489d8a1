use std::path::PathBuf;

/// Path of the detaching daemon binary shipped next to the cli.
pub fn to_daemon_path(mut path: PathBuf) -> PathBuf {
    path.set_file_name("focuslog-daemon");
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    path
}
