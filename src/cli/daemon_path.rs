use std::path::PathBuf;

pub fn to_daemon_path(mut path: PathBuf) -> PathBuf {
    path.set_file_name("habitual-daemon");
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    path
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::to_daemon_path;

    #[test]
    #[cfg(unix)]
    fn test_daemon_sits_next_to_cli() {
        assert_eq!(
            to_daemon_path(PathBuf::from("/usr/local/bin/habitual")),
            PathBuf::from("/usr/local/bin/habitual-daemon")
        );
    }
}
