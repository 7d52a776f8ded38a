use std::path::PathBuf;

/// `ROSTER_HOME` takes precedence over `HOME` so tests and scripts can point
/// every well-known path somewhere disposable.
fn home_dir() -> PathBuf {
    let home = std::env::var("ROSTER_HOME")
        .or_else(|_| std::env::var("HOME"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
}

pub fn get_config_dir() -> PathBuf {
    home_dir().join(".config").join("roster")
}

pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.toml")
}

pub fn get_data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join("roster")
}

pub fn get_default_store_path() -> PathBuf {
    get_data_dir().join("UserDB")
}

pub fn get_cache_dir() -> PathBuf {
    home_dir().join(".cache").join("roster")
}

pub fn get_log_dir() -> PathBuf {
    get_cache_dir().join("log")
}
