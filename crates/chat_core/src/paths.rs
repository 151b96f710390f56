use std::path::PathBuf;

/// Tangent data directory (~/.tangent)
pub fn tangent_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
        .join(".tangent")
}

/// config.json path
pub fn config_json_path() -> PathBuf {
    tangent_dir().join("config.json")
}

/// Conversation database path
pub fn database_path() -> PathBuf {
    tangent_dir().join("conversations.db")
}

/// Ensure the data directory exists
pub fn ensure_tangent_dir() -> std::io::Result<PathBuf> {
    let dir = tangent_dir();
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
