use directories::ProjectDirs;
use std::path::PathBuf;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "faceid", "FaceId")
}

/// `<config_dir>/faceid.toml`, when the platform has a home directory.
pub fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("faceid.toml"))
}

/// Where camera captures land unless `capture.output_dir` says otherwise.
pub fn default_capture_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.cache_dir().join("captures"))
        .unwrap_or_else(|| std::env::temp_dir().join("faceid-captures"))
}
