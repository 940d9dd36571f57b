use std::{
    fs::create_dir_all,
    path::{absolute, PathBuf},
    str::FromStr as _,
};
use tempfile::TempDir;
use tracing::debug;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter, Registry,
};

/// Install a test-friendly subscriber. Safe to call from every test, only the first call wins.
pub fn initialize_tracing() {
    let _ = Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with(fmt::layer().with_test_writer())
        .with(ErrorLayer::default())
        .try_init();
}

pub fn setup_tracing_and_temp_dir(name: Option<&str>, keep: bool) -> TempDir {
    initialize_tracing();

    temporary_directory(name, keep)
}

/// Creates a temporary directory
pub fn temporary_directory(name: Option<&str>, keep: bool) -> TempDir {
    let abs_tmp_path = absolute(PathBuf::from_str("../../.tmp").unwrap()).unwrap();
    create_dir_all(&abs_tmp_path).unwrap();
    let builder = tempfile::Builder::new()
        .prefix(name.unwrap_or("stf-test-"))
        .rand_bytes(8)
        .disable_cleanup(keep)
        .tempdir_in(abs_tmp_path);
    let temp_dir = builder.expect("Not able to create a temporary directory.");

    debug!("using random path: {:?} ", &temp_dir);
    temp_dir
}
