use std::env;
use std::fs;

use gptbot::{CONFIG_FILE, load_config};
use tempfile::TempDir;

// changes the working directory, so it stays the only test in this binary
#[test]
fn test_load_config_reads_working_directory_once() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(CONFIG_FILE),
        r#"{"api_key":"k","gpt_limit_per_minute":0,"chat_ttl_time":-5}"#,
    )
    .unwrap();
    env::set_current_dir(dir.path()).unwrap();

    let first = load_config().unwrap();
    assert_eq!(first.api_key, "k");
    assert_eq!(first.gpt_limit_per_minute, 3);
    assert_eq!(first.chat_ttl_time, 10);

    fs::write(dir.path().join(CONFIG_FILE), "not json").unwrap();
    let second = load_config().unwrap();
    assert!(std::ptr::eq(first, second));
    assert_eq!(second.gpt_limit_per_minute, 3);
}
