//! Watermark pipeline against stand-in ffprobe/ffmpeg scripts
//!
//! Kept in its own test binary: it writes executables and then runs them,
//! which must not race with other tests spawning processes.

#![cfg(unix)]

mod helpers;

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use axum::http::StatusCode;
use beatproc::config::WatermarkConfig;
use beatproc::Config;
use helpers::{send, test_app, urlencoded_request, MemoryStore, Upstream, PUBLIC_BASE};

const FAKE_FFPROBE: &str = "#!/bin/sh\necho 40.500000\n";

// Records its arguments next to itself and writes a fake MP3 to the last one
const FAKE_FFMPEG: &str = r#"#!/bin/sh
for last; do :; done
printf '%s\n' "$@" > "$(dirname "$0")/ffmpeg-args.txt"
printf 'ID3fake-mp3' > "$last"
"#;

fn install_tool(dir: &Path, name: &str, script: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[tokio::test]
async fn test_watermark_publishes_mixed_mp3() {
    let tools = tempfile::tempdir().unwrap();
    let ffprobe = install_tool(tools.path(), "ffprobe", FAKE_FFPROBE);
    let ffmpeg = install_tool(tools.path(), "ffmpeg", FAKE_FFMPEG);

    let upstream = Upstream::start().await;
    let store = MemoryStore::default();
    let config = Config {
        watermark: WatermarkConfig {
            ffmpeg,
            ffprobe,
            ..WatermarkConfig::default()
        },
        ..Config::default()
    };
    let app = test_app(&config, Some(store.clone()));

    let request = urlencoded_request(
        "/api/watermark",
        &[
            ("fileUrl", &upstream.url("/audio/beat.wav")),
            ("tagUrl", &upstream.url("/audio/tag.wav")),
        ],
    );
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["ok"], serde_json::json!(true));

    let keys = store.keys();
    assert_eq!(keys.len(), 1);
    let key = &keys[0];
    assert!(key.starts_with("watermarked/") && key.ends_with(".mp3"), "key: {}", key);
    assert_eq!(body["url"], serde_json::json!(format!("{}/{}", PUBLIC_BASE, key)));

    let object = store.get(key).unwrap();
    assert_eq!(object.content_type, "audio/mpeg");
    assert_eq!(object.data, b"ID3fake-mp3");

    // 40.5s at the default 15s interval: insertions at 0, 15 and 30 seconds
    let args = std::fs::read_to_string(tools.path().join("ffmpeg-args.txt")).unwrap();
    assert!(args.contains("volume=-6dB,asplit=3[t0][t1][t2]"), "args: {}", args);
    assert!(args.contains("[t2]adelay=delays=30000:all=1[d2]"));
    assert!(args.contains("amix=inputs=4:duration=first"));
    assert!(args.lines().any(|l| l == "libmp3lame"));
}
