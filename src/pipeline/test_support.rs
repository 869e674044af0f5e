//! Fixtures for pipeline tests: image files and a scripted fake encoder

use std::path::{Path, PathBuf};
use std::time::Duration;

use image::{Rgba, RgbaImage};
use tokio::sync::mpsc::UnboundedReceiver;

use super::outcome::ConversionEvent;

/// Behaviour of the fake encoder script
pub enum FakeEncoder {
    /// Write the output and exit 0
    Succeed,
    /// Like `Succeed`, appending one line per call to the given file
    Counting(PathBuf),
    /// Print the message to stderr and exit with the code
    Fail(&'static str, i32),
    /// Never finish on its own
    Hang,
    /// Sleep, then succeed
    Slow(Duration),
    /// Succeed, then remove the `.png` source itself so the worker cannot
    RemoveSource,
}

/// Write an executable shell script standing in for astcenc
pub fn fake_encoder(dir: &Path, behaviour: FakeEncoder) -> PathBuf {
    // $1=-cl $2=input $3=output $4=block $5=quality
    let body = match behaviour {
        FakeEncoder::Succeed => "echo astc > \"$3\"".to_string(),
        FakeEncoder::Counting(counter) => {
            format!("echo \"$4\" >> \"{}\"\necho astc > \"$3\"", counter.display())
        }
        FakeEncoder::Fail(message, code) => format!("echo '{}' >&2\nexit {}", message, code),
        FakeEncoder::Hang => "exec sleep 30".to_string(),
        FakeEncoder::Slow(delay) => {
            format!("sleep {:.3}\necho astc > \"$3\"", delay.as_secs_f64())
        }
        FakeEncoder::RemoveSource => "echo astc > \"$3\"\nrm -f \"${3%.astc}.png\"".to_string(),
    };

    let path = dir.join("fake-astcenc.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    path
}

/// Number of encoder invocations recorded by a `Counting` encoder
pub fn call_count(counter: &Path) -> usize {
    std::fs::read_to_string(counter)
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

pub fn write_image(path: &Path, w: u32, h: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbaImage::from_fn(w, h, |x, y| Rgba([x as u8, y as u8, 128, 255]))
        .save(path)
        .unwrap();
}

/// Collect events until every sender is gone
pub async fn drain(mut rx: UnboundedReceiver<ConversionEvent>) -> Vec<ConversionEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}
