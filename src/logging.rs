//! Process-wide tracing setup
//!
//! Android builds forward events to logcat under the `tMediaPlayer` tag;
//! elsewhere (host tests, desktop tooling) they go to stderr filtered by
//! `RUST_LOG`.

use crate::ffi::avutil::{av_log_set_level, log_level};
use std::sync::Once;

static INIT: Once = Once::new();

pub const LOG_TAG: &str = "tMediaPlayer";

/// Install the subscriber and quiet FFmpeg's own logging; later calls are no-ops
pub fn init() {
  INIT.call_once(|| {
    install_subscriber();
    unsafe { av_log_set_level(log_level::ERROR) };
  });
}

#[cfg(target_os = "android")]
fn install_subscriber() {
  use tracing_subscriber::layer::SubscriberExt;
  use tracing_subscriber::util::SubscriberInitExt;
  use tracing_subscriber::Layer;

  match tracing_android::layer(LOG_TAG) {
    Ok(layer) => {
      let filter = tracing_subscriber::filter::LevelFilter::DEBUG;
      let _ = tracing_subscriber::registry().with(layer.with_filter(filter)).try_init();
    }
    Err(e) => eprintln!("{}: logcat unavailable: {}", LOG_TAG, e),
  }
}

#[cfg(not(target_os = "android"))]
fn install_subscriber() {
  use tracing_subscriber::EnvFilter;

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tmedia=info"));
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .try_init();
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_init_is_idempotent() {
    init();
    init();
    tracing::info!(target: "tmedia", "logging ready");
    assert!(INIT.is_completed());
  }
}
