use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Client-visible configuration for a playback session.
///
/// Mirrors what an embedding application actually needs to expose: where to connect,
/// what to watch, and the knobs a user might flip mid-playback. Bridges protocol-level
/// types (moq-lite/hang) to a native application without dragging in CLI scaffolding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	/// The relay to connect to, e.g. `https://relay.example.com`.
	pub relay_url: url::Url,

	/// The broadcast path to watch, relative to the relay's root namespace.
	pub broadcast_path: String,

	/// How far behind the live edge playback should target.
	pub target_latency_ms: u64,

	/// Whether to automatically reconnect on transport failure.
	pub reconnect: bool,

	/// Prefer the smallest rendition whose pixel count is at least this large.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub rendition_target_pixels: Option<u64>,

	/// Force a specific rendition by name, overriding pixel-based selection.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub rendition_target_name: Option<String>,

	pub paused: bool,
	pub muted: bool,
	pub volume: f64,
}

impl Config {
	pub fn target_latency(&self) -> moq_lite::Time {
		moq_lite::Time::from_millis_unchecked(self.target_latency_ms)
	}
}

impl Default for Config {
	fn default() -> Self {
		Self {
			relay_url: "https://localhost:4443".parse().expect("valid default URL"),
			broadcast_path: String::new(),
			target_latency_ms: 100,
			reconnect: true,
			rendition_target_pixels: None,
			rendition_target_name: None,
			paused: false,
			muted: false,
			volume: 1.0,
		}
	}
}

/// Backoff schedule used by the connection supervisor between reconnect attempts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Backoff {
	pub base: Duration,
	pub cap: Duration,
}

impl Default for Backoff {
	fn default() -> Self {
		Self {
			base: Duration::from_millis(250),
			cap: Duration::from_secs(10),
		}
	}
}

impl Backoff {
	/// Full-jitter delay for the given zero-indexed attempt: `rand(0, min(cap, base * 2^attempt))`.
	pub fn delay(&self, attempt: u32) -> Duration {
		let exp = self.base.as_millis().saturating_mul(1u128 << attempt.min(32));
		let max = exp.min(self.cap.as_millis()) as u64;
		use rand::Rng;
		Duration::from_millis(rand::rng().random_range(0..=max.max(1)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_matches_documented_defaults() {
		let config = Config::default();
		assert_eq!(config.target_latency_ms, 100);
		assert!(config.reconnect);
		assert_eq!(config.volume, 1.0);
		assert!(!config.muted);
		assert!(!config.paused);
	}

	#[test]
	fn test_toml_roundtrip() {
		let toml = r#"
			relay_url = "https://relay.example.com"
			broadcast_path = "room/alice"
		"#;
		let config: Config = toml::from_str(toml).unwrap();
		assert_eq!(config.broadcast_path, "room/alice");
		assert_eq!(config.target_latency_ms, 100);
	}

	#[test]
	fn test_backoff_caps() {
		let backoff = Backoff::default();
		for attempt in 0..40 {
			assert!(backoff.delay(attempt) <= backoff.cap);
		}
	}
}
