//! The catalog: a JSON document describing a broadcast's tracks and codec configurations.
//!
//! The catalog itself is delivered as a regular [moq_lite::Track] (see [produce]):
//! its single frame, re-written on every change, is the current catalog document.

pub mod audio;
mod container;
mod produce;
pub mod video;

pub use audio::{Audio, AudioConfig};
pub use container::Container;
pub use produce::{CatalogConsumer, CatalogGuard, CatalogProducer};
pub use video::{Video, VideoConfig};

use moq_lite::{Delivery, Track};
use serde::{Deserialize, Serialize};

/// A codec string didn't match any codec this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid codec string")]
pub struct InvalidCodec;

/// The root catalog document.
///
/// ```json
/// {
///   "video": { "renditions": { "hd": { ... } }, "priority": 1 },
///   "audio": { "renditions": { "stereo": { ... } }, "priority": 2 }
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Catalog {
	#[serde(default, skip_serializing_if = "Video::is_empty")]
	pub video: Video,

	#[serde(default, skip_serializing_if = "Audio::is_empty")]
	pub audio: Audio,
}

impl Catalog {
	/// The well-known track name that carries the catalog itself.
	pub fn default_track() -> Track {
		Track::new("catalog.json")
	}

	/// The delivery parameters used for the catalog track: high priority, low latency,
	/// strictly ordered (clients must never apply an older catalog after a newer one).
	pub fn default_delivery() -> Delivery {
		Delivery {
			priority: 255,
			max_latency: moq_lite::Time::from_secs_unchecked(10),
			ordered: true,
		}
	}

	/// Serialize the catalog to its canonical JSON representation.
	pub fn to_string(&self) -> Result<bytes::Bytes, serde_json::Error> {
		Ok(serde_json::to_vec(self)?.into())
	}

	/// Parse a catalog from its JSON representation.
	///
	/// Fails with a [serde_json::Error] naming the first schema violation encountered,
	/// carrying a JSON-pointer-like path into the document.
	pub fn from_slice(data: &[u8]) -> Result<Self, serde_json::Error> {
		serde_json::from_slice(data)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::audio::{AudioCodec, AudioConfig};

	#[test]
	fn test_empty_roundtrip() {
		let catalog = Catalog::default();
		let json = catalog.to_string().unwrap();
		assert_eq!(json.as_ref(), b"{}");
		let decoded = Catalog::from_slice(&json).unwrap();
		assert_eq!(decoded, catalog);
	}

	#[test]
	fn test_audio_roundtrip() {
		let mut catalog = Catalog::default();
		catalog.audio.create(
			"stereo",
			AudioConfig {
				codec: AudioCodec::Opus,
				sample_rate: 48_000,
				channel_count: 2,
				bitrate: Some(64_000),
				description: None,
			},
		);

		let json = catalog.to_string().unwrap();
		let decoded = Catalog::from_slice(&json).unwrap();
		assert_eq!(decoded, catalog);
	}

	#[test]
	fn test_invalid_schema() {
		assert!(Catalog::from_slice(br#"{"video": "not an object"}"#).is_err());
	}
}
