mod codec;

pub use codec::*;

use bytes::Bytes;
use moq_lite::Track;
use serde::{Deserialize, Serialize};
use serde_with::{hex::Hex, DisplayFromStr};
use std::collections::{btree_map, BTreeMap};

use super::Container;

/// Information about a video track in the catalog.
#[serde_with::serde_as]
#[serde_with::skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Video {
	/// A map of track name to rendition configuration.
	pub renditions: BTreeMap<Track, VideoConfig>,

	/// The priority of the video track, relative to other tracks in the broadcast.
	#[serde(default)]
	pub priority: u8,

	/// The intended display size, if known ahead of decoding.
	#[serde(default)]
	pub display: Option<Dimensions>,

	/// Clockwise rotation in degrees to apply before display.
	#[serde(default)]
	pub rotation: Option<f64>,

	/// Whether to mirror horizontally before display.
	#[serde(default)]
	pub flip: Option<bool>,
}

impl Video {
	pub fn is_empty(&self) -> bool {
		self.renditions.is_empty()
	}

	/// Create a new video rendition with a configuration and generate a unique name.
	pub fn create(&mut self, name: &str, config: VideoConfig) -> Track {
		let mut index = 0;

		loop {
			let track = Track::from(format!("video:{}:{}", name, index));
			match self.renditions.entry(track.clone()) {
				btree_map::Entry::Vacant(entry) => {
					entry.insert(config);
					return track;
				}
				btree_map::Entry::Occupied(_) => index += 1,
			}
		}
	}

	pub fn remove(&mut self, track: &Track) -> Option<VideoConfig> {
		self.renditions.remove(track)
	}
}

/// Display dimensions, in pixels.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
	pub width: u64,
	pub height: u64,
}

/// Video decoder configuration based on WebCodecs VideoDecoderConfig.
///
/// Reference: <https://www.w3.org/TR/webcodecs/#video-decoder-config>
#[serde_with::serde_as]
#[serde_with::skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoConfig {
	#[serde_as(as = "DisplayFromStr")]
	pub codec: VideoCodec,

	pub container: Container,

	/// Codec-specific out-of-band initialization data (e.g. H.264 SPS/PPS).
	#[serde(default)]
	#[serde_as(as = "Option<Hex>")]
	pub description: Option<Bytes>,

	#[serde(default)]
	pub coded_width: Option<u64>,
	#[serde(default)]
	pub coded_height: Option<u64>,

	#[serde(default)]
	pub display_aspect_width: Option<u64>,
	#[serde(default)]
	pub display_aspect_height: Option<u64>,

	#[serde(default)]
	pub framerate: Option<f64>,

	#[serde(default)]
	pub bitrate: Option<u64>,

	#[serde(default)]
	pub optimize_for_latency: Option<bool>,

	/// Per-rendition override of the group/track max-latency budget, in microseconds.
	#[serde(default)]
	pub jitter: Option<u64>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_roundtrip() {
		let mut video = Video::default();
		let track = video.create(
			"hd",
			VideoConfig {
				codec: VideoCodec::H264("42E01E".to_string()),
				container: Container::Legacy,
				description: None,
				coded_width: Some(1280),
				coded_height: Some(720),
				display_aspect_width: None,
				display_aspect_height: None,
				framerate: Some(30.0),
				bitrate: Some(2_000_000),
				optimize_for_latency: Some(true),
				jitter: None,
			},
		);
		assert_eq!(track.name, "video:hd:0");
		assert!(!video.is_empty());

		let json = serde_json::to_string(&video).unwrap();
		let decoded: Video = serde_json::from_str(&json).unwrap();
		assert_eq!(decoded, video);
	}
}
