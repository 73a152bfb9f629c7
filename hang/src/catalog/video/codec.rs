use serde::{Deserialize, Serialize};

use crate::catalog::InvalidCodec;

/// A video codec, encoded as a WebCodecs codec string.
///
/// Profile/level/tier bits after the codec prefix are kept opaque (as the exact
/// string required by the decoder) rather than decomposed, since nothing downstream
/// needs to inspect them structurally.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum VideoCodec {
	H264(String),
	H265(String),
	VP8,
	VP9(String),
	AV1(String),
}

impl std::fmt::Display for VideoCodec {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::H264(s) => write!(f, "avc1.{s}"),
			Self::H265(s) => write!(f, "hev1.{s}"),
			Self::VP8 => write!(f, "vp8"),
			Self::VP9(s) => write!(f, "vp09.{s}"),
			Self::AV1(s) => write!(f, "av01.{s}"),
		}
	}
}

impl std::str::FromStr for VideoCodec {
	type Err = InvalidCodec;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s == "vp8" {
			return Ok(Self::VP8);
		}
		for (prefix, ctor) in [
			("avc1.", Self::H264 as fn(String) -> Self),
			("avc3.", Self::H264 as fn(String) -> Self),
			("hev1.", Self::H265 as fn(String) -> Self),
			("hvc1.", Self::H265 as fn(String) -> Self),
			("vp09.", Self::VP9 as fn(String) -> Self),
			("av01.", Self::AV1 as fn(String) -> Self),
		] {
			if let Some(rest) = s.strip_prefix(prefix) {
				return Ok(ctor(rest.to_string()));
			}
		}
		Err(InvalidCodec)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_roundtrip() {
		assert_eq!("vp8".parse::<VideoCodec>().unwrap(), VideoCodec::VP8);
		assert_eq!(
			"avc1.42E01E".parse::<VideoCodec>().unwrap(),
			VideoCodec::H264("42E01E".to_string())
		);
		assert_eq!("avc1.42E01E".parse::<VideoCodec>().unwrap().to_string(), "avc1.42E01E");
	}

	#[test]
	fn test_invalid() {
		assert!("nonsense".parse::<VideoCodec>().is_err());
	}
}
