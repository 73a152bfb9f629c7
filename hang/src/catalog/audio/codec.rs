use serde::{Deserialize, Serialize};

use super::aac::AacProfile;
use crate::catalog::InvalidCodec;

/// An audio codec, encoded as a WebCodecs codec string.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
	AAC(AacProfile),
	Opus,
}

impl std::fmt::Display for AudioCodec {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::AAC(profile) => profile.fmt(f),
			Self::Opus => write!(f, "opus"),
		}
	}
}

impl std::str::FromStr for AudioCodec {
	type Err = InvalidCodec;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s == "opus" {
			return Ok(Self::Opus);
		}
		if s.starts_with("mp4a.") {
			return Ok(Self::AAC(s.parse()?));
		}
		Err(InvalidCodec)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_roundtrip() {
		for codec in [AudioCodec::Opus, AudioCodec::AAC(AacProfile::Lc)] {
			let s = codec.to_string();
			assert_eq!(s.parse::<AudioCodec>().unwrap(), codec);
		}
	}

	#[test]
	fn test_invalid() {
		assert!("nonsense".parse::<AudioCodec>().is_err());
	}
}
