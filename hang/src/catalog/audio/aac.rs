use serde::{Deserialize, Serialize};

/// AAC object types, per the MP4RA registry, as used in the `mp4a.40.N` codec string.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AacProfile {
	#[default]
	/// AAC-LC (Low Complexity), the common case.
	Lc,
	/// HE-AAC (Spectral Band Replication).
	He,
	/// HE-AAC v2 (SBR + Parametric Stereo).
	HeV2,
}

impl AacProfile {
	fn object_type(&self) -> u8 {
		match self {
			Self::Lc => 2,
			Self::He => 5,
			Self::HeV2 => 29,
		}
	}

	fn from_object_type(v: u8) -> Option<Self> {
		match v {
			2 => Some(Self::Lc),
			5 => Some(Self::He),
			29 => Some(Self::HeV2),
			_ => None,
		}
	}
}

impl std::fmt::Display for AacProfile {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "mp4a.40.{}", self.object_type())
	}
}

impl std::str::FromStr for AacProfile {
	type Err = crate::catalog::InvalidCodec;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let suffix = s.strip_prefix("mp4a.40.").ok_or(crate::catalog::InvalidCodec)?;
		let object_type: u8 = suffix.parse().map_err(|_| crate::catalog::InvalidCodec)?;
		Self::from_object_type(object_type).ok_or(crate::catalog::InvalidCodec)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_roundtrip() {
		for profile in [AacProfile::Lc, AacProfile::He, AacProfile::HeV2] {
			let s = profile.to_string();
			assert_eq!(s.parse::<AacProfile>().unwrap(), profile);
		}
	}
}
