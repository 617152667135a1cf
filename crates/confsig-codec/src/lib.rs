//! ---
//! confsig_section: "04-media-capabilities"
//! confsig_subsection: "module"
//! confsig_type: "source"
//! confsig_scope: "code"
//! confsig_description: "Negotiable video codec descriptors."
//! confsig_version: "v0.1.0"
//! confsig_owner: "tbd"
//! ---
//! Video formats the client is willing to negotiate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const H264_CODEC_NAME: &str = "H264";
pub const H265_CODEC_NAME: &str = "H265";

pub const H264_FMTP_PROFILE_LEVEL_ID: &str = "profile-level-id";
pub const H264_FMTP_LEVEL_ASYMMETRY_ALLOWED: &str = "level-asymmetry-allowed";
pub const H264_FMTP_PACKETIZATION_MODE: &str = "packetization-mode";

pub const H265_FMTP_PROFILE_SPACE: &str = "profile-space";
pub const H265_FMTP_PROFILE_ID: &str = "profile-id";
pub const H265_FMTP_TIER_FLAG: &str = "tier-flag";
pub const H265_FMTP_LEVEL_ID: &str = "level-id";

/// SDP video format: codec name plus fmtp parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoFormat {
    pub name: String,
    pub parameters: BTreeMap<String, String>,
}

impl VideoFormat {
    pub fn new<K, V>(name: impl Into<String>, parameters: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            parameters: parameters
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum H264Profile {
    Baseline,
    ConstrainedBaseline,
}

impl H264Profile {
    /// `(profile_idc, profile_iop)` bytes of the profile-level-id.
    fn idc_iop(self) -> (u8, u8) {
        match self {
            H264Profile::Baseline => (0x42, 0x00),
            H264Profile::ConstrainedBaseline => (0x42, 0xe0),
        }
    }
}

/// H.264 level, encoded as `level_idc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum H264Level {
    Level3_1,
}

impl H264Level {
    fn idc(self) -> u8 {
        match self {
            H264Level::Level3_1 => 31,
        }
    }
}

/// Hex `profile-level-id` string, e.g. `42e01f`.
pub fn profile_level_id(profile: H264Profile, level: H264Level) -> String {
    let (idc, iop) = profile.idc_iop();
    format!("{:02x}{:02x}{:02x}", idc, iop, level.idc())
}

fn h264_format(profile: H264Profile, level: H264Level, packetization_mode: &str) -> VideoFormat {
    VideoFormat::new(
        H264_CODEC_NAME,
        [
            (H264_FMTP_PROFILE_LEVEL_ID, profile_level_id(profile, level)),
            (H264_FMTP_LEVEL_ASYMMETRY_ALLOWED, "1".to_owned()),
            (H264_FMTP_PACKETIZATION_MODE, packetization_mode.to_owned()),
        ],
    )
}

/// Baseline and constrained-baseline at level 3.1, each in packetization
/// modes 1 and 0.
pub fn supported_h264_formats() -> Vec<VideoFormat> {
    vec![
        h264_format(H264Profile::Baseline, H264Level::Level3_1, "1"),
        h264_format(H264Profile::Baseline, H264Level::Level3_1, "0"),
        h264_format(H264Profile::ConstrainedBaseline, H264Level::Level3_1, "1"),
        h264_format(H264Profile::ConstrainedBaseline, H264Level::Level3_1, "0"),
    ]
}

#[cfg(feature = "h265")]
pub fn supported_h265_formats() -> Vec<VideoFormat> {
    vec![VideoFormat::new(
        H265_CODEC_NAME,
        [
            (H265_FMTP_PROFILE_SPACE, "0"),
            (H265_FMTP_PROFILE_ID, "1"),
            (H265_FMTP_TIER_FLAG, "0"),
            (H265_FMTP_LEVEL_ID, "120"),
        ],
    )]
}

/// Every negotiable format, H.264 first.
pub fn negotiable_formats(enable_h265: bool) -> Vec<VideoFormat> {
    let mut formats = supported_h264_formats();
    if enable_h265 {
        formats.extend(compiled_h265_formats());
    }
    formats
}

#[cfg(feature = "h265")]
fn compiled_h265_formats() -> Vec<VideoFormat> {
    supported_h265_formats()
}

#[cfg(not(feature = "h265"))]
fn compiled_h265_formats() -> Vec<VideoFormat> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_level_ids_match_sdp_strings() {
        assert_eq!(
            profile_level_id(H264Profile::Baseline, H264Level::Level3_1),
            "42001f"
        );
        assert_eq!(
            profile_level_id(H264Profile::ConstrainedBaseline, H264Level::Level3_1),
            "42e01f"
        );
    }

    #[test]
    fn h264_table_order_and_parameters() {
        let formats = supported_h264_formats();
        let summary: Vec<(&str, &str)> = formats
            .iter()
            .map(|f| {
                (
                    f.parameter(H264_FMTP_PROFILE_LEVEL_ID).unwrap(),
                    f.parameter(H264_FMTP_PACKETIZATION_MODE).unwrap(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("42001f", "1"),
                ("42001f", "0"),
                ("42e01f", "1"),
                ("42e01f", "0")
            ]
        );
        assert!(formats.iter().all(|f| f.name == H264_CODEC_NAME
            && f.parameter(H264_FMTP_LEVEL_ASYMMETRY_ALLOWED) == Some("1")));
    }

    #[cfg(feature = "h265")]
    #[test]
    fn h265_table_has_fixed_profile_tier_level() {
        let formats = supported_h265_formats();
        assert_eq!(formats.len(), 1);
        let format = &formats[0];
        assert_eq!(format.name, H265_CODEC_NAME);
        assert_eq!(format.parameter(H265_FMTP_PROFILE_SPACE), Some("0"));
        assert_eq!(format.parameter(H265_FMTP_PROFILE_ID), Some("1"));
        assert_eq!(format.parameter(H265_FMTP_TIER_FLAG), Some("0"));
        assert_eq!(format.parameter(H265_FMTP_LEVEL_ID), Some("120"));
    }

    #[test]
    fn negotiable_formats_respect_toggle() {
        assert_eq!(negotiable_formats(false).len(), 4);
        #[cfg(feature = "h265")]
        assert_eq!(negotiable_formats(true).len(), 5);
    }

    #[test]
    fn formats_serialize_as_name_and_parameters() {
        let json = serde_json::to_value(&supported_h264_formats()[0]).unwrap();
        assert_eq!(json["name"], "H264");
        assert_eq!(json["parameters"]["packetization-mode"], "1");
    }
}
