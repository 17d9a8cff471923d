// ── Canonical quality tiers ──
//
// Backend-native quality names ("Bluray-1080p", "FLAC 24bit", ...) map onto
// a small ordered vocabulary so profiles from different backends compare on
// tier identity. `Ord` is the preference order: greater is better.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Audio tiers, worst to best.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
pub enum AudioTier {
    LossyLow,
    LossyMid,
    LossyHigh,
    Lossless,
    LosslessHires,
}

/// Vertical video resolution.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter,
)]
pub enum Resolution {
    #[strum(serialize = "480")]
    R480,
    #[strum(serialize = "576")]
    R576,
    #[strum(serialize = "720")]
    R720,
    #[strum(serialize = "1080")]
    R1080,
    #[strum(serialize = "2160")]
    R2160,
}

/// Video source class, worst to best.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum SourceClass {
    Sdtv,
    Dvd,
    Hdtv,
    WebRip,
    WebDl,
    Bluray,
    Remux,
}

/// Whether a profile ranks audio or video releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

/// One canonical tier. Serialized as `lossless` or `1080/bluray`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Tier {
    Audio(AudioTier),
    Video {
        resolution: Resolution,
        source: SourceClass,
    },
}

impl Tier {
    pub const fn video(resolution: Resolution, source: SourceClass) -> Self {
        Self::Video { resolution, source }
    }

    pub fn media(self) -> MediaKind {
        match self {
            Self::Audio(_) => MediaKind::Audio,
            Self::Video { .. } => MediaKind::Video,
        }
    }

    /// Every tier of one media kind, best first.
    pub fn all(media: MediaKind) -> Vec<Tier> {
        let mut tiers: Vec<Tier> = match media {
            MediaKind::Audio => AudioTier::iter().map(Tier::Audio).collect(),
            MediaKind::Video => Resolution::iter()
                .flat_map(|r| SourceClass::iter().map(move |s| Tier::video(r, s)))
                .filter(|t| !native_names(*t).is_empty())
                .collect(),
        };
        tiers.sort_unstable_by(|a, b| b.cmp(a));
        tiers
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio(a) => write!(f, "{a}"),
            Self::Video { resolution, source } => write!(f, "{resolution}/{source}"),
        }
    }
}

/// A string that names no canonical tier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tier `{0}`")]
pub struct UnknownTier(pub String);

impl FromStr for Tier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        if let Some((res, src)) = lowered.split_once('/') {
            let resolution = Resolution::from_str(res.trim_end_matches('p'))
                .map_err(|_| UnknownTier(s.to_owned()))?;
            let source = SourceClass::from_str(src).map_err(|_| UnknownTier(s.to_owned()))?;
            return Ok(Tier::video(resolution, source));
        }
        AudioTier::from_str(&lowered)
            .map(Tier::Audio)
            .map_err(|_| UnknownTier(s.to_owned()))
    }
}

impl TryFrom<String> for Tier {
    type Error = UnknownTier;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Tier> for String {
    fn from(tier: Tier) -> Self {
        tier.to_string()
    }
}

// ── Native name table ────────────────────────────────────────────────

use AudioTier::{Lossless, LosslessHires, LossyHigh, LossyLow, LossyMid};
use Resolution::{R1080, R2160, R480, R576, R720};
use SourceClass::{Bluray, Dvd, Hdtv, Remux, Sdtv, WebDl, WebRip};

const fn a(tier: AudioTier) -> Tier {
    Tier::Audio(tier)
}

const fn v(resolution: Resolution, source: SourceClass) -> Tier {
    Tier::video(resolution, source)
}

/// Backend-native quality names. Lookup is case-insensitive; the first
/// entry for a tier is the preferred name when mapping back.
static QUALITY_TABLE: &[(&str, Tier)] = &[
    // Lidarr
    ("FLAC 24bit", a(LosslessHires)),
    ("ALAC 24bit", a(LosslessHires)),
    ("FLAC", a(Lossless)),
    ("ALAC", a(Lossless)),
    ("APE", a(Lossless)),
    ("WavPack", a(Lossless)),
    ("WAV", a(Lossless)),
    ("MP3-320", a(LossyHigh)),
    ("MP3-VBR-V0", a(LossyHigh)),
    ("AAC-320", a(LossyHigh)),
    ("OGG Vorbis Q10", a(LossyHigh)),
    ("OGG Vorbis Q9", a(LossyHigh)),
    ("MP3-256", a(LossyMid)),
    ("MP3-224", a(LossyMid)),
    ("MP3-VBR-V2", a(LossyMid)),
    ("MP3-192", a(LossyMid)),
    ("AAC-256", a(LossyMid)),
    ("AAC-192", a(LossyMid)),
    ("OGG Vorbis Q8", a(LossyMid)),
    ("OGG Vorbis Q7", a(LossyMid)),
    ("OGG Vorbis Q6", a(LossyMid)),
    ("MP3-160", a(LossyLow)),
    ("MP3-128", a(LossyLow)),
    ("MP3-112", a(LossyLow)),
    ("MP3-96", a(LossyLow)),
    ("MP3-80", a(LossyLow)),
    ("MP3-64", a(LossyLow)),
    ("MP3-56", a(LossyLow)),
    ("MP3-48", a(LossyLow)),
    ("MP3-40", a(LossyLow)),
    ("MP3-32", a(LossyLow)),
    ("MP3-24", a(LossyLow)),
    ("MP3-16", a(LossyLow)),
    ("MP3-8", a(LossyLow)),
    ("AAC-VBR", a(LossyLow)),
    ("OGG Vorbis Q5", a(LossyLow)),
    ("WMA", a(LossyLow)),
    // Radarr / Sonarr
    ("Remux-2160p", v(R2160, Remux)),
    ("Bluray-2160p Remux", v(R2160, Remux)),
    ("Bluray-2160p", v(R2160, Bluray)),
    ("WEBDL-2160p", v(R2160, WebDl)),
    ("WEBRip-2160p", v(R2160, WebRip)),
    ("HDTV-2160p", v(R2160, Hdtv)),
    ("Remux-1080p", v(R1080, Remux)),
    ("Bluray-1080p Remux", v(R1080, Remux)),
    ("Bluray-1080p", v(R1080, Bluray)),
    ("WEBDL-1080p", v(R1080, WebDl)),
    ("WEBRip-1080p", v(R1080, WebRip)),
    ("HDTV-1080p", v(R1080, Hdtv)),
    ("Bluray-720p", v(R720, Bluray)),
    ("WEBDL-720p", v(R720, WebDl)),
    ("WEBRip-720p", v(R720, WebRip)),
    ("HDTV-720p", v(R720, Hdtv)),
    ("Bluray-576p", v(R576, Bluray)),
    ("Bluray-480p", v(R480, Bluray)),
    ("WEBDL-480p", v(R480, WebDl)),
    ("WEBRip-480p", v(R480, WebRip)),
    ("DVD", v(R480, Dvd)),
    ("DVD-R", v(R480, Dvd)),
    ("SDTV", v(R480, Sdtv)),
];

/// Canonical tier for a backend-native quality name.
///
/// Unknown names (`Raw-HD`, `BR-DISK`, `CAM`, ...) yield `None` and the
/// originating item is left out of the profile.
pub fn quality_to_tier(name: &str) -> Option<Tier> {
    let name = name.trim();
    QUALITY_TABLE
        .iter()
        .find(|(native, _)| native.eq_ignore_ascii_case(name))
        .map(|(_, tier)| *tier)
}

/// Native names that map to `tier`, preferred first.
pub fn native_names(tier: Tier) -> Vec<&'static str> {
    QUALITY_TABLE
        .iter()
        .filter(|(_, t)| *t == tier)
        .map(|(native, _)| *native)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn audio_names_map_to_tiers() {
        assert_eq!(quality_to_tier("FLAC"), Some(Tier::Audio(Lossless)));
        assert_eq!(quality_to_tier("MP3-320"), Some(Tier::Audio(LossyHigh)));
        assert_eq!(quality_to_tier("flac 24BIT"), Some(Tier::Audio(LosslessHires)));
        assert_eq!(quality_to_tier("MP3-128").unwrap().to_string(), "lossy-low");
    }

    #[test]
    fn unknown_names_have_no_tier() {
        assert_eq!(quality_to_tier("Raw-HD"), None);
        assert_eq!(quality_to_tier("BR-DISK"), None);
        assert_eq!(quality_to_tier(""), None);
    }

    #[test]
    fn video_order_is_resolution_then_source() {
        let remux_1080 = quality_to_tier("Remux-1080p").unwrap();
        let webdl_2160 = quality_to_tier("WEBDL-2160p").unwrap();
        let bluray_1080 = quality_to_tier("Bluray-1080p").unwrap();
        assert!(webdl_2160 > remux_1080);
        assert!(remux_1080 > bluray_1080);
        assert!(bluray_1080 > quality_to_tier("WEBDL-1080p").unwrap());
    }

    #[test]
    fn tier_string_round_trips() {
        let tier: Tier = "2160/bluray".parse().unwrap();
        assert_eq!(tier, Tier::video(R2160, Bluray));
        assert_eq!(tier.to_string(), "2160/bluray");
        assert_eq!("1080p/webdl".parse::<Tier>().unwrap(), Tier::video(R1080, WebDl));
        assert_eq!("lossless-hires".parse::<Tier>().unwrap(), Tier::Audio(LosslessHires));
        assert!("4320/bluray".parse::<Tier>().is_err());
    }

    #[test]
    fn every_tier_in_all_has_a_native_name() {
        for media in [MediaKind::Audio, MediaKind::Video] {
            let tiers = Tier::all(media);
            assert!(tiers.windows(2).all(|w| w[0] > w[1]));
            for tier in tiers {
                assert!(!native_names(tier).is_empty(), "{tier}");
            }
        }
    }

    #[test]
    fn preferred_native_name_comes_first() {
        assert_eq!(native_names(Tier::video(R2160, Remux))[0], "Remux-2160p");
        assert_eq!(native_names(Tier::Audio(Lossless))[0], "FLAC");
    }
}
