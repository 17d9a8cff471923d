// ── Quality presets ──
//
// Named tier bundles a desired quality profile can refer to instead of an
// explicit tier list.

use crate::tier::AudioTier::{Lossless, LosslessHires, LossyHigh, LossyMid};
use crate::tier::Resolution::{R1080, R2160, R480, R720};
use crate::tier::SourceClass::{Bluray, Dvd, Hdtv, Remux, WebDl, WebRip};
use crate::tier::{MediaKind, Tier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub media: MediaKind,
    /// Allowed tiers, best first.
    pub tiers: &'static [Tier],
    pub cutoff: Tier,
}

const fn v(resolution: crate::tier::Resolution, source: crate::tier::SourceClass) -> Tier {
    Tier::video(resolution, source)
}

static PRESETS: &[Preset] = &[
    Preset {
        name: "ultra",
        media: MediaKind::Video,
        tiers: &[
            v(R2160, Remux),
            v(R2160, Bluray),
            v(R2160, WebDl),
            v(R2160, WebRip),
            v(R1080, Remux),
            v(R1080, Bluray),
            v(R1080, WebDl),
            v(R1080, WebRip),
        ],
        cutoff: v(R2160, Remux),
    },
    Preset {
        name: "balanced",
        media: MediaKind::Video,
        tiers: &[
            v(R1080, Bluray),
            v(R1080, WebDl),
            v(R1080, WebRip),
            v(R1080, Hdtv),
            v(R720, Bluray),
            v(R720, WebDl),
            v(R720, WebRip),
            v(R720, Hdtv),
        ],
        cutoff: v(R1080, Bluray),
    },
    Preset {
        name: "efficient",
        media: MediaKind::Video,
        tiers: &[
            v(R720, Bluray),
            v(R720, WebDl),
            v(R720, WebRip),
            v(R720, Hdtv),
            v(R480, WebDl),
            v(R480, Dvd),
        ],
        cutoff: v(R720, WebDl),
    },
    Preset {
        name: "lossless",
        media: MediaKind::Audio,
        tiers: &[Tier::Audio(LosslessHires), Tier::Audio(Lossless)],
        cutoff: Tier::Audio(Lossless),
    },
    Preset {
        name: "balanced",
        media: MediaKind::Audio,
        tiers: &[Tier::Audio(Lossless), Tier::Audio(LossyHigh)],
        cutoff: Tier::Audio(Lossless),
    },
    Preset {
        name: "portable",
        media: MediaKind::Audio,
        tiers: &[Tier::Audio(LossyHigh), Tier::Audio(LossyMid)],
        cutoff: Tier::Audio(LossyHigh),
    },
];

/// Case-insensitive preset lookup within one media kind.
pub fn lookup(media: MediaKind, name: &str) -> Option<&'static Preset> {
    PRESETS
        .iter()
        .find(|p| p.media == media && p.name.eq_ignore_ascii_case(name.trim()))
}

/// Preset names available for a media kind.
pub fn names(media: MediaKind) -> Vec<&'static str> {
    PRESETS
        .iter()
        .filter(|p| p.media == media)
        .map(|p| p.name)
        .collect()
}
