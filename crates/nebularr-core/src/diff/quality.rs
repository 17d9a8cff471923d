// Quality profile normalization and capability gating.

use tracing::warn;

use crate::capabilities::Capabilities;
use crate::error::DiffError;
use crate::ir::QualityIR;
use crate::preset;
use crate::tier::Tier;

/// Resolve the preset, check tier consistency, and bring the profile to
/// canonical form: allowed tiers best first, cutoff set, zero scores gone.
pub fn normalize_desired(q: &QualityIR) -> Result<QualityIR, DiffError> {
    let media = q.effective_media();
    let (tiers, default_cutoff): (Vec<Tier>, Option<Tier>) = match &q.preset {
        Some(name) => {
            let p = preset::lookup(media, name).ok_or_else(|| DiffError::UnknownPreset {
                profile: q.name.clone(),
                preset: name.clone(),
            })?;
            (p.tiers.to_vec(), Some(p.cutoff))
        }
        None => (q.tiers.clone(), None),
    };

    let mixed = tiers.iter().chain(q.cutoff.iter()).any(|t| t.media() != media);
    if mixed {
        return Err(DiffError::MixedMedia {
            profile: q.name.clone(),
        });
    }

    let mut out = canonical(q, tiers);
    out.media = Some(media);
    match q.cutoff.or(default_cutoff) {
        Some(cutoff) if !out.tiers.contains(&cutoff) => {
            return Err(DiffError::InvalidCutoff {
                profile: q.name.clone(),
                cutoff: cutoff.to_string(),
            });
        }
        Some(cutoff) => out.cutoff = Some(cutoff),
        None => out.cutoff = out.tiers.first().copied(),
    }
    Ok(out)
}

/// Canonical form of a live profile. Never fails: foreign-media tiers are
/// dropped and a stray cutoff falls back to the best allowed tier.
pub fn normalize_current(q: &QualityIR) -> QualityIR {
    let media = q.effective_media();
    let known = q
        .preset
        .as_deref()
        .filter(|_| q.tiers.is_empty())
        .and_then(|name| preset::lookup(media, name));
    let (tiers, cutoff) = match known {
        Some(p) => (p.tiers.to_vec(), q.cutoff.or(Some(p.cutoff))),
        None => (q.tiers.clone(), q.cutoff),
    };
    let tiers = tiers.into_iter().filter(|t| t.media() == media).collect();
    let mut out = canonical(q, tiers);
    out.media = Some(media);
    out.cutoff = match cutoff {
        Some(c) if out.tiers.contains(&c) => Some(c),
        _ => out.tiers.first().copied(),
    };
    out
}

fn canonical(q: &QualityIR, mut tiers: Vec<Tier>) -> QualityIR {
    tiers.sort_unstable_by(|a, b| b.cmp(a));
    tiers.dedup();
    let mut format_scores = q.format_scores.clone();
    format_scores.retain(|_, score| *score != 0);
    QualityIR {
        id: q.id,
        name: q.name.clone(),
        media: q.media,
        preset: None,
        tiers,
        upgrade_allowed: q.upgrade_allowed,
        cutoff: q.cutoff,
        min_format_score: q.min_format_score,
        cutoff_format_score: q.cutoff_format_score,
        format_scores,
    }
}

/// Drop tiers the backend cannot serve. The cutoff falls back to the best
/// remaining tier. Returns `false` when nothing is left.
pub fn gate(q: &mut QualityIR, caps: &Capabilities) -> bool {
    let before = q.tiers.len();
    q.tiers.retain(|t| caps.supports_tier(*t));
    if q.tiers.len() != before {
        warn!(
            profile = %q.name,
            dropped = before - q.tiers.len(),
            "dropping quality tiers the backend does not support"
        );
    }
    if q.tiers.is_empty() {
        return false;
    }
    if q.cutoff.is_none_or(|c| !q.tiers.contains(&c)) {
        q.cutoff = q.tiers.first().copied();
    }
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tier::{AudioTier, MediaKind, Resolution, SourceClass};
    use chrono::Utc;

    fn tier(s: &str) -> Tier {
        s.parse().unwrap()
    }

    #[test]
    fn preset_expands_to_tiers() {
        let mut q = QualityIR::new("hd");
        q.preset = Some("balanced".into());
        let n = normalize_desired(&q).unwrap();
        assert_eq!(n.preset, None);
        assert_eq!(n.media, Some(MediaKind::Video));
        assert_eq!(n.tiers.first().copied(), Some(tier("1080/bluray")));
        assert_eq!(n.cutoff, Some(tier("1080/bluray")));
    }

    #[test]
    fn explicit_tiers_are_sorted_and_cutoff_defaults_to_best() {
        let mut q = QualityIR::new("music");
        q.tiers = vec![tier("lossy-high"), tier("lossless"), tier("lossy-high")];
        let n = normalize_desired(&q).unwrap();
        assert_eq!(n.tiers, vec![tier("lossless"), tier("lossy-high")]);
        assert_eq!(n.cutoff, Some(tier("lossless")));
        assert_eq!(n.media, Some(MediaKind::Audio));
    }

    #[test]
    fn mixed_media_is_rejected() {
        let mut q = QualityIR::new("odd");
        q.tiers = vec![tier("lossless"), tier("1080/webdl")];
        assert!(matches!(normalize_desired(&q), Err(DiffError::MixedMedia { .. })));
    }

    #[test]
    fn cutoff_outside_tiers_is_rejected() {
        let mut q = QualityIR::new("hd");
        q.tiers = vec![tier("1080/webdl")];
        q.cutoff = Some(tier("1080/bluray"));
        assert!(matches!(
            normalize_desired(&q),
            Err(DiffError::InvalidCutoff { .. })
        ));
    }

    #[test]
    fn unknown_preset_is_rejected() {
        let mut q = QualityIR::new("x");
        q.media = Some(MediaKind::Audio);
        q.preset = Some("ultra".into());
        assert!(matches!(
            normalize_desired(&q),
            Err(DiffError::UnknownPreset { .. })
        ));
    }

    #[test]
    fn gating_drops_tiers_and_moves_cutoff() {
        let mut caps = Capabilities::unrestricted(Utc::now());
        caps.add_resolution(Resolution::R1080);
        let mut q = QualityIR::new("uhd");
        q.tiers = vec![tier("2160/bluray"), tier("1080/bluray")];
        q.cutoff = Some(tier("2160/bluray"));
        assert!(gate(&mut q, &caps));
        assert_eq!(q.tiers, vec![Tier::video(Resolution::R1080, SourceClass::Bluray)]);
        assert_eq!(q.cutoff, Some(tier("1080/bluray")));

        let mut only_uhd = QualityIR::new("uhd");
        only_uhd.tiers = vec![tier("2160/remux")];
        assert!(!gate(&mut only_uhd, &caps));
    }

    #[test]
    fn zero_scores_are_dropped() {
        let mut q = QualityIR::new("m");
        q.tiers = vec![Tier::Audio(AudioTier::Lossless)];
        q.format_scores.insert("x".into(), 0);
        q.format_scores.insert("y".into(), 50);
        let n = normalize_current(&q);
        assert_eq!(n.format_scores.len(), 1);
    }
}
