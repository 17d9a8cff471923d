// ── Wire ↔ IR conversion ──
//
// Servarr resources travel as raw JSON. Reading strips them down to IR
// entries; writing merges an IR payload into a template or the live object
// so keys the IR does not model survive the round-trip.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::adapter::BackendKind;
use crate::diff::REDACTED;
use crate::error::AdapterError;
use crate::ir::{AuthenticationIR, NamingIR, QualityIR};
use crate::tier::{MediaKind, Tier, quality_to_tier};

// ── Helpers ────────────────────────────────────────────────────────

pub fn wire_id(value: &Value) -> Option<i64> {
    value.get("id").and_then(Value::as_i64)
}

pub fn wire_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

fn int(value: &Value, key: &str) -> i32 {
    value
        .get(key)
        .and_then(Value::as_i64)
        .and_then(|n| i32::try_from(n).ok())
        .unwrap_or(0)
}

// ── Provider fields ────────────────────────────────────────────────

/// `[{name, value}]` → `{name: value}`. Entries without a value are dropped.
pub fn fields_to_map(fields: &[Value]) -> Map<String, Value> {
    fields
        .iter()
        .filter_map(|f| {
            let name = wire_str(f, "name")?;
            match f.get("value") {
                None | Some(Value::Null) => None,
                Some(v) => Some((name.to_owned(), v.clone())),
            }
        })
        .collect()
}

fn fields_to_wire(fields: &Value) -> Value {
    let Value::Object(map) = fields else {
        return fields.clone();
    };
    Value::Array(
        map.iter()
            .map(|(name, value)| json!({ "name": name, "value": value }))
            .collect(),
    )
}

fn normalize_fields(obj: &mut Map<String, Value>) {
    let map = match obj.get("fields") {
        Some(Value::Array(fields)) => fields_to_map(fields),
        _ => return,
    };
    obj.insert("fields".into(), Value::Object(map));
}

/// Deserialize a wire object into an IR entry.
pub fn from_wire<T: DeserializeOwned>(mut value: Value) -> Result<T, AdapterError> {
    if let Value::Object(obj) = &mut value {
        normalize_fields(obj);
        if let Some(Value::Array(specs)) = obj.get_mut("specifications") {
            for spec in specs.iter_mut() {
                if let Value::Object(spec) = spec {
                    normalize_fields(spec);
                }
            }
        }
    }
    serde_json::from_value(value).map_err(|e| AdapterError::Protocol {
        message: format!("unexpected resource shape: {e}"),
    })
}

/// Merge an IR payload into a wire object. Top-level keys are replaced;
/// `fields` entries are set by name on the existing array.
pub fn merge_into_wire(base: &mut Value, payload: &Value) {
    let (Value::Object(base), Value::Object(payload)) = (base, payload) else {
        return;
    };
    for (key, value) in payload {
        match key.as_str() {
            "fields" => merge_fields(base, value),
            "specifications" => {
                let specs = value
                    .as_array()
                    .map(|specs| {
                        specs
                            .iter()
                            .map(|spec| {
                                let mut spec = spec.clone();
                                if let Some(obj) = spec.as_object_mut() {
                                    if let Some(wire) = obj.get("fields").map(fields_to_wire) {
                                        obj.insert("fields".into(), wire);
                                    }
                                }
                                spec
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                base.insert(key.clone(), Value::Array(specs));
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

fn merge_fields(base: &mut Map<String, Value>, desired: &Value) {
    let Value::Object(desired) = desired else {
        return;
    };
    let fields = base
        .entry("fields")
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(fields) = fields else {
        return;
    };
    for (name, value) in desired {
        let slot = fields
            .iter_mut()
            .find(|f| wire_str(f, "name") == Some(name.as_str()));
        match slot {
            Some(Value::Object(field)) => {
                field.insert("value".into(), value.clone());
            }
            _ => fields.push(json!({ "name": name, "value": value })),
        }
    }
}

// ── Quality profile ────────────────────────────────────────────────

struct Leaf<'a> {
    quality_id: Option<i64>,
    name: &'a str,
    allowed: bool,
    group_id: Option<i64>,
}

/// Every quality of a profile. A grouped quality takes the group's
/// `allowed` flag.
fn leaves(profile: &Value) -> Vec<Leaf<'_>> {
    let mut out = Vec::new();
    for item in array(profile, "items") {
        let allowed = item.get("allowed").and_then(Value::as_bool).unwrap_or(false);
        if let Some(quality) = item.get("quality") {
            out.push(Leaf {
                quality_id: wire_id(quality),
                name: wire_str(quality, "name").unwrap_or_default(),
                allowed,
                group_id: None,
            });
            continue;
        }
        let group_id = wire_id(item);
        for child in array(item, "items") {
            if let Some(quality) = child.get("quality") {
                out.push(Leaf {
                    quality_id: wire_id(quality),
                    name: wire_str(quality, "name").unwrap_or_default(),
                    allowed,
                    group_id,
                });
            }
        }
    }
    out
}

/// Read a live profile. Qualities without a canonical tier are left out.
pub fn quality_from_wire(
    profile: &Value,
    media: MediaKind,
    format_names: &BTreeMap<i64, String>,
) -> QualityIR {
    let mut q = QualityIR::new(wire_str(profile, "name").unwrap_or_default());
    q.id = wire_id(profile);
    q.media = Some(media);
    q.upgrade_allowed = profile
        .get("upgradeAllowed")
        .and_then(Value::as_bool)
        .unwrap_or(true);
    q.min_format_score = int(profile, "minFormatScore");
    q.cutoff_format_score = int(profile, "cutoffFormatScore");

    let leaves = leaves(profile);
    let tier_of = |leaf: &Leaf<'_>| quality_to_tier(leaf.name).filter(|t| t.media() == media);

    let mut tiers: Vec<Tier> = leaves
        .iter()
        .filter(|l| l.allowed)
        .filter_map(tier_of)
        .collect();
    tiers.sort_unstable_by(|a, b| b.cmp(a));
    tiers.dedup();
    q.tiers = tiers;

    let cutoff = profile.get("cutoff").and_then(Value::as_i64);
    q.cutoff = cutoff.and_then(|cutoff| {
        leaves
            .iter()
            .filter(|l| match l.group_id {
                Some(group) => group == cutoff,
                None => l.quality_id == Some(cutoff),
            })
            .filter_map(tier_of)
            .max()
    });

    for item in array(profile, "formatItems") {
        let name = wire_str(item, "name").map(str::to_owned).or_else(|| {
            item.get("format")
                .and_then(Value::as_i64)
                .and_then(|id| format_names.get(&id).cloned())
        });
        if let Some(name) = name {
            q.format_scores.insert(name, int(item, "score"));
        }
    }
    q
}

/// Write a normalized profile onto a template or live profile: toggle
/// `allowed` per quality, point `cutoff` at the item holding the cutoff
/// tier, and set format scores.
pub fn quality_into_wire(
    base: &mut Value,
    q: &QualityIR,
    format_ids: &BTreeMap<String, i64>,
) -> Result<(), AdapterError> {
    let allowed = |name: &str| quality_to_tier(name).is_some_and(|t| q.tiers.contains(&t));
    let holds_cutoff =
        |name: &str| q.cutoff.is_some() && quality_to_tier(name) == q.cutoff;

    let Some(obj) = base.as_object_mut() else {
        return Err(AdapterError::Protocol {
            message: "quality profile is not an object".into(),
        });
    };
    obj.insert("name".into(), Value::from(q.name.clone()));
    obj.insert("upgradeAllowed".into(), Value::from(q.upgrade_allowed));
    obj.insert("minFormatScore".into(), Value::from(q.min_format_score));
    obj.insert("cutoffFormatScore".into(), Value::from(q.cutoff_format_score));

    let mut cutoff_id = None;
    if let Some(Value::Array(items)) = obj.get_mut("items") {
        for item in items.iter_mut() {
            let leaf_name = item
                .get("quality")
                .and_then(|quality| wire_str(quality, "name"))
                .map(str::to_owned);
            if let Some(name) = leaf_name {
                if cutoff_id.is_none() && holds_cutoff(&name) {
                    cutoff_id = item.get("quality").and_then(wire_id);
                }
                set_allowed(item, allowed(&name));
                continue;
            }
            let names: Vec<String> = array(item, "items")
                .iter()
                .filter_map(|c| c.get("quality").and_then(|q| wire_str(q, "name")))
                .map(str::to_owned)
                .collect();
            if cutoff_id.is_none() && names.iter().any(|n| holds_cutoff(n)) {
                cutoff_id = wire_id(item);
            }
            let on = names.iter().any(|n| allowed(n));
            set_allowed(item, on);
            if let Some(Value::Array(children)) = item.get_mut("items") {
                for child in children.iter_mut() {
                    set_allowed(child, on);
                }
            }
        }
    }

    match (q.cutoff, cutoff_id) {
        (_, Some(id)) => {
            obj.insert("cutoff".into(), Value::from(id));
        }
        (Some(tier), None) => {
            return Err(AdapterError::Unsupported {
                operation: format!("cutoff tier {tier}: no matching quality on this backend"),
            });
        }
        (None, None) => {}
    }

    let mut items: Vec<Value> = obj
        .get("formatItems")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let mut seen = Vec::new();
    for item in &mut items {
        let name = wire_str(item, "name").map(str::to_owned).or_else(|| {
            let id = item.get("format").and_then(Value::as_i64)?;
            format_ids
                .iter()
                .find(|(_, v)| **v == id)
                .map(|(k, _)| k.clone())
        });
        let score = name
            .as_ref()
            .and_then(|n| q.format_scores.get(n))
            .copied()
            .unwrap_or(0);
        if let Some(obj) = item.as_object_mut() {
            obj.insert("score".into(), Value::from(score));
        }
        seen.extend(name);
    }
    for (name, score) in &q.format_scores {
        if seen.contains(name) {
            continue;
        }
        match format_ids.get(name) {
            Some(id) => items.push(json!({ "format": id, "name": name, "score": score })),
            None => warn!(profile = %q.name, format = %name, "custom format not found; score ignored"),
        }
    }
    obj.insert("formatItems".into(), Value::Array(items));
    Ok(())
}

fn set_allowed(item: &mut Value, allowed: bool) {
    if let Some(obj) = item.as_object_mut() {
        obj.insert("allowed".into(), Value::from(allowed));
    }
}

// ── Naming ─────────────────────────────────────────────────────────

/// The per-flavor master rename switch.
pub fn rename_key(flavor: BackendKind) -> Option<&'static str> {
    match flavor {
        BackendKind::Radarr => Some("renameMovies"),
        BackendKind::Sonarr => Some("renameEpisodes"),
        BackendKind::Lidarr => Some("renameTracks"),
        BackendKind::Prowlarr | BackendKind::File => None,
    }
}

fn is_format_key(key: &str) -> bool {
    key.ends_with("Format") && key != "colonReplacementFormat"
}

pub fn naming_from_wire(wire: &Value, flavor: BackendKind) -> NamingIR {
    let formats = wire
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter(|(k, _)| is_format_key(k))
                .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_owned())))
                .collect()
        })
        .unwrap_or_default();
    NamingIR {
        rename: rename_key(flavor).and_then(|k| wire.get(k).and_then(Value::as_bool)),
        replace_illegal_characters: wire
            .get("replaceIllegalCharacters")
            .and_then(Value::as_bool),
        formats,
    }
}

pub fn naming_into_wire(base: &mut Value, naming: &NamingIR, flavor: BackendKind) {
    let Some(obj) = base.as_object_mut() else {
        return;
    };
    if let (Some(rename), Some(key)) = (naming.rename, rename_key(flavor)) {
        obj.insert(key.into(), Value::from(rename));
    }
    if let Some(replace) = naming.replace_illegal_characters {
        obj.insert("replaceIllegalCharacters".into(), Value::from(replace));
    }
    for (key, template) in &naming.formats {
        obj.insert(key.clone(), Value::from(template.clone()));
    }
}

// ── Authentication ─────────────────────────────────────────────────

/// The live password is never readable; any stored one reads as redacted.
pub fn auth_from_wire(wire: &Value) -> AuthenticationIR {
    let owned = |key: &str| wire_str(wire, key).map(str::to_owned);
    AuthenticationIR {
        method: owned("authenticationMethod"),
        required: owned("authenticationRequired"),
        username: owned("username").filter(|u| !u.is_empty()),
        password: wire_str(wire, "password")
            .filter(|p| !p.is_empty())
            .map(|_| REDACTED.to_owned()),
    }
}

pub fn auth_into_wire(base: &mut Value, auth: &AuthenticationIR) {
    let Some(obj) = base.as_object_mut() else {
        return;
    };
    let mut set = |key: &str, value: &Option<String>| {
        if let Some(v) = value {
            obj.insert(key.into(), Value::from(v.clone()));
        }
    };
    set("authenticationMethod", &auth.method);
    set("authenticationRequired", &auth.required);
    set("username", &auth.username);
    if let Some(password) = auth.password.as_deref().filter(|p| *p != REDACTED) {
        obj.insert("password".into(), Value::from(password));
        obj.insert("passwordConfirmation".into(), Value::from(password));
    }
}
