// Desired-state validation: contradictions that no amount of retrying will
// fix.

use std::collections::BTreeSet;

use crate::changeset::ResourceKind;
use crate::error::DiffError;
use crate::ir::{Keyed, NamingIR, IR};

pub fn validate(desired: &IR) -> Result<(), DiffError> {
    if let Some(q) = &desired.quality_profile {
        if q.preset.is_some() && !q.tiers.is_empty() {
            return Err(DiffError::MutuallyExclusive {
                profile: q.name.clone(),
            });
        }
    }
    if let Some(naming) = &desired.naming {
        validate_naming(naming)?;
    }

    unique(&desired.custom_formats)?;
    unique(&desired.root_folders)?;
    unique(&desired.download_clients)?;
    unique(&desired.indexers)?;
    unique(&desired.import_lists)?;
    unique(&desired.notifications)?;
    unique(&desired.delay_profiles)?;
    unique(&desired.release_profiles)?;
    Ok(())
}

fn unique<T: Keyed>(items: &[T]) -> Result<(), DiffError> {
    let mut seen = BTreeSet::new();
    for item in items {
        let key = item.key();
        if !seen.insert(key.clone()) {
            return Err(DiffError::DuplicateKey {
                kind: T::KIND,
                key,
            });
        }
    }
    Ok(())
}

fn validate_naming(naming: &NamingIR) -> Result<(), DiffError> {
    for (field, template) in &naming.formats {
        check_template(template).map_err(|reason| DiffError::MalformedTemplate {
            field: field.clone(),
            reason: reason.to_owned(),
        })?;
    }
    Ok(())
}

/// Tokens are `{...}`, never nested, never empty.
fn check_template(template: &str) -> Result<(), &'static str> {
    let mut open = false;
    let mut token = String::new();
    for c in template.chars() {
        match c {
            '{' if open => return Err("nested `{`"),
            '{' => {
                open = true;
                token.clear();
            }
            '}' if !open => return Err("unmatched `}`"),
            '}' => {
                if token.trim().is_empty() {
                    return Err("empty token");
                }
                open = false;
            }
            _ if open => token.push(c),
            _ => {}
        }
    }
    if open {
        return Err("unclosed `{`");
    }
    Ok(())
}

/// Kinds the IR names, for adapters that support only some of them.
pub fn kinds_present(ir: &IR) -> BTreeSet<ResourceKind> {
    let mut kinds = BTreeSet::new();
    let mut mark = |present: bool, kind: ResourceKind| {
        if present {
            kinds.insert(kind);
        }
    };
    mark(ir.quality_profile.is_some(), ResourceKind::QualityProfile);
    mark(ir.naming.is_some(), ResourceKind::Naming);
    mark(ir.media_management.is_some(), ResourceKind::MediaManagement);
    mark(ir.authentication.is_some(), ResourceKind::Authentication);
    mark(!ir.custom_formats.is_empty(), ResourceKind::CustomFormat);
    mark(!ir.root_folders.is_empty(), ResourceKind::RootFolder);
    mark(!ir.download_clients.is_empty(), ResourceKind::DownloadClient);
    mark(!ir.indexers.is_empty(), ResourceKind::Indexer);
    mark(!ir.import_lists.is_empty(), ResourceKind::ImportList);
    mark(!ir.notifications.is_empty(), ResourceKind::Notification);
    mark(!ir.delay_profiles.is_empty(), ResourceKind::DelayProfile);
    mark(!ir.release_profiles.is_empty(), ResourceKind::ReleaseProfile);
    kinds
}
