// Settings singletons. They always exist on the backend, are updated only
// when the desired state names them, and are never deleted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// File and folder naming.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamingIR {
    /// `renameMovies` / `renameEpisodes` / `renameTracks` on the wire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace_illegal_characters: Option<bool>,
    /// Backend format key (`standardMovieFormat`, ...) → template.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub formats: BTreeMap<String, String>,
}

/// Import and file-handling settings. Field names follow the Servarr wire
/// keys so the adapter can merge them directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaManagementIR {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recycle_bin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recycle_bin_cleanup_days: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_propers_and_repacks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_empty_folders: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_permissions_linux: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chmod_folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chown_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_free_space_check_when_importing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_free_space_when_importing: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_using_hardlinks: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_extra_files: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_file_extensions: Option<String>,
}

/// UI authentication (`config/host` on Servarr).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationIR {
    /// `none`, `basic`, `forms` or `external`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// `enabled` or `disabledForLocalAddresses`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}
