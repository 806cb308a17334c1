//! Configuration validation
//!
//! Rules (only enforced on enabled sinks):
//! - file.folder_path is not empty
//! - file.max_file_size > 0, file.max_days > 0
//! - remote.pending_capacity > 0
//! - remote ids are not empty
//! - a guild destination names a channel or a category
//! - allow_tags, when present, is not empty

use contracts::{
    ContractError, FileConfig, LoggerBlueprint, RemoteConfig, RemoteDestination, SinkFilter,
};

/// Validate a LoggerBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &LoggerBlueprint) -> Result<(), ContractError> {
    if let Some(console) = blueprint.console.as_ref().filter(|c| c.enabled) {
        validate_filter("console", &console.filter)?;
    }
    if let Some(file) = blueprint.file.as_ref().filter(|c| c.enabled) {
        validate_file(file)?;
    }
    if let Some(remote) = blueprint.remote.as_ref().filter(|c| c.enabled) {
        validate_remote(remote)?;
    }
    Ok(())
}

fn validate_filter(section: &str, filter: &SinkFilter) -> Result<(), ContractError> {
    if filter.allow_tags.as_ref().is_some_and(|tags| tags.is_empty()) {
        return Err(ContractError::config_validation(
            format!("{section}.allow_tags"),
            "allow_tags is empty - no event could ever pass; remove it to allow all tags",
        ));
    }
    Ok(())
}

/// Validate the file sink
pub fn validate_file(file: &FileConfig) -> Result<(), ContractError> {
    validate_filter("file", &file.filter)?;

    if file.folder_path.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "file.folder_path",
            "folder_path is required when the file sink is enabled",
        ));
    }
    if file.max_file_size == 0 {
        return Err(ContractError::config_validation(
            "file.max_file_size",
            "max_file_size must be > 0",
        ));
    }
    if file.max_days == 0 {
        return Err(ContractError::config_validation(
            "file.max_days",
            "max_days must be > 0",
        ));
    }
    Ok(())
}

/// Validate the remote sink
pub fn validate_remote(remote: &RemoteConfig) -> Result<(), ContractError> {
    validate_filter("remote", &remote.filter)?;

    if remote.pending_capacity == 0 {
        return Err(ContractError::config_validation(
            "remote.pending_capacity",
            "pending_capacity must be > 0",
        ));
    }

    match &remote.destination {
        RemoteDestination::DirectMessage { dm_user_id } => {
            if dm_user_id.trim().is_empty() {
                return Err(ContractError::config_validation(
                    "remote.destination.dm_user_id",
                    "user id cannot be empty",
                ));
            }
        }
        RemoteDestination::Guild {
            guild_id,
            channel,
            category,
        } => {
            if guild_id.trim().is_empty() {
                return Err(ContractError::config_validation(
                    "remote.destination.guild_id",
                    "guild id cannot be empty",
                ));
            }
            let has = |id: &Option<String>| id.as_deref().is_some_and(|s| !s.trim().is_empty());
            if !has(channel) && !has(category) {
                return Err(ContractError::config_validation(
                    "remote.destination",
                    "guild destination needs a channel or a category",
                ));
            }
        }
    }
    Ok(())
}
