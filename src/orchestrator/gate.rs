/*!
 * Configuration gate: no job starts without a complete credential set.
 */

use log::debug;

use crate::app_config::EngineCredentials;
use crate::errors::{ConfigError, CredentialField};

/// Check that every required credential is present
///
/// Fields are checked in a fixed order and the first missing one is
/// reported. No network call is made.
pub fn validate(credentials: &EngineCredentials) -> Result<(), ConfigError> {
    let fields = [
        (CredentialField::Endpoint, &credentials.endpoint),
        (CredentialField::ApiKey, &credentials.api_key),
        (CredentialField::Deployment, &credentials.deployment),
        (CredentialField::ApiVersion, &credentials.api_version),
    ];

    for (field, value) in fields {
        if value.trim().is_empty() {
            debug!("Configuration gate: {} missing", field.label());
            return Err(ConfigError::MissingField(field));
        }
    }

    Ok(())
}
