use crate::errors::{MtError, MtResult};
use crate::model::{LanguageRef, MtServiceInfo, MtServiceType};

use super::settings::MtServiceConfig;

/// Resolve the services to use for a target language
///
/// Without `desired` every enabled service is returned. With `desired`,
/// each requested service must be enabled for the language; the result is
/// the enabled services that were requested, in configuration order.
pub fn resolve_services(
    settings: &dyn MtServiceConfig,
    target_language: &LanguageRef,
    desired: Option<&[MtServiceType]>,
) -> MtResult<Vec<MtServiceInfo>> {
    let enabled = settings.enabled_services(target_language);

    let Some(desired) = desired else {
        return Ok(enabled);
    };

    if let Some(missing) = desired
        .iter()
        .find(|d| !enabled.iter().any(|e| e.service_type == **d))
    {
        return Err(MtError::ServiceNotEnabled(*missing));
    }

    Ok(enabled
        .into_iter()
        .filter(|e| desired.contains(&e.service_type))
        .collect())
}
