//! Compute-layer bundle: the shared application layer and the database
//! import layer, always emitted together.

use crate::config::ResolvedConfig;
use crate::error::PlanError;

use super::naming::{APP_LAYER, IMPORT_LAYER, Naming};
use super::plan::ResourcePlan;
use super::resource::{AttributeValue, ResourceKind, ResourceSpec};

/// Adds both layer versions to `plan`.
///
/// # Errors
///
/// Returns a [`PlanError`] if either logical id is already taken.
pub fn plan_layers(
    config: &ResolvedConfig,
    naming: &Naming,
    plan: &mut ResourcePlan,
) -> Result<(), PlanError> {
    let layer = |suffix: &str, description: &str, code: &str| {
        ResourceSpec::new(ResourceKind::LayerVersion)
            .with("layer_version_name", naming.physical(suffix))
            .with("description", description)
            .with(
                "compatible_runtimes",
                AttributeValue::list([config.layer_runtime.as_str()]),
            )
            .with("code", code)
    };

    plan.insert(
        APP_LAYER,
        layer(
            "app_layer",
            "DB shared application functions",
            &config.app_layer_path,
        ),
    )?;
    plan.insert(
        IMPORT_LAYER,
        layer(
            "import_layer",
            "Python imports for access to RDS",
            &config.import_layer_path,
        ),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::sample_config;

    #[test]
    fn test_layer_pair_shares_runtime() {
        let resolved = ResolvedConfig::resolve(&sample_config()).unwrap();
        let naming = Naming::new(&resolved.prefix, &resolved.uuid);
        let mut plan = ResourcePlan::new();
        plan_layers(&resolved, &naming, &mut plan).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.get(APP_LAYER).unwrap().physical_name(), Some("my_iot_app_layer"));
        assert_eq!(
            plan.get(IMPORT_LAYER).unwrap().physical_name(),
            Some("my_iot_import_layer")
        );

        let runtimes: Vec<&AttributeValue> = [APP_LAYER, IMPORT_LAYER]
            .iter()
            .filter_map(|id| plan.get(id)?.attribute("compatible_runtimes"))
            .collect();
        assert_eq!(runtimes.len(), 2);
        assert_eq!(runtimes[0], runtimes[1]);
        assert_eq!(runtimes[0].as_list().unwrap()[0].as_text(), Some("python3.8"));
    }

    #[test]
    fn test_duplicate_layer_rejected() {
        let resolved = ResolvedConfig::resolve(&sample_config()).unwrap();
        let naming = Naming::new(&resolved.prefix, &resolved.uuid);
        let mut plan = ResourcePlan::new();
        plan_layers(&resolved, &naming, &mut plan).unwrap();

        assert!(plan_layers(&resolved, &naming, &mut plan).is_err());
    }
}
