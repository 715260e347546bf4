//! Storage resource group.
//!
//! Five buckets in a fixed order. The first three are fronted by a
//! distribution reading through an origin access identity; the template
//! bucket receives a one-time content upload.

use crate::config::ResolvedConfig;
use crate::error::PlanError;

use super::naming::{BucketRole, Naming, TEMPLATE_DEPLOYMENT};
use super::plan::ResourcePlan;
use super::resource::{AttributeValue, ResourceKind, ResourceRef, ResourceSpec};

/// Website index and error document of the dashboard bucket.
const DASHBOARD_DOCUMENT: &str = "index.html";

/// Adds the storage group to `plan`.
///
/// # Errors
///
/// Returns a [`PlanError`] if a logical id or output name is already taken.
pub fn plan_storage(
    config: &ResolvedConfig,
    naming: &Naming,
    plan: &mut ResourcePlan,
) -> Result<(), PlanError> {
    for role in BucketRole::ALL {
        plan.insert(role.bucket_id(), bucket(naming, role))?;

        if let Some(comment) = role.identity_comment() {
            plan_distribution(role, comment, plan)?;
        }
    }

    plan.insert(
        TEMPLATE_DEPLOYMENT,
        ResourceSpec::new(ResourceKind::BucketDeployment)
            .with(
                "sources",
                AttributeValue::list([config.template_source().to_string_lossy().into_owned()]),
            )
            .with(
                "destination_bucket",
                ResourceRef::to(BucketRole::Template.bucket_id()),
            ),
    )?;

    Ok(())
}

fn bucket(naming: &Naming, role: BucketRole) -> ResourceSpec {
    let mut spec = ResourceSpec::new(ResourceKind::Bucket)
        .with("bucket_name", naming.bucket_name(role))
        .with("block_public_access", "block_all")
        .with("access_control", "log_delivery_write")
        .with("object_ownership", "object_writer")
        .with("removal_policy", "destroy")
        .with("auto_delete_objects", true);

    if role != BucketRole::Generator {
        spec = spec.with("encryption", "s3_managed");
    }

    if role == BucketRole::Dashboard {
        spec = spec
            .with("website_index_document", DASHBOARD_DOCUMENT)
            .with("website_error_document", DASHBOARD_DOCUMENT)
            .with(
                "cors",
                AttributeValue::list([AttributeValue::map([
                    ("allowed_methods", AttributeValue::list(["GET"])),
                    ("allowed_origins", AttributeValue::list(["*"])),
                ])]),
            );
    }

    spec
}

fn plan_distribution(
    role: BucketRole,
    comment: &str,
    plan: &mut ResourcePlan,
) -> Result<(), PlanError> {
    let bucket_id = role.bucket_id();
    let identity_id = role.identity_id();
    let distribution_id = role.distribution_id();

    plan.insert(
        identity_id.clone(),
        ResourceSpec::new(ResourceKind::OriginAccessIdentity).with("comment", comment),
    )?;

    plan.insert(
        role.read_grant_id(),
        ResourceSpec::new(ResourceKind::BucketReadGrant)
            .with("bucket", ResourceRef::to(bucket_id.clone()))
            .with(
                "principal",
                ResourceRef::attr(identity_id.clone(), "canonical_user_id"),
            )
            .with("actions", AttributeValue::list(["s3:GetObject", "s3:ListBucket"])),
    )?;

    let origin = AttributeValue::map([
        (
            "bucket",
            AttributeValue::from(ResourceRef::attr(bucket_id, "regional_domain_name")),
        ),
        (
            "origin_access_identity",
            AttributeValue::from(ResourceRef::to(identity_id)),
        ),
        (
            "behaviors",
            AttributeValue::list([AttributeValue::map([("is_default_behavior", true)])]),
        ),
    ]);

    plan.insert(
        distribution_id.clone(),
        ResourceSpec::new(ResourceKind::Distribution)
            .with("origin_configs", AttributeValue::list([origin])),
    )?;

    plan.add_output(
        role.domain_output(),
        ResourceRef::attr(distribution_id, "domain_name"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::sample_config;

    fn planned() -> ResourcePlan {
        let resolved = ResolvedConfig::resolve(&sample_config()).unwrap();
        let naming = Naming::new(&resolved.prefix, &resolved.uuid);
        let mut plan = ResourcePlan::new();
        plan_storage(&resolved, &naming, &mut plan).unwrap();
        plan
    }

    #[test]
    fn test_bucket_names() {
        let plan = planned();
        let names: Vec<&str> = BucketRole::ALL
            .iter()
            .filter_map(|role| plan.get(&role.bucket_id())?.physical_name())
            .collect();

        assert_eq!(
            names,
            vec![
                "my-iot-dashboard-abc123",
                "my-iot-fw-update-abc123",
                "my-iot-twin-media-abc123",
                "my-iot-template-abc123",
                "my-iot-generator-abc123",
            ]
        );
    }

    #[test]
    fn test_distribution_fan_out() {
        let plan = planned();

        for role in BucketRole::ALL {
            assert_eq!(plan.contains(&role.identity_id()), role.is_distributed());
            assert_eq!(plan.contains(&role.read_grant_id()), role.is_distributed());
            assert_eq!(plan.contains(&role.distribution_id()), role.is_distributed());
            assert_eq!(
                plan.outputs().contains_key(&role.domain_output()),
                role.is_distributed()
            );
        }

        assert_eq!(plan.ids_of_kind(ResourceKind::Distribution).len(), 3);
        assert_eq!(
            plan.outputs().get("dashboard_domain_name"),
            Some(&ResourceRef::attr("dashboard_distribution", "domain_name"))
        );
        let oai = plan.get("fw_update_oai").unwrap();
        assert_eq!(
            oai.attribute("comment").and_then(AttributeValue::as_text),
            Some("FW Update OIA")
        );
    }

    #[test]
    fn test_encryption_and_website() {
        let plan = planned();
        let encryption = |role: BucketRole| {
            plan.get(&role.bucket_id())
                .and_then(|spec| spec.attribute("encryption"))
                .is_some()
        };

        assert!(encryption(BucketRole::Template));
        assert!(encryption(BucketRole::Dashboard));
        assert!(!encryption(BucketRole::Generator));

        let dashboard = plan.get("dashboard_bucket").unwrap();
        assert_eq!(
            dashboard
                .attribute("website_index_document")
                .and_then(AttributeValue::as_text),
            Some("index.html")
        );
        let twin = plan.get("twin_media_bucket").unwrap();
        assert!(twin.attribute("cors").is_none());
    }

    #[test]
    fn test_template_upload() {
        let plan = planned();
        let upload = plan.get(TEMPLATE_DEPLOYMENT).unwrap();

        assert_eq!(
            upload.attribute("destination_bucket").and_then(AttributeValue::as_reference),
            Some(&ResourceRef::to("template_bucket"))
        );
        let sources = upload.attribute("sources").and_then(AttributeValue::as_list).unwrap();
        assert_eq!(sources[0].as_text(), Some("./s3_upload/template_files"));
    }

    #[test]
    fn test_storage_group_is_self_contained() {
        assert!(planned().verify().is_ok());
    }
}
