//! Content hashing for change detection.
//!
//! This module provides deterministic hashing of configurations, resource
//! specifications and whole plans. Hashes feed fields in a fixed order, and
//! every map involved is ordered, so equal inputs always hash equally.

use sha2::{Digest, Sha256};

use crate::planner::{AttributeValue, ResourcePlan, ResourceSpec};

use super::spec::DeploymentConfig;

/// Hasher for computing configuration and plan hashes.
#[derive(Debug, Default)]
pub struct ConfigHasher;

impl ConfigHasher {
    /// Creates a new hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes a hash of the entire deployment configuration.
    ///
    /// The state backend settings are excluded: moving snapshots elsewhere
    /// does not change what gets deployed.
    #[must_use]
    pub fn hash_config(&self, config: &DeploymentConfig) -> String {
        let mut hasher = Sha256::new();

        feed(&mut hasher, &config.prefix);
        feed(&mut hasher, &config.uuid);
        feed(&mut hasher, &config.network.vpc_id);
        feed(&mut hasher, &config.my_ip);
        feed(&mut hasher, &config.keypair_name);

        let db = &config.database;
        hasher.update([u8::from(db.use_cluster)]);
        for field in [
            &db.name,
            &db.username,
            &db.password_key,
            &db.postgres_full_version,
            &db.postgres_major_version,
        ] {
            feed(&mut hasher, field);
        }
        for setting in [
            &db.port,
            &db.https_port,
            &db.allocated_storage,
            &db.max_allocated_storage,
        ] {
            feed(&mut hasher, setting.as_str());
        }

        feed(&mut hasher, &config.storage.upload_root);
        feed(&mut hasher, &config.layers.runtime);
        feed(&mut hasher, &config.layers.app_layer_path);
        feed(&mut hasher, &config.layers.import_layer_path);

        for (key, value) in &config.tags {
            feed(&mut hasher, key);
            feed(&mut hasher, value);
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a hash for a single resource specification.
    ///
    /// This hash is used to detect changes to individual resources.
    #[must_use]
    pub fn hash_resource(&self, spec: &ResourceSpec) -> String {
        let mut hasher = Sha256::new();
        feed_resource(&mut hasher, spec);
        hex::encode(hasher.finalize())
    }

    /// Computes a hash of a whole plan, outputs included.
    #[must_use]
    pub fn hash_plan(&self, plan: &ResourcePlan) -> String {
        let mut hasher = Sha256::new();

        for (id, spec) in plan.resources() {
            feed(&mut hasher, id);
            feed_resource(&mut hasher, spec);
        }

        for (name, reference) in plan.outputs() {
            feed(&mut hasher, name);
            feed(&mut hasher, &reference.resource);
            feed(&mut hasher, reference.attribute.as_deref().unwrap_or(""));
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }

    /// Compares two hashes to determine if they are equal.
    #[must_use]
    pub fn hashes_match(hash1: &str, hash2: &str) -> bool {
        if hash1.len() != hash2.len() {
            return false;
        }

        hash1
            .bytes()
            .zip(hash2.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

/// Feeds a length-prefixed string so adjacent fields cannot run together.
fn feed(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value.as_bytes());
}

fn feed_resource(hasher: &mut Sha256, spec: &ResourceSpec) {
    feed(hasher, spec.kind.type_name());

    for (name, value) in &spec.attributes {
        feed(hasher, name);
        feed_value(hasher, value);
    }

    for (key, value) in &spec.tags {
        feed(hasher, key);
        feed(hasher, value);
    }
}

fn feed_value(hasher: &mut Sha256, value: &AttributeValue) {
    match value {
        AttributeValue::Ref(reference) => {
            hasher.update([b'r']);
            feed(hasher, &reference.resource);
            feed(hasher, reference.attribute.as_deref().unwrap_or(""));
        }
        AttributeValue::Bool(b) => hasher.update([b'b', u8::from(*b)]),
        AttributeValue::Integer(n) => {
            hasher.update([b'i']);
            hasher.update(n.to_be_bytes());
        }
        AttributeValue::Text(s) => {
            hasher.update([b's']);
            feed(hasher, s);
        }
        AttributeValue::List(items) => {
            hasher.update([b'l']);
            hasher.update((items.len() as u64).to_be_bytes());
            for item in items {
                feed_value(hasher, item);
            }
        }
        AttributeValue::Map(entries) => {
            hasher.update([b'm']);
            hasher.update((entries.len() as u64).to_be_bytes());
            for (key, item) in entries {
                feed(hasher, key);
                feed_value(hasher, item);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::sample_config;
    use crate::planner::{ResourceKind, ResourceRef};

    #[test]
    fn test_config_hash_deterministic() {
        let hasher = ConfigHasher::new();
        let config = sample_config();

        assert_eq!(hasher.hash_config(&config), hasher.hash_config(&config));
    }

    #[test]
    fn test_config_hash_tracks_topology() {
        let hasher = ConfigHasher::new();
        let standalone = sample_config();
        let mut clustered = sample_config();
        clustered.database.use_cluster = true;

        assert_ne!(hasher.hash_config(&standalone), hasher.hash_config(&clustered));
    }

    #[test]
    fn test_config_hash_ignores_state_backend() {
        let hasher = ConfigHasher::new();
        let config = sample_config();
        let mut moved = sample_config();
        moved.state.path = Some(String::from("/tmp/elsewhere"));

        assert_eq!(hasher.hash_config(&config), hasher.hash_config(&moved));
    }

    #[test]
    fn test_resource_hash_distinguishes_values() {
        let hasher = ConfigHasher::new();
        let text = ResourceSpec::new(ResourceKind::Bucket).with("port", "5432");
        let number = ResourceSpec::new(ResourceKind::Bucket).with("port", 5432_u16);
        let reference = ResourceSpec::new(ResourceKind::Bucket)
            .with("port", ResourceRef::to("db_secret"));

        let hashes = [
            hasher.hash_resource(&text),
            hasher.hash_resource(&number),
            hasher.hash_resource(&reference),
        ];
        assert_ne!(hashes[0], hashes[1]);
        assert_ne!(hashes[1], hashes[2]);
        assert_ne!(hashes[0], hashes[2]);
    }

    #[test]
    fn test_short_hash() {
        let hasher = ConfigHasher::new();
        let full_hash = "abcdef1234567890abcdef1234567890";
        let short = hasher.short_hash(full_hash);

        assert_eq!(short, "abcdef12");
        assert_eq!(short.len(), 8);
    }

    #[test]
    fn test_hashes_match() {
        assert!(ConfigHasher::hashes_match("abc123", "abc123"));
        assert!(!ConfigHasher::hashes_match("abc123", "abc124"));
        assert!(!ConfigHasher::hashes_match("abc123", "abc12"));
    }
}
