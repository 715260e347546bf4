//! Resource specification types.
//!
//! A [`ResourceSpec`] is one declared resource: its kind, an ordered map of
//! attributes and its tags. Attributes may reference other resources of the
//! same plan through [`ResourceRef`].

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Resource types the builder emits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// VPC security group.
    SecurityGroup,
    /// Standalone ingress rule attached to a security group.
    SecurityGroupIngress,
    /// Bastion (jump) host instance.
    BastionHost,
    /// Generated database credential secret.
    DatabaseSecret,
    /// Aurora PostgreSQL cluster.
    DatabaseCluster,
    /// Single RDS PostgreSQL instance.
    DatabaseInstance,
    /// S3 bucket.
    Bucket,
    /// CloudFront origin access identity.
    OriginAccessIdentity,
    /// Bucket policy granting an identity read access.
    BucketReadGrant,
    /// CloudFront distribution.
    Distribution,
    /// One-time upload of local content into a bucket.
    BucketDeployment,
    /// Lambda layer version.
    LayerVersion,
}

impl ResourceKind {
    /// Returns the provider type name of this kind.
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::SecurityGroup => "AWS::EC2::SecurityGroup",
            Self::SecurityGroupIngress => "AWS::EC2::SecurityGroupIngress",
            Self::BastionHost => "AWS::EC2::Instance",
            Self::DatabaseSecret => "AWS::SecretsManager::Secret",
            Self::DatabaseCluster => "AWS::RDS::DBCluster",
            Self::DatabaseInstance => "AWS::RDS::DBInstance",
            Self::Bucket => "AWS::S3::Bucket",
            Self::OriginAccessIdentity => "AWS::CloudFront::CloudFrontOriginAccessIdentity",
            Self::BucketReadGrant => "AWS::S3::BucketPolicy",
            Self::Distribution => "AWS::CloudFront::Distribution",
            Self::BucketDeployment => "Custom::BucketDeployment",
            Self::LayerVersion => "AWS::Lambda::LayerVersion",
        }
    }

    /// Returns the attribute holding this kind's physical name, if it has one.
    #[must_use]
    pub const fn name_attribute(self) -> Option<&'static str> {
        match self {
            Self::SecurityGroup => Some("group_name"),
            Self::BastionHost => Some("instance_name"),
            Self::DatabaseSecret => Some("secret_name"),
            Self::DatabaseCluster | Self::DatabaseInstance => Some("database_name"),
            Self::Bucket => Some("bucket_name"),
            Self::LayerVersion => Some("layer_version_name"),
            Self::SecurityGroupIngress
            | Self::OriginAccessIdentity
            | Self::BucketReadGrant
            | Self::Distribution
            | Self::BucketDeployment => None,
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// A reference to another resource of the same plan.
///
/// Serialized as `{ ref: <id>, attribute: <name> }`. Only that map form
/// deserializes; lists and maps with other keys are rejected so untagged
/// attribute values never read a plain list back as a reference.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceRef {
    /// Logical id of the referenced resource.
    #[serde(rename = "ref")]
    pub resource: String,
    /// Attribute of the referenced resource, when not the resource itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl ResourceRef {
    /// References a resource as a whole.
    #[must_use]
    pub fn to(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            attribute: None,
        }
    }

    /// References one attribute of a resource.
    #[must_use]
    pub fn attr(resource: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            attribute: Some(attribute.into()),
        }
    }
}

impl<'de> Deserialize<'de> for ResourceRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ResourceRefVisitor)
    }
}

struct ResourceRefVisitor;

impl<'de> Visitor<'de> for ResourceRefVisitor {
    type Value = ResourceRef;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("a map with a `ref` key and an optional `attribute` key")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut resource: Option<String> = None;
        let mut attribute: Option<String> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "ref" => {
                    if resource.is_some() {
                        return Err(de::Error::duplicate_field("ref"));
                    }
                    resource = Some(map.next_value()?);
                }
                "attribute" => {
                    if attribute.is_some() {
                        return Err(de::Error::duplicate_field("attribute"));
                    }
                    attribute = map.next_value()?;
                }
                other => return Err(de::Error::unknown_field(other, REF_FIELDS)),
            }
        }

        let resource = resource.ok_or_else(|| de::Error::missing_field("ref"))?;
        Ok(ResourceRef {
            resource,
            attribute,
        })
    }
}

/// Keys accepted in a serialized reference.
const REF_FIELDS: &[&str] = &["ref", "attribute"];

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.attribute {
            Some(attribute) => write!(f, "{}.{attribute}", self.resource),
            None => write!(f, "{}", self.resource),
        }
    }
}

/// An attribute value.
///
/// References come first so a `{ ref: ... }` map is never read back as a
/// plain map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Reference to another resource.
    Ref(ResourceRef),
    /// Boolean flag.
    Bool(bool),
    /// Integer.
    Integer(i64),
    /// String.
    Text(String),
    /// Ordered list.
    List(Vec<AttributeValue>),
    /// Ordered map.
    Map(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Builds a map value from key/value pairs.
    #[must_use]
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Self>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Builds a list value.
    #[must_use]
    pub fn list<V: Into<Self>>(items: impl IntoIterator<Item = V>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Returns the string content of a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the content of an integer value.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the content of a boolean value.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the reference held by this value.
    #[must_use]
    pub const fn as_reference(&self) -> Option<&ResourceRef> {
        match self {
            Self::Ref(r) => Some(r),
            _ => None,
        }
    }

    /// Returns the entries of a list value.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the entries of a map value.
    #[must_use]
    pub const fn as_map(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Collects every reference nested in this value.
    pub fn collect_refs<'a>(&'a self, out: &mut Vec<&'a ResourceRef>) {
        match self {
            Self::Ref(r) => out.push(r),
            Self::List(items) => {
                for item in items {
                    item.collect_refs(out);
                }
            }
            Self::Map(entries) => {
                for item in entries.values() {
                    item.collect_refs(out);
                }
            }
            Self::Bool(_) | Self::Integer(_) | Self::Text(_) => {}
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<u16> for AttributeValue {
    fn from(n: u16) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<u32> for AttributeValue {
    fn from(n: u32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<ResourceRef> for AttributeValue {
    fn from(r: ResourceRef) -> Self {
        Self::Ref(r)
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ref(r) => write!(f, "${{{r}}}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, item)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {item}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// One declared resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceSpec {
    /// Resource type.
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    /// Attributes in name order.
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Tags in key order.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl ResourceSpec {
    /// Creates an empty resource of the given kind.
    #[must_use]
    pub const fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            attributes: BTreeMap::new(),
            tags: BTreeMap::new(),
        }
    }

    /// Sets an attribute.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Returns an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Returns the physical name of this resource, if its kind has one.
    #[must_use]
    pub fn physical_name(&self) -> Option<&str> {
        self.kind
            .name_attribute()
            .and_then(|name| self.attribute(name))
            .and_then(AttributeValue::as_text)
    }

    /// Returns every reference held by this resource's attributes.
    #[must_use]
    pub fn references(&self) -> Vec<&ResourceRef> {
        let mut refs = Vec::new();
        for value in self.attributes.values() {
            value.collect_refs(&mut refs);
        }
        refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_references_are_collected() {
        let spec = ResourceSpec::new(ResourceKind::Distribution).with(
            "origin",
            AttributeValue::map([
                ("bucket", AttributeValue::from(ResourceRef::to("dashboard_bucket"))),
                (
                    "identities",
                    AttributeValue::list([ResourceRef::to("dashboard_oai")]),
                ),
            ]),
        );

        let refs: Vec<String> = spec.references().iter().map(ToString::to_string).collect();
        assert_eq!(refs, vec!["dashboard_bucket", "dashboard_oai"]);
    }

    #[test]
    fn test_reference_survives_json() {
        let value = AttributeValue::from(ResourceRef::attr("db_cluster", "endpoint_address"));
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"ref":"db_cluster","attribute":"endpoint_address"}"#);

        let back: AttributeValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_plain_map_is_not_a_reference() {
        let back: AttributeValue =
            serde_json::from_str(r#"{"ref":"x","extra":true}"#).unwrap();
        assert!(back.as_map().is_some());
        assert!(back.as_reference().is_none());
    }

    #[test]
    fn test_short_string_lists_stay_lists() {
        for json in [r#"["GET"]"#, r#"["s3:GetObject","s3:ListBucket"]"#] {
            let back: AttributeValue = serde_json::from_str(json).unwrap();
            assert!(back.as_reference().is_none(), "{json} read back as a reference");
            assert!(back.as_list().is_some());
        }

        let back: AttributeValue = serde_yaml::from_str("- python3.8\n").unwrap();
        assert_eq!(back, AttributeValue::list(["python3.8"]));
    }

    #[test]
    fn test_reference_requires_ref_key() {
        assert!(serde_json::from_str::<ResourceRef>(r#"{"attribute":"arn"}"#).is_err());
        assert!(serde_json::from_str::<ResourceRef>(r#"["db_secret","arn"]"#).is_err());

        let back: ResourceRef = serde_yaml::from_str("ref: db_secret\n").unwrap();
        assert_eq!(back, ResourceRef::to("db_secret"));
    }

    #[test]
    fn test_physical_name() {
        let spec = ResourceSpec::new(ResourceKind::Bucket).with("bucket_name", "my-iot-dashboard-abc123");
        assert_eq!(spec.physical_name(), Some("my-iot-dashboard-abc123"));

        let spec = ResourceSpec::new(ResourceKind::Distribution);
        assert_eq!(spec.physical_name(), None);
    }

    #[test]
    fn test_display() {
        let value = AttributeValue::list([
            AttributeValue::from(22_u16),
            AttributeValue::from(ResourceRef::attr("db_secret", "arn")),
        ]);
        assert_eq!(value.to_string(), "[22, ${db_secret.arn}]");
    }
}
