//! Resource Registry (C6): a process-wide `type_label → factory` table
//! (§4.6), the sole seam between the Executor and the per-type handles.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::error::{ConfigError, ResourceError};
use crate::expr::EvalContext;
use crate::resources::backend::{AptPackageManager, SystemdServiceManager};
use crate::resources::{
    cron::CronResource, directory::DirectoryResource, download::DownloadResource, exec::ExecResource,
    file::FileResource, group::GroupResource, hostname::HostnameResource, link::LinkResource,
    package::PackageResource, service::ServiceResource, stat::StatResource, user::UserResource, Resource,
};
use crate::value::Value;

/// Every known resource type label, in declaration order. Used both by the
/// registry to validate unknown types and by the implicit-dependency
/// inference pass (§4.8) to recognize `<TYPE>.<NAME>` references.
pub const RESOURCE_TYPES: &[&str] = &[
    "file", "directory", "link", "download", "package", "service", "cron", "user", "group", "exec",
    "hostname", "stat",
];

type Factory = fn(
    name: String,
    attrs: &BTreeMap<String, Value>,
    dependencies: Vec<String>,
) -> Result<Box<dyn Resource>, ResourceError>;

static REGISTRY: OnceLock<BTreeMap<&'static str, Factory>> = OnceLock::new();

fn registry() -> &'static BTreeMap<&'static str, Factory> {
    REGISTRY.get_or_init(|| {
        let mut m: BTreeMap<&'static str, Factory> = BTreeMap::new();
        m.insert("file", |n, a, d| Ok(Box::new(FileResource::new(n, a, d)?)));
        m.insert("directory", |n, a, d| Ok(Box::new(DirectoryResource::new(n, a, d)?)));
        m.insert("link", |n, a, d| Ok(Box::new(LinkResource::new(n, a, d)?)));
        m.insert("download", |n, a, d| Ok(Box::new(DownloadResource::new(n, a, d)?)));
        m.insert("package", |n, a, d| {
            Ok(Box::new(PackageResource::new(n, a, d, Box::new(AptPackageManager))?))
        });
        m.insert("service", |n, a, d| {
            Ok(Box::new(ServiceResource::new(n, a, d, Box::new(SystemdServiceManager))?))
        });
        m.insert("cron", |n, a, d| Ok(Box::new(CronResource::new(n, a, d)?)));
        m.insert("user", |n, a, d| Ok(Box::new(UserResource::new(n, a, d)?)));
        m.insert("group", |n, a, d| Ok(Box::new(GroupResource::new(n, a, d)?)));
        m.insert("exec", |n, a, d| Ok(Box::new(ExecResource::new(n, a, d)?)));
        m.insert("hostname", |n, a, d| Ok(Box::new(HostnameResource::new(n, a, d)?)));
        m.insert("stat", |n, a, d| Ok(Box::new(StatResource::new(n, a, d)?)));
        m
    })
}

/// `Create(block, ctx)`: evaluates `block.body` against `ctx` and dispatches
/// to the factory registered under `block.type_label`. Unknown types fail
/// with `"unknown resource type: <label>"` (§4.6).
pub fn create(
    block: &crate::schema::ResourceBlock,
    dependencies: Vec<String>,
    ctx: &EvalContext,
) -> Result<Box<dyn Resource>, ConfigError> {
    let factory = registry()
        .get(block.type_label.as_str())
        .ok_or_else(|| ConfigError::UnknownResourceType(block.type_label.clone()))?;
    let attrs = crate::expr::eval_body(&block.body, ctx)?;
    factory(block.name_label.clone(), &attrs, dependencies)
        .map_err(|e| ConfigError::Eval(e.to_string()))
}

/// Whether `label` names a known resource type (§4.8, reference inference).
pub fn is_known_type(label: &str) -> bool {
    RESOURCE_TYPES.contains(&label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{self, TopLevelBlock};

    fn resource_block(src: &str) -> crate::schema::ResourceBlock {
        let body: hcl::Body = hcl::from_str(src).unwrap();
        match schema::decode_body(body).unwrap().into_iter().next().unwrap() {
            TopLevelBlock::Resource(r) => r,
            other => panic!("expected resource block, got {other:?}"),
        }
    }

    #[test]
    fn is_known_type_covers_every_listed_resource_type() {
        for ty in RESOURCE_TYPES {
            assert!(is_known_type(ty));
        }
        assert!(!is_known_type("bogus"));
    }

    #[test]
    fn create_dispatches_to_the_matching_factory() {
        let block = resource_block(r#"resource "stat" "tmp" { path = "/tmp" }"#);
        let ctx = EvalContext::empty();
        let resource = create(&block, Vec::new(), &ctx).unwrap();
        assert_eq!(resource.type_(), "stat");
        assert_eq!(resource.name(), "tmp");
    }

    #[test]
    fn create_rejects_unknown_resource_type() {
        let block = resource_block(r#"resource "bogus" "x" { path = "/tmp" }"#);
        let ctx = EvalContext::empty();
        assert!(create(&block, Vec::new(), &ctx).is_err());
    }
}
