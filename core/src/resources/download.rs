//! `download` resource (§4.7): `url`, `dest`, `checksum?`, `mode?`, `owner?`,
//! `group?`, `force?`, `timeout?`. Download is atomic: stream to a temp file
//! in the destination directory, verify checksum, rename into place.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::time::Duration;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use super::{universal_diff, Ensure, Plan, Resource, State};
use crate::error::ResourceError;
use crate::expr::EvalContext;
use crate::value::Value;

const DEFAULT_MODE: u32 = 0o644;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
struct Checksum {
    algo: String,
    hex: String,
}

impl Checksum {
    fn parse(s: &str) -> Result<Checksum, ResourceError> {
        match s.split_once(':') {
            Some((algo, hex)) if matches!(algo, "md5" | "sha1" | "sha256" | "sha512") => {
                Ok(Checksum {
                    algo: algo.to_string(),
                    hex: hex.to_lowercase(),
                })
            }
            _ => Err(ResourceError::Invalid {
                id: String::new(),
                message: format!("invalid checksum format `{s}`, expected `<algo>:<hex>`"),
            }),
        }
    }

    fn digest(&self, bytes: &[u8]) -> String {
        digest_with_algo(&self.algo, bytes)
    }

    fn to_string(&self) -> String {
        format!("{}:{}", self.algo, self.hex)
    }
}

fn digest_with_algo(algo: &str, bytes: &[u8]) -> String {
    match algo {
        "md5" => format!("{:x}", Md5::digest(bytes)),
        "sha1" => format!("{:x}", Sha1::digest(bytes)),
        "sha256" => format!("{:x}", Sha256::digest(bytes)),
        "sha512" => format!("{:x}", Sha512::digest(bytes)),
        _ => unreachable!("validated in Checksum::parse"),
    }
}

#[derive(Debug)]
pub struct DownloadResource {
    name: String,
    url: String,
    dest: String,
    checksum: Option<Checksum>,
    mode: u32,
    owner: Option<String>,
    group: Option<String>,
    force: bool,
    timeout: Duration,
    dependencies: Vec<String>,
}

impl DownloadResource {
    pub fn new(
        name: String,
        attrs: &BTreeMap<String, Value>,
        dependencies: Vec<String>,
    ) -> Result<Self, ResourceError> {
        let id = format!("download.{name}");
        let url = super::require_str(attrs, "url", &id)?;
        let dest = super::require_str(attrs, "dest", &id)?;
        let checksum = match super::attr_str(attrs, "checksum") {
            Some(s) => Some(Checksum::parse(&s).map_err(|_| {
                ResourceError::Invalid {
                    id: id.clone(),
                    message: format!("invalid checksum format `{s}`, expected `<algo>:<hex>`"),
                }
            })?),
            None => None,
        };
        let mode = match super::attr_str(attrs, "mode") {
            Some(m) => u32::from_str_radix(&m, 8).map_err(|_| ResourceError::Invalid {
                id: id.clone(),
                message: format!("invalid octal mode `{m}`"),
            })?,
            None => DEFAULT_MODE,
        };
        let timeout_secs = attrs
            .get("timeout")
            .and_then(Value::as_number)
            .and_then(|n| n.as_i64())
            .map(|v| v as u64)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(DownloadResource {
            name,
            url,
            dest,
            checksum,
            mode,
            owner: super::attr_str(attrs, "owner"),
            group: super::attr_str(attrs, "group"),
            force: attrs.get("force").and_then(Value::as_bool).unwrap_or(false),
            timeout: Duration::from_secs(timeout_secs),
            dependencies,
        })
    }

    fn current_checksum(&self) -> Option<String> {
        let algo = self.checksum.as_ref()?.algo.clone();
        let bytes = fs::read(&self.dest).ok()?;
        Some(digest_with_algo(&algo, &bytes))
    }
}

impl Resource for DownloadResource {
    fn type_(&self) -> &str {
        "download"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), ResourceError> {
        Ok(())
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    fn read(&self, _ctx: &EvalContext) -> Result<State, ResourceError> {
        if !std::path::Path::new(&self.dest).exists() {
            return Ok(State::absent());
        }
        let mut attrs = BTreeMap::new();
        if let Some(hash) = self.current_checksum() {
            attrs.insert("checksum".to_string(), Value::String(hash));
        }
        Ok(State::present(attrs))
    }

    fn diff(&self, _ctx: &EvalContext, current: &State) -> Result<Plan, ResourceError> {
        let needs_download = !current.exists
            || self.force
            || self
                .checksum
                .as_ref()
                .is_some_and(|want| current.get("checksum").and_then(Value::as_str) != Some(want.hex.as_str()));

        let mut desired = BTreeMap::new();
        if let Some(c) = &self.checksum {
            desired.insert("checksum".to_string(), Value::String(c.hex.clone()));
        } else {
            desired.insert(
                "checksum".to_string(),
                current
                    .get("checksum")
                    .cloned()
                    .unwrap_or_else(|| Value::String(String::new())),
            );
        }

        if !needs_download {
            return Ok(Plan::noop(current.clone()));
        }
        let changes = super::diff_attributes(&desired, current);
        Ok(universal_diff(Ensure::Present, current, changes))
    }

    fn apply(&self, _ctx: &EvalContext, plan: &Plan, really_apply: bool) -> Result<(), ResourceError> {
        if !really_apply || !plan.has_changes() {
            return Ok(());
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ResourceError::Apply {
                id: self.id(),
                message: e.to_string(),
            })?;
        let response = client
            .get(&self.url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| ResourceError::Apply {
                id: self.id(),
                message: e.to_string(),
            })?;
        let bytes = response.bytes().map_err(|e| ResourceError::Apply {
            id: self.id(),
            message: e.to_string(),
        })?;

        if let Some(checksum) = &self.checksum {
            let got = checksum.digest(&bytes);
            if got != checksum.hex {
                return Err(ResourceError::Apply {
                    id: self.id(),
                    message: format!(
                        "checksum mismatch: expected {}, got {}:{got}",
                        checksum.to_string(),
                        checksum.algo
                    ),
                });
            }
        }

        let dest_path = std::path::Path::new(&self.dest);
        let parent = dest_path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let tmp_path = parent.join(format!(".{}.hostcfg.tmp", self.name));

        let mut tmp = fs::File::create(&tmp_path).map_err(|e| ResourceError::Apply {
            id: self.id(),
            message: e.to_string(),
        })?;
        tmp.write_all(&bytes).map_err(|e| ResourceError::Apply {
            id: self.id(),
            message: e.to_string(),
        })?;
        drop(tmp);

        fs::rename(&tmp_path, dest_path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            ResourceError::Apply {
                id: self.id(),
                message: e.to_string(),
            }
        })?;

        super::file::set_mode(&self.dest, self.mode).map_err(|e| ResourceError::Apply {
            id: self.id(),
            message: e,
        })?;
        super::file::set_ownership(&self.dest, self.owner.as_deref(), self.group.as_deref())
            .map_err(|e| ResourceError::Apply {
                id: self.id(),
                message: e,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    #[test]
    fn checksum_parse_accepts_known_algorithms() {
        assert!(Checksum::parse("sha256:deadbeef").is_ok());
        assert!(Checksum::parse("sha512:deadbeef").is_ok());
    }

    #[test]
    fn checksum_parse_rejects_unknown_algorithm() {
        assert!(Checksum::parse("crc32:deadbeef").is_err());
    }

    #[test]
    fn checksum_parse_rejects_missing_separator() {
        assert!(Checksum::parse("sha256deadbeef").is_err());
    }

    #[test]
    fn digest_with_algo_matches_known_sha256_vector() {
        let got = digest_with_algo("sha256", b"hello");
        assert_eq!(got, "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824");
    }

    #[test]
    fn new_rejects_malformed_checksum() {
        let a = attrs(&[("url", "https://example.invalid/x"), ("dest", "/tmp/x"), ("checksum", "bogus")]);
        assert!(DownloadResource::new("x".into(), &a, vec![]).is_err());
    }

    #[test]
    fn diff_forces_download_when_absent() {
        let a = attrs(&[("url", "https://example.invalid/x"), ("dest", "/tmp/x")]);
        let r = DownloadResource::new("x".into(), &a, vec![]).unwrap();
        let plan = r.diff(&EvalContext::empty(), &State::absent()).unwrap();
        assert!(plan.has_changes());
    }

    #[test]
    fn diff_is_noop_when_checksum_already_matches() {
        let a = attrs(&[
            ("url", "https://example.invalid/x"),
            ("dest", "/tmp/x"),
            ("checksum", "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"),
        ]);
        let r = DownloadResource::new("x".into(), &a, vec![]).unwrap();
        let mut current = BTreeMap::new();
        current.insert(
            "checksum".to_string(),
            Value::String("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824".to_string()),
        );
        let plan = r.diff(&EvalContext::empty(), &State::present(current)).unwrap();
        assert!(!plan.has_changes());
    }

    #[test]
    fn diff_redownloads_when_force_is_set() {
        let mut a = attrs(&[("url", "https://example.invalid/x"), ("dest", "/tmp/x")]);
        a.insert("force".to_string(), Value::Bool(true));
        let r = DownloadResource::new("x".into(), &a, vec![]).unwrap();
        let plan = r.diff(&EvalContext::empty(), &State::present(BTreeMap::new())).unwrap();
        assert!(plan.has_changes());
    }
}
