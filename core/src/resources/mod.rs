//! Resource Handles (C7): the `Resource` trait, its Read → Diff → Apply
//! lifecycle types, universal diff rules, and the twelve per-type
//! implementations.

pub mod backend;
pub mod cron;
pub mod directory;
pub mod download;
pub mod exec;
pub mod file;
pub mod group;
pub mod hostname;
pub mod link;
pub mod package;
pub mod passwd;
pub mod service;
pub mod stat;
pub mod user;

use std::collections::BTreeMap;
use std::fmt;

use crate::error::ResourceError;
use crate::expr::EvalContext;
use crate::value::Value;

/// `{exists, attributes}` as observed by `Resource::read` (§3 "State").
#[derive(Clone, Debug, Default)]
pub struct State {
    pub exists: bool,
    pub attributes: BTreeMap<String, Value>,
}

impl State {
    pub fn absent() -> Self {
        State::default()
    }

    pub fn present(attributes: BTreeMap<String, Value>) -> Self {
        State {
            exists: true,
            attributes,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// One attribute's before/after (§3 "Change").
#[derive(Clone, Debug)]
pub struct Change {
    pub attribute: String,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

/// §3 "Action".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Noop,
    Create,
    Update,
    Delete,
    Skip,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Noop => "noop",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Skip => "skip",
        };
        write!(f, "{s}")
    }
}

/// §3 "Plan". Invariant: `has_changes() == (action != Noop)`.
#[derive(Clone, Debug)]
pub struct Plan {
    pub action: Action,
    pub changes: Vec<Change>,
    pub before: State,
    pub after: State,
    pub skip_reason: Option<String>,
}

impl Plan {
    pub fn noop(before: State) -> Self {
        let after = before.clone();
        Plan {
            action: Action::Noop,
            changes: Vec::new(),
            before,
            after,
            skip_reason: None,
        }
    }

    pub fn skip(before: State, reason: impl Into<String>) -> Self {
        Plan {
            action: Action::Skip,
            changes: Vec::new(),
            after: before.clone(),
            before,
            skip_reason: Some(reason.into()),
        }
    }

    pub fn has_changes(&self) -> bool {
        self.action != Action::Noop
    }
}

/// A decoded `ensure` attribute, common to most resource types (§4.7).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ensure {
    Present,
    Absent,
}

impl Default for Ensure {
    fn default() -> Self {
        Ensure::Present
    }
}

impl Ensure {
    pub fn from_attr(value: Option<&Value>) -> Ensure {
        match value.and_then(Value::as_str) {
            Some("absent") => Ensure::Absent,
            _ => Ensure::Present,
        }
    }
}

/// Compares a desired attribute map against an observed `State`, applying the
/// universal diff rules of §4.7: present+not-present → Create with every
/// configured attribute as a null→value change; present+present →
/// attribute-by-attribute comparison, `Update` iff any change, else `Noop`.
pub fn diff_attributes(desired: &BTreeMap<String, Value>, current: &State) -> Vec<Change> {
    if !current.exists {
        return desired
            .iter()
            .map(|(k, v)| Change {
                attribute: k.clone(),
                old: None,
                new: Some(v.clone()),
            })
            .collect();
    }

    desired
        .iter()
        .filter_map(|(k, want)| {
            let have = current.attributes.get(k);
            let changed = match have {
                Some(have) => !have.structural_eq(want),
                None => true,
            };
            changed.then(|| Change {
                attribute: k.clone(),
                old: have.cloned(),
                new: Some(want.clone()),
            })
        })
        .collect()
}

/// Computes the universal `Action` for an `ensure`-governed resource per the
/// diff rules table in §4.7.
pub fn universal_diff(ensure: Ensure, current: &State, changes: Vec<Change>) -> Plan {
    match (ensure, current.exists) {
        (Ensure::Absent, false) => Plan::noop(current.clone()),
        (Ensure::Absent, true) => Plan {
            action: Action::Delete,
            changes: current
                .attributes
                .iter()
                .map(|(k, v)| Change {
                    attribute: k.clone(),
                    old: Some(v.clone()),
                    new: None,
                })
                .collect(),
            before: current.clone(),
            after: State::absent(),
            skip_reason: None,
        },
        (Ensure::Present, false) => Plan {
            action: Action::Create,
            after: State::present(
                changes
                    .iter()
                    .filter_map(|c| c.new.clone().map(|v| (c.attribute.clone(), v)))
                    .collect(),
            ),
            before: current.clone(),
            changes,
            skip_reason: None,
        },
        (Ensure::Present, true) => {
            if changes.is_empty() {
                Plan::noop(current.clone())
            } else {
                let mut attrs = current.attributes.clone();
                for c in &changes {
                    match &c.new {
                        Some(v) => {
                            attrs.insert(c.attribute.clone(), v.clone());
                        }
                        None => {
                            attrs.remove(&c.attribute);
                        }
                    }
                }
                Plan {
                    action: Action::Update,
                    changes,
                    before: current.clone(),
                    after: State::present(attrs),
                    skip_reason: None,
                }
            }
        }
    }
}

/// The per-resource-type contract (§4.7). `read`/`diff` must not mutate the
/// host; `apply` mutates only when `really_apply` is true.
pub trait Resource: fmt::Debug + Send + Sync {
    fn type_(&self) -> &str;
    fn name(&self) -> &str;
    fn id(&self) -> String {
        format!("{}.{}", self.type_(), self.name())
    }

    /// Config-only checks; no system calls.
    fn validate(&self) -> Result<(), ResourceError>;

    /// Merged explicit + implicit dependency ids (§4.8), computed once at
    /// construction time by the registry's factory.
    fn dependencies(&self) -> &[String];

    /// Observes current state. Must not mutate the host.
    fn read(&self, ctx: &EvalContext) -> Result<State, ResourceError>;

    /// Compares `current` to desired configuration, producing a `Plan`.
    fn diff(&self, ctx: &EvalContext, current: &State) -> Result<Plan, ResourceError>;

    /// Executes `plan`. A no-op when `really_apply` is false or
    /// `plan.has_changes()` is false, regardless of `really_apply` (§4.7).
    fn apply(&self, ctx: &EvalContext, plan: &Plan, really_apply: bool) -> Result<(), ResourceError>;
}

pub(crate) fn attr_str(body: &BTreeMap<String, Value>, key: &str) -> Option<String> {
    body.get(key).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn require_str(
    body: &BTreeMap<String, Value>,
    key: &str,
    id: &str,
) -> Result<String, ResourceError> {
    attr_str(body, key).ok_or_else(|| ResourceError::Invalid {
        id: id.to_string(),
        message: format!("missing required attribute `{key}`"),
    })
}
