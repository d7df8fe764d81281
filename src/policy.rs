//! Equality, obstruction and satisfaction policies.
//!
//! A policy decides, for one kind of resource, when two records describe
//! the same thing, when an existing record prevents a new one from being
//! created, and when an existing record already fulfills a new one. The
//! three predicates are independent of each other.

use crate::record::Record;
use std::sync::Arc;

pub trait ResourcePolicy {
    /// Whether `a` and `b` describe the same configuration.
    fn equals(&self, a: &Record, b: &Record) -> bool;

    /// Whether `existing` prevents `new` from being created.
    fn obstructs(&self, existing: &Record, new: &Record) -> bool;

    /// Whether `existing` already fulfills everything `new` requires.
    fn satisfies(&self, existing: &Record, new: &Record) -> bool;
}

impl<P> ResourcePolicy for &P
where
    P: ResourcePolicy + ?Sized,
{
    fn equals(&self, a: &Record, b: &Record) -> bool {
        (**self).equals(a, b)
    }

    fn obstructs(&self, existing: &Record, new: &Record) -> bool {
        (**self).obstructs(existing, new)
    }

    fn satisfies(&self, existing: &Record, new: &Record) -> bool {
        (**self).satisfies(existing, new)
    }
}

impl<P> ResourcePolicy for Box<P>
where
    P: ResourcePolicy + ?Sized,
{
    fn equals(&self, a: &Record, b: &Record) -> bool {
        (**self).equals(a, b)
    }

    fn obstructs(&self, existing: &Record, new: &Record) -> bool {
        (**self).obstructs(existing, new)
    }

    fn satisfies(&self, existing: &Record, new: &Record) -> bool {
        (**self).satisfies(existing, new)
    }
}

impl<P> ResourcePolicy for Arc<P>
where
    P: ResourcePolicy + ?Sized,
{
    fn equals(&self, a: &Record, b: &Record) -> bool {
        (**self).equals(a, b)
    }

    fn obstructs(&self, existing: &Record, new: &Record) -> bool {
        (**self).obstructs(existing, new)
    }

    fn satisfies(&self, existing: &Record, new: &Record) -> bool {
        (**self).satisfies(existing, new)
    }
}

/// When an existing record gets in the way of a new one.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Obstruction {
    #[default]
    Never,
    /// An equal record obstructs, e.g. names that must be unique per parent.
    Equal,
    /// Same values on these fields, but not equal.
    Conflicting(Vec<String>),
}

/// When an existing record makes creating a new one unnecessary.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Satisfaction {
    #[default]
    Never,
    Equal,
}

/// A policy comparing a fixed set of fields.
///
/// A record missing any of the compared fields equals nothing, not even
/// itself.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPolicy {
    pub equals: Vec<String>,
    #[serde(default)]
    pub obstructs: Obstruction,
    #[serde(default)]
    pub satisfies: Satisfaction,
}

impl FieldPolicy {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            equals: fields.into_iter().map(Into::into).collect(),
            obstructs: Obstruction::Never,
            satisfies: Satisfaction::Never,
        }
    }

    pub fn with_obstruction(mut self, obstruction: Obstruction) -> Self {
        self.obstructs = obstruction;
        self
    }

    pub fn with_satisfaction(mut self, satisfaction: Satisfaction) -> Self {
        self.satisfies = satisfaction;
        self
    }
}

fn same_fields(fields: &[String], a: &Record, b: &Record) -> bool {
    fields.iter().all(|field| match (a.get(field), b.get(field)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    })
}

impl ResourcePolicy for FieldPolicy {
    fn equals(&self, a: &Record, b: &Record) -> bool {
        same_fields(&self.equals, a, b)
    }

    fn obstructs(&self, existing: &Record, new: &Record) -> bool {
        match &self.obstructs {
            Obstruction::Never => false,
            Obstruction::Equal => self.equals(new, existing),
            Obstruction::Conflicting(fields) => {
                same_fields(fields, existing, new) && !self.equals(new, existing)
            }
        }
    }

    fn satisfies(&self, existing: &Record, new: &Record) -> bool {
        match self.satisfies {
            Satisfaction::Never => false,
            Satisfaction::Equal => self.equals(new, existing),
        }
    }
}

type Predicate = Box<dyn Fn(&Record, &Record) -> bool + Send + Sync>;

/// A policy built from three closures.
///
/// ```
/// use opalstack_ensure::policy::{FnPolicy, ResourcePolicy};
///
/// // app names unique across the whole account, never reused
/// let policy = FnPolicy::new(
///     |a, b| a.get("name") == b.get("name"),
///     |existing, new| existing.get("name") == new.get("name"),
///     |_, _| false,
/// );
/// let app = serde_json::json!({"name": "blog"}).as_object().cloned().unwrap();
/// assert!(policy.obstructs(&app, &app));
/// ```
pub struct FnPolicy {
    equals: Predicate,
    obstructs: Predicate,
    satisfies: Predicate,
}

impl FnPolicy {
    pub fn new<E, O, S>(equals: E, obstructs: O, satisfies: S) -> Self
    where
        E: Fn(&Record, &Record) -> bool + Send + Sync + 'static,
        O: Fn(&Record, &Record) -> bool + Send + Sync + 'static,
        S: Fn(&Record, &Record) -> bool + Send + Sync + 'static,
    {
        Self {
            equals: Box::new(equals),
            obstructs: Box::new(obstructs),
            satisfies: Box::new(satisfies),
        }
    }
}

impl std::fmt::Debug for FnPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnPolicy").finish_non_exhaustive()
    }
}

impl ResourcePolicy for FnPolicy {
    fn equals(&self, a: &Record, b: &Record) -> bool {
        (self.equals)(a, b)
    }

    fn obstructs(&self, existing: &Record, new: &Record) -> bool {
        (self.obstructs)(existing, new)
    }

    fn satisfies(&self, existing: &Record, new: &Record) -> bool {
        (self.satisfies)(existing, new)
    }
}
