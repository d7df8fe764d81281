//! Computes which existing records to keep, which to delete and which
//! needed records to create.

use crate::error::{EnsureError, RecordSet, Result};
use crate::policy::ResourcePolicy;
use crate::record::Record;
use crate::set;
use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Plan {
    /// Existing records kept as they are.
    pub retain: Vec<Record>,
    /// Existing records to remove.
    pub delete: Vec<Record>,
    /// Needed records to create.
    pub create: Vec<Record>,
}

impl Plan {
    /// Whether applying the plan would change nothing.
    pub fn is_noop(&self) -> bool {
        self.delete.is_empty() && self.create.is_empty()
    }
}

/// Fail if two records of the same set obstruct each other.
///
/// Records equal under the policy are the same element and are not
/// compared with each other, nor is a record compared with itself.
pub fn validate<P>(policy: &P, items: &[Record], which: RecordSet) -> Result<()>
where
    P: ResourcePolicy + ?Sized,
{
    for (i, a) in items.iter().enumerate() {
        for (j, b) in items.iter().enumerate() {
            if i != j && !policy.equals(a, b) && policy.obstructs(b, a) {
                return Err(EnsureError::InvariantViolation {
                    set: which,
                    existing: Value::Object(b.clone()),
                    new: Value::Object(a.clone()),
                });
            }
        }
    }
    Ok(())
}

/// Plan the operations turning `existing` into `needed`.
///
/// Existing records that obstruct, or are obstructed by, a needed record
/// are deleted. Needed records not satisfied by a surviving existing
/// record are created. With `purge`, existing records satisfying none of
/// the needed ones are deleted as well.
pub fn plan<P>(existing: &[Record], needed: &[Record], policy: &P, purge: bool) -> Result<Plan>
where
    P: ResourcePolicy + ?Sized,
{
    validate(policy, existing, RecordSet::Existing)?;
    validate(policy, needed, RecordSet::Needed)?;

    let mut retain = existing.to_vec();
    let mut delete = Vec::new();
    let mut create = Vec::new();

    // existing records made redundant by another existing record
    let mut i = 0;
    while i < retain.len() {
        let x = &retain[i];
        let redundant = retain
            .iter()
            .enumerate()
            .any(|(j, y)| j != i && !policy.equals(x, y) && policy.satisfies(y, x));
        if redundant {
            let x = retain.remove(i);
            set::add(policy, &mut delete, x);
        } else {
            i += 1;
        }
    }

    for a in needed {
        take_into(policy, &mut retain, &mut delete, |b| {
            policy.obstructs(a, b) || policy.obstructs(b, a)
        });
    }

    // only after every obstruction is gone, so a satisfier can't vanish later
    for a in needed {
        if !retain.iter().any(|b| policy.satisfies(b, a)) {
            set::add(policy, &mut create, a.clone());
        }
    }

    if purge {
        take_into(policy, &mut retain, &mut delete, |b| {
            !needed.iter().any(|a| policy.satisfies(b, a))
        });
    }

    Ok(Plan {
        retain,
        delete,
        create,
    })
}

/// Move the retained records matching `pred` to `delete`.
///
/// Records leave `retain` by position, not by `equals`: a record missing a
/// compared field equals nothing, yet must still leave exactly once.
fn take_into<P, F>(policy: &P, retain: &mut Vec<Record>, delete: &mut Vec<Record>, pred: F)
where
    P: ResourcePolicy + ?Sized,
    F: Fn(&Record) -> bool,
{
    let (taken, kept): (Vec<Record>, Vec<Record>) =
        std::mem::take(retain).into_iter().partition(|b| pred(b));
    *retain = kept;
    for b in taken {
        set::add(policy, delete, b);
    }
}
