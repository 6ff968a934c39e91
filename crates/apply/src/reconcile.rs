//! Per-object reconciliation: get-then-create-or-update, and delete.
//!
//! The get/update pair is optimistic concurrency only. If someone writes the
//! object between our get and our update, the store rejects the stale token and
//! we surface the conflict; there is no retry.

use std::time::Instant;

use metrics::{counter, histogram};
use rgo_core::{Error, Manifest, ObjectRef, Op, ResourceStore, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::context::ExecContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Created,
    Updated,
    Deleted,
    /// Delete of an object that was already gone, under a policy that allows it.
    Absent,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Created => "created",
            Outcome::Updated => "updated",
            Outcome::Deleted => "deleted",
            Outcome::Absent => "absent",
        }
    }
}

/// Create the object if the store has none, otherwise update it carrying the
/// live resource version. Errors name the object.
pub async fn apply<S>(store: &S, manifest: &Manifest, ctx: &ExecContext) -> Result<Outcome>
where
    S: ResourceStore + ?Sized,
{
    let t0 = Instant::now();
    let target = manifest.object_ref();
    counter!("apply_attempts", 1u64);
    let res = apply_inner(store, manifest, ctx).await;
    histogram!("apply_latency_ms", t0.elapsed().as_secs_f64() * 1000.0);
    match res {
        Ok(outcome) => {
            match outcome {
                Outcome::Created => counter!("apply_created", 1u64),
                _ => counter!("apply_updated", 1u64),
            }
            info!(kind = %target.kind, ns = %target.namespace, name = %target.name, outcome = outcome.as_str(), "applied");
            Ok(outcome)
        }
        Err(e) => {
            counter!("apply_err", 1u64);
            warn!(kind = %target.kind, ns = %target.namespace, name = %target.name, error = %e, "apply failed");
            Err(e.at(Op::Apply, target))
        }
    }
}

async fn apply_inner<S>(store: &S, manifest: &Manifest, ctx: &ExecContext) -> Result<Outcome>
where
    S: ResourceStore + ?Sized,
{
    let coords = &manifest.coordinates;
    let name = manifest.document.name();
    match ctx.guard(store.get(coords, name)).await {
        Err(Error::NotFound(_)) => {
            debug!(name, "not found; creating");
            ctx.guard(store.create(coords, &manifest.document)).await?;
            Ok(Outcome::Created)
        }
        Err(e) => Err(e),
        Ok(live) => {
            debug!(name, rv = ?live.resource_version, "exists; updating");
            let mut doc = manifest.document.clone();
            doc.set_resource_version(live.resource_version);
            ctx.guard(store.update(coords, &doc)).await?;
            Ok(Outcome::Updated)
        }
    }
}

/// Delete the object. A missing object is reported as NotFound; whether that
/// is acceptable is the caller's call.
pub async fn delete<S>(store: &S, target: &ObjectRef, ctx: &ExecContext) -> Result<Outcome>
where
    S: ResourceStore + ?Sized,
{
    let coords = target.coordinates();
    match ctx.guard(store.delete(&coords, &target.name)).await {
        Ok(()) => {
            counter!("delete_ok", 1u64);
            info!(kind = %target.kind, ns = %target.namespace, name = %target.name, "deleted");
            Ok(Outcome::Deleted)
        }
        Err(e) => {
            counter!("delete_err", 1u64);
            debug!(kind = %target.kind, ns = %target.namespace, name = %target.name, error = %e, "delete failed");
            Err(e.at(Op::Delete, target.clone()))
        }
    }
}
