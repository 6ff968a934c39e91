//! Batch driver: run the reconciler over an ordered object set.
//!
//! Objects are processed strictly in the given order, one at a time. The first
//! failure stops the batch; objects before it stay applied and nothing is
//! rolled back.

use std::time::Instant;

use metrics::histogram;
use rgo_core::{Manifest, ObjectRef, ResourceStore, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::context::ExecContext;
use crate::reconcile::{self, Outcome};
use crate::render::{render, OutputFormat};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub entries: Vec<(ObjectRef, Outcome)>,
}

impl BatchReport {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.entries.iter().filter(|(_, o)| *o == outcome).count()
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletePolicy {
    /// Treat an already-missing object as success.
    pub ignore_not_found: bool,
}

/// Dry-run path: render every manifest, no store access.
pub fn preview(manifests: &[Manifest], format: OutputFormat) -> Result<String> {
    render(manifests, format)
}

pub async fn apply_all<S>(store: &S, manifests: &[Manifest], ctx: &ExecContext) -> Result<BatchReport>
where
    S: ResourceStore + ?Sized,
{
    let t0 = Instant::now();
    let mut report = BatchReport::default();
    for m in manifests {
        match reconcile::apply(store, m, ctx).await {
            Ok(outcome) => report.entries.push((m.object_ref(), outcome)),
            Err(e) => {
                warn!(done = report.len(), total = manifests.len(), "apply batch stopped");
                return Err(e);
            }
        }
    }
    histogram!("batch_latency_ms", t0.elapsed().as_secs_f64() * 1000.0);
    info!(
        total = report.len(),
        created = report.count(Outcome::Created),
        updated = report.count(Outcome::Updated),
        "apply batch finished"
    );
    Ok(report)
}

pub async fn delete_all<S>(store: &S, targets: &[ObjectRef], policy: DeletePolicy, ctx: &ExecContext) -> Result<BatchReport>
where
    S: ResourceStore + ?Sized,
{
    let t0 = Instant::now();
    let mut report = BatchReport::default();
    for t in targets {
        match reconcile::delete(store, t, ctx).await {
            Ok(outcome) => report.entries.push((t.clone(), outcome)),
            Err(e) if policy.ignore_not_found && e.is_not_found() => {
                info!(kind = %t.kind, ns = %t.namespace, name = %t.name, "already absent");
                report.entries.push((t.clone(), Outcome::Absent));
            }
            Err(e) => {
                warn!(done = report.len(), total = targets.len(), "delete batch stopped");
                return Err(e);
            }
        }
    }
    histogram!("batch_latency_ms", t0.elapsed().as_secs_f64() * 1000.0);
    info!(total = report.len(), deleted = report.count(Outcome::Deleted), absent = report.count(Outcome::Absent), "delete batch finished");
    Ok(report)
}
