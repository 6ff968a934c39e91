use rgo_config::Application;
use rgo_core::document::{
    ApplicationSource, ApplicationSpec, Automated, Body, Destination, GitSource, HelmParams, HelmSource, OciChartSource,
    SyncPolicy, ValuesRefSource,
};
use rgo_core::{Manifest, ResourceDocument};

use crate::BuildContext;

const VALUES_REF: &str = "values";

pub fn build_applications(apps: &[Application], ctx: &BuildContext) -> Vec<Manifest> {
    apps.iter()
        .map(|a| {
            let spec = ApplicationSpec {
                project: a.project.clone(),
                destination: Destination { server: a.destination_server.clone(), namespace: a.destination_namespace.clone() },
                source: source_for(a),
                sync_policy: sync_policy_for(a),
            };
            Manifest::new(ResourceDocument::new(ctx.metadata(&a.name, &[]), Body::Application { spec }))
        })
        .collect()
}

fn sync_policy_for(a: &Application) -> SyncPolicy {
    SyncPolicy { automated: a.is_automated().then_some(Automated { prune: true, self_heal: true }) }
}

fn source_for(a: &Application) -> ApplicationSource {
    let chart_revision = a.chart_version.clone().filter(|v| !v.is_empty()).unwrap_or_else(|| a.target_revision().to_string());
    match (a.is_helm, a.is_oci) {
        (true, true) => ApplicationSource::OciHelm {
            sources: (
                OciChartSource {
                    repo_url: a.source_repo_url.clone(),
                    chart: a.chart_name().unwrap_or_default().to_string(),
                    target_revision: chart_revision,
                    helm: HelmParams { value_files: a.value_files.iter().map(|f| values_ref_path(f)).collect() },
                },
                ValuesRefSource {
                    repo_url: a.values_repo_url.clone().unwrap_or_default(),
                    target_revision: a.target_revision().to_string(),
                    reference: VALUES_REF.to_string(),
                },
            ),
        },
        (true, false) => {
            let chart = a.chart_name().map(str::to_string);
            let path = if chart.is_none() { Some(a.source_path.clone()) } else { None };
            ApplicationSource::Helm {
                source: HelmSource {
                    repo_url: a.source_repo_url.clone(),
                    chart,
                    path,
                    target_revision: chart_revision,
                    helm: HelmParams { value_files: a.value_files.clone() },
                },
            }
        }
        // isOCI without isHelm has no chart to pull and falls back to Git.
        _ => ApplicationSource::Git {
            source: GitSource {
                repo_url: a.source_repo_url.clone(),
                path: a.source_path.clone(),
                target_revision: a.target_revision().to_string(),
            },
        },
    }
}

/// Values files of an OCI chart are read through the `$values` source.
fn values_ref_path(file: &str) -> String {
    if file.starts_with('$') {
        file.to_string()
    } else {
        format!("${}/{}", VALUES_REF, file.trim_start_matches('/'))
    }
}
