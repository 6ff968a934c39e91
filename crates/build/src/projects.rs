use rgo_config::Project;
use rgo_core::document::{AppProjectSpec, Body, Destination};
use rgo_core::{Manifest, ResourceDocument};

use crate::BuildContext;

pub fn build_projects(projects: &[Project], ctx: &BuildContext) -> Vec<Manifest> {
    projects
        .iter()
        .map(|p| {
            let spec = AppProjectSpec {
                description: p.description.clone(),
                source_repos: p.source_repos.clone(),
                destinations: p
                    .destinations
                    .iter()
                    .map(|d| Destination { server: d.server.clone(), namespace: d.namespace.clone() })
                    .collect(),
            };
            Manifest::new(ResourceDocument::new(ctx.metadata(&p.name, &[]), Body::AppProject { spec }))
        })
        .collect()
}
