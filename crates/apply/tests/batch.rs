#![forbid(unsafe_code)]

use std::time::Duration;

use rgo_apply::memory::{Fault, MemoryStore, Verb};
use rgo_apply::{apply_all, delete_all, preview, DeletePolicy, ExecContext, Outcome, OutputFormat};
use rgo_build::{build_all, BuildContext};
use rgo_config::Config;
use rgo_core::{Error, Manifest, ObjectRef, ResourceKind};

const CONFIG: &str = r#"
projects:
  - name: proj
repositories:
  - url: https://github.com/acme/app
    name: app-repo
applications:
  - name: app
    project: proj
    sourceRepoURL: https://github.com/acme/app
    sourcePath: deploy
    syncPolicy: automated
"#;

fn manifests(yaml: &str) -> Vec<Manifest> {
    let cfg = Config::from_yaml_str(yaml).unwrap();
    build_all(&cfg, &BuildContext::new("argo-cd").with_created_at("20240101-000000").with_env(|_| None))
}

#[tokio::test]
async fn applies_in_order() {
    let store = MemoryStore::new();
    let (ctx, _h) = ExecContext::with_timeout(Duration::from_secs(5));
    let report = apply_all(&store, &manifests(CONFIG), &ctx).await.unwrap();

    assert_eq!(report.count(Outcome::Created), 3);
    let order: Vec<_> = store.calls().into_iter().filter(|c| c.verb == Verb::Create).map(|c| c.plural).collect();
    assert_eq!(order, vec!["appprojects", "secrets", "applications"]);

    let again = apply_all(&store, &manifests(CONFIG), &ctx).await.unwrap();
    assert_eq!(again.count(Outcome::Updated), 3);
}

#[tokio::test]
async fn second_failure_stops_batch() {
    let store = MemoryStore::new();
    let (ctx, _h) = ExecContext::new();
    store.fail(Verb::Create, "app-repo", Fault::Transport);

    let e = apply_all(&store, &manifests(CONFIG), &ctx).await.unwrap_err();
    assert_eq!(store.writes(), 2);
    assert_eq!(store.count(Verb::Get), 2);
    assert!(store.calls().iter().all(|c| c.name != "app"));
    assert_eq!(e.target(), Some(&ObjectRef::new(ResourceKind::Secret, "argo-cd", "app-repo")));
    assert!(e.to_string().contains("Secret argo-cd/app-repo"), "e={}", e);
    // first object stays applied
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn cancelled_batch_attempts_nothing_more() {
    let store = MemoryStore::new();
    let (ctx, handle) = ExecContext::new();
    handle.cancel();
    let e = apply_all(&store, &manifests(CONFIG), &ctx).await.unwrap_err();
    assert!(matches!(e.root(), Error::Cancelled), "e={}", e);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn deadline_mid_batch_keeps_earlier_objects() {
    let store = MemoryStore::new();
    let (ctx, _h) = ExecContext::with_timeout(Duration::from_millis(100));
    store.fail(Verb::Get, "app-repo", Fault::Hang);

    let e = apply_all(&store, &manifests(CONFIG), &ctx).await.unwrap_err();
    assert!(matches!(e.root(), Error::DeadlineExceeded), "e={}", e);
    assert_eq!(e.target().map(|t| t.name.as_str()), Some("app-repo"));
    // project applied, repo secret never written, application never attempted
    assert_eq!(store.len(), 1);
    assert_eq!(store.count(Verb::Create), 1);
    assert!(store.calls().iter().all(|c| c.name != "app"));
}

#[tokio::test]
async fn delete_batch_honours_not_found_policy() {
    let store = MemoryStore::new();
    let (ctx, _h) = ExecContext::new();
    let built = manifests(CONFIG);
    apply_all(&store, &built[..1], &ctx).await.unwrap();

    let mut targets: Vec<_> = built.iter().map(Manifest::object_ref).collect();
    targets.reverse();

    let strict = delete_all(&store, &targets, DeletePolicy::default(), &ctx).await.unwrap_err();
    assert!(strict.is_not_found());
    assert_eq!(strict.target().map(|t| t.name.as_str()), Some("app"));
    assert_eq!(store.len(), 1);

    let report = delete_all(&store, &targets, DeletePolicy { ignore_not_found: true }, &ctx).await.unwrap();
    assert_eq!(report.count(Outcome::Absent), 2);
    assert_eq!(report.count(Outcome::Deleted), 1);
    assert!(store.is_empty());
}

#[test]
fn dry_run_json_renders_one_line_per_object() {
    assert_eq!(preview(&manifests(""), OutputFormat::Json).unwrap(), "");

    let one = preview(&manifests("projects: [{ name: solo }]\n"), OutputFormat::Json).unwrap();
    assert_eq!(one.lines().count(), 1);
    assert!(one.contains(r#""kind":"AppProject""#), "one={}", one);
    assert!(one.contains(r#""name":"solo""#), "one={}", one);
    let v: serde_json::Value = serde_json::from_str(one.trim()).unwrap();
    assert_eq!(v["metadata"]["namespace"], "argo-cd");
}

#[test]
fn dry_run_yaml_is_multi_document() {
    let out = preview(&manifests(CONFIG), OutputFormat::Yaml).unwrap();
    assert_eq!(out.matches("---\n").count(), 3);
    assert!(out.contains("kind: Application\n"), "out={}", out);
    assert!(out.contains("selfHeal: true"), "out={}", out);
    assert!(out.contains("url: https://github.com/acme/app.git"), "out={}", out);
}
