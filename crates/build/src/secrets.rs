//! Repository and credential secrets. Both use the `repository` secret-type
//! label and share the name derivation, so a repository and a credential with
//! the same URL and no explicit name resolve to the same Secret.

use rgo_config::{Credential, Repository};
use rgo_core::document::{Body, CredentialData, RepoType, RepositoryData, SecretAuth, LABEL_SECRET_TYPE};
use rgo_core::{Manifest, ResourceDocument};

use crate::resolve::{derive_name, ensure_git_suffix};
use crate::BuildContext;

const SECRET_TYPE_REPOSITORY: &str = "repository";

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.is_empty())
}

fn auth(ctx: &BuildContext, username: &Option<String>, password: &Option<String>, ssh_key: &Option<String>) -> SecretAuth {
    SecretAuth {
        username: non_empty(username).map(|u| ctx.resolve(u)),
        password: non_empty(password).map(|p| ctx.resolve(p)),
        ssh_private_key: non_empty(ssh_key).map(str::to_string),
    }
}

pub fn build_repo_secrets(repos: &[Repository], ctx: &BuildContext) -> Vec<Manifest> {
    repos
        .iter()
        .map(|r| {
            let name = derive_name(r.name.as_deref(), &r.url);
            let (url, repo_type, enable_oci) = match r.repo_type.to_ascii_lowercase().as_str() {
                "oci" => (r.url.clone(), RepoType::Helm, Some("true")),
                "helm" => (r.url.clone(), RepoType::Helm, None),
                _ => (ensure_git_suffix(&r.url), RepoType::Git, None),
            };
            let string_data = RepositoryData {
                url,
                repo_type,
                name: name.clone(),
                enable_oci,
                auth: auth(ctx, &r.username, &r.password, &r.ssh_key),
            };
            let meta = ctx.metadata(&name, &[(LABEL_SECRET_TYPE, SECRET_TYPE_REPOSITORY)]);
            Manifest::new(ResourceDocument::new(meta, Body::RepositorySecret { string_data }))
        })
        .collect()
}

/// Credentials are assumed to be Git-only; the URL is always git-normalized.
pub fn build_credential_secrets(creds: &[Credential], ctx: &BuildContext) -> Vec<Manifest> {
    creds
        .iter()
        .map(|c| {
            let name = derive_name(c.name.as_deref(), &c.url);
            let string_data = CredentialData {
                url: ensure_git_suffix(&c.url),
                auth: auth(ctx, &c.username, &c.password, &c.ssh_key),
            };
            let meta = ctx.metadata(&name, &[(LABEL_SECRET_TYPE, SECRET_TYPE_REPOSITORY)]);
            Manifest::new(ResourceDocument::new(meta, Body::CredentialSecret { string_data }))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> BuildContext {
        BuildContext::new("argo-cd")
            .with_created_at("20240101-000000")
            .with_env(|k| match k {
                "GIT_USERNAME" => Some("bot".to_string()),
                "GIT_PASSWORD" => Some("s3cret".to_string()),
                _ => None,
            })
    }

    fn repo(url: &str, repo_type: &str) -> Repository {
        Repository { url: url.into(), repo_type: repo_type.into(), ..Default::default() }
    }

    #[test]
    fn git_repository_is_normalized_and_labelled() {
        let mut r = repo("https://github.com/zcubbs/go-k8s", "");
        r.name = Some("demo-repo".into());
        let out = build_repo_secrets(&[r], &ctx());
        let v = out[0].document.to_json().unwrap();
        assert_eq!(v["kind"], "Secret");
        assert_eq!(v["metadata"]["name"], "demo-repo");
        assert_eq!(v["metadata"]["labels"]["argocd.argoproj.io/secret-type"], "repository");
        assert_eq!(v["metadata"]["labels"]["managed-by"], "rgo");
        assert_eq!(
            v["stringData"],
            json!({ "url": "https://github.com/zcubbs/go-k8s.git", "type": "git", "name": "demo-repo" })
        );
        assert_eq!(out[0].coordinates.plural, "secrets");
    }

    #[test]
    fn helm_and_oci_urls_are_untouched() {
        let out = build_repo_secrets(&[repo("https://charts.example.com", "helm"), repo("ghcr.io/acme/charts", "OCI")], &ctx());
        let helm = out[0].document.to_json().unwrap();
        assert_eq!(helm["stringData"]["url"], "https://charts.example.com");
        assert_eq!(helm["stringData"]["type"], "helm");
        assert!(helm["stringData"].get("enableOCI").is_none());

        let oci = out[1].document.to_json().unwrap();
        assert_eq!(oci["stringData"]["url"], "ghcr.io/acme/charts");
        assert_eq!(oci["stringData"]["type"], "helm");
        assert_eq!(oci["stringData"]["enableOCI"], "true");
        assert_eq!(oci["metadata"]["name"], "repo-ghcr.io-acme-charts");
    }

    #[test]
    fn credentials_resolve_placeholders() {
        let c = Credential {
            url: "https://github.com/".into(),
            username: Some("${GIT_USERNAME}".into()),
            password: Some("${GIT_PASSWORD}".into()),
            ssh_key: Some(String::new()),
            name: None,
        };
        let v = build_credential_secrets(&[c], &ctx())[0].document.to_json().unwrap();
        assert_eq!(v["metadata"]["name"], "repo-github.com-");
        assert_eq!(v["stringData"], json!({ "url": "https://github.com.git", "username": "bot", "password": "s3cret" }));
    }

    #[test]
    fn repository_placeholders_resolve_to_empty_when_unset() {
        let mut r = repo("https://git.local/r", "git");
        r.username = Some("${MISSING}".into());
        r.ssh_key = Some("-----BEGIN KEY-----".into());
        let v = build_repo_secrets(&[r], &ctx())[0].document.to_json().unwrap();
        assert_eq!(v["stringData"]["username"], "");
        assert_eq!(v["stringData"]["sshPrivateKey"], "-----BEGIN KEY-----");
    }

    #[test]
    fn same_url_without_name_collides() {
        let r = repo("https://github.com/acme/app", "git");
        let c = Credential { url: "https://github.com/acme/app".into(), ..Default::default() };
        let a = build_repo_secrets(&[r], &ctx());
        let b = build_credential_secrets(&[c], &ctx());
        assert_eq!(a[0].object_ref(), b[0].object_ref());
    }
}
