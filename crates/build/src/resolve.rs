//! Deterministic name/value helpers used by the builders.

const MAX_DERIVED_NAME_CHARS: usize = 50;

/// Explicit name wins verbatim; otherwise derive one from the URL.
///
/// Two records with the same URL and no name get the same secret name, so the
/// one applied last overwrites the other.
pub fn derive_name(explicit: Option<&str>, url: &str) -> String {
    match explicit {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => secret_name_from_url(url),
    }
}

/// `https://GitHub.com/Org/Repo` -> `repo-github.com-org-repo`
pub fn secret_name_from_url(url: &str) -> String {
    let lower = url.to_lowercase();
    let without_scheme = match lower.split_once("://") {
        Some((_, rest)) => rest,
        None => lower.as_str(),
    };
    let name: String = without_scheme
        .chars()
        .map(|c| if matches!(c, '/' | ':' | '@') { '-' } else { c })
        .take(MAX_DERIVED_NAME_CHARS)
        .collect();
    format!("repo-{}", name)
}

/// Append `.git` to http(s) URLs that lack it; one trailing `/` is dropped first.
pub fn ensure_git_suffix(url: &str) -> String {
    let lower = url.to_ascii_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return url.to_string();
    }
    let trimmed = url.strip_suffix('/').unwrap_or(url);
    if trimmed.ends_with(".git") {
        trimmed.to_string()
    } else {
        format!("{}.git", trimmed)
    }
}

/// Single left-to-right pass. Unset variables become empty; substituted text is
/// not scanned again. A `${` without a closing `}` ends resolution and the rest
/// of the input is kept as is.
pub fn resolve_env_placeholders_with<F>(s: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else { break };
        out.push_str(&rest[..start]);
        out.push_str(&lookup(&after[..end]).unwrap_or_default());
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn placeholders_resolve_left_to_right() {
        let both = env(&[("A", "foo"), ("B", "bar")]);
        assert_eq!(resolve_env_placeholders_with("${A}-${B}", &both), "foo-bar");
        let only_b = env(&[("B", "bar")]);
        assert_eq!(resolve_env_placeholders_with("${A}-${B}", &only_b), "-bar");
        assert_eq!(resolve_env_placeholders_with("plain", &only_b), "plain");
    }

    #[test]
    fn unterminated_placeholder_is_left_alone() {
        let e = env(&[("A", "foo"), ("UNTERMINATED", "x")]);
        assert_eq!(resolve_env_placeholders_with("${UNTERMINATED", &e), "${UNTERMINATED");
        assert_eq!(resolve_env_placeholders_with("${A}:${B", &e), "foo:${B");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let e = env(&[("A", "${A}")]);
        assert_eq!(resolve_env_placeholders_with("x${A}y", &e), "x${A}y");
    }

    #[test]
    fn git_suffix_only_for_http() {
        assert_eq!(ensure_git_suffix("https://github.com/acme/repo"), "https://github.com/acme/repo.git");
        assert_eq!(ensure_git_suffix("https://github.com/acme/repo/"), "https://github.com/acme/repo.git");
        assert_eq!(ensure_git_suffix("http://git.local/repo.git"), "http://git.local/repo.git");
        assert_eq!(ensure_git_suffix("git@github.com:acme/repo"), "git@github.com:acme/repo");
        assert_eq!(ensure_git_suffix("oci://ghcr.io/acme"), "oci://ghcr.io/acme");
    }

    #[test]
    fn git_suffix_is_idempotent() {
        for url in ["https://github.com/acme/repo", "https://github.com/acme/repo.git/", "https://example.com/"] {
            let once = ensure_git_suffix(url);
            assert_eq!(ensure_git_suffix(&once), once);
            assert!(once.ends_with(".git") && !once.ends_with(".git.git"), "once={}", once);
        }
    }

    #[test]
    fn derived_names_follow_url() {
        assert_eq!(derive_name(Some("demo-repo"), "https://github.com/x"), "demo-repo");
        assert_eq!(derive_name(None, "https://GitHub.com/Acme/Repo"), "repo-github.com-acme-repo");
        assert_eq!(derive_name(Some(""), "ssh://git@host:22/r"), "repo-git-host-22-r");
        assert_eq!(derive_name(Some(" demo "), "https://github.com/x"), " demo ");
        assert_eq!(derive_name(None, "https://a"), derive_name(None, "https://a"));

        let long = format!("https://example.com/{}", "a".repeat(80));
        let name = derive_name(None, &long);
        assert_eq!(name.len(), "repo-".len() + 50);
        assert!(name.starts_with("repo-example.com-aaa"));
    }
}
