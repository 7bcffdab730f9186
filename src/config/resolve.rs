//! Template resolution for settings
//!
//! Placeholders use the `${name}` syntax. Names start with a letter or underscore, so
//! regex capture references such as `${1}` pass through untouched. Names prefixed with
//! `env.` are read from the process environment.

use crate::error::{ConfigError, ConfigResult};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::env;
use std::sync::OnceLock;

/// Resolved text larger than this is treated as runaway self-reference
const MAX_RESOLVED_LEN: usize = 1 << 20;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_.\-]*)\}").unwrap())
}

fn lookup(name: &str, settings: &BTreeMap<String, String>) -> Option<String> {
    if let Some(value) = settings.get(name) {
        return Some(value.clone());
    }
    name.strip_prefix("env.").and_then(|var| env::var(var).ok())
}

/// Resolve every placeholder in `template` to a fixed point
///
/// Substitution is repeated at most `settings.len() + 1` times; a template that still
/// carries placeholders after that can only be circular.
pub fn resolve(template: &str, settings: &BTreeMap<String, String>) -> ConfigResult<String> {
    let re = placeholder_regex();
    let bound = settings.len() + 1;
    let mut current = template.to_string();

    for _ in 0..=bound {
        if !re.is_match(&current) {
            return Ok(current);
        }

        let mut missing: Option<String> = None;
        let next = re
            .replace_all(&current, |caps: &Captures| {
                let name = &caps[1];
                match lookup(name, settings) {
                    Some(value) => value,
                    None => {
                        missing.get_or_insert_with(|| name.to_string());
                        caps[0].to_string()
                    }
                }
            })
            .into_owned();

        if let Some(reference) = missing {
            return Err(ConfigError::UnresolvedReference {
                reference,
                template: template.to_string(),
            });
        }
        if next.len() > MAX_RESOLVED_LEN {
            break;
        }
        current = next;
    }

    Err(ConfigError::CyclicReference(template.to_string()))
}

/// Resolve every value of a settings map against the map itself
pub fn resolve_all(settings: &BTreeMap<String, String>) -> ConfigResult<BTreeMap<String, String>> {
    settings
        .iter()
        .map(|(key, value)| Ok((key.clone(), resolve(value, settings)?)))
        .collect()
}

/// Resolve a list of templates
pub fn resolve_list(
    list: &[String],
    settings: &BTreeMap<String, String>,
) -> ConfigResult<Vec<String>> {
    list.iter().map(|s| resolve(s, settings)).collect()
}

/// Resolve every value of a map
pub fn resolve_map(
    map: &BTreeMap<String, String>,
    settings: &BTreeMap<String, String>,
) -> ConfigResult<BTreeMap<String, String>> {
    map.iter()
        .map(|(key, value)| Ok((key.clone(), resolve(value, settings)?)))
        .collect()
}

/// Placeholder names still present in `text`
pub fn placeholders(text: &str) -> Vec<String> {
    placeholder_regex()
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_simple_resolution() {
        let s = settings(&[("distPath", "dist/")]);
        assert_eq!(resolve("${distPath}styles.css", &s).unwrap(), "dist/styles.css");
    }

    #[test]
    fn test_nested_resolution() {
        let s = settings(&[
            ("scssPath", "scss/"),
            ("scssIncludePath", "${scssPath}scss/"),
            ("scssIncludeFiles", "${scssIncludePath}**/*.scss"),
        ]);
        assert_eq!(
            resolve("${scssIncludeFiles}", &s).unwrap(),
            "scss/scss/**/*.scss"
        );
    }

    #[test]
    fn test_resolve_all_leaves_no_placeholders() {
        let s = settings(&[
            ("a", "${b}/${c}"),
            ("b", "${c}-x"),
            ("c", "root"),
            ("d", "plain"),
        ]);
        let resolved = resolve_all(&s).unwrap();
        assert_eq!(resolved["a"], "root-x/root");
        for value in resolved.values() {
            assert!(placeholders(value).is_empty());
        }
    }

    #[test]
    fn test_unknown_reference() {
        let s = settings(&[("a", "1")]);
        let result = resolve("${missing}/x", &s);
        assert!(matches!(
            result,
            Err(ConfigError::UnresolvedReference { ref reference, .. }) if reference == "missing"
        ));
    }

    #[test]
    fn test_cyclic_reference() {
        let s = settings(&[("a", "${b}"), ("b", "${a}")]);
        assert!(matches!(
            resolve("${a}", &s),
            Err(ConfigError::CyclicReference(_))
        ));
    }

    #[test]
    fn test_self_reference_growth_is_cyclic() {
        let s = settings(&[("a", "${a}${a}")]);
        assert!(matches!(
            resolve("${a}", &s),
            Err(ConfigError::CyclicReference(_))
        ));
    }

    #[test]
    fn test_capture_references_untouched() {
        let s = settings(&[("pkg.name", "widget")]);
        assert_eq!(resolve("${1}${pkg.name}", &s).unwrap(), "${1}widget");
        assert_eq!(resolve("$1 and ${}", &s).unwrap(), "$1 and ${}");
    }

    #[test]
    fn test_environment_prefix() {
        env::set_var("ASSETRUN_RESOLVE_TEST", "from-env");
        let s = BTreeMap::new();
        assert_eq!(
            resolve("${env.ASSETRUN_RESOLVE_TEST}", &s).unwrap(),
            "from-env"
        );
        env::remove_var("ASSETRUN_RESOLVE_TEST");
        assert!(resolve("${env.ASSETRUN_RESOLVE_TEST}", &s).is_err());
    }

    #[test]
    fn test_resolution_is_stable() {
        let s = settings(&[("a", "${b}"), ("b", "x")]);
        let first = resolve("${a}-${b}", &s).unwrap();
        let second = resolve(&first, &s).unwrap();
        assert_eq!(first, second);
    }
}
