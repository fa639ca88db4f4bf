//! Path and entity resolution
//!
//! Maps short resource aliases (`optionTypes`, `option-types`,
//! `library/option-types`) to canonical API paths and derives the
//! resource-type name used as the payload wrapper key.

/// Root every relative alias is placed under.
pub const API_ROOT: &str = "/api/";

/// Collections that live under a prefix group.
const PREFIX_GROUPS: &[(&str, &[&str])] = &[(
    "library/",
    &[
        "instance-types",
        "layouts",
        "container-types",
        "container-templates",
        "container-scripts",
        "cluster-layouts",
        "option-types",
        "option-type-lists",
        "spec-templates",
    ],
)];

/// Irregular entity names.
const ENTITY_OVERRIDES: &[(&str, &str)] = &[("executeSchedules", "schedules")];

/// Fields a declaration must carry, by canonical path (name/id is checked separately).
const REQUIRED_FIELDS: &[(&str, &[&str])] = &[
    ("/api/library/option-types", &["type", "fieldName", "fieldLabel"]),
    ("/api/library/option-type-lists", &["type"]),
];

/// Resolve an alias to its canonical API path.
///
/// Absolute paths pass through. Otherwise a mixedCase first segment is
/// converted to kebab-case, a prefix group is prepended when the segment
/// belongs to one, and the result is placed under [`API_ROOT`].
///
/// ```
/// use deploygraph::paths::resolve_path;
///
/// assert_eq!(resolve_path("optionTypes"), "/api/library/option-types");
/// assert_eq!(resolve_path("tasks/12"), "/api/tasks/12");
/// assert_eq!(resolve_path("/api/whatever"), "/api/whatever");
/// ```
pub fn resolve_path(alias: &str) -> String {
    if alias.starts_with('/') {
        return alias.to_string();
    }

    let mut parts: Vec<String> = alias.split('/').map(str::to_string).collect();
    if is_mixed_case(&parts[0]) {
        parts[0] = kebab_case(&parts[0]);
    }
    if let Some(prefix) = prefix_for(&parts[0]) {
        parts[0] = format!("{prefix}{}", parts[0]);
    }

    format!("{API_ROOT}{}", parts.join("/"))
}

/// Derive the resource-type name from a path.
///
/// `explicit` wins when given. Otherwise the last path segment (query
/// stripped) is camel-cased: `/api/library/option-types` → `optionTypes`.
/// `singular` strips one trailing `s`.
pub fn resolve_entity_name(path: &str, explicit: Option<&str>, singular: bool) -> String {
    let mut entity = match explicit {
        Some(entity) => entity.to_string(),
        None => camel_case_last_segment(path),
    };

    if let Some((_, replacement)) = ENTITY_OVERRIDES.iter().find(|(from, _)| *from == entity) {
        entity = (*replacement).to_string();
    }

    if singular {
        singularize(&entity).to_string()
    } else {
        entity
    }
}

/// Strip exactly one trailing `s`.
pub fn singularize(entity: &str) -> &str {
    entity.strip_suffix('s').unwrap_or(entity)
}

/// Add a trailing `s` unless one is already there.
pub fn pluralize(alias: &str) -> String {
    if alias.ends_with('s') {
        alias.to_string()
    } else {
        format!("{alias}s")
    }
}

/// Required fields for declarations targeting `canonical_path`.
pub fn required_fields(canonical_path: &str) -> Option<&'static [&'static str]> {
    REQUIRED_FIELDS
        .iter()
        .find(|(path, _)| *path == canonical_path)
        .map(|(_, fields)| *fields)
}

fn prefix_for(segment: &str) -> Option<&'static str> {
    PREFIX_GROUPS
        .iter()
        .find(|(_, members)| members.contains(&segment))
        .map(|(prefix, _)| *prefix)
}

/// Neither all-lower nor all-upper, and not already hyphenated.
fn is_mixed_case(segment: &str) -> bool {
    if segment.contains('-') {
        return false;
    }
    let has_cased = segment.chars().any(char::is_alphabetic);
    let all_lower = has_cased && !segment.chars().any(char::is_uppercase);
    let all_upper = has_cased && !segment.chars().any(char::is_lowercase);
    !all_lower && !all_upper
}

fn kebab_case(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len() + 4);
    for (i, c) in segment.chars().enumerate() {
        if i > 0 && c.is_uppercase() {
            out.push('-');
        }
        out.extend(c.to_lowercase());
    }
    out
}

fn camel_case_last_segment(path: &str) -> String {
    let without_query = path.split('?').next().unwrap_or_default();
    let last = without_query.rsplit('/').next().unwrap_or_default();
    let mut words = last.split('-');

    let mut entity = words.next().unwrap_or_default().to_lowercase();
    for word in words {
        entity.push_str(&title_case(word));
    }
    entity
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
