/// Source of raw configuration values, keyed by environment variable name.
pub(super) type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

#[must_use]
pub(super) fn read_non_empty(lookup: Lookup<'_>, name: &str) -> Option<String> {
    lookup(name)
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// First non-empty value among `names`, in order.
#[must_use]
pub(super) fn read_first_non_empty(lookup: Lookup<'_>, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| read_non_empty(lookup, name))
}

#[must_use]
pub(super) fn read_u16(lookup: Lookup<'_>, name: &str) -> Option<u16> {
    lookup(name).and_then(|raw| raw.trim().parse::<u16>().ok())
}

#[must_use]
pub(super) fn read_u64(lookup: Lookup<'_>, name: &str, default_value: u64, min_value: u64) -> u64 {
    lookup(name)
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|value| *value >= min_value)
        .unwrap_or(default_value)
}
