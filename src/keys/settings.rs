//! Keys for named user settings.

use super::{EntityId, QueryKey, Tag};

/// Setting controlling reduced motion (`"on"`, `"off"` or unset).
pub const REDUCE_MOTION: &str = "reduce_motion";

/// `[settings]`
pub fn all() -> QueryKey {
    QueryKey::root(Tag::Settings)
}

/// `[settings, name]`
pub fn detail(name: impl Into<EntityId>) -> QueryKey {
    all().child(name.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_detail_nests_under_all() {
        let key = detail(REDUCE_MOTION);
        assert_eq!(key.to_string(), "[settings, reduce_motion]");
        assert!(key.starts_with(&all()));
    }
}
