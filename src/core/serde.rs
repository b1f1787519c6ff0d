/*!
 * Serde Helpers
 * Skip predicates for compact serialized forms
 */

/// Skip serializing if flag is unset
#[inline]
pub const fn is_false(value: &bool) -> bool {
    !*value
}
