use std::collections::BTreeMap;

use crate::CONTROLLER_NAME;

/// Manage by label
pub const MANAGED_BY_LABEL_SELECTOR: &str = "managed-by=books-operator";

/// Labels that indicate the resource is managed by the books operator.
///
/// The owning Book is only recorded in the owner reference, Book names may exceed the 63
/// character limit of label values.
pub fn managed_labels() -> Option<BTreeMap<String, String>> {
    Some(BTreeMap::from_iter(vec![(
        "managed-by".to_owned(),
        CONTROLLER_NAME.to_owned(),
    )]))
}
