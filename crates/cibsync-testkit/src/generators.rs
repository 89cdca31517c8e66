//! Proptest generators for property-based testing.

use std::collections::BTreeMap;

use proptest::prelude::*;

use cibsync_core::document::attrs;
use cibsync_core::{CallOptions, Change, Diff, Document, VersionTriple};

/// Generate a version triple with realistic magnitudes.
pub fn version_triple() -> impl Strategy<Value = VersionTriple> {
    (0u64..4, 0u64..1_000, 0u64..10_000)
        .prop_map(|(admin_epoch, epoch, num_updates)| VersionTriple::new(admin_epoch, epoch, num_updates))
}

/// Generate an element or attribute name.
pub fn name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,15}".prop_map(String::from)
}

/// Generate a printable attribute value.
pub fn attr_value() -> impl Strategy<Value = String> {
    "[ -~]{0,24}".prop_map(String::from)
}

/// Generate an attribute map that never touches the version counters.
pub fn attributes() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map(name(), attr_value(), 0..6).prop_map(|mut map| {
        for reserved in [attrs::ADMIN_EPOCH, attrs::EPOCH, attrs::NUM_UPDATES] {
            map.remove(reserved);
        }
        map
    })
}

/// Generate an element subtree of bounded depth.
pub fn element() -> impl Strategy<Value = Document> {
    let leaf = (name(), attributes()).prop_map(|(name, attributes)| Document {
        name,
        attributes,
        children: Vec::new(),
    });
    leaf.prop_recursive(3, 24, 4, |inner| {
        (name(), attributes(), prop::collection::vec(inner, 0..4)).prop_map(
            |(name, attributes, children)| Document {
                name,
                attributes,
                children,
            },
        )
    })
}

/// Generate a whole document.
pub fn document() -> impl Strategy<Value = Document> {
    (version_triple(), attributes(), prop::collection::vec(element(), 0..4)).prop_map(
        |(version, attributes, children)| {
            let mut doc = Document::cib(version);
            doc.attributes.extend(attributes);
            doc.children = children;
            doc
        },
    )
}

/// Generate a root-level change that always applies.
pub fn change() -> impl Strategy<Value = Change> {
    prop_oneof![
        (name(), attr_value()).prop_map(|(name, value)| Change::SetAttribute { name, value }),
        name().prop_map(|name| Change::RemoveAttribute { name }),
        element().prop_map(Change::UpsertChild),
    ]
    .prop_filter("version counters are set by the diff itself", |c| match c {
        Change::SetAttribute { name, .. } | Change::RemoveAttribute { name } => {
            ![attrs::ADMIN_EPOCH, attrs::EPOCH, attrs::NUM_UPDATES].contains(&name.as_str())
        }
        _ => true,
    })
}

/// Generate a diff that applies on top of `from`.
pub fn diff_on(from: VersionTriple) -> impl Strategy<Value = Diff> {
    prop::collection::vec(change(), 0..6).prop_map(move |changes| Diff {
        from,
        to: from.next_update(),
        changes,
    })
}

/// Generate arbitrary call options.
pub fn call_options() -> impl Strategy<Value = CallOptions> {
    any::<u32>().prop_map(CallOptions)
}
