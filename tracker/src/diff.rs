//! Metadata diff engine
//!
//! Tracked lists are compared as ordered sequences: reordering the same tags
//! is a change. Missing metadata compares as empty lists. Nothing here fails.

use crate::model::{AiMetadata, RecordVersion};

/// Metadata fields subject to override auditing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedField {
    FrameworkTags,
    CapabilityGroups,
}

impl TrackedField {
    /// Diff order
    pub const ALL: [TrackedField; 2] = [Self::FrameworkTags, Self::CapabilityGroups];

    /// Dotted path recorded in the override ledger
    pub fn path(&self) -> &'static str {
        match self {
            Self::FrameworkTags => "ai_metadata.framework_tags",
            Self::CapabilityGroups => "ai_metadata.capability_groups",
        }
    }

    fn read<'a>(&self, meta: Option<&'a AiMetadata>) -> &'a [String] {
        match (self, meta) {
            (_, None) => &[],
            (Self::FrameworkTags, Some(m)) => &m.framework_tags,
            (Self::CapabilityGroups, Some(m)) => &m.capability_groups,
        }
    }
}

/// One changed tracked field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: TrackedField,
    pub old_value: Vec<String>,
    pub new_value: Vec<String>,
}

impl FieldChange {
    pub fn field_path(&self) -> &'static str {
        self.field.path()
    }
}

/// Compare two metadata snapshots field by field.
pub fn diff_ai_metadata(old: Option<&AiMetadata>, new: Option<&AiMetadata>) -> Vec<FieldChange> {
    TrackedField::ALL
        .iter()
        .filter_map(|field| {
            let before = field.read(old);
            let after = field.read(new);
            (before != after).then(|| FieldChange {
                field: *field,
                old_value: before.to_vec(),
                new_value: after.to_vec(),
            })
        })
        .collect()
}

/// Value of one compared field in a version comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Tags(Vec<String>),
}

/// A differing field between two versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChange {
    pub field_path: &'static str,
    pub base: FieldValue,
    pub compare: FieldValue,
}

/// Side-by-side comparison of two versions over the narrative fields plus
/// the tracked metadata lists. Identical versions yield an empty list.
pub fn compare_versions(base: &RecordVersion, compare: &RecordVersion) -> Vec<ContentChange> {
    let mut changes = Vec::new();

    let narrative = [
        (
            "business_problem",
            &base.content.business_problem,
            &compare.content.business_problem,
        ),
        (
            "description",
            &base.content.description,
            &compare.content.description,
        ),
    ];
    for (path, a, b) in narrative {
        if a != b {
            changes.push(ContentChange {
                field_path: path,
                base: FieldValue::Text(a.clone()),
                compare: FieldValue::Text(b.clone()),
            });
        }
    }

    changes.extend(
        diff_ai_metadata(
            base.content.ai_metadata.as_ref(),
            compare.content.ai_metadata.as_ref(),
        )
        .into_iter()
        .map(|c| ContentChange {
            field_path: c.field_path(),
            base: FieldValue::Tags(c.old_value),
            compare: FieldValue::Tags(c.new_value),
        }),
    );

    changes
}
