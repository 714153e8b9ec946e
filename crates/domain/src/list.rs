use serde::Serialize;

use crate::{ImageId, PerceptualHash};

/// One row of the browsable image list.
///
/// A `Group` always holds at least two `Single` entries; use
/// [`ListEntry::from_members`] to build entries so that invariant holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListEntry {
    Single(ImageId),
    Group(Vec<ListEntry>),
}

impl ListEntry {
    /// Collapses a run of ids into a `Single` or a `Group`. Returns `None` for an empty run.
    pub fn from_members(members: Vec<ImageId>) -> Option<Self> {
        match members.as_slice() {
            [] => None,
            [only] => Some(Self::Single(*only)),
            _ => Some(Self::Group(members.into_iter().map(Self::Single).collect())),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    /// Number of images this entry covers.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Group(members) => members.iter().map(Self::len).sum(),
        }
    }

    /// Only a hand-built `Group(vec![])` is empty; entries from [`ListEntry::from_members`]
    /// and [`ListBuilder`] always cover at least one image.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All image ids covered by this entry, in list order.
    pub fn ids(&self) -> Vec<ImageId> {
        let mut out = Vec::with_capacity(self.len());
        self.collect_ids(&mut out);
        out
    }

    fn collect_ids(&self, out: &mut Vec<ImageId>) {
        match self {
            Self::Single(id) => out.push(*id),
            Self::Group(members) => {
                for member in members {
                    member.collect_ids(out);
                }
            }
        }
    }
}

/// What happens to the run still open when the input ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrailingGroup {
    /// Emit the final run like any other.
    #[default]
    Flush,
    /// Discard the final run. Kept for parity with catalogs built by the legacy list view.
    Drop,
}

/// Clusters adjacent look-alike images into groups.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListBuilder {
    trailing: TrailingGroup,
}

impl ListBuilder {
    pub fn new(trailing: TrailingGroup) -> Self {
        Self { trailing }
    }

    pub fn trailing(&self) -> TrailingGroup {
        self.trailing
    }

    /// Walks `records` once, starting a new run whenever an image is not similar to the one
    /// right before it. Only consecutive pairs are compared, so a run may chain images whose
    /// ends are dissimilar.
    pub fn build<H, I>(&self, records: I) -> Vec<ListEntry>
    where
        H: PerceptualHash,
        I: IntoIterator<Item = (ImageId, H)>,
    {
        let mut records = records.into_iter();
        let Some((first_id, first_hash)) = records.next() else {
            return Vec::new();
        };

        let mut entries = Vec::new();
        let mut previous_hash = first_hash;
        let mut current_run = vec![first_id];

        for (id, hash) in records {
            if !hash.is_similar(&previous_hash) {
                let closed = std::mem::take(&mut current_run);
                entries.extend(ListEntry::from_members(closed));
            }
            current_run.push(id);
            previous_hash = hash;
        }

        if self.trailing == TrailingGroup::Flush {
            entries.extend(ListEntry::from_members(current_run));
        }

        entries
    }
}

/// Builds the list with the default [`TrailingGroup::Flush`] policy.
pub fn build_list<H, I>(records: I) -> Vec<ListEntry>
where
    H: PerceptualHash,
    I: IntoIterator<Item = (ImageId, H)>,
{
    ListBuilder::default().build(records)
}
