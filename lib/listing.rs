use std::cmp::Ordering;
use std::fmt;
use std::ops::Index;

use crate::handle::DirHandle;
use crate::record::DirRecord;

/// Predicate deciding whether a record is part of a [`Listing`].
pub type RecordFilter<'a> = &'a dyn Fn(&DirRecord) -> bool;

/// Total order used to sort a [`Listing`]. Must be free of side effects.
pub type RecordCompare<'a> = &'a dyn Fn(&DirRecord, &DirRecord) -> Ordering;

/// A filtered, sorted view over one snapshot, the bulk counterpart to [`DirHandle`].
///
/// The listing owns a handle for as long as it lives, so the records it yields stay valid until
/// the listing is dropped, even across an invalidation. Records are borrowed from the snapshot,
/// never copied.
pub struct Listing {
    handle: DirHandle,
    selected: Vec<usize>,
}

impl Listing {
    pub(crate) fn build(
        handle: DirHandle,
        filter: Option<RecordFilter<'_>>,
        compare: Option<RecordCompare<'_>>,
    ) -> Self {
        let records = handle.snapshot().records();
        let mut selected: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|&(_, record)| filter.is_none_or(|keep| keep(record)))
            .map(|(idx, _)| idx)
            .collect();
        if let Some(cmp) = compare {
            selected.sort_unstable_by(|&a, &b| cmp(&records[a], &records[b]));
        }
        Self { handle, selected }
    }

    /// Number of records that passed the filter.
    #[must_use]
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Whether no record passed the filter.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// The record at `idx` in listing order.
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&DirRecord> {
        let &at = self.selected.get(idx)?;
        self.handle.snapshot().records().get(at)
    }

    /// Iterate the records in listing order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &DirRecord> + '_ {
        let records = self.handle.snapshot().records();
        self.selected.iter().map(move |&at| &records[at])
    }

    /// The handle pinning the snapshot this listing reads from.
    #[must_use]
    pub fn handle(&self) -> &DirHandle {
        &self.handle
    }
}

impl Index<usize> for Listing {
    type Output = DirRecord;

    fn index(&self, idx: usize) -> &DirRecord {
        &self.handle.snapshot().records()[self.selected[idx]]
    }
}

impl<'a> IntoIterator for &'a Listing {
    type Item = &'a DirRecord;
    type IntoIter = Box<dyn ExactSizeIterator<Item = &'a DirRecord> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl fmt::Debug for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter().map(|r| &r.name)).finish()
    }
}

/// Byte-wise ascending order on entry names, like `alphasort(3)` in the C locale.
#[must_use]
pub fn alphasort(a: &DirRecord, b: &DirRecord) -> Ordering {
    a.name.cmp(&b.name)
}

/// Directories first, then everything else; names ascending within each group.
#[must_use]
pub fn by_kind_then_name(a: &DirRecord, b: &DirRecord) -> Ordering {
    b.is_dir()
        .cmp(&a.is_dir())
        .then_with(|| alphasort(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordKind;

    #[test]
    fn alphasort_orders_bytewise() {
        let upper = DirRecord::new("Zeta", RecordKind::File, 0);
        let lower = DirRecord::new("alpha", RecordKind::File, 0);
        assert_eq!(alphasort(&upper, &lower), Ordering::Less);
        assert_eq!(alphasort(&lower, &lower), Ordering::Equal);
    }

    #[test]
    fn directories_sort_before_files() {
        let file = DirRecord::new("a", RecordKind::File, 0);
        let dir = DirRecord::new("z", RecordKind::Directory, 0);
        assert_eq!(by_kind_then_name(&dir, &file), Ordering::Less);
        assert_eq!(by_kind_then_name(&file, &dir), Ordering::Greater);

        let other_dir = DirRecord::new("b", RecordKind::Directory, 0);
        assert_eq!(by_kind_then_name(&other_dir, &dir), Ordering::Less);
    }
}
