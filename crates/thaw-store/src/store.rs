//! Keyed field storage with ownership, shape and epoch metadata.

use indexmap::IndexMap;
use thaw_core::{CompositeSpace, Epoch, FieldKey, IoFlags};

use crate::error::StoreError;
use crate::vector::CompositeVector;

/// How a caller declares interest in a field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Claim {
    /// The named writer will produce this field.
    Owner(String),
    /// The caller only reads the field.
    Reader,
}

/// A declared field: its data plus metadata.
#[derive(Clone, Debug)]
pub struct FieldRecord {
    space: CompositeSpace,
    owner: Option<String>,
    data: Option<CompositeVector>,
    epoch: Epoch,
    io: IoFlags,
}

impl FieldRecord {
    /// Discretisation shape fixed by the first declaration.
    pub fn space(&self) -> &CompositeSpace {
        &self.space
    }

    /// Writer of this field, once claimed.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Change epoch of the stored value.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Visualisation and checkpoint flags.
    pub fn io_flags(&self) -> IoFlags {
        self.io
    }

    /// Whether the data is currently checked out.
    pub fn is_checked_out(&self) -> bool {
        self.data.is_none()
    }
}

/// Field store of one simulation state.
///
/// Fields are kept in declaration order, so iteration (for visualisation
/// or checkpointing) is deterministic.
#[derive(Clone, Debug, Default)]
pub struct FieldStore {
    fields: IndexMap<FieldKey, FieldRecord>,
}

impl FieldStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `key` on `space`, zero-filling its data on first declaration.
    ///
    /// Idempotent: repeated declarations with the same shape succeed, and
    /// an owner may claim its key any number of times. Fails with
    /// [`StoreError::ShapeMismatch`] if `space` disagrees with the shape on
    /// record and [`StoreError::DuplicateOwner`] if a different owner
    /// already holds the key.
    pub fn require(
        &mut self,
        key: &FieldKey,
        space: &CompositeSpace,
        claim: Claim,
    ) -> Result<(), StoreError> {
        let record = self
            .fields
            .entry(key.clone())
            .or_insert_with(|| FieldRecord {
                space: space.clone(),
                owner: None,
                data: Some(CompositeVector::new(space.clone())),
                epoch: Epoch::ZERO,
                io: IoFlags::default(),
            });
        if record.space != *space {
            return Err(StoreError::ShapeMismatch {
                key: key.clone(),
                expected: record.space.clone(),
                found: space.clone(),
            });
        }
        if let Claim::Owner(name) = claim {
            match &record.owner {
                Some(first) if *first != name => {
                    return Err(StoreError::DuplicateOwner {
                        key: key.clone(),
                        first: first.clone(),
                        second: name,
                    });
                }
                Some(_) => {}
                None => record.owner = Some(name),
            }
        }
        Ok(())
    }

    fn record(&self, key: &FieldKey) -> Result<&FieldRecord, StoreError> {
        self.fields
            .get(key)
            .ok_or_else(|| StoreError::NotFound { key: key.clone() })
    }

    fn record_mut(&mut self, key: &FieldKey) -> Result<&mut FieldRecord, StoreError> {
        self.fields
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound { key: key.clone() })
    }

    fn check_writer(record: &FieldRecord, key: &FieldKey, writer: &str) -> Result<(), StoreError> {
        if record.owner.as_deref() == Some(writer) {
            Ok(())
        } else {
            Err(StoreError::NotWritable {
                key: key.clone(),
                owner: record.owner.clone(),
                writer: writer.to_string(),
            })
        }
    }

    /// Whether `key` has been declared.
    pub fn contains(&self, key: &FieldKey) -> bool {
        self.fields.contains_key(key)
    }

    /// Metadata and data of a declared field.
    pub fn record_of(&self, key: &FieldKey) -> Result<&FieldRecord, StoreError> {
        self.record(key)
    }

    /// Current value of `key`.
    pub fn get(&self, key: &FieldKey) -> Result<&CompositeVector, StoreError> {
        self.record(key)?
            .data
            .as_ref()
            .ok_or_else(|| StoreError::CheckedOut { key: key.clone() })
    }

    /// Mutable value of `key`, for its owner only.
    ///
    /// The store does not touch the epoch; the caller stamps it with
    /// [`set_epoch`](Self::set_epoch) once the write is complete.
    pub fn get_mut(&mut self, key: &FieldKey, writer: &str) -> Result<&mut CompositeVector, StoreError> {
        let record = self.record_mut(key)?;
        Self::check_writer(record, key, writer)?;
        record
            .data
            .as_mut()
            .ok_or_else(|| StoreError::CheckedOut { key: key.clone() })
    }

    /// Take the value of `key` out of the store for writing.
    ///
    /// Until [`restore`](Self::restore)d, reads of `key` fail with
    /// [`StoreError::CheckedOut`].
    pub fn checkout(&mut self, key: &FieldKey, writer: &str) -> Result<CompositeVector, StoreError> {
        let record = self.record_mut(key)?;
        Self::check_writer(record, key, writer)?;
        record
            .data
            .take()
            .ok_or_else(|| StoreError::CheckedOut { key: key.clone() })
    }

    /// Put back a value taken by [`checkout`](Self::checkout).
    pub fn restore(&mut self, key: &FieldKey, value: CompositeVector) -> Result<(), StoreError> {
        let record = self.record_mut(key)?;
        if record.space != *value.space() {
            return Err(StoreError::ShapeMismatch {
                key: key.clone(),
                expected: record.space.clone(),
                found: value.space().clone(),
            });
        }
        record.data = Some(value);
        Ok(())
    }

    /// Change epoch of `key`.
    pub fn epoch(&self, key: &FieldKey) -> Result<Epoch, StoreError> {
        Ok(self.record(key)?.epoch)
    }

    /// Record that `key` now holds a value of `epoch`.
    pub fn set_epoch(&mut self, key: &FieldKey, epoch: Epoch) -> Result<(), StoreError> {
        self.record_mut(key)?.epoch = epoch;
        Ok(())
    }

    /// Shape of `key`.
    pub fn space(&self, key: &FieldKey) -> Result<&CompositeSpace, StoreError> {
        Ok(&self.record(key)?.space)
    }

    /// Owner of `key`, if claimed.
    pub fn owner(&self, key: &FieldKey) -> Result<Option<&str>, StoreError> {
        Ok(self.record(key)?.owner())
    }

    /// IO flags of `key`.
    pub fn io_flags(&self, key: &FieldKey) -> Result<IoFlags, StoreError> {
        Ok(self.record(key)?.io)
    }

    /// Replace the IO flags of `key`.
    pub fn set_io_flags(&mut self, key: &FieldKey, io: IoFlags) -> Result<(), StoreError> {
        self.record_mut(key)?.io = io;
        Ok(())
    }

    /// Declared keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &FieldKey> {
        self.fields.keys()
    }

    /// Keys flagged for visualisation output.
    pub fn visualized(&self) -> impl Iterator<Item = &FieldKey> {
        self.fields
            .iter()
            .filter(|(_, r)| r.io.visualize)
            .map(|(k, _)| k)
    }

    /// Keys flagged for checkpoint/restart output.
    pub fn checkpointed(&self) -> impl Iterator<Item = &FieldKey> {
        self.fields
            .iter()
            .filter(|(_, r)| r.io.checkpoint)
            .map(|(k, _)| k)
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field has been declared.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thaw_core::{ComponentSpace, EntityKind};

    fn cells(n: usize) -> CompositeSpace {
        CompositeSpace::new("domain").with_component(ComponentSpace::scalar(EntityKind::Cell, n))
    }

    fn owner(name: &str) -> Claim {
        Claim::Owner(name.to_string())
    }

    #[test]
    fn require_is_idempotent() {
        let mut store = FieldStore::new();
        let k = FieldKey::new("pressure");
        store.require(&k, &cells(4), owner("pressure")).unwrap();
        store.require(&k, &cells(4), owner("pressure")).unwrap();
        store.require(&k, &cells(4), Claim::Reader).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.owner(&k).unwrap(), Some("pressure"));
        assert_eq!(store.get(&k).unwrap().space().len(), 4);
    }

    #[test]
    fn reader_first_then_owner() {
        let mut store = FieldStore::new();
        let k = FieldKey::new("saturation_liquid");
        store.require(&k, &cells(2), Claim::Reader).unwrap();
        assert_eq!(store.owner(&k).unwrap(), None);
        store.require(&k, &cells(2), owner("wrm")).unwrap();
        assert_eq!(store.owner(&k).unwrap(), Some("wrm"));
    }

    #[test]
    fn shape_mismatch_on_redeclaration() {
        let mut store = FieldStore::new();
        let k = FieldKey::new("temperature");
        store.require(&k, &cells(4), Claim::Reader).unwrap();
        match store.require(&k, &cells(5), Claim::Reader) {
            Err(StoreError::ShapeMismatch { expected, found, .. }) => {
                assert_eq!(expected, cells(4));
                assert_eq!(found, cells(5));
            }
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn second_owner_rejected() {
        let mut store = FieldStore::new();
        let k = FieldKey::new("enthalpy");
        store.require(&k, &cells(1), owner("a")).unwrap();
        match store.require(&k, &cells(1), owner("b")) {
            Err(StoreError::DuplicateOwner { first, second, .. }) => {
                assert_eq!(first, "a");
                assert_eq!(second, "b");
            }
            other => panic!("expected DuplicateOwner, got {other:?}"),
        }
    }

    #[test]
    fn unknown_key_not_found() {
        let store = FieldStore::new();
        assert!(matches!(
            store.get(&FieldKey::new("nope")),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.epoch(&FieldKey::new("nope")),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn only_owner_writes() {
        let mut store = FieldStore::new();
        let k = FieldKey::new("pressure");
        store.require(&k, &cells(2), owner("pressure")).unwrap();
        assert!(matches!(
            store.get_mut(&k, "intruder"),
            Err(StoreError::NotWritable { .. })
        ));
        store.get_mut(&k, "pressure").unwrap().put_scalar(3.0);
        assert_eq!(store.get(&k).unwrap().component(EntityKind::Cell).unwrap(), &[3.0, 3.0]);
    }

    #[test]
    fn checkout_blocks_reads_until_restore() {
        let mut store = FieldStore::new();
        let k = FieldKey::new("k");
        store.require(&k, &cells(3), owner("k")).unwrap();
        let mut v = store.checkout(&k, "k").unwrap();
        assert!(store.record_of(&k).unwrap().is_checked_out());
        assert!(matches!(store.get(&k), Err(StoreError::CheckedOut { .. })));
        v.put_scalar(1.5);
        store.restore(&k, v).unwrap();
        assert_eq!(store.get(&k).unwrap().norm_inf(), 1.5);
    }

    #[test]
    fn epochs_and_io_flags() {
        let mut store = FieldStore::new();
        let a = FieldKey::new("a");
        let b = FieldKey::new("b");
        store.require(&a, &cells(1), Claim::Reader).unwrap();
        store.require(&b, &cells(1), Claim::Reader).unwrap();
        assert_eq!(store.epoch(&a).unwrap(), Epoch::ZERO);
        store.set_epoch(&a, Epoch(7)).unwrap();
        assert_eq!(store.epoch(&a).unwrap(), Epoch(7));

        store
            .set_io_flags(
                &b,
                IoFlags {
                    visualize: false,
                    checkpoint: true,
                },
            )
            .unwrap();
        assert_eq!(store.visualized().collect::<Vec<_>>(), vec![&a]);
        assert_eq!(store.checkpointed().collect::<Vec<_>>(), vec![&b]);
    }
}
