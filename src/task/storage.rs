//! # Flash settings
//! The radio's key/value settings, kept as `sequential-storage` map items in a reserved range at
//! the end of flash. Keys are the `u16` built from namespace and field, values are either an
//! `i32` or raw UTF-8 bytes.
use core::ops::Range;

use defmt::{Debug2Format, warn};
use embassy_rp::flash::{Async, Flash};
use embassy_rp::peripherals::FLASH;
use heapless::String;
use radio_core::storage::{Field, KeyValueStore, MAX_VALUE_LEN, Namespace, StorageError, bounded, storage_key};
use sequential_storage::cache::NoCache;
use sequential_storage::map::{fetch_item, store_item};

use crate::task::resources::FlashResources;

/// Size of the Pico W flash chip.
const FLASH_SIZE: usize = 2 * 1024 * 1024;

/// Last 64 KiB of flash, clear of the program and the WiFi firmware blobs.
const SETTINGS_RANGE: Range<u32> = 0x1F_0000..0x20_0000;

/// Scratch space for one item: header, key and the longest value.
const ITEM_BUFFER_LEN: usize = 128;

/// Settings store on the on-board flash.
pub struct FlashStore {
    /// The flash driver
    flash: Flash<'static, FLASH, Async, FLASH_SIZE>,
    /// Scratch buffer `sequential-storage` serializes items through
    data_buffer: [u8; ITEM_BUFFER_LEN],
}

impl FlashStore {
    /// Takes the flash.
    pub fn new(r: FlashResources) -> Self {
        Self {
            flash: Flash::<_, Async, FLASH_SIZE>::new(r.flash, r.dma_ch),
            data_buffer: [0; ITEM_BUFFER_LEN],
        }
    }
}

/// Maps a `sequential-storage` error to the store's error.
fn storage_error<E: core::fmt::Debug>(e: sequential_storage::Error<E>) -> StorageError {
    warn!("Flash settings error: {:?}", Debug2Format(&e));
    match e {
        sequential_storage::Error::Storage { .. } => StorageError::Backend,
        sequential_storage::Error::FullStorage | sequential_storage::Error::ItemTooBig => StorageError::Full,
        _ => StorageError::Corrupted,
    }
}

impl KeyValueStore for FlashStore {
    async fn get_int(&mut self, namespace: Namespace, field: Field) -> Result<Option<i32>, StorageError> {
        fetch_item::<u16, i32, _>(
            &mut self.flash,
            SETTINGS_RANGE,
            &mut NoCache::new(),
            &mut self.data_buffer,
            &storage_key(namespace, field),
        )
        .await
        .map_err(storage_error)
    }

    async fn put_int(&mut self, namespace: Namespace, field: Field, value: i32) -> Result<(), StorageError> {
        store_item(
            &mut self.flash,
            SETTINGS_RANGE,
            &mut NoCache::new(),
            &mut self.data_buffer,
            &storage_key(namespace, field),
            &value,
        )
        .await
        .map_err(storage_error)
    }

    async fn get_string(
        &mut self,
        namespace: Namespace,
        field: Field,
    ) -> Result<Option<String<MAX_VALUE_LEN>>, StorageError> {
        let bytes = fetch_item::<u16, &[u8], _>(
            &mut self.flash,
            SETTINGS_RANGE,
            &mut NoCache::new(),
            &mut self.data_buffer,
            &storage_key(namespace, field),
        )
        .await
        .map_err(storage_error)?;
        bytes
            .map(|bytes| core::str::from_utf8(bytes).map(bounded).map_err(|_| StorageError::Corrupted))
            .transpose()
    }

    async fn put_string(&mut self, namespace: Namespace, field: Field, value: &str) -> Result<(), StorageError> {
        let value: String<MAX_VALUE_LEN> = bounded(value);
        store_item(
            &mut self.flash,
            SETTINGS_RANGE,
            &mut NoCache::new(),
            &mut self.data_buffer,
            &storage_key(namespace, field),
            &value.as_bytes(),
        )
        .await
        .map_err(storage_error)
    }

    async fn has_key(&mut self, namespace: Namespace, field: Field) -> Result<bool, StorageError> {
        // every value reads back as raw bytes, whatever was stored
        let found = fetch_item::<u16, &[u8], _>(
            &mut self.flash,
            SETTINGS_RANGE,
            &mut NoCache::new(),
            &mut self.data_buffer,
            &storage_key(namespace, field),
        )
        .await
        .map_err(storage_error)?;
        Ok(found.is_some())
    }

    async fn erase_all(&mut self) -> Result<(), StorageError> {
        sequential_storage::erase_all(&mut self.flash, SETTINGS_RANGE)
            .await
            .map_err(storage_error)
    }
}
