use super::{check_payment_insert, check_revision};
use crate::domain::event::EventId;
use crate::domain::payment::{Payment, PaymentId};
use crate::domain::ports::{LedgerChange, LedgerStore};
use crate::domain::registration::{Registration, RegistrationId};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for registrations, keyed by registration id.
pub const CF_REGISTRATIONS: &str = "registrations";
/// Column Family for payments, keyed by payment id.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family for counters.
pub const CF_META: &str = "meta";

const LAST_PAYMENT_ID_KEY: &[u8] = b"last_payment_id";

/// A persistent ledger store using RocksDB.
///
/// Values are JSON, keys are big-endian ids so iteration follows id order.
/// RocksDB gives atomic batches but no check-then-write primitive, so every write
/// operation runs behind `write_gate`; reads go straight to the database.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_gate: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at `path` with the ledger column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_REGISTRATIONS, CF_PAYMENTS, CF_META]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_gate: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &'static str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            EngineError::InternalError(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &'static str, id: u64) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, id.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &'static str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }

    fn put<T: Serialize>(
        &self,
        batch: &mut WriteBatch,
        cf_name: &'static str,
        id: u64,
        value: &T,
    ) -> Result<()> {
        let cf = self.cf(cf_name)?;
        batch.put_cf(cf, id.to_be_bytes(), serde_json::to_vec(value)?);
        Ok(())
    }

    fn last_payment_id(&self) -> Result<PaymentId> {
        let cf = self.cf(CF_META)?;
        match self.db.get_pinned_cf(cf, LAST_PAYMENT_ID_KEY)? {
            Some(bytes) => {
                let bytes: [u8; 8] = bytes.as_ref().try_into().map_err(|_| {
                    EngineError::InternalError(Box::new(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "corrupted payment id counter",
                    )))
                })?;
                Ok(u64::from_be_bytes(bytes))
            }
            None => Ok(0),
        }
    }
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn insert_registration(&self, registration: Registration) -> Result<Registration> {
        let _guard = self.write_gate.lock().await;
        if self
            .read::<Registration>(CF_REGISTRATIONS, registration.id)?
            .is_some()
        {
            return Err(EngineError::ValidationError(format!(
                "registration {} already exists",
                registration.id
            )));
        }

        let mut batch = WriteBatch::default();
        self.put(&mut batch, CF_REGISTRATIONS, registration.id, &registration)?;
        self.db.write(batch)?;
        Ok(registration)
    }

    async fn get_registration(&self, id: RegistrationId) -> Result<Option<Registration>> {
        self.read(CF_REGISTRATIONS, id)
    }

    async fn registrations(&self, event_id: Option<EventId>) -> Result<Vec<Registration>> {
        let registrations: Vec<Registration> = self.scan(CF_REGISTRATIONS)?;
        Ok(registrations
            .into_iter()
            .filter(|r| event_id.is_none_or(|id| r.event_id == id))
            .collect())
    }

    async fn insert_payment(&self, mut payment: Payment) -> Result<Payment> {
        let _guard = self.write_gate.lock().await;
        let registration = self.read::<Registration>(CF_REGISTRATIONS, payment.registration_id)?;
        let existing = self.payments_for(payment.registration_id).await?;
        check_payment_insert(registration.as_ref(), &existing, &payment)?;

        payment.id = self.last_payment_id()? + 1;
        payment.revision = 0;

        let mut batch = WriteBatch::default();
        self.put(&mut batch, CF_PAYMENTS, payment.id, &payment)?;
        batch.put_cf(self.cf(CF_META)?, LAST_PAYMENT_ID_KEY, payment.id.to_be_bytes());
        self.db.write(batch)?;
        Ok(payment)
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        self.read(CF_PAYMENTS, id)
    }

    async fn payments_for(&self, registration_id: RegistrationId) -> Result<Vec<Payment>> {
        let payments: Vec<Payment> = self.scan(CF_PAYMENTS)?;
        Ok(payments
            .into_iter()
            .filter(|p| p.registration_id == registration_id)
            .collect())
    }

    async fn all_payments(&self) -> Result<Vec<Payment>> {
        self.scan(CF_PAYMENTS)
    }

    async fn commit(&self, mut change: LedgerChange) -> Result<LedgerChange> {
        let _guard = self.write_gate.lock().await;

        if let Some(registration) = &change.registration {
            let stored = self
                .read::<Registration>(CF_REGISTRATIONS, registration.id)?
                .map(|r| r.revision);
            check_revision("registration", registration.id, stored, registration.revision)?;
        }
        for payment in &change.payments {
            let stored = self
                .read::<Payment>(CF_PAYMENTS, payment.id)?
                .map(|p| p.revision);
            check_revision("payment", payment.id, stored, payment.revision)?;
        }

        let mut batch = WriteBatch::default();
        if let Some(registration) = change.registration.as_mut() {
            registration.revision += 1;
            self.put(&mut batch, CF_REGISTRATIONS, registration.id, &*registration)?;
        }
        for payment in change.payments.iter_mut() {
            payment.revision += 1;
            self.put(&mut batch, CF_PAYMENTS, payment.id, &*payment)?;
        }
        self.db.write(batch)?;

        Ok(change)
    }
}
