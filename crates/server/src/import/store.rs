//! Storage seam for the importer
//!
//! The importer only needs parameterised inserts that do nothing on a unique
//! key conflict, a patient lookup by email, and an explicit transaction
//! around them. `PgStore` implements this over PostgreSQL; tests use an in-memory
//! store.

use async_trait::async_trait;
use emr_core::{NewAppointment, NewMedicalRecord, NewPatient};
use thiserror::Error;

/// Errors surfaced by a store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Store error: {0}")]
    Backend(String),
}

/// A handle that can open import transactions
#[async_trait]
pub trait Store: Send + Sync {
    type Transaction: StoreTransaction;

    /// Acquire a connection and begin a transaction on it
    async fn begin(&self) -> Result<Self::Transaction, StoreError>;

    /// Check that the store is reachable
    async fn ping(&self) -> Result<(), StoreError>;
}

/// One open transaction. Dropping it without `commit` discards its writes.
///
/// The insert methods report whether a row was written; nothing is written
/// when a row with the same unique key already exists.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Returns the new `PatientID`, or `None` when the email is already taken
    async fn insert_patient(&mut self, patient: &NewPatient) -> Result<Option<i32>, StoreError>;

    async fn insert_appointment(
        &mut self,
        appointment: &NewAppointment,
    ) -> Result<bool, StoreError>;

    async fn insert_medical_record(
        &mut self,
        record: &NewMedicalRecord,
    ) -> Result<bool, StoreError>;

    async fn find_patient_by_email(&mut self, email: &str) -> Result<Option<i32>, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}
