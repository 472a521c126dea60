use async_trait::async_trait;
use deadpool_postgres::{Object, Pool};
use emr_core::{NewAppointment, NewMedicalRecord, NewPatient};

use crate::import::{Store, StoreError, StoreTransaction};

const INSERT_PATIENT: &str = "
    INSERT INTO Patients (FirstName, LastName, DOB, Gender, Address, PhoneNumber, Email, FhirID)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
    ON CONFLICT (Email) DO NOTHING
    RETURNING PatientID";

const INSERT_APPOINTMENT: &str = "
    INSERT INTO Appointments (
        PatientID, DoctorID, AppointmentDate, AppointmentTime, ReasonForVisit, Status
    )
    VALUES ($1, $2, $3, $4, $5, $6)
    ON CONFLICT DO NOTHING";

const INSERT_MEDICAL_RECORD: &str = "
    INSERT INTO MedicalRecords (PatientID, DoctorID, VisitDate, Diagnosis, Treatment, Notes)
    VALUES ($1, $2, $3, $4, $5, $6)
    ON CONFLICT DO NOTHING";

const PATIENT_BY_EMAIL: &str = "SELECT PatientID FROM Patients WHERE Email = $1";

/// PostgreSQL-backed store for the importer
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    type Transaction = PgTransaction;

    async fn begin(&self) -> Result<PgTransaction, StoreError> {
        let client = self.pool.get().await?;
        client.batch_execute("BEGIN").await?;
        Ok(PgTransaction {
            client: Some(client),
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        client.query_one("SELECT 1", &[]).await?;
        Ok(())
    }
}

/// A pooled connection with an open transaction.
///
/// If this is dropped before `commit` or `rollback` (for example when the
/// import future is cancelled), the connection is detached from the pool
/// and closed, which makes the server roll the transaction back.
pub struct PgTransaction {
    client: Option<Object>,
}

impl PgTransaction {
    fn client(&self) -> Result<&Object, StoreError> {
        self.client
            .as_ref()
            .ok_or_else(|| StoreError::Backend("transaction already finished".to_string()))
    }

    async fn finish(mut self, statement: &str) -> Result<(), StoreError> {
        let client = self
            .client
            .take()
            .ok_or_else(|| StoreError::Backend("transaction already finished".to_string()))?;
        client.batch_execute(statement).await?;
        Ok(())
    }

    async fn execute(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<bool, StoreError> {
        let client = self.client()?;
        let statement = client.prepare_cached(sql).await?;
        Ok(client.execute(&statement, params).await? > 0)
    }

    /// Run a statement that yields at most one `PatientID`
    async fn query_patient_id(
        &self,
        sql: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Option<i32>, StoreError> {
        let client = self.client()?;
        let statement = client.prepare_cached(sql).await?;
        let row = client.query_opt(&statement, params).await?;
        Ok(row.map(|row| row.get(0)))
    }
}

impl Drop for PgTransaction {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            tracing::warn!("Transaction dropped while open; discarding its connection");
            drop(Object::take(client));
        }
    }
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn insert_patient(&mut self, patient: &NewPatient) -> Result<Option<i32>, StoreError> {
        self.query_patient_id(
            INSERT_PATIENT,
            &[
                &patient.first_name,
                &patient.last_name,
                &patient.birth_date,
                &patient.gender.as_str(),
                &patient.address,
                &patient.phone,
                &patient.email,
                &patient.fhir_id,
            ],
        )
        .await
    }

    async fn insert_appointment(
        &mut self,
        appointment: &NewAppointment,
    ) -> Result<bool, StoreError> {
        self.execute(
            INSERT_APPOINTMENT,
            &[
                &appointment.patient_id,
                &appointment.doctor_id,
                &appointment.date,
                &appointment.time,
                &appointment.reason,
                &appointment.status.as_str(),
            ],
        )
        .await
    }

    async fn insert_medical_record(
        &mut self,
        record: &NewMedicalRecord,
    ) -> Result<bool, StoreError> {
        self.execute(
            INSERT_MEDICAL_RECORD,
            &[
                &record.patient_id,
                &record.doctor_id,
                &record.visit_date,
                &record.diagnosis,
                &record.treatment,
                &record.notes,
            ],
        )
        .await
    }

    async fn find_patient_by_email(&mut self, email: &str) -> Result<Option<i32>, StoreError> {
        self.query_patient_id(PATIENT_BY_EMAIL, &[&email]).await
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.finish("COMMIT").await
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.finish("ROLLBACK").await
    }
}
