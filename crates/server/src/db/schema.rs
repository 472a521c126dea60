//! EMR table definitions used by the importer

use deadpool_postgres::Pool;

use crate::import::StoreError;

/// Tables the importer writes, created if missing.
///
/// `Email` is the only patient key. `FhirID` records the source resource id
/// and is not unique: unrelated sources reuse ids such as `"1"`.
///
/// The unique indexes on `Appointments` and `MedicalRecords` are what the
/// importer's `ON CONFLICT DO NOTHING` inserts conflict on, so importing the
/// same bundle twice leaves the tables unchanged. They apply to every row in
/// the shared tables, so the appointment API can no longer book one patient
/// twice into the same date and time slot, and a second record for the same
/// patient, visit date and notes is rejected as a duplicate.
///
/// `DoctorID` has no foreign key here because `UserAccounts` is owned by the
/// auth service.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS Patients (
    PatientID SERIAL PRIMARY KEY,
    FirstName VARCHAR(100) NOT NULL,
    LastName VARCHAR(100) NOT NULL,
    DOB DATE NOT NULL,
    Gender VARCHAR(10) CHECK (Gender IN ('Male', 'Female', 'Other')),
    Address TEXT,
    PhoneNumber VARCHAR(20),
    Email VARCHAR(255) UNIQUE,
    CreatedAt TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

ALTER TABLE Patients ADD COLUMN IF NOT EXISTS FhirID VARCHAR(255);
ALTER TABLE Patients DROP CONSTRAINT IF EXISTS patients_fhirid_key;

CREATE TABLE IF NOT EXISTS Appointments (
    AppointmentID SERIAL PRIMARY KEY,
    PatientID INTEGER REFERENCES Patients(PatientID),
    DoctorID INTEGER,
    AppointmentDate DATE NOT NULL,
    AppointmentTime TIME NOT NULL,
    ReasonForVisit TEXT,
    Status VARCHAR(20) CHECK (Status IN ('Scheduled', 'Completed', 'Cancelled')),
    CreatedAt TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE UNIQUE INDEX IF NOT EXISTS appointments_patient_slot_key
    ON Appointments (PatientID, AppointmentDate, AppointmentTime);

CREATE TABLE IF NOT EXISTS MedicalRecords (
    RecordID SERIAL PRIMARY KEY,
    PatientID INTEGER REFERENCES Patients(PatientID),
    DoctorID INTEGER,
    VisitDate DATE NOT NULL,
    Diagnosis TEXT NOT NULL,
    Treatment TEXT NOT NULL,
    Notes TEXT,
    CreatedAt TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE UNIQUE INDEX IF NOT EXISTS medicalrecords_patient_visit_notes_key
    ON MedicalRecords (PatientID, VisitDate, md5(COALESCE(Notes, '')));
"#;

/// Create the EMR tables and import indexes if they do not exist
pub async fn initialize_schema(pool: &Pool) -> Result<(), StoreError> {
    let client = pool.get().await?;
    client.batch_execute(SCHEMA_SQL).await?;
    tracing::info!("Database tables initialized");
    Ok(())
}
