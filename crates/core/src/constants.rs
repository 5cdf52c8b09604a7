//! Field names of the patient registration grid (`pi_02`) and related constants.

/// Primary key of a registration row.
pub const FIELD_PI_02_ID: &str = "PI_02_ID";

pub const FIELD_COUNTRY: &str = "COUNTRY";
pub const FIELD_GOP: &str = "GOP";
pub const FIELD_PATIENT_NAME: &str = "PATIENT_NAME";
pub const FIELD_DOB: &str = "DOB";

/// Search filter names understood by the registration search endpoint.
pub const FILTER_AKAN_NO: &str = "akanNo";
pub const FILTER_PATIENT_NAME: &str = "patientName";
pub const FILTER_GOP: &str = "GOP";
pub const FILTER_COUNTRY: &str = "COUNTRY";
