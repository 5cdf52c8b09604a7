//! Session configuration.
//!
//! A [`SessionConfig`] is built once when a grid screen is opened and handed to its
//! [`GridSession`](crate::GridSession). Nothing in this crate reads environment variables; the
//! binary resolves them at startup.

use crate::constants::{FIELD_COUNTRY, FIELD_DOB, FIELD_GOP, FIELD_PATIENT_NAME};
use crate::RequiredFields;

#[derive(Clone, Debug)]
pub struct SessionConfig {
    required_fields: Vec<RequiredFields>,
    reload_after_save: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            required_fields: Vec::new(),
            reload_after_save: true,
        }
    }
}

impl SessionConfig {
    pub fn new(required_fields: Vec<RequiredFields>, reload_after_save: bool) -> Self {
        Self {
            required_fields,
            reload_after_save,
        }
    }

    /// Rules of the patient registration screen: country and GOP, then name and date of birth.
    pub fn patient_registration() -> Self {
        Self::new(
            vec![
                RequiredFields::new([FIELD_COUNTRY, FIELD_GOP], "country and GOP are required"),
                RequiredFields::new(
                    [FIELD_PATIENT_NAME, FIELD_DOB],
                    "patient name and date of birth are required",
                ),
            ],
            true,
        )
    }

    pub fn with_reload_after_save(mut self, reload: bool) -> Self {
        self.reload_after_save = reload;
        self
    }

    pub fn required_fields(&self) -> &[RequiredFields] {
        &self.required_fields
    }

    /// Whether a successful save refetches the grid from the row source (to pick up ids and
    /// numbers assigned by the backend) instead of rebaselining on the local rows.
    pub fn reload_after_save(&self) -> bool {
        self.reload_after_save
    }
}
