use chrono::{Datelike, NaiveDate};

use crate::error::{Result, StorageError};

pub const ADULT_AGE: i32 = 18;

/// Who may register for the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityRules {
    /// Earliest accepted year of birth.
    pub min_birth_year: i32,
}

impl EligibilityRules {
    pub fn new(min_birth_year: i32) -> Self {
        Self { min_birth_year }
    }

    /// Check a registration submitted on `today`.
    pub fn check(&self, birth_date: NaiveDate, today: NaiveDate, has_authorization: bool) -> Result<()> {
        if birth_date > today {
            return Err(StorageError::InvalidInput(
                "Birth date cannot be in the future".to_string(),
            ));
        }

        if birth_date.year() < self.min_birth_year {
            return Err(StorageError::InvalidInput(format!(
                "Only participants born in {} or later can register",
                self.min_birth_year
            )));
        }

        if requires_authorization(birth_date, today) && !has_authorization {
            return Err(StorageError::InvalidInput(format!(
                "Participants under {ADULT_AGE} must upload an authorization signed by a parent or guardian"
            )));
        }

        Ok(())
    }
}

/// Age in completed years on `today`.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

pub fn requires_authorization(birth_date: NaiveDate, today: NaiveDate) -> bool {
    age_on(birth_date, today) < ADULT_AGE
}
