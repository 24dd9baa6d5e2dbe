use serde::{Deserialize, Serialize};

/// Simulation parameters posted to the remote service as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub lat_max: f64,
    pub lat_min: f64,
    pub lon_max: f64,
    pub lon_min: f64,
    pub date: String,
    pub duration: f64,
    pub resolution: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
    #[error("{field} must be between -90 and 90 (got {value})")]
    LatitudeOutOfRange { field: &'static str, value: f64 },
    #[error("{field} must be between -180 and 180 (got {value})")]
    LongitudeOutOfRange { field: &'static str, value: f64 },
    #[error("southern latitude cannot be greater than northern latitude")]
    LatitudeOrder,
    #[error("western longitude cannot be greater than eastern longitude")]
    LongitudeOrder,
    #[error("date is required")]
    MissingDate,
    #[error("duration must be greater than 0")]
    NonPositiveDuration,
    #[error("resolution must be greater than 0 and at most 1")]
    ResolutionOutOfRange,
}

impl SimulationRequest {
    /// Returns every rule the request violates; empty when valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        let numbers = [
            ("lat_max", self.lat_max),
            ("lat_min", self.lat_min),
            ("lon_max", self.lon_max),
            ("lon_min", self.lon_min),
            ("duration", self.duration),
            ("resolution", self.resolution),
        ];
        for (field, value) in numbers {
            if !value.is_finite() {
                errors.push(ValidationError::NotFinite { field });
            }
        }
        if !errors.is_empty() {
            return errors;
        }

        for (field, value) in [("lat_max", self.lat_max), ("lat_min", self.lat_min)] {
            if !(-90.0..=90.0).contains(&value) {
                errors.push(ValidationError::LatitudeOutOfRange { field, value });
            }
        }
        if self.lat_min > self.lat_max {
            errors.push(ValidationError::LatitudeOrder);
        }

        for (field, value) in [("lon_max", self.lon_max), ("lon_min", self.lon_min)] {
            if !(-180.0..=180.0).contains(&value) {
                errors.push(ValidationError::LongitudeOutOfRange { field, value });
            }
        }
        if self.lon_min > self.lon_max {
            errors.push(ValidationError::LongitudeOrder);
        }

        if self.date.trim().is_empty() {
            errors.push(ValidationError::MissingDate);
        }
        if self.duration <= 0.0 {
            errors.push(ValidationError::NonPositiveDuration);
        }
        if self.resolution <= 0.0 || self.resolution > 1.0 {
            errors.push(ValidationError::ResolutionOutOfRange);
        }

        errors
    }
}
