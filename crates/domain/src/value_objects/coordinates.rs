//! Geographic coordinates value object

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::DomainError;

/// A geographic position as reported by the weather provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees (-90 to 90)
    pub lat: f64,
    /// Longitude in degrees (-180 to 180)
    pub lon: f64,
}

impl Coordinates {
    /// Create coordinates with range validation
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidCoordinates` if latitude is not in
    /// [-90, 90] or longitude is not in [-180, 180].
    pub fn new(lat: f64, lon: f64) -> Result<Self, DomainError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(DomainError::InvalidCoordinates);
        }
        Ok(Self { lat, lon })
    }

    /// Create coordinates without validation (for trusted sources)
    #[must_use]
    pub const fn new_unchecked(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_coordinates() {
        let c = Coordinates::new(7.2906, 80.6337).expect("valid coordinates");
        assert!((c.lat - 7.2906).abs() < f64::EPSILON);
        assert!((c.lon - 80.6337).abs() < f64::EPSILON);
    }

    #[test]
    fn test_boundary_coordinates() {
        assert!(Coordinates::new(90.0, 180.0).is_ok());
        assert!(Coordinates::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn test_invalid_coordinates() {
        assert!(Coordinates::new(91.0, 0.0).is_err());
        assert!(Coordinates::new(0.0, -181.0).is_err());
    }

    #[test]
    fn test_serialization_uses_short_names() {
        let c = Coordinates::new_unchecked(1.5, -2.25);
        let json = serde_json::to_value(c).expect("serialize");
        assert_eq!(json["lat"], 1.5);
        assert_eq!(json["lon"], -2.25);
    }
}
