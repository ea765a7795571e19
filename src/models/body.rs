use crate::{LabError, Result};
use serde::{Deserialize, Serialize};

pub const BODY_MOON: &str = "moon";
pub const BODY_EARTH: &str = "earth";
pub const BODY_JUPITER: &str = "jupiter";
pub const BODY_PLANET_X: &str = "planet-x";
pub const BODY_CUSTOM: &str = "custom";

/// Gravity preset selectable in the lab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Body {
    Moon,
    Earth,
    Jupiter,
    PlanetX,
    Custom,
}

pub struct BodyInfo {
    pub body: Body,
    pub id: &'static str,
    pub name: &'static str,
    /// m/s², `None` for the user-defined body.
    pub gravity: Option<f64>,
}

pub fn body_catalog() -> &'static [BodyInfo] {
    &[
        BodyInfo { body: Body::Moon, id: BODY_MOON, name: "Moon", gravity: Some(1.62) },
        BodyInfo { body: Body::Earth, id: BODY_EARTH, name: "Earth", gravity: Some(9.81) },
        BodyInfo { body: Body::Jupiter, id: BODY_JUPITER, name: "Jupiter", gravity: Some(24.79) },
        BodyInfo { body: Body::PlanetX, id: BODY_PLANET_X, name: "Planet X", gravity: Some(14.2) },
        BodyInfo { body: Body::Custom, id: BODY_CUSTOM, name: "Custom", gravity: None },
    ]
}

impl Body {
    pub fn info(self) -> &'static BodyInfo {
        body_catalog()
            .iter()
            .find(|info| info.body == self)
            .unwrap_or(&body_catalog()[4])
    }

    pub fn id(self) -> &'static str { self.info().id }

    pub fn name(self) -> &'static str { self.info().name }

    pub fn gravity(self) -> Option<f64> { self.info().gravity }

    pub fn from_id(id: &str) -> Result<Self> {
        body_catalog()
            .iter()
            .find(|info| info.id == id)
            .map(|info| info.body)
            .ok_or_else(|| LabError::UnknownBody(id.to_string()))
    }

    /// Preset whose constant equals `gravity` exactly, else `Custom`.
    pub fn matching(gravity: f64) -> Self {
        body_catalog()
            .iter()
            .find(|info| info.gravity == Some(gravity))
            .map(|info| info.body)
            .unwrap_or(Body::Custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_match_exactly_or_fall_back_to_custom() {
        assert_eq!(Body::matching(24.79), Body::Jupiter);
        assert_eq!(Body::matching(9.81), Body::Earth);
        assert_eq!(Body::matching(9.8), Body::Custom);
        assert_eq!(Body::matching(17.0), Body::Custom);
    }

    #[test]
    fn ids_round_trip_through_catalog() {
        for info in body_catalog() {
            assert_eq!(Body::from_id(info.id).unwrap(), info.body);
            assert_eq!(info.body.id(), info.id);
        }
        assert!(matches!(Body::from_id("pluto"), Err(LabError::UnknownBody(_))));
        assert_eq!(Body::Custom.gravity(), None);
    }
}
