//! Static points of interest the shuttle can discover.
//!
//! The registry is validated once when it is built; the frame loop assumes every point is
//! unique and reachable.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoiKind {
    Employer,
    SocialLink,
    Contact,
}

/// Presentation-only content, carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiPayload {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub color: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub identity: String,
    pub kind: PoiKind,
    pub position: Vec3,
    pub payload: PoiPayload,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("point of interest #{index} has an empty identity")]
    EmptyIdentity { index: usize },
    #[error("duplicate point of interest identity `{identity}`")]
    DuplicateIdentity { identity: String },
    #[error("point of interest `{identity}` has a non-finite position")]
    NonFinitePosition { identity: String },
    #[error("point of interest `{identity}` at ({x}, {z}) lies outside the +/-{boundary} boundary")]
    OutOfBounds {
        identity: String,
        x: f32,
        z: f32,
        boundary: f32,
    },
    #[error("failed to read registry: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse registry: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Registry {
    points: Vec<PointOfInterest>,
}

impl Registry {
    pub fn new(points: Vec<PointOfInterest>, boundary: f32) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for (index, poi) in points.iter().enumerate() {
            if poi.identity.trim().is_empty() {
                return Err(RegistryError::EmptyIdentity { index });
            }
            if !seen.insert(poi.identity.as_str()) {
                return Err(RegistryError::DuplicateIdentity {
                    identity: poi.identity.clone(),
                });
            }
            if !poi.position.is_finite() {
                return Err(RegistryError::NonFinitePosition {
                    identity: poi.identity.clone(),
                });
            }
            if poi.position.x.abs() > boundary || poi.position.z.abs() > boundary {
                return Err(RegistryError::OutOfBounds {
                    identity: poi.identity.clone(),
                    x: poi.position.x,
                    z: poi.position.z,
                    boundary,
                });
            }
        }
        tracing::debug!(points = points.len(), "registry validated");
        Ok(Self { points })
    }

    pub fn from_json_str(text: &str, boundary: f32) -> Result<Self, RegistryError> {
        let points: Vec<PointOfInterest> = serde_json::from_str(text)?;
        Self::new(points, boundary)
    }

    pub fn load_json_file(path: impl AsRef<Path>, boundary: f32) -> Result<Self, RegistryError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text, boundary)
    }

    /// The portfolio's own work history, profiles and contact point.
    pub fn portfolio(boundary: f32) -> Result<Self, RegistryError> {
        Self::new(portfolio_points(), boundary)
    }

    /// Points in scan order.
    pub fn points(&self) -> &[PointOfInterest] {
        &self.points
    }

    pub fn get(&self, identity: &str) -> Option<&PointOfInterest> {
        self.points.iter().find(|p| p.identity == identity)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn employer(identity: &str, position: [f32; 3], title: &str, color: &str, description: &str) -> PointOfInterest {
    PointOfInterest {
        identity: identity.to_string(),
        kind: PoiKind::Employer,
        position: position.into(),
        payload: PoiPayload {
            title: title.to_string(),
            description: Some(description.to_string()),
            color: color.to_string(),
            url: None,
        },
    }
}

fn social(identity: &str, position: [f32; 3], title: &str, color: &str, url: &str) -> PointOfInterest {
    PointOfInterest {
        identity: identity.to_string(),
        kind: PoiKind::SocialLink,
        position: position.into(),
        payload: PoiPayload {
            title: title.to_string(),
            description: None,
            color: color.to_string(),
            url: Some(url.to_string()),
        },
    }
}

fn portfolio_points() -> Vec<PointOfInterest> {
    vec![
        employer(
            "bioexotec",
            [0.0, 1.0, -20.0],
            "BIOEXOTEC",
            "#9b59b6",
            "ML Engineer: gene expression analysis for early cancer detection.",
        ),
        employer(
            "ghz-solutions",
            [10.0, 1.0, 10.0],
            "GHZ Solutions",
            "#4a90e2",
            "Data Engineer: retrieval-augmented tooling and containerized pipelines.",
        ),
        employer(
            "uniklinik-ulm",
            [-10.0, 1.0, 10.0],
            "Universitätsklinikum Ulm",
            "#e74c3c",
            "Data Engineer: automated quality assurance for clinical data processing.",
        ),
        employer(
            "uni-ulm",
            [15.0, 1.0, -5.0],
            "Universität Ulm",
            "#2ecc71",
            "Research Assistant: smartphone and wearable health data research.",
        ),
        employer(
            "zeiss-mes",
            [-15.0, 1.0, -5.0],
            "Carl Zeiss MES",
            "#f39c12",
            "Frontend Developer: real-time features for an industrial MES platform.",
        ),
        employer(
            "liebherr",
            [20.0, 1.0, 5.0],
            "Liebherr Hausgeräte",
            "#1abc9c",
            "Software Engineer: data processing applications and CI/CD pipelines.",
        ),
        social(
            "linkedin",
            [-25.0, 1.0, 15.0],
            "LinkedIn Profile",
            "#0077B5",
            "https://www.linkedin.com/in/fabshof",
        ),
        social(
            "github",
            [25.0, 1.0, 15.0],
            "GitHub Profile",
            "#333333",
            "https://github.com/FabsHof",
        ),
        PointOfInterest {
            identity: "contact".to_string(),
            kind: PoiKind::Contact,
            position: Vec3::new(0.0, 1.0, 20.0),
            payload: PoiPayload {
                title: "Contact".to_string(),
                description: Some("Send a message.".to_string()),
                color: "#4a90e2".to_string(),
                url: None,
            },
        },
    ]
}
