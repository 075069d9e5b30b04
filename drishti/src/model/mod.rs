//! Object models: static per-object-type metadata.
//!
//! Each model is an upright prism: a convex footprint extruded from the
//! support plane to the model height. Validity checks and source-cost
//! accounting use the *inflated* model, scaled about its origin by
//! [`ObjectModel::inflation_factor`], so that observed points sitting on the
//! model's surfaces (with sensor noise) fall inside.

mod footprint;

pub use footprint::ConvexFootprint;

use std::fmt;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::config::ConfigLoadError;
use crate::core::{ContPose, Point2D, Rgb};

/// Unique identifier for a model in a [`ModelBank`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelId(pub u32);

impl ModelId {
    /// Create a new model ID.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Index into the owning bank.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Model({})", self.0)
    }
}

/// Construction parameters for an [`ObjectModel`].
#[derive(Clone, Debug)]
pub struct ModelSpec {
    /// Human readable name, unique within a bank
    pub name: String,
    /// Footprint outline in the model frame (hull is taken)
    pub outline: Vec<Point2D>,
    /// Height above the support plane in meters
    pub height: f32,
    /// Rotationally symmetric about Z (yaw is not searched)
    pub symmetric: bool,
    /// Explicit inflation factor; derived from `inflation_margin` when `None`
    pub inflation_factor: Option<f32>,
    /// Margin in meters added to the inscribed radius to derive inflation
    pub inflation_margin: f32,
    /// Surface color
    pub color: Rgb,
    /// Skip the collision check against other placed objects
    pub allow_overlap: bool,
    /// Linear search resolution for this model, if it differs from the scene's
    pub search_resolution: Option<f32>,
}

/// Static metadata for one object type.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectModel {
    name: String,
    footprint: ConvexFootprint,
    height: f32,
    symmetric: bool,
    inflation_factor: f32,
    color: Rgb,
    allow_overlap: bool,
    search_resolution: Option<f32>,
    inscribed_radius: f32,
    circumscribed_radius: f32,
}

impl ObjectModel {
    /// Validate a spec and build the model.
    pub fn new(spec: ModelSpec) -> Result<Self, ConfigLoadError> {
        let invalid =
            |msg: &str| ConfigLoadError::Invalid(format!("model '{}': {}", spec.name, msg));

        let footprint = ConvexFootprint::from_points(&spec.outline)
            .ok_or_else(|| invalid("footprint must span a polygon with non-zero area"))?;
        if !(spec.height > 0.0 && spec.height.is_finite()) {
            return Err(invalid("height must be positive"));
        }
        let inscribed_radius = footprint.inscribed_radius();
        if inscribed_radius <= 0.0 {
            return Err(invalid("model origin must lie strictly inside the footprint"));
        }
        let inflation_factor = match spec.inflation_factor {
            Some(f) => f,
            None => (inscribed_radius + spec.inflation_margin.max(0.0)) / inscribed_radius,
        };
        if !(inflation_factor >= 1.0 && inflation_factor.is_finite()) {
            return Err(invalid("inflation factor must be at least 1"));
        }
        if let Some(res) = spec.search_resolution {
            if !(res > 0.0) {
                return Err(invalid("search resolution must be positive"));
            }
        }

        Ok(Self {
            circumscribed_radius: footprint.circumscribed_radius(),
            inscribed_radius,
            footprint,
            name: spec.name,
            height: spec.height,
            symmetric: spec.symmetric,
            inflation_factor,
            color: spec.color,
            allow_overlap: spec.allow_overlap,
            search_resolution: spec.search_resolution,
        })
    }

    /// Rectangular box model, mostly for tests and demos.
    pub fn cuboid(
        name: &str,
        width: f32,
        depth: f32,
        height: f32,
        color: Rgb,
    ) -> Result<Self, ConfigLoadError> {
        let (hx, hy) = (width / 2.0, depth / 2.0);
        Self::new(ModelSpec {
            name: name.to_string(),
            outline: vec![
                Point2D::new(-hx, -hy),
                Point2D::new(hx, -hy),
                Point2D::new(hx, hy),
                Point2D::new(-hx, hy),
            ],
            height,
            symmetric: false,
            inflation_factor: None,
            inflation_margin: 0.01,
            color,
            allow_overlap: false,
            search_resolution: None,
        })
    }

    /// Model name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Footprint in the model frame
    pub fn footprint(&self) -> &ConvexFootprint {
        &self.footprint
    }

    /// Height above the support plane
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Whether yaw is irrelevant for this model
    pub fn is_symmetric(&self) -> bool {
        self.symmetric
    }

    /// Scale applied to the footprint and height for validity checks
    pub fn inflation_factor(&self) -> f32 {
        self.inflation_factor
    }

    /// Surface color
    pub fn color(&self) -> Rgb {
        self.color
    }

    /// Whether collisions with this model are tolerated
    pub fn allows_overlap(&self) -> bool {
        self.allow_overlap
    }

    /// Model-specific linear search resolution
    pub fn search_resolution(&self) -> Option<f32> {
        self.search_resolution
    }

    /// Largest disc centered on the origin that fits in the footprint
    pub fn inscribed_radius(&self) -> f32 {
        self.inscribed_radius
    }

    /// Smallest disc centered on the origin containing the footprint
    pub fn circumscribed_radius(&self) -> f32 {
        self.circumscribed_radius
    }

    /// Planar reach of the inflated model from its origin.
    pub fn inflated_reach(&self) -> f32 {
        self.circumscribed_radius * self.inflation_factor
    }

    /// Footprint vertices in the world frame (not inflated).
    pub fn world_footprint(&self, pose: ContPose) -> Vec<Point2D> {
        self.footprint
            .vertices()
            .iter()
            .map(|&v| pose.transform_point(v))
            .collect()
    }

    /// Whether a world point projects inside the inflated footprint at `pose`.
    #[inline]
    pub fn inflated_footprint_contains(&self, pose: ContPose, point: Point2D) -> bool {
        let local = pose.inverse_transform_point(point) * (1.0 / self.inflation_factor);
        self.footprint.contains(local)
    }

    /// Whether a world point lies inside the inflated volume at `pose`.
    ///
    /// The volume spans from slightly below the support plane to the inflated
    /// height above it.
    pub fn inflated_volume_contains(
        &self,
        pose: ContPose,
        table_height: f32,
        point: &Point3<f32>,
    ) -> bool {
        let slack = self.height * (self.inflation_factor - 1.0);
        let z = point.z - table_height;
        z >= -slack
            && z <= self.height + slack
            && self.inflated_footprint_contains(pose, Point2D::new(point.x, point.y))
    }
}

/// Read-only collection of object models, indexed by [`ModelId`].
#[derive(Clone, Debug, Default)]
pub struct ModelBank {
    models: Vec<ObjectModel>,
}

impl ModelBank {
    /// Create an empty bank
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a model; names must be unique.
    pub fn add(&mut self, model: ObjectModel) -> Result<ModelId, ConfigLoadError> {
        if self.id_of(model.name()).is_some() {
            return Err(ConfigLoadError::Invalid(format!(
                "duplicate model name '{}'",
                model.name()
            )));
        }
        let id = ModelId::new(self.models.len() as u32);
        self.models.push(model);
        Ok(id)
    }

    /// Look up a model by id
    pub fn get(&self, id: ModelId) -> Option<&ObjectModel> {
        self.models.get(id.index())
    }

    /// Model for an id issued by this bank.
    ///
    /// # Panics
    /// Panics if the id was not issued by this bank.
    pub fn model(&self, id: ModelId) -> &ObjectModel {
        &self.models[id.index()]
    }

    /// Find a model id by name
    pub fn id_of(&self, name: &str) -> Option<ModelId> {
        self.models
            .iter()
            .position(|m| m.name() == name)
            .map(|i| ModelId::new(i as u32))
    }

    /// Number of models
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the bank is empty
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Iterate over `(id, model)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (ModelId, &ObjectModel)> {
        self.models
            .iter()
            .enumerate()
            .map(|(i, m)| (ModelId::new(i as u32), m))
    }
}
