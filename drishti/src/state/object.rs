//! Assignment of one model to one pose.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::core::{ContPose, DiscPose};
use crate::model::ModelId;

/// Where the continuous pose of an [`ObjectState`] came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Placement {
    /// Continuous pose is the center of the grid cell
    #[default]
    OnGrid,
    /// Continuous pose was moved by the refinement oracle
    Refined,
}

/// One model placed at one pose.
///
/// Identity is `(model, discrete pose)`: refinement moves the continuous pose
/// but never changes which grid cell the assignment belongs to.
#[derive(Clone, Copy, Debug)]
pub struct ObjectState {
    model: ModelId,
    cont: ContPose,
    disc: DiscPose,
    placement: Placement,
}

impl ObjectState {
    /// Create an on-grid object state.
    pub fn new(model: ModelId, cont: ContPose, disc: DiscPose) -> Self {
        Self {
            model,
            cont,
            disc,
            placement: Placement::OnGrid,
        }
    }

    /// Same assignment with a refined continuous pose.
    pub fn refined(&self, cont: ContPose) -> Self {
        Self {
            cont,
            placement: Placement::Refined,
            ..*self
        }
    }

    /// Model identity
    #[inline]
    pub fn model(&self) -> ModelId {
        self.model
    }

    /// Continuous pose used for rendering
    #[inline]
    pub fn cont_pose(&self) -> ContPose {
        self.cont
    }

    /// Grid cell
    #[inline]
    pub fn disc_pose(&self) -> DiscPose {
        self.disc
    }

    /// Placement flag
    #[inline]
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Whether refinement moved this object
    #[inline]
    pub fn is_refined(&self) -> bool {
        self.placement == Placement::Refined
    }

    /// Key used for equality and hashing.
    #[inline]
    pub fn key(&self) -> (ModelId, DiscPose) {
        (self.model, self.disc)
    }

    /// Bitwise equality including the continuous pose and placement flag.
    pub fn identical(&self, other: &ObjectState) -> bool {
        self.key() == other.key()
            && self.placement == other.placement
            && self.cont.x.to_bits() == other.cont.x.to_bits()
            && self.cont.y.to_bits() == other.cont.y.to_bits()
            && self.cont.yaw.to_bits() == other.cont.yaw.to_bits()
    }
}

impl PartialEq for ObjectState {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ObjectState {}

impl Hash for ObjectState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for ObjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.model, self.disc, self.cont)
    }
}
