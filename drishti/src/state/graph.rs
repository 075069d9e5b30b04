//! Partial scene assignments.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::core::DiscPose;
use crate::model::ModelId;

use super::object::ObjectState;

/// Insertion-ordered assignment of poses to a subset of the scene's models.
///
/// Equality and hashing treat the assignment as a set keyed by model id:
/// placing A then B equals placing B then A at the same cells.
#[derive(Clone, Debug, Default)]
pub struct GraphState {
    objects: Vec<ObjectState>,
    /// Object keys sorted by model id
    keys: Vec<(ModelId, DiscPose)>,
}

impl GraphState {
    /// The empty assignment (start state).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a sequence of objects.
    ///
    /// Returns `None` if a model appears twice.
    pub fn from_objects(objects: impl IntoIterator<Item = ObjectState>) -> Option<Self> {
        objects
            .into_iter()
            .try_fold(Self::new(), |state, object| state.with_object(object))
    }

    /// Copy of this state with one more object appended.
    ///
    /// Returns `None` if the model is already placed.
    pub fn with_object(&self, object: ObjectState) -> Option<Self> {
        let key = object.key();
        let pos = match self.keys.binary_search_by_key(&key.0, |k| k.0) {
            Ok(_) => return None,
            Err(pos) => pos,
        };
        let mut next = self.clone();
        next.objects.push(object);
        next.keys.insert(pos, key);
        Some(next)
    }

    /// Objects in insertion order
    pub fn objects(&self) -> &[ObjectState] {
        &self.objects
    }

    /// Most recently added object
    pub fn last(&self) -> Option<&ObjectState> {
        self.objects.last()
    }

    /// Number of placed objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether nothing is placed
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Whether a model is placed
    pub fn contains_model(&self, model: ModelId) -> bool {
        self.keys.binary_search_by_key(&model, |k| k.0).is_ok()
    }

    /// Sorted set keys
    pub fn keys(&self) -> &[(ModelId, DiscPose)] {
        &self.keys
    }

    /// Order-independent fingerprint derived from the keys.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.keys.hash(&mut hasher);
        hasher.finish()
    }

    /// Whether `child` equals this state plus exactly one object.
    pub fn is_extended_by(&self, child: &GraphState) -> bool {
        child.len() == self.len() + 1
            && self.keys.iter().all(|k| child.keys.binary_search(k).is_ok())
    }

    /// Bitwise comparison of every object including continuous poses.
    pub fn identical(&self, other: &GraphState) -> bool {
        self.objects.len() == other.objects.len()
            && self
                .objects
                .iter()
                .zip(other.objects.iter())
                .all(|(a, b)| a.identical(b))
    }
}

impl PartialEq for GraphState {
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys
    }
}

impl Eq for GraphState {}

impl Hash for GraphState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.keys.hash(state);
    }
}

impl fmt::Display for GraphState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, object) in self.objects.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{object}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ContPose;

    fn obj(model: u32, x: i32) -> ObjectState {
        ObjectState::new(
            ModelId::new(model),
            ContPose::new(x as f32 * 0.1, 0.0, 0.0),
            DiscPose::new(x, 0, 0),
        )
    }

    #[test]
    fn test_order_independent_equality() {
        let ab = GraphState::from_objects([obj(0, 1), obj(1, 2)]).unwrap();
        let ba = GraphState::from_objects([obj(1, 2), obj(0, 1)]).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.fingerprint(), ba.fingerprint());
        assert_eq!(ab.last().unwrap().model(), ModelId::new(1));
        assert_eq!(ba.last().unwrap().model(), ModelId::new(0));
    }

    #[test]
    fn test_duplicate_model_rejected() {
        let a = GraphState::new().with_object(obj(0, 1)).unwrap();
        assert!(a.with_object(obj(0, 2)).is_none());
    }

    #[test]
    fn test_refined_pose_keeps_identity() {
        let a = GraphState::new().with_object(obj(0, 1)).unwrap();
        let moved = obj(0, 1).refined(ContPose::new(0.13, 0.01, 0.02));
        let b = GraphState::new().with_object(moved).unwrap();
        assert_eq!(a, b);
        assert!(!a.identical(&b));
        assert!(b.last().unwrap().is_refined());
    }

    #[test]
    fn test_is_extended_by() {
        let a = GraphState::new().with_object(obj(0, 1)).unwrap();
        let ab = a.with_object(obj(1, 3)).unwrap();
        let c = GraphState::new().with_object(obj(0, 2)).unwrap();
        assert!(a.is_extended_by(&ab));
        assert!(!c.is_extended_by(&ab));
        assert!(!GraphState::new().is_extended_by(&ab));
    }
}
