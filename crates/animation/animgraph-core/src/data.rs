//! Flat numeric key buffers (times or values) grouped into fixed-size tuples.

use serde::{Deserialize, Serialize};

use crate::error::AnimError;

/// Immutable flat buffer of `f32`, read as `count()` tuples of `components()`
/// values each. Time inputs use one component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAnimData")]
pub struct AnimData {
    components: usize,
    data: Vec<f32>,
}

#[derive(Deserialize)]
struct RawAnimData {
    components: usize,
    data: Vec<f32>,
}

impl TryFrom<RawAnimData> for AnimData {
    type Error = AnimError;

    fn try_from(raw: RawAnimData) -> Result<Self, Self::Error> {
        AnimData::new(raw.components, raw.data)
    }
}

impl AnimData {
    /// Validate and wrap a buffer. Never truncates: a length that is not a
    /// multiple of `components` is rejected.
    pub fn new(components: usize, data: Vec<f32>) -> Result<Self, AnimError> {
        if components == 0 {
            return Err(AnimError::InvalidComponents { components });
        }
        if data.len() % components != 0 {
            return Err(AnimError::LengthMismatch {
                len: data.len(),
                components,
            });
        }
        Ok(Self { components, data })
    }

    /// Scalar buffer, the usual shape of a time input.
    pub fn scalar(data: Vec<f32>) -> Self {
        Self {
            components: 1,
            data,
        }
    }

    #[inline]
    pub fn components(&self) -> usize {
        self.components
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Number of tuples.
    #[inline]
    pub fn count(&self) -> usize {
        self.data.len() / self.components
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Tuple `index` as a slice of `components()` values.
    #[inline]
    pub fn tuple(&self, index: usize) -> &[f32] {
        let start = index * self.components;
        &self.data[start..start + self.components]
    }

    /// Last scalar of the buffer, if any.
    #[inline]
    pub fn last(&self) -> Option<f32> {
        self.data.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_count_divides_length() {
        let d = AnimData::new(3, vec![0.0; 12]).unwrap();
        assert_eq!(d.components(), 3);
        assert_eq!(d.count(), 4);
        assert_eq!(d.data().len() % d.components(), 0);
        assert_eq!(d.tuple(1).len(), 3);
    }

    #[test]
    fn rejects_zero_components() {
        let err = AnimData::new(0, vec![1.0]).unwrap_err();
        assert_eq!(err, AnimError::InvalidComponents { components: 0 });
    }

    #[test]
    fn rejects_ragged_length() {
        let err = AnimData::new(2, vec![1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            AnimError::LengthMismatch {
                len: 3,
                components: 2
            }
        );
    }

    #[test]
    fn deserialize_validates() {
        let ok: AnimData = serde_json::from_str(r#"{"components":2,"data":[1,2,3,4]}"#).unwrap();
        assert_eq!(ok.count(), 2);
        assert!(serde_json::from_str::<AnimData>(r#"{"components":2,"data":[1,2,3]}"#).is_err());
    }
}
