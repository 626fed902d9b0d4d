use crate::prelude::{MonitorError, MonitorResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Closed set of categories the supported detection models can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionClass {
    Fall,
    NotFall,
    Person,
    Child,
}

impl DetectionClass {
    /// Label the model reports for this class.
    pub fn name(&self) -> &'static str {
        match self {
            DetectionClass::Fall => "Fall",
            DetectionClass::NotFall => "Not Fall",
            DetectionClass::Person => "person",
            DetectionClass::Child => "child",
        }
    }
}

/// Which id->class table the configured detector uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogPreset {
    #[default]
    FallModel,
    PersonModel,
}

/// Lookup table from a model's numeric class ids to [`DetectionClass`].
#[derive(Debug, Clone)]
pub struct ClassCatalog {
    entries: HashMap<u32, DetectionClass>,
}

impl ClassCatalog {
    pub fn new(entries: impl IntoIterator<Item = (u32, DetectionClass)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn from_preset(preset: CatalogPreset) -> Self {
        match preset {
            CatalogPreset::FallModel => Self::fall_model(),
            CatalogPreset::PersonModel => Self::person_model(),
        }
    }

    pub fn fall_model() -> Self {
        Self::new([(0, DetectionClass::Fall), (1, DetectionClass::NotFall)])
    }

    pub fn person_model() -> Self {
        Self::new([(0, DetectionClass::Person), (1, DetectionClass::Child)])
    }

    pub fn lookup(&self, class_id: u32) -> Option<DetectionClass> {
        self.entries.get(&class_id).copied()
    }

    /// Every id the model can report, sorted for stable detector filters.
    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

/// Pixel-space box, `(x1, y1)` top-left and `(x2, y2)` bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Lower edge in image coordinates (grows downwards).
    pub fn bottom(&self) -> i32 {
        self.y2
    }

    pub fn is_well_formed(&self) -> bool {
        self.x2 >= self.x1 && self.y2 >= self.y1
    }
}

/// Detection exactly as an adapter reported it; any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    #[serde(default)]
    pub class_id: Option<u32>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub bbox: Option<[i32; 4]>,
    #[serde(default)]
    pub track_id: Option<u64>,
}

impl RawDetection {
    pub fn new(class_id: u32, confidence: f32, bbox: [i32; 4]) -> Self {
        Self {
            class_id: Some(class_id),
            confidence: Some(confidence),
            bbox: Some(bbox),
            track_id: None,
        }
    }

    pub fn with_track(mut self, track_id: u64) -> Self {
        self.track_id = Some(track_id);
        self
    }
}

/// Validated detection with its class resolved through a [`ClassCatalog`].
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class_id: u32,
    pub class: DetectionClass,
    pub confidence: f32,
    pub bbox: BoundingBox,
    pub track_id: Option<u64>,
}

impl Detection {
    pub fn class_name(&self) -> &'static str {
        self.class.name()
    }

    /// Validates a raw detection. Returns `Ok(None)` for class ids the catalog
    /// does not know, and `DetectionMalformed` when required fields are missing
    /// or out of range.
    pub fn from_raw(raw: &RawDetection, catalog: &ClassCatalog) -> MonitorResult<Option<Self>> {
        let class_id = raw
            .class_id
            .ok_or_else(|| MonitorError::DetectionMalformed("missing class id".into()))?;
        let confidence = raw
            .confidence
            .ok_or_else(|| MonitorError::DetectionMalformed("missing confidence".into()))?;
        let [x1, y1, x2, y2] = raw
            .bbox
            .ok_or_else(|| MonitorError::DetectionMalformed("missing bounding box".into()))?;

        if !(0.0..=1.0).contains(&confidence) {
            return Err(MonitorError::DetectionMalformed(format!(
                "confidence {} outside [0, 1]",
                confidence
            )));
        }
        let bbox = BoundingBox::new(x1, y1, x2, y2);
        if !bbox.is_well_formed() {
            return Err(MonitorError::DetectionMalformed(format!(
                "inverted bounding box {:?}",
                bbox
            )));
        }

        Ok(catalog.lookup(class_id).map(|class| Self {
            class_id,
            class,
            confidence,
            bbox,
            track_id: raw.track_id,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fall_catalog_resolves_model_ids() {
        let catalog = ClassCatalog::fall_model();
        assert_eq!(catalog.lookup(0), Some(DetectionClass::Fall));
        assert_eq!(catalog.lookup(1), Some(DetectionClass::NotFall));
        assert_eq!(catalog.lookup(7), None);
        assert_eq!(catalog.ids(), vec![0, 1]);
    }

    #[test]
    fn from_raw_rejects_missing_fields() {
        let catalog = ClassCatalog::fall_model();
        let raw = RawDetection {
            class_id: Some(0),
            confidence: None,
            bbox: Some([0, 0, 10, 10]),
            track_id: None,
        };
        assert!(matches!(
            Detection::from_raw(&raw, &catalog),
            Err(MonitorError::DetectionMalformed(_))
        ));
    }

    #[test]
    fn from_raw_rejects_nan_confidence_and_inverted_boxes() {
        let catalog = ClassCatalog::fall_model();
        assert!(Detection::from_raw(&RawDetection::new(0, f32::NAN, [0, 0, 1, 1]), &catalog).is_err());
        assert!(Detection::from_raw(&RawDetection::new(0, 0.9, [5, 5, 1, 1]), &catalog).is_err());
    }

    #[test]
    fn from_raw_skips_unknown_classes() {
        let catalog = ClassCatalog::person_model();
        let raw = RawDetection::new(42, 0.9, [0, 0, 10, 10]);
        assert_eq!(Detection::from_raw(&raw, &catalog).unwrap(), None);
    }

    #[test]
    fn from_raw_keeps_track_id() {
        let catalog = ClassCatalog::person_model();
        let raw = RawDetection::new(1, 0.7, [1, 2, 3, 4]).with_track(9);
        let detection = Detection::from_raw(&raw, &catalog).unwrap().unwrap();
        assert_eq!(detection.class, DetectionClass::Child);
        assert_eq!(detection.class_name(), "child");
        assert_eq!(detection.track_id, Some(9));
        assert_eq!(detection.bbox.bottom(), 4);
    }
}
