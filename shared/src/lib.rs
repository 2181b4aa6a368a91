use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Label to probability mapping that keeps its entry order on the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predictions(Vec<(String, f32)>);

impl Predictions {
    pub fn new(entries: Vec<(String, f32)>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[(String, f32)] {
        &self.0
    }

    pub fn get(&self, label: &str) -> Option<f32> {
        self.0
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, prob)| *prob)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(label, prob)| (label.as_str(), *prob))
    }
}

impl Serialize for Predictions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, prob) in &self.0 {
            map.serialize_entry(label, prob)?;
        }
        map.end()
    }
}

struct PredictionsVisitor;

impl<'de> Visitor<'de> for PredictionsVisitor {
    type Value = Predictions;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of label to probability")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((label, prob)) = access.next_entry::<String, f32>()? {
            entries.push((label, prob));
        }
        Ok(Predictions(entries))
    }
}

impl<'de> Deserialize<'de> for Predictions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(PredictionsVisitor)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct XrayAnalysisResponse {
    pub predictions: Predictions,
    pub ai_analysis: String,
    /// Base64 JPEG of the analysed image.
    pub image: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CtScanAnalysisResponse {
    pub predictions: Predictions,
    pub predicted_class: String,
    pub confidence: f32,
    pub ai_analysis: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}
