//! Node data mirrored from the external store.
//!
//! Field data is owned by the store; the engine only keeps a copy. Power and
//! alignment are integers on a fixed grid and are clamped on every path into
//! the engine, so nothing downstream has to handle out-of-range ratings.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;
use crate::geometry::{round_half_up, PointF};

pub const POWER_MIN: i32 = 1;
pub const POWER_MAX: i32 = 10;
pub const ALIGNMENT_MIN: i32 = -5;
pub const ALIGNMENT_MAX: i32 = 5;

/// Store-assigned node identifier. Ordered lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Individual,
    Institution,
    Media,
    Social,
    State,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Individual,
        Category::Institution,
        Category::Media,
        Category::Social,
        Category::State,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Individual => "Individual",
            Category::Institution => "Institution",
            Category::Media => "Media",
            Category::Social => "Social",
            Category::State => "State",
            Category::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Option<Category> {
        Self::ALL.into_iter().find(|c| c.as_str() == s.trim())
    }

    /// Fill color used for the node box.
    pub fn color(self) -> &'static str {
        match self {
            Category::Individual => "lightgreen",
            Category::Institution => "lightcoral",
            Category::Media => "plum",
            Category::Social => "lightblue",
            Category::State => "chocolate",
            Category::Other => "lightyellow",
        }
    }
}

/// Classification decides the outline shape of a node.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Classification {
    KeyPolicy,
    OppositionUnorganized,
    OppositionOrganized,
    ProgressiveUnorganized,
    ProgressiveOrganized,
    DecisionMaker,
}

impl Classification {
    pub const ALL: [Classification; 6] = [
        Classification::KeyPolicy,
        Classification::OppositionUnorganized,
        Classification::OppositionOrganized,
        Classification::ProgressiveUnorganized,
        Classification::ProgressiveOrganized,
        Classification::DecisionMaker,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Classification::KeyPolicy => "Key Policy, Issue, or Debate",
            Classification::OppositionUnorganized => "Opposition Unorganized Group",
            Classification::OppositionOrganized => "Opposition Organized Group",
            Classification::ProgressiveUnorganized => "Progressive Unorganized Group",
            Classification::ProgressiveOrganized => "Progressive Organized Group",
            Classification::DecisionMaker => "Decision Maker",
        }
    }

    pub fn parse(s: &str) -> Option<Classification> {
        Self::ALL.into_iter().find(|c| c.as_str() == s.trim())
    }

    pub fn shape(self) -> &'static str {
        match self {
            Classification::KeyPolicy => "star",
            Classification::OppositionUnorganized => "cloud",
            Classification::OppositionOrganized => "oval",
            Classification::ProgressiveUnorganized => "rectangle",
            Classification::ProgressiveOrganized => "heart",
            Classification::DecisionMaker => "trapezoid",
        }
    }
}

/// Shape for a node with an optional classification.
pub fn shape_of(classification: Option<Classification>) -> &'static str {
    classification.map(Classification::shape).unwrap_or("square")
}

pub fn clamp_power(value: f64) -> i32 {
    clamp_rating(value, POWER_MIN, POWER_MAX)
}

pub fn clamp_alignment(value: f64) -> i32 {
    clamp_rating(value, ALIGNMENT_MIN, ALIGNMENT_MAX)
}

fn clamp_rating(value: f64, min: i32, max: i32) -> i32 {
    if !value.is_finite() {
        tracing::warn!(value, "non-finite rating, using domain minimum");
        return min;
    }
    (round_half_up(value) as i64).clamp(min as i64, max as i64) as i32
}

/// A node as mirrored from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default, deserialize_with = "de_text")]
    pub label: String,
    #[serde(deserialize_with = "de_power", default = "default_power")]
    pub power: i32,
    #[serde(deserialize_with = "de_alignment", default)]
    pub alignment: i32,
    #[serde(with = "category_str", default = "default_category")]
    pub category: Category,
    #[serde(with = "classification_str", default)]
    pub classification: Option<Classification>,
    #[serde(default, deserialize_with = "de_text")]
    pub notes: String,
    /// Last committed screen position, set after a drag. Never persisted.
    #[serde(skip)]
    pub screen_hint: Option<PointF>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, label: impl Into<String>, power: i32, alignment: i32) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            power: power.clamp(POWER_MIN, POWER_MAX),
            alignment: alignment.clamp(ALIGNMENT_MIN, ALIGNMENT_MAX),
            category: Category::Other,
            classification: None,
            notes: String::new(),
            screen_hint: None,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Exact grid cell of the node, used as its stack key.
    pub fn rating(&self) -> (i32, i32) {
        (self.power, self.alignment)
    }

    pub fn fields(&self) -> NodeFields {
        NodeFields {
            label: self.label.clone(),
            power: self.power,
            alignment: self.alignment,
            category: Some(self.category),
            classification: self.classification,
            notes: self.notes.clone(),
        }
    }

    /// Field-by-field difference from `self` to `other`; id and hints are ignored.
    pub fn diff(&self, other: &Node) -> NodePatch {
        NodePatch {
            label: (self.label != other.label).then(|| other.label.clone()),
            power: (self.power != other.power).then_some(other.power),
            alignment: (self.alignment != other.alignment).then_some(other.alignment),
            category: (self.category != other.category).then_some(other.category),
            classification: (self.classification != other.classification)
                .then_some(other.classification),
            notes: (self.notes != other.notes).then(|| other.notes.clone()),
        }
    }

    pub fn apply(&mut self, patch: &NodePatch) {
        if let Some(label) = &patch.label {
            self.label = label.clone();
        }
        if let Some(power) = patch.power {
            self.power = power.clamp(POWER_MIN, POWER_MAX);
        }
        if let Some(alignment) = patch.alignment {
            self.alignment = alignment.clamp(ALIGNMENT_MIN, ALIGNMENT_MAX);
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(classification) = patch.classification {
            self.classification = classification;
        }
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
    }
}

/// Persisted wire shape of a node. Category may be unset only before save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeFields {
    #[serde(default, deserialize_with = "de_text")]
    pub label: String,
    #[serde(deserialize_with = "de_power", default = "default_power")]
    pub power: i32,
    #[serde(deserialize_with = "de_alignment", default)]
    pub alignment: i32,
    #[serde(with = "opt_category_str", default)]
    pub category: Option<Category>,
    #[serde(with = "classification_str", default)]
    pub classification: Option<Classification>,
    #[serde(default, deserialize_with = "de_text")]
    pub notes: String,
}

impl NodeFields {
    pub fn validate(&self) -> Result<Category, ValidationError> {
        if self.label.trim().is_empty() {
            return Err(ValidationError::MissingLabel);
        }
        self.category.ok_or(ValidationError::MissingCategory)
    }

    pub fn into_node(self, id: NodeId) -> Result<Node, ValidationError> {
        let category = self.validate()?;
        Ok(Node {
            id,
            label: self.label,
            power: self.power.clamp(POWER_MIN, POWER_MAX),
            alignment: self.alignment.clamp(ALIGNMENT_MIN, ALIGNMENT_MAX),
            category,
            classification: self.classification,
            notes: self.notes,
            screen_hint: None,
        })
    }
}

impl Default for NodeFields {
    fn default() -> Self {
        Self {
            label: String::new(),
            power: POWER_MIN,
            alignment: 0,
            category: None,
            classification: None,
            notes: String::new(),
        }
    }
}

/// Partial update sent to the store. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ser_opt_category")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ser_opt_classification")]
    pub classification: Option<Option<Classification>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NodePatch {
    pub fn position(power: i32, alignment: i32) -> Self {
        Self {
            power: Some(power),
            alignment: Some(alignment),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn moves_node(&self) -> bool {
        self.power.is_some() || self.alignment.is_some()
    }
}

fn default_power() -> i32 {
    POWER_MIN
}

fn default_category() -> Category {
    Category::Other
}

// Ratings arrive from hosts that may send `null` (a serialized NaN) or a
// numeric string. Anything unreadable lands on the domain minimum.
fn de_rating<'de, D: Deserializer<'de>>(d: D, field: &'static str) -> Result<Option<f64>, D::Error> {
    let raw = serde_json::Value::deserialize(d)?;
    let value = match &raw {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    if value.is_none() {
        tracing::warn!(field, %raw, "unreadable rating, using domain minimum");
    }
    Ok(value)
}

fn de_power<'de, D: Deserializer<'de>>(d: D) -> Result<i32, D::Error> {
    Ok(de_rating(d, "power")?.map_or(POWER_MIN, clamp_power))
}

fn de_alignment<'de, D: Deserializer<'de>>(d: D) -> Result<i32, D::Error> {
    Ok(de_rating(d, "alignment")?.map_or(ALIGNMENT_MIN, clamp_alignment))
}

fn de_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

fn ser_opt_category<S: Serializer>(v: &Option<Category>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(v.map(Category::as_str).unwrap_or(""))
}

fn ser_opt_classification<S: Serializer>(
    v: &Option<Option<Classification>>,
    s: S,
) -> Result<S::Ok, S::Error> {
    s.serialize_str(v.flatten().map(Classification::as_str).unwrap_or(""))
}

mod category_str {
    use super::Category;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Category, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(v.as_str())
    }

    // Unknown categories from the store fall back to Other.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Category, D::Error> {
        let raw = Option::<String>::deserialize(d)?.unwrap_or_default();
        Ok(Category::parse(&raw).unwrap_or(Category::Other))
    }
}

mod opt_category_str {
    use super::Category;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<Category>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(v.map(Category::as_str).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Category>, D::Error> {
        let raw = Option::<String>::deserialize(d)?.unwrap_or_default();
        Ok(Category::parse(&raw))
    }
}

mod classification_str {
    use super::Classification;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<Classification>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(v.map(Classification::as_str).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<Classification>, D::Error> {
        let raw = Option::<String>::deserialize(d)?.unwrap_or_default();
        Ok(Classification::parse(&raw))
    }
}
