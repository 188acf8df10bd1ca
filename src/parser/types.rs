use serde::{Deserialize, Serialize};

use crate::grid::GridCell;

/// Which vision-model family produced a response. Decides the box grammars
/// tried and the coordinate convention assumed for scaled numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// `[y_min, x_min, y_max, x_max]` normalized to 0–1000.
    Gemini,
    /// `[[x1, y1, x2, y2]]` pixel boxes, "Grounded Operation" phrasing.
    CogAgent,
    Llava,
    #[default]
    Generic,
}

impl ModelFamily {
    /// Infer the family from a model identifier such as `gemini-1.5-pro`
    /// or `cjwbw/cogagent-chat`.
    pub fn from_model_id(model_id: &str) -> Self {
        let id = model_id.to_ascii_lowercase();
        if id.contains("gemini") {
            ModelFamily::Gemini
        } else if id.contains("cogagent") {
            ModelFamily::CogAgent
        } else if id.contains("llava") {
            ModelFamily::Llava
        } else {
            ModelFamily::Generic
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    /// Regions addressed by cell labels such as "B3".
    Grid,
    /// Regions addressed by bounding boxes.
    #[default]
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordSpace {
    Pixel,
    Normalized01,
    Normalized1000,
}

/// Order of the four numbers as written by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisOrder {
    /// `x1, y1, x2, y2`
    XyXy,
    /// `y_min, x_min, y_max, x_max`
    YxYx,
}

impl AxisOrder {
    pub fn for_family(family: ModelFamily) -> Self {
        match family {
            ModelFamily::Gemini => AxisOrder::YxYx,
            _ => AxisOrder::XyXy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpatialReference {
    GridCell(GridCell),
    Box(BoxRef),
}

/// A box exactly as read from the response: values are in `space`, in `order`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxRef {
    pub values: [f64; 4],
    pub space: CoordSpace,
    pub order: AxisOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedResponse {
    /// `None` means nothing was found, which is an ordinary outcome.
    pub reference: Option<SpatialReference>,
    /// Short instruction for the user, free of coordinate syntax.
    pub action_text: String,
    /// The exact text the winning grammar matched.
    pub matched: Option<String>,
    /// Name of the winning grammar, for logs.
    pub grammar: Option<&'static str>,
}

impl ParsedResponse {
    pub fn is_miss(&self) -> bool {
        self.reference.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_from_model_id() {
        assert_eq!(ModelFamily::from_model_id("gemini-1.5-flash"), ModelFamily::Gemini);
        assert_eq!(ModelFamily::from_model_id("cjwbw/cogagent-chat"), ModelFamily::CogAgent);
        assert_eq!(ModelFamily::from_model_id("yorickvp/llava-13b"), ModelFamily::Llava);
        assert_eq!(ModelFamily::from_model_id("gpt-4o"), ModelFamily::Generic);
    }
}
