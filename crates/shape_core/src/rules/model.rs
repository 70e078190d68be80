//! Typed views over validated rules
//!
//! The validator works on raw JSON; once a document is complete it is converted into
//! these structs. Sentinel-typed fields become enums (`AllowList`) or `Option`s
//! (`"none"` ⇒ `None`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::RuleError;

/// Object or decoy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Object,
    Decoy,
}

impl ShapeKind {
    pub fn section(self) -> &'static str {
        match self {
            ShapeKind::Object => "objects",
            ShapeKind::Decoy => "decoys",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ShapeKind::Object => write!(f, "object"),
            ShapeKind::Decoy => write!(f, "decoy"),
        }
    }
}

/// `"all"` | `"none"` | explicit list of names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AllowListRepr", into = "AllowListRepr")]
pub enum AllowList {
    All,
    None,
    List(Vec<String>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum AllowListRepr {
    Keyword(String),
    Names(Vec<String>),
}

impl TryFrom<AllowListRepr> for AllowList {
    type Error = String;

    fn try_from(repr: AllowListRepr) -> Result<Self, Self::Error> {
        match repr {
            AllowListRepr::Keyword(k) if k == "all" => Ok(AllowList::All),
            AllowListRepr::Keyword(k) if k == "none" => Ok(AllowList::None),
            AllowListRepr::Keyword(k) => Err(format!("expected \"all\", \"none\" or a list, found \"{k}\"")),
            AllowListRepr::Names(names) => Ok(AllowList::List(names)),
        }
    }
}

impl From<AllowList> for AllowListRepr {
    fn from(list: AllowList) -> Self {
        match list {
            AllowList::All => AllowListRepr::Keyword("all".to_string()),
            AllowList::None => AllowListRepr::Keyword("none".to_string()),
            AllowList::List(names) => AllowListRepr::Names(names),
        }
    }
}

impl AllowList {
    /// Concrete, deduplicated names. `All` expands to `universe` in declaration order.
    ///
    /// Explicit names are not checked against `universe`; an undefined name surfaces when
    /// it is drawn.
    pub fn resolve<'a>(&self, universe: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            if !out.iter().any(|n| n == name) {
                out.push(name.to_string());
            }
        };
        match self {
            AllowList::All => universe.into_iter().for_each(&mut push),
            AllowList::None => {}
            AllowList::List(names) => names.iter().for_each(|n| push(n)),
        }
        out
    }
}

/// Serde adapter for fields that are either the keyword `"none"` or a structure.
pub(crate) mod none_keyword {
    use super::*;

    pub fn serialize<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_str("none"),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr<T> {
            Keyword(String),
            Value(T),
        }

        match Repr::<T>::deserialize(deserializer)? {
            Repr::Keyword(k) if k == "none" => Ok(None),
            Repr::Keyword(k) => Err(serde::de::Error::custom(format!("expected \"none\", found \"{k}\""))),
            Repr::Value(v) => Ok(Some(v)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleConsistency {
    /// one factor shared by all axes
    All,
    /// three independent factors
    None,
    Xy,
    Xz,
    Yz,
}

impl FromStr for ScaleConsistency {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(ScaleConsistency::All),
            "none" => Ok(ScaleConsistency::None),
            "xy" => Ok(ScaleConsistency::Xy),
            "xz" => Ok(ScaleConsistency::Xz),
            "yz" => Ok(ScaleConsistency::Yz),
            other => Err(RuleError::invalid("shape.scaling.consistent", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingRule {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub consistent: ScaleConsistency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomRotation {
    /// degrees, per axis
    pub min_bounds: [f64; 3],
    pub max_bounds: [f64; 3],
    /// step per axis; 0 disables the axis
    pub snap: [f64; 3],
    #[serde(default)]
    pub auto_snap_face: bool,
}

/// Slack for euler angles recovered from a rotation matrix.
const ANGLE_EPSILON: f64 = 1e-6;

impl RandomRotation {
    /// `rotation` rewritten per axis as the equivalent angle (`a`, `a ± 360`) inside
    /// the bounds, or `None` if some axis has no such angle.
    pub fn fit_bounds(&self, rotation: &[f64; 3]) -> Option<[f64; 3]> {
        let mut fitted = [0.0; 3];
        for axis in 0..3 {
            let (min, max) = (self.min_bounds[axis], self.max_bounds[axis]);
            let angle = rotation[axis];
            fitted[axis] = [angle, angle + 360.0, angle - 360.0]
                .into_iter()
                .find(|a| *a >= min - ANGLE_EPSILON && *a <= max + ANGLE_EPSILON)
                .map(|a| a.max(min).min(max) + 0.0)?;
        }
        Some(fitted)
    }
}

/// `true` | `false` | `"random"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FlipRepr", into = "FlipRepr")]
pub enum FlipSetting {
    Fixed(bool),
    Random,
}

impl Default for FlipSetting {
    fn default() -> Self {
        FlipSetting::Fixed(false)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum FlipRepr {
    Fixed(bool),
    Keyword(String),
}

impl TryFrom<FlipRepr> for FlipSetting {
    type Error = String;

    fn try_from(repr: FlipRepr) -> Result<Self, Self::Error> {
        match repr {
            FlipRepr::Fixed(b) => Ok(FlipSetting::Fixed(b)),
            FlipRepr::Keyword(k) if k == "random" => Ok(FlipSetting::Random),
            FlipRepr::Keyword(k) => Err(format!("expected true, false or \"random\", found \"{k}\"")),
        }
    }
}

impl From<FlipSetting> for FlipRepr {
    fn from(setting: FlipSetting) -> Self {
        match setting {
            FlipSetting::Fixed(b) => FlipRepr::Fixed(b),
            FlipSetting::Random => FlipRepr::Keyword("random".to_string()),
        }
    }
}

/// Mirror settings per axis-pair plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlipRule {
    #[serde(default)]
    pub xy: FlipSetting,
    #[serde(default)]
    pub xz: FlipSetting,
    #[serde(default)]
    pub yz: FlipSetting,
}

impl FlipRule {
    /// Settings in `[xy, xz, yz]` order.
    pub fn planes(&self) -> [FlipSetting; 3] {
        [self.xy, self.xz, self.yz]
    }
}

/// Object or decoy rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRule {
    pub id: i64,
    pub name: String,
    pub file: String,
    pub allowed_materials: AllowList,
    pub allowed_colors: AllowList,
    pub min_distance: f64,
    #[serde(default, with = "none_keyword")]
    pub scaling: Option<ScalingRule>,
    #[serde(default)]
    pub fixed_rotation: [f64; 3],
    #[serde(default, with = "none_keyword")]
    pub random_rotation: Option<RandomRotation>,
    #[serde(default, with = "none_keyword")]
    pub flip: Option<FlipRule>,
    #[serde(default)]
    pub snap_to_plane: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRule {
    pub id: i64,
    pub name: String,
    pub file: String,
    pub allowed_colors: AllowList,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRule {
    pub id: i64,
    pub name: String,
    pub hex: String,
    pub opacity: f64,
}

impl ColorRule {
    /// sRGB components in 0..=1 plus opacity.
    pub fn rgba(&self) -> Result<[f64; 4], RuleError> {
        let digits = self.hex.strip_prefix('#').unwrap_or(&self.hex);
        let invalid = || RuleError::invalid(format!("colors.{}.hex", self.name), &self.hex);
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(invalid());
        }
        let mut rgba = [0.0, 0.0, 0.0, self.opacity];
        for (i, channel) in rgba.iter_mut().take(3).enumerate() {
            let byte = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
            *channel = byte as f64 / 255.0;
        }
        Ok(rgba)
    }

    /// Scene-linear components (sRGB transfer removed), opacity untouched.
    pub fn linear_rgba(&self) -> Result<[f64; 4], RuleError> {
        let [r, g, b, a] = self.rgba()?;
        Ok([srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b), a])
    }
}

fn srgb_to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// `categories` block of the rules file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySettings {
    #[serde(default)]
    pub ignore_material: bool,
    #[serde(default)]
    pub ignore_color: bool,
}

/// Checks the enumerated values serde would only report as generic parse failures.
pub(crate) fn check_shape_enumerations(raw: &Value, section: &str) -> Result<(), RuleError> {
    let name = raw.get("name").and_then(Value::as_str).unwrap_or("?");

    if let Some(consistent) = raw.get("scaling").and_then(|s| s.get("consistent")) {
        match consistent.as_str() {
            Some(text) => {
                text.parse::<ScaleConsistency>()?;
            }
            None => return Err(RuleError::invalid("shape.scaling.consistent", consistent)),
        }
    }

    if let Some(Value::Object(flip)) = raw.get("flip") {
        for (plane, setting) in flip {
            if !matches!(plane.as_str(), "xy" | "xz" | "yz") {
                return Err(RuleError::invalid(format!("{section}.{name}.flip"), plane));
            }
            let ok = setting.is_boolean() || setting.as_str() == Some("random");
            if !ok {
                return Err(RuleError::invalid(format!("{section}.{name}.flip.{plane}"), setting));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_allow_list_serde() {
        let all: AllowList = serde_json::from_value(json!("all")).unwrap();
        assert_eq!(all, AllowList::All);
        let none: AllowList = serde_json::from_value(json!("none")).unwrap();
        assert_eq!(none, AllowList::None);
        let list: AllowList = serde_json::from_value(json!(["red", "blue"])).unwrap();
        assert_eq!(list, AllowList::List(vec!["red".to_string(), "blue".to_string()]));
        assert!(serde_json::from_value::<AllowList>(json!("some")).is_err());

        assert_eq!(serde_json::to_value(&AllowList::None).unwrap(), json!("none"));
    }

    #[test]
    fn test_allow_list_resolution() {
        let universe = ["red", "green", "blue"];
        assert_eq!(AllowList::All.resolve(universe), vec!["red", "green", "blue"]);
        assert!(AllowList::None.resolve(universe).is_empty());

        let list = AllowList::List(vec!["blue".to_string(), "pink".to_string(), "blue".to_string()]);
        assert_eq!(list.resolve(universe), vec!["blue", "pink"]);
    }

    #[test]
    fn test_shape_rule_with_none_keywords() {
        let rule: ShapeRule = serde_json::from_value(json!({
            "id": 0, "name": "cube", "file": "cube.glb",
            "allowed_materials": "all", "allowed_colors": ["red"],
            "min_distance": 1.0, "scaling": "none", "fixed_rotation": [0, 0, 90],
            "random_rotation": "none",
            "flip": {"xy": "random", "xz": true},
            "snap_to_plane": false
        }))
        .unwrap();

        assert!(rule.scaling.is_none());
        assert!(rule.random_rotation.is_none());
        let flip = rule.flip.unwrap();
        assert_eq!(flip.planes(), [FlipSetting::Random, FlipSetting::Fixed(true), FlipSetting::Fixed(false)]);

        let back = serde_json::to_value(&rule).unwrap();
        assert_eq!(back["scaling"], json!("none"));
        assert_eq!(back["flip"]["xy"], json!("random"));
    }

    #[test]
    fn test_scale_consistency_parse() {
        assert_eq!("xz".parse::<ScaleConsistency>().unwrap(), ScaleConsistency::Xz);
        let err = "diagonal".parse::<ScaleConsistency>().unwrap_err();
        assert_eq!(err, RuleError::invalid("shape.scaling.consistent", "diagonal"));
    }

    #[test]
    fn test_enumeration_check() {
        let bad = json!({"name": "cube", "scaling": {"consistent": "xyz"}});
        assert!(matches!(check_shape_enumerations(&bad, "objects"), Err(RuleError::InvalidValue { .. })));

        let bad = json!({"name": "cube", "flip": {"xy": "sometimes"}});
        assert!(matches!(check_shape_enumerations(&bad, "objects"), Err(RuleError::InvalidValue { .. })));

        let good = json!({"name": "cube", "scaling": "none", "flip": {"yz": "random"}});
        assert!(check_shape_enumerations(&good, "objects").is_ok());
    }

    #[test]
    fn test_color_parsing() {
        let color = ColorRule { id: 0, name: "orange".to_string(), hex: "#FF8000".to_string(), opacity: 0.5 };
        let [r, g, b, a] = color.rgba().unwrap();
        assert!((r - 1.0).abs() < 1e-9);
        assert!((g - 128.0 / 255.0).abs() < 1e-9);
        assert_eq!(b, 0.0);
        assert_eq!(a, 0.5);

        let linear = color.linear_rgba().unwrap();
        assert!(linear[1] < g);

        let bad = ColorRule { hex: "#12345".to_string(), ..color };
        assert!(bad.rgba().is_err());
    }

    #[test]
    fn test_fit_bounds_wraps_angles() {
        let rule = RandomRotation {
            min_bounds: [-90.0, 0.0, -180.0],
            max_bounds: [-90.0, 360.0, 180.0],
            snap: [0.0; 3],
            auto_snap_face: false,
        };
        assert_eq!(rule.fit_bounds(&[270.0, -90.0, 0.0]), Some([-90.0, 270.0, 0.0]));
        // recovered angles carry float noise
        assert_eq!(rule.fit_bounds(&[270.000000001, -0.0, 0.0]), Some([-90.0, 0.0, 0.0]));
        assert!(rule.fit_bounds(&[90.0, 0.0, 0.0]).is_none());

        let fitted = rule.fit_bounds(&[-90.0, -0.0, -0.0]).unwrap();
        assert!(fitted[1].is_sign_positive());
        assert!(fitted[2].is_sign_positive());
    }
}
