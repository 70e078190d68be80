//! Random material and color selection

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::RuleError;
use crate::rules::{ColorRule, MaterialRule, RuleStore, ShapeRule};

/// Material and color drawn for one instance, either may be absent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Appearance<'r> {
    pub material: Option<&'r MaterialRule>,
    pub color: Option<&'r ColorRule>,
}

/// Draws a material from the shape's allowed materials, then a color from the shape
/// colors intersected with that material's colors.
///
/// Without a material the shape colors are used unfiltered. Allow-lists naming an
/// undefined material or color fail here.
pub fn choose_random_appearance<'r, R: Rng>(
    rng: &mut R,
    rules: &'r RuleStore,
    shape: &ShapeRule,
) -> Result<Appearance<'r>, RuleError> {
    let materials = rules.allowed_materials_for(shape);
    let material = match materials.choose(rng) {
        Some(name) => Some(rules.material(name)?),
        None => None,
    };

    let colors = rules.composite_colors_for(shape, material);
    let color = match colors.choose(rng) {
        Some(name) => Some(rules.color(name)?),
        None => None,
    };

    Ok(Appearance { material, color })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::store::tests::{sample_document, sample_store};
    use crate::rules::RuleDefaults;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use serde_json::json;

    #[test]
    fn test_appearance_respects_allow_lists() {
        let store = sample_store();
        let cube = store.objects.by_name("cube").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        for _ in 0..100 {
            let appearance = choose_random_appearance(&mut rng, &store, cube).unwrap();
            let material = appearance.material.unwrap().name.as_str();
            let color = appearance.color.unwrap().name.as_str();
            assert!(material == "plastic" || material == "metal");
            match material {
                "metal" => assert_eq!(color, "blue"),
                _ => assert!(color == "red" || color == "blue"),
            }
        }
    }

    #[test]
    fn test_no_material_means_unfiltered_colors() {
        let store = sample_store();
        let sphere = store.objects.by_name("sphere").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let appearance = choose_random_appearance(&mut rng, &store, sphere).unwrap();
        assert!(appearance.material.is_none());
        assert!(appearance.color.is_some());
    }

    #[test]
    fn test_no_colors() {
        let store = sample_store();
        let cone = store.objects.by_name("cone").unwrap();
        let appearance = choose_random_appearance(&mut ChaCha8Rng::seed_from_u64(0), &store, cone).unwrap();
        assert!(appearance.material.is_some());
        assert!(appearance.color.is_none());
    }

    #[test]
    fn test_undefined_names_fail_on_draw() {
        let mut doc = sample_document();
        doc["objects"][1]["allowed_colors"] = json!(["pink"]);
        let store = RuleStore::from_document(doc, RuleDefaults::builtin()).unwrap();
        let sphere = store.objects.by_name("sphere").unwrap();
        let err = choose_random_appearance(&mut ChaCha8Rng::seed_from_u64(0), &store, sphere).unwrap_err();
        assert_eq!(err, RuleError::UndefinedColor("pink".to_string()));
    }
}
