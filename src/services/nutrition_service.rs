//! Calorie and macro targets.
//!
//! Harris-Benedict BMR, activity multipliers for TDEE, a goal factor and
//! optional photo-analysis adjustments produce the calorie target, which is
//! then clamped to safety limits and split into macros and meals.

use thiserror::Error;

use crate::models::{
    ActivityLevel, ConfidenceLevel, DietaryRestriction, FitnessGoal, MacroSplit, Macros,
    MealSuggestion, MealType, MicronutrientTargets, NutritionPlan, Sex,
};

pub const MIN_CALORIES_MALE: f64 = 1500.0;
pub const MIN_CALORIES_FEMALE: f64 = 1200.0;
/// Largest allowed deficit below TDEE, as a fraction
pub const MAX_DEFICIT: f64 = 0.25;
pub const MIN_PROTEIN_G_PER_KG: f64 = 0.8;
pub const MAX_PROTEIN_G_PER_KG: f64 = 3.0;
pub const HYDRATION_ML_PER_KG: f64 = 35.0;
pub const MIN_FIBER_G: u32 = 25;
const KCAL_PER_G_FIBER_TARGET: u32 = 80;
const SODIUM_LIMIT_MG: u32 = 2300;
const CALCIUM_MG: u32 = 1000;

const KCAL_PER_G_PROTEIN: f64 = 4.0;
const KCAL_PER_G_CARBS: f64 = 4.0;
const KCAL_PER_G_FAT: f64 = 9.0;

const MEAL_DISTRIBUTION: [(MealType, f64); 4] = [
    (MealType::Breakfast, 0.25),
    (MealType::Lunch, 0.35),
    (MealType::Dinner, 0.30),
    (MealType::Snack, 0.10),
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NutritionError {
    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), NutritionError> {
    if !value.is_finite() || value < min || value > max {
        return Err(NutritionError::OutOfRange { field, value, min, max });
    }
    Ok(())
}

/// Body data the formulas run on. Construction re-checks the same ranges the
/// request layer enforces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyStats {
    pub weight_kg: f64,
    pub height_cm: f64,
    pub age: u32,
    pub sex: Sex,
}

impl BodyStats {
    pub fn new(weight_kg: f64, height_cm: f64, age: u32, sex: Sex) -> Result<Self, NutritionError> {
        check_range("weight_kg", weight_kg, 30.0, 300.0)?;
        check_range("height_cm", height_cm, 100.0, 250.0)?;
        check_range("age", age as f64, 13.0, 100.0)?;

        Ok(Self {
            weight_kg,
            height_cm,
            age,
            sex,
        })
    }
}

/// Photo-analysis signals that shift the calorie target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisionSignal {
    pub body_fat_percentage: f64,
    pub confidence: ConfidenceLevel,
}

pub fn bmr_harris_benedict(stats: &BodyStats) -> f64 {
    let w = stats.weight_kg;
    let h = stats.height_cm;
    let a = stats.age as f64;

    match stats.sex {
        Sex::Male => 88.362 + 13.397 * w + 4.799 * h - 5.677 * a,
        Sex::Female => 447.593 + 9.247 * w + 3.098 * h - 4.330 * a,
    }
}

pub fn tdee(bmr: f64, activity: ActivityLevel) -> f64 {
    bmr * activity.multiplier()
}

pub fn goal_calorie_factor(goal: FitnessGoal) -> f64 {
    match goal {
        FitnessGoal::LoseFat => 0.80,
        FitnessGoal::GainMuscle => 1.15,
        FitnessGoal::Strength => 1.10,
        FitnessGoal::Recomposition | FitnessGoal::Maintenance => 1.0,
    }
}

pub fn macro_split(goal: FitnessGoal) -> MacroSplit {
    let (protein, carbs, fat) = match goal {
        FitnessGoal::LoseFat | FitnessGoal::Recomposition => (0.35, 0.35, 0.30),
        FitnessGoal::GainMuscle | FitnessGoal::Strength => (0.30, 0.45, 0.25),
        FitnessGoal::Maintenance => (0.25, 0.45, 0.30),
    };
    MacroSplit { protein, carbs, fat }
}

pub fn minimum_calories(sex: Sex, tdee: f64) -> f64 {
    let floor = match sex {
        Sex::Male => MIN_CALORIES_MALE,
        Sex::Female => MIN_CALORIES_FEMALE,
    };
    floor.max(tdee * (1.0 - MAX_DEFICIT))
}

/// Fiber scales with intake; iron needs are higher for women.
pub fn micronutrient_targets(target_calories: u32, sex: Sex) -> MicronutrientTargets {
    MicronutrientTargets {
        fiber_g: MIN_FIBER_G.max(target_calories / KCAL_PER_G_FIBER_TARGET),
        sodium_mg: SODIUM_LIMIT_MG,
        calcium_mg: CALCIUM_MG,
        iron_mg: match sex {
            Sex::Female => 18,
            Sex::Male => 8,
        },
    }
}

struct VisionAdjustment {
    calories: f64,
    protein_shift: f64,
    messages: Vec<String>,
}

fn vision_adjustment(signal: &VisionSignal) -> VisionAdjustment {
    let mut adjustment = VisionAdjustment {
        calories: 0.0,
        protein_shift: 0.0,
        messages: Vec::new(),
    };

    if signal.body_fat_percentage > 25.0 {
        adjustment.calories = -200.0;
        adjustment.protein_shift = 0.05;
        adjustment
            .messages
            .push("Reduced calories and raised protein based on estimated body fat".to_string());
    } else if signal.body_fat_percentage < 12.0 {
        adjustment.calories = 100.0;
        adjustment
            .messages
            .push("Added calories to support lean mass at low body fat".to_string());
    }

    if signal.confidence == ConfidenceLevel::Low && adjustment.calories != 0.0 {
        adjustment.calories /= 2.0;
        adjustment
            .messages
            .push("Photo analysis confidence is low, calorie adjustment halved".to_string());
    }

    adjustment
}

/// Split `calories` into whole grams, keeping protein inside the per-kg limits.
pub fn calculate_macros(calories: f64, split: MacroSplit, weight_kg: f64) -> (Macros, MacroSplit) {
    let min_protein_kcal = MIN_PROTEIN_G_PER_KG * weight_kg * KCAL_PER_G_PROTEIN;
    let max_protein_kcal = MAX_PROTEIN_G_PER_KG * weight_kg * KCAL_PER_G_PROTEIN;

    let protein_kcal = (calories * split.protein)
        .clamp(min_protein_kcal, max_protein_kcal)
        .min(calories);
    let remaining = (calories - protein_kcal).max(0.0);

    let carb_share = split.carbs / (split.carbs + split.fat);
    let carbs_kcal = remaining * carb_share;
    let fat_kcal = remaining - carbs_kcal;

    let macros = Macros {
        protein_g: (protein_kcal / KCAL_PER_G_PROTEIN).round() as u32,
        carbs_g: (carbs_kcal / KCAL_PER_G_CARBS).round() as u32,
        fat_g: (fat_kcal / KCAL_PER_G_FAT).round() as u32,
    };

    let effective = if calories > 0.0 {
        MacroSplit {
            protein: round_to(protein_kcal / calories, 3),
            carbs: round_to(carbs_kcal / calories, 3),
            fat: round_to(fat_kcal / calories, 3),
        }
    } else {
        split
    };

    (macros, effective)
}

pub fn build_nutrition_plan(
    stats: &BodyStats,
    goal: FitnessGoal,
    activity: ActivityLevel,
    vision: Option<&VisionSignal>,
    restrictions: &[DietaryRestriction],
) -> NutritionPlan {
    let bmr = bmr_harris_benedict(stats);
    let tdee = tdee(bmr, activity);

    let mut target = tdee * goal_calorie_factor(goal);
    let mut split = macro_split(goal);
    let mut adjustments = Vec::new();

    if let Some(signal) = vision {
        let adjustment = vision_adjustment(signal);
        target += adjustment.calories;
        split.protein += adjustment.protein_shift;
        split.carbs -= adjustment.protein_shift;
        adjustments.extend(adjustment.messages);
    }

    let floor = minimum_calories(stats.sex, tdee);
    if target < floor {
        target = floor;
        adjustments.push(format!(
            "Calories raised to the safe minimum of {} kcal",
            floor.round() as u32
        ));
    }

    let target_calories = target.round();
    let (macros, macro_split) = calculate_macros(target_calories, split, stats.weight_kg);

    if (macro_split.protein - split.protein).abs() > 0.001 {
        adjustments.push(format!(
            "Protein kept between {MIN_PROTEIN_G_PER_KG} and {MAX_PROTEIN_G_PER_KG} g per kg of body weight"
        ));
    }

    let meals = meal_suggestions(target_calories, &macros, goal, restrictions, &mut adjustments);

    let mut notes = vec![
        format!(
            "Eat {}g protein daily to support your {} goal",
            macros.protein_g,
            goal.label()
        ),
        "Spread protein intake across all meals".to_string(),
        "Stay hydrated with at least 8 glasses of water daily".to_string(),
        "Adjust portions based on hunger and energy levels".to_string(),
    ];
    if !restrictions.is_empty() {
        let labels: Vec<&str> = restrictions.iter().map(DietaryRestriction::label).collect();
        notes.push(format!("Meals are chosen to be {}", labels.join(", ")));
    }

    NutritionPlan {
        bmr: round_to(bmr, 1),
        tdee: round_to(tdee, 1),
        target_calories: target_calories as u32,
        macros,
        macro_split,
        micronutrients: micronutrient_targets(target_calories as u32, stats.sex),
        dietary_restrictions: restrictions.to_vec(),
        meals,
        hydration_ml: (stats.weight_kg * HYDRATION_ML_PER_KG).round() as u32,
        adjustments,
        notes,
    }
}

struct MealTemplate {
    name: &'static str,
    description: &'static str,
    ingredients: &'static [&'static str],
    prep_minutes: u32,
    tags: &'static [&'static str],
}

const BREAKFASTS: &[MealTemplate] = &[
    MealTemplate {
        name: "Protein Oatmeal Bowl",
        description: "Creamy oats with protein boost and fresh fruit",
        ingredients: &["Rolled oats", "Protein powder", "Banana", "Berries", "Almond butter"],
        prep_minutes: 10,
        tags: &["high_protein", "vegetarian", "balanced"],
    },
    MealTemplate {
        name: "Greek Yogurt Parfait",
        description: "Layered yogurt with crunchy granola and fruit",
        ingredients: &["Greek yogurt", "Granola", "Mixed berries", "Honey", "Nuts"],
        prep_minutes: 5,
        tags: &["high_protein", "vegetarian", "quick"],
    },
    MealTemplate {
        name: "Veggie Scramble",
        description: "Scrambled eggs packed with colorful vegetables",
        ingredients: &["Eggs", "Spinach", "Bell peppers", "Onions", "Cheese", "Avocado"],
        prep_minutes: 15,
        tags: &["high_protein", "vegetarian", "low_carb", "gluten_free"],
    },
    MealTemplate {
        name: "Protein Smoothie Bowl",
        description: "Thick smoothie topped with crunchy granola",
        ingredients: &["Pea protein powder", "Frozen berries", "Banana", "Spinach", "Almond milk", "Granola"],
        prep_minutes: 10,
        tags: &["high_protein", "vegetarian", "quick", "vegan", "dairy_free"],
    },
    MealTemplate {
        name: "Tofu Scramble",
        description: "Turmeric-spiced tofu with greens and potatoes",
        ingredients: &["Firm tofu", "Spinach", "Bell peppers", "Nutritional yeast", "Potatoes"],
        prep_minutes: 15,
        tags: &["high_protein", "vegetarian", "vegan", "gluten_free", "dairy_free"],
    },
];

const LUNCHES: &[MealTemplate] = &[
    MealTemplate {
        name: "Grilled Chicken Salad",
        description: "Fresh salad with lean grilled chicken",
        ingredients: &["Chicken breast", "Mixed greens", "Cherry tomatoes", "Cucumber", "Olive oil", "Balsamic vinegar"],
        prep_minutes: 20,
        tags: &["high_protein", "low_carb", "low_calorie", "gluten_free", "dairy_free"],
    },
    MealTemplate {
        name: "Quinoa Buddha Bowl",
        description: "Nutritious bowl with plant-based protein",
        ingredients: &["Quinoa", "Chickpeas", "Roasted vegetables", "Tahini", "Lemon", "Spinach"],
        prep_minutes: 25,
        tags: &["vegetarian", "high_fiber", "balanced", "vegan", "gluten_free", "dairy_free"],
    },
    MealTemplate {
        name: "Turkey and Avocado Wrap",
        description: "Protein-packed wrap with healthy fats",
        ingredients: &["Whole wheat tortilla", "Turkey breast", "Avocado", "Lettuce", "Tomato", "Hummus"],
        prep_minutes: 10,
        tags: &["high_protein", "quick", "dairy_free"],
    },
    MealTemplate {
        name: "Salmon and Sweet Potato",
        description: "Baked salmon with roasted vegetables",
        ingredients: &["Salmon fillet", "Sweet potato", "Broccoli", "Olive oil", "Lemon"],
        prep_minutes: 30,
        tags: &["high_protein", "omega3", "high_iron", "gluten_free", "dairy_free"],
    },
];

const DINNERS: &[MealTemplate] = &[
    MealTemplate {
        name: "Lean Beef Stir-fry",
        description: "Quick stir-fry with lean protein and veggies",
        ingredients: &["Lean beef", "Mixed vegetables", "Brown rice", "Soy sauce", "Ginger", "Garlic"],
        prep_minutes: 25,
        tags: &["high_protein", "high_iron", "dairy_free"],
    },
    MealTemplate {
        name: "Baked Cod with Vegetables",
        description: "Light fish dinner with seasonal vegetables",
        ingredients: &["Cod fillet", "Asparagus", "Zucchini", "Olive oil", "Herbs", "Lemon"],
        prep_minutes: 30,
        tags: &["high_protein", "low_calorie", "low_carb", "gluten_free", "dairy_free"],
    },
    MealTemplate {
        name: "Chicken and Rice Bowl",
        description: "Balanced meal with lean protein and complex carbs",
        ingredients: &["Chicken thigh", "Brown rice", "Steamed broccoli", "Carrots", "Teriyaki sauce"],
        prep_minutes: 35,
        tags: &["high_protein", "balanced", "dairy_free"],
    },
    MealTemplate {
        name: "Lentil Curry",
        description: "Hearty plant-based curry with complete nutrition",
        ingredients: &["Red lentils", "Coconut milk", "Spinach", "Tomatoes", "Curry spices", "Brown rice"],
        prep_minutes: 40,
        tags: &["vegetarian", "high_fiber", "plant_protein", "vegan", "gluten_free", "dairy_free"],
    },
];

const SNACKS: &[MealTemplate] = &[
    MealTemplate {
        name: "Apple with Almond Butter",
        description: "Simple snack with natural sweetness and protein",
        ingredients: &["Apple", "Almond butter"],
        prep_minutes: 2,
        tags: &["quick", "healthy_fats", "balanced", "vegetarian", "vegan", "gluten_free", "dairy_free"],
    },
    MealTemplate {
        name: "Protein Smoothie",
        description: "Quick protein boost for recovery",
        ingredients: &["Protein powder", "Banana", "Spinach", "Almond milk"],
        prep_minutes: 5,
        tags: &["high_protein", "quick", "post_workout", "vegetarian", "gluten_free"],
    },
    MealTemplate {
        name: "Trail Mix",
        description: "Energy-dense mix for on-the-go",
        ingredients: &["Mixed nuts", "Dried fruit", "Dark chocolate chips"],
        prep_minutes: 1,
        tags: &["healthy_fats", "energy", "vegetarian", "gluten_free"],
    },
    MealTemplate {
        name: "Cottage Cheese Bowl",
        description: "Creamy high-protein snack with natural sweetness",
        ingredients: &["Cottage cheese", "Berries", "Honey", "Chopped nuts"],
        prep_minutes: 3,
        tags: &["high_protein", "low_calorie", "quick", "vegetarian", "gluten_free"],
    },
];

/// Tags in order of preference for each goal
fn preferred_tags(goal: FitnessGoal) -> &'static [&'static str] {
    match goal {
        FitnessGoal::LoseFat => &["low_calorie", "high_protein", "low_carb"],
        FitnessGoal::GainMuscle => &["high_protein", "energy", "balanced"],
        FitnessGoal::Strength => &["high_protein", "high_iron", "post_workout"],
        FitnessGoal::Recomposition => &["high_protein", "low_carb", "balanced"],
        FitnessGoal::Maintenance => &["balanced", "quick"],
    }
}

fn templates_for(meal: MealType) -> &'static [MealTemplate] {
    match meal {
        MealType::Breakfast => BREAKFASTS,
        MealType::Lunch => LUNCHES,
        MealType::Dinner => DINNERS,
        MealType::Snack => SNACKS,
    }
}

fn fits(template: &MealTemplate, restrictions: &[DietaryRestriction]) -> bool {
    restrictions.iter().all(|r| template.tags.contains(&r.tag()))
}

/// Best-scoring template that satisfies every restriction; ties keep table order
fn pick_template<'a>(
    templates: &'a [MealTemplate],
    goal: FitnessGoal,
    restrictions: &[DietaryRestriction],
) -> Option<&'a MealTemplate> {
    let preferred = preferred_tags(goal);
    let score = |template: &MealTemplate| -> usize {
        preferred
            .iter()
            .enumerate()
            .filter(|(_, tag)| template.tags.contains(tag))
            .map(|(idx, _)| preferred.len() - idx)
            .sum()
    };

    let mut best: Option<&MealTemplate> = None;
    for template in templates.iter().filter(|t| fits(t, restrictions)) {
        if best.map_or(true, |current| score(template) > score(current)) {
            best = Some(template);
        }
    }
    best
}

/// Falls back to the unrestricted choice when no template fits; the caller is told so.
fn select_template(
    meal: MealType,
    goal: FitnessGoal,
    restrictions: &[DietaryRestriction],
) -> (&'static MealTemplate, bool) {
    let templates = templates_for(meal);
    match pick_template(templates, goal, restrictions) {
        Some(template) => (template, true),
        None => (pick_template(templates, goal, &[]).unwrap_or(&templates[0]), false),
    }
}

fn meal_suggestions(
    calories: f64,
    daily: &Macros,
    goal: FitnessGoal,
    restrictions: &[DietaryRestriction],
    adjustments: &mut Vec<String>,
) -> Vec<MealSuggestion> {
    MEAL_DISTRIBUTION
        .iter()
        .map(|&(meal, ratio)| {
            let (template, fits) = select_template(meal, goal, restrictions);
            if !fits {
                adjustments.push(format!(
                    "No {} option matches every dietary restriction; review {}",
                    meal.as_str(),
                    template.name
                ));
            }

            MealSuggestion {
                meal,
                name: template.name.to_string(),
                description: template.description.to_string(),
                calories: (calories * ratio).round() as u32,
                macros: Macros {
                    protein_g: (daily.protein_g as f64 * ratio).round() as u32,
                    carbs_g: (daily.carbs_g as f64 * ratio).round() as u32,
                    fat_g: (daily.fat_g as f64 * ratio).round() as u32,
                },
                ingredients: template.ingredients.iter().map(|s| s.to_string()).collect(),
                prep_minutes: template.prep_minutes,
            }
        })
        .collect()
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn male_80kg() -> BodyStats {
        BodyStats::new(80.0, 180.0, 30, Sex::Male).unwrap()
    }

    #[test]
    fn test_bmr_harris_benedict_male() {
        // 88.362 + 13.397*80 + 4.799*180 - 5.677*30
        let expected = 88.362 + 1071.76 + 863.82 - 170.31;
        assert!((bmr_harris_benedict(&male_80kg()) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_bmr_harris_benedict_female() {
        let stats = BodyStats::new(60.0, 165.0, 25, Sex::Female).unwrap();
        // 447.593 + 9.247*60 + 3.098*165 - 4.330*25
        let expected = 447.593 + 554.82 + 511.17 - 108.25;
        assert!((bmr_harris_benedict(&stats) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_tdee_multipliers() {
        assert!((tdee(1000.0, ActivityLevel::Sedentary) - 1200.0).abs() < 1e-9);
        assert!((tdee(1000.0, ActivityLevel::Moderate) - 1550.0).abs() < 1e-9);
        assert!((tdee(1000.0, ActivityLevel::Athlete) - 1900.0).abs() < 1e-9);
    }

    #[test]
    fn test_body_stats_rejects_out_of_range() {
        assert_matches!(
            BodyStats::new(25.0, 180.0, 30, Sex::Male),
            Err(NutritionError::OutOfRange { field: "weight_kg", .. })
        );
        assert_matches!(
            BodyStats::new(80.0, 260.0, 30, Sex::Male),
            Err(NutritionError::OutOfRange { field: "height_cm", .. })
        );
        assert_matches!(
            BodyStats::new(80.0, 180.0, 12, Sex::Male),
            Err(NutritionError::OutOfRange { field: "age", .. })
        );
        assert!(BodyStats::new(f64::NAN, 180.0, 30, Sex::Male).is_err());
    }

    #[test]
    fn test_fat_loss_plan() {
        let stats = male_80kg();
        let plan = build_nutrition_plan(&stats, FitnessGoal::LoseFat, ActivityLevel::Moderate, None, &[]);

        let expected_tdee = bmr_harris_benedict(&stats) * 1.55;
        assert_eq!(plan.target_calories, (expected_tdee * 0.8).round() as u32);
        assert_eq!(plan.hydration_ml, 2800);
        assert_eq!(plan.meals.len(), 4);
        assert!(plan.adjustments.is_empty());

        let diff = plan.macros.calories() as i64 - plan.target_calories as i64;
        assert!(diff.abs() <= 9, "macro calories off by {diff}");
    }

    #[test]
    fn test_calorie_floor_for_small_female() {
        let stats = BodyStats::new(40.0, 150.0, 60, Sex::Female).unwrap();
        let plan = build_nutrition_plan(&stats, FitnessGoal::LoseFat, ActivityLevel::Sedentary, None, &[]);

        assert_eq!(plan.target_calories, 1200);
        assert!(plan.adjustments.iter().any(|a| a.contains("safe minimum")));
    }

    #[test]
    fn test_high_body_fat_adjustment() {
        let stats = male_80kg();
        let baseline = build_nutrition_plan(&stats, FitnessGoal::Maintenance, ActivityLevel::Moderate, None, &[]);
        let signal = VisionSignal {
            body_fat_percentage: 28.0,
            confidence: ConfidenceLevel::High,
        };
        let adjusted = build_nutrition_plan(
            &stats,
            FitnessGoal::Maintenance,
            ActivityLevel::Moderate,
            Some(&signal),
            &[],
        );

        assert_eq!(adjusted.target_calories + 200, baseline.target_calories);
        assert!(adjusted.macro_split.protein > baseline.macro_split.protein);
    }

    #[test]
    fn test_low_confidence_halves_adjustment() {
        let stats = male_80kg();
        let baseline = build_nutrition_plan(&stats, FitnessGoal::Maintenance, ActivityLevel::Moderate, None, &[]);
        let signal = VisionSignal {
            body_fat_percentage: 10.0,
            confidence: ConfidenceLevel::Low,
        };
        let adjusted = build_nutrition_plan(
            &stats,
            FitnessGoal::Maintenance,
            ActivityLevel::Moderate,
            Some(&signal),
            &[],
        );

        assert_eq!(adjusted.target_calories, baseline.target_calories + 50);
        assert_eq!(adjusted.adjustments.len(), 2);
    }

    #[test]
    fn test_protein_clamped_to_minimum() {
        // 300 kg at maintenance: 25% protein is below 0.8 g/kg
        let (macros, split) = calculate_macros(3000.0, macro_split(FitnessGoal::Maintenance), 300.0);
        assert_eq!(macros.protein_g, 240);
        assert!(split.protein > 0.25);
    }

    #[test]
    fn test_meal_selection_prefers_goal_tags() {
        let name = |meal, goal| select_template(meal, goal, &[]).0.name;
        assert_eq!(name(MealType::Dinner, FitnessGoal::LoseFat), "Baked Cod with Vegetables");
        assert_eq!(name(MealType::Dinner, FitnessGoal::Maintenance), "Chicken and Rice Bowl");
        assert_eq!(name(MealType::Snack, FitnessGoal::Strength), "Protein Smoothie");
    }

    #[test]
    fn test_micronutrient_targets() {
        let lean = micronutrient_targets(1600, Sex::Female);
        assert_eq!(lean.fiber_g, MIN_FIBER_G);
        assert_eq!(lean.iron_mg, 18);

        let bulk = micronutrient_targets(3200, Sex::Male);
        assert_eq!(bulk.fiber_g, 40);
        assert_eq!(bulk.iron_mg, 8);
        assert_eq!((bulk.sodium_mg, bulk.calcium_mg), (2300, 1000));
    }

    #[test]
    fn test_vegan_plan_only_serves_vegan_meals() {
        let restrictions = [DietaryRestriction::Vegan, DietaryRestriction::GlutenFree];
        let plan = build_nutrition_plan(
            &male_80kg(),
            FitnessGoal::GainMuscle,
            ActivityLevel::Active,
            None,
            &restrictions,
        );

        let names: Vec<&str> = plan.meals.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Tofu Scramble", "Quinoa Buddha Bowl", "Lentil Curry", "Apple with Almond Butter"]);
        assert_eq!(plan.dietary_restrictions, restrictions);
        assert!(plan.adjustments.is_empty());
        assert!(plan.notes.iter().any(|n| n.contains("vegan, gluten free")));
    }

    #[test]
    fn test_unsatisfiable_restriction_falls_back() {
        const ONLY_MEAT: &[MealTemplate] = &[MealTemplate {
            name: "Steak",
            description: "Seared steak",
            ingredients: &["Sirloin"],
            prep_minutes: 15,
            tags: &["high_protein", "gluten_free"],
        }];

        assert!(pick_template(ONLY_MEAT, FitnessGoal::Strength, &[DietaryRestriction::Vegetarian]).is_none());
        assert_eq!(
            pick_template(ONLY_MEAT, FitnessGoal::Strength, &[DietaryRestriction::GlutenFree]).map(|t| t.name),
            Some("Steak")
        );
    }

    fn any_goal() -> impl Strategy<Value = FitnessGoal> {
        prop_oneof![
            Just(FitnessGoal::LoseFat),
            Just(FitnessGoal::GainMuscle),
            Just(FitnessGoal::Strength),
            Just(FitnessGoal::Recomposition),
            Just(FitnessGoal::Maintenance),
        ]
    }

    fn any_activity() -> impl Strategy<Value = ActivityLevel> {
        prop_oneof![
            Just(ActivityLevel::Sedentary),
            Just(ActivityLevel::Light),
            Just(ActivityLevel::Moderate),
            Just(ActivityLevel::Active),
            Just(ActivityLevel::Athlete),
        ]
    }

    proptest! {
        #[test]
        fn prop_macros_add_up_to_target(
            weight in 40.0f64..200.0,
            height in 140.0f64..210.0,
            age in 16u32..90,
            female in any::<bool>(),
            goal in any_goal(),
            activity in any_activity(),
            body_fat in 5.0f64..45.0,
        ) {
            let sex = if female { Sex::Female } else { Sex::Male };
            let stats = BodyStats::new(weight, height, age, sex).unwrap();
            let signal = VisionSignal { body_fat_percentage: body_fat, confidence: ConfidenceLevel::Medium };
            let plan = build_nutrition_plan(&stats, goal, activity, Some(&signal), &[]);

            let drift = (plan.macros.calories() as i64 - plan.target_calories as i64).abs();
            prop_assert!(drift <= 9, "macros {} kcal vs target {}", plan.macros.calories(), plan.target_calories);
            prop_assert!(plan.target_calories as f64 >= minimum_calories(sex, plan.tdee) - 1.0);
            prop_assert!(plan.macros.protein_g as f64 >= (MIN_PROTEIN_G_PER_KG * weight).floor());
            prop_assert!(plan.micronutrients.fiber_g >= MIN_FIBER_G);
        }
    }
}
