//! Static training data: the exercise catalogue, goal parameters and weekly splits.

use crate::models::{ExperienceLevel, FitnessGoal, MuscleGroup, RepRange};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExerciseTemplate {
    pub name: &'static str,
    pub muscle_group: MuscleGroup,
    pub equipment: &'static [&'static str],
    pub difficulty: ExperienceLevel,
    pub substitutions: &'static [&'static str],
    pub notes: &'static str,
    pub safety_notes: Option<&'static str>,
}

macro_rules! exercise {
    ($group:ident, $name:expr, [$($eq:expr),*], $difficulty:ident, [$($sub:expr),*], $notes:expr) => {
        exercise!($group, $name, [$($eq),*], $difficulty, [$($sub),*], $notes, None)
    };
    ($group:ident, $name:expr, [$($eq:expr),*], $difficulty:ident, [$($sub:expr),*], $notes:expr, $safety:expr) => {
        ExerciseTemplate {
            name: $name,
            muscle_group: MuscleGroup::$group,
            equipment: &[$($eq),*],
            difficulty: ExperienceLevel::$difficulty,
            substitutions: &[$($sub),*],
            notes: $notes,
            safety_notes: $safety,
        }
    };
}

const CHEST: &[ExerciseTemplate] = &[
    exercise!(Chest, "Push-ups", ["bodyweight"], Beginner, ["Incline Push-ups", "Knee Push-ups"],
        "Great foundation exercise", Some("Keep core tight, full range of motion")),
    exercise!(Chest, "Dumbbell Bench Press", ["dumbbells", "bench"], Beginner,
        ["Barbell Bench Press", "Machine Press"], "Control the weight on the way down"),
    exercise!(Chest, "Incline Dumbbell Press", ["dumbbells", "incline_bench"], Intermediate,
        ["Incline Barbell Press", "Push-ups"], "Targets upper chest"),
    exercise!(Chest, "Dips", ["dip_bars"], Intermediate, ["Tricep Dips", "Close-grip Push-ups"],
        "Lean forward for chest emphasis"),
    exercise!(Chest, "Chest Flyes", ["dumbbells", "bench"], Intermediate, ["Cable Flyes", "Pec Deck"],
        "Focus on squeeze at the top"),
];

const BACK: &[ExerciseTemplate] = &[
    exercise!(Back, "Pull-ups", ["pull_up_bar"], Intermediate, ["Lat Pulldown", "Assisted Pull-ups"],
        "Full range of motion, control the descent"),
    exercise!(Back, "Bent-over Rows", ["barbell"], Intermediate, ["Dumbbell Rows", "Cable Rows"],
        "Keep back straight, pull to lower chest"),
    exercise!(Back, "Lat Pulldown", ["cable_machine"], Beginner, ["Pull-ups", "Resistance Band Pulldowns"],
        "Pull to upper chest, squeeze shoulder blades"),
    exercise!(Back, "Deadlifts", ["barbell"], Advanced, ["Romanian Deadlifts", "Trap Bar Deadlifts"],
        "Keep bar close to body, drive through heels", Some("Master form before adding weight")),
    exercise!(Back, "Single-arm Dumbbell Row", ["dumbbell", "bench"], Beginner,
        ["Cable Rows", "Resistance Band Rows"], "Support yourself with opposite arm"),
];

const SHOULDERS: &[ExerciseTemplate] = &[
    exercise!(Shoulders, "Overhead Press", ["dumbbells"], Beginner, ["Military Press", "Machine Press"],
        "Press straight up, keep core tight"),
    exercise!(Shoulders, "Lateral Raises", ["dumbbells"], Beginner,
        ["Cable Lateral Raises", "Resistance Band Raises"], "Control the weight, slight bend in elbows"),
    exercise!(Shoulders, "Face Pulls", ["cable_machine"], Beginner,
        ["Resistance Band Face Pulls", "Reverse Flyes"], "Great for rear delts and posture"),
    exercise!(Shoulders, "Pike Push-ups", ["bodyweight"], Intermediate,
        ["Handstand Push-ups", "Overhead Press"], "Feet elevated, press up and back"),
    exercise!(Shoulders, "Arnold Press", ["dumbbells"], Intermediate,
        ["Regular Shoulder Press", "Machine Press"], "Rotate palms during the movement"),
];

const TRICEPS: &[ExerciseTemplate] = &[
    exercise!(Triceps, "Tricep Dips", ["bodyweight", "bench"], Beginner,
        ["Assisted Dips", "Close-grip Push-ups"], "Keep elbows close to body"),
    exercise!(Triceps, "Close-grip Push-ups", ["bodyweight"], Beginner, ["Diamond Push-ups", "Tricep Dips"],
        "Hands in diamond shape"),
    exercise!(Triceps, "Overhead Tricep Extension", ["dumbbell"], Beginner,
        ["Cable Tricep Extension", "Tricep Dips"], "Keep elbows stationary"),
    exercise!(Triceps, "Tricep Pushdowns", ["cable_machine"], Beginner,
        ["Overhead Extension", "Close-grip Push-ups"], "Keep elbows at sides"),
];

const BICEPS: &[ExerciseTemplate] = &[
    exercise!(Biceps, "Bicep Curls", ["dumbbells"], Beginner, ["Barbell Curls", "Cable Curls"],
        "Control the weight on the way down"),
    exercise!(Biceps, "Hammer Curls", ["dumbbells"], Beginner, ["Cable Hammer Curls", "Resistance Band Curls"],
        "Neutral grip, targets brachialis"),
    exercise!(Biceps, "Chin-ups", ["pull_up_bar"], Intermediate, ["Assisted Chin-ups", "Cable Curls"],
        "Underhand grip, pull chest to bar"),
    exercise!(Biceps, "21s", ["barbell"], Intermediate, ["Regular Curls", "Cable Curls"],
        "7 bottom half, 7 top half, 7 full reps"),
];

const LEGS: &[ExerciseTemplate] = &[
    exercise!(Legs, "Bodyweight Squats", ["bodyweight"], Beginner, ["Goblet Squats", "Wall Sits"],
        "Keep knees in line with toes"),
    exercise!(Legs, "Goblet Squats", ["dumbbell"], Beginner, ["Bodyweight Squats", "Front Squats"],
        "Hold weight at chest level"),
    exercise!(Legs, "Lunges", ["bodyweight"], Beginner, ["Reverse Lunges", "Step-ups"],
        "Step forward, drop back knee down"),
    exercise!(Legs, "Romanian Deadlifts", ["dumbbells"], Intermediate, ["Good Mornings", "Hip Hinges"],
        "Hinge at hips, feel stretch in hamstrings"),
    exercise!(Legs, "Bulgarian Split Squats", ["bodyweight", "bench"], Intermediate,
        ["Reverse Lunges", "Single-leg Squats"], "Rear foot elevated, most weight on front leg"),
    exercise!(Legs, "Calf Raises", ["bodyweight"], Beginner, ["Single-leg Calf Raises", "Seated Calf Raises"],
        "Rise up on toes, squeeze at the top"),
    exercise!(Legs, "Wall Sits", ["bodyweight"], Beginner, ["Squats", "Leg Press"],
        "Back against wall, thighs parallel to floor"),
];

const CORE: &[ExerciseTemplate] = &[
    exercise!(Core, "Plank", ["bodyweight"], Beginner, ["Modified Plank", "Dead Bug"],
        "Keep body in straight line"),
    exercise!(Core, "Dead Bug", ["bodyweight"], Beginner, ["Bird Dog", "Plank"],
        "Opposite arm and leg, keep back flat"),
    exercise!(Core, "Mountain Climbers", ["bodyweight"], Intermediate, ["High Knees", "Plank"],
        "Keep hips level, alternate legs quickly"),
    exercise!(Core, "Russian Twists", ["bodyweight"], Beginner, ["Bicycle Crunches", "Side Planks"],
        "Lean back, twist side to side"),
    exercise!(Core, "Bicycle Crunches", ["bodyweight"], Beginner, ["Regular Crunches", "Russian Twists"],
        "Opposite elbow to knee"),
    exercise!(Core, "Side Plank", ["bodyweight"], Intermediate, ["Modified Side Plank", "Russian Twists"],
        "Body in straight line, hold on side"),
];

pub fn exercises_for(group: MuscleGroup) -> &'static [ExerciseTemplate] {
    match group {
        MuscleGroup::Chest => CHEST,
        MuscleGroup::Back => BACK,
        MuscleGroup::Shoulders => SHOULDERS,
        MuscleGroup::Triceps => TRICEPS,
        MuscleGroup::Biceps => BICEPS,
        MuscleGroup::Legs => LEGS,
        MuscleGroup::Core => CORE,
    }
}

pub fn find_exercise(name: &str) -> Option<&'static ExerciseTemplate> {
    [CHEST, BACK, SHOULDERS, TRICEPS, BICEPS, LEGS, CORE]
        .into_iter()
        .flatten()
        .find(|exercise| exercise.name.eq_ignore_ascii_case(name))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalParameters {
    pub sets: u32,
    pub reps: RepRange,
    pub rest_seconds: u32,
}

pub fn goal_parameters(goal: FitnessGoal) -> GoalParameters {
    let (sets, reps, rest_seconds) = match goal {
        FitnessGoal::LoseFat => (3, RepRange::new(12, 15), 45),
        FitnessGoal::GainMuscle => (4, RepRange::new(8, 12), 60),
        FitnessGoal::Strength => (5, RepRange::new(4, 6), 150),
        FitnessGoal::Recomposition | FitnessGoal::Maintenance => (3, RepRange::new(10, 12), 60),
    };
    GoalParameters {
        sets,
        reps,
        rest_seconds,
    }
}

/// One training day of a weekly split. `variation` rotates exercise choice so
/// repeated days don't get identical sessions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitDay {
    pub name: &'static str,
    pub groups: &'static [MuscleGroup],
    pub variation: usize,
}

const fn day(name: &'static str, groups: &'static [MuscleGroup], variation: usize) -> SplitDay {
    SplitDay {
        name,
        groups,
        variation,
    }
}

use crate::models::MuscleGroup::{Back, Biceps, Chest, Core, Legs, Shoulders, Triceps};

const PUSH: &[MuscleGroup] = &[Chest, Shoulders, Triceps];
const PULL: &[MuscleGroup] = &[Back, Biceps];
const LEGS_CORE: &[MuscleGroup] = &[Legs, Core];

const THREE_DAY: &[SplitDay] = &[
    day("Push", PUSH, 0),
    day("Pull", PULL, 0),
    day("Legs & Core", LEGS_CORE, 0),
];

const FOUR_DAY: &[SplitDay] = &[
    day("Upper A", &[Chest, Back, Shoulders], 0),
    day("Lower A", LEGS_CORE, 0),
    day("Upper B", &[Chest, Back, Biceps, Triceps], 1),
    day("Lower B", LEGS_CORE, 1),
];

const FIVE_DAY: &[SplitDay] = &[
    day("Chest & Shoulders", &[Chest, Shoulders], 0),
    day("Back", &[Back], 0),
    day("Legs", &[Legs], 0),
    day("Shoulders & Arms", &[Shoulders, Biceps, Triceps], 1),
    day("Legs & Core", LEGS_CORE, 1),
];

const SIX_DAY: &[SplitDay] = &[
    day("Push A", PUSH, 0),
    day("Pull A", PULL, 0),
    day("Legs A", LEGS_CORE, 0),
    day("Push B", PUSH, 1),
    day("Pull B", PULL, 1),
    day("Legs B", LEGS_CORE, 1),
];

/// Weekly split for 3 to 6 training days; other values are clamped
pub fn training_split(days_per_week: u8) -> &'static [SplitDay] {
    match days_per_week {
        0..=3 => THREE_DAY,
        4 => FOUR_DAY,
        5 => FIVE_DAY,
        _ => SIX_DAY,
    }
}

pub fn split_label(days_per_week: u8) -> &'static str {
    match days_per_week {
        0..=3 => "push/pull/legs",
        4 => "upper/lower",
        5 => "body-part",
        _ => "push/pull/legs twice-weekly",
    }
}

pub fn week_focus(week: u8, deload: bool) -> &'static str {
    match week {
        1 => "Foundation - Learning movements and building base",
        2 => "Development - Increasing intensity and volume",
        3 => "Intensification - Heavier loads and higher effort",
        _ if deload => "Deload - Reduced volume for recovery",
        _ => "Peak - Maximum effort and progressive overload",
    }
}

pub fn progression_rules(goal: FitnessGoal, experience: ExperienceLevel) -> Vec<String> {
    let mut rules: Vec<String> = match goal {
        FitnessGoal::LoseFat => vec![
            "Increase total volume about 5% per week".into(),
            "Keep intensity stable and extend cardio duration".into(),
        ],
        FitnessGoal::GainMuscle => vec![
            "Add 2.5-5% load once you reach the top of the rep range".into(),
            "Increase volume up to 10% per week in weeks 1-3".into(),
            "Deload in week 4 with reduced sets".into(),
        ],
        FitnessGoal::Strength => vec![
            "Add 2.5-5% load on main lifts when every set is completed".into(),
            "Rest fully between heavy sets".into(),
        ],
        FitnessGoal::Recomposition => vec![
            "Increase volume about 7.5% per week".into(),
            "Alternate heavier and lighter sessions".into(),
        ],
        FitnessGoal::Maintenance => vec![
            "Keep loads steady and prioritise consistency".into(),
        ],
    };

    rules.push(format!(
        "Raise weekly volume by no more than {:.0}% at {} level",
        experience.max_volume_increase() * 100.0,
        experience
    ));
    rules
}
