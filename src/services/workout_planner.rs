//! Builds the base training week and its four-week progression.

use std::collections::BTreeSet;

use crate::models::{
    ExperienceLevel, FitnessGoal, MuscleGroup, PlanWeek, PlannedExercise, PostureFlag, RepRange,
    WorkoutDay,
};
use crate::services::workout_templates::{
    exercises_for, find_exercise, goal_parameters, progression_rules, split_label, training_split, week_focus,
    ExerciseTemplate, GoalParameters, SplitDay,
};

pub const MIN_EXERCISES_PER_DAY: usize = 5;
pub const MAX_EXERCISES_PER_DAY: usize = 8;
/// Seconds spent performing one set
const SET_WORK_SECONDS: u32 = 30;
/// Femur-to-height ratio above which squat variations are swapped for goblet squats
pub const LONG_FEMUR_RATIO: f64 = 0.31;

const REP_MULTIPLIERS: [f64; 4] = [1.0, 1.05, 1.10, 1.15];
const DELOAD_SET_FACTOR: f64 = 0.7;

#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutInputs {
    pub goal: FitnessGoal,
    pub days_per_week: u8,
    pub experience: ExperienceLevel,
    pub posture_flags: Vec<PostureFlag>,
    pub femur_to_height_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutProgram {
    pub days_per_week: u8,
    pub base_week: Vec<WorkoutDay>,
    pub weeks: Vec<PlanWeek>,
    pub rationale: String,
    pub vision_adjustments: Vec<String>,
    pub progression_rules: Vec<String>,
    pub equipment_needed: Vec<String>,
    pub estimated_session_minutes: u32,
}

/// Requested days clamped to 3-6 and to what the experience level supports
pub fn effective_training_days(requested: u8, experience: ExperienceLevel) -> u8 {
    requested.clamp(3, 6).min(experience.max_training_days())
}

pub fn build_program(inputs: &WorkoutInputs) -> WorkoutProgram {
    let days = effective_training_days(inputs.days_per_week, inputs.experience);
    let params = goal_parameters(inputs.goal);
    let long_femur = inputs
        .femur_to_height_ratio
        .map(|ratio| ratio > LONG_FEMUR_RATIO)
        .unwrap_or(false);

    let mut vision_adjustments = Vec::new();
    let correctives = corrective_exercises(&inputs.posture_flags, &mut vision_adjustments);
    if long_femur {
        vision_adjustments.push(
            "Squat variations replaced with Goblet Squats to keep the torso upright with longer femurs"
                .to_string(),
        );
    }

    let base_week: Vec<WorkoutDay> = training_split(days)
        .iter()
        .enumerate()
        .map(|(idx, split_day)| {
            let mut exercises = select_exercises(split_day, inputs.experience, &params, long_femur);
            for corrective in &correctives {
                if !exercises.iter().any(|e| e.name == corrective.name) {
                    exercises.push(corrective.clone());
                }
            }

            WorkoutDay {
                day: idx as u8 + 1,
                name: split_day.name.to_string(),
                focus: split_day.groups.to_vec(),
                estimated_minutes: estimate_minutes(&exercises),
                exercises,
            }
        })
        .collect();

    let weeks = (1..=4u8)
        .map(|week| progress_week(&base_week, week, inputs.goal))
        .collect();

    let equipment_needed = base_week
        .iter()
        .flat_map(|day| day.exercises.iter())
        .flat_map(|exercise| exercise.equipment.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let estimated_session_minutes = if base_week.is_empty() {
        0
    } else {
        let total: u32 = base_week.iter().map(|day| day.estimated_minutes).sum();
        (total as f64 / base_week.len() as f64).round() as u32
    };

    let rationale = format!(
        "{days}-day {} split for {} at {} level: {} sets of {} reps with {}s rest.{}",
        split_label(days),
        inputs.goal.label(),
        inputs.experience,
        params.sets,
        params.reps,
        params.rest_seconds,
        if days < inputs.days_per_week {
            format!(
                " Training days reduced from {} to {} to allow recovery at this experience level.",
                inputs.days_per_week, days
            )
        } else {
            String::new()
        }
    );

    WorkoutProgram {
        days_per_week: days,
        base_week,
        weeks,
        rationale,
        vision_adjustments,
        progression_rules: progression_rules(inputs.goal, inputs.experience),
        equipment_needed,
        estimated_session_minutes,
    }
}

fn planned(template: &ExerciseTemplate, params: &GoalParameters) -> PlannedExercise {
    let notes = match template.safety_notes {
        Some(safety) => format!("{}. {}", template.notes, safety),
        None => template.notes.to_string(),
    };

    PlannedExercise {
        name: template.name.to_string(),
        muscle_group: template.muscle_group,
        sets: params.sets,
        reps: params.reps,
        rest_seconds: params.rest_seconds,
        equipment: template.equipment.iter().map(|s| s.to_string()).collect(),
        substitutions: template.substitutions.iter().map(|s| s.to_string()).collect(),
        notes: Some(notes),
        corrective: false,
    }
}

fn eligible(group: MuscleGroup, experience: ExperienceLevel, variation: usize) -> Vec<&'static ExerciseTemplate> {
    let mut pool: Vec<_> = exercises_for(group)
        .iter()
        .filter(|e| e.difficulty <= experience)
        .collect();
    if !pool.is_empty() {
        let shift = (variation * 2) % pool.len();
        pool.rotate_left(shift);
    }
    pool
}

const GOBLET_SQUAT: &str = "Goblet Squats";

fn is_deep_squat(exercise: &ExerciseTemplate) -> bool {
    exercise.name.contains("Squat") && exercise.name != GOBLET_SQUAT
}

/// Squat variations collapse into a single goblet squat at the position of the first one
fn femur_friendly(pool: Vec<&'static ExerciseTemplate>) -> Vec<&'static ExerciseTemplate> {
    let goblet = find_exercise(GOBLET_SQUAT);
    let mut out: Vec<&'static ExerciseTemplate> = Vec::with_capacity(pool.len());
    for exercise in pool {
        let exercise = match (is_deep_squat(exercise), goblet) {
            (true, Some(goblet)) => goblet,
            (true, None) => continue,
            (false, _) => exercise,
        };
        if !out.iter().any(|chosen| chosen.name == exercise.name) {
            out.push(exercise);
        }
    }
    out
}

/// Round-robin over the day's muscle groups, topped up with unused core work when
/// the groups alone can't fill the minimum
fn select_exercises(
    split_day: &SplitDay,
    experience: ExperienceLevel,
    params: &GoalParameters,
    long_femur: bool,
) -> Vec<PlannedExercise> {
    let target = (split_day.groups.len() * 2).clamp(MIN_EXERCISES_PER_DAY, MAX_EXERCISES_PER_DAY);
    let pools: Vec<Vec<&'static ExerciseTemplate>> = split_day
        .groups
        .iter()
        .map(|group| eligible(*group, experience, split_day.variation))
        .map(|pool| if long_femur { femur_friendly(pool) } else { pool })
        .collect();

    let mut chosen: Vec<&'static ExerciseTemplate> = Vec::new();
    let mut round = 0;
    while chosen.len() < target && pools.iter().any(|pool| pool.len() > round) {
        for pool in &pools {
            if chosen.len() >= target {
                break;
            }
            if let Some(exercise) = pool.get(round) {
                chosen.push(*exercise);
            }
        }
        round += 1;
    }

    if chosen.len() < MIN_EXERCISES_PER_DAY {
        let missing = MIN_EXERCISES_PER_DAY - chosen.len();
        let filler: Vec<_> = eligible(MuscleGroup::Core, experience, split_day.variation)
            .into_iter()
            .filter(|core| !chosen.iter().any(|c| c.name == core.name))
            .take(missing)
            .collect();
        chosen.extend(filler);
    }

    chosen
        .into_iter()
        .map(|template| {
            let mut exercise = planned(template, params);
            if long_femur && template.name == GOBLET_SQUAT {
                exercise.notes = Some("Replaces deeper squat variations for longer femurs".to_string());
            }
            exercise
        })
        .collect()
}

fn corrective(
    name: &str,
    muscle_group: MuscleGroup,
    sets: u32,
    reps: RepRange,
    rest_seconds: u32,
    equipment: &str,
    notes: &str,
) -> PlannedExercise {
    PlannedExercise {
        name: name.to_string(),
        muscle_group,
        sets,
        reps,
        rest_seconds,
        equipment: vec![equipment.to_string()],
        substitutions: Vec::new(),
        notes: Some(notes.to_string()),
        corrective: true,
    }
}

fn corrective_exercises(flags: &[PostureFlag], adjustments: &mut Vec<String>) -> Vec<PlannedExercise> {
    let mut correctives = Vec::new();

    for flag in flags {
        match flag {
            PostureFlag::RoundedShoulders => {
                correctives.push(corrective(
                    "Face Pulls",
                    MuscleGroup::Shoulders,
                    3,
                    RepRange::new(12, 15),
                    60,
                    "cable_machine",
                    "Corrective exercise for rounded shoulders",
                ));
                correctives.push(corrective(
                    "Thoracic Spine Opener",
                    MuscleGroup::Back,
                    2,
                    RepRange::new(10, 10),
                    30,
                    "bodyweight",
                    "Mobility drill for rounded shoulders",
                ));
                adjustments.push("Added Face Pulls and Thoracic Spine Opener for rounded shoulders".to_string());
            }
            PostureFlag::AnteriorPelvicTilt => {
                correctives.push(corrective(
                    "Dead Bug",
                    MuscleGroup::Core,
                    2,
                    RepRange::new(8, 8),
                    45,
                    "bodyweight",
                    "Core stability for anterior pelvic tilt, 8 reps each side",
                ));
                adjustments.push("Added Dead Bug for anterior pelvic tilt".to_string());
            }
            PostureFlag::ForwardHead => {
                correctives.push(corrective(
                    "Chin Tucks",
                    MuscleGroup::Shoulders,
                    3,
                    RepRange::new(10, 10),
                    30,
                    "bodyweight",
                    "Deep neck flexor drill for forward head posture",
                ));
                adjustments.push("Added Chin Tucks for forward head posture".to_string());
            }
            PostureFlag::AsymmetricShoulders => {
                correctives.push(corrective(
                    "Single-arm Dumbbell Row",
                    MuscleGroup::Back,
                    3,
                    RepRange::new(10, 12),
                    60,
                    "dumbbell",
                    "Unilateral work to balance shoulder height, start with the weaker side",
                ));
                adjustments.push("Added Single-arm Dumbbell Row for asymmetric shoulders".to_string());
            }
            PostureFlag::KneeValgus => {
                correctives.push(corrective(
                    "Banded Lateral Walks",
                    MuscleGroup::Legs,
                    2,
                    RepRange::new(12, 15),
                    30,
                    "resistance_band",
                    "Glute activation to keep knees tracking over toes",
                ));
                adjustments.push("Added Banded Lateral Walks for knee valgus".to_string());
            }
        }
    }

    correctives
}

pub fn estimate_minutes(exercises: &[PlannedExercise]) -> u32 {
    let seconds: u32 = exercises
        .iter()
        .map(|e| e.sets * (SET_WORK_SECONDS + e.rest_seconds))
        .sum();
    (seconds as f64 / 60.0).round() as u32
}

fn progress_week(base_week: &[WorkoutDay], week: u8, goal: FitnessGoal) -> PlanWeek {
    let deload = week == 4 && goal == FitnessGoal::GainMuscle;
    let multiplier = if deload {
        DELOAD_SET_FACTOR
    } else {
        REP_MULTIPLIERS[usize::from(week.clamp(1, 4) - 1)]
    };

    let workouts = base_week
        .iter()
        .map(|day| {
            let exercises: Vec<PlannedExercise> = day
                .exercises
                .iter()
                .map(|exercise| {
                    let mut exercise = exercise.clone();
                    if deload {
                        exercise.sets = ((exercise.sets as f64 * DELOAD_SET_FACTOR) as u32).max(2);
                    } else if !exercise.corrective {
                        exercise.reps = exercise.reps.scaled(multiplier);
                    }
                    exercise
                })
                .collect();

            WorkoutDay {
                estimated_minutes: estimate_minutes(&exercises),
                exercises,
                ..day.clone()
            }
        })
        .collect();

    PlanWeek {
        week,
        focus: week_focus(week, deload).to_string(),
        intensity_multiplier: multiplier,
        deload,
        progression_note: (week > 1 && !deload)
            .then(|| format!("Increase weight by 2.5-5% from week {}", week - 1)),
        workouts,
    }
}
