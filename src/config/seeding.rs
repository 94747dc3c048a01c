use std::sync::Arc;

use crate::models::{
    CreateTrainingPlan, ExerciseTemplate, MeasurementType, PlanDayTemplate, TrainingPlan,
};
use crate::services::InMemoryPlanTemplateStore;
use uuid::Uuid;

/// Seeds demo plans into the in-memory plan store for local development
pub struct PlanSeeder {
    plans: Arc<InMemoryPlanTemplateStore>,
}

impl PlanSeeder {
    pub fn new(plans: Arc<InMemoryPlanTemplateStore>) -> Self {
        Self { plans }
    }

    pub async fn seed_demo_plan(&self, user_id: Uuid) -> TrainingPlan {
        let plan = self
            .plans
            .insert_plan(CreateTrainingPlan {
                user_id,
                name: "Full body starter".to_string(),
                days: vec![
                    PlanDayTemplate {
                        weekday: 1,
                        exercises: vec![
                            ExerciseTemplate {
                                name: "Push-ups".to_string(),
                                key: "push-ups".to_string(),
                                instructions: "Keep your body in a straight line and lower your chest to the floor.".to_string(),
                                measurement_type: MeasurementType::None,
                                sets: 3,
                                repetitions: Some(12),
                                duration: None,
                                suggested_weight: None,
                                rest_between_sets: 60,
                                rest_after_exercise: 90,
                            },
                            ExerciseTemplate {
                                name: "Plank".to_string(),
                                key: "plank".to_string(),
                                instructions: "Rest on your forearms and hold your hips level.".to_string(),
                                measurement_type: MeasurementType::Duration,
                                sets: 2,
                                repetitions: None,
                                duration: Some(45),
                                suggested_weight: None,
                                rest_between_sets: 45,
                                rest_after_exercise: 90,
                            },
                        ],
                    },
                    PlanDayTemplate {
                        weekday: 3,
                        exercises: vec![ExerciseTemplate {
                            name: "Goblet squat".to_string(),
                            key: "goblet-squat".to_string(),
                            instructions: "Hold the kettlebell at your chest and squat below parallel.".to_string(),
                            measurement_type: MeasurementType::Weight,
                            sets: 4,
                            repetitions: Some(8),
                            duration: None,
                            suggested_weight: Some(16.0),
                            rest_between_sets: 90,
                            rest_after_exercise: 120,
                        }],
                    },
                ],
            })
            .await;

        tracing::info!(plan_id = %plan.id, %user_id, "Seeded demo training plan");
        plan
    }
}
