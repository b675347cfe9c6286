//! Level descriptors and the level table
//!
//! Levels past the end of the table are synthesized from the last entry
//! using a fixed linear progression.

use serde::{Deserialize, Serialize};

use super::operation::{Operation, OperationKind};
use crate::consts::*;

/// A weighted entry in an explicit operation list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedOperation {
    pub operation: Operation,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

/// An inclusive operand range for one operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRange {
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub min: u32,
    pub max: u32,
}

/// Where a level draws its operations from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationSource {
    /// Explicit list; an entry with weight `n` appears `n` times in the pool
    List(Vec<WeightedOperation>),
    /// Every operand in each range
    Ranges(Vec<OperationRange>),
}

impl OperationSource {
    /// Plain list with weight 1 per entry
    pub fn list(ops: impl IntoIterator<Item = Operation>) -> Self {
        OperationSource::List(
            ops.into_iter()
                .map(|operation| WeightedOperation { operation, weight: 1 })
                .collect(),
        )
    }

    /// Expand into the pool objects are drawn from uniformly
    pub fn expand(&self) -> Vec<Operation> {
        match self {
            OperationSource::List(entries) => entries
                .iter()
                .flat_map(|e| std::iter::repeat_n(e.operation.clone(), e.weight as usize))
                .collect(),
            OperationSource::Ranges(ranges) => ranges
                .iter()
                .flat_map(|r| (r.min..=r.max).map(move |n| Operation::new(r.kind, n)))
                .collect(),
        }
    }
}

/// Immutable description of one level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub level: u32,
    pub target_score: i64,
    pub description: String,
    /// Text read aloud in the level intro
    pub speech_description: String,
    pub operations: OperationSource,
    pub spawn_interval_ms: u32,
    /// Position units per nominal frame
    pub object_speed: f32,
}

/// Ordered table of level descriptors (level 1 first)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelTable {
    levels: Vec<LevelConfig>,
}

impl Default for LevelTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl LevelTable {
    /// Build a table from explicit levels; an empty list yields the standard table
    pub fn new(levels: Vec<LevelConfig>) -> Self {
        if levels.is_empty() {
            log::warn!("Empty level table, using standard levels");
            return Self::standard();
        }
        Self { levels }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// The built-in six-level progression
    pub fn standard() -> Self {
        use OperationKind::*;

        let range = |kind, min, max| OperationRange { kind, min, max };
        let levels = vec![
            LevelConfig {
                level: 1,
                target_score: 10,
                description: "Add it up".into(),
                speech_description: "Level 1. Catch additions to reach 10.".into(),
                operations: OperationSource::list([
                    Operation::add(1),
                    Operation::add(2),
                    Operation::add(3),
                ]),
                spawn_interval_ms: 2500,
                object_speed: 0.004,
            },
            LevelConfig {
                level: 2,
                target_score: 20,
                description: "Watch for minus".into(),
                speech_description: "Level 2. Avoid subtractions and reach 20.".into(),
                operations: OperationSource::Ranges(vec![
                    range(Add, 1, 5),
                    range(Subtract, 1, 3),
                ]),
                spawn_interval_ms: 2200,
                object_speed: 0.005,
            },
            LevelConfig {
                level: 3,
                target_score: 40,
                description: "Doubling".into(),
                speech_description: "Level 3. Times two joins the mix. Reach 40.".into(),
                operations: OperationSource::List(vec![
                    WeightedOperation { operation: Operation::add(3), weight: 2 },
                    WeightedOperation { operation: Operation::add(5), weight: 2 },
                    WeightedOperation { operation: Operation::subtract(4), weight: 2 },
                    WeightedOperation { operation: Operation::multiply(2), weight: 1 },
                ]),
                spawn_interval_ms: 2000,
                object_speed: 0.006,
            },
            LevelConfig {
                level: 4,
                target_score: 60,
                description: "Multiply".into(),
                speech_description: "Level 4. Multiply to reach 60.".into(),
                operations: OperationSource::Ranges(vec![
                    range(Add, 2, 6),
                    range(Subtract, 2, 6),
                    range(Multiply, 2, 3),
                ]),
                spawn_interval_ms: 1800,
                object_speed: 0.0065,
            },
            LevelConfig {
                level: 5,
                target_score: 80,
                description: "Careful with divide".into(),
                speech_description: "Level 5. Division halves your score. Reach 80.".into(),
                operations: OperationSource::Ranges(vec![
                    range(Add, 3, 8),
                    range(Subtract, 3, 8),
                    range(Multiply, 2, 3),
                    range(Divide, 2, 2),
                ]),
                spawn_interval_ms: 1600,
                object_speed: 0.007,
            },
            LevelConfig {
                level: 6,
                target_score: 100,
                description: "Everything".into(),
                speech_description: "Level 6. All operations. Reach 100.".into(),
                operations: OperationSource::Ranges(vec![
                    range(Add, 5, 10),
                    range(Subtract, 5, 10),
                    range(Multiply, 2, 4),
                    range(Divide, 2, 3),
                ]),
                spawn_interval_ms: 1400,
                object_speed: 0.008,
            },
        ];
        Self { levels }
    }

    /// Config for a 1-based level number (0 is treated as 1)
    pub fn level_config(&self, level: u32) -> LevelConfig {
        let level = level.max(1);
        if let Some(config) = self.levels.get(level as usize - 1) {
            return config.clone();
        }

        let Some(last) = self.levels.last() else {
            return Self::standard().level_config(level);
        };
        let scale = level - self.levels.len() as u32;
        let target_score = last
            .target_score
            .saturating_add(i64::from(scale).saturating_mul(TARGET_INCREMENT));

        LevelConfig {
            level,
            target_score,
            description: format!("Level {level}"),
            speech_description: format!("Level {level}. Reach {target_score}."),
            operations: last.operations.clone(),
            spawn_interval_ms: last
                .spawn_interval_ms
                .saturating_sub(scale.saturating_mul(SPAWN_INTERVAL_STEP_MS))
                .max(SPAWN_INTERVAL_FLOOR_MS),
            object_speed: (last.object_speed + scale as f32 * SPEED_STEP).min(SPEED_CAP),
        }
    }
}
