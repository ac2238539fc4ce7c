//! ステップ列の並べ替え
//!
//! 追加・削除・移動のいずれの後も、順序は 1..N の密な連番に保たれる。

use serde::{Deserialize, Serialize};

use super::{WorkflowStep, WorkflowStepId};
use crate::{DomainError, value_objects::StepOrder};

/// ステップの移動方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

/// 並び順どおりに 1..N を振り直す
pub(crate) fn renumber(steps: Vec<WorkflowStep>) -> Vec<WorkflowStep> {
    steps
        .into_iter()
        .enumerate()
        .map(|(index, step)| step.with_order(StepOrder::from_index(index)))
        .collect()
}

/// 順序が 1..N の密な連番か
pub fn is_dense(steps: &[WorkflowStep]) -> bool {
    steps
        .iter()
        .enumerate()
        .all(|(index, step)| step.order() == StepOrder::from_index(index))
}

fn position_of(steps: &[WorkflowStep], id: &WorkflowStepId) -> Result<usize, DomainError> {
    steps
        .iter()
        .position(|s| s.id() == id)
        .ok_or_else(|| DomainError::NotFound {
            entity_type: "WorkflowStep",
            id:          id.to_string(),
        })
}

/// 隣のステップと入れ替える
///
/// 先頭を上へ、末尾を下へ移動しようとした場合はバリデーションエラー。
pub(crate) fn move_step(
    mut steps: Vec<WorkflowStep>,
    id: &WorkflowStepId,
    direction: MoveDirection,
) -> Result<Vec<WorkflowStep>, DomainError> {
    let pos = position_of(&steps, id)?;
    let neighbour = match direction {
        MoveDirection::Up if pos == 0 => {
            return Err(DomainError::Validation(
                "先頭のステップは上に移動できません".to_string(),
            ));
        }
        MoveDirection::Up => pos - 1,
        MoveDirection::Down if pos + 1 >= steps.len() => {
            return Err(DomainError::Validation(
                "末尾のステップは下に移動できません".to_string(),
            ));
        }
        MoveDirection::Down => pos + 1,
    };
    steps.swap(pos, neighbour);
    Ok(renumber(steps))
}

/// ステップを削除し、後続を繰り上げる
pub(crate) fn remove_step(
    mut steps: Vec<WorkflowStep>,
    id: &WorkflowStepId,
) -> Result<Vec<WorkflowStep>, DomainError> {
    let pos = position_of(&steps, id)?;
    steps.remove(pos);
    Ok(renumber(steps))
}
