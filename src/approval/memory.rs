use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::bail;

use super::{ApprovalEntity, ApprovalRequest, ApprovalSource, CopyStatus};

#[derive(Debug, Default)]
struct State {
    requests: HashMap<String, ApprovalRequest>,
    entities: Vec<ApprovalEntity>,
}

#[derive(Debug, Default)]
pub struct MemoryApprovals {
    state: Mutex<State>,
}

impl MemoryApprovals {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_request(&self, request: ApprovalRequest, entities: Vec<ApprovalEntity>) {
        let mut state = self.state();
        state.requests.insert(request.id.clone(), request);
        state.entities.extend(entities);
    }

    pub fn entity(&self, entity_id: &str) -> Option<ApprovalEntity> {
        self.state().entities.iter().find(|e| e.id == entity_id).cloned()
    }
}

impl ApprovalSource for MemoryApprovals {
    fn get_request(&self, request_id: &str) -> anyhow::Result<Option<ApprovalRequest>> {
        Ok(self.state().requests.get(request_id).cloned())
    }

    fn get_entities(&self, request_id: &str) -> anyhow::Result<Vec<ApprovalEntity>> {
        Ok(self
            .state()
            .entities
            .iter()
            .filter(|e| e.request_id == request_id)
            .cloned()
            .collect())
    }

    fn update_copy_status(&self, entity_id: &str, status: CopyStatus) -> anyhow::Result<()> {
        let mut state = self.state();
        match state.entities.iter_mut().find(|e| e.id == entity_id) {
            Some(e) => {
                e.copy_status = status;
                Ok(())
            }
            None => bail!("approval entity {entity_id} does not exist"),
        }
    }
}
