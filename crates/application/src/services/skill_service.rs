use std::sync::Arc;

use domain::{Page, PageRequest, Skill, SkillId};
use tracing::info;

use crate::{clock::Clock, error::ApplicationError, repository::SkillRepository};

pub struct SkillServiceDependencies {
    pub skill_repository: Arc<dyn SkillRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct SkillService {
    deps: SkillServiceDependencies,
}

impl SkillService {
    pub fn new(deps: SkillServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn create(&self, name: &str) -> Result<Skill, ApplicationError> {
        let skill = Skill::new(SkillId::generate(), name, self.deps.clock.now())?;
        self.ensure_name_free(&skill.name, None).await?;
        let stored = self.deps.skill_repository.create(skill).await?;
        info!(skill_id = %stored.id, skill = %stored.name, "创建技能");
        Ok(stored)
    }

    pub async fn list(
        &self,
        name: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Skill>, ApplicationError> {
        Ok(self.deps.skill_repository.list(name, page).await?)
    }

    pub async fn get(&self, id: SkillId) -> Result<Skill, ApplicationError> {
        self.deps
            .skill_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("skill", id))
    }

    pub async fn update(&self, id: SkillId, name: &str) -> Result<Skill, ApplicationError> {
        let mut skill = self.get(id).await?;
        skill.rename(name, self.deps.clock.now())?;
        self.ensure_name_free(&skill.name, Some(id)).await?;
        Ok(self.deps.skill_repository.update(skill).await?)
    }

    /// 删除技能，同时从职位与订阅者中移除
    pub async fn delete(&self, id: SkillId) -> Result<Skill, ApplicationError> {
        let skill = self.get(id).await?;
        self.deps.skill_repository.delete(id).await?;
        info!(skill_id = %id, "删除技能");
        Ok(skill)
    }

    async fn ensure_name_free(
        &self,
        name: &str,
        current: Option<SkillId>,
    ) -> Result<(), ApplicationError> {
        match self.deps.skill_repository.find_by_name(name).await? {
            Some(existing) if Some(existing.id) != current => {
                Err(ApplicationError::already_exists("skill", name))
            }
            _ => Ok(()),
        }
    }
}
