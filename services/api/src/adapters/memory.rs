//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the storage ports, used for local runs
//! without PostgreSQL (`STORAGE_BACKEND=memory`) and by the router tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use learning_assistant_core::domain::{
    AuthSession, Lecture, LectureId, NewLecture, NewPlan, Plan, PlanId, User, UserCredentials,
};
use learning_assistant_core::ports::{AccountStore, LearningStore, PortError, PortResult};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: Vec<UserCredentials>,
    auth_sessions: HashMap<String, AuthSession>,
    plans: Vec<Plan>,
    lectures: Vec<Lecture>,
}

/// In-memory store. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

//=========================================================================================
// `AccountStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_user(&self, username: &str, hashed_password: &str) -> PortResult<User> {
        let mut tables = self.tables();
        if tables.users.iter().any(|u| u.username == username) {
            return Err(PortError::Conflict(format!("User {} already exists", username)));
        }
        let credentials = UserCredentials {
            user_id: Uuid::new_v4(),
            username: username.to_string(),
            hashed_password: hashed_password.to_string(),
        };
        let user = User {
            user_id: credentials.user_id,
            username: credentials.username.clone(),
        };
        tables.users.push(credentials);
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        self.tables()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", username)))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.tables()
            .users
            .iter()
            .find(|u| u.user_id == user_id)
            .map(|u| User {
                user_id: u.user_id,
                username: u.username.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut tables = self.tables();
        let now = Utc::now();
        tables.auth_sessions.retain(|_, s| s.expires_at > now);
        tables.auth_sessions.insert(
            session_id.to_string(),
            AuthSession {
                id: session_id.to_string(),
                user_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let mut tables = self.tables();
        let session = tables
            .auth_sessions
            .get(session_id)
            .map(|s| (s.user_id, s.expires_at));
        match session {
            Some((user_id, expires_at)) if expires_at > Utc::now() => Ok(user_id),
            Some(_) => {
                tables.auth_sessions.remove(session_id);
                Err(PortError::Unauthorized)
            }
            None => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables().auth_sessions.remove(session_id);
        Ok(())
    }
}

//=========================================================================================
// `LearningStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl LearningStore for MemoryStore {
    async fn create_plan(&self, plan: NewPlan) -> PortResult<Plan> {
        let mut tables = self.tables();
        let plan = Plan {
            id: tables.plans.len() as PlanId + 1,
            owner_id: plan.owner_id,
            goal: plan.goal,
            content: plan.content,
            created_at: Utc::now(),
        };
        tables.plans.push(plan.clone());
        Ok(plan)
    }

    async fn get_plan_by_id(&self, plan_id: PlanId) -> PortResult<Plan> {
        self.tables()
            .plans
            .iter()
            .find(|p| p.id == plan_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Plan {} not found", plan_id)))
    }

    async fn get_plans_by_owner(&self, owner_id: Uuid) -> PortResult<Vec<Plan>> {
        // Ids grow with insertion order, so reversing gives newest first.
        Ok(self
            .tables()
            .plans
            .iter()
            .rev()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn create_lecture(&self, lecture: NewLecture) -> PortResult<Lecture> {
        let mut tables = self.tables();
        if !tables.plans.iter().any(|p| p.id == lecture.plan_id) {
            return Err(PortError::NotFound(format!("Plan {} not found", lecture.plan_id)));
        }
        let lecture = Lecture {
            id: tables.lectures.len() as LectureId + 1,
            plan_id: lecture.plan_id,
            section: lecture.section,
            content: lecture.content,
            completed: false,
            created_at: Utc::now(),
        };
        tables.lectures.push(lecture.clone());
        Ok(lecture)
    }

    async fn get_lecture_by_id(&self, lecture_id: LectureId) -> PortResult<Lecture> {
        self.tables()
            .lectures
            .iter()
            .find(|l| l.id == lecture_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Lecture {} not found", lecture_id)))
    }

    async fn get_lectures_for_plan(&self, plan_id: PlanId) -> PortResult<Vec<Lecture>> {
        Ok(self
            .tables()
            .lectures
            .iter()
            .filter(|l| l.plan_id == plan_id)
            .cloned()
            .collect())
    }

    async fn complete_lecture(&self, lecture_id: LectureId) -> PortResult<()> {
        let mut tables = self.tables();
        let lecture = tables
            .lectures
            .iter_mut()
            .find(|l| l.id == lecture_id)
            .ok_or_else(|| PortError::NotFound(format!("Lecture {} not found", lecture_id)))?;
        lecture.completed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let store = MemoryStore::new();
        store.create_user("ada", "hash").await.unwrap();

        let result = store.create_user("ada", "other").await;
        assert!(matches!(result, Err(PortError::Conflict(_))));
    }

    #[tokio::test]
    async fn expired_sessions_are_rejected() {
        let store = MemoryStore::new();
        let user = store.create_user("ada", "hash").await.unwrap();
        store
            .create_auth_session("live", user.user_id, Utc::now() + Duration::days(1))
            .await
            .unwrap();
        store
            .create_auth_session("stale", user.user_id, Utc::now() - Duration::seconds(1))
            .await
            .unwrap();

        assert_eq!(store.validate_auth_session("live").await.unwrap(), user.user_id);
        assert!(matches!(
            store.validate_auth_session("stale").await,
            Err(PortError::Unauthorized)
        ));

        store.delete_auth_session("live").await.unwrap();
        assert!(store.validate_auth_session("live").await.is_err());
    }

    #[tokio::test]
    async fn expired_sessions_are_pruned() {
        let store = MemoryStore::new();
        let user = store.create_user("ada", "hash").await.unwrap();
        for id in ["old-1", "old-2"] {
            store
                .create_auth_session(id, user.user_id, Utc::now() - Duration::seconds(1))
                .await
                .unwrap();
        }
        assert!(store.validate_auth_session("old-1").await.is_err());
        assert!(!store.tables().auth_sessions.contains_key("old-1"));

        store
            .create_auth_session("fresh", user.user_id, Utc::now() + Duration::days(1))
            .await
            .unwrap();
        let sessions = store.tables();
        assert_eq!(sessions.auth_sessions.len(), 1);
        assert!(sessions.auth_sessions.contains_key("fresh"));
    }

    #[tokio::test]
    async fn plans_are_listed_newest_first_per_owner() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        for goal in ["first", "second"] {
            store
                .create_plan(NewPlan {
                    owner_id: owner,
                    goal: goal.to_string(),
                    content: "Plan.".to_string(),
                })
                .await
                .unwrap();
        }
        store
            .create_plan(NewPlan {
                owner_id: Uuid::new_v4(),
                goal: "someone else".to_string(),
                content: "Plan.".to_string(),
            })
            .await
            .unwrap();

        let goals: Vec<String> = store
            .get_plans_by_owner(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.goal)
            .collect();
        assert_eq!(goals, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn lecture_requires_existing_plan() {
        let store = MemoryStore::new();
        let result = store
            .create_lecture(NewLecture {
                plan_id: 7,
                section: "intro".to_string(),
                content: "Lecture.".to_string(),
            })
            .await;
        assert!(matches!(result, Err(PortError::NotFound(_))));
    }
}
