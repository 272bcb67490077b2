use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::repo::CredentialStore,
    error::ApiResult,
    state::AppState,
    users::dto::{UpdateUserRequest, UserSummary},
};

/// Account administration. Callers must already hold an `AdminUser`.
#[derive(Clone)]
pub struct UserAdmin {
    users: Arc<dyn CredentialStore>,
}

impl FromRef<AppState> for UserAdmin {
    fn from_ref(state: &AppState) -> Self {
        Self {
            users: state.users.clone(),
        }
    }
}

impl UserAdmin {
    pub async fn list(&self) -> ApiResult<Vec<UserSummary>> {
        let users = self.users.list().await?;
        Ok(users.into_iter().map(UserSummary::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn update(&self, actor: Uuid, id: Uuid, req: UpdateUserRequest) -> ApiResult<u64> {
        let n = self.users.update_role_status(id, req.role, req.status).await?;
        info!(%actor, target = %id, role = ?req.role, status = ?req.status, rows = n, "user updated");
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::repo_types::{NewUser, Role, Status},
        testing::Harness,
    };

    async fn seed(h: &Harness, email: &str) -> Uuid {
        h.users
            .create(NewUser {
                name: "Ana".into(),
                email: email.into(),
                password_hash: "x".into(),
                role: Role::User,
                is_verified: true,
                verification_token: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn lists_every_account() {
        let h = Harness::new();
        seed(&h, "a@example.com").await;
        seed(&h, "b@example.com").await;
        let all = UserAdmin::from_ref(&h.state).list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|u| u.role == Role::User && u.status == Status::Active));
    }

    #[tokio::test]
    async fn update_changes_role_and_status() {
        let h = Harness::new();
        let id = seed(&h, "a@example.com").await;
        let admin = UserAdmin::from_ref(&h.state);

        let n = admin
            .update(
                Uuid::new_v4(),
                id,
                UpdateUserRequest {
                    role: Role::Admin,
                    status: Status::Inactive,
                },
            )
            .await
            .unwrap();
        assert_eq!(n, 1);
        let stored = h.users.get(id).await.unwrap();
        assert_eq!(stored.role, Role::Admin);
        assert_eq!(stored.status, Status::Inactive);
    }

    #[tokio::test]
    async fn update_of_unknown_user_reports_zero_rows() {
        let h = Harness::new();
        let n = UserAdmin::from_ref(&h.state)
            .update(
                Uuid::new_v4(),
                Uuid::new_v4(),
                UpdateUserRequest {
                    role: Role::User,
                    status: Status::Active,
                },
            )
            .await
            .unwrap();
        assert_eq!(n, 0);
    }
}
