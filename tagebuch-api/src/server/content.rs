use crate::server::auth::AuthService;
use std::sync::Arc;
use tagebuch_common::{
    model::{
        Id,
        post::{NewPost, Post, PostMarker},
    },
    token::TokenVerifyError,
};
use tagebuch_db::client::{DbClient, DbError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Post with id {0} was not found")]
    PostNotFound(Id<PostMarker>),
    #[error("The provided token was rejected: {0}")]
    Unauthorized(#[from] TokenVerifyError),
    #[error("The token resolves to no known user")]
    UnknownUser,
    #[error(transparent)]
    Database(#[from] DbError),
}

#[derive(Clone)]
pub struct ContentService {
    db: Arc<DbClient>,
    auth: AuthService,
}

impl ContentService {
    #[must_use]
    pub fn new(db: Arc<DbClient>, auth: AuthService) -> Self {
        Self { db, auth }
    }

    pub async fn list_posts(&self) -> Result<Vec<Post>, ContentError> {
        Ok(self.db.fetch_all_posts().await?)
    }

    pub async fn get_post(&self, post_id: Id<PostMarker>) -> Result<Post, ContentError> {
        self.db
            .fetch_post(post_id)
            .await?
            .ok_or(ContentError::PostNotFound(post_id))
    }

    /// Persists a post for the bearer of `token`. The token must verify
    /// and its username must still resolve to a user row; no ownership
    /// link is stored on the post itself.
    pub async fn create_post(
        &self,
        post: NewPost,
        token: &str,
    ) -> Result<Id<PostMarker>, ContentError> {
        let username = self.auth.verify_token(token)?;

        if self.db.fetch_user_by_username(&username).await?.is_none() {
            return Err(ContentError::UnknownUser);
        }

        let id = self.db.create_post(&post).await?;
        debug!(author = username.get(), %id, "Created post");

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::testing;
    use tagebuch_common::{model::user::Username, token::TokenIssuer};

    fn username(name: &str) -> Username {
        Username::new(name.to_owned()).unwrap()
    }

    fn new_post() -> NewPost {
        NewPost {
            title: "First".to_owned(),
            content: "Hello".to_owned(),
        }
    }

    async fn token_for(state: &crate::server::ServerState, name: &str) -> String {
        state.auth.register(&username(name), "hunter2").await.unwrap();
        state
            .auth
            .authenticate(&username(name), "hunter2")
            .await
            .unwrap()
            .token
            .unwrap()
            .into_inner()
    }

    #[tokio::test]
    async fn created_post_is_readable() {
        let state = testing::state().await;
        let token = token_for(&state, "walter").await;

        let id = state.content.create_post(new_post(), &token).await.unwrap();

        let fetched = state.content.get_post(id).await.unwrap();
        assert_eq!(fetched.title, "First");
        assert_eq!(fetched.content, "Hello");

        let listed = state.content.list_posts().await.unwrap();
        assert_eq!(listed, vec![fetched]);
    }

    #[tokio::test]
    async fn garbage_token_is_unauthorized() {
        let state = testing::state().await;

        let result = state.content.create_post(new_post(), "not-a-token").await;
        assert!(matches!(
            result,
            Err(ContentError::Unauthorized(TokenVerifyError::InvalidToken))
        ));
    }

    #[tokio::test]
    async fn token_for_nonexistent_user_is_unauthorized() {
        let state = testing::state().await;

        // Signed with the right secret, but the user was never registered.
        let issuer = TokenIssuer::new(testing::TEST_SECRET);
        let token = issuer.issue(&username("ghost")).unwrap();

        let result = state.content.create_post(new_post(), token.get()).await;
        assert!(matches!(result, Err(ContentError::UnknownUser)));
    }

    #[tokio::test]
    async fn missing_post_is_not_found() {
        let state = testing::state().await;

        let result = state.content.get_post(Id::new(9999)).await;
        assert!(matches!(result, Err(ContentError::PostNotFound(_))));
    }
}
