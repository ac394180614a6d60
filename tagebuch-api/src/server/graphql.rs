use crate::server::{
    auth::{AuthError, AuthService},
    content::{ContentError, ContentService},
};
use async_graphql::{
    Context, EmptySubscription, Error, ErrorExtensions, Object, Result, Schema, SimpleObject,
};
use tagebuch_common::model::{
    post::{NewPost, Post},
    user::{InvalidUsernameError, Username},
};

pub type GatewaySchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(auth: AuthService, content: ContentService) -> GatewaySchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(auth)
        .data(content)
        .finish()
}

#[derive(Clone, Eq, PartialEq, Debug, SimpleObject)]
#[graphql(name = "Post")]
pub struct PostType {
    pub id: i64,
    pub title: String,
    pub content: String,
}

impl From<Post> for PostType {
    fn from(post: Post) -> Self {
        Self {
            id: post.id.get(),
            title: post.title,
            content: post.content,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, SimpleObject)]
pub struct AuthenticateUser {
    pub ok: bool,
    pub token: Option<String>,
}

impl ErrorExtensions for ContentError {
    fn extend(&self) -> Error {
        let code = match self {
            ContentError::PostNotFound(_) => "NOT_FOUND",
            ContentError::Unauthorized(_) | ContentError::UnknownUser => "UNAUTHORIZED",
            ContentError::Database(_) => "INTERNAL",
        };

        Error::new(self.to_string()).extend_with(|_, e| e.set("code", code))
    }
}

impl ErrorExtensions for AuthError {
    fn extend(&self) -> Error {
        let code = match self {
            AuthError::UsernameTaken => "CONFLICT",
            AuthError::Password(_) | AuthError::TokenIssue(_) | AuthError::Database(_) => {
                "INTERNAL"
            }
        };

        Error::new(self.to_string()).extend_with(|_, e| e.set("code", code))
    }
}

fn invalid_username(err: &InvalidUsernameError) -> Error {
    Error::new(err.to_string()).extend_with(|_, e| e.set("code", "BAD_REQUEST"))
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn all_posts(&self, ctx: &Context<'_>) -> Result<Vec<PostType>> {
        let content = ctx.data_unchecked::<ContentService>();

        let posts = content.list_posts().await.map_err(|e| e.extend())?;
        Ok(posts.into_iter().map(PostType::from).collect())
    }

    async fn post_by_id(&self, ctx: &Context<'_>, post_id: i64) -> Result<PostType> {
        let content = ctx.data_unchecked::<ContentService>();

        let post = content
            .get_post(post_id.into())
            .await
            .map_err(|e| e.extend())?;
        Ok(post.into())
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_new_post(
        &self,
        ctx: &Context<'_>,
        title: String,
        content: String,
        token: String,
    ) -> Result<bool> {
        let service = ctx.data_unchecked::<ContentService>();

        let post = NewPost { title, content };
        service
            .create_post(post, &token)
            .await
            .map_err(|e| e.extend())?;
        Ok(true)
    }

    async fn create_new_user(
        &self,
        ctx: &Context<'_>,
        username: String,
        password: String,
    ) -> Result<bool> {
        let auth = ctx.data_unchecked::<AuthService>();

        let username = Username::new(username).map_err(|e| invalid_username(&e))?;
        auth.register(&username, &password)
            .await
            .map_err(|e| e.extend())?;
        Ok(true)
    }

    async fn authenticate_user(
        &self,
        ctx: &Context<'_>,
        username: String,
        password: String,
    ) -> Result<AuthenticateUser> {
        let auth = ctx.data_unchecked::<AuthService>();

        let username = Username::new(username).map_err(|e| invalid_username(&e))?;
        let authentication = auth
            .authenticate(&username, &password)
            .await
            .map_err(|e| e.extend())?;

        Ok(AuthenticateUser {
            ok: authentication.ok,
            token: authentication.token.map(|t| t.into_inner()),
        })
    }
}
