use crate::record::{PostRecord, UserRecord};
use sqlx::{
    query, query_as,
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
};
use std::str::FromStr;
use tagebuch_common::model::{
    Id, ModelValidationError,
    post::{NewPost, Post, PostMarker},
    user::{PasswordHash, User, UserMarker, Username},
};
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("A uniqueness constraint was violated")]
    UniqueViolation,
    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::UniqueViolation
            }
            _ => DbError::Sqlx(err),
        }
    }
}

pub struct DbClient {
    pool: SqlitePool,
}

impl DbClient {
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        Ok(Self { pool })
    }

    /// Connects to a fresh in-memory database. A single pooled connection
    /// that never retires, since each SQLite memory connection is its own
    /// database.
    pub async fn connect_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Ok(Self { pool })
    }

    pub async fn init_schema(&self) -> Result<()> {
        query(
            "
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        query(
            "
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                content TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn create_user(
        &self,
        username: &Username,
        password_hash: &PasswordHash,
    ) -> Result<Id<UserMarker>> {
        let mut tx = self.pool.begin().await?;

        let result = query("INSERT INTO users (username, password) VALUES (?1, ?2)")
            .bind(username.get())
            .bind(password_hash.get())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.last_insert_rowid().into())
    }

    pub async fn fetch_user_by_username(&self, username: &Username) -> Result<Option<User>> {
        let record = query_as::<_, UserRecord>(
            "SELECT id, username, password FROM users WHERE username = ?1",
        )
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    pub async fn create_post(&self, post: &NewPost) -> Result<Id<PostMarker>> {
        let mut tx = self.pool.begin().await?;

        let result = query("INSERT INTO posts (title, content) VALUES (?1, ?2)")
            .bind(&post.title)
            .bind(&post.content)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.last_insert_rowid().into())
    }

    pub async fn fetch_post(&self, post_id: Id<PostMarker>) -> Result<Option<Post>> {
        let record =
            query_as::<_, PostRecord>("SELECT id, title, content FROM posts WHERE id = ?1")
                .bind(post_id.get())
                .fetch_optional(&self.pool)
                .await?;

        Ok(record.map(Post::from))
    }

    pub async fn fetch_all_posts(&self) -> Result<Vec<Post>> {
        let records = query_as::<_, PostRecord>("SELECT id, title, content FROM posts")
            .fetch_all(&self.pool)
            .await?;

        Ok(records.into_iter().map(Post::from).collect())
    }

    #[cfg(test)]
    async fn delete_user(&self, user_id: Id<UserMarker>) -> Result<()> {
        query("DELETE FROM users WHERE id = ?1")
            .bind(user_id.get())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn client() -> DbClient {
        let client = DbClient::connect_in_memory().await.unwrap();
        client.init_schema().await.unwrap();
        client
    }

    fn username(name: &str) -> Username {
        Username::new(name.to_owned()).unwrap()
    }

    fn hash() -> PasswordHash {
        PasswordHash::new("$2b$12$fixture".to_owned())
    }

    #[tokio::test]
    async fn create_and_fetch_user() {
        let client = client().await;

        let id = client.create_user(&username("walter"), &hash()).await.unwrap();
        let user = client
            .fetch_user_by_username(&username("walter"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(user.id, id);
        assert_eq!(user.username, username("walter"));
        assert_eq!(user.password_hash, hash());
    }

    #[tokio::test]
    async fn fetch_unknown_user_is_none() {
        let client = client().await;

        let user = client.fetch_user_by_username(&username("nobody")).await.unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn duplicate_username_is_a_unique_violation() {
        let client = client().await;

        let first_id = client.create_user(&username("walter"), &hash()).await.unwrap();
        let second = client
            .create_user(&username("walter"), &PasswordHash::new("$2b$12$other".to_owned()))
            .await;

        assert!(matches!(second, Err(DbError::UniqueViolation)));

        // First registration is unaffected.
        let user = client
            .fetch_user_by_username(&username("walter"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, first_id);
        assert_eq!(user.password_hash, hash());
    }

    #[tokio::test]
    async fn deleted_user_no_longer_resolves() {
        let client = client().await;

        let id = client.create_user(&username("walter"), &hash()).await.unwrap();
        client.delete_user(id).await.unwrap();

        let user = client.fetch_user_by_username(&username("walter")).await.unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn create_and_fetch_post() {
        let client = client().await;

        let post = NewPost {
            title: "First".to_owned(),
            content: "Hello".to_owned(),
        };
        let id = client.create_post(&post).await.unwrap();

        let fetched = client.fetch_post(id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "First");
        assert_eq!(fetched.content, "Hello");

        // Unmodified posts read back identically.
        let again = client.fetch_post(id).await.unwrap().unwrap();
        assert_eq!(fetched, again);

        assert!(client.fetch_post(Id::new(9999)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn all_posts_lists_everything() {
        let client = client().await;

        for n in 0..3 {
            let post = NewPost {
                title: format!("Post {n}"),
                content: format!("Content {n}"),
            };
            client.create_post(&post).await.unwrap();
        }

        let posts = client.fetch_all_posts().await.unwrap();
        assert_eq!(posts.len(), 3);
    }
}
