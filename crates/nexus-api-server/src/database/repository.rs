use super::models::{Conversation, Document, Message, MessageRole, NewMessage, User};
use super::DbPool;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::debug;

pub struct Repository {
    pub pool: DbPool,
}

/// Row shape for messages; role is stored as TEXT and mapped to the enum here.
#[derive(FromRow)]
struct MessageRow {
    id: i64,
    conversation_id: i64,
    role: String,
    content: String,
    tokens_used: i32,
    model: Option<String>,
    created_at: DateTime<Utc>,
    metadata: serde_json::Value,
}

impl MessageRow {
    fn into_message(self) -> Result<Message> {
        let role = MessageRole::parse(&self.role)
            .ok_or_else(|| anyhow!("Unknown message role in storage: {}", self.role))?;
        Ok(Message {
            id: self.id,
            conversation_id: self.conversation_id,
            role,
            content: self.content,
            tokens_used: self.tokens_used,
            model: self.model,
            created_at: self.created_at,
            metadata: self.metadata,
        })
    }
}

impl Repository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Ensure all tables and indexes exist
    pub async fn ensure_schema(&self) -> Result<()> {
        let pool = self.pool.get_pool();

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                full_name TEXT,
                is_active BOOLEAN NOT NULL DEFAULT true,
                preferences JSONB NOT NULL DEFAULT '{}'::jsonb,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS conversations (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id),
                title TEXT NOT NULL DEFAULT 'New Conversation',
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                metadata JSONB NOT NULL DEFAULT '{}'::jsonb
            )"#,
        )
        .execute(pool)
        .await?;

        // Deleting a conversation removes its messages
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS messages (
                id BIGSERIAL PRIMARY KEY,
                conversation_id BIGINT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                tokens_used INT NOT NULL DEFAULT 0,
                model TEXT,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                metadata JSONB NOT NULL DEFAULT '{}'::jsonb
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS documents (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id),
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                file_type TEXT,
                file_size INT,
                vector_id TEXT,
                is_indexed BOOLEAN NOT NULL DEFAULT false,
                created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                metadata JSONB NOT NULL DEFAULT '{}'::jsonb
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_conversations_user ON conversations(user_id)",
        )
        .execute(pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, created_at)",
        )
        .execute(pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_user ON documents(user_id)")
            .execute(pool)
            .await?;

        debug!("Database schema ensured");
        Ok(())
    }

    // ============ USERS ============

    pub async fn create_user(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
        full_name: Option<&str>,
    ) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (email, username, password_hash, full_name)
               VALUES ($1, $2, $3, $4)
               RETURNING *"#,
        )
        .bind(email)
        .bind(username)
        .bind(password_hash)
        .bind(full_name)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(self.pool.get_pool())
            .await?;

        Ok(user)
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(self.pool.get_pool())
            .await?;

        Ok(user)
    }

    pub async fn get_user_by_id(&self, user_id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(self.pool.get_pool())
            .await?;

        Ok(user)
    }

    pub async fn update_user_profile(
        &self,
        user_id: i64,
        full_name: Option<&str>,
        preferences: Option<&serde_json::Value>,
    ) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"UPDATE users SET
                full_name = COALESCE($2, full_name),
                preferences = COALESCE($3, preferences),
                updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(user_id)
        .bind(full_name)
        .bind(preferences)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(user)
    }

    // ============ CONVERSATIONS ============

    pub async fn create_conversation(&self, user_id: i64) -> Result<Conversation> {
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"INSERT INTO conversations (user_id) VALUES ($1) RETURNING *"#,
        )
        .bind(user_id)
        .fetch_one(self.pool.get_pool())
        .await?;

        debug!(
            "Created conversation {} for user {}",
            conversation.id, user_id
        );
        Ok(conversation)
    }

    /// Owner-scoped lookup: returns None on id OR owner mismatch.
    pub async fn get_conversation(
        &self,
        user_id: i64,
        conversation_id: i64,
    ) -> Result<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(
            "SELECT * FROM conversations WHERE id = $1 AND user_id = $2",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(self.pool.get_pool())
        .await?;

        Ok(conversation)
    }

    pub async fn list_conversations(&self, user_id: i64) -> Result<Vec<Conversation>> {
        let conversations = sqlx::query_as::<_, Conversation>(
            "SELECT * FROM conversations WHERE user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(conversations)
    }

    /// Delete a conversation (messages cascade). Returns false when the
    /// conversation does not exist or belongs to another user.
    pub async fn delete_conversation(&self, user_id: i64, conversation_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1 AND user_id = $2")
            .bind(conversation_id)
            .bind(user_id)
            .execute(self.pool.get_pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn touch_conversation(&self, conversation_id: i64) -> Result<()> {
        sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE id = $1")
            .bind(conversation_id)
            .execute(self.pool.get_pool())
            .await?;

        Ok(())
    }

    // ============ MESSAGES ============

    pub async fn insert_message(&self, message: NewMessage) -> Result<Message> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"INSERT INTO messages (conversation_id, role, content, tokens_used, model)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(message.conversation_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.tokens_used)
        .bind(&message.model)
        .fetch_one(self.pool.get_pool())
        .await?;

        row.into_message()
    }

    /// Last `limit` messages of a conversation, oldest first.
    pub async fn recent_messages(&self, conversation_id: i64, limit: i64) -> Result<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"SELECT * FROM messages
               WHERE conversation_id = $1
               ORDER BY created_at DESC, id DESC
               LIMIT $2"#,
        )
        .bind(conversation_id)
        .bind(limit)
        .fetch_all(self.pool.get_pool())
        .await?;

        let mut messages = rows
            .into_iter()
            .map(MessageRow::into_message)
            .collect::<Result<Vec<_>>>()?;
        messages.reverse();

        Ok(messages)
    }

    /// Full message history, chronological (for display).
    pub async fn conversation_messages(&self, conversation_id: i64) -> Result<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"SELECT * FROM messages
               WHERE conversation_id = $1
               ORDER BY created_at ASC, id ASC"#,
        )
        .bind(conversation_id)
        .fetch_all(self.pool.get_pool())
        .await?;

        rows.into_iter().map(MessageRow::into_message).collect()
    }

    // ============ DOCUMENTS ============

    pub async fn create_document(
        &self,
        user_id: i64,
        title: &str,
        content: &str,
        file_type: Option<&str>,
        file_size: i32,
    ) -> Result<Document> {
        let document = sqlx::query_as::<_, Document>(
            r#"INSERT INTO documents (user_id, title, content, file_type, file_size)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(user_id)
        .bind(title)
        .bind(content)
        .bind(file_type)
        .bind(file_size)
        .fetch_one(self.pool.get_pool())
        .await?;

        debug!("Created document {} for user {}", document.id, user_id);
        Ok(document)
    }

    pub async fn list_documents(&self, user_id: i64) -> Result<Vec<Document>> {
        let documents = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(documents)
    }
}
