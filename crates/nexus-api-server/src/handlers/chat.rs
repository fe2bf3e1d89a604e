use axum::{
    extract::{Extension, Path},
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::auth::CurrentUser;
use crate::database::{MessageRole, NewMessage, Repository};
use crate::models::chat::{ChatRequest, ChatResponse, ChatTurn, ConversationDetail, DeleteResponse};
use crate::services::{AiEngine, ContextBuilder};
use crate::utils::error::ApiError;

/// Send a message and get the AI response
pub async fn send_message(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(ai_engine): Extension<Arc<AiEngine>>,
    Extension(context_builder): Extension<Arc<ContextBuilder>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("Message must not be empty".to_string()));
    }

    // Get or create conversation (owner-scoped)
    let conversation = match request.conversation_id {
        Some(id) => repository
            .get_conversation(user.id, id)
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?
            .ok_or_else(|| ApiError::NotFound("Conversation not found".to_string()))?,
        None => repository
            .create_conversation(user.id)
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?,
    };

    info!(
        "Chat message: user={}, conversation={}, message_len={}",
        user.id,
        conversation.id,
        request.message.len()
    );

    // Context window over prior history; the new message is appended after it
    let history = repository
        .recent_messages(
            conversation.id,
            context_builder.max_context_messages() as i64,
        )
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    let mut turns = context_builder.build_context(&history);
    turns.push(ChatTurn::new("user", request.message.as_str()));

    // Persist the user message before calling the LLM
    repository
        .insert_message(NewMessage {
            conversation_id: conversation.id,
            role: MessageRole::User,
            content: request.message.clone(),
            tokens_used: 0,
            model: None,
        })
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    let completion = ai_engine.generate(turns).await?;

    repository
        .insert_message(NewMessage {
            conversation_id: conversation.id,
            role: MessageRole::Assistant,
            content: completion.content.clone(),
            tokens_used: completion.tokens_used,
            model: Some(completion.model),
        })
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    repository
        .touch_conversation(conversation.id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(ChatResponse {
        conversation_id: conversation.id,
        message: completion.content,
        tokens_used: completion.tokens_used,
    }))
}

/// List the caller's conversations, most recently updated first
pub async fn list_conversations(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Vec<crate::database::Conversation>>, ApiError> {
    let conversations = repository
        .list_conversations(user.id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(conversations))
}

/// Get a conversation with its full message history
pub async fn get_conversation(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(conversation_id): Path<i64>,
) -> Result<Json<ConversationDetail>, ApiError> {
    let conversation = repository
        .get_conversation(user.id, conversation_id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound("Conversation not found".to_string()))?;

    let messages = repository
        .conversation_messages(conversation.id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(ConversationDetail {
        conversation,
        messages,
    }))
}

/// Delete a conversation; its messages cascade with it
pub async fn delete_conversation(
    Extension(repository): Extension<Arc<Repository>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(conversation_id): Path<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = repository
        .delete_conversation(user.id, conversation_id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    if !deleted {
        return Err(ApiError::NotFound("Conversation not found".to_string()));
    }

    info!("Deleted conversation {} for user {}", conversation_id, user.id);

    Ok(Json(DeleteResponse {
        message: "Conversation deleted successfully".to_string(),
    }))
}
