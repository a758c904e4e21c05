//! DTOs for the chat-completions wire format.
//!
//! Requests are serialised from borrowed strings; responses decode into owned
//! DTOs and are reduced to the first choice's message text.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(super) struct ChatRequestDto<'a> {
    pub(super) model: &'a str,
    pub(super) messages: [ChatMessageDto<'a>; 2],
}

#[derive(Debug, Serialize)]
pub(super) struct ChatMessageDto<'a> {
    pub(super) role: &'static str,
    pub(super) content: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatResponseDto {
    #[serde(default)]
    pub(super) choices: Vec<ChatChoiceDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatChoiceDto {
    pub(super) message: ChatReplyDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatReplyDto {
    #[serde(default)]
    pub(super) content: Option<String>,
}

impl ChatResponseDto {
    pub(super) fn into_content(self) -> Result<String, String> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| "response contained no choices".to_owned())?;
        choice
            .message
            .content
            .ok_or_else(|| "first choice carried no message content".to_owned())
    }
}
