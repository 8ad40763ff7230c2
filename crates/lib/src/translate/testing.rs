//! In-memory `ChatApi` / `EngagementApi` doubles that record every call.

use crate::channels::{
    ChatApi, ChatId, ChatMedia, EngagementApi, EngagementMediaKind, SendOptions, TelegramFile,
    TransportError,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCall {
    SendMessage {
        chat_id: ChatId,
        text: String,
        options: SendOptions,
    },
    SendMedia {
        chat_id: ChatId,
        media: ChatMedia,
        url: String,
        caption: String,
    },
    GetFile {
        file_id: String,
    },
    Download {
        file_path: String,
    },
    Answer {
        callback_id: String,
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngagementCall {
    SendText {
        user_id: String,
        text: String,
    },
    SendMedia {
        user_id: String,
        kind: EngagementMediaKind,
        url: String,
        caption: Option<String>,
    },
    Upload {
        file_name: String,
        mime_type: String,
        len: usize,
    },
}

/// Failure injection keyed by operation name: (status, remaining count; None = always).
#[derive(Default)]
struct Failures(Mutex<HashMap<&'static str, (u16, Option<u32>)>>);

impl Failures {
    fn set(&self, op: &'static str, status: u16, times: Option<u32>) {
        self.0.lock().unwrap().insert(op, (status, times));
    }

    fn check(&self, op: &'static str) -> Result<(), TransportError> {
        let mut g = self.0.lock().unwrap();
        let Some((status, remaining)) = g.get_mut(op) else {
            return Ok(());
        };
        let status = *status;
        match remaining {
            Some(0) => return Ok(()),
            Some(n) => *n -= 1,
            None => {}
        }
        Err(TransportError::Status {
            status,
            body: format!("{} failed", op),
        })
    }
}

#[derive(Default)]
pub struct RecordingChat {
    calls: Mutex<Vec<ChatCall>>,
    failures: Failures,
}

impl RecordingChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(self, op: &'static str, status: u16) -> Self {
        self.failures.set(op, status, None);
        self
    }

    pub fn failing_once(self, op: &'static str, status: u16) -> Self {
        self.failures.set(op, status, Some(1));
        self
    }

    pub fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Texts of every sendMessage attempt, in order.
    pub fn sent_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ChatCall::SendMessage { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ChatCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ChatApi for RecordingChat {
    async fn send_message(
        &self,
        chat_id: &ChatId,
        text: &str,
        options: &SendOptions,
    ) -> Result<(), TransportError> {
        self.record(ChatCall::SendMessage {
            chat_id: chat_id.clone(),
            text: text.to_string(),
            options: options.clone(),
        });
        self.failures.check("send_message")
    }

    async fn send_media(
        &self,
        chat_id: &ChatId,
        media: ChatMedia,
        url: &str,
        caption: &str,
        _options: &SendOptions,
    ) -> Result<(), TransportError> {
        self.record(ChatCall::SendMedia {
            chat_id: chat_id.clone(),
            media,
            url: url.to_string(),
            caption: caption.to_string(),
        });
        self.failures.check("send_media")
    }

    async fn get_file(&self, file_id: &str) -> Result<TelegramFile, TransportError> {
        self.record(ChatCall::GetFile {
            file_id: file_id.to_string(),
        });
        self.failures.check("get_file")?;
        Ok(TelegramFile {
            file_id: file_id.to_string(),
            file_path: Some(format!("files/{}", file_id)),
        })
    }

    async fn download_file(&self, file_path: &str) -> Result<Bytes, TransportError> {
        self.record(ChatCall::Download {
            file_path: file_path.to_string(),
        });
        self.failures.check("download_file")?;
        Ok(Bytes::from(format!("bytes:{}", file_path)))
    }

    async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: &str,
    ) -> Result<(), TransportError> {
        self.record(ChatCall::Answer {
            callback_id: callback_query_id.to_string(),
            text: text.to_string(),
        });
        self.failures.check("answer_callback_query")
    }
}

#[derive(Default)]
pub struct RecordingEngagement {
    calls: Mutex<Vec<EngagementCall>>,
    failures: Failures,
}

impl RecordingEngagement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(self, op: &'static str, status: u16) -> Self {
        self.failures.set(op, status, None);
        self
    }

    pub fn calls(&self) -> Vec<EngagementCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: EngagementCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl EngagementApi for RecordingEngagement {
    async fn send_text(&self, user_id: &str, text: &str) -> Result<(), TransportError> {
        self.record(EngagementCall::SendText {
            user_id: user_id.to_string(),
            text: text.to_string(),
        });
        self.failures.check("send_text")
    }

    async fn send_media(
        &self,
        user_id: &str,
        kind: EngagementMediaKind,
        url: &str,
        caption: Option<&str>,
    ) -> Result<(), TransportError> {
        self.record(EngagementCall::SendMedia {
            user_id: user_id.to_string(),
            kind,
            url: url.to_string(),
            caption: caption.map(str::to_string),
        });
        self.failures.check("send_media")
    }

    async fn upload_media(
        &self,
        data: Bytes,
        file_name: &str,
        mime_type: &str,
    ) -> Result<String, TransportError> {
        self.record(EngagementCall::Upload {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            len: data.len(),
        });
        self.failures.check("upload_media")?;
        Ok(format!("https://cdn.test/{}", file_name))
    }
}
