//! Turns a channel post into an `IncomingMedia` and feeds it to the
//! Ingestion Pipeline. Mode A (live watch) of the design: only posts in a
//! registered, enabled channel are enqueued, and only the media kinds
//! `FileType::ingestible()` names are extracted.

use std::sync::Arc;
use std::time::Instant;

use teloxide::prelude::*;

use filedex_core::types::FileType;
use filedex_index::model::IncomingMedia;
use filedex_ingest::RawMessage;

use crate::context::Context;

fn extract_media(msg: &Message) -> Option<IncomingMedia> {
    let caption = msg.caption().map(|c| c.to_string());

    if let Some(doc) = msg.document() {
        return Some(IncomingMedia {
            file_id: doc.file.id.clone(),
            file_unique_id: doc.file.unique_id.clone(),
            file_ref: None,
            file_name: doc.file_name.clone().unwrap_or_else(|| doc.file.unique_id.clone()),
            file_size: doc.file.size as i64,
            file_type: FileType::Document,
            mime_type: doc.mime_type.as_ref().map(|m| m.to_string()),
            caption,
        });
    }
    if let Some(video) = msg.video() {
        return Some(IncomingMedia {
            file_id: video.file.id.clone(),
            file_unique_id: video.file.unique_id.clone(),
            file_ref: None,
            file_name: video.file_name.clone().unwrap_or_else(|| video.file.unique_id.clone()),
            file_size: video.file.size as i64,
            file_type: FileType::Video,
            mime_type: video.mime_type.as_ref().map(|m| m.to_string()),
            caption,
        });
    }
    if let Some(audio) = msg.audio() {
        return Some(IncomingMedia {
            file_id: audio.file.id.clone(),
            file_unique_id: audio.file.unique_id.clone(),
            file_ref: None,
            file_name: audio.file_name.clone().unwrap_or_else(|| audio.file.unique_id.clone()),
            file_size: audio.file.size as i64,
            file_type: FileType::Audio,
            mime_type: audio.mime_type.as_ref().map(|m| m.to_string()),
            caption,
        });
    }
    None
}

pub async fn on_channel_post(_bot: Bot, msg: Message, ctx: Arc<Context>) -> ResponseResult<()> {
    let Some(media) = extract_media(&msg) else { return Ok(()) };

    match ctx.channels.is_watched(msg.chat.id.0).await {
        Ok(true) => {}
        Ok(false) => return Ok(()),
        Err(e) => {
            tracing::warn!(error = %e, channel_id = msg.chat.id.0, "could not check watched channels, skipping post");
            return Ok(());
        }
    }

    ctx.ingest_queue.enqueue(RawMessage {
        media,
        received_at: Instant::now(),
    });
    Ok(())
}
