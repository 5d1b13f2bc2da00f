//! Media extraction and stored-file delivery.

use teloxide::prelude::*;
use teloxide::types::{
    FileId, InputFile, InputMedia, InputMediaPhoto, InputMediaVideo, Message,
};

use crate::core::error::AppResult;
use crate::core::session::MediaKind;
use crate::storage::db::FileRecord;
use crate::telegram::cleanup::CleanupQueue;

/// Media found in an incoming message.
#[derive(Debug, Clone)]
pub struct ExtractedMedia {
    pub kind: MediaKind,
    pub size: i64,
    pub file_id: String,
    pub unique_id: String,
}

/// Pulls the storable media out of a message, if any. For photos the
/// largest rendition is taken.
pub fn extract_media(msg: &Message) -> Option<ExtractedMedia> {
    if let Some(photos) = msg.photo() {
        let best = photos.last()?;
        return Some(ExtractedMedia {
            kind: MediaKind::Photo,
            size: i64::from(best.file.size),
            file_id: best.file.id.0.clone(),
            unique_id: best.file.unique_id.0.clone(),
        });
    }
    if let Some(video) = msg.video() {
        return Some(ExtractedMedia {
            kind: MediaKind::Video,
            size: i64::from(video.file.size),
            file_id: video.file.id.0.clone(),
            unique_id: video.file.unique_id.0.clone(),
        });
    }
    if let Some(animation) = msg.animation() {
        return Some(ExtractedMedia {
            kind: MediaKind::Animation,
            size: i64::from(animation.file.size),
            file_id: animation.file.id.0.clone(),
            unique_id: animation.file.unique_id.0.clone(),
        });
    }
    if let Some(voice) = msg.voice() {
        return Some(ExtractedMedia {
            kind: MediaKind::Voice,
            size: i64::from(voice.file.size),
            file_id: voice.file.id.0.clone(),
            unique_id: voice.file.unique_id.0.clone(),
        });
    }
    if let Some(audio) = msg.audio() {
        return Some(ExtractedMedia {
            kind: MediaKind::Audio,
            size: i64::from(audio.file.size),
            file_id: audio.file.id.0.clone(),
            unique_id: audio.file.unique_id.0.clone(),
        });
    }
    if let Some(document) = msg.document() {
        return Some(ExtractedMedia {
            kind: MediaKind::Document,
            size: i64::from(document.file.size),
            file_id: document.file.id.0.clone(),
            unique_id: document.file.unique_id.0.clone(),
        });
    }
    None
}

fn input_file(record: &FileRecord) -> InputFile {
    InputFile::file_id(FileId(record.file_id.clone()))
}

fn album_eligible(batch: &[FileRecord]) -> bool {
    batch.len() >= 2
        && batch.iter().all(|r| {
            matches!(MediaKind::from_str(&r.kind), Some(MediaKind::Photo | MediaKind::Video))
        })
}

/// Delivers a stored batch to a chat and schedules every sent message
/// for janitor deletion. Photo/video batches go out as media groups
/// (chunks of 10, the Bot API album limit); everything else is sent
/// sequentially. The caption rides on the first item only.
pub async fn deliver_batch(
    bot: &Bot,
    chat_id: ChatId,
    batch: &[FileRecord],
    caption: Option<&str>,
    cleanup: &CleanupQueue,
) -> AppResult<()> {
    if album_eligible(batch) {
        for (chunk_idx, chunk) in batch.chunks(10).enumerate() {
            let media: Vec<InputMedia> = chunk
                .iter()
                .enumerate()
                .map(|(idx, record)| {
                    let with_caption = chunk_idx == 0 && idx == 0;
                    match MediaKind::from_str(&record.kind) {
                        Some(MediaKind::Video) => {
                            let mut m = InputMediaVideo::new(input_file(record));
                            if with_caption {
                                if let Some(c) = caption {
                                    m = m.caption(c);
                                }
                            }
                            InputMedia::Video(m)
                        }
                        _ => {
                            let mut m = InputMediaPhoto::new(input_file(record));
                            if with_caption {
                                if let Some(c) = caption {
                                    m = m.caption(c);
                                }
                            }
                            InputMedia::Photo(m)
                        }
                    }
                })
                .collect();
            let sent = bot.send_media_group(chat_id, media).await?;
            for msg in &sent {
                cleanup.register(chat_id, msg.id);
            }
        }
        return Ok(());
    }

    for (idx, record) in batch.iter().enumerate() {
        let file = input_file(record);
        let caption = if idx == 0 { caption } else { None };
        let sent = match MediaKind::from_str(&record.kind) {
            Some(MediaKind::Photo) => {
                let mut req = bot.send_photo(chat_id, file);
                req.caption = caption.map(str::to_string);
                req.await?
            }
            Some(MediaKind::Video) => {
                let mut req = bot.send_video(chat_id, file);
                req.caption = caption.map(str::to_string);
                req.await?
            }
            Some(MediaKind::Animation) => {
                let mut req = bot.send_animation(chat_id, file);
                req.caption = caption.map(str::to_string);
                req.await?
            }
            Some(MediaKind::Voice) => {
                let mut req = bot.send_voice(chat_id, file);
                req.caption = caption.map(str::to_string);
                req.await?
            }
            Some(MediaKind::Audio) => {
                let mut req = bot.send_audio(chat_id, file);
                req.caption = caption.map(str::to_string);
                req.await?
            }
            _ => {
                let mut req = bot.send_document(chat_id, file);
                req.caption = caption.map(str::to_string);
                req.await?
            }
        };
        cleanup.register(chat_id, sent.id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: &str) -> FileRecord {
        FileRecord {
            code: "c".to_string(),
            kind: kind.to_string(),
            size: 0,
            file_id: "f".to_string(),
            unique_id: "u".to_string(),
            backup_message_id: 1,
            owner_id: 1,
            password: None,
            caption: None,
            album_id: None,
            album_order: None,
            downloads: 0,
            created_at: String::new(),
        }
    }

    #[test]
    fn albums_need_two_homogeneous_visual_items() {
        assert!(album_eligible(&[record("photo"), record("video")]));
        assert!(!album_eligible(&[record("photo")]));
        assert!(!album_eligible(&[record("photo"), record("document")]));
        assert!(!album_eligible(&[record("voice"), record("voice")]));
    }
}
