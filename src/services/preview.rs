//! Preview state machine.
//!
//! `Closed -> Loading -> ShowingImage | ShowingText -> Closed`. A preview
//! request hands out a ticket; the ticket is resolved away from the
//! controller (decoding runs on a blocking worker) and applied afterwards.
//! A result whose ticket no longer matches the current request is dropped,
//! so closing or reselecting while a decode is in flight never shows stale
//! content.
//!
//! Content only ever reaches a [`RenderSurface`] as inert data: an image
//! source or a literal string.

use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::file_record::FileRecord;
use crate::utils::classifier::{classify, FileCategory};
use crate::utils::payload::PayloadCodec;

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewSession {
    pub record: FileRecord,
    pub category: FileCategory,
    /// Decoded text; empty for images.
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PreviewState {
    Closed,
    Loading { record: FileRecord, generation: u64 },
    ShowingImage(PreviewSession),
    ShowingText(PreviewSession),
}

/// What a surface is asked to display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreviewView {
    Image {
        file_id: Uuid,
        file_name: String,
        /// The stored payload, passed through untouched.
        source: String,
    },
    Text {
        file_id: Uuid,
        file_name: String,
        category: FileCategory,
        /// Shown verbatim.
        content: String,
    },
}

pub trait RenderSurface {
    fn render(&mut self, view: &PreviewView);
    fn clear(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewOutcome {
    Shown,
    /// The ticket was superseded or the preview was closed meanwhile.
    Discarded,
}

#[derive(Debug)]
pub struct PreviewTicket {
    generation: u64,
    file_id: Uuid,
    category: FileCategory,
    payload: String,
    codec: PayloadCodec,
}

#[derive(Debug)]
enum Content {
    Image(String),
    Text(String),
}

#[derive(Debug)]
pub struct ResolvedPreview {
    generation: u64,
    file_id: Uuid,
    result: Result<Content, AppError>,
}

impl PreviewTicket {
    pub async fn resolve(self) -> ResolvedPreview {
        let result = match self.category {
            FileCategory::Image => Ok(Content::Image(self.payload)),
            FileCategory::RenderableText | FileCategory::Opaque => {
                let codec = self.codec;
                let payload = self.payload;
                tokio::task::spawn_blocking(move || codec.decode_text(&payload))
                    .await
                    .map_err(|e| AppError::InternalServerError(format!("Task join error: {}", e)))
                    .and_then(|decoded| decoded)
                    .map(Content::Text)
            }
        };

        ResolvedPreview {
            generation: self.generation,
            file_id: self.file_id,
            result,
        }
    }
}

pub struct PreviewController {
    state: PreviewState,
    generation: u64,
    codec: PayloadCodec,
}

impl PreviewController {
    pub fn new(codec: PayloadCodec) -> Self {
        Self {
            state: PreviewState::Closed,
            generation: 0,
            codec,
        }
    }

    pub fn state(&self) -> &PreviewState {
        &self.state
    }

    pub fn session(&self) -> Option<&PreviewSession> {
        match self.state() {
            PreviewState::ShowingImage(session) | PreviewState::ShowingText(session) => Some(session),
            _ => None,
        }
    }

    /// Enter `Loading` for `record`, superseding any earlier request.
    pub fn request(&mut self, record: FileRecord) -> PreviewTicket {
        self.generation += 1;
        let category = classify(&record.file_name);
        tracing::debug!(file_id = %record.id, file = %record.file_name, ?category, "Preview | loading");

        let ticket = PreviewTicket {
            generation: self.generation,
            file_id: record.id,
            category,
            payload: record.file_url.clone(),
            codec: self.codec,
        };
        self.state = PreviewState::Loading {
            record,
            generation: self.generation,
        };
        ticket
    }

    pub fn apply<S: RenderSurface>(
        &mut self,
        resolved: ResolvedPreview,
        surface: &mut S,
    ) -> Result<PreviewOutcome, AppError> {
        let record = match &self.state {
            PreviewState::Loading { record, generation }
                if *generation == resolved.generation && record.id == resolved.file_id =>
            {
                record.clone()
            }
            _ => {
                tracing::debug!(file_id = %resolved.file_id, "Preview | stale result discarded");
                return Ok(PreviewOutcome::Discarded);
            }
        };

        match resolved.result {
            Ok(Content::Image(source)) => {
                let view = PreviewView::Image {
                    file_id: record.id,
                    file_name: record.file_name.clone(),
                    source,
                };
                self.state = PreviewState::ShowingImage(PreviewSession {
                    record,
                    category: FileCategory::Image,
                    content: String::new(),
                });
                surface.render(&view);
            }
            Ok(Content::Text(content)) => {
                let category = classify(&record.file_name);
                let view = PreviewView::Text {
                    file_id: record.id,
                    file_name: record.file_name.clone(),
                    category,
                    content: content.clone(),
                };
                self.state = PreviewState::ShowingText(PreviewSession {
                    record,
                    category,
                    content,
                });
                surface.render(&view);
            }
            Err(e) => {
                tracing::warn!(file_id = %record.id, error = %e, "Preview | failed");
                self.state = PreviewState::Closed;
                surface.clear();
                return Err(e);
            }
        }

        Ok(PreviewOutcome::Shown)
    }

    pub async fn open<S: RenderSurface>(
        &mut self,
        record: FileRecord,
        surface: &mut S,
    ) -> Result<PreviewOutcome, AppError> {
        let resolved = self.request(record).resolve().await;
        self.apply(resolved, surface)
    }

    /// Always allowed; clears the session.
    pub fn close<S: RenderSurface>(&mut self, surface: &mut S) {
        self.state = PreviewState::Closed;
        surface.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSurface {
        rendered: Vec<PreviewView>,
        clears: usize,
    }

    impl RenderSurface for RecordingSurface {
        fn render(&mut self, view: &PreviewView) {
            self.rendered.push(view.clone());
        }

        fn clear(&mut self) {
            self.clears += 1;
        }
    }

    fn codec() -> PayloadCodec {
        PayloadCodec::new(1024 * 1024)
    }

    fn record(name: &str, payload: String) -> FileRecord {
        FileRecord {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            uploaded_by: Uuid::new_v4(),
            file_name: name.to_string(),
            file_size: 0,
            file_url: payload,
            file_type: "application/octet-stream".to_string(),
            created_at: chrono::Utc::now().naive_utc(),
            uploader: None,
        }
    }

    fn text_record(name: &str, content: &[u8]) -> FileRecord {
        record(name, codec().encode(content, "text/plain").unwrap())
    }

    #[tokio::test]
    async fn text_file_is_shown_literally() {
        let mut preview = PreviewController::new(codec());
        let mut surface = RecordingSurface::default();

        let outcome = preview
            .open(text_record("a.txt", b"hi"), &mut surface)
            .await
            .unwrap();

        assert_eq!(outcome, PreviewOutcome::Shown);
        let session = preview.session().unwrap();
        assert_eq!(session.category, FileCategory::RenderableText);
        assert_eq!(session.content, "hi");
        assert!(matches!(preview.state(), PreviewState::ShowingText(_)));
        assert!(matches!(
            &surface.rendered[..],
            [PreviewView::Text { content, .. }] if content == "hi"
        ));
    }

    #[tokio::test]
    async fn script_in_code_file_stays_inert_text() {
        let mut preview = PreviewController::new(codec());
        let mut surface = RecordingSurface::default();

        for (name, body) in [
            ("c.js", "alert(1)"),
            ("page.html", "<script>alert(document.cookie)</script>"),
            ("x.TSX", "eval('1+1')"),
        ] {
            preview
                .open(text_record(name, body.as_bytes()), &mut surface)
                .await
                .unwrap();
            match surface.rendered.last().unwrap() {
                PreviewView::Text { content, category, .. } => {
                    assert_eq!(content, body);
                    assert_eq!(*category, FileCategory::RenderableText);
                }
                other => panic!("unexpected view {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn image_is_passed_through_without_decoding() {
        let mut preview = PreviewController::new(codec());
        let mut surface = RecordingSurface::default();
        // Not decodable: proves the image path never decodes.
        let rec = record("b.png", "https://cdn.example.com/b.png".to_string());

        preview.open(rec.clone(), &mut surface).await.unwrap();

        let session = preview.session().unwrap();
        assert_eq!(session.category, FileCategory::Image);
        assert!(session.content.is_empty());
        assert_eq!(
            surface.rendered,
            vec![PreviewView::Image {
                file_id: rec.id,
                file_name: "b.png".to_string(),
                source: "https://cdn.example.com/b.png".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn opaque_file_is_decoded_as_text() {
        let mut preview = PreviewController::new(codec());
        let mut surface = RecordingSurface::default();

        preview
            .open(text_record("blob.bin", &[b'o', b'k', 0xff]), &mut surface)
            .await
            .unwrap();

        let session = preview.session().unwrap();
        assert_eq!(session.category, FileCategory::Opaque);
        assert_eq!(session.content, "ok\u{fffd}");
    }

    #[tokio::test]
    async fn malformed_payload_returns_to_closed() {
        let mut preview = PreviewController::new(codec());
        let mut surface = RecordingSurface::default();

        let err = preview
            .open(record("a.txt", "not-a-data-uri".to_string()), &mut surface)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::MalformedPayload(_)));
        assert_eq!(preview.state(), &PreviewState::Closed);
        assert!(surface.rendered.is_empty());
        assert_eq!(surface.clears, 1);
    }

    #[tokio::test]
    async fn result_arriving_after_close_is_discarded() {
        let mut preview = PreviewController::new(codec());
        let mut surface = RecordingSurface::default();

        let ticket = preview.request(text_record("a.txt", b"late"));
        assert!(matches!(preview.state(), PreviewState::Loading { .. }));
        preview.close(&mut surface);
        let resolved = ticket.resolve().await;

        let outcome = preview.apply(resolved, &mut surface).unwrap();

        assert_eq!(outcome, PreviewOutcome::Discarded);
        assert_eq!(preview.state(), &PreviewState::Closed);
        assert!(surface.rendered.is_empty());
    }

    #[tokio::test]
    async fn superseded_request_is_discarded() {
        let mut preview = PreviewController::new(codec());
        let mut surface = RecordingSurface::default();

        let first = preview.request(text_record("first.txt", b"one"));
        let second = preview.request(text_record("second.txt", b"two"));

        let late = first.resolve().await;
        assert_eq!(preview.apply(late, &mut surface).unwrap(), PreviewOutcome::Discarded);
        assert!(matches!(preview.state(), PreviewState::Loading { .. }));

        let current = second.resolve().await;
        assert_eq!(preview.apply(current, &mut surface).unwrap(), PreviewOutcome::Shown);
        assert_eq!(preview.session().unwrap().content, "two");
        assert_eq!(surface.rendered.len(), 1);
    }

    #[tokio::test]
    async fn failure_for_stale_ticket_does_not_close_current_preview() {
        let mut preview = PreviewController::new(codec());
        let mut surface = RecordingSurface::default();

        let broken = preview.request(record("bad.txt", "garbage".to_string()));
        preview
            .open(text_record("good.txt", b"fine"), &mut surface)
            .await
            .unwrap();

        let outcome = preview.apply(broken.resolve().await, &mut surface).unwrap();

        assert_eq!(outcome, PreviewOutcome::Discarded);
        assert_eq!(preview.session().unwrap().content, "fine");
    }

    #[tokio::test]
    async fn close_is_always_allowed() {
        let mut preview = PreviewController::new(codec());
        let mut surface = RecordingSurface::default();

        preview.close(&mut surface);
        assert_eq!(preview.state(), &PreviewState::Closed);

        preview
            .open(text_record("a.txt", b"hi"), &mut surface)
            .await
            .unwrap();
        preview.close(&mut surface);

        assert_eq!(preview.state(), &PreviewState::Closed);
        assert!(preview.session().is_none());
        assert_eq!(surface.clears, 2);
    }
}
