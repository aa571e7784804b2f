use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Slide kind mapping for deck.slide_kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "deck.slide_kind", rename_all = "lowercase")]
pub enum SlideKind {
    Content,
    Image,
    Mcq,
    Open,
    Imported,
}

/// Closed tagged union over slide payloads, resolved once at the repository
/// boundary. The rest of the engine never shape-sniffs slide content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SlideBody {
    #[serde(rename_all = "camelCase")]
    Content {
        title: Option<String>,
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Image {
        url: String,
        caption: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Mcq {
        prompt: String,
        options: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Open { prompt: String },
    #[serde(rename_all = "camelCase")]
    Imported {
        source_url: String,
        page: i32,
    },
}

impl SlideBody {
    /// The kind column is derived from the body tag; the two must agree.
    pub fn kind(&self) -> SlideKind {
        match self {
            SlideBody::Content { .. } => SlideKind::Content,
            SlideBody::Image { .. } => SlideKind::Image,
            SlideBody::Mcq { .. } => SlideKind::Mcq,
            SlideBody::Open { .. } => SlideKind::Open,
            SlideBody::Imported { .. } => SlideKind::Imported,
        }
    }

    /// Poll option list for mcq slides, None otherwise.
    pub fn poll_options(&self) -> Option<&[String]> {
        match self {
            SlideBody::Mcq { options, .. } => Some(options),
            _ => None,
        }
    }
}

/// Slide model mapped to deck.slide.
///
/// position values are dense and monotonic within a presentation; every
/// mutation that changes position renumbers all affected siblings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Slide {
    pub id: Uuid,
    pub presentation_id: Uuid,
    pub position: i32,
    pub kind: SlideKind,
    #[sqlx(json)]
    pub body: SlideBody,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_kind_matches_variant() {
        let body = SlideBody::Mcq {
            prompt: "Pick one".to_string(),
            options: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(body.kind(), SlideKind::Mcq);
        assert_eq!(body.poll_options().map(|o| o.len()), Some(2));

        let body = SlideBody::Open {
            prompt: "Why?".to_string(),
        };
        assert_eq!(body.kind(), SlideKind::Open);
        assert!(body.poll_options().is_none());
    }

    #[test]
    fn body_serializes_with_kind_tag() {
        let body = SlideBody::Image {
            url: "https://cdn.example.com/s1.png".to_string(),
            caption: None,
        };
        let value = serde_json::to_value(&body).expect("serialize");
        assert_eq!(value["kind"], "image");
        assert_eq!(value["url"], "https://cdn.example.com/s1.png");
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let result: Result<SlideBody, _> =
            serde_json::from_str(r#"{"kind":"video","url":"x"}"#);
        assert!(result.is_err());
    }
}
