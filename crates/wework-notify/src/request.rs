//! Send requests as they arrive from callers

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::NotifyError;

pub const FIELD_MESSAGE_TYPE: &str = "message_type";
pub const FIELD_MESSAGE: &str = "message";
pub const FIELD_TO_USER: &str = "to_user";
pub const FIELD_TO_PARTY: &str = "to_party";
pub const FIELD_TO_TAG: &str = "to_tag";
pub const FIELD_IMAGE_MEDIA_ID: &str = "image_media_id";
pub const FIELD_IMAGE_BASE64: &str = "image_base64";
pub const FIELD_IMAGE_MD5: &str = "image_md5";
pub const FIELD_MENTIONED_LIST: &str = "mentioned_list";
pub const FIELD_MENTIONED_MOBILE_LIST: &str = "mentioned_mobile_list";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageType {
    #[default]
    Text,
    Markdown,
    Image,
}

impl MessageType {
    /// Value of the `msgtype` field on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Markdown => "markdown",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "text" => Ok(Self::Text),
            "markdown" => Ok(Self::Markdown),
            "image" => Ok(Self::Image),
            other => Err(NotifyError::UnsupportedType(other.to_string())),
        }
    }
}

/// A single notification to deliver.
///
/// Recipient and mention fields hold `|`-separated lists exactly as the caller
/// supplied them; the payload builder splits and normalizes them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendRequest {
    pub message_type: MessageType,
    pub message: Option<String>,
    pub to_user: Option<String>,
    pub to_party: Option<String>,
    pub to_tag: Option<String>,
    pub image_media_id: Option<String>,
    pub image_base64: Option<String>,
    pub image_md5: Option<String>,
    pub mentioned_list: Option<String>,
    pub mentioned_mobile_list: Option<String>,
}

impl SendRequest {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message_type: MessageType::Text,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn markdown(message: impl Into<String>) -> Self {
        Self {
            message_type: MessageType::Markdown,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Image previously uploaded to the application's media store
    pub fn image_media(media_id: impl Into<String>) -> Self {
        Self {
            message_type: MessageType::Image,
            image_media_id: Some(media_id.into()),
            ..Default::default()
        }
    }

    /// Inline image for group robots
    pub fn image_inline(base64: impl Into<String>, md5: impl Into<String>) -> Self {
        Self {
            message_type: MessageType::Image,
            image_base64: Some(base64.into()),
            image_md5: Some(md5.into()),
            ..Default::default()
        }
    }

    pub fn with_to_user(mut self, to_user: impl Into<String>) -> Self {
        self.to_user = Some(to_user.into());
        self
    }

    pub fn with_to_party(mut self, to_party: impl Into<String>) -> Self {
        self.to_party = Some(to_party.into());
        self
    }

    pub fn with_to_tag(mut self, to_tag: impl Into<String>) -> Self {
        self.to_tag = Some(to_tag.into());
        self
    }

    pub fn with_mentions(mut self, mentioned_list: impl Into<String>) -> Self {
        self.mentioned_list = Some(mentioned_list.into());
        self
    }

    pub fn with_mentioned_mobiles(mut self, mobiles: impl Into<String>) -> Self {
        self.mentioned_mobile_list = Some(mobiles.into());
        self
    }

    /// Build a request from a flat service-call field map.
    ///
    /// `message_type` defaults to `text`. Blank values are treated as absent,
    /// except `message`, which is kept unless it is the empty string.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, NotifyError> {
        let get = |key: &str| {
            fields
                .get(key)
                .filter(|v| !v.trim().is_empty())
                .cloned()
        };
        let message = fields.get(FIELD_MESSAGE).filter(|v| !v.is_empty()).cloned();

        let message_type = match get(FIELD_MESSAGE_TYPE) {
            Some(t) => t.parse::<MessageType>()?,
            None => MessageType::default(),
        };

        Ok(Self {
            message_type,
            message,
            to_user: get(FIELD_TO_USER),
            to_party: get(FIELD_TO_PARTY),
            to_tag: get(FIELD_TO_TAG),
            image_media_id: get(FIELD_IMAGE_MEDIA_ID),
            image_base64: get(FIELD_IMAGE_BASE64),
            image_md5: get(FIELD_IMAGE_MD5),
            mentioned_list: get(FIELD_MENTIONED_LIST),
            mentioned_mobile_list: get(FIELD_MENTIONED_MOBILE_LIST),
        })
    }
}
