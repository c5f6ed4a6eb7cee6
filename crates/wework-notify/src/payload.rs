//! Request bodies for the WeCom send endpoints
//!
//! Pure functions: validation failures are reported before any network I/O.

use serde_json::{json, Map, Value};

use crate::error::{NotifyError, Result};
use crate::request::{MessageType, SendRequest};

/// Recipients configured on an application entry, used when a call omits them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recipients {
    pub to_user: Option<String>,
    pub to_party: Option<String>,
    pub to_tag: Option<String>,
}

impl Recipients {
    pub fn is_empty(&self) -> bool {
        self.to_user.is_none() && self.to_party.is_none() && self.to_tag.is_none()
    }
}

/// Split a `|`-separated list into trimmed, non-empty tokens
pub fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split('|')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Merge a per-call recipient list with the entry default.
///
/// Override tokens come first, then defaults; duplicates keep their first position.
/// Returns `None` when nothing is left.
pub fn merge_recipients(override_list: Option<&str>, default_list: Option<&str>) -> Option<String> {
    let mut merged: Vec<String> = Vec::new();
    for part in split_list(override_list)
        .into_iter()
        .chain(split_list(default_list))
    {
        if !merged.contains(&part) {
            merged.push(part);
        }
    }

    if merged.is_empty() {
        None
    } else {
        Some(merged.join("|"))
    }
}

fn require_message(request: &SendRequest) -> Result<&str> {
    match request.message.as_deref() {
        Some(m) if !m.is_empty() => Ok(m),
        _ => Err(NotifyError::validation(format!(
            "message content is required for {} messages",
            request.message_type
        ))),
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// Body for `POST /message/send` (custom application).
pub fn build_app_payload(
    agent_id: i64,
    defaults: &Recipients,
    request: &SendRequest,
) -> Result<Value> {
    let msgtype = request.message_type.as_str();

    let content = match request.message_type {
        MessageType::Text | MessageType::Markdown => {
            json!({ "content": require_message(request)? })
        }
        MessageType::Image => {
            let media_id = non_empty(request.image_media_id.as_ref()).ok_or_else(|| {
                NotifyError::validation("image_media_id is required for image messages on applications")
            })?;
            json!({ "media_id": media_id })
        }
    };

    let to_user = merge_recipients(request.to_user.as_deref(), defaults.to_user.as_deref());
    let to_party = merge_recipients(request.to_party.as_deref(), defaults.to_party.as_deref());
    let to_tag = merge_recipients(request.to_tag.as_deref(), defaults.to_tag.as_deref());

    if to_user.is_none() && to_party.is_none() && to_tag.is_none() {
        return Err(NotifyError::validation(
            "at least one recipient (to_user, to_party or to_tag) is required for application messages",
        ));
    }

    let mut payload = Map::new();
    payload.insert("agentid".to_string(), json!(agent_id));
    payload.insert("msgtype".to_string(), json!(msgtype));
    payload.insert("safe".to_string(), json!(0));
    for (key, value) in [("touser", to_user), ("toparty", to_party), ("totag", to_tag)] {
        if let Some(v) = value {
            payload.insert(key.to_string(), Value::String(v));
        }
    }
    payload.insert(msgtype.to_string(), content);

    Ok(Value::Object(payload))
}

/// Body for `POST /webhook/send` (group robot).
pub fn build_robot_payload(request: &SendRequest) -> Result<Value> {
    let msgtype = request.message_type.as_str();

    let content = match request.message_type {
        MessageType::Text => {
            let mut item = Map::new();
            item.insert("content".to_string(), json!(require_message(request)?));

            let mentioned = split_list(request.mentioned_list.as_deref());
            if !mentioned.is_empty() {
                item.insert("mentioned_list".to_string(), json!(mentioned));
            }
            let mobiles = split_list(request.mentioned_mobile_list.as_deref());
            if !mobiles.is_empty() {
                item.insert("mentioned_mobile_list".to_string(), json!(mobiles));
            }
            Value::Object(item)
        }
        MessageType::Markdown => json!({ "content": require_message(request)? }),
        MessageType::Image => {
            match (
                non_empty(request.image_base64.as_ref()),
                non_empty(request.image_md5.as_ref()),
            ) {
                (Some(base64), Some(md5)) => json!({ "base64": base64, "md5": md5 }),
                _ => {
                    return Err(NotifyError::validation(
                        "image_base64 and image_md5 are required for image messages on robots",
                    ))
                }
            }
        }
    };

    Ok(json!({ "msgtype": msgtype, msgtype: content }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Recipients {
        Recipients {
            to_user: Some("ops".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_recipients_order_and_dedup() {
        assert_eq!(
            merge_recipients(Some("a|b"), Some("b|c")).as_deref(),
            Some("a|b|c")
        );
        assert_eq!(
            merge_recipients(Some(" a | |b "), None).as_deref(),
            Some("a|b")
        );
        assert_eq!(merge_recipients(None, Some("c")).as_deref(), Some("c"));
        assert_eq!(merge_recipients(Some(""), Some(" | ")), None);
        assert_eq!(merge_recipients(None, None), None);
    }

    #[test]
    fn test_merge_recipients_idempotent() {
        let once = merge_recipients(Some("x|y|x"), Some("x|y|x"));
        assert_eq!(once.as_deref(), Some("x|y"));
        let twice = merge_recipients(once.as_deref(), once.as_deref());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(Some("u1| u2 ||u3")), vec!["u1", "u2", "u3"]);
        assert!(split_list(Some(" | ")).is_empty());
        assert!(split_list(None).is_empty());
    }

    #[test]
    fn test_app_text_payload() {
        let req = SendRequest::text("disk full").with_to_user("alice|ops");
        let payload = build_app_payload(1000002, &defaults(), &req).unwrap();
        assert_eq!(
            payload,
            json!({
                "agentid": 1000002,
                "msgtype": "text",
                "safe": 0,
                "touser": "alice|ops",
                "text": { "content": "disk full" }
            })
        );
    }

    #[test]
    fn test_app_payload_ignores_mentions() {
        let req = SendRequest::text("hi").with_mentions("u1");
        let payload = build_app_payload(1, &defaults(), &req).unwrap();
        assert_eq!(payload["text"], json!({ "content": "hi" }));
    }

    #[test]
    fn test_app_payload_all_recipient_kinds() {
        let req = SendRequest::markdown("**up**")
            .with_to_party("2")
            .with_to_tag("7|8");
        let payload = build_app_payload(1, &Recipients::default(), &req).unwrap();
        assert_eq!(payload["toparty"], "2");
        assert_eq!(payload["totag"], "7|8");
        assert!(payload.get("touser").is_none());
        assert_eq!(payload["markdown"]["content"], "**up**");
    }

    #[test]
    fn test_app_payload_requires_recipient() {
        let req = SendRequest::text("hi");
        let err = build_app_payload(1, &Recipients::default(), &req).unwrap_err();
        assert!(matches!(err, NotifyError::Validation(_)));
    }

    #[test]
    fn test_app_image_requires_media_id() {
        let req = SendRequest::image_inline("aGk=", "49f68a5c8493ec2c0bf489821c21fc3b");
        let err = build_app_payload(1, &defaults(), &req).unwrap_err();
        assert!(matches!(err, NotifyError::Validation(_)));

        let req = SendRequest::image_media("MEDIA_ID");
        let payload = build_app_payload(1, &defaults(), &req).unwrap();
        assert_eq!(payload["image"], json!({ "media_id": "MEDIA_ID" }));
    }

    #[test]
    fn test_empty_message_rejected() {
        let req = SendRequest::text("");
        assert!(matches!(
            build_app_payload(1, &defaults(), &req),
            Err(NotifyError::Validation(_))
        ));
        assert!(matches!(
            build_robot_payload(&req),
            Err(NotifyError::Validation(_))
        ));

        let req = SendRequest {
            message_type: MessageType::Markdown,
            ..Default::default()
        };
        assert!(matches!(
            build_robot_payload(&req),
            Err(NotifyError::Validation(_))
        ));
    }

    #[test]
    fn test_robot_text_payload_with_mentions() {
        let req = SendRequest::text("hi").with_mentions("u1|u2");
        let payload = build_robot_payload(&req).unwrap();
        assert_eq!(
            payload,
            json!({
                "msgtype": "text",
                "text": { "content": "hi", "mentioned_list": ["u1", "u2"] }
            })
        );
    }

    #[test]
    fn test_robot_text_payload_mobiles_only() {
        let req = SendRequest::text("hi")
            .with_mentions(" | ")
            .with_mentioned_mobiles("13800001111|@all");
        let payload = build_robot_payload(&req).unwrap();
        assert!(payload["text"].get("mentioned_list").is_none());
        assert_eq!(
            payload["text"]["mentioned_mobile_list"],
            json!(["13800001111", "@all"])
        );
    }

    #[test]
    fn test_robot_markdown_has_no_mentions() {
        let req = SendRequest::markdown("# build ok").with_mentions("u1");
        let payload = build_robot_payload(&req).unwrap();
        assert_eq!(
            payload,
            json!({ "msgtype": "markdown", "markdown": { "content": "# build ok" } })
        );
    }

    #[test]
    fn test_robot_image_requires_base64_and_md5() {
        let mut req = SendRequest::image_inline("aGk=", "");
        assert!(matches!(
            build_robot_payload(&req),
            Err(NotifyError::Validation(_))
        ));

        req.image_md5 = None;
        assert!(matches!(
            build_robot_payload(&req),
            Err(NotifyError::Validation(_))
        ));

        let req = SendRequest::image_media("MEDIA_ID");
        assert!(matches!(
            build_robot_payload(&req),
            Err(NotifyError::Validation(_))
        ));

        let req = SendRequest::image_inline("aGk=", "49f68a5c8493ec2c0bf489821c21fc3b");
        let payload = build_robot_payload(&req).unwrap();
        assert_eq!(
            payload["image"],
            json!({ "base64": "aGk=", "md5": "49f68a5c8493ec2c0bf489821c21fc3b" })
        );
    }
}
