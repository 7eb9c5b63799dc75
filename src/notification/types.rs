use serde::{Deserialize, Serialize};

/// Category of a notification, fixed set understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    #[default]
    Default,
    Event,
    Warning,
    Announcement,
    Reminder,
    Urgent,
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NotificationType::Default => "default",
            NotificationType::Event => "event",
            NotificationType::Warning => "warning",
            NotificationType::Announcement => "announcement",
            NotificationType::Reminder => "reminder",
            NotificationType::Urgent => "urgent",
        };
        f.write_str(name)
    }
}

/// Optional image attachment carried inline as base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttachment {
    /// Base64-encoded payload
    pub data: String,
    pub file_name: String,
}

/// A condition-based notification send request.
///
/// Wire shape: serialized as JSON with camelCase field names
/// (`facultyCodes`, `sendAll`, `requestId`, ...); `kind` goes out as `type`.
/// Immutable per dispatch attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageAttachment>,
    /// Correlation/idempotency identifier supplied by the caller. The
    /// dispatcher does not deduplicate on it; the backend may.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    /// Targeting conditions narrowing the audience when `send_all` is false
    #[serde(default)]
    pub faculty_codes: Vec<String>,
    #[serde(default)]
    pub course_codes: Vec<String>,
    #[serde(default)]
    pub class_codes: Vec<String>,
    #[serde(default)]
    pub user_names: Vec<String>,
    /// Ignore the narrowing lists and target the entire population
    pub send_all: bool,
}

impl NotificationRequest {
    /// Create a builder with the required content fields.
    pub fn builder(title: impl Into<String>, body: impl Into<String>) -> NotificationRequestBuilder {
        NotificationRequestBuilder::new(title, body)
    }

    /// Whether any narrowing condition is present.
    pub fn has_targeting(&self) -> bool {
        !self.faculty_codes.is_empty()
            || !self.course_codes.is_empty()
            || !self.class_codes.is_empty()
            || !self.user_names.is_empty()
    }
}

/// Builder for [`NotificationRequest`].
#[derive(Debug, Clone)]
pub struct NotificationRequestBuilder {
    title: String,
    body: String,
    image: Option<ImageAttachment>,
    request_id: Option<String>,
    kind: NotificationType,
    faculty_codes: Vec<String>,
    course_codes: Vec<String>,
    class_codes: Vec<String>,
    user_names: Vec<String>,
    send_all: bool,
}

impl NotificationRequestBuilder {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            image: None,
            request_id: None,
            kind: NotificationType::default(),
            faculty_codes: Vec::new(),
            course_codes: Vec::new(),
            class_codes: Vec::new(),
            user_names: Vec::new(),
            send_all: false,
        }
    }

    pub fn kind(mut self, kind: NotificationType) -> Self {
        self.kind = kind;
        self
    }

    pub fn image(mut self, data: impl Into<String>, file_name: impl Into<String>) -> Self {
        self.image = Some(ImageAttachment {
            data: data.into(),
            file_name: file_name.into(),
        });
        self
    }

    pub fn request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn faculty_codes(mut self, codes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.faculty_codes = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn course_codes(mut self, codes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.course_codes = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn class_codes(mut self, codes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.class_codes = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn user_names(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.user_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn send_all(mut self, send_all: bool) -> Self {
        self.send_all = send_all;
        self
    }

    pub fn build(self) -> NotificationRequest {
        NotificationRequest {
            title: self.title,
            body: self.body,
            image: self.image,
            request_id: self.request_id,
            kind: self.kind,
            faculty_codes: self.faculty_codes,
            course_codes: self.course_codes,
            class_codes: self.class_codes,
            user_names: self.user_names,
            send_all: self.send_all,
        }
    }
}
