#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ToastLevel {
    Info,
    Error,
}

/// A short user-facing notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    pub fn info(message: &str) -> Toast {
        return Toast {
            level: ToastLevel::Info,
            message: message.to_string(),
        };
    }

    pub fn error(message: &str) -> Toast {
        return Toast {
            level: ToastLevel::Error,
            message: message.to_string(),
        };
    }
}
