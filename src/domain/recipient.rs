use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientRole {
    Teacher,
    Staff,
    Other,
}

impl RecipientRole {
    /// Classify from the parenthesised label and the option id
    /// (the portal prefixes ids like `teacher_123`).
    pub fn classify(label: Option<&str>, id: &str) -> Self {
        let hay = format!("{} {}", label.unwrap_or_default(), id).to_lowercase();
        if hay.contains("teacher") || hay.contains("opettaja") {
            RecipientRole::Teacher
        } else if ["staff", "henkilökunta", "henkilokunta", "personnel", "rehtori", "kanslia"]
            .iter()
            .any(|k| hay.contains(k))
        {
            RecipientRole::Staff
        } else {
            RecipientRole::Other
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecipientRole::Teacher => "teacher",
            RecipientRole::Staff => "staff",
            RecipientRole::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub id: String,
    pub display_name: String,
    pub role: RecipientRole,
    pub role_label: Option<String>,
}
