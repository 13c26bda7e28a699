//! Hebrew message templates for resident and committee notifications.

use kehila_core::request::RequestStatus;
use kehila_db::models::request::Request;

const SIGN_OFF: &str = "בברכה,\nועד הקהילה";

/// Subject and body of an email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailText {
    pub subject: String,
    pub body: String,
}

fn status_label(raw: &str) -> &str {
    RequestStatus::parse(raw).map(RequestStatus::label_he).unwrap_or(raw)
}

/// Confirmation sent to the submitter when a request is received.
pub fn request_received(request: &Request) -> EmailText {
    EmailText {
        subject: format!("פנייתך התקבלה - {}", request.reference_number),
        body: format!(
            "שלום {name},\n\n\
             פנייתך בנושא \"{subject}\" התקבלה ונרשמה במספר {reference}.\n\
             ניתן לעקוב אחר הטיפול בפנייה באמצעות מספר זה.\n\n\
             {SIGN_OFF}",
            name = request.submitter_name,
            subject = request.subject,
            reference = request.reference_number,
        ),
    }
}

/// Status update sent to the submitter.
pub fn status_changed(request: &Request, new_status: &str, note: Option<&str>) -> EmailText {
    let mut body = format!(
        "שלום {name},\n\n\
         סטטוס פנייתך \"{subject}\" ({reference}) עודכן ל: {label}.\n",
        name = request.submitter_name,
        subject = request.subject,
        reference = request.reference_number,
        label = status_label(new_status),
    );
    if let Some(note) = note {
        body.push_str(&format!("\nהערה: {note}\n"));
    }
    body.push('\n');
    body.push_str(SIGN_OFF);

    EmailText {
        subject: format!("עדכון סטטוס לפנייה {}", request.reference_number),
        body,
    }
}

/// Public comment forwarded to the submitter.
pub fn comment_added(request: &Request, note: &str) -> EmailText {
    EmailText {
        subject: format!("תגובה חדשה לפנייה {}", request.reference_number),
        body: format!(
            "שלום {name},\n\n\
             נוספה תגובה לפנייתך \"{subject}\" ({reference}):\n\n\
             {note}\n\n\
             {SIGN_OFF}",
            name = request.submitter_name,
            subject = request.subject,
            reference = request.reference_number,
        ),
    }
}

/// Committee group summary of a new request.
pub fn new_request_summary(request: &Request) -> String {
    let mut text = format!(
        "📋 פנייה חדשה {reference}\n\
         נושא: {subject}\n\
         קטגוריה: {category}\n\
         עדיפות: {priority}\n\
         פונה: {name}",
        reference = request.reference_number,
        subject = request.subject,
        category = request.category,
        priority = request.priority,
        name = request.submitter_name,
    );
    if let Some(address) = request.submitter_address.as_deref().filter(|a| !a.is_empty()) {
        text.push_str(&format!("\nכתובת: {address}"));
    }
    text
}

/// Committee group note about an assignment change.
pub fn assignment_summary(request: &Request, assignee_name: Option<&str>) -> String {
    match assignee_name {
        Some(name) => format!(
            "👤 הפנייה {} (\"{}\") הועברה לטיפול {}",
            request.reference_number, request.subject, name
        ),
        None => format!(
            "👤 בוטלה ההקצאה לפנייה {} (\"{}\")",
            request.reference_number, request.subject
        ),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn sample() -> Request {
        let now = Utc::now();
        Request {
            id: 1,
            reference_number: "REQ-2026-0001".into(),
            submitter_name: "דנה".into(),
            submitter_email: "dana@example.com".into(),
            submitter_phone: None,
            submitter_address: Some("הגפן 4".into()),
            subject: "בור בכביש".into(),
            description: None,
            category: "infrastructure".into(),
            priority: "high".into(),
            status: "new".into(),
            assigned_to: None,
            created_by: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
        }
    }

    #[test]
    fn received_mentions_reference_and_subject() {
        let text = request_received(&sample());
        assert!(text.subject.contains("REQ-2026-0001"));
        assert!(text.body.contains("בור בכביש"));
    }

    #[test]
    fn status_change_uses_hebrew_label_and_note() {
        let text = status_changed(&sample(), "in_progress", Some("צוות בדרך"));
        assert!(text.body.contains("בטיפול"));
        assert!(text.body.contains("צוות בדרך"));

        let without_note = status_changed(&sample(), "resolved", None);
        assert!(without_note.body.contains("טופלה"));
        assert!(!without_note.body.contains("הערה"));
    }

    #[test]
    fn group_summary_includes_address_when_known() {
        assert!(new_request_summary(&sample()).contains("הגפן 4"));
        assert!(assignment_summary(&sample(), None).contains("בוטלה"));
        assert!(assignment_summary(&sample(), Some("יוסי")).contains("יוסי"));
    }
}
