//! Outbound notification port and the OCR result email template.

use async_trait::async_trait;

use crate::gateway::ImageMetadata;

/// Failures reported by a [`Notifier`]. Never fatal to an OCR job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// Connection, TLS or authentication failure talking to the mail server.
    #[error("Mail transport error: {0}")]
    Transport(String),

    /// Sender or recipient address could not be parsed.
    #[error("Invalid email address: {0}")]
    Address(String),

    /// The message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// No mail transport is configured.
    #[error("Email delivery is not configured")]
    NotConfigured,
}

/// Outbound mail.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a plain-text message.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError>;

    /// Send the rendered OCR result email for one image.
    async fn send_ocr_result(
        &self,
        to: &str,
        image: &ImageMetadata,
        text: &str,
        confidence: f64,
    ) -> Result<(), DeliveryError>;
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// A rendered email with plain-text and HTML alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub plain: String,
    pub html: String,
}

/// Render the OCR result email. Every interpolated value is HTML-escaped.
///
/// The confidence line is omitted when `confidence` is zero.
pub fn render_ocr_result(
    image: &ImageMetadata,
    text: &str,
    confidence: f64,
    year: i32,
) -> RenderedEmail {
    let title = if image.title.trim().is_empty() {
        "Untitled"
    } else {
        image.title.as_str()
    };

    let subject = format!("OCR results for image: {title}");
    let plain = format!("OCR results for image {title}\n\nRecognized text:\n{text}");

    let confidence_line = if confidence > 0.0 {
        format!("<p><strong>Recognition confidence:</strong> {confidence}%</p>\n")
    } else {
        String::new()
    };

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
        .header {{ background: #4CAF50; color: white; padding: 20px; text-align: center; }}
        .content {{ padding: 20px; background: #f9f9f9; }}
        .ocr-text {{ background: white; padding: 15px; border-left: 4px solid #4CAF50; margin: 20px 0; white-space: pre-wrap; }}
        .footer {{ text-align: center; padding: 20px; color: #666; font-size: 12px; }}
        .image-info {{ background: #e8f5e9; padding: 10px; border-radius: 5px; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header"><h1>OCR Image Analysis</h1></div>
        <div class="content">
            <p>Hello!</p>
            <p>Your image has been analyzed.</p>
            <div class="image-info">
                <h3>Image details</h3>
                <p><strong>Title:</strong> {title}</p>
                <p><strong>ID:</strong> {id}</p>
                <p><strong>Uploaded:</strong> {uploaded_at}</p>
                <p><strong>Size:</strong> {size} bytes</p>
                <p><strong>Resolution:</strong> {width}x{height}</p>
                <p><strong>Format:</strong> {format}</p>
            </div>
            <h3>Recognized text</h3>
            <div class="ocr-text">{text}</div>
            {confidence_line}</div>
        <div class="footer">
            <p>This is an automated message, please do not reply.</p>
            <p>&copy; {year} Image OCR Service</p>
        </div>
    </div>
</body>
</html>
"#,
        title = escape_html(title),
        id = image.id,
        uploaded_at = image.uploaded_at.to_rfc3339(),
        size = image.size,
        width = image.width,
        height = image.height,
        format = escape_html(&image.format),
        text = escape_html(text),
    );

    RenderedEmail {
        subject,
        plain,
        html,
    }
}

/// Escape the five HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn metadata(title: &str) -> ImageMetadata {
        ImageMetadata {
            id: uuid::Uuid::nil(),
            title: title.into(),
            image_url: Some("http://images/media/a.png".into()),
            uploaded_at: chrono::Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap(),
            size: 2048,
            width: 640,
            height: 480,
            format: "png".into(),
        }
    }

    #[test]
    fn renders_metadata_and_text() {
        let email = render_ocr_result(&metadata("Receipt"), "TOTAL 42", 88.5, 2026);
        assert_eq!(email.subject, "OCR results for image: Receipt");
        assert!(email.plain.contains("TOTAL 42"));
        assert!(email.html.contains("<strong>Title:</strong> Receipt"));
        assert!(email.html.contains("640x480"));
        assert!(email.html.contains("2048 bytes"));
        assert!(email.html.contains("88.5%"));
        assert!(email.html.contains("&copy; 2026"));
    }

    #[test]
    fn omits_confidence_when_zero() {
        let email = render_ocr_result(&metadata("Blank"), "", 0.0, 2026);
        assert!(!email.html.contains("Recognition confidence"));
    }

    #[test]
    fn untitled_fallback() {
        let email = render_ocr_result(&metadata("  "), "x", 50.0, 2026);
        assert_eq!(email.subject, "OCR results for image: Untitled");
    }

    #[test]
    fn interpolated_values_are_escaped() {
        let email = render_ocr_result(&metadata("<b>bold</b>"), "a < b & c", 10.0, 2026);
        assert!(email.html.contains("&lt;b&gt;bold&lt;/b&gt;"));
        assert!(email.html.contains("a &lt; b &amp; c"));
        assert!(!email.html.contains("<b>bold</b>"));
    }

    #[test]
    fn escape_html_handles_quotes() {
        assert_eq!(escape_html(r#"say "hi" 'there'"#), "say &quot;hi&quot; &#39;there&#39;");
    }
}
