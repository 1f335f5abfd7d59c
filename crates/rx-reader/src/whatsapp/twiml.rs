//! TwiML replies

use quick_xml::escape::escape;

/// Content type Twilio expects for webhook replies
pub const TWIML_CONTENT_TYPE: &str = "application/xml";

/// `<Response><Message>…</Message></Response>` with the text XML-escaped
pub fn message_response(text: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        escape(text)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_text() {
        assert_eq!(
            message_response("Take <1> tab & rest"),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>Take &lt;1&gt; tab &amp; rest</Message></Response>"
        );
    }
}
