//! One-shot notices carried in the session until the next rendered page.

use actix_session::Session;

const FLASH_KEY: &str = "_flashes";

pub fn push(session: &Session, message: impl Into<String>) {
    let mut messages = match session.get::<Vec<String>>(FLASH_KEY) {
        Ok(Some(messages)) => messages,
        Ok(None) => Vec::new(),
        Err(e) => {
            log::warn!("Discarding unreadable notices: {}", e);
            Vec::new()
        }
    };
    messages.push(message.into());
    if let Err(e) = session.insert(FLASH_KEY, messages) {
        log::warn!("Failed to store notice: {}", e);
    }
}

pub fn take(session: &Session) -> Vec<String> {
    match session.remove_as::<Vec<String>>(FLASH_KEY) {
        Some(Ok(messages)) => messages,
        Some(Err(raw)) => {
            log::warn!("Discarding malformed notices: {}", raw);
            Vec::new()
        }
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_session::SessionExt;
    use actix_web::test::TestRequest;

    #[actix_web::test]
    async fn notices_are_drained_in_order() {
        let req = TestRequest::default().to_http_request();
        let session = req.get_session();

        push(&session, "first");
        push(&session, "second");
        assert_eq!(take(&session), vec!["first".to_owned(), "second".to_owned()]);
        assert!(take(&session).is_empty());
    }
}
