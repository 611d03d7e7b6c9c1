use actix_web::{HttpRequest, HttpResponse};
use askama::Template;

use crate::auth::{clear_flash_cookie, take_flash, Flash};

pub fn render<T: Template>(template: T) -> HttpResponse {
    match template.render() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(body),
        Err(err) => {
            log::error!("Template render error: {err}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Flash notice as the templates consume it.
#[derive(Clone, Debug)]
pub struct FlashView {
    pub present: bool,
    pub message: String,
    pub category: String,
}

impl FlashView {
    pub fn none() -> Self {
        FlashView {
            present: false,
            message: String::new(),
            category: String::new(),
        }
    }

    fn from(flash: Flash) -> Self {
        FlashView {
            present: true,
            message: flash.message().to_string(),
            category: flash.category().to_string(),
        }
    }
}

/// Reads the pending flash notice, if any. `render_with_flash` clears the
/// cookie on the response that displayed it.
pub fn pop_flash(req: &HttpRequest) -> FlashView {
    match take_flash(req) {
        Some(flash) => FlashView::from(flash),
        None => FlashView::none(),
    }
}

/// Renders a page and clears the flash cookie it just displayed.
pub fn render_with_flash<T: Template>(template: T, flash: &FlashView) -> HttpResponse {
    let mut response = render(template);
    if flash.present {
        let _ = response.add_cookie(&clear_flash_cookie());
    }
    response
}
