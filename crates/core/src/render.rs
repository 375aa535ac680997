//! HTML document shell shared by every page.

use std::borrow::Cow;

/// Escape text for use in HTML element content and quoted attributes
pub fn escape(input: &str) -> Cow<'_, str> {
    if !input.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(input);
    }
    let mut escaped = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// A full HTML document
pub struct Document<'a> {
    pub title: &'a str,
    pub site_name: &'a str,
    pub body: &'a str,
    pub scripts: &'a [&'a str],
    /// Seconds after which the browser reloads the page
    pub refresh_after: Option<u32>,
}

impl Document<'_> {
    pub fn render(&self) -> String {
        let mut html = String::with_capacity(self.body.len() + 512);
        html.push_str("<!DOCTYPE html>\n<html lang=\"pt-BR\">\n<head>\n");
        html.push_str("<meta charset=\"utf-8\">\n");
        html.push_str(
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
        );
        if let Some(seconds) = self.refresh_after {
            html.push_str(&format!("<meta http-equiv=\"refresh\" content=\"{}\">\n", seconds));
        }
        html.push_str(&format!(
            "<title>{} | {}</title>\n",
            escape(self.title),
            escape(self.site_name)
        ));
        html.push_str("<link rel=\"stylesheet\" href=\"/static/styles.css\">\n");
        html.push_str("</head>\n<body>\n");
        html.push_str(&format!(
            "<header class=\"site-header\"><a href=\"/\">{}</a></header>\n",
            escape(self.site_name)
        ));
        html.push_str(self.body);
        for script in self.scripts {
            html.push_str(&format!("<script src=\"{}\" defer></script>\n", escape(script)));
        }
        html.push_str("</body>\n</html>\n");
        html
    }
}

/// Placeholder served while a detail page is generated for the first time
pub fn fallback_page(site_name: &str) -> String {
    Document {
        title: "Carregando",
        site_name,
        body: "<p class=\"loading\">...Loading</p>\n",
        scripts: &[],
        refresh_after: Some(1),
    }
    .render()
}

pub fn not_found_page(site_name: &str) -> String {
    Document {
        title: "Produto não encontrado",
        site_name,
        body: "<main class=\"not-found\"><h1>Produto não encontrado</h1><a href=\"/\">Voltar ao catálogo</a></main>\n",
        scripts: &[],
        refresh_after: None,
    }
    .render()
}

pub fn error_page(site_name: &str) -> String {
    Document {
        title: "Erro",
        site_name,
        body: "<main class=\"error\"><h1>Não foi possível carregar esta página</h1></main>\n",
        scripts: &[],
        refresh_after: None,
    }
    .render()
}
