//! Links and markup for stored files

use url::Url;

use crate::error::StorageError;

/// Build `{wwwroot}/pluginfile.php/{context}/{component}/{area}[/{item}]{path}{filename}`
pub fn pluginfile_url(
    wwwroot: &str,
    context_id: i64,
    component: &str,
    file_area: &str,
    item_id: Option<i64>,
    file_path: &str,
    filename: &str,
) -> Result<Url, StorageError> {
    let mut url = Url::parse(wwwroot)
        .map_err(|e| StorageError::Config(format!("Invalid wwwroot {:?}: {}", wwwroot, e)))?;

    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| StorageError::Config(format!("wwwroot cannot be a base URL: {}", wwwroot)))?;
        segments.pop_if_empty();
        segments.push("pluginfile.php");
        segments.push(&context_id.to_string());
        segments.push(component);
        segments.push(file_area);
        if let Some(item_id) = item_id {
            segments.push(&item_id.to_string());
        }
        segments.extend(file_path.split('/').filter(|s| !s.is_empty()));
        segments.push(filename);
    }

    Ok(url)
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Remove anything that looks like a markup tag
pub fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Plain display label: tags stripped, trimmed, escaped
pub fn format_label(s: &str) -> String {
    escape_html(strip_tags(s).trim())
}

pub fn img_tag(src: &str, alt: &str) -> String {
    format!(r#"<img src="{}" alt="{}" />"#, escape_html(src), escape_html(alt))
}
