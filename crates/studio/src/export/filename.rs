use crate::render::Stamp;

/// Keeps letters and digits of any script; whitespace runs become one hyphen.
pub(crate) fn sanitize_title(title: &str) -> String {
    let mut out = String::new();
    let mut pending_hyphen = false;
    for ch in title.chars() {
        if ch.is_whitespace() {
            pending_hyphen = !out.is_empty();
        } else if ch.is_alphanumeric() {
            if pending_hyphen {
                out.push('-');
                pending_hyphen = false;
            }
            out.push(ch);
        }
    }
    out
}

/// `<title-or-default>-YYYY-MM-DD-HH-MM-SS.<extension>`
pub(crate) fn export_filename(
    title: Option<&str>,
    default_stem: &str,
    stamp: Stamp,
    extension: &str,
) -> String {
    let stem = title.map(sanitize_title).unwrap_or_default();
    let stem = if stem.is_empty() {
        default_stem.to_string()
    } else {
        stem
    };
    format!("{stem}-{}.{extension}", stamp.file_suffix())
}

/// Attachment header carrying an ASCII fallback plus the UTF-8 name.
pub(crate) fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}
