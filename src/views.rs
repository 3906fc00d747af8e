//! HTML for the gallery shell and the per-photo detail partial.
//!
//! The gallery page loads `/js/gallery.js`, which swaps detail partials into
//! `#detailPane`; without scripts each thumbnail link opens the partial directly.

use std::fmt::Write;

use crate::db::Photo;
use crate::storage::{public_url, StorageArea};

pub fn gallery_page(photos: &[Photo]) -> String {
    let mut grid = String::new();
    for photo in photos {
        let label = display_title(photo);
        let _ = write!(
            grid,
            r#"
        <li class="thumb">
          <a href="/photos/{id}" data-detail>
            <img src="{src}" alt="{alt}" width="260" height="260" loading="lazy">
          </a>
        </li>"#,
            id = photo.id,
            src = escape_html(&public_url(StorageArea::Thumbs, &photo.thumb_file)),
            alt = escape_html(label),
        );
    }

    let gallery = if photos.is_empty() {
        r#"<p class="empty">No photos yet. Upload the first one above.</p>"#.to_string()
    } else {
        format!(r#"<ul class="grid">{}
      </ul>"#, grid)
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Photo Gallery</title>
  <link rel="stylesheet" href="/css/main.css">
  <script src="/js/gallery.js" defer></script>
</head>
<body>
  <header>
    <h1>Photo Gallery</h1>
    <form class="upload" action="/photos/upload" method="post" enctype="multipart/form-data">
      <input type="file" name="image" accept="image/jpeg,image/png,image/webp" required>
      <input type="text" name="title" placeholder="Title">
      <textarea name="description" placeholder="Description" rows="2"></textarea>
      <button type="submit">Upload</button>
    </form>
  </header>
  <main>
    <section class="gallery">
      {gallery}
    </section>
    <aside id="detailPane">
      <p class="hint">Select a photo to see its details.</p>
    </aside>
  </main>
</body>
</html>
"#,
        gallery = gallery,
    )
}

pub fn photo_detail(photo: &Photo) -> String {
    let description = if photo.description.is_empty() {
        String::new()
    } else {
        format!(
            r#"
  <p class="description">{}</p>"#,
            escape_html(&photo.description)
        )
    };

    format!(
        r#"<article class="detail" data-photo-id="{id}">
  <img src="{large}" alt="{alt}">
  <h2>{title}</h2>{description}
  <dl>
    <dt>Original name</dt><dd>{original_name}</dd>
    <dt>Dimensions</dt><dd>{dimensions}</dd>
    <dt>Original size</dt><dd>{original_bytes}</dd>
    <dt>Large size</dt><dd>{large_bytes}</dd>
    <dt>Thumbnail size</dt><dd>{thumb_bytes}</dd>
    <dt>Uploaded</dt><dd><time datetime="{created_iso}">{created}</time></dd>
  </dl>
</article>
"#,
        id = photo.id,
        large = escape_html(&public_url(StorageArea::Large, &photo.large_file)),
        alt = escape_html(display_title(photo)),
        title = escape_html(display_title(photo)),
        description = description,
        original_name = escape_html(&photo.original_name),
        dimensions = photo
            .dimensions()
            .unwrap_or_else(|| "unknown".to_string()),
        original_bytes = format_bytes(photo.original_bytes),
        large_bytes = format_bytes(photo.large_bytes),
        thumb_bytes = format_bytes(photo.thumb_bytes),
        created_iso = photo.created_at.to_rfc3339(),
        created = photo.created_at.format("%Y-%m-%d %H:%M UTC"),
    )
}

fn display_title(photo: &Photo) -> &str {
    if photo.title.is_empty() {
        &photo.original_name
    } else {
        &photo.title
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Human readable byte count; `unknown` when the size was not recorded.
pub fn format_bytes(bytes: Option<i64>) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let Some(bytes) = bytes else {
        return "unknown".to_string();
    };

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
