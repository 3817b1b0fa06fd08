//! HTML rendering for the server-side views.
//!
//! Views are pure functions from data to complete HTML documents. All
//! interpolated text goes through [`escape_html`]; URLs render into
//! attribute positions and are escaped the same way.

use crate::place_store::Place;

/// Home view: the place list plus the creation form
pub fn render_home(places: &[Place]) -> String {
    let mut items = String::new();

    if places.is_empty() {
        items.push_str("      <p class=\"empty\">No places yet. Add the first one below.</p>\n");
    }

    for place in places {
        let title = escape_html(&place.title);
        let image_url = escape_html(&place.image_url);
        items.push_str(&format!(
            r#"      <article class="place">
        <img src="{image_url}" alt="{title}">
        <h2>{title}</h2>
        <nav>
          <a href="/places/{id}/edit">Edit</a>
          <form method="post" action="/places/{id}/delete">
            <button type="submit">Delete</button>
          </form>
        </nav>
      </article>
"#,
            id = place.id,
        ));
    }

    page(
        "Places",
        &format!(
            r#"    <section class="places">
{items}    </section>
    <section class="new-place">
      <h2>Add a place</h2>
      <form method="post" action="/places" enctype="multipart/form-data">
        <label>Title <input type="text" name="title" required></label>
        <label>Image <input type="file" name="image" accept="image/*" required></label>
        <button type="submit">Create</button>
      </form>
    </section>
"#
        ),
    )
}

/// Edit view: one place's form, pre-populated
pub fn render_edit(place: &Place) -> String {
    let title = escape_html(&place.title);
    let image_url = escape_html(&place.image_url);

    page(
        &format!("Edit {title}"),
        &format!(
            r#"    <section class="edit-place">
      <h2>Edit place</h2>
      <img src="{image_url}" alt="{title}">
      <form method="post" action="/places/{id}/edit" enctype="multipart/form-data">
        <label>Title <input type="text" name="title" value="{title}" required></label>
        <label>Replace image <input type="file" name="image" accept="image/*"></label>
        <button type="submit">Save</button>
      </form>
      <a href="/">Back to list</a>
    </section>
"#,
            id = place.id,
        ),
    )
}

/// Not-found page for unknown place ids
pub fn render_not_found() -> String {
    page(
        "Not found",
        "    <h2>Place not found</h2>\n    <a href=\"/\">Back to list</a>\n",
    )
}

/// Generic failure page; never carries error detail
pub fn render_error() -> String {
    page(
        "Something went wrong",
        "    <h2>Something went wrong</h2>\n    <a href=\"/\">Back to list</a>\n",
    )
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title}</title>
  <link rel="stylesheet" href="/public/style.css">
</head>
<body>
  <main>
    <h1><a href="/">Places</a></h1>
{body}  </main>
</body>
</html>
"#,
        title = escape_html(title),
    )
}

/// Escape text for HTML element and attribute positions
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
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
