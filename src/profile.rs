//! Public artisan profile page.
use tracing::{instrument, warn};

use crate::backend::{MediaStore, RecordSource};
use crate::error::ViewError;
use crate::links::{LinkTarget, QrService};
use crate::model::{defaults, Artisan, ListRecord};
use crate::render::{html_attr, html_escape};

/// Workshop photos shown before "View More".
pub const GALLERY_PREVIEW: usize = 3;

const ICON_MAP_PIN: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 20 20" fill="currentColor"><path fill-rule="evenodd" d="M9.69 18.933l.003.001C9.89 19.02 10 19 10 19s.11.02.308-.066l.002-.001.006-.003.018-.008a5.741 5.741 0 00.281-.14c.186-.1.4-.223.654-.369.889-.516 1.954-1.23 2.86-2.135C15.8 15.01 16 14.225 16 13.444c0-1.062-.333-2.244-1.25-3.434C13.75 8.81 12.062 7.5 10 7.5S6.25 8.81 5.25 10.01C4.333 11.2 4 12.382 4 13.444c0 .78.197 1.566.792 2.404.905.906 1.97 1.62 2.86 2.135.253.146.467.269.653.369.06.034.118.067.176.098l.028.014.006.003zM10 11.25a2.25 2.25 0 100-4.5 2.25 2.25 0 000 4.5z" clip-rule="evenodd" /></svg>"#;
const ICON_AWARD: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 20 20" fill="currentColor"><path d="M11.657 7.757l-4.95 4.95a3.5 3.5 0 01-4.95-4.95l4.95-4.95 4.95 4.95zm-2.121 2.121l2.121-2.121-1.414-1.414-2.121 2.121 1.414 1.414z" /><path fill-rule="evenodd" d="M15.232 5.232a3.5 3.5 0 013.536 3.536l-1.5 1.5-3.536-3.536 1.5-1.5zM8.343 12.243l-2.475-2.475a3.5 3.5 0 014.95-4.95l2.475 2.475-4.95 4.95z" clip-rule="evenodd" /></svg>"#;
const ICON_SHIELD: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 20 20" fill="currentColor"><path fill-rule="evenodd" d="M10 18a8 8 0 100-16 8 8 0 000 16zm.75-13a.75.75 0 00-1.5 0v5c0 .414.336.75.75.75h4a.75.75 0 000-1.5h-3.25V5z" clip-rule="evenodd" /></svg>"#;
const ICON_LINK: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 20 20" fill="currentColor"><path d="M12.232 4.232a2.5 2.5 0 013.536 3.536l-1.225 1.224a.75.75 0 001.061 1.06l1.224-1.224a4 4 0 00-5.656-5.656l-3 3a4 4 0 00.225 5.865.75.75 0 00.977-1.138 2.5 2.5 0 01-.142-3.667l3-3z" /></svg>"#;

/// Rendered profile document body plus its page title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePage {
    pub title: String,
    pub html: String,
    pub found: bool,
}

/// Fetch one artisan for the profile page.
///
/// A missing id, an unreachable source and an absent row all end up as the
/// "not found" page; the error says which.
#[instrument(skip(source, media))]
pub async fn fetch_profile(
    source: &dyn RecordSource<Artisan>,
    media: &dyn MediaStore,
    id: Option<&str>,
) -> Result<Artisan, ViewError> {
    let id = match id.map(str::trim) {
        Some(id) if !id.is_empty() => id,
        _ => return Err(ViewError::NotFound("no artisan ID provided".to_string())),
    };
    match source.fetch_one(id).await {
        Ok(Some(mut artisan)) => {
            artisan.enrich(media);
            Ok(artisan)
        }
        Ok(None) => Err(ViewError::NotFound(id.to_string())),
        Err(err) => {
            warn!(?err, "failed to fetch artisan profile");
            Err(ViewError::fetch(&err))
        }
    }
}

pub fn render_profile(
    result: &Result<Artisan, ViewError>,
    links: &LinkTarget,
    qr: &QrService,
) -> ProfilePage {
    match result {
        Ok(artisan) => ProfilePage {
            title: format!("{} | Artisan Profile", defaults::text(artisan.name.as_deref())),
            html: profile_html(artisan, links, qr),
            found: true,
        },
        Err(_) => ProfilePage {
            title: "Artisan Not Found".to_string(),
            html: not_found_html(),
            found: false,
        },
    }
}

fn not_found_html() -> String {
    r#"<div class="status-container">
  <div class="card" style="text-align: center;">
    <h1>Artisan Not Found</h1>
    <p>The profile you're looking for doesn't exist or couldn't be loaded.</p>
  </div>
</div>"#
        .to_string()
}

fn gallery_item(index: usize, url: &str) -> String {
    format!(
        "<div class=\"gallery-item\"><img src=\"{}\" alt=\"Artwork {}\"></div>",
        html_attr(url),
        index + 1
    )
}

/// Workshop photos: the first few in the grid, the rest behind a native
/// disclosure so the exported page needs no script.
fn gallery_section(a: &Artisan) -> String {
    let photos = &a.workshop_photo_link;
    if photos.is_empty() && a.video_link.is_none() {
        return String::new();
    }
    let split = photos.len().min(GALLERY_PREVIEW);
    let items: String = photos[..split]
        .iter()
        .enumerate()
        .map(|(i, p)| gallery_item(i, p))
        .collect();
    let more = if photos.len() > GALLERY_PREVIEW {
        let extra: String = photos[split..]
            .iter()
            .enumerate()
            .map(|(i, p)| gallery_item(split + i, p))
            .collect();
        format!(
            r#"<details class="gallery-more">
    <summary class="view-more-btn">View More</summary>
    <div class="gallery-grid">{}</div>
  </details>"#,
            extra
        )
    } else {
        String::new()
    };
    let video = a
        .video_link
        .as_deref()
        .map(|v| {
            format!(
                r#"<div class="video-item"><iframe src="{}" frameborder="0" allow="accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture" allowfullscreen></iframe></div>"#,
                html_attr(v)
            )
        })
        .unwrap_or_default();
    format!(
        r#"<section class="card">
  <h2 class="card-title">Artisan Gallery</h2>
  <div class="gallery-grid" id="gallery-grid">{}</div>
  {}
  {}
</section>"#,
        items, more, video
    )
}

fn credentials_section(a: &Artisan) -> String {
    let mut items = String::new();
    if let Some(lineage) = &a.lineage {
        items.push_str(&format!("<li><strong>Lineage:</strong> {}</li>", html_escape(lineage)));
    }
    let awards = a.award_list();
    if !awards.is_empty() {
        let list: String = awards
            .iter()
            .map(|award| format!("<li>{} {}</li>", ICON_AWARD, html_escape(award)))
            .collect();
        items.push_str(&format!(
            "<li><strong>Awards:</strong><ul class=\"awards-sublist\">{}</ul></li>",
            list
        ));
    }
    format!(
        r#"<section class="card">
  <h2 class="card-title">Credentials</h2>
  <ul class="credentials-list">{}</ul>
</section>"#,
        items
    )
}

fn authenticity_section(a: &Artisan) -> String {
    if a.gi_tag_info.is_none() && a.verification_notes.is_none() {
        return String::new();
    }
    let gi = a
        .gi_tag_info
        .as_deref()
        .map(|g| format!("<div class=\"gi-tag\">GI Tag: {}</div>", html_escape(g)))
        .unwrap_or_default();
    let notes = a
        .verification_notes
        .as_deref()
        .map(|n| format!("<p class=\"verification-notes\">{}</p>", html_escape(n)))
        .unwrap_or_default();
    format!(
        r#"<section class="card">
  <h2 class="card-title">{} Authenticity</h2>
  {}{}
</section>"#,
        ICON_SHIELD, gi, notes
    )
}

fn business_section(a: &Artisan) -> String {
    let Some(identity) = a.business_identity() else {
        return String::new();
    };
    let established = identity
        .established
        .as_deref()
        .map(|e| format!("<li><span>Established:</span> <span>{}</span></li>", html_escape(e)))
        .unwrap_or_default();
    format!(
        r#"<section class="card">
  <h2 class="card-title">{} Business Identity</h2>
  <ul class="business-info">
    <li><span>Name:</span> <span>{}</span></li>
    <li><span>Type:</span> <span>{}</span></li>
    {}
  </ul>
</section>"#,
        ICON_LINK,
        html_escape(defaults::text(identity.name.as_deref())),
        html_escape(defaults::text(identity.kind.as_deref())),
        established
    )
}

fn profile_html(a: &Artisan, links: &LinkTarget, qr: &QrService) -> String {
    let name = defaults::text(a.name.as_deref());
    let photo = a
        .photo_link
        .as_deref()
        .or(a.photo_url.as_deref())
        .unwrap_or(defaults::PLACEHOLDER_IMAGE);
    let tick = if a.is_approved() {
        format!(
            r#"<img src="{}" alt="Verified" class="verified-tick" />"#,
            defaults::VERIFIED_TICK
        )
    } else {
        String::new()
    };
    let one_liner = a
        .one_liner
        .as_deref()
        .map(|o| format!("<p class=\"one-liner\">{}</p>", html_escape(o)))
        .unwrap_or_default();
    let qr_section = match links.portfolio_url(&a.artisan_id) {
        Some(url) if a.is_approved() => format!(
            r#"<div class="qr-code-container" id="qr-section">
  <img src="{src}" width="{size}" height="{size}" alt="Profile QR Code">
  <span>GI Connect Verified Artisan</span>
</div>"#,
            src = html_attr(qr.image_url(url.as_str()).as_str()),
            size = qr.size()
        ),
        _ => String::new(),
    };
    let quote = a
        .quote
        .as_deref()
        .map(|q| {
            format!(
                r#"<section class="card">
  <h2 class="card-title">Artisan's Philosophy</h2>
  <blockquote class="quote-block"><span class="quote-mark">“</span>{}</blockquote>
</section>"#,
                html_escape(q)
            )
        })
        .unwrap_or_default();
    let process = a
        .craft_process
        .as_deref()
        .map(|p| {
            format!(
                r#"<section class="card">
  <div class="card-header"><h2 class="card-title">The Crafting Process</h2></div>
  <p>{}</p>
</section>"#,
                html_escape(p)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<header class="profile-header container">
  <div class="header-main">
    <div class="profile-picture-container"><img src="{photo}" alt="{alt}"></div>
    <div class="header-details">
      <h1 id="artisan-name">{name}{tick}</h1>
      <div class="header-meta">
        <span class="craft-name">{craft}</span>
        <span class="location">{pin} {place}</span>
      </div>
      {one_liner}
    </div>
    {qr_section}
  </div>
</header>
<main class="profile-body container">
  <div class="cv-grid">
    <div class="cv-main-column">
{quote}
{process}
{gallery}
    </div>
    <div class="cv-sidebar-column">
{credentials}
{authenticity}
{business}
    </div>
  </div>
</main>"#,
        photo = html_attr(photo),
        alt = html_attr(name),
        name = html_escape(name),
        tick = tick,
        craft = html_escape(defaults::text(a.craft.as_deref())),
        pin = ICON_MAP_PIN,
        place = html_escape(defaults::text(a.place.as_deref())),
        one_liner = one_liner,
        qr_section = qr_section,
        quote = quote,
        process = process,
        gallery = gallery_section(a),
        credentials = credentials_section(a),
        authenticity = authenticity_section(a),
        business = business_section(a),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Url;
    use serde_json::json;

    fn links() -> LinkTarget {
        LinkTarget::new(
            Url::parse("https://example.github.io/artisans-demo/").unwrap(),
            "artisan.html",
        )
    }

    fn qr() -> QrService {
        QrService::new(
            Url::parse("https://api.qrserver.com/v1/create-qr-code/").unwrap(),
            120,
        )
    }

    fn render(value: serde_json::Value) -> ProfilePage {
        let artisan: Artisan = serde_json::from_value(value).unwrap();
        render_profile(&Ok(artisan), &links(), &qr())
    }

    #[test]
    fn approved_profile_has_tick_and_qr() {
        let page = render(json!({
            "artisan_id": "A1",
            "name": "Rita",
            "craft": "Bandhani",
            "place": "Kutch",
            "status": "approved"
        }));
        assert!(page.found);
        assert_eq!(page.title, "Rita | Artisan Profile");
        assert!(page.html.contains("class=\"verified-tick\""));
        assert!(page.html.contains("GI Connect Verified Artisan"));
        assert!(page.html.contains("artisan.html%3Fid%3DA1"));
        assert!(page.html.contains("src=\"placeholder.jpg\""));
    }

    #[test]
    fn pending_profile_omits_optional_sections() {
        let page = render(json!({ "artisan_id": "A2", "name": "Sam" }));
        assert!(!page.html.contains("verified-tick"));
        assert!(!page.html.contains("qr-section"));
        assert!(!page.html.contains("Artisan's Philosophy"));
        assert!(!page.html.contains("Artisan Gallery"));
        assert!(!page.html.contains("Authenticity"));
        assert!(!page.html.contains("Business Identity"));
        assert!(page.html.contains("Credentials"));
    }

    #[test]
    fn gallery_previews_three_photos() {
        let page = render(json!({
            "artisan_id": "A3",
            "workshop_photo_link": ["1.jpg", "2.jpg", "3.jpg", "4.jpg"],
            "awards": "Shilp Guru, National Award"
        }));
        let more = page.html.find("<details class=\"gallery-more\">").unwrap();
        let (preview, rest) = page.html.split_at(more);
        assert_eq!(preview.matches("class=\"gallery-item\"").count(), 3);
        assert!(rest.contains("<summary class=\"view-more-btn\">View More</summary>"));
        assert!(rest.contains("src=\"4.jpg\" alt=\"Artwork 4\""));
        assert!(!page.html.contains(" hidden"));
        assert!(page.html.contains("National Award</li>"));
    }

    #[test]
    fn malformed_business_identity_renders_degraded() {
        let page = render(json!({
            "artisan_id": "A4",
            "business_identity": "Loom House"
        }));
        assert!(page.html.contains("<span>Loom House</span>"));
        assert!(page.html.contains("<span>Artisan</span>"));
        assert!(page.html.contains("<span>N/A</span>"));
    }

    #[test]
    fn errors_render_not_found() {
        let page = render_profile(
            &Err(ViewError::NotFound("A9".into())),
            &links(),
            &qr(),
        );
        assert!(!page.found);
        assert!(page.html.contains("Artisan Not Found"));
    }
}
