//! One parameterized list renderer plus the row templates used by the pages.
use crate::links::{LinkTarget, QrService};
use crate::model::{defaults, Artisan, Craft, ListRecord};

/// What a display surface is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    /// One row per record.
    Rows(usize),
    /// The single "no records" placeholder row.
    Empty,
    /// The load-failure banner.
    Error,
}

/// Full replacement for a display surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceContent {
    pub state: SurfaceState,
    pub html: String,
}

/// Record-to-markup mapping for one screen.
pub trait RowTemplate<R>: Send + Sync {
    fn row(&self, record: &R) -> String;

    /// Single row shown when the filtered set is empty.
    fn placeholder(&self) -> String;

    /// Banner shown when the very first load fails.
    fn error(&self, message: &str) -> String;
}

pub fn render_list<R: ListRecord>(records: &[R], template: &dyn RowTemplate<R>) -> SurfaceContent {
    if records.is_empty() {
        return SurfaceContent {
            state: SurfaceState::Empty,
            html: template.placeholder(),
        };
    }
    let html = records
        .iter()
        .map(|r| template.row(r))
        .collect::<Vec<_>>()
        .join("\n");
    SurfaceContent {
        state: SurfaceState::Rows(records.len()),
        html,
    }
}

pub fn render_error<R>(message: &str, template: &dyn RowTemplate<R>) -> SurfaceContent {
    SurfaceContent {
        state: SurfaceState::Error,
        html: template.error(message),
    }
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn html_attr(s: &str) -> String {
    html_escape(s).replace('"', "&quot;")
}

/// Status badge; the class always comes from [`crate::model::Status::css_class`].
pub fn status_badge<R: ListRecord>(record: &R) -> String {
    let status = record.status();
    format!(
        "<span class=\"status-badge {}\">{}</span>",
        status.css_class(),
        status
    )
}

/// Admin dashboard table row with explicit approve / reject actions.
#[derive(Debug, Clone)]
pub struct AdminRow {
    pub links: LinkTarget,
}

const ADMIN_COLUMNS: usize = 6;

impl RowTemplate<Artisan> for AdminRow {
    fn row(&self, a: &Artisan) -> String {
        let id = html_attr(&a.artisan_id);
        format!(
            r#"<tr data-id="{id}">
  <td>{name}</td>
  <td>{place}</td>
  <td>{phone}</td>
  <td>{aadhaar}</td>
  <td>{badge}</td>
  <td class="actions">
    <a href="{href}" class="view-btn">View</a>
    <button class="details-btn" data-action="details" data-id="{id}">Details</button>
    <button class="approve-btn" data-action="approve" data-id="{id}">Approve</button>
    <button class="reject-btn" data-action="reject" data-id="{id}">Reject</button>
  </td>
</tr>"#,
            id = id,
            name = html_escape(defaults::text(a.name.as_deref())),
            place = html_escape(defaults::text(a.place.as_deref())),
            phone = html_escape(defaults::text(a.phone.as_deref())),
            aadhaar = html_escape(defaults::text(a.aadhaar_last4.as_deref())),
            badge = status_badge(a),
            href = html_attr(&self.links.profile_href(&a.artisan_id)),
        )
    }

    fn placeholder(&self) -> String {
        format!(
            "<tr class=\"placeholder-row\"><td colspan=\"{}\" style=\"text-align: center;\">No artisans found.</td></tr>",
            ADMIN_COLUMNS
        )
    }

    fn error(&self, message: &str) -> String {
        format!(
            "<tr class=\"error-row\"><td colspan=\"{}\"><div class=\"error-banner\">{}</div></td></tr>",
            ADMIN_COLUMNS,
            html_escape(message)
        )
    }
}

/// Card in the public craft directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct CraftCard;

impl RowTemplate<Craft> for CraftCard {
    fn row(&self, c: &Craft) -> String {
        let name = defaults::text(c.name.as_deref());
        format!(
            "<li class=\"craft-item\"><img src=\"{}\" alt=\"{}\"><h3>{}</h3></li>",
            html_attr(c.hero_img.as_deref().unwrap_or(defaults::PLACEHOLDER_IMAGE)),
            html_attr(name),
            html_escape(name)
        )
    }

    fn placeholder(&self) -> String {
        "<li class=\"placeholder-row\">No crafts found.</li>".to_string()
    }

    fn error(&self, _message: &str) -> String {
        "<li id=\"loading-message\" class=\"error-banner\">Failed to load crafts.</li>".to_string()
    }
}

fn linked_image(url: &str, alt: &str) -> String {
    format!(
        "<a href=\"{0}\" target=\"_blank\"><img src=\"{0}\" alt=\"{1}\"></a>",
        html_attr(url),
        alt
    )
}

/// Admin detail panel for one artisan.
pub fn render_detail(a: &Artisan, links: &LinkTarget, qr: &QrService) -> String {
    let mut gallery = String::new();
    if let Some(url) = &a.aadhaar_front_url {
        gallery.push_str(&linked_image(url, "Aadhaar Front"));
    }
    if let Some(url) = &a.aadhaar_back_url {
        gallery.push_str(&linked_image(url, "Aadhaar Back"));
    }
    for url in &a.craft_photo_urls {
        gallery.push_str(&linked_image(url, "Craft Photo"));
    }

    let qr_block = match links.portfolio_url(&a.artisan_id) {
        Some(portfolio) if a.is_approved() => format!(
            r#"
<div class="qr-code">
  <h4>Portfolio QR Code</h4>
  <img src="{}" alt="Portfolio QR Code">
</div>"#,
            html_attr(qr.image_url(portfolio.as_str()).as_str())
        ),
        _ => String::new(),
    };

    format!(
        r#"<div class="details-panel" data-id="{id}">
<h3 id="modal-title">{name}'s Details</h3>
<div class="info-grid">
  <div class="info-item"><h4>Phone</h4><p>{phone}</p></div>
  <div class="info-item"><h4>Location</h4><p>{place}</p></div>
  <div class="info-item"><h4>Aadhaar (Last 4)</h4><p>{aadhaar}</p></div>
  <div class="info-item"><h4>Status</h4><p>{badge}</p></div>
</div>
<div class="image-gallery">
  <h4>Uploaded Files</h4>
  <div class="image-grid">{gallery}</div>
</div>{qr_block}
</div>"#,
        id = html_attr(&a.artisan_id),
        name = html_escape(defaults::text(a.name.as_deref())),
        phone = html_escape(defaults::text(a.phone.as_deref())),
        place = html_escape(defaults::text(a.place.as_deref())),
        aadhaar = html_escape(defaults::text(a.aadhaar_last4.as_deref())),
        badge = status_badge(a),
        gallery = gallery,
        qr_block = qr_block,
    )
}

pub fn render_detail_not_found(id: &str) -> String {
    format!(
        "<div class=\"details-panel not-found\"><h3>Not Found</h3><p>No artisan with ID {} in the current list.</p></div>",
        html_escape(id)
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

    fn artisan(value: serde_json::Value) -> Artisan {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_list_renders_single_placeholder() {
        let template = AdminRow { links: links() };
        let content = render_list::<Artisan>(&[], &template);
        assert_eq!(content.state, SurfaceState::Empty);
        assert_eq!(content.html.matches("<tr").count(), 1);
        assert!(content.html.contains("No artisans found."));

        let error = render_error::<Artisan>("boom", &template);
        assert_eq!(error.state, SurfaceState::Error);
        assert_ne!(error.html, content.html);
    }

    #[test]
    fn admin_rows_follow_input_order_with_defaults() {
        let template = AdminRow { links: links() };
        let records = vec![
            artisan(json!({"artisan_id": "A2", "name": "Sam", "status": "Approved"})),
            artisan(json!({"artisan_id": "A1", "name": "Rita", "phone": "98765"})),
        ];
        let content = render_list(&records, &template);
        assert_eq!(content.state, SurfaceState::Rows(2));
        let sam = content.html.find("Sam").unwrap();
        let rita = content.html.find("Rita").unwrap();
        assert!(sam < rita);
        assert!(content.html.contains("status-badge status-approved\">Approved"));
        assert!(content.html.contains("status-badge status-pending\">Pending"));
        assert!(content.html.contains("<td>-</td>"));
        assert!(content.html.contains("href=\"artisan.html?id=A1\""));
        assert!(content.html.contains("data-action=\"approve\" data-id=\"A1\""));
    }

    #[test]
    fn markup_is_escaped() {
        let template = AdminRow { links: links() };
        let records = vec![artisan(json!({"artisan_id": "A1", "name": "<script>x</script>"}))];
        let html = render_list(&records, &template).html;
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn craft_cards_fall_back_to_placeholder_image() {
        let craft: Craft =
            serde_json::from_value(json!({"id": 3, "name": "Bandhani"})).unwrap();
        let html = CraftCard.row(&craft);
        assert!(html.contains("src=\"placeholder.jpg\""));
        assert!(html.contains("<h3>Bandhani</h3>"));
        assert!(CraftCard.error("x").contains("Failed to load crafts."));
    }

    #[test]
    fn detail_shows_qr_only_when_approved() {
        let approved = artisan(json!({
            "artisan_id": "A1",
            "name": "Rita",
            "status": "Approved",
            "aadhaar_front_url": "https://cdn/front.jpg",
            "craft_photo_urls": ["https://cdn/1.jpg", "https://cdn/2.jpg"]
        }));
        let html = render_detail(&approved, &links(), &qr());
        assert!(html.contains("Rita's Details"));
        assert!(html.contains("Portfolio QR Code"));
        assert!(html.contains("alt=\"Aadhaar Front\""));
        assert!(!html.contains("Aadhaar Back"));
        assert_eq!(html.matches("alt=\"Craft Photo\"").count(), 2);

        let pending = artisan(json!({"artisan_id": "A2", "name": "Sam"}));
        let html = render_detail(&pending, &links(), &qr());
        assert!(!html.contains("Portfolio QR Code"));
        assert!(html.contains("status-pending"));
    }
}
